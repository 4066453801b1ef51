//! Hash-based grouping and aggregation.

use crate::catalog::Catalog;
use crate::error::{QueryError, Result};
use crate::expr::Expr;
use crate::plan::PlanNode;
use crate::schema::Schema;
use crate::table::Table;
use crate::value::{Row, SchemaType, Value};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

impl AggregateFunction {
    /// Keyword mapping is case-insensitive.
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "sum" => Some(AggregateFunction::Sum),
            "avg" => Some(AggregateFunction::Avg),
            "min" => Some(AggregateFunction::Min),
            "max" => Some(AggregateFunction::Max),
            "count" => Some(AggregateFunction::Count),
            _ => None,
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::Count => "count",
        };
        f.write_str(word)
    }
}

/// One aggregate output column.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateColumn {
    pub alias: String,
    pub function: AggregateFunction,
    pub expr: Expr,
}

impl fmt::Display for AggregateColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} as {}({})", self.alias, self.function, self.expr)
    }
}

/// Aggregate node. An empty group column list means whole-table aggregation,
/// which produces exactly one output row even over zero input rows.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateNode {
    pub group_columns: Vec<String>,
    pub aggregates: Vec<AggregateColumn>,
    pub input: Box<PlanNode>,
}

impl AggregateNode {
    pub fn schema(&self, catalog: &Catalog) -> Result<Schema> {
        let input = self.input.schema(catalog)?;
        let mut columns = Vec::with_capacity(self.group_columns.len() + self.aggregates.len());
        for name in &self.group_columns {
            let index = input.column_index(name)?;
            columns.push((
                input.column_names()[index].clone(),
                input.column_types()[index],
            ));
        }
        for aggregate in &self.aggregates {
            let operand = aggregate.expr.schema_type(&input)?;
            columns.push((aggregate.alias.clone(), result_type(aggregate.function, operand)?));
        }
        Ok(Schema::new(input.table_name(), columns))
    }

    pub fn evaluate(&self, catalog: &Catalog) -> Result<Table> {
        let schema = self.schema(catalog)?;
        let table = self.input.evaluate(catalog)?;

        let group_indices = self
            .group_columns
            .iter()
            .map(|name| table.schema().column_index(name))
            .collect::<Result<Vec<_>>>()?;

        // groups in first-encounter order
        let mut order: Vec<Row> = Vec::new();
        let mut groups: HashMap<Row, Vec<usize>> = HashMap::new();
        for (index, row) in table.rows().iter().enumerate() {
            let key: Row = group_indices.iter().map(|&i| row[i].clone()).collect();
            groups
                .entry(key.clone())
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push(index);
        }
        if self.group_columns.is_empty() && groups.is_empty() {
            order.push(Vec::new());
            groups.insert(Vec::new(), Vec::new());
        }

        let mut rows = Vec::with_capacity(order.len());
        for key in order {
            let member_rows = &groups[&key];
            let mut row = key.clone();
            for aggregate in &self.aggregates {
                let mut values = Vec::with_capacity(member_rows.len());
                for &index in member_rows {
                    let value = aggregate.expr.evaluate(&table, index)?;
                    if !value.is_null() {
                        values.push(value);
                    }
                }
                row.push(accumulate(aggregate.function, values)?);
            }
            rows.push(row);
        }
        Ok(Table::new(schema, rows))
    }

    pub fn repr(&self) -> String {
        let aggregates: Vec<String> = self.aggregates.iter().map(|a| a.to_string()).collect();
        format!(
            "HashAggregate(group=[{}], aggregates=[{}])",
            self.group_columns.join(", "),
            aggregates.join(", ")
        )
    }
}

/// Aggregate result typing: AVG is always Float, COUNT always Int, MIN/MAX
/// preserve the operand, SUM preserves the numeric operand.
fn result_type(function: AggregateFunction, operand: SchemaType) -> Result<SchemaType> {
    if operand == SchemaType::Varchar
        && matches!(function, AggregateFunction::Sum | AggregateFunction::Avg)
    {
        return Err(QueryError::Aggregate(
            "Varchar can only be aggregated with count, min and max".to_string(),
        ));
    }
    Ok(match function {
        AggregateFunction::Count => SchemaType::Int,
        AggregateFunction::Avg => SchemaType::Float,
        AggregateFunction::Sum | AggregateFunction::Min | AggregateFunction::Max => operand,
    })
}

/// Fold the non-null values of one group. Empty input yields Null, except
/// COUNT which yields 0.
fn accumulate(function: AggregateFunction, values: Vec<Value>) -> Result<Value> {
    use crate::value::{arithmetic, ArithmeticOp};

    if function == AggregateFunction::Count {
        return Ok(Value::Int(values.len() as i64));
    }
    if values.is_empty() {
        return Ok(Value::Null);
    }
    match function {
        AggregateFunction::Sum => {
            let mut iter = values.into_iter();
            let mut total = iter.next().unwrap();
            for value in iter {
                total = arithmetic(&total, ArithmeticOp::Add, &value)?;
            }
            Ok(total)
        }
        AggregateFunction::Avg => {
            let count = values.len() as f64;
            let mut total = 0.0;
            for value in values {
                total += value.as_f64().ok_or_else(|| {
                    QueryError::Aggregate(
                        "Varchar can only be aggregated with count, min and max".to_string(),
                    )
                })?;
            }
            Ok(Value::float(total / count))
        }
        AggregateFunction::Min => Ok(values
            .into_iter()
            .min_by(|a, b| a.sort_cmp(b))
            .unwrap()),
        AggregateFunction::Max => Ok(values
            .into_iter()
            .max_by(|a, b| a.sort_cmp(b))
            .unwrap()),
        AggregateFunction::Count => unreachable!(),
    }
}
