//! Shared join machinery and the nested-loops baseline.

use crate::catalog::Catalog;
use crate::error::{QueryError, Result};
use crate::expr::Expr;
use crate::plan::PlanNode;
use crate::schema::{simple_name, Schema};
use crate::table::Table;
use crate::value::{ComparativeOp, Row, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Cross,
    Inner,
    LeftOuter,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            JoinType::Cross => "CROSS",
            JoinType::Inner => "INNER",
            JoinType::LeftOuter => "LEFT_OUTER",
        };
        f.write_str(word)
    }
}

/// Two sides of a join must not carry the same table name; aliasing one side
/// is the way out.
pub fn check_self_join(left: &Schema, right: &Schema) -> Result<()> {
    if left.table_name() == right.table_name() {
        return Err(QueryError::SelfJoinWithoutRenaming(
            left.table_name().to_string(),
        ));
    }
    Ok(())
}

/// Combined output schema of a join. For natural joins, right-side columns
/// whose simple name already appears on the left are dropped; the returned
/// index list names the right columns that survive.
pub fn join_schema(left: &Schema, right: &Schema, natural: bool) -> Result<(Schema, Vec<usize>)> {
    check_self_join(left, right)?;
    let mut names = left.column_names().to_vec();
    let mut types = left.column_types().to_vec();
    let left_simple: Vec<&str> = left.simple_names();
    let mut kept_right = Vec::new();
    for (index, name) in right.column_names().iter().enumerate() {
        if natural && left_simple.contains(&simple_name(name)) {
            continue;
        }
        kept_right.push(index);
        names.push(name.clone());
        types.push(right.column_types()[index]);
    }
    let table_name = format!("{}_{}", left.table_name(), right.table_name());
    Ok((Schema::from_qualified(table_name, names, types), kept_right))
}

/// Full concatenation of both schemas, used to evaluate a join condition
/// against a synthetic combined row before any dedup.
pub fn combined_schema(left: &Schema, right: &Schema) -> Schema {
    let mut names = left.column_names().to_vec();
    names.extend_from_slice(right.column_names());
    let mut types = left.column_types().to_vec();
    types.extend_from_slice(right.column_types());
    let table_name = format!("{}_{}", left.table_name(), right.table_name());
    Schema::from_qualified(table_name, names, types)
}

/// Synthesize the equi-condition of a natural join from all column pairs
/// whose simple names match. Zero matches yields `None`, which downgrades
/// the join to CROSS.
pub fn natural_condition(left: &Schema, right: &Schema) -> Option<Expr> {
    let mut equalities = Vec::new();
    for left_name in left.column_names() {
        for right_name in right.column_names() {
            if simple_name(left_name) == simple_name(right_name) {
                equalities.push(Expr::Comparative {
                    left: Box::new(Expr::Column(left_name.clone())),
                    op: ComparativeOp::Eq,
                    right: Box::new(Expr::Column(right_name.clone())),
                });
            }
        }
    }
    match equalities.len() {
        0 => None,
        1 => equalities.pop(),
        _ => Some(Expr::Conjunctive(equalities)),
    }
}

/// Nested-loops join node, the baseline that supports every join type and
/// arbitrary conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedLoopsJoinNode {
    pub join_type: JoinType,
    pub natural: bool,
    pub condition: Option<Expr>,
    pub left: Box<PlanNode>,
    pub right: Box<PlanNode>,
}

impl NestedLoopsJoinNode {
    pub fn schema(&self, catalog: &Catalog) -> Result<Schema> {
        let left = self.left.schema(catalog)?;
        let right = self.right.schema(catalog)?;
        Ok(join_schema(&left, &right, self.natural)?.0)
    }

    pub fn evaluate(&self, catalog: &Catalog) -> Result<Table> {
        let left = self.left.evaluate(catalog)?;
        let right = self.right.evaluate(catalog)?;
        let (schema, kept_right) = join_schema(left.schema(), right.schema(), self.natural)?;

        let mut rows = Vec::new();
        match self.join_type {
            JoinType::Cross => {
                for left_row in left.rows() {
                    for right_row in right.rows() {
                        rows.push(concat(left_row, right_row, &kept_right));
                    }
                }
            }
            JoinType::Inner | JoinType::LeftOuter => {
                let probe_schema = combined_schema(left.schema(), right.schema());
                for left_row in left.rows() {
                    let mut matched = false;
                    for right_row in right.rows() {
                        let combined: Row = left_row
                            .iter()
                            .chain(right_row.iter())
                            .cloned()
                            .collect();
                        let probe = Table::new(probe_schema.clone(), vec![combined]);
                        let hit = match &self.condition {
                            Some(condition) => condition.evaluate(&probe, 0)?.is_truthy(),
                            None => true,
                        };
                        if hit {
                            matched = true;
                            rows.push(concat(left_row, right_row, &kept_right));
                        }
                    }
                    if !matched && self.join_type == JoinType::LeftOuter {
                        rows.push(pad_right(left_row, kept_right.len()));
                    }
                }
            }
        }
        Ok(Table::new(schema, rows))
    }

    pub fn repr(&self) -> String {
        match &self.condition {
            Some(condition) => format!(
                "NestedLoopsJoin(type={}, condition={})",
                self.join_type, condition
            ),
            None => format!("NestedLoopsJoin(type={})", self.join_type),
        }
    }
}

/// Left row plus the surviving right columns.
pub fn concat(left: &Row, right: &Row, kept_right: &[usize]) -> Row {
    let mut row = left.clone();
    row.extend(kept_right.iter().map(|&i| right[i].clone()));
    row
}

/// Left row null-padded to the post-dedup output width.
pub fn pad_right(left: &Row, right_width: usize) -> Row {
    let mut row = left.clone();
    row.extend(std::iter::repeat(Value::Null).take(right_width));
    row
}
