//! Hash join: build on the left, probe with the right.

use crate::catalog::Catalog;
use crate::error::{QueryError, Result};
use crate::expr::Expr;
use crate::plan::join::{concat, join_schema, pad_right, JoinType};
use crate::plan::PlanNode;
use crate::schema::Schema;
use crate::table::Table;
use crate::value::{ComparativeOp, Row};
use std::collections::HashMap;

/// Hash join node. Supports only INNER and LEFT_OUTER with an equality (or
/// conjunction-of-equalities) condition over bare columns.
#[derive(Debug, Clone, PartialEq)]
pub struct HashJoinNode {
    pub join_type: JoinType,
    pub condition: Expr,
    pub left: Box<PlanNode>,
    pub right: Box<PlanNode>,
}

impl HashJoinNode {
    pub fn schema(&self, catalog: &Catalog) -> Result<Schema> {
        let left = self.left.schema(catalog)?;
        let right = self.right.schema(catalog)?;
        Ok(join_schema(&left, &right, false)?.0)
    }

    pub fn evaluate(&self, catalog: &Catalog) -> Result<Table> {
        let left = self.left.evaluate(catalog)?;
        let right = self.right.evaluate(catalog)?;
        let (schema, kept_right) = join_schema(left.schema(), right.schema(), false)?;

        let pairs = equi_column_pairs(&self.condition, left.schema(), right.schema())?;
        let left_keys: Vec<usize> = pairs
            .iter()
            .map(|(l, _)| left.schema().column_index(l))
            .collect::<Result<_>>()?;
        let right_keys: Vec<usize> = pairs
            .iter()
            .map(|(_, r)| right.schema().column_index(r))
            .collect::<Result<_>>()?;

        let mut build: HashMap<Row, Vec<usize>> = HashMap::new();
        for (index, row) in left.rows().iter().enumerate() {
            let key: Row = left_keys.iter().map(|&i| row[i].clone()).collect();
            build.entry(key).or_default().push(index);
        }

        let mut matched = vec![false; left.row_count()];
        let mut rows = Vec::new();
        for right_row in right.rows() {
            let key: Row = right_keys.iter().map(|&i| right_row[i].clone()).collect();
            if let Some(indices) = build.get(&key) {
                for &index in indices {
                    matched[index] = true;
                    rows.push(concat(&left.rows()[index], right_row, &kept_right));
                }
            }
        }
        if self.join_type == JoinType::LeftOuter {
            for (index, left_row) in left.rows().iter().enumerate() {
                if !matched[index] {
                    rows.push(pad_right(left_row, kept_right.len()));
                }
            }
        }
        Ok(Table::new(schema, rows))
    }

    pub fn repr(&self) -> String {
        format!(
            "HashJoin(type={}, condition={})",
            self.join_type, self.condition
        )
    }
}

/// Decompose an equi-join condition into `(left column, right column)` pairs.
/// Only a single `column = column` equality or a conjunction of them is
/// accepted; each side must resolve in exactly one of the two schemas.
pub fn equi_column_pairs(
    condition: &Expr,
    left: &Schema,
    right: &Schema,
) -> Result<Vec<(String, String)>> {
    let equalities: Vec<&Expr> = match condition {
        Expr::Comparative { .. } => vec![condition],
        Expr::Conjunctive(parts) => parts.iter().collect(),
        other => {
            return Err(QueryError::JoinConditionNotSupported(other.to_string()));
        }
    };

    let mut pairs = Vec::with_capacity(equalities.len());
    for equality in equalities {
        let (a, b) = match equality {
            Expr::Comparative {
                left: a,
                op: ComparativeOp::Eq,
                right: b,
            } => match (a.as_ref(), b.as_ref()) {
                (Expr::Column(a), Expr::Column(b)) => (a, b),
                _ => {
                    return Err(QueryError::JoinConditionNotSupported(
                        equality.to_string(),
                    ));
                }
            },
            other => {
                return Err(QueryError::JoinConditionNotSupported(other.to_string()));
            }
        };
        pairs.push(assign_sides(a, b, left, right)?);
    }
    Ok(pairs)
}

fn assign_sides(
    a: &str,
    b: &str,
    left: &Schema,
    right: &Schema,
) -> Result<(String, String)> {
    let side = |name: &str| -> Result<bool> {
        // true means the column lives on the left
        match (left.resolves(name), right.resolves(name)) {
            (true, false) => Ok(true),
            (false, true) => Ok(false),
            _ => Err(QueryError::JoinCondition(format!(
                "column {name} must resolve in exactly one operand"
            ))),
        }
    };
    match (side(a)?, side(b)?) {
        (true, false) => Ok((a.to_string(), b.to_string())),
        (false, true) => Ok((b.to_string(), a.to_string())),
        _ => Err(QueryError::JoinCondition(format!(
            "equality {a} = {b} does not relate the two operands"
        ))),
    }
}
