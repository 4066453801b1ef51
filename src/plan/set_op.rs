//! Bag-semantics set operations.

use crate::catalog::Catalog;
use crate::error::{QueryError, Result};
use crate::plan::PlanNode;
use crate::schema::Schema;
use crate::table::Table;
use crate::value::{self, ComparativeOp, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOpKind {
    Union,
    Intersect,
    Except,
}

impl SetOpKind {
    pub fn repr(&self) -> &'static str {
        match self {
            SetOpKind::Union => "Union",
            SetOpKind::Intersect => "Intersect",
            SetOpKind::Except => "Except",
        }
    }
}

/// Operand pair shared by Union, Intersect and Except.
#[derive(Debug, Clone, PartialEq)]
pub struct SetOpNode {
    pub left: Box<PlanNode>,
    pub right: Box<PlanNode>,
}

impl SetOpNode {
    /// Both operands must expose the same simple column name sequence; the
    /// result carries the left operand's schema.
    pub fn schema(&self, catalog: &Catalog) -> Result<Schema> {
        let left = self.left.schema(catalog)?;
        let right = self.right.schema(catalog)?;
        if left.simple_names() != right.simple_names() {
            return Err(QueryError::TableSchemaDoesNotMatch(format!(
                "[{}] vs [{}]",
                left.simple_names().join(", "),
                right.simple_names().join(", ")
            )));
        }
        Ok(left)
    }

    pub fn evaluate(&self, catalog: &Catalog, kind: SetOpKind) -> Result<Table> {
        let schema = self.schema(catalog)?;
        let left = self.left.evaluate(catalog)?;
        let right = self.right.evaluate(catalog)?;

        let rows = match kind {
            SetOpKind::Union => {
                let mut rows = left.into_rows();
                rows.extend(right.into_rows());
                rows
            }
            // one output row per equal (left, right) pair, bag counting
            SetOpKind::Intersect => {
                let mut rows = Vec::new();
                for left_row in left.rows() {
                    for right_row in right.rows() {
                        if rows_equal(left_row, right_row)? {
                            rows.push(left_row.clone());
                        }
                    }
                }
                rows
            }
            SetOpKind::Except => {
                let mut rows = Vec::new();
                for left_row in left.rows() {
                    let mut found = false;
                    for right_row in right.rows() {
                        if rows_equal(left_row, right_row)? {
                            found = true;
                            break;
                        }
                    }
                    if !found {
                        rows.push(left_row.clone());
                    }
                }
                rows
            }
        };
        Ok(Table::new(schema, rows))
    }
}

/// Element-wise structural equality with the engine's comparison rules, so
/// numeric cross-type rows compare equal the same way expressions do.
fn rows_equal(left: &Row, right: &Row) -> Result<bool> {
    for (l, r) in left.iter().zip(right.iter()) {
        if !value::compare(l, ComparativeOp::Eq, r)? {
            return Ok(false);
        }
    }
    Ok(true)
}
