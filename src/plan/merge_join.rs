//! Sort-merge join over pre-sorted operands.

use crate::catalog::Catalog;
use crate::error::{QueryError, Result};
use crate::expr::Expr;
use crate::plan::hash_join::equi_column_pairs;
use crate::plan::join::{concat, join_schema, pad_right, JoinType};
use crate::plan::PlanNode;
use crate::schema::Schema;
use crate::table::Table;
use crate::value::Value;
use std::cmp::Ordering;

/// Merge join node. Both children must already be Ordering operators sorted
/// on exactly the condition's columns; the compiler enforces this with a
/// TableNotSorted error.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeJoinNode {
    pub join_type: JoinType,
    pub condition: Expr,
    pub left: Box<PlanNode>,
    pub right: Box<PlanNode>,
}

impl MergeJoinNode {
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

        let key_cmp = |l: &[Value], r: &[Value]| -> Ordering {
            for (&li, &ri) in left_keys.iter().zip(&right_keys) {
                match l[li].sort_cmp(&r[ri]) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            Ordering::Equal
        };
        let same_left_key = |a: &[Value], b: &[Value]| {
            left_keys.iter().all(|&i| a[i].sort_cmp(&b[i]) == Ordering::Equal)
        };
        let same_right_key = |a: &[Value], b: &[Value]| {
            right_keys.iter().all(|&i| a[i].sort_cmp(&b[i]) == Ordering::Equal)
        };

        let left_rows = left.rows();
        let right_rows = right.rows();
        let mut rows = Vec::new();
        let mut i = 0;
        let mut j = 0;
        while i < left_rows.len() {
            if j >= right_rows.len() {
                if self.join_type == JoinType::LeftOuter {
                    rows.push(pad_right(&left_rows[i], kept_right.len()));
                }
                i += 1;
                continue;
            }
            match key_cmp(&left_rows[i], &right_rows[j]) {
                Ordering::Less => {
                    if self.join_type == JoinType::LeftOuter {
                        rows.push(pad_right(&left_rows[i], kept_right.len()));
                    }
                    i += 1;
                }
                Ordering::Greater => {
                    j += 1;
                }
                Ordering::Equal => {
                    // cross product over the duplicate runs on both sides
                    let mut i_end = i + 1;
                    while i_end < left_rows.len() && same_left_key(&left_rows[i_end], &left_rows[i])
                    {
                        i_end += 1;
                    }
                    let mut j_end = j + 1;
                    while j_end < right_rows.len()
                        && same_right_key(&right_rows[j_end], &right_rows[j])
                    {
                        j_end += 1;
                    }
                    for left_row in &left_rows[i..i_end] {
                        for right_row in &right_rows[j..j_end] {
                            rows.push(concat(left_row, right_row, &kept_right));
                        }
                    }
                    i = i_end;
                    j = j_end;
                }
            }
        }
        Ok(Table::new(schema, rows))
    }

    pub fn repr(&self) -> String {
        format!(
            "MergeJoin(type={}, condition={})",
            self.join_type, self.condition
        )
    }
}

/// The structural sortedness precondition: a merge join operand must be an
/// Ordering node sorted on exactly `columns`, resolved against the operand's
/// input schema so qualified and simple spellings agree.
pub fn check_sorted(operand: &PlanNode, columns: &[String], catalog: &Catalog) -> Result<()> {
    let node = match operand {
        PlanNode::Ordering(node) => node,
        other => {
            return Err(QueryError::TableNotSorted(other.repr()));
        }
    };
    let input = node.input.schema(catalog)?;
    let sorted_on = &node.columns;
    let wanted = columns
        .iter()
        .map(|name| input.column_index(name))
        .collect::<Result<Vec<_>>>()?;
    let actual = sorted_on
        .iter()
        .map(|name| input.column_index(name))
        .collect::<Result<Vec<_>>>()?;
    if wanted != actual {
        return Err(QueryError::TableNotSorted(format!(
            "sorted on [{}], join condition needs [{}]",
            sorted_on.join(", "),
            columns.join(", ")
        )));
    }
    Ok(())
}
