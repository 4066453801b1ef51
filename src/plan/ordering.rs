//! Sort and duplicate elimination.

use crate::catalog::Catalog;
use crate::error::Result;
use crate::plan::PlanNode;
use crate::schema::Schema;
use crate::table::Table;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Ordering node: stable ascending sort on a composite key.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderingNode {
    pub columns: Vec<String>,
    pub input: Box<PlanNode>,
}

impl OrderingNode {
    pub fn schema(&self, catalog: &Catalog) -> Result<Schema> {
        self.input.schema(catalog)
    }

    pub fn evaluate(&self, catalog: &Catalog) -> Result<Table> {
        let table = self.input.evaluate(catalog)?;
        let indices = self
            .columns
            .iter()
            .map(|name| table.schema().column_index(name))
            .collect::<Result<Vec<_>>>()?;

        let schema = table.schema().clone();
        let mut rows = table.into_rows();
        // sort_by is stable, so ties keep their input order
        rows.sort_by(|a, b| {
            for &index in &indices {
                match a[index].sort_cmp(&b[index]) {
                    Ordering::Equal => continue,
                    other => return other,
                }
            }
            Ordering::Equal
        });
        Ok(Table::new(schema, rows))
    }

    pub fn repr(&self) -> String {
        format!("Ordering(columns=[{}])", self.columns.join(", "))
    }
}

/// Distinct node: keeps the first occurrence of each row, dedup decided by
/// full structural equality.
#[derive(Debug, Clone, PartialEq)]
pub struct DistinctNode {
    pub input: Box<PlanNode>,
}

impl DistinctNode {
    pub fn schema(&self, catalog: &Catalog) -> Result<Schema> {
        self.input.schema(catalog)
    }

    pub fn evaluate(&self, catalog: &Catalog) -> Result<Table> {
        let table = self.input.evaluate(catalog)?;
        let schema = table.schema().clone();
        let mut seen = HashSet::new();
        let mut rows = Vec::new();
        for row in table.into_rows() {
            if seen.insert(row.clone()) {
                rows.push(row);
            }
        }
        Ok(Table::new(schema, rows))
    }

    pub fn repr(&self) -> String {
        "HashDistinct".to_string()
    }
}
