//! In-memory row storage

use crate::schema::Schema;
use crate::value::Row;

/// A fully materialized relation: a schema plus an ordered set of records.
/// Every operator produces a fresh table; tables are never mutated in place
/// once returned.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    schema: Schema,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(schema: Schema, rows: Vec<Row>) -> Self {
        debug_assert!(
            rows.iter().all(|r| r.len() == schema.len()),
            "record arity does not match schema"
        );
        Self { schema, rows }
    }

    pub fn empty(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Derive a table with the same rows under an aliased schema.
    pub fn renamed(&self, new_table: &str) -> Table {
        Table {
            schema: self.schema.rename(new_table),
            rows: self.rows.clone(),
        }
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}
