//! Relation metadata: ordered, fully-qualified column names with types

use crate::error::{QueryError, Result};
use crate::value::SchemaType;

/// Returns the simple (unqualified) suffix of a possibly-qualified name.
pub fn simple_name(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((_, simple)) => simple,
        None => name,
    }
}

/// Ordered column metadata of a relation. Column names are stored fully
/// qualified (`table.column`); names and types correspond positionally.
/// Immutable once constructed; `rename` derives a new schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    table_name: String,
    column_names: Vec<String>,
    column_types: Vec<SchemaType>,
}

impl Schema {
    /// Build a schema from simple column names, qualifying each with the
    /// table name.
    pub fn new(
        table_name: impl Into<String>,
        columns: Vec<(String, SchemaType)>,
    ) -> Self {
        let table_name = table_name.into();
        let (column_names, column_types) = columns
            .into_iter()
            .map(|(name, ty)| {
                if name.contains('.') {
                    (name, ty)
                } else {
                    (format!("{}.{}", table_name, name), ty)
                }
            })
            .unzip();
        Self {
            table_name,
            column_names,
            column_types,
        }
    }

    /// Build a schema from already-qualified (or deliberately bare) names.
    pub fn from_qualified(
        table_name: impl Into<String>,
        column_names: Vec<String>,
        column_types: Vec<SchemaType>,
    ) -> Self {
        assert_eq!(
            column_names.len(),
            column_types.len(),
            "schema name/type arity mismatch"
        );
        Self {
            table_name: table_name.into(),
            column_names,
            column_types,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn column_types(&self) -> &[SchemaType] {
        &self.column_types
    }

    pub fn len(&self) -> usize {
        self.column_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.column_names.is_empty()
    }

    /// Simple names of all columns, in order.
    pub fn simple_names(&self) -> Vec<&str> {
        self.column_names.iter().map(|n| simple_name(n)).collect()
    }

    /// Resolve a possibly-unqualified column name to its index. Qualified
    /// names must match exactly; an unqualified name must match exactly one
    /// column's simple suffix.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        if name.contains('.') {
            return self
                .column_names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| QueryError::ColumnIndex(format!("column {} not found", name)));
        }
        let matches: Vec<usize> = self
            .column_names
            .iter()
            .enumerate()
            .filter(|(_, n)| simple_name(n) == name)
            .map(|(i, _)| i)
            .collect();
        match matches.as_slice() {
            [index] => Ok(*index),
            [] => Err(QueryError::ColumnIndex(format!(
                "column {} not found",
                name
            ))),
            _ => Err(QueryError::ColumnIndex(format!(
                "column {} is ambiguous",
                name
            ))),
        }
    }

    pub fn column_type(&self, name: &str) -> Result<SchemaType> {
        Ok(self.column_types[self.column_index(name)?])
    }

    /// True if the name resolves against this schema.
    pub fn resolves(&self, name: &str) -> bool {
        self.column_index(name).is_ok()
    }

    /// Derive a schema with every column re-qualified under a new table
    /// name. Used by table aliasing.
    pub fn rename(&self, new_table: &str) -> Schema {
        let column_names = self
            .column_names
            .iter()
            .map(|n| format!("{}.{}", new_table, simple_name(n)))
            .collect();
        Schema {
            table_name: new_table.to_string(),
            column_names,
            column_types: self.column_types.clone(),
        }
    }
}
