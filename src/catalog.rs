//! Table registry and secondary indices
//!
//! The catalog is an explicit value injected into compilation, optimization
//! and evaluation, never a process-wide global. Tables are loaded from flat
//! files (`*.table`); loading also synthesizes the `#tables` and `#columns`
//! relations so they can be queried like any other table.

use crate::error::{QueryError, Result};
use crate::schema::{simple_name, Schema};
use crate::table::Table;
use crate::value::{Row, SchemaType, Value};
use std::collections::HashMap;
use std::path::Path;

/// A secondary index: point lookups from a key value to matching rows.
#[derive(Debug, Clone)]
pub struct TableIndex {
    column: String,
    entries: HashMap<Value, Vec<Row>>,
}

impl TableIndex {
    /// Simple name of the indexed column
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn lookup(&self, key: &Value) -> &[Row] {
        self.entries.get(key).map(|r| r.as_slice()).unwrap_or(&[])
    }
}

/// Registry of loaded tables and their secondary indices
#[derive(Debug, Default)]
pub struct Catalog {
    tables: HashMap<String, Table>,
    indices: HashMap<(String, String), TableIndex>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table under its schema's table name.
    pub fn register(&mut self, table: Table) {
        self.tables
            .insert(table.schema().table_name().to_string(), table);
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn retrieve(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| QueryError::TableNotFound(name.to_string()))
    }

    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(|n| n.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Build a secondary index over one column of a registered table.
    pub fn create_index(&mut self, table_name: &str, column: &str) -> Result<()> {
        let table = self.retrieve(table_name)?;
        let index = table.schema().column_index(column)?;
        let mut entries: HashMap<Value, Vec<Row>> = HashMap::new();
        for row in table.rows() {
            entries
                .entry(row[index].clone())
                .or_default()
                .push(row.clone());
        }
        let column = simple_name(column).to_string();
        tracing::debug!(table = table_name, column = %column, "created index");
        self.indices.insert(
            (table_name.to_string(), column.clone()),
            TableIndex { column, entries },
        );
        Ok(())
    }

    pub fn retrieve_index(&self, table_name: &str, column: &str) -> Result<&TableIndex> {
        self.indices
            .get(&(table_name.to_string(), simple_name(column).to_string()))
            .ok_or_else(|| {
                QueryError::IndexNotFound(table_name.to_string(), column.to_string())
            })
    }

    pub fn has_index(&self, table_name: &str, column: &str) -> bool {
        self.indices
            .contains_key(&(table_name.to_string(), simple_name(column).to_string()))
    }

    /// Load every `*.table` file in a directory and synthesize the
    /// `#tables` / `#columns` relations.
    pub fn load_dir(path: impl AsRef<Path>) -> Result<Self> {
        let mut catalog = Self::new();
        let mut entries: Vec<_> = std::fs::read_dir(path.as_ref())?
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("table") {
                continue;
            }
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| QueryError::Load(format!("bad file name: {}", path.display())))?
                .to_string();
            let text = std::fs::read_to_string(&path)?;
            let table = parse_table_file(&name, &text)?;
            tracing::debug!(table = %name, rows = table.row_count(), "loaded table");
            catalog.register(table);
        }
        catalog.synthesize_meta_tables();
        Ok(catalog)
    }

    /// Rebuild `#tables` and `#columns` from the current registry.
    pub fn synthesize_meta_tables(&mut self) {
        self.tables.remove("#tables");
        self.tables.remove("#columns");

        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.push("#tables".to_string());
        names.push("#columns".to_string());
        names.sort_unstable();

        let columns_rows: Vec<Row> = {
            let mut rows = Vec::new();
            for name in &names {
                let (col_names, col_types): (Vec<String>, Vec<SchemaType>) = match name.as_str()
                {
                    "#tables" => (vec!["table_name".into()], vec![SchemaType::Varchar]),
                    "#columns" => (
                        vec![
                            "table_name".into(),
                            "column_name".into(),
                            "column_type".into(),
                        ],
                        vec![
                            SchemaType::Varchar,
                            SchemaType::Varchar,
                            SchemaType::Varchar,
                        ],
                    ),
                    other => {
                        let schema = self.tables[other].schema();
                        (
                            schema
                                .simple_names()
                                .iter()
                                .map(|n| n.to_string())
                                .collect(),
                            schema.column_types().to_vec(),
                        )
                    }
                };
                for (col, ty) in col_names.iter().zip(col_types.iter()) {
                    rows.push(vec![
                        Value::Varchar(name.clone()),
                        Value::Varchar(col.clone()),
                        Value::Varchar(ty.to_string()),
                    ]);
                }
            }
            rows
        };

        let tables_rows: Vec<Row> = names
            .iter()
            .map(|n| vec![Value::Varchar(n.clone())])
            .collect();

        self.register(Table::new(
            Schema::new(
                "#tables",
                vec![("table_name".into(), SchemaType::Varchar)],
            ),
            tables_rows,
        ));
        self.register(Table::new(
            Schema::new(
                "#columns",
                vec![
                    ("table_name".into(), SchemaType::Varchar),
                    ("column_name".into(), SchemaType::Varchar),
                    ("column_type".into(), SchemaType::Varchar),
                ],
            ),
            columns_rows,
        ));
    }
}

/// Parse a `.table` file: first line comma-separated simple column names,
/// second line column types, remaining lines comma-separated values with
/// `\N` for null.
fn parse_table_file(name: &str, text: &str) -> Result<Table> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| QueryError::Load(format!("{}: missing header line", name)))?;
    let types_line = lines
        .next()
        .ok_or_else(|| QueryError::Load(format!("{}: missing types line", name)))?;

    let column_names: Vec<String> = header.split(',').map(|s| s.trim().to_string()).collect();
    let column_types: Vec<SchemaType> = types_line
        .split(',')
        .map(|s| {
            SchemaType::parse(s)
                .ok_or_else(|| QueryError::Load(format!("{}: unknown type {}", name, s.trim())))
        })
        .collect::<Result<_>>()?;
    if column_names.len() != column_types.len() {
        return Err(QueryError::Load(format!(
            "{}: {} column names but {} types",
            name,
            column_names.len(),
            column_types.len()
        )));
    }

    let mut rows = Vec::new();
    for line in lines {
        let fields: Vec<&str> = line.split(',').map(|s| s.trim()).collect();
        if fields.len() != column_names.len() {
            return Err(QueryError::Load(format!(
                "{}: record has {} fields, schema has {} columns",
                name,
                fields.len(),
                column_names.len()
            )));
        }
        let row: Row = fields
            .iter()
            .zip(column_types.iter())
            .map(|(field, ty)| parse_value(name, field, *ty))
            .collect::<Result<_>>()?;
        rows.push(row);
    }

    let schema = Schema::new(
        name,
        column_names.into_iter().zip(column_types).collect(),
    );
    Ok(Table::new(schema, rows))
}

fn parse_value(table: &str, field: &str, ty: SchemaType) -> Result<Value> {
    if field == "\\N" {
        return Ok(Value::Null);
    }
    match ty {
        SchemaType::Int => field
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| QueryError::Load(format!("{}: bad int value {}", table, field))),
        SchemaType::Float => field
            .parse::<f64>()
            .map(Value::float)
            .map_err(|_| QueryError::Load(format!("{}: bad float value {}", table, field))),
        SchemaType::Varchar => Ok(Value::Varchar(field.to_string())),
        SchemaType::Null => Ok(Value::Null),
    }
}
