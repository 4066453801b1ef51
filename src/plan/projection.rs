use crate::catalog::Catalog;
use crate::error::{QueryError, Result};
use crate::expr::Expr;
use crate::plan::PlanNode;
use crate::schema::Schema;
use crate::table::Table;
use std::fmt;

/// One projected column: an optional alias and the expression producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionItem {
    pub alias: Option<String>,
    pub expr: Expr,
}

impl fmt::Display for ProjectionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{} as {}", alias, self.expr),
            None => write!(f, "{}", self.expr),
        }
    }
}

/// Projection node
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionNode {
    pub columns: Vec<ProjectionItem>,
    pub input: Box<PlanNode>,
}

impl ProjectionNode {
    pub fn schema(&self, catalog: &Catalog) -> Result<Schema> {
        let input = self.input.schema(catalog)?;
        let mut columns = Vec::with_capacity(self.columns.len());
        for item in &self.columns {
            let ty = item.expr.schema_type(&input)?;
            let name = match (&item.alias, &item.expr) {
                (Some(alias), _) => {
                    if alias.contains('.') {
                        return Err(QueryError::InvalidAlias(alias.clone()));
                    }
                    alias.clone()
                }
                // bare column references keep their fully-qualified name
                (None, Expr::Column(name)) => {
                    input.column_names()[input.column_index(name)?].clone()
                }
                (None, expr) => expr.to_string(),
            };
            columns.push((name, ty));
        }
        Ok(Schema::new(input.table_name(), columns))
    }

    pub fn evaluate(&self, catalog: &Catalog) -> Result<Table> {
        let schema = self.schema(catalog)?;
        let table = self.input.evaluate(catalog)?;
        let mut rows = Vec::with_capacity(table.row_count());
        for index in 0..table.row_count() {
            let mut row = Vec::with_capacity(self.columns.len());
            for item in &self.columns {
                row.push(item.expr.evaluate(&table, index)?);
            }
            rows.push(row);
        }
        Ok(Table::new(schema, rows))
    }

    pub fn repr(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| c.to_string()).collect();
        format!("Projection(columns=[{}])", columns.join(", "))
    }
}
