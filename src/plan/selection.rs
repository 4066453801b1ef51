use crate::catalog::Catalog;
use crate::error::Result;
use crate::expr::Expr;
use crate::plan::PlanNode;
use crate::schema::Schema;
use crate::table::Table;

/// Selection node, the row filter.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionNode {
    pub condition: Expr,
    pub input: Box<PlanNode>,
}

impl SelectionNode {
    pub fn schema(&self, catalog: &Catalog) -> Result<Schema> {
        self.input.schema(catalog)
    }

    pub fn evaluate(&self, catalog: &Catalog) -> Result<Table> {
        let table = self.input.evaluate(catalog)?;

        // literal conditions decide the whole table without touching rows
        if let Expr::Literal(value) = &self.condition {
            return Ok(if value.is_truthy() {
                table
            } else {
                Table::empty(table.schema().clone())
            });
        }

        let schema = table.schema().clone();
        let mut rows = Vec::new();
        for index in 0..table.row_count() {
            if self.condition.evaluate(&table, index)?.is_truthy() {
                rows.push(table.rows()[index].clone());
            }
        }
        Ok(Table::new(schema, rows))
    }

    pub fn repr(&self) -> String {
        format!("Selection(condition={})", self.condition)
    }
}
