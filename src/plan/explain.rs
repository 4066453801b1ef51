use crate::catalog::Catalog;
use crate::error::Result;
use crate::plan::PlanNode;
use crate::schema::Schema;
use crate::table::Table;
use crate::value::SchemaType;

/// Explain node: renders the plan below it as an indentation-coded
/// single-column table instead of evaluating it. The node itself never
/// appears in the output.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplainNode {
    pub input: Box<PlanNode>,
}

impl ExplainNode {
    pub fn schema(&self, _catalog: &Catalog) -> Result<Schema> {
        Ok(explain_schema())
    }

    pub fn evaluate(&self, _catalog: &Catalog) -> Result<Table> {
        let mut rows = Vec::new();
        self.input.explain_into(&mut rows, 0);
        Ok(Table::new(explain_schema(), rows))
    }
}

fn explain_schema() -> Schema {
    Schema::new(
        "explain",
        vec![("Operator".to_string(), SchemaType::Varchar)],
    )
}
