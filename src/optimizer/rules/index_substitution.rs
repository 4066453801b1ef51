//! Replaces selections over base table scans with index seeks.

use crate::catalog::Catalog;
use crate::error::Result;
use crate::optimizer::OptimizerRule;
use crate::plan::{IndexSeekNode, PlanNode};

/// Turns `Selection(column = literal)` directly above a table scan into an
/// index seek when the catalog holds an index on that column. Other
/// selections are left untouched.
pub struct IndexSeekSubstitution;

impl OptimizerRule for IndexSeekSubstitution {
    fn name(&self) -> &str {
        "IndexSeekSubstitution"
    }

    fn optimize(&self, plan: PlanNode, catalog: &Catalog) -> Result<PlanNode> {
        substitute(plan, catalog)
    }
}

fn substitute(plan: PlanNode, catalog: &Catalog) -> Result<PlanNode> {
    let plan = plan.map_children(&mut |child| substitute(child, catalog))?;
    let PlanNode::Selection(node) = plan else {
        return Ok(plan);
    };
    let PlanNode::TableScan(scan) = &*node.input else {
        return Ok(PlanNode::Selection(node));
    };
    // a condition the seek validator rejects just stays a selection
    match IndexSeekNode::from_selection(scan, &node.condition, catalog) {
        Ok(seek) => Ok(PlanNode::IndexSeek(seek)),
        Err(_) => Ok(PlanNode::Selection(node)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;
    use crate::plan::{ScanNode, SelectionNode};
    use crate::schema::Schema;
    use crate::table::Table;
    use crate::value::{SchemaType, Value};

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.register(Table::new(
            Schema::new(
                "t",
                vec![
                    ("a".to_string(), SchemaType::Int),
                    ("b".to_string(), SchemaType::Int),
                ],
            ),
            vec![vec![Value::Int(1), Value::Int(10)]],
        ));
        catalog.create_index("t", "a").unwrap();
        catalog
    }

    fn selection_over_scan(condition: Expr) -> PlanNode {
        PlanNode::Selection(SelectionNode {
            condition,
            input: Box::new(PlanNode::TableScan(ScanNode {
                table: "t".to_string(),
                alias: None,
            })),
        })
    }

    #[test]
    fn test_indexed_equality_becomes_seek() {
        let plan = selection_over_scan(Expr::column("a").eq(Expr::Literal(Value::Int(1))));
        let optimized = IndexSeekSubstitution.optimize(plan, &catalog()).unwrap();
        match optimized {
            PlanNode::IndexSeek(node) => {
                assert_eq!(node.table, "t");
                assert_eq!(node.column, "a");
                assert_eq!(node.key, Value::Int(1));
            }
            other => panic!("expected index seek, got {:?}", other),
        }
    }

    #[test]
    fn test_reversed_operands_are_recognized() {
        let plan = selection_over_scan(Expr::Literal(Value::Int(1)).eq(Expr::column("t.a")));
        let optimized = IndexSeekSubstitution.optimize(plan, &catalog()).unwrap();
        assert!(matches!(optimized, PlanNode::IndexSeek(_)));
    }

    #[test]
    fn test_unindexed_column_is_left_alone() {
        let plan = selection_over_scan(Expr::column("b").eq(Expr::Literal(Value::Int(10))));
        let optimized = IndexSeekSubstitution.optimize(plan, &catalog()).unwrap();
        assert!(matches!(optimized, PlanNode::Selection(_)));
    }

    #[test]
    fn test_range_condition_is_left_alone() {
        let plan = selection_over_scan(Expr::column("a").gt(Expr::Literal(Value::Int(0))));
        let optimized = IndexSeekSubstitution.optimize(plan, &catalog()).unwrap();
        assert!(matches!(optimized, PlanNode::Selection(_)));
    }
}
