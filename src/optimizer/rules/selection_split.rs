//! Splits conjunctive selections into chains of single-conjunct selections.

use crate::catalog::Catalog;
use crate::error::Result;
use crate::expr::Expr;
use crate::optimizer::OptimizerRule;
use crate::plan::{PlanNode, SelectionNode};

/// Rewrites `Selection(a and b and c)` into three stacked selections so each
/// conjunct can be pushed down independently. The last conjunct ends up
/// innermost.
pub struct SelectionSplit;

impl OptimizerRule for SelectionSplit {
    fn name(&self) -> &str {
        "SelectionSplit"
    }

    fn optimize(&self, plan: PlanNode, catalog: &Catalog) -> Result<PlanNode> {
        split(plan, catalog)
    }
}

fn split(plan: PlanNode, catalog: &Catalog) -> Result<PlanNode> {
    let plan = plan.map_children(&mut |child| split(child, catalog))?;
    if let PlanNode::Selection(node) = plan {
        if let Expr::Conjunctive(parts) = node.condition {
            let mut current = *node.input;
            for part in parts.into_iter().rev() {
                current = PlanNode::Selection(SelectionNode {
                    condition: part,
                    input: Box::new(current),
                });
            }
            return Ok(current);
        }
        return Ok(PlanNode::Selection(node));
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn scan() -> PlanNode {
        PlanNode::TableScan(crate::plan::ScanNode {
            table: "t".to_string(),
            alias: None,
        })
    }

    #[test]
    fn test_conjunction_becomes_chain_with_last_conjunct_innermost() {
        let first = Expr::column("a").eq(Expr::Literal(Value::Int(1)));
        let second = Expr::column("b").eq(Expr::Literal(Value::Int(2)));
        let plan = PlanNode::Selection(SelectionNode {
            condition: Expr::Conjunctive(vec![first.clone(), second.clone()]),
            input: Box::new(scan()),
        });
        let optimized = SelectionSplit.optimize(plan, &Catalog::new()).unwrap();
        match optimized {
            PlanNode::Selection(outer) => {
                assert_eq!(outer.condition, first);
                match *outer.input {
                    PlanNode::Selection(inner) => {
                        assert_eq!(inner.condition, second);
                        assert_eq!(*inner.input, scan());
                    }
                    other => panic!("expected inner selection, got {:?}", other),
                }
            }
            other => panic!("expected selection chain, got {:?}", other),
        }
    }
}
