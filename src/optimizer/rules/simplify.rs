//! Constant folding over the whole plan.

use crate::catalog::Catalog;
use crate::error::Result;
use crate::optimizer::OptimizerRule;
use crate::plan::PlanNode;

/// Runs `simplify()` over the plan tree: expression constant folding plus
/// elimination of selections whose condition is always true.
pub struct SimplifyPass;

impl OptimizerRule for SimplifyPass {
    fn name(&self) -> &str {
        "SimplifyPass"
    }

    fn optimize(&self, plan: PlanNode, _catalog: &Catalog) -> Result<PlanNode> {
        Ok(plan.simplify())
    }
}
