//! Rule-based plan optimizer.
//!
//! A fixed, ordered rule list is applied exactly once per plan. Every rule
//! is a pure rewrite that must preserve the result multiset; only row order
//! and operator shape may change.

mod rules;

pub use rules::{IndexSeekSubstitution, SelectionPushdown, SelectionSplit, SimplifyPass};

use crate::catalog::Catalog;
use crate::error::Result;
use crate::plan::PlanNode;

/// A single plan rewrite.
pub trait OptimizerRule {
    /// Name of this rule, used in logging.
    fn name(&self) -> &str;

    /// Apply this rule to the plan.
    fn optimize(&self, plan: PlanNode, catalog: &Catalog) -> Result<PlanNode>;
}

/// Applies the rule list in order, once.
pub struct Optimizer {
    rules: Vec<Box<dyn OptimizerRule>>,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(SimplifyPass),
                Box::new(SelectionSplit),
                Box::new(SelectionPushdown),
                Box::new(IndexSeekSubstitution),
            ],
        }
    }

    pub fn optimize(&self, plan: PlanNode, catalog: &Catalog) -> Result<PlanNode> {
        let mut current = plan;
        for rule in &self.rules {
            current = rule.optimize(current, catalog)?;
            tracing::debug!(rule = rule.name(), "applied optimizer rule");
        }
        Ok(current)
    }
}
