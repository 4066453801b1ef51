//! Optimizer rules

mod index_substitution;
mod selection_pushdown;
mod selection_split;
mod simplify;

pub use index_substitution::IndexSeekSubstitution;
pub use selection_pushdown::SelectionPushdown;
pub use selection_split::SelectionSplit;
pub use simplify::SimplifyPass;
