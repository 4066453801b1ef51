//! Relational-algebra query engine
//!
//! Parses a textual relational-algebra language, compiles it to a tree of
//! physical operators, improves the tree with a rule-based optimizer, and
//! evaluates it against in-memory tables.

pub mod catalog;
pub mod cli;
pub mod compiler;
pub mod error;
pub mod execution;
pub mod expr;
pub mod optimizer;
pub mod parser;
pub mod plan;
pub mod schema;
pub mod table;
pub mod value;

// Re-export main types
pub use catalog::Catalog;
pub use compiler::Compiler;
pub use error::{QueryError, Result};
pub use execution::{ExecutionContext, QueryResult};
pub use optimizer::Optimizer;
pub use plan::PlanNode;
pub use table::Table;
