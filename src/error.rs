//! Error types for the query engine

use thiserror::Error;

/// Result type alias for query engine operations
pub type Result<T> = std::result::Result<T, QueryError>;

/// Main error type for the query engine
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Index not found: {0}.{1}")]
    IndexNotFound(String, String),

    #[error("Column error: {0}")]
    ColumnIndex(String),

    #[error("Self join without renaming: {0}")]
    SelfJoinWithoutRenaming(String),

    #[error("Invalid alias: {0}")]
    InvalidAlias(String),

    #[error("Table schemas do not match: {0}")]
    TableSchemaDoesNotMatch(String),

    #[error("Join type not supported: {0}")]
    JoinTypeNotSupported(String),

    #[error("Join condition not supported: {0}")]
    JoinConditionNotSupported(String),

    #[error("Error in join condition: {0}")]
    JoinCondition(String),

    #[error("Index seek condition not supported: {0}")]
    IndexSeekConditionNotSupported(String),

    #[error("Error in index seek condition: {0}")]
    IndexSeekCondition(String),

    #[error("Table not sorted: {0}")]
    TableNotSorted(String),

    #[error("Incompatible operation: {0}")]
    IncompatibleOperation(String),

    #[error("Incompatible operand types: {0}")]
    IncompatibleOperandTypes(String),

    #[error("Aggregation error: {0}")]
    Aggregate(String),

    #[error("Load error: {0}")]
    Load(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
