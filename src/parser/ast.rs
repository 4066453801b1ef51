//! Abstract syntax tree produced by the query parser. The compiler lowers
//! these nodes into the physical plan; no name resolution happens here.

use crate::value::{ArithmeticOp, ComparativeOp, Value};

/// One parsed statement.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryAst {
    Relation {
        name: String,
        alias: Option<String>,
    },
    Projection {
        distinct: bool,
        columns: Vec<ColumnItem>,
        input: Box<QueryAst>,
    },
    Selection {
        condition: ExprAst,
        input: Box<QueryAst>,
    },
    Grouping {
        group_columns: Vec<String>,
        aggregates: Vec<AggregateItem>,
        input: Box<QueryAst>,
    },
    Ordering {
        columns: Vec<String>,
        input: Box<QueryAst>,
    },
    Join {
        op: JoinOpAst,
        condition: Option<ExprAst>,
        left: Box<QueryAst>,
        right: Box<QueryAst>,
    },
    SetOp {
        op: SetOpAst,
        left: Box<QueryAst>,
        right: Box<QueryAst>,
    },
    Explain {
        input: Box<QueryAst>,
    },
}

/// `[alias as] expression` inside a projection list.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnItem {
    pub alias: Option<String>,
    pub expr: ExprAst,
}

/// `alias as func(expression)` inside a grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateItem {
    pub alias: String,
    pub function: String,
    pub expr: ExprAst,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprAst {
    Literal(Value),
    Column(String),
    Arithmetic {
        left: Box<ExprAst>,
        op: ArithmeticOp,
        right: Box<ExprAst>,
    },
    Comparative {
        left: Box<ExprAst>,
        op: ComparativeOp,
        right: Box<ExprAst>,
    },
    And(Vec<ExprAst>),
    Or(Vec<ExprAst>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOpAst {
    Cross,
    Inner,
    LeftOuter,
    NaturalInner,
    NaturalLeftOuter,
    HashInner,
    HashLeftOuter,
    MergeInner,
    MergeLeftOuter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOpAst {
    Union,
    Intersect,
    Except,
}
