//! Physical operator tree.
//!
//! `PlanNode` is a closed enum over every operator the engine executes. Each
//! variant owns its children, and the enum exposes the four operations the
//! rest of the crate is written against: `schema` (derive the result schema
//! without touching rows), `evaluate` (produce the result table), `simplify`
//! (local constant folding) and `explain_into` (the textual plan rendering).
//! `map_children` is the structural rebuild primitive the optimizer rules
//! use to traverse the tree generically.

mod aggregate;
mod explain;
mod hash_join;
mod join;
mod merge_join;
mod ordering;
mod projection;
mod scan;
mod selection;
mod set_op;

pub use aggregate::{AggregateColumn, AggregateFunction, AggregateNode};
pub use explain::ExplainNode;
pub use hash_join::{equi_column_pairs, HashJoinNode};
pub use join::{
    check_self_join, combined_schema, join_schema, natural_condition, JoinType,
    NestedLoopsJoinNode,
};
pub use merge_join::{check_sorted, MergeJoinNode};
pub use ordering::{DistinctNode, OrderingNode};
pub use projection::{ProjectionItem, ProjectionNode};
pub use scan::{IndexSeekNode, ScanNode};
pub use selection::SelectionNode;
pub use set_op::{SetOpKind, SetOpNode};

use crate::catalog::Catalog;
use crate::error::Result;
use crate::expr::Expr;
use crate::schema::Schema;
use crate::table::Table;
use crate::value::{Row, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum PlanNode {
    TableScan(ScanNode),
    IndexSeek(IndexSeekNode),
    Selection(SelectionNode),
    Projection(ProjectionNode),
    Ordering(OrderingNode),
    HashDistinct(DistinctNode),
    HashAggregate(AggregateNode),
    NestedLoopsJoin(NestedLoopsJoinNode),
    HashJoin(HashJoinNode),
    MergeJoin(MergeJoinNode),
    Union(SetOpNode),
    Intersect(SetOpNode),
    Except(SetOpNode),
    Explain(ExplainNode),
}

impl PlanNode {
    /// Derive the result schema without evaluating any data.
    pub fn schema(&self, catalog: &Catalog) -> Result<Schema> {
        match self {
            PlanNode::TableScan(node) => node.schema(catalog),
            PlanNode::IndexSeek(node) => node.schema(catalog),
            PlanNode::Selection(node) => node.schema(catalog),
            PlanNode::Projection(node) => node.schema(catalog),
            PlanNode::Ordering(node) => node.schema(catalog),
            PlanNode::HashDistinct(node) => node.schema(catalog),
            PlanNode::HashAggregate(node) => node.schema(catalog),
            PlanNode::NestedLoopsJoin(node) => node.schema(catalog),
            PlanNode::HashJoin(node) => node.schema(catalog),
            PlanNode::MergeJoin(node) => node.schema(catalog),
            PlanNode::Union(node) | PlanNode::Intersect(node) | PlanNode::Except(node) => {
                node.schema(catalog)
            }
            PlanNode::Explain(node) => node.schema(catalog),
        }
    }

    /// Produce the result table.
    pub fn evaluate(&self, catalog: &Catalog) -> Result<Table> {
        match self {
            PlanNode::TableScan(node) => node.evaluate(catalog),
            PlanNode::IndexSeek(node) => node.evaluate(catalog),
            PlanNode::Selection(node) => node.evaluate(catalog),
            PlanNode::Projection(node) => node.evaluate(catalog),
            PlanNode::Ordering(node) => node.evaluate(catalog),
            PlanNode::HashDistinct(node) => node.evaluate(catalog),
            PlanNode::HashAggregate(node) => node.evaluate(catalog),
            PlanNode::NestedLoopsJoin(node) => node.evaluate(catalog),
            PlanNode::HashJoin(node) => node.evaluate(catalog),
            PlanNode::MergeJoin(node) => node.evaluate(catalog),
            PlanNode::Union(node) => node.evaluate(catalog, SetOpKind::Union),
            PlanNode::Intersect(node) => node.evaluate(catalog, SetOpKind::Intersect),
            PlanNode::Except(node) => node.evaluate(catalog, SetOpKind::Except),
            PlanNode::Explain(node) => node.evaluate(catalog),
        }
    }

    /// Fold constants in every embedded expression and drop selections whose
    /// condition simplifies to a truthy literal.
    pub fn simplify(self) -> PlanNode {
        match self {
            PlanNode::TableScan(_) | PlanNode::IndexSeek(_) => self,
            PlanNode::Selection(node) => {
                let condition = node.condition.simplify();
                let input = node.input.simplify();
                if let Expr::Literal(value) = &condition {
                    if value.is_truthy() {
                        return input;
                    }
                }
                PlanNode::Selection(SelectionNode {
                    condition,
                    input: Box::new(input),
                })
            }
            PlanNode::Projection(node) => PlanNode::Projection(ProjectionNode {
                columns: node
                    .columns
                    .into_iter()
                    .map(|item| ProjectionItem {
                        alias: item.alias,
                        expr: item.expr.simplify(),
                    })
                    .collect(),
                input: Box::new(node.input.simplify()),
            }),
            PlanNode::Ordering(node) => PlanNode::Ordering(OrderingNode {
                columns: node.columns,
                input: Box::new(node.input.simplify()),
            }),
            PlanNode::HashDistinct(node) => PlanNode::HashDistinct(DistinctNode {
                input: Box::new(node.input.simplify()),
            }),
            PlanNode::HashAggregate(node) => PlanNode::HashAggregate(AggregateNode {
                group_columns: node.group_columns,
                aggregates: node
                    .aggregates
                    .into_iter()
                    .map(|aggregate| AggregateColumn {
                        alias: aggregate.alias,
                        function: aggregate.function,
                        expr: aggregate.expr.simplify(),
                    })
                    .collect(),
                input: Box::new(node.input.simplify()),
            }),
            PlanNode::NestedLoopsJoin(node) => PlanNode::NestedLoopsJoin(NestedLoopsJoinNode {
                join_type: node.join_type,
                natural: node.natural,
                condition: node.condition.map(Expr::simplify),
                left: Box::new(node.left.simplify()),
                right: Box::new(node.right.simplify()),
            }),
            PlanNode::HashJoin(node) => PlanNode::HashJoin(HashJoinNode {
                join_type: node.join_type,
                condition: node.condition,
                left: Box::new(node.left.simplify()),
                right: Box::new(node.right.simplify()),
            }),
            PlanNode::MergeJoin(node) => PlanNode::MergeJoin(MergeJoinNode {
                join_type: node.join_type,
                condition: node.condition,
                left: Box::new(node.left.simplify()),
                right: Box::new(node.right.simplify()),
            }),
            PlanNode::Union(node) => PlanNode::Union(simplify_set_op(node)),
            PlanNode::Intersect(node) => PlanNode::Intersect(simplify_set_op(node)),
            PlanNode::Except(node) => PlanNode::Except(simplify_set_op(node)),
            PlanNode::Explain(node) => PlanNode::Explain(ExplainNode {
                input: Box::new(node.input.simplify()),
            }),
        }
    }

    /// Rebuild this node with each direct child replaced by `f(child)`.
    pub fn map_children<F>(self, f: &mut F) -> Result<PlanNode>
    where
        F: FnMut(PlanNode) -> Result<PlanNode>,
    {
        Ok(match self {
            PlanNode::TableScan(_) | PlanNode::IndexSeek(_) => self,
            PlanNode::Selection(node) => PlanNode::Selection(SelectionNode {
                condition: node.condition,
                input: Box::new(f(*node.input)?),
            }),
            PlanNode::Projection(node) => PlanNode::Projection(ProjectionNode {
                columns: node.columns,
                input: Box::new(f(*node.input)?),
            }),
            PlanNode::Ordering(node) => PlanNode::Ordering(OrderingNode {
                columns: node.columns,
                input: Box::new(f(*node.input)?),
            }),
            PlanNode::HashDistinct(node) => PlanNode::HashDistinct(DistinctNode {
                input: Box::new(f(*node.input)?),
            }),
            PlanNode::HashAggregate(node) => PlanNode::HashAggregate(AggregateNode {
                group_columns: node.group_columns,
                aggregates: node.aggregates,
                input: Box::new(f(*node.input)?),
            }),
            PlanNode::NestedLoopsJoin(node) => PlanNode::NestedLoopsJoin(NestedLoopsJoinNode {
                join_type: node.join_type,
                natural: node.natural,
                condition: node.condition,
                left: Box::new(f(*node.left)?),
                right: Box::new(f(*node.right)?),
            }),
            PlanNode::HashJoin(node) => PlanNode::HashJoin(HashJoinNode {
                join_type: node.join_type,
                condition: node.condition,
                left: Box::new(f(*node.left)?),
                right: Box::new(f(*node.right)?),
            }),
            PlanNode::MergeJoin(node) => PlanNode::MergeJoin(MergeJoinNode {
                join_type: node.join_type,
                condition: node.condition,
                left: Box::new(f(*node.left)?),
                right: Box::new(f(*node.right)?),
            }),
            PlanNode::Union(node) => PlanNode::Union(map_set_op(node, f)?),
            PlanNode::Intersect(node) => PlanNode::Intersect(map_set_op(node, f)?),
            PlanNode::Except(node) => PlanNode::Except(map_set_op(node, f)?),
            PlanNode::Explain(node) => PlanNode::Explain(ExplainNode {
                input: Box::new(f(*node.input)?),
            }),
        })
    }

    /// Borrow the direct children.
    pub fn children(&self) -> Vec<&PlanNode> {
        match self {
            PlanNode::TableScan(_) | PlanNode::IndexSeek(_) => vec![],
            PlanNode::Selection(node) => vec![&node.input],
            PlanNode::Projection(node) => vec![&node.input],
            PlanNode::Ordering(node) => vec![&node.input],
            PlanNode::HashDistinct(node) => vec![&node.input],
            PlanNode::HashAggregate(node) => vec![&node.input],
            PlanNode::NestedLoopsJoin(node) => vec![&node.left, &node.right],
            PlanNode::HashJoin(node) => vec![&node.left, &node.right],
            PlanNode::MergeJoin(node) => vec![&node.left, &node.right],
            PlanNode::Union(node) | PlanNode::Intersect(node) | PlanNode::Except(node) => {
                vec![&node.left, &node.right]
            }
            PlanNode::Explain(node) => vec![&node.input],
        }
    }

    /// One-line `NodeType(params)` description used by explain output.
    pub fn repr(&self) -> String {
        match self {
            PlanNode::TableScan(node) => node.repr(),
            PlanNode::IndexSeek(node) => node.repr(),
            PlanNode::Selection(node) => node.repr(),
            PlanNode::Projection(node) => node.repr(),
            PlanNode::Ordering(node) => node.repr(),
            PlanNode::HashDistinct(node) => node.repr(),
            PlanNode::HashAggregate(node) => node.repr(),
            PlanNode::NestedLoopsJoin(node) => node.repr(),
            PlanNode::HashJoin(node) => node.repr(),
            PlanNode::MergeJoin(node) => node.repr(),
            PlanNode::Union(_) => SetOpKind::Union.repr().to_string(),
            PlanNode::Intersect(_) => SetOpKind::Intersect.repr().to_string(),
            PlanNode::Except(_) => SetOpKind::Except.repr().to_string(),
            PlanNode::Explain(_) => "Explain".to_string(),
        }
    }

    /// Append the indentation-coded description of this subtree. Children
    /// are rendered two dash columns deeper than their parent; an Explain
    /// node passes straight through to its child.
    pub fn explain_into(&self, rows: &mut Vec<Row>, indent: usize) {
        if let PlanNode::Explain(node) = self {
            node.input.explain_into(rows, indent);
            return;
        }
        let line = if indent == 0 {
            self.repr()
        } else {
            format!("{}->{}", "-".repeat(indent - 2), self.repr())
        };
        rows.push(vec![Value::Varchar(line)]);
        for child in self.children() {
            child.explain_into(rows, indent + 2);
        }
    }
}

fn simplify_set_op(node: SetOpNode) -> SetOpNode {
    SetOpNode {
        left: Box::new(node.left.simplify()),
        right: Box::new(node.right.simplify()),
    }
}

fn map_set_op<F>(node: SetOpNode, f: &mut F) -> Result<SetOpNode>
where
    F: FnMut(PlanNode) -> Result<PlanNode>,
{
    Ok(SetOpNode {
        left: Box::new(f(*node.left)?),
        right: Box::new(f(*node.right)?),
    })
}
