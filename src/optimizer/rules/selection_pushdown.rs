//! Pushes selections as close to the scans as possible.

use crate::catalog::Catalog;
use crate::error::Result;
use crate::expr::Expr;
use crate::optimizer::OptimizerRule;
use crate::plan::{
    equi_column_pairs, HashJoinNode, JoinType, MergeJoinNode, NestedLoopsJoinNode, OrderingNode,
    PlanNode, ProjectionNode, SelectionNode, SetOpNode,
};
use crate::schema::Schema;

/// Moves each selection below projections, orderings, joins and set
/// operations whenever its columns are fully covered by the operand it would
/// move into. A selection that cannot move stays where it is.
pub struct SelectionPushdown;

impl OptimizerRule for SelectionPushdown {
    fn name(&self) -> &str {
        "SelectionPushdown"
    }

    fn optimize(&self, plan: PlanNode, catalog: &Catalog) -> Result<PlanNode> {
        pushdown(plan, catalog)
    }
}

fn pushdown(plan: PlanNode, catalog: &Catalog) -> Result<PlanNode> {
    let plan = plan.map_children(&mut |child| pushdown(child, catalog))?;
    if let PlanNode::Selection(node) = plan {
        push_selection(node.condition, *node.input, catalog)
    } else {
        Ok(plan)
    }
}

fn push_selection(condition: Expr, input: PlanNode, catalog: &Catalog) -> Result<PlanNode> {
    match input {
        PlanNode::Projection(node) => {
            let schema = node.schema(catalog)?;
            let rewritten = rewrite_columns(&condition, &|name| {
                let index = schema.column_index(name).ok()?;
                match &node.columns[index].expr {
                    Expr::Column(inner) => Some(inner.clone()),
                    _ => None,
                }
            });
            match rewritten {
                Some(condition) => {
                    let input = push_selection(condition, *node.input, catalog)?;
                    Ok(PlanNode::Projection(ProjectionNode {
                        columns: node.columns,
                        input: Box::new(input),
                    }))
                }
                None => keep(condition, PlanNode::Projection(node)),
            }
        }
        PlanNode::Ordering(node) => {
            let input = push_selection(condition, *node.input, catalog)?;
            Ok(PlanNode::Ordering(OrderingNode {
                columns: node.columns,
                input: Box::new(input),
            }))
        }
        PlanNode::NestedLoopsJoin(node) => {
            let NestedLoopsJoinNode {
                join_type,
                natural,
                condition: join_condition,
                left,
                right,
            } = node;
            let (left, right, leftover) = push_join(
                condition,
                join_type,
                join_condition.as_ref(),
                left,
                right,
                catalog,
            )?;
            finish(
                leftover,
                PlanNode::NestedLoopsJoin(NestedLoopsJoinNode {
                    join_type,
                    natural,
                    condition: join_condition,
                    left,
                    right,
                }),
            )
        }
        PlanNode::HashJoin(node) => {
            let HashJoinNode {
                join_type,
                condition: join_condition,
                left,
                right,
            } = node;
            let (left, right, leftover) = push_join(
                condition,
                join_type,
                Some(&join_condition),
                left,
                right,
                catalog,
            )?;
            finish(
                leftover,
                PlanNode::HashJoin(HashJoinNode {
                    join_type,
                    condition: join_condition,
                    left,
                    right,
                }),
            )
        }
        PlanNode::MergeJoin(node) => {
            let MergeJoinNode {
                join_type,
                condition: join_condition,
                left,
                right,
            } = node;
            let (left, right, leftover) = push_join(
                condition,
                join_type,
                Some(&join_condition),
                left,
                right,
                catalog,
            )?;
            finish(
                leftover,
                PlanNode::MergeJoin(MergeJoinNode {
                    join_type,
                    condition: join_condition,
                    left,
                    right,
                }),
            )
        }
        PlanNode::Union(node) => {
            let (node, leftover) = push_set_op(condition, node, catalog)?;
            finish(leftover, PlanNode::Union(node))
        }
        PlanNode::Intersect(node) => {
            let (node, leftover) = push_set_op(condition, node, catalog)?;
            finish(leftover, PlanNode::Intersect(node))
        }
        PlanNode::Except(node) => {
            let (node, leftover) = push_set_op(condition, node, catalog)?;
            finish(leftover, PlanNode::Except(node))
        }
        other => keep(condition, other),
    }
}

/// Pushes the condition into whichever join side resolves all of its
/// columns. A LEFT_OUTER join only accepts pushes into its left side since
/// its right rows can be padded in after the fact.
fn push_join(
    condition: Expr,
    join_type: JoinType,
    join_condition: Option<&Expr>,
    left: Box<PlanNode>,
    right: Box<PlanNode>,
    catalog: &Catalog,
) -> Result<(Box<PlanNode>, Box<PlanNode>, Option<Expr>)> {
    let left_schema = left.schema(catalog)?;
    let right_schema = right.schema(catalog)?;
    let columns = condition.columns();
    let left_covers = covers(&left_schema, &columns);
    let right_covers = covers(&right_schema, &columns);
    if left_covers
        && right_covers
        && join_type != JoinType::LeftOuter
        && both_sides_equated(&columns, join_condition, &left_schema, &right_schema)
    {
        let left = push_selection(condition.clone(), *left, catalog)?;
        let right = push_selection(condition, *right, catalog)?;
        Ok((Box::new(left), Box::new(right), None))
    } else if left_covers && !right_covers {
        let left = push_selection(condition, *left, catalog)?;
        Ok((Box::new(left), right, None))
    } else if right_covers && !left_covers && join_type != JoinType::LeftOuter {
        let right = push_selection(condition, *right, catalog)?;
        Ok((left, Box::new(right), None))
    } else {
        Ok((left, right, Some(condition)))
    }
}

/// A condition may be duplicated into both join operands only when the join
/// condition equates, column for column, the left and right resolutions of
/// every column the condition references. Without that guarantee the two
/// sides would be filtered on unrelated columns.
fn both_sides_equated(
    columns: &[&str],
    join_condition: Option<&Expr>,
    left: &Schema,
    right: &Schema,
) -> bool {
    let Some(join_condition) = join_condition else {
        return false;
    };
    let Ok(pairs) = equi_column_pairs(join_condition, left, right) else {
        return false;
    };
    columns.iter().all(|column| {
        let Ok(left_index) = left.column_index(column) else {
            return false;
        };
        let Ok(right_index) = right.column_index(column) else {
            return false;
        };
        pairs.iter().any(|(l, r)| {
            left.column_index(l).ok() == Some(left_index)
                && right.column_index(r).ok() == Some(right_index)
        })
    })
}

/// Pushes the condition into both branches of a set operation, rewriting
/// its columns positionally for the right branch.
fn push_set_op(
    condition: Expr,
    node: SetOpNode,
    catalog: &Catalog,
) -> Result<(SetOpNode, Option<Expr>)> {
    let left_schema = node.left.schema(catalog)?;
    let right_schema = node.right.schema(catalog)?;
    let for_right = rewrite_columns(&condition, &|name| {
        let index = left_schema.column_index(name).ok()?;
        Some(right_schema.column_names()[index].clone())
    });
    match for_right {
        Some(for_right) => {
            let left = push_selection(condition, *node.left, catalog)?;
            let right = push_selection(for_right, *node.right, catalog)?;
            Ok((
                SetOpNode {
                    left: Box::new(left),
                    right: Box::new(right),
                },
                None,
            ))
        }
        None => Ok((node, Some(condition))),
    }
}

fn covers(schema: &Schema, columns: &[&str]) -> bool {
    !columns.is_empty() && columns.iter().all(|column| schema.resolves(column))
}

/// Rewrites every column reference through `f`, bailing out with `None` as
/// soon as any reference cannot be rewritten.
fn rewrite_columns(expr: &Expr, f: &impl Fn(&str) -> Option<String>) -> Option<Expr> {
    Some(match expr {
        Expr::Literal(value) => Expr::Literal(value.clone()),
        Expr::Column(name) => Expr::Column(f(name)?),
        Expr::Arithmetic { left, op, right } => Expr::Arithmetic {
            left: Box::new(rewrite_columns(left, f)?),
            op: *op,
            right: Box::new(rewrite_columns(right, f)?),
        },
        Expr::Comparative { left, op, right } => Expr::Comparative {
            left: Box::new(rewrite_columns(left, f)?),
            op: *op,
            right: Box::new(rewrite_columns(right, f)?),
        },
        Expr::Conjunctive(parts) => Expr::Conjunctive(
            parts
                .iter()
                .map(|part| rewrite_columns(part, f))
                .collect::<Option<Vec<_>>>()?,
        ),
        Expr::Disjunctive(parts) => Expr::Disjunctive(
            parts
                .iter()
                .map(|part| rewrite_columns(part, f))
                .collect::<Option<Vec<_>>>()?,
        ),
    })
}

fn finish(leftover: Option<Expr>, plan: PlanNode) -> Result<PlanNode> {
    match leftover {
        Some(condition) => keep(condition, plan),
        None => Ok(plan),
    }
}

fn keep(condition: Expr, input: PlanNode) -> Result<PlanNode> {
    Ok(PlanNode::Selection(SelectionNode {
        condition,
        input: Box::new(input),
    }))
}
