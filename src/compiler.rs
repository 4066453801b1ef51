//! Lowers the parsed AST into the physical operator tree.
//!
//! Validation that only needs schemas happens here, before any row is
//! touched: self joins without renaming, set operand schema mismatches,
//! unsupported hash/merge join conditions, unsorted merge join operands and
//! invalid aliases all surface at compile time.

use crate::catalog::Catalog;
use crate::error::{QueryError, Result};
use crate::expr::Expr;
use crate::parser::{
    AggregateItem, ColumnItem, ExprAst, JoinOpAst, QueryAst, SetOpAst,
};
use crate::plan::{
    check_sorted, equi_column_pairs, natural_condition, AggregateColumn, AggregateFunction,
    AggregateNode, DistinctNode, ExplainNode, HashJoinNode, JoinType, MergeJoinNode,
    NestedLoopsJoinNode, OrderingNode, PlanNode, ProjectionItem, ProjectionNode, ScanNode,
    SelectionNode, SetOpNode,
};

pub struct Compiler<'a> {
    catalog: &'a Catalog,
}

impl<'a> Compiler<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn compile(&self, ast: &QueryAst) -> Result<PlanNode> {
        let plan = self.lower(ast)?;
        // deriving the root schema walks the whole tree and flushes out any
        // remaining schema-level error before evaluation starts
        plan.schema(self.catalog)?;
        Ok(plan)
    }

    fn lower(&self, ast: &QueryAst) -> Result<PlanNode> {
        match ast {
            QueryAst::Relation { name, alias } => Ok(PlanNode::TableScan(ScanNode {
                table: name.clone(),
                alias: alias.clone(),
            })),
            QueryAst::Projection {
                distinct,
                columns,
                input,
            } => {
                let input = self.lower(input)?;
                let columns = columns.iter().map(lower_column_item).collect::<Result<_>>()?;
                let projection = PlanNode::Projection(ProjectionNode {
                    columns,
                    input: Box::new(input),
                });
                Ok(if *distinct {
                    PlanNode::HashDistinct(DistinctNode {
                        input: Box::new(projection),
                    })
                } else {
                    projection
                })
            }
            QueryAst::Selection { condition, input } => Ok(PlanNode::Selection(SelectionNode {
                condition: lower_expr(condition),
                input: Box::new(self.lower(input)?),
            })),
            QueryAst::Grouping {
                group_columns,
                aggregates,
                input,
            } => {
                let aggregates = aggregates
                    .iter()
                    .map(lower_aggregate_item)
                    .collect::<Result<_>>()?;
                Ok(PlanNode::HashAggregate(AggregateNode {
                    group_columns: group_columns.clone(),
                    aggregates,
                    input: Box::new(self.lower(input)?),
                }))
            }
            QueryAst::Ordering { columns, input } => Ok(PlanNode::Ordering(OrderingNode {
                columns: columns.clone(),
                input: Box::new(self.lower(input)?),
            })),
            QueryAst::Join {
                op,
                condition,
                left,
                right,
            } => self.lower_join(*op, condition.as_ref(), left, right),
            QueryAst::SetOp { op, left, right } => {
                let node = SetOpNode {
                    left: Box::new(self.lower(left)?),
                    right: Box::new(self.lower(right)?),
                };
                Ok(match op {
                    SetOpAst::Union => PlanNode::Union(node),
                    SetOpAst::Intersect => PlanNode::Intersect(node),
                    SetOpAst::Except => PlanNode::Except(node),
                })
            }
            QueryAst::Explain { input } => {
                let input = self.lower(input)?;
                input.schema(self.catalog)?;
                Ok(PlanNode::Explain(ExplainNode {
                    input: Box::new(input),
                }))
            }
        }
    }

    fn lower_join(
        &self,
        op: JoinOpAst,
        condition: Option<&ExprAst>,
        left: &QueryAst,
        right: &QueryAst,
    ) -> Result<PlanNode> {
        let left = self.lower(left)?;
        let right = self.lower(right)?;
        let left_schema = left.schema(self.catalog)?;
        let right_schema = right.schema(self.catalog)?;
        let condition = condition.map(lower_expr);

        match op {
            JoinOpAst::Cross => Ok(PlanNode::NestedLoopsJoin(NestedLoopsJoinNode {
                join_type: JoinType::Cross,
                natural: false,
                condition: None,
                left: Box::new(left),
                right: Box::new(right),
            })),
            JoinOpAst::Inner | JoinOpAst::LeftOuter => {
                let condition = condition.ok_or_else(|| {
                    QueryError::JoinConditionNotSupported("join requires a condition".to_string())
                })?;
                for column in condition.columns() {
                    // each referenced column must live on exactly one side
                    if left_schema.resolves(column) == right_schema.resolves(column) {
                        return Err(QueryError::JoinCondition(format!(
                            "column {column} must resolve in exactly one operand"
                        )));
                    }
                }
                Ok(PlanNode::NestedLoopsJoin(NestedLoopsJoinNode {
                    join_type: join_type(op),
                    natural: false,
                    condition: Some(condition),
                    left: Box::new(left),
                    right: Box::new(right),
                }))
            }
            JoinOpAst::NaturalInner | JoinOpAst::NaturalLeftOuter => {
                let condition = natural_condition(&left_schema, &right_schema);
                // no shared column names silently downgrades to CROSS
                let join_type = if condition.is_some() {
                    join_type(op)
                } else {
                    JoinType::Cross
                };
                Ok(PlanNode::NestedLoopsJoin(NestedLoopsJoinNode {
                    join_type,
                    natural: true,
                    condition,
                    left: Box::new(left),
                    right: Box::new(right),
                }))
            }
            JoinOpAst::HashInner | JoinOpAst::HashLeftOuter => {
                let condition = condition.ok_or_else(|| {
                    QueryError::JoinTypeNotSupported(
                        "hash join does not support CROSS".to_string(),
                    )
                })?;
                equi_column_pairs(&condition, &left_schema, &right_schema)?;
                Ok(PlanNode::HashJoin(HashJoinNode {
                    join_type: join_type(op),
                    condition,
                    left: Box::new(left),
                    right: Box::new(right),
                }))
            }
            JoinOpAst::MergeInner | JoinOpAst::MergeLeftOuter => {
                let condition = condition.ok_or_else(|| {
                    QueryError::JoinConditionNotSupported(
                        "merge join requires a condition".to_string(),
                    )
                })?;
                let pairs = equi_column_pairs(&condition, &left_schema, &right_schema)?;
                let left_columns: Vec<String> = pairs.iter().map(|(l, _)| l.clone()).collect();
                let right_columns: Vec<String> = pairs.iter().map(|(_, r)| r.clone()).collect();
                check_sorted(&left, &left_columns, self.catalog)?;
                check_sorted(&right, &right_columns, self.catalog)?;
                Ok(PlanNode::MergeJoin(MergeJoinNode {
                    join_type: join_type(op),
                    condition,
                    left: Box::new(left),
                    right: Box::new(right),
                }))
            }
        }
    }
}

fn join_type(op: JoinOpAst) -> JoinType {
    match op {
        JoinOpAst::Cross => JoinType::Cross,
        JoinOpAst::Inner
        | JoinOpAst::NaturalInner
        | JoinOpAst::HashInner
        | JoinOpAst::MergeInner => JoinType::Inner,
        JoinOpAst::LeftOuter
        | JoinOpAst::NaturalLeftOuter
        | JoinOpAst::HashLeftOuter
        | JoinOpAst::MergeLeftOuter => JoinType::LeftOuter,
    }
}

fn lower_column_item(item: &ColumnItem) -> Result<ProjectionItem> {
    if let Some(alias) = &item.alias {
        if alias.contains('.') {
            return Err(QueryError::InvalidAlias(alias.clone()));
        }
    }
    Ok(ProjectionItem {
        alias: item.alias.clone(),
        expr: lower_expr(&item.expr),
    })
}

fn lower_aggregate_item(item: &AggregateItem) -> Result<AggregateColumn> {
    if item.alias.contains('.') {
        return Err(QueryError::InvalidAlias(item.alias.clone()));
    }
    let function = AggregateFunction::parse(&item.function).ok_or_else(|| {
        QueryError::Aggregate(format!("unknown aggregate function: {}", item.function))
    })?;
    Ok(AggregateColumn {
        alias: item.alias.clone(),
        function,
        expr: lower_expr(&item.expr),
    })
}

fn lower_expr(ast: &ExprAst) -> Expr {
    match ast {
        ExprAst::Literal(value) => Expr::Literal(value.clone()),
        ExprAst::Column(name) => Expr::Column(name.clone()),
        ExprAst::Arithmetic { left, op, right } => Expr::Arithmetic {
            left: Box::new(lower_expr(left)),
            op: *op,
            right: Box::new(lower_expr(right)),
        },
        ExprAst::Comparative { left, op, right } => Expr::Comparative {
            left: Box::new(lower_expr(left)),
            op: *op,
            right: Box::new(lower_expr(right)),
        },
        ExprAst::And(parts) => Expr::Conjunctive(parts.iter().map(lower_expr).collect()),
        ExprAst::Or(parts) => Expr::Disjunctive(parts.iter().map(lower_expr).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_query;
    use crate::schema::Schema;
    use crate::table::Table;
    use crate::value::{SchemaType, Value};

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.register(Table::new(
            Schema::new(
                "studenten",
                vec![
                    ("MatrNr".to_string(), SchemaType::Int),
                    ("Name".to_string(), SchemaType::Varchar),
                ],
            ),
            vec![vec![Value::Int(1), Value::Varchar("a".into())]],
        ));
        catalog.register(Table::new(
            Schema::new(
                "hoeren",
                vec![
                    ("MatrNr".to_string(), SchemaType::Int),
                    ("VorlNr".to_string(), SchemaType::Int),
                ],
            ),
            vec![vec![Value::Int(1), Value::Int(2)]],
        ));
        catalog
    }

    fn compile(catalog: &Catalog, text: &str) -> Result<PlanNode> {
        Compiler::new(catalog).compile(&parse_query(text)?)
    }

    #[test]
    fn test_distinct_wraps_projection() {
        let catalog = catalog();
        let plan = compile(&catalog, "pi distinct Name studenten").unwrap();
        assert!(matches!(plan, PlanNode::HashDistinct(_)));
    }

    #[test]
    fn test_self_join_requires_alias() {
        let catalog = catalog();
        let err = compile(&catalog, "studenten cross join studenten").unwrap_err();
        assert!(matches!(err, QueryError::SelfJoinWithoutRenaming(_)));
        assert!(compile(&catalog, "studenten cross join studenten as s").is_ok());
    }

    #[test]
    fn test_natural_join_synthesizes_condition() {
        let catalog = catalog();
        let plan = compile(&catalog, "studenten natural join hoeren").unwrap();
        match plan {
            PlanNode::NestedLoopsJoin(node) => {
                assert_eq!(node.join_type, JoinType::Inner);
                assert!(node.natural);
                match node.condition.unwrap() {
                    Expr::Comparative { left, right, .. } => {
                        assert_eq!(*left, Expr::Column("studenten.MatrNr".to_string()));
                        assert_eq!(*right, Expr::Column("hoeren.MatrNr".to_string()));
                    }
                    other => panic!("expected a single equality, got {:?}", other),
                }
            }
            other => panic!("expected nested loops join, got {:?}", other),
        }
    }

    #[test]
    fn test_natural_join_without_common_columns_downgrades_to_cross() {
        let mut catalog = catalog();
        catalog.register(Table::new(
            Schema::new("farben", vec![("Farbe".to_string(), SchemaType::Varchar)]),
            vec![],
        ));
        let plan = compile(&catalog, "studenten natural join farben").unwrap();
        match plan {
            PlanNode::NestedLoopsJoin(node) => {
                assert_eq!(node.join_type, JoinType::Cross);
                assert_eq!(node.condition, None);
            }
            other => panic!("expected nested loops join, got {:?}", other),
        }
    }

    #[test]
    fn test_hash_join_rejects_non_equality_conditions() {
        let catalog = catalog();
        let err = compile(
            &catalog,
            "studenten hash join studenten.MatrNr < hoeren.MatrNr hoeren",
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::JoinConditionNotSupported(_)));
    }

    #[test]
    fn test_merge_join_requires_sorted_operands() {
        let catalog = catalog();
        let err = compile(
            &catalog,
            "studenten merge join studenten.MatrNr = hoeren.MatrNr hoeren",
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::TableNotSorted(_)));

        let plan = compile(
            &catalog,
            "(tau MatrNr studenten) merge join studenten.MatrNr = hoeren.MatrNr (tau MatrNr hoeren)",
        );
        assert!(plan.is_ok());
    }

    #[test]
    fn test_dotted_alias_is_rejected() {
        let catalog = catalog();
        let err = compile(&catalog, "pi x.y as MatrNr studenten").unwrap_err();
        assert!(matches!(err, QueryError::InvalidAlias(_)));
    }

    #[test]
    fn test_set_op_schema_mismatch() {
        let catalog = catalog();
        let err = compile(&catalog, "studenten union hoeren").unwrap_err();
        assert!(matches!(err, QueryError::TableSchemaDoesNotMatch(_)));
    }

    #[test]
    fn test_unknown_table() {
        let catalog = catalog();
        let err = compile(&catalog, "pi Name unbekannt").unwrap_err();
        assert!(matches!(err, QueryError::TableNotFound(_)));
    }
}
