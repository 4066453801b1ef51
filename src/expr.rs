//! Scalar expression tree: per-row evaluation, static type inference and
//! algebraic simplification

use crate::error::Result;
use crate::schema::Schema;
use crate::table::Table;
use crate::value::{self, ArithmeticOp, ComparativeOp, SchemaType, Value};
use std::fmt;

/// A scalar expression. `Literal` and `Column` are schema-independent; the
/// computation variants need a `(table, row)` pair to evaluate. Column names
/// resolve lazily at the point of use, so expressions can be built before the
/// consuming operator's schema is final.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Column(String),
    Arithmetic {
        left: Box<Expr>,
        op: ArithmeticOp,
        right: Box<Expr>,
    },
    Comparative {
        left: Box<Expr>,
        op: ComparativeOp,
        right: Box<Expr>,
    },
    Conjunctive(Vec<Expr>),
    Disjunctive(Vec<Expr>),
}

impl Expr {
    pub fn literal(value: Value) -> Self {
        Expr::Literal(value)
    }

    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    pub fn eq(self, other: Expr) -> Self {
        Expr::Comparative {
            left: Box::new(self),
            op: ComparativeOp::Eq,
            right: Box::new(other),
        }
    }

    pub fn gt(self, other: Expr) -> Self {
        Expr::Comparative {
            left: Box::new(self),
            op: ComparativeOp::Gt,
            right: Box::new(other),
        }
    }

    pub fn add(self, other: Expr) -> Self {
        Expr::Arithmetic {
            left: Box::new(self),
            op: ArithmeticOp::Add,
            right: Box::new(other),
        }
    }

    /// Evaluate against one record of a table.
    pub fn evaluate(&self, table: &Table, row: usize) -> Result<Value> {
        match self {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Column(name) => {
                let index = table.schema().column_index(name)?;
                Ok(table.rows()[row][index].clone())
            }
            Expr::Arithmetic { left, op, right } => {
                let l = left.evaluate(table, row)?;
                let r = right.evaluate(table, row)?;
                value::arithmetic(&l, *op, &r)
            }
            Expr::Comparative { left, op, right } => {
                let l = left.evaluate(table, row)?;
                let r = right.evaluate(table, row)?;
                Ok(Value::Int(value::compare(&l, *op, &r)? as i64))
            }
            Expr::Conjunctive(parts) => {
                for part in parts {
                    if !part.evaluate(table, row)?.is_truthy() {
                        return Ok(Value::Int(0));
                    }
                }
                Ok(Value::Int(1))
            }
            Expr::Disjunctive(parts) => {
                for part in parts {
                    if part.evaluate(table, row)?.is_truthy() {
                        return Ok(Value::Int(1));
                    }
                }
                Ok(Value::Int(0))
            }
        }
    }

    /// Infer the result type against a schema without touching any rows.
    pub fn schema_type(&self, schema: &Schema) -> Result<SchemaType> {
        match self {
            Expr::Literal(v) => Ok(v.schema_type()),
            Expr::Column(name) => schema.column_type(name),
            Expr::Arithmetic { left, op, right } => {
                let l = left.schema_type(schema)?;
                let r = right.schema_type(schema)?;
                value::arithmetic_type(l, *op, r)
            }
            Expr::Comparative { .. } | Expr::Conjunctive(_) | Expr::Disjunctive(_) => {
                Ok(SchemaType::Int)
            }
        }
    }

    /// Collect every referenced column name, in evaluation order.
    pub fn columns(&self) -> Vec<&str> {
        fn walk<'a>(expr: &'a Expr, out: &mut Vec<&'a str>) {
            match expr {
                Expr::Literal(_) => {}
                Expr::Column(name) => out.push(name),
                Expr::Arithmetic { left, right, .. }
                | Expr::Comparative { left, right, .. } => {
                    walk(left, out);
                    walk(right, out);
                }
                Expr::Conjunctive(parts) | Expr::Disjunctive(parts) => {
                    for part in parts {
                        walk(part, out);
                    }
                }
            }
        }
        let mut out = Vec::new();
        walk(self, &mut out);
        out
    }

    /// Rewrite every column reference through `f`.
    pub fn map_columns(self, f: &mut impl FnMut(String) -> String) -> Expr {
        match self {
            Expr::Literal(_) => self,
            Expr::Column(name) => Expr::Column(f(name)),
            Expr::Arithmetic { left, op, right } => Expr::Arithmetic {
                left: Box::new(left.map_columns(f)),
                op,
                right: Box::new(right.map_columns(f)),
            },
            Expr::Comparative { left, op, right } => Expr::Comparative {
                left: Box::new(left.map_columns(f)),
                op,
                right: Box::new(right.map_columns(f)),
            },
            Expr::Conjunctive(parts) => {
                Expr::Conjunctive(parts.into_iter().map(|p| p.map_columns(f)).collect())
            }
            Expr::Disjunctive(parts) => {
                Expr::Disjunctive(parts.into_iter().map(|p| p.map_columns(f)).collect())
            }
        }
    }

    /// Constant folding and algebraic simplification. Computation nodes with
    /// all-literal operands are evaluated eagerly; nested conjunctions and
    /// disjunctions of the same kind are flattened, literal legs folded, and
    /// empty/singleton lists collapsed.
    pub fn simplify(self) -> Expr {
        match self {
            Expr::Literal(_) | Expr::Column(_) => self,
            Expr::Arithmetic { left, op, right } => {
                let left = left.simplify();
                let right = right.simplify();
                if let (Expr::Literal(l), Expr::Literal(r)) = (&left, &right) {
                    if let Ok(folded) = value::arithmetic(l, op, r) {
                        return Expr::Literal(folded);
                    }
                }
                Expr::Arithmetic {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                }
            }
            Expr::Comparative { left, op, right } => {
                let left = left.simplify();
                let right = right.simplify();
                if let (Expr::Literal(l), Expr::Literal(r)) = (&left, &right) {
                    if let Ok(folded) = value::compare(l, op, r) {
                        return Expr::Literal(Value::Int(folded as i64));
                    }
                }
                Expr::Comparative {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                }
            }
            Expr::Conjunctive(parts) => {
                let mut remaining = Vec::new();
                for part in flatten(parts, true) {
                    match part.simplify() {
                        Expr::Literal(v) if v.is_truthy() => {}
                        Expr::Literal(_) => return Expr::Literal(Value::Int(0)),
                        other => remaining.push(other),
                    }
                }
                match remaining.len() {
                    0 => Expr::Literal(Value::Int(1)),
                    1 => remaining.pop().unwrap(),
                    _ => Expr::Conjunctive(remaining),
                }
            }
            Expr::Disjunctive(parts) => {
                let mut remaining = Vec::new();
                for part in flatten(parts, false) {
                    match part.simplify() {
                        Expr::Literal(v) if v.is_truthy() => {
                            return Expr::Literal(Value::Int(1))
                        }
                        Expr::Literal(_) => {}
                        other => remaining.push(other),
                    }
                }
                match remaining.len() {
                    0 => Expr::Literal(Value::Int(0)),
                    1 => remaining.pop().unwrap(),
                    _ => Expr::Disjunctive(remaining),
                }
            }
        }
    }
}

/// Flatten directly nested conjunctions (or disjunctions) one kind deep;
/// recursion in `simplify` handles deeper nesting.
fn flatten(parts: Vec<Expr>, conjunctive: bool) -> Vec<Expr> {
    let mut out = Vec::with_capacity(parts.len());
    for part in parts {
        match part {
            Expr::Conjunctive(inner) if conjunctive => out.extend(flatten(inner, true)),
            Expr::Disjunctive(inner) if !conjunctive => out.extend(flatten(inner, false)),
            other => out.push(other),
        }
    }
    out
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Value::Varchar(s)) => write!(f, "\"{s}\""),
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::Column(name) => write!(f, "{name}"),
            Expr::Arithmetic { left, op, right } => write!(f, "{left} {op} {right}"),
            Expr::Comparative { left, op, right } => write!(f, "{left} {op} {right}"),
            Expr::Conjunctive(parts) => write_joined(f, parts, " and "),
            Expr::Disjunctive(parts) => write_joined(f, parts, " or "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Expr], sep: &str) -> fmt::Result {
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        match part {
            Expr::Conjunctive(_) | Expr::Disjunctive(_) => write!(f, "({part})")?,
            _ => write!(f, "{part}")?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::SchemaType;

    fn test_table() -> Table {
        let schema = Schema::new(
            "t",
            vec![
                ("a".into(), SchemaType::Int),
                ("b".into(), SchemaType::Varchar),
            ],
        );
        Table::new(
            schema,
            vec![vec![Value::Int(3), Value::Varchar("x".into())]],
        )
    }

    #[test]
    fn test_column_resolution_is_lazy() {
        let expr = Expr::column("a").add(Expr::literal(Value::Int(1)));
        assert_eq!(expr.evaluate(&test_table(), 0).unwrap(), Value::Int(4));
    }

    #[test]
    fn test_comparative_yields_int() {
        let expr = Expr::column("a").gt(Expr::literal(Value::Int(2)));
        assert_eq!(expr.evaluate(&test_table(), 0).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_conjunctive_short_circuit() {
        // second leg references a missing column but must never be reached
        let expr = Expr::Conjunctive(vec![
            Expr::literal(Value::Int(0)),
            Expr::column("missing"),
        ]);
        assert_eq!(expr.evaluate(&test_table(), 0).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_simplify_constant_folds() {
        let expr = Expr::literal(Value::Int(2)).add(Expr::literal(Value::Int(3)));
        assert_eq!(expr.simplify(), Expr::Literal(Value::Int(5)));
    }

    #[test]
    fn test_simplify_flattens_conjunctions() {
        let expr = Expr::Conjunctive(vec![
            Expr::Conjunctive(vec![Expr::column("a"), Expr::column("b")]),
            Expr::column("c"),
        ]);
        match expr.simplify() {
            Expr::Conjunctive(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected conjunctive, got {:?}", other),
        }
    }

    #[test]
    fn test_simplify_folds_literal_legs() {
        let and_false = Expr::Conjunctive(vec![
            Expr::column("a"),
            Expr::literal(Value::Int(0)),
        ]);
        assert_eq!(and_false.simplify(), Expr::Literal(Value::Int(0)));

        let or_true = Expr::Disjunctive(vec![
            Expr::column("a"),
            Expr::literal(Value::Int(1)),
        ]);
        assert_eq!(or_true.simplify(), Expr::Literal(Value::Int(1)));

        let singleton = Expr::Conjunctive(vec![
            Expr::column("a"),
            Expr::literal(Value::Int(1)),
        ]);
        assert_eq!(singleton.simplify(), Expr::column("a"));
    }

    #[test]
    fn test_schema_type_inference() {
        let table = test_table();
        let concat = Expr::column("a").add(Expr::column("b"));
        assert_eq!(
            concat.schema_type(table.schema()).unwrap(),
            SchemaType::Varchar
        );
        let cmp = Expr::column("a").gt(Expr::literal(Value::Int(0)));
        assert_eq!(cmp.schema_type(table.schema()).unwrap(), SchemaType::Int);
    }

    #[test]
    fn test_display() {
        let expr = Expr::column("t.a").gt(Expr::literal(Value::Varchar("C3".into())));
        assert_eq!(expr.to_string(), "t.a > \"C3\"");
    }
}
