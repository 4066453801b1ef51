//! Scalar values and their type/arithmetic/comparison rules

use crate::error::{QueryError, Result};
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::fmt;

/// Column type of a relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaType {
    Int,
    Float,
    Varchar,
    Null,
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaType::Int => write!(f, "int"),
            SchemaType::Float => write!(f, "float"),
            SchemaType::Varchar => write!(f, "varchar"),
            SchemaType::Null => write!(f, "null"),
        }
    }
}

impl SchemaType {
    /// Parse a type name as it appears in a table file header
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "int" | "integer" => Some(SchemaType::Int),
            "float" => Some(SchemaType::Float),
            "varchar" | "string" => Some(SchemaType::Varchar),
            "null" => Some(SchemaType::Null),
            _ => None,
        }
    }
}

/// A single field value. `OrderedFloat` makes rows `Eq + Hash` so they can
/// serve as keys for distinct, aggregation groups, and hash joins.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Int(i64),
    Float(OrderedFloat<f64>),
    Varchar(String),
    Null,
}

/// One record of a table, positionally aligned with its schema
pub type Row = Vec<Value>;

/// Arithmetic operators on values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Times,
    Divide,
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithmeticOp::Add => write!(f, "+"),
            ArithmeticOp::Subtract => write!(f, "-"),
            ArithmeticOp::Times => write!(f, "*"),
            ArithmeticOp::Divide => write!(f, "/"),
        }
    }
}

/// Comparison operators on values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparativeOp {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for ComparativeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparativeOp::Eq => write!(f, "="),
            ComparativeOp::Neq => write!(f, "!="),
            ComparativeOp::Lt => write!(f, "<"),
            ComparativeOp::Le => write!(f, "<="),
            ComparativeOp::Gt => write!(f, ">"),
            ComparativeOp::Ge => write!(f, ">="),
        }
    }
}

impl Value {
    pub fn float(v: f64) -> Self {
        Value::Float(OrderedFloat(v))
    }

    /// The runtime type of this value
    pub fn schema_type(&self) -> SchemaType {
        match self {
            Value::Int(_) => SchemaType::Int,
            Value::Float(_) => SchemaType::Float,
            Value::Varchar(_) => SchemaType::Varchar,
            Value::Null => SchemaType::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Condition truthiness: comparisons produce 0/1, so anything non-zero
    /// and non-null counts as true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(v) => *v != 0,
            Value::Float(v) => v.0 != 0.0,
            Value::Varchar(v) => !v.is_empty(),
            Value::Null => false,
        }
    }

    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(v.0),
            _ => None,
        }
    }

    /// Total order used by the sort operator: nulls first, then numerics
    /// (cross-type), then strings.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Int(_) | Value::Float(_) => 1,
                Value::Varchar(_) => 2,
            }
        }
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Varchar(a), Value::Varchar(b)) => a.cmp(b),
            // Int pairs stay in i64 so values past 2^53 keep their order.
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => OrderedFloat(x).cmp(&OrderedFloat(y)),
                _ => rank(a).cmp(&rank(b)),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Varchar(v) => write!(f, "{}", v),
            Value::Null => write!(f, "null"),
        }
    }
}

/// Evaluate `left op right` following the engine's coercion rules: a null
/// operand yields null, ADD concatenates when either side is a string, and
/// DIVIDE always yields a float.
pub fn arithmetic(left: &Value, op: ArithmeticOp, right: &Value) -> Result<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    if op == ArithmeticOp::Add
        && (matches!(left, Value::Varchar(_)) || matches!(right, Value::Varchar(_)))
    {
        return Ok(Value::Varchar(format!("{}{}", left, right)));
    }

    // Int pairs stay in i64 so values past 2^53 survive intact; only DIVIDE
    // and mixed operands go through float.
    if let (Value::Int(l), Value::Int(r)) = (left, right) {
        if op != ArithmeticOp::Divide {
            let result = match op {
                ArithmeticOp::Add => l.checked_add(*r),
                ArithmeticOp::Subtract => l.checked_sub(*r),
                ArithmeticOp::Times => l.checked_mul(*r),
                ArithmeticOp::Divide => unreachable!(),
            };
            return result.map(Value::Int).ok_or_else(|| {
                QueryError::IncompatibleOperation(format!(
                    "integer overflow evaluating {} {} {}",
                    left, op, right
                ))
            });
        }
    }

    let (l, r) = match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => (l, r),
        _ => {
            return Err(QueryError::IncompatibleOperation(format!(
                "cannot apply {} to {} and {}",
                op,
                left.schema_type(),
                right.schema_type()
            )))
        }
    };

    if op == ArithmeticOp::Divide {
        return Ok(Value::float(l / r));
    }

    Ok(Value::float(match op {
        ArithmeticOp::Add => l + r,
        ArithmeticOp::Subtract => l - r,
        ArithmeticOp::Times => l * r,
        ArithmeticOp::Divide => unreachable!(),
    }))
}

/// Static type inference for arithmetic, used to build result schemas without
/// evaluating rows.
pub fn arithmetic_type(
    left: SchemaType,
    op: ArithmeticOp,
    right: SchemaType,
) -> Result<SchemaType> {
    let has_varchar = left == SchemaType::Varchar || right == SchemaType::Varchar;
    if has_varchar && op != ArithmeticOp::Add {
        return Err(QueryError::IncompatibleOperation(format!(
            "cannot apply {} to {} and {}",
            op, left, right
        )));
    }
    if has_varchar {
        return Ok(SchemaType::Varchar);
    }
    if left == SchemaType::Float || right == SchemaType::Float || op == ArithmeticOp::Divide {
        return Ok(SchemaType::Float);
    }
    if left == SchemaType::Null && right == SchemaType::Null {
        return Ok(SchemaType::Null);
    }
    Ok(SchemaType::Int)
}

/// Evaluate a comparison. Equality is structural (null = null holds); for
/// ordering comparisons a null operand yields false rather than an error.
pub fn compare(left: &Value, op: ComparativeOp, right: &Value) -> Result<bool> {
    match op {
        ComparativeOp::Eq => Ok(equal(left, right)),
        ComparativeOp::Neq => Ok(!equal(left, right)),
        _ => {
            if left.is_null() || right.is_null() {
                return Ok(false);
            }
            let ordering = match (left, right) {
                (Value::Varchar(l), Value::Varchar(r)) => l.cmp(r),
                (Value::Int(l), Value::Int(r)) => l.cmp(r),
                (l, r) => match (l.as_f64(), r.as_f64()) {
                    (Some(l), Some(r)) => OrderedFloat(l).cmp(&OrderedFloat(r)),
                    _ => {
                        return Err(QueryError::IncompatibleOperandTypes(format!(
                            "cannot compare {} with {}",
                            left.schema_type(),
                            right.schema_type()
                        )))
                    }
                },
            };
            Ok(match op {
                ComparativeOp::Lt => ordering == Ordering::Less,
                ComparativeOp::Le => ordering != Ordering::Greater,
                ComparativeOp::Gt => ordering == Ordering::Greater,
                ComparativeOp::Ge => ordering != Ordering::Less,
                ComparativeOp::Eq | ComparativeOp::Neq => unreachable!(),
            })
        }
    }
}

fn equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        // Int pairs compare in i64; 2^53 and 2^53 + 1 must stay distinct.
        (Value::Int(l), Value::Int(r)) => l == r,
        // Mixed numeric equality is cross-type: 1 = 1.0 holds.
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            left.as_f64() == right.as_f64()
        }
        _ => left == right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_null_propagates() {
        let result = arithmetic(&Value::Int(1), ArithmeticOp::Add, &Value::Null).unwrap();
        assert_eq!(result, Value::Null);
    }

    #[test]
    fn test_add_concatenates_strings() {
        let result = arithmetic(
            &Value::Int(5),
            ArithmeticOp::Add,
            &Value::Varchar("x".into()),
        )
        .unwrap();
        assert_eq!(result, Value::Varchar("5x".into()));
    }

    #[test]
    fn test_divide_yields_float() {
        let result = arithmetic(&Value::Int(7), ArithmeticOp::Divide, &Value::Int(2)).unwrap();
        assert_eq!(result, Value::float(3.5));
    }

    #[test]
    fn test_int_arithmetic_stays_int() {
        let result = arithmetic(&Value::Int(6), ArithmeticOp::Times, &Value::Int(7)).unwrap();
        assert_eq!(result, Value::Int(42));
    }

    #[test]
    fn test_arithmetic_type_inference() {
        assert_eq!(
            arithmetic_type(SchemaType::Int, ArithmeticOp::Add, SchemaType::Varchar).unwrap(),
            SchemaType::Varchar
        );
        assert_eq!(
            arithmetic_type(SchemaType::Int, ArithmeticOp::Divide, SchemaType::Int).unwrap(),
            SchemaType::Float
        );
        assert_eq!(
            arithmetic_type(SchemaType::Int, ArithmeticOp::Subtract, SchemaType::Int).unwrap(),
            SchemaType::Int
        );
        assert!(
            arithmetic_type(SchemaType::Varchar, ArithmeticOp::Times, SchemaType::Int).is_err()
        );
    }

    #[test]
    fn test_compare_null_ordering_is_false() {
        assert!(!compare(&Value::Null, ComparativeOp::Lt, &Value::Int(1)).unwrap());
        assert!(!compare(&Value::Int(1), ComparativeOp::Ge, &Value::Null).unwrap());
    }

    #[test]
    fn test_compare_null_equality() {
        assert!(compare(&Value::Null, ComparativeOp::Eq, &Value::Null).unwrap());
        assert!(!compare(&Value::Null, ComparativeOp::Eq, &Value::Int(0)).unwrap());
    }

    #[test]
    fn test_compare_strings_lexicographic() {
        assert!(compare(
            &Value::Varchar("C4".into()),
            ComparativeOp::Gt,
            &Value::Varchar("C3".into())
        )
        .unwrap());
    }

    #[test]
    fn test_compare_mixed_types_rejected() {
        assert!(compare(
            &Value::Varchar("a".into()),
            ComparativeOp::Lt,
            &Value::Int(1)
        )
        .is_err());
    }

    #[test]
    fn test_large_int_arithmetic_is_exact() {
        // 2^53 + 1 is the first integer an f64 cannot represent
        let big = (1i64 << 53) + 1;
        let result = arithmetic(&Value::Int(big), ArithmeticOp::Add, &Value::Int(0)).unwrap();
        assert_eq!(result, Value::Int(big));
        let result =
            arithmetic(&Value::Int(big), ArithmeticOp::Subtract, &Value::Int(1)).unwrap();
        assert_eq!(result, Value::Int(1i64 << 53));
    }

    #[test]
    fn test_large_int_equality_is_exact() {
        let big = 1i64 << 53;
        assert!(!compare(&Value::Int(big), ComparativeOp::Eq, &Value::Int(big + 1)).unwrap());
        assert!(compare(&Value::Int(big), ComparativeOp::Neq, &Value::Int(big + 1)).unwrap());
        assert!(compare(&Value::Int(big), ComparativeOp::Lt, &Value::Int(big + 1)).unwrap());
        assert_eq!(
            Value::Int(big).sort_cmp(&Value::Int(big + 1)),
            std::cmp::Ordering::Less
        );
    }

    #[test]
    fn test_int_overflow_is_an_error() {
        assert!(matches!(
            arithmetic(&Value::Int(i64::MAX), ArithmeticOp::Add, &Value::Int(1)),
            Err(QueryError::IncompatibleOperation(_))
        ));
    }

    #[test]
    fn test_sort_cmp_total_order() {
        assert_eq!(
            Value::Null.sort_cmp(&Value::Int(0)),
            std::cmp::Ordering::Less
        );
        assert_eq!(
            Value::Int(2).sort_cmp(&Value::float(2.5)),
            std::cmp::Ordering::Less
        );
    }
}
