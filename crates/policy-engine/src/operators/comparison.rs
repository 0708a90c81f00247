//! 比较操作符：`<` `<=` `>` `>=` `==` `!=`

use super::{Operator, OperatorCategory, describe_operands, precedence};
use crate::error::{Result, RuleError};
use crate::value::Value;
use std::cmp::Ordering;

pub fn operators() -> Vec<Operator> {
    vec![
        Operator::binary("<", precedence::COMPARISON, OperatorCategory::Comparison, |l, r| {
            compare("<", l, r, Ordering::is_lt)
        }),
        Operator::binary("<=", precedence::COMPARISON, OperatorCategory::Comparison, |l, r| {
            compare("<=", l, r, Ordering::is_le)
        }),
        Operator::binary(">", precedence::COMPARISON, OperatorCategory::Comparison, |l, r| {
            compare(">", l, r, Ordering::is_gt)
        }),
        Operator::binary(">=", precedence::COMPARISON, OperatorCategory::Comparison, |l, r| {
            compare(">=", l, r, Ordering::is_ge)
        }),
        Operator::binary("==", precedence::EQUALITY, OperatorCategory::Comparison, |l, r| {
            Ok(Value::Bool(equals(l, r)))
        }),
        Operator::binary("!=", precedence::EQUALITY, OperatorCategory::Comparison, |l, r| {
            Ok(Value::Bool(!equals(l, r)))
        }),
    ]
}

/// 相等判断
///
/// 两侧均为 null 时相等，仅一侧为 null 时不等；数值统一转为 64 位浮点比较；
/// 其他情况要求同类型且值相同。
pub fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (l, r) if l.is_numeric() && r.is_numeric() => match (l.as_f64(), r.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        _ => false,
    }
}

/// 数值大小比较；NaN 与任何值比较均为 false
fn compare(
    operator: &str,
    left: &Value,
    right: &Value,
    accept: fn(Ordering) -> bool,
) -> Result<Value> {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => Ok(Value::Bool(a.partial_cmp(&b).is_some_and(accept))),
        _ => Err(RuleError::type_mismatch(
            operator,
            "数值",
            describe_operands(left, right),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(symbol: &str, left: Value, right: Value) -> Result<Value> {
        operators()
            .into_iter()
            .find(|o| o.symbol() == symbol)
            .unwrap()
            .apply_binary(&left, &right)
    }

    #[test]
    fn test_relational_mixed_kinds() {
        assert_eq!(apply("<", Value::Int(1), Value::Double(1.5)).unwrap(), Value::Bool(true));
        assert_eq!(apply("<=", Value::Long(2), Value::Int(2)).unwrap(), Value::Bool(true));
        assert_eq!(apply(">", Value::Float(2.5), Value::Int(3)).unwrap(), Value::Bool(false));
        assert_eq!(apply(">=", Value::Int(3), Value::Int(3)).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_relational_requires_numbers() {
        let err = apply("<", Value::from("a"), Value::from("b")).unwrap_err();
        assert!(matches!(err, RuleError::TypeMismatch { .. }));
        assert!(apply(">", Value::Null, Value::Int(1)).is_err());
    }

    #[test]
    fn test_nan_comparisons_are_false() {
        let nan = Value::Double(f64::NAN);
        assert_eq!(apply("<", nan.clone(), Value::Int(1)).unwrap(), Value::Bool(false));
        assert_eq!(apply(">=", nan, Value::Int(1)).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_equality() {
        assert!(equals(&Value::Int(5), &Value::Double(5.0)));
        assert!(equals(&Value::Long(5), &Value::Float(5.0)));
        assert!(!equals(&Value::Int(5), &Value::from("5")));
        assert!(equals(&Value::Null, &Value::Null));
        assert!(!equals(&Value::Null, &Value::Int(0)));
        assert!(equals(&Value::from("a"), &Value::from("a")));
        assert!(!equals(&Value::Bool(true), &Value::Int(1)));
    }

    #[test]
    fn test_not_equal_is_negation() {
        assert_eq!(apply("!=", Value::Int(1), Value::Int(2)).unwrap(), Value::Bool(true));
        assert_eq!(apply("!=", Value::Null, Value::Null).unwrap(), Value::Bool(false));
        assert_eq!(
            apply("!=", Value::Int(5), Value::from("5")).unwrap(),
            Value::Bool(true)
        );
    }
}
