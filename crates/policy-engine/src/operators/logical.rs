//! 逻辑操作符 `&&` `||`
//!
//! 这里是不短路的版本，两侧都必须是布尔值。求值器对这两个符号先做短路判断，
//! 只有需要右侧时才调用到这里。

use super::{Operator, OperatorCategory, describe_operands, precedence};
use crate::error::{Result, RuleError};
use crate::value::Value;

pub fn operators() -> Vec<Operator> {
    vec![
        Operator::binary("&&", precedence::LOGICAL_AND, OperatorCategory::Logical, |l, r| {
            booleans("&&", l, r).map(|(a, b)| Value::Bool(a && b))
        }),
        Operator::binary("||", precedence::LOGICAL_OR, OperatorCategory::Logical, |l, r| {
            booleans("||", l, r).map(|(a, b)| Value::Bool(a || b))
        }),
    ]
}

fn booleans(operator: &str, left: &Value, right: &Value) -> Result<(bool, bool)> {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => Ok((*a, *b)),
        _ => Err(RuleError::type_mismatch(
            operator,
            "布尔值",
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
    fn test_truth_tables() {
        assert_eq!(apply("&&", true.into(), true.into()).unwrap(), Value::Bool(true));
        assert_eq!(apply("&&", true.into(), false.into()).unwrap(), Value::Bool(false));
        assert_eq!(apply("||", false.into(), true.into()).unwrap(), Value::Bool(true));
        assert_eq!(apply("||", false.into(), false.into()).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_no_truthiness() {
        let err = apply("&&", Value::Int(5), Value::Bool(true)).unwrap_err();
        assert!(matches!(err, RuleError::TypeMismatch { .. }));
        assert!(apply("||", Value::Bool(false), Value::from("yes")).is_err());
        assert!(apply("||", Value::Null, Value::Bool(true)).is_err());
    }
}
