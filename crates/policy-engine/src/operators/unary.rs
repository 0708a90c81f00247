//! 一元操作符 `!` `-`

use super::{Operator, precedence};
use crate::error::{Result, RuleError};
use crate::value::Value;

pub fn operators() -> Vec<Operator> {
    vec![
        Operator::unary("!", precedence::UNARY, not),
        Operator::unary("-", precedence::UNARY, negate),
    ]
}

/// 逻辑非，只接受布尔值
pub fn not(operand: &Value) -> Result<Value> {
    match operand {
        Value::Bool(b) => Ok(Value::Bool(!b)),
        other => Err(RuleError::type_mismatch("!", "布尔值", other.kind())),
    }
}

/// 取负，保留数值类型
///
/// `i32::MIN` 取负提升为 Long；`i64::MIN` 无法再提升，按补码回绕为自身。
pub fn negate(operand: &Value) -> Result<Value> {
    match operand {
        Value::Int(i) => Ok(match i.checked_neg() {
            Some(n) => Value::Int(n),
            None => Value::Long(-i64::from(*i)),
        }),
        Value::Long(l) => Ok(Value::Long(l.wrapping_neg())),
        Value::Float(f) => Ok(Value::Float(-f)),
        Value::Double(d) => Ok(Value::Double(-d)),
        other => Err(RuleError::type_mismatch("-", "数值", other.kind())),
    }
}
