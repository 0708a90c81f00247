//! 算术操作符：`+` `-` `*` `/` `%`
//!
//! 数值运算保留最窄的适用类型：任一侧为浮点时结果为 64 位浮点；任一侧为 64 位
//! 整数时按 64 位做溢出检查；否则按 32 位计算，溢出时自动提升为 64 位。

use super::{Operator, OperatorCategory, describe_operands, precedence};
use crate::error::{Result, RuleError};
use crate::value::Value;

pub fn operators() -> Vec<Operator> {
    vec![
        Operator::binary("+", precedence::ADDITION, OperatorCategory::Arithmetic, add),
        Operator::binary("-", precedence::ADDITION, OperatorCategory::Arithmetic, subtract),
        Operator::binary("*", precedence::MULTIPLICATION, OperatorCategory::Arithmetic, multiply),
        Operator::binary("/", precedence::MULTIPLICATION, OperatorCategory::Arithmetic, divide),
        Operator::binary("%", precedence::MULTIPLICATION, OperatorCategory::Arithmetic, modulo),
    ]
}

/// 加法；任一侧为字符串时做文本拼接
pub fn add(left: &Value, right: &Value) -> Result<Value> {
    if left.is_null() || right.is_null() {
        return Err(RuleError::type_mismatch(
            "+",
            "数值或字符串",
            describe_operands(left, right),
        ));
    }

    if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
        return Ok(Value::String(format!("{}{}", left, right)));
    }

    numeric("+", left, right, |a, b| a + b, i64::checked_add, i32::checked_add)
}

pub fn subtract(left: &Value, right: &Value) -> Result<Value> {
    numeric("-", left, right, |a, b| a - b, i64::checked_sub, i32::checked_sub)
}

pub fn multiply(left: &Value, right: &Value) -> Result<Value> {
    numeric("*", left, right, |a, b| a * b, i64::checked_mul, i32::checked_mul)
}

/// 除法总是产生 64 位浮点
pub fn divide(left: &Value, right: &Value) -> Result<Value> {
    let (a, b) = require_numeric("/", left, right)?;

    if b == 0.0 {
        return Err(RuleError::arithmetic("/", "除数为零"));
    }

    let result = a / b;
    if result.is_nan() {
        return Err(RuleError::arithmetic("/", "结果为 NaN"));
    }
    if result.is_infinite() {
        return Err(RuleError::arithmetic("/", "结果为无穷大"));
    }

    Ok(Value::Double(result))
}

/// 取模；整数族使用整数余数
pub fn modulo(left: &Value, right: &Value) -> Result<Value> {
    let (a, b) = require_numeric("%", left, right)?;

    if b == 0.0 {
        return Err(RuleError::arithmetic("%", "除数为零"));
    }

    match (left, right) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_rem(*y))),
        (l, r) if l.is_integer() && r.is_integer() => {
            let (x, y) = (l.as_i64().unwrap_or_default(), r.as_i64().unwrap_or_default());
            Ok(Value::Long(x.wrapping_rem(y)))
        }
        _ => {
            let result = a % b;
            if result.is_nan() {
                return Err(RuleError::arithmetic("%", "结果为 NaN"));
            }
            Ok(Value::Double(result))
        }
    }
}

fn require_numeric(operator: &str, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(RuleError::type_mismatch(
            operator,
            "数值",
            describe_operands(left, right),
        )),
    }
}

/// 按提升规则执行数值运算
fn numeric(
    operator: &str,
    left: &Value,
    right: &Value,
    floating: fn(f64, f64) -> f64,
    wide: fn(i64, i64) -> Option<i64>,
    narrow: fn(i32, i32) -> Option<i32>,
) -> Result<Value> {
    let (a, b) = require_numeric(operator, left, right)?;

    match (left, right) {
        (Value::Int(x), Value::Int(y)) => Ok(match narrow(*x, *y) {
            Some(result) => Value::Int(result),
            // 32 位溢出时提升；两个 i32 的和差积总能放进 i64
            None => match wide(i64::from(*x), i64::from(*y)) {
                Some(result) => Value::Long(result),
                None => return Err(overflow(operator)),
            },
        }),
        (l, r) if l.is_integer() && r.is_integer() => {
            let (x, y) = (l.as_i64().unwrap_or_default(), r.as_i64().unwrap_or_default());
            wide(x, y).map(Value::Long).ok_or_else(|| overflow(operator))
        }
        _ => Ok(Value::Double(floating(a, b))),
    }
}

fn overflow(operator: &str) -> RuleError {
    RuleError::ArithmeticOverflow {
        operator: operator.to_string(),
    }
}
