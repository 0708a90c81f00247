//! 运行时值模型
//!
//! 求值过程中产生和消费的动态类型值。数值区分 32/64 位整数与 32/64 位浮点，
//! 运算时保留最窄的适用类型，并在溢出时提升。

use serde::Serialize;
use std::fmt;

/// 运行时值
///
/// 永远不是容器：map/数组只存在于外部传入的特征数据中，由路径解析器导航。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl Value {
    /// 值类型名称，用于错误信息
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "int32",
            Self::Long(_) => "int64",
            Self::Float(_) => "float32",
            Self::Double(_) => "float64",
            Self::String(_) => "string",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Int(_) | Self::Long(_) | Self::Float(_) | Self::Double(_)
        )
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Long(_))
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, Self::Float(_) | Self::Double(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// 数值转为 64 位浮点
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(f64::from(*i)),
            Self::Long(l) => Some(*l as f64),
            Self::Float(f) => Some(f64::from(*f)),
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// 整数族转为 64 位整数
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(i64::from(*i)),
            Self::Long(l) => Some(*l),
            _ => None,
        }
    }

    /// 从 JSON 标量构造值，JSON 对象/数组返回 None
    ///
    /// 整数能放进 32 位时为 Int，否则为 Long；超出 i64 的无符号整数降级为 Double。
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        match json {
            serde_json::Value::Null => Some(Self::Null),
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(match i32::try_from(i) {
                        Ok(small) => Self::Int(small),
                        Err(_) => Self::Long(i),
                    })
                } else {
                    n.as_f64().map(Self::Double)
                }
            }
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

/// 浮点数的文本形式：整数值保留一位小数（`5.0`），其他按最短表示输出
fn fmt_floating<T: fmt::Display + Into<f64> + Copy>(
    f: &mut fmt::Formatter<'_>,
    value: T,
) -> fmt::Result {
    let wide: f64 = value.into();
    if wide.is_finite() && wide.fract() == 0.0 && wide.abs() < 1e16 {
        write!(f, "{:.1}", value)
    } else {
        write!(f, "{}", value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Long(l) => write!(f, "{}", l),
            Self::Float(v) => fmt_floating(f, *v),
            Self::Double(d) => fmt_floating(f, *d),
            Self::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_integers() {
        assert_eq!(Value::from_json(&json!(30)), Some(Value::Int(30)));
        assert_eq!(
            Value::from_json(&json!(3_000_000_000i64)),
            Some(Value::Long(3_000_000_000))
        );
        assert_eq!(Value::from_json(&json!(u64::MAX)), Some(Value::Double(u64::MAX as f64)));
    }

    #[test]
    fn test_from_json_scalars_and_containers() {
        assert_eq!(Value::from_json(&json!(1.5)), Some(Value::Double(1.5)));
        assert_eq!(Value::from_json(&json!(null)), Some(Value::Null));
        assert_eq!(Value::from_json(&json!("gold")), Some(Value::from("gold")));
        assert_eq!(Value::from_json(&json!([1, 2])), None);
        assert_eq!(Value::from_json(&json!({"a": 1})), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Double(5.0).to_string(), "5.0");
        assert_eq!(Value::Double(2.5).to_string(), "2.5");
        assert_eq!(Value::Float(-3.0).to_string(), "-3.0");
        assert_eq!(Value::Float(0.1).to_string(), "0.1");
        assert_eq!(Value::Float(2.75).to_string(), "2.75");
        assert_eq!(Value::Int(5).to_string(), "5");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::from("abc").to_string(), "abc");
    }

    #[test]
    fn test_serialize_untagged() {
        assert_eq!(serde_json::to_value(Value::Int(3)).unwrap(), json!(3));
        assert_eq!(serde_json::to_value(Value::Null).unwrap(), json!(null));
        assert_eq!(serde_json::to_value(Value::Bool(true)).unwrap(), json!(true));
    }
}
