//! 操作符策略
//!
//! 每个操作符由符号、元数、优先级、类别和求值函数组成。一元与二元操作符分表
//! 存放，因为 `-` 同时是二者；由语法分析阶段的上下文决定使用哪一个。

pub mod arithmetic;
pub mod comparison;
pub mod logical;
pub mod registry;
pub mod unary;

pub use registry::OperatorRegistry;

use crate::error::{Result, RuleError};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// 优先级，数值越大结合越紧
pub mod precedence {
    pub const LOGICAL_OR: u8 = 1;
    pub const LOGICAL_AND: u8 = 2;
    pub const EQUALITY: u8 = 3;
    pub const COMPARISON: u8 = 4;
    pub const ADDITION: u8 = 5;
    pub const MULTIPLICATION: u8 = 6;
    pub const UNARY: u8 = 7;
}

/// 操作符元数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arity {
    Unary,
    Binary,
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unary => write!(f, "unary"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// 操作符类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorCategory {
    Arithmetic,
    Comparison,
    Logical,
    Unary,
}

pub type UnaryFn = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;
pub type BinaryFn = Arc<dyn Fn(&Value, &Value) -> Result<Value> + Send + Sync>;

/// 操作符求值函数
#[derive(Clone)]
pub enum OperatorFn {
    Unary(UnaryFn),
    Binary(BinaryFn),
}

/// 操作符策略
#[derive(Clone)]
pub struct Operator {
    symbol: String,
    precedence: u8,
    category: OperatorCategory,
    func: OperatorFn,
}

impl Operator {
    /// 创建二元操作符
    pub fn binary<F>(
        symbol: impl Into<String>,
        precedence: u8,
        category: OperatorCategory,
        func: F,
    ) -> Self
    where
        F: Fn(&Value, &Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            symbol: symbol.into(),
            precedence,
            category,
            func: OperatorFn::Binary(Arc::new(func)),
        }
    }

    /// 创建一元操作符，类别固定为 `Unary`
    pub fn unary<F>(symbol: impl Into<String>, precedence: u8, func: F) -> Self
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            symbol: symbol.into(),
            precedence,
            category: OperatorCategory::Unary,
            func: OperatorFn::Unary(Arc::new(func)),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn precedence(&self) -> u8 {
        self.precedence
    }

    pub fn category(&self) -> OperatorCategory {
        self.category
    }

    pub fn arity(&self) -> Arity {
        match self.func {
            OperatorFn::Unary(_) => Arity::Unary,
            OperatorFn::Binary(_) => Arity::Binary,
        }
    }

    pub fn apply_unary(&self, operand: &Value) -> Result<Value> {
        match &self.func {
            OperatorFn::Unary(f) => f(operand),
            OperatorFn::Binary(_) => Err(self.arity_error(Arity::Unary)),
        }
    }

    pub fn apply_binary(&self, left: &Value, right: &Value) -> Result<Value> {
        match &self.func {
            OperatorFn::Binary(f) => f(left, right),
            OperatorFn::Unary(_) => Err(self.arity_error(Arity::Binary)),
        }
    }

    fn arity_error(&self, requested: Arity) -> RuleError {
        RuleError::UnsupportedOperator {
            symbol: self.symbol.clone(),
            arity: requested.to_string(),
        }
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("symbol", &self.symbol)
            .field("arity", &self.arity())
            .field("precedence", &self.precedence)
            .field("category", &self.category)
            .finish()
    }
}

/// 全部内置操作符
pub fn default_operators() -> Vec<Operator> {
    let mut operators = Vec::with_capacity(15);
    operators.extend(arithmetic::operators());
    operators.extend(comparison::operators());
    operators.extend(logical::operators());
    operators.extend(unary::operators());
    operators
}

/// 操作数类型描述，用于类型不匹配错误
pub(crate) fn describe_operands(left: &Value, right: &Value) -> String {
    format!("{} 和 {}", left.kind(), right.kind())
}
