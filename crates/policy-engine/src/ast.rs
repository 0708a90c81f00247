//! 表达式语法树
//!
//! 节点种类固定且有限，由语法分析器产出、求值器消费。

use crate::value::Value;
use std::fmt;

/// 字面量种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Number,
    String,
    Boolean,
}

/// 语法树节点
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal { value: Value, kind: LiteralKind },
    /// 规则名或顶层特征名
    Identifier { name: String },
    /// `featureMap.` 开头的点号/下标路径，原样保留给路径解析器
    FeatureAccess { path: String },
    Binary {
        left: Box<Expr>,
        op: String,
        right: Box<Expr>,
    },
    Unary { op: String, operand: Box<Expr> },
}

impl Expr {
    pub fn literal(value: Value, kind: LiteralKind) -> Self {
        Self::Literal { value, kind }
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Self::Identifier { name: name.into() }
    }

    pub fn feature_access(path: impl Into<String>) -> Self {
        Self::FeatureAccess { path: path.into() }
    }

    pub fn binary(left: Expr, op: impl Into<String>, right: Expr) -> Self {
        Self::Binary {
            left: Box::new(left),
            op: op.into(),
            right: Box::new(right),
        }
    }

    pub fn unary(op: impl Into<String>, operand: Expr) -> Self {
        Self::Unary {
            op: op.into(),
            operand: Box::new(operand),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal {
                value,
                kind: LiteralKind::String,
            } => write!(f, "\"{}\"", value),
            Self::Literal { value, .. } => write!(f, "{}", value),
            Self::Identifier { name } => write!(f, "{}", name),
            Self::FeatureAccess { path } => write!(f, "{}", path),
            Self::Binary { left, op, right } => write!(f, "({} {} {})", left, op, right),
            Self::Unary { op, operand } => write!(f, "{}{}", op, operand),
        }
    }
}
