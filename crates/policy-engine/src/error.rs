//! 规则引擎错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("语法错误 (位置 {position}): {message}")]
    Syntax { message: String, position: usize },

    #[error("不支持的操作符: {symbol} ({arity})")]
    UnsupportedOperator { symbol: String, arity: String },

    #[error("类型不匹配: 操作符 '{operator}' 需要 {expected}, 实际 {actual}")]
    TypeMismatch {
        operator: String,
        expected: String,
        actual: String,
    },

    #[error("算术错误: 操作符 '{operator}' {message}")]
    Arithmetic { operator: String, message: String },

    #[error("算术溢出: 操作符 '{operator}' 的 64 位整数运算溢出")]
    ArithmeticOverflow { operator: String },

    #[error("未知标识符: {0}")]
    UnknownIdentifier(String),

    #[error("无效的路径 '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("缺少必需的特征: {0}")]
    MissingFeature(String),

    #[error("表达式求值失败 '{expression}': {source}")]
    Evaluation {
        expression: String,
        #[source]
        source: Box<RuleError>,
    },

    #[error("策略校验失败: {0}")]
    PolicyValidation(String),

    #[error("检测到循环依赖: {0}")]
    CircularDependency(String),
}

pub type Result<T> = std::result::Result<T, RuleError>;

impl RuleError {
    pub(crate) fn syntax(message: impl Into<String>, position: usize) -> Self {
        Self::Syntax {
            message: message.into(),
            position,
        }
    }

    pub(crate) fn type_mismatch(
        operator: &str,
        expected: &str,
        actual: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            operator: operator.to_string(),
            expected: expected.to_string(),
            actual: actual.into(),
        }
    }

    pub(crate) fn arithmetic(operator: &str, message: impl Into<String>) -> Self {
        Self::Arithmetic {
            operator: operator.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_path(path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// 为错误附加出错的子表达式
    pub(crate) fn in_expression(self, expression: impl ToString) -> Self {
        Self::Evaluation {
            expression: expression.to_string(),
            source: Box::new(self),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "SYNTAX_ERROR",
            Self::UnsupportedOperator { .. } => "UNSUPPORTED_OPERATOR",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::Arithmetic { .. } => "ARITHMETIC_ERROR",
            Self::ArithmeticOverflow { .. } => "ARITHMETIC_OVERFLOW",
            Self::UnknownIdentifier(_) => "UNKNOWN_IDENTIFIER",
            Self::InvalidPath { .. } => "INVALID_PATH",
            Self::MissingFeature(_) => "MISSING_FEATURE",
            Self::Evaluation { .. } => "EVALUATION_ERROR",
            Self::PolicyValidation(_) => "POLICY_VALIDATION_ERROR",
            Self::CircularDependency(_) => "CIRCULAR_DEPENDENCY",
        }
    }

    /// 剥离所有 Evaluation 包装，返回最底层的错误
    pub fn root_cause(&self) -> &RuleError {
        let mut current = self;
        while let Self::Evaluation { source, .. } = current {
            current = source;
        }
        current
    }

    /// 是否为策略级错误（会在任何规则执行前中止整个策略）
    pub fn is_policy_level(&self) -> bool {
        matches!(self, Self::PolicyValidation(_) | Self::CircularDependency(_))
    }
}
