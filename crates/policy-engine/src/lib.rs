//! 策略表达式引擎
//!
//! 提供可复用的表达式求值与策略执行能力，支持：
//! - 表达式词法/语法分析，固定优先级与结合性
//! - 区分 32/64 位整数与浮点的动态类型值，溢出时自动提升
//! - 可在运行时注册/替换的线程安全操作符注册表
//! - `&&`/`||` 短路求值与嵌套特征路径解析
//! - 规则依赖校验、循环检测与按依赖顺序执行
//!
//! ```
//! use policy_engine::{FeatureMap, Policy, Rule, RuleContext, Value};
//! use serde_json::json;
//!
//! let features = FeatureMap::new(json!({ "user": { "age": 30 } }));
//! let adult = policy_engine::evaluate_expression(
//!     "featureMap.user.age >= 18",
//!     &features,
//!     &RuleContext::new(),
//! )
//! .unwrap();
//! assert_eq!(adult, Value::Bool(true));
//!
//! let policy = Policy::new("onboarding", "1.0")
//!     .with_rule(Rule::new("adult", "featureMap.user.age >= 18"))
//!     .with_rule(Rule::new("allowed", "adult && true").depends_on("adult"));
//! let result = policy_engine::execute_policy(&policy, &features).unwrap();
//! assert!(result.success);
//! ```

pub mod ast;
pub mod compiler;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod lexer;
pub mod models;
pub mod operators;
pub mod parser;
pub mod path;
pub mod value;

pub use ast::{Expr, LiteralKind};
pub use compiler::{CompiledExpression, ExpressionCompiler};
pub use dependency::{DependencyGraph, resolve_execution_order};
pub use error::{Result, RuleError};
pub use evaluator::ExpressionEvaluator;
pub use executor::PolicyExecutor;
pub use lexer::{Token, TokenKind, tokenize};
pub use models::{FeatureMap, Policy, PolicyResult, Rule, RuleContext, RuleResult};
pub use operators::{Arity, Operator, OperatorCategory, OperatorRegistry};
pub use parser::{Parser, parse};
pub use path::PathResolver;
pub use value::Value;

/// 使用共享操作符注册表求值一条表达式
pub fn evaluate_expression(
    expression: &str,
    features: &FeatureMap,
    rules: &RuleContext,
) -> Result<Value> {
    ExpressionEvaluator::new().evaluate(expression, features, rules)
}

/// 使用默认配置执行策略
///
/// 依赖校验失败或存在循环依赖时返回 `Err`，此时没有任何规则被执行；
/// 单条规则的错误记录在返回的 [`PolicyResult`] 中。
pub fn execute_policy(policy: &Policy, features: &FeatureMap) -> Result<PolicyResult> {
    PolicyExecutor::new().execute(policy, features)
}
