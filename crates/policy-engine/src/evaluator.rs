//! 表达式求值器
//!
//! 对语法树做递归遍历。`&&`/`||` 先求左侧并在结果已确定时短路，其他操作符
//! 两侧都求值后交给注册表中的策略。错误在产生处附加出错的子表达式，向上传播
//! 时不再重复包装。

use crate::ast::Expr;
use crate::compiler::{CompiledExpression, ExpressionCompiler};
use crate::error::{Result, RuleError};
use crate::models::{FeatureMap, RuleContext};
use crate::operators::{Arity, OperatorRegistry};
use crate::path::PathResolver;
use crate::value::Value;
use policy_shared::config::EngineConfig;

/// 表达式求值器
#[derive(Debug, Clone)]
pub struct ExpressionEvaluator {
    registry: OperatorRegistry,
    compiler: ExpressionCompiler,
}

impl ExpressionEvaluator {
    /// 使用进程级共享注册表
    pub fn new() -> Self {
        Self::with_registry(OperatorRegistry::global().clone())
    }

    pub fn with_registry(registry: OperatorRegistry) -> Self {
        Self {
            registry,
            compiler: ExpressionCompiler::new(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new().with_max_depth(config.max_expression_depth)
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.compiler = ExpressionCompiler::with_max_depth(max_depth);
        self
    }

    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    pub fn compiler(&self) -> &ExpressionCompiler {
        &self.compiler
    }

    /// 编译并求值表达式文本
    pub fn evaluate(
        &self,
        expression: &str,
        features: &FeatureMap,
        rules: &RuleContext,
    ) -> Result<Value> {
        let compiled = self.compiler.compile(expression)?;
        self.evaluate_compiled(&compiled, features, rules)
    }

    pub fn evaluate_compiled(
        &self,
        compiled: &CompiledExpression,
        features: &FeatureMap,
        rules: &RuleContext,
    ) -> Result<Value> {
        self.evaluate_ast(&compiled.ast, features, rules)
    }

    /// 对语法树求值
    pub fn evaluate_ast(
        &self,
        expr: &Expr,
        features: &FeatureMap,
        rules: &RuleContext,
    ) -> Result<Value> {
        self.eval(expr, features, rules, 1)
    }

    fn eval(
        &self,
        expr: &Expr,
        features: &FeatureMap,
        rules: &RuleContext,
        depth: usize,
    ) -> Result<Value> {
        // 手工构造的语法树不经过语法分析器，这里再做一次深度保护
        let max_depth = self.compiler.max_depth();
        if depth > max_depth {
            return Err(RuleError::syntax(
                format!("表达式嵌套超过最大深度 {}", max_depth),
                0,
            ));
        }

        match expr {
            Expr::Literal { value, .. } => Ok(value.clone()),

            Expr::Identifier { name } => {
                Self::resolve_identifier(name, features, rules).map_err(|e| e.in_expression(expr))
            }

            Expr::FeatureAccess { path } => {
                PathResolver::resolve(path, features).map_err(|e| e.in_expression(expr))
            }

            Expr::Unary { op, operand } => {
                let value = self.eval(operand, features, rules, depth + 1)?;
                self.registry
                    .lookup(op, Arity::Unary)
                    .and_then(|operator| operator.apply_unary(&value))
                    .map_err(|e| e.in_expression(expr))
            }

            Expr::Binary { left, op, right } => {
                let lhs = self.eval(left, features, rules, depth + 1)?;

                // 短路：右侧不求值，其中可能出现的错误也就不会发生
                match (op.as_str(), &lhs) {
                    ("&&", Value::Bool(false)) => return Ok(Value::Bool(false)),
                    ("||", Value::Bool(true)) => return Ok(Value::Bool(true)),
                    _ => {}
                }

                let rhs = self.eval(right, features, rules, depth + 1)?;
                self.registry
                    .lookup(op, Arity::Binary)
                    .and_then(|operator| operator.apply_binary(&lhs, &rhs))
                    .map_err(|e| e.in_expression(expr))
            }
        }
    }

    /// 先查规则上下文，再查顶层特征
    fn resolve_identifier(name: &str, features: &FeatureMap, rules: &RuleContext) -> Result<Value> {
        if let Some(value) = rules.get(name) {
            return Ok(value.clone());
        }

        match features.get(name) {
            Some(json) => Value::from_json(json).ok_or_else(|| {
                RuleError::invalid_path(name, "标识符指向对象或数组，而不是标量值")
            }),
            None => Err(RuleError::UnknownIdentifier(name.to_string())),
        }
    }
}

impl Default for ExpressionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}
