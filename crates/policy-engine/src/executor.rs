//! 策略执行器
//!
//! 校验依赖 → 计算顺序 → 逐条执行 → 汇总。单条规则失败只记录在它自己的结果中，
//! 不中止策略；失败规则不会进入规则上下文，后续引用它的规则随之以未知标识符失败。
//! 依赖校验或循环依赖错误则在任何规则执行前中止整个策略。

use crate::dependency::resolve_execution_order;
use crate::error::Result;
use crate::evaluator::ExpressionEvaluator;
use crate::models::{FeatureMap, Policy, PolicyResult, Rule, RuleContext, RuleResult};
use policy_shared::config::EngineConfig;
use policy_shared::observability::metrics::{record_policy_execution, record_rule_evaluation};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tracing::{Span, debug, field, info, instrument, warn};

/// 策略执行器
#[derive(Debug, Clone)]
pub struct PolicyExecutor {
    evaluator: ExpressionEvaluator,
    /// 单条规则超过该耗时输出告警
    slow_rule_threshold: Duration,
}

impl PolicyExecutor {
    pub fn new() -> Self {
        Self::from_config(&EngineConfig::default())
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            evaluator: ExpressionEvaluator::from_config(config),
            slow_rule_threshold: Duration::from_millis(config.slow_rule_threshold_ms),
        }
    }

    /// 使用指定的求值器（例如持有独立操作符注册表的求值器）
    pub fn with_evaluator(mut self, evaluator: ExpressionEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_slow_rule_threshold(mut self, threshold: Duration) -> Self {
        self.slow_rule_threshold = threshold;
        self
    }

    pub fn evaluator(&self) -> &ExpressionEvaluator {
        &self.evaluator
    }

    /// 执行策略
    #[instrument(
        skip(self, policy, features),
        fields(policy = %policy.name, version = %policy.version, execution_id = field::Empty)
    )]
    pub fn execute(&self, policy: &Policy, features: &FeatureMap) -> Result<PolicyResult> {
        let order = resolve_execution_order(policy).inspect_err(|e| {
            warn!(error = %e, code = e.code(), "策略校验失败，未执行任何规则");
            record_policy_execution(&policy.name, false, 0.0);
        })?;

        let mut result = PolicyResult::new(&policy.name, &policy.version);
        Span::current().record("execution_id", field::display(result.execution_id));

        let mut context = RuleContext::with_capacity(order.len());
        let start = Instant::now();

        for name in &order {
            let Some(rule) = policy.rule(name) else {
                continue;
            };

            let rule_result = self.execute_rule(rule, features, &context);
            record_rule_evaluation(rule_result.success);

            if let Some(value) = &rule_result.result {
                context.insert(name.clone(), value.clone());
            }
            result.record(rule_result);
        }

        result.elapsed = start.elapsed();
        result.success = !result.has_errors();

        record_policy_execution(&policy.name, result.success, result.elapsed.as_secs_f64());
        info!(
            success = result.success,
            rules = result.rule_results.len(),
            errors = result.errors.len(),
            elapsed_ms = result.elapsed.as_millis() as u64,
            "策略执行完成"
        );

        Ok(result)
    }

    /// 执行单条规则，错误被转换为失败的规则结果
    fn execute_rule(&self, rule: &Rule, features: &FeatureMap, context: &RuleContext) -> RuleResult {
        let start = Instant::now();
        let outcome = self.evaluator.evaluate(&rule.expression, features, context);
        let elapsed = start.elapsed();

        if elapsed > self.slow_rule_threshold {
            warn!(
                rule = %rule.name,
                elapsed_ms = elapsed.as_millis() as u64,
                threshold_ms = self.slow_rule_threshold.as_millis() as u64,
                "规则执行缓慢"
            );
        }

        match outcome {
            Ok(value) => {
                debug!(rule = %rule.name, result = %value, "规则执行成功");
                RuleResult::success(&rule.name, value, elapsed)
            }
            Err(e) => {
                warn!(rule = %rule.name, error = %e, code = e.root_cause().code(), "规则执行失败");
                RuleResult::failure(&rule.name, e.to_string(), elapsed)
            }
        }
    }

    /// 策略中全部规则引用的特征路径
    ///
    /// 可配合 [`crate::path::PathResolver::validate_required_paths`] 在执行前校验输入。
    /// 任一规则表达式无法编译时返回该错误。
    pub fn required_features(&self, policy: &Policy) -> Result<BTreeSet<String>> {
        let compiler = self.evaluator.compiler();
        let mut paths = BTreeSet::new();
        for rule in policy.rules() {
            paths.extend(compiler.compile(&rule.expression)?.feature_paths);
        }
        Ok(paths)
    }
}

impl Default for PolicyExecutor {
    fn default() -> Self {
        Self::new()
    }
}
