//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集。
//! 引擎本身不监听端口，宿主进程通过 `render()` 获取抓取文本后自行暴露。

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

/// 策略执行次数
pub const POLICY_EXECUTIONS_TOTAL: &str = "policy_executions_total";
/// 策略执行耗时
pub const POLICY_EXECUTION_DURATION_SECONDS: &str = "policy_execution_duration_seconds";
/// 规则求值次数
pub const RULE_EVALUATIONS_TOTAL: &str = "rule_evaluations_total";

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// 安装全局 Prometheus recorder
///
/// 已安装时直接返回，不会重复安装。
pub fn init() -> Result<()> {
    if PROMETHEUS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROMETHEUS_HANDLE.set(handle);

    describe_metrics();
    Ok(())
}

/// 注册指标描述，出现在抓取文本的 HELP 注释中
fn describe_metrics() {
    metrics::describe_counter!(POLICY_EXECUTIONS_TOTAL, "Total number of policy executions");
    metrics::describe_histogram!(
        POLICY_EXECUTION_DURATION_SECONDS,
        "Policy execution duration in seconds"
    );
    metrics::describe_counter!(RULE_EVALUATIONS_TOTAL, "Total number of rule evaluations");
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// 渲染当前指标快照，recorder 未安装时返回 None
pub fn render() -> Option<String> {
    get_handle().map(|h| h.render())
}

/// 记录一次策略执行
#[inline]
pub fn record_policy_execution(policy: &str, success: bool, duration_secs: f64) {
    let status = if success { "success" } else { "failure" };

    metrics::counter!(
        POLICY_EXECUTIONS_TOTAL,
        "policy" => policy.to_string(),
        "status" => status
    )
    .increment(1);

    metrics::histogram!(
        POLICY_EXECUTION_DURATION_SECONDS,
        "policy" => policy.to_string()
    )
    .record(duration_secs);
}

/// 记录一次规则求值
#[inline]
pub fn record_rule_evaluation(success: bool) {
    let status = if success { "success" } else { "failure" };
    metrics::counter!(RULE_EVALUATIONS_TOTAL, "status" => status).increment(1);
}
