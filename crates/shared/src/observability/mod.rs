//! 统一可观测性模块
//!
//! 提供 logging、metrics 的统一初始化和管理。
//! 引擎的宿主进程通过单一入口点配置可观测性，确保一致的日志格式和指标命名。

pub mod metrics;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;

use crate::config::ObservabilityConfig;

/// 可观测性资源守卫
///
/// 持有各种可观测性资源的生命周期，Drop 时输出关闭日志。
pub struct ObservabilityGuard {
    metrics_installed: bool,
}

impl ObservabilityGuard {
    /// 创建一个空的 Guard（用于测试或禁用可观测性时）
    pub fn empty() -> Self {
        Self {
            metrics_installed: false,
        }
    }

    /// Prometheus recorder 是否已安装
    pub fn metrics_installed(&self) -> bool {
        self.metrics_installed
    }
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        info!("Shutting down observability...");
    }
}

/// 统一初始化可观测性
///
/// 初始化顺序：
/// 1. Tracing（日志）
/// 2. Metrics（Prometheus recorder，可通过配置关闭）
///
/// # Example
///
/// ```ignore
/// use policy_shared::config::AppConfig;
/// use policy_shared::observability;
///
/// let config = AppConfig::load("policy-engine")?;
/// let _guard = observability::init(&config.observability)?;
/// ```
pub fn init(config: &ObservabilityConfig) -> Result<ObservabilityGuard> {
    tracing::init(config)?;

    let metrics_installed = if config.metrics_enabled {
        metrics::init()?;
        true
    } else {
        false
    };

    info!(
        log_level = %config.log_level,
        json_logs = config.json_logs,
        metrics_enabled = metrics_installed,
        "Observability initialized"
    );

    Ok(ObservabilityGuard { metrics_installed })
}
