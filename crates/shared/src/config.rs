//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// 规则引擎配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 表达式最大嵌套深度（括号、一元运算符以及语法树高度）
    pub max_expression_depth: usize,
    /// 单条规则执行超过该阈值（毫秒）时输出告警日志
    pub slow_rule_threshold_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_expression_depth: 256,
            slow_rule_threshold_ms: 100,
        }
    }
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// 是否输出 JSON 格式日志，否则为人类可读格式
    pub json_logs: bool,
    /// 是否安装 Prometheus 指标 recorder
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub engine: EngineConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（POLICY_ 前缀，层级用双下划线分隔，如
    ///    POLICY_ENGINE__MAX_EXPRESSION_DEPTH -> engine.max_expression_depth）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("POLICY_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        Self::load_from(Path::new(&config_dir), service_name, &env)
    }

    /// 从指定目录加载配置
    pub fn load_from(config_dir: &Path, service_name: &str, env: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", env))).required(false))
            .add_source(
                File::from(config_dir.join(format!("{}.toml", service_name))).required(false),
            )
            .add_source(
                Environment::with_prefix("POLICY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.engine.max_expression_depth, 256);
        assert_eq!(config.engine.slow_rule_threshold_ms, 100);
        assert_eq!(config.observability.log_level, "info");
        assert!(!config.observability.json_logs);
    }

    #[test]
    fn test_load_without_files_uses_defaults() {
        let dir = Path::new("definitely-missing-config-dir");
        let config = AppConfig::load_from(dir, "policy-engine", "test").unwrap();

        assert_eq!(config.service_name, "policy-engine");
        assert_eq!(config.environment, "test");
        assert!(!config.is_production());
        assert_eq!(config.engine.max_expression_depth, 256);
    }

    #[test]
    fn test_env_override() {
        // SAFETY: 该变量仅在本测试中使用
        unsafe {
            std::env::set_var("POLICY_ENGINE__SLOW_RULE_THRESHOLD_MS", "7");
        }

        let dir = Path::new("definitely-missing-config-dir");
        let config = AppConfig::load_from(dir, "policy-engine", "test").unwrap();

        unsafe {
            std::env::remove_var("POLICY_ENGINE__SLOW_RULE_THRESHOLD_MS");
        }

        assert_eq!(config.engine.slow_rule_threshold_ms, 7);
    }
}
