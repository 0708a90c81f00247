//! 策略引擎领域模型

use crate::value::Value;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// 已执行规则的结果，按规则名索引
pub type RuleContext = HashMap<String, Value>;

/// 特征数据 - 表达式读取的外部输入
///
/// 任意嵌套的 JSON 结构，由路径解析器按点号/下标导航。
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMap {
    data: serde_json::Value,
}

impl FeatureMap {
    pub fn new(data: serde_json::Value) -> Self {
        Self { data }
    }

    /// 从 JSON 文本创建
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let data: serde_json::Value = serde_json::from_str(json)?;
        Ok(Self { data })
    }

    /// 获取顶层特征
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// 获取底层数据
    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        match &self.data {
            serde_json::Value::Object(map) => map.is_empty(),
            serde_json::Value::Null => true,
            _ => false,
        }
    }
}

impl Default for FeatureMap {
    fn default() -> Self {
        Self::new(serde_json::Value::Object(serde_json::Map::new()))
    }
}

impl From<serde_json::Value> for FeatureMap {
    fn from(data: serde_json::Value) -> Self {
        Self::new(data)
    }
}

/// 规则定义
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub name: String,
    pub expression: String,
    pub description: String,
    /// 依赖的规则名，保持声明顺序
    pub dependencies: Vec<String>,
}

impl Rule {
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            description: String::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// 追加依赖，已存在的依赖不重复添加
    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        let dependency = dependency.into();
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        self
    }

    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }
}

/// 策略 - 一组带依赖关系的规则
///
/// 规则按名称唯一存放，名称由容器中的键决定。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PolicyDefinition")]
pub struct Policy {
    pub name: String,
    pub description: String,
    pub version: String,
    rules: IndexMap<String, Rule>,
}

impl Policy {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            version: version.into(),
            rules: IndexMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.add_rule(rule);
        self
    }

    /// 添加规则，同名规则被替换
    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.insert(rule.name.clone(), rule);
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// 按声明顺序遍历规则
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

/// 外部策略定义的反序列化形态
#[derive(Deserialize)]
struct PolicyDefinition {
    #[serde(alias = "policyName")]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    rules: IndexMap<String, RuleDefinition>,
}

#[derive(Deserialize)]
struct RuleDefinition {
    #[serde(default)]
    expression: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    dependencies: Vec<String>,
}

impl From<PolicyDefinition> for Policy {
    fn from(definition: PolicyDefinition) -> Self {
        let rules = definition
            .rules
            .into_iter()
            .map(|(name, rule)| {
                let rule = Rule {
                    name: name.clone(),
                    expression: rule.expression,
                    description: rule.description,
                    dependencies: rule.dependencies,
                };
                (name, rule)
            })
            .collect();

        Self {
            name: definition.name,
            description: definition.description,
            version: definition.version,
            rules,
        }
    }
}

/// 单条规则的执行结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleResult {
    pub rule_name: String,
    pub result: Option<Value>,
    pub success: bool,
    pub error: Option<String>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl RuleResult {
    pub fn success(rule_name: impl Into<String>, value: Value, elapsed: Duration) -> Self {
        Self {
            rule_name: rule_name.into(),
            result: Some(value),
            success: true,
            error: None,
            elapsed,
        }
    }

    pub fn failure(
        rule_name: impl Into<String>,
        error: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            rule_name: rule_name.into(),
            result: None,
            success: false,
            error: Some(error.into()),
            elapsed,
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }

    /// 布尔型结果
    pub fn bool_result(&self) -> Option<bool> {
        self.result.as_ref().and_then(Value::as_bool)
    }

    /// 数值型结果（统一为 64 位浮点）
    pub fn numeric_result(&self) -> Option<f64> {
        self.result.as_ref().and_then(Value::as_f64)
    }
}

/// 策略执行结果
#[derive(Debug, Clone, Serialize)]
pub struct PolicyResult {
    pub execution_id: Uuid,
    pub policy_name: String,
    pub policy_version: String,
    pub success: bool,
    /// 插入顺序即执行顺序
    pub rule_results: IndexMap<String, RuleResult>,
    pub errors: Vec<String>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub executed_at: DateTime<Utc>,
}

impl PolicyResult {
    pub fn new(policy_name: impl Into<String>, policy_version: impl Into<String>) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            policy_name: policy_name.into(),
            policy_version: policy_version.into(),
            success: false,
            rule_results: IndexMap::new(),
            errors: Vec::new(),
            elapsed: Duration::ZERO,
            executed_at: Utc::now(),
        }
    }

    /// 记录一条规则结果，失败时同时追加错误信息
    pub(crate) fn record(&mut self, result: RuleResult) {
        if let Some(error) = &result.error {
            self.errors
                .push(format!("规则 '{}' 执行失败: {}", result.rule_name, error));
        }
        self.rule_results.insert(result.rule_name.clone(), result);
    }

    /// 规则的实际执行顺序
    pub fn execution_order(&self) -> Vec<&str> {
        self.rule_results.keys().map(String::as_str).collect()
    }

    pub fn rule_result(&self, name: &str) -> Option<&RuleResult> {
        self.rule_results.get(name)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_micros() as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_policy_deserialization() {
        let json = r#"
        {
            "policyName": "credit_check",
            "description": "信用评估",
            "version": "2.1",
            "rules": {
                "high_score": {
                    "expression": "featureMap.score > 700",
                    "description": "高信用分"
                },
                "approve": {
                    "name": "ignored",
                    "expression": "high_score && featureMap.income >= 5000",
                    "dependencies": ["high_score"]
                }
            }
        }
        "#;

        let policy: Policy = serde_json::from_str(json).unwrap();
        assert_eq!(policy.name, "credit_check");
        assert_eq!(policy.version, "2.1");
        assert_eq!(policy.rule_count(), 2);

        // 规则名以键为准
        let approve = policy.rule("approve").unwrap();
        assert_eq!(approve.name, "approve");
        assert_eq!(approve.dependencies, vec!["high_score"]);

        let names: Vec<_> = policy.rules().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["high_score", "approve"]);
    }

    #[test]
    fn test_policy_builder() {
        let policy = Policy::new("p", "1.0")
            .with_description("demo")
            .with_rule(Rule::new("a", "1 + 1"))
            .with_rule(Rule::new("b", "a * 2").depends_on("a").depends_on("a"));

        assert!(policy.has_rule("a"));
        assert!(!policy.has_rule("c"));
        assert_eq!(policy.rule("b").unwrap().dependencies.len(), 1);
        assert!(policy.rule("b").unwrap().has_dependencies());
    }

    #[test]
    fn test_feature_map() {
        let features = FeatureMap::from_json(r#"{"user": {"age": 30}}"#).unwrap();
        assert_eq!(features.get("user"), Some(&json!({"age": 30})));
        assert!(!features.is_empty());
        assert!(FeatureMap::default().is_empty());
    }

    #[test]
    fn test_policy_result_bookkeeping() {
        let mut result = PolicyResult::new("p", "1.0");
        result.record(RuleResult::success("a", Value::Bool(true), Duration::from_millis(2)));
        result.record(RuleResult::failure("b", "除数为零", Duration::ZERO));

        assert_eq!(result.execution_order(), vec!["a", "b"]);
        assert!(result.has_errors());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("'b'"));
        assert_eq!(result.rule_result("a").unwrap().bool_result(), Some(true));
        assert!(result.rule_result("b").unwrap().has_error());
    }

    #[test]
    fn test_result_serialization() {
        let mut result = PolicyResult::new("p", "1.0");
        result.record(RuleResult::success("a", Value::Int(7), Duration::from_millis(3)));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["policy_name"], json!("p"));
        assert_eq!(json["rule_results"]["a"]["result"], json!(7));
        assert_eq!(json["rule_results"]["a"]["elapsed_ms"], json!(3.0));
        assert!(json["execution_id"].is_string());
    }
}
