//! 规则依赖图
//!
//! 校验策略内规则的依赖关系（引用存在、无环），并计算执行顺序。环检测使用显式
//! 栈做深度优先遍历，依赖链再长也不会消耗调用栈。

use crate::error::{Result, RuleError};
use crate::models::Policy;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::iter;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Visited,
}

/// 规则依赖图，按策略中的声明顺序保存
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    edges: IndexMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// 从策略构建依赖图，不做校验
    pub fn from_policy(policy: &Policy) -> Self {
        let edges = policy
            .rules()
            .map(|rule| (rule.name.clone(), rule.dependencies.clone()))
            .collect();
        Self { edges }
    }

    /// 校验策略并构建依赖图
    ///
    /// 依次检查：至少一条规则、规则名和表达式非空、依赖的规则存在、无循环依赖。
    pub fn validate(policy: &Policy) -> Result<Self> {
        if policy.rule_count() == 0 {
            return Err(RuleError::PolicyValidation(format!(
                "策略 '{}' 不包含任何规则",
                policy.name
            )));
        }

        for rule in policy.rules() {
            if rule.name.trim().is_empty() {
                return Err(RuleError::PolicyValidation(
                    "规则名称不能为空".to_string(),
                ));
            }

            if rule.expression.trim().is_empty() {
                return Err(RuleError::PolicyValidation(format!(
                    "规则 '{}' 的表达式不能为空",
                    rule.name
                )));
            }

            if let Some(missing) = rule.dependencies.iter().find(|d| !policy.has_rule(d)) {
                return Err(RuleError::PolicyValidation(format!(
                    "规则 '{}' 依赖不存在的规则 '{}'",
                    rule.name, missing
                )));
            }
        }

        let graph = Self::from_policy(policy);
        graph.detect_cycles()?;
        Ok(graph)
    }

    /// 规则的直接依赖
    pub fn dependencies(&self, name: &str) -> &[String] {
        self.edges.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// 直接依赖该规则的规则
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(_, deps)| deps.iter().any(|d| d == name))
            .map(|(rule, _)| rule.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// 检测循环依赖，错误信息包含环上的规则路径
    pub fn detect_cycles(&self) -> Result<()> {
        let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(self.edges.len());

        for start in self.edges.keys() {
            if marks.contains_key(start.as_str()) {
                continue;
            }

            // (规则, 下一个待访问的依赖下标)
            let mut stack: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
            marks.insert(start.as_str(), Mark::Visiting);

            while let Some(&(node, cursor)) = stack.last() {
                let Some(dependency) = self.dependencies(node).get(cursor) else {
                    marks.insert(node, Mark::Visited);
                    stack.pop();
                    continue;
                };

                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }

                let dependency = dependency.as_str();
                match marks.get(dependency) {
                    Some(Mark::Visiting) => {
                        let cycle: Vec<&str> = stack
                            .iter()
                            .map(|(name, _)| *name)
                            .skip_while(|name| *name != dependency)
                            .chain(iter::once(dependency))
                            .collect();
                        return Err(RuleError::CircularDependency(cycle.join(" -> ")));
                    }
                    Some(Mark::Visited) => {}
                    None if self.edges.contains_key(dependency) => {
                        marks.insert(dependency, Mark::Visiting);
                        stack.push((dependency, 0));
                    }
                    // 不存在的依赖由 validate 报告
                    None => {}
                }
            }
        }

        Ok(())
    }

    /// 计算执行顺序
    ///
    /// 反复按声明顺序扫描未排序的规则，依赖全部就绪即加入结果；某轮扫描没有任何
    /// 进展时失败。
    pub fn execution_order(&self) -> Result<Vec<String>> {
        let mut ordered: Vec<String> = Vec::with_capacity(self.edges.len());
        let mut placed: HashSet<&str> = HashSet::with_capacity(self.edges.len());

        while ordered.len() < self.edges.len() {
            let mut progressed = false;

            for (name, deps) in &self.edges {
                if placed.contains(name.as_str()) {
                    continue;
                }
                if deps.iter().all(|d| placed.contains(d.as_str())) {
                    placed.insert(name.as_str());
                    ordered.push(name.clone());
                    progressed = true;
                }
            }

            if !progressed {
                let remaining: Vec<&str> = self
                    .edges
                    .keys()
                    .map(String::as_str)
                    .filter(|name| !placed.contains(name))
                    .collect();
                return Err(RuleError::PolicyValidation(format!(
                    "无法确定执行顺序，剩余规则: {}",
                    remaining.join(", ")
                )));
            }
        }

        debug!(order = ?ordered, "执行顺序已确定");
        Ok(ordered)
    }
}

/// 校验策略并返回执行顺序
pub fn resolve_execution_order(policy: &Policy) -> Result<Vec<String>> {
    DependencyGraph::validate(policy)?.execution_order()
}
