//! 操作符注册表
//!
//! 注册表持有 `Arc<ArcSwap<OperatorTable>>`：查找是一次原子 load，注册时复制当前
//! 快照、插入后整体替换。读取端永远看到完整的表，不会观察到半安装的操作符，
//! 也不会在求值期间持有任何锁。

use super::{Arity, Operator, OperatorCategory, default_operators};
use crate::error::{Result, RuleError};
use arc_swap::ArcSwap;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// 不可变的操作符快照
#[derive(Debug, Clone, Default)]
pub struct OperatorTable {
    unary: HashMap<String, Operator>,
    binary: HashMap<String, Operator>,
}

impl OperatorTable {
    fn with_defaults() -> Self {
        let mut table = Self::default();
        for operator in default_operators() {
            table.insert(operator);
        }
        table
    }

    fn insert(&mut self, operator: Operator) {
        let symbol = operator.symbol().to_string();
        match operator.arity() {
            Arity::Unary => self.unary.insert(symbol, operator),
            Arity::Binary => self.binary.insert(symbol, operator),
        };
    }

    fn get(&self, symbol: &str, arity: Arity) -> Option<&Operator> {
        match arity {
            Arity::Unary => self.unary.get(symbol),
            Arity::Binary => self.binary.get(symbol),
        }
    }

    fn iter(&self) -> impl Iterator<Item = &Operator> {
        self.binary.values().chain(self.unary.values())
    }
}

/// 线程安全的操作符注册表
///
/// 克隆得到的是同一张表的句柄；需要隔离的调用方使用 [`OperatorRegistry::new`]
/// 创建独立实例。
#[derive(Clone)]
pub struct OperatorRegistry {
    table: Arc<ArcSwap<OperatorTable>>,
}

static GLOBAL: OnceLock<OperatorRegistry> = OnceLock::new();

impl OperatorRegistry {
    /// 创建包含全部内置操作符的独立注册表
    pub fn new() -> Self {
        Self::with_table(OperatorTable::with_defaults())
    }

    /// 创建空注册表
    pub fn empty() -> Self {
        Self::with_table(OperatorTable::default())
    }

    fn with_table(table: OperatorTable) -> Self {
        Self {
            table: Arc::new(ArcSwap::from_pointee(table)),
        }
    }

    /// 进程级共享注册表
    pub fn global() -> &'static OperatorRegistry {
        GLOBAL.get_or_init(Self::new)
    }

    /// 注册操作符，同符号同元数的已有操作符被替换
    pub fn register(&self, operator: Operator) {
        debug!(
            symbol = operator.symbol(),
            arity = %operator.arity(),
            "注册操作符"
        );
        self.table.rcu(|current| {
            let mut next = OperatorTable::clone(current);
            next.insert(operator.clone());
            next
        });
    }

    /// 查找操作符
    pub fn lookup(&self, symbol: &str, arity: Arity) -> Result<Operator> {
        self.table
            .load()
            .get(symbol, arity)
            .cloned()
            .ok_or_else(|| RuleError::UnsupportedOperator {
                symbol: symbol.to_string(),
                arity: arity.to_string(),
            })
    }

    /// 任一元数下是否注册了该符号
    pub fn is_registered(&self, symbol: &str) -> bool {
        let table = self.table.load();
        table.unary.contains_key(symbol) || table.binary.contains_key(symbol)
    }

    /// 全部已注册的符号（去重、有序）
    pub fn supported_operators(&self) -> BTreeSet<String> {
        self.table
            .load()
            .iter()
            .map(|o| o.symbol().to_string())
            .collect()
    }

    /// 已注册的操作符数量，一元与二元分别计数
    pub fn operator_count(&self) -> usize {
        let table = self.table.load();
        table.unary.len() + table.binary.len()
    }

    pub fn operators_by_category(&self, category: OperatorCategory) -> Vec<Operator> {
        let mut operators: Vec<Operator> = self
            .table
            .load()
            .iter()
            .filter(|o| o.category() == category)
            .cloned()
            .collect();
        operators.sort_by(|a, b| a.symbol().cmp(b.symbol()));
        operators
    }

    /// 清空全部操作符
    pub fn clear(&self) {
        self.table.store(Arc::new(OperatorTable::default()));
    }

    /// 恢复为内置操作符，丢弃所有自定义注册
    pub fn reset_to_defaults(&self) {
        self.table.store(Arc::new(OperatorTable::with_defaults()));
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("operators", &self.supported_operators())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::precedence;
    use crate::value::Value;
    use std::thread;

    #[test]
    fn test_defaults() {
        let registry = OperatorRegistry::new();
        assert_eq!(registry.operator_count(), 15);
        assert!(registry.is_registered("%"));
        assert!(!registry.is_registered("^"));

        let symbols = registry.supported_operators();
        // `-` 同时是一元和二元，只计一次
        assert_eq!(symbols.len(), 14);
        assert!(symbols.contains("&&"));
    }

    #[test]
    fn test_lookup_by_arity() {
        let registry = OperatorRegistry::new();
        let minus = registry.lookup("-", Arity::Binary).unwrap();
        assert_eq!(minus.category(), OperatorCategory::Arithmetic);

        let neg = registry.lookup("-", Arity::Unary).unwrap();
        assert_eq!(neg.category(), OperatorCategory::Unary);

        let err = registry.lookup("!", Arity::Binary).unwrap_err();
        assert!(matches!(err, RuleError::UnsupportedOperator { .. }));
    }

    #[test]
    fn test_register_overrides() {
        let registry = OperatorRegistry::new();
        registry.register(Operator::binary(
            "+",
            precedence::ADDITION,
            OperatorCategory::Arithmetic,
            |_, _| Ok(Value::Int(42)),
        ));

        let plus = registry.lookup("+", Arity::Binary).unwrap();
        assert_eq!(
            plus.apply_binary(&Value::Int(1), &Value::Int(1)).unwrap(),
            Value::Int(42)
        );
        assert_eq!(registry.operator_count(), 15);

        registry.reset_to_defaults();
        let plus = registry.lookup("+", Arity::Binary).unwrap();
        assert_eq!(
            plus.apply_binary(&Value::Int(1), &Value::Int(1)).unwrap(),
            Value::Int(2)
        );
    }

    #[test]
    fn test_clone_shares_table() {
        let registry = OperatorRegistry::new();
        let handle = registry.clone();
        handle.clear();
        assert_eq!(registry.operator_count(), 0);

        let isolated = OperatorRegistry::new();
        assert_eq!(isolated.operator_count(), 15);
    }

    #[test]
    fn test_operators_by_category() {
        let registry = OperatorRegistry::new();
        let logical: Vec<_> = registry
            .operators_by_category(OperatorCategory::Logical)
            .iter()
            .map(|o| o.symbol().to_string())
            .collect();
        assert_eq!(logical, vec!["&&", "||"]);
        assert_eq!(
            registry.operators_by_category(OperatorCategory::Comparison).len(),
            6
        );
    }

    #[test]
    fn test_concurrent_register_and_lookup() {
        let registry = OperatorRegistry::new();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                thread::spawn(move || {
                    let symbol = format!("op{}", i);
                    registry.register(Operator::unary(symbol.clone(), precedence::UNARY, |v| {
                        Ok(v.clone())
                    }));
                    for _ in 0..100 {
                        assert!(registry.lookup("+", Arity::Binary).is_ok());
                    }
                    registry.lookup(&symbol, Arity::Unary).is_ok()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(registry.operator_count(), 15 + 8);
    }
}
