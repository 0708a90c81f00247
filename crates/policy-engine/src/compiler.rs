//! 表达式编译器
//!
//! 把表达式文本经词法、语法分析编译为语法树，并预提取其中引用的特征路径和
//! 标识符，供调用方在求值前校验输入数据。

use crate::ast::Expr;
use crate::error::Result;
use crate::lexer::tokenize;
use crate::parser::{DEFAULT_MAX_DEPTH, Parser};
use std::collections::BTreeSet;

/// 编译后的表达式
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    /// 原始表达式文本
    pub source: String,
    pub ast: Expr,
    /// 表达式中的全部 `featureMap.` 路径
    pub feature_paths: BTreeSet<String>,
    /// 表达式中的全部裸标识符（规则名或顶层特征名）
    pub identifiers: BTreeSet<String>,
}

impl CompiledExpression {
    /// 是否引用了指定名称
    pub fn references(&self, name: &str) -> bool {
        self.identifiers.contains(name)
    }
}

/// 表达式编译器
#[derive(Debug, Clone, Copy)]
pub struct ExpressionCompiler {
    max_depth: usize,
}

impl ExpressionCompiler {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// 最大深度至少为 1
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// 编译表达式
    pub fn compile(&self, expression: &str) -> Result<CompiledExpression> {
        let ast = Parser::new(tokenize(expression))
            .with_max_depth(self.max_depth)
            .parse()?;

        let mut feature_paths = BTreeSet::new();
        let mut identifiers = BTreeSet::new();
        Self::collect_references(&ast, &mut feature_paths, &mut identifiers);

        Ok(CompiledExpression {
            source: expression.to_string(),
            ast,
            feature_paths,
            identifiers,
        })
    }

    /// 递归收集引用；树高已被语法分析器限制
    fn collect_references(
        expr: &Expr,
        feature_paths: &mut BTreeSet<String>,
        identifiers: &mut BTreeSet<String>,
    ) {
        match expr {
            Expr::Literal { .. } => {}
            Expr::Identifier { name } => {
                identifiers.insert(name.clone());
            }
            Expr::FeatureAccess { path } => {
                feature_paths.insert(path.clone());
            }
            Expr::Unary { operand, .. } => {
                Self::collect_references(operand, feature_paths, identifiers);
            }
            Expr::Binary { left, right, .. } => {
                Self::collect_references(left, feature_paths, identifiers);
                Self::collect_references(right, feature_paths, identifiers);
            }
        }
    }
}

impl Default for ExpressionCompiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleError;

    #[test]
    fn test_compile_extracts_references() {
        let compiled = ExpressionCompiler::new()
            .compile(
                "eligible && featureMap.user.age >= 18 && (featureMap.items[0].price > limit || featureMap.user.age < 0)",
            )
            .unwrap();

        assert_eq!(compiled.feature_paths.len(), 2);
        assert!(compiled.feature_paths.contains("featureMap.user.age"));
        assert!(compiled.feature_paths.contains("featureMap.items[0].price"));

        let identifiers: Vec<_> = compiled.identifiers.iter().map(String::as_str).collect();
        assert_eq!(identifiers, vec!["eligible", "limit"]);
        assert!(compiled.references("limit"));
        assert!(!compiled.references("featureMap"));
    }

    #[test]
    fn test_compile_literal_only() {
        let compiled = ExpressionCompiler::default().compile("1 + 2").unwrap();
        assert!(compiled.feature_paths.is_empty());
        assert!(compiled.identifiers.is_empty());
        assert_eq!(compiled.source, "1 + 2");
    }

    #[test]
    fn test_compile_errors() {
        let err = ExpressionCompiler::new().compile("   ").unwrap_err();
        assert!(matches!(err, RuleError::Syntax { .. }));

        let deep = format!("{}x{}", "(".repeat(5), ")".repeat(5));
        assert!(ExpressionCompiler::with_max_depth(4).compile(&deep).is_err());
        assert!(ExpressionCompiler::with_max_depth(5).compile(&deep).is_ok());
    }

    #[test]
    fn test_zero_depth_is_clamped() {
        let compiler = ExpressionCompiler::with_max_depth(0);
        assert_eq!(compiler.max_depth(), 1);
        assert!(compiler.compile("x").is_ok());
        assert!(compiler.compile("1 + 2").is_err());
    }
}
