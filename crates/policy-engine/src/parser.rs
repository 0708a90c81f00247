//! 递归下降语法分析器
//!
//! 优先级从低到高：
//! `||` → `&&` → `==` `!=` → `<` `<=` `>` `>=` → `+` `-` → `*` `/` `%` → 一元 `!` `-` → 基本表达式。
//!
//! 二元层全部左结合，以循环方式构建；一元层右结合递归。括号/一元嵌套层数与
//! 语法树高度都受 `max_depth` 限制，保证后续递归求值不会耗尽栈。

use crate::ast::{Expr, LiteralKind};
use crate::error::{Result, RuleError};
use crate::lexer::{Token, TokenKind};
use crate::value::Value;

/// 默认最大嵌套深度
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// 特征访问的根标识符
pub const FEATURE_MAP_ROOT: &str = "featureMap";

/// 解析 token 序列为语法树
pub fn parse(tokens: Vec<Token>) -> Result<Expr> {
    Parser::new(tokens).parse()
}

/// 带高度的子树
struct Parsed {
    expr: Expr,
    height: usize,
}

impl Parsed {
    fn leaf(expr: Expr) -> Self {
        Self { expr, height: 1 }
    }
}

/// 语法分析器
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    max_depth: usize,
    nesting: usize,
}

impl Parser {
    /// 创建分析器，`Invalid` token 在此处被丢弃
    pub fn new(tokens: Vec<Token>) -> Self {
        let tokens = tokens
            .into_iter()
            .filter(|t| t.kind != TokenKind::Invalid)
            .collect();

        Self {
            tokens,
            current: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            nesting: 0,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// 解析完整表达式
    pub fn parse(mut self) -> Result<Expr> {
        if self.is_at_end() {
            return Err(RuleError::syntax("空表达式", self.peek_position()));
        }

        let parsed = self.logical_or()?;

        if !self.is_at_end() {
            let token = self.peek_token();
            return Err(RuleError::syntax(
                format!("表达式后存在多余的 token: {}", token),
                token.position,
            ));
        }

        Ok(parsed.expr)
    }

    fn logical_or(&mut self) -> Result<Parsed> {
        let mut left = self.logical_and()?;
        while let Some(op) = self.match_operator(&[TokenKind::Or]) {
            let right = self.logical_and()?;
            left = self.combine(left, op, right)?;
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Parsed> {
        let mut left = self.equality()?;
        while let Some(op) = self.match_operator(&[TokenKind::And]) {
            let right = self.equality()?;
            left = self.combine(left, op, right)?;
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Parsed> {
        let mut left = self.relational()?;
        while let Some(op) = self.match_operator(&[TokenKind::Equal, TokenKind::NotEqual]) {
            let right = self.relational()?;
            left = self.combine(left, op, right)?;
        }
        Ok(left)
    }

    fn relational(&mut self) -> Result<Parsed> {
        let mut left = self.additive()?;
        while let Some(op) = self.match_operator(&[
            TokenKind::Less,
            TokenKind::LessEqual,
            TokenKind::Greater,
            TokenKind::GreaterEqual,
        ]) {
            let right = self.additive()?;
            left = self.combine(left, op, right)?;
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Parsed> {
        let mut left = self.multiplicative()?;
        while let Some(op) = self.match_operator(&[TokenKind::Plus, TokenKind::Minus]) {
            let right = self.multiplicative()?;
            left = self.combine(left, op, right)?;
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Parsed> {
        let mut left = self.unary()?;
        while let Some(op) =
            self.match_operator(&[TokenKind::Star, TokenKind::Slash, TokenKind::Percent])
        {
            let right = self.unary()?;
            left = self.combine(left, op, right)?;
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Parsed> {
        if let Some(op) = self.match_operator(&[TokenKind::Not, TokenKind::Minus]) {
            let position = self.previous().position;
            self.enter(position)?;
            let operand = self.unary();
            self.nesting -= 1;
            let operand = operand?;

            let height = operand.height + 1;
            self.check_height(height, position)?;
            return Ok(Parsed {
                expr: Expr::unary(op, operand.expr),
                height,
            });
        }

        self.primary()
    }

    fn primary(&mut self) -> Result<Parsed> {
        if self.match_kind(TokenKind::Number) {
            return self.number_literal().map(Parsed::leaf);
        }

        if self.match_kind(TokenKind::String) {
            let text = self.previous().lexeme.clone();
            return Ok(Parsed::leaf(Expr::literal(
                Value::String(text),
                LiteralKind::String,
            )));
        }

        if self.match_kind(TokenKind::Boolean) {
            let flag = self.previous().lexeme == "true";
            return Ok(Parsed::leaf(Expr::literal(
                Value::Bool(flag),
                LiteralKind::Boolean,
            )));
        }

        if self.match_kind(TokenKind::LeftParen) {
            let position = self.previous().position;
            self.enter(position)?;
            let inner = self.logical_or();
            self.nesting -= 1;
            let inner = inner?;
            self.consume(TokenKind::RightParen, "期望 ')'")?;
            return Ok(inner);
        }

        if self.match_kind(TokenKind::Identifier) {
            let name = self.previous().lexeme.clone();
            if name == FEATURE_MAP_ROOT && self.check(TokenKind::Dot) {
                return self.feature_access(name).map(Parsed::leaf);
            }
            return Ok(Parsed::leaf(Expr::identifier(name)));
        }

        let token = self.peek_token();
        Err(RuleError::syntax(
            format!("意外的 token: {}", token),
            token.position,
        ))
    }

    /// 数字字面量：无小数点时优先 Int，放不下时 Long
    fn number_literal(&self) -> Result<Expr> {
        let token = self.previous();
        let text = token.lexeme.as_str();

        let value = if text.contains('.') {
            text.parse::<f64>().ok().map(Value::Double)
        } else if let Ok(small) = text.parse::<i32>() {
            Some(Value::Int(small))
        } else {
            text.parse::<i64>().ok().map(Value::Long)
        };

        value
            .map(|v| Expr::literal(v, LiteralKind::Number))
            .ok_or_else(|| {
                RuleError::syntax(format!("无效的数字: {}", text), token.position)
            })
    }

    /// `featureMap.a.b[0].c`：贪婪地收集 `.identifier` 段，下标内容原样保留
    fn feature_access(&mut self, root: String) -> Result<Expr> {
        let mut path = root;

        while self.match_kind(TokenKind::Dot) {
            let segment = self.consume(TokenKind::Identifier, "'.' 之后需要标识符")?;
            path.push('.');
            path.push_str(&segment.lexeme);

            while self.match_kind(TokenKind::LeftBracket) {
                path.push('[');
                loop {
                    if self.is_at_end() {
                        return Err(RuleError::syntax(
                            "特征路径下标缺少 ']'",
                            self.peek_position(),
                        ));
                    }
                    let token = self.advance();
                    if token.kind == TokenKind::RightBracket {
                        break;
                    }
                    path.push_str(&token.lexeme);
                }
                path.push(']');
            }
        }

        Ok(Expr::feature_access(path))
    }

    fn combine(&self, left: Parsed, op: &'static str, right: Parsed) -> Result<Parsed> {
        let height = left.height.max(right.height) + 1;
        self.check_height(height, self.previous_position())?;
        Ok(Parsed {
            expr: Expr::binary(left.expr, op, right.expr),
            height,
        })
    }

    fn enter(&mut self, position: usize) -> Result<()> {
        if self.nesting >= self.max_depth {
            return Err(RuleError::syntax(
                format!("表达式嵌套超过最大深度 {}", self.max_depth),
                position,
            ));
        }
        self.nesting += 1;
        Ok(())
    }

    fn check_height(&self, height: usize, position: usize) -> Result<()> {
        if height > self.max_depth {
            return Err(RuleError::syntax(
                format!("表达式嵌套超过最大深度 {}", self.max_depth),
                position,
            ));
        }
        Ok(())
    }

    // ==================== token 游标工具 ====================

    fn match_operator(&mut self, kinds: &[TokenKind]) -> Option<&'static str> {
        let symbol = kinds
            .iter()
            .any(|k| self.check(*k))
            .then(|| self.peek_token().operator_symbol())
            .flatten()?;
        self.advance();
        Some(symbol)
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.tokens[self.current].kind == kind
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        let token = self.peek_token();
        Err(RuleError::syntax(
            format!("{}，实际为 {}", message, token),
            token.position,
        ))
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.current].clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn is_at_end(&self) -> bool {
        self.tokens
            .get(self.current)
            .is_none_or(|t| t.kind == TokenKind::Eof)
    }

    fn peek_token(&self) -> Token {
        self.tokens
            .get(self.current)
            .cloned()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, "", self.peek_position()))
    }

    fn peek_position(&self) -> usize {
        self.tokens
            .get(self.current)
            .or_else(|| self.tokens.last())
            .map_or(0, |t| t.position)
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn previous_position(&self) -> usize {
        self.tokens
            .get(self.current.saturating_sub(1))
            .map_or(0, |t| t.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_str(input: &str) -> Result<Expr> {
        parse(tokenize(input))
    }

    fn render(input: &str) -> String {
        parse_str(input).unwrap().to_string()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(render("2 + 3 * 4"), "(2 + (3 * 4))");
        assert_eq!(render("(2 + 3) * 4"), "((2 + 3) * 4)");
        assert_eq!(
            render("a || b && c == d < e + f * g"),
            "(a || (b && (c == (d < (e + (f * g))))))"
        );
    }

    #[test]
    fn test_left_associative() {
        assert_eq!(render("a - b - c"), "((a - b) - c)");
        assert_eq!(render("8 / 4 / 2"), "((8 / 4) / 2)");
        assert_eq!(render("a || b || c"), "((a || b) || c)");
    }

    #[test]
    fn test_unary_right_associative() {
        assert_eq!(render("--a"), "--a");
        let expr = parse_str("--a").unwrap();
        match expr {
            Expr::Unary { op, operand } => {
                assert_eq!(op, "-");
                assert!(matches!(*operand, Expr::Unary { .. }));
            }
            other => panic!("unexpected node: {:?}", other),
        }
        assert_eq!(render("!a && b"), "(!a && b)");
        assert_eq!(render("-2 * 3"), "(-2 * 3)");
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            parse_str("42").unwrap(),
            Expr::literal(Value::Int(42), LiteralKind::Number)
        );
        assert_eq!(
            parse_str("3000000000").unwrap(),
            Expr::literal(Value::Long(3_000_000_000), LiteralKind::Number)
        );
        assert_eq!(
            parse_str("2.5").unwrap(),
            Expr::literal(Value::Double(2.5), LiteralKind::Number)
        );
        assert_eq!(
            parse_str("'gold'").unwrap(),
            Expr::literal(Value::from("gold"), LiteralKind::String)
        );
        assert_eq!(
            parse_str("false").unwrap(),
            Expr::literal(Value::Bool(false), LiteralKind::Boolean)
        );
    }

    #[test]
    fn test_number_too_large() {
        let err = parse_str("99999999999999999999").unwrap_err();
        assert!(matches!(err, RuleError::Syntax { .. }));
    }

    #[test]
    fn test_feature_access() {
        assert_eq!(
            parse_str("featureMap.user.age").unwrap(),
            Expr::feature_access("featureMap.user.age")
        );
        assert_eq!(
            parse_str("featureMap.items[0].price").unwrap(),
            Expr::feature_access("featureMap.items[0].price")
        );
        // 下标内容不做校验，原样保留
        assert_eq!(
            parse_str("featureMap.items[-1]").unwrap(),
            Expr::feature_access("featureMap.items[-1]")
        );
        // 不跟 '.' 的 featureMap 只是普通标识符
        assert_eq!(parse_str("featureMap").unwrap(), Expr::identifier("featureMap"));
    }

    #[test]
    fn test_feature_access_errors() {
        assert!(matches!(
            parse_str("featureMap.").unwrap_err(),
            RuleError::Syntax { .. }
        ));
        assert!(matches!(
            parse_str("featureMap.items[0").unwrap_err(),
            RuleError::Syntax { .. }
        ));
    }

    #[test]
    fn test_syntax_errors() {
        let empty = parse_str("").unwrap_err();
        assert!(empty.to_string().contains("空表达式"));

        let trailing = parse_str("1 2").unwrap_err();
        assert!(matches!(trailing, RuleError::Syntax { position: 2, .. }));

        let missing_paren = parse_str("(1 + 2").unwrap_err();
        assert!(missing_paren.to_string().contains("')'"));

        let dangling = parse_str("1 +").unwrap_err();
        assert!(dangling.to_string().contains("意外的 token"));
    }

    #[test]
    fn test_invalid_tokens_are_dropped() {
        assert_eq!(render("1 # + 2"), "(1 + 2)");
        // 只剩无效字符时等同于空表达式
        assert!(parse_str("#").is_err());
    }

    #[test]
    fn test_depth_limit() {
        let nested = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        let err = Parser::new(tokenize(&nested))
            .with_max_depth(10)
            .parse()
            .unwrap_err();
        assert!(err.to_string().contains("最大深度"));

        let chain = vec!["1"; 50].join(" + ");
        assert!(Parser::new(tokenize(&chain)).with_max_depth(10).parse().is_err());
        assert!(Parser::new(tokenize(&chain)).with_max_depth(64).parse().is_ok());

        let negations = format!("{}1", "-".repeat(30));
        assert!(Parser::new(tokenize(&negations)).with_max_depth(10).parse().is_err());
    }
}
