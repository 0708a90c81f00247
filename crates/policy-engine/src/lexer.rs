//! 词法分析器
//!
//! 把表达式字符串切分为有序的 token 序列。该过程永不失败：无法识别的字符
//! 产出 `Invalid` token，由调用方（语法分析器）丢弃。

use std::fmt;

/// Token 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // 字面量
    Number,
    String,
    Boolean,
    Identifier,

    // 算术
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    // 比较
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,

    // 逻辑
    And,
    Or,
    Not,

    // 标点
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Dot,

    Eof,
    Invalid,
}

/// 词法单元
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// 原始文本；字符串字面量不含引号
    pub lexeme: String,
    /// 在输入中的字节偏移
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            position,
        }
    }

    /// 是否为二元或一元操作符
    pub fn is_operator(&self) -> bool {
        self.operator_symbol().is_some()
    }

    /// 能否作为一元操作符出现
    pub fn is_unary_operator(&self) -> bool {
        matches!(self.kind, TokenKind::Not | TokenKind::Minus)
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Number | TokenKind::String | TokenKind::Boolean
        )
    }

    /// 操作符 token 对应的注册表符号
    pub fn operator_symbol(&self) -> Option<&'static str> {
        let symbol = match self.kind {
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Less => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::Equal => "==",
            TokenKind::NotEqual => "!=",
            TokenKind::And => "&&",
            TokenKind::Or => "||",
            TokenKind::Not => "!",
            _ => return None,
        };
        Some(symbol)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == TokenKind::Eof {
            write!(f, "输入结束")
        } else {
            write!(f, "'{}'", self.lexeme)
        }
    }
}

/// 把表达式切分为 token，末尾总是带一个 `Eof`
pub fn tokenize(input: &str) -> Vec<Token> {
    Lexer::new(input).tokenize()
}

/// 词法分析器
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// 切分全部输入
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            if self.pos >= self.input.len() {
                break;
            }
            tokens.push(self.next_token());
        }

        tokens.push(Token::new(TokenKind::Eof, "", self.input.len()));
        tokens
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn next_token(&mut self) -> Token {
        let start = self.pos;
        let rest = self.rest();

        // 双字符操作符优先匹配
        if let Some(kind) = rest.get(..2).and_then(two_char_operator) {
            self.pos += 2;
            return Token::new(kind, &rest[..2], start);
        }

        let Some(current) = rest.chars().next() else {
            return Token::new(TokenKind::Eof, "", start);
        };

        if let Some(kind) = single_char_operator(current) {
            self.pos += 1;
            return Token::new(kind, current.to_string(), start);
        }

        if current.is_ascii_digit() {
            return self.number(start);
        }

        if current == '"' || current == '\'' {
            if let Some(token) = self.string(current, start) {
                return token;
            }
        }

        if current.is_ascii_alphabetic() || current == '_' {
            return self.identifier(start);
        }

        self.pos += current.len_utf8();
        Token::new(TokenKind::Invalid, current.to_string(), start)
    }

    /// 整数或小数，不含指数和符号
    fn number(&mut self, start: usize) -> Token {
        let bytes = self.input.as_bytes();
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }

        // 小数点后至少有一位数字才算小数部分
        if end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit() {
            end += 1;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
        }

        self.pos = end;
        Token::new(TokenKind::Number, &self.input[start..end], start)
    }

    /// 引号包围的字符串，不处理转义；内容中不能出现任何一种引号
    fn string(&mut self, quote: char, start: usize) -> Option<Token> {
        let body = &self.input[start + 1..];
        let close = body.find(['"', '\''])?;
        if !body[close..].starts_with(quote) {
            return None;
        }

        self.pos = start + 1 + close + 1;
        Some(Token::new(TokenKind::String, &body[..close], start))
    }

    fn identifier(&mut self, start: usize) -> Token {
        let bytes = self.input.as_bytes();
        let mut end = start;
        while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
            end += 1;
        }

        self.pos = end;
        let text = &self.input[start..end];
        let kind = match text {
            "true" | "false" => TokenKind::Boolean,
            _ => TokenKind::Identifier,
        };
        Token::new(kind, text, start)
    }
}

fn two_char_operator(text: &str) -> Option<TokenKind> {
    let kind = match text {
        "<=" => TokenKind::LessEqual,
        ">=" => TokenKind::GreaterEqual,
        "==" => TokenKind::Equal,
        "!=" => TokenKind::NotEqual,
        "&&" => TokenKind::And,
        "||" => TokenKind::Or,
        _ => return None,
    };
    Some(kind)
}

fn single_char_operator(ch: char) -> Option<TokenKind> {
    let kind = match ch {
        '+' => TokenKind::Plus,
        '-' => TokenKind::Minus,
        '*' => TokenKind::Star,
        '/' => TokenKind::Slash,
        '%' => TokenKind::Percent,
        '<' => TokenKind::Less,
        '>' => TokenKind::Greater,
        '!' => TokenKind::Not,
        '(' => TokenKind::LeftParen,
        ')' => TokenKind::RightParen,
        '[' => TokenKind::LeftBracket,
        ']' => TokenKind::RightBracket,
        '.' => TokenKind::Dot,
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("   \t\n "), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_two_char_operators_are_greedy() {
        assert_eq!(
            kinds("a <= b && c != d"),
            vec![
                TokenKind::Identifier,
                TokenKind::LessEqual,
                TokenKind::Identifier,
                TokenKind::And,
                TokenKind::Identifier,
                TokenKind::NotEqual,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
        assert_eq!(kinds("!a"), vec![TokenKind::Not, TokenKind::Identifier, TokenKind::Eof]);
    }

    #[test]
    fn test_numbers() {
        let tokens = tokenize("12 3.75 4.");
        assert_eq!(tokens[0].lexeme, "12");
        assert_eq!(tokens[1].lexeme, "3.75");
        assert_eq!(tokens[2].lexeme, "4");
        assert_eq!(tokens[3].kind, TokenKind::Dot);
    }

    #[test]
    fn test_negative_number_is_unary_minus() {
        assert_eq!(
            kinds("-5"),
            vec![TokenKind::Minus, TokenKind::Number, TokenKind::Eof]
        );
    }

    #[test]
    fn test_strings() {
        let tokens = tokenize(r#""hello world" 'gold'"#);
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lexeme, "hello world");
        assert_eq!(tokens[1].lexeme, "gold");
        assert_eq!(tokens[1].position, 14);
    }

    #[test]
    fn test_unterminated_string_is_invalid() {
        let tokens = tokenize("\"abc");
        assert_eq!(tokens[0].kind, TokenKind::Invalid);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].lexeme, "abc");
    }

    #[test]
    fn test_booleans_and_identifiers() {
        let tokens = tokenize("true false truthy _rule_1");
        assert_eq!(tokens[0].kind, TokenKind::Boolean);
        assert_eq!(tokens[1].kind, TokenKind::Boolean);
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
        assert_eq!(tokens[3].lexeme, "_rule_1");
    }

    #[test]
    fn test_invalid_characters() {
        let tokens = tokenize("a # b");
        assert_eq!(tokens[1].kind, TokenKind::Invalid);
        assert_eq!(tokens[1].lexeme, "#");
        assert_eq!(tokens[1].position, 2);
    }

    #[test]
    fn test_feature_path_with_index() {
        assert_eq!(
            kinds("featureMap.items[0].price"),
            vec![
                TokenKind::Identifier,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::LeftBracket,
                TokenKind::Number,
                TokenKind::RightBracket,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_operator_helpers() {
        let tokens = tokenize("- 1 &&");
        assert!(tokens[0].is_operator());
        assert!(tokens[0].is_unary_operator());
        assert!(tokens[1].is_literal());
        assert_eq!(tokens[2].operator_symbol(), Some("&&"));
        assert!(!tokens[3].is_operator());
    }
}
