//! Tokenizer for the build configuration DSL.
//!
//! The token stream is flat: whitespace and `=` only separate values, braces
//! are structural and everything else is a [`TokenKind::Value`]. Quoted text
//! keeps its whitespace and may span lines.

use std::fmt;

/// Kind of a DSL token.
///
/// `Equals` and `Quote` are never emitted (both are consumed as separators);
/// they exist so diagnostics can name them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Equals,
    LeftBrace,
    RightBrace,
    Quote,
    Value,
}

impl TokenKind {
    /// Name used in "expected ..." diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::LeftBrace => "left-brace",
            Self::RightBrace => "right-brace",
            Self::Quote => "quotes",
            Self::Value => "value",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-based line on which the token starts.
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
        }
    }

    pub fn is_value(&self) -> bool {
        self.kind == TokenKind::Value
    }
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == '='
}

fn ends_value(c: char) -> bool {
    is_separator(c) || c == '{' || c == '}'
}

/// Convert DSL text into its complete token stream.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(text.len() / 4);
    let mut chars = text.chars().peekable();
    let mut line = 1;

    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            '{' => tokens.push(Token::new(TokenKind::LeftBrace, "{", line)),
            '}' => tokens.push(Token::new(TokenKind::RightBrace, "}", line)),
            '"' => {
                let start = line;
                let mut value = String::new();
                for q in chars.by_ref() {
                    if q == '"' {
                        break;
                    }
                    if q == '\n' {
                        line += 1;
                    }
                    value.push(q);
                }
                tokens.push(Token::new(TokenKind::Value, value, start));
            }
            c if is_separator(c) => {}
            c => {
                let mut value = String::from(c);
                while let Some(&next) = chars.peek() {
                    if ends_value(next) {
                        break;
                    }
                    value.push(next);
                    chars.next();
                }
                tokens.push(Token::new(TokenKind::Value, value, line));
            }
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_values_and_braces() {
        let tokens = tokenize("input { src out/classes }");
        assert_eq!(texts(&tokens), ["input", "{", "src", "out/classes", "}"]);
        assert_eq!(tokens[1].kind, TokenKind::LeftBrace);
        assert_eq!(tokens[4].kind, TokenKind::RightBrace);
        assert!(tokens[2].is_value());
    }

    #[test]
    fn test_equals_is_a_separator() {
        let tokens = tokenize("version=1.2 output = a/b.jar");
        assert_eq!(texts(&tokens), ["version", "1.2", "output", "a/b.jar"]);
    }

    #[test]
    fn test_braces_split_values_without_spaces() {
        let tokens = tokenize("in{a/b}");
        assert_eq!(texts(&tokens), ["in", "{", "a/b", "}"]);
    }

    #[test]
    fn test_quoted_value_keeps_whitespace() {
        let tokens = tokenize(r#"output "build dir/app.jar" main x.Y"#);
        assert_eq!(texts(&tokens), ["output", "build dir/app.jar", "main", "x.Y"]);
        assert_eq!(tokens[1].kind, TokenKind::Value);
    }

    #[test]
    fn test_line_numbers() {
        let tokens = tokenize("input {\n  a/b\n  \"c\nd\"\n}\noutput x/y");
        let lines: Vec<usize> = tokens.iter().map(|t| t.line).collect();
        // the quoted value starts on line 3 and the newline inside it still counts
        assert_eq!(lines, [1, 1, 2, 3, 5, 6, 6]);
    }

    #[test]
    fn test_unterminated_quote_runs_to_end() {
        let tokens = tokenize("output \"a b");
        assert_eq!(texts(&tokens), ["output", "a b"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize(" \n\t = ").is_empty());
    }
}
