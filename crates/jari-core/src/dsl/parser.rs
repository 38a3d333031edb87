//! Section parser for the build configuration DSL.
//!
//! A configuration is a sequence of sections, each introduced by a keyword:
//!
//! ```text
//! input { src out/classes }
//! output "build/app.jar"
//! main com.example.Main
//! version 1.2
//! dependency { org.example.lib 2.0 }
//! compression false
//! ```
//!
//! Braces are optional. Without them a section ends at the next keyword of a
//! different section; single-valued sections take only the first value.
//! Errors are collected for the whole input and returned together.

use crate::dsl::token::{Token, TokenKind, tokenize};
use crate::error::DataError;
use crate::request::BuildRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Input,
    Output,
    MainClass,
    Version,
    Dependency,
    Compression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arity {
    /// Any number of values, section may be repeated.
    Many,
    /// Exactly one value.
    One,
    /// At most one value.
    Flag,
}

impl Section {
    fn from_keyword(word: &str) -> Option<Self> {
        let section = match word {
            "in" | "input" => Self::Input,
            "out" | "output" => Self::Output,
            "main" | "main-class" | "mainclass" => Self::MainClass,
            "vers" | "version" => Self::Version,
            "dep" | "dependency" | "deps" | "dependencies" => Self::Dependency,
            "comp" | "compress" | "compression" | "useCompression" | "usecompression"
            | "use-compression" => Self::Compression,
            _ => return None,
        };
        Some(section)
    }

    fn arity(self) -> Arity {
        match self {
            Self::Input | Self::Dependency => Arity::Many,
            Self::Output | Self::MainClass | Self::Version => Arity::One,
            Self::Compression => Arity::Flag,
        }
    }

    /// True if `word` is the keyword of another section, which ends this one.
    fn yields_to(self, word: &str) -> bool {
        Self::from_keyword(word).is_some_and(|other| other != self)
    }
}

const EOF: &str = "EOF";

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    errors: Vec<DataError>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn eat_if(&mut self, kind: TokenKind) -> bool {
        if self.peek().is_some_and(|t| t.kind == kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map_or(1, |t| t.line)
    }

    /// Record "unexpected <next token>" without consuming it.
    fn unexpected_here(&mut self, expected: &str) {
        let error = match self.peek() {
            Some(t) => DataError::syntax(t.text.clone(), t.line, Some(expected)),
            None => DataError::syntax(EOF, self.last_line(), Some(expected)),
        };
        self.errors.push(error);
    }

    fn run(mut self) -> Result<BuildRequest, Vec<DataError>> {
        let mut request = BuildRequest::default();
        let mut raw_dependencies = Vec::new();

        while let Some(token) = self.advance() {
            let section = if token.is_value() {
                Section::from_keyword(&token.text)
            } else {
                None
            };

            let Some(section) = section else {
                self.errors.push(DataError::syntax(
                    token.text.clone(),
                    token.line,
                    Some("section keyword"),
                ));
                continue;
            };

            let mut values = self.body(section);

            match section {
                Section::Input => request.inputs.append(&mut values),
                Section::Dependency => raw_dependencies.append(&mut values),
                Section::Output => request.output = first_value(values),
                Section::MainClass => request.main_class = first_value(values),
                Section::Version => request.version = first_value(values),
                Section::Compression => {
                    if let Some(flag) = values.first() {
                        request.use_compression = !matches!(flag.as_str(), "false" | "0");
                    }
                }
            }
        }

        request.dependencies = pair_dependencies(&raw_dependencies);

        if self.errors.is_empty() {
            Ok(request)
        } else {
            Err(self.errors)
        }
    }

    fn body(&mut self, section: Section) -> Vec<String> {
        let braced = self.eat_if(TokenKind::LeftBrace);
        let arity = section.arity();
        let limit = if braced || arity == Arity::Many {
            usize::MAX
        } else {
            1
        };

        let mut values: Vec<&Token> = Vec::new();
        while values.len() < limit {
            match self.peek() {
                Some(t) if t.is_value() && !section.yields_to(&t.text) => {
                    values.push(t);
                    self.pos += 1;
                }
                _ => break,
            }
        }

        if arity == Arity::One && values.is_empty() {
            self.unexpected_here(TokenKind::Value.describe());
        }

        if braced {
            if arity != Arity::Many {
                for extra in values.iter().skip(1) {
                    self.errors.push(DataError::syntax(
                        extra.text.clone(),
                        extra.line,
                        Some(TokenKind::RightBrace.describe()),
                    ));
                }
                values.truncate(1);
            }
            if !self.eat_if(TokenKind::RightBrace) {
                self.unexpected_here(TokenKind::RightBrace.describe());
            }
        }

        values.into_iter().map(|t| t.text.clone()).collect()
    }
}

fn first_value(values: Vec<String>) -> String {
    values.into_iter().next().unwrap_or_default()
}

/// Split a raw dependency value into whitespace separated words, honouring
/// double quotes.
fn split_words(raw: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in raw.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Pair dependency words in order as `(coordinate, version)`.
///
/// `"org.example.lib 2.0"` and `org.example.lib 2.0` produce the same pair.
/// A trailing coordinate without a version gets an empty one.
fn pair_dependencies(raw: &[String]) -> Vec<(String, String)> {
    let words: Vec<String> = raw.iter().flat_map(|r| split_words(r)).collect();
    words
        .chunks(2)
        .map(|pair| {
            let version = pair.get(1).cloned().unwrap_or_default();
            (pair[0].clone(), version)
        })
        .collect()
}

/// Parse a token stream into a [`BuildRequest`].
///
/// # Errors
///
/// Returns every [`DataError::Syntax`] found in the stream. A request is only
/// returned when there are none.
pub fn parse(tokens: &[Token]) -> Result<BuildRequest, Vec<DataError>> {
    Parser::new(tokens).run()
}

/// Tokenize and parse DSL text.
///
/// # Errors
///
/// See [`parse`].
pub fn parse_str(text: &str) -> Result<BuildRequest, Vec<DataError>> {
    parse(&tokenize(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syntax_found(errors: &[DataError]) -> Vec<String> {
        errors
            .iter()
            .map(|e| match e {
                DataError::Syntax { found, .. } => found.clone(),
                other => panic!("expected syntax error, got {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_full_example() {
        let request = parse_str(
            r#"input { src out/classes } output "build/app.jar" main com.example.Main version 1.2 dependency { org.example.lib 2.0 } compression false"#,
        )
        .unwrap();

        assert_eq!(request.inputs, ["src", "out/classes"]);
        assert_eq!(request.output, "build/app.jar");
        assert_eq!(request.main_class, "com.example.Main");
        assert_eq!(request.version, "1.2");
        assert_eq!(
            request.dependencies,
            [("org.example.lib".to_string(), "2.0".to_string())]
        );
        assert!(!request.use_compression);
    }

    #[test]
    fn test_inputs_and_output() {
        let request = parse_str("input { a b } output out.jar").unwrap();
        assert_eq!(request.inputs, ["a", "b"]);
        assert_eq!(request.output, "out.jar");
        assert!(request.use_compression);
    }

    #[test]
    fn test_aliases_and_repeated_sections() {
        let request = parse_str("in a/b in c/d out x/y.jar vers 2 mainclass p.Q").unwrap();
        assert_eq!(request.inputs, ["a/b", "c/d"]);
        assert_eq!(request.output, "x/y.jar");
        assert_eq!(request.version, "2");
        assert_eq!(request.main_class, "p.Q");
    }

    #[test]
    fn test_unbraced_section_ends_at_other_keyword() {
        let request = parse_str("input a/b c/d output e/f.jar").unwrap();
        assert_eq!(request.inputs, ["a/b", "c/d"]);
        assert_eq!(request.output, "e/f.jar");
    }

    #[test]
    fn test_same_keyword_is_a_value_inside_its_section() {
        let request = parse_str("input { a/input input }").unwrap();
        assert_eq!(request.inputs, ["a/input", "input"]);
    }

    #[test]
    fn test_unknown_keyword_is_rejected() {
        let errors = parse_str("foo bar").unwrap_err();
        assert_eq!(syntax_found(&errors), ["foo", "bar"]);
    }

    #[test]
    fn test_unknown_keyword_poisons_otherwise_valid_input() {
        let errors = parse_str("output c/d.jar foo input a/b").unwrap_err();
        assert_eq!(syntax_found(&errors), ["foo"]);

        // inside a repeatable section the same word is just another value
        let request = parse_str("input a/b foo output c/d.jar").unwrap();
        assert_eq!(request.inputs, ["a/b", "foo"]);
    }

    #[test]
    fn test_missing_closing_brace_at_eof() {
        let errors = parse_str("input { a/b\nc/d").unwrap_err();
        assert_eq!(
            errors,
            [DataError::syntax("EOF", 2, Some("right-brace"))]
        );
    }

    #[test]
    fn test_keyword_before_closing_brace() {
        let errors = parse_str("input { a/b output x/y.jar").unwrap_err();
        assert_eq!(
            errors,
            [DataError::syntax("output", 1, Some("right-brace"))]
        );
    }

    #[test]
    fn test_stray_brace_is_rejected() {
        let errors = parse_str("} output a/b.jar").unwrap_err();
        assert_eq!(syntax_found(&errors), ["}"]);
    }

    #[test]
    fn test_single_value_section_without_value() {
        let errors = parse_str("output").unwrap_err();
        assert_eq!(errors, [DataError::syntax("EOF", 1, Some("value"))]);

        let errors = parse_str("output { }").unwrap_err();
        assert_eq!(errors, [DataError::syntax("}", 1, Some("value"))]);
    }

    #[test]
    fn test_extra_value_in_braced_single_section() {
        let errors = parse_str("output { a/b.jar c/d.jar }").unwrap_err();
        assert_eq!(errors, [DataError::syntax("c/d.jar", 1, Some("right-brace"))]);
    }

    #[test]
    fn test_compression_values() {
        assert!(!parse_str("compression 0").unwrap().use_compression);
        assert!(!parse_str("comp false").unwrap().use_compression);
        assert!(parse_str("compression true").unwrap().use_compression);
        assert!(parse_str("compression no").unwrap().use_compression);
        assert!(parse_str("compression").unwrap().use_compression);
        assert!(!parse_str("useCompression { false }").unwrap().use_compression);
    }

    #[test]
    fn test_compression_does_not_swallow_next_section() {
        let request = parse_str("compression output a/b.jar").unwrap();
        assert!(request.use_compression);
        assert_eq!(request.output, "a/b.jar");
    }

    #[test]
    fn test_quoted_dependency_pairs() {
        let request =
            parse_str(r#"deps { "org.example.lib 2.0" "com.acme.util 1.5" }"#).unwrap();
        assert_eq!(
            request.dependencies,
            [
                ("org.example.lib".to_string(), "2.0".to_string()),
                ("com.acme.util".to_string(), "1.5".to_string()),
            ]
        );
    }

    #[test]
    fn test_dependency_without_version() {
        let request = parse_str("dep org.example.lib").unwrap();
        assert_eq!(
            request.dependencies,
            [("org.example.lib".to_string(), String::new())]
        );
    }

    #[test]
    fn test_split_words_honours_quotes() {
        assert_eq!(split_words(r#"a "b c" d"#), ["a", "b c", "d"]);
        assert_eq!(split_words("  "), Vec::<String>::new());
    }

    #[test]
    fn test_empty_text_is_default_request() {
        assert_eq!(parse_str("").unwrap(), BuildRequest::default());
    }
}
