//! The build configuration DSL: [`token`] turns text into tokens and
//! [`parser`] turns tokens into a [`BuildRequest`](crate::request::BuildRequest).

pub mod parser;
pub mod token;

pub use parser::{parse, parse_str};
pub use token::{Token, TokenKind, tokenize};
