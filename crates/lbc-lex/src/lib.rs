//! lbc-lex - the LightBASIC lexer (`spec.md` §4.1, component 2).
//!
//! Single-pass, one-token-lookahead tokenizer over an in-memory UTF-8
//! buffer. The lexer never aborts: invalid input becomes an
//! [`TokenKind::Invalid`] token and the diagnostic is reported by the
//! caller (the parser), per `spec.md` §4.1 "Error handling".

pub mod cursor;
pub mod token;

mod lexer;

pub use lexer::Lexer;
pub use token::{Literal, Token, TokenKind};
