//! lbc-par - recursive-descent statement parsing with precedence-climbed
//! expressions (`spec.md` §4.2).

mod parser;

pub use parser::{ParseError, Parser};
