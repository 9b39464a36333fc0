//! lbc-util - Shared infrastructure for the LightBASIC compiler.
//!
//! This crate holds the pieces every later compiler stage needs and none of
//! them owns exclusively: source-location tracking (`span`), diagnostics
//! (`diagnostic`), the `Context` that owns interned strings for one
//! compilation (`symbol`), and the `IndexVec` arena helper used to store AST
//! nodes, symbols and types without cyclic `Rc`/`RefCell` plumbing
//! (`index_vec`).
//!
//! Interning here is deliberately *not* global/process-wide the way the
//! LightBASIC C++ implementation does it. A [`Context`] owns its own string
//! table, so a host process can compile more than one translation unit
//! without one compilation's identifiers leaking into another's.

pub mod diagnostic;
pub mod error;
pub mod index_vec;
pub mod span;
pub mod symbol;

pub use diagnostic::*;
pub use index_vec::{Idx, IndexVec};
pub use span::{FileId, SourceMap, Span};
pub use symbol::{Context, Symbol};

/// Panics with a formatted internal-compiler-error message.
///
/// This plays the role the source's fatal-error function plays for
/// "unreachable" arms of an exhaustive match (`spec.md` §7, Internal
/// errors): these are compiler bugs, not user-facing diagnostics, so they
/// abort immediately rather than going through the [`DiagnosticEngine`].
#[macro_export]
macro_rules! ice {
    ($($arg:tt)*) => {
        panic!("internal compiler error: {}", format!($($arg)*))
    };
}
