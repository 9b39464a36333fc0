//! lbc-sem - the semantic analyzer (`spec.md` §4.5, component 7: "Name
//! resolution, type inference, coercion insertion, CF validation, constant
//! folding").
//!
//! The analyzer runs as four passes over one module, in order (`spec.md`
//! §4.5):
//!
//! 1. [`analyzer::Analyzer::type_pass`] - pre-declares every `TYPE`'s name so
//!    forward references between UDTs resolve.
//! 2. [`analyzer::Analyzer::udt_pass`] - resolves each UDT's member list.
//! 3. [`analyzer::Analyzer::function_pass`] - registers every function/sub
//!    signature at module scope.
//! 4. [`analyzer::Analyzer::body_pass`] - walks each function body and the
//!    top-level statement list, resolving names, checking types, inserting
//!    implicit casts and folding constants.
//!
//! Like `lbc-par`, this crate mutates the [`lbc_ast::Ast`] arena in place
//! (`Ast::set_kind`) rather than building a second, HIR-style tree - the
//! arena already holds non-owning `NodeId` references, so there is nothing
//! a second tree would buy that a side table doesn't already give us
//! (`spec.md` §9's arena-over-cyclic-ownership redesign applies here too).
//! Resolved types and symbols for a node are *not* stored on the node
//! itself; they live in this crate's [`SemaResult`] side tables, the same
//! pattern `lbc-sym`'s `UdtMembers` already uses to keep `lbc-ast` free of
//! a dependency on the type system.

mod analyzer;
mod expr;
mod fold;
mod stmt;

pub use analyzer::{Analyzer, ForDirection, SemaResult};
