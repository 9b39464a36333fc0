//! lbc-sym - declarations and lexical scoping (`spec.md` §4.4).
//!
//! A [`Symbol`] binds a name to a [`lbc_types::TypeId`]; a [`SymbolTable`]
//! is one scope, chained to its parent the way the source's `Scope` class
//! links to its enclosing scope. Shadowing across scopes is allowed;
//! redefinition within the same scope is a [`Redefinition`] error
//! (`spec.md` §3 invariant, §7 `SEM_REDEFINITION`).
//!
//! UDT member layout is tracked here too, in [`UdtMembers`], keyed by the
//! `TypeId` the UDT's declarer pass allocated - see the module doc on
//! `lbc-types` for why member tables live on this side of the crate split.

mod scope;
mod table;
mod udt;

pub use scope::{ScopeId, ScopeKind};
pub use table::{Redefinition, Symbol, SymbolFlags, SymbolId, SymbolTable};
pub use udt::{Member, UdtMembers};
