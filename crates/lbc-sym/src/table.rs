//! The symbol table: ordered insertion maps chained by parent scope
//! (`spec.md` §4.4), grounded on the teacher's `faxc-sem::scope::Scope`
//! rib-stack.

use crate::scope::{ScopeId, ScopeKind};
use indexmap::IndexMap;
use lbc_types::TypeId;
use lbc_util::{define_idx, Span, Symbol as Name};

define_idx!(
    /// Handle to one declaration, stable for the lifetime of a compilation.
    pub struct SymbolId;
);

/// Flags carried on a [`Symbol`] (`spec.md` §4.4: "externalLinkage" plus
/// the parser-level attributes `ALIAS`/variadic-parameter/constant).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SymbolFlags {
    /// Declared with `DECLARE` or an imported module boundary - gets
    /// external (not internal/static) linkage in codegen.
    pub external_linkage: bool,
    /// A function parameter rather than a local/global variable.
    pub is_parameter: bool,
    /// The catch-all trailing `...` parameter of a variadic declaration.
    pub is_variadic_param: bool,
    /// A UDT member, index tracked in [`crate::UdtMembers`] rather than a
    /// free-standing [`SymbolTable`] slot.
    pub is_udt_member: bool,
    /// Whether the name can appear as an assignment target. Cleared on a
    /// `FOR` loop's iterator variable so the body pass rejects writes to
    /// it (`spec.md` §4.5 "iterator symbol loses assignable flag").
    pub assignable: bool,
}

impl Default for SymbolFlags {
    fn default() -> Self {
        Self {
            external_linkage: false,
            is_parameter: false,
            is_variadic_param: false,
            is_udt_member: false,
            assignable: true,
        }
    }
}

/// A name bound to a type in some scope.
///
/// `alias` is the `ALIAS "..."` string used for the codegen symbol name
/// when it differs from `name` (`spec.md` §4.4, §9's C-ABI note on
/// `DECLARE`d externals); it defaults to `name`'s own text when no
/// `ALIAS` clause was written.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: Name,
    pub alias: Name,
    pub ty: TypeId,
    pub flags: SymbolFlags,
    pub scope: ScopeId,
    /// Position of the declaring token, for redefinition diagnostics.
    pub span: Span,
}

/// Two declarations of the same name in the same innermost scope
/// (`spec.md` §7 `SEM_REDEFINITION`). Carries both symbol ids so the
/// caller can report both locations.
#[derive(Clone, Copy, Debug)]
pub struct Redefinition {
    pub first: SymbolId,
    pub second_span: Span,
}

struct Scope {
    kind: ScopeKind,
    parent: Option<ScopeId>,
    names: IndexMap<Name, SymbolId>,
}

/// Owns every [`Scope`] and [`Symbol`] for one compilation and tracks the
/// currently-open scope chain.
///
/// Lookup walks from the innermost open scope outward to `Root`, so an
/// inner declaration shadows an outer one without disturbing it
/// (`spec.md` §4.4: "shadowing across scopes is allowed"). Insertion only
/// ever checks the *innermost* scope for a collision - that is the only
/// place `spec.md` forbids redefinition.
pub struct SymbolTable {
    scopes: lbc_util::IndexVec<ScopeId, Scope>,
    symbols: lbc_util::IndexVec<SymbolId, Symbol>,
    current: ScopeId,
    root: ScopeId,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut scopes = lbc_util::IndexVec::new();
        let root = scopes.push(Scope { kind: ScopeKind::Root, parent: None, names: IndexMap::new() });
        Self { scopes, symbols: lbc_util::IndexVec::new(), current: root, root }
    }

    pub fn root(&self) -> ScopeId {
        self.root
    }

    pub fn current_scope(&self) -> ScopeId {
        self.current
    }

    pub fn scope_kind(&self, scope: ScopeId) -> ScopeKind {
        self.scopes[scope].kind
    }

    /// Opens a new child scope of `kind` and makes it current.
    pub fn push_scope(&mut self, kind: ScopeKind) -> ScopeId {
        let id = self.scopes.push(Scope { kind, parent: Some(self.current), names: IndexMap::new() });
        self.current = id;
        id
    }

    /// Closes the current scope, restoring its parent as current.
    ///
    /// # Panics
    /// If called while at the root scope - callers balance every
    /// `push_scope` with exactly one `pop_scope` (`spec.md` §4.2's
    /// parser scope stack discipline).
    pub fn pop_scope(&mut self) {
        match self.scopes[self.current].parent {
            Some(parent) => self.current = parent,
            None => lbc_util::ice!("pop_scope called at root"),
        }
    }

    /// Declares `name` in the current scope. Returns `Err` with the prior
    /// declaration's id if `name` already exists *in this same scope*
    /// (`spec.md` §7 `SEM_REDEFINITION`); an outer-scope binding of the
    /// same name is shadowed silently, not rejected.
    pub fn declare(
        &mut self,
        name: Name,
        alias: Name,
        ty: TypeId,
        flags: SymbolFlags,
        span: Span,
    ) -> Result<SymbolId, Redefinition> {
        if let Some(&existing) = self.scopes[self.current].names.get(&name) {
            return Err(Redefinition { first: existing, second_span: span });
        }
        let id = self.symbols.push(Symbol { name, alias, ty, flags, scope: self.current, span });
        self.scopes[self.current].names.insert(name, id);
        Ok(id)
    }

    /// Looks `name` up starting at `from`, walking outward through parent
    /// scopes until found or the root scope is exhausted.
    pub fn lookup_from(&self, from: ScopeId, name: Name) -> Option<SymbolId> {
        let mut scope = Some(from);
        while let Some(id) = scope {
            if let Some(&sym) = self.scopes[id].names.get(&name) {
                return Some(sym);
            }
            scope = self.scopes[id].parent;
        }
        None
    }

    /// Looks `name` up starting at the current scope.
    pub fn lookup(&self, name: Name) -> Option<SymbolId> {
        self.lookup_from(self.current, name)
    }

    /// Whether `name` is declared in `scope` itself, ignoring parents.
    pub fn declared_in_scope(&self, scope: ScopeId, name: Name) -> bool {
        self.scopes[scope].names.contains_key(&name)
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id]
    }

    /// Every symbol declared directly in `scope`, in insertion order -
    /// used when emitting a UDT's member list or a function's parameter
    /// list in declaration order.
    pub fn names_in_scope(&self, scope: ScopeId) -> impl Iterator<Item = (Name, SymbolId)> + '_ {
        self.scopes[scope].names.iter().map(|(&n, &id)| (n, id))
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lbc_types::TypeInterner;

    fn name(ctx: &mut lbc_util::Context, s: &str) -> Name {
        ctx.intern(s)
    }

    #[test]
    fn redefinition_in_same_scope_is_rejected() {
        let mut ctx = lbc_util::Context::new();
        let types = TypeInterner::new();
        let mut table = SymbolTable::new();
        let x = name(&mut ctx, "X");
        table.declare(x, x, types.i32, SymbolFlags::default(), Span::DUMMY).unwrap();
        let err = table.declare(x, x, types.i32, SymbolFlags::default(), Span::DUMMY).unwrap_err();
        assert!(table.symbol(err.first).name == x);
    }

    #[test]
    fn shadowing_across_scopes_is_allowed() {
        let mut ctx = lbc_util::Context::new();
        let types = TypeInterner::new();
        let mut table = SymbolTable::new();
        let x = name(&mut ctx, "X");
        let outer = table.declare(x, x, types.i32, SymbolFlags::default(), Span::DUMMY).unwrap();
        table.push_scope(ScopeKind::Function);
        let inner = table.declare(x, x, types.f64, SymbolFlags::default(), Span::DUMMY).unwrap();
        assert_ne!(outer, inner);
        assert_eq!(table.lookup(x), Some(inner));
        table.pop_scope();
        assert_eq!(table.lookup(x), Some(outer));
    }

    #[test]
    fn lookup_walks_outward_through_parents() {
        let mut ctx = lbc_util::Context::new();
        let types = TypeInterner::new();
        let mut table = SymbolTable::new();
        let y = name(&mut ctx, "Y");
        let outer = table.declare(y, y, types.boolean, SymbolFlags::default(), Span::DUMMY).unwrap();
        table.push_scope(ScopeKind::Block);
        assert_eq!(table.lookup(y), Some(outer));
    }

    #[test]
    fn declared_in_scope_ignores_parents() {
        let mut ctx = lbc_util::Context::new();
        let types = TypeInterner::new();
        let mut table = SymbolTable::new();
        let z = name(&mut ctx, "Z");
        table.declare(z, z, types.i32, SymbolFlags::default(), Span::DUMMY).unwrap();
        table.push_scope(ScopeKind::Function);
        assert!(!table.declared_in_scope(table.current_scope(), z));
        assert!(table.declared_in_scope(table.root(), z));
    }
}
