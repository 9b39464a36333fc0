use lbc_util::define_idx;

define_idx!(
    /// A lexical scope. Scopes form a chain from the innermost block back
    /// to the module root, mirroring the source's `Scope::getParent()`
    /// link (`spec.md` §4.4).
    pub struct ScopeId;
);

/// What kind of construct opened a scope. Only `Root` and `Function` carry
/// semantic weight today (`spec.md` §4.2's parser scope stack is just
/// `Root`/`Function`); `Block` scopes exist so `IF`/`FOR`/`DO` bodies can
/// declare locals that don't leak past `END IF`/`NEXT`/`LOOP`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Root,
    Function,
    Block,
}
