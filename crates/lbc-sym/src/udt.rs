//! Member layout for user-defined types.
//!
//! `lbc-types::TypeKind::Udt` deliberately omits the member list (see its
//! doc comment): storing it here instead breaks what would otherwise be a
//! dependency cycle between `lbc-types` and `lbc-sym`, since a member's
//! type is itself a `TypeId`.

use crate::table::SymbolId;
use lbc_types::TypeId;
use rustc_hash::FxHashMap;

/// One field of a UDT, in declaration order.
#[derive(Clone, Copy, Debug)]
pub struct Member {
    pub symbol: SymbolId,
    pub ty: TypeId,
    /// Index within the UDT, used for GEP indices in the codegen contract.
    pub index: u32,
}

/// Maps each UDT `TypeId` (as allocated by `TypeInterner::new_udt`) to its
/// ordered member list, populated during the UDT declarer pass
/// (`spec.md` §4.5) and consulted read-only afterward.
#[derive(Default)]
pub struct UdtMembers {
    members: FxHashMap<TypeId, Vec<Member>>,
}

impl UdtMembers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_member(&mut self, udt: TypeId, symbol: SymbolId, ty: TypeId) -> u32 {
        let list = self.members.entry(udt).or_default();
        let index = list.len() as u32;
        list.push(Member { symbol, ty, index });
        index
    }

    pub fn members(&self, udt: TypeId) -> &[Member] {
        self.members.get(&udt).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find_member(&self, udt: TypeId, name: SymbolId) -> Option<&Member> {
        self.members(udt).iter().find(|m| m.symbol == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{SymbolFlags, SymbolTable};
    use lbc_types::TypeInterner;

    #[test]
    fn members_are_returned_in_declaration_order() {
        let mut ctx = lbc_util::Context::new();
        let mut types = TypeInterner::new();
        let mut table = SymbolTable::new();
        let mut udts = UdtMembers::new();

        let name = ctx.intern("POINT");
        let udt = types.new_udt(name, false);

        let x = ctx.intern("X");
        let y = ctx.intern("Y");
        let sx = table.declare(x, x, types.i32, SymbolFlags::default(), lbc_util::Span::DUMMY).unwrap();
        let sy = table.declare(y, y, types.i32, SymbolFlags::default(), lbc_util::Span::DUMMY).unwrap();
        udts.declare_member(udt, sx, types.i32);
        udts.declare_member(udt, sy, types.i32);

        let members = udts.members(udt);
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].symbol, sx);
        assert_eq!(members[1].symbol, sy);
    }
}
