//! Declaration attributes (`spec.md` §4.2: "an attribute list may prefix a
//! declaration"). Only `ALIAS` carries a payload the analyzer acts on
//! today; unrecognized attribute names still parse (so a `.bas` file using
//! a future attribute doesn't hard-fail the parser) but are ignored by
//! the analyzer.

use lbc_util::Symbol;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attribute {
    /// `ALIAS "name"` - the external/codegen symbol name, when it differs
    /// from the declared identifier (`spec.md` §4.4).
    Alias(Symbol),
    /// Any other bracketed attribute name; kept for round-tripping through
    /// the debug pretty-printer but has no semantic effect.
    Unknown(Symbol),
}
