//! lbc-types - the LightBASIC type system (`spec.md` §4.3, component 3).
//!
//! Types are canonical, interned value objects: "each distinct type shape
//! has exactly one object in the process; equality of types reduces to
//! pointer identity" (`spec.md` §3). Here "the process" is narrowed to one
//! [`TypeInterner`] (owned by a [`lbc_util::Context`]), per the redesign
//! in `spec.md` §9 - type interning must not be a process-wide static so
//! multiple translation units can coexist in one host process.
//!
//! [`TypeId`] is the "pointer"; comparing two `TypeId`s with `==` *is* the
//! canonical-identity check the C++ source gets from `shared_ptr` equality.

use lbc_util::{define_idx, Symbol};
use rustc_hash::FxHashMap;

define_idx!(
    /// A canonical, interned type handle. `TypeId(a) == TypeId(b)` iff `a`
    /// and `b` name the same canonical type.
    pub struct TypeId;
);

/// The shape of a type, as queried via [`TypeInterner::kind`].
///
/// This mirrors the sealed hierarchy in `spec.md` §3 exactly: `Void`, `Any`,
/// `Pointer`, `Boolean`, `Integral`, `FloatingPoint`, `ZString`,
/// `Function`, `Udt`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Void,
    Any,
    Pointer(TypeId),
    Boolean,
    Integral { bits: u8, signed: bool },
    FloatingPoint { bits: u8 },
    ZString,
    /// The type of the `NULL` literal: upcasts to any `Pointer` (`spec.md`
    /// §4.3 "Upcast: ... null->any pointer").
    Null,
    Function { ret: TypeId, params: Vec<TypeId>, variadic: bool },
    /// A user-defined record. `members` is not carried here - member
    /// symbol tables are owned by the semantic analyzer's `lbc_sym`
    /// scope, keyed by this same `TypeId`, to avoid a dependency cycle
    /// between `lbc-types` and `lbc-sym` (a `Symbol`'s `ty` field is a
    /// `TypeId`, so `lbc-sym` already depends on `lbc-types`).
    Udt { name: Symbol, packed: bool },
}

/// The four-way result of comparing two types (`spec.md` §4.3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compat {
    /// Identical canonical instances.
    Equal,
    /// Lossless conversion from the first type to the second.
    Upcast,
    /// Potentially-lossy conversion from the first type to the second.
    Downcast,
    /// No implicit conversion exists.
    Incompatible,
}

impl Compat {
    pub fn is_convertible(self) -> bool {
        !matches!(self, Compat::Incompatible)
    }
}

/// Owns every canonical [`TypeKind`] created during one compilation.
///
/// Pre-allocates the singletons and the ten numeric instances the source
/// keeps pre-built (`spec.md` §4.3): `Void`, `Any`, `Boolean`, `ZString`,
/// the eight `Integral` instances, and the two `FloatingPoint` instances.
/// Everything else (`Pointer`, `Function`) is interned lazily and memoized
/// by structural shape; `Udt` is interned nominally - two structurally
/// identical `TYPE` declarations are still two different types.
pub struct TypeInterner {
    types: lbc_util::IndexVec<TypeId, TypeKind>,
    shape_cache: FxHashMap<TypeKind, TypeId>,

    pub void: TypeId,
    pub any: TypeId,
    pub boolean: TypeId,
    pub zstring: TypeId,
    pub i8: TypeId,
    pub u8: TypeId,
    pub i16: TypeId,
    pub u16: TypeId,
    pub i32: TypeId,
    pub u32: TypeId,
    pub i64: TypeId,
    pub u64: TypeId,
    pub f32: TypeId,
    pub f64: TypeId,
    /// `Pointer(Any)` - the universal opaque pointer (`spec.md` §3).
    pub any_ptr: TypeId,
    pub null: TypeId,
}

impl TypeInterner {
    pub fn new() -> Self {
        let mut types = lbc_util::IndexVec::new();
        let mut shape_cache = FxHashMap::default();

        let mut intern = |types: &mut lbc_util::IndexVec<TypeId, TypeKind>,
                           shape_cache: &mut FxHashMap<TypeKind, TypeId>,
                           shape: TypeKind| {
            let id = types.push(shape.clone());
            shape_cache.insert(shape, id);
            id
        };

        let void = intern(&mut types, &mut shape_cache, TypeKind::Void);
        let any = intern(&mut types, &mut shape_cache, TypeKind::Any);
        let boolean = intern(&mut types, &mut shape_cache, TypeKind::Boolean);
        let zstring = intern(&mut types, &mut shape_cache, TypeKind::ZString);
        let i8 = intern(&mut types, &mut shape_cache, TypeKind::Integral { bits: 8, signed: true });
        let u8 = intern(&mut types, &mut shape_cache, TypeKind::Integral { bits: 8, signed: false });
        let i16 = intern(&mut types, &mut shape_cache, TypeKind::Integral { bits: 16, signed: true });
        let u16 = intern(&mut types, &mut shape_cache, TypeKind::Integral { bits: 16, signed: false });
        let i32 = intern(&mut types, &mut shape_cache, TypeKind::Integral { bits: 32, signed: true });
        let u32 = intern(&mut types, &mut shape_cache, TypeKind::Integral { bits: 32, signed: false });
        let i64 = intern(&mut types, &mut shape_cache, TypeKind::Integral { bits: 64, signed: true });
        let u64 = intern(&mut types, &mut shape_cache, TypeKind::Integral { bits: 64, signed: false });
        let f32 = intern(&mut types, &mut shape_cache, TypeKind::FloatingPoint { bits: 32 });
        let f64 = intern(&mut types, &mut shape_cache, TypeKind::FloatingPoint { bits: 64 });
        let any_ptr = intern(&mut types, &mut shape_cache, TypeKind::Pointer(any));
        let null = intern(&mut types, &mut shape_cache, TypeKind::Null);

        Self {
            types,
            shape_cache,
            void,
            any,
            boolean,
            zstring,
            i8,
            u8,
            i16,
            u16,
            i32,
            u32,
            i64,
            u64,
            f32,
            f64,
            any_ptr,
            null,
        }
    }

    /// Returns the canonical `TypeId` for `shape`, creating it if this is
    /// the first time this exact shape has been requested.
    ///
    /// Not used for `Udt` - see [`Self::new_udt`].
    pub fn get(&mut self, shape: TypeKind) -> TypeId {
        debug_assert!(!matches!(shape, TypeKind::Udt { .. }), "use new_udt for nominal types");
        if let Some(&id) = self.shape_cache.get(&shape) {
            return id;
        }
        let id = self.types.push(shape.clone());
        self.shape_cache.insert(shape, id);
        id
    }

    pub fn pointer(&mut self, base: TypeId) -> TypeId {
        self.get(TypeKind::Pointer(base))
    }

    pub fn function(&mut self, ret: TypeId, params: Vec<TypeId>, variadic: bool) -> TypeId {
        self.get(TypeKind::Function { ret, params, variadic })
    }

    pub fn integral(&mut self, bits: u8, signed: bool) -> TypeId {
        self.get(TypeKind::Integral { bits, signed })
    }

    pub fn float(&mut self, bits: u8) -> TypeId {
        self.get(TypeKind::FloatingPoint { bits })
    }

    /// Allocates a fresh, nominally-unique UDT type. Never deduplicated by
    /// shape: `TYPE A ... END TYPE` and a structurally identical
    /// `TYPE B ... END TYPE` are different types.
    pub fn new_udt(&mut self, name: Symbol, packed: bool) -> TypeId {
        self.types.push(TypeKind::Udt { name, packed })
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.types[id]
    }

    pub fn is_pointer(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Pointer(_))
    }

    pub fn is_integral(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Integral { .. })
    }

    pub fn is_floating_point(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::FloatingPoint { .. })
    }

    pub fn is_numeric(&self, id: TypeId) -> bool {
        self.is_integral(id) || self.is_floating_point(id)
    }

    pub fn is_function(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Function { .. })
    }

    pub fn size_in_bits(&self, id: TypeId) -> u32 {
        match self.kind(id) {
            TypeKind::Void => 0,
            TypeKind::Any => 64,
            TypeKind::Pointer(_) => 64,
            TypeKind::Boolean => 8,
            TypeKind::Integral { bits, .. } => *bits as u32,
            TypeKind::FloatingPoint { bits } => *bits as u32,
            TypeKind::ZString => 64,
            TypeKind::Null => 64,
            TypeKind::Function { .. } => 64,
            TypeKind::Udt { .. } => 0,
        }
    }

    /// Human-readable rendering, used in diagnostics
    /// (`spec.md` §7, `SEM_INCOMPATIBLE_TYPES`'s `{0}`/`{1}`).
    pub fn display(&self, ctx: &lbc_util::Context, id: TypeId) -> String {
        match self.kind(id) {
            TypeKind::Void => "VOID".to_string(),
            TypeKind::Any => "ANY".to_string(),
            TypeKind::Pointer(base) => format!("{} PTR", self.display(ctx, *base)),
            TypeKind::Boolean => "BOOLEAN".to_string(),
            TypeKind::Integral { bits: 8, signed: true } => "BYTE".to_string(),
            TypeKind::Integral { bits: 8, signed: false } => "UBYTE".to_string(),
            TypeKind::Integral { bits: 16, signed: true } => "SHORT".to_string(),
            TypeKind::Integral { bits: 16, signed: false } => "USHORT".to_string(),
            TypeKind::Integral { bits: 32, signed: true } => "INTEGER".to_string(),
            TypeKind::Integral { bits: 32, signed: false } => "UINTEGER".to_string(),
            TypeKind::Integral { bits: 64, signed: true } => "LONG".to_string(),
            TypeKind::Integral { bits: 64, signed: false } => "ULONG".to_string(),
            TypeKind::Integral { bits, signed } => format!("I{bits}{}", if *signed { "" } else { "U" }),
            TypeKind::FloatingPoint { bits: 32 } => "SINGLE".to_string(),
            TypeKind::FloatingPoint { bits: 64 } => "DOUBLE".to_string(),
            TypeKind::FloatingPoint { bits } => format!("F{bits}"),
            TypeKind::ZString => "ZSTRING".to_string(),
            TypeKind::Null => "NULL".to_string(),
            TypeKind::Function { ret, params, variadic } => {
                let params: Vec<String> = params.iter().map(|p| self.display(ctx, *p)).collect();
                format!(
                    "FUNCTION({}{}) AS {}",
                    params.join(", "),
                    if *variadic { ", ..." } else { "" },
                    self.display(ctx, *ret)
                )
            }
            TypeKind::Udt { name, .. } => ctx.resolve(*name).to_string(),
        }
    }

    /// Compares `from` against `to`, returning how (if at all) a value of
    /// type `from` converts to `to` (`spec.md` §4.3).
    pub fn compare(&self, from: TypeId, to: TypeId) -> Compat {
        if from == to {
            return Compat::Equal;
        }

        match (self.kind(from), self.kind(to)) {
            (TypeKind::Integral { bits: fb, signed: fs }, TypeKind::Integral { bits: tb, signed: ts }) => {
                if fb == tb && fs == ts {
                    Compat::Equal
                } else if tb > fb && fs == ts {
                    Compat::Upcast
                } else {
                    Compat::Downcast
                }
            }
            (TypeKind::Integral { bits, .. }, TypeKind::FloatingPoint { bits: fbits }) => {
                if mantissa_covers(*bits, *fbits) {
                    Compat::Upcast
                } else {
                    Compat::Downcast
                }
            }
            (TypeKind::FloatingPoint { .. }, TypeKind::Integral { .. }) => Compat::Downcast,
            (TypeKind::FloatingPoint { bits: fb }, TypeKind::FloatingPoint { bits: tb }) => {
                if tb > fb {
                    Compat::Upcast
                } else {
                    Compat::Downcast
                }
            }
            (TypeKind::Pointer(_), TypeKind::Pointer(tb)) if *tb == self.any => Compat::Upcast,
            (TypeKind::Pointer(fb), TypeKind::Pointer(_)) if *fb == self.any => Compat::Downcast,
            (TypeKind::Pointer(_), TypeKind::Pointer(_)) => Compat::Incompatible,
            (TypeKind::Null, TypeKind::Pointer(_)) => Compat::Upcast,
            _ => Compat::Incompatible,
        }
    }

    /// The "common type" for a binary expression's two operands: the
    /// larger of the two per this lattice (`spec.md` §4.5 "Binary
    /// expressions"). Returns `None` if neither converts to the other.
    pub fn common_type(&self, a: TypeId, b: TypeId) -> Option<TypeId> {
        if a == b {
            return Some(a);
        }
        match self.compare(a, b) {
            Compat::Equal | Compat::Upcast => Some(b),
            Compat::Downcast => match self.compare(b, a) {
                Compat::Upcast | Compat::Equal => Some(a),
                _ => Some(b),
            },
            Compat::Incompatible => match self.compare(b, a) {
                Compat::Incompatible => None,
                _ => Some(a),
            },
        }
    }
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a `bits`-wide integral value is always exactly representable in
/// a `float_bits`-wide IEEE-754 float (`spec.md` §4.3: "integral->float
/// (when mantissa covers)").
fn mantissa_covers(int_bits: u8, float_bits: u8) -> bool {
    let mantissa = match float_bits {
        32 => 23,
        64 => 52,
        _ => 0,
    };
    (int_bits as u32) <= mantissa
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalization_same_shape_same_id() {
        let mut interner = TypeInterner::new();
        let a = interner.integral(32, true);
        let b = interner.integral(32, true);
        assert_eq!(a, b);
        assert_eq!(a, interner.i32);
    }

    #[test]
    fn canonicalization_different_shape_different_id() {
        let mut interner = TypeInterner::new();
        let a = interner.integral(32, true);
        let b = interner.integral(32, false);
        assert_ne!(a, b);
    }

    #[test]
    fn pointer_is_interned_per_base() {
        let mut interner = TypeInterner::new();
        let p1 = interner.pointer(interner.i32);
        let p2 = interner.pointer(interner.i32);
        assert_eq!(p1, p2);
        let p3 = interner.pointer(interner.i64);
        assert_ne!(p1, p3);
    }

    #[test]
    fn udt_is_never_deduplicated_by_shape() {
        let mut interner = TypeInterner::new();
        let mut ctx = lbc_util::Context::new();
        let name = ctx.intern("POINT");
        let a = interner.new_udt(name, false);
        let b = interner.new_udt(name, false);
        assert_ne!(a, b);
    }

    #[test]
    fn smaller_to_larger_same_signedness_is_upcast() {
        let mut interner = TypeInterner::new();
        assert_eq!(interner.compare(interner.i8, interner.i32), Compat::Upcast);
    }

    #[test]
    fn wider_to_narrower_is_downcast() {
        let mut interner = TypeInterner::new();
        assert_eq!(interner.compare(interner.i64, interner.i32), Compat::Downcast);
    }

    #[test]
    fn signed_unsigned_same_width_is_downcast() {
        let mut interner = TypeInterner::new();
        assert_eq!(interner.compare(interner.i32, interner.u32), Compat::Downcast);
    }

    #[test]
    fn pointer_to_any_is_upcast() {
        let mut interner = TypeInterner::new();
        let p = interner.pointer(interner.i32);
        assert_eq!(interner.compare(p, interner.any_ptr), Compat::Upcast);
    }

    #[test]
    fn float_to_int_is_downcast() {
        let mut interner = TypeInterner::new();
        assert_eq!(interner.compare(interner.f64, interner.i32), Compat::Downcast);
    }

    #[test]
    fn function_vs_non_function_is_incompatible() {
        let mut interner = TypeInterner::new();
        let f = interner.function(interner.void, vec![], false);
        assert_eq!(interner.compare(f, interner.i32), Compat::Incompatible);
    }

    #[test]
    fn null_upcasts_to_any_pointer() {
        let interner = TypeInterner::new();
        assert_eq!(interner.compare(interner.null, interner.any_ptr), Compat::Upcast);
    }

    #[test]
    fn common_type_picks_the_wider_integral() {
        let mut interner = TypeInterner::new();
        let common = interner.common_type(interner.i8, interner.i32);
        assert_eq!(common, Some(interner.i32));
    }
}
