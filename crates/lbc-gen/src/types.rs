//! Maps `lbc_types::TypeId` to LLVM types (`spec.md` §4.6).
//!
//! Unlike a one-shot translation, the mapping is memoized per `TypeId`:
//! the same `TypeId` is looked up from many call sites (a parameter here,
//! a local's alloca there, a cast's destination type elsewhere), and the
//! interner already guarantees one `TypeId` per canonical shape, so caching
//! on it is free correctness, not an optimization.

use lbc_types::{TypeId, TypeInterner, TypeKind};
use rustc_hash::FxHashMap;

use inkwell::context::Context;
use inkwell::types::{BasicTypeEnum, FunctionType, StructType};
use inkwell::AddressSpace;

use crate::error::{CodeGenError, Result};

pub struct TypeMapper<'ctx> {
    context: &'ctx Context,
    cache: FxHashMap<TypeId, BasicTypeEnum<'ctx>>,
    /// Named struct types for UDTs, keyed separately from `cache` since a
    /// struct is built in two steps (`opaque_struct_type` then
    /// `set_body`) rather than produced whole by `basic`.
    structs: FxHashMap<TypeId, StructType<'ctx>>,
}

impl<'ctx> TypeMapper<'ctx> {
    pub fn new(context: &'ctx Context) -> Self {
        Self { context, cache: FxHashMap::default(), structs: FxHashMap::default() }
    }

    /// The universal opaque pointer LLVM uses for `ANY`, `ZSTRING`, and
    /// every `PTR` type alike - `spec.md` §3 treats all three as "a single
    /// machine word", which is exactly what an opaque pointer is.
    fn opaque_ptr(&self) -> BasicTypeEnum<'ctx> {
        self.context.ptr_type(AddressSpace::default()).into()
    }

    /// Maps any non-`Void`, non-`Function` type to its LLVM representation.
    /// Both of those are handled by [`Self::function_type`] instead, since
    /// neither is a `BasicTypeEnum` in LLVM's own type hierarchy.
    pub fn basic(&mut self, types: &TypeInterner, id: TypeId) -> Result<BasicTypeEnum<'ctx>> {
        if let Some(&cached) = self.cache.get(&id) {
            return Ok(cached);
        }
        let mapped = match types.kind(id) {
            TypeKind::Void => {
                return Err(CodeGenError::TypeMappingError("VOID has no value representation".into()))
            }
            TypeKind::Any => self.opaque_ptr(),
            TypeKind::Pointer(_) => self.opaque_ptr(),
            TypeKind::ZString => self.opaque_ptr(),
            TypeKind::Null => self.opaque_ptr(),
            TypeKind::Boolean => self.context.bool_type().into(),
            TypeKind::Integral { bits: 8, .. } => self.context.i8_type().into(),
            TypeKind::Integral { bits: 16, .. } => self.context.i16_type().into(),
            TypeKind::Integral { bits: 32, .. } => self.context.i32_type().into(),
            TypeKind::Integral { bits: 64, .. } => self.context.i64_type().into(),
            TypeKind::Integral { bits, .. } => self.context.custom_width_int_type(*bits as u32).into(),
            TypeKind::FloatingPoint { bits: 32 } => self.context.f32_type().into(),
            TypeKind::FloatingPoint { bits: 64 } => self.context.f64_type().into(),
            TypeKind::FloatingPoint { bits } => {
                return Err(CodeGenError::TypeMappingError(format!(
                    "unsupported floating-point width {bits}"
                )))
            }
            TypeKind::Function { .. } => {
                return Err(CodeGenError::TypeMappingError(
                    "function types are not values; use function_type".into(),
                ))
            }
            TypeKind::Udt { .. } => match self.structs.get(&id) {
                Some(st) => (*st).into(),
                None => {
                    return Err(CodeGenError::TypeMappingError(
                        "UDT struct body not declared yet - call declare_udt/set_udt_body first"
                            .into(),
                    ))
                }
            },
        };
        self.cache.insert(id, mapped);
        Ok(mapped)
    }

    /// Builds (or returns) the named, opaque struct type for a UDT. Callers
    /// must follow up with [`Self::set_udt_body`] once every member's type
    /// is resolvable - two UDTs that reference each other by `PTR` need the
    /// opaque declaration to exist before either body is filled in.
    pub fn declare_udt(&mut self, name: &str, id: TypeId) -> StructType<'ctx> {
        if let Some(&st) = self.structs.get(&id) {
            return st;
        }
        let st = self.context.opaque_struct_type(name);
        self.structs.insert(id, st);
        st
    }

    pub fn set_udt_body(&mut self, id: TypeId, members: &[BasicTypeEnum<'ctx>], packed: bool) -> Result<()> {
        let st = self
            .structs
            .get(&id)
            .copied()
            .ok_or_else(|| CodeGenError::TypeMappingError("declare_udt must run first".into()))?;
        st.set_body(members, packed);
        self.cache.remove(&id);
        Ok(())
    }

    /// Maps a `TypeKind::Function` to an LLVM `FunctionType`, using
    /// `void_type().fn_type(..)` for a `VOID` return since that, too, isn't
    /// a `BasicTypeEnum`.
    pub fn function_type(&mut self, types: &TypeInterner, id: TypeId) -> Result<FunctionType<'ctx>> {
        let TypeKind::Function { ret, params, variadic } = types.kind(id).clone() else {
            return Err(CodeGenError::TypeMappingError("function_type called on a non-Function type".into()));
        };
        let mut param_tys = Vec::with_capacity(params.len());
        for p in &params {
            param_tys.push(self.basic(types, *p)?.into());
        }
        let fn_ty = if ret == types.void {
            self.context.void_type().fn_type(&param_tys, variadic)
        } else {
            self.basic(types, ret)?.fn_type(&param_tys, variadic)
        };
        Ok(fn_ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_integral_type_id_is_cached() {
        let context = Context::create();
        let types = TypeInterner::new();
        let mut mapper = TypeMapper::new(&context);
        let a = mapper.basic(&types, types.i32).unwrap();
        let b = mapper.basic(&types, types.i32).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn void_is_rejected_as_a_basic_type() {
        let context = Context::create();
        let types = TypeInterner::new();
        let mut mapper = TypeMapper::new(&context);
        assert!(mapper.basic(&types, types.void).is_err());
    }

    #[test]
    fn pointer_and_any_and_zstring_share_the_opaque_pointer_shape() {
        let context = Context::create();
        let mut types = TypeInterner::new();
        let mut mapper = TypeMapper::new(&context);
        let ptr_i32 = types.pointer(types.i32);
        let a = mapper.basic(&types, ptr_i32).unwrap();
        let b = mapper.basic(&types, types.any).unwrap();
        let c = mapper.basic(&types, types.zstring).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn function_type_uses_void_fn_type_for_void_return() {
        let context = Context::create();
        let mut types = TypeInterner::new();
        let mut mapper = TypeMapper::new(&context);
        let f = types.function(types.void, vec![types.i32], false);
        let fn_ty = mapper.function_type(&types, f).unwrap();
        assert!(fn_ty.get_return_type().is_none());
    }
}
