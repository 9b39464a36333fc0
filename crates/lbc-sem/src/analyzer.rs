//! The [`Analyzer`] itself: pass orchestration, name/type resolution, and
//! the coercion machinery every statement/expression analysis routine in
//! [`crate::stmt`] and [`crate::expr`] calls into (`spec.md` §4.5).

use lbc_ast::{Ast, Attribute, NodeId, NodeKind, TypeExprKind};
use lbc_sym::{SymbolFlags, SymbolId, SymbolTable, UdtMembers};
use lbc_types::{Compat, TypeId, TypeInterner};
use lbc_util::{
    Context, Symbol, SEM_INCOMPATIBLE_TYPES, SEM_REDEFINITION, SEM_UNDEFINED_IDENT, WARN_NARROWING,
};
use rustc_hash::FxHashMap;

/// The direction a `FOR` loop's induction variable moves, determined once
/// at analysis time so codegen never has to re-derive it
/// (`spec.md` §4.5 "FOR", §8 testable property 8).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForDirection {
    /// `start`/`end` aren't both literals; codegen must compare at runtime.
    Unknown,
    /// The loop provably never executes its body.
    Skip,
    Increment,
    Decrement,
}

/// Every side table the analyzer fills in, handed back to codegen.
///
/// Resolved types/symbols/directions are keyed by [`NodeId`] rather than
/// stored on the node itself, the same way `lbc-sym`'s `UdtMembers` keeps
/// member layout off `lbc-types`'s `TypeKind::Udt`.
pub struct SemaResult {
    pub types: TypeInterner,
    pub symtab: SymbolTable,
    pub udts: UdtMembers,
    pub node_types: FxHashMap<NodeId, TypeId>,
    pub node_symbols: FxHashMap<NodeId, SymbolId>,
    pub for_directions: FxHashMap<NodeId, ForDirection>,
    pub udt_names: FxHashMap<Symbol, TypeId>,
}

impl SemaResult {
    fn new() -> Self {
        Self {
            types: TypeInterner::new(),
            symtab: SymbolTable::new(),
            udts: UdtMembers::new(),
            node_types: FxHashMap::default(),
            node_symbols: FxHashMap::default(),
            for_directions: FxHashMap::default(),
            udt_names: FxHashMap::default(),
        }
    }
}

pub struct Analyzer<'a> {
    pub(crate) ast: &'a mut Ast,
    pub(crate) ctx: &'a mut Context,
    pub(crate) result: SemaResult,
    pub(crate) current_return_type: Option<TypeId>,
}

impl<'a> Analyzer<'a> {
    pub fn new(ast: &'a mut Ast, ctx: &'a mut Context) -> Self {
        Self { ast, ctx, result: SemaResult::new(), current_return_type: None }
    }

    /// Runs all four passes over `root` (a `Module` node), short-circuiting
    /// after any pass that produced errors (`spec.md` §9: phase drivers,
    /// not the analyzer's internals, decide whether to proceed).
    pub fn analyze(mut self, root: NodeId) -> SemaResult {
        let decls = match self.ast.kind(root) {
            NodeKind::Module { decls, .. } => decls.clone(),
            other => lbc_util::ice!("analyze() called on non-Module node: {other:?}"),
        };

        self.type_pass(&decls);
        if self.ctx.diags.has_errors() {
            return self.result;
        }
        self.udt_pass(&decls);
        if self.ctx.diags.has_errors() {
            return self.result;
        }
        self.function_pass(&decls);
        if self.ctx.diags.has_errors() {
            return self.result;
        }
        self.body_pass(&decls);
        self.result
    }

    /// Pre-declares every `TYPE`'s name, so member lists resolved in
    /// [`Self::udt_pass`] can forward-reference any other UDT in the
    /// module (`spec.md` §4.5 "Type pass").
    fn type_pass(&mut self, decls: &[NodeId]) {
        for &id in decls {
            let NodeKind::TypeDecl { name, packed, .. } = self.ast.kind(id).clone() else {
                continue;
            };
            if self.result.udt_names.contains_key(&name) {
                let span = self.ast.span(id);
                let msg = self.ctx.resolve(name).to_string();
                self.ctx.diags.error(SEM_REDEFINITION, span, &[msg]);
                continue;
            }
            let ty = self.result.types.new_udt(name, packed);
            self.result.udt_names.insert(name, ty);
        }
    }

    /// Resolves every UDT's member `TypeExpr`s and populates
    /// [`SemaResult::udts`] (`spec.md` §4.5 "UDT declarer pass").
    fn udt_pass(&mut self, decls: &[NodeId]) {
        for &id in decls {
            let NodeKind::TypeDecl { name, members, .. } = self.ast.kind(id).clone() else {
                continue;
            };
            let udt_ty = *self.result.udt_names.get(&name).expect("pre-declared in type_pass");
            self.result.symtab.push_scope(lbc_sym::ScopeKind::Block);
            for member_id in members {
                let NodeKind::TypeMember { name: member_name, ty } = self.ast.kind(member_id).clone() else {
                    continue;
                };
                let member_ty = self.resolve_type_expr(ty);
                let span = self.ast.span(member_id);
                match self.result.symtab.declare(
                    member_name,
                    member_name,
                    member_ty,
                    SymbolFlags { is_udt_member: true, ..Default::default() },
                    span,
                ) {
                    Ok(sym) => {
                        self.result.udts.declare_member(udt_ty, sym, member_ty);
                        self.result.node_symbols.insert(member_id, sym);
                    }
                    Err(_) => {
                        let msg = self.ctx.resolve(member_name).to_string();
                        self.ctx.diags.error(SEM_REDEFINITION, span, &[msg]);
                    }
                }
                self.result.node_types.insert(member_id, member_ty);
            }
            self.result.symtab.pop_scope();
        }
    }

    /// Registers every function/sub signature at module scope
    /// (`spec.md` §4.5 "Function declarer pass"). `ALIAS` attributes
    /// override the symbol's emitted name; `MAIN` lowercases to `main`
    /// as the platform C entry point expects.
    fn function_pass(&mut self, decls: &[NodeId]) {
        for &id in decls {
            let NodeKind::FunctionDecl { name, attributes, params, is_variadic, ret, body } =
                self.ast.kind(id).clone()
            else {
                continue;
            };

            let mut param_tys = Vec::with_capacity(params.len());
            for &param_id in &params {
                let NodeKind::Param { ty, .. } = self.ast.kind(param_id).clone() else {
                    continue;
                };
                let pty = self.resolve_type_expr(ty);
                param_tys.push(pty);
                self.result.node_types.insert(param_id, pty);
            }
            let ret_ty = match ret {
                Some(ty) => self.resolve_type_expr(ty),
                None => self.result.types.void,
            };
            let fn_ty = self.result.types.function(ret_ty, param_tys, is_variadic);
            self.result.node_types.insert(id, fn_ty);

            let alias = attributes.iter().find_map(|a| match a {
                Attribute::Alias(sym) => Some(*sym),
                _ => None,
            });
            let resolved_name = if self.ctx.resolve(name).eq_ignore_ascii_case("MAIN") {
                self.ctx.intern("main")
            } else {
                name
            };
            let alias = alias.unwrap_or(resolved_name);

            // A bodyless `DECLARE` names something defined elsewhere (a
            // runtime/libc entry point); `MAIN` must stay externally
            // visible too, since the platform CRT calls it by name
            // regardless of how it was declared (`spec.md` §4.4
            // "externalLinkage", §6 "-main").
            let external_linkage = body.is_none() || resolved_name == self.ctx.intern("main");
            let flags = SymbolFlags { external_linkage, ..Default::default() };
            let span = self.ast.span(id);
            match self.result.symtab.declare(resolved_name, alias, fn_ty, flags, span) {
                Ok(sym) => {
                    self.result.node_symbols.insert(id, sym);
                }
                Err(_) => {
                    let msg = self.ctx.resolve(name).to_string();
                    self.ctx.diags.error(SEM_REDEFINITION, span, &[msg]);
                }
            }
        }
    }

    /// Walks every function body (and any executable top-level statement
    /// the current grammar allows) with a fresh per-function scope stack
    /// (`spec.md` §4.5 "Body pass").
    fn body_pass(&mut self, decls: &[NodeId]) {
        for &id in decls {
            let NodeKind::FunctionDecl { params, ret, body, .. } = self.ast.kind(id).clone() else {
                continue;
            };
            let Some(body) = body else { continue };

            let ret_ty = match ret {
                Some(ty_id) => *self.result.node_types.get(&ty_id).unwrap_or(&self.result.types.void),
                None => self.result.types.void,
            };
            self.current_return_type = Some(ret_ty);
            self.result.symtab.push_scope(lbc_sym::ScopeKind::Function);

            for &param_id in &params {
                let NodeKind::Param { name, .. } = self.ast.kind(param_id).clone() else {
                    continue;
                };
                let pty = *self.result.node_types.get(&param_id).expect("typed in function_pass");
                let span = self.ast.span(param_id);
                match self.result.symtab.declare(
                    name,
                    name,
                    pty,
                    SymbolFlags { is_parameter: true, ..Default::default() },
                    span,
                ) {
                    Ok(sym) => {
                        self.result.node_symbols.insert(param_id, sym);
                    }
                    Err(_) => {
                        let msg = self.ctx.resolve(name).to_string();
                        self.ctx.diags.error(SEM_REDEFINITION, span, &[msg]);
                    }
                }
            }

            for stmt in body {
                self.analyze_stmt(stmt);
            }

            self.result.symtab.pop_scope();
            self.current_return_type = None;
        }
    }

    /// Resolves a `TypeExpr` node to its `TypeId`, following `PTR` depth
    /// and looking named types up in [`SemaResult::udt_names`].
    pub(crate) fn resolve_type_expr(&mut self, id: NodeId) -> TypeId {
        let NodeKind::TypeExpr { base, pointer_depth } = self.ast.kind(id).clone() else {
            lbc_util::ice!("resolve_type_expr called on a non-TypeExpr node");
        };
        let mut ty = match base {
            TypeExprKind::Byte => self.result.types.i8,
            TypeExprKind::UByte => self.result.types.u8,
            TypeExprKind::Short => self.result.types.i16,
            TypeExprKind::UShort => self.result.types.u16,
            TypeExprKind::Integer => self.result.types.i32,
            TypeExprKind::UInteger => self.result.types.u32,
            TypeExprKind::Long => self.result.types.i64,
            TypeExprKind::ULong => self.result.types.u64,
            TypeExprKind::Single => self.result.types.f32,
            TypeExprKind::Double => self.result.types.f64,
            TypeExprKind::Boolean => self.result.types.boolean,
            TypeExprKind::ZString => self.result.types.zstring,
            TypeExprKind::Any => self.result.types.any,
            TypeExprKind::Void => self.result.types.void,
            TypeExprKind::Named(name) => match self.result.udt_names.get(&name) {
                Some(&ty) => ty,
                None => {
                    let span = self.ast.span(id);
                    let msg = self.ctx.resolve(name).to_string();
                    self.ctx.diags.error(SEM_UNDEFINED_IDENT, span, &[msg]);
                    self.result.types.any
                }
            },
        };
        for _ in 0..pointer_depth {
            ty = self.result.types.pointer(ty);
        }
        ty
    }

    /// Synthesizes a `TypeExpr` node spelling `ty`, for a `CAST` the
    /// analyzer inserts rather than one the user wrote.
    pub(crate) fn synth_type_expr(&mut self, ty: TypeId, span: lbc_util::Span) -> NodeId {
        let (base, pointer_depth) = crate::fold::type_expr_for(&self.result.types, ty);
        self.ast.alloc(NodeKind::TypeExpr { base, pointer_depth }, span)
    }

    /// Coerces `id` (already analyzed, with a recorded type) to `target`,
    /// inserting/collapsing an implicit `CAST` as needed
    /// (`spec.md` §4.5 "Coercion algorithm").
    ///
    /// Returns the (possibly different) `NodeId` to use in `id`'s place -
    /// in every case this is `id` itself, since coercions mutate the node
    /// in place rather than relocating it, but callers should still use
    /// the return value rather than assume it.
    pub(crate) fn coerce(&mut self, id: NodeId, target: TypeId) -> NodeId {
        let from = *self.result.node_types.get(&id).unwrap_or(&self.result.types.any);
        if from == target {
            return id;
        }
        match self.result.types.compare(from, target) {
            Compat::Equal => {
                self.result.node_types.insert(id, target);
                id
            }
            Compat::Upcast => {
                self.wrap_and_fold(id, from, target);
                id
            }
            Compat::Downcast => {
                let folds_without_warning = match self.ast.kind(id).clone() {
                    NodeKind::Literal { value } => crate::fold::literal_fits(value, from, target, &self.result.types),
                    _ => false,
                };
                if folds_without_warning {
                    self.result.node_types.insert(id, target);
                } else {
                    let span = self.ast.span(id);
                    let from_name = self.result.types.display(self.ctx, from);
                    let to_name = self.result.types.display(self.ctx, target);
                    self.ctx.diags.warning(WARN_NARROWING, span, &[from_name, to_name]);
                    self.wrap_only(id, target);
                }
                id
            }
            Compat::Incompatible => {
                let span = self.ast.span(id);
                let from_name = self.result.types.display(self.ctx, from);
                let to_name = self.result.types.display(self.ctx, target);
                self.ctx.diags.error(SEM_INCOMPATIBLE_TYPES, span, &[from_name, to_name]);
                id
            }
        }
    }

    /// Wraps `id`'s current content in a fresh inner node, rewrites `id`
    /// itself to an implicit `Cast` of that inner node, then attempts to
    /// fold it back to a bare `Literal` if the inner node is one.
    fn wrap_and_fold(&mut self, id: NodeId, from: TypeId, target: TypeId) {
        let literal_value = match self.ast.kind(id).clone() {
            NodeKind::Literal { value } => Some(value),
            _ => None,
        };
        self.wrap_only(id, target);
        if let Some(value) = literal_value {
            if let Some(folded) = crate::fold::fold_upcast(value, from, target, &self.result.types) {
                self.ast.set_kind(id, NodeKind::Literal { value: folded });
            }
        }
    }

    /// Allocates an inner node holding `id`'s current kind/span, then
    /// overwrites `id` with `Cast { expr: inner, ty: <synth>, implicit:
    /// true }`, recording `target` as `id`'s type. The inner node keeps
    /// `id`'s pre-coercion type in the side table under its own fresh id.
    fn wrap_only(&mut self, id: NodeId, target: TypeId) {
        let span = self.ast.span(id);
        let inner_kind = self.ast.kind(id).clone();
        let from = *self.result.node_types.get(&id).unwrap_or(&self.result.types.any);
        let inner = self.ast.alloc(inner_kind, span);
        self.result.node_types.insert(inner, from);
        if let Some(&sym) = self.result.node_symbols.get(&id) {
            self.result.node_symbols.insert(inner, sym);
        }
        let ty_node = self.synth_type_expr(target, span);
        self.ast.set_kind(id, NodeKind::Cast { expr: inner, ty: ty_node, implicit: true });
        self.result.node_types.insert(id, target);
    }

    /// `promote_variadic` is just `coerce` to a pre-computed target:
    /// sub-32-bit integrals widen to a same-signedness 32-bit integral,
    /// and `SINGLE` widens to `DOUBLE` - both already ordinary `Upcast`s,
    /// so no separate fold/wrap path is needed (`spec.md` §4.5 "variadic
    /// argument promotion").
    pub(crate) fn promote_variadic(&mut self, id: NodeId) -> NodeId {
        let from = *self.result.node_types.get(&id).unwrap_or(&self.result.types.any);
        let target = match self.result.types.kind(from) {
            lbc_types::TypeKind::Integral { bits, signed } if *bits < 32 => {
                self.result.types.integral(32, *signed)
            }
            lbc_types::TypeKind::FloatingPoint { bits: 32 } => self.result.types.f64,
            _ => from,
        };
        if target == from {
            id
        } else {
            self.coerce(id, target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lbc_ast::{LiteralValue, TypeExprKind};
    use lbc_par::Parser;
    use lbc_util::{
        Context, SEM_ARG_COUNT_MISMATCH, SEM_INCOMPATIBLE_TYPES, SEM_NOT_ASSIGNABLE, SEM_NOT_A_RECORD,
        SEM_NOT_CALLABLE, SEM_RETURN_OUTSIDE_FUNCTION, WARN_NARROWING, WARN_UNREACHABLE_FOR_BODY, WARN_ZERO_STEP,
    };

    fn analyze(src: &str) -> (Ast, NodeId, Context, SemaResult) {
        let mut ctx = Context::new();
        let file = ctx.sources.add_file("t.bas", src.to_string());
        let parser = Parser::new(src, &mut ctx, file);
        let (mut ast, root) = parser.parse_module(&mut ctx).expect("parse failed");
        let result = Analyzer::new(&mut ast, &mut ctx).analyze(root);
        (ast, root, ctx, result)
    }

    fn nth_decl_body(ast: &Ast, root: NodeId, index: usize) -> Vec<NodeId> {
        let NodeKind::Module { decls, .. } = ast.kind(root) else { panic!("expected module") };
        match ast.kind(decls[index]) {
            NodeKind::FunctionDecl { body: Some(body), .. } => body.clone(),
            other => panic!("expected a function with a body, got {other:?}"),
        }
    }

    fn has_code(ctx: &Context, code: lbc_util::DiagnosticCode) -> bool {
        ctx.diags.diagnostics().iter().any(|d| d.code == Some(code))
    }

    #[test]
    fn const_var_decl_is_not_assignable() {
        // The grammar has no `CONST` keyword yet (`VarDecl::is_const` is
        // always `false` out of the parser), so this exercises the flag
        // directly against a hand-built `Ast`.
        let mut ctx = Context::new();
        let mut ast = Ast::new();
        let int_ty = ast.alloc(NodeKind::TypeExpr { base: TypeExprKind::Integer, pointer_depth: 0 }, lbc_util::Span::DUMMY);
        let one = ast.alloc(NodeKind::Literal { value: LiteralValue::Integer(1) }, lbc_util::Span::DUMMY);
        let x = ctx.intern("X");
        let decl = ast.alloc(
            NodeKind::VarDecl { name: x, attributes: Vec::new(), ty: int_ty, init: Some(one), is_const: true },
            lbc_util::Span::DUMMY,
        );
        let ident = ast.alloc(NodeKind::Identifier { name: x }, lbc_util::Span::DUMMY);
        let two = ast.alloc(NodeKind::Literal { value: LiteralValue::Integer(2) }, lbc_util::Span::DUMMY);
        let assign = ast.alloc(NodeKind::Assignment { target: ident, value: two }, lbc_util::Span::DUMMY);
        let func = ast.alloc(
            NodeKind::FunctionDecl {
                name: ctx.intern("F"),
                attributes: Vec::new(),
                params: Vec::new(),
                is_variadic: false,
                ret: None,
                body: Some(vec![decl, assign]),
            },
            lbc_util::Span::DUMMY,
        );
        let module = ast.alloc(NodeKind::Module { imports: Vec::new(), decls: vec![func] }, lbc_util::Span::DUMMY);

        Analyzer::new(&mut ast, &mut ctx).analyze(module);
        assert!(has_code(&ctx, SEM_NOT_ASSIGNABLE));
    }

    #[test]
    fn undefined_identifier_is_reported() {
        let (_ast, _root, ctx, _sem) = analyze("SUB F()\nDIM X AS INTEGER = Y\nEND SUB\n");
        assert!(ctx.diags.has_errors());
    }

    #[test]
    fn narrowing_assignment_warns_but_does_not_error() {
        let src = "SUB F()\nDIM X AS LONG = 1\nDIM Y AS BYTE\nY = X\nEND SUB\n";
        let (_ast, _root, ctx, _sem) = analyze(src);
        assert!(!ctx.diags.has_errors());
        assert!(has_code(&ctx, WARN_NARROWING));
    }

    #[test]
    fn narrowing_literal_assignment_folds_silently() {
        let src = "SUB F()\nDIM Y AS BYTE = 5\nEND SUB\n";
        let (_ast, _root, ctx, _sem) = analyze(src);
        assert!(!ctx.diags.has_errors());
        assert!(!has_code(&ctx, WARN_NARROWING));
    }

    #[test]
    fn for_loop_increments_over_ascending_literal_bounds() {
        let src = "SUB F()\nFOR I = 1 TO 10\nNEXT\nEND SUB\n";
        let (ast, root, _ctx, sem) = analyze(src);
        let for_id = nth_decl_body(&ast, root, 0)[0];
        assert_eq!(sem.for_directions.get(&for_id), Some(&ForDirection::Increment));
    }

    #[test]
    fn for_loop_decrements_over_descending_literal_bounds() {
        let src = "SUB F()\nFOR I = 10 TO 1 STEP -1\nNEXT\nEND SUB\n";
        let (ast, root, _ctx, sem) = analyze(src);
        let for_id = nth_decl_body(&ast, root, 0)[0];
        assert_eq!(sem.for_directions.get(&for_id), Some(&ForDirection::Decrement));
    }

    #[test]
    fn for_loop_zero_step_warns_and_forces_increment() {
        let src = "SUB F()\nFOR I = 1 TO 10 STEP 0\nNEXT\nEND SUB\n";
        let (ast, root, ctx, sem) = analyze(src);
        let for_id = nth_decl_body(&ast, root, 0)[0];
        assert_eq!(sem.for_directions.get(&for_id), Some(&ForDirection::Increment));
        assert!(has_code(&ctx, WARN_ZERO_STEP));
    }

    #[test]
    fn for_loop_mismatched_step_direction_is_unreachable() {
        let src = "SUB F()\nFOR I = 1 TO 10 STEP -1\nNEXT\nEND SUB\n";
        let (ast, root, ctx, sem) = analyze(src);
        let for_id = nth_decl_body(&ast, root, 0)[0];
        assert_eq!(sem.for_directions.get(&for_id), Some(&ForDirection::Skip));
        assert!(has_code(&ctx, WARN_UNREACHABLE_FOR_BODY));
    }

    #[test]
    fn iif_one_zero_folds_to_a_cast_of_the_condition() {
        let src = "SUB F()\nDIM X AS INTEGER = IIF(1 = 1, 1, 0)\nEND SUB\n";
        let (ast, root, ctx, _sem) = analyze(src);
        assert!(!ctx.diags.has_errors());
        let NodeKind::VarDecl { init: Some(init), .. } = ast.kind(nth_decl_body(&ast, root, 0)[0]) else {
            panic!()
        };
        match ast.kind(*init) {
            NodeKind::Cast { implicit: true, .. } => {}
            other => panic!("expected a folded implicit cast, got {other:?}"),
        }
    }

    #[test]
    fn and_over_boolean_operands_folds_normally() {
        let src = "SUB F()\nDIM X AS BOOLEAN = TRUE AND FALSE\nEND SUB\n";
        let (ast, root, ctx, _sem) = analyze(src);
        assert!(!ctx.diags.has_errors());
        let NodeKind::VarDecl { init: Some(init), .. } = ast.kind(nth_decl_body(&ast, root, 0)[0]) else {
            panic!()
        };
        match ast.kind(*init) {
            NodeKind::Literal { value: LiteralValue::Bool(false) } => {}
            other => panic!("expected the short-circuit AND to fold to FALSE, got {other:?}"),
        }
    }

    #[test]
    fn and_over_non_boolean_operands_is_rejected() {
        let src = "SUB F()\nDIM X AS INTEGER = 6 AND 3\nEND SUB\n";
        let (_ast, _root, ctx, _sem) = analyze(src);
        assert!(has_code(&ctx, SEM_INCOMPATIBLE_TYPES));
    }

    #[test]
    fn call_with_wrong_arity_is_rejected() {
        let src = "SUB F(X AS INTEGER)\nEND SUB\nSUB G()\nF()\nEND SUB\n";
        let (_ast, _root, ctx, _sem) = analyze(src);
        assert!(has_code(&ctx, SEM_ARG_COUNT_MISMATCH));
    }

    #[test]
    fn calling_a_non_function_is_rejected() {
        let src = "SUB F()\nDIM X AS INTEGER\nX()\nEND SUB\n";
        let (_ast, _root, ctx, _sem) = analyze(src);
        assert!(has_code(&ctx, SEM_NOT_CALLABLE));
    }

    #[test]
    fn member_access_on_non_record_is_rejected() {
        let src = "SUB F()\nDIM X AS INTEGER\nDIM Y AS INTEGER = X.FIELD\nEND SUB\n";
        let (_ast, _root, ctx, _sem) = analyze(src);
        assert!(has_code(&ctx, SEM_NOT_A_RECORD));
    }

    #[test]
    fn udt_member_access_resolves_the_declared_member_type() {
        let src = "TYPE POINT\nX AS INTEGER\nY AS INTEGER\nEND TYPE\nSUB F()\nDIM P AS POINT\nDIM X AS INTEGER = P.X\nEND SUB\n";
        let (_ast, _root, ctx, _sem) = analyze(src);
        assert!(!ctx.diags.has_errors());
    }

    #[test]
    fn declared_prototype_without_a_body_gets_external_linkage() {
        let src = "DECLARE SUB PUTS(S AS ZSTRING)\nSUB F()\nEND SUB\n";
        let (ast, root, _ctx, sem) = analyze(src);
        let NodeKind::Module { decls, .. } = ast.kind(root) else { panic!() };
        let puts_sym = *sem.node_symbols.get(&decls[0]).expect("DECLARE gets a symbol too");
        let f_sym = *sem.node_symbols.get(&decls[1]).expect("defined SUB gets a symbol");
        assert!(sem.symtab.symbol(puts_sym).flags.external_linkage);
        assert!(!sem.symtab.symbol(f_sym).flags.external_linkage);
    }

    #[test]
    fn main_always_gets_external_linkage() {
        let src = "SUB MAIN()\nEND SUB\n";
        let (ast, root, _ctx, sem) = analyze(src);
        let NodeKind::Module { decls, .. } = ast.kind(root) else { panic!() };
        let main_sym = *sem.node_symbols.get(&decls[0]).unwrap();
        assert!(sem.symtab.symbol(main_sym).flags.external_linkage);
    }

    #[test]
    fn return_outside_a_function_is_reported() {
        // The grammar has no executable top-level statement, so this is
        // exercised directly against a hand-built `Ast` rather than parsed
        // source.
        let mut ctx = Context::new();
        let mut ast = Ast::new();
        let ret = ast.alloc(NodeKind::Return { value: None }, lbc_util::Span::DUMMY);
        let mut analyzer = Analyzer::new(&mut ast, &mut ctx);
        analyzer.analyze_stmt(ret);
        assert!(has_code(&ctx, SEM_RETURN_OUTSIDE_FUNCTION));
    }
}
