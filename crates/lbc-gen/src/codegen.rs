//! Lowers a fully-analyzed `lbc_ast::Ast` to an LLVM module (`spec.md`
//! §4.6 "CodeGen contract"), grounded on the teacher's `LlvmBackend`
//! (inkwell context/module/builder plumbing, builder `.map_err` idiom,
//! target-machine emission) but driving lowering from the typed AST and
//! `lbc_sem::SemaResult` side tables instead of a separate LIR.

use std::path::Path;
use std::sync::Once;

use inkwell::basic_block::BasicBlock;
use inkwell::context::Context as InkwellContext;
use inkwell::module::{Linkage, Module};
use inkwell::targets::{
    CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine, TargetTriple,
};
use inkwell::types::BasicTypeEnum;
use inkwell::values::{
    BasicMetadataValueEnum, BasicValue, BasicValueEnum, FunctionValue, GlobalValue, PointerValue,
};
use inkwell::{AddressSpace, FloatPredicate, IntPredicate, OptimizationLevel};
use rustc_hash::FxHashMap;

use lbc_ast::operator::{binary_info, BinaryOp, SemanticKind, UnaryOp};
use lbc_ast::{Ast, DoLoopKind, LiteralValue, LoopKind, NodeId, NodeKind};
use lbc_sem::{ForDirection, SemaResult};
use lbc_sym::SymbolId;
use lbc_types::{TypeId, TypeKind};
use lbc_util::Context as LbcContext;

use crate::error::{CodeGenError, Result};
use crate::types::TypeMapper;

static INIT_TARGETS: Once = Once::new();

/// Abstracts "a value" from "the address a value lives at" so every
/// expression-lowering site goes through the same load/store path
/// (`spec.md` §4.6: "every AstExpr evaluates to a value-handle that
/// abstracts value vs. address").
#[derive(Clone, Copy)]
enum ValueHandle<'ctx> {
    Value(BasicValueEnum<'ctx>),
    Address { ptr: PointerValue<'ctx>, pointee: BasicTypeEnum<'ctx> },
}

impl<'ctx> ValueHandle<'ctx> {
    fn load(self, builder: &inkwell::builder::Builder<'ctx>) -> Result<BasicValueEnum<'ctx>> {
        match self {
            ValueHandle::Value(v) => Ok(v),
            ValueHandle::Address { ptr, pointee } => builder
                .build_load(pointee, ptr, "load")
                .map_err(|e| CodeGenError::LlvmOperationFailed(format!("load: {e}"))),
        }
    }

    fn address(self) -> Result<PointerValue<'ctx>> {
        match self {
            ValueHandle::Address { ptr, .. } => Ok(ptr),
            ValueHandle::Value(_) => {
                Err(CodeGenError::LlvmOperationFailed("expression is not addressable".into()))
            }
        }
    }
}

struct Local<'ctx> {
    ptr: PointerValue<'ctx>,
    pointee: BasicTypeEnum<'ctx>,
}

struct GlobalSlot<'ctx> {
    global: GlobalValue<'ctx>,
    pointee: BasicTypeEnum<'ctx>,
}

pub struct CodeGen<'ctx> {
    context: &'ctx InkwellContext,
    module: Module<'ctx>,
    builder: inkwell::builder::Builder<'ctx>,
    target_triple: String,
    opt_level: OptimizationLevel,
    type_mapper: TypeMapper<'ctx>,

    functions: FxHashMap<SymbolId, FunctionValue<'ctx>>,
    globals: FxHashMap<SymbolId, GlobalSlot<'ctx>>,
    locals: FxHashMap<SymbolId, Local<'ctx>>,
    /// Global `VarDecl`s whose initializer isn't a compile-time constant;
    /// lowered into a synthesized module constructor after every function
    /// is declared (`spec.md` §4.6: "Global variables are initialized in a
    /// synthesized module constructor function when initializers are
    /// non-constant").
    deferred_initializers: Vec<(SymbolId, NodeId)>,
    /// `(loop kind, continue target, break target)`, innermost last -
    /// `EXIT`/`CONTINUE` search from the top down for the first frame of
    /// the matching kind (`spec.md` §4.5 "control-flow branch").
    loop_stack: Vec<(LoopKind, BasicBlock<'ctx>, BasicBlock<'ctx>)>,
    current_function: Option<FunctionValue<'ctx>>,
    current_return_type: Option<TypeId>,
}

impl<'ctx> CodeGen<'ctx> {
    pub fn new(
        context: &'ctx InkwellContext,
        module_name: &str,
        target_triple: String,
        opt_level: OptimizationLevel,
    ) -> Result<Self> {
        INIT_TARGETS.call_once(|| {
            Target::initialize_all(&InitializationConfig::default());
        });

        let module = context.create_module(module_name);
        let triple = TargetTriple::create(&target_triple);
        module.set_triple(&triple);
        if let Some(machine) = Self::target_machine(&triple, opt_level) {
            module.set_data_layout(&machine.get_target_data().get_data_layout());
        }

        Ok(Self {
            context,
            module,
            builder: context.create_builder(),
            target_triple,
            opt_level,
            type_mapper: TypeMapper::new(context),
            functions: FxHashMap::default(),
            globals: FxHashMap::default(),
            locals: FxHashMap::default(),
            deferred_initializers: Vec::new(),
            loop_stack: Vec::new(),
            current_function: None,
            current_return_type: None,
        })
    }

    fn target_machine(triple: &TargetTriple, opt_level: OptimizationLevel) -> Option<TargetMachine> {
        let target = Target::from_triple(triple).ok()?;
        target.create_target_machine(
            triple,
            "generic",
            "",
            opt_level,
            RelocMode::Default,
            CodeModel::Default,
        )
    }

    /// Lowers an entire module: UDT layouts, then globals, then every
    /// function signature, then every function body, then (if needed) the
    /// global-initializer constructor.
    pub fn compile_module(
        &mut self,
        ast: &Ast,
        lctx: &LbcContext,
        sema: &SemaResult,
        root: NodeId,
    ) -> Result<()> {
        let decls = match ast.kind(root) {
            NodeKind::Module { decls, .. } => decls.clone(),
            other => return Err(CodeGenError::LlvmOperationFailed(format!("expected Module, got {other:?}"))),
        };

        self.declare_udts(ast, lctx, sema, &decls)?;
        self.declare_globals(ast, lctx, sema, &decls)?;
        self.declare_functions(ast, lctx, sema, &decls)?;
        for &id in &decls {
            if let NodeKind::FunctionDecl { body: Some(_), .. } = ast.kind(id) {
                self.lower_function(ast, lctx, sema, id)?;
            }
        }
        self.emit_global_constructor(ast, lctx, sema)?;
        Ok(())
    }

    fn declare_udts(&mut self, ast: &Ast, lctx: &LbcContext, sema: &SemaResult, decls: &[NodeId]) -> Result<()> {
        let mut udt_ids = Vec::new();
        for &id in decls {
            let NodeKind::TypeDecl { name, .. } = ast.kind(id) else { continue };
            let udt_ty = *sema.udt_names.get(name).expect("declared in the type pass");
            self.type_mapper.declare_udt(lctx.resolve(*name), udt_ty);
            udt_ids.push((id, udt_ty));
        }
        for (id, udt_ty) in udt_ids {
            let NodeKind::TypeDecl { packed, .. } = ast.kind(id) else { continue };
            let member_tys: Vec<BasicTypeEnum> = sema
                .udts
                .members(udt_ty)
                .iter()
                .map(|m| self.type_mapper.basic(&sema.types, m.ty))
                .collect::<Result<_>>()?;
            self.type_mapper.set_udt_body(udt_ty, &member_tys, *packed)?;
        }
        Ok(())
    }

    fn declare_globals(&mut self, ast: &Ast, lctx: &LbcContext, sema: &SemaResult, decls: &[NodeId]) -> Result<()> {
        for &id in decls {
            let NodeKind::VarDecl { init, .. } = ast.kind(id).clone() else { continue };
            let sym = *sema.node_symbols.get(&id).expect("typed in the body pass");
            let ty = *sema.node_types.get(&id).expect("typed in the body pass");
            let basic_ty = self.type_mapper.basic(&sema.types, ty)?;
            let (linkage, name) = self.linkage_and_name(lctx, sema, sym);
            let global = self.module.add_global(basic_ty, None, &name);
            global.set_linkage(linkage);

            let constant = match init {
                Some(n) => self.const_literal(ast, sema, n)?,
                None => None,
            };
            match constant {
                Some(value) => global.set_initializer(&value),
                None => {
                    global.set_initializer(&self.zero_of(basic_ty));
                    if let Some(init) = init {
                        self.deferred_initializers.push((sym, init));
                    }
                }
            }
            self.globals.insert(sym, GlobalSlot { global, pointee: basic_ty });
        }
        Ok(())
    }

    /// A global's initializer can be emitted as an LLVM constant directly
    /// only when it's still a bare numeric/boolean `Literal` after folding;
    /// a string literal needs `build_global_string_ptr`, which requires a
    /// positioned builder, so it (like a call or an un-folded `CAST`) is
    /// deferred to the module constructor instead.
    fn const_literal(&mut self, ast: &Ast, sema: &SemaResult, id: NodeId) -> Result<Option<BasicValueEnum<'ctx>>> {
        let NodeKind::Literal { value } = ast.kind(id) else { return Ok(None) };
        if matches!(value, LiteralValue::Str(_)) {
            return Ok(None);
        }
        let Some(&ty) = sema.node_types.get(&id) else { return Ok(None) };
        Ok(Some(self.literal_value(sema, *value, ty)?))
    }

    fn zero_of(&self, ty: BasicTypeEnum<'ctx>) -> BasicValueEnum<'ctx> {
        match ty {
            BasicTypeEnum::IntType(t) => t.const_zero().into(),
            BasicTypeEnum::FloatType(t) => t.const_zero().into(),
            BasicTypeEnum::PointerType(t) => t.const_null().into(),
            BasicTypeEnum::StructType(t) => t.const_zero().into(),
            BasicTypeEnum::ArrayType(t) => t.const_zero().into(),
            BasicTypeEnum::VectorType(t) => t.const_zero().into(),
            BasicTypeEnum::ScalableVectorType(t) => t.const_zero().into(),
        }
    }

    fn declare_functions(&mut self, ast: &Ast, lctx: &LbcContext, sema: &SemaResult, decls: &[NodeId]) -> Result<()> {
        for &id in decls {
            let NodeKind::FunctionDecl { .. } = ast.kind(id) else { continue };
            let sym = *sema.node_symbols.get(&id).expect("typed in the function pass");
            let fn_ty_id = *sema.node_types.get(&id).expect("typed in the function pass");
            let fn_ty = self.type_mapper.function_type(&sema.types, fn_ty_id)?;
            let (linkage, name) = self.linkage_and_name(lctx, sema, sym);
            let function = self.module.add_function(&name, fn_ty, Some(linkage));
            self.functions.insert(sym, function);
        }
        Ok(())
    }

    /// `spec.md` §4.6: "Externally-linked symbols use alias name; internal
    /// symbols use the unique symbol name; linkage is derived from the
    /// symbol's external flag."
    fn linkage_and_name(&self, lctx: &LbcContext, sema: &SemaResult, sym: SymbolId) -> (Linkage, String) {
        let symbol = sema.symtab.symbol(sym);
        if symbol.flags.external_linkage {
            (Linkage::External, lctx.resolve(symbol.alias).to_string())
        } else {
            (Linkage::Internal, lctx.resolve(symbol.name).to_string())
        }
    }

    fn lower_function(&mut self, ast: &Ast, lctx: &LbcContext, sema: &SemaResult, decl_id: NodeId) -> Result<()> {
        let NodeKind::FunctionDecl { params, ret, body, .. } = ast.kind(decl_id).clone() else {
            return Err(CodeGenError::LlvmOperationFailed("lower_function on a non-FunctionDecl".into()));
        };
        let body = body.expect("caller only invokes this for defined functions");
        let sym = *sema.node_symbols.get(&decl_id).unwrap();
        let function = *self.functions.get(&sym).ok_or_else(|| {
            CodeGenError::FunctionNotFound(lctx.resolve(sema.symtab.symbol(sym).name).to_string())
        })?;

        self.locals.clear();
        self.current_function = Some(function);
        self.current_return_type =
            Some(ret.map(|r| *sema.node_types.get(&r).unwrap_or(&sema.types.void)).unwrap_or(sema.types.void));

        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        for (i, &param_id) in params.iter().enumerate() {
            let NodeKind::Param { name, .. } = ast.kind(param_id).clone() else { continue };
            let psym = *sema.node_symbols.get(&param_id).expect("typed in the body pass");
            let pty = *sema.node_types.get(&param_id).expect("typed in the body pass");
            let basic_ty = self.type_mapper.basic(&sema.types, pty)?;
            let alloca = self.build_alloca(basic_ty, lctx.resolve(name))?;
            let arg = function
                .get_nth_param(i as u32)
                .ok_or_else(|| CodeGenError::LlvmOperationFailed("missing parameter value".into()))?;
            self.builder
                .build_store(alloca, arg)
                .map_err(|e| CodeGenError::LlvmOperationFailed(format!("store param: {e}")))?;
            self.locals.insert(psym, Local { ptr: alloca, pointee: basic_ty });
        }

        for &stmt in &body {
            self.lower_stmt(ast, lctx, sema, stmt)?;
        }

        if self.builder.get_insert_block().and_then(|b| b.get_terminator()).is_none() {
            self.build_default_return(sema)?;
        }

        self.current_function = None;
        self.current_return_type = None;
        Ok(())
    }

    fn build_default_return(&mut self, sema: &SemaResult) -> Result<()> {
        let ret_ty = self.current_return_type.unwrap_or(sema.types.void);
        if ret_ty == sema.types.void {
            self.builder.build_return(None)
        } else {
            let basic = self.type_mapper.basic(&sema.types, ret_ty)?;
            let zero = self.zero_of(basic);
            self.builder.build_return(Some(&zero))
        }
        .map_err(|e| CodeGenError::LlvmOperationFailed(format!("default return: {e}")))?;
        Ok(())
    }

    fn build_alloca(&self, ty: BasicTypeEnum<'ctx>, name: &str) -> Result<PointerValue<'ctx>> {
        self.builder
            .build_alloca(ty, name)
            .map_err(|e| CodeGenError::LlvmOperationFailed(format!("alloca: {e}")))
    }

    // -- statements -----------------------------------------------------

    fn lower_stmt(&mut self, ast: &Ast, lctx: &LbcContext, sema: &SemaResult, id: NodeId) -> Result<()> {
        match ast.kind(id).clone() {
            NodeKind::ExprStatement { expr } => {
                self.lower_expr(ast, lctx, sema, expr)?;
                Ok(())
            }
            NodeKind::Assignment { target, value } => {
                let dest = self.lower_expr(ast, lctx, sema, target)?.address()?;
                let val = self.lower_expr(ast, lctx, sema, value)?.load(&self.builder)?;
                self.builder
                    .build_store(dest, val)
                    .map_err(|e| CodeGenError::LlvmOperationFailed(format!("store: {e}")))?;
                Ok(())
            }
            NodeKind::Return { value } => {
                match value {
                    Some(v) => {
                        let val = self.lower_expr(ast, lctx, sema, v)?.load(&self.builder)?;
                        self.builder.build_return(Some(&val))
                    }
                    None => self.builder.build_return(None),
                }
                .map_err(|e| CodeGenError::LlvmOperationFailed(format!("return: {e}")))?;
                Ok(())
            }
            NodeKind::VarDecl { name, ty: _, init, .. } => {
                let sym = *sema.node_symbols.get(&id).expect("typed in the body pass");
                let var_ty = *sema.node_types.get(&id).expect("typed in the body pass");
                let basic_ty = self.type_mapper.basic(&sema.types, var_ty)?;
                let alloca = self.build_alloca(basic_ty, lctx.resolve(name))?;
                let value = match init {
                    Some(init) => self.lower_expr(ast, lctx, sema, init)?.load(&self.builder)?,
                    None => self.zero_of(basic_ty),
                };
                self.builder
                    .build_store(alloca, value)
                    .map_err(|e| CodeGenError::LlvmOperationFailed(format!("store init: {e}")))?;
                self.locals.insert(sym, Local { ptr: alloca, pointee: basic_ty });
                Ok(())
            }
            NodeKind::If { branches, else_body } => self.lower_if(ast, lctx, sema, branches, else_body),
            NodeKind::For { var, start, end, step, body } => {
                self.lower_for(ast, lctx, sema, id, var, start, end, step, body)
            }
            NodeKind::DoLoop { kind, condition, body } => self.lower_do_loop(ast, lctx, sema, kind, condition, body),
            NodeKind::Exit { target } => self.lower_branch_to(&target, false),
            NodeKind::Continue { target } => self.lower_branch_to(&target, true),
            other => Err(CodeGenError::LlvmOperationFailed(format!("not a lowerable statement: {other:?}"))),
        }
    }

    /// `target`, read top-down (innermost frame first), resolves against
    /// the innermost `target.len()` entries of `loop_stack` (`spec.md` §4.5
    /// "control-flow branch": "a sequence of `{For, Do}` tokens resolving
    /// to a target frame from the top down"). The parser already rejected
    /// any target that can't resolve against the loops open at parse time,
    /// so a lookup failure here would mean the two disagree.
    fn lower_branch_to(&mut self, target: &[LoopKind], continue_edge: bool) -> Result<()> {
        let depth = self.loop_stack.len();
        if target.len() > depth || !target.iter().enumerate().all(|(i, kind)| self.loop_stack[depth - 1 - i].0 == *kind)
        {
            return Err(CodeGenError::LlvmOperationFailed("EXIT/CONTINUE with no enclosing loop".into()));
        }
        let frame = &self.loop_stack[depth - target.len()];
        let block = if continue_edge { frame.1 } else { frame.2 };
        self.builder
            .build_unconditional_branch(block)
            .map_err(|e| CodeGenError::LlvmOperationFailed(format!("branch: {e}")))?;
        Ok(())
    }

    fn lower_if(
        &mut self,
        ast: &Ast,
        lctx: &LbcContext,
        sema: &SemaResult,
        branches: Vec<lbc_ast::IfBranch>,
        else_body: Vec<NodeId>,
    ) -> Result<()> {
        let function = self.current_function.unwrap();
        let merge_block = self.context.append_basic_block(function, "if.end");

        for branch in branches {
            for decl in &branch.decls {
                self.lower_stmt(ast, lctx, sema, *decl)?;
            }
            let cond = self.lower_expr(ast, lctx, sema, branch.condition)?.load(&self.builder)?.into_int_value();
            let then_block = self.context.append_basic_block(function, "if.then");
            let next_block = self.context.append_basic_block(function, "if.next");
            self.builder
                .build_conditional_branch(cond, then_block, next_block)
                .map_err(|e| CodeGenError::LlvmOperationFailed(format!("cond branch: {e}")))?;

            self.builder.position_at_end(then_block);
            for stmt in branch.body {
                self.lower_stmt(ast, lctx, sema, stmt)?;
            }
            if self.builder.get_insert_block().and_then(|b| b.get_terminator()).is_none() {
                self.builder
                    .build_unconditional_branch(merge_block)
                    .map_err(|e| CodeGenError::LlvmOperationFailed(format!("branch: {e}")))?;
            }
            self.builder.position_at_end(next_block);
        }

        for stmt in else_body {
            self.lower_stmt(ast, lctx, sema, stmt)?;
        }
        if self.builder.get_insert_block().and_then(|b| b.get_terminator()).is_none() {
            self.builder
                .build_unconditional_branch(merge_block)
                .map_err(|e| CodeGenError::LlvmOperationFailed(format!("branch: {e}")))?;
        }
        self.builder.position_at_end(merge_block);
        Ok(())
    }

    /// `spec.md` §4.6: lowers per the analyzer-determined direction rather
    /// than re-deriving it - `Increment`/`Decrement` pick a fixed
    /// comparison, `Unknown` selects between the two at runtime with
    /// `build_select`, and `Skip` emits nothing at all.
    #[allow(clippy::too_many_arguments)]
    fn lower_for(
        &mut self,
        ast: &Ast,
        lctx: &LbcContext,
        sema: &SemaResult,
        id: NodeId,
        var: NodeId,
        start: NodeId,
        end: NodeId,
        step: Option<NodeId>,
        body: Vec<NodeId>,
    ) -> Result<()> {
        let direction = *sema.for_directions.get(&id).unwrap_or(&ForDirection::Unknown);
        if direction == ForDirection::Skip {
            return Ok(());
        }

        let function = self.current_function.unwrap();
        let loop_ty = *sema.node_types.get(&var).expect("typed in the body pass");
        let basic_ty = self.type_mapper.basic(&sema.types, loop_ty)?;
        let signed = matches!(sema.types.kind(loop_ty), TypeKind::Integral { signed: true, .. });

        let NodeKind::Identifier { name } = ast.kind(var).clone() else {
            return Err(CodeGenError::LlvmOperationFailed("FOR loop variable is not an Identifier".into()));
        };
        let var_sym = *sema.node_symbols.get(&var).expect("declared in the body pass");
        let var_ptr = self.build_alloca(basic_ty, lctx.resolve(name))?;
        self.locals.insert(var_sym, Local { ptr: var_ptr, pointee: basic_ty });

        let start_val = self.lower_expr(ast, lctx, sema, start)?.load(&self.builder)?.into_int_value();
        let end_val = self.lower_expr(ast, lctx, sema, end)?.load(&self.builder)?.into_int_value();
        let step_val = match step {
            Some(step) => self.lower_expr(ast, lctx, sema, step)?.load(&self.builder)?.into_int_value(),
            None => basic_ty.into_int_type().const_int(1, signed),
        };
        self.builder
            .build_store(var_ptr, start_val)
            .map_err(|e| CodeGenError::LlvmOperationFailed(format!("store: {e}")))?;

        let going_down = if direction == ForDirection::Unknown {
            Some(
                self.builder
                    .build_int_compare(IntPredicate::SLT, end_val, start_val, "for.dir")
                    .map_err(|e| CodeGenError::LlvmOperationFailed(format!("icmp: {e}")))?,
            )
        } else {
            None
        };

        let cond_block = self.context.append_basic_block(function, "for.cond");
        let body_block = self.context.append_basic_block(function, "for.body");
        let step_block = self.context.append_basic_block(function, "for.step");
        let exit_block = self.context.append_basic_block(function, "for.end");
        self.builder
            .build_unconditional_branch(cond_block)
            .map_err(|e| CodeGenError::LlvmOperationFailed(format!("branch: {e}")))?;

        self.builder.position_at_end(cond_block);
        let cur = self
            .builder
            .build_load(basic_ty, var_ptr, "for.cur")
            .map_err(|e| CodeGenError::LlvmOperationFailed(format!("load: {e}")))?
            .into_int_value();
        let ascending_pred = if signed { IntPredicate::SLE } else { IntPredicate::ULE };
        let descending_pred = if signed { IntPredicate::SGE } else { IntPredicate::UGE };
        let cond = match direction {
            ForDirection::Increment => self
                .builder
                .build_int_compare(ascending_pred, cur, end_val, "for.test")
                .map_err(|e| CodeGenError::LlvmOperationFailed(format!("icmp: {e}")))?,
            ForDirection::Decrement => self
                .builder
                .build_int_compare(descending_pred, cur, end_val, "for.test")
                .map_err(|e| CodeGenError::LlvmOperationFailed(format!("icmp: {e}")))?,
            ForDirection::Unknown => {
                let asc = self
                    .builder
                    .build_int_compare(ascending_pred, cur, end_val, "for.test.asc")
                    .map_err(|e| CodeGenError::LlvmOperationFailed(format!("icmp: {e}")))?;
                let desc = self
                    .builder
                    .build_int_compare(descending_pred, cur, end_val, "for.test.desc")
                    .map_err(|e| CodeGenError::LlvmOperationFailed(format!("icmp: {e}")))?;
                self.builder
                    .build_select(going_down.unwrap(), desc, asc, "for.test")
                    .map_err(|e| CodeGenError::LlvmOperationFailed(format!("select: {e}")))?
                    .into_int_value()
            }
            ForDirection::Skip => unreachable!("handled above"),
        };
        self.builder
            .build_conditional_branch(cond, body_block, exit_block)
            .map_err(|e| CodeGenError::LlvmOperationFailed(format!("cond branch: {e}")))?;

        self.builder.position_at_end(body_block);
        self.loop_stack.push((LoopKind::For, step_block, exit_block));
        for stmt in body {
            self.lower_stmt(ast, lctx, sema, stmt)?;
        }
        self.loop_stack.pop();
        if self.builder.get_insert_block().and_then(|b| b.get_terminator()).is_none() {
            self.builder
                .build_unconditional_branch(step_block)
                .map_err(|e| CodeGenError::LlvmOperationFailed(format!("branch: {e}")))?;
        }

        self.builder.position_at_end(step_block);
        let cur = self
            .builder
            .build_load(basic_ty, var_ptr, "for.cur")
            .map_err(|e| CodeGenError::LlvmOperationFailed(format!("load: {e}")))?
            .into_int_value();
        let next = self
            .builder
            .build_int_add(cur, step_val, "for.next")
            .map_err(|e| CodeGenError::LlvmOperationFailed(format!("add: {e}")))?;
        self.builder
            .build_store(var_ptr, next)
            .map_err(|e| CodeGenError::LlvmOperationFailed(format!("store: {e}")))?;
        self.builder
            .build_unconditional_branch(cond_block)
            .map_err(|e| CodeGenError::LlvmOperationFailed(format!("branch: {e}")))?;

        self.builder.position_at_end(exit_block);
        Ok(())
    }

    fn lower_do_loop(
        &mut self,
        ast: &Ast,
        lctx: &LbcContext,
        sema: &SemaResult,
        kind: DoLoopKind,
        condition: Option<NodeId>,
        body: Vec<NodeId>,
    ) -> Result<()> {
        let function = self.current_function.unwrap();
        let cond_block = self.context.append_basic_block(function, "do.cond");
        let body_block = self.context.append_basic_block(function, "do.body");
        let exit_block = self.context.append_basic_block(function, "do.end");

        let pre_tested = matches!(kind, DoLoopKind::PreWhile | DoLoopKind::PreUntil);
        let negate = matches!(kind, DoLoopKind::PreUntil | DoLoopKind::PostUntil);

        let entry_block = if pre_tested { cond_block } else { body_block };
        self.builder
            .build_unconditional_branch(entry_block)
            .map_err(|e| CodeGenError::LlvmOperationFailed(format!("branch: {e}")))?;

        self.builder.position_at_end(cond_block);
        match condition {
            Some(condition) => {
                let mut cond =
                    self.lower_expr(ast, lctx, sema, condition)?.load(&self.builder)?.into_int_value();
                if negate {
                    cond = self
                        .builder
                        .build_not(cond, "do.negate")
                        .map_err(|e| CodeGenError::LlvmOperationFailed(format!("not: {e}")))?;
                }
                self.builder
                    .build_conditional_branch(cond, body_block, exit_block)
                    .map_err(|e| CodeGenError::LlvmOperationFailed(format!("cond branch: {e}")))?;
            }
            None => {
                self.builder
                    .build_unconditional_branch(body_block)
                    .map_err(|e| CodeGenError::LlvmOperationFailed(format!("branch: {e}")))?;
            }
        }

        self.builder.position_at_end(body_block);
        self.loop_stack.push((LoopKind::Do, cond_block, exit_block));
        for stmt in body {
            self.lower_stmt(ast, lctx, sema, stmt)?;
        }
        self.loop_stack.pop();
        if self.builder.get_insert_block().and_then(|b| b.get_terminator()).is_none() {
            self.builder
                .build_unconditional_branch(cond_block)
                .map_err(|e| CodeGenError::LlvmOperationFailed(format!("branch: {e}")))?;
        }

        self.builder.position_at_end(exit_block);
        Ok(())
    }

    // -- expressions ------------------------------------------------------

    fn lower_expr(&mut self, ast: &Ast, lctx: &LbcContext, sema: &SemaResult, id: NodeId) -> Result<ValueHandle<'ctx>> {
        match ast.kind(id).clone() {
            NodeKind::Identifier { .. } => {
                let sym = *sema
                    .node_symbols
                    .get(&id)
                    .ok_or_else(|| CodeGenError::ValueNotFound("unresolved identifier reached codegen".into()))?;
                if let Some(local) = self.locals.get(&sym) {
                    return Ok(ValueHandle::Address { ptr: local.ptr, pointee: local.pointee });
                }
                if let Some(global) = self.globals.get(&sym) {
                    return Ok(ValueHandle::Address {
                        ptr: global.global.as_pointer_value(),
                        pointee: global.pointee,
                    });
                }
                Err(CodeGenError::ValueNotFound(lctx.resolve(sema.symtab.symbol(sym).name).to_string()))
            }
            NodeKind::Literal { value } => {
                let ty = *sema.node_types.get(&id).unwrap_or(&sema.types.i32);
                if let LiteralValue::Str(sym) = value {
                    let text = lctx.resolve(sym).to_string();
                    let ptr = self
                        .builder
                        .build_global_string_ptr(&text, "str")
                        .map_err(|e| CodeGenError::LlvmOperationFailed(format!("string literal: {e}")))?;
                    return Ok(ValueHandle::Value(ptr.as_pointer_value().into()));
                }
                Ok(ValueHandle::Value(self.literal_value(sema, value, ty)?))
            }
            NodeKind::Unary { op, operand } => self.lower_unary(ast, lctx, sema, op, operand),
            NodeKind::Binary { op, lhs, rhs } => self.lower_binary(ast, lctx, sema, id, op, lhs, rhs),
            NodeKind::Call { callee, args } => self.lower_call(ast, lctx, sema, callee, args),
            NodeKind::Cast { expr, .. } => self.lower_cast(ast, lctx, sema, id, expr),
            NodeKind::IfExpr { condition, then_value, else_value } => {
                self.lower_if_expr(ast, lctx, sema, id, condition, then_value, else_value)
            }
            NodeKind::AddressOf { expr } => {
                let ptr = self.lower_expr(ast, lctx, sema, expr)?.address()?;
                Ok(ValueHandle::Value(ptr.into()))
            }
            NodeKind::Dereference { expr } => {
                let ptr = self.lower_expr(ast, lctx, sema, expr)?.load(&self.builder)?.into_pointer_value();
                let pointee_ty = *sema.node_types.get(&id).expect("typed in the body pass");
                let basic = self.type_mapper.basic(&sema.types, pointee_ty)?;
                Ok(ValueHandle::Address { ptr, pointee: basic })
            }
            NodeKind::MemberAccess { base, .. } => self.lower_member_access(ast, lctx, sema, id, base),
            other => Err(CodeGenError::LlvmOperationFailed(format!("not a lowerable expression: {other:?}"))),
        }
    }

    /// Lowers a non-string literal to its target-typed LLVM constant. The
    /// target type comes from the analyzer's `node_types` entry for the
    /// literal (already folded/coerced by the body pass), not from the
    /// payload itself - a bare `Integer(5)` can back an `I8`, a `U64`, or
    /// anything in between depending on context.
    fn literal_value(&mut self, sema: &SemaResult, value: LiteralValue, ty: TypeId) -> Result<BasicValueEnum<'ctx>> {
        let basic_ty = self.type_mapper.basic(&sema.types, ty)?;
        Ok(match value {
            LiteralValue::Integer(v) => basic_ty.into_int_type().const_int(v, false).into(),
            LiteralValue::Float(v) => basic_ty.into_float_type().const_float(v).into(),
            LiteralValue::Bool(b) => self.context.bool_type().const_int(b as u64, false).into(),
            LiteralValue::Null => basic_ty.into_pointer_type().const_null().into(),
            LiteralValue::Str(_) => {
                return Err(CodeGenError::LlvmOperationFailed(
                    "string literals need a positioned builder; call sites must special-case them".into(),
                ))
            }
        })
    }

    fn lower_unary(
        &mut self,
        ast: &Ast,
        lctx: &LbcContext,
        sema: &SemaResult,
        op: UnaryOp,
        operand: NodeId,
    ) -> Result<ValueHandle<'ctx>> {
        let val = self.lower_expr(ast, lctx, sema, operand)?.load(&self.builder)?;
        let ty = *sema.node_types.get(&operand).unwrap_or(&sema.types.i32);
        let is_float = sema.types.is_floating_point(ty);
        let result = match (op, is_float) {
            (UnaryOp::Neg, true) => self
                .builder
                .build_float_neg(val.into_float_value(), "neg")
                .map_err(|e| CodeGenError::LlvmOperationFailed(format!("fneg: {e}")))?
                .into(),
            (UnaryOp::Neg, false) => self
                .builder
                .build_int_neg(val.into_int_value(), "neg")
                .map_err(|e| CodeGenError::LlvmOperationFailed(format!("neg: {e}")))?
                .into(),
            (UnaryOp::Not, _) | (UnaryOp::BitNot, _) => self
                .builder
                .build_not(val.into_int_value(), "not")
                .map_err(|e| CodeGenError::LlvmOperationFailed(format!("not: {e}")))?
                .into(),
        };
        Ok(ValueHandle::Value(result))
    }

    /// `AND`/`OR` always lower to a short-circuit `cond -> phi` CFG
    /// (`spec.md` §4.5: "logical -> Boolean"); every other binary operator
    /// evaluates both sides eagerly.
    fn lower_binary(
        &mut self,
        ast: &Ast,
        lctx: &LbcContext,
        sema: &SemaResult,
        id: NodeId,
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    ) -> Result<ValueHandle<'ctx>> {
        if binary_info(op).semantic == SemanticKind::Logical {
            return self.lower_logical(ast, lctx, sema, op, lhs, rhs);
        }

        let lhs_val = self.lower_expr(ast, lctx, sema, lhs)?.load(&self.builder)?;
        let rhs_val = self.lower_expr(ast, lctx, sema, rhs)?.load(&self.builder)?;
        let operand_ty = *sema.node_types.get(&lhs).unwrap_or(&sema.types.i32);
        let is_float = sema.types.is_floating_point(operand_ty);
        let signed = matches!(sema.types.kind(operand_ty), TypeKind::Integral { signed: true, .. });

        let value = if is_float {
            self.lower_float_binary(op, lhs_val.into_float_value(), rhs_val.into_float_value())?
        } else {
            self.lower_int_binary(op, lhs_val.into_int_value(), rhs_val.into_int_value(), signed)?
        };
        let _ = id;
        Ok(ValueHandle::Value(value))
    }

    fn lower_logical(
        &mut self,
        ast: &Ast,
        lctx: &LbcContext,
        sema: &SemaResult,
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    ) -> Result<ValueHandle<'ctx>> {
        let function = self.current_function.unwrap();
        let lhs_val = self.lower_expr(ast, lctx, sema, lhs)?.load(&self.builder)?.into_int_value();
        let lhs_block = self.builder.get_insert_block().unwrap();

        let rhs_block = self.context.append_basic_block(function, "logical.rhs");
        let merge_block = self.context.append_basic_block(function, "logical.end");

        match op {
            BinaryOp::AndAlso => self.builder.build_conditional_branch(lhs_val, rhs_block, merge_block),
            BinaryOp::OrElse => self.builder.build_conditional_branch(lhs_val, merge_block, rhs_block),
            _ => unreachable!("only AND/OR are classified Logical"),
        }
        .map_err(|e| CodeGenError::LlvmOperationFailed(format!("cond branch: {e}")))?;

        self.builder.position_at_end(rhs_block);
        let rhs_val = self.lower_expr(ast, lctx, sema, rhs)?.load(&self.builder)?.into_int_value();
        let rhs_end_block = self.builder.get_insert_block().unwrap();
        self.builder
            .build_unconditional_branch(merge_block)
            .map_err(|e| CodeGenError::LlvmOperationFailed(format!("branch: {e}")))?;

        self.builder.position_at_end(merge_block);
        let phi = self
            .builder
            .build_phi(self.context.bool_type(), "logical")
            .map_err(|e| CodeGenError::LlvmOperationFailed(format!("phi: {e}")))?;
        phi.add_incoming(&[(&lhs_val, lhs_block), (&rhs_val, rhs_end_block)]);
        Ok(ValueHandle::Value(phi.as_basic_value()))
    }

    fn lower_int_binary(
        &self,
        op: BinaryOp,
        lhs: inkwell::values::IntValue<'ctx>,
        rhs: inkwell::values::IntValue<'ctx>,
        signed: bool,
    ) -> Result<BasicValueEnum<'ctx>> {
        let b = &self.builder;
        let err = |what: &str| move |e: inkwell::builder::BuilderError| {
            CodeGenError::LlvmOperationFailed(format!("{what}: {e}"))
        };
        Ok(match op {
            BinaryOp::Add => b.build_int_add(lhs, rhs, "add").map_err(err("add"))?.into(),
            BinaryOp::Sub => b.build_int_sub(lhs, rhs, "sub").map_err(err("sub"))?.into(),
            BinaryOp::Mul => b.build_int_mul(lhs, rhs, "mul").map_err(err("mul"))?.into(),
            BinaryOp::Div if signed => b.build_int_signed_div(lhs, rhs, "div").map_err(err("sdiv"))?.into(),
            BinaryOp::Div => b.build_int_unsigned_div(lhs, rhs, "div").map_err(err("udiv"))?.into(),
            BinaryOp::Mod if signed => b.build_int_signed_rem(lhs, rhs, "mod").map_err(err("srem"))?.into(),
            BinaryOp::Mod => b.build_int_unsigned_rem(lhs, rhs, "mod").map_err(err("urem"))?.into(),
            BinaryOp::Pow => {
                return Err(CodeGenError::TypeMappingError("integral '^' requires a floating-point cast first".into()))
            }
            BinaryOp::Eq => b.build_int_compare(IntPredicate::EQ, lhs, rhs, "eq").map_err(err("icmp"))?.into(),
            BinaryOp::Ne => b.build_int_compare(IntPredicate::NE, lhs, rhs, "ne").map_err(err("icmp"))?.into(),
            BinaryOp::Lt => {
                let p = if signed { IntPredicate::SLT } else { IntPredicate::ULT };
                b.build_int_compare(p, lhs, rhs, "lt").map_err(err("icmp"))?.into()
            }
            BinaryOp::Le => {
                let p = if signed { IntPredicate::SLE } else { IntPredicate::ULE };
                b.build_int_compare(p, lhs, rhs, "le").map_err(err("icmp"))?.into()
            }
            BinaryOp::Gt => {
                let p = if signed { IntPredicate::SGT } else { IntPredicate::UGT };
                b.build_int_compare(p, lhs, rhs, "gt").map_err(err("icmp"))?.into()
            }
            BinaryOp::Ge => {
                let p = if signed { IntPredicate::SGE } else { IntPredicate::UGE };
                b.build_int_compare(p, lhs, rhs, "ge").map_err(err("icmp"))?.into()
            }
            BinaryOp::AndAlso | BinaryOp::OrElse => unreachable!("handled by lower_logical"),
        })
    }

    fn lower_float_binary(
        &self,
        op: BinaryOp,
        lhs: inkwell::values::FloatValue<'ctx>,
        rhs: inkwell::values::FloatValue<'ctx>,
    ) -> Result<BasicValueEnum<'ctx>> {
        let b = &self.builder;
        let err = |what: &str| move |e: inkwell::builder::BuilderError| {
            CodeGenError::LlvmOperationFailed(format!("{what}: {e}"))
        };
        Ok(match op {
            BinaryOp::Add => b.build_float_add(lhs, rhs, "fadd").map_err(err("fadd"))?.into(),
            BinaryOp::Sub => b.build_float_sub(lhs, rhs, "fsub").map_err(err("fsub"))?.into(),
            BinaryOp::Mul => b.build_float_mul(lhs, rhs, "fmul").map_err(err("fmul"))?.into(),
            BinaryOp::Div => b.build_float_div(lhs, rhs, "fdiv").map_err(err("fdiv"))?.into(),
            BinaryOp::Mod => b.build_float_rem(lhs, rhs, "frem").map_err(err("frem"))?.into(),
            BinaryOp::Pow => {
                let pow = self.declare_runtime_pow();
                b.build_call(pow, &[lhs.into(), rhs.into()], "pow")
                    .map_err(err("call"))?
                    .try_as_basic_value()
                    .left()
                    .ok_or_else(|| CodeGenError::LlvmOperationFailed("pow returned void".into()))?
            }
            BinaryOp::Eq => b.build_float_compare(FloatPredicate::OEQ, lhs, rhs, "feq").map_err(err("fcmp"))?.into(),
            BinaryOp::Ne => b.build_float_compare(FloatPredicate::ONE, lhs, rhs, "fne").map_err(err("fcmp"))?.into(),
            BinaryOp::Lt => b.build_float_compare(FloatPredicate::OLT, lhs, rhs, "flt").map_err(err("fcmp"))?.into(),
            BinaryOp::Le => b.build_float_compare(FloatPredicate::OLE, lhs, rhs, "fle").map_err(err("fcmp"))?.into(),
            BinaryOp::Gt => b.build_float_compare(FloatPredicate::OGT, lhs, rhs, "fgt").map_err(err("fcmp"))?.into(),
            BinaryOp::Ge => b.build_float_compare(FloatPredicate::OGE, lhs, rhs, "fge").map_err(err("fcmp"))?.into(),
            BinaryOp::AndAlso | BinaryOp::OrElse => {
                return Err(CodeGenError::TypeMappingError(format!("{op:?} is not defined over floats")))
            }
        })
    }

    /// `POW` has no direct LLVM instruction; the libm `pow` entry point is
    /// declared lazily the first time a `^` over floats is lowered.
    fn declare_runtime_pow(&mut self) -> FunctionValue<'ctx> {
        if let Some(f) = self.module.get_function("pow") {
            return f;
        }
        let f64_ty = self.context.f64_type();
        let fn_ty = f64_ty.fn_type(&[f64_ty.into(), f64_ty.into()], false);
        self.module.add_function("pow", fn_ty, Some(Linkage::External))
    }

    fn lower_call(
        &mut self,
        ast: &Ast,
        lctx: &LbcContext,
        sema: &SemaResult,
        callee: NodeId,
        args: Vec<NodeId>,
    ) -> Result<ValueHandle<'ctx>> {
        let NodeKind::Identifier { .. } = ast.kind(callee) else {
            return Err(CodeGenError::LlvmOperationFailed("indirect calls are not supported".into()));
        };
        let sym = *sema
            .node_symbols
            .get(&callee)
            .ok_or_else(|| CodeGenError::ValueNotFound("unresolved call target".into()))?;
        let function = *self
            .functions
            .get(&sym)
            .ok_or_else(|| CodeGenError::FunctionNotFound(lctx.resolve(sema.symtab.symbol(sym).name).to_string()))?;

        let mut arg_vals: Vec<BasicMetadataValueEnum> = Vec::with_capacity(args.len());
        for &arg in &args {
            let val = self.lower_expr(ast, lctx, sema, arg)?.load(&self.builder)?;
            arg_vals.push(val.into());
        }
        let call = self
            .builder
            .build_call(function, &arg_vals, "call")
            .map_err(|e| CodeGenError::LlvmOperationFailed(format!("call: {e}")))?;
        match call.try_as_basic_value().left() {
            Some(v) => Ok(ValueHandle::Value(v)),
            // A void-returning call only ever appears as an `ExprStatement`,
            // whose result is discarded, so a throwaway `i1 false` never
            // actually gets read.
            None => Ok(ValueHandle::Value(self.context.bool_type().const_zero().into())),
        }
    }

    fn lower_cast(
        &mut self,
        ast: &Ast,
        lctx: &LbcContext,
        sema: &SemaResult,
        id: NodeId,
        expr: NodeId,
    ) -> Result<ValueHandle<'ctx>> {
        let from_ty = *sema.node_types.get(&expr).unwrap_or(&sema.types.i32);
        let to_ty = *sema.node_types.get(&id).unwrap_or(&from_ty);
        let val = self.lower_expr(ast, lctx, sema, expr)?.load(&self.builder)?;
        if from_ty == to_ty {
            return Ok(ValueHandle::Value(val));
        }
        let target = self.type_mapper.basic(&sema.types, to_ty)?;
        let err = |what: &str| move |e: inkwell::builder::BuilderError| {
            CodeGenError::LlvmOperationFailed(format!("{what}: {e}"))
        };

        let result = match (sema.types.kind(from_ty).clone(), sema.types.kind(to_ty).clone()) {
            (TypeKind::Integral { .. }, TypeKind::Integral { signed: to_signed, .. }) => {
                let iv = val.into_int_value();
                let target_int = target.into_int_type();
                if target_int.get_bit_width() > iv.get_type().get_bit_width() {
                    if to_signed {
                        self.builder.build_int_s_extend(iv, target_int, "sext").map_err(err("sext"))?.into()
                    } else {
                        self.builder.build_int_z_extend(iv, target_int, "zext").map_err(err("zext"))?.into()
                    }
                } else if target_int.get_bit_width() < iv.get_type().get_bit_width() {
                    self.builder.build_int_truncate(iv, target_int, "trunc").map_err(err("trunc"))?.into()
                } else {
                    iv.into()
                }
            }
            (TypeKind::Integral { signed, .. }, TypeKind::FloatingPoint { .. }) => {
                let iv = val.into_int_value();
                let target_float = target.into_float_type();
                if signed {
                    self.builder.build_signed_int_to_float(iv, target_float, "sitofp").map_err(err("sitofp"))?.into()
                } else {
                    self.builder
                        .build_unsigned_int_to_float(iv, target_float, "uitofp")
                        .map_err(err("uitofp"))?
                        .into()
                }
            }
            (TypeKind::FloatingPoint { .. }, TypeKind::Integral { signed, .. }) => {
                let fv = val.into_float_value();
                let target_int = target.into_int_type();
                if signed {
                    self.builder.build_float_to_signed_int(fv, target_int, "fptosi").map_err(err("fptosi"))?.into()
                } else {
                    self.builder
                        .build_float_to_unsigned_int(fv, target_int, "fptoui")
                        .map_err(err("fptoui"))?
                        .into()
                }
            }
            (TypeKind::FloatingPoint { .. }, TypeKind::FloatingPoint { .. }) => {
                let fv = val.into_float_value();
                let target_float = target.into_float_type();
                if target_float.size_of().get_zero_extended_constant().unwrap_or(0)
                    > fv.get_type().size_of().get_zero_extended_constant().unwrap_or(0)
                {
                    self.builder.build_float_ext(fv, target_float, "fpext").map_err(err("fpext"))?.into()
                } else {
                    self.builder.build_float_trunc(fv, target_float, "fptrunc").map_err(err("fptrunc"))?.into()
                }
            }
            // ANY/PTR/ZSTRING/NULL all share the same opaque-pointer
            // representation - no instruction is needed to convert
            // between them.
            (
                TypeKind::Pointer(_) | TypeKind::Any | TypeKind::ZString | TypeKind::Null,
                TypeKind::Pointer(_) | TypeKind::Any | TypeKind::ZString | TypeKind::Null,
            ) => val,
            (from, to) => {
                return Err(CodeGenError::TypeMappingError(format!("no lowering for cast {from:?} -> {to:?}")))
            }
        };
        let _ = lctx;
        Ok(ValueHandle::Value(result))
    }

    fn lower_if_expr(
        &mut self,
        ast: &Ast,
        lctx: &LbcContext,
        sema: &SemaResult,
        id: NodeId,
        condition: NodeId,
        then_value: NodeId,
        else_value: NodeId,
    ) -> Result<ValueHandle<'ctx>> {
        let function = self.current_function.unwrap();
        let cond = self.lower_expr(ast, lctx, sema, condition)?.load(&self.builder)?.into_int_value();

        let then_block = self.context.append_basic_block(function, "iif.then");
        let else_block = self.context.append_basic_block(function, "iif.else");
        let merge_block = self.context.append_basic_block(function, "iif.end");
        self.builder
            .build_conditional_branch(cond, then_block, else_block)
            .map_err(|e| CodeGenError::LlvmOperationFailed(format!("cond branch: {e}")))?;

        self.builder.position_at_end(then_block);
        let then_val = self.lower_expr(ast, lctx, sema, then_value)?.load(&self.builder)?;
        let then_end = self.builder.get_insert_block().unwrap();
        self.builder
            .build_unconditional_branch(merge_block)
            .map_err(|e| CodeGenError::LlvmOperationFailed(format!("branch: {e}")))?;

        self.builder.position_at_end(else_block);
        let else_val = self.lower_expr(ast, lctx, sema, else_value)?.load(&self.builder)?;
        let else_end = self.builder.get_insert_block().unwrap();
        self.builder
            .build_unconditional_branch(merge_block)
            .map_err(|e| CodeGenError::LlvmOperationFailed(format!("branch: {e}")))?;

        self.builder.position_at_end(merge_block);
        let ty = *sema.node_types.get(&id).unwrap_or(&sema.types.i32);
        let basic_ty = self.type_mapper.basic(&sema.types, ty)?;
        let phi = self
            .builder
            .build_phi(basic_ty, "iif")
            .map_err(|e| CodeGenError::LlvmOperationFailed(format!("phi: {e}")))?;
        phi.add_incoming(&[(&then_val, then_end), (&else_val, else_end)]);
        Ok(ValueHandle::Value(phi.as_basic_value()))
    }

    fn lower_member_access(
        &mut self,
        ast: &Ast,
        lctx: &LbcContext,
        sema: &SemaResult,
        id: NodeId,
        base: NodeId,
    ) -> Result<ValueHandle<'ctx>> {
        let base_ty = *sema.node_types.get(&base).expect("typed in the body pass");
        let base_handle = self.lower_expr(ast, lctx, sema, base)?;
        let base_ptr = base_handle.address()?;
        let struct_ty = self.type_mapper.basic(&sema.types, base_ty)?.into_struct_type();

        // The analyzer already resolved the member name to a `SymbolId` and
        // stashed it on the `MemberAccess` node itself (see
        // `analyze_member_access`), so lookup here is by id, not by name.
        let member_sym = *sema
            .node_symbols
            .get(&id)
            .ok_or_else(|| CodeGenError::ValueNotFound("unresolved member access".into()))?;
        let member_name = lctx.resolve(sema.symtab.symbol(member_sym).name).to_string();
        let member_info = sema
            .udts
            .find_member(base_ty, member_sym)
            .copied()
            .ok_or_else(|| CodeGenError::ValueNotFound(member_name.clone()))?;
        let gep = self
            .builder
            .build_struct_gep(struct_ty, base_ptr, member_info.index, &member_name)
            .map_err(|e| CodeGenError::LlvmOperationFailed(format!("gep: {e}")))?;
        let member_ty = self.type_mapper.basic(&sema.types, member_info.ty)?;
        Ok(ValueHandle::Address { ptr: gep, pointee: member_ty })
    }

    /// Lowers every deferred global initializer into a synthesized
    /// constructor and registers it in `llvm.global_ctors` so the runtime
    /// loader runs it before `main` (`spec.md` §4.6).
    fn emit_global_constructor(&mut self, ast: &Ast, lctx: &LbcContext, sema: &SemaResult) -> Result<()> {
        if self.deferred_initializers.is_empty() {
            return Ok(());
        }
        let void_fn_ty = self.context.void_type().fn_type(&[], false);
        let ctor = self.module.add_function(".lbc_init", void_fn_ty, Some(Linkage::Internal));
        let entry = self.context.append_basic_block(ctor, "entry");
        self.builder.position_at_end(entry);
        self.current_function = Some(ctor);

        let inits = std::mem::take(&mut self.deferred_initializers);
        for (sym, init) in inits {
            let slot = self.globals.get(&sym).expect("declared in declare_globals");
            let ptr = slot.global.as_pointer_value();
            let val = self.lower_expr(ast, lctx, sema, init)?.load(&self.builder)?;
            self.builder
                .build_store(ptr, val)
                .map_err(|e| CodeGenError::LlvmOperationFailed(format!("store init: {e}")))?;
        }
        self.builder
            .build_return(None)
            .map_err(|e| CodeGenError::LlvmOperationFailed(format!("return: {e}")))?;
        self.current_function = None;

        let i32_ty = self.context.i32_type();
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let entry_ty = self.context.struct_type(&[i32_ty.into(), ptr_ty.into(), ptr_ty.into()], false);
        let entry_val = entry_ty.const_named_struct(&[
            i32_ty.const_int(65, false).into(),
            ctor.as_global_value().as_pointer_value().into(),
            ptr_ty.const_null().into(),
        ]);
        let array_ty = entry_ty.array_type(1);
        let ctors = self.module.add_global(array_ty, None, "llvm.global_ctors");
        ctors.set_linkage(Linkage::Appending);
        ctors.set_initializer(&array_ty.const_array(&[entry_val]));
        Ok(())
    }

    // -- emission --------------------------------------------------------

    pub fn emit_llvm_ir(&self) -> String {
        self.module.print_to_string().to_string()
    }

    pub fn write_ir_to_file(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.emit_llvm_ir())
    }

    pub fn write_object_file(&self, path: &Path) -> Result<()> {
        self.write_via_target_machine(path, FileType::Object)
    }

    pub fn write_asm_file(&self, path: &Path) -> Result<()> {
        self.write_via_target_machine(path, FileType::Assembly)
    }

    fn write_via_target_machine(&self, path: &Path, file_type: FileType) -> Result<()> {
        let triple = TargetTriple::create(&self.target_triple);
        let machine = Self::target_machine(&triple, self.opt_level)
            .ok_or_else(|| CodeGenError::TargetError(self.target_triple.clone()))?;
        machine
            .write_to_file(&self.module, file_type, path)
            .map_err(|e| CodeGenError::OutputError(path.display().to_string(), e.to_string()))
    }
}
