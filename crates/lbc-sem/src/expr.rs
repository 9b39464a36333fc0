//! Expression analysis (`spec.md` §4.5 "Body pass", expression rules).

use crate::analyzer::Analyzer;
use lbc_ast::{BinaryOp, LiteralValue, NodeId, NodeKind, SemanticKind, UnaryOp};
use lbc_types::TypeId;
use lbc_util::{
    SEM_ARG_COUNT_MISMATCH, SEM_INCOMPATIBLE_TYPES, SEM_NOT_A_RECORD, SEM_NOT_CALLABLE, SEM_UNDEFINED_IDENT,
};

impl<'a> Analyzer<'a> {
    /// Dispatches on `id`'s current kind, records its type in
    /// `node_types`, and returns that type. Every analysis routine in this
    /// module is expected to leave `id` itself analyzed (children coerced,
    /// constants folded where possible) before returning.
    pub(crate) fn analyze_expr(&mut self, id: NodeId) -> TypeId {
        let ty = match self.ast.kind(id).clone() {
            NodeKind::Identifier { name } => self.analyze_identifier(id, name),
            NodeKind::Literal { value } => self.analyze_literal(value),
            NodeKind::Unary { op, operand } => self.analyze_unary(id, op, operand),
            NodeKind::Binary { op, lhs, rhs } => self.analyze_binary(id, op, lhs, rhs),
            NodeKind::Call { callee, args } => self.analyze_call(id, callee, args),
            NodeKind::Cast { expr, ty, implicit } => self.analyze_cast(expr, ty, implicit),
            NodeKind::IfExpr { condition, then_value, else_value } => {
                self.analyze_if_expr(id, condition, then_value, else_value)
            }
            NodeKind::AddressOf { expr } => self.analyze_address_of(expr),
            NodeKind::Dereference { expr } => self.analyze_dereference(id, expr),
            NodeKind::MemberAccess { base, member } => self.analyze_member_access(id, base, member),
            other => lbc_util::ice!("analyze_expr called on a non-expression node: {other:?}"),
        };
        self.result.node_types.insert(id, ty);
        ty
    }

    fn analyze_identifier(&mut self, id: NodeId, name: lbc_util::Symbol) -> TypeId {
        match self.result.symtab.lookup(name) {
            Some(sym) => {
                self.result.node_symbols.insert(id, sym);
                self.result.symtab.symbol(sym).ty
            }
            None => {
                let span = self.ast.span(id);
                let msg = self.ctx.resolve(name).to_string();
                self.ctx.diags.error(SEM_UNDEFINED_IDENT, span, &[msg]);
                self.result.types.any
            }
        }
    }

    /// Default literal types (`spec.md` §4.5, Open Question resolved):
    /// an integer literal defaults to `INTEGER`, a float literal to
    /// `DOUBLE`, a bool literal to `BOOLEAN`, a string literal directly to
    /// `ZSTRING`.
    fn analyze_literal(&mut self, value: LiteralValue) -> TypeId {
        match value {
            LiteralValue::Integer(_) => self.result.types.i32,
            LiteralValue::Float(_) => self.result.types.f64,
            LiteralValue::Bool(_) => self.result.types.boolean,
            LiteralValue::Str(_) => self.result.types.zstring,
            LiteralValue::Null => self.result.types.null,
        }
    }

    fn analyze_unary(&mut self, id: NodeId, op: UnaryOp, operand: NodeId) -> TypeId {
        let operand_ty = self.analyze_expr(operand);
        let result_ty = match op {
            UnaryOp::Neg => operand_ty,
            UnaryOp::Not => self.result.types.boolean,
            UnaryOp::BitNot => operand_ty,
        };
        if op == UnaryOp::Not {
            self.coerce(operand, self.result.types.boolean);
        }
        if let NodeKind::Literal { value } = self.ast.kind(operand).clone() {
            if let Some(folded) = crate::fold::fold_unary(op, value, operand_ty, &self.result.types) {
                self.ast.set_kind(id, NodeKind::Literal { value: folded });
            }
        }
        result_ty
    }

    /// `AND`/`OR` always coerce both operands to `BOOLEAN` and
    /// short-circuit (`spec.md` §4.5: "logical -> Boolean (operands must
    /// be Boolean)"); there is no bitwise reading over integral operands.
    fn analyze_binary(&mut self, id: NodeId, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> TypeId {
        let lhs_ty = self.analyze_expr(lhs);
        let rhs_ty = self.analyze_expr(rhs);

        let info = lbc_ast::operator::binary_info(op);

        match info.semantic {
            SemanticKind::Logical => {
                self.coerce(lhs, self.result.types.boolean);
                self.coerce(rhs, self.result.types.boolean);
                self.try_fold_binary(id, op, lhs, rhs, self.result.types.boolean);
                self.result.types.boolean
            }
            SemanticKind::Comparison => {
                let common = self.common_type_for(lhs, rhs, lhs_ty, rhs_ty);
                self.coerce(lhs, common);
                self.coerce(rhs, common);
                self.try_fold_binary(id, op, lhs, rhs, common);
                self.result.types.boolean
            }
            SemanticKind::Arithmetic => {
                let common = self.common_type_for(lhs, rhs, lhs_ty, rhs_ty);
                self.coerce(lhs, common);
                self.coerce(rhs, common);
                self.try_fold_binary(id, op, lhs, rhs, common);
                common
            }
        }
    }

    fn common_type_for(&mut self, lhs: NodeId, rhs: NodeId, lhs_ty: TypeId, rhs_ty: TypeId) -> TypeId {
        match self.result.types.common_type(lhs_ty, rhs_ty) {
            Some(common) => common,
            None => {
                let span = self.ast.span(lhs);
                let span = span.to(self.ast.span(rhs));
                let lhs_name = self.result.types.display(self.ctx, lhs_ty);
                let rhs_name = self.result.types.display(self.ctx, rhs_ty);
                self.ctx.diags.error(SEM_INCOMPATIBLE_TYPES, span, &[lhs_name, rhs_name]);
                lhs_ty
            }
        }
    }

    fn try_fold_binary(&mut self, id: NodeId, op: BinaryOp, lhs: NodeId, rhs: NodeId, operand_ty: TypeId) {
        let (NodeKind::Literal { value: lv }, NodeKind::Literal { value: rv }) =
            (self.ast.kind(lhs).clone(), self.ast.kind(rhs).clone())
        else {
            return;
        };
        if let Some(folded) = crate::fold::fold_binary(op, lv, rv, operand_ty, &self.result.types) {
            self.ast.set_kind(id, NodeKind::Literal { value: folded });
        }
    }

    /// Checks arity (including the variadic catch-all), coerces each
    /// fixed argument to its parameter type, and promotes any variadic
    /// trailing argument (`spec.md` §4.5 "Call expressions").
    fn analyze_call(&mut self, id: NodeId, callee: NodeId, args: Vec<NodeId>) -> TypeId {
        let callee_ty = self.analyze_expr(callee);
        let (ret, params, variadic) = match self.result.types.kind(callee_ty).clone() {
            lbc_types::TypeKind::Function { ret, params, variadic } => (ret, params, variadic),
            _ => {
                let span = self.ast.span(callee);
                let name = self.result.types.display(self.ctx, callee_ty);
                self.ctx.diags.error(SEM_NOT_CALLABLE, span, &[name]);
                for &arg in &args {
                    self.analyze_expr(arg);
                }
                return self.result.types.any;
            }
        };

        if args.len() < params.len() || (!variadic && args.len() > params.len()) {
            let span = self.ast.span(id);
            self.ctx.diags.error(
                SEM_ARG_COUNT_MISMATCH,
                span,
                &[params.len().to_string(), args.len().to_string()],
            );
        }

        for (i, &arg) in args.iter().enumerate() {
            self.analyze_expr(arg);
            if i < params.len() {
                self.coerce(arg, params[i]);
            } else {
                self.promote_variadic(arg);
            }
        }
        ret
    }

    /// A user-written `TYPE(expr)` cast: analyzes the operand and coerces
    /// it to the written target type, but does not re-flag the node
    /// `implicit` - it already carries `implicit: false` from parsing.
    fn analyze_cast(&mut self, expr: NodeId, ty: NodeId, _implicit: bool) -> TypeId {
        self.analyze_expr(expr);
        let target = self.resolve_type_expr(ty);
        self.coerce(expr, target);
        target
    }

    /// `IIF(cond, 1, 0)`/`IIF(cond, 0, 1)` collapse to a single implicit
    /// `CAST` of (possibly negated) `cond` rather than a branch
    /// (`spec.md` §4.5 concrete IIF folding pattern); every other `IfExpr`
    /// analyzes as an ordinary ternary.
    fn analyze_if_expr(&mut self, id: NodeId, condition: NodeId, then_value: NodeId, else_value: NodeId) -> TypeId {
        self.analyze_expr(condition);
        self.coerce(condition, self.result.types.boolean);

        let then_is_one = matches!(
            self.ast.kind(then_value),
            NodeKind::Literal { value: LiteralValue::Integer(1) }
        );
        let else_is_zero = matches!(
            self.ast.kind(else_value),
            NodeKind::Literal { value: LiteralValue::Integer(0) }
        );
        let then_is_zero = matches!(
            self.ast.kind(then_value),
            NodeKind::Literal { value: LiteralValue::Integer(0) }
        );
        let else_is_one = matches!(
            self.ast.kind(else_value),
            NodeKind::Literal { value: LiteralValue::Integer(1) }
        );

        if then_is_one && else_is_zero {
            let target = self.result.types.i32;
            let span = self.ast.span(id);
            let ty_node = self.synth_type_expr(target, span);
            self.ast.set_kind(id, NodeKind::Cast { expr: condition, ty: ty_node, implicit: true });
            return target;
        }
        if then_is_zero && else_is_one {
            let span = self.ast.span(id);
            let not_node = self.ast.alloc(NodeKind::Unary { op: UnaryOp::Not, operand: condition }, span);
            self.result.node_types.insert(not_node, self.result.types.boolean);
            let target = self.result.types.i32;
            let ty_node = self.synth_type_expr(target, span);
            self.ast.set_kind(id, NodeKind::Cast { expr: not_node, ty: ty_node, implicit: true });
            return target;
        }

        let then_ty = self.analyze_expr(then_value);
        let else_ty = self.analyze_expr(else_value);
        let common = self.common_type_for(then_value, else_value, then_ty, else_ty);
        self.coerce(then_value, common);
        self.coerce(else_value, common);

        if let NodeKind::Literal { value: LiteralValue::Bool(cond_value) } = self.ast.kind(condition).clone() {
            let chosen = if cond_value { then_value } else { else_value };
            if let NodeKind::Literal { value } = self.ast.kind(chosen).clone() {
                self.ast.set_kind(id, NodeKind::Literal { value });
            }
        }
        common
    }

    fn analyze_address_of(&mut self, expr: NodeId) -> TypeId {
        let inner = self.analyze_expr(expr);
        self.result.types.pointer(inner)
    }

    fn analyze_dereference(&mut self, id: NodeId, expr: NodeId) -> TypeId {
        let inner = self.analyze_expr(expr);
        match self.result.types.kind(inner) {
            lbc_types::TypeKind::Pointer(base) => *base,
            _ => {
                let span = self.ast.span(id);
                let name = self.result.types.display(self.ctx, inner);
                self.ctx.diags.error(SEM_INCOMPATIBLE_TYPES, span, &[name, "PTR".to_string()]);
                self.result.types.any
            }
        }
    }

    fn analyze_member_access(&mut self, id: NodeId, base: NodeId, member: lbc_util::Symbol) -> TypeId {
        let base_ty = self.analyze_expr(base);
        match self.result.types.kind(base_ty) {
            lbc_types::TypeKind::Udt { .. } => {
                let found = self
                    .result
                    .udts
                    .members(base_ty)
                    .iter()
                    .find(|m| self.result.symtab.symbol(m.symbol).name == member)
                    .copied();
                match found {
                    Some(m) => {
                        self.result.node_symbols.insert(id, m.symbol);
                        m.ty
                    }
                    None => {
                        let span = self.ast.span(id);
                        let msg = self.ctx.resolve(member).to_string();
                        self.ctx.diags.error(SEM_UNDEFINED_IDENT, span, &[msg]);
                        self.result.types.any
                    }
                }
            }
            _ => {
                let span = self.ast.span(id);
                let name = self.result.types.display(self.ctx, base_ty);
                self.ctx.diags.error(SEM_NOT_A_RECORD, span, &[name]);
                self.result.types.any
            }
        }
    }
}
