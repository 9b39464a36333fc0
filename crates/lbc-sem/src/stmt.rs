//! Statement analysis (`spec.md` §4.5 "Body pass", statement rules).

use crate::analyzer::{Analyzer, ForDirection};
use lbc_ast::{NodeId, NodeKind};
use lbc_sym::{ScopeKind, SymbolFlags};
use lbc_util::{
    SEM_NOT_ASSIGNABLE, SEM_RETURN_OUTSIDE_FUNCTION, WARN_UNREACHABLE_FOR_BODY, WARN_ZERO_STEP,
};

impl<'a> Analyzer<'a> {
    pub(crate) fn analyze_stmt(&mut self, id: NodeId) {
        match self.ast.kind(id).clone() {
            NodeKind::ExprStatement { expr } => {
                self.analyze_expr(expr);
            }
            NodeKind::Assignment { target, value } => self.analyze_assignment(target, value),
            NodeKind::Return { value } => self.analyze_return(id, value),
            NodeKind::If { branches, else_body } => self.analyze_if(branches, else_body),
            NodeKind::For { var, start, end, step, body } => self.analyze_for(id, var, start, end, step, body),
            NodeKind::DoLoop { kind, condition, body } => self.analyze_do_loop(kind, condition, body),
            NodeKind::VarDecl { name, ty, init, is_const, .. } => {
                self.analyze_var_decl(id, name, ty, init, is_const)
            }
            NodeKind::Exit { .. } | NodeKind::Continue { .. } => {
                // The parser's own loop-nesting stack already rejected a
                // misplaced EXIT/CONTINUE at parse time
                // (`PARSE_INVALID_CF_TARGET`), so by the time the analyzer
                // sees one it is always well-formed - nothing to check.
            }
            other => lbc_util::ice!("analyze_stmt called on a non-statement node: {other:?}"),
        }
    }

    fn analyze_var_decl(
        &mut self,
        id: NodeId,
        name: lbc_util::Symbol,
        ty: NodeId,
        init: Option<NodeId>,
        is_const: bool,
    ) {
        let declared_ty = self.resolve_type_expr(ty);
        if let Some(init) = init {
            self.analyze_expr(init);
            self.coerce(init, declared_ty);
        }
        let span = self.ast.span(id);
        let flags = SymbolFlags { assignable: !is_const, ..Default::default() };
        match self.result.symtab.declare(name, name, declared_ty, flags, span) {
            Ok(sym) => {
                self.result.node_symbols.insert(id, sym);
            }
            Err(_) => {
                let msg = self.ctx.resolve(name).to_string();
                self.ctx.diags.error(lbc_util::SEM_REDEFINITION, span, &[msg]);
            }
        }
        self.result.node_types.insert(id, declared_ty);
    }

    fn analyze_assignment(&mut self, target: NodeId, value: NodeId) {
        self.analyze_expr(target);
        self.analyze_expr(value);
        if !self.is_assignable(target) {
            let span = self.ast.span(target);
            self.ctx.diags.error(SEM_NOT_ASSIGNABLE, span, &[]);
        }
        let target_ty = *self.result.node_types.get(&target).unwrap_or(&self.result.types.any);
        self.coerce(value, target_ty);
    }

    /// `spec.md` §4.5: an identifier is assignable unless its symbol's
    /// `assignable` flag was cleared (the `FOR` iterator case);
    /// `MemberAccess`/`Dereference` are always assignable (full
    /// addressability modeling is out of scope); anything else isn't.
    fn is_assignable(&self, id: NodeId) -> bool {
        match self.ast.kind(id) {
            NodeKind::Identifier { .. } => match self.result.node_symbols.get(&id) {
                Some(&sym) => self.result.symtab.symbol(sym).flags.assignable,
                // An unresolved identifier already raised SEM_UNDEFINED_IDENT;
                // don't cascade a second diagnostic onto the same node.
                None => true,
            },
            NodeKind::MemberAccess { .. } | NodeKind::Dereference { .. } => true,
            _ => false,
        }
    }

    fn analyze_return(&mut self, id: NodeId, value: Option<NodeId>) {
        let Some(ret_ty) = self.current_return_type else {
            let span = self.ast.span(id);
            self.ctx.diags.error(SEM_RETURN_OUTSIDE_FUNCTION, span, &[]);
            if let Some(value) = value {
                self.analyze_expr(value);
            }
            return;
        };
        match value {
            Some(value) => {
                self.analyze_expr(value);
                self.coerce(value, ret_ty);
            }
            None => {
                if ret_ty != self.result.types.void {
                    let span = self.ast.span(id);
                    let name = self.result.types.display(self.ctx, ret_ty);
                    self.ctx.diags.error(lbc_util::SEM_INCOMPATIBLE_TYPES, span, &["VOID".to_string(), name]);
                }
            }
        }
    }

    /// Each branch's scope opens before its `localDecls`/condition are
    /// analyzed, not just around its body (`spec.md` §4.2 "IF VAR x =
    /// foo() THEN ..."; §4.5 `IfBranch` state machine: "Local declarations
    /// introduced in an IF condition ... are scoped to that block"), so a
    /// local declared in the head is visible to the condition itself and
    /// to the body that follows.
    fn analyze_if(&mut self, branches: Vec<lbc_ast::IfBranch>, else_body: Vec<NodeId>) {
        for branch in branches {
            self.result.symtab.push_scope(ScopeKind::Block);
            for decl in branch.decls {
                self.analyze_stmt(decl);
            }
            self.analyze_expr(branch.condition);
            self.coerce(branch.condition, self.result.types.boolean);
            for stmt in branch.body {
                self.analyze_stmt(stmt);
            }
            self.result.symtab.pop_scope();
        }
        self.result.symtab.push_scope(ScopeKind::Block);
        for stmt in else_body {
            self.analyze_stmt(stmt);
        }
        self.result.symtab.pop_scope();
    }

    /// Analyzes a `FOR` loop and determines its iteration direction
    /// (`spec.md` §4.5 "FOR", §8 testable property 8). Literal
    /// start/end/step values are captured *before* `coerce` runs on those
    /// same nodes, since coercion may wrap or fold them in place.
    fn analyze_for(
        &mut self,
        id: NodeId,
        var: NodeId,
        start: NodeId,
        end: NodeId,
        step: Option<NodeId>,
        body: Vec<NodeId>,
    ) {
        let start_ty = self.analyze_expr(start);
        let end_ty = self.analyze_expr(end);
        let loop_ty = match self.result.types.common_type(start_ty, end_ty) {
            Some(common) => common,
            None => start_ty,
        };

        let start_literal = crate::fold::as_literal_i64(self.ast.kind(start), start_ty, &self.result.types);
        let end_literal = crate::fold::as_literal_i64(self.ast.kind(end), end_ty, &self.result.types);
        let step_literal = match step {
            Some(step) => {
                let step_ty = self.analyze_expr(step);
                crate::fold::as_literal_i64(self.ast.kind(step), step_ty, &self.result.types)
            }
            None => Some(1),
        };

        self.coerce(start, loop_ty);
        self.coerce(end, loop_ty);
        if let Some(step) = step {
            self.coerce(step, loop_ty);
        }

        let direction = self.compute_for_direction(id, start_literal, end_literal, step_literal);
        self.result.for_directions.insert(id, direction);

        self.result.symtab.push_scope(ScopeKind::Block);
        let NodeKind::Identifier { name } = self.ast.kind(var).clone() else {
            lbc_util::ice!("FOR loop variable is not an Identifier node");
        };
        let span = self.ast.span(var);
        let flags = SymbolFlags { assignable: false, ..Default::default() };
        match self.result.symtab.declare(name, name, loop_ty, flags, span) {
            Ok(sym) => {
                self.result.node_symbols.insert(var, sym);
            }
            Err(_) => {
                let msg = self.ctx.resolve(name).to_string();
                self.ctx.diags.error(lbc_util::SEM_REDEFINITION, span, &[msg]);
            }
        }
        self.result.node_types.insert(var, loop_ty);

        for stmt in body {
            self.analyze_stmt(stmt);
        }
        self.result.symtab.pop_scope();
    }

    fn compute_for_direction(
        &mut self,
        id: NodeId,
        start: Option<i64>,
        end: Option<i64>,
        step: Option<i64>,
    ) -> ForDirection {
        let (Some(start), Some(end)) = (start, end) else {
            return ForDirection::Unknown;
        };
        let tentative = if start <= end { ForDirection::Increment } else { ForDirection::Decrement };

        let step = step.unwrap_or(1);
        if step == 0 {
            let span = self.ast.span(id);
            self.ctx.diags.warning(WARN_ZERO_STEP, span, &[]);
            return ForDirection::Increment;
        }

        let direction_matches = match tentative {
            ForDirection::Increment => step > 0,
            ForDirection::Decrement => step < 0,
            _ => true,
        };
        if !direction_matches {
            let span = self.ast.span(id);
            self.ctx.diags.warning(WARN_UNREACHABLE_FOR_BODY, span, &[]);
            return ForDirection::Skip;
        }
        tentative
    }

    fn analyze_do_loop(&mut self, _kind: lbc_ast::DoLoopKind, condition: Option<NodeId>, body: Vec<NodeId>) {
        if let Some(condition) = condition {
            self.analyze_expr(condition);
            self.coerce(condition, self.result.types.boolean);
        }
        self.result.symtab.push_scope(ScopeKind::Block);
        for stmt in body {
            self.analyze_stmt(stmt);
        }
        self.result.symtab.pop_scope();
    }
}
