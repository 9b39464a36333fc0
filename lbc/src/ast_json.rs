//! JSON AST dump for `-ast-dump` (`spec.md` §6, `SPEC_FULL.md` §B.3).
//!
//! `lbc_ast::Printer` already walks the tree for `-code-dump`'s indented
//! text form; none of `lbc-ast`'s node types derive `Serialize` (pulling
//! `serde` into the arena crate just for this one driver-only flag would
//! be the tail wagging the dog), so this mirrors `Printer`'s traversal and
//! builds a `serde_json::Value` tree directly instead.

use lbc_ast::{Ast, LiteralValue, NodeId, NodeKind, TypeExprKind};
use lbc_util::Context;
use serde_json::{json, Value};

pub fn dump(ast: &Ast, ctx: &Context, root: NodeId) -> Value {
    node(ast, ctx, root)
}

fn node(ast: &Ast, ctx: &Context, id: NodeId) -> Value {
    let kind = ast.kind(id).clone();
    match kind {
        NodeKind::Module { imports, decls } => json!({
            "node": "Module",
            "imports": list(ast, ctx, &imports),
            "decls": list(ast, ctx, &decls),
        }),
        NodeKind::Import { path } => json!({ "node": "Import", "path": ctx.resolve(path) }),
        NodeKind::ExprStatement { expr } => json!({ "node": "ExprStatement", "expr": node(ast, ctx, expr) }),
        NodeKind::Assignment { target, value } => json!({
            "node": "Assignment",
            "target": node(ast, ctx, target),
            "value": node(ast, ctx, value),
        }),
        NodeKind::Return { value } => json!({
            "node": "Return",
            "value": value.map(|v| node(ast, ctx, v)),
        }),
        NodeKind::If { branches, else_body } => json!({
            "node": "If",
            "branches": branches.iter().map(|b| json!({
                "decls": list(ast, ctx, &b.decls),
                "condition": node(ast, ctx, b.condition),
                "body": list(ast, ctx, &b.body),
            })).collect::<Vec<_>>(),
            "else": list(ast, ctx, &else_body),
        }),
        NodeKind::For { var, start, end, step, body } => json!({
            "node": "For",
            "var": node(ast, ctx, var),
            "start": node(ast, ctx, start),
            "end": node(ast, ctx, end),
            "step": step.map(|s| node(ast, ctx, s)),
            "body": list(ast, ctx, &body),
        }),
        NodeKind::DoLoop { kind, condition, body } => json!({
            "node": "DoLoop",
            "kind": format!("{kind:?}"),
            "condition": condition.map(|c| node(ast, ctx, c)),
            "body": list(ast, ctx, &body),
        }),
        NodeKind::Exit { target } => json!({ "node": "Exit", "target": cf_target_names(&target) }),
        NodeKind::Continue { target } => json!({ "node": "Continue", "target": cf_target_names(&target) }),
        NodeKind::VarDecl { name, ty, init, is_const, .. } => json!({
            "node": "VarDecl",
            "name": ctx.resolve(name),
            "const": is_const,
            "ty": node(ast, ctx, ty),
            "init": init.map(|i| node(ast, ctx, i)),
        }),
        NodeKind::FunctionDecl { name, params, ret, body, is_variadic, .. } => json!({
            "node": "FunctionDecl",
            "name": ctx.resolve(name),
            "variadic": is_variadic,
            "params": list(ast, ctx, &params),
            "ret": ret.map(|r| node(ast, ctx, r)),
            "body": body.map(|b| list(ast, ctx, &b)),
        }),
        NodeKind::Param { name, ty } => json!({
            "node": "Param",
            "name": ctx.resolve(name),
            "ty": node(ast, ctx, ty),
        }),
        NodeKind::TypeDecl { name, packed, members } => json!({
            "node": "TypeDecl",
            "name": ctx.resolve(name),
            "packed": packed,
            "members": list(ast, ctx, &members),
        }),
        NodeKind::TypeMember { name, ty } => json!({
            "node": "TypeMember",
            "name": ctx.resolve(name),
            "ty": node(ast, ctx, ty),
        }),
        NodeKind::Identifier { name } => json!({ "node": "Identifier", "name": ctx.resolve(name) }),
        NodeKind::Literal { value } => json!({ "node": "Literal", "value": literal(ctx, value) }),
        NodeKind::Unary { op, operand } => json!({
            "node": "Unary",
            "op": format!("{op:?}"),
            "operand": node(ast, ctx, operand),
        }),
        NodeKind::Binary { op, lhs, rhs } => json!({
            "node": "Binary",
            "op": format!("{op:?}"),
            "lhs": node(ast, ctx, lhs),
            "rhs": node(ast, ctx, rhs),
        }),
        NodeKind::Call { callee, args } => json!({
            "node": "Call",
            "callee": node(ast, ctx, callee),
            "args": list(ast, ctx, &args),
        }),
        NodeKind::Cast { expr, ty, implicit } => json!({
            "node": "Cast",
            "implicit": implicit,
            "expr": node(ast, ctx, expr),
            "ty": node(ast, ctx, ty),
        }),
        NodeKind::IfExpr { condition, then_value, else_value } => json!({
            "node": "IfExpr",
            "condition": node(ast, ctx, condition),
            "then": node(ast, ctx, then_value),
            "else": node(ast, ctx, else_value),
        }),
        NodeKind::AddressOf { expr } => json!({ "node": "AddressOf", "expr": node(ast, ctx, expr) }),
        NodeKind::Dereference { expr } => json!({ "node": "Dereference", "expr": node(ast, ctx, expr) }),
        NodeKind::MemberAccess { base, member } => json!({
            "node": "MemberAccess",
            "member": ctx.resolve(member),
            "base": node(ast, ctx, base),
        }),
        NodeKind::TypeExpr { base, pointer_depth } => json!({
            "node": "TypeExpr",
            "base": type_expr_name(base, ctx),
            "pointer_depth": pointer_depth,
        }),
    }
}

fn list(ast: &Ast, ctx: &Context, ids: &[NodeId]) -> Vec<Value> {
    ids.iter().map(|&id| node(ast, ctx, id)).collect()
}

fn literal(ctx: &Context, value: LiteralValue) -> Value {
    match value {
        LiteralValue::Integer(v) => json!(v),
        LiteralValue::Float(v) => json!(v),
        LiteralValue::Bool(v) => json!(v),
        LiteralValue::Str(s) => json!(ctx.resolve(s)),
        LiteralValue::Null => Value::Null,
    }
}

fn cf_target_names(target: &[lbc_ast::LoopKind]) -> Vec<&'static str> {
    target
        .iter()
        .map(|k| match k {
            lbc_ast::LoopKind::For => "For",
            lbc_ast::LoopKind::Do => "Do",
        })
        .collect()
}

fn type_expr_name(base: TypeExprKind, ctx: &Context) -> String {
    match base {
        TypeExprKind::Byte => "BYTE".to_string(),
        TypeExprKind::UByte => "UBYTE".to_string(),
        TypeExprKind::Short => "SHORT".to_string(),
        TypeExprKind::UShort => "USHORT".to_string(),
        TypeExprKind::Integer => "INTEGER".to_string(),
        TypeExprKind::UInteger => "UINTEGER".to_string(),
        TypeExprKind::Long => "LONG".to_string(),
        TypeExprKind::ULong => "ULONG".to_string(),
        TypeExprKind::Single => "SINGLE".to_string(),
        TypeExprKind::Double => "DOUBLE".to_string(),
        TypeExprKind::Boolean => "BOOLEAN".to_string(),
        TypeExprKind::ZString => "ZSTRING".to_string(),
        TypeExprKind::Any => "ANY".to_string(),
        TypeExprKind::Void => "VOID".to_string(),
        TypeExprKind::Named(sym) => ctx.resolve(sym).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lbc_util::Span;

    #[test]
    fn dumps_a_literal_leaf() {
        let mut ast = Ast::new();
        let ctx = Context::new();
        let id = ast.alloc(NodeKind::Literal { value: LiteralValue::Integer(7) }, Span::DUMMY);
        let value = dump(&ast, &ctx, id);
        assert_eq!(value["node"], "Literal");
        assert_eq!(value["value"], 7);
    }
}
