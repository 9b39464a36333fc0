//! A debug pretty-printer for the AST, supplementing the distilled
//! specification with the source's diagnostic dump facility (kept in
//! scope per `spec.md` §1's own carve-out for "a debug pretty-printer").
//! Driven by the `-ast-dump`/`-code-dump` CLI flags (`spec.md` §6).

use crate::node::{Ast, DoLoopKind, LiteralValue, LoopKind, Node, NodeId, NodeKind, TypeExprKind};
use crate::operator::{BinaryOp, UnaryOp};
use lbc_util::Context;
use std::fmt::Write as _;

/// Renders `root` and everything reachable from it as an indented tree,
/// one node per line.
pub struct Printer<'a> {
    ast: &'a Ast,
    ctx: &'a Context,
    out: String,
}

impl<'a> Printer<'a> {
    pub fn new(ast: &'a Ast, ctx: &'a Context) -> Self {
        Self { ast, ctx, out: String::new() }
    }

    pub fn print(mut self, root: NodeId) -> String {
        self.node(root, 0);
        self.out
    }

    fn line(&mut self, depth: usize, text: &str) {
        let _ = writeln!(self.out, "{}{text}", "  ".repeat(depth));
    }

    fn node(&mut self, id: NodeId, depth: usize) {
        let Node { kind, span } = self.ast.get(id).clone();
        match kind {
            NodeKind::Module { imports, decls } => {
                self.line(depth, "Module");
                for i in imports {
                    self.node(i, depth + 1);
                }
                for d in decls {
                    self.node(d, depth + 1);
                }
            }
            NodeKind::Import { path } => {
                self.line(depth, &format!("Import {}", self.ctx.resolve(path)));
            }
            NodeKind::ExprStatement { expr } => {
                self.line(depth, "ExprStatement");
                self.node(expr, depth + 1);
            }
            NodeKind::Assignment { target, value } => {
                self.line(depth, "Assignment");
                self.node(target, depth + 1);
                self.node(value, depth + 1);
            }
            NodeKind::Return { value } => {
                self.line(depth, "Return");
                if let Some(v) = value {
                    self.node(v, depth + 1);
                }
            }
            NodeKind::If { branches, else_body } => {
                self.line(depth, "If");
                for branch in branches {
                    self.line(depth + 1, "Branch");
                    for d in branch.decls {
                        self.node(d, depth + 2);
                    }
                    self.node(branch.condition, depth + 2);
                    for s in branch.body {
                        self.node(s, depth + 2);
                    }
                }
                if !else_body.is_empty() {
                    self.line(depth + 1, "Else");
                    for s in else_body {
                        self.node(s, depth + 2);
                    }
                }
            }
            NodeKind::For { var, start, end, step, body } => {
                self.line(depth, "For");
                self.node(var, depth + 1);
                self.node(start, depth + 1);
                self.node(end, depth + 1);
                if let Some(s) = step {
                    self.node(s, depth + 1);
                }
                for s in body {
                    self.node(s, depth + 1);
                }
            }
            NodeKind::DoLoop { kind, condition, body } => {
                self.line(depth, &format!("DoLoop {}", do_loop_kind_name(kind)));
                if let Some(c) = condition {
                    self.node(c, depth + 1);
                }
                for s in body {
                    self.node(s, depth + 1);
                }
            }
            NodeKind::Exit { target } => {
                self.line(depth, &format!("Exit {}", loop_kind_seq_name(&target)));
            }
            NodeKind::Continue { target } => {
                self.line(depth, &format!("Continue {}", loop_kind_seq_name(&target)));
            }
            NodeKind::VarDecl { name, ty, init, is_const, .. } => {
                self.line(
                    depth,
                    &format!("VarDecl {}{}", self.ctx.resolve(name), if is_const { " CONST" } else { "" }),
                );
                self.node(ty, depth + 1);
                if let Some(i) = init {
                    self.node(i, depth + 1);
                }
            }
            NodeKind::FunctionDecl { name, params, ret, body, is_variadic, .. } => {
                self.line(
                    depth,
                    &format!(
                        "FunctionDecl {}{}",
                        self.ctx.resolve(name),
                        if is_variadic { " ..." } else { "" }
                    ),
                );
                for p in params {
                    self.node(p, depth + 1);
                }
                if let Some(r) = ret {
                    self.node(r, depth + 1);
                }
                if let Some(stmts) = body {
                    self.line(depth + 1, "Body");
                    for s in stmts {
                        self.node(s, depth + 2);
                    }
                }
            }
            NodeKind::Param { name, ty } => {
                self.line(depth, &format!("Param {}", self.ctx.resolve(name)));
                self.node(ty, depth + 1);
            }
            NodeKind::TypeDecl { name, packed, members } => {
                self.line(
                    depth,
                    &format!("TypeDecl {}{}", self.ctx.resolve(name), if packed { " PACKED" } else { "" }),
                );
                for m in members {
                    self.node(m, depth + 1);
                }
            }
            NodeKind::TypeMember { name, ty } => {
                self.line(depth, &format!("TypeMember {}", self.ctx.resolve(name)));
                self.node(ty, depth + 1);
            }
            NodeKind::Identifier { name } => {
                self.line(depth, &format!("Identifier {}", self.ctx.resolve(name)));
            }
            NodeKind::Literal { value } => {
                self.line(depth, &format!("Literal {}", self.literal_text(value)));
            }
            NodeKind::Unary { op, operand } => {
                self.line(depth, &format!("Unary {}", unary_op_name(op)));
                self.node(operand, depth + 1);
            }
            NodeKind::Binary { op, lhs, rhs } => {
                self.line(depth, &format!("Binary {}", binary_op_name(op)));
                self.node(lhs, depth + 1);
                self.node(rhs, depth + 1);
            }
            NodeKind::Call { callee, args } => {
                self.line(depth, "Call");
                self.node(callee, depth + 1);
                for a in args {
                    self.node(a, depth + 1);
                }
            }
            NodeKind::Cast { expr, ty, implicit } => {
                self.line(depth, if *implicit { "Cast (implicit)" } else { "Cast" });
                self.node(expr, depth + 1);
                self.node(ty, depth + 1);
            }
            NodeKind::IfExpr { condition, then_value, else_value } => {
                self.line(depth, "IfExpr");
                self.node(condition, depth + 1);
                self.node(then_value, depth + 1);
                self.node(else_value, depth + 1);
            }
            NodeKind::AddressOf { expr } => {
                self.line(depth, "AddressOf");
                self.node(expr, depth + 1);
            }
            NodeKind::Dereference { expr } => {
                self.line(depth, "Dereference");
                self.node(expr, depth + 1);
            }
            NodeKind::MemberAccess { base, member } => {
                self.line(depth, &format!("MemberAccess .{}", self.ctx.resolve(member)));
                self.node(base, depth + 1);
            }
            NodeKind::TypeExpr { base, pointer_depth } => {
                self.line(depth, &format!("TypeExpr {}{}", type_expr_name(base, self.ctx), " PTR".repeat(pointer_depth as usize)));
            }
        }
        let _ = span;
    }

    fn literal_text(&self, value: LiteralValue) -> String {
        match value {
            LiteralValue::Integer(v) => v.to_string(),
            LiteralValue::Float(v) => v.to_string(),
            LiteralValue::Bool(v) => v.to_string(),
            LiteralValue::Str(s) => format!("{:?}", self.ctx.resolve(s)),
            LiteralValue::Null => "NULL".to_string(),
        }
    }
}

fn loop_kind_name(kind: LoopKind) -> &'static str {
    match kind {
        LoopKind::For => "FOR",
        LoopKind::Do => "DO",
    }
}

fn loop_kind_seq_name(kinds: &[LoopKind]) -> String {
    kinds.iter().map(|k| loop_kind_name(*k)).collect::<Vec<_>>().join(" ")
}

fn do_loop_kind_name(kind: DoLoopKind) -> &'static str {
    match kind {
        DoLoopKind::PreWhile => "PRE_WHILE",
        DoLoopKind::PreUntil => "PRE_UNTIL",
        DoLoopKind::PostWhile => "POST_WHILE",
        DoLoopKind::PostUntil => "POST_UNTIL",
        DoLoopKind::Infinite => "INFINITE",
    }
}

fn unary_op_name(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Neg => "-",
        UnaryOp::Not => "NOT",
        UnaryOp::BitNot => "~",
    }
}

fn binary_op_name(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "MOD",
        BinaryOp::Pow => "^",
        BinaryOp::Eq => "=",
        BinaryOp::Ne => "<>",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::AndAlso => "AND",
        BinaryOp::OrElse => "OR",
    }
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
    use crate::node::Ast;
    use lbc_util::Span;

    #[test]
    fn prints_a_literal_leaf() {
        let mut ast = Ast::new();
        let ctx = Context::new();
        let id = ast.alloc(NodeKind::Literal { value: LiteralValue::Integer(5) }, Span::DUMMY);
        let text = Printer::new(&ast, &ctx).print(id);
        assert_eq!(text.trim(), "Literal 5");
    }

    #[test]
    fn prints_nested_binary_expression() {
        let mut ast = Ast::new();
        let ctx = Context::new();
        let one = ast.alloc(NodeKind::Literal { value: LiteralValue::Integer(1) }, Span::DUMMY);
        let two = ast.alloc(NodeKind::Literal { value: LiteralValue::Integer(2) }, Span::DUMMY);
        let add = ast.alloc(NodeKind::Binary { op: BinaryOp::Add, lhs: one, rhs: two }, Span::DUMMY);
        let text = Printer::new(&ast, &ctx).print(add);
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "Binary +");
        assert_eq!(lines.next().unwrap(), "  Literal 1");
        assert_eq!(lines.next().unwrap(), "  Literal 2");
    }
}
