//! The parser: recursive descent over statements, precedence climbing over
//! expressions (`spec.md` §4.2).
//!
//! Errors are fail-fast: the first malformed construct emits a diagnostic
//! through [`lbc_util::Context::diags`] and unwinds the whole parse via
//! [`ParseError`], rather than attempting token-level recovery. `spec.md`
//! §4.2 does not ask for error recovery, and guessing at a recovery
//! strategy not grounded in the source risks reporting nonsense follow-on
//! errors - grounded on the teacher's `faxc-par` driver, which takes the
//! same stance.

use lbc_ast::{
    Ast, Attribute, BinaryOp, DoLoopKind, IfBranch, LiteralValue, LoopKind, NodeId, NodeKind, TypeExprKind,
    UnaryOp,
};
use lbc_lex::{Lexer, Literal as TokLiteral, Token, TokenKind};
use lbc_util::{Context, FileId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("parsing aborted after a diagnostic was emitted")]
    Fatal,
}

type PResult<T> = Result<T, ParseError>;

/// Which construct opened the parser's own scope stack
/// (`spec.md` §4.2: "scope tracking Root/Function" - used to reject a
/// nested `FUNCTION`/`SUB` definition, not to resolve names).
#[derive(Clone, Copy, PartialEq, Eq)]
enum ParseScope {
    Root,
    Function,
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    ast: Ast,
    scope_stack: Vec<ParseScope>,
    /// Tracks enclosing `FOR`/`DO` loops, innermost last, so `EXIT`/
    /// `CONTINUE` targets can be checked against what's actually open
    /// (`spec.md` §7 `PARSE_INVALID_CF_TARGET`).
    loop_stack: Vec<LoopKind>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, ctx: &mut Context, file: FileId) -> Self {
        let mut lexer = Lexer::new(source, file);
        let current = lexer.next_token(ctx);
        Self { lexer, current, ast: Ast::new(), scope_stack: vec![ParseScope::Root], loop_stack: Vec::new() }
    }

    /// Parses a whole module and hands back the populated arena alongside
    /// the root node id.
    pub fn parse_module(mut self, ctx: &mut Context) -> PResult<(Ast, NodeId)> {
        let start = self.current.span;
        let mut imports = Vec::new();
        while self.check(TokenKind::Import) {
            imports.push(self.parse_import(ctx)?);
        }
        let mut decls = Vec::new();
        while !self.check(TokenKind::EndOfFile) {
            decls.push(self.parse_declaration(ctx)?);
        }
        let end = self.current.span;
        let root = self.ast.alloc(NodeKind::Module { imports, decls }, start.to(end));
        Ok((self.ast, root))
    }

    // -- token stream helpers --------------------------------------------

    fn bump(&mut self, ctx: &mut Context) -> Token {
        let prev = self.current;
        self.current = self.lexer.next_token(ctx);
        prev
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn eat(&mut self, kind: TokenKind, ctx: &mut Context) -> Option<Token> {
        if self.check(kind) {
            Some(self.bump(ctx))
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind, ctx: &mut Context) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.bump(ctx))
        } else {
            self.error_unexpected(kind, ctx)
        }
    }

    fn error_unexpected<T>(&mut self, expected: TokenKind, ctx: &mut Context) -> PResult<T> {
        let args = [expected.describe().to_string(), self.current.kind.describe().to_string()];
        ctx.diags.error(lbc_util::PARSE_UNEXPECTED_TOKEN, self.current.span, &args);
        Err(ParseError::Fatal)
    }

    fn fatal<T>(&mut self, code: lbc_util::DiagnosticCode, args: &[String], ctx: &mut Context) -> PResult<T> {
        ctx.diags.error(code, self.current.span, args);
        Err(ParseError::Fatal)
    }

    /// Consumes the statement terminator (`spec.md` §3: `EndOfStmt`).
    fn expect_end_of_stmt(&mut self, ctx: &mut Context) -> PResult<()> {
        self.expect(TokenKind::EndOfStmt, ctx)?;
        Ok(())
    }

    fn ident_symbol(&mut self, ctx: &mut Context) -> PResult<lbc_util::Symbol> {
        let tok = self.expect(TokenKind::Identifier, ctx)?;
        match tok.literal {
            TokLiteral::Str(sym) => Ok(sym),
            _ => lbc_util::ice!("identifier token without interned text"),
        }
    }

    // -- module level -----------------------------------------------------

    fn parse_import(&mut self, ctx: &mut Context) -> PResult<NodeId> {
        let start = self.current.span;
        self.expect(TokenKind::Import, ctx)?;
        let path = self.ident_symbol(ctx)?;
        self.expect_end_of_stmt(ctx)?;
        Ok(self.ast.alloc(NodeKind::Import { path }, start.to(self.current.span)))
    }

    /// `[ NAME = "value", ... ]` (`spec.md` §4.2 "Attribute prefix"; §7
    /// spells the payload as `[KEY = "VALUE", ...]`). An unrecognized
    /// attribute name still consumes its `= value` payload so the parser
    /// stays in sync, but only `ALIAS` is kept as anything but a marker.
    fn parse_attributes(&mut self, ctx: &mut Context) -> PResult<Vec<Attribute>> {
        let mut attrs = Vec::new();
        if self.eat(TokenKind::LBracket, ctx).is_some() {
            loop {
                let name_tok = self.ident_symbol(ctx)?;
                if ctx.resolve(name_tok) == "ALIAS" {
                    self.expect(TokenKind::Assign, ctx)?;
                    let value = self.expect(TokenKind::StringLiteral, ctx)?;
                    let sym = match value.literal {
                        TokLiteral::Str(s) => s,
                        _ => lbc_util::ice!("string literal without interned text"),
                    };
                    attrs.push(Attribute::Alias(sym));
                } else {
                    if self.eat(TokenKind::Assign, ctx).is_some() {
                        self.expect(TokenKind::StringLiteral, ctx)?;
                    }
                    attrs.push(Attribute::Unknown(name_tok));
                }
                if self.eat(TokenKind::Comma, ctx).is_none() {
                    break;
                }
            }
            self.expect(TokenKind::RBracket, ctx)?;
        }
        Ok(attrs)
    }

    fn parse_declaration(&mut self, ctx: &mut Context) -> PResult<NodeId> {
        match self.current.kind {
            TokenKind::LBracket | TokenKind::Declare | TokenKind::Function | TokenKind::Sub => {
                self.parse_function_decl(ctx)
            }
            TokenKind::Dim | TokenKind::Var => self.parse_var_decl(ctx),
            TokenKind::Type => self.parse_type_decl(ctx),
            _ => self.fatal(lbc_util::PARSE_ILLEGAL_TOP_LEVEL, &[], ctx),
        }
    }

    fn parse_var_decl(&mut self, ctx: &mut Context) -> PResult<NodeId> {
        let start = self.current.span;
        let is_const = false;
        self.bump(ctx); // DIM | VAR
        let name = self.ident_symbol(ctx)?;
        self.expect(TokenKind::As, ctx)?;
        let ty = self.parse_type_expr(ctx)?;
        let init = if self.eat(TokenKind::Assign, ctx).is_some() { Some(self.parse_expression(ctx, 0)?) } else { None };
        self.expect_end_of_stmt(ctx)?;
        let span = start.to(self.current.span);
        Ok(self.ast.alloc(NodeKind::VarDecl { name, attributes: Vec::new(), ty, init, is_const }, span))
    }

    fn parse_type_decl(&mut self, ctx: &mut Context) -> PResult<NodeId> {
        let start = self.current.span;
        self.expect(TokenKind::Type, ctx)?;
        let name = self.ident_symbol(ctx)?;
        self.expect_end_of_stmt(ctx)?;
        let mut members = Vec::new();
        while !self.check(TokenKind::End) {
            let mstart = self.current.span;
            let mname = self.ident_symbol(ctx)?;
            self.expect(TokenKind::As, ctx)?;
            let mty = self.parse_type_expr(ctx)?;
            self.expect_end_of_stmt(ctx)?;
            members.push(self.ast.alloc(NodeKind::TypeMember { name: mname, ty: mty }, mstart.to(self.current.span)));
        }
        self.expect(TokenKind::End, ctx)?;
        self.expect(TokenKind::Type, ctx)?;
        self.expect_end_of_stmt(ctx)?;
        let span = start.to(self.current.span);
        Ok(self.ast.alloc(NodeKind::TypeDecl { name, packed: false, members }, span))
    }

    fn parse_function_decl(&mut self, ctx: &mut Context) -> PResult<NodeId> {
        let start = self.current.span;
        let attributes = self.parse_attributes(ctx)?;
        let is_declare = self.eat(TokenKind::Declare, ctx).is_some();
        let is_sub = match self.current.kind {
            TokenKind::Function => false,
            TokenKind::Sub => true,
            _ => return self.error_unexpected(TokenKind::Function, ctx),
        };
        self.bump(ctx);
        let name = self.ident_symbol(ctx)?;

        if *self.scope_stack.last().unwrap() == ParseScope::Function {
            return self.fatal(lbc_util::PARSE_NESTED_FUNCTION, &[], ctx);
        }

        let mut attributes = attributes;
        if let Some(alias) = self.eat_inline_alias(ctx)? {
            attributes.push(Attribute::Alias(alias));
        }

        self.expect(TokenKind::LParen, ctx)?;
        let (params, is_variadic) = self.parse_param_list(ctx)?;
        self.expect(TokenKind::RParen, ctx)?;

        let ret = if !is_sub && self.eat(TokenKind::As, ctx).is_some() { Some(self.parse_type_expr(ctx)?) } else { None };

        let trailing_attrs = self.parse_attributes(ctx)?;
        attributes.extend(trailing_attrs);

        self.expect_end_of_stmt(ctx)?;

        let body = if is_declare {
            None
        } else {
            self.scope_stack.push(ParseScope::Function);
            let stmts = self.parse_block(ctx, &[TokenKind::End])?;
            self.scope_stack.pop();
            self.expect(TokenKind::End, ctx)?;
            if is_sub {
                self.expect(TokenKind::Sub, ctx)?;
            } else {
                self.expect(TokenKind::Function, ctx)?;
            }
            self.expect_end_of_stmt(ctx)?;
            Some(stmts)
        };

        let span = start.to(self.current.span);
        Ok(self.ast.alloc(NodeKind::FunctionDecl { name, attributes, params, is_variadic, ret, body }, span))
    }

    /// `DECLARE SUB puts ALIAS "puts" (...)` - an inline alias written right
    /// after the declared name, ahead of the parameter list, rather than as
    /// a bracketed attribute (`spec.md` §7 grammar sketch). `ALIAS` is not
    /// a keyword of its own; it is an identifier recognized by name, same
    /// as inside [`Self::parse_attributes`].
    fn eat_inline_alias(&mut self, ctx: &mut Context) -> PResult<Option<lbc_util::Symbol>> {
        if self.current.kind != TokenKind::Identifier {
            return Ok(None);
        }
        let TokLiteral::Str(sym) = self.current.literal else {
            lbc_util::ice!("identifier token without interned text")
        };
        if ctx.resolve(sym) != "ALIAS" {
            return Ok(None);
        }
        self.bump(ctx);
        let value = self.expect(TokenKind::StringLiteral, ctx)?;
        let TokLiteral::Str(alias) = value.literal else {
            lbc_util::ice!("string literal without interned text")
        };
        Ok(Some(alias))
    }

    fn parse_param_list(&mut self, ctx: &mut Context) -> PResult<(Vec<NodeId>, bool)> {
        let mut params = Vec::new();
        let mut variadic = false;
        if self.check(TokenKind::RParen) {
            return Ok((params, variadic));
        }
        loop {
            if self.check(TokenKind::Dot) {
                // `...` is lexed as three `Dot` tokens; it must be the
                // final parameter (`spec.md` §7 `PARSE_VARIADIC_NOT_LAST`).
                self.expect(TokenKind::Dot, ctx)?;
                self.expect(TokenKind::Dot, ctx)?;
                self.expect(TokenKind::Dot, ctx)?;
                variadic = true;
                if self.check(TokenKind::Comma) {
                    return self.fatal(lbc_util::PARSE_VARIADIC_NOT_LAST, &[], ctx);
                }
                break;
            }
            let start = self.current.span;
            let name = self.ident_symbol(ctx)?;
            self.expect(TokenKind::As, ctx)?;
            let ty = self.parse_type_expr(ctx)?;
            params.push(self.ast.alloc(NodeKind::Param { name, ty }, start.to(self.current.span)));
            if self.eat(TokenKind::Comma, ctx).is_some() {
                continue;
            }
            break;
        }
        Ok((params, variadic))
    }

    // -- statements -----------------------------------------------------

    /// Parses statements until one of `terminators` is the current token,
    /// without consuming it.
    fn parse_block(&mut self, ctx: &mut Context, terminators: &[TokenKind]) -> PResult<Vec<NodeId>> {
        let mut stmts = Vec::new();
        while !terminators.contains(&self.current.kind) && !self.check(TokenKind::EndOfFile) {
            stmts.push(self.parse_statement(ctx)?);
        }
        Ok(stmts)
    }

    fn parse_statement(&mut self, ctx: &mut Context) -> PResult<NodeId> {
        match self.current.kind {
            TokenKind::Dim | TokenKind::Var => self.parse_var_decl(ctx),
            TokenKind::If => self.parse_if(ctx),
            TokenKind::For => self.parse_for(ctx),
            TokenKind::Do => self.parse_do_loop(ctx),
            TokenKind::Return => self.parse_return(ctx),
            TokenKind::Exit => self.parse_exit(ctx),
            TokenKind::Continue => self.parse_continue(ctx),
            _ => self.parse_assignment_or_expr_stmt(ctx),
        }
    }

    fn parse_if(&mut self, ctx: &mut Context) -> PResult<NodeId> {
        let start = self.current.span;
        self.expect(TokenKind::If, ctx)?;
        let mut branches = Vec::new();
        let (decls, condition) = self.parse_if_head(ctx)?;
        self.expect(TokenKind::Then, ctx)?;
        self.expect_end_of_stmt(ctx)?;
        let body = self.parse_block(ctx, &[TokenKind::Else, TokenKind::End])?;
        branches.push(IfBranch { decls, condition, body });

        let mut else_body = Vec::new();
        loop {
            if self.eat(TokenKind::Else, ctx).is_some() {
                if self.eat(TokenKind::If, ctx).is_some() {
                    let (decls, condition) = self.parse_if_head(ctx)?;
                    self.expect(TokenKind::Then, ctx)?;
                    self.expect_end_of_stmt(ctx)?;
                    let body = self.parse_block(ctx, &[TokenKind::Else, TokenKind::End])?;
                    branches.push(IfBranch { decls, condition, body });
                    continue;
                }
                self.expect_end_of_stmt(ctx)?;
                else_body = self.parse_block(ctx, &[TokenKind::End])?;
            }
            break;
        }
        self.expect(TokenKind::End, ctx)?;
        self.expect(TokenKind::If, ctx)?;
        self.expect_end_of_stmt(ctx)?;
        let span = start.to(self.current.span);
        Ok(self.ast.alloc(NodeKind::If { branches, else_body }, span))
    }

    /// An `IF`/`ELSEIF` head: zero or more local declarations introduced by
    /// `VAR`/`DIM` (`spec.md` §4.2 "IF VAR x = foo() THEN", §4.5 `IfBranch`
    /// `localDecls`), then the guarding condition. Inside this head a comma
    /// binds as logical `AND` at the lowest precedence (`spec.md` §4.2
    /// "Comma-as-AND"), so `IF VAR x = f(), x > 0 THEN` declares `x` and
    /// tests `x > 0` in one condition.
    fn parse_if_head(&mut self, ctx: &mut Context) -> PResult<(Vec<NodeId>, NodeId)> {
        let mut decls = Vec::new();
        while self.check(TokenKind::Var) || self.check(TokenKind::Dim) {
            decls.push(self.parse_if_local_decl(ctx)?);
            if self.eat(TokenKind::Comma, ctx).is_none() {
                break;
            }
        }
        let mut condition = self.parse_expression(ctx, 0)?;
        while self.eat(TokenKind::Comma, ctx).is_some() {
            let cond_start = self.ast.span(condition);
            let rhs = self.parse_expression(ctx, 0)?;
            let span = cond_start.to(self.ast.span(rhs));
            condition = self.ast.alloc(NodeKind::Binary { op: BinaryOp::AndAlso, lhs: condition, rhs }, span);
        }
        Ok((decls, condition))
    }

    /// A single local `VAR`/`DIM` inside an `IF`/`ELSEIF` head - same shape
    /// as a statement-level declaration, but terminated by the head's
    /// comma/condition rather than an end-of-statement.
    fn parse_if_local_decl(&mut self, ctx: &mut Context) -> PResult<NodeId> {
        let start = self.current.span;
        self.bump(ctx); // VAR | DIM
        let name = self.ident_symbol(ctx)?;
        self.expect(TokenKind::As, ctx)?;
        let ty = self.parse_type_expr(ctx)?;
        let init = if self.eat(TokenKind::Assign, ctx).is_some() { Some(self.parse_expression(ctx, 0)?) } else { None };
        let span = start.to(self.current.span);
        Ok(self.ast.alloc(NodeKind::VarDecl { name, attributes: Vec::new(), ty, init, is_const: false }, span))
    }

    fn parse_for(&mut self, ctx: &mut Context) -> PResult<NodeId> {
        let start = self.current.span;
        self.expect(TokenKind::For, ctx)?;
        let var_start = self.current.span;
        let name = self.ident_symbol(ctx)?;
        let var = self.ast.alloc(NodeKind::Identifier { name }, var_start.to(self.current.span));
        self.expect(TokenKind::Assign, ctx)?;
        let begin = self.parse_expression(ctx, 0)?;
        self.expect(TokenKind::To, ctx)?;
        let end = self.parse_expression(ctx, 0)?;
        let step = if self.eat(TokenKind::Step, ctx).is_some() { Some(self.parse_expression(ctx, 0)?) } else { None };
        self.expect_end_of_stmt(ctx)?;

        self.loop_stack.push(LoopKind::For);
        let body = self.parse_block(ctx, &[TokenKind::Next])?;
        self.loop_stack.pop();

        self.expect(TokenKind::Next, ctx)?;
        if self.check(TokenKind::Identifier) {
            self.bump(ctx);
        }
        self.expect_end_of_stmt(ctx)?;
        let span = start.to(self.current.span);
        Ok(self.ast.alloc(NodeKind::For { var, start: begin, end, step, body }, span))
    }

    fn parse_do_loop(&mut self, ctx: &mut Context) -> PResult<NodeId> {
        let start = self.current.span;
        self.expect(TokenKind::Do, ctx)?;

        let pre_condition = self.parse_loop_guard(ctx)?;
        self.expect_end_of_stmt(ctx)?;

        self.loop_stack.push(LoopKind::Do);
        let body = self.parse_block(ctx, &[TokenKind::Loop])?;
        self.loop_stack.pop();

        self.expect(TokenKind::Loop, ctx)?;
        let post_condition = self.parse_loop_guard(ctx)?;
        self.expect_end_of_stmt(ctx)?;

        let (kind, condition) = match (pre_condition, post_condition) {
            (Some((true, cond)), None) => (DoLoopKind::PreWhile, Some(cond)),
            (Some((false, cond)), None) => (DoLoopKind::PreUntil, Some(cond)),
            (None, Some((true, cond))) => (DoLoopKind::PostWhile, Some(cond)),
            (None, Some((false, cond))) => (DoLoopKind::PostUntil, Some(cond)),
            (None, None) => (DoLoopKind::Infinite, None),
            (Some(_), Some(_)) => lbc_util::ice!("DO/LOOP guarded at both ends"),
        };
        let span = start.to(self.current.span);
        Ok(self.ast.alloc(NodeKind::DoLoop { kind, condition, body }, span))
    }

    /// Parses an optional `WHILE expr`/`UNTIL expr` guard. `true` in the
    /// returned tuple means `WHILE`, `false` means `UNTIL`.
    fn parse_loop_guard(&mut self, ctx: &mut Context) -> PResult<Option<(bool, NodeId)>> {
        if self.eat(TokenKind::While, ctx).is_some() {
            Ok(Some((true, self.parse_expression(ctx, 0)?)))
        } else if self.eat(TokenKind::Until, ctx).is_some() {
            Ok(Some((false, self.parse_expression(ctx, 0)?)))
        } else {
            Ok(None)
        }
    }

    fn parse_return(&mut self, ctx: &mut Context) -> PResult<NodeId> {
        let start = self.current.span;
        self.expect(TokenKind::Return, ctx)?;
        let value = if self.check(TokenKind::EndOfStmt) { None } else { Some(self.parse_expression(ctx, 0)?) };
        self.expect_end_of_stmt(ctx)?;
        let span = start.to(self.current.span);
        Ok(self.ast.alloc(NodeKind::Return { value }, span))
    }

    fn parse_exit(&mut self, ctx: &mut Context) -> PResult<NodeId> {
        let start = self.current.span;
        self.expect(TokenKind::Exit, ctx)?;
        let target = self.parse_cf_target(ctx)?;
        self.expect_end_of_stmt(ctx)?;
        let span = start.to(self.current.span);
        Ok(self.ast.alloc(NodeKind::Exit { target }, span))
    }

    fn parse_continue(&mut self, ctx: &mut Context) -> PResult<NodeId> {
        let start = self.current.span;
        self.expect(TokenKind::Continue, ctx)?;
        let target = self.parse_cf_target(ctx)?;
        self.expect_end_of_stmt(ctx)?;
        let span = start.to(self.current.span);
        Ok(self.ast.alloc(NodeKind::Continue { target }, span))
    }

    /// Parses the `{FOR, DO}` token sequence after `EXIT`/`CONTINUE` and
    /// validates it against what's actually open, from the top down
    /// (`spec.md` §4.2: "destination ... a sequence of `{For, Do}` tokens
    /// resolving to a target frame from the top down"; worked example
    /// `CONTINUE DO DO` targets the second-innermost `DO`).
    fn parse_cf_target(&mut self, ctx: &mut Context) -> PResult<Vec<LoopKind>> {
        let mut target = Vec::new();
        loop {
            let kind = match self.current.kind {
                TokenKind::For => LoopKind::For,
                TokenKind::Do => LoopKind::Do,
                _ => break,
            };
            target.push(kind);
            self.bump(ctx);
        }
        if target.is_empty() {
            let tok = self.current.kind.describe().to_string();
            return self.fatal(lbc_util::PARSE_INVALID_CF_TARGET, &[tok, "EXIT/CONTINUE".to_string()], ctx);
        }
        if !self.cf_target_resolves(&target) {
            let tok = cf_target_name(&target);
            return self.fatal(lbc_util::PARSE_INVALID_CF_TARGET, &[tok, "an enclosing loop".to_string()], ctx);
        }
        Ok(target)
    }

    /// Whether `target`, read top-down (innermost frame first), matches the
    /// innermost `target.len()` frames of what's currently open.
    fn cf_target_resolves(&self, target: &[LoopKind]) -> bool {
        if target.len() > self.loop_stack.len() {
            return false;
        }
        let depth = self.loop_stack.len();
        target.iter().enumerate().all(|(i, kind)| self.loop_stack[depth - 1 - i] == *kind)
    }

    fn parse_assignment_or_expr_stmt(&mut self, ctx: &mut Context) -> PResult<NodeId> {
        let start = self.current.span;
        // One unary operand first, *before* climbing through binary
        // operators: a bare `=` immediately after it is the assignment
        // separator, not the `Eq` comparison operator (see `climb`'s doc
        // comment). Anywhere else a postfix `=` shows up, it is climbed as
        // `Eq` like any other comparison.
        let lhs = self.parse_unary(ctx)?;
        let stmt = if self.eat(TokenKind::Assign, ctx).is_some() {
            let value = self.parse_expression(ctx, 0)?;
            self.ast.alloc(NodeKind::Assignment { target: lhs, value }, start.to(self.current.span))
        } else {
            let expr = self.climb(ctx, 0, lhs)?;
            self.ast.alloc(NodeKind::ExprStatement { expr }, start.to(self.current.span))
        };
        self.expect_end_of_stmt(ctx)?;
        Ok(stmt)
    }

    // -- expressions (precedence climbing, spec.md §4.2) -------------------

    fn parse_expression(&mut self, ctx: &mut Context, min_prec: u8) -> PResult<NodeId> {
        let lhs = self.parse_unary(ctx)?;
        self.climb(ctx, min_prec, lhs)
    }

    /// Continues precedence climbing from an already-parsed `lhs`.
    ///
    /// Split out from [`Self::parse_expression`] so statement parsing can
    /// look at one unary operand before deciding whether a following `=`
    /// is the assignment separator or the equality operator
    /// (`spec.md` §4.2: the lexer always emits one `Assign` token for `=`;
    /// the parser "replaces" it with the `Eq` comparison operator wherever
    /// it is not a statement's top-level assignment).
    fn climb(&mut self, ctx: &mut Context, min_prec: u8, mut lhs: NodeId) -> PResult<NodeId> {
        loop {
            let Some(op) = binary_op_for(self.current.kind) else { break };
            let info = lbc_ast::operator::binary_info(op);
            if info.precedence < min_prec {
                break;
            }
            let start = self.ast.span(lhs);
            self.bump(ctx);
            let next_min = match info.assoc {
                lbc_ast::Assoc::Left => info.precedence + 1,
                lbc_ast::Assoc::Right => info.precedence,
            };
            let rhs = self.parse_expression(ctx, next_min)?;
            let span = start.to(self.ast.span(rhs));
            lhs = self.ast.alloc(NodeKind::Binary { op, lhs, rhs }, span);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self, ctx: &mut Context) -> PResult<NodeId> {
        let start = self.current.span;
        match self.current.kind {
            TokenKind::Minus => {
                self.bump(ctx);
                let operand = self.parse_unary(ctx)?;
                Ok(self.ast.alloc(NodeKind::Unary { op: UnaryOp::Neg, operand }, start.to(self.ast.span(operand))))
            }
            TokenKind::Not => {
                self.bump(ctx);
                let operand = self.parse_unary(ctx)?;
                Ok(self.ast.alloc(NodeKind::Unary { op: UnaryOp::Not, operand }, start.to(self.ast.span(operand))))
            }
            TokenKind::Tilde => {
                self.bump(ctx);
                let operand = self.parse_unary(ctx)?;
                Ok(self.ast.alloc(NodeKind::Unary { op: UnaryOp::BitNot, operand }, start.to(self.ast.span(operand))))
            }
            TokenKind::At => {
                self.bump(ctx);
                let operand = self.parse_unary(ctx)?;
                Ok(self.ast.alloc(NodeKind::AddressOf { expr: operand }, start.to(self.ast.span(operand))))
            }
            TokenKind::Star => {
                self.bump(ctx);
                let operand = self.parse_unary(ctx)?;
                Ok(self.ast.alloc(NodeKind::Dereference { expr: operand }, start.to(self.ast.span(operand))))
            }
            _ => self.parse_postfix(ctx),
        }
    }

    fn parse_postfix(&mut self, ctx: &mut Context) -> PResult<NodeId> {
        let mut expr = self.parse_primary(ctx)?;
        loop {
            match self.current.kind {
                TokenKind::LParen => {
                    self.bump(ctx);
                    let mut args = Vec::new();
                    if !self.check(TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expression(ctx, 0)?);
                            if self.eat(TokenKind::Comma, ctx).is_none() {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RParen, ctx)?;
                    let span = self.ast.span(expr).to(self.current.span);
                    expr = self.ast.alloc(NodeKind::Call { callee: expr, args }, span);
                }
                TokenKind::Dot => {
                    self.bump(ctx);
                    let member = self.ident_symbol(ctx)?;
                    let span = self.ast.span(expr).to(self.current.span);
                    expr = self.ast.alloc(NodeKind::MemberAccess { base: expr, member }, span);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self, ctx: &mut Context) -> PResult<NodeId> {
        let start = self.current.span;
        match self.current.kind {
            TokenKind::IntegerLiteral => {
                let tok = self.bump(ctx);
                let TokLiteral::UInt(v) = tok.literal else { lbc_util::ice!("integer literal token without value") };
                Ok(self.ast.alloc(NodeKind::Literal { value: LiteralValue::Integer(v) }, tok.span))
            }
            TokenKind::FloatLiteral => {
                let tok = self.bump(ctx);
                let TokLiteral::Double(v) = tok.literal else { lbc_util::ice!("float literal token without value") };
                Ok(self.ast.alloc(NodeKind::Literal { value: LiteralValue::Float(v) }, tok.span))
            }
            TokenKind::BooleanLiteral => {
                let tok = self.bump(ctx);
                let TokLiteral::Bool(v) = tok.literal else { lbc_util::ice!("boolean literal token without value") };
                Ok(self.ast.alloc(NodeKind::Literal { value: LiteralValue::Bool(v) }, tok.span))
            }
            TokenKind::StringLiteral => {
                let tok = self.bump(ctx);
                let TokLiteral::Str(s) = tok.literal else { lbc_util::ice!("string literal token without value") };
                Ok(self.ast.alloc(NodeKind::Literal { value: LiteralValue::Str(s) }, tok.span))
            }
            TokenKind::NullLiteral => {
                let tok = self.bump(ctx);
                Ok(self.ast.alloc(NodeKind::Literal { value: LiteralValue::Null }, tok.span))
            }
            TokenKind::Identifier => {
                let name = self.ident_symbol(ctx)?;
                Ok(self.ast.alloc(NodeKind::Identifier { name }, start.to(self.current.span)))
            }
            TokenKind::Iif => {
                self.bump(ctx);
                self.expect(TokenKind::LParen, ctx)?;
                let condition = self.parse_expression(ctx, 0)?;
                self.expect(TokenKind::Comma, ctx)?;
                let then_value = self.parse_expression(ctx, 0)?;
                self.expect(TokenKind::Comma, ctx)?;
                let else_value = self.parse_expression(ctx, 0)?;
                self.expect(TokenKind::RParen, ctx)?;
                let span = start.to(self.current.span);
                Ok(self.ast.alloc(NodeKind::IfExpr { condition, then_value, else_value }, span))
            }
            TokenKind::LParen => {
                self.bump(ctx);
                let inner = self.parse_expression(ctx, 0)?;
                self.expect(TokenKind::RParen, ctx)?;
                Ok(inner)
            }
            kind if kind.is_type_keyword() => {
                // A type keyword in expression position is a cast:
                // `INTEGER(expr)` (`spec.md` §4.5's coercion-driven casts).
                let ty = self.parse_type_expr(ctx)?;
                self.expect(TokenKind::LParen, ctx)?;
                let expr = self.parse_expression(ctx, 0)?;
                self.expect(TokenKind::RParen, ctx)?;
                let span = start.to(self.current.span);
                Ok(self.ast.alloc(NodeKind::Cast { expr, ty, implicit: false }, span))
            }
            _ => {
                let tok = self.current.kind.describe().to_string();
                self.fatal(lbc_util::PARSE_UNEXPECTED_TOKEN, &["expression".to_string(), tok], ctx)
            }
        }
    }

    // -- type expressions -------------------------------------------------

    fn parse_type_expr(&mut self, ctx: &mut Context) -> PResult<NodeId> {
        let start = self.current.span;
        let base = match self.current.kind {
            TokenKind::Byte => TypeExprKind::Byte,
            TokenKind::UByte => TypeExprKind::UByte,
            TokenKind::Short => TypeExprKind::Short,
            TokenKind::UShort => TypeExprKind::UShort,
            TokenKind::Integer => TypeExprKind::Integer,
            TokenKind::UInteger => TypeExprKind::UInteger,
            TokenKind::Long => TypeExprKind::Long,
            TokenKind::ULong => TypeExprKind::ULong,
            TokenKind::Single => TypeExprKind::Single,
            TokenKind::Double => TypeExprKind::Double,
            TokenKind::Boolean => TypeExprKind::Boolean,
            TokenKind::ZString => TypeExprKind::ZString,
            TokenKind::AnyKw => TypeExprKind::Any,
            TokenKind::VoidKw => TypeExprKind::Void,
            TokenKind::Identifier => TypeExprKind::Named(self.ident_symbol(ctx)?),
            _ => return self.error_unexpected(TokenKind::Identifier, ctx),
        };
        if !matches!(base, TypeExprKind::Named(_)) {
            self.bump(ctx);
        }
        let mut pointer_depth = 0;
        while self.eat(TokenKind::Ptr, ctx).is_some() {
            pointer_depth += 1;
        }
        let span = start.to(self.current.span);
        Ok(self.ast.alloc(NodeKind::TypeExpr { base, pointer_depth }, span))
    }
}

fn binary_op_for(kind: TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Mod => BinaryOp::Mod,
        TokenKind::Caret => BinaryOp::Pow,
        TokenKind::Equal | TokenKind::Assign => BinaryOp::Eq,
        TokenKind::NotEqual => BinaryOp::Ne,
        TokenKind::Less => BinaryOp::Lt,
        TokenKind::LessEqual => BinaryOp::Le,
        TokenKind::Greater => BinaryOp::Gt,
        TokenKind::GreaterEqual => BinaryOp::Ge,
        TokenKind::And => BinaryOp::AndAlso,
        TokenKind::Or => BinaryOp::OrElse,
        _ => return None,
    })
}

fn cf_target_name(target: &[LoopKind]) -> String {
    target
        .iter()
        .map(|k| match k {
            LoopKind::For => "FOR",
            LoopKind::Do => "DO",
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lbc_ast::NodeKind;
    use lbc_util::FileId;

    fn parse(src: &str) -> (Ast, NodeId, Context) {
        let mut ctx = Context::new();
        let file = ctx.sources.add_file("t.bas", src.to_string());
        let _ = FileId::DUMMY;
        let parser = Parser::new(src, &mut ctx, file);
        let (ast, root) = parser.parse_module(&mut ctx).expect("parse failed");
        (ast, root, ctx)
    }

    #[test]
    fn var_decl_with_initializer() {
        let (ast, root, _ctx) = parse("DIM X AS INTEGER = 5\n");
        let NodeKind::Module { decls, .. } = ast.kind(root) else { panic!("expected module") };
        assert_eq!(decls.len(), 1);
        match ast.kind(decls[0]) {
            NodeKind::VarDecl { init: Some(_), .. } => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn assignment_is_distinguished_from_equality() {
        let src = "SUB F()\nDIM X AS INTEGER\nX = 1\nEND SUB\n";
        let (ast, root, _ctx) = parse(src);
        let NodeKind::Module { decls, .. } = ast.kind(root) else { panic!("expected module") };
        match ast.kind(decls[0]) {
            NodeKind::FunctionDecl { body: Some(body), .. } => match ast.kind(body[1]) {
                NodeKind::Assignment { .. } => {}
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn comparison_inside_if_uses_eq_not_assignment() {
        let src = "SUB F()\nIF 1 = 1 THEN\nEND IF\nEND SUB\n";
        let (ast, root, _ctx) = parse(src);
        let NodeKind::Module { decls, .. } = ast.kind(root) else { panic!("expected module") };
        match ast.kind(decls[0]) {
            NodeKind::FunctionDecl { body: Some(body), .. } => match ast.kind(body[0]) {
                NodeKind::If { branches, .. } => match ast.kind(branches[0].condition) {
                    NodeKind::Binary { op: BinaryOp::Eq, .. } => {}
                    other => panic!("unexpected {other:?}"),
                },
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn if_then_else_parses_both_branches() {
        let src = "SUB F()\nIF 1 = 1 THEN\nELSE\nEND IF\nEND SUB\n";
        let (ast, root, _ctx) = parse(src);
        let NodeKind::Module { decls, .. } = ast.kind(root) else { panic!("expected module") };
        match ast.kind(decls[0]) {
            NodeKind::FunctionDecl { body: Some(body), .. } => match ast.kind(body[0]) {
                NodeKind::If { branches, else_body } => {
                    assert_eq!(branches.len(), 1);
                    assert!(else_body.is_empty());
                }
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn function_with_body_and_return() {
        let src = "FUNCTION ADD(A AS INTEGER, B AS INTEGER) AS INTEGER\nRETURN A + B\nEND FUNCTION\n";
        let (ast, root, _ctx) = parse(src);
        let NodeKind::Module { decls, .. } = ast.kind(root) else { panic!("expected module") };
        assert_eq!(decls.len(), 1);
        match ast.kind(decls[0]) {
            NodeKind::FunctionDecl { params, body: Some(body), .. } => {
                assert_eq!(params.len(), 2);
                assert_eq!(body.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn for_loop_with_step() {
        let src = "FUNCTION F() AS INTEGER\nFOR I = 1 TO 10 STEP 2\nNEXT I\nRETURN 0\nEND FUNCTION\n";
        let (ast, root, _ctx) = parse(src);
        let NodeKind::Module { decls, .. } = ast.kind(root) else { panic!("expected module") };
        match ast.kind(decls[0]) {
            NodeKind::FunctionDecl { body: Some(body), .. } => match ast.kind(body[0]) {
                NodeKind::For { step: Some(_), .. } => {}
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn exit_for_outside_any_loop_is_rejected() {
        let mut ctx = Context::new();
        let src = "FUNCTION F() AS INTEGER\nEXIT FOR\nEND FUNCTION\n";
        let file = ctx.sources.add_file("t.bas", src.to_string());
        let parser = Parser::new(src, &mut ctx, file);
        let result = parser.parse_module(&mut ctx);
        assert!(result.is_err());
        assert!(ctx.diags.has_errors());
    }

    #[test]
    fn continue_do_do_targets_the_outer_loop() {
        let src = "SUB F()\nDO\nDO\nCONTINUE DO DO\nLOOP\nLOOP\nEND SUB\n";
        let (ast, root, _ctx) = parse(src);
        let NodeKind::Module { decls, .. } = ast.kind(root) else { panic!("expected module") };
        match ast.kind(decls[0]) {
            NodeKind::FunctionDecl { body: Some(body), .. } => match ast.kind(body[0]) {
                NodeKind::DoLoop { body: outer_body, .. } => match ast.kind(outer_body[0]) {
                    NodeKind::DoLoop { body: inner_body, .. } => match ast.kind(inner_body[0]) {
                        NodeKind::Continue { target } => assert_eq!(target, &[LoopKind::Do, LoopKind::Do]),
                        other => panic!("unexpected {other:?}"),
                    },
                    other => panic!("unexpected {other:?}"),
                },
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn continue_do_do_with_only_one_do_open_is_rejected() {
        let mut ctx = Context::new();
        let src = "SUB F()\nDO\nCONTINUE DO DO\nLOOP\nEND SUB\n";
        let file = ctx.sources.add_file("t.bas", src.to_string());
        let parser = Parser::new(src, &mut ctx, file);
        let result = parser.parse_module(&mut ctx);
        assert!(result.is_err());
        assert!(ctx.diags.has_errors());
    }

    #[test]
    fn null_literal_parses() {
        let src = "SUB F()\nDIM P AS INTEGER PTR = NULL\nEND SUB\n";
        let (ast, root, _ctx) = parse(src);
        let NodeKind::Module { decls, .. } = ast.kind(root) else { panic!("expected module") };
        match ast.kind(decls[0]) {
            NodeKind::FunctionDecl { body: Some(body), .. } => match ast.kind(body[0]) {
                NodeKind::VarDecl { init: Some(init), .. } => match ast.kind(*init) {
                    NodeKind::Literal { value: LiteralValue::Null } => {}
                    other => panic!("unexpected {other:?}"),
                },
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bracket_attribute_with_inline_alias_parses_declare() {
        let src = "DECLARE SUB puts ALIAS \"puts\" (S AS ZSTRING)\n";
        let (ast, root, _ctx) = parse(src);
        let NodeKind::Module { decls, .. } = ast.kind(root) else { panic!("expected module") };
        match ast.kind(decls[0]) {
            NodeKind::FunctionDecl { attributes, body: None, .. } => {
                assert!(matches!(attributes.as_slice(), [Attribute::Alias(_)]));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bracket_attribute_on_declare_parses() {
        let src = "[ALIAS = \"puts\"] DECLARE SUB puts (S AS ZSTRING)\n";
        let (ast, root, _ctx) = parse(src);
        let NodeKind::Module { decls, .. } = ast.kind(root) else { panic!("expected module") };
        match ast.kind(decls[0]) {
            NodeKind::FunctionDecl { attributes, body: None, .. } => {
                assert!(matches!(attributes.as_slice(), [Attribute::Alias(_)]));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn if_with_local_decl_and_comma_as_and() {
        let src = "FUNCTION F() AS INTEGER\nIF VAR X AS INTEGER = 1, X > 0 THEN\nEND IF\nRETURN 0\nEND FUNCTION\n";
        let (ast, root, _ctx) = parse(src);
        let NodeKind::Module { decls, .. } = ast.kind(root) else { panic!("expected module") };
        match ast.kind(decls[0]) {
            NodeKind::FunctionDecl { body: Some(body), .. } => match ast.kind(body[0]) {
                NodeKind::If { branches, .. } => {
                    assert_eq!(branches[0].decls.len(), 1);
                    match ast.kind(branches[0].condition) {
                        NodeKind::Binary { op: BinaryOp::AndAlso, .. } => {}
                        other => panic!("unexpected {other:?}"),
                    }
                }
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn type_decl_with_members() {
        let src = "TYPE POINT\nX AS INTEGER\nY AS INTEGER\nEND TYPE\n";
        let (ast, root, _ctx) = parse(src);
        let NodeKind::Module { decls, .. } = ast.kind(root) else { panic!("expected module") };
        match ast.kind(decls[0]) {
            NodeKind::TypeDecl { members, .. } => assert_eq!(members.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }
}
