//! The LightBASIC lexer (`spec.md` §4.1).

use crate::cursor::Cursor;
use crate::token::{lookup_keyword, Literal, Token, TokenKind};
use lbc_util::{Context, FileId, Span};

/// Greedy, longest-match-first operator table. `spec.md` §4.1: "Operator
/// lexing is greedy by length (3 -> 2 -> 1 characters)."  Entries must be
/// sorted longest-first within each bucket; [`Lexer::lex_operator`] tries
/// 3-, then 2-, then 1-character prefixes of the remaining input.
const OPERATORS: &[(&str, TokenKind)] = &[
    ("<=", TokenKind::LessEqual),
    (">=", TokenKind::GreaterEqual),
    ("<>", TokenKind::NotEqual),
    ("<<", TokenKind::Shl),
    (">>", TokenKind::Shr),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("\\", TokenKind::Backslash),
    ("^", TokenKind::Caret),
    ("=", TokenKind::Assign),
    ("<", TokenKind::Less),
    (">", TokenKind::Greater),
    ("@", TokenKind::At),
    ("&", TokenKind::Ampersand),
    ("|", TokenKind::Pipe),
    ("~", TokenKind::Tilde),
];

/// Scans one source file into tokens.
///
/// Unlike the teacher's lexer, this one does not own its [`Context`]:
/// interning needs `&mut Context`, and so does everything downstream
/// (parsing, analysis), so the lexer borrows it one call at a time via
/// [`Lexer::next_token`] rather than for its own whole lifetime. That
/// lets a [`crate::Lexer`] and its caller share one `Context` without a
/// borrow-checker standoff.
pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    file: FileId,
    /// Set once a "real" token (not whitespace/comment) has been emitted on
    /// the current line; gates whether a newline produces `EndOfStmt`.
    /// `spec.md` §4.1: "Newline emits an EndOfStmt token only if the
    /// running 'has statement' flag is set (prevents blank-line statement
    /// terminators); then clears the flag."
    has_stmt: bool,
    at_eof: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, file: FileId) -> Self {
        Self { cursor: Cursor::new(source), file, has_stmt: false, at_eof: false }
    }

    fn span_from(&self, start: usize, start_line: u32, start_col: u32) -> Span {
        Span::new(start as u32, self.cursor.pos() as u32, start_line, start_col, self.file)
    }

    /// Returns the next token. Past end-of-file, keeps returning
    /// `EndOfFile` tokens indefinitely (`spec.md` §4.1).
    pub fn next_token(&mut self, ctx: &mut Context) -> Token {
        loop {
            if self.at_eof {
                return self.make_eof();
            }
            self.skip_horizontal_whitespace();

            if self.cursor.is_eof() {
                if self.has_stmt {
                    self.has_stmt = false;
                    let line = self.cursor.line();
                    let col = self.cursor.column();
                    return Token::new(TokenKind::EndOfStmt, Literal::None, Span::point(self.cursor.pos() as u32, line, col, self.file));
                }
                self.at_eof = true;
                return self.make_eof();
            }

            let c = self.cursor.current();

            if c == '\n' {
                self.cursor.advance();
                if self.has_stmt {
                    self.has_stmt = false;
                    return Token::new(TokenKind::EndOfStmt, Literal::None, self.span_from(self.cursor.pos() - 1, self.cursor.line() - 1, 1));
                }
                continue;
            }

            if c == '\r' {
                self.cursor.advance();
                continue;
            }

            if c == '\'' {
                self.skip_line_comment();
                continue;
            }

            if c == '/' && self.cursor.peek(1) == '\'' {
                self.skip_block_comment();
                continue;
            }

            if c == '_' && self.is_line_continuation() {
                self.consume_line_continuation();
                continue;
            }

            let start = self.cursor.pos();
            let start_line = self.cursor.line();
            let start_col = self.cursor.column();

            let token = if c.is_ascii_alphabetic() || c == '_' {
                self.lex_identifier(ctx, start, start_line, start_col)
            } else if c.is_ascii_digit() {
                self.lex_number(start, start_line, start_col)
            } else if c == '"' {
                self.lex_string(ctx, start, start_line, start_col)
            } else if c == '(' {
                self.cursor.advance();
                Token::new(TokenKind::LParen, Literal::None, self.span_from(start, start_line, start_col))
            } else if c == ')' {
                self.cursor.advance();
                Token::new(TokenKind::RParen, Literal::None, self.span_from(start, start_line, start_col))
            } else if c == '[' {
                self.cursor.advance();
                Token::new(TokenKind::LBracket, Literal::None, self.span_from(start, start_line, start_col))
            } else if c == ']' {
                self.cursor.advance();
                Token::new(TokenKind::RBracket, Literal::None, self.span_from(start, start_line, start_col))
            } else if c == ',' {
                self.cursor.advance();
                Token::new(TokenKind::Comma, Literal::None, self.span_from(start, start_line, start_col))
            } else if c == ':' {
                self.cursor.advance();
                Token::new(TokenKind::Colon, Literal::None, self.span_from(start, start_line, start_col))
            } else if c == '.' && !self.cursor.peek(1).is_ascii_digit() {
                self.cursor.advance();
                Token::new(TokenKind::Dot, Literal::None, self.span_from(start, start_line, start_col))
            } else {
                self.lex_operator(start, start_line, start_col)
            };

            self.has_stmt = true;
            return token;
        }
    }

    fn make_eof(&self) -> Token {
        Token::new(
            TokenKind::EndOfFile,
            Literal::None,
            Span::point(self.cursor.pos() as u32, self.cursor.line(), self.cursor.column(), self.file),
        )
    }

    fn skip_horizontal_whitespace(&mut self) {
        self.cursor.eat_while(|c| c == ' ' || c == '\t');
    }

    fn skip_line_comment(&mut self) {
        self.cursor.eat_while(|c| c != '\n');
    }

    /// `/' ... '/`, nestable via a depth counter (`spec.md` §4.1).
    fn skip_block_comment(&mut self) {
        self.cursor.advance(); // '/'
        self.cursor.advance(); // '\''
        let mut depth = 1u32;
        while depth > 0 && !self.cursor.is_eof() {
            if self.cursor.current() == '/' && self.cursor.peek(1) == '\'' {
                self.cursor.advance();
                self.cursor.advance();
                depth += 1;
            } else if self.cursor.current() == '\'' && self.cursor.peek(1) == '/' {
                self.cursor.advance();
                self.cursor.advance();
                depth -= 1;
            } else {
                self.cursor.advance();
            }
        }
    }

    /// A lone `_` immediately followed (modulo trailing horizontal
    /// whitespace) by a newline is a line-continuation marker.
    fn is_line_continuation(&self) -> bool {
        let mut n = 1;
        loop {
            match self.cursor.peek(n) {
                ' ' | '\t' => n += 1,
                '\r' => n += 1,
                '\n' | '\0' => return true,
                _ => return false,
            }
        }
    }

    fn consume_line_continuation(&mut self) {
        self.cursor.advance(); // '_'
        self.cursor.eat_while(|c| c == ' ' || c == '\t' || c == '\r');
        if self.cursor.current() == '\n' {
            self.cursor.advance();
        }
    }

    fn lex_identifier(&mut self, ctx: &mut Context, start: usize, line: u32, col: u32) -> Token {
        self.cursor.eat_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let raw = self.cursor.slice(start, self.cursor.pos());
        let upper = raw.to_ascii_uppercase();
        let span = self.span_from(start, line, col);
        if let Some(kind) = lookup_keyword(&upper) {
            if kind == TokenKind::True || kind == TokenKind::False {
                return Token::new(TokenKind::BooleanLiteral, Literal::Bool(kind == TokenKind::True), span);
            }
            if kind == TokenKind::Null {
                return Token::new(TokenKind::NullLiteral, Literal::None, span);
            }
            return Token::new(kind, Literal::None, span);
        }
        let sym = ctx.intern(&upper);
        Token::new(TokenKind::Identifier, Literal::Str(sym), span)
    }

    fn lex_number(&mut self, start: usize, line: u32, col: u32) -> Token {
        self.cursor.eat_while(|c| c.is_ascii_digit());
        let mut is_float = false;

        if self.cursor.current() == '.' && self.cursor.peek(1).is_ascii_digit() {
            is_float = true;
            self.cursor.advance();
            self.cursor.eat_while(|c| c.is_ascii_digit());
        }

        if matches!(self.cursor.current(), 'e' | 'E') {
            let save = self.cursor.pos();
            let mut lookahead = 1;
            if matches!(self.cursor.peek(lookahead), '+' | '-') {
                lookahead += 1;
            }
            if self.cursor.peek(lookahead).is_ascii_digit() {
                is_float = true;
                self.cursor.advance();
                if matches!(self.cursor.current(), '+' | '-') {
                    self.cursor.advance();
                }
                self.cursor.eat_while(|c| c.is_ascii_digit());
            } else {
                debug_assert_eq!(self.cursor.pos(), save);
            }
        }

        let raw = self.cursor.slice(start, self.cursor.pos());
        let span = self.span_from(start, line, col);
        if is_float {
            match raw.parse::<f64>() {
                Ok(v) => Token::new(TokenKind::FloatLiteral, Literal::Double(v), span),
                Err(_) => Token::new(TokenKind::Invalid, Literal::None, span),
            }
        } else {
            match raw.parse::<u64>() {
                Ok(v) => Token::new(TokenKind::IntegerLiteral, Literal::UInt(v), span),
                Err(_) => Token::new(TokenKind::Invalid, Literal::None, span),
            }
        }
    }

    fn lex_string(&mut self, ctx: &mut Context, start: usize, line: u32, col: u32) -> Token {
        self.cursor.advance(); // opening quote
        let mut value = String::new();
        loop {
            if self.cursor.is_eof() || self.cursor.current() == '\n' {
                return Token::new(TokenKind::Invalid, Literal::None, self.span_from(start, line, col));
            }
            let c = self.cursor.advance();
            if c == '"' {
                break;
            }
            if (c as u32) < 0x20 {
                return Token::new(TokenKind::Invalid, Literal::None, self.span_from(start, line, col));
            }
            if c == '\\' {
                let esc = self.cursor.advance();
                match esc {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    '\\' => value.push('\\'),
                    '"' => value.push('"'),
                    _ => return Token::new(TokenKind::Invalid, Literal::None, self.span_from(start, line, col)),
                }
            } else {
                value.push(c);
            }
        }
        let sym = ctx.intern(&value);
        Token::new(TokenKind::StringLiteral, Literal::Str(sym), self.span_from(start, line, col))
    }

    fn lex_operator(&mut self, start: usize, line: u32, col: u32) -> Token {
        for &len in &[3usize, 2, 1] {
            let mut candidate = String::new();
            for i in 0..len {
                let c = self.cursor.peek(i);
                if c == '\0' {
                    candidate.clear();
                    break;
                }
                candidate.push(c);
            }
            if candidate.is_empty() {
                continue;
            }
            if let Some(&(_, kind)) = OPERATORS.iter().find(|(op, _)| *op == candidate) {
                for _ in 0..len {
                    self.cursor.advance();
                }
                return Token::new(kind, Literal::None, self.span_from(start, line, col));
            }
        }
        self.cursor.advance();
        Token::new(TokenKind::Invalid, Literal::None, self.span_from(start, line, col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(ctx: &mut Context, source: &str) -> Vec<TokenKind> {
        let file = ctx.sources.add_file("t.bas", source.to_string());
        let mut lexer = Lexer::new(source, file);
        let mut kinds = Vec::new();
        loop {
            let tok = lexer.next_token(ctx);
            let is_eof = tok.kind == TokenKind::EndOfFile;
            kinds.push(tok.kind);
            if is_eof && kinds.iter().filter(|k| **k == TokenKind::EndOfFile).count() > 1 {
                break;
            }
            if is_eof {
                // one more pull to confirm indefinite EOF behavior, then stop
                let again = lexer.next_token(ctx);
                kinds.push(again.kind);
                break;
            }
        }
        kinds
    }

    #[test]
    fn blank_lines_do_not_emit_end_of_stmt() {
        let mut ctx = Context::new();
        let kinds = lex_all(&mut ctx, "\n\n\nDIM\n");
        assert_eq!(kinds, vec![TokenKind::Dim, TokenKind::EndOfStmt, TokenKind::EndOfFile, TokenKind::EndOfFile]);
    }

    #[test]
    fn identifiers_are_uppercased_and_interned() {
        let mut ctx = Context::new();
        let file = ctx.sources.add_file("t.bas", "myVar".to_string());
        let mut lexer = Lexer::new("myVar", file);
        let tok = lexer.next_token(&mut ctx);
        assert_eq!(tok.kind, TokenKind::Identifier);
        match tok.literal {
            Literal::Str(sym) => assert_eq!(ctx.resolve(sym), "MYVAR"),
            _ => panic!("expected identifier literal"),
        }
    }

    #[test]
    fn keyword_wins_over_identifier() {
        let mut ctx = Context::new();
        let file = ctx.sources.add_file("t.bas", "DIM".to_string());
        let mut lexer = Lexer::new("DIM", file);
        assert_eq!(lexer.next_token(&mut ctx).kind, TokenKind::Dim);
    }

    #[test]
    fn nested_block_comments() {
        let mut ctx = Context::new();
        let src = "/' outer /' inner '/ still outer '/ DIM";
        let file = ctx.sources.add_file("t.bas", src.to_string());
        let mut lexer = Lexer::new(src, file);
        assert_eq!(lexer.next_token(&mut ctx).kind, TokenKind::Dim);
    }

    #[test]
    fn line_continuation_suppresses_end_of_stmt() {
        let mut ctx = Context::new();
        let src = "DIM _\nx";
        let file = ctx.sources.add_file("t.bas", src.to_string());
        let mut lexer = Lexer::new(src, file);
        assert_eq!(lexer.next_token(&mut ctx).kind, TokenKind::Dim);
        assert_eq!(lexer.next_token(&mut ctx).kind, TokenKind::Identifier);
    }

    #[test]
    fn unterminated_string_is_invalid() {
        let mut ctx = Context::new();
        let src = "\"abc";
        let file = ctx.sources.add_file("t.bas", src.to_string());
        let mut lexer = Lexer::new(src, file);
        assert_eq!(lexer.next_token(&mut ctx).kind, TokenKind::Invalid);
    }

    #[test]
    fn float_literal_from_decimal_point() {
        let mut ctx = Context::new();
        let src = "3.14";
        let file = ctx.sources.add_file("t.bas", src.to_string());
        let mut lexer = Lexer::new(src, file);
        let tok = lexer.next_token(&mut ctx);
        assert_eq!(tok.kind, TokenKind::FloatLiteral);
        assert_eq!(tok.literal, Literal::Double(3.14));
    }

    #[test]
    fn integer_literal_stays_integer() {
        let mut ctx = Context::new();
        let src = "42";
        let file = ctx.sources.add_file("t.bas", src.to_string());
        let mut lexer = Lexer::new(src, file);
        let tok = lexer.next_token(&mut ctx);
        assert_eq!(tok.kind, TokenKind::IntegerLiteral);
        assert_eq!(tok.literal, Literal::UInt(42));
    }

    #[test]
    fn greedy_operator_lexing_prefers_longest_match() {
        let mut ctx = Context::new();
        let src = "<= < <>";
        let file = ctx.sources.add_file("t.bas", src.to_string());
        let mut lexer = Lexer::new(src, file);
        assert_eq!(lexer.next_token(&mut ctx).kind, TokenKind::LessEqual);
        assert_eq!(lexer.next_token(&mut ctx).kind, TokenKind::Less);
        assert_eq!(lexer.next_token(&mut ctx).kind, TokenKind::NotEqual);
    }

    #[test]
    fn null_keyword_lexes_as_null_literal() {
        let mut ctx = Context::new();
        let src = "NULL";
        let file = ctx.sources.add_file("t.bas", src.to_string());
        let mut lexer = Lexer::new(src, file);
        assert_eq!(lexer.next_token(&mut ctx).kind, TokenKind::NullLiteral);
    }

    #[test]
    fn square_brackets_lex_as_distinct_tokens() {
        let mut ctx = Context::new();
        let src = "[ALIAS]";
        let file = ctx.sources.add_file("t.bas", src.to_string());
        let mut lexer = Lexer::new(src, file);
        assert_eq!(lexer.next_token(&mut ctx).kind, TokenKind::LBracket);
        assert_eq!(lexer.next_token(&mut ctx).kind, TokenKind::Alias);
        assert_eq!(lexer.next_token(&mut ctx).kind, TokenKind::RBracket);
    }

    #[test]
    fn eof_is_returned_indefinitely() {
        let mut ctx = Context::new();
        let src = "";
        let file = ctx.sources.add_file("t.bas", src.to_string());
        let mut lexer = Lexer::new(src, file);
        assert_eq!(lexer.next_token(&mut ctx).kind, TokenKind::EndOfFile);
        assert_eq!(lexer.next_token(&mut ctx).kind, TokenKind::EndOfFile);
        assert_eq!(lexer.next_token(&mut ctx).kind, TokenKind::EndOfFile);
    }
}
