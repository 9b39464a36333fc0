//! Diagnostic catalog - one fixed ID per distinct message shape, each with
//! positional placeholders (`spec.md` §6, "Diagnostic format").

/// A stable identifier for one diagnostic message template.
///
/// Mirrors the source's `Diagnostics.def.hpp` catalog: a fixed id plus a
/// message template using `{0}`, `{1}`, ... placeholders filled in by
/// [`super::DiagnosticBuilder::arg`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DiagnosticCode {
    pub id: &'static str,
    pub template: &'static str,
}

impl DiagnosticCode {
    pub const fn new(id: &'static str, template: &'static str) -> Self {
        Self { id, template }
    }

    /// Formats the template, substituting `{0}`, `{1}`, ... with `args` in
    /// order. Unknown placeholders are left as-is rather than panicking,
    /// since a malformed template is a compiler bug, not something a user
    /// diagnostic should crash over.
    pub fn format(&self, args: &[String]) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut chars = self.template.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '{' {
                let mut digits = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        digits.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if chars.peek() == Some(&'}') && !digits.is_empty() {
                    chars.next();
                    let idx: usize = digits.parse().unwrap_or(usize::MAX);
                    match args.get(idx) {
                        Some(s) => out.push_str(s),
                        None => {
                            out.push('{');
                            out.push_str(&digits);
                            out.push('}');
                        }
                    }
                    continue;
                }
                out.push('{');
                out.push_str(&digits);
            } else {
                out.push(c);
            }
        }
        out
    }
}

// ---------------------------------------------------------------------
// Lexical (spec.md §7 "Lexical errors")
// ---------------------------------------------------------------------
pub const LEX_INVALID_CHAR: DiagnosticCode =
    DiagnosticCode::new("lex0001", "unexpected character '{0}'");
pub const LEX_UNTERMINATED_STRING: DiagnosticCode =
    DiagnosticCode::new("lex0002", "unterminated string literal");
pub const LEX_BAD_ESCAPE: DiagnosticCode =
    DiagnosticCode::new("lex0003", "invalid escape sequence '\\{0}'");
pub const LEX_CONTROL_CHAR_IN_STRING: DiagnosticCode =
    DiagnosticCode::new("lex0004", "control character in string literal");

// ---------------------------------------------------------------------
// Syntactic (spec.md §7 "Syntactic errors")
// ---------------------------------------------------------------------
pub const PARSE_UNEXPECTED_TOKEN: DiagnosticCode =
    DiagnosticCode::new("par0001", "expected {0}, got {1}");
pub const PARSE_ILLEGAL_TOP_LEVEL: DiagnosticCode =
    DiagnosticCode::new("par0002", "statement not allowed at top level");
pub const PARSE_DECL_EXPECTED_AFTER_ATTRS: DiagnosticCode =
    DiagnosticCode::new("par0003", "expected a declaration after attribute list");
pub const PARSE_NESTED_FUNCTION: DiagnosticCode =
    DiagnosticCode::new("par0004", "nested function/sub declarations are not allowed");
pub const PARSE_VARIADIC_NOT_LAST: DiagnosticCode =
    DiagnosticCode::new("par0005", "variadic parameter '...' must be the last parameter");
pub const PARSE_INVALID_CF_TARGET: DiagnosticCode =
    DiagnosticCode::new("par0006", "'{0}' is not a valid target for {1}");

// ---------------------------------------------------------------------
// Semantic (spec.md §7 "Semantic errors")
// ---------------------------------------------------------------------
pub const SEM_UNDEFINED_IDENT: DiagnosticCode =
    DiagnosticCode::new("sem0001", "'{0}' is undefined");
pub const SEM_REDEFINITION: DiagnosticCode =
    DiagnosticCode::new("sem0002", "'{0}' is already defined in this scope");
pub const SEM_INCOMPATIBLE_TYPES: DiagnosticCode =
    DiagnosticCode::new("sem0003", "cannot convert '{0}' to '{1}'");
pub const SEM_ARG_COUNT_MISMATCH: DiagnosticCode =
    DiagnosticCode::new("sem0004", "expected {0} argument(s), got {1}");
pub const SEM_NOT_ASSIGNABLE: DiagnosticCode =
    DiagnosticCode::new("sem0005", "left-hand side of assignment is not assignable");
pub const SEM_RETURN_OUTSIDE_FUNCTION: DiagnosticCode =
    DiagnosticCode::new("sem0006", "RETURN is not valid here");
pub const SEM_NOT_CALLABLE: DiagnosticCode =
    DiagnosticCode::new("sem0008", "'{0}' is not callable");
pub const SEM_NOT_A_RECORD: DiagnosticCode =
    DiagnosticCode::new("sem0009", "'{0}' is not a record type and has no members");

// ---------------------------------------------------------------------
// Warnings (spec.md §7 "Warnings")
// ---------------------------------------------------------------------
pub const WARN_NARROWING: DiagnosticCode =
    DiagnosticCode::new("warn0001", "implicit narrowing conversion from '{0}' to '{1}'");
pub const WARN_ZERO_STEP: DiagnosticCode =
    DiagnosticCode::new("warn0002", "FOR loop STEP is zero");
pub const WARN_UNREACHABLE_FOR_BODY: DiagnosticCode =
    DiagnosticCode::new("warn0003", "FOR loop body is never executed");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_substitutes_positional_args() {
        let msg = PARSE_UNEXPECTED_TOKEN.format(&["IDENTIFIER".into(), "EOF".into()]);
        assert_eq!(msg, "expected IDENTIFIER, got EOF");
    }

    #[test]
    fn format_leaves_missing_placeholder_alone() {
        let msg = LEX_INVALID_CHAR.format(&[]);
        assert_eq!(msg, "unexpected character '{0}'");
    }
}
