//! Command-line surface (`spec.md` §6), defined with `clap` derive
//! following the teacher's `faxt::Cli` (`SPEC_FULL.md` §B.3).
//!
//! `spec.md`'s flags are clang-style single-dash, multi-character options
//! (`-emit-llvm`, `-ast-dump`, `-O2`, ...) rather than the GNU double-dash
//! long options clap expects. Rather than hand-rolling an argv parser (the
//! teacher never needs one), [`normalize_argv`] rewrites any single-dash
//! token longer than one character into its double-dash form before clap
//! ever sees it, so the derive below can use ordinary `long` names.

use std::path::PathBuf;

use clap::Parser;

/// Rewrites e.g. `-emit-llvm` to `--emit-llvm` but leaves true one-character
/// short flags (`-c`, `-S`, `-g`, `-v`, `-o`) alone.
pub fn normalize_argv(args: impl IntoIterator<Item = String>) -> Vec<String> {
    args.into_iter()
        .map(|arg| {
            if arg.starts_with('-') && !arg.starts_with("--") && arg.len() > 2 {
                format!("-{arg}")
            } else {
                arg
            }
        })
        .collect()
}

#[derive(Parser, Debug)]
#[command(name = "lbc")]
#[command(author = "LightBASIC contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Ahead-of-time compiler for the LightBASIC language", long_about = None)]
pub struct Cli {
    /// Input files: `.bas` (source), `.s`/`.o`/`.ll`/`.bc` (already-lowered).
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output file path.
    #[arg(short = 'o')]
    pub output: Option<PathBuf>,

    /// Compile only, produce an object file.
    #[arg(short = 'c')]
    pub compile_only: bool,

    /// Emit assembly instead of an object file.
    #[arg(short = 'S')]
    pub emit_asm: bool,

    /// Combined with `-c`/`-S`, emit `.bc`/`.ll` instead of native code.
    #[arg(long = "emit-llvm")]
    pub emit_llvm: bool,

    #[arg(long = "O0")]
    pub o0: bool,
    #[arg(long = "OS")]
    pub os: bool,
    #[arg(long = "O1")]
    pub o1: bool,
    #[arg(long = "O2")]
    pub o2: bool,
    #[arg(long = "O3")]
    pub o3: bool,

    /// 32-bit target word size (default is 64-bit).
    #[arg(long = "m32")]
    pub m32: bool,
    /// 64-bit target word size (default).
    #[arg(long = "m64")]
    pub m64: bool,

    /// Include debug info.
    #[arg(short = 'g')]
    pub debug: bool,

    /// Verbose phase logging.
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Designates the file whose top-level declarations provide `MAIN`.
    #[arg(long = "main")]
    pub main_file: Option<PathBuf>,

    /// Disables implicit-main resolution.
    #[arg(long = "no-main")]
    pub no_main: bool,

    /// Path to the external LLVM toolchain (opt, llc, ld).
    #[arg(long = "toolchain")]
    pub toolchain: Option<PathBuf>,

    /// Dump the parsed AST as JSON instead of compiling.
    #[arg(long = "ast-dump")]
    pub ast_dump: bool,

    /// Dump an indented tree of the parsed AST instead of compiling.
    #[arg(long = "code-dump")]
    pub code_dump: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_multi_char_single_dash_flags() {
        let out = normalize_argv(["lbc", "-emit-llvm", "-ast-dump", "main.bas"].map(String::from));
        assert_eq!(out, vec!["lbc", "--emit-llvm", "--ast-dump", "main.bas"]);
    }

    #[test]
    fn leaves_true_short_flags_alone() {
        let out = normalize_argv(["lbc", "-c", "-S", "-g", "-v", "-o", "a.o"].map(String::from));
        assert_eq!(out, vec!["lbc", "-c", "-S", "-g", "-v", "-o", "a.o"]);
    }

    #[test]
    fn leaves_long_flags_and_positionals_alone() {
        let out = normalize_argv(["lbc", "--toolchain", "/opt/llvm", "main.bas"].map(String::from));
        assert_eq!(out, vec!["lbc", "--toolchain", "/opt/llvm", "main.bas"]);
    }
}
