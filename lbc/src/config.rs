//! Resolved compiler configuration (`spec.md` §6), built once from [`Cli`]
//! - grounded on the teacher's `faxc_drv::Config`/`OptLevel`/`EmitType`,
//! reshaped around `spec.md`'s actual flag surface instead of the
//! teacher's HIR/MIR/LIR pipeline stages.

use std::path::PathBuf;

use anyhow::{bail, Result};
use inkwell::OptimizationLevel;

use crate::cli::Cli;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptLevel {
    O0,
    Os,
    O1,
    O2,
    O3,
}

impl OptLevel {
    pub fn to_inkwell(self) -> OptimizationLevel {
        match self {
            OptLevel::O0 => OptimizationLevel::None,
            OptLevel::Os => OptimizationLevel::Default,
            OptLevel::O1 => OptimizationLevel::Less,
            OptLevel::O2 => OptimizationLevel::Default,
            OptLevel::O3 => OptimizationLevel::Aggressive,
        }
    }
}

/// What a single invocation is asked to produce, derived from
/// `-c`/`-S`/`-emit-llvm`/`-ast-dump`/`-code-dump`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitKind {
    AstDump,
    CodeDump,
    Assembly,
    LlvmIr,
    Object,
    Bitcode,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub inputs: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub emit: EmitKind,
    pub opt_level: OptLevel,
    pub word_size: u32,
    pub debug: bool,
    pub verbose: bool,
    pub main_file: Option<PathBuf>,
    pub no_main: bool,
    pub toolchain: Option<PathBuf>,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let opt_flags = [cli.o0, cli.os, cli.o1, cli.o2, cli.o3];
        if opt_flags.iter().filter(|&&f| f).count() > 1 {
            bail!("at most one of -O0/-OS/-O1/-O2/-O3 may be given");
        }
        let opt_level = if cli.o0 {
            OptLevel::O0
        } else if cli.os {
            OptLevel::Os
        } else if cli.o1 {
            OptLevel::O1
        } else if cli.o3 {
            OptLevel::O3
        } else {
            OptLevel::O2
        };

        if cli.m32 && cli.m64 {
            bail!("-m32 and -m64 are mutually exclusive");
        }
        let word_size = if cli.m32 { 32 } else { 64 };

        if cli.main_file.is_some() && cli.no_main {
            bail!("-main and -no-main are mutually exclusive");
        }

        let emit = if cli.ast_dump {
            EmitKind::AstDump
        } else if cli.code_dump {
            EmitKind::CodeDump
        } else if cli.emit_asm {
            if cli.emit_llvm {
                EmitKind::LlvmIr
            } else {
                EmitKind::Assembly
            }
        } else if cli.compile_only {
            if cli.emit_llvm {
                EmitKind::Bitcode
            } else {
                EmitKind::Object
            }
        } else if cli.emit_llvm {
            EmitKind::LlvmIr
        } else {
            EmitKind::Object
        };

        if cli.output.is_some() && cli.inputs.len() > 1 && !matches!(emit, EmitKind::AstDump | EmitKind::CodeDump) {
            bail!("-o cannot name a single output for multiple input files");
        }

        Ok(Self {
            inputs: cli.inputs.clone(),
            output: cli.output.clone(),
            emit,
            opt_level,
            word_size,
            debug: cli.debug,
            verbose: cli.verbose,
            main_file: cli.main_file.clone(),
            no_main: cli.no_main,
            toolchain: cli.toolchain.clone(),
        })
    }

    /// The default LLVM target triple for the host, honoring `-m32`/`-m64`.
    pub fn target_triple(&self) -> String {
        let host = std::env::var("LBC_TARGET").unwrap_or_else(|_| default_host_triple());
        if self.word_size == 32 {
            host.replacen("x86_64", "i686", 1)
        } else {
            host
        }
    }
}

fn default_host_triple() -> String {
    if cfg!(target_os = "linux") {
        "x86_64-unknown-linux-gnu".to_string()
    } else if cfg!(target_os = "macos") {
        "x86_64-apple-darwin".to_string()
    } else if cfg!(target_os = "windows") {
        "x86_64-pc-windows-msvc".to_string()
    } else {
        "x86_64-unknown-unknown".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["lbc"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn defaults_to_o2_and_object_output() {
        let cfg = Config::from_cli(&cli(&["main.bas"])).unwrap();
        assert_eq!(cfg.opt_level, OptLevel::O2);
        assert_eq!(cfg.emit, EmitKind::Object);
        assert_eq!(cfg.word_size, 64);
    }

    #[test]
    fn rejects_conflicting_opt_levels() {
        assert!(Config::from_cli(&cli(&["--O1", "--O3", "main.bas"])).is_err());
    }

    #[test]
    fn emit_llvm_with_s_means_ir_not_asm() {
        let cfg = Config::from_cli(&cli(&["-S", "--emit-llvm", "main.bas"])).unwrap();
        assert_eq!(cfg.emit, EmitKind::LlvmIr);
    }

    #[test]
    fn rejects_shared_output_for_multiple_inputs() {
        assert!(Config::from_cli(&cli(&["-o", "a.o", "a.bas", "b.bas"])).is_err());
    }
}
