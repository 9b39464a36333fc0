//! `lbc` - the LightBASIC compiler driver (`spec.md` §6, `SPEC_FULL.md`
//! §A "CLI / driver").
//!
//! Grounded on the teacher's `faxc-drv`/`faxt` split: library crates carry
//! typed errors, this binary speaks `anyhow` at its boundary, and logging
//! is `tracing` wired the way `faxt::main` wires it (`SPEC_FULL.md` §B.1,
//! §B.2). Unlike the teacher's driver, there is no HIR/MIR/LIR staging or
//! linking step here - `spec.md` §1 keeps toolchain invocation external,
//! so this binary's job ends at writing an object/assembly/IR file per
//! input.

mod ast_json;
mod cli;
mod config;
mod logging;
mod pipeline;

use clap::Parser as _;

use cli::Cli;
use config::Config;

/// Parses arguments, runs every input file through the pipeline, and
/// returns the process exit code (`spec.md` §6: "0 on success, 1 on any
/// failure").
pub fn run() -> i32 {
    run_with_args(std::env::args())
}

/// Same as [`run`], but takes its argv explicitly so integration tests can
/// drive the whole CLI without spawning a subprocess.
pub fn run_with_args(args: impl IntoIterator<Item = String>) -> i32 {
    let args = cli::normalize_argv(args);
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return e.exit_code();
        }
    };

    let verbose = cli.verbose;
    if let Err(e) = logging::init(verbose) {
        eprintln!("error: {e}");
        return 1;
    }

    let cfg = match Config::from_cli(&cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };

    if cfg.main_file.is_some() || cfg.no_main {
        tracing::debug!(
            main_file = ?cfg.main_file,
            no_main = cfg.no_main,
            "implicit-main resolution is limited to an explicit SUB MAIN \
             (lbc-par has no grammar for bare top-level statements)"
        );
    }

    let mut all_ok = true;
    for input in &cfg.inputs {
        match pipeline::compile_file(&cfg, input) {
            Ok(true) => {}
            Ok(false) => all_ok = false,
            Err(e) => {
                eprintln!("error: {e}");
                all_ok = false;
            }
        }
    }

    if all_ok {
        0
    } else {
        1
    }
}
