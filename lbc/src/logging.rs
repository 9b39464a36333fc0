//! Logging bootstrap (`SPEC_FULL.md` §B.2), wired exactly as the teacher's
//! `faxt::main::init_logging`: an `EnvFilter` seeded from `-v`/`RUST_LOG`,
//! installed once at process startup.

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "warn" })
    });

    let fmt_layer = fmt::layer().with_target(false).with_thread_ids(false).with_thread_names(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))
}
