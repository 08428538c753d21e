//! # docompiler
//!
//! Compiles a research object holding a LaTeX project into a PDF placed
//! next to the input, together with the compiler log.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod cli;

use clap::Parser;
use docompiler_runtime::{Compiler, Console};

use crate::cli::Cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))?;

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed arguments");

    let compiler = Compiler::new(cli.config());
    let mut stdout = std::io::stdout().lock();
    let mut stderr = std::io::stderr().lock();
    let status = compiler.run(&cli.documents, &mut Console::new(&mut stdout, &mut stderr));
    if status != 0 {
        std::process::exit(status);
    }
    Ok(())
}
