//! Command line definition.

use std::path::PathBuf;

use clap::Parser;
use docompiler_common::config::{CompilerConfig, ToolchainConfig};
use docompiler_common::constants::{DEFAULT_ENGINE, DEFAULT_TOOLCHAIN};

/// Compile a LaTeX research object into a PDF document.
#[derive(Parser, Debug)]
#[command(name = "docompiler", version, about, long_about = None)]
pub struct Cli {
    /// The research object containing the LaTeX project.
    ///
    /// Exactly one is expected; anything else is reported as a usage error.
    #[arg(value_name = "DOCUMENT_OBJECT")]
    pub documents: Vec<PathBuf>,

    /// Typesetting driver to invoke.
    #[arg(long, env = "DOCOMPILER_LATEXMK", default_value = DEFAULT_TOOLCHAIN)]
    pub latexmk: String,

    /// Engine command line the driver runs on every pass.
    #[arg(long, env = "DOCOMPILER_ENGINE", default_value = DEFAULT_ENGINE)]
    pub engine: String,

    /// Directory in which extraction directories are created.
    #[arg(long, env = "DOCOMPILER_TMPDIR")]
    pub temp_root: Option<PathBuf>,
}

impl Cli {
    /// Builds the compiler configuration for a command line run.
    pub fn config(&self) -> CompilerConfig {
        CompilerConfig {
            terminate_on_error: true,
            toolchain: ToolchainConfig {
                program: self.latexmk.clone(),
                engine: self.engine.clone(),
            },
            temp_root: self.temp_root.clone(),
        }
    }
}
