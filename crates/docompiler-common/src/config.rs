//! Configuration model for a compilation run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Whether a reported failure terminates the process.
    ///
    /// Embedding code and tests turn this off to keep the process alive and
    /// inspect the returned failure instead.
    pub terminate_on_error: bool,
    /// External typesetting toolchain settings.
    pub toolchain: ToolchainConfig,
    /// Parent directory for extraction directories; system temp dir if unset.
    pub temp_root: Option<PathBuf>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            terminate_on_error: true,
            toolchain: ToolchainConfig::default(),
            temp_root: None,
        }
    }
}

impl CompilerConfig {
    /// Returns a configuration that reports failures without exiting.
    #[must_use]
    pub fn embedded() -> Self {
        Self {
            terminate_on_error: false,
            ..Self::default()
        }
    }
}

/// Settings for the external typesetting toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Program name or path of the driver (resolved through `PATH`).
    pub program: String,
    /// Engine command line the driver runs on every pass.
    pub engine: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            program: crate::constants::DEFAULT_TOOLCHAIN.to_string(),
            engine: crate::constants::DEFAULT_ENGINE.to_string(),
        }
    }
}
