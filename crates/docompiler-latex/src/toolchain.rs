//! Toolchain discovery and command construction.

use std::path::{Path, PathBuf};
use std::process::Command;

use docompiler_common::config::ToolchainConfig;
use docompiler_common::error::{DocompilerError, Result};
use docompiler_common::types::RootDocument;

/// A located typesetting toolchain ready to be invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    program: PathBuf,
    engine: String,
}

impl Toolchain {
    /// Locates the configured program on `PATH` (or at its given path).
    ///
    /// # Errors
    ///
    /// Returns `ToolchainUnavailable` if the program cannot be found.
    pub fn locate(config: &ToolchainConfig) -> Result<Self> {
        let program =
            which::which(&config.program).map_err(|e| DocompilerError::ToolchainUnavailable {
                program: config.program.clone(),
                message: e.to_string(),
            })?;
        tracing::debug!(program = %program.display(), "toolchain located");
        Ok(Self::new(program, config.engine.clone()))
    }

    /// Creates a toolchain from an explicit program path.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, engine: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            engine: engine.into(),
        }
    }

    /// Returns the resolved program path.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments for one forced, non-interactive build of `root`.
    #[must_use]
    pub fn arguments(&self, root: &RootDocument) -> Vec<String> {
        vec![
            "-pdf".to_string(),
            "-f".to_string(),
            format!("-pdflatex={}", self.engine),
            root.as_str().to_string(),
        ]
    }

    /// Builds the command compiling `root` inside `workdir`.
    ///
    /// Standard streams are left to the caller.
    #[must_use]
    pub fn command(&self, workdir: &Path, root: &RootDocument) -> Command {
        let mut cmd = Command::new(&self.program);
        let _ = cmd.args(self.arguments(root)).current_dir(workdir);
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_force_non_interactive_shell_escape_build() {
        let toolchain = Toolchain::new(
            "/usr/bin/latexmk",
            "pdflatex -shell-escape -interaction=nonstopmode",
        );
        let root = RootDocument::new("/paper/main.tex").expect("root");
        assert_eq!(
            toolchain.arguments(&root),
            vec![
                "-pdf",
                "-f",
                "-pdflatex=pdflatex -shell-escape -interaction=nonstopmode",
                "paper/main.tex",
            ]
        );
    }

    #[test]
    fn command_runs_inside_workdir() {
        let toolchain = Toolchain::new("/usr/bin/latexmk", "pdflatex");
        let root = RootDocument::new("main.tex").expect("root");
        let cmd = toolchain.command(Path::new("/tmp/documentObject1"), &root);
        assert_eq!(cmd.get_program(), "/usr/bin/latexmk");
        assert_eq!(cmd.get_current_dir(), Some(Path::new("/tmp/documentObject1")));
        assert_eq!(cmd.get_args().count(), 4);
    }

    #[test]
    fn missing_program_is_unavailable() {
        let config = ToolchainConfig {
            program: "docompiler-no-such-toolchain-binary".into(),
            engine: "pdflatex".into(),
        };
        let err = Toolchain::locate(&config).expect_err("missing");
        assert!(matches!(err, DocompilerError::ToolchainUnavailable { .. }));
    }
}
