//! The compilation pipeline.
//!
//! A run moves linearly through [`Stage`]s and halts at the first failure,
//! which names the last stage reached. Nothing is rolled back: the
//! extraction directory and a written log stay on disk for inspection.

use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use docompiler_bundle::extract::extract_aggregates;
use docompiler_bundle::root::{resolve_root_document, validate_root_document};
use docompiler_bundle::{ManifestReader, ResearchObject};
use docompiler_common::config::CompilerConfig;
use docompiler_common::constants::{EXIT_FAILURE, LOG_EXTENSION, PDF_EXTENSION, TEMP_DIR_PREFIX};
use docompiler_common::error::{DocompilerError, Result};
use docompiler_common::types::RootDocument;
use docompiler_latex::{CompileReport, Toolchain, compile_latex};

use crate::report::{self, Console};

/// Progress of a run through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Nothing has happened yet.
    Start,
    /// The extraction directory exists.
    TempDirCreated,
    /// The input path exists.
    InputValidated,
    /// All aggregates are on disk and the container is closed.
    Extracted,
    /// The root annotation has been looked up.
    RootResolved,
    /// The root document is a `.tex` file present in the extraction directory.
    RootValidated,
    /// The compiler log path is free.
    LogPathValidated,
    /// The toolchain exited successfully.
    Compiled,
    /// The PDF has been copied next to the input.
    ArtifactPublished,
    /// The run finished.
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::TempDirCreated => "temp-dir-created",
            Self::InputValidated => "input-validated",
            Self::Extracted => "extracted",
            Self::RootResolved => "root-resolved",
            Self::RootValidated => "root-validated",
            Self::LogPathValidated => "log-path-validated",
            Self::Compiled => "compiled",
            Self::ArtifactPublished => "artifact-published",
            Self::Done => "done",
        };
        write!(f, "{name}")
    }
}

/// A halted run.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct Failure {
    /// Last stage completed before the failure.
    pub stage: Stage,
    /// What went wrong.
    #[source]
    pub error: DocompilerError,
}

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compilation {
    /// Directory the research object was extracted to.
    pub extraction_dir: PathBuf,
    /// The validated root document.
    pub root: RootDocument,
    /// Compiler log next to the input.
    pub log_file: PathBuf,
    /// Published PDF next to the input.
    pub pdf_file: PathBuf,
    /// Toolchain outcome.
    pub report: CompileReport,
}

/// Compiles research objects into PDF documents.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    /// Creates a compiler with the given configuration.
    #[must_use]
    pub const fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Runs the pipeline and reports the outcome on `console`.
    ///
    /// Returns the process exit status: `0` on success, `2` on failure.
    /// With `terminate_on_error` set, a failure exits the process instead
    /// of returning.
    pub fn run(&self, args: &[PathBuf], console: &mut Console<'_>) -> i32 {
        match self.compile(args, &mut *console.out) {
            Ok(compilation) => {
                tracing::info!(pdf = %compilation.pdf_file.display(), "compilation succeeded");
                0
            }
            Err(failure) => {
                tracing::debug!(stage = %failure.stage, error = %failure.error, "compilation halted");
                report::die(console, &failure.error);
                if self.config.terminate_on_error {
                    std::process::exit(EXIT_FAILURE);
                }
                EXIT_FAILURE
            }
        }
    }

    /// Runs the pipeline, writing progress lines to `out`.
    ///
    /// `args` must hold exactly one path: the research object to compile.
    /// The compiler log and the PDF are written next to it, named after the
    /// root document.
    ///
    /// # Errors
    ///
    /// Returns a [`Failure`] carrying the first condition that halted the
    /// run and the last stage reached.
    pub fn compile(
        &self,
        args: &[PathBuf],
        out: &mut dyn Write,
    ) -> std::result::Result<Compilation, Failure> {
        let mut progress = Progress::default();

        let [input] = args else {
            return Err(progress.fail(DocompilerError::Usage { count: args.len() }));
        };

        let extraction_dir = self.create_extraction_dir().map_err(|e| progress.fail(e))?;
        let _ = writeln!(out, ">>> tmp dir is: {}", extraction_dir.display());
        progress.advance(Stage::TempDirCreated);

        if !input.exists() {
            return Err(progress.fail(DocompilerError::InputNotFound {
                path: input.clone(),
            }));
        }
        progress.advance(Stage::InputValidated);

        let _ = writeln!(
            out,
            ">>> extracting research object {} to {}",
            input.display(),
            extraction_dir.display()
        );
        let candidate = extract(input, &extraction_dir, out).map_err(|e| progress.fail(e))?;
        progress.advance(Stage::Extracted);
        progress.advance(Stage::RootResolved);

        let root = validate_root_document(candidate.as_deref(), &extraction_dir)
            .map_err(|e| progress.fail(e))?;
        progress.advance(Stage::RootValidated);

        let target_dir = input.parent().unwrap_or_else(|| Path::new(""));
        let log_file = target_dir.join(root.sibling_name(LOG_EXTENSION));
        if log_file.exists() {
            return Err(progress.fail(DocompilerError::LogAlreadyExists { path: log_file }));
        }
        let _ = writeln!(
            out,
            ">>> compiler log will be available in {}",
            log_file.display()
        );
        let pdf_name = root.sibling_name(PDF_EXTENSION);
        progress.advance(Stage::LogPathValidated);

        let toolchain = Toolchain::locate(&self.config.toolchain).map_err(|e| progress.fail(e))?;
        let report = compile_latex(&toolchain, &extraction_dir, &root, &log_file)
            .map_err(|e| progress.fail(e))?;
        if !report.success {
            return Err(progress.fail(DocompilerError::CompilationFailed {
                exit_code: report.exit_code,
                log: log_file,
            }));
        }
        progress.advance(Stage::Compiled);

        let pdf_file = target_dir.join(&pdf_name);
        publish(&extraction_dir.join(&pdf_name), &pdf_file).map_err(|e| progress.fail(e))?;
        let _ = writeln!(
            out,
            ">>> final pdf will be available in {}",
            pdf_file.display()
        );
        let _ = writeln!(out, ">>> compilation done.");
        progress.advance(Stage::ArtifactPublished);
        progress.advance(Stage::Done);

        Ok(Compilation {
            extraction_dir,
            root,
            log_file,
            pdf_file,
            report,
        })
    }

    /// Creates a fresh extraction directory that outlives the run.
    fn create_extraction_dir(&self) -> Result<PathBuf> {
        let mut builder = tempfile::Builder::new();
        let _ = builder.prefix(TEMP_DIR_PREFIX);
        let dir = match &self.config.temp_root {
            Some(parent) => builder
                .tempdir_in(parent)
                .map_err(|e| DocompilerError::io(parent, e))?,
            None => builder
                .tempdir()
                .map_err(|e| DocompilerError::io(std::env::temp_dir(), e))?,
        };
        Ok(dir.keep())
    }
}

/// Tracks the current stage and tags failures with it.
#[derive(Debug)]
struct Progress {
    stage: Stage,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            stage: Stage::Start,
        }
    }
}

impl Progress {
    fn advance(&mut self, next: Stage) {
        tracing::debug!(from = %self.stage, to = %next, "stage reached");
        self.stage = next;
    }

    fn fail(&self, error: DocompilerError) -> Failure {
        Failure {
            stage: self.stage,
            error,
        }
    }
}

/// Extracts the bundle and returns the root annotation's subject.
///
/// The bundle is closed when this returns, whatever the outcome.
fn extract(input: &Path, target: &Path, out: &mut dyn Write) -> Result<Option<String>> {
    let mut bundle = ResearchObject::open_read_only(input)?;
    let _ = extract_aggregates(&mut bundle, target, |inner| {
        let _ = writeln!(out, "  > {inner}");
    })?;
    Ok(resolve_root_document(bundle.annotations()).map(str::to_string))
}

/// Copies the compiled PDF to `destination`, which must not exist.
fn publish(compiled: &Path, destination: &Path) -> Result<()> {
    if destination.exists() {
        return Err(DocompilerError::OutputAlreadyExists {
            path: destination.to_path_buf(),
        });
    }
    let mut source = File::open(compiled).map_err(|e| DocompilerError::io(compiled, e))?;
    let mut target = File::options()
        .write(true)
        .create_new(true)
        .open(destination)
        .map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                DocompilerError::OutputAlreadyExists {
                    path: destination.to_path_buf(),
                }
            } else {
                DocompilerError::io(destination, e)
            }
        })?;
    let bytes = std::io::copy(&mut source, &mut target)
        .map_err(|e| DocompilerError::io(destination, e))?;
    tracing::info!(pdf = %destination.display(), bytes, "artifact published");
    Ok(())
}
