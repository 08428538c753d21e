//! Error taxonomy for the docompiler workspace.
//!
//! Every condition is fatal to the current run. Variants are raised close to
//! their source and carry the message shown to the user after `!!!`.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum DocompilerError {
    /// The tool was not invoked with exactly one input path.
    #[error("expect exactly one argument: the document object")]
    Usage {
        /// Number of arguments actually supplied.
        count: usize,
    },

    /// The input container does not exist.
    #[error("file {} does not exist", path.display())]
    InputNotFound {
        /// Path given on the command line.
        path: PathBuf,
    },

    /// The container or its manifest could not be read.
    #[error("invalid research object {}: {message}", path.display())]
    ContainerInvalid {
        /// Path of the container.
        path: PathBuf,
        /// Description of what could not be read.
        message: String,
    },

    /// An aggregate could not be materialized in the extraction directory.
    #[error("failed to extract {entry}: {cause}")]
    ExtractionFailed {
        /// Inner path of the offending aggregate.
        entry: String,
        /// Why the aggregate was not written.
        #[source]
        cause: ExtractionFailure,
    },

    /// No annotation marks a root document.
    #[error("could not find valid tex file (null)")]
    NoRootDocument,

    /// The annotated root document is not a `.tex` file.
    #[error("could not find valid tex file ({path})")]
    InvalidRootExtension {
        /// Subject path of the root annotation.
        path: String,
    },

    /// The annotated root document was not extracted.
    #[error("root tex file does not exist ({path})")]
    RootFileMissing {
        /// Root path with leading separators stripped.
        path: String,
    },

    /// A compiler log from an earlier run is in the way.
    #[error("log file exists. won't override it: {}", path.display())]
    LogAlreadyExists {
        /// Path of the existing log.
        path: PathBuf,
    },

    /// A PDF from an earlier run is in the way.
    #[error("target pdf file exists. won't override it: {}", path.display())]
    OutputAlreadyExists {
        /// Path of the existing PDF.
        path: PathBuf,
    },

    /// The toolchain exited with a non-zero status.
    #[error("compiling document object failed")]
    CompilationFailed {
        /// Exit code, absent when the process was killed by a signal.
        exit_code: Option<i32>,
        /// Log holding the toolchain output.
        log: PathBuf,
    },

    /// The toolchain program could not be located or started.
    #[error("typesetting toolchain {program} is unavailable: {message}")]
    ToolchainUnavailable {
        /// Configured program name or path.
        program: String,
        /// Reason reported by the lookup or spawn.
        message: String,
    },

    /// An I/O operation outside extraction failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Reason an aggregate could not be extracted.
#[derive(Debug, Error)]
pub enum ExtractionFailure {
    /// The inner path is empty, absolute, or climbs out of the target.
    #[error("path escapes the extraction directory")]
    UnsafePath,

    /// The manifest names a file the archive does not contain.
    #[error("no such entry in the archive")]
    MissingEntry,

    /// Reading the entry or writing the destination failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Destination or directory being written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl DocompilerError {
    /// Wraps an I/O error with the path it occurred at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, DocompilerError>;
