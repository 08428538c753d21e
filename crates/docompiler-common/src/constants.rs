//! Fixed values shared by every stage of a compilation.

/// Annotation content identifying the root document of a research object.
pub const ROOT_DOC_ANNOTATION: &str = "http://binfalse.de#rootdocument";

/// Location of the manifest inside a Research Object bundle.
pub const MANIFEST_PATH: &str = ".ro/manifest.json";

/// Folder that relative manifest URIs are resolved against.
pub const MANIFEST_BASE: &str = "/.ro/";

/// Bundle-internal metadata folder, never aggregated implicitly.
pub const METADATA_DIR: &str = ".ro/";

/// Zip entry carrying the bundle media type.
pub const MIMETYPE_ENTRY: &str = "mimetype";

/// Extension a root document must carry.
pub const TEX_EXTENSION: &str = ".tex";

/// Extension of the compiler log written next to the input.
pub const LOG_EXTENSION: &str = "outlog";

/// Extension of the compiled artifact.
pub const PDF_EXTENSION: &str = "pdf";

/// Prefix of the per-invocation extraction directory.
pub const TEMP_DIR_PREFIX: &str = "documentObject";

/// Default typesetting driver.
pub const DEFAULT_TOOLCHAIN: &str = "latexmk";

/// Default engine command handed to the driver.
pub const DEFAULT_ENGINE: &str = "pdflatex -shell-escape -interaction=nonstopmode";

/// Exit status reported for every failure.
pub const EXIT_FAILURE: i32 = 2;

/// Binary name for the CLI.
pub const BIN_NAME: &str = "docompiler";

/// Placeholder naming the positional argument in usage output.
pub const USAGE_ARGUMENT: &str = "DOCUMENT_OBJECT";
