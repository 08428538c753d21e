//! Root document resolution.

use std::path::Path;

use docompiler_common::constants::{ROOT_DOC_ANNOTATION, TEX_EXTENSION};
use docompiler_common::error::{DocompilerError, Result};
use docompiler_common::types::{AnnotationEntry, RootDocument};

use crate::extract::{contained_path, decode_inner_path};

/// Returns the subject of the first annotation marked as root document.
pub fn resolve_root_document(annotations: &[AnnotationEntry]) -> Option<&str> {
    annotations
        .iter()
        .find(|annotation| annotation.content_id == ROOT_DOC_ANNOTATION)
        .map(|annotation| annotation.subject_path.as_str())
}

/// Checks a resolved root path against the extracted files.
///
/// # Errors
///
/// - `NoRootDocument` if nothing was resolved.
/// - `InvalidRootExtension` if the path does not end in `.tex`.
/// - `RootFileMissing` if the path, stripped of leading `/` and
///   percent-decoded, does not name a file inside `extraction_dir`.
pub fn validate_root_document(
    candidate: Option<&str>,
    extraction_dir: &Path,
) -> Result<RootDocument> {
    let Some(subject) = candidate else {
        return Err(DocompilerError::NoRootDocument);
    };
    if !subject.ends_with(TEX_EXTENSION) {
        return Err(DocompilerError::InvalidRootExtension {
            path: subject.to_string(),
        });
    }

    let relative = subject.trim_start_matches('/');
    let missing = || DocompilerError::RootFileMissing {
        path: relative.to_string(),
    };
    let decoded = decode_inner_path(relative).map_err(|_| missing())?;
    let root = RootDocument::new(&decoded).ok_or_else(missing)?;
    let on_disk = contained_path(extraction_dir, root.as_str()).map_err(|_| missing())?;
    if !on_disk.is_file() {
        return Err(missing());
    }

    tracing::info!(root = %root, "root document resolved");
    Ok(root)
}
