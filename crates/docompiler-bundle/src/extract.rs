//! Extraction of aggregated files into a working directory.
//!
//! Inner paths come from untrusted archive content. They are percent-decoded
//! segment by segment, and every destination is built from normal path
//! components only, so no entry can be written outside the target directory.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use docompiler_common::error::{DocompilerError, ExtractionFailure, Result};
use percent_encoding::percent_decode_str;

use crate::manifest::Container;

/// Copies every file-backed aggregate of `container` below `target`.
///
/// Aggregates without an inner path are skipped. `on_entry` is called with
/// each inner path just before it is written. Files written before a failure
/// stay on disk.
///
/// # Errors
///
/// Returns `ExtractionFailed` if an inner path escapes `target`, the archive
/// lacks a declared file, or any directory or file cannot be written.
pub fn extract_aggregates<C>(
    container: &mut C,
    target: &Path,
    mut on_entry: impl FnMut(&str),
) -> Result<Vec<PathBuf>>
where
    C: Container + ?Sized,
{
    tracing::info!(target = %target.display(), "extracting aggregates");

    let inner_paths: Vec<String> = container
        .aggregates()
        .iter()
        .filter_map(|aggregate| aggregate.inner_path.clone())
        .collect();

    let mut written = Vec::with_capacity(inner_paths.len());
    for inner in inner_paths {
        on_entry(&inner);
        let destination = extract_one(container, &inner, target).map_err(|cause| {
            DocompilerError::ExtractionFailed {
                entry: inner.clone(),
                cause,
            }
        })?;
        tracing::debug!(entry = %inner, destination = %destination.display(), "aggregate extracted");
        written.push(destination);
    }

    tracing::info!(files = written.len(), "extraction complete");
    Ok(written)
}

fn extract_one<C>(
    container: &mut C,
    inner: &str,
    target: &Path,
) -> std::result::Result<PathBuf, ExtractionFailure>
where
    C: Container + ?Sized,
{
    let relative = decode_inner_path(inner)?;
    let destination = contained_path(target, &relative)?;
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ExtractionFailure::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let file = File::options()
        .write(true)
        .create_new(true)
        .open(&destination)
        .map_err(|e| ExtractionFailure::Io {
            path: destination.clone(),
            source: e,
        })?;
    let mut sink = BufWriter::new(file);
    let _ = container.copy_file(&format!("/{relative}"), &mut sink)?;
    sink.flush().map_err(|e| ExtractionFailure::Io {
        path: destination.clone(),
        source: e,
    })?;
    Ok(destination)
}

/// Turns a manifest inner path into a decoded relative path.
///
/// A single leading `/` is stripped, then each segment is percent-decoded.
/// A segment that decodes to invalid UTF-8 or contains `/`, a backslash or NUL
/// cannot name a single path component.
///
/// # Errors
///
/// Returns [`ExtractionFailure::UnsafePath`] for an undecodable segment.
pub fn decode_inner_path(inner: &str) -> std::result::Result<String, ExtractionFailure> {
    let relative = inner.strip_prefix('/').unwrap_or(inner);
    let mut segments = Vec::new();
    for segment in relative.split('/') {
        let decoded = percent_decode_str(segment)
            .decode_utf8()
            .map_err(|_| ExtractionFailure::UnsafePath)?;
        if decoded.contains(['/', '\\', '\0']) {
            return Err(ExtractionFailure::UnsafePath);
        }
        segments.push(decoded.into_owned());
    }
    Ok(segments.join("/"))
}

/// Joins the decoded `relative` path below `root`, refusing anything that
/// could leave it.
///
/// The path must be non-empty and consist of normal components (`.` is
/// ignored); `..`, a root, or a drive prefix are rejected.
///
/// # Errors
///
/// Returns [`ExtractionFailure::UnsafePath`] for a rejected path.
pub fn contained_path(
    root: &Path,
    relative: &str,
) -> std::result::Result<PathBuf, ExtractionFailure> {
    if relative.contains(['\\', '\0']) {
        return Err(ExtractionFailure::UnsafePath);
    }

    let mut destination = root.to_path_buf();
    let mut depth = 0usize;
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => {
                destination.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ExtractionFailure::UnsafePath);
            }
        }
    }

    if depth == 0 {
        return Err(ExtractionFailure::UnsafePath);
    }
    Ok(destination)
}
