//! Read-only access to a Research Object bundle on disk.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use docompiler_common::constants::MANIFEST_PATH;
use docompiler_common::error::{DocompilerError, ExtractionFailure, Result};
use docompiler_common::types::{AggregateEntry, AnnotationEntry};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::manifest::{Container, Manifest, ManifestReader};

/// An opened research object.
///
/// The archive handle is owned exclusively and released when the value is
/// dropped, on every exit path.
pub struct ResearchObject {
    path: PathBuf,
    archive: ZipArchive<File>,
    manifest: Manifest,
}

impl ResearchObject {
    /// Opens the bundle at `path` read-only and parses its manifest.
    ///
    /// A bundle without a manifest document aggregates every file it holds
    /// and carries no annotations.
    ///
    /// # Errors
    ///
    /// Returns `ContainerInvalid` if the file is not a zip archive or the
    /// manifest cannot be read or parsed.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        tracing::info!(path = %path.display(), "opening research object");

        let file = File::open(path).map_err(|e| DocompilerError::io(path, e))?;
        let mut archive = ZipArchive::new(file).map_err(|e| invalid(path, &e))?;

        let manifest_bytes =
            read_entry(&mut archive, MANIFEST_PATH).map_err(|e| invalid(path, &e))?;
        let manifest = match manifest_bytes {
            Some(bytes) => Manifest::from_json(&bytes).map_err(|e| invalid(path, &e))?,
            None => {
                tracing::warn!(
                    path = %path.display(),
                    "bundle has no manifest, aggregating all files"
                );
                Manifest::from_listing(archive.file_names())
            }
        };

        tracing::debug!(
            aggregates = manifest.aggregates().len(),
            annotations = manifest.annotations().len(),
            "manifest loaded"
        );

        Ok(Self {
            path: path.to_path_buf(),
            archive,
            manifest,
        })
    }

    /// Returns the path the bundle was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for ResearchObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResearchObject")
            .field("path", &self.path)
            .field("entries", &self.archive.len())
            .field("manifest", &self.manifest)
            .finish_non_exhaustive()
    }
}

impl ManifestReader for ResearchObject {
    fn aggregates(&self) -> &[AggregateEntry] {
        self.manifest.aggregates()
    }

    fn annotations(&self) -> &[AnnotationEntry] {
        self.manifest.annotations()
    }
}

impl Container for ResearchObject {
    fn copy_file(
        &mut self,
        inner_path: &str,
        sink: &mut dyn Write,
    ) -> std::result::Result<u64, ExtractionFailure> {
        let name = inner_path.strip_prefix('/').unwrap_or(inner_path);
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) if !entry.is_dir() => entry,
            Ok(_) | Err(ZipError::FileNotFound) => return Err(ExtractionFailure::MissingEntry),
            Err(e) => {
                return Err(ExtractionFailure::Io {
                    path: self.path.join(name),
                    source: std::io::Error::other(e),
                });
            }
        };
        std::io::copy(&mut entry, sink).map_err(|e| ExtractionFailure::Io {
            path: self.path.join(name),
            source: e,
        })
    }
}

/// Reads a whole archive entry, `None` if the archive has no such entry.
fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> std::io::Result<Option<Vec<u8>>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(std::io::Error::other(e)),
    };
    let mut bytes = Vec::new();
    let _ = entry.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

fn invalid(path: &Path, cause: &dyn std::fmt::Display) -> DocompilerError {
    DocompilerError::ContainerInvalid {
        path: path.to_path_buf(),
        message: cause.to_string(),
    }
}
