//! Domain primitive types used across the docompiler workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::TEX_EXTENSION;

/// One file (or external resource) declared in a container manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateEntry {
    /// Slash-separated, bundle-root-relative path; `None` for non-file aggregates.
    pub inner_path: Option<String>,
    /// Declared media type, if any.
    pub media_type: Option<String>,
}

impl AggregateEntry {
    /// Creates an aggregate backed by a file inside the container.
    #[must_use]
    pub fn file(inner_path: impl Into<String>) -> Self {
        Self {
            inner_path: Some(inner_path.into()),
            media_type: None,
        }
    }

    /// Creates an aggregate that does not live inside the container.
    #[must_use]
    pub const fn external() -> Self {
        Self {
            inner_path: None,
            media_type: None,
        }
    }
}

/// A typed fact `(subject, content)` attached to a file in the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationEntry {
    /// Path of the annotated file, as written in the manifest.
    pub subject_path: String,
    /// Opaque content identifier.
    pub content_id: String,
}

impl AnnotationEntry {
    /// Creates an annotation entry.
    #[must_use]
    pub fn new(subject_path: impl Into<String>, content_id: impl Into<String>) -> Self {
        Self {
            subject_path: subject_path.into(),
            content_id: content_id.into(),
        }
    }
}

/// The validated root document of a compilation.
///
/// Holds the path relative to the extraction directory, without leading
/// separators, and always ending in `.tex`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RootDocument(String);

impl RootDocument {
    /// Wraps a relative `.tex` path, stripping any leading `/`.
    ///
    /// Returns `None` if the path does not end in `.tex` or is empty once
    /// the leading separators are removed.
    #[must_use]
    pub fn new(path: &str) -> Option<Self> {
        let relative = path.trim_start_matches('/');
        if !relative.ends_with(TEX_EXTENSION) || relative.is_empty() {
            return None;
        }
        Some(Self(relative.to_string()))
    }

    /// Returns the path relative to the extraction directory.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the file name with the `.tex` extension stripped.
    ///
    /// This is the job name of the toolchain and the base name of every
    /// artifact published next to the input.
    #[must_use]
    pub fn base_name(&self) -> &str {
        let file_name = self.0.rsplit('/').next().unwrap_or(&self.0);
        file_name.strip_suffix(TEX_EXTENSION).unwrap_or(file_name)
    }

    /// Returns `<base name>.<extension>`.
    #[must_use]
    pub fn sibling_name(&self, extension: &str) -> String {
        format!("{}.{extension}", self.base_name())
    }
}

impl fmt::Display for RootDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
