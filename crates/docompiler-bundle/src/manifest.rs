//! Manifest reading for Research Object bundles.
//!
//! The manifest is a JSON-LD document at `.ro/manifest.json`. Only the two
//! lists the compiler consumes are modelled: `aggregates` (files packaged in
//! or referenced by the bundle) and `annotations` (facts about those files).

use std::io::Write;

use docompiler_common::constants::{MANIFEST_BASE, METADATA_DIR, MIMETYPE_ENTRY};
use docompiler_common::error::ExtractionFailure;
use docompiler_common::types::{AggregateEntry, AnnotationEntry};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::Deserialize;

/// Characters escaped when an archive name is turned into a manifest path.
const LISTING_ESCAPES: &AsciiSet = &CONTROLS.add(b'%');

/// Read-only view of a container manifest.
pub trait ManifestReader {
    /// Aggregates in manifest order.
    fn aggregates(&self) -> &[AggregateEntry];

    /// Annotations in manifest order.
    fn annotations(&self) -> &[AnnotationEntry];
}

/// A container whose aggregated files can be read back.
pub trait Container: ManifestReader {
    /// Copies the bytes of the file at `inner_path` into `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionFailure::MissingEntry`] if the container holds no
    /// such file, or [`ExtractionFailure::Io`] if reading or writing fails.
    fn copy_file(
        &mut self,
        inner_path: &str,
        sink: &mut dyn Write,
    ) -> Result<u64, ExtractionFailure>;
}

/// Parsed manifest of a research object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    aggregates: Vec<AggregateEntry>,
    annotations: Vec<AnnotationEntry>,
}

impl Manifest {
    /// Builds a manifest from already-known entries.
    #[must_use]
    pub const fn new(aggregates: Vec<AggregateEntry>, annotations: Vec<AnnotationEntry>) -> Self {
        Self {
            aggregates,
            annotations,
        }
    }

    /// Parses the JSON manifest document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON or its
    /// `aggregates`/`annotations` members have an unexpected shape.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        let raw: RawManifest = serde_json::from_slice(bytes)?;

        let aggregates = raw
            .aggregates
            .into_iter()
            .map(RawAggregate::into_entry)
            .collect();

        let annotations = raw
            .annotations
            .into_iter()
            .flat_map(RawAnnotation::into_entries)
            .collect();

        Ok(Self {
            aggregates,
            annotations,
        })
    }

    /// Synthesizes a manifest from an archive listing.
    ///
    /// Used for bundles without a manifest document: every file becomes an
    /// aggregate except the media type marker and bundle metadata, and there
    /// are no annotations. Names are percent-encoded so they decode back to
    /// the archive entry.
    pub fn from_listing<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let aggregates = names
            .into_iter()
            .filter(|name| !name.ends_with('/'))
            .filter(|name| *name != MIMETYPE_ENTRY && !name.starts_with(METADATA_DIR))
            .map(|name| {
                let encoded = utf8_percent_encode(name, LISTING_ESCAPES);
                AggregateEntry::file(format!("/{encoded}"))
            })
            .collect();
        Self {
            aggregates,
            annotations: Vec::new(),
        }
    }
}

impl ManifestReader for Manifest {
    fn aggregates(&self) -> &[AggregateEntry] {
        &self.aggregates
    }

    fn annotations(&self) -> &[AnnotationEntry] {
        &self.annotations
    }
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    aggregates: Vec<RawAggregate>,
    #[serde(default)]
    annotations: Vec<RawAnnotation>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAggregate {
    Uri(String),
    Record {
        #[serde(alias = "file")]
        uri: Option<String>,
        mediatype: Option<String>,
    },
}

impl RawAggregate {
    fn into_entry(self) -> AggregateEntry {
        let (uri, media_type) = match self {
            Self::Uri(uri) => (Some(uri), None),
            Self::Record { uri, mediatype } => (uri, mediatype),
        };
        AggregateEntry {
            inner_path: uri.as_deref().and_then(inner_path),
            media_type,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawAnnotation {
    about: Option<OneOrMany>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl RawAnnotation {
    fn into_entries(self) -> Vec<AnnotationEntry> {
        let (Some(about), Some(content)) = (self.about, self.content) else {
            tracing::debug!("skipping annotation without subject or content");
            return Vec::new();
        };
        let subjects = match about {
            OneOrMany::One(subject) => vec![subject],
            OneOrMany::Many(subjects) => subjects,
        };
        subjects
            .into_iter()
            .map(|subject| {
                let subject = inner_path(&subject).unwrap_or(subject);
                AnnotationEntry::new(subject, content.clone())
            })
            .collect()
    }
}

/// Maps a manifest URI to a bundle-internal path.
///
/// URIs with a scheme are external resources and have no inner path.
/// Absolute paths are kept verbatim; relative references are resolved
/// against the manifest folder. Percent-escapes are left in place and decoded
/// at extraction.
fn inner_path(uri: &str) -> Option<String> {
    if uri.is_empty() || has_scheme(uri) {
        return None;
    }
    if uri.starts_with('/') {
        return Some(uri.to_string());
    }
    Some(resolve_relative(MANIFEST_BASE, uri))
}

/// Returns true if `uri` starts with an RFC 3986 scheme followed by `:`.
fn has_scheme(uri: &str) -> bool {
    let Some((scheme, _)) = uri.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Resolves `reference` against the absolute folder `base`.
///
/// `.` segments are dropped and `..` consumes one folder. A `..` with
/// nothing left to consume is kept so that later containment checks see it.
fn resolve_relative(base: &str, reference: &str) -> String {
    let mut segments: Vec<&str> = base
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    let mut pending = reference.split('/').peekable();
    while let Some(segment) = pending.next() {
        match segment {
            "." => {}
            ".." if segments.last().is_some_and(|s| *s != "..") => {
                let _ = segments.pop();
            }
            "" if pending.peek().is_some() => {}
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "@context": ["https://w3id.org/bundle/context"],
        "id": "/",
        "manifest": ["manifest.json"],
        "aggregates": [
            { "uri": "/main.tex", "mediatype": "text/x-tex" },
            { "uri": "../figures/plot.png" },
            { "uri": "http://example.org/dataset.csv" },
            "/chapters/intro.tex"
        ],
        "annotations": [
            { "uri": "urn:uuid:1", "about": "/main.tex", "content": "http://binfalse.de#rootdocument" },
            { "about": ["/a.tex", "/b.tex"], "content": "urn:other" },
            { "about": "/orphan.tex" }
        ]
    }"#;

    #[test]
    fn parses_aggregates_in_order() {
        let manifest = Manifest::from_json(SAMPLE.as_bytes()).expect("parse");
        let paths: Vec<_> = manifest
            .aggregates()
            .iter()
            .map(|a| a.inner_path.as_deref())
            .collect();
        assert_eq!(
            paths,
            vec![
                Some("/main.tex"),
                Some("/figures/plot.png"),
                None,
                Some("/chapters/intro.tex"),
            ]
        );
        assert_eq!(
            manifest.aggregates()[0].media_type.as_deref(),
            Some("text/x-tex")
        );
    }

    #[test]
    fn expands_multi_subject_annotations_and_skips_incomplete_ones() {
        let manifest = Manifest::from_json(SAMPLE.as_bytes()).expect("parse");
        let annotations = manifest.annotations();
        assert_eq!(annotations.len(), 3);
        assert_eq!(
            annotations[0],
            AnnotationEntry::new("/main.tex", "http://binfalse.de#rootdocument")
        );
        assert_eq!(annotations[1].subject_path, "/a.tex");
        assert_eq!(annotations[2].subject_path, "/b.tex");
    }

    #[test]
    fn legacy_file_key_is_accepted() {
        let manifest =
            Manifest::from_json(br#"{ "aggregates": [{ "file": "/doc.tex" }] }"#).expect("parse");
        assert_eq!(
            manifest.aggregates()[0].inner_path.as_deref(),
            Some("/doc.tex")
        );
    }

    #[test]
    fn missing_lists_default_to_empty() {
        let manifest = Manifest::from_json(b"{}").expect("parse");
        assert!(manifest.aggregates().is_empty());
        assert!(manifest.annotations().is_empty());
    }

    #[test]
    fn malformed_manifest_is_an_error() {
        assert!(Manifest::from_json(b"{ not json").is_err());
        assert!(Manifest::from_json(br#"{ "aggregates": 42 }"#).is_err());
    }

    #[test]
    fn listing_skips_metadata_and_directories() {
        let manifest = Manifest::from_listing([
            "mimetype",
            ".ro/manifest.json",
            "main.tex",
            "figures/",
            "figures/plot.png",
        ]);
        let paths: Vec<_> = manifest
            .aggregates()
            .iter()
            .filter_map(|a| a.inner_path.as_deref())
            .collect();
        assert_eq!(paths, vec!["/main.tex", "/figures/plot.png"]);
        assert!(manifest.annotations().is_empty());
    }

    #[test]
    fn scheme_detection() {
        assert!(has_scheme("http://example.org/x"));
        assert!(has_scheme("urn:uuid:1234"));
        assert!(has_scheme("app://bundle/main.tex"));
        assert!(!has_scheme("/main.tex"));
        assert!(!has_scheme("chapters/intro.tex"));
        assert!(!has_scheme("1abc:def"));
    }

    #[test]
    fn relative_references_resolve_against_manifest_folder() {
        assert_eq!(resolve_relative("/.ro/", "../main.tex"), "/main.tex");
        assert_eq!(resolve_relative("/.ro/", "annotations/a.ttl"), "/.ro/annotations/a.ttl");
        assert_eq!(resolve_relative("/.ro/", "./../a/./b.tex"), "/a/b.tex");
    }

    #[test]
    fn climbing_above_root_keeps_parent_segments() {
        assert_eq!(resolve_relative("/.ro/", "../../etc/passwd"), "/../etc/passwd");
    }

    #[test]
    fn annotation_subjects_resolve_like_aggregates() {
        let manifest = Manifest::from_json(
            br#"{ "annotations": [
                { "about": "../main.tex", "content": "http://binfalse.de#rootdocument" },
                { "about": ["/abs.tex", "notes/a.txt", "urn:uuid:42"], "content": "urn:other" }
            ] }"#,
        )
        .expect("parse");
        let subjects: Vec<_> = manifest
            .annotations()
            .iter()
            .map(|a| a.subject_path.as_str())
            .collect();
        assert_eq!(
            subjects,
            vec!["/main.tex", "/abs.tex", "/.ro/notes/a.txt", "urn:uuid:42"]
        );
    }

    #[test]
    fn listing_escapes_percent_signs() {
        let manifest = Manifest::from_listing(["100%.tex", "my figure.png"]);
        let paths: Vec<_> = manifest
            .aggregates()
            .iter()
            .filter_map(|a| a.inner_path.as_deref())
            .collect();
        assert_eq!(paths, vec!["/100%25.tex", "/my figure.png"]);
    }
}
