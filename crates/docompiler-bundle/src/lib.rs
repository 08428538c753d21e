//! # docompiler-bundle
//!
//! Research Object bundle handling for docompiler.
//!
//! Handles:
//! - **Manifest**: Reading aggregates and annotations from `.ro/manifest.json`.
//! - **Bundle**: Read-only access to the zip container backing a research object.
//! - **Extraction**: Materializing aggregates in a directory without escaping it.
//! - **Root**: Locating and validating the annotated root document.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod bundle;
pub mod extract;
pub mod manifest;
pub mod root;

pub use bundle::ResearchObject;
pub use manifest::{Container, ManifestReader};
