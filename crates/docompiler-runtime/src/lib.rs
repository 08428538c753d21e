//! # docompiler-runtime
//!
//! The compilation pipeline turning a research object into a PDF.
//!
//! [`Compiler`] sequences extraction, root document validation, the
//! typesetting toolchain and artifact publishing, stopping at the first
//! failure. [`report`] renders failures the way the command line tool
//! shows them.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod pipeline;
pub mod report;

pub use pipeline::{Compilation, Compiler, Failure, Stage};
pub use report::Console;
