//! # docompiler-latex
//!
//! Drives the external typesetting toolchain for docompiler.
//!
//! Handles:
//! - **Toolchain**: Locating `latexmk` and building its command line.
//! - **Driver**: Running one compilation and streaming its merged output to a log.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod driver;
pub mod toolchain;

pub use driver::{CompileReport, compile_latex};
pub use toolchain::Toolchain;
