//! Failure reporting on the caller's output sinks.

use std::fmt::Display;
use std::io::Write;

use docompiler_common::constants::{BIN_NAME, USAGE_ARGUMENT};

/// The pair of sinks a run reports to.
///
/// The command line tool passes its standard streams; embedding code and
/// tests pass buffers.
pub struct Console<'a> {
    /// Progress lines and usage text.
    pub out: &'a mut dyn Write,
    /// Failure messages.
    pub err: &'a mut dyn Write,
}

impl<'a> Console<'a> {
    /// Creates a console over the two sinks.
    pub fn new(out: &'a mut dyn Write, err: &'a mut dyn Write) -> Self {
        Self { out, err }
    }
}

/// Reports a fatal condition: `!!! <message>` on the error sink, then usage.
pub fn die(console: &mut Console<'_>, message: &dyn Display) {
    let _ = writeln!(console.err, "!!! {message}");
    let _ = writeln!(console.err);
    let _ = console.err.flush();
    usage(console.out);
}

/// Writes the usage text.
pub fn usage(out: &mut dyn Write) {
    let _ = writeln!(out, "USAGE: {BIN_NAME} {USAGE_ARGUMENT}");
    let _ = writeln!(
        out,
        "\t{USAGE_ARGUMENT}\tthe research object containing the latex project"
    );
    let _ = out.flush();
}
