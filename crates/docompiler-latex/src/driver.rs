//! One-shot compilation with merged output logging.
//!
//! The toolchain's standard output and standard error are merged into a
//! single stream that is drained while the process runs, so a chatty
//! compiler never stalls on a full pipe. Every line is written to the log
//! in the order received.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use docompiler_common::error::{DocompilerError, Result};
use docompiler_common::types::RootDocument;

use crate::toolchain::Toolchain;

/// Outcome of a single toolchain invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileReport {
    /// True if and only if the toolchain exited with status zero.
    pub success: bool,
    /// Exit code, absent when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Number of lines written to the log.
    pub log_lines: usize,
}

/// Compiles `root` inside `workdir`, logging merged output to `log_file`.
///
/// The log must not exist yet; it is created before the toolchain starts.
/// A non-zero exit is not an error here, it is reported through
/// [`CompileReport::success`].
///
/// # Errors
///
/// Returns `LogAlreadyExists` if `log_file` is present, `ToolchainUnavailable`
/// if the process cannot be spawned, or `Io` if the log cannot be written.
pub fn compile_latex(
    toolchain: &Toolchain,
    workdir: &Path,
    root: &RootDocument,
    log_file: &Path,
) -> Result<CompileReport> {
    let mut log = LogSink::create(log_file)?;

    tracing::info!(
        program = %toolchain.program().display(),
        workdir = %workdir.display(),
        root = %root,
        "starting toolchain"
    );

    let cmd = toolchain.command(workdir, root);
    let status = run_merged(cmd, toolchain.program(), &mut log)?;
    let log_lines = log.finish()?;

    let report = CompileReport {
        success: status.success(),
        exit_code: status.code(),
        log_lines,
    };
    if report.success {
        tracing::info!(lines = log_lines, "toolchain finished");
    } else {
        tracing::warn!(exit_code = ?report.exit_code, lines = log_lines, "toolchain failed");
    }
    Ok(report)
}

/// Line-oriented writer for the compiler log.
struct LogSink {
    path: PathBuf,
    out: BufWriter<File>,
    lines: usize,
}

impl LogSink {
    fn create(path: &Path) -> Result<Self> {
        let file = File::options()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| {
                if e.kind() == ErrorKind::AlreadyExists {
                    DocompilerError::LogAlreadyExists {
                        path: path.to_path_buf(),
                    }
                } else {
                    DocompilerError::io(path, e)
                }
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
            lines: 0,
        })
    }

    /// Writes one line, normalizing its terminator to `\n`.
    fn write_line(&mut self, raw: &[u8]) -> Result<()> {
        let line = raw.strip_suffix(b"\n").unwrap_or(raw);
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        self.out
            .write_all(line)
            .and_then(|()| self.out.write_all(b"\n"))
            .map_err(|e| DocompilerError::io(&self.path, e))?;
        self.lines += 1;
        Ok(())
    }

    fn finish(mut self) -> Result<usize> {
        self.out
            .flush()
            .map_err(|e| DocompilerError::io(&self.path, e))?;
        Ok(self.lines)
    }
}

/// Splits `reader` into lines and hands each to the log until end of stream.
fn drain(reader: impl Read, program: &Path, log: &mut LogSink) -> Result<()> {
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|e| DocompilerError::io(program, e))?;
        if read == 0 {
            return Ok(());
        }
        log.write_line(&line)?;
    }
}

fn unavailable(program: &Path, e: &std::io::Error) -> DocompilerError {
    DocompilerError::ToolchainUnavailable {
        program: program.display().to_string(),
        message: e.to_string(),
    }
}

/// Waits for a child whose output could not be fully drained.
fn abandon(child: &mut std::process::Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Creates the shared output pipe with both ends closed on exec. Only the
/// duplicates installed as the child's stdout and stderr survive the spawn.
#[cfg(unix)]
fn merged_pipe() -> nix::Result<(std::os::fd::OwnedFd, std::os::fd::OwnedFd)> {
    #[cfg(not(target_vendor = "apple"))]
    {
        nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC)
    }
    #[cfg(target_vendor = "apple")]
    {
        use nix::fcntl::{FcntlArg, FdFlag, fcntl};

        let (reader, writer) = nix::unistd::pipe()?;
        for fd in [&reader, &writer] {
            let _ = fcntl(fd, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
        }
        Ok((reader, writer))
    }
}

/// Runs `cmd` with stdout and stderr sharing one pipe.
#[cfg(unix)]
fn run_merged(mut cmd: Command, program: &Path, log: &mut LogSink) -> Result<ExitStatus> {
    let (reader, writer) = merged_pipe().map_err(|e| DocompilerError::io(program, e.into()))?;
    let writer_err = writer
        .try_clone()
        .map_err(|e| DocompilerError::io(program, e))?;

    let _ = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::from(writer))
        .stderr(Stdio::from(writer_err));
    let spawned = cmd.spawn();
    // The command owns the parent's copies of the write end.
    drop(cmd);
    let mut child = spawned.map_err(|e| unavailable(program, &e))?;

    if let Err(e) = drain(File::from(reader), program, log) {
        abandon(&mut child);
        return Err(e);
    }
    child.wait().map_err(|e| DocompilerError::io(program, e))
}

/// Runs `cmd` draining stdout and stderr on reader threads into one channel.
#[cfg(not(unix))]
fn run_merged(mut cmd: Command, program: &Path, log: &mut LogSink) -> Result<ExitStatus> {
    use std::sync::mpsc;

    let _ = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd.spawn().map_err(|e| unavailable(program, &e))?;

    let (tx, rx) = mpsc::channel::<Vec<u8>>();
    let mut readers = Vec::new();
    let streams: [Option<Box<dyn Read + Send>>; 2] = [
        child.stdout.take().map(|s| Box::new(s) as Box<dyn Read + Send>),
        child.stderr.take().map(|s| Box::new(s) as Box<dyn Read + Send>),
    ];
    for stream in streams.into_iter().flatten() {
        let tx = tx.clone();
        readers.push(std::thread::spawn(move || {
            let mut reader = BufReader::new(stream);
            loop {
                let mut line = Vec::new();
                match reader.read_until(b'\n', &mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                }
            }
        }));
    }
    drop(tx);

    for line in rx {
        if let Err(e) = log.write_line(&line) {
            abandon(&mut child);
            return Err(e);
        }
    }
    for reader in readers {
        let _ = reader.join();
    }
    child.wait().map_err(|e| DocompilerError::io(program, e))
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    fn script(dir: &Path, body: &str) -> Toolchain {
        let path = dir.join("fake-latexmk");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod script");
        Toolchain::new(path, "pdflatex -shell-escape -interaction=nonstopmode")
    }

    fn setup() -> (tempfile::TempDir, PathBuf, RootDocument) {
        let dir = tempfile::tempdir().expect("tempdir");
        let work = dir.path().join("work");
        std::fs::create_dir(&work).expect("mkdir work");
        std::fs::write(work.join("main.tex"), "\\documentclass{article}").expect("write tex");
        let root = RootDocument::new("/main.tex").expect("root");
        (dir, work, root)
    }

    #[test]
    fn merged_pipe_ends_are_close_on_exec() {
        use nix::fcntl::{FcntlArg, FdFlag, fcntl};

        let (reader, writer) = merged_pipe().expect("pipe");
        for fd in [&reader, &writer] {
            let flags = fcntl(fd, FcntlArg::F_GETFD).expect("get fd flags");
            assert!(FdFlag::from_bits_truncate(flags).contains(FdFlag::FD_CLOEXEC));
        }
    }

    #[test]
    fn merges_stdout_and_stderr_in_emission_order() {
        let (dir, work, root) = setup();
        let toolchain = script(
            dir.path(),
            "echo 'This is pdfTeX'\necho 'warning on stderr' >&2\necho 'Output written'",
        );
        let log = dir.path().join("main.outlog");

        let report = compile_latex(&toolchain, &work, &root, &log).expect("compile");

        assert!(report.success);
        assert_eq!(report.exit_code, Some(0));
        assert_eq!(report.log_lines, 3);
        let content = std::fs::read_to_string(&log).expect("read log");
        assert_eq!(content, "This is pdfTeX\nwarning on stderr\nOutput written\n");
    }

    #[test]
    fn non_zero_exit_is_reported_not_raised() {
        let (dir, work, root) = setup();
        let toolchain = script(dir.path(), "echo '! Undefined control sequence.'\nexit 12");
        let log = dir.path().join("main.outlog");

        let report = compile_latex(&toolchain, &work, &root, &log).expect("compile");

        assert!(!report.success);
        assert_eq!(report.exit_code, Some(12));
        assert!(log.exists());
    }

    #[test]
    fn runs_in_workdir_with_fixed_arguments() {
        let (dir, work, root) = setup();
        let toolchain = script(dir.path(), "pwd\nfor arg in \"$@\"; do echo \"$arg\"; done");
        let log = dir.path().join("main.outlog");

        let _ = compile_latex(&toolchain, &work, &root, &log).expect("compile");

        let content = std::fs::read_to_string(&log).expect("read log");
        let lines: Vec<&str> = content.lines().collect();
        let cwd = std::fs::canonicalize(&work).expect("canonicalize");
        assert_eq!(
            std::fs::canonicalize(lines[0]).expect("canonicalize pwd"),
            cwd
        );
        assert_eq!(
            &lines[1..],
            &[
                "-pdf",
                "-f",
                "-pdflatex=pdflatex -shell-escape -interaction=nonstopmode",
                "main.tex",
            ]
        );
    }

    #[test]
    fn existing_log_stops_before_toolchain_runs() {
        let (dir, work, root) = setup();
        let marker = dir.path().join("ran");
        let toolchain = script(dir.path(), &format!("touch '{}'", marker.display()));
        let log = dir.path().join("main.outlog");
        std::fs::write(&log, "previous run").expect("write log");

        let err = compile_latex(&toolchain, &work, &root, &log).expect_err("log exists");

        assert!(matches!(err, DocompilerError::LogAlreadyExists { .. }));
        assert!(!marker.exists());
        assert_eq!(std::fs::read_to_string(&log).expect("read"), "previous run");
    }

    #[test]
    fn carriage_returns_are_normalized() {
        let (dir, work, root) = setup();
        let toolchain = script(dir.path(), "printf 'first\\r\\nsecond'");
        let log = dir.path().join("main.outlog");

        let report = compile_latex(&toolchain, &work, &root, &log).expect("compile");

        assert_eq!(report.log_lines, 2);
        assert_eq!(
            std::fs::read_to_string(&log).expect("read"),
            "first\nsecond\n"
        );
    }

    #[test]
    fn large_output_does_not_stall_the_child() {
        let (dir, work, root) = setup();
        let toolchain = script(
            dir.path(),
            "i=0\nwhile [ $i -lt 20000 ]; do echo \"Overfull hbox in paragraph $i\"; echo \"stderr $i\" >&2; i=$((i+1)); done",
        );
        let log = dir.path().join("main.outlog");

        let report = compile_latex(&toolchain, &work, &root, &log).expect("compile");

        assert!(report.success);
        assert_eq!(report.log_lines, 40_000);
    }

    #[test]
    fn unspawnable_program_is_unavailable() {
        let (dir, work, root) = setup();
        let toolchain = Toolchain::new(dir.path().join("does-not-exist"), "pdflatex");
        let log = dir.path().join("main.outlog");

        let err = compile_latex(&toolchain, &work, &root, &log).expect_err("spawn");

        assert!(matches!(err, DocompilerError::ToolchainUnavailable { .. }));
    }
}
