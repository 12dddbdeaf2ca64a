//! Subprocess execution with live output forwarding.
//!
//! Both child pipes are drained concurrently so that a chatty stream can
//! never fill its pipe buffer and stall the child while the other is read.

use super::{BuildStep, StepRunner};
use camino::Utf8Path;
use log::{debug, warn};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

/// Runs build steps as child processes, forwarding their output to this
/// process's stdout and stderr line by line.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemStepRunner;

impl StepRunner for SystemStepRunner {
    fn run(&self, step: &BuildStep, working_dir: &Utf8Path) -> io::Result<ExitStatus> {
        let mut command = Command::new(&step.program);
        command.args(&step.args).current_dir(working_dir);
        debug!("running {} in {working_dir}", step.command_line());

        let mut stdout = io::stdout();
        let mut stderr = io::stderr();
        run_streaming(command, &mut stdout, &mut stderr)
    }
}

/// Spawn `command` and forward its stdout and stderr into the given sinks as
/// each line arrives.
///
/// Each stream is drained by its own scoped thread and every forwarded line
/// is flushed immediately. Failures writing to a sink do not stop draining;
/// they are logged once the child has exited.
///
/// # Errors
///
/// Returns an error if the child cannot be spawned or waited on.
pub fn run_streaming(
    mut command: Command,
    stdout_sink: &mut (dyn Write + Send),
    stderr_sink: &mut (dyn Write + Send),
) -> io::Result<ExitStatus> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = command.spawn()?;
    let child_stdout = child.stdout.take();
    let child_stderr = child.stderr.take();

    let (stdout_result, stderr_result) = thread::scope(|scope| {
        let out = scope.spawn(move || forward_lines(child_stdout, stdout_sink));
        let err = scope.spawn(move || forward_lines(child_stderr, stderr_sink));
        (join_forwarder(out), join_forwarder(err))
    });

    let status = child.wait()?;
    for (stream, result) in [("stdout", stdout_result), ("stderr", stderr_result)] {
        if let Err(err) = result {
            warn!("build {stream} could not be forwarded: {err}");
        }
    }
    Ok(status)
}

fn join_forwarder(handle: thread::ScopedJoinHandle<'_, io::Result<()>>) -> io::Result<()> {
    handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("output forwarding thread panicked")))
}

/// Copy `source` into `sink` one line at a time, flushing after each line.
///
/// Keeps reading after a sink failure so the child never blocks on a full
/// pipe, and reports the first failure at the end. A read failure discards
/// the rest of the stream instead of abandoning the pipe.
fn forward_lines<R: Read>(source: Option<R>, sink: &mut dyn Write) -> io::Result<()> {
    let Some(source) = source else {
        return Ok(());
    };
    let mut reader = BufReader::new(source);
    let mut line = Vec::new();
    let mut first_error = None;

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                if io::copy(&mut reader, &mut io::sink()).is_err() {
                    debug!("pipe still unreadable after read error; giving up");
                }
                return Err(first_error.unwrap_or(err));
            }
        }
        if first_error.is_some() {
            continue;
        }
        if let Err(err) = sink.write_all(&line).and_then(|()| sink.flush()) {
            first_error = Some(err);
        }
    }

    first_error.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Fails its first read, then serves `data`.
    struct FlakyReader<'a> {
        failed: bool,
        data: &'a [u8],
    }

    impl Read for FlakyReader<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.failed {
                self.failed = true;
                return Err(io::Error::other("transient"));
            }
            self.data.read(buf)
        }
    }

    #[test]
    fn forward_lines_drains_pipe_after_read_error() {
        let mut reader = FlakyReader {
            failed: false,
            data: b"left\nin\npipe\n",
        };
        let mut sink = Vec::new();

        let err = forward_lines(Some(&mut reader), &mut sink).expect_err("read error reported");

        assert_eq!(err.to_string(), "transient");
        assert!(reader.data.is_empty(), "pipe was not drained");
        assert!(sink.is_empty());
    }

    #[test]
    fn forward_lines_copies_every_line() {
        let mut sink = Vec::new();
        forward_lines(Some(b"one\ntwo\nthree".as_slice()), &mut sink).expect("forward");
        assert_eq!(sink, b"one\ntwo\nthree");
    }

    #[test]
    fn forward_lines_without_source_is_a_no_op() {
        let mut sink = Vec::new();
        forward_lines(None::<&[u8]>, &mut sink).expect("forward");
        assert!(sink.is_empty());
    }

    #[test]
    fn forward_lines_reports_sink_failure_after_draining() {
        let result = forward_lines(Some(b"a\nb\n".as_slice()), &mut FailingSink);
        let err = result.expect_err("sink failure should be reported");
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[cfg(unix)]
    #[test]
    fn run_streaming_separates_stdout_and_stderr() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo configured; echo warning >&2; exit 3"]);
        let mut out = Vec::new();
        let mut err = Vec::new();

        let status = run_streaming(command, &mut out, &mut err).expect("spawn sh");

        assert_eq!(status.code(), Some(3));
        assert_eq!(String::from_utf8_lossy(&out), "configured\n");
        assert_eq!(String::from_utf8_lossy(&err), "warning\n");
    }

    #[cfg(unix)]
    #[test]
    fn run_streaming_drains_large_output_on_both_streams() {
        let mut command = Command::new("sh");
        command.args([
            "-c",
            "i=0; while [ $i -lt 5000 ]; do echo out$i; echo err$i >&2; i=$((i+1)); done",
        ]);
        let mut out = Vec::new();
        let mut err = Vec::new();

        let status = run_streaming(command, &mut out, &mut err).expect("spawn sh");

        assert!(status.success());
        assert_eq!(String::from_utf8_lossy(&out).lines().count(), 5000);
        assert_eq!(String::from_utf8_lossy(&err).lines().count(), 5000);
    }

    #[test]
    fn run_streaming_reports_spawn_failure() {
        let command = Command::new("relbuild-definitely-missing-program");
        let mut out = Vec::new();
        let mut err = Vec::new();
        let result = run_streaming(command, &mut out, &mut err);
        assert_eq!(
            result.expect_err("missing program").kind(),
            io::ErrorKind::NotFound
        );
    }
}
