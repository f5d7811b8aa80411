//! Command construction and the process invocation boundary
//!
//! The client never spawns processes itself: it builds an argument vector
//! with [`build_iscsi_command`] and hands it to a [`CommandRunner`]. The
//! production runner is [`SystemRunner`]; tests substitute their own.

use crate::initiator::{Options, CHROOT_DIRECTORY};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Executable used to run the tool inside another root
pub const CHROOT: &str = "chroot";

/// Name of the open-iscsi administration tool
pub const ISCSIADM: &str = "iscsiadm";

/// How often a running child is polled for exit
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Prefix `argv` with `chroot <dir>` when a chroot directory is configured
pub fn build_iscsi_command(options: &Options, argv: &[String]) -> Vec<String> {
    match chroot_directory(options) {
        Some(dir) => {
            let mut command = Vec::with_capacity(argv.len() + 2);
            command.push(CHROOT.to_string());
            command.push(dir.to_string());
            command.extend_from_slice(argv);
            command
        }
        None => argv.to_vec(),
    }
}

/// Resolve a host path the client reads directly, honouring the chroot
pub fn resolve_path(options: &Options, path: &str) -> PathBuf {
    match chroot_directory(options) {
        Some(dir) => Path::new(dir).join(path.trim_start_matches('/')),
        None => PathBuf::from(path),
    }
}

fn chroot_directory(options: &Options) -> Option<&str> {
    options
        .get(CHROOT_DIRECTORY)
        .map(String::as_str)
        .filter(|dir| !dir.is_empty())
}

/// Raw result of one finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// Output of a process that exited 0 after printing `stdout`
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: Vec::new(),
            exit_code: Some(0),
        }
    }

    /// Output of a process that exited with `code` after printing `stderr`
    pub fn failure(code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: Vec::new(),
            stderr: stderr.into(),
            exit_code: Some(code),
        }
    }

    /// The tool's own diagnostic text: stderr, or stdout when stderr is empty
    pub fn message(&self) -> String {
        let stderr = String::from_utf8_lossy(&self.stderr);
        let stderr = stderr.trim();
        if stderr.is_empty() {
            String::from_utf8_lossy(&self.stdout).trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Runs an argument vector to completion
///
/// Implementations return `Err` only when the process could not be run or
/// did not finish in time; a non-zero exit is a successful `Ok` with the
/// code recorded in [`CommandOutput::exit_code`].
pub trait CommandRunner: Send + Sync {
    fn run(&self, argv: &[String], timeout: Option<Duration>) -> io::Result<CommandOutput>;
}

/// Runs commands on the local host with `std::process`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, argv: &[String], timeout: Option<Duration>) -> io::Result<CommandOutput> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain both pipes while waiting so a chatty child cannot block on a
        // full pipe buffer.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let start = Instant::now();
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None => {
                    if let Some(limit) = timeout {
                        if start.elapsed() > limit {
                            let _ = child.kill();
                            let _ = child.wait();
                            return Err(io::Error::new(
                                io::ErrorKind::TimedOut,
                                format!("{} timed out after {:?}", program, limit),
                            ));
                        }
                    }
                    thread::sleep(POLL_INTERVAL);
                }
            }
        };

        Ok(CommandOutput {
            stdout: collect(stdout),
            stderr: collect(stderr),
            exit_code: status.code(),
        })
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<thread::JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}
