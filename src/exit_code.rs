//! Exit-code classification for `iscsiadm`
//!
//! `iscsiadm` reports "nothing matched" and "already in that state" through
//! the same non-zero exit path as real failures. [`BENIGN_EXIT_CODES`] is the
//! one place that says which codes mean success for which operation.

use crate::command::CommandOutput;
use crate::error::{exit_code_name, IscsiError};
use std::io;
use std::time::Duration;

/// No records/targets/sessions/portals found
pub const ISCSI_ERR_NO_OBJS_FOUND: i32 = 21;
/// Session already exists
pub const ISCSI_ERR_SESS_EXISTS: i32 = 15;
/// Shell/chroot "command not found"
pub const EXIT_COMMAND_NOT_FOUND: i32 = 127;

/// Logical operation an `iscsiadm` invocation performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Discovery,
    Login,
    Logout,
    Rescan,
    Sessions,
    Nodes,
    NodeQuery,
    NodeCreate,
    NodeUpdate,
    NodeDelete,
}

/// Exit codes that mean the operation logically succeeded
pub const BENIGN_EXIT_CODES: &[(Operation, i32)] = &[
    // no targets behind the portal
    (Operation::Discovery, ISCSI_ERR_NO_OBJS_FOUND),
    // already logged in
    (Operation::Login, ISCSI_ERR_SESS_EXISTS),
    // already logged out
    (Operation::Logout, ISCSI_ERR_NO_OBJS_FOUND),
    (Operation::Sessions, ISCSI_ERR_NO_OBJS_FOUND),
    (Operation::Nodes, ISCSI_ERR_NO_OBJS_FOUND),
    // record does not exist yet
    (Operation::NodeQuery, ISCSI_ERR_NO_OBJS_FOUND),
    // already deleted
    (Operation::NodeDelete, ISCSI_ERR_NO_OBJS_FOUND),
];

/// Normalized result of one invocation
#[derive(Debug)]
pub enum Outcome {
    /// Exit 0; stdout carries the payload
    Success(CommandOutput),
    /// Benign non-zero exit; nothing to report
    BenignEmpty,
    Failure(IscsiError),
}

impl Outcome {
    /// Collapse into a result, mapping benign exits to `None`
    pub fn into_result(self) -> Result<Option<CommandOutput>, IscsiError> {
        match self {
            Outcome::Success(out) => Ok(Some(out)),
            Outcome::BenignEmpty => Ok(None),
            Outcome::Failure(err) => Err(err),
        }
    }
}

/// Whether `code` is a benign exit for `op`
pub fn is_benign(op: Operation, code: i32) -> bool {
    BENIGN_EXIT_CODES
        .iter()
        .any(|&(o, c)| o == op && c == code)
}

/// Map a runner result to success, benign-empty or failure
///
/// `timeout` is only used to describe a timed-out run.
pub fn classify(
    op: Operation,
    result: io::Result<CommandOutput>,
    timeout: Option<Duration>,
) -> Outcome {
    let output = match result {
        Ok(output) => output,
        Err(err) => return Outcome::Failure(spawn_error(err, timeout)),
    };

    match output.exit_code {
        Some(0) => Outcome::Success(output),
        Some(code) if is_benign(op, code) => {
            log::debug!(
                "{:?}: treating exit code {} ({}) as success",
                op,
                code,
                exit_code_name(code)
            );
            Outcome::BenignEmpty
        }
        Some(EXIT_COMMAND_NOT_FOUND) => {
            Outcome::Failure(IscsiError::ToolUnavailable(output.message()))
        }
        code => {
            let message = output.message();
            log::warn!(
                "{:?} failed with {}: {}",
                op,
                code.map_or("signal", exit_code_name),
                message
            );
            Outcome::Failure(IscsiError::ToolFailure { code, message })
        }
    }
}

fn spawn_error(err: io::Error, timeout: Option<Duration>) -> IscsiError {
    match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
            IscsiError::ToolUnavailable(err.to_string())
        }
        io::ErrorKind::TimedOut => IscsiError::Timeout(timeout.unwrap_or_default()),
        _ => IscsiError::Io(err),
    }
}
