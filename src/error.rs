//! Error types for iSCSI initiator operations

use std::time::Duration;
use thiserror::Error;

/// iSCSI initiator errors
#[derive(Debug, Error)]
pub enum IscsiError {
    #[error("error invalid IP or portal address: {0}")]
    InvalidAddress(String),

    #[error("error invalid IQN: {0}")]
    InvalidIqn(String),

    #[error("iSCSI utilities are not installed: {0}")]
    ToolUnavailable(String),

    /// Non-zero exit that is not benign for the operation. `message` is the
    /// tool's own output, untouched.
    #[error("iscsiadm failed ({}): {message}", describe_status(.code))]
    ToolFailure { code: Option<i32>, message: String },

    #[error("iscsiadm did not finish within {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Induced(String),
}

impl IscsiError {
    /// True for errors raised before any process was spawned
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, IscsiError::InvalidAddress(_) | IscsiError::InvalidIqn(_))
    }

    /// Exit code reported by the tool, if this is a tool failure
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            IscsiError::ToolFailure { code, .. } => *code,
            _ => None,
        }
    }
}

fn describe_status(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {}", c),
        None => "terminated by signal".to_string(),
    }
}

/// Result type for initiator operations
pub type IscsiResult<T> = Result<T, IscsiError>;

/// Name an open-iscsi exit code (`iscsi_err.h`) for log output
pub fn exit_code_name(code: i32) -> &'static str {
    match code {
        0 => "success",
        1 => "generic error",
        2 => "session not found",
        3 => "could not allocate resource",
        4 => "connect problem",
        5 => "iSCSI login failed",
        6 => "error accessing/managing iSCSI DB",
        7 => "invalid argument",
        8 => "connection timed out",
        9 => "internal error",
        10 => "iSCSI logout failed",
        11 => "iSCSI PDU timed out",
        12 => "iSCSI transport module not loaded",
        13 => "permission denied",
        14 => "transport capability mismatch",
        15 => "session exists",
        16 => "invalid management request",
        17 => "iSNS service not supported",
        18 => "could not communicate with iscsid",
        19 => "non-retryable iSCSI login failure",
        20 => "could not connect to iscsid",
        21 => "no records/targets/sessions/portals found",
        22 => "could not lookup object in sysfs",
        23 => "could not lookup host",
        24 => "iSCSI login authentication failed",
        25 => "iSNS query failed",
        26 => "iSNS registration failed",
        27 => "operation not supported",
        28 => "device or resource in use",
        29 => "operation failed but retry may succeed",
        30 => "unknown discovery type",
        31 => "child process terminated",
        32 => "session not connected",
        127 => "command not found",
        _ => "unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_failure_keeps_message() {
        let err = IscsiError::ToolFailure {
            code: Some(24),
            message: "iscsiadm: Login failed to authenticate with target".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("exit code 24"));
        assert!(text.contains("iscsiadm: Login failed to authenticate with target"));
        assert_eq!(err.exit_code(), Some(24));
    }

    #[test]
    fn test_signal_failure_display() {
        let err = IscsiError::ToolFailure { code: None, message: String::new() };
        assert!(err.to_string().contains("terminated by signal"));
        assert_eq!(err.exit_code(), None);
    }

    #[test]
    fn test_invalid_input_class() {
        assert!(IscsiError::InvalidAddress("x".into()).is_invalid_input());
        assert!(IscsiError::InvalidIqn("x".into()).is_invalid_input());
        assert!(!IscsiError::ToolUnavailable("x".into()).is_invalid_input());
    }

    #[test]
    fn test_exit_code_names() {
        assert_eq!(exit_code_name(15), "session exists");
        assert!(exit_code_name(21).contains("no records"));
        assert_eq!(exit_code_name(4242), "unknown error");
    }
}
