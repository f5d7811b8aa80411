//! iSCSI session inventory
//!
//! Parses the output of `iscsiadm -m session -P 2 -S`, which prints one
//! block per session:
//!
//! ```text
//! Target: iqn.2015-10.com.dell:dellemc-foobar-123-a-7ceb34a3 (non-flash)
//!         Current Portal: 192.168.1.1:3260,1
//!         Persistent Portal: 192.168.1.1:3260,1
//!                 Iface Transport: tcp
//!                 SID: 12
//!                 iSCSI Connection State: LOGGED IN
//!                 iSCSI Session State: LOGGED_IN
//!                 username: <empty>
//! ```

use crate::parser::{normalize_value, split_key_value, OutputParser};
use std::fmt;

/// Line prefix that opens a session block
pub const SESSION_RECORD_MARKER: &str = "Target:";

/// Session state as reported by iscsid
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionState {
    LoggedIn,
    Failed,
    Free,
    /// Anything the tool reports that is not listed above
    Other(String),
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Other(String::new())
    }
}

impl SessionState {
    pub fn as_str(&self) -> &str {
        match self {
            SessionState::LoggedIn => "LOGGED_IN",
            SessionState::Failed => "FAILED",
            SessionState::Free => "FREE",
            SessionState::Other(s) => s,
        }
    }
}

impl From<&str> for SessionState {
    fn from(s: &str) -> Self {
        match s {
            "LOGGED_IN" => SessionState::LoggedIn,
            "FAILED" => SessionState::Failed,
            "FREE" => SessionState::Free,
            other => SessionState::Other(other.to_string()),
        }
    }
}

/// Connection state as reported by iscsid
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Free,
    TransportWait,
    InLogin,
    LoggedIn,
    InLogout,
    LogoutRequested,
    CleanupWait,
    Other(String),
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::Other(String::new())
    }
}

impl ConnectionState {
    pub fn as_str(&self) -> &str {
        match self {
            ConnectionState::Free => "FREE",
            ConnectionState::TransportWait => "TRANSPORT WAIT",
            ConnectionState::InLogin => "IN LOGIN",
            ConnectionState::LoggedIn => "LOGGED IN",
            ConnectionState::InLogout => "IN LOGOUT",
            ConnectionState::LogoutRequested => "LOGOUT REQUESTED",
            ConnectionState::CleanupWait => "CLEANUP WAIT",
            ConnectionState::Other(s) => s,
        }
    }
}

impl From<&str> for ConnectionState {
    fn from(s: &str) -> Self {
        match s {
            "FREE" => ConnectionState::Free,
            "TRANSPORT WAIT" => ConnectionState::TransportWait,
            "IN LOGIN" => ConnectionState::InLogin,
            "LOGGED IN" => ConnectionState::LoggedIn,
            "IN LOGOUT" => ConnectionState::InLogout,
            "LOGOUT REQUESTED" => ConnectionState::LogoutRequested,
            "CLEANUP WAIT" => ConnectionState::CleanupWait,
            other => ConnectionState::Other(other.to_string()),
        }
    }
}

/// Transport the session's iface is bound to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransportName {
    Tcp,
    Iser,
    Other(String),
}

impl Default for TransportName {
    fn default() -> Self {
        TransportName::Other(String::new())
    }
}

impl TransportName {
    pub fn as_str(&self) -> &str {
        match self {
            TransportName::Tcp => "tcp",
            TransportName::Iser => "iser",
            TransportName::Other(s) => s,
        }
    }
}

impl From<&str> for TransportName {
    fn from(s: &str) -> Self {
        match s {
            "tcp" => TransportName::Tcp,
            "iser" => TransportName::Iser,
            other => TransportName::Other(other.to_string()),
        }
    }
}

macro_rules! impl_display_as_str {
    ($($t:ty),*) => {
        $(impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

impl_display_as_str!(SessionState, ConnectionState, TransportName);

/// One session reported by `iscsiadm -m session`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IscsiSession {
    pub target: String,
    pub portal: String,
    pub sid: String,
    pub iface_transport: TransportName,
    pub iface_initiator_name: String,
    pub iface_ip_address: String,
    pub session_state: SessionState,
    pub connection_state: ConnectionState,
    pub username: String,
    pub password: String,
    pub username_in: String,
    pub password_in: String,
}

impl IscsiSession {
    /// Apply one `key: value` line from inside a session block
    ///
    /// Returns false for keys that are not session attributes.
    fn apply_field(&mut self, key: &str, value: &str) -> bool {
        let value = normalize_value(value);
        match key {
            "Current Portal" => self.portal = strip_portal_group_tag(&value).to_string(),
            "SID" => self.sid = value,
            "Iface Transport" => self.iface_transport = TransportName::from(value.as_str()),
            "Iface Initiatorname" => self.iface_initiator_name = value,
            "Iface IPaddress" => self.iface_ip_address = value,
            "iSCSI Session State" => self.session_state = SessionState::from(value.as_str()),
            "iSCSI Connection State" => {
                self.connection_state = ConnectionState::from(value.as_str())
            }
            "username" => self.username = value,
            "password" => self.password = value,
            "username_in" => self.username_in = value,
            "password_in" => self.password_in = value,
            _ => return false,
        }
        true
    }
}

/// `192.168.1.1:3260,1` -> `192.168.1.1:3260`
fn strip_portal_group_tag(portal: &str) -> &str {
    portal.split(',').next().unwrap_or(portal)
}

/// Scanner state while folding over the dump
#[derive(Debug)]
enum ScanState {
    ScanningForRecordStart,
    InRecord(IscsiSession),
}

/// Parser for `iscsiadm -m session -P 2 -S` output
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionParser;

impl OutputParser for SessionParser {
    type Record = IscsiSession;

    fn parse(&self, data: &[u8]) -> Vec<IscsiSession> {
        let text = String::from_utf8_lossy(data);
        let mut sessions = Vec::new();
        let mut state = ScanState::ScanningForRecordStart;

        for line in text.lines() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix(SESSION_RECORD_MARKER) {
                if let ScanState::InRecord(done) = state {
                    sessions.push(done);
                }
                // Target: <iqn> (non-flash)
                let target = rest.split_whitespace().next().unwrap_or_default();
                state = ScanState::InRecord(IscsiSession {
                    target: target.to_string(),
                    ..Default::default()
                });
                continue;
            }

            if let ScanState::InRecord(session) = &mut state {
                if let Some((key, value)) = split_key_value(line, ':') {
                    if !session.apply_field(key, value) {
                        log::trace!("ignoring session key {:?}", key);
                    }
                }
            }
        }

        if let ScanState::InRecord(done) = state {
            sessions.push(done);
        }
        sessions
    }
}
