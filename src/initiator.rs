//! Capability contract shared by the real and mock initiators
//!
//! Calling code holds a `Box<dyn IscsiInitiator>` and never needs to know
//! which variant is behind it:
//!
//! ```no_run
//! use iscsi_initiator::{IscsiInitiator, LinuxIscsi, MockIscsi, Options};
//!
//! let mut client: Box<dyn IscsiInitiator> = Box::new(LinuxIscsi::new(Options::new()));
//! if std::env::var("ISCSI_MOCK").is_ok() {
//!     client = Box::new(MockIscsi::new(Options::new()));
//! }
//! let sessions = client.get_sessions()?;
//! # Ok::<(), iscsi_initiator::IscsiError>(())
//! ```

use crate::error::IscsiResult;
use crate::node::IscsiNode;
use crate::session::IscsiSession;
use crate::target::IscsiTarget;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// String-keyed client options; unknown keys are ignored
pub type Options = HashMap<String, String>;

/// Run `iscsiadm` inside this root directory
pub const CHROOT_DIRECTORY: &str = "chrootDirectory";
/// Seconds to wait for discovery and login before giving up
pub const TIMEOUT: &str = "timeout";
/// Number of targets the mock reports
pub const MOCK_NUMBER_OF_TARGETS: &str = "numberOfTargets";
/// Number of initiators the mock reports
pub const MOCK_NUMBER_OF_INITIATORS: &str = "numberOfInitiators";

/// Default bound on discovery and login
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// System default initiator name file
pub const DEFAULT_INITIATOR_NAME_FILE: &str = "/etc/iscsi/initiatorname.iscsi";

/// Operations an iSCSI initiator supports
pub trait IscsiInitiator: Send + Sync {
    /// Discover the targets exposed by a portal, optionally logging into each
    fn discover_targets(&self, address: &str, login: bool) -> IscsiResult<Vec<IscsiTarget>>;

    /// Read initiator IQNs from `filename`, or the system default file when empty
    fn get_initiators(&self, filename: &str) -> IscsiResult<Vec<String>>;

    /// Log into a target; already being logged in is not an error
    fn perform_login(&self, target: &IscsiTarget) -> IscsiResult<()>;

    /// Log out of a target; already being logged out is not an error
    fn perform_logout(&self, target: &IscsiTarget) -> IscsiResult<()>;

    /// Rescan all current sessions
    fn perform_rescan(&self) -> IscsiResult<()>;

    fn get_sessions(&self) -> IscsiResult<Vec<IscsiSession>>;

    fn get_nodes(&self) -> IscsiResult<Vec<IscsiNode>>;

    /// Create the node record if needed, then apply every option to it
    fn create_or_update_node(
        &self,
        target: &IscsiTarget,
        options: &BTreeMap<String, String>,
    ) -> IscsiResult<()>;

    /// Delete a node record; a record that is already gone is not an error
    fn delete_node(&self, target: &IscsiTarget) -> IscsiResult<()>;

    /// Configure one-way CHAP for a target's node record
    fn set_chap_credentials(
        &self,
        target: &IscsiTarget,
        username: &str,
        secret: &str,
    ) -> IscsiResult<()>;

    /// True for the test double
    fn is_mock(&self) -> bool;

    fn options(&self) -> &Options;
}

/// Parse a non-negative integer option, falling back to `default`
pub(crate) fn usize_option(options: &Options, key: &str, default: usize) -> usize {
    match options.get(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("ignoring invalid {} option {:?}", key, raw);
            default
        }),
        None => default,
    }
}

/// The `timeout` option as a duration
pub(crate) fn timeout_option(options: &Options) -> Duration {
    match options.get(TIMEOUT).map(|raw| raw.trim().parse::<u64>()) {
        Some(Ok(secs)) if secs > 0 => Duration::from_secs(secs),
        Some(_) => {
            log::warn!("ignoring invalid {} option", TIMEOUT);
            DEFAULT_TIMEOUT
        }
        None => DEFAULT_TIMEOUT,
    }
}
