//! Typed access to the open-iscsi initiator
//!
//! This library drives `iscsiadm` and interprets its output: discovery,
//! login/logout, session and node inventory, node records and CHAP
//! settings. `iscsiadm` reports outcomes through opaque exit codes and
//! free-form text; the crate turns them into typed records and a small
//! error taxonomy, treating "nothing matched" and "already in that state"
//! exits as success.
//!
//! Two implementations share the [`IscsiInitiator`] trait: [`LinuxIscsi`]
//! runs the real tool, [`MockIscsi`] synthesizes fixtures for tests.
//!
//! # Example
//!
//! ```no_run
//! use iscsi_initiator::{IscsiInitiator, LinuxIscsi, Options};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = LinuxIscsi::new(Options::new());
//! for target in client.discover_targets("192.168.1.1:3260", false)? {
//!     client.perform_login(&target)?;
//! }
//! for session in client.get_sessions()? {
//!     println!("{} via {}: {}", session.target, session.portal, session.session_state);
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod command;
pub mod error;
pub mod exit_code;
pub mod initiator;
pub mod linux;
pub mod mock;
pub mod node;
pub mod parser;
pub mod session;
pub mod target;
pub mod validate;

pub use auth::{AuthConfig, ChapCredentials};
pub use command::{CommandOutput, CommandRunner, SystemRunner};
pub use error::{IscsiError, IscsiResult};
pub use initiator::{IscsiInitiator, Options};
pub use linux::LinuxIscsi;
pub use mock::{induced_errors, InducedErrors, MockIscsi};
pub use node::IscsiNode;
pub use session::{ConnectionState, IscsiSession, SessionState, TransportName};
pub use target::IscsiTarget;

/// Version of this library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
