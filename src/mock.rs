//! Test double for [`IscsiInitiator`]
//!
//! `MockIscsi` never spawns a process. It synthesizes deterministic targets,
//! initiators, sessions and nodes, and can be told to fail any operation
//! through [`InducedErrors`].
//!
//! The flags live behind an `Arc<Mutex<_>>`. [`MockIscsi::new`] shares the
//! process-wide set returned by [`induced_errors`]; tests that run in
//! parallel should give each mock its own set with
//! [`MockIscsi::with_induced_errors`].

use crate::error::{IscsiError, IscsiResult};
use crate::initiator::{
    usize_option, IscsiInitiator, Options, MOCK_NUMBER_OF_INITIATORS, MOCK_NUMBER_OF_TARGETS,
};
use crate::node::{IscsiNode, NodeParser};
use crate::parser::OutputParser;
use crate::session::{IscsiSession, SessionParser};
use crate::target::IscsiTarget;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard};

const DEFAULT_COUNT: usize = 1;
const MOCK_PORT: &str = "3260";
const MOCK_PORTAL: &str = "192.168.1.1";
const MOCK_TARGET_PREFIX: &str = "iqn.1992-04.com.mock:600009700bcbb70e3287017400";
const MOCK_INITIATOR_PREFIX: &str = "iqn.1993-08.org.mock:01:";

/// Operations of the mock that can be forced to fail
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InducedErrors {
    pub discovery: bool,
    pub initiators: bool,
    pub login: bool,
    pub logout: bool,
    pub rescan: bool,
    pub sessions: bool,
    pub nodes: bool,
    pub create_or_update_node: bool,
    pub delete_node: bool,
    pub set_chap: bool,
}

impl InducedErrors {
    /// Clear every flag
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Shared handle to a set of induced-error flags
pub type InducedErrorsHandle = Arc<Mutex<InducedErrors>>;

static INDUCED_ERRORS: Lazy<InducedErrorsHandle> = Lazy::new(InducedErrorsHandle::default);

/// The process-wide flags used by [`MockIscsi::new`]
pub fn induced_errors() -> InducedErrorsHandle {
    Arc::clone(&INDUCED_ERRORS)
}

/// Deterministic stand-in for a real initiator
pub struct MockIscsi {
    options: Options,
    induced: InducedErrorsHandle,
}

impl MockIscsi {
    /// Create a mock that reads the process-wide induced-error flags
    pub fn new(options: Options) -> Self {
        Self::with_induced_errors(options, induced_errors())
    }

    /// Create a mock that reads its own set of induced-error flags
    pub fn with_induced_errors(options: Options, induced: InducedErrorsHandle) -> Self {
        Self { options, induced }
    }

    /// Lock the flags this mock consults
    pub fn induced_errors(&self) -> MutexGuard<'_, InducedErrors> {
        self.induced.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self, flag: impl Fn(&InducedErrors) -> bool, op: &str) -> IscsiResult<()> {
        if flag(&*self.induced_errors()) {
            log::debug!("mock: inducing {} error", op);
            return Err(IscsiError::Induced(format!("induced {} error", op)));
        }
        Ok(())
    }

    fn target_count(&self) -> usize {
        usize_option(&self.options, MOCK_NUMBER_OF_TARGETS, DEFAULT_COUNT)
    }

    fn initiator_count(&self) -> usize {
        usize_option(&self.options, MOCK_NUMBER_OF_INITIATORS, DEFAULT_COUNT)
    }

    /// Targets the mock reports for `address`
    fn mock_targets(&self, address: &str) -> Vec<IscsiTarget> {
        // bare IP literals get the default port; anything else already has one
        let portal = match address.parse::<IpAddr>() {
            Ok(IpAddr::V4(ip)) => format!("{}:{}", ip, MOCK_PORT),
            Ok(IpAddr::V6(ip)) => format!("[{}]:{}", ip, MOCK_PORT),
            Err(_) => address.to_string(),
        };
        (0..self.target_count())
            .map(|idx| {
                let iqn = format!("{}{:06}", MOCK_TARGET_PREFIX, idx);
                IscsiTarget::new(portal.clone(), "0", iqn)
            })
            .collect()
    }

    /// `iscsiadm -m session -P 2` text for the mock targets
    fn session_dump(&self) -> String {
        let mut dump = String::new();
        for (idx, target) in self.mock_targets(MOCK_PORTAL).iter().enumerate() {
            let _ = write!(
                dump,
                "Target: {} (non-flash)\n\
                 \tCurrent Portal: {},1\n\
                 \tPersistent Portal: {},1\n\
                 \t\tIface Transport: tcp\n\
                 \t\tIface Initiatorname: {}000000000000\n\
                 \t\tIface IPaddress: 192.168.1.10\n\
                 \t\tSID: {}\n\
                 \t\tiSCSI Connection State: LOGGED IN\n\
                 \t\tiSCSI Session State: LOGGED_IN\n\
                 \t\tusername: <empty>\n\
                 \t\tpassword: ********\n\
                 \t\tusername_in: <empty>\n\
                 \t\tpassword_in: ********\n",
                target.target,
                target.portal,
                target.portal,
                MOCK_INITIATOR_PREFIX,
                idx + 1,
            );
        }
        dump
    }

    /// `iscsiadm -m node -o show` text for the mock targets
    fn node_dump(&self) -> String {
        let mut dump = String::new();
        for target in self.mock_targets(MOCK_PORTAL) {
            let _ = write!(
                dump,
                "# BEGIN RECORD 2.0-874\n\
                 node.name = {}\n\
                 node.tpgt = 1\n\
                 node.startup = manual\n\
                 iface.transport_name = tcp\n\
                 node.session.auth.authmethod = None\n\
                 node.conn[0].address = {}\n\
                 node.conn[0].port = {}\n\
                 node.conn[0].iscsi.OFMarker = No\n\
                 # END RECORD\n",
                target.target, MOCK_PORTAL, MOCK_PORT,
            );
        }
        dump
    }
}

impl IscsiInitiator for MockIscsi {
    fn discover_targets(&self, address: &str, _login: bool) -> IscsiResult<Vec<IscsiTarget>> {
        self.check(|f| f.discovery, "discovery")?;
        Ok(self.mock_targets(address))
    }

    fn get_initiators(&self, _filename: &str) -> IscsiResult<Vec<String>> {
        self.check(|f| f.initiators, "initiator")?;
        Ok((0..self.initiator_count())
            .map(|idx| format!("{}{:012}", MOCK_INITIATOR_PREFIX, idx))
            .collect())
    }

    fn perform_login(&self, _target: &IscsiTarget) -> IscsiResult<()> {
        self.check(|f| f.login, "login")
    }

    fn perform_logout(&self, _target: &IscsiTarget) -> IscsiResult<()> {
        self.check(|f| f.logout, "logout")
    }

    fn perform_rescan(&self) -> IscsiResult<()> {
        self.check(|f| f.rescan, "rescan")
    }

    fn get_sessions(&self) -> IscsiResult<Vec<IscsiSession>> {
        self.check(|f| f.sessions, "get sessions")?;
        Ok(SessionParser.parse(self.session_dump().as_bytes()))
    }

    fn get_nodes(&self) -> IscsiResult<Vec<IscsiNode>> {
        self.check(|f| f.nodes, "get nodes")?;
        Ok(NodeParser.parse(self.node_dump().as_bytes()))
    }

    fn create_or_update_node(
        &self,
        _target: &IscsiTarget,
        _options: &BTreeMap<String, String>,
    ) -> IscsiResult<()> {
        self.check(|f| f.create_or_update_node, "create or update node")
    }

    fn delete_node(&self, _target: &IscsiTarget) -> IscsiResult<()> {
        self.check(|f| f.delete_node, "delete node")
    }

    fn set_chap_credentials(
        &self,
        _target: &IscsiTarget,
        _username: &str,
        _secret: &str,
    ) -> IscsiResult<()> {
        self.check(|f| f.set_chap, "set CHAP credentials")
    }

    fn is_mock(&self) -> bool {
        true
    }

    fn options(&self) -> &Options {
        &self.options
    }
}
