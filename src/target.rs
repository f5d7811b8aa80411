//! iSCSI target endpoint as reported by SendTargets discovery

use crate::error::IscsiResult;
use crate::validate::{validate_ip_address, validate_iqn};
use std::fmt;

/// One target reachable through a portal
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IscsiTarget {
    /// Portal address, `ip` or `ip:port`
    pub portal: String,
    /// Target portal group tag
    pub group_tag: String,
    /// Target IQN
    pub target: String,
}

impl IscsiTarget {
    pub fn new(
        portal: impl Into<String>,
        group_tag: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            portal: portal.into(),
            group_tag: group_tag.into(),
            target: target.into(),
        }
    }

    /// Parse one line of `iscsiadm -m discovery` output
    ///
    /// The line looks like `192.168.1.1:3260,1 iqn.1992-04.com.emc:...`.
    /// Anything else yields `None`.
    pub fn from_discovery_line(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let (portal_tag, iqn) = (tokens.next()?, tokens.next()?);
        if tokens.next().is_some() {
            return None;
        }
        let (portal, tag) = portal_tag.split_once(',')?;
        if portal.is_empty() || tag.contains(',') {
            return None;
        }
        Some(Self::new(portal, tag, iqn))
    }

    /// Check portal and IQN before they are handed to `iscsiadm`
    pub fn validate(&self) -> IscsiResult<()> {
        validate_ip_address(&self.portal)?;
        validate_iqn(&self.target)
    }
}

impl fmt::Display for IscsiTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{} {}", self.portal, self.group_tag, self.target)
    }
}
