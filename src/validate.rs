//! Guard clauses for portal addresses and IQNs
//!
//! Every operation that hands a portal or target name to `iscsiadm` runs
//! these first, so malformed input is rejected before a process is spawned.

use crate::error::{IscsiError, IscsiResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::net::IpAddr;

/// IPv4 address with a port, e.g. `10.0.0.1:3260`
static PORTAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])\.){3}([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5]):[0-9]+$",
    )
    .expect("portal pattern is valid")
});

/// `iqn.YYYY-MM.<reverse-domain>[:<suffix>]`
static IQN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^iqn\.\d{4}-\d{2}\.[[:alnum:].-]+(:[^,;*&$|\s]+)?$").expect("IQN pattern is valid")
});

/// Accept a bare IP literal or an IPv4 `address:port` portal
pub fn validate_ip_address(ip: &str) -> IscsiResult<()> {
    let is_ip = ip.parse::<IpAddr>().is_ok();
    if is_ip || PORTAL_RE.is_match(ip) {
        Ok(())
    } else {
        Err(IscsiError::InvalidAddress(ip.to_string()))
    }
}

/// Accept a canonical iSCSI qualified name
pub fn validate_iqn(iqn: &str) -> IscsiResult<()> {
    if IQN_RE.is_match(iqn) {
        Ok(())
    } else {
        Err(IscsiError::InvalidIqn(iqn.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_addresses() {
        for addr in [
            "10.0.0.1",
            "192.168.1.1:3260",
            "255.255.255.255:1",
            "0.0.0.0",
            "fe80::1",
            "::1",
        ] {
            assert!(validate_ip_address(addr).is_ok(), "{} should be accepted", addr);
        }
    }

    #[test]
    fn test_invalid_addresses() {
        for addr in [
            "",
            "256.1.1.1",
            "10.0.0",
            "10.0.0.1:",
            "10.0.0.1:port",
            "host.example.com:3260",
            "10.0.0.1:3260; rm -rf /",
        ] {
            match validate_ip_address(addr) {
                Err(IscsiError::InvalidAddress(a)) => assert_eq!(a, addr),
                other => panic!("{} should be rejected, got {:?}", addr, other),
            }
        }
    }

    #[test]
    fn test_valid_iqns() {
        for iqn in [
            "iqn.1992-04.com.emc:600009700bcbb70e3287017400000001",
            "iqn.2015-10.com.dell:dellemc-foobar-123-a-7ceb34a3",
            "iqn.1993-08.org.debian:01:b2a2e6c1f4d",
            "iqn.2025-12.local",
        ] {
            assert!(validate_iqn(iqn).is_ok(), "{} should be accepted", iqn);
        }
    }

    #[test]
    fn test_invalid_iqns() {
        for iqn in [
            "",
            "iqn.foo.com:bar",
            "iqn.15-10.com.dell:x",
            "eui.02004567A425678D",
            "iqn.2015-10.com.dell:target;reboot",
            "iqn.2015-10.com.dell:tar get",
            "xiqn.2015-10.com.dell:target",
        ] {
            match validate_iqn(iqn) {
                Err(IscsiError::InvalidIqn(i)) => assert_eq!(i, iqn),
                other => panic!("{} should be rejected, got {:?}", iqn, other),
            }
        }
    }
}
