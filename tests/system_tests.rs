//! Tests against a real open-iscsi installation
//!
//! These need `iscsiadm`, a running iscsid and a reachable target, so they
//! are ignored by default:
//!
//! ```text
//! sudo -E cargo test --test system_tests -- --ignored --test-threads=1
//! ```
//!
//! The portal and target come from `test-config.toml`; `ISCSI_TEST_PORTAL`
//! and `ISCSI_TEST_TARGET` override them.

use iscsi_initiator::{IscsiInitiator, IscsiTarget, LinuxIscsi, Options};
use once_cell::sync::Lazy;
use std::env;

// ============================================================================
// Test Configuration Module
// ============================================================================

#[derive(Debug)]
struct TestConfig {
    portal: String,
    target_iqn: String,
}

static TEST_CONFIG: Lazy<TestConfig> = Lazy::new(|| {
    let contents = std::fs::read_to_string("test-config.toml")
        .expect("Failed to read test-config.toml - config file required");

    let config = contents
        .parse::<toml::Value>()
        .expect("Failed to parse test-config.toml - invalid TOML syntax");

    let target_section = config
        .get("target")
        .expect("Missing [target] section in test-config.toml");

    let portal = target_section
        .get("portal")
        .and_then(|p| p.as_str())
        .expect("Missing or invalid 'portal' in [target] section");

    let target_iqn = target_section
        .get("iqn")
        .and_then(|i| i.as_str())
        .expect("Missing or invalid 'iqn' in [target] section");

    let portal = env::var("ISCSI_TEST_PORTAL").unwrap_or_else(|_| portal.to_string());
    let target_iqn = env::var("ISCSI_TEST_TARGET").unwrap_or_else(|_| target_iqn.to_string());
    eprintln!("Using portal {} and target {}", portal, target_iqn);

    TestConfig { portal, target_iqn }
});

fn test_target() -> IscsiTarget {
    IscsiTarget::new(TEST_CONFIG.portal.as_str(), "0", TEST_CONFIG.target_iqn.as_str())
}

fn client() -> LinuxIscsi {
    let _ = env_logger::builder().is_test(true).try_init();
    LinuxIscsi::new(Options::new())
}

// ============================================================================
// Tests
// ============================================================================

#[test]
#[ignore] // Requires open-iscsi and a reachable target
fn test_discover_targets() {
    let c = client();
    let targets = c.discover_targets(&TEST_CONFIG.portal, false).unwrap_or_else(|e| {
        panic!(
            "Discovery failed\n\
             Error: {}\n\
             \n\
             Troubleshooting:\n\
             1. Check iscsid is running: systemctl status iscsid\n\
             2. Try manual discovery:\n\
                sudo iscsiadm -m discovery -t sendtargets -p {}",
            e, TEST_CONFIG.portal
        )
    });
    assert!(
        targets.iter().any(|t| t.target == TEST_CONFIG.target_iqn),
        "{} not among discovered targets {:?}",
        TEST_CONFIG.target_iqn,
        targets
    );
}

#[test]
#[ignore]
fn test_login_logout() {
    let c = client();
    let tgt = test_target();
    c.perform_login(&tgt).unwrap();
    c.perform_logout(&tgt).unwrap();
}

#[test]
#[ignore]
fn test_login_login_logout() {
    let c = client();
    let tgt = test_target();
    c.perform_login(&tgt).unwrap();
    c.perform_login(&tgt).unwrap();
    c.perform_logout(&tgt).unwrap();
}

#[test]
#[ignore]
fn test_logout_logout() {
    let c = client();
    let tgt = test_target();
    let _ = c.perform_login(&tgt);
    c.perform_logout(&tgt).unwrap();
    c.perform_logout(&tgt).unwrap();
}

#[test]
#[ignore]
fn test_sessions_after_login() {
    let c = client();
    let tgt = test_target();
    c.perform_login(&tgt).unwrap();
    c.perform_rescan().unwrap();

    let sessions = c.get_sessions().unwrap();
    assert!(sessions.iter().any(|s| s.target == tgt.target));

    let nodes = c.get_nodes().unwrap();
    assert!(nodes.iter().any(|n| n.target == tgt.target));

    c.perform_logout(&tgt).unwrap();
}

#[test]
#[ignore]
fn test_get_default_initiators() {
    let c = client();
    let initiators = c.get_initiators("").unwrap();
    assert!(!initiators.is_empty(), "no InitiatorName in /etc/iscsi/initiatorname.iscsi");
}
