//! Discover the targets behind a portal and list active sessions
//!
//! ```text
//! cargo run --example discover_targets -- 192.168.1.1:3260
//! ISCSI_MOCK=1 cargo run --example discover_targets
//! ```

use iscsi_initiator::{IscsiInitiator, LinuxIscsi, MockIscsi, Options};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let portal = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:3260".to_string());

    let mut options = Options::new();
    if let Ok(dir) = std::env::var("ISCSI_CHROOT") {
        options.insert(iscsi_initiator::initiator::CHROOT_DIRECTORY.to_string(), dir);
    }

    let client: Box<dyn IscsiInitiator> = if std::env::var("ISCSI_MOCK").is_ok() {
        Box::new(MockIscsi::new(options))
    } else {
        Box::new(LinuxIscsi::new(options))
    };

    println!("Discovering targets at {}...", portal);
    let targets = client.discover_targets(&portal, false)?;

    if targets.is_empty() {
        println!("No targets discovered");
    } else {
        println!("\nDiscovered {} target(s):", targets.len());
        for target in &targets {
            println!("  TargetName: {}", target.target);
            println!("  TargetAddress: {},{}", target.portal, target.group_tag);
            println!();
        }
    }

    let sessions = client.get_sessions()?;
    println!("{} active session(s)", sessions.len());
    for session in &sessions {
        println!(
            "  [{}] {} {} ({}/{})",
            session.sid,
            session.target,
            session.portal,
            session.session_state,
            session.connection_state
        );
    }

    Ok(())
}
