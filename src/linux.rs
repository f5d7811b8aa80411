//! Initiator backed by the open-iscsi `iscsiadm` tool
//!
//! Every operation follows the same path: validate the inputs, build the
//! argument vector, run it through the [`CommandRunner`], classify the exit
//! status and, on success, parse the payload.

use crate::auth::{AuthConfig, ChapCredentials};
use crate::command::{
    build_iscsi_command, resolve_path, CommandOutput, CommandRunner, SystemRunner, ISCSIADM,
};
use crate::error::IscsiResult;
use crate::exit_code::{classify, Operation};
use crate::initiator::{timeout_option, IscsiInitiator, Options, DEFAULT_INITIATOR_NAME_FILE};
use crate::node::{IscsiNode, NodeParser};
use crate::parser::OutputParser;
use crate::session::{IscsiSession, SessionParser};
use crate::target::IscsiTarget;
use crate::validate::validate_ip_address;
use std::collections::BTreeMap;
use std::time::Duration;

/// Line prefix of an initiator name entry
const INITIATOR_NAME_PREFIX: &str = "InitiatorName=";

/// Logged in place of a secret value
const REDACTED: &str = "********";

/// Real initiator that drives `iscsiadm`
pub struct LinuxIscsi<R: CommandRunner = SystemRunner> {
    options: Options,
    runner: R,
}

impl LinuxIscsi<SystemRunner> {
    /// Create an initiator that runs commands on the local host
    pub fn new(options: Options) -> Self {
        Self::with_runner(options, SystemRunner)
    }
}

impl<R: CommandRunner> LinuxIscsi<R> {
    /// Create an initiator that runs commands through `runner`
    pub fn with_runner(options: Options, runner: R) -> Self {
        Self { options, runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Final argument vector for an `iscsiadm` invocation
    pub fn build_iscsi_command(&self, argv: &[&str]) -> Vec<String> {
        let argv: Vec<String> = argv.iter().map(|s| s.to_string()).collect();
        build_iscsi_command(&self.options, &argv)
    }

    /// Bound applied to discovery and login
    pub fn timeout(&self) -> Duration {
        timeout_option(&self.options)
    }

    /// Run one `iscsiadm` invocation and classify it
    ///
    /// `Ok(None)` is a benign exit: the operation succeeded with nothing to
    /// report.
    fn execute(
        &self,
        op: Operation,
        args: &[&str],
        timeout: Option<Duration>,
    ) -> IscsiResult<Option<CommandOutput>> {
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(ISCSIADM);
        argv.extend_from_slice(args);
        let command = self.build_iscsi_command(&argv);

        log::debug!("{:?}: {}", op, redact_command(&command));
        classify(op, self.runner.run(&command, timeout), timeout).into_result()
    }

    /// Apply an authentication configuration to a target's node record
    pub fn set_auth_config(&self, target: &IscsiTarget, auth: &AuthConfig) -> IscsiResult<()> {
        self.create_or_update_node(target, &auth.node_options())?;
        if !auth.requires_auth() {
            log::info!("disabled authentication for {}", target);
        } else if auth.is_mutual() {
            log::info!("configured mutual CHAP for {}", target);
        } else {
            log::info!("configured CHAP for {}", target);
        }
        Ok(())
    }
}

impl<R: CommandRunner> IscsiInitiator for LinuxIscsi<R> {
    fn discover_targets(&self, address: &str, login: bool) -> IscsiResult<Vec<IscsiTarget>> {
        validate_ip_address(address)?;

        let output = self.execute(
            Operation::Discovery,
            &["-m", "discovery", "-t", "st", "--portal", address],
            Some(self.timeout()),
        )?;

        let targets: Vec<IscsiTarget> = output
            .map(|out| {
                String::from_utf8_lossy(&out.stdout)
                    .lines()
                    .filter_map(IscsiTarget::from_discovery_line)
                    .collect()
            })
            .unwrap_or_default();
        log::info!("discovered {} target(s) at {}", targets.len(), address);

        if login {
            let mut first_error = None;
            for target in &targets {
                if let Err(e) = self.perform_login(target) {
                    log::warn!("login to {} failed: {}", target, e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        Ok(targets)
    }

    fn get_initiators(&self, filename: &str) -> IscsiResult<Vec<String>> {
        let filename = if filename.is_empty() {
            DEFAULT_INITIATOR_NAME_FILE
        } else {
            filename
        };
        let path = resolve_path(&self.options, filename);
        // comments may carry any encoding; IQNs themselves are ASCII
        let contents = std::fs::read(&path)?;
        Ok(parse_initiator_names(&String::from_utf8_lossy(&contents)))
    }

    fn perform_login(&self, target: &IscsiTarget) -> IscsiResult<()> {
        target.validate()?;
        let (iqn, portal) = (target.target.as_str(), target.portal.as_str());
        let result = self.execute(
            Operation::Login,
            &["-m", "node", "-T", iqn, "--portal", portal, "-l"],
            Some(self.timeout()),
        )?;
        match result {
            Some(_) => log::info!("logged into {}", target),
            None => log::debug!("already logged into {}", target),
        }
        Ok(())
    }

    fn perform_logout(&self, target: &IscsiTarget) -> IscsiResult<()> {
        target.validate()?;
        let (iqn, portal) = (target.target.as_str(), target.portal.as_str());
        let result = self.execute(
            Operation::Logout,
            &["-m", "node", "-T", iqn, "--portal", portal, "--logout"],
            None,
        )?;
        match result {
            Some(_) => log::info!("logged out of {}", target),
            None => log::debug!("no session to log out of for {}", target),
        }
        Ok(())
    }

    fn perform_rescan(&self) -> IscsiResult<()> {
        self.execute(Operation::Rescan, &["-m", "node", "--rescan"], None)?;
        Ok(())
    }

    fn get_sessions(&self) -> IscsiResult<Vec<IscsiSession>> {
        let output = self.execute(Operation::Sessions, &["-m", "session", "-P", "2", "-S"], None)?;
        Ok(output
            .map(|out| SessionParser.parse(&out.stdout))
            .unwrap_or_default())
    }

    fn get_nodes(&self) -> IscsiResult<Vec<IscsiNode>> {
        let output = self.execute(Operation::Nodes, &["-m", "node", "-o", "show"], None)?;
        Ok(output
            .map(|out| NodeParser.parse(&out.stdout))
            .unwrap_or_default())
    }

    fn create_or_update_node(
        &self,
        target: &IscsiTarget,
        options: &BTreeMap<String, String>,
    ) -> IscsiResult<()> {
        target.validate()?;
        let (iqn, portal) = (target.target.as_str(), target.portal.as_str());
        let record = ["-m", "node", "-p", portal, "-T", iqn];

        let exists = self.execute(Operation::NodeQuery, &record, None)?.is_some();
        if !exists {
            let mut args = record.to_vec();
            args.extend_from_slice(&["-o", "new"]);
            self.execute(Operation::NodeCreate, &args, None)?;
            log::info!("created node record for {}", target);
        }

        for (key, value) in options {
            let mut args = record.to_vec();
            args.extend_from_slice(&["-o", "update", "-n", key.as_str(), "-v", value.as_str()]);
            self.execute(Operation::NodeUpdate, &args, None)?;
        }
        Ok(())
    }

    fn delete_node(&self, target: &IscsiTarget) -> IscsiResult<()> {
        target.validate()?;
        let (iqn, portal) = (target.target.as_str(), target.portal.as_str());
        self.execute(
            Operation::NodeDelete,
            &["-m", "node", "-p", portal, "-T", iqn, "-o", "delete"],
            None,
        )?;
        Ok(())
    }

    fn set_chap_credentials(
        &self,
        target: &IscsiTarget,
        username: &str,
        secret: &str,
    ) -> IscsiResult<()> {
        let auth = AuthConfig::Chap {
            credentials: ChapCredentials::new(username, secret),
        };
        self.set_auth_config(target, &auth)
    }

    fn is_mock(&self) -> bool {
        false
    }

    fn options(&self) -> &Options {
        &self.options
    }
}

/// Render an argument vector for logging with secret option values masked
///
/// `iscsiadm` takes node settings as `-n <key> -v <value>`; the value is
/// masked when the key is a CHAP password.
pub fn redact_command(command: &[String]) -> String {
    command
        .iter()
        .enumerate()
        .map(|(idx, arg)| {
            let secret = idx >= 3
                && command[idx - 1] == "-v"
                && command[idx - 3] == "-n"
                && is_secret_key(&command[idx - 2]);
            if secret {
                REDACTED
            } else {
                arg.as_str()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_secret_key(key: &str) -> bool {
    key.ends_with(".password") || key.ends_with(".password_in")
}

/// Collect the IQNs of every `InitiatorName=` line
///
/// Blank lines and `#` comments are skipped; so are entries with no value.
pub fn parse_initiator_names(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.strip_prefix(INITIATOR_NAME_PREFIX))
        .map(str::trim)
        .filter(|iqn| !iqn.is_empty())
        .map(str::to_string)
        .collect()
}
