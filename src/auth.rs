//! CHAP settings for node records
//!
//! Authentication is configured by writing `node.session.auth.*` keys into
//! the iscsid node database; iscsid performs the actual CHAP exchange.

use std::collections::BTreeMap;

pub const AUTH_METHOD_KEY: &str = "node.session.auth.authmethod";
pub const AUTH_USERNAME_KEY: &str = "node.session.auth.username";
pub const AUTH_PASSWORD_KEY: &str = "node.session.auth.password";
pub const AUTH_USERNAME_IN_KEY: &str = "node.session.auth.username_in";
pub const AUTH_PASSWORD_IN_KEY: &str = "node.session.auth.password_in";

/// CHAP credentials for authentication
#[derive(Clone, PartialEq, Eq)]
pub struct ChapCredentials {
    /// Username for CHAP authentication
    pub username: String,
    /// Secret/password for CHAP authentication
    pub secret: String,
}

impl ChapCredentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }
}

// Keep secrets out of logs.
impl std::fmt::Debug for ChapCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChapCredentials")
            .field("username", &self.username)
            .field("secret", &"********")
            .finish()
    }
}

/// Authentication configuration for a node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,
    /// CHAP authentication (one-way: initiator authenticates to target)
    Chap {
        /// Credentials the initiator presents to the target
        credentials: ChapCredentials,
    },
    /// Mutual CHAP (two-way: both initiator and target authenticate)
    MutualChap {
        /// Credentials the initiator presents to the target
        initiator_credentials: ChapCredentials,
        /// Credentials the target must present back
        target_credentials: ChapCredentials,
    },
}

impl AuthConfig {
    /// Check if authentication is required
    pub fn requires_auth(&self) -> bool {
        !matches!(self, AuthConfig::None)
    }

    /// Get the authentication method string
    pub fn auth_method(&self) -> &str {
        match self {
            AuthConfig::None => "None",
            AuthConfig::Chap { .. } | AuthConfig::MutualChap { .. } => "CHAP",
        }
    }

    /// Check if mutual CHAP is required
    pub fn is_mutual(&self) -> bool {
        matches!(self, AuthConfig::MutualChap { .. })
    }

    /// Node database settings that apply this configuration
    pub fn node_options(&self) -> BTreeMap<String, String> {
        let mut options = BTreeMap::new();
        options.insert(AUTH_METHOD_KEY.to_string(), self.auth_method().to_string());
        match self {
            AuthConfig::None => {}
            AuthConfig::Chap { credentials } => {
                insert_outgoing(&mut options, credentials);
            }
            AuthConfig::MutualChap {
                initiator_credentials,
                target_credentials,
            } => {
                insert_outgoing(&mut options, initiator_credentials);
                options.insert(
                    AUTH_USERNAME_IN_KEY.to_string(),
                    target_credentials.username.clone(),
                );
                options.insert(
                    AUTH_PASSWORD_IN_KEY.to_string(),
                    target_credentials.secret.clone(),
                );
            }
        }
        options
    }
}

fn insert_outgoing(options: &mut BTreeMap<String, String>, credentials: &ChapCredentials) {
    options.insert(AUTH_USERNAME_KEY.to_string(), credentials.username.clone());
    options.insert(AUTH_PASSWORD_KEY.to_string(), credentials.secret.clone());
}
