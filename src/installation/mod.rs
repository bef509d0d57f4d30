//! Named quality-server installations
//!
//! An installation binds a name to a server URL and the credentials used to
//! talk to it. Storage of these records belongs to the host; the resolver
//! only looks them up by name through [`InstallationLookup`].

use crate::sonar::Credentials;
use serde::Deserialize;
use std::fmt;

/// A configured quality-server installation
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Installation {
    pub name: String,
    pub server_url: String,
    /// Authentication token (preferred over login/password)
    #[serde(default)]
    pub token: Option<String>,
    /// Legacy login for servers without token support
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Installation {
    pub fn new(name: impl Into<String>, server_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            server_url: server_url.into(),
            token: None,
            login: None,
            password: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_login(mut self, login: impl Into<String>, password: Option<String>) -> Self {
        self.login = Some(login.into());
        self.password = password;
        self
    }

    /// Credentials to send with authenticated requests.
    ///
    /// A non-blank token wins; otherwise a non-blank login is sent as basic
    /// auth. Returns `None` for anonymous installations.
    pub fn credentials(&self) -> Option<Credentials> {
        if let Some(token) = non_blank(&self.token) {
            return Some(Credentials::Bearer(token.to_string()));
        }
        non_blank(&self.login).map(|login| Credentials::Basic {
            login: login.to_string(),
            password: self.password.clone(),
        })
    }

    /// Secret strings that must be filtered out of build logs.
    pub fn secrets(&self) -> Vec<String> {
        [&self.password, &self.token]
            .into_iter()
            .filter_map(non_blank)
            .map(str::to_string)
            .collect()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl fmt::Debug for Installation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Installation")
            .field("name", &self.name)
            .field("server_url", &self.server_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("login", &self.login)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Lookup of installations by name
#[cfg_attr(test, mockall::automock)]
pub trait InstallationLookup: Send + Sync + 'static {
    fn find(&self, name: &str) -> Option<Installation>;
}

/// In-memory installation store built from configuration
#[derive(Debug, Clone, Default)]
pub struct InstallationStore {
    installations: Vec<Installation>,
}

impl InstallationStore {
    pub fn new(installations: Vec<Installation>) -> Self {
        Self { installations }
    }

    pub fn all(&self) -> &[Installation] {
        &self.installations
    }

    pub fn is_empty(&self) -> bool {
        self.installations.is_empty()
    }
}

impl InstallationLookup for InstallationStore {
    fn find(&self, name: &str) -> Option<Installation> {
        self.installations.iter().find(|i| i.name == name).cloned()
    }
}
