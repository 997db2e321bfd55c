//! Connection profile parsing
//!
//! Storage credentials arrive from configuration as a single
//! `host:port:user@password:database` string. The format is positional and
//! strict: malformed strings fail fast at load time instead of surfacing as
//! connection errors later.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{Error, Result};

/// A parsed relational-store connection profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConnectionProfile {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl ConnectionProfile {
    /// The same profile pointed at a different database
    pub fn with_database(&self, database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..self.clone()
        }
    }
}

impl FromStr for ConnectionProfile {
    type Err = Error;

    /// Parse `host:port:user@password:database`
    fn from_str(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.split(':').collect();
        let [host, port, creds, database] = parts.as_slice() else {
            return Err(Error::config(format!(
                "connection profile must have 4 ':' separated fields, got {}",
                parts.len()
            )));
        };

        let (user, password) = creds.split_once('@').ok_or_else(|| {
            Error::config("connection profile credentials must be 'user@password'")
        })?;

        if host.is_empty() || user.is_empty() || database.is_empty() {
            return Err(Error::config(
                "connection profile host, user, and database must be non-empty",
            ));
        }

        let port: u16 = port
            .parse()
            .map_err(|_| Error::config(format!("invalid port '{port}' in connection profile")))?;

        Ok(Self {
            host: host.to_string(),
            port,
            user: user.to_string(),
            password: password.to_string(),
            database: database.to_string(),
        })
    }
}

impl TryFrom<String> for ConnectionProfile {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self> {
        raw.parse()
    }
}

impl From<ConnectionProfile> for String {
    fn from(profile: ConnectionProfile) -> Self {
        format!(
            "{}:{}:{}@{}:{}",
            profile.host, profile.port, profile.user, profile.password, profile.database
        )
    }
}
