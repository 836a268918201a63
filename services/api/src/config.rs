//! Service settings loaded from environment variables
//!
//! Database and token settings live with their own crates
//! (`common::database::DatabaseConfig`, `auth::JwtConfig`); this covers what
//! is specific to the HTTP service.

use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;

/// Storage backend selected at startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

/// HTTP service settings
///
/// # Environment Variables
/// - `BIND_ADDRESS`: listen address (default: `0.0.0.0:3000`)
/// - `STORAGE_BACKEND`: `postgres` or `memory` (default: `postgres`)
/// - `ADMIN_EMAIL` / `ADMIN_PASSWORD`: administrator created at startup
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default)]
    pub storage_backend: StorageBackend,
    #[serde(default)]
    pub admin_email: Option<String>,
    #[serde(default)]
    pub admin_password: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::from_source(Environment::default())
    }

    fn from_source(environment: Environment) -> Result<Self> {
        Config::builder()
            .add_source(environment)
            .build()
            .context("Failed to read service settings")?
            .try_deserialize()
            .context("Invalid service settings")
    }

    /// Administrator credentials, when both halves are configured
    pub fn admin_credentials(&self) -> Option<(&str, &str)> {
        match (self.admin_email.as_deref(), self.admin_password.as_deref()) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some((email, password))
            }
            _ => None,
        }
    }
}
