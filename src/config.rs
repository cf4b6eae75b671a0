//! Application configuration management.
//!
//! Configuration comes from environment variables (optionally seeded from
//! a `.env` file) and is deserialized with `envy` into a typed struct.

use serde::Deserialize;
use thiserror::Error;

use crate::services::payment_method_validator::UnknownProviderPolicy;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `SERVER_PORT`: HTTP server port, defaults to 3000
/// - `TRANSACTION_EXPIRY_HOURS`: window before a pending transaction
///   expires, 1 to 8760 (one year), defaults to 24
/// - `EXPIRY_SWEEP_INTERVAL_SECS`: how often the expiry sweeper runs,
///   defaults to 60
/// - `DENY_UNKNOWN_PROVIDERS`: reject payment providers missing from the
///   compatibility matrix, defaults to false
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_expiry_hours")]
    pub transaction_expiry_hours: u32,

    #[serde(default = "default_sweep_interval")]
    pub expiry_sweep_interval_secs: u64,

    #[serde(default)]
    pub deny_unknown_providers: bool,
}

fn default_port() -> u16 {
    3000
}

/// Upper bound for `TRANSACTION_EXPIRY_HOURS`.
pub const MAX_TRANSACTION_EXPIRY_HOURS: u32 = 24 * 365;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envy::Error),

    #[error(
        "TRANSACTION_EXPIRY_HOURS must be between 1 and {max}, got {0}",
        max = MAX_TRANSACTION_EXPIRY_HOURS
    )]
    ExpiryOutOfRange(u32),
}

fn default_expiry_hours() -> u32 {
    24
}

fn default_sweep_interval() -> u64 {
    60
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file is read first if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed into
    /// the expected type, or if a value is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>()?.validated()
    }

    /// Load configuration from explicit key/value pairs.
    pub fn from_iter<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars)?.validated()
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if !(1..=MAX_TRANSACTION_EXPIRY_HOURS).contains(&self.transaction_expiry_hours) {
            return Err(ConfigError::ExpiryOutOfRange(self.transaction_expiry_hours));
        }
        Ok(self)
    }

    pub fn unknown_provider_policy(&self) -> UnknownProviderPolicy {
        if self.deny_unknown_providers {
            UnknownProviderPolicy::Deny
        } else {
            UnknownProviderPolicy::Allow
        }
    }

    pub fn transaction_expiry(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.transaction_expiry_hours))
    }
}
