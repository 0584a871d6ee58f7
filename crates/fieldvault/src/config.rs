//! Configuration loading for the encryption subsystem.
//!
//! All values are read from environment variables at startup. The
//! encryption key is optional — an absent key falls back to a derived one
//! with a loud warning rather than refusing to start.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Service configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Base64-encoded 32-byte field encryption key (`ENCRYPTION_KEY`).
    /// Optional; when absent a fallback key is derived and a startup
    /// warning is logged.
    pub encryption_key: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment source cannot be read or a
    /// variable cannot be deserialised.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let mut c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.normalise();
        Ok(c)
    }

    /// Treat whitespace-only values as absent so an empty `ENCRYPTION_KEY=`
    /// takes the same fallback path as an unset one.
    fn normalise(&mut self) {
        if let Some(key) = &self.encryption_key {
            if key.trim().is_empty() {
                self.encryption_key = None;
            }
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material — not even in debug builds.
        f.debug_struct("Config")
            .field(
                "encryption_key",
                &self.encryption_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("log_level", &self.log_level)
            .finish()
    }
}
