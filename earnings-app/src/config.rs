//! Configuration loading from environment.

use std::env;
use std::time::Duration;

/// Application configuration.
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub gateway_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()?;

        // memory:// keeps everything in-process; sqlite://... persists
        // (requires the `sqlite` feature).
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "memory://".to_string());

        let gateway_timeout_secs: u64 = env::var("GATEWAY_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()?;

        Ok(Self {
            port,
            database_url,
            gateway_timeout: Duration::from_secs(gateway_timeout_secs),
        })
    }
}
