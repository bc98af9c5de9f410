use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

/// Configuration for the ephemeral stores, loaded from `ARTICLESLAND_*`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub redis_url: String,
    /// TTL for verification codes, keys, and opportunity gates, in seconds.
    #[serde(default = "default_code_ttl_secs")]
    pub code_ttl_secs: u64,
    /// When set, every issued verification code is this value instead of a
    /// random one, and collision checks are skipped. Test suites set this to
    /// get reproducible codes; leave unset in production.
    #[serde(default)]
    pub fixed_code: Option<String>,
}

fn default_code_ttl_secs() -> u64 {
    120
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(envy::prefixed("ARTICLESLAND_").from_env::<Config>()?)
    }

    pub fn code_ttl(&self) -> Duration {
        Duration::from_secs(self.code_ttl_secs)
    }
}
