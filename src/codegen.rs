//! Token generation strategies.
//!
//! The generator is picked once at startup: random in production, fixed in
//! test runs (`Config::fixed_code`). Collision handling lives in the stores,
//! which retry generation against the backend until an unused value lands.

use std::sync::Arc;

use rand::Rng;
use uuid::Uuid;

use crate::config::Config;

#[cfg_attr(test, mockall::automock)]
pub trait CodeGenerator: Send + Sync {
    /// A 6-digit numeric code, delivered out-of-band (SMS/email).
    fn numeric_code(&self) -> String;

    /// A uuid v4, returned in-band as the second redemption factor.
    fn unique_key(&self) -> String;

    /// An 8-character token for short links.
    fn short_token(&self) -> String;

    /// Whether callers should regenerate on collision. Fixed generators
    /// return false: their code never changes, so callers overwrite instead.
    fn retries_on_collision(&self) -> bool;
}

/// Picks the generator for this process based on configuration.
pub fn for_config(config: &Config) -> Arc<dyn CodeGenerator> {
    match &config.fixed_code {
        Some(code) => Arc::new(FixedCodeGenerator::new(code.clone())),
        None => Arc::new(RandomCodeGenerator),
    }
}

pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn numeric_code(&self) -> String {
        let mut rng = rand::rng();
        (0..6)
            .map(|_| rng.random_range(0..10).to_string())
            .collect()
    }

    fn unique_key(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn short_token(&self) -> String {
        let key = Uuid::new_v4().to_string();
        key.split('-').next().unwrap_or_default().to_string()
    }

    fn retries_on_collision(&self) -> bool {
        true
    }
}

/// Deterministic numeric codes for reproducible test suites. Only the
/// numeric code is fixed; keys and short tokens stay random.
pub struct FixedCodeGenerator {
    code: String,
}

impl FixedCodeGenerator {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

impl CodeGenerator for FixedCodeGenerator {
    fn numeric_code(&self) -> String {
        self.code.clone()
    }

    fn unique_key(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn short_token(&self) -> String {
        RandomCodeGenerator.short_token()
    }

    fn retries_on_collision(&self) -> bool {
        false
    }
}
