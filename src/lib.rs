//! Ephemeral key-value state for the articles platform.
//!
//! Everything in this crate is short-lived, namespaced state held in a shared
//! TTL key-value backend (Redis). The relational database remains the system
//! of record; this crate only covers the pieces that need expiry, uniqueness,
//! and at-most-once consumption:
//!
//! - **verification** - one-time signup/login codes and mobile/email change
//!   confirmations, with a per-subject rate-limit gate
//! - **views** - per-IP article view deduplication and running view tallies
//! - **shortLink** - compact public tokens resolving to article ids
//! - **admin** - the block/unblock flag per user
//!
//! ## Key patterns
//!
//! ```text
//! verification:{code}          → user id (6-digit OTP, TTL)
//! verification:{uuid}          → user id (second factor, TTL)
//! verification:{phone|email}   → user id (opportunity gate, TTL)
//! verification:mobile-{id}     → pending phone number (TTL)
//! verification:email-{id}      → pending email address (TTL)
//! views:{ip}                   → comma-joined article ids (no TTL)
//! views:counter-{id}           → view tally (no TTL)
//! shortLink:{token}            → link-{id} (no TTL)
//! shortLink:link-{id}          → token (no TTL)
//! admin:block-{id}             → "true" (no TTL)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let config = Config::from_env()?;
//! let redis = redis::Client::open(config.redis_url.as_str())?;
//! let stores = Stores::redis(redis, &config);
//!
//! let issued = stores.verification.issue(user.id, &mobile).await?;
//! // deliver issued.code out-of-band, return issued.key to the client
//!
//! let _reaper = reaper::start(stores.verification.clone(), stores.views.clone()).await?;
//! ```

pub mod codegen;
pub mod config;
pub mod kv;
pub mod reaper;
pub mod stores;

#[cfg(test)]
mod test_utils;

pub use config::Config;
pub use stores::Stores;
