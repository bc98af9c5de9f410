//! Ephemeral stores, one per namespace.
//!
//! Each store is a trait (mockable in consumer tests) with one
//! implementation over an injected [`KvStore`] backend:
//!
//! - **verification** - OTP issuance/redemption and change-flow pendings
//! - **views** - per-IP view dedup ledger and per-article tallies
//! - **short_link** - bidirectional token ↔ article mapping
//! - **blocklist** - the admin block flag
//!
//! The stores own their key formats; nothing outside this module builds or
//! parses a store key.

mod blocklist;
mod short_link;
mod verification;
mod views;

pub use blocklist::{BlockStore, KvBlockStore};
pub use short_link::{KvShortLinkStore, ShortLinkStore};
pub use verification::{
    ChangeKind, ChangeRequest, IssuedVerification, KvVerificationStore, VerificationStore,
    normalize_mobile,
};
pub use views::{KvViewStore, ViewStore};

#[cfg(test)]
pub use blocklist::MockBlockStore;
#[cfg(test)]
pub use short_link::MockShortLinkStore;
#[cfg(test)]
pub use verification::MockVerificationStore;
#[cfg(test)]
pub use views::MockViewStore;

use std::sync::Arc;

use crate::codegen;
use crate::config::Config;
use crate::kv::{
    ADMIN_NAMESPACE, RedisKvStore, SHORT_LINK_NAMESPACE, VERIFICATION_NAMESPACE, VIEWS_NAMESPACE,
};

/// Collection of all ephemeral stores.
#[derive(Clone)]
pub struct Stores {
    pub verification: Arc<dyn VerificationStore>,
    pub views: Arc<dyn ViewStore>,
    pub short_links: Arc<dyn ShortLinkStore>,
    pub blocklist: Arc<dyn BlockStore>,
}

impl Stores {
    /// Builds all stores over one Redis client, one namespace each.
    pub fn redis(client: redis::Client, config: &Config) -> Self {
        let codes = codegen::for_config(config);

        Self {
            verification: Arc::new(KvVerificationStore::new(
                Arc::new(RedisKvStore::new(client.clone(), VERIFICATION_NAMESPACE)),
                codes.clone(),
                config.code_ttl(),
            )),
            views: Arc::new(KvViewStore::new(Arc::new(RedisKvStore::new(
                client.clone(),
                VIEWS_NAMESPACE,
            )))),
            short_links: Arc::new(KvShortLinkStore::new(
                Arc::new(RedisKvStore::new(client.clone(), SHORT_LINK_NAMESPACE)),
                codes,
            )),
            blocklist: Arc::new(KvBlockStore::new(Arc::new(RedisKvStore::new(
                client,
                ADMIN_NAMESPACE,
            )))),
        }
    }
}
