//! Short links: compact public tokens resolving to article ids.
//!
//! The mapping is stored in both directions - `{token} → link-{id}` forward,
//! `link-{id} → {token}` reverse - so issuance can be idempotent (the reverse
//! entry is the canonical "already issued" record) and resolution is a single
//! forward lookup. No TTL: short links live until explicitly rotated.

use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;

use crate::codegen::CodeGenerator;
use crate::kv::KvStore;

const MAX_GENERATION_ATTEMPTS: usize = 64;

fn link_key(article_id: i64) -> String {
    format!("link-{}", article_id)
}

fn parse_link_key(raw: &str) -> Option<i64> {
    raw.strip_prefix("link-")?.parse().ok()
}

/// Store for short link issuance and resolution.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShortLinkStore: Send + Sync {
    /// Issue a token for the article. Idempotent: once a token exists, every
    /// further call returns it unchanged.
    async fn issue(&self, article_id: i64) -> Result<String>;

    /// Resolve a public token back to its article id. Unknown or malformed
    /// tokens are None.
    async fn resolve(&self, token: &str) -> Result<Option<i64>>;

    /// Drop every link, forcing reissuance. Explicit rotation only - the
    /// daily reaper does not touch this namespace.
    async fn clear(&self) -> Result<()>;
}

/// [`ShortLinkStore`] over an injected key-value backend.
pub struct KvShortLinkStore {
    kv: Arc<dyn KvStore>,
    codes: Arc<dyn CodeGenerator>,
}

impl KvShortLinkStore {
    pub fn new(kv: Arc<dyn KvStore>, codes: Arc<dyn CodeGenerator>) -> Self {
        Self { kv, codes }
    }
}

#[async_trait]
impl ShortLinkStore for KvShortLinkStore {
    async fn issue(&self, article_id: i64) -> Result<String> {
        let link = link_key(article_id);

        if let Some(existing) = self.kv.get(&link).await? {
            return Ok(existing);
        }

        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let token = self.codes.short_token();
            if !self.kv.set_nx(&token, &link).await? {
                continue;
            }

            if self.kv.set_nx(&link, &token).await? {
                return Ok(token);
            }

            // A concurrent issuance bound a token first; discard ours and
            // return the winner's so repeated calls stay idempotent.
            self.kv.delete(&token).await?;
            if let Some(existing) = self.kv.get(&link).await? {
                return Ok(existing);
            }
        }
        bail!("no unused short link token after {MAX_GENERATION_ATTEMPTS} attempts")
    }

    async fn resolve(&self, token: &str) -> Result<Option<i64>> {
        match self.kv.get(token).await? {
            Some(raw) => Ok(parse_link_key(&raw)),
            None => Ok(None),
        }
    }

    async fn clear(&self) -> Result<()> {
        self.kv.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::RandomCodeGenerator;
    use crate::test_utils::MemoryKvStore;

    fn store() -> KvShortLinkStore {
        KvShortLinkStore::new(Arc::new(MemoryKvStore::new()), Arc::new(RandomCodeGenerator))
    }

    #[tokio::test]
    async fn issuance_is_idempotent() {
        let store = store();

        let first = store.issue(7).await.unwrap();
        let second = store.issue(7).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 8);
    }

    #[tokio::test]
    async fn a_token_resolves_back_to_its_article() {
        let store = store();

        let token = store.issue(7).await.unwrap();

        assert_eq!(store.resolve(&token).await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn distinct_articles_get_distinct_tokens() {
        let store = store();

        let a = store.issue(1).await.unwrap();
        let b = store.issue(2).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(store.resolve(&a).await.unwrap(), Some(1));
        assert_eq!(store.resolve(&b).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn an_unknown_token_resolves_to_none() {
        let store = store();

        assert_eq!(store.resolve("deadbeef").await.unwrap(), None);
    }

    #[tokio::test]
    async fn a_malformed_forward_entry_resolves_to_none() {
        let kv = Arc::new(MemoryKvStore::new());
        let store = KvShortLinkStore::new(kv.clone(), Arc::new(RandomCodeGenerator));

        kv.set("deadbeef", "not-a-link").await.unwrap();

        assert_eq!(store.resolve("deadbeef").await.unwrap(), None);
    }

    #[tokio::test]
    async fn rotation_forces_a_fresh_token() {
        let store = store();

        let before = store.issue(7).await.unwrap();
        store.clear().await.unwrap();

        assert_eq!(store.resolve(&before).await.unwrap(), None);
        let after = store.issue(7).await.unwrap();
        assert_eq!(store.resolve(&after).await.unwrap(), Some(7));
    }
}
