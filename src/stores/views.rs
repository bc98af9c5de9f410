//! Per-IP view deduplication and per-article view tallies.
//!
//! Identity is the viewer's IP address, nothing stronger - the article read
//! path is public and unauthenticated, so this is best-effort dedup, not an
//! anti-fraud control. Entries carry no TTL; the daily reaper wipes the
//! namespace, which is what turns "once per IP" into "once per IP per
//! calendar day" for every article at the same instant.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::kv::KvStore;

/// Store for view counting.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ViewStore: Send + Sync {
    /// Record a view. Returns whether this IP had **already** been counted
    /// for the article - callers bump the article's persisted `viewed`
    /// column only when this is false.
    async fn record_view(&self, article_id: i64, viewer_ip: &str) -> Result<bool>;

    /// Running tally for an article; 0 if never viewed.
    async fn view_count(&self, article_id: i64) -> Result<i64>;

    /// Wipe the whole namespace. Reaper only.
    async fn clear(&self) -> Result<()>;
}

/// [`ViewStore`] over an injected key-value backend.
pub struct KvViewStore {
    kv: Arc<dyn KvStore>,
}

fn counter_key(article_id: i64) -> String {
    format!("counter-{}", article_id)
}

impl KvViewStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// The article ids this IP has been credited with, parsed from the
    /// comma-joined ledger entry. Blank segments are dropped.
    async fn viewed_articles(&self, viewer_ip: &str) -> Result<Vec<String>> {
        let ledger = self.kv.get(viewer_ip).await?;

        Ok(ledger
            .map(|raw| {
                raw.split(',')
                    .filter(|id| !id.trim().is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn increase(&self, article_id: i64) -> Result<()> {
        let key = counter_key(article_id);
        let current = match self.kv.get(&key).await? {
            Some(raw) => raw.parse::<i64>().unwrap_or(0),
            None => 0,
        };

        self.kv.set(&key, &(current + 1).to_string()).await
    }
}

#[async_trait]
impl ViewStore for KvViewStore {
    async fn record_view(&self, article_id: i64, viewer_ip: &str) -> Result<bool> {
        let mut articles = self.viewed_articles(viewer_ip).await?;
        let id = article_id.to_string();

        if articles.contains(&id) {
            return Ok(true);
        }

        articles.push(id);
        self.kv.set(viewer_ip, &articles.join(",")).await?;
        self.increase(article_id).await?;

        Ok(false)
    }

    async fn view_count(&self, article_id: i64) -> Result<i64> {
        let count = match self.kv.get(&counter_key(article_id)).await? {
            Some(raw) => raw.parse::<i64>().unwrap_or(0),
            None => 0,
        };
        Ok(count)
    }

    async fn clear(&self) -> Result<()> {
        self.kv.clear().await
    }
}
