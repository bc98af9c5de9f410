//! The TTL key-value backend seam.
//!
//! Each store instance is bound to one namespace; physical Redis keys are
//! `{namespace}:{key}`. Stores never share keys across namespaces, so a
//! namespace can be wiped wholesale without touching the others.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use redis::AsyncCommands;

pub const VERIFICATION_NAMESPACE: &str = "verification";
pub const VIEWS_NAMESPACE: &str = "views";
pub const SHORT_LINK_NAMESPACE: &str = "shortLink";
pub const ADMIN_NAMESPACE: &str = "admin";

/// A namespaced key-value store with per-entry expiry.
///
/// `set_nx*` and `take` are the atomic primitives the stores lean on to keep
/// generation and redemption single-winner under concurrent requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set without expiry.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Set with expiry.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Set without expiry, only if the key is unused. Returns whether the
    /// write happened.
    async fn set_nx(&self, key: &str, value: &str) -> Result<bool>;

    /// Set with expiry, only if the key is unused. Returns whether the
    /// write happened.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    /// Atomically read and delete. Of two concurrent takers, exactly one
    /// sees the value.
    async fn take(&self, key: &str) -> Result<Option<String>>;

    /// Delete a key (returns true if it existed).
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Delete every key in this namespace. A no-op when already empty.
    async fn clear(&self) -> Result<()>;
}

/// Redis implementation of [`KvStore`].
#[derive(Clone)]
pub struct RedisKvStore {
    client: redis::Client,
    namespace: &'static str,
}

impl RedisKvStore {
    pub fn new(client: redis::Client, namespace: &'static str) -> Self {
        Self { client, namespace }
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(self.key(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.set(self.key(key), value).await?;
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(self.key(key), value, ttl.as_secs()).await?;
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str) -> Result<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let set: Option<String> = redis::cmd("SET")
            .arg(self.key(key))
            .arg(value)
            .arg("NX")
            .query_async(&mut conn)
            .await?;
        Ok(set.is_some())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let set: Option<String> = redis::cmd("SET")
            .arg(self.key(key))
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async(&mut conn)
            .await?;
        Ok(set.is_some())
    }

    async fn take(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = redis::cmd("GETDEL")
            .arg(self.key(key))
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let deleted: i64 = conn.del(self.key(key)).await?;
        Ok(deleted > 0)
    }

    async fn clear(&self) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // Namespaces stay small (OTPs expire on their own; ledgers reset
        // daily), so a blocking KEYS scan once a day is acceptable.
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(format!("{}:*", self.namespace))
            .query_async(&mut conn)
            .await?;

        if !keys.is_empty() {
            let _: () = conn.del(keys).await?;
        }
        Ok(())
    }
}
