//! The admin block flag. Presence of `block-{id}` means blocked.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::kv::KvStore;

fn block_key(user_id: i64) -> String {
    format!("block-{}", user_id)
}

/// Store for the per-user block flag.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlockStore: Send + Sync {
    async fn block(&self, user_id: i64) -> Result<()>;

    async fn unblock(&self, user_id: i64) -> Result<()>;

    async fn is_blocked(&self, user_id: i64) -> Result<bool>;
}

/// [`BlockStore`] over an injected key-value backend.
pub struct KvBlockStore {
    kv: Arc<dyn KvStore>,
}

impl KvBlockStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }
}

#[async_trait]
impl BlockStore for KvBlockStore {
    async fn block(&self, user_id: i64) -> Result<()> {
        self.kv.set(&block_key(user_id), "true").await
    }

    async fn unblock(&self, user_id: i64) -> Result<()> {
        self.kv.delete(&block_key(user_id)).await?;
        Ok(())
    }

    async fn is_blocked(&self, user_id: i64) -> Result<bool> {
        Ok(self.kv.get(&block_key(user_id)).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MemoryKvStore;

    fn store() -> KvBlockStore {
        KvBlockStore::new(Arc::new(MemoryKvStore::new()))
    }

    #[tokio::test]
    async fn users_start_unblocked() {
        let store = store();

        assert!(!store.is_blocked(42).await.unwrap());
    }

    #[tokio::test]
    async fn block_and_unblock_round_trip() {
        let store = store();

        store.block(42).await.unwrap();
        assert!(store.is_blocked(42).await.unwrap());
        assert!(!store.is_blocked(43).await.unwrap());

        store.unblock(42).await.unwrap();
        assert!(!store.is_blocked(42).await.unwrap());
    }

    #[tokio::test]
    async fn unblocking_an_unblocked_user_is_a_no_op() {
        let store = store();

        store.unblock(42).await.unwrap();
        assert!(!store.is_blocked(42).await.unwrap());
    }
}
