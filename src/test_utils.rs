//! Shared test utilities.
//!
//! `MemoryKvStore` is a real [`KvStore`] over a `HashMap`, so store tests
//! exercise the actual issuance/redemption logic without a Redis instance.
//! Mocks (`MockKvStore`, `MockVerificationStore`, ...) stay the right tool
//! when the seam itself is under test.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;

use crate::kv::KvStore;

type Entry = (String, Option<Instant>);

/// In-memory key-value store with per-entry expiry.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(entry: &Entry) -> bool {
        entry.1.is_none_or(|deadline| Instant::now() < deadline)
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if Self::live(entry) => Ok(Some(entry.0.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), (value.to_string(), None));
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key.to_string(),
            (value.to_string(), Some(Instant::now() + ttl)),
        );
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str) -> Result<bool> {
        let mut entries = self.entries.lock().unwrap();
        if entries.get(key).is_some_and(Self::live) {
            return Ok(false);
        }
        entries.insert(key.to_string(), (value.to_string(), None));
        Ok(true)
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut entries = self.entries.lock().unwrap();
        if entries.get(key).is_some_and(Self::live) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            (value.to_string(), Some(Instant::now() + ttl)),
        );
        Ok(true)
    }

    async fn take(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.remove(key) {
            Some(entry) if Self::live(&entry) => Ok(Some(entry.0)),
            _ => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.lock().unwrap();
        Ok(entries.remove(key).as_ref().is_some_and(Self::live))
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entries_expire_after_their_ttl() {
        let store = MemoryKvStore::new();

        store
            .set_ex("code", "42", Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(store.get("code").await.unwrap(), Some("42".to_string()));

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(store.get("code").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_nx_refuses_a_live_key_but_accepts_an_expired_one() {
        let store = MemoryKvStore::new();

        assert!(store.set_nx("key", "a").await.unwrap());
        assert!(!store.set_nx("key", "b").await.unwrap());
        assert_eq!(store.get("key").await.unwrap(), Some("a".to_string()));

        store
            .set_ex("ttl-key", "a", Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(store
            .set_nx_ex("ttl-key", "b", Duration::from_secs(60))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn take_removes_the_entry() {
        let store = MemoryKvStore::new();

        store.set("key", "value").await.unwrap();

        assert_eq!(store.take("key").await.unwrap(), Some("value".to_string()));
        assert_eq!(store.take("key").await.unwrap(), None);
        assert_eq!(store.get("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_reports_whether_the_key_existed() {
        let store = MemoryKvStore::new();

        store.set("key", "value").await.unwrap();

        assert!(store.delete("key").await.unwrap());
        assert!(!store.delete("key").await.unwrap());
    }
}
