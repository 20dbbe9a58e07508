use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AppError;
use crate::storage::client::StorageClient;

/// In-process implementation of [`StorageClient`].
///
/// Used for offline mode (no bucket configured) and in tests. Keeps a count
/// of every call so callers can assert how many round-trips an operation made.
#[derive(Default)]
pub struct MemoryStorageClient {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    gets: AtomicUsize,
    puts: AtomicUsize,
    deletes: AtomicUsize,
    lists: AtomicUsize,
}

#[derive(Debug, Clone)]
struct StoredObject {
    content: Vec<u8>,
    content_type: String,
}

impl MemoryStorageClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without counting it as a put.
    pub fn insert(&self, key: &str, content: impl Into<Vec<u8>>) {
        self.lock().insert(
            key.to_string(),
            StoredObject {
                content: content.into(),
                content_type: crate::storage::client::JSON_CONTENT_TYPE.to_string(),
            },
        );
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.lock().get(key).map(|o| o.content_type.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn list_count(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    /// Total number of store calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.get_count() + self.put_count() + self.delete_count() + self.list_count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, StoredObject>> {
        // A poisoned map is still a valid map
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl StorageClient for MemoryStorageClient {
    async fn put_object(
        &self,
        key: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AppError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.lock().insert(
            key.to_string(),
            StoredObject {
                content,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.lock().get(key).map(|o| o.content.clone()))
    }

    async fn delete_object(&self, key: &str) -> Result<(), AppError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.lock().remove(key);
        Ok(())
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, AppError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryStorageClient::new();
        store
            .put_object("reports/a.json", b"{}".to_vec(), "application/json")
            .await
            .unwrap();

        let body = store.get_object("reports/a.json").await.unwrap();
        assert_eq!(body, Some(b"{}".to_vec()));
        assert_eq!(
            store.content_type("reports/a.json").as_deref(),
            Some("application/json")
        );

        store.delete_object("reports/a.json").await.unwrap();
        assert!(store.get_object("reports/a.json").await.unwrap().is_none());
        assert_eq!(store.put_count(), 1);
        assert_eq!(store.get_count(), 2);
        assert_eq!(store.delete_count(), 1);
    }

    #[tokio::test]
    async fn test_list_filters_by_prefix() {
        let store = MemoryStorageClient::new();
        store.insert("reports/a.json", "{}");
        store.insert("reports/b.json", "{}");
        store.insert("indexes/hashtags.json", "{}");

        let keys = store.list_objects("reports/").await.unwrap();
        assert_eq!(keys, vec!["reports/a.json", "reports/b.json"]);
        assert_eq!(store.list_count(), 1);
        assert_eq!(store.put_count(), 0, "seeding must not count as a put");
    }
}
