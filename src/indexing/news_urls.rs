use std::sync::Arc;

use chrono::Utc;

use crate::error::AppError;
use crate::indexing::normalize::normalize_url;
use crate::models::index::{NewsUrlIndexDocument, NewsUrlIndexEntry};
use crate::models::report::Report;
use crate::reports::repository::load_all_reports;
use crate::storage::client::{StorageClient, JSON_CONTENT_TYPE};
use crate::storage::keys::NEWS_URL_INDEX_KEY;

/// Index entries for every news item of `report` that has a URL.
pub fn entries_for_report(report: &Report) -> Vec<NewsUrlIndexEntry> {
    report
        .news
        .iter()
        .filter(|n| n.has_url())
        .map(|n| NewsUrlIndexEntry {
            normalized_url: normalize_url(&n.url),
            original_url: n.url.clone(),
            report_id: report.id.clone(),
            report_title: report.title.clone(),
            news_id: n.id.clone(),
            news_title: n.title.clone(),
            date: n.date,
        })
        .collect()
}

/// Flat index of news URLs across all reports, used to warn editors that a
/// link has already been recorded.
///
/// Maintenance is read-modify-write on a single document with no version
/// check: concurrent writers race and the last one wins. The index is
/// rebuilt from the reports whenever a lookup finds it missing.
///
/// Indexing a report while the document is missing does not rebuild: it
/// writes a document holding only that report's entries. From then on the
/// document exists, so lookups no longer rebuild and reports stored earlier
/// stay unmatched until [`NewsUrlIndex::rebuild`] is run.
pub struct NewsUrlIndex {
    storage: Arc<dyn StorageClient>,
}

impl NewsUrlIndex {
    pub fn new(storage: Arc<dyn StorageClient>) -> Self {
        Self { storage }
    }

    /// Replace every entry of `report` with entries for its current news items.
    pub async fn index_report_news(&self, report: &Report) -> Result<(), AppError> {
        let mut entries = self.load().await.map(|doc| doc.entries).unwrap_or_default();

        entries.retain(|e| e.report_id != report.id);
        let fresh = entries_for_report(report);
        let added = fresh.len();
        entries.extend(fresh);

        self.write(entries).await?;
        tracing::debug!(report_id = %report.id, entries = added, "Indexed report news URLs");
        Ok(())
    }

    /// Drop every entry of the given report. A missing index is left missing.
    pub async fn remove_report_from_url_index(&self, report_id: &str) -> Result<(), AppError> {
        let Some(doc) = self.load().await else {
            return Ok(());
        };

        let before = doc.entries.len();
        let entries: Vec<_> = doc
            .entries
            .into_iter()
            .filter(|e| e.report_id != report_id)
            .collect();

        tracing::debug!(
            report_id,
            removed = before - entries.len(),
            "Removed report from news URL index"
        );
        self.write(entries).await
    }

    /// Entries whose normalized URL matches `url`.
    ///
    /// Blank input returns nothing without touching the store. A missing index
    /// is rebuilt first; if that fails the lookup reports no duplicates.
    pub async fn find_url_duplicates(&self, url: &str) -> Vec<NewsUrlIndexEntry> {
        if url.trim().is_empty() {
            return Vec::new();
        }
        let needle = normalize_url(url);

        let entries = match self.load().await {
            Some(doc) => doc.entries,
            None => match self.rebuild().await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Failed to rebuild news URL index: {e}");
                    Vec::new()
                }
            },
        };

        entries
            .into_iter()
            .filter(|e| e.normalized_url == needle)
            .collect()
    }

    /// Rebuild the whole index from every report in the store and persist it.
    pub async fn rebuild(&self) -> Result<Vec<NewsUrlIndexEntry>, AppError> {
        let reports = load_all_reports(self.storage.as_ref()).await?;
        let entries: Vec<_> = reports.iter().flat_map(entries_for_report).collect();

        tracing::info!(
            reports = reports.len(),
            entries = entries.len(),
            "Rebuilt news URL index"
        );
        self.write(entries.clone()).await?;
        Ok(entries)
    }

    /// Read the index document. Missing, unreadable and malformed documents
    /// are all reported as `None`.
    async fn load(&self) -> Option<NewsUrlIndexDocument> {
        let bytes = match self.storage.get_object(NEWS_URL_INDEX_KEY).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to read news URL index: {e}");
                return None;
            }
        };

        serde_json::from_slice(&bytes)
            .map_err(|e| tracing::warn!("Ignoring malformed news URL index: {e}"))
            .ok()
    }

    async fn write(&self, entries: Vec<NewsUrlIndexEntry>) -> Result<(), AppError> {
        let doc = NewsUrlIndexDocument {
            updated_at: Utc::now(),
            entries,
        };
        let body = serde_json::to_vec_pretty(&doc)?;
        self.storage
            .put_object(NEWS_URL_INDEX_KEY, body, JSON_CONTENT_TYPE)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::models::report::NewsItem;
    use crate::storage::client::MockStorageClient;
    use crate::storage::keys::report_key;
    use crate::storage::memory::MemoryStorageClient;

    fn report(id: &str, urls: &[&str]) -> Report {
        let mut report = Report::new(format!("Report {id}"));
        report.id = id.to_string();
        report.news = urls
            .iter()
            .map(|u| NewsItem::new(format!("news {u}"), *u, 1.0))
            .collect();
        report
    }

    fn index() -> (Arc<MemoryStorageClient>, NewsUrlIndex) {
        let storage = Arc::new(MemoryStorageClient::new());
        let index = NewsUrlIndex::new(storage.clone());
        (storage, index)
    }

    async fn add(index: &NewsUrlIndex, id: &str, urls: &[&str]) {
        index.index_report_news(&report(id, urls)).await.unwrap();
    }

    fn store_report(storage: &MemoryStorageClient, id: &str, urls: &[&str]) {
        let body = serde_json::to_vec(&report(id, urls)).unwrap();
        storage.insert(&report_key(id), body);
    }

    #[test]
    fn test_entries_skip_blank_urls() {
        let r = report("r1", &["https://a.com/x/", "", "   "]);
        let entries = entries_for_report(&r);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].normalized_url, "https://a.com/x");
        assert_eq!(entries[0].original_url, "https://a.com/x/");
        assert_eq!(entries[0].report_title, "Report r1");
    }

    #[tokio::test]
    async fn test_reindex_replaces_entries() {
        let (storage, index) = index();
        let u1 = "https://a.com/1";
        let u2 = "https://a.com/2";
        let u3 = "https://a.com/3";

        add(&index, "r", &[u1, u2]).await;
        add(&index, "r", &[u2, u3]).await;

        // The index document exists now, so lookups don't rebuild.
        let lists_before = storage.list_count();
        assert!(index.find_url_duplicates(u1).await.is_empty());
        assert_eq!(index.find_url_duplicates(u2).await.len(), 1);
        let dup3 = index.find_url_duplicates(u3).await;
        assert_eq!(dup3.len(), 1);
        assert_eq!(dup3[0].report_id, "r");
        assert_eq!(storage.list_count(), lists_before);
    }

    #[tokio::test]
    async fn test_index_keeps_other_reports() {
        let (_, index) = index();
        add(&index, "a", &["https://x.com/n"]).await;
        add(&index, "b", &["https://x.com/n?utm_source=tg"]).await;

        let dups = index.find_url_duplicates("https://X.com/n/#frag").await;
        let mut ids: Vec<_> = dups.iter().map(|e| e.report_id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_remove_report() {
        let (storage, index) = index();
        add(&index, "a", &["https://x.com/n"]).await;
        add(&index, "b", &["https://x.com/n"]).await;

        index.remove_report_from_url_index("a").await.unwrap();
        let dups = index.find_url_duplicates("https://x.com/n").await;
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].report_id, "b");
        assert_eq!(storage.put_count(), 3);
    }

    #[tokio::test]
    async fn test_remove_without_index_is_noop() {
        let (storage, index) = index();
        index.remove_report_from_url_index("a").await.unwrap();
        assert_eq!(storage.put_count(), 0);
        assert!(!storage.contains(NEWS_URL_INDEX_KEY));
    }

    #[tokio::test]
    async fn test_blank_query_does_not_touch_store() {
        let mut storage = MockStorageClient::new();
        storage.expect_get_object().never();
        storage.expect_list_objects().never();
        storage.expect_put_object().never();

        let index = NewsUrlIndex::new(Arc::new(storage));
        assert!(index.find_url_duplicates("").await.is_empty());
        assert!(index.find_url_duplicates("  \t").await.is_empty());
    }

    #[tokio::test]
    async fn test_lazy_rebuild_when_index_missing() {
        let (storage, index) = index();
        store_report(&storage, "r1", &["https://a.com/news?id=7"]);
        store_report(&storage, "r2", &["https://a.com/news/?id=7&utm_campaign=x"]);
        let url = "https://a.com/news?id=7";

        let dups = index.find_url_duplicates(url).await;
        assert_eq!(dups.len(), 2);
        assert!(storage.contains(NEWS_URL_INDEX_KEY));
        assert_eq!(storage.put_count(), 1);

        let lists = storage.list_count();
        assert_eq!(index.find_url_duplicates(url).await.len(), 2);
        assert_eq!(
            storage.list_count(),
            lists,
            "second lookup must use the stored index"
        );
        assert_eq!(storage.put_count(), 1);
    }

    #[tokio::test]
    async fn test_indexing_into_missing_index_skips_older_reports() {
        let (storage, index) = index();
        let url = "https://a.com/etf";
        store_report(&storage, "old", &[url]);

        add(&index, "new", &[url]).await;
        let dups = index.find_url_duplicates(url).await;
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].report_id, "new");

        store_report(&storage, "new", &[url]);
        index.rebuild().await.unwrap();
        assert_eq!(index.find_url_duplicates(url).await.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_index_triggers_rebuild() {
        let (storage, index) = index();
        storage.insert(NEWS_URL_INDEX_KEY, r#"{"entries": 42}"#);
        store_report(&storage, "r1", &["https://a.com/x"]);

        let dups = index.find_url_duplicates("https://a.com/x").await;
        assert_eq!(dups.len(), 1);
        assert_eq!(storage.put_count(), 1);
    }

    #[tokio::test]
    async fn test_rebuild_failure_reports_no_duplicates() {
        let mut storage = MockStorageClient::new();
        storage.expect_get_object().returning(|_| Ok(None));
        storage
            .expect_list_objects()
            .returning(|_| Err(AppError::Storage("timeout".into())));
        storage.expect_put_object().never();

        let index = NewsUrlIndex::new(Arc::new(storage));
        let dups = index.find_url_duplicates("https://a.com/x").await;
        assert!(dups.is_empty());
    }
}
