use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;

use crate::error::AppError;
use crate::models::index::HashtagIndexDocument;
use crate::models::report::Report;
use crate::storage::client::{StorageClient, JSON_CONTENT_TYPE};
use crate::storage::keys::HASHTAG_INDEX_KEY;

/// Number of suggestions returned when the caller does not ask for a limit.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 10;

/// Normalize a hashtag: trim, strip leading `#`s, lowercase.
///
/// Returns `None` when nothing is left.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let tag = raw.trim().trim_start_matches('#').trim().to_lowercase();
    if tag.is_empty() {
        None
    } else {
        Some(tag)
    }
}

fn normalize_all<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .filter_map(|t| normalize_tag(t.as_ref()))
        .collect()
}

/// Global catalogue of known hashtags, stored as one JSON document.
///
/// Only grows through [`merge_hashtags`](Self::merge_hashtags); shrinking
/// requires a full rewrite with [`put_hashtag_index`](Self::put_hashtag_index).
pub struct HashtagIndex {
    storage: Arc<dyn StorageClient>,
}

impl HashtagIndex {
    pub fn new(storage: Arc<dyn StorageClient>) -> Self {
        Self { storage }
    }

    /// Read the index document.
    ///
    /// Any failure (missing object, store error, malformed JSON) yields `None`,
    /// meaning "no remote tags yet".
    pub async fn get_hashtag_index(&self) -> Option<HashtagIndexDocument> {
        let bytes = match self.storage.get_object(HASHTAG_INDEX_KEY).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to read hashtag index: {e}");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!("Ignoring malformed hashtag index: {e}");
                None
            }
        }
    }

    /// Overwrite the index with exactly `tags` (normalized, deduplicated, sorted).
    pub async fn put_hashtag_index<I, S>(&self, tags: I) -> Result<Vec<String>, AppError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tags: Vec<String> = normalize_all(tags).into_iter().collect();
        self.write(&tags).await?;
        Ok(tags)
    }

    /// Union `incoming` into the stored tags.
    ///
    /// The document is only written when the union actually added a tag.
    /// Returns the merged, sorted tag list either way.
    pub async fn merge_hashtags<I, S>(&self, incoming: I) -> Result<Vec<String>, AppError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let current = self
            .get_hashtag_index()
            .await
            .map(|doc| normalize_all(doc.tags))
            .unwrap_or_default();

        let mut merged = current.clone();
        merged.extend(normalize_all(incoming));

        let merged: Vec<String> = merged.into_iter().collect();
        if merged.len() != current.len() {
            self.write(&merged).await?;
            tracing::debug!(
                added = merged.len() - current.len(),
                total = merged.len(),
                "Hashtag index updated"
            );
        } else {
            tracing::debug!("No new hashtags, skipping index write");
        }

        Ok(merged)
    }

    /// Known tags starting with `prefix`, in sorted order.
    ///
    /// An empty prefix returns the first `limit` tags.
    pub async fn suggestions(&self, prefix: &str, limit: usize) -> Vec<String> {
        let tags = self
            .get_hashtag_index()
            .await
            .map(|doc| normalize_all(doc.tags))
            .unwrap_or_default();

        let prefix = normalize_tag(prefix).unwrap_or_default();
        tags.into_iter()
            .filter(|t| t.starts_with(&prefix))
            .take(limit)
            .collect()
    }

    /// Replace the index with the hashtags used by `reports`.
    pub async fn rebuild_from_reports(&self, reports: &[Report]) -> Result<Vec<String>, AppError> {
        let tags = self
            .put_hashtag_index(reports.iter().flat_map(|r| r.hashtags()))
            .await?;
        tracing::info!(
            reports = reports.len(),
            tags = tags.len(),
            "Hashtag index rebuilt"
        );
        Ok(tags)
    }

    async fn write(&self, tags: &[String]) -> Result<(), AppError> {
        let doc = HashtagIndexDocument {
            tags: tags.to_vec(),
            updated_at: Utc::now(),
        };
        let body = serde_json::to_vec_pretty(&doc)?;
        self.storage
            .put_object(HASHTAG_INDEX_KEY, body, JSON_CONTENT_TYPE)
            .await
    }
}
