use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One news item known to the duplicate-URL index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsUrlIndexEntry {
    /// Comparison key, see [`crate::indexing::normalize::normalize_url`].
    pub normalized_url: String,
    /// URL as the editor entered it.
    pub original_url: String,
    pub report_id: String,
    pub report_title: String,
    pub news_id: String,
    pub news_title: String,
    pub date: DateTime<Utc>,
}

/// Document stored at `indexes/news-urls.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsUrlIndexDocument {
    pub updated_at: DateTime<Utc>,
    pub entries: Vec<NewsUrlIndexEntry>,
}

/// Document stored at `indexes/hashtags.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashtagIndexDocument {
    /// Sorted, unique, lowercase, no leading `#`.
    pub tags: Vec<String>,
    pub updated_at: DateTime<Utc>,
}
