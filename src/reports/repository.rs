use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};

use crate::error::AppError;
use crate::indexing::hashtags::HashtagIndex;
use crate::indexing::news_urls::NewsUrlIndex;
use crate::models::index::NewsUrlIndexEntry;
use crate::models::report::{Report, ReportSummary};
use crate::storage::client::{StorageClient, JSON_CONTENT_TYPE};
use crate::storage::keys::{report_id_from_key, report_key, REPORTS_PREFIX};

/// Maximum number of report documents fetched at the same time.
pub const REPORT_FETCH_CONCURRENCY: usize = 6;

/// Read a single report document. `Ok(None)` if it doesn't exist.
pub async fn fetch_report(
    storage: &dyn StorageClient,
    report_id: &str,
) -> Result<Option<Report>, AppError> {
    let Some(bytes) = storage.get_object(&report_key(report_id)).await? else {
        return Ok(None);
    };
    let report = serde_json::from_slice(&bytes)
        .map_err(|e| AppError::Serialization(format!("report '{}': {}", report_id, e)))?;
    Ok(Some(report))
}

/// Load every report in the bucket.
///
/// Reads are fanned out with at most [`REPORT_FETCH_CONCURRENCY`] in flight.
/// Documents that fail to load are logged and skipped; only a failure to
/// list the keys is returned as an error.
pub async fn load_all_reports(storage: &dyn StorageClient) -> Result<Vec<Report>, AppError> {
    let keys = storage.list_objects(REPORTS_PREFIX).await?;
    let ids: Vec<String> = keys
        .iter()
        .filter_map(|k| report_id_from_key(k))
        .map(str::to_string)
        .collect();

    let reports: Vec<Report> = stream::iter(ids)
        .map(|id| async move {
            match fetch_report(storage, &id).await {
                Ok(report) => report,
                Err(e) => {
                    tracing::warn!(report_id = %id, "Skipping report that failed to load: {e}");
                    None
                }
            }
        })
        .buffer_unordered(REPORT_FETCH_CONCURRENCY)
        .filter_map(|report| async move { report })
        .collect()
        .await;

    tracing::debug!(keys = keys.len(), loaded = reports.len(), "Loaded reports");
    Ok(reports)
}

/// Report persistence plus maintenance of the derived indexes.
///
/// Report uploads and deletions are the primary data path and propagate
/// their errors. Index maintenance that follows them is best-effort: a
/// failure is logged and the index is left stale until the next rebuild.
pub struct ReportStore {
    storage: Arc<dyn StorageClient>,
    url_index: NewsUrlIndex,
    hashtag_index: HashtagIndex,
}

impl ReportStore {
    pub fn new(storage: Arc<dyn StorageClient>) -> Self {
        Self {
            url_index: NewsUrlIndex::new(storage.clone()),
            hashtag_index: HashtagIndex::new(storage.clone()),
            storage,
        }
    }

    pub fn url_index(&self) -> &NewsUrlIndex {
        &self.url_index
    }

    pub fn hashtag_index(&self) -> &HashtagIndex {
        &self.hashtag_index
    }

    /// Write the report document as-is, without touching any index.
    pub async fn upload_report(&self, report: &Report) -> Result<(), AppError> {
        validate_id(&report.id)?;
        let key = report_key(&report.id);
        let body = serde_json::to_vec_pretty(report)?;
        self.storage.put_object(&key, body, JSON_CONTENT_TYPE).await?;
        tracing::info!(report_id = %report.id, key = %key, "Report uploaded");
        Ok(())
    }

    pub async fn get_report(&self, report_id: &str) -> Result<Option<Report>, AppError> {
        validate_id(report_id)?;
        fetch_report(self.storage.as_ref(), report_id).await
    }

    /// Summaries of all reports, newest first.
    pub async fn list_reports(&self) -> Result<Vec<ReportSummary>, AppError> {
        let mut summaries: Vec<ReportSummary> = self
            .load_all_reports()
            .await?
            .iter()
            .map(Report::summary)
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    pub async fn load_all_reports(&self) -> Result<Vec<Report>, AppError> {
        load_all_reports(self.storage.as_ref()).await
    }

    /// Delete the report document, without touching any index.
    pub async fn delete_report(&self, report_id: &str) -> Result<(), AppError> {
        validate_id(report_id)?;
        self.storage.delete_object(&report_key(report_id)).await?;
        tracing::info!(report_id, "Report deleted");
        Ok(())
    }

    /// Persist a new report and register its URLs and hashtags.
    pub async fn save_report(&self, mut report: Report) -> Result<Report, AppError> {
        validate_id(&report.id)?;
        report.hashtags_cache = Some(report.hashtags());
        self.upload_report(&report).await?;
        self.refresh_indexes(&report).await;
        Ok(report)
    }

    /// Persist an edited report, stamping `updated_at`, and refresh its index entries.
    pub async fn update_report(&self, mut report: Report) -> Result<Report, AppError> {
        validate_id(&report.id)?;
        report.updated_at = Some(Utc::now());
        report.hashtags_cache = Some(report.hashtags());
        self.upload_report(&report).await?;
        self.refresh_indexes(&report).await;
        Ok(report)
    }

    /// Delete a report and drop its entries from the URL index.
    ///
    /// Its hashtags stay in the hashtag index.
    pub async fn remove_report(&self, report_id: &str) -> Result<(), AppError> {
        self.delete_report(report_id).await?;
        if let Err(e) = self.url_index.remove_report_from_url_index(report_id).await {
            tracing::warn!(
                report_id,
                "Failed to update news URL index after delete: {e}"
            );
        }
        Ok(())
    }

    /// See [`NewsUrlIndex::find_url_duplicates`].
    pub async fn find_url_duplicates(&self, url: &str) -> Vec<NewsUrlIndexEntry> {
        self.url_index.find_url_duplicates(url).await
    }

    /// Rewrite the hashtag index from the tags used by every stored report.
    pub async fn rebuild_hashtag_index(&self) -> Result<Vec<String>, AppError> {
        let reports = self.load_all_reports().await?;
        self.hashtag_index.rebuild_from_reports(&reports).await
    }

    async fn refresh_indexes(&self, report: &Report) {
        if let Err(e) = self.url_index.index_report_news(report).await {
            tracing::warn!(report_id = %report.id, "Failed to update news URL index: {e}");
        }

        let tags = report.hashtags();
        if !tags.is_empty() {
            if let Err(e) = self.hashtag_index.merge_hashtags(&tags).await {
                tracing::warn!(report_id = %report.id, "Failed to merge hashtags: {e}");
            }
        }
    }
}

/// Report ids end up inside an object key.
fn validate_id(report_id: &str) -> Result<(), AppError> {
    if report_id.trim().is_empty() {
        return Err(AppError::BadRequest("Report id cannot be empty".into()));
    }
    if report_id.contains('/') {
        return Err(AppError::BadRequest(format!(
            "Invalid report id '{}': must not contain '/'",
            report_id
        )));
    }
    Ok(())
}
