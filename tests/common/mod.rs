#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use newsimpact::models::report::{NewsItem, Report};
use newsimpact::reports::repository::ReportStore;
use newsimpact::storage::memory::MemoryStorageClient;

/// Report store wired to an in-memory bucket that counts every call.
pub struct TestEnv {
    pub storage: Arc<MemoryStorageClient>,
    pub store: ReportStore,
}

impl TestEnv {
    pub fn start() -> Self {
        let storage = Arc::new(MemoryStorageClient::new());
        let store = ReportStore::new(storage.clone());
        Self { storage, store }
    }

    /// Helper: write a report straight to the bucket, bypassing index maintenance.
    pub fn seed(&self, report: &Report) {
        self.storage.insert(
            &newsimpact::storage::keys::report_key(&report.id),
            serde_json::to_vec(report).expect("report should serialize"),
        );
    }
}

/// Helper: a report with a fixed id and one news item per URL.
pub fn report(id: &str, title: &str, urls: &[&str]) -> Report {
    let mut report = Report::new(title);
    report.id = id.to_string();
    report.created_at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
    report.news = urls
        .iter()
        .enumerate()
        .map(|(i, url)| NewsItem {
            id: format!("{}-n{}", id, i),
            ..NewsItem::new(format!("News {}", i), *url, 2.5)
        })
        .collect();
    report
}

/// Helper: attach hashtags to every news item of a report.
pub fn with_tags(mut report: Report, tags: &[&str]) -> Report {
    for item in &mut report.news {
        item.hashtags = Some(tags.iter().map(|t| t.to_string()).collect());
    }
    report
}
