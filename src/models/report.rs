use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::indexing::hashtags::normalize_tag;

/// A single news event and the price impact it had on a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    /// Source link of the news. May be empty.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub token_name: String,
    /// Token page (CoinGecko, TradingView, DexScreener...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_url: Option<String>,
    #[serde(default)]
    pub comment: String,
    /// Price change in percent, positive or negative.
    #[serde(default)]
    pub impact: f64,
    pub date: DateTime<Utc>,
    /// The price actually moved shortly after the news.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_moved: Option<bool>,
    /// Taking advantage of the news required dedicated tooling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_software: Option<bool>,
    /// Lowercase, without the leading `#`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashtags: Option<Vec<String>>,
}

impl NewsItem {
    /// Create a news item with a fresh id and the current timestamp.
    pub fn new(title: impl Into<String>, url: impl Into<String>, impact: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            title: title.into(),
            text: String::new(),
            url: url.into(),
            token_name: String::new(),
            token_url: None,
            screenshot_url: None,
            comment: String::new(),
            impact,
            date: Utc::now(),
            price_moved: None,
            needs_software: None,
            hashtags: None,
        }
    }

    /// Whether the item carries a usable source URL.
    pub fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// A named collection of news items, stored as `reports/{id}.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub news: Vec<NewsItem>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Unique hashtags of all news items, refreshed on every save.
    /// Older reports may not have it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashtags_cache: Option<Vec<String>>,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            title: title.into(),
            description: None,
            news: Vec::new(),
            created_at: Utc::now(),
            created_by: None,
            updated_at: None,
            hashtags_cache: None,
        }
    }

    /// Sorted, deduplicated, normalized hashtags across all news items.
    pub fn hashtags(&self) -> Vec<String> {
        self.news
            .iter()
            .flat_map(|n| n.hashtags.iter().flatten())
            .filter_map(|t| normalize_tag(t))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
        }
    }

    pub fn statistics(&self) -> ReportStatistics {
        ReportStatistics::from_news(&self.news)
    }
}

/// Listing projection of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregate impact metrics of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStatistics {
    pub total_news: usize,
    /// Every news item counts as working.
    pub working_news: usize,
    /// Mean impact of positive items.
    pub average_growth: f64,
    /// Absolute mean impact of negative items.
    pub average_decline: f64,
    pub positive_news_count: usize,
    pub negative_news_count: usize,
    pub moved_count: usize,
    pub static_count: usize,
    /// Items where `price_moved` was never set.
    pub unmarked_count: usize,
    pub moved_percent: f64,
}

impl ReportStatistics {
    pub fn from_news(news: &[NewsItem]) -> Self {
        let total_news = news.len();

        let positive: Vec<f64> = news.iter().map(|n| n.impact).filter(|i| *i > 0.0).collect();
        let negative: Vec<f64> = news.iter().map(|n| n.impact).filter(|i| *i < 0.0).collect();

        let mut moved_count = 0;
        let mut static_count = 0;
        let mut unmarked_count = 0;
        for n in news {
            match n.price_moved {
                Some(true) => moved_count += 1,
                Some(false) => static_count += 1,
                None => unmarked_count += 1,
            }
        }

        let moved_percent = if total_news == 0 {
            0.0
        } else {
            moved_count as f64 * 100.0 / total_news as f64
        };

        Self {
            total_news,
            working_news: total_news,
            average_growth: mean(&positive),
            average_decline: mean(&negative).abs(),
            positive_news_count: positive.len(),
            negative_news_count: negative.len(),
            moved_count,
            static_count,
            unmarked_count,
            moved_percent,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
