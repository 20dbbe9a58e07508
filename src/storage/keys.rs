//! Object key layout of the bucket.

/// Prefix under which every report document lives.
pub const REPORTS_PREFIX: &str = "reports/";

/// User list document. Owned by the auth layer; nothing here reads it.
pub const USERS_KEY: &str = "users/users.json";

pub const HASHTAG_INDEX_KEY: &str = "indexes/hashtags.json";

pub const NEWS_URL_INDEX_KEY: &str = "indexes/news-urls.json";

/// Build the key of a report document, e.g. `reports/abc.json`.
pub fn report_key(report_id: &str) -> String {
    format!("{}{}.json", REPORTS_PREFIX, report_id)
}

/// Extract the report id from a key produced by [`report_key`].
///
/// Returns `None` for keys outside the reports prefix or not ending in `.json`.
pub fn report_id_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(REPORTS_PREFIX)?
        .strip_suffix(".json")
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_key_roundtrip() {
        let key = report_key("mfwmt8jfstpheqzctef");
        assert_eq!(key, "reports/mfwmt8jfstpheqzctef.json");
        assert_eq!(report_id_from_key(&key), Some("mfwmt8jfstpheqzctef"));
    }

    #[test]
    fn test_foreign_keys_ignored() {
        assert_eq!(report_id_from_key("reports/readme.txt"), None);
        assert_eq!(report_id_from_key("indexes/hashtags.json"), None);
        assert_eq!(report_id_from_key("reports/.json"), None);
    }
}
