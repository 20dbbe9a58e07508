use url::Url;

/// Query parameters that only carry attribution and never change the target page.
pub const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "ref",
    "ref_src",
    "gclid",
    "fbclid",
];

/// Map a raw news URL to the key used for duplicate detection.
///
/// Drops the fragment and tracking parameters, sorts the remaining query
/// parameters by key, strips trailing slashes from the path (the root path
/// stays `/`) and lowercases the result. Input that does not parse as an
/// absolute URL is only trimmed and lowercased.
///
/// Normalizing an already normalized key returns it unchanged.
pub fn normalize_url(raw: &str) -> String {
    let mut url = match Url::parse(raw.trim()) {
        Ok(url) => url,
        Err(_) => return raw.trim().to_lowercase(),
    };

    url.set_fragment(None);

    // Keys are compared case-insensitively: the output is lowercased, so
    // anything else would make a second pass reorder or drop parameters.
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    params.sort_by_cached_key(|(key, _)| key.to_lowercase());

    if params.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(&params);
    }

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        let trimmed = if trimmed.is_empty() { "/" } else { trimmed }.to_string();
        url.set_path(&trimmed);
    }

    url.as_str().to_lowercase()
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS
        .iter()
        .any(|tracking| tracking.eq_ignore_ascii_case(key))
}
