use serde::Deserialize;

use crate::error::AppError;

/// Prefix of every environment variable read by [`StorageConfig::from_env`].
pub const ENV_PREFIX: &str = "NEWSIMPACT";

/// Bucket used when `NEWSIMPACT_BUCKET` is not set.
pub const DEFAULT_BUCKET: &str = "news-analysis-reports";

/// R2 accepts any region name; `auto` is what Cloudflare documents.
pub const DEFAULT_REGION: &str = "auto";

/// Connection settings for the S3-compatible bucket holding reports and indexes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    /// Explicit endpoint (MinIO, LocalStack, R2). Takes precedence over `account_id`.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Cloudflare account id, used to derive the R2 endpoint.
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
}

impl StorageConfig {
    /// Load configuration from `NEWSIMPACT_*` environment variables.
    ///
    /// - `NEWSIMPACT_BUCKET` (default `news-analysis-reports`)
    /// - `NEWSIMPACT_REGION` (default `auto`)
    /// - `NEWSIMPACT_ENDPOINT` (optional)
    /// - `NEWSIMPACT_ACCOUNT_ID` (optional, R2 account)
    /// - `NEWSIMPACT_ACCESS_KEY_ID` / `NEWSIMPACT_SECRET_ACCESS_KEY` (optional)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_source(config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Load configuration from an explicit environment source.
    pub fn from_source(source: config::Environment) -> Result<Self, AppError> {
        let settings = config::Config::builder()
            .set_default("bucket", DEFAULT_BUCKET)?
            .set_default("region", DEFAULT_REGION)?
            .add_source(source)
            .build()?;

        let cfg: StorageConfig = settings.try_deserialize()?;
        if cfg.bucket.trim().is_empty() {
            return Err(AppError::Config("bucket name cannot be empty".into()));
        }
        Ok(cfg)
    }

    /// The endpoint the client should talk to, if any.
    ///
    /// An explicit endpoint wins; otherwise an R2 endpoint is derived from the
    /// account id. `None` means the SDK's default AWS endpoint resolution.
    pub fn resolved_endpoint(&self) -> Option<String> {
        if let Some(endpoint) = self.endpoint.as_deref().filter(|e| !e.is_empty()) {
            return Some(endpoint.to_string());
        }
        self.account_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(|id| format!("https://{}.r2.cloudflarestorage.com", id))
    }

    /// Static credentials, when both halves are configured.
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Some((key.as_str(), secret.as_str()))
            }
            _ => None,
        }
    }
}
