use async_trait::async_trait;

use crate::error::AppError;

/// Content type used for every JSON document written by this crate.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Trait for blob storage operations (S3-compatible).
///
/// Abstracted as a trait so tests can use a mock without a real S3 instance.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Upload content to the given key.
    async fn put_object(
        &self,
        key: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AppError>;

    /// Retrieve content by key. Returns `None` if the object doesn't exist.
    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, AppError>;

    /// Delete the object at the given key. Deleting a missing key is not an error.
    async fn delete_object(&self, key: &str) -> Result<(), AppError>;

    /// List every key starting with `prefix`.
    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, AppError>;
}

/// S3 implementation of StorageClient.
///
/// Works against AWS S3, Cloudflare R2 and MinIO.
/// Only available when the `s3` feature is enabled.
#[cfg(feature = "s3")]
pub struct S3StorageClient {
    client: aws_sdk_s3::Client,
    bucket: String,
}

#[cfg(feature = "s3")]
impl S3StorageClient {
    /// Create a new S3 storage client from loaded configuration.
    pub async fn from_config(cfg: &crate::config::StorageConfig) -> Result<Self, AppError> {
        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(cfg.region.clone()));

        let endpoint = cfg.resolved_endpoint();
        if let Some(ref endpoint) = endpoint {
            config_loader = config_loader.endpoint_url(endpoint);
        }

        if let Some((key, secret)) = cfg.static_credentials() {
            config_loader = config_loader.credentials_provider(
                aws_sdk_s3::config::Credentials::new(key, secret, None, None, "newsimpact"),
            );
        }

        let sdk_config = config_loader.load().await;

        // R2 and MinIO don't support virtual-hosted buckets on custom endpoints
        let client = aws_sdk_s3::Client::from_conf(
            aws_sdk_s3::config::Builder::from(&sdk_config)
                .force_path_style(endpoint.is_some())
                .build(),
        );

        tracing::info!(bucket = %cfg.bucket, endpoint = ?endpoint, "S3 storage client initialized");

        Ok(Self {
            client,
            bucket: cfg.bucket.clone(),
        })
    }

    /// Create with explicit values (useful for testing / DI).
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[cfg(feature = "s3")]
#[async_trait]
impl StorageClient for S3StorageClient {
    async fn put_object(
        &self,
        key: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(content.into())
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to put object '{}': {}", key, e)))?;

        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| AppError::Storage(format!("Failed to read body: {}", e)))?;
                Ok(Some(bytes.into_bytes().to_vec()))
            }
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_no_such_key() {
                    Ok(None)
                } else {
                    Err(AppError::Storage(format!(
                        "Failed to get object '{}': {}",
                        key, service_err
                    )))
                }
            }
        }
    }

    async fn delete_object(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to delete object '{}': {}", key, e)))?;

        Ok(())
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, AppError> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| {
                    AppError::Storage(format!("Failed to list objects under '{}': {}", prefix, e))
                })?;

            keys.extend(
                output
                    .contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(str::to_string)),
            );

            match output.next_continuation_token() {
                Some(token) if output.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(keys)
    }
}
