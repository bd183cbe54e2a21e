use crate::config::S3Config;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, AttributeValue, Attributes, ObjectStore, PutOptions, PutPayload};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to read staged file: {0}")]
    Read(#[from] std::io::Error),

    #[error("object store rejected upload of {key}: {message}")]
    Rejected { key: String, message: String },

    #[error("object store configuration error: {0}")]
    Config(String),
}

/// Build the S3 client from explicit settings plus the standard AWS
/// environment (credentials, session token).
pub fn build_s3_store(config: &S3Config) -> Result<Arc<dyn ObjectStore>, UploadError> {
    let mut builder = AmazonS3Builder::from_env()
        .with_region(config.region.clone())
        .with_bucket_name(config.bucket.clone());

    if let Some(ref endpoint) = config.endpoint {
        let allow_http = endpoint.starts_with("http://");
        builder = builder
            .with_endpoint(endpoint.clone())
            .with_allow_http(allow_http);
    }

    let store = builder
        .build()
        .map_err(|e| UploadError::Config(e.to_string()))?;

    Ok(Arc::new(store))
}

/// Single-shot uploader into one bucket.
#[derive(Clone)]
pub struct ObjectUploader {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    region: String,
    endpoint: Option<String>,
    distribution: Option<String>,
}

impl ObjectUploader {
    pub fn new(store: Arc<dyn ObjectStore>, config: &S3Config) -> Self {
        Self {
            store,
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
            distribution: config.distribution.clone(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Read `reader` to EOF and store it under `key` with a single put.
    ///
    /// A single put is atomic on S3: the object is either fully visible or
    /// absent. No retry is attempted.
    ///
    /// The whole object is buffered in memory first, so each concurrent
    /// upload can hold up to `max_upload_bytes` of RAM.
    pub async fn upload<R>(
        &self,
        key: &str,
        mut reader: R,
        content_type: &str,
    ) -> Result<(), UploadError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let start = Instant::now();

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).await?;
        let size = buffer.len() as u64;

        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_string()),
        );
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        let location = ObjectPath::from(key);
        self.store
            .put_opts(&location, PutPayload::from(Bytes::from(buffer)), opts)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "object upload failed"
                );
                UploadError::Rejected {
                    key: key.to_string(),
                    message: e.to_string(),
                }
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "object upload successful"
        );

        Ok(())
    }

    /// Public URL of an uploaded object.
    ///
    /// Distribution host first, then a custom endpoint (path style), then the
    /// virtual-hosted AWS form.
    pub fn object_url(&self, key: &str) -> String {
        if let Some(ref distribution) = self.distribution {
            let host = distribution
                .trim_start_matches("https://")
                .trim_start_matches("http://")
                .trim_end_matches('/');
            format!("https://{}/{}", host, key)
        } else if let Some(ref endpoint) = self.endpoint {
            format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }
}
