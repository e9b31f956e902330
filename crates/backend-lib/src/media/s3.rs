// ============================
// crates/backend-lib/src/media/s3.rs
// ============================
//! S3/MinIO object store.
use super::{MediaError, ObjectStore};
use crate::config::ObjectStoreSettings;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::DisplayErrorContext,
    presigning::PresigningConfig,
    primitives::ByteStream,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
    Client,
};
use bytes::Bytes;
use std::time::Duration;
use tracing::{debug, info};

fn backend<E: std::error::Error>(op: &str, key: &str, err: E) -> MediaError {
    MediaError::Backend(format!("{op} {key}: {}", DisplayErrorContext(err)))
}

/// Bucket on an S3-compatible endpoint, path-style addressed
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    region: String,
}

impl S3ObjectStore {
    /// Build a client for `endpoint` with the static credentials in `settings`.
    ///
    /// A bare `host:port` endpoint is reached over plain http.
    pub async fn connect(settings: &ObjectStoreSettings, endpoint: &str) -> Self {
        let endpoint_url = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("http://{endpoint}")
        };

        let credentials = Credentials::new(
            settings.access_key.clone(),
            settings.secret_key.expose().to_string(),
            None,
            None,
            "easymeal-static",
        );

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials)
            .endpoint_url(&endpoint_url)
            .load()
            .await;

        let config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(true)
            .build();

        info!(endpoint = %endpoint_url, bucket = %settings.bucket, "S3 object store configured");

        Self {
            client: Client::from_conf(config),
            bucket: settings.bucket.clone(),
            region: settings.region.clone(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn ensure_bucket(&self) -> Result<(), MediaError> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => return Ok(()),
            Err(e) => {
                let service_error = e.into_service_error();
                if !service_error.is_not_found() {
                    return Err(backend("head_bucket", &self.bucket, service_error));
                }
            },
        }

        let mut request = self.client.create_bucket().bucket(&self.bucket);
        if self.region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                info!(bucket = %self.bucket, "bucket created");
                Ok(())
            },
            Err(e) => {
                let service_error = e.into_service_error();
                // lost a creation race with another process
                if service_error.is_bucket_already_owned_by_you()
                    || service_error.is_bucket_already_exists()
                {
                    Ok(())
                } else {
                    Err(backend("create_bucket", &self.bucket, service_error))
                }
            },
        }
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), MediaError> {
        debug!(bucket = %self.bucket, key, size = body.len(), "put object");
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| backend("put_object", key, e))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, MediaError> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Err(MediaError::ObjectNotFound);
                }
                return Err(backend("get_object", key, service_error));
            },
        };

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| backend("read body", key, e))?;
        Ok(body.into_bytes())
    }

    async fn exists(&self, key: &str) -> Result<bool, MediaError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(backend("head_object", key, service_error))
                }
            },
        }
    }

    async fn delete(&self, key: &str) -> Result<(), MediaError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| backend("delete_object", key, e))?;
        Ok(())
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, MediaError> {
        let presigning = PresigningConfig::expires_in(ttl).map_err(|e| backend("presign", key, e))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| backend("presign", key, e))?;
        Ok(request.uri().to_string())
    }
}
