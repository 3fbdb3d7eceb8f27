//! S3 remote store client.
//!
//! Thin connector over `aws-sdk-s3`. Credentials come from the storage
//! location descriptor (named profile or static key pair); region, optional
//! custom endpoint (MinIO and friends) and the per-operation timeout come
//! from configuration. All failures are mapped onto the storage error
//! taxonomy so the engine can decide fallback without knowing the SDK.

use std::sync::Arc;
use std::time::Duration;

use arkiva_core::{RemoteAuth, RemoteLocation};
use async_trait::async_trait;
use aws_config::profile::ProfileFileCredentialsProvider;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use bytes::Bytes;

use crate::traits::{RemoteConnector, RemoteStore, StorageError, StorageResult};

/// Map an SDK error onto the storage error taxonomy.
fn classify<E, R>(op: &str, what: &str, err: SdkError<E, R>) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().map(str::to_string);
    let detail = format!("{op} {what}: {}", DisplayErrorContext(&err));
    match &err {
        SdkError::DispatchFailure(_) | SdkError::ConstructionFailure(_) => {
            StorageError::Connection(detail)
        }
        SdkError::TimeoutError(_) => StorageError::Transient(detail),
        _ => match code.as_deref() {
            Some("NoSuchKey") | Some("NoSuchBucket") | Some("NotFound") => {
                StorageError::NotFound(what.to_string())
            }
            Some("AccessDenied")
            | Some("InvalidAccessKeyId")
            | Some("SignatureDoesNotMatch")
            | Some("AllAccessDisabled") => StorageError::Permission(detail),
            _ => StorageError::Transient(detail),
        },
    }
}

/// S3 implementation of [`RemoteStore`].
#[derive(Clone)]
pub struct S3RemoteStore {
    client: Client,
    bucket: String,
    region: Option<String>,
}

impl S3RemoteStore {
    /// Build a client for the given location.
    ///
    /// This does not talk to the service yet; the first operation does.
    pub async fn connect(
        location: &RemoteLocation,
        region: Option<String>,
        endpoint: Option<String>,
        operation_timeout: Duration,
    ) -> StorageResult<Self> {
        let timeouts = TimeoutConfig::builder()
            .operation_timeout(operation_timeout)
            .build();

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).timeout_config(timeouts);

        if let Some(ref region) = region {
            loader = loader.region(Region::new(region.clone()));
        }

        loader = match &location.auth {
            RemoteAuth::Profile(profile) => loader.credentials_provider(
                ProfileFileCredentialsProvider::builder()
                    .profile_name(profile)
                    .build(),
            ),
            RemoteAuth::AccessKey { key_id, secret } => loader.credentials_provider(
                Credentials::new(key_id.clone(), secret.clone(), None, None, "storage-location"),
            ),
        };

        if let Some(ref endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint.clone());
        }

        let shared_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if endpoint.is_some() {
            // S3-compatible providers generally require path-style addressing.
            builder = builder.force_path_style(true);
        }

        Ok(S3RemoteStore {
            client: Client::from_conf(builder.build()),
            bucket: location.bucket.clone(),
            region,
        })
    }

    /// Look the bucket up, creating it when missing.
    pub async fn ensure_bucket_exists(&self) -> StorageResult<()> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(()),
            Err(err) => {
                let missing =
                    matches!(&err, SdkError::ServiceError(ctx) if ctx.err().is_not_found());
                if !missing {
                    return Err(classify("HeadBucket", &self.bucket, err));
                }

                tracing::info!(bucket = %self.bucket, "Bucket not found, creating it");

                let mut request = self.client.create_bucket().bucket(&self.bucket);
                if let Some(ref region) = self.region {
                    if region != "us-east-1" {
                        request = request.create_bucket_configuration(
                            CreateBucketConfiguration::builder()
                                .location_constraint(BucketLocationConstraint::from(
                                    region.as_str(),
                                ))
                                .build(),
                        );
                    }
                }
                request
                    .send()
                    .await
                    .map_err(|e| classify("CreateBucket", &self.bucket, e))?;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl RemoteStore for S3RemoteStore {
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let start = std::time::Instant::now();

        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| match &err {
                SdkError::ServiceError(ctx) if ctx.err().is_no_such_key() => {
                    StorageError::NotFound(key.to_string())
                }
                _ => classify("GetObject", key, err),
            })?;

        let data = output.body.collect().await.map_err(|e| {
            StorageError::Transient(format!("GetObject {key}: body read failed: {e}"))
        })?;
        let bytes = data.into_bytes();

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(bytes)
    }

    async fn head(&self, key: &str) -> StorageResult<u64> {
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| match &err {
                SdkError::ServiceError(ctx) if ctx.err().is_not_found() => {
                    StorageError::NotFound(key.to_string())
                }
                _ => classify("HeadObject", key, err),
            })?;

        Ok(output.content_length().unwrap_or_default().max(0) as u64)
    }

    async fn put(
        &self,
        key: &str,
        data: Bytes,
        metadata: &[(String, String)],
    ) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let size = data.len();

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data));
        for (name, value) in metadata {
            request = request.metadata(name.clone(), value.clone());
        }

        request.send().await.map_err(|e| {
            let err = classify("PutObject", key, e);
            tracing::error!(
                error = %err,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            err
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    async fn copy(&self, src_key: &str, dst_key: &str) -> StorageResult<()> {
        let source = format!("{}/{}", self.bucket, urlencoding::encode(src_key));

        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(source)
            .key(dst_key)
            .send()
            .await
            .map_err(|e| classify("CopyObject", src_key, e))?;

        tracing::info!(
            bucket = %self.bucket,
            from_key = %src_key,
            to_key = %dst_key,
            "S3 copy successful"
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify("DeleteObject", key, e))?;

        tracing::info!(bucket = %self.bucket, key = %key, "S3 delete successful");

        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);
            if let Some(ref token) = continuation {
                request = request.continuation_token(token.clone());
            }

            let page = request
                .send()
                .await
                .map_err(|e| classify("ListObjectsV2", prefix, e))?;

            for object in page.contents() {
                if let Some(key) = object.key() {
                    keys.push(key.to_string());
                }
            }

            continuation = page.next_continuation_token().map(str::to_string);
            if continuation.is_none() {
                break;
            }
        }

        Ok(keys)
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Connector producing connected [`S3RemoteStore`] handles.
pub struct S3Connector {
    region: Option<String>,
    endpoint: Option<String>,
    operation_timeout: Duration,
}

impl S3Connector {
    pub fn new(
        region: Option<String>,
        endpoint: Option<String>,
        operation_timeout: Duration,
    ) -> Self {
        Self {
            region,
            endpoint,
            operation_timeout,
        }
    }

    pub fn from_config(config: &arkiva_core::Config) -> Self {
        Self::new(
            config.s3_region.clone(),
            config.s3_endpoint.clone(),
            Duration::from_secs(config.remote_timeout_secs),
        )
    }
}

#[async_trait]
impl RemoteConnector for S3Connector {
    async fn connect(&self, location: &RemoteLocation) -> StorageResult<Arc<dyn RemoteStore>> {
        let store = S3RemoteStore::connect(
            location,
            self.region.clone(),
            self.endpoint.clone(),
            self.operation_timeout,
        )
        .await?;

        store.ensure_bucket_exists().await?;

        tracing::info!(bucket = %store.bucket(), "Connected to remote object store");

        Ok(Arc::new(store))
    }
}
