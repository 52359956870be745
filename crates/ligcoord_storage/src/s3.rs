//! `aws-sdk-s3`-backed implementation of [`crate::ObjectStore`], pointed at a
//! MinIO-style endpoint via `endpoint_url`.

use crate::{ObjectStore, PresignMethod};
use async_trait::async_trait;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use ligcoord_protocol::CoordinatorError;
use std::time::Duration;
use tracing::{debug, warn};

pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Build a client against a MinIO-style endpoint using static credentials.
    pub async fn new(endpoint: &str, access_key: &str, secret_key: &str) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "ligcoord-static");
        let config = aws_sdk_s3::config::Builder::new()
            .endpoint_url(endpoint)
            .region(aws_sdk_s3::config::Region::new("us-east-1"))
            .credentials_provider(credentials)
            .force_path_style(true)
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .build();
        Self {
            client: Client::from_conf(config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, CoordinatorError> {
        debug!(bucket, key, "getting object");
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| classify_get_error(bucket, key, err))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|err| {
                CoordinatorError::transient_remote(format!(
                    "failed to read object body for {bucket}/{key}: {err}"
                ))
            })?
            .into_bytes();

        Ok(bytes.to_vec())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
    ) -> Result<(), CoordinatorError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|err| {
                CoordinatorError::transient_remote(format!(
                    "failed to put object {bucket}/{key}: {err}"
                ))
            })?;
        Ok(())
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<(), CoordinatorError> {
        let copy_source = format!("{src_bucket}/{src_key}");
        self.client
            .copy_object()
            .bucket(dst_bucket)
            .key(dst_key)
            .copy_source(copy_source)
            .send()
            .await
            .map_err(|err| {
                CoordinatorError::transient_remote(format!(
                    "failed to copy {src_bucket}/{src_key} to {dst_bucket}/{dst_key}: {err}"
                ))
            })?;
        Ok(())
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> Result<bool, CoordinatorError> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                if is_not_found(&err) {
                    Ok(false)
                } else {
                    Err(CoordinatorError::transient_remote(format!(
                        "failed to stat {bucket}/{key}: {err}"
                    )))
                }
            }
        }
    }

    async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        method: PresignMethod,
        expires_secs: u64,
    ) -> Result<String, CoordinatorError> {
        let expires = PresigningConfig::expires_in(Duration::from_secs(expires_secs))
            .map_err(|err| CoordinatorError::config(format!("invalid presign expiry: {err}")))?;

        let uri = match method {
            PresignMethod::Get => self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .presigned(expires)
                .await
                .map_err(|err| {
                    CoordinatorError::transient_remote(format!("failed to presign GET: {err}"))
                })?
                .uri()
                .to_string(),
            PresignMethod::Put => self
                .client
                .put_object()
                .bucket(bucket)
                .key(key)
                .presigned(expires)
                .await
                .map_err(|err| {
                    CoordinatorError::transient_remote(format!("failed to presign PUT: {err}"))
                })?
                .uri()
                .to_string(),
        };

        Ok(uri)
    }

    async fn make_bucket_with_public_read_policy(
        &self,
        bucket: &str,
    ) -> Result<(), CoordinatorError> {
        if let Err(err) = self.client.create_bucket().bucket(bucket).send().await {
            warn!(bucket, %err, "create_bucket failed (bucket may already exist)");
        }

        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(crate::public_read_policy(bucket))
            .send()
            .await
            .map_err(|err| {
                CoordinatorError::transient_remote(format!(
                    "failed to set bucket policy on {bucket}: {err}"
                ))
            })?;
        Ok(())
    }
}

fn classify_get_error(
    bucket: &str,
    key: &str,
    err: aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::get_object::GetObjectError>,
) -> CoordinatorError {
    if is_not_found(&err) {
        CoordinatorError::not_found(format!("no such key: {bucket}/{key}"))
    } else {
        CoordinatorError::transient_remote(format!("failed to get {bucket}/{key}: {err}"))
    }
}

fn is_not_found<E: std::fmt::Debug>(err: &aws_sdk_s3::error::SdkError<E>) -> bool {
    format!("{err:?}").contains("NoSuchKey") || format!("{err:?}").contains("NotFound")
}
