//! S3-compatible object-store client.
//!
//! Wraps `aws-sdk-s3` pointed at a MinIO-style endpoint behind a small trait so the
//! weight cache (and its tests) can substitute an in-memory fake instead of talking to
//! real infrastructure.

mod memory;
mod s3;

pub use memory::InMemoryObjectStore;
pub use s3::S3ObjectStore;

use async_trait::async_trait;
use ligcoord_protocol::CoordinatorError;

/// HTTP verb a presigned URL is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresignMethod {
    Get,
    Put,
}

/// Byte-level object storage: GET/PUT/COPY plus presigned URLs and a bucket-policy
/// bootstrap, matching the upstream MinIO service's surface.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object's bytes. Returns `CoordinatorError::NotFound` if the key is
    /// absent so callers can special-case it (e.g. the weight-cache default-weight
    /// fallback).
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, CoordinatorError>;

    /// Write (create or overwrite) an object.
    async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>)
        -> Result<(), CoordinatorError>;

    /// Server-side copy from one key to another, possibly in a different bucket.
    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<(), CoordinatorError>;

    /// Check whether an object exists without downloading its bytes.
    async fn stat_object(&self, bucket: &str, key: &str) -> Result<bool, CoordinatorError>;

    /// Generate a time-limited presigned URL for direct client access.
    async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        method: PresignMethod,
        expires_secs: u64,
    ) -> Result<String, CoordinatorError>;

    /// Create a bucket and attach a public-read policy on `GetBucketLocation`,
    /// `ListBucket`, and `GetObject`, mirroring the upstream's bootstrap step.
    async fn make_bucket_with_public_read_policy(
        &self,
        bucket: &str,
    ) -> Result<(), CoordinatorError>;
}

/// Build the public-read bucket policy document the upstream attaches on bucket
/// creation (allow anonymous `GetBucketLocation`/`ListBucket`/`GetObject`).
pub fn public_read_policy(bucket: &str) -> String {
    format!(
        r#"{{
  "Version": "2012-10-17",
  "Statement": [
    {{
      "Effect": "Allow",
      "Principal": {{"AWS": ["*"]}},
      "Action": ["s3:GetBucketLocation", "s3:ListBucket"],
      "Resource": ["arn:aws:s3:::{bucket}"]
    }},
    {{
      "Effect": "Allow",
      "Principal": {{"AWS": ["*"]}},
      "Action": ["s3:GetObject"],
      "Resource": ["arn:aws:s3:::{bucket}/*"]
    }}
  ]
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_names_the_bucket_in_both_statements() {
        let policy = public_read_policy("weights");
        assert!(policy.contains("arn:aws:s3:::weights\""));
        assert!(policy.contains("arn:aws:s3:::weights/*"));
    }
}
