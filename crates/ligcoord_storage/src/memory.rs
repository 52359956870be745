//! In-memory [`crate::ObjectStore`] fake for tests.

use crate::{ObjectStore, PresignMethod};
use async_trait::async_trait;
use ligcoord_protocol::CoordinatorError;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, bucket: &str, key: &str, data: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data);
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, CoordinatorError> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| CoordinatorError::not_found(format!("no such key: {bucket}/{key}")))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
    ) -> Result<(), CoordinatorError> {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data);
        Ok(())
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<(), CoordinatorError> {
        let data = self.get_object(src_bucket, src_key).await?;
        self.put_object(dst_bucket, dst_key, data).await
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> Result<bool, CoordinatorError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .contains_key(&(bucket.to_string(), key.to_string())))
    }

    async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        method: PresignMethod,
        expires_secs: u64,
    ) -> Result<String, CoordinatorError> {
        let verb = match method {
            PresignMethod::Get => "GET",
            PresignMethod::Put => "PUT",
        };
        Ok(format!(
            "https://fake-presigned.invalid/{bucket}/{key}?method={verb}&expires={expires_secs}"
        ))
    }

    async fn make_bucket_with_public_read_policy(
        &self,
        _bucket: &str,
    ) -> Result<(), CoordinatorError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn miss_then_fallback_then_copy_makes_key_readable() {
        let store = InMemoryObjectStore::new();
        store.seed("weights", "default.pth", b"default-bytes".to_vec());

        let err = store.get_object("weights", "weight-7.pth").await.unwrap_err();
        assert!(matches!(err, CoordinatorError::NotFound(_)));

        let default_bytes = store.get_object("weights", "default.pth").await.unwrap();
        store
            .copy_object("weights", "default.pth", "weights", "weight-7.pth")
            .await
            .unwrap();

        let copied = store.get_object("weights", "weight-7.pth").await.unwrap();
        assert_eq!(copied, default_bytes);
    }
}
