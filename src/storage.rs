use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;

/// Blob storage addressed by (container, path). The production backend is a
/// single S3 bucket; containers become the top-level key prefix.
#[async_trait]
pub trait ObjectStorage: Send + Sync + 'static {
    async fn put_object(
        &self,
        container: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: Option<String>,
    ) -> Result<()>;

    async fn get_object(&self, container: &str, path: &str) -> Result<Vec<u8>>;

    async fn delete_object(&self, container: &str, path: &str) -> Result<()>;
}

pub struct S3Storage {
    client: S3Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

pub fn object_key(container: &str, path: &str) -> String {
    format!("{}/{}", container.trim_matches('/'), path.trim_start_matches('/'))
}

/// Inverse of [`object_key`]: splits a stored key back into its container and
/// container-relative path. Container names never contain slashes.
pub fn split_object_key(key: &str) -> Option<(&str, &str)> {
    key.split_once('/')
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put_object(
        &self,
        container: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: Option<String>,
    ) -> Result<()> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(object_key(container, path))
            .body(ByteStream::from(bytes));

        if let Some(content_type) = content_type {
            request = request.content_type(content_type);
        }

        request
            .send()
            .await
            .context("failed to upload object to S3")?;

        Ok(())
    }

    async fn get_object(&self, container: &str, path: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(object_key(container, path))
            .send()
            .await
            .context("failed to download object from S3")?;

        let bytes = response
            .body
            .collect()
            .await
            .context("failed to read object stream")?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    async fn delete_object(&self, container: &str, path: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(object_key(container, path))
            .send()
            .await
            .context("failed to delete object from S3")?;
        Ok(())
    }
}
