//! Document store adapter for uploaded bills.
//!
//! Blobs live in S3 under random names; the returned URL is the stable
//! public retrieval URL recorded on the lead (set once, immutable).

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use tracing::info;
use uuid::Uuid;

use crate::{Error, Result};

/// Prefix under which bill documents are stored.
const KEY_PREFIX: &str = "user-bills";

/// S3-backed blob store for bill documents.
pub struct DocumentStore {
    s3_client: S3Client,
    bucket: String,
    region: String,
}

impl DocumentStore {
    pub fn new(s3_client: S3Client, bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            s3_client,
            bucket: bucket.into(),
            region: region.into(),
        }
    }

    /// Store one document and return its public retrieval URL.
    pub async fn put_document(&self, content_type: &str, bytes: Vec<u8>) -> Result<String> {
        if bytes.is_empty() {
            return Err(Error::Upload("document is empty".into()));
        }

        let key = format!(
            "{KEY_PREFIX}/{}.{}",
            Uuid::new_v4().simple(),
            extension_for(content_type)
        );

        self.s3_client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| Error::Upload(format!("document store rejected upload: {e}")))?;

        let url = format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket, self.region, key
        );
        info!(%url, "document stored");
        Ok(url)
    }
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "application/pdf" => "pdf",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        _ => "bin",
    }
}
