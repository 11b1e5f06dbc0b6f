//! Blob store: avatar and server-icon uploads.

use async_trait::async_trait;
use bytes::Bytes;
use rand::RngCore;

use crate::error::UploadError;

/// Location of a stored blob, as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Object path within the bucket.
    pub path: String,
}

#[async_trait]
pub trait Blobs: Send + Sync {
    /// Upload `data` under `object` in `bucket`.
    ///
    /// The service does not deduplicate names; callers generate
    /// collision-resistant object names with [`object_name`].
    async fn upload(&self, bucket: &str, object: &str, data: Bytes)
        -> Result<StoredBlob, UploadError>;
}

/// Build a collision-resistant object name: a random 16-byte hex token,
/// keeping the original file's extension.
pub fn object_name(original_file_name: &str) -> String {
    let mut token = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut token);

    match original_file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            format!("{}.{}", hex::encode(token), ext)
        }
        _ => hex::encode(token),
    }
}
