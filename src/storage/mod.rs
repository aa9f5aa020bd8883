// Blob storage for uploaded item images.

pub mod s3;

pub use s3::S3Backend;

use crate::error::AppResult;

/// Storage backend abstraction. The application only ever stores the
/// returned public URL, never raw bytes.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Upload an object and return its publicly fetchable URL.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<String>;

    /// Bucket name, for logging.
    fn bucket(&self) -> &str;
}
