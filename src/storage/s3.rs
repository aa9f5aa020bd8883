use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::Region;

use crate::error::{AppError, AppResult};

use super::StorageBackend;

/// S3-compatible backend (AWS S3, Cloudflare R2, MinIO). A custom endpoint
/// selects the non-AWS providers.
pub struct S3Backend {
    bucket: Box<Bucket>,
    bucket_name: String,
    public_base_url: String,
}

impl S3Backend {
    pub fn new(
        bucket_name: String,
        region: String,
        endpoint: Option<String>,
        access_key: String,
        secret_key: String,
        public_base_url: Option<String>,
    ) -> AppResult<Self> {
        let region = match endpoint {
            Some(endpoint) => Region::Custom {
                region: region.clone(),
                endpoint,
            },
            None => region
                .parse()
                .map_err(|e| AppError::Storage(format!("Invalid S3 region: {}", e)))?,
        };

        let credentials = Credentials::new(
            Some(&access_key),
            Some(&secret_key),
            None, // security token
            None, // session token
            None, // profile
        )
        .map_err(|e| AppError::Storage(format!("S3 credentials error: {}", e)))?;

        let public_base_url = public_base_url
            .unwrap_or_else(|| format!("https://{}.s3.amazonaws.com", bucket_name))
            .trim_end_matches('/')
            .to_string();

        let bucket = Bucket::new(&bucket_name, region, credentials)
            .map_err(|e| AppError::Storage(format!("S3 bucket error: {}", e)))?;

        Ok(Self {
            bucket,
            bucket_name,
            public_base_url,
        })
    }
}

#[async_trait::async_trait]
impl StorageBackend for S3Backend {
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<String> {
        self.bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(|e| AppError::Storage(format!("S3 upload failed: {}", e)))?;

        tracing::info!(
            "S3 upload: bucket={}, key={}, size={}",
            self.bucket_name,
            key,
            data.len()
        );
        Ok(format!("{}/{}", self.public_base_url, key))
    }

    fn bucket(&self) -> &str {
        &self.bucket_name
    }
}
