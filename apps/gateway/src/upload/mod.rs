//! Upload relay: validate, persist and hand back a URL for blog and OCR
//! images.

pub mod descriptor;
pub mod multipart;
pub mod policy;
pub mod store;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use tracing::{info, warn};

pub use descriptor::UploadDescriptor;
pub use multipart::{read_form, FileFields, UploadForm};
pub use policy::UploadPolicy;
pub use store::{LocalDiskStore, ObjectStore, RemoteStore, UPLOADS_URL_PREFIX};

use crate::AppError;

const NAME_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

pub struct UploadRelay {
    store: Arc<dyn ObjectStore>,
    public_base_url: String,
}

impl UploadRelay {
    pub fn new(store: Arc<dyn ObjectStore>, public_base_url: impl Into<String>) -> Self {
        Self {
            store,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Validate and persist one file; returns its URL.
    pub async fn store(
        &self,
        policy: &UploadPolicy,
        file: Option<&UploadDescriptor>,
    ) -> Result<String, AppError> {
        let file = file.ok_or_else(|| AppError::validation("No file provided"))?;
        policy.check_mime(&file.mime_type)?;
        policy.check_size(file.size())?;

        let filename = generate_filename(file);
        let url = self.store.put(policy.namespace, &filename, file).await?;
        info!(namespace = policy.namespace, size = file.size(), url = %url, "upload stored");
        Ok(url)
    }

    /// Store several files, stopping at the first failure. Files already
    /// stored by this call are removed again on failure.
    pub async fn store_all(
        &self,
        policy: &UploadPolicy,
        files: &[UploadDescriptor],
    ) -> Result<Vec<String>, AppError> {
        if files.is_empty() {
            return Err(AppError::validation("No files provided"));
        }
        let mut urls = Vec::with_capacity(files.len());
        for file in files {
            match self.store(policy, Some(file)).await {
                Ok(url) => urls.push(url),
                Err(err) => {
                    for url in &urls {
                        self.delete(policy, url).await;
                    }
                    return Err(err);
                }
            }
        }
        Ok(urls)
    }

    /// Best-effort removal; failures are logged and swallowed.
    pub async fn delete(&self, policy: &UploadPolicy, url: &str) {
        if let Err(err) = self.store.remove(policy.namespace, url).await {
            warn!(namespace = policy.namespace, url, error = %err, "failed to delete upload");
        }
    }

    /// Absolute form of a stored URL, for handing to backends.
    pub fn absolute_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{url}", self.public_base_url)
        } else {
            format!("{}/{url}", self.public_base_url)
        }
    }
}

/// `{unix-millis}-{6 random [a-z0-9]}{ext}`
fn generate_filename(file: &UploadDescriptor) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let mut rng = rand::rng();
    let suffix: String = (0..6)
        .map(|_| NAME_CHARSET[rng.random_range(0..NAME_CHARSET.len())] as char)
        .collect();
    format!("{millis}-{suffix}{}", file.safe_extension())
}
