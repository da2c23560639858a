//! Storage backends for uploaded files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::descriptor::UploadDescriptor;
use crate::AppError;

/// Public URL prefix under which locally stored files are served.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Persist `file` as `filename` under `namespace` and return its URL.
    async fn put(
        &self,
        namespace: &str,
        filename: &str,
        file: &UploadDescriptor,
    ) -> Result<String, AppError>;

    /// Remove a previously stored object. Callers swallow the error.
    async fn remove(&self, namespace: &str, url: &str) -> Result<(), AppError>;
}

/// Files under `{root}/{namespace}/`, served at `/uploads/{namespace}/`.
pub struct LocalDiskStore {
    root: PathBuf,
}

impl LocalDiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Last URL segment, if it is a plain filename.
fn filename_from_url(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = path.rsplit('/').next()?;
    let plain = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    plain.then_some(name)
}

#[async_trait]
impl ObjectStore for LocalDiskStore {
    async fn put(
        &self,
        namespace: &str,
        filename: &str,
        file: &UploadDescriptor,
    ) -> Result<String, AppError> {
        let dir = self.root.join(namespace);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::storage(format!("create {}: {e}", dir.display())))?;

        let path = dir.join(filename);
        tokio::fs::write(&path, &file.bytes)
            .await
            .map_err(|e| AppError::storage(format!("write {}: {e}", path.display())))?;

        Ok(format!("{UPLOADS_URL_PREFIX}/{namespace}/{filename}"))
    }

    async fn remove(&self, namespace: &str, url: &str) -> Result<(), AppError> {
        let filename = filename_from_url(url)
            .ok_or_else(|| AppError::validation(format!("not a stored file url: {url}")))?;
        let path = self.root.join(namespace).join(filename);

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "upload already absent");
                Ok(())
            }
            Err(e) => Err(AppError::storage(format!("remove {}: {e}", path.display()))),
        }
    }
}

/// Remote object storage accepting an unsigned multipart upload
/// (`file`, `upload_preset`, `folder`).
pub struct RemoteStore {
    client: Client,
    upload_url: String,
    preset: String,
}

impl RemoteStore {
    pub fn new(client: Client, upload_url: impl Into<String>, preset: impl Into<String>) -> Self {
        Self {
            client,
            upload_url: upload_url.into(),
            preset: preset.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for RemoteStore {
    async fn put(
        &self,
        namespace: &str,
        filename: &str,
        file: &UploadDescriptor,
    ) -> Result<String, AppError> {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(filename.to_string())
            .mime_str(&file.mime_type)
            .map_err(|e| AppError::storage(format!("invalid mime type: {e}")))?;
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.preset.clone())
            .text("folder", namespace.to_string());

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::storage(format!("remote upload failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::storage(format!(
                "remote upload rejected with status {status}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::storage(format!("remote upload reply unreadable: {e}")))?;

        body.get("secure_url")
            .or_else(|| body.get("url"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AppError::storage("remote upload reply has no url"))
    }

    async fn remove(&self, namespace: &str, url: &str) -> Result<(), AppError> {
        debug!(namespace, url, "remote uploads are not deleted by the gateway");
        Ok(())
    }
}
