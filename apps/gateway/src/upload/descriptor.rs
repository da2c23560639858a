use std::path::Path;

use bytes::Bytes;

/// A received file, held only for the duration of one request.
#[derive(Debug, Clone)]
pub struct UploadDescriptor {
    pub original_filename: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl UploadDescriptor {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Extension of the original filename, sanitized to `.[A-Za-z0-9]{1,10}`
    /// and lowercased; empty when there is none.
    pub fn safe_extension(&self) -> String {
        Path::new(&self.original_filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.len() <= 10)
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default()
    }
}
