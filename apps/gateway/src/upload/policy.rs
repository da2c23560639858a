use crate::AppError;

const MIB: usize = 1024 * 1024;

/// Size and type constraints for one upload namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    pub namespace: &'static str,
    pub max_bytes: usize,
    pub allowed_mime: &'static [&'static str],
}

impl UploadPolicy {
    pub const BLOG: Self = Self {
        namespace: "blog",
        max_bytes: 5 * MIB,
        allowed_mime: &["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"],
    };

    pub const OCR: Self = Self {
        namespace: "ocr",
        max_bytes: 10 * MIB,
        allowed_mime: &["image/jpeg", "image/jpg", "image/png", "image/webp"],
    };

    /// Profile pictures are validated here but forwarded to the auth service
    /// rather than stored.
    pub const AVATAR: Self = Self {
        namespace: "avatar",
        max_bytes: 5 * MIB,
        allowed_mime: &["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"],
    };

    /// Largest ceiling across all policies.
    pub const LARGEST_BYTES: usize = 10 * MIB;

    pub fn check_mime(&self, mime: &str) -> Result<(), AppError> {
        let normalized = mime.trim().to_ascii_lowercase();
        if self.allowed_mime.contains(&normalized.as_str()) {
            Ok(())
        } else {
            Err(AppError::validation(format!(
                "Invalid file type. Allowed types: {}",
                self.allowed_mime.join(", ")
            )))
        }
    }

    pub fn check_size(&self, size: usize) -> Result<(), AppError> {
        if size > self.max_bytes {
            Err(self.too_large())
        } else {
            Ok(())
        }
    }

    pub fn too_large(&self) -> AppError {
        AppError::validation(format!(
            "File too large. Max size: {}MB",
            self.max_bytes / MIB
        ))
    }
}
