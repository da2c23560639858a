//! Streaming multipart reader with per-file size enforcement.

use std::collections::BTreeMap;

use actix_multipart::{Field, Multipart};
use bytes::BytesMut;
use futures_util::StreamExt;
use tracing::debug;

use super::descriptor::UploadDescriptor;
use super::policy::UploadPolicy;
use crate::AppError;

/// Longest accepted plain-text form field.
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// Most plain-text parts accepted in one form, repeated names included.
const MAX_TEXT_FIELDS: usize = 32;

/// Which parts of a form are files and how many of them are allowed.
#[derive(Debug, Clone, Copy)]
pub struct FileFields<'a> {
    pub names: &'a [&'a str],
    pub max_files: usize,
    pub policy: UploadPolicy,
}

#[derive(Debug, Default)]
pub struct UploadForm {
    pub text: BTreeMap<String, String>,
    /// (field name, file) in arrival order
    pub files: Vec<(String, UploadDescriptor)>,
}

impl UploadForm {
    pub fn take_file(&mut self, field: &str) -> Option<UploadDescriptor> {
        let idx = self.files.iter().position(|(name, _)| name == field)?;
        Some(self.files.remove(idx).1)
    }
}

fn multipart_error(err: impl std::fmt::Display) -> AppError {
    AppError::validation(format!("Invalid multipart body: {err}"))
}

/// Read a whole form. File parts are checked against the policy type list up
/// front and rejected the moment their running size exceeds the ceiling, so
/// an oversize upload never reaches storage or a backend.
pub async fn read_form(mut multipart: Multipart, files: FileFields<'_>) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    let mut text_fields = 0usize;

    while let Some(field) = multipart.next().await {
        let field = field.map_err(multipart_error)?;

        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .unwrap_or_default()
            .to_string();
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        match filename {
            Some(original_filename) => {
                if !files.names.contains(&name.as_str()) {
                    return Err(AppError::validation(format!("Unexpected file field '{name}'")));
                }
                if form.files.len() >= files.max_files {
                    return Err(AppError::validation(format!(
                        "Too many files. Max: {}",
                        files.max_files
                    )));
                }
                let descriptor = read_file(field, original_filename, &files.policy).await?;
                form.files.push((name, descriptor));
            }
            None => {
                text_fields += 1;
                if text_fields > MAX_TEXT_FIELDS {
                    return Err(AppError::validation(format!(
                        "Too many form fields. Max: {MAX_TEXT_FIELDS}"
                    )));
                }
                let value = read_text(field).await?;
                form.text.insert(name, value);
            }
        }
    }

    Ok(form)
}

async fn read_file(
    mut field: Field,
    original_filename: String,
    policy: &UploadPolicy,
) -> Result<UploadDescriptor, AppError> {
    let mime_type = field
        .content_type()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_default();
    policy.check_mime(&mime_type)?;

    let mut buf = BytesMut::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(multipart_error)?;
        if buf.len() + chunk.len() > policy.max_bytes {
            debug!(
                namespace = policy.namespace,
                received = buf.len() + chunk.len(),
                limit = policy.max_bytes,
                "upload exceeded size ceiling"
            );
            return Err(policy.too_large());
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(UploadDescriptor {
        original_filename,
        mime_type,
        bytes: buf.freeze(),
    })
}

async fn read_text(mut field: Field) -> Result<String, AppError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(multipart_error)?;
        if buf.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
            return Err(AppError::validation("Form field too large"));
        }
        buf.extend_from_slice(&chunk);
    }
    String::from_utf8(buf.to_vec()).map_err(|_| AppError::validation("Form field is not valid UTF-8"))
}
