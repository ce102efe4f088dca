//! Metadata-only checks applied to a file before it becomes an upload task.
//! File contents are never inspected.

use crate::constants::{DEFAULT_ALLOWED_CONTENT_TYPES, DEFAULT_MAX_DOCUMENT_SIZE_MB, MAX_DOCUMENT_NAME_LENGTH};
use crate::error::{AppError, AppResult};
use crate::models::SourceFile;

/// Size ceiling and MIME allow-list for candidate files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRules {
    pub max_file_size_bytes: u64,
    /// Exact types, `type/*` prefixes, or `*/*`
    pub allowed_content_types: Vec<String>,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_DOCUMENT_SIZE_MB * 1024 * 1024,
            allowed_content_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ValidationRules {
    pub fn new(max_file_size_bytes: u64, allowed_content_types: Vec<String>) -> Self {
        Self {
            max_file_size_bytes,
            allowed_content_types: allowed_content_types
                .into_iter()
                .map(|ct| ct.trim().to_lowercase())
                .filter(|ct| !ct.is_empty())
                .collect(),
        }
    }

    /// Size first, then type.
    pub fn validate(&self, file: &SourceFile) -> AppResult<()> {
        self.validate_size(file.size_bytes())?;
        self.validate_content_type(&file.content_type)
    }

    pub fn validate_size(&self, size: u64) -> AppResult<()> {
        if size > self.max_file_size_bytes {
            return Err(AppError::TooLarge {
                size,
                limit: self.max_file_size_bytes,
            });
        }
        Ok(())
    }

    /// Compares the normalized MIME type only, so parameters cannot bypass the list.
    pub fn validate_content_type(&self, content_type: &str) -> AppResult<()> {
        let normalized = normalize_mime_type(content_type).to_lowercase();
        if self.is_allowed(&normalized) {
            return Ok(());
        }
        Err(AppError::UnsupportedType {
            content_type: content_type.to_string(),
            allowed: self.allowed_content_types.join(", "),
        })
    }

    fn is_allowed(&self, normalized: &str) -> bool {
        if normalized.is_empty() {
            return false;
        }
        self.allowed_content_types.iter().any(|allowed| {
            let allowed = allowed.to_lowercase();
            if allowed == "*/*" {
                return true;
            }
            match allowed.strip_suffix("/*") {
                Some(prefix) => normalized
                    .split_once('/')
                    .is_some_and(|(major, minor)| major == prefix && !minor.is_empty()),
                None => normalized == allowed,
            }
        })
    }

    /// Validate every file independently. Both halves keep input order.
    pub fn validate_batch<I>(&self, files: I) -> (Vec<SourceFile>, Vec<(SourceFile, AppError)>)
    where
        I: IntoIterator<Item = SourceFile>,
    {
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        for file in files {
            match self.validate(&file) {
                Ok(()) => accepted.push(file),
                Err(e) => {
                    tracing::debug!(
                        filename = %file.filename,
                        content_type = %file.content_type,
                        size = file.size_bytes(),
                        error = %e,
                        "File rejected by validation"
                    );
                    rejected.push((file, e));
                }
            }
        }
        (accepted, rejected)
    }
}

/// Strip MIME parameters ("text/plain; charset=utf-8" -> "text/plain").
pub fn normalize_mime_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
}

/// Lower-case extension without the dot, or "" when the name has none.
pub fn extension_of(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
        _ => String::new(),
    }
}

/// Content type declared for local files picked by extension
pub fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    let ct = match extension.to_lowercase().as_str() {
        "pdf" => "application/pdf",
        "xml" => "application/xml",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "zip" => "application/zip",
        "tar" => "application/x-tar",
        "gz" => "application/gzip",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => return None,
    };
    Some(ct)
}

/// Collapse whitespace and drop control characters from a user-entered name.
pub fn sanitize_display_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_DOCUMENT_NAME_LENGTH)
        .collect()
}

/// Name accepted by rename and by upload title overrides.
pub fn validate_document_name(name: &str) -> AppResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(
            "Document name cannot be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_DOCUMENT_NAME_LENGTH {
        return Err(AppError::InvalidInput(format!(
            "Document name exceeds {} characters",
            MAX_DOCUMENT_NAME_LENGTH
        )));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(AppError::InvalidInput(
            "Document name contains control characters".to_string(),
        ));
    }
    Ok(())
}
