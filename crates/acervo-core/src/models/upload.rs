use std::collections::BTreeSet;
use std::path::Path;

use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::taxonomy::Category;
use crate::validation::{content_type_for_extension, extension_of};

/// A file picked or dropped by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub filename: String,
    /// Declared MIME type
    pub content_type: String,
    pub data: Bytes,
}

impl SourceFile {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Read a local file, declaring its type from the extension.
    pub async fn read_from(path: &Path) -> AppResult<Self> {
        let data = tokio::fs::read(path).await.map_err(|e| {
            AppError::InvalidInput(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();
        let content_type = content_type_for_extension(&extension_of(&filename))
            .unwrap_or("application/octet-stream")
            .to_string();
        Ok(Self::new(filename, content_type, data))
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn extension(&self) -> String {
        extension_of(&self.filename)
    }

    /// Filename without its extension, used as the default title
    pub fn stem(&self) -> &str {
        match self.filename.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.filename,
        }
    }
}

/// Everything `POST /documents` needs besides the file itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub tenant_id: Uuid,
    pub file: SourceFile,
    pub category: Category,
    pub subcategory: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub tags: BTreeSet<String>,
    pub private: bool,
    pub shared_with_accountant: bool,
    /// Set when the upload replaces an existing document
    pub original_document_id: Option<Uuid>,
}

impl UploadRequest {
    /// Text fields of the multipart body, file part excluded.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("tenantId", self.tenant_id.to_string()),
            ("type", self.category.code().to_string()),
            ("title", self.title.clone()),
        ];
        if let Some(sub) = &self.subcategory {
            fields.push(("subcategory", sub.clone()));
        }
        if let Some(description) = &self.description {
            fields.push(("description", description.clone()));
        }
        for tag in &self.tags {
            fields.push(("tags", tag.clone()));
        }
        if self.private {
            fields.push(("private", "true".to_string()));
        }
        if self.shared_with_accountant {
            fields.push(("sharedWithAccountant", "true".to_string()));
        }
        if let Some(original) = self.original_document_id {
            fields.push(("originalDocumentId", original.to_string()));
        }
        fields
    }
}

/// Byte progress reported by the transport while a body is being sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransferProgress {
    pub sent: u64,
    pub total: u64,
}

impl TransferProgress {
    /// Whole percent, floored, capped at 100. An empty body counts as complete.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let pct = self.sent.saturating_mul(100) / self.total;
        pct.min(100) as u8
    }
}
