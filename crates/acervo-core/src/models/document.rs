use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::period::ReferencePeriod;
use crate::error::{AppError, AppResult};
use crate::taxonomy::{Category, NodeKey};
use crate::validation::extension_of;

pub type DocumentId = Uuid;

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub tenant_id: Uuid,
    /// Display name, editable through rename
    pub name: String,
    pub original_filename: String,
    pub content_type: String,
    pub category: Category,
    pub subcategory: Option<String>,
    pub description: Option<String>,
    /// Set once at creation
    pub uploaded_at: DateTime<Utc>,
    pub reference_date: Option<NaiveDate>,
    pub reference_period: Option<ReferencePeriod>,
    pub size_bytes: u64,
    /// File extension taken from the original filename at upload time
    pub format: String,
    pub tags: BTreeSet<String>,
    pub uploaded_by: Option<Uuid>,
    pub viewed: bool,
    pub shared_with_accountant: bool,
    pub private: bool,
    /// Starts at 1
    pub version: u32,
    pub previous_version_id: Option<DocumentId>,
}

impl Document {
    pub fn node_key(&self) -> NodeKey {
        match self.subcategory.as_deref().filter(|s| !s.is_empty()) {
            Some(sub) => NodeKey::subcategory(self.category, sub),
            None => NodeKey::category(self.category),
        }
    }

    /// Flip `viewed` to true. Returns whether the flag changed; never goes back to false.
    pub fn mark_viewed(&mut self) -> bool {
        let changed = !self.viewed;
        self.viewed = true;
        changed
    }

    pub fn has_any_tag(&self, tags: &BTreeSet<String>) -> bool {
        tags.iter().any(|tag| self.tags.contains(tag))
    }

    /// True when `self` is the direct successor of `old` in a version chain.
    pub fn supersedes(&self, old: &Document) -> bool {
        self.previous_version_id == Some(old.id) && self.version == old.version + 1
    }

    pub fn is_first_version(&self) -> bool {
        self.version == 1 && self.previous_version_id.is_none()
    }
}

fn first_version() -> u32 {
    1
}

/// Document representation on the wire (`POST /documents`, `GET /documents`, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub title: String,
    /// Backend taxonomy code
    #[serde(rename = "type")]
    pub type_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub original_name: String,
    pub mime_type: String,
    pub file_size: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_period: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<Uuid>,
    #[serde(default)]
    pub viewed: bool,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub shared_with_accountant: bool,
    #[serde(default = "first_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_document_id: Option<Uuid>,
}

impl TryFrom<DocumentRecord> for Document {
    type Error = AppError;

    fn try_from(record: DocumentRecord) -> AppResult<Self> {
        let category = Category::from_code(&record.type_code)?;

        if record.version == 0 {
            return Err(AppError::VersionChainCorrupt(format!(
                "document {} has version 0",
                record.id
            )));
        }
        if record.original_document_id == Some(record.id) {
            return Err(AppError::VersionCycle(format!(
                "document {} lists itself as its previous version",
                record.id
            )));
        }

        let reference_period = record
            .reference_period
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::parse::<ReferencePeriod>)
            .transpose()?;

        Ok(Document {
            id: record.id,
            tenant_id: record.tenant_id,
            name: record.title,
            format: extension_of(&record.original_name),
            original_filename: record.original_name,
            content_type: record.mime_type,
            category,
            subcategory: record.subcategory.filter(|s| !s.trim().is_empty()),
            description: record.description,
            uploaded_at: record.created_at,
            reference_date: record.reference_date,
            reference_period,
            size_bytes: record.file_size,
            tags: record.tags.into_iter().collect(),
            uploaded_by: record.uploaded_by,
            viewed: record.viewed,
            shared_with_accountant: record.shared_with_accountant,
            private: record.private,
            version: record.version,
            previous_version_id: record.original_document_id,
        })
    }
}

impl From<&Document> for DocumentRecord {
    fn from(doc: &Document) -> Self {
        DocumentRecord {
            id: doc.id,
            tenant_id: doc.tenant_id,
            title: doc.name.clone(),
            type_code: doc.category.code().to_string(),
            subcategory: doc.subcategory.clone(),
            description: doc.description.clone(),
            original_name: doc.original_filename.clone(),
            mime_type: doc.content_type.clone(),
            file_size: doc.size_bytes,
            created_at: doc.uploaded_at,
            reference_date: doc.reference_date,
            reference_period: doc.reference_period.map(|p| p.to_string()),
            tags: doc.tags.iter().cloned().collect(),
            uploaded_by: doc.uploaded_by,
            viewed: doc.viewed,
            private: doc.private,
            shared_with_accountant: doc.shared_with_accountant,
            version: doc.version,
            original_document_id: doc.previous_version_id,
        }
    }
}
