//! Data models for the document catalog
//!
//! Domain types used across acervo, plus the wire records exchanged with the document API.

mod access_log;
mod document;
mod filter;
mod pagination;
mod patch;
mod period;
mod upload;

pub use access_log::*;
pub use document::*;
pub use filter::*;
pub use pagination::*;
pub use patch::*;
pub use period::*;
pub use upload::*;

#[cfg(test)]
pub(crate) fn test_document(filename: &str, category: crate::taxonomy::Category) -> Document {
    use crate::validation::{content_type_for_extension, extension_of};

    let format = extension_of(filename);
    Document {
        id: uuid::Uuid::new_v4(),
        tenant_id: uuid::Uuid::nil(),
        name: filename
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(filename)
            .to_string(),
        original_filename: filename.to_string(),
        content_type: content_type_for_extension(&format)
            .unwrap_or("application/octet-stream")
            .to_string(),
        category,
        subcategory: None,
        description: None,
        uploaded_at: chrono::Utc::now(),
        reference_date: None,
        reference_period: None,
        size_bytes: 1024,
        format,
        tags: Default::default(),
        uploaded_by: None,
        viewed: false,
        shared_with_accountant: false,
        private: false,
        version: 1,
        previous_version_id: None,
    }
}
