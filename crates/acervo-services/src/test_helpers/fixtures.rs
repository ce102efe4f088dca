use acervo_core::models::{Document, SourceFile};
use acervo_core::validation::{content_type_for_extension, extension_of};
use acervo_core::Category;
use chrono::Utc;
use uuid::Uuid;

/// First-version document named after the file stem
pub fn sample_document(tenant_id: Uuid, filename: &str, category: Category) -> Document {
    let format = extension_of(filename);
    Document {
        id: Uuid::new_v4(),
        tenant_id,
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
        uploaded_at: Utc::now(),
        reference_date: None,
        reference_period: None,
        size_bytes: 2048,
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

/// PDF source file of the given size
pub fn pdf(filename: &str, size: usize) -> SourceFile {
    SourceFile::new(filename, "application/pdf", vec![b'%'; size])
}

/// Source file with an explicit declared type
pub fn file_of_type(filename: &str, content_type: &str, size: usize) -> SourceFile {
    SourceFile::new(filename, content_type, vec![0u8; size])
}
