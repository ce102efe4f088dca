//! Upload validation rules and filename helpers

pub mod upload;

pub use upload::{
    content_type_for_extension, extension_of, normalize_mime_type, sanitize_display_name,
    validate_document_name, ValidationRules,
};
