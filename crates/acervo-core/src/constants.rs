//! Shared limits and defaults

/// Default maximum size of a single uploaded document
pub const DEFAULT_MAX_DOCUMENT_SIZE_MB: u64 = 25;

/// Maximum length of a document display name
pub const MAX_DOCUMENT_NAME_LENGTH: usize = 255;

/// Maximum length of a document description
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;

/// Maximum number of tags on one document
pub const MAX_TAGS_PER_DOCUMENT: usize = 20;

/// Default catalog page size
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size the listing endpoint accepts
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default deadline for catalog, patch, delete and download calls
pub const DEFAULT_TRANSPORT_TIMEOUT_SECS: u64 = 30;

/// Default deadline for a single upload
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 300;

/// Maximum number of documents in one batch operation
pub const DEFAULT_BATCH_MAX_SIZE: usize = 50;

/// In-flight per-item calls during a batch operation
pub const DEFAULT_BATCH_CONCURRENCY: usize = 4;

/// Content types accepted when nothing is configured
pub const DEFAULT_ALLOWED_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/xml",
    "text/xml",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "text/csv",
    "text/plain",
    "application/zip",
    "image/*",
];
