//! Acervo Core Library
//!
//! Domain models, the fixed category taxonomy, upload validation rules, the error taxonomy,
//! configuration, and the transport contract shared by every acervo component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod taxonomy;
pub mod transport;
pub mod validation;

// Re-export commonly used types
pub use config::AcervoConfig;
pub use error::{AppError, AppResult, ErrorMetadata, LogLevel};
pub use taxonomy::{Category, NodeKey, Taxonomy, TaxonomyNode};
pub use transport::{DocumentTransport, ProgressSender};
pub use validation::ValidationRules;
