//! Shared pieces of the `acervo` command-line client: tracing setup, output helpers and the
//! [`Session`] that wires the services to one transport.

pub mod session;

use anyhow::Context;
use acervo_core::models::Document;
use serde::Serialize;

pub use session::{Session, UploadSummary};

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f < KIB {
        format!("{} B", bytes)
    } else if bytes_f < KIB * KIB {
        format!("{:.1} KB", bytes_f / KIB)
    } else {
        format!("{:.1} MB", bytes_f / (KIB * KIB))
    }
}

/// Fixed-width table of documents
pub fn document_table(documents: &[Document]) -> String {
    let mut out = format!(
        "{:<36}  {:<32}  {:<14}  {:>9}  {:>3}  {}\n",
        "ID", "NAME", "CATEGORY", "SIZE", "V", "UPLOADED"
    );
    for doc in documents {
        let category = match &doc.subcategory {
            Some(sub) => format!("{}:{}", doc.category.slug(), sub),
            None => doc.category.slug().to_string(),
        };
        out.push_str(&format!(
            "{:<36}  {:<32}  {:<14}  {:>9}  {:>3}  {}{}\n",
            doc.id,
            truncate_string(&doc.name, 32),
            truncate_string(&category, 14),
            format_size(doc.size_bytes),
            doc.version,
            doc.uploaded_at.format("%Y-%m-%d %H:%M"),
            if doc.viewed { "" } else { "  *" }
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use acervo_core::Category;
    use acervo_services::test_helpers::sample_document;
    use uuid::Uuid;

    #[test]
    fn truncate_string_short() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("", 5), "");
    }

    #[test]
    fn truncate_string_long() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("abc", 2), "...");
    }

    #[test]
    fn truncate_string_multibyte() {
        assert_eq!(truncate_string("declaração anual", 10), "declara...");
    }

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(25 * 1024 * 1024), "25.0 MB");
    }

    #[test]
    fn document_table_marks_unviewed() {
        let mut doc = sample_document(Uuid::new_v4(), "guia.pdf", Category::Fiscal);
        doc.subcategory = Some("guias".to_string());
        let table = document_table(&[doc.clone()]);
        let row = table.lines().nth(1).unwrap();
        assert!(row.starts_with(&doc.id.to_string()));
        assert!(row.contains("fiscal:guias"));
        assert!(row.ends_with('*'));
    }
}
