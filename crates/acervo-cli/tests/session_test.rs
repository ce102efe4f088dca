use std::sync::Arc;

use acervo_cli::Session;
use acervo_core::models::{AccessAction, AccessLogEntry};
use acervo_core::{AcervoConfig, Category, NodeKey};
use acervo_services::test_helpers::{sample_document, MockTransport, ScriptedFailure};
use chrono::Utc;
use uuid::Uuid;

fn setup() -> (MockTransport, Session) {
    let mock = MockTransport::new();
    let config = AcervoConfig {
        tenant_id: Some(Uuid::new_v4()),
        archive_format: "tar".to_string(),
        ..AcervoConfig::default()
    };
    let session = Session::new(Arc::new(mock.clone()), config).unwrap();
    (mock, session)
}

#[tokio::test]
async fn test_delete_reports_per_item() {
    let (mock, session) = setup();
    let a = mock.insert(sample_document(session.tenant_id(), "a.pdf", Category::Fiscal));
    let b = mock.insert(sample_document(session.tenant_id(), "b.pdf", Category::Fiscal));
    mock.fail(b, ScriptedFailure::server(409, "document is locked"));

    let report = session.delete(&[a, b]).await.unwrap();
    assert_eq!(report.succeeded(), 1);
    assert!(report.summary().contains("1 of 2 succeeded"));
    assert!(mock.is_deleted(a));
    assert!(!mock.is_deleted(b));
}

#[tokio::test]
async fn test_archive_written_into_directory() {
    let (mock, session) = setup();
    let id = mock.insert_with_content(
        sample_document(session.tenant_id(), "certidao.pdf", Category::Certificates),
        "%PDF-1.7",
    );
    let dir = tempfile::tempdir().unwrap();

    let (path, report) = session.archive(&[id], dir.path()).await.unwrap();
    assert_eq!(report.succeeded(), 1);
    assert_eq!(path.parent(), Some(dir.path()));
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("tar"));
    assert!(path.exists());
}

#[tokio::test]
async fn test_replace_then_history() {
    let (mock, session) = setup();
    let v1 = mock.insert(sample_document(session.tenant_id(), "estatuto.pdf", Category::Legal));
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("estatuto_2025.pdf");
    std::fs::write(&file, "%PDF").unwrap();

    let v2 = session
        .replace(v1, &file, Some("Estatuto 2025".to_string()))
        .await
        .unwrap();
    assert_eq!(v2.name, "Estatuto 2025");
    assert_eq!(v2.version, 2);

    let history = session.history(v2.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].id, v1);
}

#[tokio::test]
async fn test_counts_and_access() {
    let (mock, session) = setup();
    let id = mock.insert(sample_document(session.tenant_id(), "a.pdf", Category::Templates));
    mock.insert(sample_document(session.tenant_id(), "b.pdf", Category::Templates));
    mock.add_access(
        id,
        AccessLogEntry {
            action: AccessAction::Download,
            actor: "ana@escritorio.com.br".to_string(),
            timestamp: Utc::now(),
            origin_ip: None,
        },
    );

    let counts = session.counts().await.unwrap();
    assert_eq!(counts[&NodeKey::category(Category::Templates)], 2);
    assert_eq!(counts[&NodeKey::category(Category::Fiscal)], 0);

    let (entries, summary) = session.access(id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(summary.count(AccessAction::Download), 1);
}
