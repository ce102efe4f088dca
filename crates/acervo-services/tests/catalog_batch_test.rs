#![cfg(feature = "archive")]

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use acervo_core::models::{CatalogFilter, DocumentId};
use acervo_core::{AppError, Category, ValidationRules};
use acervo_services::test_helpers::{pdf, sample_document, MockCall, MockTransport, ScriptedFailure};
use acervo_services::{
    refresh_channel, ArchiveFormat, BatchOperationCoordinator, BatchSettings, CatalogSettings,
    DocumentCatalog, RefreshSignal, UploadOptions, UploadQueueSettings, UploadTaskQueue,
};
use uuid::Uuid;

struct Session {
    mock: MockTransport,
    tenant: Uuid,
    catalog: DocumentCatalog,
    signal: RefreshSignal,
}

fn session() -> Session {
    let mock = MockTransport::new();
    let tenant = Uuid::new_v4();
    let (signal, listener) = refresh_channel();
    let catalog = DocumentCatalog::new(
        Arc::new(mock.clone()),
        tenant,
        listener,
        CatalogSettings {
            page_size: 20,
            timeout: Duration::from_secs(5),
        },
    );
    Session {
        mock,
        tenant,
        catalog,
        signal,
    }
}

fn coordinator(session: &Session, settings: BatchSettings) -> BatchOperationCoordinator {
    BatchOperationCoordinator::new(
        Arc::new(session.mock.clone()),
        settings,
        session.signal.clone(),
    )
}

#[tokio::test]
async fn test_results_satisfy_filter_even_when_server_ignores_it() {
    let mut s = session();
    s.mock.ignore_filters(true);

    let mut das = sample_document(s.tenant, "guia_das.pdf", Category::Fiscal);
    das.tags.insert("simples".to_string());
    s.mock.insert(das);
    s.mock
        .insert(sample_document(s.tenant, "guia_inss.pdf", Category::Fiscal));
    s.mock
        .insert(sample_document(s.tenant, "contrato.pdf", Category::Legal));
    s.mock
        .insert(sample_document(Uuid::new_v4(), "outro.pdf", Category::Fiscal));

    let filter = CatalogFilter::new()
        .with_category(Category::Fiscal, None)
        .with_text("guia");
    s.catalog.set_filter(filter.clone());
    let page = s.catalog.refresh().await.unwrap().clone();
    assert_eq!(page.items.len(), 2);
    assert!(page.items.iter().all(|d| filter.matches(d)));

    // A tag on top only removes documents from the page
    let narrowed = filter.with_tag("simples");
    let tagged: Vec<_> = page.items.iter().filter(|d| narrowed.matches(d)).collect();
    assert_eq!(tagged.len(), 1);
    assert!(tagged.iter().all(|d| page.items.contains(d)));
}

#[tokio::test]
async fn test_successful_upload_triggers_one_refetch() {
    let mut s = session();
    s.catalog.refresh().await.unwrap();
    assert!(s.catalog.visible().is_empty());

    let queue = UploadTaskQueue::new(
        Arc::new(s.mock.clone()),
        UploadQueueSettings {
            tenant_id: s.tenant,
            rules: ValidationRules::default(),
            upload_timeout: Duration::from_secs(5),
        },
        s.signal.clone(),
    );
    queue
        .enqueue(
            vec![pdf("a.pdf", 10), pdf("b.pdf", 10)],
            UploadOptions::new(Category::Accounting),
        )
        .unwrap();
    queue.wait_all().await;

    let lists_before = s.mock.count_calls(|c| matches!(c, MockCall::List(_)));
    assert!(s.catalog.refresh_if_signalled().await.unwrap());
    assert!(!s.catalog.refresh_if_signalled().await.unwrap());
    assert_eq!(
        s.mock.count_calls(|c| matches!(c, MockCall::List(_))),
        lists_before + 1
    );
    assert_eq!(s.catalog.visible().len(), 2);
}

#[tokio::test]
async fn test_batch_delete_reports_partial_failure() {
    let mut s = session();
    let ids: Vec<DocumentId> = (0..5)
        .map(|i| {
            s.mock.insert(sample_document(
                s.tenant,
                &format!("doc{}.pdf", i),
                Category::Labor,
            ))
        })
        .collect();
    s.mock.fail(ids[2], ScriptedFailure::server(500, "lock timeout"));

    s.catalog.refresh().await.unwrap();
    assert_eq!(s.catalog.current_page().unwrap().total, 5);
    s.catalog.select_all_visible();
    let selected = s.catalog.selection().snapshot();

    let report = coordinator(&s, BatchSettings::default())
        .delete_many(&selected)
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 4);
    assert_eq!(report.failed(), 1);
    assert!(report.summary().contains("4 of 5 succeeded"));
    assert!(report.summary().contains("lock timeout"));
    let order: Vec<DocumentId> = report.results.iter().map(|r| r.id).collect();
    assert_eq!(order, selected);
    assert!(matches!(
        report.as_error(),
        Some(AppError::PartialBatchFailure {
            succeeded: 4,
            failed: 1
        })
    ));

    assert!(s.catalog.refresh_if_signalled().await.unwrap());
    let remaining: Vec<DocumentId> = s.catalog.visible().iter().map(|d| d.id).collect();
    assert_eq!(remaining, vec![ids[2]]);
}

#[tokio::test]
async fn test_selection_changes_do_not_reach_running_batch() {
    let mut s = session();
    let ids: Vec<DocumentId> = (0..3)
        .map(|i| {
            s.mock.insert(sample_document(
                s.tenant,
                &format!("f{}.pdf", i),
                Category::Fiscal,
            ))
        })
        .collect();
    let extra = s
        .mock
        .insert(sample_document(s.tenant, "extra.pdf", Category::Fiscal));
    s.mock.set_latency(Duration::from_millis(50));

    for id in &ids {
        s.catalog.selection_mut().select(*id);
    }
    let frozen = s.catalog.selection().snapshot();
    let batch = coordinator(&s, BatchSettings::default());
    let running = tokio::spawn(async move { batch.delete_many(&frozen).await });

    s.catalog.selection_mut().deselect(ids[0]);
    s.catalog.selection_mut().select(extra);

    let report = running.await.unwrap().unwrap();
    assert_eq!(report.succeeded(), 3);
    assert!(ids.iter().all(|id| s.mock.is_deleted(*id)));
    assert!(!s.mock.is_deleted(extra));
}

#[tokio::test]
async fn test_batch_respects_concurrency_limit_order() {
    let s = session();
    let ids: Vec<DocumentId> = (0..8)
        .map(|i| {
            s.mock.insert(sample_document(
                s.tenant,
                &format!("n{}.xml", i),
                Category::Fiscal,
            ))
        })
        .collect();
    let settings = BatchSettings {
        concurrency: 2,
        ..BatchSettings::default()
    };

    let report = coordinator(&s, settings).delete_many(&ids).await.unwrap();
    let order: Vec<DocumentId> = report.results.iter().map(|r| r.id).collect();
    assert_eq!(order, ids);
    assert_eq!(s.signal.generation(), 1);
}

#[tokio::test]
async fn test_batch_never_exceeds_concurrency_limit() {
    let s = session();
    let ids: Vec<DocumentId> = (0..10)
        .map(|i| {
            s.mock.insert_with_content(
                sample_document(s.tenant, &format!("recibo_{}.pdf", i), Category::Labor),
                "%PDF",
            )
        })
        .collect();
    s.mock.set_latency(Duration::from_millis(30));
    let settings = BatchSettings {
        concurrency: 3,
        ..BatchSettings::default()
    };
    let coordinator = coordinator(&s, settings);

    coordinator.download_as_archive(&ids).await.unwrap();
    let report = coordinator.delete_many(&ids).await.unwrap();
    assert_eq!(report.succeeded(), 10);
    assert!(s.mock.max_in_flight() <= 3, "{}", s.mock.max_in_flight());
    assert!(s.mock.max_in_flight() > 1);
}

#[tokio::test]
async fn test_zip_archive_contains_selected_documents() {
    let s = session();
    let a = s.mock.insert_with_content(
        sample_document(s.tenant, "nota.xml", Category::Fiscal),
        "<nfe/>",
    );
    let b = s.mock.insert_with_content(
        sample_document(s.tenant, "nota.xml", Category::Fiscal),
        "<nfe v=\"2\"/>",
    );

    let handle = coordinator(&s, BatchSettings::default())
        .download_as_archive(&[a, b])
        .await
        .unwrap();
    assert_eq!(handle.format, ArchiveFormat::Zip);
    assert_eq!(handle.content_type(), "application/zip");
    assert_eq!(handle.report.succeeded(), 2);

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(handle.bytes.to_vec())).unwrap();
    let mut second = String::new();
    archive
        .by_name("nota (2).xml")
        .unwrap()
        .read_to_string(&mut second)
        .unwrap();
    assert_eq!(second, "<nfe v=\"2\"/>");
}

#[tokio::test]
async fn test_tar_archive_written_to_disk() {
    let s = session();
    let id = s.mock.insert_with_content(
        sample_document(s.tenant, "folha.csv", Category::Labor),
        "nome,salario\n",
    );
    let settings = BatchSettings {
        archive_format: ArchiveFormat::Tar,
        ..BatchSettings::default()
    };

    let handle = coordinator(&s, settings)
        .download_as_archive(&[id])
        .await
        .unwrap();
    assert!(handle.file_name.ends_with(".tar"));

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("saida.tar");
    let written = handle.write_to(&target).await.unwrap();
    assert_eq!(written, target);

    let file = std::fs::File::open(&target).unwrap();
    let mut archive = tar::Archive::new(file);
    let mut entries = archive.entries().unwrap();
    let mut entry = entries.next().unwrap().unwrap();
    assert_eq!(entry.path().unwrap().to_string_lossy(), "folha.csv");
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    assert_eq!(content, "nome,salario\n");
}
