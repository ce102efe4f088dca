use std::sync::Arc;
use std::time::Duration;

use acervo_core::{AppError, Category, ValidationRules};
use acervo_services::test_helpers::{file_of_type, pdf, MockCall, MockTransport, ScriptedFailure};
use acervo_services::{
    refresh_channel, RefreshSignal, UploadFailure, UploadOptions, UploadQueueSettings, UploadState,
    UploadTaskQueue,
};
use uuid::Uuid;

const MIB: usize = 1024 * 1024;

fn setup(mock: &MockTransport, upload_timeout: Duration) -> (UploadTaskQueue, RefreshSignal) {
    let (signal, _listener) = refresh_channel();
    let queue = UploadTaskQueue::new(
        Arc::new(mock.clone()),
        UploadQueueSettings {
            tenant_id: Uuid::new_v4(),
            rules: ValidationRules::default(),
            upload_timeout,
        },
        signal.clone(),
    );
    (queue, signal)
}

#[tokio::test]
async fn test_rejected_files_never_become_tasks() {
    let mock = MockTransport::new();
    let (queue, _) = setup(&mock, Duration::from_secs(5));

    let files = vec![
        pdf("balancete.pdf", 1024),
        pdf("escaneado.pdf", 30 * MIB),
        file_of_type("setup.exe", "application/x-msdownload", 64),
        file_of_type("folha.csv", "text/csv", 64),
    ];
    let outcome = queue
        .enqueue(files, UploadOptions::new(Category::Accounting))
        .unwrap();

    assert_eq!(outcome.tasks.len(), 2);
    assert_eq!(outcome.rejected.len(), 2);
    assert_eq!(outcome.rejected[0].filename, "escaneado.pdf");
    match &outcome.rejected[0].error {
        AppError::TooLarge { limit, .. } => assert_eq!(*limit, 25 * MIB as u64),
        other => panic!("expected TooLarge, got {:?}", other),
    }
    assert!(matches!(
        outcome.rejected[1].error,
        AppError::UnsupportedType { .. }
    ));

    queue.wait_all().await;
    let uploaded: Vec<String> = mock
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            MockCall::Upload { filename, .. } => Some(filename),
            _ => None,
        })
        .collect();
    assert_eq!(uploaded.len(), 2);
    assert!(!uploaded.contains(&"escaneado.pdf".to_string()));
}

#[tokio::test]
async fn test_unknown_subcategory_rejects_whole_enqueue() {
    let mock = MockTransport::new();
    let (queue, _) = setup(&mock, Duration::from_secs(5));

    let result = queue.enqueue(
        vec![pdf("a.pdf", 10)],
        UploadOptions::new(Category::Fiscal).with_subcategory("nao-existe"),
    );
    assert!(matches!(result, Err(AppError::UnknownTaxonomyNode(_))));
    assert!(queue.tasks().is_empty());
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_progress_is_monotonic_and_ends_at_100() {
    let mock = MockTransport::new();
    mock.delay_upload("grande.pdf", Duration::from_millis(200));
    let (queue, signal) = setup(&mock, Duration::from_secs(5));

    let outcome = queue
        .enqueue(vec![pdf("grande.pdf", 4096)], UploadOptions::new(Category::Fiscal))
        .unwrap();
    let mut rx = queue.subscribe(outcome.tasks[0]).unwrap();

    let mut observed = vec![rx.borrow_and_update().progress()];
    while !rx.borrow().is_terminal() {
        if rx.changed().await.is_err() {
            break;
        }
        observed.push(rx.borrow_and_update().progress());
    }

    assert!(observed.windows(2).all(|w| w[0] <= w[1]), "{:?}", observed);
    assert_eq!(observed.last(), Some(&100));
    let task = queue.snapshot(outcome.tasks[0]).unwrap();
    assert!(matches!(task.state(), UploadState::Succeeded { .. }));
    assert_eq!(task.document().unwrap().version, 1);
    assert_eq!(signal.generation(), 1);
}

#[tokio::test]
async fn test_progress_does_not_drop_when_upload_fails_midway() {
    let mock = MockTransport::new();
    mock.delay_upload("a.pdf", Duration::from_millis(200));
    mock.fail_upload("a.pdf", ScriptedFailure::Transport("connection reset".to_string()));
    let (queue, _) = setup(&mock, Duration::from_secs(5));

    let outcome = queue
        .enqueue(vec![pdf("a.pdf", 4096)], UploadOptions::new(Category::Fiscal))
        .unwrap();
    let mut rx = queue.subscribe(outcome.tasks[0]).unwrap();

    let mut observed = vec![rx.borrow_and_update().progress()];
    while !rx.borrow().is_terminal() {
        if rx.changed().await.is_err() {
            break;
        }
        observed.push(rx.borrow_and_update().progress());
    }

    assert!(observed.windows(2).all(|w| w[0] <= w[1]), "{:?}", observed);
    let task = queue.snapshot(outcome.tasks[0]).unwrap();
    assert!(task.failure().is_some());
    assert!(task.progress() > 0);
    assert_eq!(observed.last(), Some(&task.progress()));
}

#[tokio::test]
async fn test_one_failure_does_not_affect_siblings() {
    let mock = MockTransport::new();
    mock.fail_upload("b.pdf", ScriptedFailure::server(500, "disk full"));
    let (queue, signal) = setup(&mock, Duration::from_secs(5));

    let outcome = queue
        .enqueue(
            vec![pdf("a.pdf", 10), pdf("b.pdf", 10), pdf("c.pdf", 10)],
            UploadOptions::new(Category::Legal),
        )
        .unwrap();
    queue.wait_all().await;

    let tasks = queue.tasks();
    assert_eq!(tasks.len(), 3);
    assert!(tasks[0].document().is_some());
    assert_eq!(
        tasks[1].failure(),
        Some(&UploadFailure::ServerRejected("disk full".to_string()))
    );
    assert!(tasks[2].document().is_some());
    assert_eq!(queue.active_count(), 0);
    assert_eq!(signal.generation(), 2);
    assert_eq!(mock.documents().len(), 2);
    assert_eq!(outcome.tasks.len(), 3);
}

#[tokio::test]
async fn test_hanging_upload_fails_as_transport_failure() {
    let mock = MockTransport::new();
    mock.fail_upload("lento.pdf", ScriptedFailure::Hang);
    let (queue, signal) = setup(&mock, Duration::from_millis(100));

    let outcome = queue
        .enqueue(vec![pdf("lento.pdf", 10)], UploadOptions::new(Category::Fiscal))
        .unwrap();
    queue.wait_all().await;

    let task = queue.snapshot(outcome.tasks[0]).unwrap();
    assert!(matches!(
        task.failure(),
        Some(UploadFailure::TransportFailure(_))
    ));
    assert_eq!(signal.generation(), 0);
}

#[tokio::test]
async fn test_dismissed_task_result_is_discarded() {
    let mock = MockTransport::new();
    mock.delay_upload("a.pdf", Duration::from_millis(200));
    let (queue, signal) = setup(&mock, Duration::from_secs(5));

    let outcome = queue
        .enqueue(vec![pdf("a.pdf", 10)], UploadOptions::new(Category::Fiscal))
        .unwrap();
    let task_id = outcome.tasks[0];
    assert!(queue.dismiss(task_id));
    assert!(!queue.dismiss(task_id));

    tokio::time::sleep(Duration::from_millis(500)).await;

    // The server still created the document, but nothing in the session reacts to it
    assert_eq!(mock.documents().len(), 1);
    assert!(queue.snapshot(task_id).is_none());
    assert!(queue.tasks().is_empty());
    assert_eq!(signal.generation(), 0);
}

#[tokio::test]
async fn test_retry_replaces_failed_task() {
    let mock = MockTransport::new();
    mock.fail_upload("a.pdf", ScriptedFailure::Transport("connection reset".to_string()));
    let (queue, _) = setup(&mock, Duration::from_secs(5));

    let outcome = queue
        .enqueue(vec![pdf("a.pdf", 10)], UploadOptions::new(Category::Fiscal))
        .unwrap();
    queue.wait_all().await;
    let failed_id = outcome.tasks[0];
    assert!(queue.snapshot(failed_id).unwrap().failure().unwrap().is_retryable());

    mock.clear_upload_failure("a.pdf");
    let retried = queue.retry(failed_id).unwrap();
    assert_ne!(retried, failed_id);
    queue.wait_all().await;

    assert!(queue.snapshot(failed_id).is_none());
    assert!(queue.snapshot(retried).unwrap().document().is_some());
    assert!(matches!(
        queue.retry(retried),
        Err(AppError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn test_clear_finished_keeps_running_tasks() {
    let mock = MockTransport::new();
    mock.delay_upload("lento.pdf", Duration::from_secs(2));
    let (queue, _) = setup(&mock, Duration::from_secs(5));

    queue
        .enqueue(
            vec![pdf("rapido.pdf", 10), pdf("lento.pdf", 10)],
            UploadOptions::new(Category::Operational),
        )
        .unwrap();

    let fast = queue.tasks()[0].id;
    let mut rx = queue.subscribe(fast).unwrap();
    rx.wait_for(|task| task.is_terminal()).await.unwrap();

    assert_eq!(queue.clear_finished(), 1);
    let remaining = queue.tasks();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].filename, "lento.pdf");
}
