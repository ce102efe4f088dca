use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use acervo_core::models::{DocumentId, SourceFile, UploadRequest};
use acervo_core::validation::{sanitize_display_name, validate_document_name};
use acervo_core::{AppError, AppResult, Category, DocumentTransport, Taxonomy, ValidationRules};
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use super::task::{TaskId, UploadFailure, UploadTask};
use crate::deadline::with_deadline;
use crate::refresh::RefreshSignal;

/// Classification and metadata applied to every file of one enqueue call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub category: Category,
    pub subcategory: Option<String>,
    /// Defaults to the file name without extension
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: BTreeSet<String>,
    pub private: bool,
    pub shared_with_accountant: bool,
    /// Upload as the next version of this document
    pub replaces: Option<DocumentId>,
}

impl UploadOptions {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            subcategory: None,
            title: None,
            description: None,
            tags: BTreeSet::new(),
            private: false,
            shared_with_accountant: false,
            replaces: None,
        }
    }

    pub fn with_subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = Some(subcategory.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    pub fn shared_with_accountant(mut self, shared: bool) -> Self {
        self.shared_with_accountant = shared;
        self
    }

    pub fn replacing(mut self, document_id: DocumentId) -> Self {
        self.replaces = Some(document_id);
        self
    }

    /// The target node must exist in the taxonomy and an explicit title must be a valid name.
    pub fn validate(&self) -> AppResult<()> {
        Taxonomy::global().resolve(self.category, self.subcategory.as_deref())?;
        if let Some(title) = &self.title {
            validate_document_name(title)?;
        }
        Ok(())
    }

    pub(crate) fn request_for(&self, tenant_id: Uuid, file: SourceFile) -> UploadRequest {
        let title = match &self.title {
            Some(title) => title.trim().to_string(),
            None => {
                let stem = sanitize_display_name(file.stem());
                if stem.is_empty() {
                    file.filename.clone()
                } else {
                    stem
                }
            }
        };
        UploadRequest {
            tenant_id,
            category: self.category,
            subcategory: self
                .subcategory
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            title,
            description: self.description.clone(),
            tags: self.tags.clone(),
            private: self.private,
            shared_with_accountant: self.shared_with_accountant,
            original_document_id: self.replaces,
            file,
        }
    }
}

/// A file that never became a task
#[derive(Debug)]
pub struct RejectedFile {
    pub filename: String,
    pub error: AppError,
}

#[derive(Debug)]
pub struct EnqueueOutcome {
    /// One task per accepted file, in input order
    pub tasks: Vec<TaskId>,
    pub rejected: Vec<RejectedFile>,
}

#[derive(Debug, Clone)]
pub struct UploadQueueSettings {
    pub tenant_id: Uuid,
    pub rules: ValidationRules,
    pub upload_timeout: Duration,
}

impl UploadQueueSettings {
    pub fn from_config(config: &acervo_core::AcervoConfig) -> anyhow::Result<Self> {
        Ok(Self {
            tenant_id: config.require_tenant()?,
            rules: config.validation_rules(),
            upload_timeout: config.upload_timeout(),
        })
    }
}

struct TaskEntry {
    id: TaskId,
    receiver: watch::Receiver<UploadTask>,
    file: SourceFile,
    options: UploadOptions,
}

struct QueueInner {
    transport: Arc<dyn DocumentTransport>,
    settings: UploadQueueSettings,
    refresh: RefreshSignal,
    /// Visible tasks in creation order. Dismissed tasks are removed from here.
    entries: Mutex<Vec<TaskEntry>>,
}

impl QueueInner {
    fn entries(&self) -> MutexGuard<'_, Vec<TaskEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the upload attempts of the current session. Cheap to clone.
#[derive(Clone)]
pub struct UploadTaskQueue {
    inner: Arc<QueueInner>,
}

impl UploadTaskQueue {
    pub fn new(
        transport: Arc<dyn DocumentTransport>,
        settings: UploadQueueSettings,
        refresh: RefreshSignal,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                transport,
                settings,
                refresh,
                entries: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Validate the files and start one concurrent upload per accepted file.
    /// Rejected files are reported and never become tasks.
    #[tracing::instrument(skip(self, files, options), fields(files = files.len(), category = %options.category))]
    pub fn enqueue(&self, files: Vec<SourceFile>, options: UploadOptions) -> AppResult<EnqueueOutcome> {
        options.validate()?;

        let (accepted, rejected) = self.inner.settings.rules.validate_batch(files);
        let rejected: Vec<RejectedFile> = rejected
            .into_iter()
            .map(|(file, error)| RejectedFile {
                filename: file.filename,
                error,
            })
            .collect();

        let tasks: Vec<TaskId> = accepted
            .into_iter()
            .map(|file| self.spawn_task(file, options.clone()))
            .collect();

        tracing::info!(
            accepted = tasks.len(),
            rejected = rejected.len(),
            "Upload tasks submitted"
        );

        Ok(EnqueueOutcome { tasks, rejected })
    }

    fn spawn_task(&self, file: SourceFile, options: UploadOptions) -> TaskId {
        let task = UploadTask::new(file.filename.clone(), file.size_bytes());
        let id = task.id;
        let (tx, rx) = watch::channel(task.clone());

        self.inner.entries().push(TaskEntry {
            id,
            receiver: rx,
            file: file.clone(),
            options: options.clone(),
        });

        let request = options.request_for(self.inner.settings.tenant_id, file);
        let inner = self.inner.clone();
        tokio::spawn(async move {
            run_task(inner, task, tx, request).await;
        });

        id
    }

    /// Observe one task. `None` once the task was dismissed.
    pub fn subscribe(&self, task_id: TaskId) -> Option<watch::Receiver<UploadTask>> {
        self.inner
            .entries()
            .iter()
            .find(|entry| entry.id == task_id)
            .map(|entry| entry.receiver.clone())
    }

    pub fn snapshot(&self, task_id: TaskId) -> Option<UploadTask> {
        self.subscribe(task_id).map(|rx| rx.borrow().clone())
    }

    /// Snapshots of every visible task in creation order
    pub fn tasks(&self) -> Vec<UploadTask> {
        self.inner
            .entries()
            .iter()
            .map(|entry| entry.receiver.borrow().clone())
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.inner
            .entries()
            .iter()
            .filter(|entry| !entry.receiver.borrow().is_terminal())
            .count()
    }

    /// Remove a task from the visible list. An in-flight transport call keeps running; its
    /// result is dropped when it arrives.
    pub fn dismiss(&self, task_id: TaskId) -> bool {
        let mut entries = self.inner.entries();
        let before = entries.len();
        entries.retain(|entry| entry.id != task_id);
        let removed = entries.len() != before;
        if removed {
            tracing::debug!(task_id = %task_id, "Upload task dismissed");
        }
        removed
    }

    /// Dismiss every terminal task. Returns how many were removed.
    pub fn clear_finished(&self) -> usize {
        let mut entries = self.inner.entries();
        let before = entries.len();
        entries.retain(|entry| !entry.receiver.borrow().is_terminal());
        before - entries.len()
    }

    /// Start a new attempt for a failed task. The failed task is replaced in the visible list
    /// by the new one, which gets a fresh id.
    pub fn retry(&self, task_id: TaskId) -> AppResult<TaskId> {
        let (file, options) = {
            let mut entries = self.inner.entries();
            let position = entries
                .iter()
                .position(|entry| entry.id == task_id)
                .ok_or_else(|| AppError::NotFound(format!("Upload task {}", task_id)))?;

            let state_name = entries[position].receiver.borrow().state().name();
            if entries[position].receiver.borrow().failure().is_none() {
                return Err(AppError::InvalidTransition {
                    task_id,
                    from: state_name,
                    to: "retry",
                });
            }

            let entry = entries.remove(position);
            (entry.file, entry.options)
        };

        let new_id = self.spawn_task(file, options);
        tracing::info!(task_id = %task_id, new_task_id = %new_id, "Retrying failed upload");
        Ok(new_id)
    }

    /// Resolve once every visible task is terminal.
    pub async fn wait_all(&self) {
        let receivers: Vec<watch::Receiver<UploadTask>> = self
            .inner
            .entries()
            .iter()
            .map(|entry| entry.receiver.clone())
            .collect();

        for mut rx in receivers {
            // A closed channel means the task was dismissed and its worker finished
            let _ = rx.wait_for(UploadTask::is_terminal).await;
        }
    }
}

async fn run_task(
    inner: Arc<QueueInner>,
    mut task: UploadTask,
    tx: watch::Sender<UploadTask>,
    request: UploadRequest,
) {
    let task_id = task.id;
    if let Err(e) = task.start() {
        tracing::error!(task_id = %task_id, error = %e, "Upload task could not start");
        return;
    }
    tx.send_replace(task.clone());

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let upload = with_deadline(
        "upload",
        inner.settings.upload_timeout,
        inner.transport.upload(request, progress_tx),
    );
    tokio::pin!(upload);

    let result = loop {
        tokio::select! {
            result = &mut upload => break result,
            Some(progress) = progress_rx.recv() => {
                let percent = progress.percent();
                if percent > task.progress() && task.advance(percent).is_ok() {
                    tracing::debug!(task_id = %task_id, progress = percent, "Upload progress");
                    tx.send_replace(task.clone());
                }
            }
        }
    };

    // Holding the lock orders this against dismiss()
    let entries = inner.entries();
    if !entries.iter().any(|entry| entry.id == task_id) {
        tracing::debug!(
            task_id = %task_id,
            succeeded = result.is_ok(),
            "Discarding result of dismissed upload task"
        );
        return;
    }

    match result {
        Ok(document) => {
            let document_id = document.id;
            match task.succeed(document) {
                Ok(()) => {
                    tx.send_replace(task);
                    inner.refresh.signal();
                    tracing::info!(task_id = %task_id, document_id = %document_id, "Upload succeeded");
                }
                Err(e) => tracing::error!(task_id = %task_id, error = %e, "Invalid upload transition"),
            }
        }
        Err(e) => {
            let failure = UploadFailure::from_error(&e);
            tracing::warn!(task_id = %task_id, error = %e, "Upload failed");
            match task.fail(failure) {
                Ok(()) => {
                    tx.send_replace(task);
                }
                Err(e) => tracing::error!(task_id = %task_id, error = %e, "Invalid upload transition"),
            }
        }
    }
    drop(entries);
}
