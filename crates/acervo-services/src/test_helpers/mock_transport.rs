//! In-memory document API

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use acervo_core::models::{
    AccessLogEntry, Document, DocumentId, DocumentPage, DocumentPatch, DownloadLink, ListQuery,
    PageMeta, TransferProgress, UploadRequest,
};
use acervo_core::validation::extension_of;
use acervo_core::{AppError, AppResult, DocumentTransport, ProgressSender};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

/// Failure injected into a mock call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedFailure {
    Server { status: u16, message: String },
    Transport(String),
    /// Never answers; only a deadline ends the call
    Hang,
}

impl ScriptedFailure {
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        ScriptedFailure::Server {
            status,
            message: message.into(),
        }
    }

    async fn raise<T>(self) -> AppResult<T> {
        match self {
            ScriptedFailure::Server { status, message } => Err(AppError::from_status(status, message)),
            ScriptedFailure::Transport(detail) => Err(AppError::Transport(detail)),
            ScriptedFailure::Hang => {
                std::future::pending::<()>().await;
                Err(AppError::Internal("unreachable".to_string()))
            }
        }
    }
}

/// Recorded transport call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Upload {
        filename: String,
        original_document_id: Option<DocumentId>,
    },
    List(ListQuery),
    Get(DocumentId),
    Update(DocumentId),
    Delete(DocumentId),
    DownloadLink(DocumentId),
    FetchContent(String),
    AccessHistory(DocumentId),
}

#[derive(Default)]
struct MockState {
    /// Insertion order; listings return newest first
    documents: Vec<Document>,
    deleted: HashSet<DocumentId>,
    contents: HashMap<DocumentId, Bytes>,
    access: HashMap<DocumentId, Vec<AccessLogEntry>>,
    upload_failures: HashMap<String, ScriptedFailure>,
    failures: HashMap<DocumentId, ScriptedFailure>,
    upload_delays: HashMap<String, Duration>,
    latency: Duration,
    ignore_filters: bool,
    skip_version_bump: bool,
    calls: Vec<MockCall>,
    in_flight: usize,
    max_in_flight: usize,
}

impl MockState {
    fn live(&self, id: DocumentId) -> AppResult<&Document> {
        if self.deleted.contains(&id) {
            return Err(AppError::NotFound(format!("Document {}", id)));
        }
        self.documents
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Document {}", id)))
    }

    fn matches(&self, doc: &Document, query: &ListQuery) -> bool {
        if doc.tenant_id != query.tenant_id || self.deleted.contains(&doc.id) {
            return false;
        }
        if self.ignore_filters {
            return true;
        }
        if let Some(code) = &query.type_code {
            if doc.category.code() != code {
                return false;
            }
        }
        if let Some(sub) = &query.subcategory {
            if doc.subcategory.as_deref() != Some(sub.as_str()) {
                return false;
            }
        }
        if let Some(search) = &query.search {
            let needle = search.to_lowercase();
            if !doc.name.to_lowercase().contains(&needle)
                && !doc.original_filename.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        let uploaded = doc.uploaded_at.date_naive();
        if query.date_from.is_some_and(|from| uploaded < from) {
            return false;
        }
        if query.date_to.is_some_and(|to| uploaded > to) {
            return false;
        }
        if let Some(period) = &query.reference_period {
            if doc.reference_period.map(|p| p.to_string()).as_ref() != Some(period) {
                return false;
            }
        }
        true
    }
}

/// Counts one running call until dropped
struct InFlight {
    state: Arc<Mutex<MockState>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.in_flight -= 1;
        }
    }
}

/// In-memory `DocumentTransport`. Clones share state.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn insert(&self, document: Document) -> DocumentId {
        let id = document.id;
        self.lock().documents.push(document);
        id
    }

    pub fn insert_with_content(&self, document: Document, content: impl Into<Bytes>) -> DocumentId {
        let id = self.insert(document);
        self.lock().contents.insert(id, content.into());
        id
    }

    /// Stored document, deleted or not
    pub fn document(&self, id: DocumentId) -> Option<Document> {
        self.lock().documents.iter().find(|d| d.id == id).cloned()
    }

    /// Documents that were not deleted, in insertion order
    pub fn documents(&self) -> Vec<Document> {
        let state = self.lock();
        state
            .documents
            .iter()
            .filter(|d| !state.deleted.contains(&d.id))
            .cloned()
            .collect()
    }

    pub fn is_deleted(&self, id: DocumentId) -> bool {
        self.lock().deleted.contains(&id)
    }

    /// Remove a document entirely, as if it was purged
    pub fn purge(&self, id: DocumentId) {
        self.lock().documents.retain(|d| d.id != id);
    }

    pub fn fail_upload(&self, filename: &str, failure: ScriptedFailure) {
        self.lock()
            .upload_failures
            .insert(filename.to_string(), failure);
    }

    pub fn clear_upload_failure(&self, filename: &str) {
        self.lock().upload_failures.remove(filename);
    }

    /// Fail get/update/delete/download link/history calls for one document
    pub fn fail(&self, id: DocumentId, failure: ScriptedFailure) {
        self.lock().failures.insert(id, failure);
    }

    pub fn delay_upload(&self, filename: &str, delay: Duration) {
        self.lock()
            .upload_delays
            .insert(filename.to_string(), delay);
    }

    /// Delay applied to every call
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Behave like a server that ignores every listing filter except tenant and paging
    pub fn ignore_filters(&self, ignore: bool) {
        self.lock().ignore_filters = ignore;
    }

    /// Return uploaded versions without incrementing `version`
    pub fn skip_version_bump(&self, skip: bool) {
        self.lock().skip_version_bump = skip;
    }

    pub fn add_access(&self, id: DocumentId, entry: AccessLogEntry) {
        self.lock().access.entry(id).or_default().push(entry);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    pub fn count_calls(&self, predicate: impl Fn(&MockCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    /// Highest number of upload, delete and download calls running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    fn enter(&self) -> InFlight {
        let mut state = self.lock();
        state.in_flight += 1;
        state.max_in_flight = state.max_in_flight.max(state.in_flight);
        InFlight {
            state: self.state.clone(),
        }
    }

    /// Record the call, then return the configured latency and any failure for `id`.
    fn begin(&self, call: MockCall, id: Option<DocumentId>) -> (Duration, Option<ScriptedFailure>) {
        let mut state = self.lock();
        state.calls.push(call);
        let failure = id.and_then(|id| state.failures.get(&id).cloned());
        (state.latency, failure)
    }

    async fn pause(delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl DocumentTransport for MockTransport {
    async fn upload(&self, request: UploadRequest, progress: ProgressSender) -> AppResult<Document> {
        let _in_flight = self.enter();
        let filename = request.file.filename.clone();
        let (delay, failure) = {
            let mut state = self.lock();
            state.calls.push(MockCall::Upload {
                filename: filename.clone(),
                original_document_id: request.original_document_id,
            });
            let delay = state
                .upload_delays
                .get(&filename)
                .copied()
                .unwrap_or(state.latency);
            (delay, state.upload_failures.get(&filename).cloned())
        };

        let total = request.file.size_bytes();
        const STEPS: u64 = 4;
        for step in 1..=STEPS {
            Self::pause(delay / STEPS as u32).await;
            if step < STEPS || failure.is_none() {
                let _ = progress.send(TransferProgress {
                    sent: total * step / STEPS,
                    total,
                });
            }
        }
        if let Some(failure) = failure {
            return failure.raise().await;
        }

        let mut state = self.lock();
        let (version, previous_version_id) = match request.original_document_id {
            Some(original_id) => {
                let original = state
                    .documents
                    .iter()
                    .find(|d| d.id == original_id)
                    .ok_or_else(|| AppError::NotFound(format!("Document {}", original_id)))?;
                let version = if state.skip_version_bump {
                    original.version
                } else {
                    original.version + 1
                };
                (version, Some(original_id))
            }
            None => (1, None),
        };

        let document = Document {
            id: Uuid::new_v4(),
            tenant_id: request.tenant_id,
            name: request.title,
            format: extension_of(&request.file.filename),
            original_filename: request.file.filename,
            content_type: request.file.content_type,
            category: request.category,
            subcategory: request.subcategory,
            description: request.description,
            uploaded_at: Utc::now(),
            reference_date: None,
            reference_period: None,
            size_bytes: total,
            tags: request.tags,
            uploaded_by: None,
            viewed: false,
            shared_with_accountant: request.shared_with_accountant,
            private: request.private,
            version,
            previous_version_id,
        };
        state.contents.insert(document.id, request.file.data);
        state.documents.push(document.clone());
        Ok(document)
    }

    async fn list(&self, query: &ListQuery) -> AppResult<DocumentPage> {
        let (delay, _) = self.begin(MockCall::List(query.clone()), None);
        Self::pause(delay).await;

        let state = self.lock();
        let matching: Vec<&Document> = state
            .documents
            .iter()
            .rev()
            .filter(|doc| state.matches(doc, query))
            .collect();

        let per_page = query.per_page.max(1);
        let page = query.page.max(1);
        let start = ((page - 1) * per_page) as usize;
        let items = matching
            .iter()
            .skip(start)
            .take(per_page as usize)
            .map(|doc| (*doc).clone())
            .collect();

        Ok(DocumentPage {
            items,
            meta: PageMeta::compute(matching.len() as u64, page, per_page),
        })
    }

    async fn get(&self, id: DocumentId) -> AppResult<Document> {
        let (delay, failure) = self.begin(MockCall::Get(id), Some(id));
        Self::pause(delay).await;
        if let Some(failure) = failure {
            return failure.raise().await;
        }
        self.lock().live(id).cloned()
    }

    async fn update(&self, id: DocumentId, patch: &DocumentPatch) -> AppResult<Document> {
        let (delay, failure) = self.begin(MockCall::Update(id), Some(id));
        Self::pause(delay).await;
        if let Some(failure) = failure {
            return failure.raise().await;
        }

        let mut state = self.lock();
        state.live(id)?;
        let document = state
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Document {}", id)))?;

        if let Some(title) = &patch.title {
            document.name = title.trim().to_string();
        }
        if let Some(description) = &patch.description {
            document.description = Some(description.clone());
        }
        if let Some(category) = patch.category {
            document.category = category;
        }
        if let Some(subcategory) = &patch.subcategory {
            document.subcategory = subcategory.clone();
        }
        if let Some(tags) = &patch.tags {
            document.tags = tags.clone();
        }
        if let Some(private) = patch.private {
            document.private = private;
        }
        if let Some(shared) = patch.shared_with_accountant {
            document.shared_with_accountant = shared;
        }
        Ok(document.clone())
    }

    async fn delete(&self, id: DocumentId) -> AppResult<()> {
        let _in_flight = self.enter();
        let (delay, failure) = self.begin(MockCall::Delete(id), Some(id));
        Self::pause(delay).await;
        if let Some(failure) = failure {
            return failure.raise().await;
        }
        let mut state = self.lock();
        state.live(id)?;
        state.deleted.insert(id);
        Ok(())
    }

    async fn download_link(&self, id: DocumentId) -> AppResult<DownloadLink> {
        let _in_flight = self.enter();
        let (delay, failure) = self.begin(MockCall::DownloadLink(id), Some(id));
        Self::pause(delay).await;
        if let Some(failure) = failure {
            return failure.raise().await;
        }
        let state = self.lock();
        let document = state.live(id)?;
        Ok(DownloadLink {
            url: format!("mock://documents/{}", id),
            filename: document.original_filename.clone(),
            mime_type: document.content_type.clone(),
            expires_at: Some(Utc::now() + chrono::Duration::minutes(5)),
        })
    }

    async fn fetch_content(&self, link: &DownloadLink) -> AppResult<Bytes> {
        let _in_flight = self.enter();
        let (delay, _) = self.begin(MockCall::FetchContent(link.url.clone()), None);
        Self::pause(delay).await;
        let id = link
            .url
            .rsplit('/')
            .next()
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or_else(|| AppError::NotFound(link.url.clone()))?;
        let state = self.lock();
        Ok(state
            .contents
            .get(&id)
            .cloned()
            .unwrap_or_else(|| Bytes::from(format!("content of {}", link.filename))))
    }

    async fn access_history(&self, id: DocumentId) -> AppResult<Vec<AccessLogEntry>> {
        let (delay, failure) = self.begin(MockCall::AccessHistory(id), Some(id));
        Self::pause(delay).await;
        if let Some(failure) = failure {
            return failure.raise().await;
        }
        let state = self.lock();
        state.live(id)?;
        Ok(state.access.get(&id).cloned().unwrap_or_default())
    }
}
