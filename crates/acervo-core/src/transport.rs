//! Document transport abstraction
//!
//! The contract every backend for the document API implements. The HTTP client lives in
//! `acervo-api-client`; tests use an in-memory implementation.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::AppResult;
use crate::models::{
    AccessLogEntry, Document, DocumentId, DocumentPage, DocumentPatch, DownloadLink, ListQuery,
    TransferProgress, UploadRequest,
};

/// Byte progress channel handed to `upload`. Events must be non-decreasing in `sent`.
pub type ProgressSender = mpsc::UnboundedSender<TransferProgress>;

/// Document API transport
///
/// Implementations do not apply deadlines themselves; callers wrap every call.
/// Errors are classified into `AppError::Transport`, `AppError::Server`, `AppError::NotFound`
/// or `AppError::Timeout`.
#[async_trait]
pub trait DocumentTransport: Send + Sync {
    /// `POST /documents` as multipart. Reports byte progress while the body is sent and returns
    /// the created document.
    async fn upload(&self, request: UploadRequest, progress: ProgressSender) -> AppResult<Document>;

    /// `GET /documents` with the query's parameters
    async fn list(&self, query: &ListQuery) -> AppResult<DocumentPage>;

    /// `GET /documents/{id}`
    async fn get(&self, id: DocumentId) -> AppResult<Document>;

    /// `PATCH /documents/{id}`
    async fn update(&self, id: DocumentId, patch: &DocumentPatch) -> AppResult<Document>;

    /// `DELETE /documents/{id}` (soft delete on the server)
    async fn delete(&self, id: DocumentId) -> AppResult<()>;

    /// `GET /documents/{id}/download`
    async fn download_link(&self, id: DocumentId) -> AppResult<DownloadLink>;

    /// Raw bytes behind a download link
    async fn fetch_content(&self, link: &DownloadLink) -> AppResult<Bytes>;

    /// `GET /documents/{id}/historico`, oldest first
    async fn access_history(&self, id: DocumentId) -> AppResult<Vec<AccessLogEntry>>;
}
