//! Batch delete and batch download over a frozen set of document ids.
//!
//! Items are independent: a failure is recorded against its id and the rest of the batch
//! carries on. Nothing is rolled back.

#[cfg(feature = "archive")]
pub mod archive;

use std::collections::HashSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::Duration;

use acervo_core::models::DocumentId;
use acervo_core::{AcervoConfig, AppError, AppResult, DocumentTransport};
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::deadline::with_deadline;
use crate::refresh::RefreshSignal;

#[cfg(feature = "archive")]
pub use archive::{ArchiveEntry, ArchiveFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOperation {
    Delete,
    Download,
}

impl Display for BatchOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            BatchOperation::Delete => write!(f, "delete"),
            BatchOperation::Download => write!(f, "download"),
        }
    }
}

/// Outcome of one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItemResult {
    pub id: DocumentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItemResult {
    fn from_result<T>(id: DocumentId, result: &AppResult<T>) -> Self {
        Self {
            id,
            error: result.as_ref().err().map(|e| e.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-item outcomes of one batch, in input order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub operation: BatchOperation,
    pub results: Vec<BatchItemResult>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &BatchItemResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    /// "N of M succeeded", followed by one line per failed item.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{}: {} of {} succeeded",
            self.operation,
            self.succeeded(),
            self.total()
        );
        for failure in self.failures() {
            summary.push_str(&format!(
                "\n  {}: {}",
                failure.id,
                failure.error.as_deref().unwrap_or_default()
            ));
        }
        summary
    }

    /// `PartialBatchFailure` when any item failed.
    pub fn as_error(&self) -> Option<AppError> {
        let failed = self.failed();
        (failed > 0).then(|| AppError::PartialBatchFailure {
            succeeded: self.succeeded(),
            failed,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub max_size: usize,
    pub concurrency: usize,
    /// Deadline for each per-item call
    pub timeout: Duration,
    #[cfg(feature = "archive")]
    pub archive_format: ArchiveFormat,
}

impl BatchSettings {
    pub fn from_config(config: &AcervoConfig) -> AppResult<Self> {
        Ok(Self {
            max_size: config.batch_max_size,
            concurrency: config.batch_concurrency.max(1),
            timeout: config.transport_timeout(),
            #[cfg(feature = "archive")]
            archive_format: config
                .archive_format
                .parse()
                .map_err(|e: anyhow::Error| AppError::InvalidInput(e.to_string()))?,
        })
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_size: acervo_core::constants::DEFAULT_BATCH_MAX_SIZE,
            concurrency: acervo_core::constants::DEFAULT_BATCH_CONCURRENCY,
            timeout: Duration::from_secs(acervo_core::constants::DEFAULT_TRANSPORT_TIMEOUT_SECS),
            #[cfg(feature = "archive")]
            archive_format: ArchiveFormat::Zip,
        }
    }
}

/// Packaged selection ready to be saved
#[cfg(feature = "archive")]
#[derive(Debug, Clone)]
pub struct ArchiveHandle {
    pub file_name: String,
    pub format: ArchiveFormat,
    pub bytes: bytes::Bytes,
    /// Which documents made it into the archive
    pub report: BatchReport,
}

#[cfg(feature = "archive")]
impl ArchiveHandle {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    /// Write the archive to `path`. A directory gets `file_name` appended.
    pub async fn write_to(&self, path: &std::path::Path) -> AppResult<std::path::PathBuf> {
        let target = if tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            path.join(&self.file_name)
        } else {
            path.to_path_buf()
        };
        tokio::fs::write(&target, &self.bytes).await?;
        tracing::info!(path = %target.display(), size = self.bytes.len(), "Archive written");
        Ok(target)
    }
}

/// Runs batch operations against the transport and signals the catalog when done.
#[derive(Clone)]
pub struct BatchOperationCoordinator {
    transport: Arc<dyn DocumentTransport>,
    settings: BatchSettings,
    refresh: RefreshSignal,
}

impl BatchOperationCoordinator {
    pub fn new(
        transport: Arc<dyn DocumentTransport>,
        settings: BatchSettings,
        refresh: RefreshSignal,
    ) -> Self {
        Self {
            transport,
            settings,
            refresh,
        }
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// Copy the ids, dropping repeats while keeping first-seen order.
    fn freeze(&self, ids: &[DocumentId]) -> AppResult<Vec<DocumentId>> {
        let mut seen = HashSet::new();
        let frozen: Vec<DocumentId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        if frozen.is_empty() {
            return Err(AppError::InvalidInput("No documents selected".to_string()));
        }
        if frozen.len() > self.settings.max_size {
            return Err(AppError::InvalidInput(format!(
                "Batch size exceeds maximum of {}",
                self.settings.max_size
            )));
        }
        Ok(frozen)
    }

    /// Delete every id independently. The report lists each outcome in input order.
    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn delete_many(&self, ids: &[DocumentId]) -> AppResult<BatchReport> {
        let ids = self.freeze(ids)?;
        let timeout = self.settings.timeout;

        let results: Vec<BatchItemResult> = stream::iter(ids)
            .map(|id| {
                let transport = self.transport.clone();
                async move {
                    let result = with_deadline("delete", timeout, transport.delete(id)).await;
                    if let Err(e) = &result {
                        tracing::warn!(document_id = %id, error = %e, "Batch delete item failed");
                    }
                    BatchItemResult::from_result(id, &result)
                }
            })
            .buffered(self.settings.concurrency.max(1))
            .collect()
            .await;

        let report = BatchReport {
            operation: BatchOperation::Delete,
            results,
        };
        self.finish(&report);
        Ok(report)
    }

    /// Fetch every document's bytes through its download link and pack them into one archive.
    /// Items that fail are left out and reported.
    #[cfg(feature = "archive")]
    #[tracing::instrument(skip(self, ids), fields(count = ids.len(), format = ?self.settings.archive_format))]
    pub async fn download_as_archive(&self, ids: &[DocumentId]) -> AppResult<ArchiveHandle> {
        let ids = self.freeze(ids)?;
        let timeout = self.settings.timeout;

        let fetched: Vec<(DocumentId, AppResult<ArchiveEntry>)> = stream::iter(ids)
            .map(|id| {
                let transport = self.transport.clone();
                async move {
                    let result: AppResult<ArchiveEntry> = async {
                        let link =
                            with_deadline("download_link", timeout, transport.download_link(id))
                                .await?;
                        let data =
                            with_deadline("fetch_content", timeout, transport.fetch_content(&link))
                                .await?;
                        Ok(ArchiveEntry {
                            document_id: id,
                            filename: link.filename,
                            data,
                        })
                    }
                    .await;
                    if let Err(e) = &result {
                        tracing::warn!(document_id = %id, error = %e, "Batch download item failed");
                    }
                    (id, result)
                }
            })
            .buffered(self.settings.concurrency.max(1))
            .collect()
            .await;

        let mut entries = Vec::new();
        let mut results = Vec::with_capacity(fetched.len());
        for (id, result) in fetched {
            results.push(BatchItemResult::from_result(id, &result));
            if let Ok(entry) = result {
                entries.push(entry);
            }
        }
        let report = BatchReport {
            operation: BatchOperation::Download,
            results,
        };

        if entries.is_empty() {
            self.finish(&report);
            return Err(AppError::PartialBatchFailure {
                succeeded: 0,
                failed: report.failed(),
            });
        }

        let format = self.settings.archive_format;
        let built = tokio::task::spawn_blocking(move || archive::create_archive(format, &entries).map_err(AppError::from))
            .await
            .unwrap_or_else(|e| Err(AppError::Internal(format!("Archive task failed: {}", e))));
        self.package(report, built)
    }

    /// Wrap the built archive in a handle. When packing failed every fetched item is reported
    /// as failed. The batch is finished either way.
    #[cfg(feature = "archive")]
    fn package(&self, mut report: BatchReport, built: AppResult<Vec<u8>>) -> AppResult<ArchiveHandle> {
        let bytes = match built {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build archive");
                for result in report.results.iter_mut().filter(|r| r.is_success()) {
                    result.error = Some(format!("Archive could not be built: {}", e));
                }
                self.finish(&report);
                return Err(AppError::PartialBatchFailure {
                    succeeded: 0,
                    failed: report.failed(),
                });
            }
        };

        let format = self.settings.archive_format;
        let handle = ArchiveHandle {
            file_name: format!(
                "documentos_{}.{}",
                chrono::Utc::now().format("%Y%m%d_%H%M%S"),
                format.extension()
            ),
            format,
            bytes: bytes.into(),
            report,
        };
        self.finish(&handle.report);
        Ok(handle)
    }

    fn finish(&self, report: &BatchReport) {
        tracing::info!(
            operation = %report.operation,
            total = report.total(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Batch operation completed"
        );
        self.refresh.signal();
    }
}
