use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use acervo_core::models::{AccessLogEntry, CatalogFilter, Document, DocumentId, SourceFile};
use acervo_core::{AcervoConfig, AppResult, DocumentTransport, NodeKey};
use acervo_services::{
    refresh_channel, AccessSummary, BatchOperationCoordinator, BatchReport, BatchSettings,
    CatalogPage, CatalogSettings, DocumentCatalog, NewVersion, RejectedFile, UploadOptions,
    UploadQueueSettings, UploadState, UploadTaskQueue, VersionChain,
};
use anyhow::Context;
use serde::Serialize;
use uuid::Uuid;

/// Per-file outcome of an upload command
#[derive(Debug, Serialize)]
pub struct UploadSummary {
    pub uploaded: Vec<Document>,
    /// (filename, reason)
    pub failed: Vec<(String, String)>,
}

impl UploadSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Services for one tenant over one transport
pub struct Session {
    transport: Arc<dyn DocumentTransport>,
    config: AcervoConfig,
    tenant_id: Uuid,
}

impl Session {
    pub fn new(transport: Arc<dyn DocumentTransport>, config: AcervoConfig) -> anyhow::Result<Self> {
        let tenant_id = config.require_tenant()?;
        Ok(Self {
            transport,
            config,
            tenant_id,
        })
    }

    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    fn catalog(&self) -> DocumentCatalog {
        let (_signal, listener) = refresh_channel();
        DocumentCatalog::new(
            self.transport.clone(),
            self.tenant_id,
            listener,
            CatalogSettings::from_config(&self.config),
        )
    }

    fn coordinator(&self) -> anyhow::Result<BatchOperationCoordinator> {
        let (signal, _listener) = refresh_channel();
        Ok(BatchOperationCoordinator::new(
            self.transport.clone(),
            BatchSettings::from_config(&self.config)?,
            signal,
        ))
    }

    fn versions(&self) -> anyhow::Result<VersionChain> {
        let (signal, _listener) = refresh_channel();
        VersionChain::from_config(self.transport.clone(), &self.config, signal)
    }

    /// Upload local files and wait for every task to finish.
    pub async fn upload(&self, paths: &[PathBuf], options: UploadOptions) -> anyhow::Result<UploadSummary> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            files.push(SourceFile::read_from(path).await?);
        }

        let (signal, _listener) = refresh_channel();
        let queue = UploadTaskQueue::new(
            self.transport.clone(),
            UploadQueueSettings::from_config(&self.config)?,
            signal,
        );
        let outcome = queue.enqueue(files, options)?;
        queue.wait_all().await;

        let mut summary = UploadSummary {
            uploaded: Vec::new(),
            failed: outcome
                .rejected
                .into_iter()
                .map(|RejectedFile { filename, error }| (filename, error.to_string()))
                .collect(),
        };
        for task in queue.tasks() {
            match task.state() {
                UploadState::Succeeded { document } => summary.uploaded.push((**document).clone()),
                UploadState::Failed { failure, .. } => {
                    summary.failed.push((task.filename.clone(), failure.to_string()))
                }
                _ => {}
            }
        }
        Ok(summary)
    }

    /// One catalog page, 0-based.
    pub async fn list(&self, filter: CatalogFilter, page: u32, page_size: Option<u32>) -> AppResult<CatalogPage> {
        let mut catalog = self.catalog();
        if let Some(size) = page_size {
            catalog.set_page_size(size)?;
        }
        catalog.set_filter(filter);
        catalog.set_page(page);
        Ok(catalog.refresh().await?.clone())
    }

    pub async fn rename(&self, id: DocumentId, name: &str) -> AppResult<Document> {
        self.catalog().rename(id, name).await
    }

    pub async fn duplicates(&self, filename: &str) -> AppResult<Vec<Document>> {
        self.catalog().find_duplicates(filename).await
    }

    pub async fn delete(&self, ids: &[DocumentId]) -> anyhow::Result<BatchReport> {
        Ok(self.coordinator()?.delete_many(ids).await?)
    }

    /// Build an archive of the documents and write it to `output` (a file or a directory).
    pub async fn archive(&self, ids: &[DocumentId], output: &Path) -> anyhow::Result<(PathBuf, BatchReport)> {
        let handle = self.coordinator()?.download_as_archive(ids).await?;
        let written = handle
            .write_to(output)
            .await
            .with_context(|| format!("Failed to write archive to {}", output.display()))?;
        Ok((written, handle.report))
    }

    pub async fn replace(&self, id: DocumentId, path: &Path, title: Option<String>) -> anyhow::Result<Document> {
        let mut new = NewVersion::new(SourceFile::read_from(path).await?);
        new.title = title;
        Ok(self.versions()?.supersede(id, new).await?)
    }

    pub async fn history(&self, id: DocumentId) -> anyhow::Result<Vec<Document>> {
        Ok(self.versions()?.history(id).await?)
    }

    /// Document counts per taxonomy node across the whole tenant
    pub async fn counts(&self) -> AppResult<BTreeMap<NodeKey, usize>> {
        self.catalog().tenant_category_counts().await
    }

    pub async fn access(&self, id: DocumentId) -> AppResult<(Vec<AccessLogEntry>, AccessSummary)> {
        let entries = self.catalog().access_log(id).await?;
        let summary = AccessSummary::from_entries(&entries);
        Ok((entries, summary))
    }
}
