//! Version chains: replacing a document with a new upload and walking its predecessors.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use acervo_core::models::{Document, DocumentId, SourceFile, UploadRequest};
use acervo_core::validation::validate_document_name;
use acervo_core::{AcervoConfig, AppError, AppResult, DocumentTransport, ValidationRules};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::deadline::with_deadline;
use crate::refresh::RefreshSignal;

/// Replacement file plus the metadata to change on the new version.
/// Anything left unset is carried over from the document being replaced.
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub file: SourceFile,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<BTreeSet<String>>,
}

impl NewVersion {
    pub fn new(file: SourceFile) -> Self {
        Self {
            file,
            title: None,
            description: None,
            tags: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.tags = Some(tags.into_iter().collect());
        self
    }
}

#[derive(Clone)]
pub struct VersionChain {
    transport: Arc<dyn DocumentTransport>,
    rules: ValidationRules,
    tenant_id: Uuid,
    timeout: Duration,
    upload_timeout: Duration,
    refresh: RefreshSignal,
}

impl VersionChain {
    pub fn new(
        transport: Arc<dyn DocumentTransport>,
        tenant_id: Uuid,
        rules: ValidationRules,
        refresh: RefreshSignal,
    ) -> Self {
        Self {
            transport,
            rules,
            tenant_id,
            timeout: Duration::from_secs(acervo_core::constants::DEFAULT_TRANSPORT_TIMEOUT_SECS),
            upload_timeout: Duration::from_secs(acervo_core::constants::DEFAULT_UPLOAD_TIMEOUT_SECS),
            refresh,
        }
    }

    pub fn from_config(
        transport: Arc<dyn DocumentTransport>,
        config: &AcervoConfig,
        refresh: RefreshSignal,
    ) -> anyhow::Result<Self> {
        Ok(Self::new(transport, config.require_tenant()?, config.validation_rules(), refresh)
            .with_timeouts(config.transport_timeout(), config.upload_timeout()))
    }

    pub fn with_timeouts(mut self, timeout: Duration, upload_timeout: Duration) -> Self {
        self.timeout = timeout;
        self.upload_timeout = upload_timeout;
        self
    }

    async fn fetch(&self, id: DocumentId) -> AppResult<Document> {
        with_deadline("get", self.timeout, self.transport.get(id)).await
    }

    /// Ids on the chain of `start`, `start` included. Stops at a missing predecessor.
    /// A revisit or a chain longer than `start.version` is a cycle.
    async fn chain_ids(&self, start: &Document) -> AppResult<HashSet<DocumentId>> {
        let mut visited = HashSet::from([start.id]);
        let mut next = start.previous_version_id;
        let mut steps = 1u32;

        while let Some(id) = next {
            if !visited.insert(id) {
                return Err(AppError::VersionCycle(format!(
                    "document {} appears twice in the chain of {}",
                    id, start.id
                )));
            }
            steps += 1;
            if steps > start.version {
                return Err(AppError::VersionCycle(format!(
                    "chain of {} is longer than its version {}",
                    start.id, start.version
                )));
            }
            match self.fetch(id).await {
                Ok(document) => next = document.previous_version_id,
                Err(AppError::NotFound(_)) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(visited)
    }

    /// Upload `new` as the next version of `old_id`. The old document is left as is.
    #[tracing::instrument(skip(self, new), fields(filename = %new.file.filename))]
    pub async fn supersede(&self, old_id: DocumentId, new: NewVersion) -> AppResult<Document> {
        let old = self.fetch(old_id).await?;
        if old.tenant_id != self.tenant_id {
            return Err(AppError::NotFound(format!("Document {}", old_id)));
        }
        let visited = self.chain_ids(&old).await?;

        self.rules.validate(&new.file)?;
        let title = match new.title {
            Some(title) => {
                validate_document_name(&title)?;
                title.trim().to_string()
            }
            None => old.name.clone(),
        };

        let request = UploadRequest {
            tenant_id: self.tenant_id,
            file: new.file,
            category: old.category,
            subcategory: old.subcategory.clone(),
            title,
            description: new.description.or_else(|| old.description.clone()),
            tags: new.tags.unwrap_or_else(|| old.tags.clone()),
            private: old.private,
            shared_with_accountant: old.shared_with_accountant,
            original_document_id: Some(old.id),
        };

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let upload = with_deadline(
            "upload",
            self.upload_timeout,
            self.transport.upload(request, progress_tx),
        );
        tokio::pin!(upload);
        let created = loop {
            tokio::select! {
                result = &mut upload => break result?,
                Some(progress) = progress_rx.recv() => {
                    tracing::debug!(old_id = %old.id, progress = progress.percent(), "Replacement upload progress");
                }
            }
        };
        // The new document exists on the server from here on, even if it fails the checks below
        self.refresh.signal();

        if visited.contains(&created.id) {
            tracing::error!(document_id = %created.id, "New version is already on the chain");
            return Err(AppError::VersionCycle(format!(
                "document {} is already part of the chain of {}",
                created.id, old.id
            )));
        }
        if !created.supersedes(&old) {
            tracing::error!(
                document_id = %created.id,
                version = created.version,
                previous = ?created.previous_version_id,
                "Server returned an inconsistent version"
            );
            return Err(AppError::VersionChainCorrupt(format!(
                "expected version {} after {}, got version {} after {:?}",
                old.version + 1,
                old.id,
                created.version,
                created.previous_version_id
            )));
        }

        tracing::info!(
            old_id = %old.id,
            new_id = %created.id,
            version = created.version,
            "Document superseded"
        );
        Ok(created)
    }

    /// The document and its predecessors, newest first. A complete history holds exactly
    /// `version` documents of this tenant, each one version below the one before it.
    /// A predecessor that no longer exists ends the history early.
    #[tracing::instrument(skip(self))]
    pub async fn history(&self, id: DocumentId) -> AppResult<Vec<Document>> {
        let newest = self.fetch(id).await?;
        if newest.tenant_id != self.tenant_id {
            return Err(AppError::NotFound(format!("Document {}", id)));
        }
        let bound = newest.version as usize;
        let mut seen = HashSet::from([newest.id]);
        let mut next = newest.previous_version_id;
        let mut chain = vec![newest];

        while let Some(prev_id) = next {
            if !seen.insert(prev_id) || chain.len() >= bound {
                return Err(AppError::VersionChainCorrupt(format!(
                    "chain of {} does not terminate within {} steps",
                    id, bound
                )));
            }
            let document = match self.fetch(prev_id).await {
                Ok(document) => document,
                Err(AppError::NotFound(_)) => {
                    tracing::warn!(document_id = %id, missing = %prev_id, "Version history ends at a missing document");
                    return Ok(chain);
                }
                Err(e) => return Err(e),
            };
            if document.tenant_id != self.tenant_id {
                return Err(AppError::VersionChainCorrupt(format!(
                    "document {} in the chain of {} belongs to another tenant",
                    prev_id, id
                )));
            }
            let child_version = chain.last().map_or(0, |d| d.version);
            if document.version + 1 != child_version {
                return Err(AppError::VersionChainCorrupt(format!(
                    "document {} has version {} but precedes version {}",
                    prev_id, document.version, child_version
                )));
            }
            next = document.previous_version_id;
            chain.push(document);
        }

        if chain.len() != bound {
            return Err(AppError::VersionChainCorrupt(format!(
                "chain of {} has {} documents but version {}",
                id,
                chain.len(),
                bound
            )));
        }
        Ok(chain)
    }
}
