//! `DocumentTransport` over the document API's HTTP contract.

use acervo_core::models::{
    AccessLogEntry, Document, DocumentId, DocumentPage, DocumentPatch, DocumentRecord,
    DownloadLink, ListQuery, ListResponse, UploadRequest,
};
use acervo_core::{AppError, AppResult, DocumentTransport, ProgressSender};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};

use crate::progress::progress_body;
use crate::ApiClient;

fn document_path(id: DocumentId) -> String {
    format!("/documents/{}", urlencoding::encode(&id.to_string()))
}

impl ApiClient {
    fn upload_form(request: UploadRequest, progress: ProgressSender) -> AppResult<Form> {
        let mut form = Form::new();
        for (key, value) in request.form_fields() {
            form = form.text(key, value);
        }

        let length = request.file.size_bytes();
        let part = Part::stream_with_length(progress_body(request.file.data, progress), length)
            .file_name(request.file.filename)
            .mime_str(&request.file.content_type)
            .map_err(|e| {
                AppError::InvalidInput(format!(
                    "Invalid content type '{}': {}",
                    request.file.content_type, e
                ))
            })?;

        Ok(form.part("file", part))
    }

    /// Whether a resolved download URL has this API's origin (scheme, host and port), so our
    /// credentials may be sent along.
    fn is_own_url(&self, url: &str) -> bool {
        match (reqwest::Url::parse(url), reqwest::Url::parse(self.base_url())) {
            (Ok(url), Ok(base)) => url.origin() == base.origin(),
            _ => false,
        }
    }
}

#[async_trait]
impl DocumentTransport for ApiClient {
    async fn upload(&self, request: UploadRequest, progress: ProgressSender) -> AppResult<Document> {
        tracing::debug!(
            filename = %request.file.filename,
            size = request.file.size_bytes(),
            category = %request.category,
            "Uploading document"
        );
        let form = Self::upload_form(request, progress)?;
        let record: DocumentRecord = self.post_multipart("/documents", form).await?;
        Document::try_from(record)
    }

    async fn list(&self, query: &ListQuery) -> AppResult<DocumentPage> {
        let response: ListResponse<DocumentRecord> =
            self.get("/documents", &query.to_query_pairs()).await?;
        DocumentPage::try_from(response)
    }

    async fn get(&self, id: DocumentId) -> AppResult<Document> {
        let record: DocumentRecord = ApiClient::get(self, &document_path(id), &[]).await?;
        Document::try_from(record)
    }

    async fn update(&self, id: DocumentId, patch: &DocumentPatch) -> AppResult<Document> {
        let record: DocumentRecord = self.patch_json(&document_path(id), &patch.to_wire()).await?;
        Document::try_from(record)
    }

    async fn delete(&self, id: DocumentId) -> AppResult<()> {
        ApiClient::delete(self, &document_path(id)).await
    }

    async fn download_link(&self, id: DocumentId) -> AppResult<DownloadLink> {
        ApiClient::get(self, &format!("{}/download", document_path(id)), &[]).await
    }

    async fn fetch_content(&self, link: &DownloadLink) -> AppResult<Bytes> {
        let url = if link.url.starts_with('/') {
            self.build_url(&link.url)
        } else {
            link.url.clone()
        };

        let request = self.client().get(&url);
        let response = if self.is_own_url(&url) {
            self.send(request).await?
        } else {
            // Presigned URLs carry their own authorization
            crate::check_status(request.send().await.map_err(crate::transport_error)?).await?
        };
        response.bytes().await.map_err(crate::transport_error)
    }

    async fn access_history(&self, id: DocumentId) -> AppResult<Vec<AccessLogEntry>> {
        ApiClient::get(self, &format!("{}/historico", document_path(id)), &[]).await
    }
}
