use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::{Document, DocumentRecord};
use super::filter::CatalogFilter;
use crate::error::{AppError, AppResult};

/// Pagination block of `GET /documents`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: u64,
    /// 1-based
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageMeta {
    /// Derive the navigation fields from a total and a 1-based page.
    pub fn compute(total: u64, page: u32, per_page: u32) -> Self {
        let per_page = per_page.max(1);
        let total_pages = total.div_ceil(per_page as u64) as u32;
        Self {
            total,
            page,
            per_page,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// Raw listing body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

/// A listing page with records already converted to documents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentPage {
    pub items: Vec<Document>,
    pub meta: PageMeta,
}

impl TryFrom<ListResponse<DocumentRecord>> for DocumentPage {
    type Error = AppError;

    /// Records that cannot be read as documents are skipped, so one bad record does not hide
    /// the rest of the page. `meta` is kept as the server sent it.
    fn try_from(response: ListResponse<DocumentRecord>) -> AppResult<Self> {
        let items = response
            .items
            .into_iter()
            .filter_map(|record| {
                let id = record.id;
                match Document::try_from(record) {
                    Ok(document) => Some(document),
                    Err(e) => {
                        tracing::warn!(document_id = %id, error = %e, "Skipping unreadable document record");
                        None
                    }
                }
            })
            .collect();
        Ok(DocumentPage {
            items,
            meta: response.meta,
        })
    }
}

/// Query parameters of `GET /documents`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub tenant_id: Uuid,
    /// Backend type code
    pub type_code: Option<String>,
    pub subcategory: Option<String>,
    pub search: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub reference_period: Option<String>,
    /// 1-based
    pub page: u32,
    pub per_page: u32,
}

impl ListQuery {
    /// Translate a catalog filter and a 0-based page index into server parameters.
    /// Tags are not sent; they are applied to the fetched page.
    pub fn from_filter(tenant_id: Uuid, filter: &CatalogFilter, page_index: u32, page_size: u32) -> Self {
        Self {
            tenant_id,
            type_code: filter.category.map(|c| c.code().to_string()),
            subcategory: filter.subcategory.clone(),
            search: filter.text.as_deref().map(str::trim).map(str::to_string),
            date_from: filter.date_range.and_then(|r| r.from),
            date_to: filter.date_range.and_then(|r| r.to),
            reference_period: filter.reference_period.map(|p| p.to_string()),
            page: page_index + 1,
            per_page: page_size,
        }
    }

    /// Search by filename across the whole tenant, first page only.
    pub fn by_filename(tenant_id: Uuid, filename: &str, per_page: u32) -> Self {
        Self {
            tenant_id,
            type_code: None,
            subcategory: None,
            search: Some(filename.to_string()),
            date_from: None,
            date_to: None,
            reference_period: None,
            page: 1,
            per_page,
        }
    }

    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("tenantId", self.tenant_id.to_string())];
        if let Some(code) = &self.type_code {
            pairs.push(("type", code.clone()));
        }
        if let Some(sub) = &self.subcategory {
            pairs.push(("subcategory", sub.clone()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(from) = self.date_from {
            pairs.push(("dateFrom", from.to_string()));
        }
        if let Some(to) = self.date_to {
            pairs.push(("dateTo", to.to_string()));
        }
        if let Some(period) = &self.reference_period {
            pairs.push(("referencePeriod", period.clone()));
        }
        pairs.push(("page", self.page.to_string()));
        pairs.push(("perPage", self.per_page.to_string()));
        pairs
    }
}

/// Response of `GET /documents/{id}/download`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadLink {
    /// Time-limited URL
    pub url: String,
    pub filename: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl DownloadLink {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}
