//! Paginated, filtered view over a tenant's documents
//!
//! The catalog is the only writer of its cached page. Uploads and batch operations signal it
//! through [`RefreshListener`]; it refetches when asked.

mod selection;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use acervo_core::constants::MAX_PAGE_SIZE;
use acervo_core::models::{
    AccessLogEntry, CatalogFilter, Document, DocumentId, DocumentPatch, DownloadLink, ListQuery,
    PageMeta,
};
use acervo_core::validation::validate_document_name;
use acervo_core::{AcervoConfig, AppError, AppResult, Category, DocumentTransport, NodeKey, Taxonomy};
use uuid::Uuid;

pub use selection::Selection;

use crate::access::AccessSummary;
use crate::deadline::with_deadline;
use crate::refresh::RefreshListener;

/// One fetched page after client-side narrowing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogPage {
    pub items: Vec<Document>,
    /// Server-side total for the query
    pub total: u64,
    pub meta: PageMeta,
}

#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub page_size: u32,
    pub timeout: Duration,
}

impl CatalogSettings {
    pub fn from_config(config: &AcervoConfig) -> Self {
        Self {
            page_size: config.catalog_page_size,
            timeout: config.transport_timeout(),
        }
    }
}

pub struct DocumentCatalog {
    transport: Arc<dyn DocumentTransport>,
    listener: RefreshListener,
    timeout: Duration,
    tenant_id: Uuid,
    filter: CatalogFilter,
    /// 0-based
    page: u32,
    page_size: u32,
    current: Option<CatalogPage>,
    selection: Selection,
}

impl DocumentCatalog {
    pub fn new(
        transport: Arc<dyn DocumentTransport>,
        tenant_id: Uuid,
        listener: RefreshListener,
        settings: CatalogSettings,
    ) -> Self {
        Self {
            transport,
            listener,
            timeout: settings.timeout,
            tenant_id,
            filter: CatalogFilter::default(),
            page: 0,
            page_size: settings.page_size.clamp(1, MAX_PAGE_SIZE),
            current: None,
            selection: Selection::new(),
        }
    }

    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    pub fn filter(&self) -> &CatalogFilter {
        &self.filter
    }

    pub fn page_index(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn current_page(&self) -> Option<&CatalogPage> {
        self.current.as_ref()
    }

    pub fn visible(&self) -> &[Document] {
        self.current
            .as_ref()
            .map(|page| page.items.as_slice())
            .unwrap_or(&[])
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    /// Select every document on the current page
    pub fn select_all_visible(&mut self) {
        let visible = self.current.as_ref().map(|page| page.items.as_slice()).unwrap_or(&[]);
        self.selection.select_all_visible(visible);
    }

    fn reset_view(&mut self) {
        self.page = 0;
        self.selection.clear();
    }

    pub fn set_filter(&mut self, filter: CatalogFilter) {
        self.filter = filter;
        self.reset_view();
    }

    /// Navigate to a taxonomy node, or to everything with `None`.
    pub fn set_category(&mut self, category: Option<Category>, subcategory: Option<&str>) -> AppResult<()> {
        match category {
            Some(category) => {
                Taxonomy::global().resolve(category, subcategory)?;
                self.filter = self.filter.clone().with_category(category, subcategory);
            }
            None => {
                self.filter.category = None;
                self.filter.subcategory = None;
            }
        }
        self.reset_view();
        Ok(())
    }

    pub fn set_tenant(&mut self, tenant_id: Uuid) {
        if tenant_id != self.tenant_id {
            self.current = None;
        }
        self.tenant_id = tenant_id;
        self.reset_view();
    }

    pub fn set_page_size(&mut self, page_size: u32) -> AppResult<()> {
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(AppError::InvalidInput(format!(
                "Page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        self.page_size = page_size;
        self.reset_view();
        Ok(())
    }

    /// Change only the page index
    pub fn set_page(&mut self, page: u32) {
        self.page = page;
    }

    /// Fetch one page for `filter` and narrow it with the full filter predicate.
    #[tracing::instrument(skip(self, filter), fields(tenant_id = %self.tenant_id))]
    pub async fn query(&self, filter: &CatalogFilter, page: u32, page_size: u32) -> AppResult<CatalogPage> {
        let query = ListQuery::from_filter(self.tenant_id, filter, page, page_size);
        let fetched = with_deadline("list documents", self.timeout, self.transport.list(&query)).await?;

        let fetched_count = fetched.items.len();
        let items: Vec<Document> = fetched
            .items
            .into_iter()
            .filter(|doc| doc.tenant_id == self.tenant_id && filter.matches(doc))
            .collect();
        if items.len() < fetched_count {
            tracing::debug!(
                fetched = fetched_count,
                kept = items.len(),
                "Narrowed listing on the client"
            );
        }

        Ok(CatalogPage {
            items,
            total: fetched.meta.total,
            meta: fetched.meta,
        })
    }

    /// Re-run the active query and replace the cached page. Pending refresh signals are
    /// consumed only when the query succeeds.
    pub async fn refresh(&mut self) -> AppResult<&CatalogPage> {
        let generation = self.listener.current();
        let filter = self.filter.clone();
        let page = self.query(&filter, self.page, self.page_size).await?;
        self.listener.acknowledge_up_to(generation);
        Ok(self.current.insert(page))
    }

    /// Refresh only when an upload or batch operation signalled since the last refresh.
    pub async fn refresh_if_signalled(&mut self) -> AppResult<bool> {
        if !self.listener.is_pending() {
            return Ok(false);
        }
        self.refresh().await?;
        Ok(true)
    }

    fn replace_cached(&mut self, document: &Document) {
        let filter = &self.filter;
        if let Some(page) = self.current.as_mut() {
            if let Some(position) = page.items.iter().position(|d| d.id == document.id) {
                if filter.matches(document) {
                    page.items[position] = document.clone();
                } else {
                    page.items.remove(position);
                }
            }
        }
    }

    /// Rename a document. Blank names are rejected before any call.
    #[tracing::instrument(skip(self))]
    pub async fn rename(&mut self, id: DocumentId, new_name: &str) -> AppResult<Document> {
        validate_document_name(new_name)?;
        self.update(id, DocumentPatch::rename(new_name.trim())).await
    }

    /// Apply a partial update. Category moves are checked against the taxonomy.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(&mut self, id: DocumentId, patch: DocumentPatch) -> AppResult<Document> {
        if patch.is_empty() {
            return Err(AppError::InvalidInput("Nothing to update".to_string()));
        }
        patch.check()?;

        let document = with_deadline("update document", self.timeout, self.transport.update(id, &patch)).await?;
        self.replace_cached(&document);
        tracing::info!(document_id = %id, "Document updated");
        Ok(document)
    }

    /// Set the viewed flag on the cached entry. Returns whether it changed.
    pub fn mark_viewed(&mut self, id: DocumentId) -> bool {
        self.current
            .as_mut()
            .and_then(|page| page.items.iter_mut().find(|d| d.id == id))
            .is_some_and(Document::mark_viewed)
    }

    /// Time-limited download link. Opening a document marks it viewed.
    pub async fn download_link(&mut self, id: DocumentId) -> AppResult<DownloadLink> {
        let link = with_deadline("download link", self.timeout, self.transport.download_link(id)).await?;
        self.mark_viewed(id);
        Ok(link)
    }

    /// Documents of this tenant with the same original filename. Advisory only.
    pub async fn find_duplicates(&self, filename: &str) -> AppResult<Vec<Document>> {
        let wanted = filename.trim();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }
        let query = ListQuery::by_filename(self.tenant_id, wanted, MAX_PAGE_SIZE);
        let page = with_deadline("find duplicates", self.timeout, self.transport.list(&query)).await?;
        Ok(page
            .items
            .into_iter()
            .filter(|doc| doc.tenant_id == self.tenant_id && doc.original_filename.eq_ignore_ascii_case(wanted))
            .collect())
    }

    pub async fn access_log(&self, id: DocumentId) -> AppResult<Vec<AccessLogEntry>> {
        with_deadline("access history", self.timeout, self.transport.access_history(id)).await
    }

    pub async fn access_summary(&self, id: DocumentId) -> AppResult<AccessSummary> {
        let entries = self.access_log(id).await?;
        Ok(AccessSummary::from_entries(&entries))
    }

    /// Per-node counts over the cached page
    pub fn category_counts(&self) -> BTreeMap<NodeKey, usize> {
        Taxonomy::global().count_by_node(self.visible())
    }

    /// Per-node counts over every document of the tenant, walking all listing pages.
    pub async fn tenant_category_counts(&self) -> AppResult<BTreeMap<NodeKey, usize>> {
        let mut documents = Vec::new();
        let mut page = 0u32;
        loop {
            let query = ListQuery::from_filter(self.tenant_id, &CatalogFilter::default(), page, MAX_PAGE_SIZE);
            let fetched = with_deadline("list documents", self.timeout, self.transport.list(&query)).await?;
            let fetched_count = fetched.items.len();
            documents.extend(fetched.items.into_iter().filter(|d| d.tenant_id == self.tenant_id));
            page += 1;
            if !fetched.meta.has_next || fetched_count == 0 || page >= fetched.meta.total_pages {
                break;
            }
        }
        Ok(Taxonomy::global().count_by_node(&documents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refresh::refresh_channel;
    use crate::test_helpers::{sample_document, MockCall, MockTransport};

    fn catalog(transport: &MockTransport, tenant: Uuid) -> DocumentCatalog {
        let (_signal, listener) = refresh_channel();
        DocumentCatalog::new(
            Arc::new(transport.clone()),
            tenant,
            listener,
            CatalogSettings {
                page_size: 20,
                timeout: Duration::from_secs(5),
            },
        )
    }

    #[tokio::test]
    async fn test_filter_change_resets_page_and_selection() {
        let transport = MockTransport::new();
        let tenant = Uuid::new_v4();
        let mut catalog = catalog(&transport, tenant);

        catalog.set_page(3);
        catalog.selection_mut().select(Uuid::new_v4());
        catalog.set_filter(CatalogFilter::new().with_text("das"));
        assert_eq!(catalog.page_index(), 0);
        assert!(catalog.selection().is_empty());

        catalog.set_page(2);
        catalog.set_category(Some(Category::Labor), Some("folha")).unwrap();
        assert_eq!(catalog.page_index(), 0);
        assert_eq!(catalog.filter().text.as_deref(), Some("das"));

        assert!(matches!(
            catalog.set_category(Some(Category::Labor), Some("nfe")),
            Err(AppError::UnknownTaxonomyNode(_))
        ));

        catalog.set_page(1);
        catalog.set_page_size(50).unwrap();
        assert_eq!(catalog.page_index(), 0);
        assert!(catalog.set_page_size(0).is_err());
    }

    #[tokio::test]
    async fn test_page_index_sent_one_based() {
        let transport = MockTransport::new();
        let tenant = Uuid::new_v4();
        let mut catalog = catalog(&transport, tenant);
        catalog.set_page(2);
        catalog.refresh().await.unwrap();

        let calls = transport.calls();
        match calls.last() {
            Some(MockCall::List(query)) => {
                assert_eq!(query.page, 3);
                assert_eq!(query.per_page, 20);
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_signal_pending() {
        let transport = MockTransport::new();
        let tenant = Uuid::new_v4();
        transport.insert(sample_document(tenant, "a.pdf", Category::Fiscal));
        let (signal, listener) = refresh_channel();
        let mut catalog = DocumentCatalog::new(
            Arc::new(transport.clone()),
            tenant,
            listener,
            CatalogSettings {
                page_size: 20,
                timeout: Duration::from_millis(50),
            },
        );

        signal.signal();
        transport.set_latency(Duration::from_millis(200));
        assert!(matches!(
            catalog.refresh_if_signalled().await,
            Err(AppError::Timeout { .. })
        ));

        transport.set_latency(Duration::ZERO);
        assert!(catalog.refresh_if_signalled().await.unwrap());
        assert_eq!(catalog.visible().len(), 1);
        assert!(!catalog.refresh_if_signalled().await.unwrap());
    }

    #[tokio::test]
    async fn test_rename_rejects_blank_without_calling() {
        let transport = MockTransport::new();
        let tenant = Uuid::new_v4();
        let id = transport.insert(sample_document(tenant, "a.pdf", Category::Fiscal));
        let mut catalog = catalog(&transport, tenant);

        assert!(matches!(
            catalog.rename(id, "   ").await,
            Err(AppError::InvalidInput(_))
        ));
        assert_eq!(transport.count_calls(|c| matches!(c, MockCall::Update(_))), 0);

        catalog.refresh().await.unwrap();
        let renamed = catalog.rename(id, "  Guia DAS ").await.unwrap();
        assert_eq!(renamed.name, "Guia DAS");
        assert_eq!(catalog.visible()[0].name, "Guia DAS");
    }

    #[tokio::test]
    async fn test_update_moves_document_out_of_filtered_view() {
        let transport = MockTransport::new();
        let tenant = Uuid::new_v4();
        let id = transport.insert(sample_document(tenant, "a.pdf", Category::Fiscal));
        let mut catalog = catalog(&transport, tenant);
        catalog.set_category(Some(Category::Fiscal), None).unwrap();
        catalog.refresh().await.unwrap();
        assert_eq!(catalog.visible().len(), 1);

        let patch = DocumentPatch {
            category: Some(Category::Accounting),
            ..Default::default()
        };
        let updated = catalog.update(id, patch).await.unwrap();
        assert_eq!(updated.category, Category::Accounting);
        assert!(catalog.visible().is_empty());
    }

    #[tokio::test]
    async fn test_mark_viewed_is_one_way() {
        let transport = MockTransport::new();
        let tenant = Uuid::new_v4();
        let id = transport.insert(sample_document(tenant, "a.pdf", Category::Fiscal));
        let mut catalog = catalog(&transport, tenant);
        assert!(!catalog.mark_viewed(id));

        catalog.refresh().await.unwrap();
        catalog.download_link(id).await.unwrap();
        assert!(catalog.visible()[0].viewed);
        assert!(!catalog.mark_viewed(id));
    }

    #[tokio::test]
    async fn test_find_duplicates_matches_filename_only() {
        let transport = MockTransport::new();
        let tenant = Uuid::new_v4();
        transport.insert(sample_document(tenant, "Contrato.pdf", Category::Legal));
        transport.insert(sample_document(tenant, "contrato_v2.pdf", Category::Legal));
        transport.insert(sample_document(Uuid::new_v4(), "contrato.pdf", Category::Legal));
        let catalog = catalog(&transport, tenant);

        let duplicates = catalog.find_duplicates("contrato.pdf").await.unwrap();
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].original_filename, "Contrato.pdf");
        assert!(catalog.find_duplicates("  ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tenant_counts_walk_every_page() {
        let transport = MockTransport::new();
        let tenant = Uuid::new_v4();
        for i in 0..130 {
            let mut doc = sample_document(tenant, &format!("nf_{}.xml", i), Category::Fiscal);
            if i % 2 == 0 {
                doc.subcategory = Some("nfe".to_string());
            }
            transport.insert(doc);
        }
        let catalog = catalog(&transport, tenant);
        let counts = catalog.tenant_category_counts().await.unwrap();
        assert_eq!(counts[&NodeKey::category(Category::Fiscal)], 130);
        assert_eq!(counts[&NodeKey::subcategory(Category::Fiscal, "nfe")], 65);
        assert_eq!(counts[&NodeKey::category(Category::Templates)], 0);
    }
}
