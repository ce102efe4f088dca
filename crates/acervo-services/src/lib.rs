//! Acervo Services
//!
//! Client-side orchestration over a `DocumentTransport`: the upload task queue, the paginated
//! catalog with its selection, batch delete and archive download, version chains and access log
//! summaries. Components that change server state signal the catalog to refetch instead of
//! editing its cached page.

pub mod access;
pub mod batch;
pub mod catalog;
pub mod deadline;
pub mod refresh;
pub mod upload;
pub mod versions;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use access::AccessSummary;
#[cfg(feature = "archive")]
pub use batch::{ArchiveFormat, ArchiveHandle};
pub use batch::{BatchItemResult, BatchOperation, BatchOperationCoordinator, BatchReport, BatchSettings};
pub use catalog::{CatalogPage, CatalogSettings, DocumentCatalog, Selection};
pub use deadline::with_deadline;
pub use refresh::{refresh_channel, RefreshListener, RefreshSignal};
pub use upload::{
    DropZone, EnqueueOutcome, RejectedFile, TaskId, UploadFailure, UploadOptions, UploadQueueSettings,
    UploadState, UploadTask, UploadTaskQueue,
};
pub use versions::{NewVersion, VersionChain};
