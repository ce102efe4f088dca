//! Upload pipeline: per-file tasks with observable progress and terminal state.

mod drop_zone;
mod queue;
mod task;

pub use drop_zone::DropZone;
pub use queue::{EnqueueOutcome, RejectedFile, UploadOptions, UploadQueueSettings, UploadTaskQueue};
pub use task::{TaskId, UploadFailure, UploadState, UploadTask};
