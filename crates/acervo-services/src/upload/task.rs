use std::fmt::{Display, Formatter, Result as FmtResult};

use acervo_core::models::Document;
use acervo_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub type TaskId = Uuid;

/// Why an upload task ended in `Failed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadFailure {
    TooLarge { size: u64, limit: u64 },
    UnsupportedType { content_type: String, allowed: String },
    /// Network error or deadline expiry
    TransportFailure(String),
    /// The server answered with an error
    ServerRejected(String),
}

impl UploadFailure {
    pub fn from_error(err: &AppError) -> Self {
        match err {
            AppError::TooLarge { size, limit } => UploadFailure::TooLarge {
                size: *size,
                limit: *limit,
            },
            AppError::UnsupportedType {
                content_type,
                allowed,
            } => UploadFailure::UnsupportedType {
                content_type: content_type.clone(),
                allowed: allowed.clone(),
            },
            AppError::Transport(detail) => UploadFailure::TransportFailure(detail.clone()),
            AppError::Timeout { .. } => UploadFailure::TransportFailure(err.to_string()),
            AppError::Server { message, .. } => UploadFailure::ServerRejected(message.clone()),
            other => UploadFailure::ServerRejected(other.to_string()),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            UploadFailure::TransportFailure(_) | UploadFailure::ServerRejected(_)
        )
    }
}

impl Display for UploadFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploadFailure::TooLarge { limit, .. } => write!(
                f,
                "File exceeds the maximum size of {} MB",
                limit / 1024 / 1024
            ),
            UploadFailure::UnsupportedType { content_type, .. } => {
                write!(f, "File type '{}' is not accepted", content_type)
            }
            UploadFailure::TransportFailure(detail) => write!(f, "Upload failed: {}", detail),
            UploadFailure::ServerRejected(detail) => {
                write!(f, "Server rejected the upload: {}", detail)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadState {
    Pending,
    Uploading { progress: u8 },
    Succeeded { document: Box<Document> },
    /// `progress` is the last value reached before failing
    Failed { failure: UploadFailure, progress: u8 },
}

impl UploadState {
    pub fn name(&self) -> &'static str {
        match self {
            UploadState::Pending => "pending",
            UploadState::Uploading { .. } => "uploading",
            UploadState::Succeeded { .. } => "succeeded",
            UploadState::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadState::Succeeded { .. } | UploadState::Failed { .. }
        )
    }
}

/// One upload attempt for one file. Every state change goes through the transition methods.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTask {
    pub id: TaskId,
    pub filename: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    state: UploadState,
}

impl UploadTask {
    pub fn new(filename: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            size_bytes,
            created_at: Utc::now(),
            state: UploadState::Pending,
        }
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// 0 while pending, 100 once succeeded. A failed task keeps the last value it reached.
    pub fn progress(&self) -> u8 {
        match &self.state {
            UploadState::Pending => 0,
            UploadState::Uploading { progress } | UploadState::Failed { progress, .. } => *progress,
            UploadState::Succeeded { .. } => 100,
        }
    }

    pub fn document(&self) -> Option<&Document> {
        match &self.state {
            UploadState::Succeeded { document } => Some(document),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&UploadFailure> {
        match &self.state {
            UploadState::Failed { failure, .. } => Some(failure),
            _ => None,
        }
    }

    fn invalid(&self, to: &'static str) -> AppError {
        AppError::InvalidTransition {
            task_id: self.id,
            from: self.state.name(),
            to,
        }
    }

    /// pending -> uploading
    pub fn start(&mut self) -> AppResult<()> {
        match self.state {
            UploadState::Pending => {
                self.state = UploadState::Uploading { progress: 0 };
                Ok(())
            }
            _ => Err(self.invalid("uploading")),
        }
    }

    /// Progress never goes backwards. Values above 100 are capped.
    pub fn advance(&mut self, percent: u8) -> AppResult<()> {
        let percent = percent.min(100);
        match self.state {
            UploadState::Uploading { progress } if percent >= progress => {
                self.state = UploadState::Uploading { progress: percent };
                Ok(())
            }
            _ => Err(self.invalid("uploading")),
        }
    }

    /// uploading -> succeeded, passing through 100%.
    pub fn succeed(&mut self, document: Document) -> AppResult<()> {
        self.advance(100).map_err(|_| self.invalid("succeeded"))?;
        self.state = UploadState::Succeeded {
            document: Box::new(document),
        };
        Ok(())
    }

    /// pending | uploading -> failed
    pub fn fail(&mut self, failure: UploadFailure) -> AppResult<()> {
        if self.is_terminal() {
            return Err(self.invalid("failed"));
        }
        let progress = self.progress();
        self.state = UploadState::Failed { failure, progress };
        Ok(())
    }
}
