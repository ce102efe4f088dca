use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Action recorded in a document's access history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessAction {
    View,
    Download,
    Share,
    Edit,
    Delete,
    Upload,
}

impl Display for AccessAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            AccessAction::View => "view",
            AccessAction::Download => "download",
            AccessAction::Share => "share",
            AccessAction::Edit => "edit",
            AccessAction::Delete => "delete",
            AccessAction::Upload => "upload",
        };
        write!(f, "{}", s)
    }
}

/// One entry of `GET /documents/{id}/historico`. Read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLogEntry {
    pub action: AccessAction,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_ip: Option<String>,
}
