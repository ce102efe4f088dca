//! Read-only aggregation of a document's access history

use std::collections::{BTreeMap, BTreeSet};

use acervo_core::models::{AccessAction, AccessLogEntry};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccessSummary {
    pub total: usize,
    pub by_action: BTreeMap<AccessAction, usize>,
    pub actors: BTreeSet<String>,
    pub first_access: Option<DateTime<Utc>>,
    pub last_access: Option<DateTime<Utc>>,
}

impl AccessSummary {
    pub fn from_entries(entries: &[AccessLogEntry]) -> Self {
        let mut summary = AccessSummary {
            total: entries.len(),
            ..Default::default()
        };
        for entry in entries {
            *summary.by_action.entry(entry.action).or_insert(0) += 1;
            summary.actors.insert(entry.actor.clone());
            summary.first_access = Some(match summary.first_access {
                Some(first) => first.min(entry.timestamp),
                None => entry.timestamp,
            });
            summary.last_access = Some(match summary.last_access {
                Some(last) => last.max(entry.timestamp),
                None => entry.timestamp,
            });
        }
        summary
    }

    pub fn count(&self, action: AccessAction) -> usize {
        self.by_action.get(&action).copied().unwrap_or(0)
    }

    pub fn distinct_actors(&self) -> usize {
        self.actors.len()
    }
}
