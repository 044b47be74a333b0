//! Append-only audit log: records are created, never mutated.

use crate::ids::{ContainerId, ItemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Placement,
    Retrieval,
    Rearrangement,
    Disposal,
    Simulation,
    Emergency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub actor_id: String,
    pub action: ActionKind,
    pub subject_item: Option<ItemId>,
    pub from_container: Option<ContainerId>,
    pub to_container: Option<ContainerId>,
    pub reason: Option<String>,
    pub details: String,
}

impl LogRecord {
    pub fn new(timestamp: DateTime<Utc>, actor_id: impl Into<String>, action: ActionKind, details: impl Into<String>) -> Self {
        LogRecord {
            timestamp,
            actor_id: actor_id.into(),
            action,
            subject_item: None,
            from_container: None,
            to_container: None,
            reason: None,
            details: details.into(),
        }
    }

    pub fn with_subject(mut self, item: ItemId) -> Self {
        self.subject_item = Some(item);
        self
    }

    pub fn with_from(mut self, container: ContainerId) -> Self {
        self.from_container = Some(container);
        self
    }

    pub fn with_to(mut self, container: ContainerId) -> Self {
        self.to_container = Some(container);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
