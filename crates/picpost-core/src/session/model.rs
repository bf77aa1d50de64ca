//! Session domain model.

use crate::entry::EntryField;
use crate::validation::CalendarDate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The image waiting to be committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingImage {
    /// Where the attachment can be downloaded from
    pub source_ref: String,
    pub display_name: String,
    pub media_type: String,
}

/// Wizard progress. Each variant carries only the fields valid in that state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    WaitingDate {
        pending: PendingImage,
    },
    WaitingTitle {
        pending: PendingImage,
        date: CalendarDate,
    },
    WaitingLink {
        pending: PendingImage,
        date: CalendarDate,
        title: String,
    },
    Completed {
        entry_id: u64,
    },
    Editing {
        entry_id: u64,
        field: EntryField,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::WaitingDate { .. } => "WAITING_DATE",
            Self::WaitingTitle { .. } => "WAITING_TITLE",
            Self::WaitingLink { .. } => "WAITING_LINK",
            Self::Completed { .. } => "COMPLETED",
            Self::Editing { .. } => "EDITING",
        }
    }

    /// True while the upload wizard has not committed anything yet.
    pub fn is_waiting(&self) -> bool {
        matches!(
            self,
            Self::WaitingDate { .. } | Self::WaitingTitle { .. } | Self::WaitingLink { .. }
        )
    }

    pub fn entry_id(&self) -> Option<u64> {
        match self {
            Self::Completed { entry_id } | Self::Editing { entry_id, .. } => Some(*entry_id),
            _ => None,
        }
    }

    pub fn ttl_bucket(&self) -> TtlBucket {
        match self {
            Self::Completed { .. } => TtlBucket::Retained,
            _ => TtlBucket::Active,
        }
    }
}

/// Per-conversation wizard record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Conversation thread identifier
    pub id: String,
    pub channel: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub state: SessionState,
}

impl Session {
    /// A fresh session for an image that just arrived.
    pub fn start(
        id: impl Into<String>,
        channel: impl Into<String>,
        created_at: DateTime<Utc>,
        pending: PendingImage,
    ) -> Self {
        Self {
            id: id.into(),
            channel: channel.into(),
            created_at,
            state: SessionState::WaitingDate { pending },
        }
    }

    /// A minimal COMPLETED session rebuilt from an entry id carried by a button.
    pub fn degraded(
        id: impl Into<String>,
        channel: impl Into<String>,
        created_at: DateTime<Utc>,
        entry_id: u64,
    ) -> Self {
        Self {
            id: id.into(),
            channel: channel.into(),
            created_at,
            state: SessionState::Completed { entry_id },
        }
    }

    pub fn with_state(mut self, state: SessionState) -> Self {
        self.state = state;
        self
    }
}

/// Which expiry window a state falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlBucket {
    /// Wizard or edit in progress
    Active,
    /// Completed; kept around for later edit/delete
    Retained,
}

/// Expiry policy applied on every session write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTtl {
    pub active: Duration,
    pub retained: Duration,
}

impl SessionTtl {
    pub fn for_state(&self, state: &SessionState) -> Duration {
        match state.ttl_bucket() {
            TtlBucket::Active => self.active,
            TtlBucket::Retained => self.retained,
        }
    }
}

impl Default for SessionTtl {
    fn default() -> Self {
        Self {
            active: Duration::from_secs(30 * 60),
            retained: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}
