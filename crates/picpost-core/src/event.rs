//! Inbound event types.
//!
//! Transport adapters translate platform payloads into [`InboundEvent`]; the intake gate and
//! the flow controller only ever see these types.

use crate::entry::EntryField;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A file attached to an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Download location understood by the attachment fetcher
    pub source_ref: String,
    pub display_name: String,
    pub media_type: String,
}

/// Interactive button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionId {
    Today,
    SkipTitle,
    SkipLink,
    PostNow,
    Edit,
    EditField(EntryField),
    Cancel,
    Delete,
    ConfirmDelete,
    CancelDelete,
}

impl ActionId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::SkipTitle => "skip_title",
            Self::SkipLink => "skip_link",
            Self::PostNow => "post_now",
            Self::Edit => "edit",
            Self::EditField(EntryField::Date) => "edit_date",
            Self::EditField(EntryField::Title) => "edit_title",
            Self::EditField(EntryField::Link) => "edit_link",
            Self::Cancel => "cancel",
            Self::Delete => "delete",
            Self::ConfirmDelete => "confirm_delete",
            Self::CancelDelete => "cancel_delete",
        }
    }

    /// Actions that only make sense against an existing entry.
    pub fn targets_entry(&self) -> bool {
        matches!(
            self,
            Self::Edit | Self::EditField(_) | Self::Delete | Self::ConfirmDelete | Self::CancelDelete
        )
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "today" => Self::Today,
            "skip_title" => Self::SkipTitle,
            "skip_link" => Self::SkipLink,
            "post_now" => Self::PostNow,
            "edit" => Self::Edit,
            "cancel" => Self::Cancel,
            "delete" => Self::Delete,
            "confirm_delete" => Self::ConfirmDelete,
            "cancel_delete" => Self::CancelDelete,
            other => match other.strip_prefix("edit_") {
                Some(field) => Self::EditField(field.parse()?),
                None => return Err(format!("unknown action '{other}'")),
            },
        })
    }
}

/// What kind of inbound event arrived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// A user message, with or without an attachment
    Message,
    /// A button press. `value` carries the entry id for entry-targeting actions.
    Action {
        action: ActionId,
        value: Option<String>,
    },
}

/// One inbound event, already authenticated by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Platform event id used for deduplication
    pub id: String,
    #[serde(flatten)]
    pub kind: EventKind,
    /// Conversation thread id; doubles as the session id
    pub session_id: String,
    pub channel: String,
    pub author: String,
    #[serde(default)]
    pub text: String,
    pub attachment: Option<Attachment>,
}

impl InboundEvent {
    /// The entry id carried in a button payload, if any.
    pub fn payload_entry_id(&self) -> Option<u64> {
        match &self.kind {
            EventKind::Action {
                value: Some(value), ..
            } => value.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn action(&self) -> Option<ActionId> {
        match &self.kind {
            EventKind::Action { action, .. } => Some(*action),
            EventKind::Message => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_ids_round_trip() {
        let all = [
            ActionId::Today,
            ActionId::SkipTitle,
            ActionId::SkipLink,
            ActionId::PostNow,
            ActionId::Edit,
            ActionId::EditField(EntryField::Date),
            ActionId::EditField(EntryField::Title),
            ActionId::EditField(EntryField::Link),
            ActionId::Cancel,
            ActionId::Delete,
            ActionId::ConfirmDelete,
            ActionId::CancelDelete,
        ];
        for action in all {
            assert_eq!(action.as_str().parse::<ActionId>().unwrap(), action);
        }
        assert!("edit_colour".parse::<ActionId>().is_err());
        assert!("launch".parse::<ActionId>().is_err());
    }

    #[test]
    fn test_payload_entry_id() {
        let mut event = InboundEvent {
            id: "e1".to_string(),
            kind: EventKind::Action {
                action: ActionId::Delete,
                value: Some("12".to_string()),
            },
            session_id: "t1".to_string(),
            channel: "C1".to_string(),
            author: "U1".to_string(),
            text: String::new(),
            attachment: None,
        };
        assert_eq!(event.payload_entry_id(), Some(12));

        event.kind = EventKind::Action {
            action: ActionId::Delete,
            value: Some("not-a-number".to_string()),
        };
        assert_eq!(event.payload_entry_id(), None);

        event.kind = EventKind::Message;
        assert_eq!(event.payload_entry_id(), None);
        assert_eq!(event.action(), None);
    }
}
