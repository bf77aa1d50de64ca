//! Outbound chat messages and the notifier contract.

use crate::error::Result;
use crate::event::ActionId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Severity shown as a colored bar next to the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarColor {
    Good,
    Warning,
    Danger,
}

impl BarColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Warning => "warning",
            Self::Danger => "danger",
        }
    }
}

/// A named button on an interactive message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub action: ActionId,
    pub label: String,
    /// Opaque payload echoed back on press (the entry id for entry actions)
    pub value: Option<String>,
}

impl Button {
    pub fn new(action: ActionId, label: impl Into<String>) -> Self {
        Self {
            action,
            label: label.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// One outbound chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Text {
        text: String,
    },
    ColorBar {
        color: BarColor,
        text: String,
    },
    Interactive {
        text: String,
        buttons: Vec<Button>,
    },
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn good(text: impl Into<String>) -> Self {
        Self::ColorBar {
            color: BarColor::Good,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::ColorBar {
            color: BarColor::Warning,
            text: text.into(),
        }
    }

    pub fn danger(text: impl Into<String>) -> Self {
        Self::ColorBar {
            color: BarColor::Danger,
            text: text.into(),
        }
    }

    pub fn interactive(text: impl Into<String>, buttons: Vec<Button>) -> Self {
        Self::Interactive {
            text: text.into(),
            buttons,
        }
    }

    /// The message body without any decoration.
    pub fn plain_text(&self) -> &str {
        match self {
            Self::Text { text } | Self::ColorBar { text, .. } | Self::Interactive { text, .. } => {
                text
            }
        }
    }
}

/// Where a message goes: a channel and the thread inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub channel: String,
    pub thread: String,
}

impl Destination {
    pub fn new(channel: impl Into<String>, thread: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            thread: thread.into(),
        }
    }
}

/// Delivers messages to the chat platform.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one message. Implementations do not retry.
    async fn send(&self, to: &Destination, message: &OutboundMessage) -> Result<()>;
}
