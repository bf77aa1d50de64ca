//! Error types for picpost.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum number of characters of a remote response body kept in a [`RemoteHostError`].
pub const REMOTE_BODY_LIMIT: usize = 300;

/// A shared error type for the entire picpost service.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum PicpostError {
    /// Malformed user input. Always recoverable by re-prompting.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The session expired or never existed.
    #[error("Session not found: '{session_id}'")]
    SessionNotFound { session_id: String },

    /// A content host call returned a non-success response.
    #[error("Remote host error: {0}")]
    RemoteHost(#[from] RemoteHostError),

    /// An outbound chat message could not be delivered.
    #[error("Notifier error: {0}")]
    Notifier(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system or network transport)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Rejected user input.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("'{input}' is not a valid date (use YYYYMMDD or MMDD)")]
    InvalidDate { input: String },

    #[error("'{input}' is not a valid http(s) link")]
    InvalidLink { input: String },

    #[error("'{media_type}' is not a supported image type")]
    UnsupportedMedia { media_type: String },
}

/// Identifies which remote call of a commit sequence failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStep {
    ReadFile,
    ReadHead,
    CreateBlob,
    CreateTree,
    ReadTree,
    CreateCommit,
    UpdateRef,
    DeleteFile,
}

impl CommitStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadFile => "read_file",
            Self::ReadHead => "read_head",
            Self::CreateBlob => "create_blob",
            Self::CreateTree => "create_tree",
            Self::ReadTree => "read_tree",
            Self::CreateCommit => "create_commit",
            Self::UpdateRef => "update_ref",
            Self::DeleteFile => "delete_file",
        }
    }

    /// Whether a failure at this step happens after the ref could have moved.
    ///
    /// Every step before `update_ref` only creates unreachable objects, so a failure there
    /// leaves the branch untouched.
    pub fn is_before_ref_update(&self) -> bool {
        !matches!(self, Self::UpdateRef | Self::DeleteFile)
    }
}

impl fmt::Display for CommitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-success response from the content host.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteHostError {
    pub step: CommitStep,
    pub status: Option<u16>,
    pub body: String,
}

impl fmt::Display for RemoteHostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} failed (status {}): {}", self.step, status, self.body),
            None => write!(f, "{} failed: {}", self.step, self.body),
        }
    }
}

impl RemoteHostError {
    /// Creates an error, truncating `body` to [`REMOTE_BODY_LIMIT`] characters.
    pub fn new(step: CommitStep, status: Option<u16>, body: impl AsRef<str>) -> Self {
        let body = body.as_ref();
        let body = match body.char_indices().nth(REMOTE_BODY_LIMIT) {
            Some((idx, _)) => format!("{}...", &body[..idx]),
            None => body.to_string(),
        };
        Self { step, status, body }
    }

    /// True when the branch ref refused a non fast-forward move.
    pub fn is_conflict(&self) -> bool {
        self.step == CommitStep::UpdateRef && matches!(self.status, Some(409) | Some(422))
    }
}

impl PicpostError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a SessionNotFound error
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    /// Creates a RemoteHost error
    pub fn remote(step: CommitStep, status: Option<u16>, body: impl AsRef<str>) -> Self {
        Self::RemoteHost(RemoteHostError::new(step, status, body))
    }

    /// Creates a Notifier error
    pub fn notifier(message: impl Into<String>) -> Self {
        Self::Notifier(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn is_session_not_found(&self) -> bool {
        matches!(self, Self::SessionNotFound { .. })
    }

    /// Check if this is a ref update rejected as non fast-forward
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::RemoteHost(e) if e.is_conflict())
    }

    /// Returns the remote failure details, if this is a RemoteHost error
    pub fn as_remote(&self) -> Option<&RemoteHostError> {
        match self {
            Self::RemoteHost(e) => Some(e),
            _ => None,
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for PicpostError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for PicpostError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for PicpostError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for PicpostError {
    fn from(err: reqwest::Error) -> Self {
        Self::Io {
            message: format!("HTTP transport error: {}", err),
        }
    }
}

/// A type alias for `Result<T, PicpostError>`.
pub type Result<T> = std::result::Result<T, PicpostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_body_is_truncated() {
        let body = "x".repeat(REMOTE_BODY_LIMIT + 50);
        let err = RemoteHostError::new(CommitStep::CreateBlob, Some(500), &body);
        assert_eq!(err.body.chars().count(), REMOTE_BODY_LIMIT + 3);
        assert!(err.body.ends_with("..."));

        let short = RemoteHostError::new(CommitStep::CreateBlob, Some(500), "boom");
        assert_eq!(short.body, "boom");
    }

    #[test]
    fn test_conflict_only_on_ref_update() {
        assert!(RemoteHostError::new(CommitStep::UpdateRef, Some(422), "").is_conflict());
        assert!(RemoteHostError::new(CommitStep::UpdateRef, Some(409), "").is_conflict());
        assert!(!RemoteHostError::new(CommitStep::UpdateRef, Some(500), "").is_conflict());
        assert!(!RemoteHostError::new(CommitStep::CreateTree, Some(422), "").is_conflict());
    }

    #[test]
    fn test_display_names_step() {
        let err = PicpostError::remote(CommitStep::CreateCommit, Some(404), "Not Found");
        assert_eq!(
            err.to_string(),
            "Remote host error: create_commit failed (status 404): Not Found"
        );
        assert!(err.as_remote().is_some());
        assert!(!err.is_conflict());
    }
}
