//! Domain layer for picpost.
//!
//! Holds the pure models (entries, sessions, inbound events), input validation and the
//! traits the application layer drives: content repository, session store, notifier and
//! attachment fetcher. Nothing in this crate performs I/O on its own.

pub mod clock;
pub mod config;
pub mod content;
pub mod entry;
pub mod error;
pub mod event;
pub mod notify;
pub mod session;
pub mod validation;

// Re-export common error type
pub use error::{PicpostError, Result};
