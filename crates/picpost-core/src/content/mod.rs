//! Content repository domain module.
//!
//! The content repository is the version-controlled host that stores images and the entry
//! index. This module defines the primitives the commit engine composes.
//!
//! - `model`: tree entries, head reference, change sets, commit identity
//! - `repository`: the remote primitive contract
//! - `attachment`: downloading chat attachments

mod attachment;
mod model;
mod repository;

pub use attachment::AttachmentFetcher;
pub use model::{CommitIdentity, HeadRef, TreeChange, TreeChangeSet, TreeEntry, TreeEntryKind};
pub use repository::ContentRepository;
