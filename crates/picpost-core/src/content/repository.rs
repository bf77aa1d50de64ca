//! Content repository trait.
//!
//! Defines the remote primitives of the content host. None of them is transactional on its
//! own; only `update_ref` makes new objects visible to readers.

use super::model::{CommitIdentity, HeadRef, TreeEntry};
use crate::error::Result;
use async_trait::async_trait;

/// Read/write primitives against the content host's commit graph.
///
/// Every failure is reported as a `RemoteHost` error naming the failing step.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Reads a file as of `commit_sha`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(bytes))`: File found
    /// - `Ok(None)`: File not found
    /// - `Err(_)`: Any other failure
    async fn read_file(&self, path: &str, commit_sha: &str) -> Result<Option<Vec<u8>>>;

    /// Resolves the branch head commit and its tree.
    async fn head(&self) -> Result<HeadRef>;

    /// Stores raw bytes and returns the blob sha.
    async fn create_blob(&self, content: &[u8]) -> Result<String>;

    /// Creates a tree and returns its sha.
    ///
    /// With `base_tree`, `entries` are layered over it; without, `entries` is the complete
    /// listing of the new tree.
    async fn create_tree(&self, base_tree: Option<&str>, entries: &[TreeEntry]) -> Result<String>;

    /// Lists every blob reachable from a tree, with full paths.
    ///
    /// Implementations fail rather than return a partial listing.
    async fn read_tree_recursive(&self, tree_sha: &str) -> Result<Vec<TreeEntry>>;

    /// Creates a commit with a single parent and returns its sha.
    async fn create_commit(
        &self,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
        identity: &CommitIdentity,
    ) -> Result<String>;

    /// Moves the branch to `commit_sha`. Non fast-forward moves are rejected by the host.
    async fn update_ref(&self, commit_sha: &str) -> Result<()>;

    /// Deletes one file in its own commit.
    async fn delete_file(&self, path: &str, message: &str, identity: &CommitIdentity) -> Result<()>;
}
