//! Content repository value types.

use serde::{Deserialize, Serialize};

/// Mode of a regular, non-executable file.
pub const FILE_MODE: &str = "100644";

/// Current tip of the target branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadRef {
    pub commit_sha: String,
    pub tree_sha: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeEntryKind {
    Blob,
    Commit,
}

/// One row of a tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: TreeEntryKind,
    pub sha: String,
}

impl TreeEntry {
    pub fn blob(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: FILE_MODE.to_string(),
            kind: TreeEntryKind::Blob,
            sha: sha.into(),
        }
    }
}

/// Author and committer used for every commit the service makes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
}

impl Default for CommitIdentity {
    fn default() -> Self {
        Self {
            name: "picpost".to_string(),
            email: "picpost@users.noreply.github.com".to_string(),
        }
    }
}

/// A single path operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeChange {
    Upsert { path: String, content: Vec<u8> },
    Remove { path: String },
}

impl TreeChange {
    pub fn path(&self) -> &str {
        match self {
            Self::Upsert { path, .. } | Self::Remove { path } => path,
        }
    }
}

/// Every path operation of one commit, computed before any remote write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeChangeSet {
    pub message: String,
    pub changes: Vec<TreeChange>,
}

impl TreeChangeSet {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            changes: Vec::new(),
        }
    }

    pub fn upsert(mut self, path: impl Into<String>, content: Vec<u8>) -> Self {
        self.changes.push(TreeChange::Upsert {
            path: path.into(),
            content,
        });
        self
    }

    pub fn remove(mut self, path: impl Into<String>) -> Self {
        self.changes.push(TreeChange::Remove { path: path.into() });
        self
    }

    /// Removals cannot be layered onto a base tree and force a full tree rebuild.
    pub fn requires_full_tree(&self) -> bool {
        self.changes
            .iter()
            .any(|c| matches!(c, TreeChange::Remove { .. }))
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_tree_only_for_removals() {
        let create = TreeChangeSet::new("add")
            .upsert("images/a.png", vec![1])
            .upsert("data/entries.json", b"[]".to_vec());
        assert!(!create.requires_full_tree());

        let delete = TreeChangeSet::new("remove")
            .remove("images/a.png")
            .upsert("data/entries.json", b"[]".to_vec());
        assert!(delete.requires_full_tree());
        assert_eq!(delete.changes[0].path(), "images/a.png");
    }

    #[test]
    fn test_tree_entry_wire_shape() {
        let entry = TreeEntry::blob("a.png", "abc");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "blob");
        assert_eq!(json["mode"], "100644");
    }
}
