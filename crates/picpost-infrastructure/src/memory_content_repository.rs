//! In-memory content repository.
//!
//! Mimics the commit-graph semantics of the git data API closely enough to run the service
//! without a remote (`--dry-run`) and to exercise the commit engine in tests: objects are
//! immutable, only `update_ref` changes what readers see, and non fast-forward ref moves are
//! rejected the way the host rejects them.

use async_trait::async_trait;
use picpost_core::content::{CommitIdentity, ContentRepository, HeadRef, TreeEntry, TreeEntryKind};
use picpost_core::error::{CommitStep, PicpostError, Result};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredCommit {
    tree: String,
    parent: Option<String>,
    message: String,
}

#[derive(Debug, Default)]
struct GraphState {
    blobs: HashMap<String, Vec<u8>>,
    /// Flat path -> entry listing per tree
    trees: HashMap<String, BTreeMap<String, TreeEntry>>,
    commits: HashMap<String, StoredCommit>,
    head: String,
}

impl GraphState {
    fn head_tree(&self) -> &BTreeMap<String, TreeEntry> {
        let tree = &self.commits[&self.head].tree;
        &self.trees[tree]
    }

    fn insert_tree(&mut self, listing: BTreeMap<String, TreeEntry>) -> String {
        let sha = new_sha();
        self.trees.insert(sha.clone(), listing);
        sha
    }

    fn insert_commit(&mut self, tree: String, parent: Option<String>, message: &str) -> String {
        let sha = new_sha();
        self.commits.insert(
            sha.clone(),
            StoredCommit {
                tree,
                parent,
                message: message.to_string(),
            },
        );
        sha
    }
}

fn new_sha() -> String {
    Uuid::new_v4().simple().to_string()
}

fn unprocessable(step: CommitStep, message: impl AsRef<str>) -> PicpostError {
    PicpostError::remote(step, Some(422), message)
}

/// Content repository held entirely in memory.
pub struct InMemoryContentRepository {
    state: Mutex<GraphState>,
}

impl InMemoryContentRepository {
    /// Creates a repository with a single empty root commit.
    pub fn new() -> Self {
        let mut state = GraphState::default();
        let tree = state.insert_tree(BTreeMap::new());
        state.head = state.insert_commit(tree, None, "Initial commit");
        Self {
            state: Mutex::new(state),
        }
    }

    /// Commits `files` on top of the current head in one step.
    ///
    /// Used to seed content and to stand in for writers outside this process.
    pub async fn commit_files(&self, message: &str, files: &[(&str, &[u8])]) -> String {
        let mut state = self.state.lock().await;
        let mut listing = state.head_tree().clone();
        for (path, content) in files {
            let blob = new_sha();
            state.blobs.insert(blob.clone(), content.to_vec());
            listing.insert((*path).to_string(), TreeEntry::blob(*path, blob));
        }
        let tree = state.insert_tree(listing);
        let parent = Some(state.head.clone());
        let commit = state.insert_commit(tree, parent, message);
        state.head = commit.clone();
        commit
    }

    /// Contents of `path` at the branch head.
    pub async fn file(&self, path: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().await;
        let entry = state.head_tree().get(path)?;
        state.blobs.get(&entry.sha).cloned()
    }

    /// All paths at the branch head, sorted.
    pub async fn paths(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state.head_tree().keys().cloned().collect()
    }

    /// Commit messages reachable from the head, newest first.
    pub async fn log(&self) -> Vec<String> {
        let state = self.state.lock().await;
        let mut messages = Vec::new();
        let mut cursor = Some(state.head.clone());
        while let Some(sha) = cursor {
            let Some(commit) = state.commits.get(&sha) else {
                break;
            };
            messages.push(commit.message.clone());
            cursor = commit.parent.clone();
        }
        messages
    }
}

impl Default for InMemoryContentRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentRepository for InMemoryContentRepository {
    async fn read_file(&self, path: &str, commit_sha: &str) -> Result<Option<Vec<u8>>> {
        let state = self.state.lock().await;
        let Some(commit) = state.commits.get(commit_sha) else {
            let message = format!("No commit found for the ref {commit_sha}");
            return Err(PicpostError::remote(CommitStep::ReadFile, Some(404), message));
        };
        let Some(entry) = state.trees[&commit.tree].get(path) else {
            return Ok(None);
        };
        Ok(state.blobs.get(&entry.sha).cloned())
    }

    async fn head(&self) -> Result<HeadRef> {
        let state = self.state.lock().await;
        Ok(HeadRef {
            commit_sha: state.head.clone(),
            tree_sha: state.commits[&state.head].tree.clone(),
        })
    }

    async fn create_blob(&self, content: &[u8]) -> Result<String> {
        let mut state = self.state.lock().await;
        let sha = new_sha();
        state.blobs.insert(sha.clone(), content.to_vec());
        Ok(sha)
    }

    async fn create_tree(&self, base_tree: Option<&str>, entries: &[TreeEntry]) -> Result<String> {
        let step = CommitStep::CreateTree;
        let mut state = self.state.lock().await;

        let mut listing = match base_tree {
            Some(base) => state
                .trees
                .get(base)
                .cloned()
                .ok_or_else(|| unprocessable(step, format!("base_tree {base} not found")))?,
            None => BTreeMap::new(),
        };
        for entry in entries {
            if entry.kind == TreeEntryKind::Blob && !state.blobs.contains_key(&entry.sha) {
                return Err(unprocessable(step, format!("blob {} not found", entry.sha)));
            }
            listing.insert(entry.path.clone(), entry.clone());
        }
        Ok(state.insert_tree(listing))
    }

    async fn read_tree_recursive(&self, tree_sha: &str) -> Result<Vec<TreeEntry>> {
        let state = self.state.lock().await;
        let listing = state.trees.get(tree_sha).ok_or_else(|| {
            PicpostError::remote(CommitStep::ReadTree, Some(404), "Not Found")
        })?;
        Ok(listing.values().cloned().collect())
    }

    async fn create_commit(
        &self,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
        _identity: &CommitIdentity,
    ) -> Result<String> {
        let step = CommitStep::CreateCommit;
        let mut state = self.state.lock().await;
        if !state.trees.contains_key(tree_sha) {
            return Err(unprocessable(step, format!("tree {tree_sha} not found")));
        }
        if !state.commits.contains_key(parent_sha) {
            return Err(unprocessable(step, format!("parent {parent_sha} not found")));
        }
        Ok(state.insert_commit(
            tree_sha.to_string(),
            Some(parent_sha.to_string()),
            message,
        ))
    }

    async fn update_ref(&self, commit_sha: &str) -> Result<()> {
        let step = CommitStep::UpdateRef;
        let mut state = self.state.lock().await;
        let commit = state
            .commits
            .get(commit_sha)
            .ok_or_else(|| unprocessable(step, "Object does not exist"))?;
        if commit.parent.as_deref() != Some(state.head.as_str()) {
            return Err(unprocessable(step, "Update is not a fast forward"));
        }
        state.head = commit_sha.to_string();
        Ok(())
    }

    async fn delete_file(&self, path: &str, message: &str, _identity: &CommitIdentity) -> Result<()> {
        let mut state = self.state.lock().await;
        let mut listing = state.head_tree().clone();
        if listing.remove(path).is_none() {
            return Ok(());
        }
        let tree = state.insert_tree(listing);
        let parent = Some(state.head.clone());
        state.head = state.insert_commit(tree, parent, message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_objects_invisible_until_ref_moves() {
        let repo = InMemoryContentRepository::new();
        let head = repo.head().await.unwrap();

        let blob = repo.create_blob(b"hello").await.unwrap();
        let tree = repo
            .create_tree(Some(&head.tree_sha), &[TreeEntry::blob("a.txt", &blob)])
            .await
            .unwrap();
        let commit = repo
            .create_commit("add a", &tree, &head.commit_sha, &CommitIdentity::default())
            .await
            .unwrap();
        assert_eq!(repo.file("a.txt").await, None);

        repo.update_ref(&commit).await.unwrap();
        assert_eq!(repo.file("a.txt").await, Some(b"hello".to_vec()));
        assert_eq!(repo.log().await, vec!["add a", "Initial commit"]);
    }

    #[tokio::test]
    async fn test_non_fast_forward_is_rejected() {
        let repo = InMemoryContentRepository::new();
        let head = repo.head().await.unwrap();
        let commit = repo
            .create_commit("stale", &head.tree_sha, &head.commit_sha, &CommitIdentity::default())
            .await
            .unwrap();

        repo.commit_files("someone else", &[("b.txt", b"b")]).await;

        let err = repo.update_ref(&commit).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(repo.paths().await, vec!["b.txt"]);
    }

    #[tokio::test]
    async fn test_tree_without_base_replaces_listing() {
        let repo = InMemoryContentRepository::new();
        repo.commit_files("seed", &[("a.txt", b"a"), ("b.txt", b"b")]).await;
        let head = repo.head().await.unwrap();

        let listing: Vec<TreeEntry> = repo
            .read_tree_recursive(&head.tree_sha)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.path != "a.txt")
            .collect();
        let tree = repo.create_tree(None, &listing).await.unwrap();
        let commit = repo
            .create_commit("drop a", &tree, &head.commit_sha, &CommitIdentity::default())
            .await
            .unwrap();
        repo.update_ref(&commit).await.unwrap();

        assert_eq!(repo.paths().await, vec!["b.txt"]);
    }

    #[tokio::test]
    async fn test_unknown_blob_rejected() {
        let repo = InMemoryContentRepository::new();
        let err = repo
            .create_tree(None, &[TreeEntry::blob("a.txt", "missing")])
            .await
            .unwrap_err();
        assert_eq!(err.as_remote().map(|e| e.step), Some(CommitStep::CreateTree));
    }

    #[tokio::test]
    async fn test_delete_file() {
        let repo = InMemoryContentRepository::new();
        repo.commit_files("seed", &[("a.txt", b"a")]).await;
        repo.delete_file("a.txt", "rm a", &CommitIdentity::default())
            .await
            .unwrap();
        assert!(repo.paths().await.is_empty());

        // Absent path is a no-op, not a new commit
        repo.delete_file("a.txt", "rm a again", &CommitIdentity::default())
            .await
            .unwrap();
        assert_eq!(repo.log().await.len(), 3);
    }

    #[tokio::test]
    async fn test_read_file_at_older_commit() {
        let repo = InMemoryContentRepository::new();
        let first = repo.commit_files("v1", &[("a.txt", b"one".as_slice())]).await;
        let second = repo.commit_files("v2", &[("a.txt", b"two".as_slice())]).await;

        assert_eq!(repo.read_file("a.txt", &first).await.unwrap(), Some(b"one".to_vec()));
        assert_eq!(repo.read_file("a.txt", &second).await.unwrap(), Some(b"two".to_vec()));
        assert_eq!(repo.read_file("b.txt", &second).await.unwrap(), None);

        let err = repo.read_file("a.txt", "unknown").await.unwrap_err();
        assert_eq!(err.as_remote().map(|e| e.step), Some(CommitStep::ReadFile));
    }
}
