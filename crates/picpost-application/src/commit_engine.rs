//! Atomic multi-file commits over the content repository primitives.
//!
//! The content host has no multi-file transaction. Every change is therefore computed up front
//! as a [`TreeChangeSet`], written as unreachable objects (blobs, tree, commit), and published
//! by a single fast-forward of the branch ref. A failure before the ref moves leaves the branch
//! at its previous commit.

use picpost_core::content::{
    CommitIdentity, ContentRepository, HeadRef, TreeChange, TreeChangeSet, TreeEntry,
};
use picpost_core::entry::{
    Entry, EntryPatch, ImageLayout, ImagePath, compute_next_id, decode_entries, delete_by_id,
    encode_entries, find_by_image_path, find_image_path_by_id, insert_at_head, update_by_id,
};
use picpost_core::error::{PicpostError, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// A change to the entry index, re-derived from the current index on every attempt.
#[derive(Debug, Clone)]
pub enum EntryChange {
    /// Commit a new image together with a new entry at the head of the index
    Create {
        image: ImagePath,
        bytes: Vec<u8>,
        /// `YYYY-MM-DD`
        date: String,
        title: String,
        link: String,
    },
    Update { id: u64, patch: EntryPatch },
    /// Remove the entry and its image
    Delete { id: u64 },
}

/// What [`AtomicCommitEngine::apply`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// The created or updated entry. `None` for deletes and for unknown ids.
    pub entry: Option<Entry>,
    /// The published commit, or `None` when nothing had to change.
    pub commit_sha: Option<String>,
}

impl CommitOutcome {
    fn unchanged(entry: Option<Entry>) -> Self {
        Self {
            entry,
            commit_sha: None,
        }
    }

    fn with_commit(mut self, sha: String) -> Self {
        self.commit_sha = Some(sha);
        self
    }

    pub fn is_committed(&self) -> bool {
        self.commit_sha.is_some()
    }
}

pub struct AtomicCommitEngine {
    content: Arc<dyn ContentRepository>,
    index_path: String,
    layout: ImageLayout,
    identity: CommitIdentity,
    max_attempts: u32,
}

impl AtomicCommitEngine {
    pub fn new(
        content: Arc<dyn ContentRepository>,
        index_path: impl Into<String>,
        layout: ImageLayout,
        identity: CommitIdentity,
        max_attempts: u32,
    ) -> Self {
        Self {
            content,
            index_path: index_path.into(),
            layout,
            identity,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn layout(&self) -> &ImageLayout {
        &self.layout
    }

    /// Reads the entry index at the current branch head.
    pub async fn read_entries(&self) -> Result<Vec<Entry>> {
        let head = self.content.head().await?;
        self.read_entries_at(&head.commit_sha).await
    }

    /// Reads the entry index as of `commit_sha`.
    ///
    /// A missing file is the bootstrap case. Empty or unparsable content also yields an empty
    /// collection so the wizard stays usable; transport failures still propagate.
    async fn read_entries_at(&self, commit_sha: &str) -> Result<Vec<Entry>> {
        let Some(bytes) = self.content.read_file(&self.index_path, commit_sha).await? else {
            tracing::info!(path = %self.index_path, "[CommitEngine] index not found, starting empty");
            return Ok(Vec::new());
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            tracing::warn!(path = %self.index_path, "[CommitEngine] index is empty");
            return Ok(Vec::new());
        }
        match decode_entries(&bytes) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!(
                    path = %self.index_path,
                    error = %e,
                    "[CommitEngine] index is unparsable, treating as empty"
                );
                Ok(Vec::new())
            }
        }
    }

    /// Applies `change`, retrying from a fresh read when the branch moved concurrently.
    pub async fn apply(&self, change: &EntryChange) -> Result<CommitOutcome> {
        let mut attempt = 1;
        loop {
            match self.apply_once(change).await {
                Err(e) if e.is_conflict() && attempt < self.max_attempts => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        "[CommitEngine] branch moved during commit, retrying"
                    );
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn apply_once(&self, change: &EntryChange) -> Result<CommitOutcome> {
        // The index is read at the head commit itself, so the new commit's parent is exactly
        // the state it was derived from; a concurrent writer fails the fast-forward.
        let head = self.content.head().await?;
        let entries = self.read_entries_at(&head.commit_sha).await?;

        match change {
            EntryChange::Create {
                image,
                bytes,
                date,
                title,
                link,
            } => {
                if let Some(existing) = find_by_image_path(&entries, &image.site_path) {
                    tracing::info!(
                        entry_id = existing.id,
                        image_path = %image.site_path,
                        "[CommitEngine] image already recorded, skipping commit"
                    );
                    return Ok(CommitOutcome::unchanged(Some(existing.clone())));
                }

                let entry = Entry {
                    id: compute_next_id(&entries),
                    image_path: image.site_path.clone(),
                    title: title.clone(),
                    date: date.clone(),
                    link: link.clone(),
                };
                let entries = insert_at_head(entries, entry.clone());
                let message = format!("Add entry #{}: {}", entry.id, display_title(&entry));
                let sha = self
                    .commit_upload(&head, &image.repo_path, bytes.clone(), &entries, message)
                    .await?;
                Ok(CommitOutcome {
                    entry: Some(entry),
                    commit_sha: Some(sha),
                })
            }
            EntryChange::Update { id, patch } => {
                if !entries.iter().any(|e| e.id == *id) {
                    tracing::warn!(entry_id = id, "[CommitEngine] update of unknown entry");
                    return Ok(CommitOutcome::unchanged(None));
                }
                let entries = update_by_id(entries, *id, patch);
                let entry = entries.iter().find(|e| e.id == *id).cloned();
                let message = format!("Update {} of entry #{}", patch.field, id);
                let sha = self.commit_index(&head, &entries, message).await?;
                Ok(CommitOutcome {
                    entry,
                    commit_sha: Some(sha),
                })
            }
            EntryChange::Delete { id } => {
                let Some(site_path) = find_image_path_by_id(&entries, *id).map(str::to_string)
                else {
                    tracing::info!(entry_id = id, "[CommitEngine] entry already absent");
                    return Ok(CommitOutcome::unchanged(None));
                };
                let repo_path = self.layout.repo_path_for_site_path(&site_path);
                if repo_path.is_none() {
                    tracing::warn!(
                        entry_id = id,
                        image_path = %site_path,
                        "[CommitEngine] image path outside the configured layout, removing index entry only"
                    );
                }
                let entries = delete_by_id(entries, *id);
                let message = format!("Delete entry #{id}");
                let sha = self
                    .commit_delete(&head, repo_path.as_deref(), &entries, message)
                    .await?;
                Ok(CommitOutcome::unchanged(None).with_commit(sha))
            }
        }
    }

    /// Image plus index in one commit layered on the head tree.
    pub async fn commit_upload(
        &self,
        head: &HeadRef,
        image_path: &str,
        image: Vec<u8>,
        entries: &[Entry],
        message: impl Into<String>,
    ) -> Result<String> {
        let changes = TreeChangeSet::new(message)
            .upsert(image_path, image)
            .upsert(&self.index_path, encode_entries(entries)?);
        self.execute(head, &changes).await
    }

    /// Index-only commit, used by edits.
    pub async fn commit_index(
        &self,
        head: &HeadRef,
        entries: &[Entry],
        message: impl Into<String>,
    ) -> Result<String> {
        let changes = TreeChangeSet::new(message).upsert(&self.index_path, encode_entries(entries)?);
        self.execute(head, &changes).await
    }

    /// Removes `image_path` (if given) and rewrites the index in one commit.
    pub async fn commit_delete(
        &self,
        head: &HeadRef,
        image_path: Option<&str>,
        entries: &[Entry],
        message: impl Into<String>,
    ) -> Result<String> {
        let mut changes = TreeChangeSet::new(message);
        if let Some(path) = image_path {
            changes = changes.remove(path);
        }
        let changes = changes.upsert(&self.index_path, encode_entries(entries)?);
        self.execute(head, &changes).await
    }

    /// Writes `changes` as exactly one commit on top of `head` and fast-forwards the branch.
    ///
    /// Upserts are layered onto the head tree. Any removal forces a full rebuild from the
    /// recursive listing, because a base tree can only be added to.
    pub async fn execute(&self, head: &HeadRef, changes: &TreeChangeSet) -> Result<String> {
        if changes.is_empty() {
            return Err(PicpostError::internal("refusing to commit an empty change set"));
        }

        let mut upserts = Vec::new();
        let mut removed = HashSet::new();
        for change in &changes.changes {
            match change {
                TreeChange::Upsert { path, content } => {
                    let sha = self.content.create_blob(content).await?;
                    upserts.push(TreeEntry::blob(path.clone(), sha));
                }
                TreeChange::Remove { path } => {
                    removed.insert(path.as_str());
                }
            }
        }

        let tree_sha = if changes.requires_full_tree() {
            let listing = self.content.read_tree_recursive(&head.tree_sha).await?;
            for path in &removed {
                if !listing.iter().any(|e| e.path == *path) {
                    tracing::info!(path = %path, "[CommitEngine] path to remove is already absent");
                }
            }
            let mut entries: Vec<TreeEntry> = listing
                .into_iter()
                .filter(|e| !removed.contains(e.path.as_str()))
                .filter(|e| !upserts.iter().any(|u| u.path == e.path))
                .collect();
            entries.extend(upserts);
            self.content.create_tree(None, &entries).await?
        } else {
            self.content
                .create_tree(Some(&head.tree_sha), &upserts)
                .await?
        };

        let commit_sha = self
            .content
            .create_commit(&changes.message, &tree_sha, &head.commit_sha, &self.identity)
            .await?;
        self.content.update_ref(&commit_sha).await?;

        tracing::info!(
            commit = %commit_sha,
            paths = changes.changes.len(),
            "[CommitEngine] published: {}",
            changes.message
        );
        Ok(commit_sha)
    }
}

fn display_title(entry: &Entry) -> &str {
    if entry.title.is_empty() {
        "(untitled)"
    } else {
        &entry.title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use picpost_core::entry::EntryField;
    use picpost_core::error::CommitStep;
    use picpost_infrastructure::InMemoryContentRepository;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const INDEX: &str = "data/entries.json";

    fn engine(repo: Arc<dyn ContentRepository>) -> AtomicCommitEngine {
        AtomicCommitEngine::new(
            repo,
            INDEX,
            ImageLayout::new("images", ""),
            CommitIdentity::default(),
            3,
        )
    }

    fn entry(id: u64, image_path: &str) -> Entry {
        Entry {
            id,
            image_path: image_path.to_string(),
            title: format!("Title {id}"),
            date: "2024-01-01".to_string(),
            link: String::new(),
        }
    }

    fn create(site_path: &str) -> EntryChange {
        EntryChange::Create {
            image: ImagePath {
                repo_path: format!("images/{site_path}"),
                site_path: site_path.to_string(),
            },
            bytes: b"png".to_vec(),
            date: "2024-12-25".to_string(),
            title: "Launch".to_string(),
            link: String::new(),
        }
    }

    async fn seeded(entries: &[Entry], files: &[(&str, &[u8])]) -> Arc<InMemoryContentRepository> {
        let repo = Arc::new(InMemoryContentRepository::new());
        let index = encode_entries(entries).unwrap();
        let mut all: Vec<(&str, &[u8])> = vec![(INDEX, index.as_slice())];
        all.extend_from_slice(files);
        repo.commit_files("seed", &all).await;
        repo
    }

    #[tokio::test]
    async fn test_read_entries_bootstraps_and_tolerates_garbage() {
        let repo = Arc::new(InMemoryContentRepository::new());
        let engine = engine(repo.clone());
        assert!(engine.read_entries().await.unwrap().is_empty());

        repo.commit_files("blank", &[(INDEX, b"  \n")]).await;
        assert!(engine.read_entries().await.unwrap().is_empty());

        repo.commit_files("corrupt", &[(INDEX, b"{not json")]).await;
        assert!(engine.read_entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_commits_image_and_index_together() {
        let repo = seeded(&[entry(4, "2024/01/a.png")], &[("images/2024/01/a.png", b"a")]).await;
        let engine = engine(repo.clone());

        let outcome = engine.apply(&create("2024/12/t1-cat.png")).await.unwrap();
        assert!(outcome.is_committed());
        assert_eq!(outcome.entry.as_ref().map(|e| e.id), Some(5));

        assert_eq!(repo.log().await.len(), 3);
        assert_eq!(
            repo.file("images/2024/12/t1-cat.png").await,
            Some(b"png".to_vec())
        );
        let entries = engine.read_entries().await.unwrap();
        assert_eq!(entries.iter().map(|e| e.id).collect::<Vec<_>>(), vec![5, 4]);
        assert_eq!(entries[0].date, "2024-12-25");
    }

    #[tokio::test]
    async fn test_create_is_idempotent_per_image_path() {
        let repo = seeded(&[], &[]).await;
        let engine = engine(repo.clone());

        let first = engine.apply(&create("2024/12/t1-cat.png")).await.unwrap();
        let second = engine.apply(&create("2024/12/t1-cat.png")).await.unwrap();

        assert!(!second.is_committed());
        assert_eq!(first.entry, second.entry);
        assert_eq!(engine.read_entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_touches_index_only() {
        let repo = seeded(&[entry(1, "2024/01/a.png")], &[("images/2024/01/a.png", b"a")]).await;
        let engine = engine(repo.clone());

        let outcome = engine
            .apply(&EntryChange::Update {
                id: 1,
                patch: EntryPatch::new(EntryField::Title, "Renamed"),
            })
            .await
            .unwrap();
        assert_eq!(outcome.entry.map(|e| e.title), Some("Renamed".to_string()));
        assert_eq!(repo.paths().await, vec![INDEX, "images/2024/01/a.png"]);

        let missing = engine
            .apply(&EntryChange::Update {
                id: 99,
                patch: EntryPatch::new(EntryField::Title, "x"),
            })
            .await
            .unwrap();
        assert_eq!(missing, CommitOutcome::unchanged(None));
    }

    #[tokio::test]
    async fn test_delete_removes_blob_and_entry() {
        let repo = seeded(
            &[entry(7, "2024/01/x.webp"), entry(6, "2024/01/y.webp")],
            &[("images/2024/01/x.webp", b"x"), ("images/2024/01/y.webp", b"y")],
        )
        .await;
        let engine = engine(repo.clone());

        let outcome = engine.apply(&EntryChange::Delete { id: 7 }).await.unwrap();
        assert!(outcome.is_committed());
        assert_eq!(repo.paths().await, vec![INDEX, "images/2024/01/y.webp"]);
        let ids: Vec<u64> = engine.read_entries().await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![6]);

        // Second delete of the same id changes nothing
        let again = engine.apply(&EntryChange::Delete { id: 7 }).await.unwrap();
        assert!(!again.is_committed());
    }

    #[tokio::test]
    async fn test_delete_with_absent_blob_still_updates_index() {
        let repo = seeded(&[entry(7, "2024/01/x.webp")], &[]).await;
        let engine = engine(repo.clone());

        engine.apply(&EntryChange::Delete { id: 7 }).await.unwrap();
        assert!(engine.read_entries().await.unwrap().is_empty());
        assert_eq!(repo.paths().await, vec![INDEX]);
    }

    /// Moves the branch once right before the first ref update.
    struct RacingRepository {
        inner: Arc<InMemoryContentRepository>,
        races: AtomicUsize,
    }

    #[async_trait]
    impl ContentRepository for RacingRepository {
        async fn read_file(&self, path: &str, commit_sha: &str) -> Result<Option<Vec<u8>>> {
            self.inner.read_file(path, commit_sha).await
        }
        async fn head(&self) -> Result<HeadRef> {
            self.inner.head().await
        }
        async fn create_blob(&self, content: &[u8]) -> Result<String> {
            self.inner.create_blob(content).await
        }
        async fn create_tree(&self, base: Option<&str>, entries: &[TreeEntry]) -> Result<String> {
            self.inner.create_tree(base, entries).await
        }
        async fn read_tree_recursive(&self, tree_sha: &str) -> Result<Vec<TreeEntry>> {
            self.inner.read_tree_recursive(tree_sha).await
        }
        async fn create_commit(
            &self,
            message: &str,
            tree_sha: &str,
            parent_sha: &str,
            identity: &CommitIdentity,
        ) -> Result<String> {
            self.inner
                .create_commit(message, tree_sha, parent_sha, identity)
                .await
        }
        async fn update_ref(&self, commit_sha: &str) -> Result<()> {
            let race = self
                .races
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if race {
                let other = encode_entries(&[entry(1, "2024/01/other.png")]).unwrap();
                self.inner
                    .commit_files("concurrent writer", &[(INDEX, other.as_slice())])
                    .await;
            }
            self.inner.update_ref(commit_sha).await
        }
        async fn delete_file(&self, path: &str, message: &str, identity: &CommitIdentity) -> Result<()> {
            self.inner.delete_file(path, message, identity).await
        }
    }

    #[tokio::test]
    async fn test_conflict_is_retried_from_fresh_index() {
        let inner = Arc::new(InMemoryContentRepository::new());
        let repo = Arc::new(RacingRepository {
            inner: inner.clone(),
            races: AtomicUsize::new(1),
        });
        let engine = engine(repo);

        let outcome = engine.apply(&create("2024/12/t1-cat.png")).await.unwrap();
        assert_eq!(outcome.entry.map(|e| e.id), Some(2));

        let ids: Vec<u64> = engine.read_entries().await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_conflict_gives_up_after_max_attempts() {
        let inner = Arc::new(InMemoryContentRepository::new());
        let repo = Arc::new(RacingRepository {
            inner: inner.clone(),
            races: AtomicUsize::new(10),
        });
        let engine = engine(repo);

        let err = engine.apply(&create("2024/12/t1-cat.png")).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(err.as_remote().map(|e| e.step), Some(CommitStep::UpdateRef));
        assert!(inner.file("images/2024/12/t1-cat.png").await.is_none());
    }

    /// Records which commit each head lookup and index read referred to.
    struct RecordingRepository {
        inner: Arc<InMemoryContentRepository>,
        heads: std::sync::Mutex<Vec<String>>,
        reads: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ContentRepository for RecordingRepository {
        async fn read_file(&self, path: &str, commit_sha: &str) -> Result<Option<Vec<u8>>> {
            self.reads.lock().unwrap().push(commit_sha.to_string());
            self.inner.read_file(path, commit_sha).await
        }
        async fn head(&self) -> Result<HeadRef> {
            let head = self.inner.head().await?;
            self.heads.lock().unwrap().push(head.commit_sha.clone());
            // Another writer lands right after the head was resolved
            let other = encode_entries(&[entry(9, "2024/01/other.png")]).unwrap();
            self.inner
                .commit_files("concurrent writer", &[(INDEX, other.as_slice())])
                .await;
            Ok(head)
        }
        async fn create_blob(&self, content: &[u8]) -> Result<String> {
            self.inner.create_blob(content).await
        }
        async fn create_tree(&self, base: Option<&str>, entries: &[TreeEntry]) -> Result<String> {
            self.inner.create_tree(base, entries).await
        }
        async fn read_tree_recursive(&self, tree_sha: &str) -> Result<Vec<TreeEntry>> {
            self.inner.read_tree_recursive(tree_sha).await
        }
        async fn create_commit(
            &self,
            message: &str,
            tree_sha: &str,
            parent_sha: &str,
            identity: &CommitIdentity,
        ) -> Result<String> {
            self.inner
                .create_commit(message, tree_sha, parent_sha, identity)
                .await
        }
        async fn update_ref(&self, commit_sha: &str) -> Result<()> {
            self.inner.update_ref(commit_sha).await
        }
        async fn delete_file(&self, path: &str, message: &str, identity: &CommitIdentity) -> Result<()> {
            self.inner.delete_file(path, message, identity).await
        }
    }

    #[tokio::test]
    async fn test_index_is_read_at_the_resolved_head() {
        let inner = seeded(&[entry(1, "2024/01/a.png")], &[]).await;
        let repo = Arc::new(RecordingRepository {
            inner: inner.clone(),
            heads: std::sync::Mutex::new(Vec::new()),
            reads: std::sync::Mutex::new(Vec::new()),
        });
        let engine = AtomicCommitEngine::new(
            repo.clone(),
            INDEX,
            ImageLayout::new("images", ""),
            CommitIdentity::default(),
            1,
        );

        // The index seen is the one at the resolved head, so the newer write is not
        // overwritten: the ref update is rejected instead.
        let err = engine.apply(&create("2024/12/t1-cat.png")).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(*repo.reads.lock().unwrap(), *repo.heads.lock().unwrap());

        let ids: Vec<u64> = inner
            .file(INDEX)
            .await
            .map(|bytes| decode_entries(&bytes).unwrap().iter().map(|e| e.id).collect())
            .unwrap_or_default();
        assert_eq!(ids, vec![9]);
    }
}
