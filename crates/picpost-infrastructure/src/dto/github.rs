//! GitHub REST API request and response bodies (git data + contents endpoints).

use picpost_core::content::{CommitIdentity, TreeEntry, TreeEntryKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RefResponse {
    pub object: RefObject,
}

#[derive(Debug, Deserialize)]
pub struct RefObject {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct CommitResponse {
    pub sha: String,
    pub tree: ShaOnly,
}

#[derive(Debug, Deserialize)]
pub struct ShaOnly {
    pub sha: String,
}

/// `GET /contents/{path}` and `GET /git/blobs/{sha}` share this shape.
#[derive(Debug, Deserialize)]
pub struct ContentResponse {
    pub sha: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub encoding: String,
}

#[derive(Debug, Serialize)]
pub struct CreateBlobRequest {
    pub content: String,
    pub encoding: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CreateTreeRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_tree: Option<&'a str>,
    pub tree: &'a [TreeEntry],
}

#[derive(Debug, Deserialize)]
pub struct TreeResponse {
    pub sha: String,
    pub tree: Vec<TreeItem>,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Deserialize)]
pub struct TreeItem {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: String,
}

impl TreeItem {
    /// Converts a listing row; directory rows are dropped since their contents are listed.
    pub fn into_entry(self) -> Option<TreeEntry> {
        let kind = match self.kind.as_str() {
            "blob" => TreeEntryKind::Blob,
            "commit" => TreeEntryKind::Commit,
            _ => return None,
        };
        Some(TreeEntry {
            path: self.path,
            mode: self.mode,
            kind,
            sha: self.sha,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CreateCommitRequest<'a> {
    pub message: &'a str,
    pub tree: &'a str,
    pub parents: [&'a str; 1],
    pub author: &'a CommitIdentity,
    pub committer: &'a CommitIdentity,
}

#[derive(Debug, Serialize)]
pub struct UpdateRefRequest<'a> {
    pub sha: &'a str,
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteFileRequest<'a> {
    pub message: &'a str,
    pub sha: &'a str,
    pub branch: &'a str,
    pub committer: &'a CommitIdentity,
}
