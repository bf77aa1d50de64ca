//! GitHubContentRepository - git data API implementation of the content repository.
//!
//! Uses the low-level blob/tree/commit/ref endpoints so several files can land in one commit,
//! and the contents endpoint for single-file reads and deletes.

use crate::dto::github::{
    CommitResponse, ContentResponse, CreateBlobRequest, CreateCommitRequest, CreateTreeRequest,
    DeleteFileRequest, RefResponse, ShaOnly, TreeItem, TreeResponse, UpdateRefRequest,
};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use picpost_core::config::ContentConfig;
use picpost_core::content::{CommitIdentity, ContentRepository, HeadRef, TreeEntry};
use picpost_core::error::{CommitStep, PicpostError, Result};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("picpost/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Content repository backed by a GitHub repository branch.
#[derive(Clone)]
pub struct GitHubContentRepository {
    client: Client,
    token: String,
    api_base: Url,
    owner: String,
    repo: String,
    branch: String,
}

impl GitHubContentRepository {
    /// Creates a client for `owner/repo` on `branch`.
    pub fn new(config: &ContentConfig, token: impl Into<String>) -> Result<Self> {
        let api_base = Url::parse(&config.api_base)
            .map_err(|e| PicpostError::config(format!("invalid content.api_base: {e}")))?;
        if api_base.cannot_be_a_base() {
            return Err(PicpostError::config("content.api_base must be an http(s) URL"));
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PicpostError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            token: token.into(),
            api_base,
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            branch: config.branch.clone(),
        })
    }

    /// Builds `{api_base}/repos/{owner}/{repo}/{segments...}` with each segment escaped.
    fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .push("repos")
                .push(&self.owner)
                .push(&self.repo)
                .extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("accept", "application/vnd.github+json")
            .header("x-github-api-version", API_VERSION)
    }

    async fn send(&self, step: CommitStep, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(|err| {
            tracing::warn!(step = %step, "[GitHub] request failed: {}", err);
            PicpostError::remote(step, None, format!("request failed: {err}"))
        })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read GitHub error body".to_string());
        tracing::warn!(step = %step, status = status.as_u16(), "[GitHub] non-success response");
        Err(PicpostError::remote(step, Some(status.as_u16()), body))
    }

    async fn parse<T: DeserializeOwned>(step: CommitStep, response: Response) -> Result<T> {
        response.json::<T>().await.map_err(|err| {
            PicpostError::remote(step, None, format!("failed to parse GitHub response: {err}"))
        })
    }

    fn decode_content(step: CommitStep, content: &ContentResponse) -> Result<Vec<u8>> {
        // GitHub wraps base64 payloads at 60 columns.
        let compact: String = content
            .content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        BASE64_STANDARD
            .decode(compact)
            .map_err(|err| PicpostError::remote(step, None, format!("invalid base64 content: {err}")))
    }

    /// `reference` is a branch name or a commit sha.
    async fn get_contents(
        &self,
        step: CommitStep,
        path: &str,
        reference: &str,
    ) -> Result<Option<ContentResponse>> {
        let mut url = self.url(std::iter::once("contents").chain(path.split('/')));
        url.query_pairs_mut().append_pair("ref", reference);

        let response = match self.send(step, self.request(Method::GET, url)).await {
            Ok(response) => response,
            Err(PicpostError::RemoteHost(err)) if err.status == Some(StatusCode::NOT_FOUND.as_u16()) => {
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        Ok(Some(Self::parse(step, response).await?))
    }
}

#[async_trait]
impl ContentRepository for GitHubContentRepository {
    async fn read_file(&self, path: &str, commit_sha: &str) -> Result<Option<Vec<u8>>> {
        let step = CommitStep::ReadFile;
        let Some(content) = self.get_contents(step, path, commit_sha).await? else {
            return Ok(None);
        };

        if content.encoding == "base64" {
            return Self::decode_content(step, &content).map(Some);
        }

        // Files above 1 MB come back without inline content; fetch the blob instead.
        let url = self.url(["git", "blobs", content.sha.as_str()]);
        let response = self.send(step, self.request(Method::GET, url)).await?;
        let blob: ContentResponse = Self::parse(step, response).await?;
        Self::decode_content(step, &blob).map(Some)
    }

    async fn head(&self) -> Result<HeadRef> {
        let step = CommitStep::ReadHead;
        let url = self.url(["git", "ref", "heads", self.branch.as_str()]);
        let response = self.send(step, self.request(Method::GET, url)).await?;
        let reference: RefResponse = Self::parse(step, response).await?;

        let url = self.url(["git", "commits", reference.object.sha.as_str()]);
        let response = self.send(step, self.request(Method::GET, url)).await?;
        let commit: CommitResponse = Self::parse(step, response).await?;

        Ok(HeadRef {
            commit_sha: commit.sha,
            tree_sha: commit.tree.sha,
        })
    }

    async fn create_blob(&self, content: &[u8]) -> Result<String> {
        let step = CommitStep::CreateBlob;
        let body = CreateBlobRequest {
            content: BASE64_STANDARD.encode(content),
            encoding: "base64",
        };
        let url = self.url(["git", "blobs"]);
        let response = self
            .send(step, self.request(Method::POST, url).json(&body))
            .await?;
        let blob: ShaOnly = Self::parse(step, response).await?;
        Ok(blob.sha)
    }

    async fn create_tree(&self, base_tree: Option<&str>, entries: &[TreeEntry]) -> Result<String> {
        let step = CommitStep::CreateTree;
        let body = CreateTreeRequest {
            base_tree,
            tree: entries,
        };
        let url = self.url(["git", "trees"]);
        let response = self
            .send(step, self.request(Method::POST, url).json(&body))
            .await?;
        let tree: ShaOnly = Self::parse(step, response).await?;
        Ok(tree.sha)
    }

    async fn read_tree_recursive(&self, tree_sha: &str) -> Result<Vec<TreeEntry>> {
        let step = CommitStep::ReadTree;
        let mut url = self.url(["git", "trees", tree_sha]);
        url.query_pairs_mut().append_pair("recursive", "1");
        let response = self.send(step, self.request(Method::GET, url)).await?;
        let tree: TreeResponse = Self::parse(step, response).await?;

        // Rebuilding from a partial listing would silently drop files.
        if tree.truncated {
            return Err(PicpostError::remote(
                step,
                None,
                format!("tree {} listing is truncated", tree.sha),
            ));
        }

        Ok(tree.tree.into_iter().filter_map(TreeItem::into_entry).collect())
    }

    async fn create_commit(
        &self,
        message: &str,
        tree_sha: &str,
        parent_sha: &str,
        identity: &CommitIdentity,
    ) -> Result<String> {
        let step = CommitStep::CreateCommit;
        let body = CreateCommitRequest {
            message,
            tree: tree_sha,
            parents: [parent_sha],
            author: identity,
            committer: identity,
        };
        let url = self.url(["git", "commits"]);
        let response = self
            .send(step, self.request(Method::POST, url).json(&body))
            .await?;
        let commit: ShaOnly = Self::parse(step, response).await?;
        Ok(commit.sha)
    }

    async fn update_ref(&self, commit_sha: &str) -> Result<()> {
        let step = CommitStep::UpdateRef;
        let body = UpdateRefRequest {
            sha: commit_sha,
            force: false,
        };
        let url = self.url(["git", "refs", "heads", self.branch.as_str()]);
        self.send(step, self.request(Method::PATCH, url).json(&body))
            .await?;
        Ok(())
    }

    async fn delete_file(&self, path: &str, message: &str, identity: &CommitIdentity) -> Result<()> {
        let step = CommitStep::DeleteFile;
        let Some(existing) = self.get_contents(step, path, &self.branch).await? else {
            tracing::info!(path = %path, "[GitHub] delete skipped, file already absent");
            return Ok(());
        };

        let body = DeleteFileRequest {
            message,
            sha: &existing.sha,
            branch: &self.branch,
            committer: identity,
        };
        let url = self.url(std::iter::once("contents").chain(path.split('/')));
        self.send(step, self.request(Method::DELETE, url).json(&body))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repository(api_base: &str) -> GitHubContentRepository {
        let config = ContentConfig {
            api_base: api_base.to_string(),
            owner: "acme".to_string(),
            repo: "site".to_string(),
            ..ContentConfig::default()
        };
        GitHubContentRepository::new(&config, "token").unwrap()
    }

    #[test]
    fn test_url_escapes_segments() {
        let repo = repository("https://api.github.com");
        let url = repo.url(std::iter::once("contents").chain("images/2024/01/a b.png".split('/')));
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/acme/site/contents/images/2024/01/a%20b.png"
        );
    }

    #[test]
    fn test_url_keeps_enterprise_prefix() {
        let repo = repository("https://ghe.example.com/api/v3/");
        let url = repo.url(["git", "trees"]);
        assert_eq!(
            url.as_str(),
            "https://ghe.example.com/api/v3/repos/acme/site/git/trees"
        );
    }

    #[test]
    fn test_invalid_api_base_is_config_error() {
        let config = ContentConfig {
            api_base: "not a url".to_string(),
            ..ContentConfig::default()
        };
        let err = GitHubContentRepository::new(&config, "token").err().unwrap();
        assert!(matches!(err, PicpostError::Config(_)));
    }

    #[test]
    fn test_decode_wrapped_base64() {
        let content = ContentResponse {
            sha: "s".to_string(),
            content: "W10K\n".to_string(),
            encoding: "base64".to_string(),
        };
        let bytes = GitHubContentRepository::decode_content(CommitStep::ReadFile, &content).unwrap();
        assert_eq!(bytes, b"[]\n");
    }
}
