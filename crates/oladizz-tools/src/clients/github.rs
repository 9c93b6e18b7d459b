//! GitHub REST client.
//!
//! Every call is made with the chat's own personal access token; the client
//! itself holds no credentials. Read-only calls also work without one.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use oladizz_core::{Scratch, fields};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use super::Http;
use crate::error::{ToolError, ToolResult};

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Repo {
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub language: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub default_branch: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Branch {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitPerson {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub date: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitInfo {
    pub author: CommitPerson,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
    pub commit: CommitInfo,
}

/// A commit as returned by the git database API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitCommit {
    pub sha: String,
    pub author: CommitPerson,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub html_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub login: String,
    pub html_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Gist {
    pub html_url: String,
    #[serde(default)]
    pub files: BTreeMap<String, Value>,
}

impl Gist {
    /// Name of the gist's first file.
    pub fn first_file(&self) -> &str {
        self.files.keys().next().map(String::as_str).unwrap_or("untitled")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage<T> {
    #[serde(default)]
    pub total_count: u64,
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
}

// =============================================================================
// Deep search query
// =============================================================================

/// Sort orders offered by the deep-search wizard.
pub const SORT_ORDERS: [&str; 4] = ["best-match", "stars", "forks", "updated"];

/// The criteria collected by the deep-search wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSearch {
    pub query: String,
    pub language: Option<String>,
    pub min_stars: Option<u64>,
    pub sort: String,
}

impl RepoSearch {
    /// Reads the collected criteria; `None` if the keywords are missing.
    pub fn from_scratch(scratch: &Scratch) -> Option<Self> {
        Some(Self {
            query: scratch.str(fields::QUERY)?.to_string(),
            language: scratch.str(fields::LANGUAGE).map(str::to_string),
            min_stars: scratch.u64(fields::MIN_STARS),
            sort: scratch.str(fields::SORT).unwrap_or("best-match").to_string(),
        })
    }

    /// The `q` parameter, e.g. `telegram bot language:rust stars:>=100`.
    pub fn q(&self) -> String {
        let mut q = self.query.clone();
        if let Some(language) = &self.language {
            q.push_str(&format!(" language:{language}"));
        }
        if let Some(stars) = self.min_stars {
            q.push_str(&format!(" stars:>={stars}"));
        }
        q
    }

    /// All query parameters of the search request.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("q", self.q())];
        if self.sort != "best-match" {
            params.push(("sort", self.sort.clone()));
            params.push(("order", "desc".to_string()));
        }
        params.push(("per_page", "10".to_string()));
        params
    }
}

// =============================================================================
// Client
// =============================================================================

/// GitHub REST API client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Http,
    base: String,
}

impl GitHubClient {
    pub fn new(http: Http, base: impl Into<String>) -> Self {
        Self {
            http,
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    /// An empty `token` sends the request unauthenticated.
    fn request(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        let request = self
            .http
            .client()
            .request(method, format!("{}{path}", self.base))
            .header("Accept", "application/vnd.github+json");
        if token.is_empty() {
            request
        } else {
            request.header("Authorization", format!("token {token}"))
        }
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ToolResult<T> {
        let response = self.http.send(request).await?;
        Ok(response.json().await?)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> ToolResult<T> {
        debug!(path, "GitHub GET");
        self.json(self.request(Method::GET, path, token).query(query))
            .await
    }

    pub async fn repo(&self, token: &str, owner: &str, repo: &str) -> ToolResult<Repo> {
        self.get(token, &format!("/repos/{owner}/{repo}"), &[]).await
    }

    pub async fn create_repo(&self, token: &str, name: &str, private: bool) -> ToolResult<Repo> {
        let body = json!({ "name": name, "private": private });
        self.json(self.request(Method::POST, "/user/repos", token).json(&body))
            .await
    }

    pub async fn branches(&self, token: &str, owner: &str, repo: &str) -> ToolResult<Vec<Branch>> {
        self.get(token, &format!("/repos/{owner}/{repo}/branches"), &[])
            .await
    }

    /// Returns `false` if the branch does not exist.
    pub async fn branch_exists(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> ToolResult<bool> {
        let path = format!("/repos/{owner}/{repo}/branches/{branch}");
        match self.get::<Branch>(token, &path, &[]).await {
            Ok(_) => Ok(true),
            Err(ToolError::Http { status: 404, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Creates `branch` at the head of the default branch.
    pub async fn create_branch(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> ToolResult<()> {
        let info = self.repo(token, owner, repo).await?;
        let base = info.default_branch.as_deref().unwrap_or("main");
        let head: GitRef = self
            .get(token, &format!("/repos/{owner}/{repo}/git/ref/heads/{base}"), &[])
            .await?;
        let body = json!({ "ref": format!("refs/heads/{branch}"), "sha": head.object.sha });
        let path = format!("/repos/{owner}/{repo}/git/refs");
        self.json::<Value>(self.request(Method::POST, &path, token).json(&body))
            .await
            .map(drop)
    }

    /// Creates a file on `branch`.
    #[allow(clippy::too_many_arguments)]
    pub async fn put_file(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        branch: &str,
        path: &str,
        content: &[u8],
        message: &str,
    ) -> ToolResult<()> {
        let body = PutContents {
            message,
            content: STANDARD.encode(content),
            branch,
        };
        let url = format!("/repos/{owner}/{repo}/contents/{}", path.trim_start_matches('/'));
        self.json::<Value>(self.request(Method::PUT, &url, token).json(&body))
            .await
            .map(drop)
    }

    pub async fn commits(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> ToolResult<Vec<CommitSummary>> {
        self.get(
            token,
            &format!("/repos/{owner}/{repo}/commits"),
            &[("sha", branch.to_string()), ("per_page", "5".to_string())],
        )
        .await
    }

    pub async fn git_commit(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> ToolResult<GitCommit> {
        self.get(token, &format!("/repos/{owner}/{repo}/git/commits/{sha}"), &[])
            .await
    }

    pub async fn create_issue(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        title: &str,
        body: &str,
    ) -> ToolResult<Issue> {
        let path = format!("/repos/{owner}/{repo}/issues");
        let payload = json!({ "title": title, "body": body });
        self.json(self.request(Method::POST, &path, token).json(&payload))
            .await
    }

    pub async fn search_repos(&self, token: &str, query: &str) -> ToolResult<SearchPage<Repo>> {
        self.get(
            token,
            "/search/repositories",
            &[("q", query.to_string()), ("per_page", "5".to_string())],
        )
        .await
    }

    pub async fn deep_search(&self, token: &str, search: &RepoSearch) -> ToolResult<SearchPage<Repo>> {
        self.get(token, "/search/repositories", &search.params()).await
    }

    pub async fn search_users(&self, token: &str, query: &str) -> ToolResult<SearchPage<User>> {
        self.get(
            token,
            "/search/users",
            &[("q", query.to_string()), ("per_page", "5".to_string())],
        )
        .await
    }

    pub async fn gists(&self, token: &str, user: &str) -> ToolResult<Vec<Gist>> {
        self.get(
            token,
            &format!("/users/{user}/gists"),
            &[("per_page", "5".to_string())],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::testing::FakeServer;
    use oladizz_core::Document;

    fn scratch(value: Value) -> Scratch {
        let doc: Document = value.as_object().cloned().unwrap_or_default();
        Scratch::new(doc)
    }

    #[test]
    fn test_deep_search_params() {
        let search = RepoSearch::from_scratch(&scratch(json!({
            "query": "foo", "minStars": 100, "sort": "stars"
        })))
        .unwrap();
        assert_eq!(search.language, None);
        assert_eq!(
            search.params(),
            vec![
                ("q", "foo stars:>=100".to_string()),
                ("sort", "stars".to_string()),
                ("order", "desc".to_string()),
                ("per_page", "10".to_string()),
            ]
        );
    }

    #[test]
    fn test_best_match_has_no_sort() {
        let search = RepoSearch::from_scratch(&scratch(json!({
            "query": "telegram bot", "language": "rust", "sort": "best-match"
        })))
        .unwrap();
        assert_eq!(
            search.params(),
            vec![
                ("q", "telegram bot language:rust".to_string()),
                ("per_page", "10".to_string()),
            ]
        );
        assert!(RepoSearch::from_scratch(&scratch(json!({}))).is_none());
    }

    async fn client(server: &FakeServer) -> GitHubClient {
        let settings = server.settings();
        GitHubClient::new(Http::new(&settings).unwrap(), settings.endpoints.github_api)
    }

    #[tokio::test]
    async fn test_repo_sends_token() {
        let server = FakeServer::start().await;
        server.route(
            "GET /repos/octo/hello",
            200,
            r#"{"full_name":"octo/hello","stargazers_count":3,"forks_count":1,"html_url":"https://github.com/octo/hello"}"#,
        );
        let repo = client(&server).await.repo("pat", "octo", "hello").await.unwrap();
        assert_eq!(repo.full_name, "octo/hello");
        assert_eq!(repo.description, None);
        assert_eq!(server.seen()[0].headers["authorization"], "token pat");
    }

    #[tokio::test]
    async fn test_missing_branch_is_false() {
        let server = FakeServer::start().await;
        server.route("GET /repos/o/r/branches/main", 200, r#"{"name":"main"}"#);
        let gh = client(&server).await;
        assert!(gh.branch_exists("t", "o", "r", "main").await.unwrap());
        assert!(!gh.branch_exists("t", "o", "r", "dev").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_branch_from_default_head() {
        let server = FakeServer::start().await;
        server
            .route(
                "GET /repos/o/r",
                200,
                r#"{"full_name":"o/r","html_url":"u","default_branch":"trunk"}"#,
            )
            .route("GET /repos/o/r/git/ref/heads/trunk", 200, r#"{"object":{"sha":"abc"}}"#)
            .route("POST /repos/o/r/git/refs", 201, "{}");
        client(&server).await.create_branch("t", "o", "r", "dev").await.unwrap();

        let seen = server.seen();
        let body: Value = serde_json::from_str(&seen[2].body).unwrap();
        assert_eq!(body, json!({ "ref": "refs/heads/dev", "sha": "abc" }));
    }

    #[tokio::test]
    async fn test_put_file_encodes_content() {
        let server = FakeServer::start().await;
        server.route("PUT /repos/o/r/contents/docs/a.txt", 201, "{}");
        client(&server)
            .await
            .put_file("t", "o", "r", "dev", "/docs/a.txt", b"hi", "feat: upload a.txt")
            .await
            .unwrap();
        let body: Value = serde_json::from_str(&server.seen()[0].body).unwrap();
        assert_eq!(body["content"], "aGk=");
        assert_eq!(body["branch"], "dev");
    }
}
