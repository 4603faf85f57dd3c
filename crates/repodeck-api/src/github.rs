use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retry::{with_retry, RetryConfig};

const GITHUB_API_BASE: &str = "https://api.github.com";

/// GitHub caps `per_page` at 100 for the endpoints we call.
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GitHubError>;

/// Whose repositories to enumerate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoScope {
    /// All repositories of an organization.
    Org(String),
    /// Public repositories of a named user.
    User(String),
    /// Repositories of the authenticated token holder, private ones included.
    Viewer,
}

impl RepoScope {
    fn repos_path(&self) -> String {
        match self {
            RepoScope::Org(org) => format!("/orgs/{}/repos", org),
            RepoScope::User(user) => format!("/users/{}/repos", user),
            RepoScope::Viewer => "/user/repos".to_string(),
        }
    }
}

pub struct GitHubClient {
    client: reqwest::Client,
    token: Option<String>,
    base_url: String,
    retry_config: RetryConfig,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Self {
        Self::with_base_url(token, GITHUB_API_BASE.to_string())
    }

    /// For GitHub Enterprise instances
    pub fn with_base_url(token: Option<String>, base_url: String) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("repodeck/0.1.0"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            token,
            base_url,
            retry_config: RetryConfig::default(),
        }
    }

    /// Create client with custom retry configuration
    pub fn with_retry_config(token: Option<String>, retry_config: RetryConfig) -> Self {
        let mut client = Self::new(token);
        client.retry_config = retry_config;
        client
    }

    /// List every repository in scope, following pagination until a short
    /// page signals the end.
    pub async fn list_repos(&self, scope: &RepoScope, per_page: u32) -> Result<Vec<GitHubRepo>> {
        let per_page = per_page.clamp(1, MAX_PAGE_SIZE);
        let mut all = Vec::new();
        let mut page = 1u32;

        loop {
            let batch = self.list_repos_page(scope, page, per_page).await?;
            let count = batch.len();
            all.extend(batch);

            if count < per_page as usize {
                break;
            }
            page += 1;
        }

        Ok(all)
    }

    async fn list_repos_page(
        &self,
        scope: &RepoScope,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<GitHubRepo>> {
        let url = format!("{}{}", self.base_url, scope.repos_path());
        let token = self.token.clone();
        let what = scope.repos_path();

        with_retry(&self.retry_config, || async {
            let mut request = self.client.get(&url).query(&[
                ("per_page", per_page.to_string().as_str()),
                ("page", page.to_string().as_str()),
                ("sort", "full_name"),
            ]);

            if matches!(scope, RepoScope::Viewer) {
                request = request.query(&[("affiliation", "owner,organization_member")]);
            }

            if let Some(ref token) = token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            let response = check_status(response, &what).await?;

            let repos: Vec<GitHubRepo> = response.json().await?;
            Ok(repos)
        })
        .await
    }

    /// Fetch a single repository by full name (e.g. "acme/billing-api").
    pub async fn get_repo(&self, full_name: &str) -> Result<GitHubRepo> {
        let url = format!("{}/repos/{}", self.base_url, full_name);
        let token = self.token.clone();

        with_retry(&self.retry_config, || async {
            let mut request = self.client.get(&url);

            if let Some(ref token) = token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            let response = check_status(response, full_name).await?;

            let repo: GitHubRepo = response.json().await?;
            Ok(repo)
        })
        .await
    }

    /// Count open issues via the search API.
    ///
    /// The `open_issues_count` field on the repository object lumps pull
    /// requests in with issues; `search/issues` with `type:issue` is the only
    /// way to get the real number without paging through everything.
    pub async fn count_open_issues(&self, full_name: &str) -> Result<u32> {
        let query = format!("repo:{} type:issue state:open", full_name);
        let url = format!(
            "{}/search/issues?q={}&per_page=1",
            self.base_url,
            urlencoding::encode(&query)
        );
        let token = self.token.clone();

        with_retry(&self.retry_config, || async {
            let mut request = self.client.get(&url);

            if let Some(ref token) = token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            let response = check_status(response, full_name).await?;

            let result: SearchTotal = response.json().await?;
            Ok(result.total_count)
        })
        .await
    }

    /// List open issues, newest first. GitHub's issues endpoint also returns
    /// pull requests; those entries are filtered out here.
    pub async fn list_issues(&self, full_name: &str, limit: u32) -> Result<Vec<GitHubIssue>> {
        let url = format!("{}/repos/{}/issues", self.base_url, full_name);
        let token = self.token.clone();

        let issues: Vec<GitHubIssue> = with_retry(&self.retry_config, || async {
            let mut request = self.client.get(&url).query(&[
                ("state", "open"),
                ("sort", "created"),
                ("direction", "desc"),
                ("per_page", limit.min(MAX_PAGE_SIZE).to_string().as_str()),
            ]);

            if let Some(ref token) = token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            let response = check_status(response, full_name).await?;

            let page: Vec<GitHubIssue> = response.json().await?;
            Ok::<_, GitHubError>(page)
        })
        .await?;

        Ok(issues.into_iter().filter(|i| !i.is_pull_request()).collect())
    }

    /// List open pull requests, newest first.
    pub async fn list_pulls(&self, full_name: &str, limit: u32) -> Result<Vec<GitHubPull>> {
        let url = format!("{}/repos/{}/pulls", self.base_url, full_name);
        let token = self.token.clone();

        with_retry(&self.retry_config, || async {
            let mut request = self.client.get(&url).query(&[
                ("state", "open"),
                ("sort", "created"),
                ("direction", "desc"),
                ("per_page", limit.min(MAX_PAGE_SIZE).to_string().as_str()),
            ]);

            if let Some(ref token) = token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            let response = check_status(response, full_name).await?;

            let pulls: Vec<GitHubPull> = response.json().await?;
            Ok(pulls)
        })
        .await
    }
}

/// Map non-success statuses to errors, passing the response through
/// otherwise. GitHub reports rate limiting as 403 as often as 429.
async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();

    if status == 404 {
        return Err(GitHubError::NotFound(what.to_string()));
    }
    if status == 401 {
        return Err(GitHubError::AuthRequired);
    }
    if status == 403 || status == 429 {
        return Err(GitHubError::RateLimitExceeded);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GitHubError::RequestFailed(format!(
            "Status {}: {}",
            status, body
        )));
    }

    Ok(response)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub default_branch: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub open_issues_count: u32,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub private: bool,
    pub pushed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub owner: Option<GitHubAccount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubAccount {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubLabel {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubIssue {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub comments: u32,
    pub user: Option<GitHubAccount>,
    #[serde(default)]
    pub labels: Vec<GitHubLabel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub body: Option<String>,
    /// Present (as a link object) when this "issue" is really a pull request.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl GitHubIssue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubPull {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub draft: bool,
    pub user: Option<GitHubAccount>,
    pub head: Option<GitHubBranchRef>,
    pub base: Option<GitHubBranchRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubBranchRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
}

#[derive(Debug, Deserialize)]
struct SearchTotal {
    total_count: u32,
}
