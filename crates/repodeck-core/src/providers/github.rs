use std::path::PathBuf;

use repodeck_api::git;
use repodeck_api::github::{
    GitHubClient, GitHubError, GitHubIssue, GitHubPull, GitHubRepo, RepoScope,
};

use crate::fetch::RepoSource;
use crate::models::{GitState, Issue, PullRequest, RepoKey, Repository};
use crate::{Error, Result};

/// How many issues or pull requests to load when a repository is expanded.
const DETAIL_LIMIT: u32 = 50;

/// Listing page size; GitHub's maximum.
const LIST_PAGE: u32 = 100;

/// GitHub-backed repository source. Also answers local git questions by
/// probing `<code_dir>/<repo name>` on disk.
pub struct GitHubProvider {
    client: GitHubClient,
    scope: RepoScope,
    code_dir: Option<PathBuf>,
}

impl GitHubProvider {
    pub fn new(client: GitHubClient, scope: RepoScope, code_dir: Option<PathBuf>) -> Self {
        Self {
            client,
            scope,
            code_dir,
        }
    }
}

#[async_trait::async_trait]
impl RepoSource for GitHubProvider {
    async fn list_repositories(&self) -> Result<Vec<Repository>> {
        let repos = self
            .client
            .list_repos(&self.scope, LIST_PAGE)
            .await
            .map_err(api_error)?;

        Ok(repos.into_iter().map(github_to_repo).collect())
    }

    async fn fetch_repository(&self, key: &RepoKey) -> Result<Repository> {
        let repo = self
            .client
            .get_repo(&key.full_name())
            .await
            .map_err(api_error)?;

        Ok(github_to_repo(repo))
    }

    async fn count_open_issues(&self, key: &RepoKey) -> Result<u32> {
        self.client
            .count_open_issues(&key.full_name())
            .await
            .map_err(api_error)
    }

    async fn list_issues(&self, key: &RepoKey) -> Result<Vec<Issue>> {
        let issues = self
            .client
            .list_issues(&key.full_name(), DETAIL_LIMIT)
            .await
            .map_err(api_error)?;

        Ok(issues.into_iter().map(issue_from).collect())
    }

    async fn list_pull_requests(&self, key: &RepoKey) -> Result<Vec<PullRequest>> {
        let pulls = self
            .client
            .list_pulls(&key.full_name(), DETAIL_LIMIT)
            .await
            .map_err(api_error)?;

        Ok(pulls.into_iter().map(pull_from).collect())
    }

    async fn local_git_status(&self, name: &str) -> Result<GitState> {
        let Some(code_dir) = &self.code_dir else {
            return Ok(GitState::NotCloned);
        };

        let path = code_dir.join(name);
        if !path.exists() {
            return Ok(GitState::NotCloned);
        }

        match git::status(&path).await {
            Ok(None) => Ok(GitState::NotCloned),
            Ok(Some(summary)) if summary.dirty => Ok(GitState::Dirty {
                branch: summary.branch,
            }),
            Ok(Some(summary)) => Ok(GitState::Clean {
                branch: summary.branch,
            }),
            Err(e) => Err(Error::GitError(e.to_string())),
        }
    }
}

fn api_error(e: GitHubError) -> Error {
    match e {
        GitHubError::NotFound(what) => Error::NotFound(what),
        other => Error::ApiError(other.to_string()),
    }
}

/// A listing entry knows nothing about gates or local checkouts; those
/// start out unchecked and get filled in by enrichment.
fn github_to_repo(gh: GitHubRepo) -> Repository {
    let owner = gh.owner.map(|o| o.login).unwrap_or_else(|| {
        gh.full_name
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string()
    });

    Repository {
        key: RepoKey::new(owner, gh.name),
        url: gh.html_url,
        description: gh.description,
        language: gh.language,
        open_issues: gh.open_issues_count,
        gate: Default::default(),
        git: GitState::NotCloned,
        detail: Default::default(),
    }
}

fn issue_from(gh: GitHubIssue) -> Issue {
    Issue {
        number: gh.number,
        title: gh.title,
        url: gh.html_url,
        author: gh
            .user
            .map(|u| u.login)
            .unwrap_or_else(|| "unknown".to_string()),
        state: gh.state,
        labels: gh.labels.into_iter().map(|l| l.name).collect(),
        comments: gh.comments,
        body: gh.body,
        created_at: gh.created_at,
        updated_at: gh.updated_at,
    }
}

fn pull_from(gh: GitHubPull) -> PullRequest {
    PullRequest {
        number: gh.number,
        title: gh.title,
        url: gh.html_url,
        author: gh
            .user
            .map(|u| u.login)
            .unwrap_or_else(|| "unknown".to_string()),
        state: gh.state,
        draft: gh.draft,
        head_ref: gh.head.map(|b| b.ref_name),
        base_ref: gh.base.map(|b| b.ref_name),
        created_at: gh.created_at,
        updated_at: gh.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DetailState, GateState};

    fn sample_repo() -> GitHubRepo {
        serde_json::from_str(
            r#"{
                "id": 1,
                "name": "billing-api",
                "full_name": "acme/billing-api",
                "description": "Invoices and dunning",
                "html_url": "https://github.com/acme/billing-api",
                "default_branch": "main",
                "language": "Rust",
                "open_issues_count": 6,
                "owner": {"login": "acme"},
                "pushed_at": null,
                "updated_at": null
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn listing_entry_maps_to_unchecked_repository() {
        let repo = github_to_repo(sample_repo());

        assert_eq!(repo.key, RepoKey::new("acme", "billing-api"));
        assert_eq!(repo.url, "https://github.com/acme/billing-api");
        assert_eq!(repo.open_issues, 6);
        assert_eq!(repo.gate.state, GateState::Unknown);
        assert!(!repo.gate.checked);
        assert_eq!(repo.git, GitState::NotCloned);
        assert_eq!(repo.detail, DetailState::Unloaded);
    }

    #[test]
    fn owner_falls_back_to_full_name_prefix() {
        let mut gh = sample_repo();
        gh.owner = None;
        let repo = github_to_repo(gh);
        assert_eq!(repo.key.owner, "acme");
    }

    #[test]
    fn issue_mapping_flattens_author_and_labels() {
        let gh: GitHubIssue = serde_json::from_str(
            r#"{
                "number": 7,
                "title": "Crash on empty config",
                "html_url": "https://github.com/acme/billing-api/issues/7",
                "state": "open",
                "comments": 3,
                "user": {"login": "reporter"},
                "labels": [{"name": "bug"}, {"name": "P1"}],
                "created_at": "2024-05-01T09:00:00Z",
                "updated_at": "2024-05-02T09:00:00Z",
                "body": "Steps to reproduce..."
            }"#,
        )
        .unwrap();

        let issue = issue_from(gh);
        assert_eq!(issue.author, "reporter");
        assert_eq!(issue.labels, vec!["bug", "P1"]);
        assert_eq!(issue.comments, 3);
    }

    #[test]
    fn missing_author_becomes_unknown() {
        let gh: GitHubIssue = serde_json::from_str(
            r#"{
                "number": 9,
                "title": "Ghost issue",
                "html_url": "https://github.com/acme/billing-api/issues/9",
                "user": null,
                "created_at": "2024-05-01T09:00:00Z",
                "updated_at": "2024-05-01T09:00:00Z",
                "body": null
            }"#,
        )
        .unwrap();

        assert_eq!(issue_from(gh).author, "unknown");
    }

    #[test]
    fn pull_mapping_extracts_branch_refs() {
        let gh: GitHubPull = serde_json::from_str(
            r#"{
                "number": 12,
                "title": "Bump deps",
                "html_url": "https://github.com/acme/billing-api/pull/12",
                "state": "open",
                "draft": true,
                "user": {"login": "bot"},
                "head": {"ref": "chore/bump-deps"},
                "base": {"ref": "main"},
                "created_at": "2024-05-01T09:00:00Z",
                "updated_at": "2024-05-01T09:00:00Z"
            }"#,
        )
        .unwrap();

        let pull = pull_from(gh);
        assert!(pull.draft);
        assert_eq!(pull.head_ref.as_deref(), Some("chore/bump-deps"));
        assert_eq!(pull.base_ref.as_deref(), Some("main"));
    }

    #[tokio::test]
    async fn no_code_dir_means_nothing_is_cloned() {
        let provider = GitHubProvider::new(GitHubClient::new(None), RepoScope::Viewer, None);
        let state = provider.local_git_status("billing-api").await.unwrap();
        assert_eq!(state, GitState::NotCloned);
    }

    #[tokio::test]
    async fn missing_checkout_means_not_cloned() {
        let provider = GitHubProvider::new(
            GitHubClient::new(None),
            RepoScope::Viewer,
            Some(PathBuf::from("/definitely/not/a/code/dir")),
        );
        let state = provider.local_git_status("billing-api").await.unwrap();
        assert_eq!(state, GitState::NotCloned);
    }
}
