// The fetch pipeline: one paginated listing call, then batched per-repo
// enrichment (issue counts, local git state, optionally quality gates),
// merged in listing order with incremental progress snapshots.
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::filter::FilterRules;
use crate::models::{
    DetailState, GitState, Issue, PullRequest, QualityGate, RepoDetail, RepoKey, Repository,
};
use crate::Result;

/// Where repository data comes from. One implementation wraps the GitHub
/// client; tests substitute mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RepoSource: Send + Sync {
    /// Base listing for the scope the provider was built with.
    async fn list_repositories(&self) -> Result<Vec<Repository>>;
    async fn fetch_repository(&self, key: &RepoKey) -> Result<Repository>;
    async fn count_open_issues(&self, key: &RepoKey) -> Result<u32>;
    async fn list_issues(&self, key: &RepoKey) -> Result<Vec<Issue>>;
    async fn list_pull_requests(&self, key: &RepoKey) -> Result<Vec<PullRequest>>;
    async fn local_git_status(&self, name: &str) -> Result<GitState>;
}

/// Where quality-gate verdicts come from. `Ok(None)` means the service has
/// no project under that key, which is the common case.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait QualitySource: Send + Sync {
    async fn gate_status(&self, project_key: &str) -> Result<Option<QualityGate>>;
}

/// One incremental snapshot of an in-progress full fetch. `repos` is the
/// whole merged prefix so far, not just the latest batch.
#[derive(Debug, Clone)]
pub struct FetchProgress {
    pub repos: Vec<Repository>,
    pub done: usize,
    pub total: usize,
}

/// Final result of a full fetch. Per-repo failures degrade that repository
/// and land here as warning lines; they never abort the fetch.
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub repos: Vec<Repository>,
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct FetchCoordinator {
    repos: Arc<dyn RepoSource>,
    quality: Arc<dyn QualitySource>,
    filter: FilterRules,
    sonar_org: Option<String>,
    batch_size: usize,
}

impl FetchCoordinator {
    pub fn new(
        repos: Arc<dyn RepoSource>,
        quality: Arc<dyn QualitySource>,
        filter: FilterRules,
        sonar_org: Option<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            repos,
            quality,
            filter,
            sonar_org,
            batch_size: batch_size.max(1),
        }
    }

    /// Fetch everything. Only a failure of the base listing aborts; after
    /// that, every per-repo problem degrades that one repository and adds a
    /// warning line. A `FetchProgress` snapshot goes out after each batch.
    pub async fn fetch_all(
        &self,
        check_quality: bool,
        progress: mpsc::Sender<FetchProgress>,
    ) -> Result<FetchReport> {
        let listed = self.repos.list_repositories().await?;
        let kept = self.filter.apply(listed);
        let total = kept.len();
        info!(
            "enriching {} repositories in batches of {}",
            total, self.batch_size
        );

        let mut repos: Vec<Repository> = Vec::with_capacity(total);
        let mut warnings = Vec::new();
        let mut pending = kept.into_iter();

        loop {
            let batch: Vec<Repository> = pending.by_ref().take(self.batch_size).collect();
            if batch.is_empty() {
                break;
            }

            let enriched = join_all(
                batch
                    .into_iter()
                    .map(|repo| self.enrich(repo, check_quality)),
            )
            .await;

            for (repo, mut repo_warnings) in enriched {
                warnings.append(&mut repo_warnings);
                repos.push(repo);
            }

            let _ = progress
                .send(FetchProgress {
                    repos: repos.clone(),
                    done: repos.len(),
                    total,
                })
                .await;
        }

        if !warnings.is_empty() {
            warn!("fetch finished with {} warnings", warnings.len());
        }
        Ok(FetchReport { repos, warnings })
    }

    /// Re-fetch one repository's summary. With `want_detail`, issues and
    /// pull requests are loaded eagerly so an expanded row stays populated.
    pub async fn fetch_single(
        &self,
        key: &RepoKey,
        check_quality: bool,
        want_detail: bool,
    ) -> Result<(Repository, Vec<String>)> {
        let listed = self.repos.fetch_repository(key).await?;
        let (mut repo, mut warnings) = self.enrich(listed, check_quality).await;

        if want_detail {
            match self.fetch_detail(key).await {
                Ok(detail) => repo.detail = DetailState::Loaded(detail),
                Err(e) => warnings.push(format!("detail for {}: {}", key, e)),
            }
        }

        Ok((repo, warnings))
    }

    /// Issues and pull requests for one repository, fetched together.
    pub async fn fetch_detail(&self, key: &RepoKey) -> Result<RepoDetail> {
        let (pulls, issues) = futures::join!(
            self.repos.list_pull_requests(key),
            self.repos.list_issues(key)
        );
        Ok(RepoDetail {
            pulls: pulls?,
            issues: issues?,
        })
    }

    /// On-demand quality-gate lookup for one repository.
    pub async fn fetch_quality(&self, key: &RepoKey) -> Result<QualityGate> {
        self.quality_for(key).await
    }

    /// Quality-gate sweep over many repositories, batched like `fetch_all`.
    /// Each verdict is sent as soon as its batch completes; failures become
    /// warning lines in the return value.
    pub async fn fetch_quality_all(
        &self,
        keys: Vec<RepoKey>,
        results: mpsc::Sender<(RepoKey, QualityGate)>,
    ) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut pending = keys.into_iter();

        loop {
            let batch: Vec<RepoKey> = pending.by_ref().take(self.batch_size).collect();
            if batch.is_empty() {
                break;
            }

            let lookups: Vec<_> = batch
                .into_iter()
                .map(|key| {
                    let coordinator = self;
                    async move {
                        let outcome = coordinator.quality_for(&key).await;
                        (key, outcome)
                    }
                })
                .collect();

            for (key, outcome) in join_all(lookups).await {
                match outcome {
                    Ok(gate) => {
                        let _ = results.send((key, gate)).await;
                    }
                    Err(e) => warnings.push(format!("quality gate for {}: {}", key, e)),
                }
            }
        }

        warnings
    }

    async fn enrich(&self, mut repo: Repository, check_quality: bool) -> (Repository, Vec<String>) {
        let mut warnings = Vec::new();

        match self.repos.count_open_issues(&repo.key).await {
            Ok(count) => repo.open_issues = count,
            Err(e) => {
                debug!("issue count for {} failed: {}", repo.key, e);
                warnings.push(format!("issue count for {}: {}", repo.key, e));
            }
        }

        match self.repos.local_git_status(&repo.key.name).await {
            Ok(state) => repo.git = state,
            Err(e) => {
                repo.git = GitState::NotCloned;
                warnings.push(format!("git status for {}: {}", repo.key, e));
            }
        }

        if check_quality {
            match self.quality_for(&repo.key).await {
                Ok(gate) => repo.gate = gate,
                Err(e) => warnings.push(format!("quality gate for {}: {}", repo.key, e)),
            }
        }

        (repo, warnings)
    }

    /// First candidate key with a project wins. No match at all is a valid
    /// answer: Unknown, but checked.
    async fn quality_for(&self, key: &RepoKey) -> Result<QualityGate> {
        for candidate in guess_project_keys(key, self.sonar_org.as_deref()) {
            if let Some(gate) = self.quality.gate_status(&candidate).await? {
                return Ok(gate);
            }
        }
        Ok(QualityGate::checked_unknown())
    }
}

/// Candidate quality-service project keys for a repository, most likely
/// first: `owner_repo`, the bare repo name, the underscored variant, then
/// the configured organization's `org_repo` and `org:repo` forms.
pub fn guess_project_keys(key: &RepoKey, org: Option<&str>) -> Vec<String> {
    let mut candidates = vec![
        format!("{}_{}", key.owner, key.name),
        key.name.clone(),
        format!(
            "{}_{}",
            key.owner.replace('-', "_"),
            key.name.replace('-', "_")
        ),
    ];

    if let Some(org) = org {
        candidates.push(format!("{}_{}", org, key.name));
        candidates.push(format!("{}:{}", org, key.name));
    }

    let mut unique = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !unique.contains(&candidate) {
            unique.push(candidate);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GateState;
    use crate::Error;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn listed(name: &str) -> Repository {
        Repository {
            key: RepoKey::new("acme", name),
            url: format!("https://github.com/acme/{}", name),
            description: None,
            language: None,
            open_issues: 0,
            gate: QualityGate::unchecked(),
            git: GitState::NotCloned,
            detail: DetailState::Unloaded,
        }
    }

    fn names(repos: &[Repository]) -> Vec<&str> {
        repos.iter().map(|r| r.key.name.as_str()).collect()
    }

    fn failed_gate() -> QualityGate {
        QualityGate {
            state: GateState::Failed,
            conditions: Vec::new(),
            checked: true,
        }
    }

    /// QualitySource fake with canned responses and a call log, for tests
    /// that care about which candidate keys were tried and in what order.
    struct ScriptedQuality {
        responses: HashMap<String, QualityGate>,
        errors: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedQuality {
        fn new(responses: HashMap<String, QualityGate>) -> Self {
            Self {
                responses,
                errors: Vec::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl QualitySource for ScriptedQuality {
        async fn gate_status(&self, project_key: &str) -> Result<Option<QualityGate>> {
            self.calls.lock().unwrap().push(project_key.to_string());
            if self.errors.iter().any(|e| e == project_key) {
                return Err(Error::QualityError("service unavailable".into()));
            }
            Ok(self.responses.get(project_key).cloned())
        }
    }

    fn coordinator(
        repos: MockRepoSource,
        quality: Arc<dyn QualitySource>,
        filter: FilterRules,
        batch_size: usize,
    ) -> FetchCoordinator {
        FetchCoordinator::new(Arc::new(repos), quality, filter, None, batch_size)
    }

    #[tokio::test]
    async fn merge_order_follows_listing_not_completion() {
        let mut repos = MockRepoSource::new();
        repos
            .expect_list_repositories()
            .returning(|| Ok(vec![listed("beta"), listed("alpha"), listed("gamma")]));
        repos
            .expect_count_open_issues()
            .returning(|key| match key.name.as_str() {
                "beta" => Ok(2),
                "alpha" => Ok(7),
                _ => Ok(0),
            });
        repos
            .expect_local_git_status()
            .returning(|_| Ok(GitState::NotCloned));

        let coordinator = coordinator(
            repos,
            Arc::new(MockQualitySource::new()),
            FilterRules::default(),
            2,
        );
        let (tx, mut rx) = mpsc::channel(16);
        let report = coordinator.fetch_all(false, tx).await.unwrap();

        assert_eq!(names(&report.repos), ["beta", "alpha", "gamma"]);
        assert_eq!(report.repos[1].open_issues, 7);
        assert!(report.warnings.is_empty());

        let mut pages = Vec::new();
        while let Ok(page) = rx.try_recv() {
            pages.push(page);
        }
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].done, 2);
        assert_eq!(pages[0].total, 3);
        assert_eq!(names(&pages[0].repos), ["beta", "alpha"]);
        assert_eq!(pages[1].done, 3);
        assert_eq!(names(&pages[1].repos), ["beta", "alpha", "gamma"]);
    }

    #[tokio::test]
    async fn per_repo_failure_degrades_only_that_repo() {
        let mut repos = MockRepoSource::new();
        repos
            .expect_list_repositories()
            .returning(|| Ok(vec![listed("alpha"), listed("beta"), listed("gamma")]));
        repos
            .expect_count_open_issues()
            .returning(|key| match key.name.as_str() {
                "beta" => Err(Error::ApiError("boom".into())),
                _ => Ok(1),
            });
        repos
            .expect_local_git_status()
            .returning(|_| Ok(GitState::NotCloned));

        let coordinator = coordinator(
            repos,
            Arc::new(MockQualitySource::new()),
            FilterRules::default(),
            10,
        );
        let (tx, _rx) = mpsc::channel(16);
        let report = coordinator.fetch_all(false, tx).await.unwrap();

        assert_eq!(report.repos.len(), 3);
        assert_eq!(report.repos[0].open_issues, 1);
        // degraded repo keeps the listing's count instead of failing the batch
        assert_eq!(report.repos[1].open_issues, 0);
        assert_eq!(report.repos[2].open_issues, 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("beta"));
    }

    #[tokio::test]
    async fn listing_failure_aborts_the_fetch() {
        let mut repos = MockRepoSource::new();
        repos
            .expect_list_repositories()
            .returning(|| Err(Error::ApiError("github is down".into())));

        let coordinator = coordinator(
            repos,
            Arc::new(MockQualitySource::new()),
            FilterRules::default(),
            10,
        );
        let (tx, mut rx) = mpsc::channel(16);
        let result = coordinator.fetch_all(false, tx).await;

        assert!(result.is_err());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn filtered_out_repos_are_never_enriched() {
        let mut repos = MockRepoSource::new();
        repos
            .expect_list_repositories()
            .returning(|| Ok(vec![listed("alpha"), listed("beta")]));
        repos
            .expect_count_open_issues()
            .withf(|key| key.name == "alpha")
            .times(1)
            .returning(|_| Ok(3));
        repos
            .expect_local_git_status()
            .withf(|name| name == "alpha")
            .times(1)
            .returning(|_| Ok(GitState::NotCloned));

        let rules = FilterRules {
            included: vec![],
            excluded: vec!["beta".to_string()],
        };
        let coordinator = coordinator(repos, Arc::new(MockQualitySource::new()), rules, 10);
        let (tx, _rx) = mpsc::channel(16);
        let report = coordinator.fetch_all(false, tx).await.unwrap();

        assert_eq!(names(&report.repos), ["alpha"]);
        assert_eq!(report.repos[0].open_issues, 3);
    }

    #[tokio::test]
    async fn no_quality_project_means_checked_unknown() {
        let mut repos = MockRepoSource::new();
        repos
            .expect_list_repositories()
            .returning(|| Ok(vec![listed("widget")]));
        repos.expect_count_open_issues().returning(|_| Ok(0));
        repos
            .expect_local_git_status()
            .returning(|_| Ok(GitState::NotCloned));

        let quality = Arc::new(ScriptedQuality::new(HashMap::new()));
        let coordinator = FetchCoordinator::new(
            Arc::new(repos),
            quality.clone(),
            FilterRules::default(),
            None,
            10,
        );
        let (tx, _rx) = mpsc::channel(16);
        let report = coordinator.fetch_all(true, tx).await.unwrap();

        let gate = &report.repos[0].gate;
        assert_eq!(gate.state, GateState::Unknown);
        assert!(gate.checked);
        assert!(report.warnings.is_empty());
        // every deduplicated candidate was tried
        assert_eq!(quality.calls(), vec!["acme_widget", "widget"]);
    }

    #[tokio::test]
    async fn first_candidate_hit_stops_the_guessing() {
        let mut responses = HashMap::new();
        responses.insert("widget".to_string(), failed_gate());
        let quality = Arc::new(ScriptedQuality::new(responses));

        let mut repos = MockRepoSource::new();
        repos
            .expect_list_repositories()
            .returning(|| Ok(vec![listed("widget")]));
        repos.expect_count_open_issues().returning(|_| Ok(0));
        repos
            .expect_local_git_status()
            .returning(|_| Ok(GitState::NotCloned));

        let coordinator = FetchCoordinator::new(
            Arc::new(repos),
            quality.clone(),
            FilterRules::default(),
            Some("acme-org".to_string()),
            10,
        );
        let (tx, _rx) = mpsc::channel(16);
        let report = coordinator.fetch_all(true, tx).await.unwrap();

        assert_eq!(report.repos[0].gate.state, GateState::Failed);
        // stopped after the hit; org-based candidates never queried
        assert_eq!(quality.calls(), vec!["acme_widget", "widget"]);
    }

    #[tokio::test]
    async fn quality_error_leaves_gate_unchecked_with_warning() {
        let mut quality = ScriptedQuality::new(HashMap::new());
        quality.errors.push("acme_widget".to_string());

        let mut repos = MockRepoSource::new();
        repos
            .expect_list_repositories()
            .returning(|| Ok(vec![listed("widget")]));
        repos.expect_count_open_issues().returning(|_| Ok(0));
        repos
            .expect_local_git_status()
            .returning(|_| Ok(GitState::NotCloned));

        let coordinator = FetchCoordinator::new(
            Arc::new(repos),
            Arc::new(quality),
            FilterRules::default(),
            None,
            10,
        );
        let (tx, _rx) = mpsc::channel(16);
        let report = coordinator.fetch_all(true, tx).await.unwrap();

        let gate = &report.repos[0].gate;
        assert!(!gate.checked);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("widget"));
    }

    #[tokio::test]
    async fn fetch_single_loads_detail_when_asked() {
        let mut repos = MockRepoSource::new();
        repos
            .expect_fetch_repository()
            .returning(|_| Ok(listed("widget")));
        repos.expect_count_open_issues().returning(|_| Ok(4));
        repos.expect_local_git_status().returning(|_| {
            Ok(GitState::Clean {
                branch: Some("main".to_string()),
            })
        });
        repos.expect_list_pull_requests().returning(|_| Ok(vec![]));
        repos.expect_list_issues().returning(|_| Ok(vec![]));

        let coordinator = coordinator(
            repos,
            Arc::new(MockQualitySource::new()),
            FilterRules::default(),
            10,
        );
        let key = RepoKey::new("acme", "widget");
        let (repo, warnings) = coordinator.fetch_single(&key, false, true).await.unwrap();

        assert_eq!(repo.open_issues, 4);
        assert!(repo.detail.is_loaded());
        assert_eq!(repo.git.branch(), Some("main"));
        assert!(warnings.is_empty());
    }

    #[tokio::test]
    async fn quality_sweep_reports_each_repo_and_collects_warnings() {
        let mut responses = HashMap::new();
        responses.insert("acme_alpha".to_string(), failed_gate());
        let mut quality = ScriptedQuality::new(responses);
        quality.errors.push("acme_broken".to_string());

        let repos = MockRepoSource::new();
        let coordinator = FetchCoordinator::new(
            Arc::new(repos),
            Arc::new(quality),
            FilterRules::default(),
            None,
            2,
        );

        let keys = vec![
            RepoKey::new("acme", "alpha"),
            RepoKey::new("acme", "beta"),
            RepoKey::new("acme", "broken"),
        ];
        let (tx, mut rx) = mpsc::channel(16);
        let warnings = coordinator.fetch_quality_all(keys, tx).await;

        let mut received = Vec::new();
        while let Ok((key, gate)) = rx.try_recv() {
            received.push((key.name.clone(), gate));
        }

        assert_eq!(received.len(), 2);
        assert_eq!(received[0].0, "alpha");
        assert_eq!(received[0].1.state, GateState::Failed);
        assert_eq!(received[1].0, "beta");
        assert!(received[1].1.checked);
        assert_eq!(received[1].1.state, GateState::Unknown);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("broken"));
    }

    #[tokio::test]
    async fn detail_combines_pulls_and_issues() {
        let mut repos = MockRepoSource::new();
        repos.expect_list_pull_requests().returning(|_| {
            Ok(vec![PullRequest {
                number: 8,
                title: "Fix the fix".to_string(),
                url: String::new(),
                author: "fixer".to_string(),
                state: "open".to_string(),
                draft: false,
                head_ref: Some("fix/again".to_string()),
                base_ref: Some("main".to_string()),
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            }])
        });
        repos.expect_list_issues().returning(|_| {
            Ok(vec![Issue {
                number: 7,
                title: "It broke".to_string(),
                url: String::new(),
                author: "reporter".to_string(),
                state: "open".to_string(),
                labels: vec!["bug".to_string()],
                comments: 0,
                body: None,
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            }])
        });

        let coordinator = coordinator(
            repos,
            Arc::new(MockQualitySource::new()),
            FilterRules::default(),
            10,
        );
        let detail = coordinator
            .fetch_detail(&RepoKey::new("acme", "widget"))
            .await
            .unwrap();

        assert_eq!(detail.pulls.len(), 1);
        assert_eq!(detail.pulls[0].number, 8);
        assert_eq!(detail.issues.len(), 1);
        assert_eq!(detail.issues[0].number, 7);
    }

    #[test]
    fn candidate_keys_without_org() {
        let key = RepoKey::new("acme", "my-widget");
        assert_eq!(
            guess_project_keys(&key, None),
            vec!["acme_my-widget", "my-widget", "acme_my_widget"]
        );
    }

    #[test]
    fn candidate_keys_with_org_add_both_forms() {
        let key = RepoKey::new("acme", "widget");
        assert_eq!(
            guess_project_keys(&key, Some("acme-org")),
            vec!["acme_widget", "widget", "acme-org_widget", "acme-org:widget"]
        );
    }

    #[test]
    fn candidate_keys_are_deduplicated() {
        // underscore variant collapses into the first form, org repeats it
        let key = RepoKey::new("acme", "widget");
        assert_eq!(
            guess_project_keys(&key, Some("acme")),
            vec!["acme_widget", "widget", "acme:widget"]
        );
    }
}
