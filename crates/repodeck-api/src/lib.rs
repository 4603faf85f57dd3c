// Thin clients for everything outside the process: the GitHub REST API,
// the SonarCloud quality-gate API, the local git binary, and whatever
// external tool the user launches into a repository.
pub mod git;
pub mod github;
pub mod launcher;
pub mod retry;
pub mod sonarcloud;

// Re-export common types
pub use git::{GitError, GitSummary};
pub use github::{
    GitHubBranchRef, GitHubClient, GitHubError, GitHubIssue, GitHubPull, GitHubRepo, RepoScope,
};
pub use launcher::{launch, LaunchOutcome};
pub use retry::RetryConfig;
pub use sonarcloud::{SonarClient, SonarCondition, SonarError, SonarQualityGate};
