use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Repository identity: owner login plus short name. Hashable so the UI can
/// key expansion state by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoKey {
    pub owner: String,
    pub name: String,
}

impl RepoKey {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl std::fmt::Display for RepoKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// One dashboard row: a repository plus everything we know about it so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub key: RepoKey,
    pub url: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub open_issues: u32,
    pub gate: QualityGate,
    pub git: GitState,
    pub detail: DetailState,
}

impl Repository {
    /// Display rank: failed gates first, then warnings, then everything else.
    /// Within a rank the caller sorts by open-issue count.
    pub fn severity_rank(&self) -> u8 {
        match self.gate.state {
            GateState::Failed => 0,
            GateState::Warning => 1,
            _ => 2,
        }
    }

    pub fn status_color(&self) -> StatusColor {
        StatusColor::derive(self.gate.state, self.open_issues)
    }
}

/// Quality gate verdict for a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateState {
    Passed,
    Warning,
    Failed,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateCondition {
    pub metric: String,
    pub status: String,
    pub actual: Option<String>,
}

/// Gate state plus its conditions. `checked` separates "never asked" from
/// "asked, nothing found": both show as Unknown but only checked verdicts
/// are remembered across refreshes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityGate {
    pub state: GateState,
    pub conditions: Vec<GateCondition>,
    pub checked: bool,
}

impl QualityGate {
    /// Never looked up.
    pub fn unchecked() -> Self {
        Self {
            state: GateState::Unknown,
            conditions: Vec::new(),
            checked: false,
        }
    }

    /// Looked up, no matching project on the quality service.
    pub fn checked_unknown() -> Self {
        Self {
            state: GateState::Unknown,
            conditions: Vec::new(),
            checked: true,
        }
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::unchecked()
    }
}

/// Local working-tree state for a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GitState {
    /// No checkout under the configured code path.
    NotCloned,
    /// Checkout with no uncommitted changes to tracked files.
    Clean { branch: Option<String> },
    /// Checkout with uncommitted changes to tracked files.
    Dirty { branch: Option<String> },
}

impl GitState {
    pub fn is_cloned(&self) -> bool {
        !matches!(self, GitState::NotCloned)
    }

    pub fn is_dirty(&self) -> bool {
        matches!(self, GitState::Dirty { .. })
    }

    pub fn branch(&self) -> Option<&str> {
        match self {
            GitState::Clean { branch } | GitState::Dirty { branch } => branch.as_deref(),
            GitState::NotCloned => None,
        }
    }
}

/// An open issue, immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub author: String,
    pub state: String,
    pub labels: Vec<String>,
    pub comments: u32,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An open pull request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub author: String,
    pub state: String,
    pub draft: bool,
    pub head_ref: Option<String>,
    pub base_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lazily-loaded per-repository detail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoDetail {
    pub pulls: Vec<PullRequest>,
    pub issues: Vec<Issue>,
}

/// Lifecycle of a repository's lazy detail. `Stale` means data existed but
/// the record was replaced by a refresh; re-expanding reloads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum DetailState {
    #[default]
    Unloaded,
    Loading,
    Loaded(RepoDetail),
    Stale,
}

impl DetailState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, DetailState::Loaded(_))
    }

    pub fn loaded(&self) -> Option<&RepoDetail> {
        match self {
            DetailState::Loaded(detail) => Some(detail),
            _ => None,
        }
    }
}

/// Urgency color for a repository row, derived on demand and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusColor {
    Red,
    Yellow,
    Blue,
    Green,
}

impl StatusColor {
    /// Red conditions are checked before yellow ones so a Warning gate never
    /// downgrades a repository whose issue count already rates red.
    pub fn derive(gate: GateState, open_issues: u32) -> Self {
        if gate == GateState::Failed || open_issues >= 10 {
            StatusColor::Red
        } else if gate == GateState::Warning || open_issues >= 5 {
            StatusColor::Yellow
        } else if open_issues >= 1 {
            StatusColor::Blue
        } else {
            StatusColor::Green
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_formats_as_owner_slash_name() {
        let key = RepoKey::new("acme", "billing-api");
        assert_eq!(key.full_name(), "acme/billing-api");
        assert_eq!(key.to_string(), "acme/billing-api");
    }

    #[test]
    fn failed_gate_is_red_at_any_count() {
        assert_eq!(
            StatusColor::derive(GateState::Failed, 0),
            StatusColor::Red
        );
        assert_eq!(
            StatusColor::derive(GateState::Failed, 3),
            StatusColor::Red
        );
    }

    #[test]
    fn high_count_is_red_even_with_warning_gate() {
        assert_eq!(
            StatusColor::derive(GateState::Unknown, 12),
            StatusColor::Red
        );
        assert_eq!(
            StatusColor::derive(GateState::Warning, 12),
            StatusColor::Red
        );
    }

    #[test]
    fn warning_gate_is_yellow_at_zero_issues() {
        assert_eq!(
            StatusColor::derive(GateState::Warning, 0),
            StatusColor::Yellow
        );
    }

    #[test]
    fn medium_count_is_yellow() {
        assert_eq!(
            StatusColor::derive(GateState::Passed, 5),
            StatusColor::Yellow
        );
        assert_eq!(
            StatusColor::derive(GateState::Unknown, 9),
            StatusColor::Yellow
        );
    }

    #[test]
    fn low_count_is_blue_and_zero_is_green() {
        assert_eq!(StatusColor::derive(GateState::Passed, 3), StatusColor::Blue);
        assert_eq!(StatusColor::derive(GateState::Passed, 1), StatusColor::Blue);
        assert_eq!(
            StatusColor::derive(GateState::Passed, 0),
            StatusColor::Green
        );
        assert_eq!(
            StatusColor::derive(GateState::Unknown, 0),
            StatusColor::Green
        );
    }

    #[test]
    fn severity_ranks_failed_before_warning_before_rest() {
        let mut repo = Repository {
            key: RepoKey::new("acme", "x"),
            url: String::new(),
            description: None,
            language: None,
            open_issues: 0,
            gate: QualityGate::unchecked(),
            git: GitState::NotCloned,
            detail: DetailState::Unloaded,
        };
        assert_eq!(repo.severity_rank(), 2);

        repo.gate.state = GateState::Warning;
        assert_eq!(repo.severity_rank(), 1);

        repo.gate.state = GateState::Failed;
        assert_eq!(repo.severity_rank(), 0);

        repo.gate.state = GateState::Passed;
        assert_eq!(repo.severity_rank(), 2);
    }

    #[test]
    fn git_state_helpers() {
        let dirty = GitState::Dirty {
            branch: Some("main".to_string()),
        };
        assert!(dirty.is_cloned());
        assert!(dirty.is_dirty());
        assert_eq!(dirty.branch(), Some("main"));

        assert!(!GitState::NotCloned.is_cloned());
        assert_eq!(GitState::NotCloned.branch(), None);
    }
}
