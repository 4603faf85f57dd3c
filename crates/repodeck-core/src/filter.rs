// Identifier-level filtering, applied to the repository listing before any
// per-repo fetching happens.
use serde::{Deserialize, Serialize};

use crate::models::Repository;

/// Which repositories make it onto the dashboard.
///
/// A non-empty `included` list is an allowlist and wins outright; `excluded`
/// only applies when `included` is empty. Names are matched against the
/// repository's short name, not owner/name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRules {
    #[serde(default)]
    pub included: Vec<String>,
    #[serde(default)]
    pub excluded: Vec<String>,
}

impl FilterRules {
    pub fn keeps(&self, name: &str) -> bool {
        if !self.included.is_empty() {
            self.included.iter().any(|n| n == name)
        } else {
            !self.excluded.iter().any(|n| n == name)
        }
    }

    /// Filter the full set, preserving its order. Included names that match
    /// nothing are silently dropped; they are not an error.
    pub fn apply(&self, repos: Vec<Repository>) -> Vec<Repository> {
        repos
            .into_iter()
            .filter(|repo| self.keeps(&repo.key.name))
            .collect()
    }
}
