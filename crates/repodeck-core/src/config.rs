use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::filter::FilterRules;

/// Main configuration structure
///
/// Loaded from `<config_dir>/repodeck/config.toml`; every section falls back
/// to defaults when the file or the section is absent, so a bare install
/// works with nothing but a GITHUB_TOKEN in the environment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubSection,
    #[serde(default)]
    pub sonar: SonarSection,
    #[serde(default)]
    pub repos: FilterRules,
    #[serde(default)]
    pub local: LocalSection,
    #[serde(default)]
    pub fetch: FetchSection,
    #[serde(default)]
    pub launcher: LauncherSection,
}

impl Config {
    /// Load config from the default location, or defaults if there is none
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load config from an explicit path (the `--config` flag)
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)
                .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Get the config file path (XDG on Linux/macOS, AppData on Windows)
    pub fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find config directory".into()))?
            .join("repodeck");

        Ok(config_dir.join("config.toml"))
    }

    fn validate(&self) -> crate::Result<()> {
        if self.github.org.is_some() && self.github.user.is_some() {
            return Err(crate::Error::ConfigError(
                "set either github.org or github.user, not both".into(),
            ));
        }
        if self.fetch.batch_size == 0 {
            return Err(crate::Error::ConfigError(
                "fetch.batch_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubSection {
    /// List this organization's repositories. Mutually exclusive with `user`;
    /// with neither set, the authenticated user's own repositories are listed.
    pub org: Option<String>,
    pub user: Option<String>,

    /// Personal access token. Falls back to the GITHUB_TOKEN env var.
    pub token: Option<String>,

    /// API URL (for GitHub Enterprise)
    #[serde(default = "default_github_api")]
    pub api_url: String,
}

fn default_github_api() -> String {
    "https://api.github.com".to_string()
}

impl Default for GitHubSection {
    fn default() -> Self {
        Self {
            org: None,
            user: None,
            token: None,
            api_url: default_github_api(),
        }
    }
}

impl GitHubSection {
    pub fn resolved_token(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
    }

    pub fn scope(&self) -> repodeck_api::RepoScope {
        if let Some(org) = &self.org {
            repodeck_api::RepoScope::Org(org.clone())
        } else if let Some(user) = &self.user {
            repodeck_api::RepoScope::User(user.clone())
        } else {
            repodeck_api::RepoScope::Viewer
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SonarSection {
    /// SonarCloud organization, used when guessing project keys.
    pub org: Option<String>,

    /// Token for private projects; the public API needs none.
    pub token: Option<String>,

    #[serde(default = "default_sonar_api")]
    pub api_url: String,
}

fn default_sonar_api() -> String {
    "https://sonarcloud.io/api".to_string()
}

impl Default for SonarSection {
    fn default() -> Self {
        Self {
            org: None,
            token: None,
            api_url: default_sonar_api(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocalSection {
    /// Directory holding local clones, e.g. "~/Code". A repository named
    /// `widget` is looked for at `<code_path>/widget`.
    pub code_path: Option<String>,
}

impl LocalSection {
    pub fn code_dir(&self) -> Option<PathBuf> {
        self.code_path.as_deref().map(expand_tilde)
    }
}

fn expand_tilde(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSection {
    /// Repositories enriched concurrently per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    10
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherSection {
    /// Program run by the launch key. `{path}` in args becomes the checkout
    /// path; the child also gets the checkout as its working directory.
    #[serde(default = "default_launcher_command")]
    pub command: String,

    #[serde(default = "default_launcher_args")]
    pub args: Vec<String>,
}

fn default_launcher_command() -> String {
    "code".to_string()
}

fn default_launcher_args() -> Vec<String> {
    vec!["{path}".to_string()]
}

impl Default for LauncherSection {
    fn default() -> Self {
        Self {
            command: default_launcher_command(),
            args: default_launcher_args(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = Config::default();
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.sonar.api_url, "https://sonarcloud.io/api");
        assert_eq!(config.fetch.batch_size, 10);
        assert_eq!(config.launcher.command, "code");
        assert!(config.repos.included.is_empty());
        assert!(config.repos.excluded.is_empty());
        assert!(config.local.code_dir().is_none());
    }

    #[test]
    fn parses_partial_file_with_defaults_for_the_rest() {
        let toml_str = r#"
            [github]
            org = "acme"

            [repos]
            excluded = ["sandbox"]

            [fetch]
            batch_size = 4
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.github.org.as_deref(), Some("acme"));
        assert_eq!(config.repos.excluded, vec!["sandbox"]);
        assert_eq!(config.fetch.batch_size, 4);
        // untouched sections keep their defaults
        assert_eq!(config.sonar.api_url, "https://sonarcloud.io/api");
        assert_eq!(config.launcher.args, vec!["{path}"]);
    }

    #[test]
    fn scope_prefers_org_then_user_then_viewer() {
        let mut section = GitHubSection::default();
        assert_eq!(section.scope(), repodeck_api::RepoScope::Viewer);

        section.user = Some("octocat".to_string());
        assert_eq!(
            section.scope(),
            repodeck_api::RepoScope::User("octocat".to_string())
        );

        section.user = None;
        section.org = Some("acme".to_string());
        assert_eq!(
            section.scope(),
            repodeck_api::RepoScope::Org("acme".to_string())
        );
    }

    #[test]
    fn org_and_user_together_fail_validation() {
        let config = Config {
            github: GitHubSection {
                org: Some("acme".to_string()),
                user: Some("octocat".to_string()),
                ..GitHubSection::default()
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_batch_size_fails_validation() {
        let config = Config {
            fetch: FetchSection { batch_size: 0 },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn tilde_expansion_leaves_absolute_paths_alone() {
        assert_eq!(expand_tilde("/opt/src"), PathBuf::from("/opt/src"));
    }

    #[test]
    fn tilde_expansion_rewrites_home_prefix() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/Code"), home.join("Code"));
            assert_eq!(expand_tilde("~"), home);
        }
    }
}
