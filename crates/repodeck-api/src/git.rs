// Local working-tree probe. Shells out to the git binary rather than
// linking a libgit2 binding; two porcelain commands are all we need.
use std::path::Path;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug)]
pub enum GitError {
    #[error("git command failed: {0}")]
    CommandFailed(String),

    #[error("Failed to run git: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GitError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSummary {
    /// Current branch name, `None` in a repo with no commits yet.
    pub branch: Option<String>,
    /// Whether any tracked file has uncommitted changes.
    pub dirty: bool,
}

/// Summarize the checkout at `path`. Returns `Ok(None)` when the path is
/// not a git repository (including when it does not exist at all).
pub async fn status(path: &Path) -> Result<Option<GitSummary>> {
    if !path.join(".git").exists() {
        return Ok(None);
    }

    let porcelain = run_git(path, &["status", "--porcelain"]).await?;
    let dirty = has_tracked_changes(&porcelain);

    // Fails in a freshly-initialized repo with no HEAD; that is not an
    // error worth surfacing, the branch is simply unknown.
    let branch = match run_git(path, &["rev-parse", "--abbrev-ref", "HEAD"]).await {
        Ok(out) => {
            let name = out.trim();
            if name.is_empty() {
                None
            } else {
                Some(name.to_string())
            }
        }
        Err(_) => None,
    };

    Ok(Some(GitSummary { branch, dirty }))
}

async fn run_git(path: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(path)
        .stdin(Stdio::null())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::CommandFailed(format!(
            "git {} in {}: {}",
            args.join(" "),
            path.display(),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Untracked files (`??` lines) do not count; only tracked paths with
/// modifications mark the tree dirty.
fn has_tracked_changes(porcelain: &str) -> bool {
    porcelain
        .lines()
        .any(|line| !line.is_empty() && !line.starts_with("??"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_tree_is_not_dirty() {
        assert!(!has_tracked_changes(""));
        assert!(!has_tracked_changes("\n"));
    }

    #[test]
    fn untracked_files_alone_are_not_dirty() {
        let porcelain = "?? notes.txt\n?? scratch/\n";
        assert!(!has_tracked_changes(porcelain));
    }

    #[test]
    fn modified_tracked_file_is_dirty() {
        assert!(has_tracked_changes(" M src/main.rs\n"));
        assert!(has_tracked_changes("A  new_module.rs\n"));
        assert!(has_tracked_changes("D  old_module.rs\n"));
    }

    #[test]
    fn mixed_output_is_dirty_because_of_tracked_lines() {
        let porcelain = "?? notes.txt\n M src/lib.rs\n?? scratch/\n";
        assert!(has_tracked_changes(porcelain));
    }

    #[tokio::test]
    async fn missing_path_is_not_a_repo() {
        let result = status(Path::new("/definitely/not/a/repo")).await;
        assert_eq!(result.unwrap(), None);
    }
}
