// Hands a repository checkout to an external tool (editor, terminal,
// whatever the launch command names) without disturbing the TUI.
use std::path::Path;
use std::process::{Command, Stdio};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The command was spawned and left to its own devices.
    Spawned,
    /// The command could not be started.
    Failed(String),
}

/// Launch `command` with `args` inside `dir`. `{path}` in an argument is
/// replaced with the directory; the child runs detached with its stdio
/// closed so it cannot scribble over the terminal. Nothing ever waits on
/// the child.
pub fn launch(command: &str, args: &[String], dir: &Path) -> LaunchOutcome {
    if command.trim().is_empty() {
        return LaunchOutcome::Failed("empty launch command".to_string());
    }

    let spawned = Command::new(command)
        .args(substitute(args, dir))
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    match spawned {
        Ok(_child) => LaunchOutcome::Spawned,
        Err(err) => LaunchOutcome::Failed(format!("{}: {}", command, err)),
    }
}

/// Substitution happens per argument, so a checkout path containing spaces
/// stays a single argument.
fn substitute(args: &[String], dir: &Path) -> Vec<String> {
    let dir_str = dir.to_string_lossy();
    args.iter()
        .map(|arg| arg.replace("{path}", &dir_str))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_command_fails() {
        let dir = std::env::temp_dir();
        assert_eq!(
            launch("  ", &[], &dir),
            LaunchOutcome::Failed("empty launch command".to_string())
        );
    }

    #[test]
    fn unknown_binary_fails_with_its_name() {
        let dir = std::env::temp_dir();
        match launch("repodeck-no-such-binary", &["{path}".to_string()], &dir) {
            LaunchOutcome::Failed(msg) => assert!(msg.starts_with("repodeck-no-such-binary")),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn missing_directory_fails() {
        let result = launch("true", &[], Path::new("/no/such/checkout"));
        assert!(matches!(result, LaunchOutcome::Failed(_)));
    }

    #[test]
    fn spawns_a_real_command() {
        let dir = std::env::temp_dir();
        assert_eq!(launch("true", &[], &dir), LaunchOutcome::Spawned);
    }

    #[test]
    fn path_with_spaces_stays_one_argument() {
        let args = vec!["-n".to_string(), "{path}".to_string()];
        let substituted = substitute(&args, Path::new("/tmp/my repos/api"));
        assert_eq!(substituted, vec!["-n", "/tmp/my repos/api"]);
    }

    #[test]
    fn placeholder_inside_longer_argument() {
        let args = vec!["--working-directory={path}".to_string()];
        let substituted = substitute(&args, Path::new("/src/x"));
        assert_eq!(substituted, vec!["--working-directory=/src/x"]);
    }
}
