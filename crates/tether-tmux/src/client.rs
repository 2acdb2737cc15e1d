use std::path::Path;
use std::process::{Command, Output};

use crate::panes::{parse_panes, PaneMetadata, PANE_FORMAT};

const DEFAULT_TMUX_COMMAND: &str = "tmux";

/// Errors from running the tmux CLI.
#[derive(Debug)]
pub enum TmuxError {
    /// The binary could not be started at all.
    Exec(std::io::Error),
    /// tmux ran but exited unsuccessfully.
    Failed { args: String, stderr: String },
}

impl std::fmt::Display for TmuxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TmuxError::Exec(err) => write!(f, "failed to run tmux: {err}"),
            TmuxError::Failed { args, stderr } => {
                write!(f, "tmux {args} failed")?;
                if !stderr.is_empty() {
                    write!(f, ": {stderr}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for TmuxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TmuxError::Exec(err) => Some(err),
            TmuxError::Failed { .. } => None,
        }
    }
}

impl From<std::io::Error> for TmuxError {
    fn from(err: std::io::Error) -> Self {
        TmuxError::Exec(err)
    }
}

/// A program plus arguments, ready to be run on a PTY.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachCommand {
    pub program: String,
    pub args: Vec<String>,
}

/// Thin wrapper around the `tmux` CLI.
///
/// Every call is a blocking subprocess; callers treat the answers as facts
/// gathered at the moment of the call.
#[derive(Debug, Clone)]
pub struct TmuxClient {
    command: String,
    /// Extra leading arguments, e.g. `["-L", "tether"]` for a private socket.
    args: Vec<String>,
}

impl TmuxClient {
    pub fn new(command: Option<&str>, args: Vec<String>) -> Self {
        let command = command
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_TMUX_COMMAND)
            .to_string();
        Self { command, args }
    }

    /// Whether the tmux binary can be executed.
    pub fn is_available(&self) -> bool {
        Command::new(&self.command)
            .arg("-V")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// `tmux has-session -t <name>`. Any failure reads as "no such session".
    pub fn session_exists(&self, name: &str) -> bool {
        match self.run(&["has-session", "-t", &exact_target(name)]) {
            Ok(output) => output.status.success(),
            Err(e) => {
                log::debug!("has-session {name}: {e}");
                false
            }
        }
    }

    /// Kill a session. Returns `Ok(false)` if it did not exist.
    pub fn kill_session(&self, name: &str) -> Result<bool, TmuxError> {
        if !self.session_exists(name) {
            return Ok(false);
        }
        self.run_checked(&["kill-session", "-t", &exact_target(name)])?;
        Ok(true)
    }

    /// Names of all sessions on the server. No server running means no sessions.
    pub fn list_sessions(&self) -> Result<Vec<String>, TmuxError> {
        let output = self.run(&["list-sessions", "-F", "#{session_name}"])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_no_server(&stderr) {
                return Ok(Vec::new());
            }
            return Err(failed(&["list-sessions"], &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Metadata for every pane of a session.
    pub fn list_panes_metadata(&self, session: &str) -> Result<Vec<PaneMetadata>, TmuxError> {
        let target = exact_target(session);
        let output = self.run_checked(&["list-panes", "-s", "-t", &target, "-F", PANE_FORMAT])?;
        Ok(parse_panes(&String::from_utf8_lossy(&output.stdout)))
    }

    /// The last `lines` lines of the session's active pane, including scrollback.
    pub fn capture_recent_output(&self, session: &str, lines: u32) -> Result<String, TmuxError> {
        let start = format!("-{lines}");
        let target = format!("{}:", exact_target(session));
        let output = self.run_checked(&["capture-pane", "-p", "-J", "-t", &target, "-S", &start])?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Command that creates the session if needed and attaches to it.
    ///
    /// `initial_command` only runs when the session is created; attaching to
    /// an existing session leaves whatever is running there untouched.
    pub fn attach_command(
        &self,
        session: &str,
        cwd: Option<&Path>,
        initial_command: Option<&str>,
    ) -> AttachCommand {
        let mut args = self.args.clone();
        args.extend(["new-session".to_string(), "-A".to_string(), "-s".to_string()]);
        args.push(session.to_string());
        if let Some(cwd) = cwd {
            args.push("-c".to_string());
            args.push(cwd.to_string_lossy().to_string());
        }
        if let Some(command) = initial_command.map(str::trim).filter(|c| !c.is_empty()) {
            args.push(command.to_string());
        }
        AttachCommand {
            program: self.command.clone(),
            args,
        }
    }

    fn run(&self, args: &[&str]) -> Result<Output, TmuxError> {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args);
        cmd.args(args);
        Ok(cmd.output()?)
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output, TmuxError> {
        let output = self.run(args)?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(failed(args, &output))
        }
    }
}

impl Default for TmuxClient {
    fn default() -> Self {
        Self::new(None, Vec::new())
    }
}

/// Replace anything tmux would misread in a session name (`.` and `:` are
/// target separators) with `-`, falling back when nothing usable is left.
pub fn sanitize_component(value: &str, fallback: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// `=name` makes tmux match the session name exactly instead of by prefix.
fn exact_target(name: &str) -> String {
    format!("={name}")
}

fn is_no_server(stderr: &str) -> bool {
    stderr.contains("no server running") || stderr.contains("error connecting to")
}

fn failed(args: &[&str], output: &Output) -> TmuxError {
    TmuxError::Failed {
        args: args.join(" "),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("Claude Code", "term"), "claude-code");
        assert_eq!(sanitize_component("my.profile:1", "term"), "my-profile-1");
        assert_eq!(sanitize_component("  ", "term"), "term");
        assert_eq!(sanitize_component("--x--", "term"), "x");
        assert_eq!(sanitize_component("tui_tool", "term"), "tui_tool");
    }

    #[test]
    fn test_attach_command_new_session() {
        let client = TmuxClient::default();
        let cwd = PathBuf::from("/home/dev/project");
        let cmd = client.attach_command("tether-bash-1a2b", Some(&cwd), Some("claude"));

        assert_eq!(cmd.program, "tmux");
        assert_eq!(
            cmd.args,
            vec![
                "new-session",
                "-A",
                "-s",
                "tether-bash-1a2b",
                "-c",
                "/home/dev/project",
                "claude",
            ]
        );
    }

    #[test]
    fn test_attach_command_with_socket_and_no_command() {
        let client = TmuxClient::new(Some(" /usr/bin/tmux "), vec!["-L".into(), "tether".into()]);
        let cmd = client.attach_command("sess-1", None, Some("   "));

        assert_eq!(cmd.program, "/usr/bin/tmux");
        assert_eq!(cmd.args, vec!["-L", "tether", "new-session", "-A", "-s", "sess-1"]);
    }

    #[test]
    fn test_blank_command_falls_back_to_tmux() {
        let client = TmuxClient::new(Some(""), Vec::new());
        assert_eq!(client.attach_command("s", None, None).program, "tmux");
    }

    #[test]
    fn test_missing_binary_means_no_session() {
        let client = TmuxClient::new(Some("/nonexistent/tmux-binary"), Vec::new());
        assert!(!client.is_available());
        assert!(!client.session_exists("anything"));
        assert!(matches!(client.kill_session("anything"), Ok(false)));
        assert!(matches!(client.list_sessions(), Err(TmuxError::Exec(_))));
    }

    #[test]
    fn test_error_display() {
        let err = TmuxError::Failed {
            args: "kill-session -t =x".to_string(),
            stderr: "can't find session: x".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "tmux kill-session -t =x failed: can't find session: x"
        );
    }

    #[test]
    fn test_no_server_detection() {
        assert!(is_no_server("no server running on /tmp/tmux-1000/default"));
        assert!(is_no_server("error connecting to /tmp/tmux-1000/default (No such file or directory)"));
        assert!(!is_no_server("unknown option -- z"));
    }
}
