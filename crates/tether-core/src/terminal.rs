//! The logical terminal and the values handed out about it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tether_pty::AttachmentInfo;

use crate::types::TerminalType;

/// Lifecycle state of a registered terminal. A closed terminal is simply
/// absent from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalState {
    Spawning,
    Active,
    Disconnected,
    Error,
}

impl TerminalState {
    pub fn as_str(self) -> &'static str {
        match self {
            TerminalState::Spawning => "spawning",
            TerminalState::Active => "active",
            TerminalState::Disconnected => "disconnected",
            TerminalState::Error => "error",
        }
    }

    /// States whose terminals reserve their name.
    pub fn holds_name(self) -> bool {
        matches!(
            self,
            TerminalState::Spawning | TerminalState::Active | TerminalState::Disconnected
        )
    }
}

impl std::fmt::Display for TerminalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full creation options for a terminal. Kept on the terminal so a later
/// reattachment can rebuild the same process.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalConfig {
    pub name: String,
    pub terminal_type: TerminalType,
    pub working_dir: Option<PathBuf>,
    /// Reattach hint: the multiplexer session to join or create.
    pub session_name: Option<String>,
    /// Back the terminal with a multiplexer session.
    pub use_multiplexer: bool,
    pub shell: Option<String>,
    pub command: Option<String>,
    pub env: BTreeMap<String, String>,
    pub profile_name: Option<String>,
    pub from_extension: bool,
    pub cols: u16,
    pub rows: u16,
    pub options: BTreeMap<String, Value>,
}

impl TerminalConfig {
    pub fn new(name: impl Into<String>, terminal_type: TerminalType) -> Self {
        Self {
            name: name.into(),
            terminal_type,
            working_dir: None,
            session_name: None,
            use_multiplexer: false,
            shell: None,
            command: None,
            env: BTreeMap::new(),
            profile_name: None,
            from_extension: false,
            cols: 80,
            rows: 24,
            options: BTreeMap::new(),
        }
    }

    /// Fold a newer set of options into this one. Values the newer config
    /// leaves unset are kept; environment and options maps are merged.
    pub fn merge(&mut self, newer: TerminalConfig) {
        if newer.working_dir.is_some() {
            self.working_dir = newer.working_dir;
        }
        if newer.shell.is_some() {
            self.shell = newer.shell;
        }
        if newer.command.is_some() {
            self.command = newer.command;
        }
        if newer.profile_name.is_some() {
            self.profile_name = newer.profile_name;
        }
        self.env.extend(newer.env);
        self.options.extend(newer.options);
        self.cols = newer.cols;
        self.rows = newer.rows;
        self.from_extension |= newer.from_extension;
    }
}

/// A registered terminal. Only the registry holds these; callers get
/// [`TerminalSnapshot`]s.
#[derive(Debug, Clone)]
pub(crate) struct Terminal {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) terminal_type: TerminalType,
    pub(crate) state: TerminalState,
    pub(crate) multiplexed_session_id: Option<String>,
    pub(crate) attachment: Option<AttachmentInfo>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_activity: DateTime<Utc>,
    pub(crate) exit_code: Option<u32>,
    pub(crate) signal: Option<String>,
    pub(crate) config: TerminalConfig,
}

impl Terminal {
    pub(crate) fn new(id: String, config: TerminalConfig) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: config.name.clone(),
            terminal_type: config.terminal_type,
            state: TerminalState::Spawning,
            multiplexed_session_id: None,
            attachment: None,
            created_at: now,
            last_activity: now,
            exit_code: None,
            signal: None,
            config,
        }
    }

    pub(crate) fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub(crate) fn snapshot(&self) -> TerminalSnapshot {
        TerminalSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            terminal_type: self.terminal_type,
            icon: self.terminal_type.handler().icon,
            state: self.state,
            multiplexed_session_id: self.multiplexed_session_id.clone(),
            attachment_id: self.attachment.map(|a| a.id),
            pid: self.attachment.and_then(|a| a.pid),
            working_dir: self.config.working_dir.clone(),
            command: self.config.command.clone(),
            profile_name: self.config.profile_name.clone(),
            cols: self.config.cols,
            rows: self.config.rows,
            created_at: self.created_at,
            last_activity: self.last_activity,
            exit_code: self.exit_code,
            signal: self.signal.clone(),
            options: self.config.options.clone(),
        }
    }
}

/// Serializable copy of a terminal, safe to hold without touching the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalSnapshot {
    pub id: String,
    pub name: String,
    pub terminal_type: TerminalType,
    pub icon: &'static str,
    pub state: TerminalState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplexed_session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_name: Option<String>,
    pub cols: u16,
    pub rows: u16,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, Value>,
}

/// Expand a leading `~` to `$HOME`. Paths without one, or a missing `$HOME`,
/// come back unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    let Some(text) = path.to_str() else {
        return path.to_path_buf();
    };
    let Some(home) = home_dir() else {
        return path.to_path_buf();
    };
    if text == "~" {
        home
    } else if let Some(rest) = text.strip_prefix("~/") {
        home.join(rest)
    } else {
        path.to_path_buf()
    }
}

/// Get the user's home directory.
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_home() {
        let home = home_dir().expect("HOME must be set for tests");
        assert_eq!(expand_home(Path::new("~")), home);
        assert_eq!(expand_home(Path::new("~/src/app")), home.join("src/app"));
        assert_eq!(expand_home(Path::new("/etc")), PathBuf::from("/etc"));
        assert_eq!(expand_home(Path::new("~other/x")), PathBuf::from("~other/x"));
        assert_eq!(expand_home(Path::new("rel/~/x")), PathBuf::from("rel/~/x"));
    }

    #[test]
    fn test_holds_name() {
        assert!(TerminalState::Spawning.holds_name());
        assert!(TerminalState::Active.holds_name());
        assert!(TerminalState::Disconnected.holds_name());
        assert!(!TerminalState::Error.holds_name());
    }

    #[test]
    fn test_merge_keeps_unset_and_merges_env() {
        let mut base = TerminalConfig::new("Agent", TerminalType::ClaudeCode);
        base.working_dir = Some(PathBuf::from("/srv/a"));
        base.command = Some("claude".to_string());
        base.env.insert("A".to_string(), "1".to_string());
        base.env.insert("B".to_string(), "1".to_string());

        let mut newer = TerminalConfig::new("ignored", TerminalType::ClaudeCode);
        newer.env.insert("B".to_string(), "2".to_string());
        newer.cols = 132;
        newer.rows = 40;

        base.merge(newer);

        assert_eq!(base.name, "Agent");
        assert_eq!(base.working_dir, Some(PathBuf::from("/srv/a")));
        assert_eq!(base.command.as_deref(), Some("claude"));
        assert_eq!(base.env.get("A").map(String::as_str), Some("1"));
        assert_eq!(base.env.get("B").map(String::as_str), Some("2"));
        assert_eq!((base.cols, base.rows), (132, 40));
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let mut terminal = Terminal::new("t1".to_string(), TerminalConfig::new("Shell", TerminalType::Bash));
        terminal.state = TerminalState::Active;
        terminal.multiplexed_session_id = Some("tether-bash-1".to_string());

        let json = serde_json::to_value(terminal.snapshot()).unwrap();
        assert_eq!(json["id"], "t1");
        assert_eq!(json["terminalType"], "bash");
        assert_eq!(json["state"], "active");
        assert_eq!(json["multiplexedSessionId"], "tether-bash-1");
        assert!(json.get("exitCode").is_none());
        assert!(json.get("options").is_none());
    }
}
