//! Static per-type configuration: which shell, which command, which icon,
//! and whether the type is worth keeping alive in a multiplexer session.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SpawnError;
use crate::gateway::SpawnRequest;

/// The only execution target tether runs terminals on.
pub const LOCAL_PLATFORM: &str = "local";

/// Environment every terminal starts with, before type and caller overrides.
pub const BASE_ENV: &[(&str, &str)] = &[("TERM", "xterm-256color"), ("COLORTERM", "truecolor")];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum TerminalType {
    #[default]
    #[serde(rename = "bash")]
    Bash,
    #[serde(rename = "claude-code")]
    ClaudeCode,
    #[serde(rename = "codex")]
    Codex,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "opencode")]
    OpenCode,
    #[serde(rename = "tui-tool")]
    TuiTool,
    #[serde(rename = "dashboard")]
    Dashboard,
}

#[cfg(test)]
const ALL_TYPES: [TerminalType; 7] = [
    TerminalType::Bash,
    TerminalType::ClaudeCode,
    TerminalType::Codex,
    TerminalType::Gemini,
    TerminalType::OpenCode,
    TerminalType::TuiTool,
    TerminalType::Dashboard,
];

impl TerminalType {
    pub fn as_str(self) -> &'static str {
        match self {
            TerminalType::Bash => "bash",
            TerminalType::ClaudeCode => "claude-code",
            TerminalType::Codex => "codex",
            TerminalType::Gemini => "gemini",
            TerminalType::OpenCode => "opencode",
            TerminalType::TuiTool => "tui-tool",
            TerminalType::Dashboard => "dashboard",
        }
    }

    pub fn handler(self) -> &'static TypeHandler {
        match self {
            TerminalType::Bash => &BASH,
            TerminalType::ClaudeCode => &CLAUDE_CODE,
            TerminalType::Codex => &CODEX,
            TerminalType::Gemini => &GEMINI,
            TerminalType::OpenCode => &OPENCODE,
            TerminalType::TuiTool => &TUI_TOOL,
            TerminalType::Dashboard => &DASHBOARD,
        }
    }

    /// Guess the type of a running pane from its foreground command, as
    /// reported by the multiplexer. Anything unrecognised is a shell.
    pub fn from_command(command: &str) -> Self {
        let name = command
            .split_whitespace()
            .next()
            .and_then(|first| first.rsplit('/').next())
            .unwrap_or("");
        match name {
            "claude" => TerminalType::ClaudeCode,
            "codex" => TerminalType::Codex,
            "gemini" => TerminalType::Gemini,
            "opencode" => TerminalType::OpenCode,
            _ => TerminalType::Bash,
        }
    }
}

impl FromStr for TerminalType {
    type Err = SpawnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bash" | "shell" => Ok(TerminalType::Bash),
            "claude-code" | "claude" => Ok(TerminalType::ClaudeCode),
            "codex" => Ok(TerminalType::Codex),
            "gemini" => Ok(TerminalType::Gemini),
            "opencode" => Ok(TerminalType::OpenCode),
            "tui-tool" => Ok(TerminalType::TuiTool),
            "dashboard" => Ok(TerminalType::Dashboard),
            _ => Err(SpawnError::UnknownType(s.to_string())),
        }
    }
}

impl std::fmt::Display for TerminalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the type table.
#[derive(Debug)]
pub struct TypeHandler {
    pub terminal_type: TerminalType,
    pub shell: &'static str,
    pub default_command: Option<&'static str>,
    pub icon: &'static str,
    pub env: &'static [(&'static str, &'static str)],
    /// Long-running sessions worth backing with the multiplexer by default.
    pub resumable: bool,
    pub platforms: &'static [&'static str],
}

static BASH: TypeHandler = TypeHandler {
    terminal_type: TerminalType::Bash,
    shell: "bash",
    default_command: None,
    icon: ">_",
    env: &[],
    resumable: false,
    platforms: &[LOCAL_PLATFORM],
};

static CLAUDE_CODE: TypeHandler = TypeHandler {
    terminal_type: TerminalType::ClaudeCode,
    shell: "bash",
    default_command: Some("claude"),
    icon: "🤖",
    env: &[("FORCE_COLOR", "1")],
    resumable: true,
    platforms: &[LOCAL_PLATFORM],
};

static CODEX: TypeHandler = TypeHandler {
    terminal_type: TerminalType::Codex,
    shell: "bash",
    default_command: Some("codex"),
    icon: "🧠",
    env: &[("FORCE_COLOR", "1")],
    resumable: true,
    platforms: &[LOCAL_PLATFORM],
};

static GEMINI: TypeHandler = TypeHandler {
    terminal_type: TerminalType::Gemini,
    shell: "bash",
    default_command: Some("gemini"),
    icon: "✨",
    env: &[("FORCE_COLOR", "1")],
    resumable: true,
    platforms: &[LOCAL_PLATFORM],
};

static OPENCODE: TypeHandler = TypeHandler {
    terminal_type: TerminalType::OpenCode,
    shell: "bash",
    default_command: Some("opencode"),
    icon: "📟",
    env: &[],
    resumable: true,
    platforms: &[LOCAL_PLATFORM],
};

static TUI_TOOL: TypeHandler = TypeHandler {
    terminal_type: TerminalType::TuiTool,
    shell: "bash",
    default_command: None,
    icon: "🛠",
    env: &[],
    resumable: false,
    platforms: &[LOCAL_PLATFORM],
};

static DASHBOARD: TypeHandler = TypeHandler {
    terminal_type: TerminalType::Dashboard,
    shell: "bash",
    default_command: Some("htop"),
    icon: "📊",
    env: &[],
    resumable: false,
    platforms: &[LOCAL_PLATFORM],
};

impl TypeHandler {
    /// Type-specific request checks, run after the generic ones.
    pub fn validate(&self, request: &SpawnRequest) -> Result<(), SpawnError> {
        if let Some(commands) = &request.commands {
            if commands.iter().any(|c| c.trim().is_empty()) {
                return Err(SpawnError::Validation(
                    "commands must not contain empty entries".to_string(),
                ));
            }
        }

        match self.terminal_type {
            TerminalType::TuiTool => {
                let has_tool = non_blank(request.tool.as_deref()).is_some();
                let has_command = non_blank(request.command.as_deref()).is_some();
                let has_commands = request.commands.as_ref().is_some_and(|c| !c.is_empty());
                if has_tool || has_command || has_commands {
                    Ok(())
                } else {
                    Err(SpawnError::Validation(
                        "tui-tool terminals need a tool, command, or commands".to_string(),
                    ))
                }
            }
            _ => Ok(()),
        }
    }

    pub fn supports_platform(&self, platform: &str) -> bool {
        self.platforms.iter().any(|p| p.eq_ignore_ascii_case(platform))
    }

    /// The command line the terminal should run, resolved as late as possible:
    /// explicit `commands` (joined with `&&`) win, then `command`, then the
    /// tool name for TUI tools, then the type's default.
    pub fn resolve_command(&self, request: &SpawnRequest) -> Option<String> {
        if let Some(commands) = request.commands.as_ref().filter(|c| !c.is_empty()) {
            let joined: Vec<&str> = commands.iter().map(|c| c.trim()).collect();
            return Some(joined.join(" && "));
        }
        if let Some(command) = non_blank(request.command.as_deref()) {
            return Some(command.to_string());
        }
        if self.terminal_type == TerminalType::TuiTool {
            if let Some(tool) = non_blank(request.tool.as_deref()) {
                return Some(tool.to_string());
            }
        }
        self.default_command.map(str::to_string)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SpawnRequest {
        SpawnRequest::default()
    }

    #[test]
    fn test_parse_round_trips_canonical_names() {
        for ty in ALL_TYPES {
            assert_eq!(ty.as_str().parse::<TerminalType>().unwrap(), ty);
            assert_eq!(ty.handler().terminal_type, ty);
        }
        assert_eq!("Shell".parse::<TerminalType>().unwrap(), TerminalType::Bash);
    }

    #[test]
    fn test_unknown_type() {
        let err = "emacs".parse::<TerminalType>().unwrap_err();
        assert_eq!(err, SpawnError::UnknownType("emacs".to_string()));
    }

    #[test]
    fn test_serde_names_match_as_str() {
        for ty in ALL_TYPES {
            let json = serde_json::to_value(ty).unwrap();
            assert_eq!(json, ty.as_str());
        }
    }

    #[test]
    fn test_tui_tool_requires_something_to_run() {
        let handler = TerminalType::TuiTool.handler();
        assert!(matches!(handler.validate(&request()), Err(SpawnError::Validation(_))));

        let with_tool = SpawnRequest {
            tool: Some("lazygit".to_string()),
            ..request()
        };
        assert!(handler.validate(&with_tool).is_ok());
        assert_eq!(handler.resolve_command(&with_tool).as_deref(), Some("lazygit"));

        let with_commands = SpawnRequest {
            commands: Some(vec!["cd web".to_string(), "npm run dev".to_string()]),
            ..request()
        };
        assert!(handler.validate(&with_commands).is_ok());
        assert_eq!(
            handler.resolve_command(&with_commands).as_deref(),
            Some("cd web && npm run dev")
        );
    }

    #[test]
    fn test_empty_command_entries_rejected() {
        let bad = SpawnRequest {
            commands: Some(vec!["ls".to_string(), "  ".to_string()]),
            ..request()
        };
        assert!(TerminalType::Bash.handler().validate(&bad).is_err());
    }

    #[test]
    fn test_command_resolution_order() {
        let claude = TerminalType::ClaudeCode.handler();
        assert_eq!(claude.resolve_command(&request()).as_deref(), Some("claude"));

        let explicit = SpawnRequest {
            command: Some("claude --resume".to_string()),
            ..request()
        };
        assert_eq!(claude.resolve_command(&explicit).as_deref(), Some("claude --resume"));

        assert_eq!(TerminalType::Bash.handler().resolve_command(&request()), None);
        assert_eq!(
            TerminalType::Dashboard.handler().resolve_command(&request()).as_deref(),
            Some("htop")
        );
    }

    #[test]
    fn test_platform_support() {
        let handler = TerminalType::Bash.handler();
        assert!(handler.supports_platform("local"));
        assert!(handler.supports_platform("LOCAL"));
        assert!(!handler.supports_platform("wsl"));
    }

    #[test]
    fn test_type_from_pane_command() {
        assert_eq!(TerminalType::from_command("claude"), TerminalType::ClaudeCode);
        assert_eq!(TerminalType::from_command("/usr/local/bin/codex --full-auto"), TerminalType::Codex);
        assert_eq!(TerminalType::from_command("zsh"), TerminalType::Bash);
        assert_eq!(TerminalType::from_command(""), TerminalType::Bash);
    }

    #[test]
    fn test_resumable_types() {
        assert!(!TerminalType::Bash.handler().resumable);
        assert!(TerminalType::ClaudeCode.handler().resumable);
        assert!(TerminalType::Codex.handler().resumable);
    }
}
