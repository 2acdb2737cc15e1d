//! Control protocol: one JSON object per line on stdin, one per line on
//! stdout.
//!
//! Every command may carry a `seq` number; its reply echoes it. Events
//! (`output`, `stateChanged`, `closed`) are unsolicited and carry no `seq`.

use serde::{Deserialize, Serialize};
use tether_core::{
    RegistryEvent, SpawnRequest, SpawnResult, SpawnStats, TerminalSnapshot, TerminalState,
    TerminalType,
};
use tether_tmux::PaneMetadata;

pub const DEFAULT_CAPTURE_LINES: u32 = 200;

/// A command line as read from stdin.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub seq: Option<u64>,
    #[serde(flatten)]
    pub command: ClientCommand,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    Spawn(SpawnRequest),
    Write {
        id: String,
        data: String,
    },
    Resize {
        id: String,
        cols: u16,
        rows: u16,
    },
    Disconnect {
        id: String,
    },
    CancelDisconnect {
        id: String,
    },
    Reconnect {
        id: String,
        #[serde(default)]
        new_id: Option<String>,
    },
    ReconnectAll {
        ids: Vec<String>,
    },
    Close {
        id: String,
        #[serde(default)]
        force: bool,
    },
    List {
        #[serde(default)]
        terminal_type: Option<TerminalType>,
    },
    Get {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
    Stats,
    Capture {
        id: String,
        #[serde(default = "default_capture_lines")]
        lines: u32,
    },
    Panes {
        id: String,
    },
}

fn default_capture_lines() -> u32 {
    DEFAULT_CAPTURE_LINES
}

/// Per-terminal outcome of a `reconnectAll`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectOutcome {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal: Option<TerminalSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything written to stdout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    SpawnResult {
        #[serde(skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
        #[serde(flatten)]
        result: SpawnResult,
    },
    Ok {
        #[serde(skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
        message: String,
    },
    Terminal {
        #[serde(skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
        terminal: TerminalSnapshot,
    },
    Terminals {
        #[serde(skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
        terminals: Vec<TerminalSnapshot>,
    },
    Cancelled {
        #[serde(skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
        cancelled: bool,
    },
    Reconnected {
        #[serde(skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
        results: Vec<ReconnectOutcome>,
    },
    Stats {
        #[serde(skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
        stats: SpawnStats,
    },
    Capture {
        #[serde(skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
        id: String,
        text: String,
    },
    Panes {
        #[serde(skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
        id: String,
        panes: Vec<PaneMetadata>,
    },
    /// Terminals re-registered from surviving multiplexer sessions at startup.
    Recovered {
        terminals: Vec<TerminalSnapshot>,
    },
    Output {
        id: String,
        /// Raw bytes as lossy UTF-8.
        data: String,
    },
    StateChanged {
        id: String,
        state: TerminalState,
    },
    Closed {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        signal: Option<String>,
    },
}

impl ServerMessage {
    pub fn error(seq: Option<u64>, err: impl std::fmt::Display) -> Self {
        ServerMessage::Error {
            seq,
            message: err.to_string(),
        }
    }
}

impl From<RegistryEvent> for ServerMessage {
    fn from(event: RegistryEvent) -> Self {
        match event {
            RegistryEvent::Output { id, data } => ServerMessage::Output {
                id,
                data: String::from_utf8_lossy(&data).into_owned(),
            },
            RegistryEvent::StateChanged { id, state } => ServerMessage::StateChanged { id, state },
            RegistryEvent::Closed {
                id,
                exit_code,
                signal,
            } => ServerMessage::Closed {
                id,
                exit_code,
                signal,
            },
        }
    }
}

/// Parse one protocol line.
pub fn parse_request(line: &str) -> Result<Request, serde_json::Error> {
    serde_json::from_str(line)
}

/// Serialize a message to a single line, without the trailing newline.
pub fn encode_message(message: &ServerMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn encoded(message: &ServerMessage) -> Value {
        serde_json::from_str(&encode_message(message).unwrap()).unwrap()
    }

    #[test]
    fn test_parse_spawn_keeps_extra_options() {
        let request = parse_request(
            r#"{"type":"spawn","seq":7,"terminalType":"bash","name":"Shell","theme":"amber"}"#,
        )
        .unwrap();

        assert_eq!(request.seq, Some(7));
        let ClientCommand::Spawn(spawn) = request.command else {
            panic!("expected spawn, got {:?}", request.command);
        };
        assert_eq!(spawn.terminal_type.as_deref(), Some("bash"));
        assert_eq!(spawn.name.as_deref(), Some("Shell"));
        assert_eq!(spawn.options.get("theme"), Some(&json!("amber")));
        assert!(!spawn.options.contains_key("seq"));
        assert!(!spawn.options.contains_key("type"));
    }

    #[test]
    fn test_parse_commands_with_defaults() {
        let close = parse_request(r#"{"type":"close","id":"t1"}"#).unwrap();
        assert_eq!(
            close.command,
            ClientCommand::Close {
                id: "t1".to_string(),
                force: false
            }
        );
        assert_eq!(close.seq, None);

        let reconnect = parse_request(r#"{"type":"reconnect","id":"t1","newId":"t2"}"#).unwrap();
        assert_eq!(
            reconnect.command,
            ClientCommand::Reconnect {
                id: "t1".to_string(),
                new_id: Some("t2".to_string())
            }
        );

        let capture = parse_request(r#"{"type":"capture","id":"sess-1"}"#).unwrap();
        assert_eq!(
            capture.command,
            ClientCommand::Capture {
                id: "sess-1".to_string(),
                lines: DEFAULT_CAPTURE_LINES
            }
        );

        let list = parse_request(r#"{"type":"list","terminalType":"claude-code"}"#).unwrap();
        assert_eq!(
            list.command,
            ClientCommand::List {
                terminal_type: Some(TerminalType::ClaudeCode)
            }
        );

        let stats = parse_request(r#"{"type":"stats","seq":3}"#).unwrap();
        assert_eq!(stats.command, ClientCommand::Stats);

        let all = parse_request(r#"{"type":"reconnectAll","ids":["a","b"]}"#).unwrap();
        assert!(matches!(all.command, ClientCommand::ReconnectAll { ids } if ids.len() == 2));
    }

    #[test]
    fn test_parse_rejects_unknown_and_incomplete() {
        assert!(parse_request(r#"{"type":"explode"}"#).is_err());
        assert!(parse_request(r#"{"type":"resize","id":"t1"}"#).is_err());
        assert!(parse_request("not json").is_err());
    }

    #[test]
    fn test_reply_shapes() {
        assert_eq!(encoded(&ServerMessage::Ok { seq: Some(1) }), json!({"type": "ok", "seq": 1}));
        assert_eq!(
            encoded(&ServerMessage::error(None, "terminal t9 not found")),
            json!({"type": "error", "message": "terminal t9 not found"})
        );
        assert_eq!(
            encoded(&ServerMessage::Cancelled {
                seq: Some(2),
                cancelled: false
            }),
            json!({"type": "cancelled", "seq": 2, "cancelled": false})
        );
    }

    #[test]
    fn test_registry_events_become_messages() {
        let output: ServerMessage = RegistryEvent::Output {
            id: "t1".to_string(),
            data: vec![b'h', b'i', 0xff],
        }
        .into();
        assert_eq!(
            encoded(&output),
            json!({"type": "output", "id": "t1", "data": "hi\u{fffd}"})
        );

        let state: ServerMessage = RegistryEvent::StateChanged {
            id: "sess-1".to_string(),
            state: TerminalState::Disconnected,
        }
        .into();
        assert_eq!(
            encoded(&state),
            json!({"type": "stateChanged", "id": "sess-1", "state": "disconnected"})
        );

        let closed: ServerMessage = RegistryEvent::Closed {
            id: "sess-1".to_string(),
            exit_code: Some(0),
            signal: None,
        }
        .into();
        assert_eq!(
            encoded(&closed),
            json!({"type": "closed", "id": "sess-1", "exitCode": 0})
        );
    }
}
