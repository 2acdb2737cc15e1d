//! Application state owned by the actor loop.
//!
//! Nothing else touches the registry or the gateway: commands, attachment
//! events and registry events are all applied here, one at a time.

use tether_core::{RegistryEvent, SpawnGateway, TerminalRegistry};
use tether_pty::AttachmentEvent;

use crate::ipc::{ClientCommand, ReconnectOutcome, Request, ServerMessage};

pub struct AppState {
    registry: TerminalRegistry,
    gateway: SpawnGateway,
}

impl AppState {
    pub fn new(registry: TerminalRegistry, gateway: SpawnGateway) -> Self {
        Self { registry, gateway }
    }

    #[cfg(test)]
    pub fn registry(&self) -> &TerminalRegistry {
        &self.registry
    }

    /// Apply one command and build its reply.
    pub async fn handle(&mut self, request: Request) -> ServerMessage {
        let seq = request.seq;
        let registry = &mut self.registry;

        match request.command {
            ClientCommand::Spawn(spawn) => ServerMessage::SpawnResult {
                seq,
                result: self.gateway.spawn(registry, spawn),
            },
            ClientCommand::Write { id, data } => match registry.send_command(&id, data.as_bytes()) {
                Ok(()) => ServerMessage::Ok { seq },
                Err(e) => ServerMessage::error(seq, e),
            },
            ClientCommand::Resize { id, cols, rows } => {
                match registry.resize_terminal(&id, cols, rows) {
                    Ok(()) => ServerMessage::Ok { seq },
                    Err(e) => ServerMessage::error(seq, e),
                }
            }
            ClientCommand::Disconnect { id } => match registry.disconnect_terminal(&id) {
                Ok(()) => ServerMessage::Ok { seq },
                Err(e) => ServerMessage::error(seq, e),
            },
            ClientCommand::CancelDisconnect { id } => match registry.cancel_disconnect(&id) {
                Ok(cancelled) => ServerMessage::Cancelled { seq, cancelled },
                Err(e) => ServerMessage::error(seq, e),
            },
            ClientCommand::Reconnect { id, new_id } => {
                match registry.reconnect_to_terminal(&id, new_id.as_deref()) {
                    Ok(terminal) => ServerMessage::Terminal { seq, terminal },
                    Err(e) => ServerMessage::error(seq, e),
                }
            }
            ClientCommand::ReconnectAll { ids } => {
                let results = registry
                    .reconnect_all(&ids)
                    .await
                    .into_iter()
                    .map(|(id, result)| match result {
                        Ok(terminal) => ReconnectOutcome {
                            id,
                            terminal: Some(terminal),
                            error: None,
                        },
                        Err(e) => ReconnectOutcome {
                            id,
                            terminal: None,
                            error: Some(e.to_string()),
                        },
                    })
                    .collect();
                ServerMessage::Reconnected { seq, results }
            }
            ClientCommand::Close { id, force } => match registry.close_terminal(&id, force) {
                Ok(()) => ServerMessage::Ok { seq },
                Err(e) => ServerMessage::error(seq, e),
            },
            ClientCommand::List { terminal_type } => ServerMessage::Terminals {
                seq,
                terminals: match terminal_type {
                    Some(terminal_type) => registry.get_terminals_by_type(terminal_type),
                    None => registry.get_all_terminals(),
                },
            },
            ClientCommand::Get { id, name } => {
                let found = match (id.as_deref(), name.as_deref()) {
                    (Some(id), _) => registry.get_terminal(id),
                    (None, Some(name)) => registry.get_terminal_by_name(name),
                    (None, None) => return ServerMessage::error(seq, "get needs an id or a name"),
                };
                match found {
                    Some(terminal) => ServerMessage::Terminal { seq, terminal },
                    None => ServerMessage::error(
                        seq,
                        format!("terminal {} not found", id.or(name).unwrap_or_default()),
                    ),
                }
            }
            ClientCommand::Stats => ServerMessage::Stats {
                seq,
                stats: self.gateway.stats(registry),
            },
            ClientCommand::Capture { id, lines } => match registry.capture_recent_output(&id, lines) {
                Ok(text) => ServerMessage::Capture { seq, id, text },
                Err(e) => ServerMessage::error(seq, e),
            },
            ClientCommand::Panes { id } => match registry.pane_metadata(&id) {
                Ok(panes) => ServerMessage::Panes { seq, id, panes },
                Err(e) => ServerMessage::error(seq, e),
            },
        }
    }

    pub fn attachment_event(&mut self, event: AttachmentEvent) {
        self.registry.handle_attachment_event(event);
    }

    /// Turn a registry event into an outgoing message, keeping the gateway's
    /// dedup table in step with terminals that have gone away.
    pub fn registry_event(&mut self, event: RegistryEvent) -> ServerMessage {
        if let RegistryEvent::Closed { id, .. } = &event {
            self.gateway.notify_closed(id);
        }
        event.into()
    }

    pub async fn recover(&mut self) -> ServerMessage {
        let terminals = self.registry.recover_sessions().await;
        if !terminals.is_empty() {
            log::info!("recovered {} terminal(s) from surviving sessions", terminals.len());
        }
        ServerMessage::Recovered { terminals }
    }

    pub fn shutdown(&mut self) {
        self.registry.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::parse_request;
    use tether_core::Config;
    use tether_pty::AttachmentManager;
    use tether_tmux::TmuxClient;
    use tokio::sync::mpsc;

    /// State backed by real attachments and a tmux binary that does not exist.
    fn state() -> AppState {
        let config = Config::default();
        let (tx, _rx) = mpsc::channel(16);
        let attachments = AttachmentManager::new(tx, config.grace_period());
        let tmux = TmuxClient::new(Some("tether-test-no-such-tmux"), Vec::new());
        let registry = TerminalRegistry::new(Box::new(attachments), Box::new(tmux), &config);
        AppState::new(registry, SpawnGateway::new(&config))
    }

    async fn send(state: &mut AppState, line: &str) -> ServerMessage {
        state.handle(parse_request(line).unwrap()).await
    }

    #[tokio::test]
    async fn test_queries_on_empty_state() {
        let mut state = state();

        assert_eq!(
            send(&mut state, r#"{"type":"list","seq":1}"#).await,
            ServerMessage::Terminals {
                seq: Some(1),
                terminals: Vec::new()
            }
        );
        assert_eq!(
            send(&mut state, r#"{"type":"close","seq":2,"id":"nope","force":true}"#).await,
            ServerMessage::Ok { seq: Some(2) }
        );
        assert!(matches!(
            send(&mut state, r#"{"type":"get","seq":3,"id":"nope"}"#).await,
            ServerMessage::Error { seq: Some(3), .. }
        ));
        assert!(matches!(
            send(&mut state, r#"{"type":"get","seq":4}"#).await,
            ServerMessage::Error { seq: Some(4), .. }
        ));
        assert!(matches!(
            send(&mut state, r#"{"type":"write","id":"nope","data":"ls\n"}"#).await,
            ServerMessage::Error { seq: None, .. }
        ));
    }

    #[tokio::test]
    async fn test_rejected_spawn_is_a_spawn_result() {
        let mut state = state();

        let reply = send(&mut state, r#"{"type":"spawn","seq":9,"terminalType":"emacs"}"#).await;

        let ServerMessage::SpawnResult { seq, result } = reply else {
            panic!("expected spawnResult, got {reply:?}");
        };
        assert_eq!(seq, Some(9));
        assert!(!result.success);
        assert_eq!(result.error_kind, Some("UnknownTypeError"));
        assert!(state.registry().is_empty());
    }

    #[tokio::test]
    async fn test_stats_and_recovery_without_multiplexer() {
        let mut state = state();

        let ServerMessage::Stats { stats, .. } = send(&mut state, r#"{"type":"stats"}"#).await else {
            panic!("expected stats");
        };
        assert_eq!(stats.registry.total, 0);
        assert_eq!(stats.rate_limit.remaining, stats.rate_limit.limit);

        assert_eq!(
            state.recover().await,
            ServerMessage::Recovered {
                terminals: Vec::new()
            }
        );
        assert!(!state.registry().multiplexer_available());
    }

    #[tokio::test]
    async fn test_closed_event_is_forwarded() {
        let mut state = state();

        let message = state.registry_event(RegistryEvent::Closed {
            id: "t1".to_string(),
            exit_code: Some(1),
            signal: None,
        });
        assert_eq!(
            message,
            ServerMessage::Closed {
                id: "t1".to_string(),
                exit_code: Some(1),
                signal: None
            }
        );
    }
}
