mod ipc;
mod state;

use tether_core::{Config, SpawnGateway, TerminalRegistry};
use tether_pty::AttachmentManager;
use tether_tmux::TmuxClient;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tracing_subscriber::EnvFilter;

use ipc::ServerMessage;
use state::AppState;

/// Capacity of the inbox carrying attachment output and exits.
const ATTACHMENT_INBOX: usize = 1024;
const OUTBOX: usize = 1024;

#[tokio::main]
async fn main() {
    init_logging();

    let config = match Config::load_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("fatal: {e}");
            std::process::exit(1);
        }
    };

    let (attach_tx, mut attach_rx) = mpsc::channel(ATTACHMENT_INBOX);
    let attachments = AttachmentManager::new(attach_tx, config.grace_period());
    let tmux = TmuxClient::new(Some(&config.tmux_command), config.tmux_args.clone());
    let registry = TerminalRegistry::new(Box::new(attachments), Box::new(tmux), &config);
    let mut events = registry.subscribe();
    let mut state = AppState::new(registry, SpawnGateway::new(&config));

    let (out_tx, out_rx) = mpsc::channel(OUTBOX);
    let writer = tokio::spawn(write_messages(out_rx));

    log::info!(
        "tether ready (rate limit {}/min, max {} terminals)",
        config.rate_limit_per_minute,
        config.max_terminals
    );
    let _ = out_tx.send(state.recover().await).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let reply = match ipc::parse_request(&line) {
                        Ok(request) => state.handle(request).await,
                        Err(e) => ServerMessage::error(None, format!("invalid command: {e}")),
                    };
                    let _ = out_tx.send(reply).await;
                }
                Ok(None) => {
                    log::info!("stdin closed, shutting down");
                    break;
                }
                Err(e) => {
                    log::warn!("failed to read stdin: {e}");
                    break;
                }
            },
            Some(event) = attach_rx.recv() => state.attachment_event(event),
            event = events.recv() => match event {
                Ok(event) => {
                    let message = state.registry_event(event);
                    let _ = out_tx.send(message).await;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("dropped {skipped} registry events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = &mut shutdown => {
                log::info!("interrupted, shutting down");
                break;
            }
        }
    }

    state.shutdown();
    drop(out_tx);
    let _ = writer.await;
}

/// Logs go to stderr; stdout carries the protocol.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn write_messages(mut rx: mpsc::Receiver<ServerMessage>) {
    let mut stdout = tokio::io::stdout();
    while let Some(message) = rx.recv().await {
        let mut line = match ipc::encode_message(&message) {
            Ok(line) => line,
            Err(e) => {
                log::warn!("failed to encode message: {e}");
                continue;
            }
        };
        line.push('\n');
        if stdout.write_all(line.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
            log::warn!("stdout closed, dropping output");
            return;
        }
    }
}
