//! The authoritative store of logical terminals.
//!
//! The registry owns every [`Terminal`], decides when an attachment closing
//! means "disconnected, come back later" versus "gone for good", and makes
//! sure each terminal has at most one live attachment. It is a plain owned
//! value: whoever owns it (the app's actor task) serialises all mutations.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tether_pty::{AttachmentEvent, AttachmentId, AttachmentInfo, CommandSpec, PtyError};
use tether_tmux::{sanitize_component, PaneMetadata};
use tokio::sync::broadcast;

use crate::backend::{ProcessAttachment, SessionMultiplexer};
use crate::config::Config;
use crate::error::RegistryError;
use crate::terminal::{expand_home, Terminal, TerminalConfig, TerminalSnapshot, TerminalState};
use crate::types::{TerminalType, BASE_ENV};

const EVENT_CAPACITY: usize = 1024;

/// Something callers may want to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Output { id: String, data: Vec<u8> },
    StateChanged { id: String, state: TerminalState },
    /// The terminal left the registry. Sent exactly once per terminal.
    Closed {
        id: String,
        exit_code: Option<u32>,
        signal: Option<String>,
    },
}

/// Terminal counts for the stats endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub total: usize,
    pub active: usize,
    pub by_state: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
}

pub struct TerminalRegistry {
    terminals: HashMap<String, Terminal>,
    attachments: Box<dyn ProcessAttachment>,
    multiplexer: Box<dyn SessionMultiplexer>,
    multiplexer_available: bool,
    events: broadcast::Sender<RegistryEvent>,
    session_prefix: String,
    reconnect_stagger: Duration,
}

impl TerminalRegistry {
    /// Build a registry. Multiplexer availability is probed once here.
    pub fn new(
        attachments: Box<dyn ProcessAttachment>,
        multiplexer: Box<dyn SessionMultiplexer>,
        config: &Config,
    ) -> Self {
        let multiplexer_available = multiplexer.is_available();
        if !multiplexer_available {
            log::warn!("session multiplexer unavailable, terminals will not persist");
        }
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            terminals: HashMap::new(),
            attachments,
            multiplexer,
            multiplexer_available,
            events,
            session_prefix: config.session_prefix.clone(),
            reconnect_stagger: config.reconnect_stagger(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    pub fn multiplexer_available(&self) -> bool {
        self.multiplexer_available
    }

    // ---- registration ----

    /// Create a terminal, or reattach to the one already backed by
    /// `config.session_name`.
    pub fn register_terminal(
        &mut self,
        mut config: TerminalConfig,
    ) -> Result<TerminalSnapshot, RegistryError> {
        config.working_dir = config.working_dir.as_deref().map(expand_home);

        if let Some(session) = config.session_name.clone() {
            if let Some(id) = self.find_by_session(&session) {
                return self.reattach(&id, config);
            }
        }

        let wants_multiplexer = config.use_multiplexer || config.session_name.is_some();
        let use_multiplexer = wants_multiplexer && self.multiplexer_available;
        if wants_multiplexer && !use_multiplexer {
            log::warn!(
                "persistence requested for {:?} but no multiplexer, spawning a bare process",
                config.name
            );
        }

        let id = self.allocate_id(&config, use_multiplexer);
        if let Some(existing) = self.terminals.get(&id) {
            if existing.state != TerminalState::Error {
                return Err(RegistryError::AlreadyExists(id));
            }
            log::debug!("replacing failed terminal {id}");
            self.terminals.remove(&id);
        }

        if config.name.trim().is_empty() {
            config.name = config.terminal_type.as_str().to_string();
        }
        config.name = self.unique_name(config.name.trim());
        config.use_multiplexer = use_multiplexer;

        let session = use_multiplexer.then(|| id.clone());
        let terminal = Terminal::new(id.clone(), config);
        log::info!("registering terminal {id} ({:?}, {})", terminal.name, terminal.terminal_type);
        self.terminals.insert(id.clone(), terminal);

        let spec = self.command_spec(&id, session.as_deref())?;
        match self.attachments.create(&spec) {
            Ok(info) => {
                if let Some(terminal) = self.terminals.get_mut(&id) {
                    terminal.attachment = Some(info);
                    terminal.multiplexed_session_id = session;
                }
                self.set_state(&id, TerminalState::Active);
                self.snapshot(&id)
            }
            Err(e) => Err(self.fail_attachment(&id, e)),
        }
    }

    /// Rebuild the attachment of an existing multiplexed terminal.
    fn reattach(
        &mut self,
        id: &str,
        config: TerminalConfig,
    ) -> Result<TerminalSnapshot, RegistryError> {
        let (previous, session) = {
            let terminal = self
                .terminals
                .get_mut(id)
                .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
            terminal.config.merge(config);
            (terminal.attachment.take(), terminal.multiplexed_session_id.clone())
        };

        log::info!("reattaching terminal {id} to session {session:?}");
        if let Some(previous) = previous {
            self.attachments.kill(previous.id);
        }

        let spec = self.command_spec(id, session.as_deref())?;
        match self.attachments.create(&spec) {
            Ok(info) => {
                if let Some(terminal) = self.terminals.get_mut(id) {
                    terminal.attachment = Some(info);
                    terminal.exit_code = None;
                    terminal.signal = None;
                    terminal.touch();
                }
                self.set_state(id, TerminalState::Active);
                self.snapshot(id)
            }
            Err(e) => Err(self.fail_attachment(id, e)),
        }
    }

    fn fail_attachment(&mut self, id: &str, err: PtyError) -> RegistryError {
        log::warn!("attachment for terminal {id} failed: {err}");
        self.set_state(id, TerminalState::Error);
        RegistryError::Attachment(err.to_string())
    }

    /// Build the process for a terminal: a multiplexer client when it has a
    /// session, otherwise its shell (running its command, if any).
    fn command_spec(&self, id: &str, session: Option<&str>) -> Result<CommandSpec, RegistryError> {
        let config = &self
            .terminals
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?
            .config;

        let mut env: Vec<(String, String)> = BASE_ENV
            .iter()
            .chain(config.terminal_type.handler().env.iter())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env.extend(config.env.iter().map(|(k, v)| (k.clone(), v.clone())));

        let (program, args) = match session {
            Some(session) => {
                let attach = self.multiplexer.attach_command(
                    session,
                    config.working_dir.as_deref(),
                    config.command.as_deref(),
                );
                (attach.program, attach.args)
            }
            None => {
                let shell = config
                    .shell
                    .clone()
                    .unwrap_or_else(|| config.terminal_type.handler().shell.to_string());
                match &config.command {
                    Some(command) => (shell, vec!["-lc".to_string(), command.clone()]),
                    None => (shell, Vec::new()),
                }
            }
        };

        Ok(CommandSpec {
            program,
            args,
            cwd: config.working_dir.clone(),
            env,
            cols: config.cols,
            rows: config.rows,
        })
    }

    fn allocate_id(&self, config: &TerminalConfig, use_multiplexer: bool) -> String {
        if use_multiplexer {
            if let Some(session) = &config.session_name {
                return session.clone();
            }
        }
        let label = sanitize_component(
            config
                .profile_name
                .as_deref()
                .unwrap_or(config.terminal_type.as_str()),
            "term",
        );
        loop {
            let short = short_id();
            let candidate = if use_multiplexer || config.from_extension {
                format!("{}{label}-{short}", self.session_prefix)
            } else {
                short
            };
            if !self.terminals.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// `base`, or `base-N` for the smallest N >= 2 not held by a live terminal.
    fn unique_name(&self, base: &str) -> String {
        let taken: HashSet<&str> = self
            .terminals
            .values()
            .filter(|t| t.state.holds_name())
            .map(|t| t.name.as_str())
            .collect();
        if !taken.contains(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base}-{n}"))
            .find(|candidate| !taken.contains(candidate.as_str()))
            .unwrap_or_else(|| format!("{base}-{}", short_id()))
    }

    // ---- attachment events ----

    /// Apply one event from the attachment layer.
    pub fn handle_attachment_event(&mut self, event: AttachmentEvent) {
        match event {
            AttachmentEvent::Output { id, data } => {
                let Some(terminal_id) = self.find_by_attachment(id) else {
                    return;
                };
                if let Some(terminal) = self.terminals.get_mut(&terminal_id) {
                    terminal.touch();
                }
                self.emit(RegistryEvent::Output {
                    id: terminal_id,
                    data,
                });
            }
            AttachmentEvent::Closed {
                id,
                exit_code,
                signal,
            } => self.attachment_closed(id, exit_code, signal),
        }
    }

    fn attachment_closed(
        &mut self,
        attachment: AttachmentId,
        exit_code: Option<u32>,
        signal: Option<String>,
    ) {
        let Some(id) = self.find_by_attachment(attachment) else {
            log::debug!("ignoring close of stale attachment {attachment}");
            return;
        };

        let session = match self.terminals.get_mut(&id) {
            Some(terminal) => {
                terminal.attachment = None;
                terminal.exit_code = exit_code;
                terminal.signal = signal.clone();
                terminal.multiplexed_session_id.clone()
            }
            None => return,
        };

        if let Some(session) = session {
            if self.multiplexer.session_exists(&session) {
                log::info!("attachment of {id} closed, session {session} still alive");
                self.set_state(&id, TerminalState::Disconnected);
                return;
            }
            log::info!("session {session} ended, removing terminal {id}");
        } else {
            log::info!("terminal {id} exited (code {exit_code:?}, signal {signal:?})");
        }

        self.terminals.remove(&id);
        self.emit(RegistryEvent::Closed {
            id,
            exit_code,
            signal,
        });
    }

    // ---- disconnect / reconnect ----

    /// A client went away. Multiplexed terminals are left alone; bare ones
    /// start the attachment layer's grace period. A failed terminal has
    /// nothing to come back to and is rejected.
    pub fn disconnect_terminal(&mut self, id: &str) -> Result<(), RegistryError> {
        let terminal = self
            .terminals
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        if terminal.state == TerminalState::Error {
            return Err(RegistryError::InvalidState {
                id: id.to_string(),
                state: terminal.state,
            });
        }
        if terminal.multiplexed_session_id.is_some() {
            log::debug!("disconnect of multiplexed terminal {id} ignored");
            return Ok(());
        }

        let attachment = terminal.attachment;
        self.set_state(id, TerminalState::Disconnected);
        if let Some(attachment) = attachment {
            self.attachments.disconnect_with_grace(attachment.id);
        }
        Ok(())
    }

    /// Cancel a pending grace-period teardown and bring a disconnected
    /// terminal back to `active` the way [`reconnect_to_terminal`] does.
    /// Returns whether a teardown was pending.
    ///
    /// [`reconnect_to_terminal`]: Self::reconnect_to_terminal
    pub fn cancel_disconnect(&mut self, id: &str) -> Result<bool, RegistryError> {
        let terminal = self
            .terminals
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        let (state, attachment) = (terminal.state, terminal.attachment);

        let cancelled = attachment.is_some_and(|a| self.attachments.cancel_disconnect(a.id));
        if state == TerminalState::Disconnected {
            self.reconnect_to_terminal(id, None)?;
        }
        Ok(cancelled)
    }

    /// Bring a terminal back to `active`: resume its attachment while the
    /// process still runs, otherwise attach afresh to its still-running
    /// multiplexer session. `new_id` re-keys a bare terminal.
    pub fn reconnect_to_terminal(
        &mut self,
        id: &str,
        new_id: Option<&str>,
    ) -> Result<TerminalSnapshot, RegistryError> {
        let terminal = self
            .terminals
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        let attachment = terminal.attachment;
        let session = terminal.multiplexed_session_id.clone();

        let resumed = attachment.and_then(|current| self.attachments.reconnect(current.id));

        let info = match resumed {
            Some(info) => info,
            None => match session {
                Some(session) if self.multiplexer.session_exists(&session) => {
                    if let Some(stale) = attachment {
                        self.attachments.kill(stale.id);
                    }
                    if let Some(terminal) = self.terminals.get_mut(id) {
                        terminal.attachment = None;
                    }
                    log::info!("re-attaching terminal {id} to session {session}");
                    let spec = self.command_spec(id, Some(&session))?;
                    match self.attachments.create(&spec) {
                        Ok(info) => info,
                        Err(e) => return Err(self.fail_attachment(id, e)),
                    }
                }
                _ => {
                    return Err(RegistryError::Reconnect {
                        id: id.to_string(),
                        reason: "process has exited and no multiplexer session remains"
                            .to_string(),
                    });
                }
            },
        };

        if let Some(terminal) = self.terminals.get_mut(id) {
            terminal.attachment = Some(info);
            terminal.touch();
        }
        self.set_state(id, TerminalState::Active);

        match new_id.filter(|new_id| *new_id != id) {
            Some(new_id) => self.rekey(id, new_id),
            None => self.snapshot(id),
        }
    }

    fn rekey(&mut self, id: &str, new_id: &str) -> Result<TerminalSnapshot, RegistryError> {
        let multiplexed = self
            .terminals
            .get(id)
            .is_some_and(|t| t.multiplexed_session_id.is_some());
        if multiplexed {
            log::debug!("keeping session id {id} for multiplexed terminal, ignoring {new_id}");
            return self.snapshot(id);
        }
        if self.terminals.contains_key(new_id) {
            return Err(RegistryError::AlreadyExists(new_id.to_string()));
        }
        let mut terminal = self
            .terminals
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        terminal.id = new_id.to_string();
        self.terminals.insert(new_id.to_string(), terminal);
        self.snapshot(new_id)
    }

    /// Make sure a terminal can take input: `active` passes, `disconnected`
    /// is reconnected, anything else is an error.
    pub fn ensure_active(&mut self, id: &str) -> Result<AttachmentInfo, RegistryError> {
        let terminal = self
            .terminals
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        match (terminal.state, terminal.attachment) {
            (TerminalState::Active, Some(attachment)) => Ok(attachment),
            (TerminalState::Disconnected, _) | (TerminalState::Active, None) => {
                log::debug!("implicitly reconnecting terminal {id}");
                self.reconnect_to_terminal(id, None)?;
                self.terminals
                    .get(id)
                    .and_then(|t| t.attachment)
                    .ok_or_else(|| RegistryError::NotFound(id.to_string()))
            }
            (state, _) => Err(RegistryError::InvalidState {
                id: id.to_string(),
                state,
            }),
        }
    }

    // ---- I/O ----

    pub fn send_command(&mut self, id: &str, data: &[u8]) -> Result<(), RegistryError> {
        let attachment = self.ensure_active(id)?;
        self.attachments
            .write(attachment.id, data)
            .map_err(|e| RegistryError::Attachment(e.to_string()))?;
        if let Some(terminal) = self.terminals.get_mut(id) {
            terminal.touch();
        }
        Ok(())
    }

    pub fn resize_terminal(&mut self, id: &str, cols: u16, rows: u16) -> Result<(), RegistryError> {
        let attachment = self.ensure_active(id)?;
        self.attachments
            .resize(attachment.id, cols, rows)
            .map_err(|e| RegistryError::Attachment(e.to_string()))?;
        if let Some(terminal) = self.terminals.get_mut(id) {
            terminal.config.cols = cols;
            terminal.config.rows = rows;
        }
        Ok(())
    }

    // ---- close ----

    /// Close a terminal. Unknown ids succeed.
    ///
    /// Multiplexed: `force` kills the session itself, otherwise only the
    /// attachment is detached and the session stays for a later reattach.
    /// Bare: `force` kills the process, otherwise the grace period starts.
    pub fn close_terminal(&mut self, id: &str, force: bool) -> Result<(), RegistryError> {
        let Some(terminal) = self.terminals.get(id) else {
            return Ok(());
        };

        if terminal.multiplexed_session_id.is_none() && !force && terminal.attachment.is_some() {
            return self.disconnect_terminal(id);
        }

        let Some(terminal) = self.terminals.remove(id) else {
            return Ok(());
        };
        if let Some(attachment) = terminal.attachment {
            self.attachments.kill(attachment.id);
        }
        if let (Some(session), true) = (&terminal.multiplexed_session_id, force) {
            match self.multiplexer.kill_session(session) {
                Ok(_) => log::info!("killed session {session}"),
                Err(e) => log::debug!("kill of session {session} failed: {e}"),
            }
        }

        log::info!("closed terminal {id} (force: {force})");
        self.emit(RegistryEvent::Closed {
            id: id.to_string(),
            exit_code: terminal.exit_code,
            signal: terminal.signal,
        });
        Ok(())
    }

    /// Kill every attachment and forget every terminal. Multiplexer sessions
    /// are left running so their terminals can be recovered on restart.
    pub fn cleanup(&mut self) {
        let count = self.terminals.len();
        self.attachments.kill_all();
        self.terminals.clear();
        log::info!("registry cleaned up ({count} terminals)");
    }

    // ---- multiplexer reconciliation ----

    /// Reconnect several terminals one after another, pausing between them
    /// so they never race to attach to the multiplexer at once.
    pub async fn reconnect_all(
        &mut self,
        ids: &[String],
    ) -> Vec<(String, Result<TerminalSnapshot, RegistryError>)> {
        let mut ordered: Vec<String> = ids.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut results = Vec::with_capacity(ordered.len());
        for (i, id) in ordered.into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.reconnect_stagger).await;
            }
            let result = self.reconnect_to_terminal(&id, None);
            results.push((id, result));
        }
        results
    }

    /// Register every prefixed multiplexer session the registry does not
    /// know yet. This is how terminals come back after a backend restart.
    pub async fn recover_sessions(&mut self) -> Vec<TerminalSnapshot> {
        if !self.multiplexer_available {
            return Vec::new();
        }
        let sessions = match self.multiplexer.list_sessions() {
            Ok(sessions) => sessions,
            Err(e) => {
                log::warn!("could not list multiplexer sessions: {e}");
                return Vec::new();
            }
        };

        let mut orphans: Vec<String> = sessions
            .into_iter()
            .filter(|s| s.starts_with(&self.session_prefix))
            .filter(|s| !self.terminals.contains_key(s) && self.find_by_session(s).is_none())
            .collect();
        orphans.sort();

        let mut recovered = Vec::new();
        for (i, session) in orphans.into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.reconnect_stagger).await;
            }
            let pane = self
                .multiplexer
                .list_panes_metadata(&session)
                .ok()
                .and_then(|panes| panes.into_iter().next());

            let name = session
                .strip_prefix(&self.session_prefix)
                .filter(|rest| !rest.is_empty())
                .unwrap_or(session.as_str())
                .to_string();
            let terminal_type = pane
                .as_ref()
                .map(|p| TerminalType::from_command(&p.command))
                .unwrap_or_default();
            let mut config = TerminalConfig::new(name, terminal_type);
            config.session_name = Some(session.clone());
            config.use_multiplexer = true;
            config.working_dir = pane
                .as_ref()
                .map(|p| p.working_dir.trim())
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from);

            match self.register_terminal(config) {
                Ok(snapshot) => {
                    log::info!("recovered session {session}");
                    recovered.push(snapshot);
                }
                Err(e) => log::warn!("failed to recover session {session}: {e}"),
            }
        }
        recovered
    }

    /// Recent pane output of a multiplexed terminal; empty for bare ones.
    pub fn capture_recent_output(&self, id: &str, lines: u32) -> Result<String, RegistryError> {
        let terminal = self
            .terminals
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        match &terminal.multiplexed_session_id {
            Some(session) => self
                .multiplexer
                .capture_recent_output(session, lines)
                .map_err(|e| RegistryError::Multiplexer(e.to_string())),
            None => Ok(String::new()),
        }
    }

    pub fn pane_metadata(&self, id: &str) -> Result<Vec<PaneMetadata>, RegistryError> {
        let terminal = self
            .terminals
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        match &terminal.multiplexed_session_id {
            Some(session) => self
                .multiplexer
                .list_panes_metadata(session)
                .map_err(|e| RegistryError::Multiplexer(e.to_string())),
            None => Ok(Vec::new()),
        }
    }

    // ---- queries ----

    pub fn get_terminal(&self, id: &str) -> Option<TerminalSnapshot> {
        self.terminals.get(id).map(Terminal::snapshot)
    }

    /// All terminals, oldest first.
    pub fn get_all_terminals(&self) -> Vec<TerminalSnapshot> {
        let mut all: Vec<TerminalSnapshot> = self.terminals.values().map(Terminal::snapshot).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Terminals counting against the capacity ceiling.
    pub fn get_active_terminal_count(&self) -> usize {
        self.terminals
            .values()
            .filter(|t| matches!(t.state, TerminalState::Active | TerminalState::Spawning))
            .count()
    }

    pub fn get_terminals_by_type(&self, terminal_type: TerminalType) -> Vec<TerminalSnapshot> {
        self.get_all_terminals()
            .into_iter()
            .filter(|t| t.terminal_type == terminal_type)
            .collect()
    }

    pub fn get_terminal_by_name(&self, name: &str) -> Option<TerminalSnapshot> {
        self.terminals
            .values()
            .find(|t| t.state.holds_name() && t.name == name)
            .map(Terminal::snapshot)
    }

    pub fn len(&self) -> usize {
        self.terminals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terminals.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        let mut by_state = BTreeMap::new();
        let mut by_type = BTreeMap::new();
        for terminal in self.terminals.values() {
            *by_state.entry(terminal.state.as_str().to_string()).or_insert(0) += 1;
            *by_type.entry(terminal.terminal_type.as_str().to_string()).or_insert(0) += 1;
        }
        RegistryStats {
            total: self.terminals.len(),
            active: self.get_active_terminal_count(),
            by_state,
            by_type,
        }
    }

    // ---- helpers ----

    fn find_by_session(&self, session: &str) -> Option<String> {
        self.terminals
            .values()
            .find(|t| t.multiplexed_session_id.as_deref() == Some(session))
            .map(|t| t.id.clone())
    }

    fn find_by_attachment(&self, attachment: AttachmentId) -> Option<String> {
        self.terminals
            .values()
            .find(|t| t.attachment.is_some_and(|a| a.id == attachment))
            .map(|t| t.id.clone())
    }

    fn set_state(&mut self, id: &str, state: TerminalState) {
        let changed = match self.terminals.get_mut(id) {
            Some(terminal) if terminal.state != state => {
                terminal.state = state;
                true
            }
            _ => false,
        };
        if changed {
            self.emit(RegistryEvent::StateChanged {
                id: id.to_string(),
                state,
            });
        }
    }

    fn snapshot(&self, id: &str) -> Result<TerminalSnapshot, RegistryError> {
        self.get_terminal(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    fn emit(&self, event: RegistryEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn short_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}
