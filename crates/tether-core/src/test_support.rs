//! In-memory stand-ins for the attachment layer and the multiplexer.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tether_pty::{AttachmentId, AttachmentInfo, CommandSpec, PtyError};
use tether_tmux::{AttachCommand, PaneMetadata, TmuxError};

use crate::backend::{ProcessAttachment, SessionMultiplexer};
use crate::config::Config;
use crate::registry::TerminalRegistry;

#[derive(Debug, Default)]
pub struct FakeAttachState {
    pub next_id: AttachmentId,
    pub alive: BTreeSet<AttachmentId>,
    pub grace_pending: HashSet<AttachmentId>,
    pub killed: Vec<AttachmentId>,
    pub created: Vec<CommandSpec>,
    pub writes: Vec<(AttachmentId, Vec<u8>)>,
    pub resizes: Vec<(AttachmentId, u16, u16)>,
    pub fail_next_create: bool,
}

/// Records every call; processes "exit" only when a test says so.
#[derive(Debug, Clone, Default)]
pub struct FakeAttachments(Arc<Mutex<FakeAttachState>>);

impl FakeAttachments {
    pub fn state(&self) -> MutexGuard<'_, FakeAttachState> {
        self.0.lock().unwrap()
    }

    pub fn created(&self) -> Vec<CommandSpec> {
        self.state().created.clone()
    }

    pub fn fail_next_create(&self) {
        self.state().fail_next_create = true;
    }

    /// The process behind `id` ended on its own.
    pub fn exit(&self, id: AttachmentId) {
        let mut state = self.state();
        state.alive.remove(&id);
        state.grace_pending.remove(&id);
    }
}

impl ProcessAttachment for FakeAttachments {
    fn create(&mut self, spec: &CommandSpec) -> Result<AttachmentInfo, PtyError> {
        let mut state = self.state();
        if std::mem::take(&mut state.fail_next_create) {
            return Err(PtyError::SpawnFailed("no such program".to_string()));
        }
        state.next_id += 1;
        let id = state.next_id;
        state.alive.insert(id);
        state.created.push(spec.clone());
        Ok(AttachmentInfo {
            id,
            pid: Some(1000 + id as u32),
        })
    }

    fn write(&mut self, id: AttachmentId, data: &[u8]) -> Result<(), PtyError> {
        let mut state = self.state();
        if !state.alive.contains(&id) {
            return Err(PtyError::NotFound(id));
        }
        state.writes.push((id, data.to_vec()));
        Ok(())
    }

    fn resize(&mut self, id: AttachmentId, cols: u16, rows: u16) -> Result<(), PtyError> {
        let mut state = self.state();
        if !state.alive.contains(&id) {
            return Err(PtyError::NotFound(id));
        }
        state.resizes.push((id, cols, rows));
        Ok(())
    }

    fn disconnect_with_grace(&mut self, id: AttachmentId) {
        let mut state = self.state();
        if state.alive.contains(&id) {
            state.grace_pending.insert(id);
        }
    }

    fn cancel_disconnect(&mut self, id: AttachmentId) -> bool {
        self.state().grace_pending.remove(&id)
    }

    fn reconnect(&mut self, id: AttachmentId) -> Option<AttachmentInfo> {
        let mut state = self.state();
        if !state.alive.contains(&id) {
            return None;
        }
        state.grace_pending.remove(&id);
        Some(AttachmentInfo {
            id,
            pid: Some(1000 + id as u32),
        })
    }

    fn kill(&mut self, id: AttachmentId) {
        let mut state = self.state();
        if state.alive.remove(&id) {
            state.killed.push(id);
        }
        state.grace_pending.remove(&id);
    }

    fn kill_all(&mut self) {
        let mut state = self.state();
        let ids: Vec<AttachmentId> = state.alive.iter().copied().collect();
        state.killed.extend(ids);
        state.alive.clear();
        state.grace_pending.clear();
    }
}

#[derive(Debug, Default)]
pub struct FakeMuxState {
    pub unavailable: bool,
    pub sessions: BTreeSet<String>,
    pub panes: BTreeMap<String, PaneMetadata>,
    pub fail_kills: bool,
}

/// A multiplexer whose sessions are a set of names. Building an attach
/// command creates the session, as `new-session -A` would once run.
#[derive(Debug, Clone, Default)]
pub struct FakeMultiplexer(Arc<Mutex<FakeMuxState>>);

impl FakeMultiplexer {
    pub fn unavailable() -> Self {
        let mux = Self::default();
        mux.state().unavailable = true;
        mux
    }

    fn state(&self) -> MutexGuard<'_, FakeMuxState> {
        self.0.lock().unwrap()
    }

    pub fn has_session(&self, name: &str) -> bool {
        self.state().sessions.contains(name)
    }

    pub fn add_session(&self, name: &str) {
        self.state().sessions.insert(name.to_string());
    }

    pub fn end_session(&self, name: &str) {
        self.state().sessions.remove(name);
    }

    pub fn set_pane(&self, session: &str, working_dir: &str, command: &str) {
        self.state().panes.insert(
            session.to_string(),
            PaneMetadata {
                pane_id: "%0".to_string(),
                working_dir: working_dir.to_string(),
                command: command.to_string(),
                title: String::new(),
            },
        );
    }

    pub fn fail_kills(&self) {
        self.state().fail_kills = true;
    }
}

impl SessionMultiplexer for FakeMultiplexer {
    fn is_available(&self) -> bool {
        !self.state().unavailable
    }

    fn session_exists(&self, name: &str) -> bool {
        self.has_session(name)
    }

    fn kill_session(&self, name: &str) -> Result<bool, TmuxError> {
        let mut state = self.state();
        if state.fail_kills {
            return Err(TmuxError::Failed {
                args: format!("kill-session -t ={name}"),
                stderr: "server exited unexpectedly".to_string(),
            });
        }
        Ok(state.sessions.remove(name))
    }

    fn list_sessions(&self) -> Result<Vec<String>, TmuxError> {
        Ok(self.state().sessions.iter().cloned().collect())
    }

    fn list_panes_metadata(&self, session: &str) -> Result<Vec<PaneMetadata>, TmuxError> {
        Ok(self.state().panes.get(session).cloned().into_iter().collect())
    }

    fn capture_recent_output(&self, session: &str, lines: u32) -> Result<String, TmuxError> {
        Ok(format!("{session}:{lines}"))
    }

    fn attach_command(
        &self,
        session: &str,
        _cwd: Option<&Path>,
        _initial_command: Option<&str>,
    ) -> AttachCommand {
        self.add_session(session);
        AttachCommand {
            program: "tmux".to_string(),
            args: vec![
                "new-session".to_string(),
                "-A".to_string(),
                "-s".to_string(),
                session.to_string(),
            ],
        }
    }
}

pub fn registry_with_fakes() -> (TerminalRegistry, FakeAttachments, FakeMultiplexer) {
    registry_with_config(&Config::default())
}

pub fn registry_with_config(config: &Config) -> (TerminalRegistry, FakeAttachments, FakeMultiplexer) {
    let attachments = FakeAttachments::default();
    let mux = FakeMultiplexer::default();
    let registry = TerminalRegistry::new(Box::new(attachments.clone()), Box::new(mux.clone()), config);
    (registry, attachments, mux)
}
