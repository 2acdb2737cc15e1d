//! The two collaborators the registry drives: the process attachment layer
//! and the session multiplexer. The registry only sees these traits.

use std::path::Path;

use tether_pty::{AttachmentId, AttachmentInfo, AttachmentManager, CommandSpec, PtyError};
use tether_tmux::{AttachCommand, PaneMetadata, TmuxClient, TmuxError};

/// Creates and drives OS-level attachments.
pub trait ProcessAttachment: Send {
    fn create(&mut self, spec: &CommandSpec) -> Result<AttachmentInfo, PtyError>;
    fn write(&mut self, id: AttachmentId, data: &[u8]) -> Result<(), PtyError>;
    fn resize(&mut self, id: AttachmentId, cols: u16, rows: u16) -> Result<(), PtyError>;
    /// Start the grace-period teardown of an attachment.
    fn disconnect_with_grace(&mut self, id: AttachmentId);
    /// Returns `true` if a grace timer was pending.
    fn cancel_disconnect(&mut self, id: AttachmentId) -> bool;
    /// Resume an attachment while its process still runs, cancelling any
    /// pending grace timer.
    fn reconnect(&mut self, id: AttachmentId) -> Option<AttachmentInfo>;
    fn kill(&mut self, id: AttachmentId);
    fn kill_all(&mut self);
}

/// Facts about, and commands to, independently persisting sessions.
pub trait SessionMultiplexer: Send {
    fn is_available(&self) -> bool;
    /// Must answer `false` when the check itself fails.
    fn session_exists(&self, name: &str) -> bool;
    fn kill_session(&self, name: &str) -> Result<bool, TmuxError>;
    fn list_sessions(&self) -> Result<Vec<String>, TmuxError>;
    fn list_panes_metadata(&self, session: &str) -> Result<Vec<PaneMetadata>, TmuxError>;
    fn capture_recent_output(&self, session: &str, lines: u32) -> Result<String, TmuxError>;
    fn attach_command(
        &self,
        session: &str,
        cwd: Option<&Path>,
        initial_command: Option<&str>,
    ) -> AttachCommand;
}

impl ProcessAttachment for AttachmentManager {
    fn create(&mut self, spec: &CommandSpec) -> Result<AttachmentInfo, PtyError> {
        AttachmentManager::create(self, spec)
    }

    fn write(&mut self, id: AttachmentId, data: &[u8]) -> Result<(), PtyError> {
        AttachmentManager::write(self, id, data)
    }

    fn resize(&mut self, id: AttachmentId, cols: u16, rows: u16) -> Result<(), PtyError> {
        AttachmentManager::resize(self, id, cols, rows)
    }

    fn disconnect_with_grace(&mut self, id: AttachmentId) {
        AttachmentManager::disconnect_with_grace(self, id)
    }

    fn cancel_disconnect(&mut self, id: AttachmentId) -> bool {
        AttachmentManager::cancel_disconnect(self, id)
    }

    fn reconnect(&mut self, id: AttachmentId) -> Option<AttachmentInfo> {
        AttachmentManager::reconnect(self, id)
    }

    fn kill(&mut self, id: AttachmentId) {
        AttachmentManager::kill(self, id)
    }

    fn kill_all(&mut self) {
        AttachmentManager::kill_all(self)
    }
}

impl SessionMultiplexer for TmuxClient {
    fn is_available(&self) -> bool {
        TmuxClient::is_available(self)
    }

    fn session_exists(&self, name: &str) -> bool {
        TmuxClient::session_exists(self, name)
    }

    fn kill_session(&self, name: &str) -> Result<bool, TmuxError> {
        TmuxClient::kill_session(self, name)
    }

    fn list_sessions(&self) -> Result<Vec<String>, TmuxError> {
        TmuxClient::list_sessions(self)
    }

    fn list_panes_metadata(&self, session: &str) -> Result<Vec<PaneMetadata>, TmuxError> {
        TmuxClient::list_panes_metadata(self, session)
    }

    fn capture_recent_output(&self, session: &str, lines: u32) -> Result<String, TmuxError> {
        TmuxClient::capture_recent_output(self, session, lines)
    }

    fn attach_command(
        &self,
        session: &str,
        cwd: Option<&Path>,
        initial_command: Option<&str>,
    ) -> AttachCommand {
        TmuxClient::attach_command(self, session, cwd, initial_command)
    }
}
