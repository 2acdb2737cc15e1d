use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::pty::{CommandSpec, PtyError, PtyHandle};

/// Identifier of one attachment. Never reused within a manager, so events
/// from an attachment that has been replaced can be told apart.
pub type AttachmentId = u64;

/// How long the reader thread waits for a child to be reaped after EOF.
const EXIT_REAP_TIMEOUT: Duration = Duration::from_secs(2);

/// Events emitted by attachments into the owner's inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentEvent {
    /// Bytes read from the PTY.
    Output { id: AttachmentId, data: Vec<u8> },
    /// The PTY reached EOF. `exit_code` is `None` when the process was
    /// killed by the manager or could not be reaped.
    Closed {
        id: AttachmentId,
        exit_code: Option<u32>,
        signal: Option<String>,
    },
}

/// What the caller learns about a live attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentInfo {
    pub id: AttachmentId,
    pub pid: Option<u32>,
}

struct Attachment {
    pty: PtyHandle,
}

type AttachmentTable = Arc<Mutex<HashMap<AttachmentId, Attachment>>>;

/// Owns every live PTY attachment.
///
/// Each attachment gets a dedicated reader thread that forwards output and
/// the final close into a bounded channel. Disconnecting starts a grace
/// timer (a tokio task) that kills the attachment unless it is cancelled.
pub struct AttachmentManager {
    attachments: AttachmentTable,
    grace_timers: Arc<Mutex<HashMap<AttachmentId, JoinHandle<()>>>>,
    events: mpsc::Sender<AttachmentEvent>,
    grace_period: Duration,
    next_id: AttachmentId,
}

impl AttachmentManager {
    pub fn new(events: mpsc::Sender<AttachmentEvent>, grace_period: Duration) -> Self {
        Self {
            attachments: Arc::new(Mutex::new(HashMap::new())),
            grace_timers: Arc::new(Mutex::new(HashMap::new())),
            events,
            grace_period,
            next_id: 1,
        }
    }

    /// Spawn a new attachment and start its reader thread.
    pub fn create(&mut self, spec: &CommandSpec) -> Result<AttachmentInfo, PtyError> {
        let id = self.next_id;
        self.next_id += 1;

        let mut pty = PtyHandle::spawn(spec)?;
        let reader = pty
            .take_reader()
            .ok_or_else(|| PtyError::SpawnFailed("PTY reader unavailable".to_string()))?;
        let info = AttachmentInfo { id, pid: pty.pid() };

        {
            let mut attachments = self.attachments.lock().map_err(|_| PtyError::Poisoned)?;
            attachments.insert(
                id,
                Attachment { pty },
            );
        }

        let table = Arc::clone(&self.attachments);
        let events = self.events.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("attach-io-{id}"))
            .spawn(move || read_loop(id, reader, table, events));

        if let Err(e) = spawned {
            self.kill(id);
            return Err(PtyError::SpawnFailed(format!("failed to start reader thread: {e}")));
        }

        log::debug!("attachment {id} created (pid {:?}, {})", info.pid, spec.program);
        Ok(info)
    }

    pub fn write(&mut self, id: AttachmentId, data: &[u8]) -> Result<(), PtyError> {
        let mut attachments = self.attachments.lock().map_err(|_| PtyError::Poisoned)?;
        let attachment = attachments.get_mut(&id).ok_or(PtyError::NotFound(id))?;
        attachment.pty.write(data)
    }

    pub fn resize(&mut self, id: AttachmentId, cols: u16, rows: u16) -> Result<(), PtyError> {
        let attachments = self.attachments.lock().map_err(|_| PtyError::Poisoned)?;
        let attachment = attachments.get(&id).ok_or(PtyError::NotFound(id))?;
        attachment.pty.resize(cols, rows)
    }

    /// Kill the attachment after the grace period unless
    /// [`cancel_disconnect`](Self::cancel_disconnect) or
    /// [`reconnect`](Self::reconnect) is called first.
    pub fn disconnect_with_grace(&mut self, id: AttachmentId) {
        let known = self
            .attachments
            .lock()
            .map(|attachments| attachments.contains_key(&id))
            .unwrap_or(false);
        if !known {
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                log::warn!("no async runtime for grace timer, killing attachment {id} now");
                self.kill(id);
                return;
            }
        };

        let table = Arc::clone(&self.attachments);
        let timers = Arc::clone(&self.grace_timers);
        let grace = self.grace_period;
        let timer = runtime.spawn(async move {
            tokio::time::sleep(grace).await;
            if let Ok(mut timers) = timers.lock() {
                timers.remove(&id);
            }
            let expired = table.lock().ok().and_then(|mut t| t.remove(&id));
            if let Some(mut attachment) = expired {
                log::info!("grace period expired for attachment {id}, killing");
                attachment.pty.kill();
            }
        });

        if let Ok(mut timers) = self.grace_timers.lock() {
            if let Some(previous) = timers.insert(id, timer) {
                previous.abort();
            }
        }
    }

    /// Cancel a pending grace timer. Returns `true` if one was pending.
    pub fn cancel_disconnect(&mut self, id: AttachmentId) -> bool {
        let pending = self
            .grace_timers
            .lock()
            .ok()
            .and_then(|mut timers| timers.remove(&id));

        match pending {
            Some(timer) => {
                timer.abort();
                log::debug!("grace timer cancelled for attachment {id}");
                true
            }
            None => false,
        }
    }

    /// Resume an attachment whose process is still running, cancelling any
    /// pending grace timer. `None` once the process is gone.
    pub fn reconnect(&mut self, id: AttachmentId) -> Option<AttachmentInfo> {
        if !self.is_alive(id) {
            return None;
        }
        self.cancel_disconnect(id);
        let attachments = self.attachments.lock().ok()?;
        attachments.get(&id).map(|a| AttachmentInfo {
            id,
            pid: a.pty.pid(),
        })
    }

    /// Kill and forget an attachment. Unknown ids are ignored.
    pub fn kill(&mut self, id: AttachmentId) {
        if let Some(timer) = self
            .grace_timers
            .lock()
            .ok()
            .and_then(|mut timers| timers.remove(&id))
        {
            timer.abort();
        }

        let removed = self
            .attachments
            .lock()
            .ok()
            .and_then(|mut attachments| attachments.remove(&id));
        if let Some(mut attachment) = removed {
            attachment.pty.kill();
            log::debug!("attachment {id} killed");
        }
    }

    pub fn is_alive(&mut self, id: AttachmentId) -> bool {
        match self.attachments.lock() {
            Ok(mut attachments) => attachments
                .get_mut(&id)
                .map(|a| a.pty.is_alive())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Whether a grace timer is pending for the attachment.
    #[cfg(test)]
    fn is_disconnected(&self, id: AttachmentId) -> bool {
        self.grace_timers
            .lock()
            .map(|timers| timers.contains_key(&id))
            .unwrap_or(false)
    }

    /// List live attachment ids in ascending order.
    pub fn list(&self) -> Vec<AttachmentId> {
        let mut ids: Vec<AttachmentId> = match self.attachments.lock() {
            Ok(attachments) => attachments.keys().copied().collect(),
            Err(_) => Vec::new(),
        };
        ids.sort();
        ids
    }

    /// Kill every attachment. Used on shutdown.
    pub fn kill_all(&mut self) {
        for id in self.list() {
            self.kill(id);
        }
    }
}

/// Blocking read loop run on the attachment's own thread.
///
/// The reader is owned here rather than behind the table lock so a blocked
/// read never stalls writes, resizes, or kills.
fn read_loop(
    id: AttachmentId,
    mut reader: Box<dyn Read + Send>,
    table: AttachmentTable,
    events: mpsc::Sender<AttachmentEvent>,
) {
    let mut buf = [0u8; 65536];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(_) => break, // EIO once the child side closes
        };
        let event = AttachmentEvent::Output {
            id,
            data: buf[..n].to_vec(),
        };
        if events.blocking_send(event).is_err() {
            return; // owner dropped the inbox
        }
    }

    // Still in the table means the process ended on its own; killed
    // attachments were already removed.
    let finished = table.lock().ok().and_then(|mut t| t.remove(&id));
    let (exit_code, signal) = match finished {
        Some(mut attachment) => attachment.pty.wait_exit(EXIT_REAP_TIMEOUT),
        None => (None, None),
    };

    log::debug!("attachment {id} closed (exit {exit_code:?}, signal {signal:?})");
    let _ = events.blocking_send(AttachmentEvent::Closed {
        id,
        exit_code,
        signal,
    });
}
