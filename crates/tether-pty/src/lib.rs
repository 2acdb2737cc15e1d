//! tether-pty: OS-level process attachments for tether terminals.
//!
//! An attachment is one live process on a pseudo-terminal: either a bare
//! shell/CLI, or a `tmux` client attached to a named session. Attachments are
//! disposable; the logical terminal that owns them lives in `tether-core`.
//!
//! # Architecture
//!
//! - [`PtyHandle`]: low-level PTY process management (spawn, write, resize, kill).
//! - [`AttachmentManager`]: owns all live attachments, runs one reader thread
//!   per attachment, and implements the disconnect grace period.

pub mod attachment;
pub mod pty;

pub use attachment::{AttachmentEvent, AttachmentId, AttachmentInfo, AttachmentManager};
pub use pty::{CommandSpec, PtyError, PtyHandle};
