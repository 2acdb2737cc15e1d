//! tether-tmux: the tmux CLI as seen by tether.
//!
//! Sessions created here outlive any single PTY attachment, which is what lets
//! a terminal survive client reconnects and backend restarts.

pub mod client;
pub mod panes;

pub use client::{sanitize_component, AttachCommand, TmuxClient, TmuxError};
pub use panes::{parse_panes, PaneMetadata, PANE_FORMAT};
