//! tether-core: the terminal session orchestration layer.
//!
//! # Architecture
//!
//! - [`TerminalRegistry`]: owns every logical terminal and its state machine
//!   (`spawning` → `active` ⇄ `disconnected`, or `error`); decides between
//!   "disconnected" and "gone" by asking the multiplexer.
//! - [`SpawnGateway`]: validated entry point for new terminals: rate window,
//!   terminal ceiling, type table, dedup, spawn history.
//! - [`backend`]: the [`ProcessAttachment`] and [`SessionMultiplexer`] traits
//!   the registry drives, implemented by `tether-pty` and `tether-tmux`.
//! - [`types`]: the static per-type table.
//! - [`config`]: settings file.

pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod registry;
pub mod terminal;
pub mod types;

#[cfg(test)]
mod test_support;

pub use backend::{ProcessAttachment, SessionMultiplexer};
pub use config::{Config, ConfigError};
pub use error::{RegistryError, SpawnError};
pub use gateway::{SpawnGateway, SpawnRecord, SpawnRequest, SpawnResult, SpawnStats};
pub use registry::{RegistryEvent, RegistryStats, TerminalRegistry};
pub use terminal::{TerminalConfig, TerminalSnapshot, TerminalState};
pub use types::TerminalType;
