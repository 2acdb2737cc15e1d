//! The single validated entry point for creating terminals.
//!
//! Every request runs the same short-circuiting pipeline: validation, the
//! rolling rate window, the terminal ceiling, type resolution, dedup, and
//! finally registration. Failures never escape as errors; each one is folded
//! into a [`SpawnResult`] that still carries the request id.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;

use crate::config::Config;
use crate::error::SpawnError;
use crate::registry::{RegistryStats, TerminalRegistry};
use crate::terminal::{expand_home, TerminalConfig, TerminalSnapshot};
use crate::types::{TerminalType, LOCAL_PLATFORM};

const RATE_WINDOW: Duration = Duration::from_secs(60);

/// What a caller asks for. Only `terminalType` is required; anything the
/// gateway does not recognise is kept in `options` and handed through.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpawnRequest {
    pub request_id: Option<String>,
    pub terminal_type: Option<String>,
    pub name: Option<String>,
    pub working_dir: Option<PathBuf>,
    pub session_name: Option<String>,
    pub command: Option<String>,
    pub commands: Option<Vec<String>>,
    pub tool: Option<String>,
    pub env: BTreeMap<String, String>,
    /// Overrides the type's default for multiplexer backing.
    pub persist: Option<bool>,
    pub profile_name: Option<String>,
    pub from_extension: bool,
    pub platform: Option<String>,
    pub cols: Option<u16>,
    pub rows: Option<u16>,
    #[serde(flatten)]
    pub options: BTreeMap<String, Value>,
}

impl SpawnRequest {
    pub fn new(terminal_type: &str) -> Self {
        Self {
            terminal_type: Some(terminal_type.to_string()),
            ..Self::default()
        }
    }

    pub fn named(terminal_type: &str, name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::new(terminal_type)
        }
    }
}

/// The gateway's answer. Always carries `request_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnResult {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal: Option<TerminalSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip)]
    pub failure: Option<SpawnError>,
}

impl SpawnResult {
    fn from_outcome(request_id: String, outcome: Result<TerminalSnapshot, SpawnError>) -> Self {
        match outcome {
            Ok(terminal) => Self {
                success: true,
                request_id,
                terminal: Some(terminal),
                error: None,
                error_kind: None,
                retry_after: None,
                failure: None,
            },
            Err(err) => Self {
                success: false,
                request_id,
                terminal: None,
                error: Some(err.to_string()),
                error_kind: Some(err.kind()),
                retry_after: err.retry_after_secs(),
                failure: Some(err),
            },
        }
    }
}

/// One entry of the bounded spawn history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnRecord {
    pub request_id: String,
    pub terminal_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_id: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub at: DateTime<Utc>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStats {
    pub limit: usize,
    pub used: usize,
    pub remaining: usize,
    pub window_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnStats {
    pub registry: RegistryStats,
    pub rate_limit: RateLimitStats,
    pub max_terminals: usize,
    pub in_flight: usize,
    pub history: Vec<SpawnRecord>,
}

pub struct SpawnGateway {
    rate_limit: usize,
    max_terminals: usize,
    dedup_ttl: Duration,
    history_capacity: usize,
    default_cols: u16,
    default_rows: u16,
    /// Instants of accepted spawns within the trailing window.
    rate_window: VecDeque<Instant>,
    /// Dedup key -> expiry.
    in_flight: HashMap<String, Instant>,
    /// Terminal id -> the dedup entry its spawn created. The expiry tells
    /// this spawn's entry apart from a later one under the same key.
    keys_by_terminal: HashMap<String, (String, Instant)>,
    history: VecDeque<SpawnRecord>,
}

impl SpawnGateway {
    pub fn new(config: &Config) -> Self {
        Self {
            rate_limit: config.rate_limit_per_minute,
            max_terminals: config.max_terminals,
            dedup_ttl: config.dedup_ttl(),
            history_capacity: config.history_capacity,
            default_cols: config.default_cols,
            default_rows: config.default_rows,
            rate_window: VecDeque::new(),
            in_flight: HashMap::new(),
            keys_by_terminal: HashMap::new(),
            history: VecDeque::new(),
        }
    }

    /// Run one spawn request through the pipeline.
    pub fn spawn(&mut self, registry: &mut TerminalRegistry, request: SpawnRequest) -> SpawnResult {
        let started = Instant::now();
        let request_id = request
            .request_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(new_request_id);
        let terminal_type = request
            .terminal_type
            .clone()
            .unwrap_or_else(|| "unknown".to_string());

        let outcome = self.try_spawn(registry, request);
        match &outcome {
            Ok(terminal) => log::info!(
                "spawn {request_id}: {} terminal {} ({:?})",
                terminal.terminal_type,
                terminal.id,
                terminal.name
            ),
            Err(err) => log::warn!("spawn {request_id} rejected: {err}"),
        }

        self.record(SpawnRecord {
            request_id: request_id.clone(),
            terminal_type,
            terminal_id: outcome.as_ref().ok().map(|t| t.id.clone()),
            success: outcome.is_ok(),
            error: outcome.as_ref().err().map(ToString::to_string),
            at: Utc::now(),
            duration_ms: started.elapsed().as_millis() as u64,
        });
        SpawnResult::from_outcome(request_id, outcome)
    }

    fn try_spawn(
        &mut self,
        registry: &mut TerminalRegistry,
        request: SpawnRequest,
    ) -> Result<TerminalSnapshot, SpawnError> {
        let now = Instant::now();

        let type_name = non_blank(request.terminal_type.as_deref())
            .ok_or_else(|| SpawnError::Validation("terminalType is required".to_string()))?
            .to_string();
        let name = match non_blank(request.name.as_deref()) {
            Some(name) => name.to_string(),
            None => format!("{type_name}-{}", Utc::now().format("%Y%m%d-%H%M%S")),
        };
        let working_dir = match &request.working_dir {
            Some(dir) => {
                let expanded = expand_home(dir);
                if !expanded.is_dir() {
                    return Err(SpawnError::Validation(format!(
                        "working directory {} does not exist or is not a directory",
                        expanded.display()
                    )));
                }
                Some(expanded)
            }
            None => None,
        };

        self.prune_rate_window(now);
        if self.rate_window.len() >= self.rate_limit {
            return Err(SpawnError::RateLimit {
                retry_after_secs: self.retry_after(now),
            });
        }

        if registry.get_active_terminal_count() >= self.max_terminals {
            return Err(SpawnError::Capacity {
                limit: self.max_terminals,
            });
        }

        let terminal_type: TerminalType = type_name.parse()?;
        let handler = terminal_type.handler();
        handler.validate(&request)?;

        let platform = non_blank(request.platform.as_deref()).unwrap_or(LOCAL_PLATFORM);
        if !handler.supports_platform(platform) {
            return Err(SpawnError::PlatformUnsupported(platform.to_string()));
        }

        let session_name = non_blank(request.session_name.as_deref()).map(str::to_string);
        let key = dedup_key(terminal_type, &name, session_name.as_deref());
        self.in_flight.retain(|_, expiry| *expiry > now);
        self.keys_by_terminal.retain(|_, (_, expiry)| *expiry > now);
        if self.in_flight.contains_key(&key) {
            return Err(SpawnError::DuplicateSpawn(key));
        }
        let expiry = now + self.dedup_ttl;
        self.in_flight.insert(key.clone(), expiry);

        let mut config = TerminalConfig::new(name, terminal_type);
        config.working_dir = working_dir;
        config.use_multiplexer = request.persist.unwrap_or(handler.resumable);
        config.session_name = session_name;
        config.shell = Some(handler.shell.to_string());
        config.command = handler.resolve_command(&request);
        config.profile_name = request.profile_name.clone();
        config.from_extension = request.from_extension;
        config.cols = request.cols.unwrap_or(self.default_cols);
        config.rows = request.rows.unwrap_or(self.default_rows);
        config.env = request.env;
        config.options = request.options;

        match registry.register_terminal(config) {
            Ok(terminal) => {
                self.rate_window.push_back(now);
                self.keys_by_terminal.insert(terminal.id.clone(), (key, expiry));
                Ok(terminal)
            }
            Err(err) => {
                // A deliberate retry must not be mistaken for a duplicate.
                self.in_flight.remove(&key);
                Err(err.into())
            }
        }
    }

    /// Forget the dedup key of a terminal that has closed, so reopening it
    /// straight away is allowed. A newer spawn holding the same key keeps it.
    pub fn notify_closed(&mut self, terminal_id: &str) {
        let Some((key, expiry)) = self.keys_by_terminal.remove(terminal_id) else {
            return;
        };
        if self.in_flight.get(&key) == Some(&expiry) {
            self.in_flight.remove(&key);
        }
    }

    pub fn stats(&self, registry: &TerminalRegistry) -> SpawnStats {
        let now = Instant::now();
        let used = self
            .rate_window
            .iter()
            .filter(|at| now.duration_since(**at) < RATE_WINDOW)
            .count();
        SpawnStats {
            registry: registry.stats(),
            rate_limit: RateLimitStats {
                limit: self.rate_limit,
                used,
                remaining: self.rate_limit.saturating_sub(used),
                window_secs: RATE_WINDOW.as_secs(),
            },
            max_terminals: self.max_terminals,
            in_flight: self.in_flight.values().filter(|expiry| **expiry > now).count(),
            history: self.history.iter().cloned().collect(),
        }
    }

    fn prune_rate_window(&mut self, now: Instant) {
        while let Some(oldest) = self.rate_window.front() {
            if now.duration_since(*oldest) >= RATE_WINDOW {
                self.rate_window.pop_front();
            } else {
                break;
            }
        }
    }

    /// Whole seconds until the oldest accepted spawn leaves the window.
    fn retry_after(&self, now: Instant) -> u64 {
        let Some(oldest) = self.rate_window.front() else {
            return 1;
        };
        let remaining = RATE_WINDOW.saturating_sub(now.duration_since(*oldest));
        (remaining.as_secs_f64().ceil() as u64).clamp(1, RATE_WINDOW.as_secs())
    }

    fn record(&mut self, record: SpawnRecord) {
        if self.history.len() >= self.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }
}

fn dedup_key(terminal_type: TerminalType, name: &str, session_name: Option<&str>) -> String {
    format!("{terminal_type}|{name}|{}", session_name.unwrap_or(""))
}

fn new_request_id() -> String {
    format!("req-{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
