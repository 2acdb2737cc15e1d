//! Orchestrator settings, read from a JSON file with every field defaulted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "TETHER_CONFIG";

pub const DEFAULT_RATE_LIMIT_PER_MINUTE: usize = 10;
pub const DEFAULT_MAX_TERMINALS: usize = 50;
pub const DEFAULT_DEDUP_TTL_MS: u64 = 3_000;
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 30;
pub const DEFAULT_RECONNECT_STAGGER_MS: u64 = 150;
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;
pub const DEFAULT_SESSION_PREFIX: &str = "tether-";

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse {}: {source}", path.display())
            }
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Accepted spawns allowed in any trailing 60 seconds.
    pub rate_limit_per_minute: usize,
    /// Ceiling on terminals that are active or spawning.
    pub max_terminals: usize,
    /// How long an identical spawn request is treated as a duplicate.
    pub dedup_ttl_ms: u64,
    /// How long a disconnected bare terminal survives before teardown.
    pub grace_period_secs: u64,
    /// Delay between terminals when reconnecting or recovering several at once.
    pub reconnect_stagger_ms: u64,
    pub history_capacity: usize,
    /// Prefix of multiplexer sessions owned by tether.
    pub session_prefix: String,
    pub tmux_command: String,
    pub tmux_args: Vec<String>,
    pub default_cols: u16,
    pub default_rows: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rate_limit_per_minute: DEFAULT_RATE_LIMIT_PER_MINUTE,
            max_terminals: DEFAULT_MAX_TERMINALS,
            dedup_ttl_ms: DEFAULT_DEDUP_TTL_MS,
            grace_period_secs: DEFAULT_GRACE_PERIOD_SECS,
            reconnect_stagger_ms: DEFAULT_RECONNECT_STAGGER_MS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            session_prefix: DEFAULT_SESSION_PREFIX.to_string(),
            tmux_command: "tmux".to_string(),
            tmux_args: Vec::new(),
            default_cols: 80,
            default_rows: 24,
        }
    }
}

impl Config {
    /// Load from `$TETHER_CONFIG`, else `~/.tether/config.json`. A missing
    /// file means defaults; an unreadable or malformed one is an error.
    pub fn load_default() -> Result<Self, ConfigError> {
        match default_path() {
            Some(path) if path.exists() => Self::load(&path),
            Some(path) => {
                log::debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit_per_minute == 0 {
            return Err(ConfigError::Invalid("rateLimitPerMinute must be at least 1".into()));
        }
        if self.max_terminals == 0 {
            return Err(ConfigError::Invalid("maxTerminals must be at least 1".into()));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid("historyCapacity must be at least 1".into()));
        }
        if self.default_cols == 0 || self.default_rows == 0 {
            return Err(ConfigError::Invalid("default terminal size must be non-zero".into()));
        }
        let prefix_ok = !self.session_prefix.is_empty()
            && self
                .session_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !prefix_ok {
            return Err(ConfigError::Invalid(format!(
                "sessionPrefix {:?} must be non-empty and contain only [A-Za-z0-9_-]",
                self.session_prefix
            )));
        }
        Ok(())
    }

    pub fn dedup_ttl(&self) -> Duration {
        Duration::from_millis(self.dedup_ttl_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    pub fn reconnect_stagger(&self) -> Duration {
        Duration::from_millis(self.reconnect_stagger_ms)
    }
}

fn default_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".tether").join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dedup_ttl(), Duration::from_secs(3));
        assert_eq!(config.grace_period(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(r#"{ "rateLimitPerMinute": 3, "sessionPrefix": "ctt-" }"#);
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.rate_limit_per_minute, 3);
        assert_eq!(config.session_prefix, "ctt-");
        assert_eq!(config.max_terminals, DEFAULT_MAX_TERMINALS);
        assert_eq!(config.tmux_command, "tmux");
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let file = write_config("{ not json");
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::load(Path::new("/nonexistent/tether/config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/tether/config.json"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let file = write_config(r#"{ "rateLimitPerMinute": 0 }"#);
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Invalid(_))));

        let file = write_config(r#"{ "sessionPrefix": "bad:prefix" }"#);
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Invalid(_))));
    }
}
