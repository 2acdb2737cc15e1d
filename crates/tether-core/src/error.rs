use crate::terminal::TerminalState;

/// Errors from registry operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    NotFound(String),
    AlreadyExists(String),
    /// Creating or driving the OS-level attachment failed.
    Attachment(String),
    /// Neither the old attachment nor the multiplexer session could be resumed.
    Reconnect { id: String, reason: String },
    InvalidState { id: String, state: TerminalState },
    Multiplexer(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::NotFound(id) => write!(f, "terminal {id} not found"),
            RegistryError::AlreadyExists(id) => write!(f, "terminal {id} already exists"),
            RegistryError::Attachment(msg) => write!(f, "attachment failed: {msg}"),
            RegistryError::Reconnect { id, reason } => {
                write!(f, "cannot reconnect terminal {id}: {reason}")
            }
            RegistryError::InvalidState { id, state } => {
                write!(f, "terminal {id} is {state}")
            }
            RegistryError::Multiplexer(msg) => write!(f, "multiplexer error: {msg}"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Why a spawn request was turned down. Every variant reaches the caller as
/// a structured result, never as a panic or a propagated error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnError {
    Validation(String),
    RateLimit { retry_after_secs: u64 },
    Capacity { limit: usize },
    UnknownType(String),
    PlatformUnsupported(String),
    DuplicateSpawn(String),
    Attachment(String),
}

impl SpawnError {
    /// Stable name of the error class, as reported to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            SpawnError::Validation(_) => "ValidationError",
            SpawnError::RateLimit { .. } => "RateLimitError",
            SpawnError::Capacity { .. } => "CapacityError",
            SpawnError::UnknownType(_) => "UnknownTypeError",
            SpawnError::PlatformUnsupported(_) => "PlatformUnsupportedError",
            SpawnError::DuplicateSpawn(_) => "DuplicateSpawnError",
            SpawnError::Attachment(_) => "AttachmentError",
        }
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            SpawnError::RateLimit { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }
}

impl std::fmt::Display for SpawnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpawnError::Validation(msg) => write!(f, "invalid spawn request: {msg}"),
            SpawnError::RateLimit { retry_after_secs } => {
                write!(f, "spawn rate limit reached, retry in {retry_after_secs}s")
            }
            SpawnError::Capacity { limit } => {
                write!(f, "terminal limit of {limit} reached")
            }
            SpawnError::UnknownType(ty) => write!(f, "unknown terminal type: {ty}"),
            SpawnError::PlatformUnsupported(platform) => {
                write!(f, "platform not supported: {platform}")
            }
            SpawnError::DuplicateSpawn(key) => {
                write!(f, "duplicate spawn request already in flight: {key}")
            }
            SpawnError::Attachment(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for SpawnError {}

impl From<RegistryError> for SpawnError {
    fn from(err: RegistryError) -> Self {
        SpawnError::Attachment(err.to_string())
    }
}
