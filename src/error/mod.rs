use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Validation failed: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Shorthand for a validation error on a named field.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an unknown chain/session/template/preset id.
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        AppError::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

/// Model Invocation Port errors
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model backend unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Command dispatch / JSON-RPC protocol errors
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Unknown command: {command}")]
    UnknownCommand { command: String },

    #[error("Invalid parameters for {command}: {message}")]
    InvalidParameters { command: String, message: String },

    #[error("Command execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Event sink errors; always caught and logged, never propagated to callers.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Broadcast failed: {message}")]
    Broadcast { message: String },
}

impl From<AppError> for CommandError {
    fn from(err: AppError) -> Self {
        CommandError::ExecutionFailed {
            message: err.to_string(),
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for model port operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Result type alias for command dispatch
pub type CommandResult<T> = Result<T, CommandError>;
