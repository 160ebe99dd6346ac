//! Error types for the mission engine.

use thiserror::Error;

/// Errors surfaced to callers of the loading, persistence and decoding layers.
///
/// Programmer misuse of the state machine is not represented here: those
/// paths log through `tracing` and degrade instead of failing.
#[derive(Error, Debug)]
pub enum MissionError {
    /// A persisted status string did not name a known status.
    #[error("invalid mission status string: '{0}'")]
    InvalidEnumString(String),

    /// A template id was requested that no registry entry carries.
    #[error("mission template not found: {0}")]
    TemplateNotFound(String),

    /// A template file could not be read.
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A template or config file was not valid TOML for its schema.
    #[error("failed to parse {path:?}: {source}")]
    Toml {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A template parsed but describes something unusable.
    #[error("invalid mission template '{id}': {reason}")]
    InvalidTemplate { id: String, reason: String },

    /// The legacy token stream ended before every field was read.
    #[error("legacy mission data ended early while reading {field}")]
    UnexpectedEnd { field: &'static str },

    /// A legacy token could not be decoded for its field.
    #[error("legacy mission field {field} has bad value '{token}'")]
    BadToken { field: &'static str, token: String },

    /// JSON snapshot encoding or decoding failed.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Configuration file problem.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, MissionError>;
