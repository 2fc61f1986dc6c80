//! Error types for the CloudLog pump

use thiserror::Error;

/// Result type alias for process-level operations
pub type Result<T> = std::result::Result<T, PumpError>;

/// Process-level error type
#[derive(Error, Debug)]
pub enum PumpError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Pump error
    #[error("pump '{plugin}' error: {message}")]
    Plugin { plugin: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error type for pump operations
#[derive(Error, Debug)]
pub enum PluginError {
    /// Initialization failed
    #[error("initialization failed: {0}")]
    Init(String),

    /// Write called before init
    #[error("pump not initialized")]
    NotInitialized,

    /// A record in the batch could not be decoded
    #[error("invalid record: {0}")]
    Record(String),

    /// Batch could not be encoded
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Outbound request could not be built
    #[error("request error: {0}")]
    Request(String),

    /// Connection error
    #[error("connection error: {0}")]
    Connection(String),

    /// Caller cancelled the write
    #[error("write cancelled")]
    Cancelled,
}

impl PumpError {
    /// Attach the pump kind to a pump error
    pub fn plugin(plugin: impl Into<String>, err: PluginError) -> Self {
        PumpError::Plugin {
            plugin: plugin.into(),
            message: err.to_string(),
        }
    }
}
