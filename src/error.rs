//! Error types for the Nova Canvas MCP server.
//!
//! Every failure in the generation lifecycle is one [`Error`] variant. At the
//! tool boundary errors are rendered as text results; at the protocol
//! boundary they map to JSON-RPC error codes through [`Error::code`].

use std::path::PathBuf;

use crate::types::jsonrpc::ErrorCode;

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Tool parameters were missing, mistyped or out of range.
    #[error("Invalid parameters: {0}")]
    Validation(String),

    /// A referenced local input image could not be read.
    #[error("Failed to read input image '{}': {source}", path.display())]
    InputRead {
        /// Path the caller referenced.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The remote model call failed at the transport or service level.
    #[error("Image generation request failed: {0}")]
    Remote(String),

    /// The remote call succeeded but no image could be extracted.
    #[error("No image data in model response: {0}")]
    MalformedResponse(String),

    /// Writing the artifact or creating its directory failed.
    #[error("Failed to save image to '{}': {source}", path.display())]
    Persistence {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// No cache entry and no file exist for the identifier.
    #[error("Image not found: {0}")]
    ArtifactNotFound(String),

    /// Protocol level failure with an explicit JSON-RPC code.
    #[error("{message}")]
    Protocol {
        /// JSON-RPC error code.
        code: ErrorCode,
        /// Human readable message.
        message: String,
    },

    /// Transport failure.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a remote invocation error.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote(message.into())
    }

    /// Create a malformed response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// Create a protocol error with a specific code.
    pub fn protocol(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Protocol {
            code,
            message: message.into(),
        }
    }

    /// JSON-RPC error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Protocol { code, .. } => *code,
            Self::Validation(_) | Self::Json(_) => ErrorCode::INVALID_PARAMS,
            Self::ArtifactNotFound(_) => ErrorCode::RESOURCE_NOT_FOUND,
            _ => ErrorCode::INTERNAL_ERROR,
        }
    }
}

/// Transport-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer closed the connection (EOF on stdin).
    #[error("Connection closed")]
    ConnectionClosed,

    /// A message could not be parsed or serialized.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
