//! Shared error type across farmlink crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed message.
    BadRequest,
    /// Device auth failed.
    AuthFailed,
    /// Unsupported config or protocol version.
    UnsupportedVersion,
    /// Internal failure (storage, transport).
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::AuthFailed => "AUTH_FAILED",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, FarmlinkError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum FarmlinkError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("auth failed")]
    AuthFailed,
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("invalid time: {0}")]
    InvalidTime(String),
    #[error("storage: {0}")]
    Storage(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("unsupported version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl FarmlinkError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            FarmlinkError::BadRequest(_)
            | FarmlinkError::MalformedPayload(_)
            | FarmlinkError::InvalidTime(_) => ClientCode::BadRequest,
            FarmlinkError::AuthFailed => ClientCode::AuthFailed,
            FarmlinkError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            FarmlinkError::Storage(_)
            | FarmlinkError::Transport(_)
            | FarmlinkError::Internal(_) => ClientCode::Internal,
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FarmlinkError::BadRequest(_) => "bad_request",
            FarmlinkError::AuthFailed => "auth_failed",
            FarmlinkError::MalformedPayload(_) => "malformed_payload",
            FarmlinkError::InvalidTime(_) => "invalid_time",
            FarmlinkError::Storage(_) => "storage",
            FarmlinkError::Transport(_) => "transport",
            FarmlinkError::UnsupportedVersion => "unsupported_version",
            FarmlinkError::Internal(_) => "internal",
        }
    }
}
