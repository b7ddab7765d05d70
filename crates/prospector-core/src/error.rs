//! Error types for Prospector

use std::path::PathBuf;
use thiserror::Error;

/// Result type for Prospector operations
pub type Result<T> = std::result::Result<T, ProspectorError>;

/// Prospector error types
#[derive(Debug, Error)]
pub enum ProspectorError {
    /// Action outside `0..=68`
    #[error("Invalid action: {0} (expected 0..=68)")]
    InvalidAction(i64),

    /// Step called before the first reset
    #[error("Environment not reset, call reset before step")]
    NotReset,

    /// Step called after a terminated or truncated result
    #[error("Episode ended, call reset")]
    EpisodeEnded,

    /// Handle used after close
    #[error("Environment handle is closed")]
    HandleClosed,

    /// Compiled module reports a different ABI version
    #[error("ABI version mismatch: expected {expected}, found {found}")]
    AbiVersionMismatch { expected: u32, found: u32 },

    /// Compiled module's function table or buffer sizes disagree with ours
    #[error("ABI layout mismatch: {0}")]
    AbiLayout(String),

    /// Compiled module could not be located or loaded
    #[error("Failed to load native module {path:?}: {reason}")]
    ModuleLoad { path: PathBuf, reason: String },

    /// Native side panicked inside a call
    #[error("Native core panicked")]
    NativePanic,

    /// Native side returned a status code we do not know
    #[error("Unknown native status code: {0}")]
    NativeStatus(i32),

    /// Rejected configuration value
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Replay frame failed schema validation
    #[error("Replay schema error: {0}")]
    ReplaySchema(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller misuse: bad argument or wrong call order
    ContractViolation,
    /// Missing or unloadable compiled module
    ResourceFailure,
    /// Anything else
    Internal,
}

impl ProspectorError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProspectorError::InvalidAction(_)
            | ProspectorError::NotReset
            | ProspectorError::EpisodeEnded
            | ProspectorError::HandleClosed
            | ProspectorError::AbiVersionMismatch { .. }
            | ProspectorError::AbiLayout(_)
            | ProspectorError::InvalidConfig(_) => ErrorCategory::ContractViolation,
            ProspectorError::ModuleLoad { .. } | ProspectorError::Io(_) => {
                ErrorCategory::ResourceFailure
            }
            _ => ErrorCategory::Internal,
        }
    }

    /// Stable numeric code, identical for reference and native failures
    pub fn code(&self) -> i32 {
        match self {
            ProspectorError::InvalidAction(_) => error_codes::INVALID_ACTION,
            ProspectorError::NotReset => error_codes::NOT_RESET,
            ProspectorError::EpisodeEnded => error_codes::EPISODE_ENDED,
            ProspectorError::HandleClosed => error_codes::HANDLE_CLOSED,
            ProspectorError::AbiVersionMismatch { .. } => error_codes::ABI_VERSION_MISMATCH,
            ProspectorError::AbiLayout(_) => error_codes::ABI_LAYOUT,
            ProspectorError::ModuleLoad { .. } => error_codes::MODULE_LOAD,
            ProspectorError::NativePanic => error_codes::NATIVE_PANIC,
            ProspectorError::NativeStatus(_) => error_codes::NATIVE_STATUS,
            ProspectorError::InvalidConfig(_) => error_codes::INVALID_CONFIG,
            ProspectorError::ReplaySchema(_) => error_codes::REPLAY_SCHEMA,
            ProspectorError::SerializationError(_) => error_codes::SERIALIZATION,
            ProspectorError::Io(_) => error_codes::IO,
        }
    }
}

impl From<serde_json::Error> for ProspectorError {
    fn from(err: serde_json::Error) -> Self {
        ProspectorError::SerializationError(err.to_string())
    }
}

/// Error codes for Prospector
pub mod error_codes {
    pub const INVALID_ACTION: i32 = -33001;
    pub const NOT_RESET: i32 = -33002;
    pub const EPISODE_ENDED: i32 = -33003;
    pub const HANDLE_CLOSED: i32 = -33004;
    pub const ABI_VERSION_MISMATCH: i32 = -33010;
    pub const ABI_LAYOUT: i32 = -33011;
    pub const MODULE_LOAD: i32 = -33012;
    pub const NATIVE_PANIC: i32 = -33013;
    pub const NATIVE_STATUS: i32 = -33014;
    pub const INVALID_CONFIG: i32 = -33020;
    pub const REPLAY_SCHEMA: i32 = -33021;
    pub const SERIALIZATION: i32 = -33022;
    pub const IO: i32 = -33023;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_violations_are_categorised() {
        assert_eq!(
            ProspectorError::InvalidAction(69).category(),
            ErrorCategory::ContractViolation
        );
        assert_eq!(
            ProspectorError::AbiVersionMismatch {
                expected: 1,
                found: 2
            }
            .category(),
            ErrorCategory::ContractViolation
        );
        let missing = ProspectorError::ModuleLoad {
            path: PathBuf::from("/nowhere/libcore.so"),
            reason: "not found".into(),
        };
        assert_eq!(missing.category(), ErrorCategory::ResourceFailure);
        assert_eq!(ProspectorError::NativePanic.category(), ErrorCategory::Internal);
    }

    #[test]
    fn test_codes_ignore_payload() {
        assert_eq!(
            ProspectorError::InvalidAction(-1).code(),
            ProspectorError::InvalidAction(500).code()
        );
        assert_ne!(
            ProspectorError::NotReset.code(),
            ProspectorError::EpisodeEnded.code()
        );
    }
}
