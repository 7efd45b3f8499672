//! Chain error taxonomy.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by any external collaborator (full node, gateway, oracle).
///
/// Read failures are fetch errors; a rejected deposit or borrow is an
/// execution failure. Neither is retried at this layer.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    /// Network or HTTP transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote answered with a JSON-RPC or API level error.
    #[error("rpc error {code}: {message}")]
    Rpc { code: String, message: String },

    /// The response could not be decoded into the expected record.
    #[error("decode error: {0}")]
    Decode(String),

    /// The request did not complete within the caller's deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// A submitted transaction was rejected.
    #[error("transaction rejected: {reason}")]
    ExecutionRejected { reason: String },
}

impl ChainError {
    /// Build a decode error from anything displayable.
    pub fn decode(msg: impl std::fmt::Display) -> Self {
        Self::Decode(msg.to_string())
    }

    /// Whether this error came from a rejected transaction rather than a read.
    pub fn is_execution_failure(&self) -> bool {
        matches!(self, Self::ExecutionRejected { .. })
    }
}

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_classification() {
        let rejected = ChainError::ExecutionRejected {
            reason: "insufficient collateral".to_string(),
        };
        assert!(rejected.is_execution_failure());
        assert!(!ChainError::Timeout(Duration::from_secs(5)).is_execution_failure());
        assert!(!ChainError::decode("bad field").is_execution_failure());
    }

    #[test]
    fn test_display() {
        let err = ChainError::Rpc {
            code: "-32602".to_string(),
            message: "invalid params".to_string(),
        };
        assert_eq!(err.to_string(), "rpc error -32602: invalid params");
    }
}
