//! Error types for the calculation core and the leverage loop.

use leverage_chain::{ChainError, CoinType};
use thiserror::Error;

/// Fixed-point arithmetic failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("decimal overflow")]
    Overflow,

    #[error("division by zero")]
    DivisionByZero,

    #[error("power-of-ten shift {0} outside supported range")]
    ScaleOutOfRange(i32),
}

/// Position valuation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValuationError {
    /// A debt entry is missing its price, metadata or market record.
    #[error("debt data unavailable for {coin_type}: missing {missing}")]
    DebtDataUnavailable {
        coin_type: CoinType,
        missing: &'static str,
    },

    /// Recorded borrow index is zero or negative.
    #[error("invalid borrow index at entry for {coin_type}")]
    InvalidBorrowIndex { coin_type: CoinType },

    #[error(transparent)]
    Math(#[from] MathError),
}

/// Borrow sizing failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SizingError {
    #[error("target price must be positive")]
    NonPositivePrice,

    #[error(transparent)]
    Math(#[from] MathError),
}

/// Failure of one leverage cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("fetch failed: {0}")]
    Fetch(ChainError),

    #[error("execution failed: {0}")]
    Execution(ChainError),

    #[error(transparent)]
    Valuation(#[from] ValuationError),

    #[error(transparent)]
    Sizing(#[from] SizingError),

    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    #[error("owner has no obligation with collateral")]
    NoEligibleObligation,

    #[error("cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),
}

impl CycleError {
    /// Whether the next cycle may succeed without operator intervention.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(_) | Self::Execution(_) | Self::Timeout { .. } => true,
            Self::Valuation(ValuationError::DebtDataUnavailable { .. }) => true,
            Self::Valuation(_)
            | Self::Sizing(_)
            | Self::NoEligibleObligation
            | Self::Cancelled
            | Self::Config(_) => false,
        }
    }
}

impl From<ChainError> for CycleError {
    fn from(err: ChainError) -> Self {
        if err.is_execution_failure() {
            Self::Execution(err)
        } else {
            Self::Fetch(err)
        }
    }
}
