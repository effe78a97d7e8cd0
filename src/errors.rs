//! Error types for the arbiter oracle service.
//!
//! Errors are segmented by subsystem so handlers can map them onto HTTP
//! statuses without string matching.

use thiserror::Error;

/// Root error type for all oracle operations.
#[derive(Debug, Error)]
pub enum OracleError {
    /// Missing or malformed configuration. Never attempted; fail closed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Shared-secret mismatch. No side effects have occurred.
    #[error("unauthorized: shared secret mismatch")]
    Unauthorized,

    /// Malformed caller input (room id, address, claim amount shape).
    #[error("validation error: {0}")]
    Validation(String),

    /// Provider/transport failure after the full retry and fallback budget.
    #[error(transparent)]
    Provider(ProviderError),

    /// The contract rejected the call. Deterministic; never retried.
    #[error("contract reverted: {0}")]
    ContractRevert(String),

    /// Room is not in a status the oracle may resolve.
    #[error("room {0} is not in a resolvable status")]
    NotResolvable(String),

    /// Another settlement for the same room currently holds the lock.
    #[error("settlement already in progress for room {0}")]
    SettlementInProgress(String),

    /// Rewards ledger invariant violations.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Key-value store failure.
    #[error("store error: {0}")]
    Store(String),

    /// Key handling or signature production failure.
    #[error("signing error: {0}")]
    Signing(String),
}

/// Failures from the RPC provider layer.
///
/// `Revert` is kept distinct from transport failures: a revert is a
/// deterministic answer from the chain and must not be retried or
/// mistaken for a dead endpoint.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport failure at {endpoint}: {message}")]
    Transport { endpoint: String, message: String },

    #[error("execution reverted: {0}")]
    Revert(String),

    #[error("malformed response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("all RPC endpoints exhausted: {0}")]
    Exhausted(String),
}

/// Rewards ledger errors. Balance is untouched when any of these occur.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("claim amount must be positive, got {0}")]
    InvalidAmount(f64),

    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: f64, available: f64 },

    #[error("claim {0} not found")]
    ClaimNotFound(String),
}

impl From<ProviderError> for OracleError {
    fn from(e: ProviderError) -> Self {
        match e {
            // A revert that bubbles up through the provider layer is a
            // contract answer, not a provider outage.
            ProviderError::Revert(msg) => OracleError::ContractRevert(msg),
            other => OracleError::Provider(other),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type OracleResult<T> = Result<T, OracleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revert_converts_to_contract_revert() {
        let err: OracleError = ProviderError::Revert("room already resolved".into()).into();
        match err {
            OracleError::ContractRevert(msg) => assert!(msg.contains("already resolved")),
            other => panic!("expected ContractRevert, got {other:?}"),
        }
    }

    #[test]
    fn transport_stays_provider() {
        let err: OracleError = ProviderError::Transport {
            endpoint: "http://rpc-1".into(),
            message: "connection refused".into(),
        }
        .into();
        assert!(matches!(err, OracleError::Provider(_)));
    }

    #[test]
    fn ledger_error_display_carries_amounts() {
        let err = LedgerError::InsufficientBalance {
            requested: 150.0,
            available: 100.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("150"));
        assert!(msg.contains("100"));
    }
}
