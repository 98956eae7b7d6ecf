//! The accounting engine
//!
//! `Ledger` is the owned engine value: it accepts batches of account
//! and transfer records, validates and applies them one at a time, and
//! answers point lookups and account-transfer enumerations. The
//! snapshot codec beside it serializes the complete state.
//!
//! See `engine.rs` for the batch entry points, `accounts.rs` and
//! `transfers.rs` for the validators, `two_phase.rs` for post/void
//! completion, and `snapshot.rs` for the codec.

pub mod accounts;
pub mod engine;
pub mod snapshot;
pub mod transfers;
pub mod two_phase;

// Re-export main types for convenience
pub use engine::{CreateAccountsResult, CreateTransfersResult, Ledger};
pub use snapshot::{SnapshotError, StateValidationError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default account table capacity.
pub const DEFAULT_MAX_ACCOUNTS: usize = 10_000;
/// Default transfer table capacity.
pub const DEFAULT_MAX_TRANSFERS: usize = 50_000;
/// Default pending side-table capacity.
pub const DEFAULT_MAX_PENDING_TRANSFERS: usize = 10_000;

fn default_max_accounts() -> usize {
    DEFAULT_MAX_ACCOUNTS
}

fn default_max_transfers() -> usize {
    DEFAULT_MAX_TRANSFERS
}

fn default_max_pending_transfers() -> usize {
    DEFAULT_MAX_PENDING_TRANSFERS
}

/// Engine capacities, fixed for the lifetime of a `Ledger`.
///
/// Snapshots are only loadable into an engine whose capacities admit
/// the snapshot's counts; `snapshot::compute_config_hash` gives hosts a
/// stable fingerprint for pairing snapshots with configurations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the account table
    #[serde(default = "default_max_accounts")]
    pub max_accounts: usize,

    /// Capacity of the transfer table
    #[serde(default = "default_max_transfers")]
    pub max_transfers: usize,

    /// Capacity of the pending-transfer side table
    #[serde(default = "default_max_pending_transfers")]
    pub max_pending_transfers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_accounts: DEFAULT_MAX_ACCOUNTS,
            max_transfers: DEFAULT_MAX_TRANSFERS,
            max_pending_transfers: DEFAULT_MAX_PENDING_TRANSFERS,
        }
    }
}

impl EngineConfig {
    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_accounts == 0 {
            return Err(EngineError::InvalidConfig(
                "max_accounts must be positive".to_string(),
            ));
        }
        if self.max_transfers == 0 {
            return Err(EngineError::InvalidConfig(
                "max_transfers must be positive".to_string(),
            ));
        }
        if self.max_pending_transfers == 0 {
            return Err(EngineError::InvalidConfig(
                "max_pending_transfers must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-call engine errors.
///
/// Per-record domain outcomes are NOT errors — they are
/// `CreateAccountResult` / `CreateTransferResult` values in the batch
/// result. This enum covers failures of the call itself.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Configuration validation error
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Config serialization failed while hashing
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacities() {
        let config = EngineConfig::default();
        assert_eq!(config.max_accounts, 10_000);
        assert_eq!(config.max_transfers, 50_000);
        assert_eq!(config.max_pending_transfers, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = EngineConfig {
            max_accounts: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").expect("parses");
        assert_eq!(config, EngineConfig::default());

        let config: EngineConfig =
            serde_json::from_str(r#"{"max_accounts": 16}"#).expect("parses");
        assert_eq!(config.max_accounts, 16);
        assert_eq!(config.max_transfers, 50_000);
    }
}
