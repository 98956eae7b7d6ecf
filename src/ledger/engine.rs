//! The engine value: batch entry points and query surface
//!
//! `Ledger` owns the three tables and the commit timestamp. It is
//! strictly single-threaded and non-reentrant: every entry point runs
//! to completion, processing records in input order. Each record in a
//! batch receives the timestamp `base + index`, where `base` is the
//! host clock sampled once at batch entry.
//!
//! Batch results are sparse: only records whose result is not `ok`
//! produce an entry, so a fully successful batch returns nothing.

use crate::core::time::BatchTimestamps;
use crate::models::{
    Account, CreateAccountResult, CreateTransferResult, PendingTransferInfo, Transfer,
};
use crate::store::Store;

use super::snapshot::{self, SnapshotError, StateValidationError};
use super::{accounts, transfers, EngineConfig, EngineError};

/// Sparse per-record outcome of a create-accounts batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateAccountsResult {
    /// Index of the record within the submitted batch
    pub index: u32,
    /// Why the record was not committed (or `exists`)
    pub result: CreateAccountResult,
}

/// Sparse per-record outcome of a create-transfers batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateTransfersResult {
    /// Index of the record within the submitted batch
    pub index: u32,
    /// Why the record was not committed (or `exists`)
    pub result: CreateTransferResult,
}

/// The in-memory accounting engine.
///
/// # Example
/// ```
/// use ledger_core_rs::ledger::{EngineConfig, Ledger};
/// use ledger_core_rs::models::Account;
///
/// let mut ledger = Ledger::new(EngineConfig::default()).unwrap();
/// let account = Account { id: 1, ledger: 1, code: 1, ..Account::default() };
///
/// let failures = ledger.create_accounts(&[account], 1_000);
/// assert!(failures.is_empty());
/// assert_eq!(ledger.lookup_accounts(&[1]).len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Ledger {
    config: EngineConfig,
    store: Store,
    /// Timestamp of the most recently committed record
    commit_timestamp: u64,
}

impl Ledger {
    /// Create an empty engine with validated capacities.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let store = Store::new(
            config.max_accounts,
            config.max_transfers,
            config.max_pending_transfers,
        );
        Ok(Self {
            config,
            store,
            commit_timestamp: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Timestamp of the most recently committed record.
    pub fn commit_timestamp(&self) -> u64 {
        self.commit_timestamp
    }

    // ------------------------------------------------------------------
    // Batch entry points
    // ------------------------------------------------------------------

    /// Process a batch of account records in input order.
    ///
    /// `batch_timestamp` is the host clock sampled at batch entry;
    /// record `i` is assigned `batch_timestamp + i`. Returns entries
    /// only for records whose result is not `ok`.
    pub fn create_accounts(
        &mut self,
        batch: &[Account],
        batch_timestamp: u64,
    ) -> Vec<CreateAccountsResult> {
        let timestamps = BatchTimestamps::new(batch_timestamp);
        let mut failures = Vec::new();

        for (index, record) in batch.iter().enumerate() {
            let timestamp = timestamps.for_index(index);
            let result = accounts::create_account(&mut self.store, record, timestamp);
            if result == CreateAccountResult::Ok {
                self.commit_timestamp = timestamp;
            } else {
                failures.push(CreateAccountsResult {
                    index: index as u32,
                    result,
                });
            }
        }

        failures
    }

    /// Process a batch of transfer records in input order.
    ///
    /// Same timestamp and sparse-result conventions as
    /// [`Ledger::create_accounts`]. `exists` entries are included here;
    /// the host boundary suppresses them as idempotent successes.
    pub fn create_transfers(
        &mut self,
        batch: &[Transfer],
        batch_timestamp: u64,
    ) -> Vec<CreateTransfersResult> {
        let timestamps = BatchTimestamps::new(batch_timestamp);
        let mut failures = Vec::new();

        for (index, record) in batch.iter().enumerate() {
            let timestamp = timestamps.for_index(index);
            let result = transfers::create_transfer(&mut self.store, record, timestamp);
            if result == CreateTransferResult::Ok {
                self.commit_timestamp = timestamp;
            } else {
                failures.push(CreateTransfersResult {
                    index: index as u32,
                    result,
                });
            }
        }

        failures
    }

    // ------------------------------------------------------------------
    // Query surface
    // ------------------------------------------------------------------

    /// Look up accounts by id. Missing ids are omitted silently; found
    /// entries preserve the input order.
    pub fn lookup_accounts(&self, ids: &[u128]) -> Vec<Account> {
        ids.iter()
            .filter_map(|&id| self.store.find_account(id))
            .map(|slot| *self.store.account(slot))
            .collect()
    }

    /// Look up transfers by id. Missing ids are omitted silently.
    pub fn lookup_transfers(&self, ids: &[u128]) -> Vec<Transfer> {
        ids.iter()
            .filter_map(|&id| self.store.find_transfer(id))
            .map(|slot| *self.store.transfer(slot))
            .collect()
    }

    /// All transfers debiting or crediting `account_id`, in commit
    /// order, capped at `max` entries.
    pub fn account_transfers(&self, account_id: u128, max: usize) -> Vec<Transfer> {
        self.store
            .transfers()
            .iter()
            .filter(|t| t.touches_account(account_id))
            .take(max)
            .copied()
            .collect()
    }

    // ------------------------------------------------------------------
    // Snapshot
    // ------------------------------------------------------------------

    /// Bytes needed to serialize the current state.
    pub fn state_size(&self) -> usize {
        snapshot::state_size(
            self.store.account_count(),
            self.store.transfer_count(),
            self.store.pending_count(),
        )
    }

    /// Serialize the complete state into `buf`; returns bytes written.
    pub fn save_state(&self, buf: &mut [u8]) -> Result<usize, SnapshotError> {
        snapshot::save_state(&self.store, self.commit_timestamp, buf)
    }

    /// Replace the complete state from a snapshot. On error the engine
    /// state is unchanged.
    pub fn load_state(&mut self, buf: &[u8]) -> Result<(), SnapshotError> {
        let decoded = snapshot::load_state(&self.config, buf)?;
        self.store
            .replace(decoded.accounts, decoded.transfers, decoded.pending);
        self.commit_timestamp = decoded.commit_timestamp;
        Ok(())
    }

    /// Audit the current state against the double-entry invariants.
    pub fn validate(&self) -> Result<(), StateValidationError> {
        snapshot::validate_state(&self.store)
    }

    // ------------------------------------------------------------------
    // Whole-table views
    // ------------------------------------------------------------------

    pub fn accounts(&self) -> &[Account] {
        self.store.accounts()
    }

    pub fn transfers(&self) -> &[Transfer] {
        self.store.transfers()
    }

    pub fn pending_transfers(&self) -> &[PendingTransferInfo] {
        self.store.pending_transfers()
    }
}
