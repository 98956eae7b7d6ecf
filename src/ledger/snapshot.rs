//! Snapshot codec — save/load complete engine state
//!
//! The snapshot is a versioned, little-endian byte serialization of the
//! three tables plus the commit timestamp. The layout is bit-exact on
//! every host because snapshots outlive the process that wrote them.
//!
//! # Layout
//!
//! ```text
//! header (28 bytes)
//!   magic:   u32 = 0x54425354 ("TBST")
//!   version: u32
//!   v2: account_count u32, transfer_count u32,
//!       pending_transfer_count u32, commit_timestamp u64
//!   v1: account_count u32, commit_timestamp u64, reserved u64
//! body
//!   v2: accounts (128 B each), transfers (128 B each),
//!       pending infos (64 B each)
//!   v1: accounts only
//! ```
//!
//! # Critical Invariants
//!
//! - **Round trip**: `load(save(S)) == S` for every valid state
//! - **Backward compatibility**: a version-1 snapshot loads into
//!   version-2 state with zero transfers and zero pending entries
//! - **Conservation**: `validate_state` lets hosts audit a loaded
//!   snapshot against the double-entry invariants

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::models::{u32_at, u64_at, Account, PendingTransferInfo, Transfer};
use crate::store::Store;

use super::{EngineConfig, EngineError};

/// "TBST", little-endian.
pub const SNAPSHOT_MAGIC: u32 = 0x5442_5354;

/// Version written by `save_state`.
pub const SNAPSHOT_VERSION: u32 = 2;

/// Both header layouts are 28 bytes.
pub const SNAPSHOT_HEADER_SIZE: usize = 28;

/// Errors from the snapshot codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("snapshot buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("bad snapshot magic: {found:#010x}")]
    BadMagic { found: u32 },

    #[error("unsupported snapshot version: {0}")]
    UnsupportedVersion(u32),

    #[error("snapshot has too many accounts: {count} exceeds capacity {capacity}")]
    TooManyAccounts { count: usize, capacity: usize },

    #[error("snapshot has too many transfers: {count} exceeds capacity {capacity}")]
    TooManyTransfers { count: usize, capacity: usize },

    #[error("snapshot has too many pending transfers: {count} exceeds capacity {capacity}")]
    TooManyPendingTransfers { count: usize, capacity: usize },

    #[error("snapshot length mismatch: header implies {expected} bytes, buffer has {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("corrupt pending entry at slot {slot}")]
    CorruptPendingEntry { slot: usize },
}

/// Bytes needed to serialize a state with the given table counts.
pub fn state_size(account_count: usize, transfer_count: usize, pending_count: usize) -> usize {
    SNAPSHOT_HEADER_SIZE
        + account_count * Account::WIRE_SIZE
        + transfer_count * Transfer::WIRE_SIZE
        + pending_count * PendingTransferInfo::WIRE_SIZE
}

/// Serialize the complete state into `buf`. Returns the number of
/// bytes written. Refuses if `buf` is too small; `buf` is not touched
/// in that case.
pub fn save_state(
    store: &Store,
    commit_timestamp: u64,
    buf: &mut [u8],
) -> Result<usize, SnapshotError> {
    let needed = state_size(
        store.account_count(),
        store.transfer_count(),
        store.pending_count(),
    );
    if buf.len() < needed {
        return Err(SnapshotError::BufferTooSmall {
            needed,
            available: buf.len(),
        });
    }

    buf[0..4].copy_from_slice(&SNAPSHOT_MAGIC.to_le_bytes());
    buf[4..8].copy_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
    buf[8..12].copy_from_slice(&(store.account_count() as u32).to_le_bytes());
    buf[12..16].copy_from_slice(&(store.transfer_count() as u32).to_le_bytes());
    buf[16..20].copy_from_slice(&(store.pending_count() as u32).to_le_bytes());
    buf[20..28].copy_from_slice(&commit_timestamp.to_le_bytes());

    let mut offset = SNAPSHOT_HEADER_SIZE;
    for account in store.accounts() {
        buf[offset..offset + Account::WIRE_SIZE].copy_from_slice(&account.to_bytes());
        offset += Account::WIRE_SIZE;
    }
    for transfer in store.transfers() {
        buf[offset..offset + Transfer::WIRE_SIZE].copy_from_slice(&transfer.to_bytes());
        offset += Transfer::WIRE_SIZE;
    }
    for info in store.pending_transfers() {
        buf[offset..offset + PendingTransferInfo::WIRE_SIZE].copy_from_slice(&info.to_bytes());
        offset += PendingTransferInfo::WIRE_SIZE;
    }

    Ok(offset)
}

/// A snapshot decoded and validated against a configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedState {
    pub accounts: Vec<Account>,
    pub transfers: Vec<Transfer>,
    pub pending: Vec<PendingTransferInfo>,
    pub commit_timestamp: u64,
}

/// Parse and validate a snapshot. Counts are checked against the
/// configured capacities and the total length must match the header
/// exactly.
pub fn load_state(config: &EngineConfig, buf: &[u8]) -> Result<DecodedState, SnapshotError> {
    if buf.len() < SNAPSHOT_HEADER_SIZE {
        return Err(SnapshotError::LengthMismatch {
            expected: SNAPSHOT_HEADER_SIZE,
            actual: buf.len(),
        });
    }

    let magic = u32_at(buf, 0);
    if magic != SNAPSHOT_MAGIC {
        return Err(SnapshotError::BadMagic { found: magic });
    }

    let version = u32_at(buf, 4);
    let (account_count, transfer_count, pending_count, commit_timestamp) = match version {
        1 => {
            // Legacy layout: account_count, commit_timestamp, reserved
            let account_count = u32_at(buf, 8) as usize;
            let commit_timestamp = u64_at(buf, 12);
            (account_count, 0, 0, commit_timestamp)
        }
        2 => {
            let account_count = u32_at(buf, 8) as usize;
            let transfer_count = u32_at(buf, 12) as usize;
            let pending_count = u32_at(buf, 16) as usize;
            let commit_timestamp = u64_at(buf, 20);
            (account_count, transfer_count, pending_count, commit_timestamp)
        }
        other => return Err(SnapshotError::UnsupportedVersion(other)),
    };

    if account_count > config.max_accounts {
        return Err(SnapshotError::TooManyAccounts {
            count: account_count,
            capacity: config.max_accounts,
        });
    }
    if transfer_count > config.max_transfers {
        return Err(SnapshotError::TooManyTransfers {
            count: transfer_count,
            capacity: config.max_transfers,
        });
    }
    if pending_count > config.max_pending_transfers {
        return Err(SnapshotError::TooManyPendingTransfers {
            count: pending_count,
            capacity: config.max_pending_transfers,
        });
    }

    let expected = state_size(account_count, transfer_count, pending_count);
    if buf.len() != expected {
        return Err(SnapshotError::LengthMismatch {
            expected,
            actual: buf.len(),
        });
    }

    let mut offset = SNAPSHOT_HEADER_SIZE;

    let mut accounts = Vec::with_capacity(account_count);
    for _ in 0..account_count {
        let mut record = [0u8; Account::WIRE_SIZE];
        record.copy_from_slice(&buf[offset..offset + Account::WIRE_SIZE]);
        accounts.push(Account::from_bytes(&record));
        offset += Account::WIRE_SIZE;
    }

    let mut transfers = Vec::with_capacity(transfer_count);
    for _ in 0..transfer_count {
        let mut record = [0u8; Transfer::WIRE_SIZE];
        record.copy_from_slice(&buf[offset..offset + Transfer::WIRE_SIZE]);
        transfers.push(Transfer::from_bytes(&record));
        offset += Transfer::WIRE_SIZE;
    }

    let mut pending = Vec::with_capacity(pending_count);
    for slot in 0..pending_count {
        let mut record = [0u8; PendingTransferInfo::WIRE_SIZE];
        record.copy_from_slice(&buf[offset..offset + PendingTransferInfo::WIRE_SIZE]);
        match PendingTransferInfo::from_bytes(&record) {
            Some(info) => pending.push(info),
            None => return Err(SnapshotError::CorruptPendingEntry { slot }),
        }
        offset += PendingTransferInfo::WIRE_SIZE;
    }

    Ok(DecodedState {
        accounts,
        transfers,
        pending,
        commit_timestamp,
    })
}

// ============================================================================
// Config Hashing
// ============================================================================

/// Compute a deterministic SHA-256 hash of an engine configuration.
///
/// Hosts pair this with a saved snapshot to verify, before loading,
/// that the snapshot was produced under a compatible configuration.
/// `EngineConfig` is a flat struct with a fixed field order, so its
/// JSON serialization is already canonical.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, EngineError> {
    let json = serde_json::to_string(config)
        .map_err(|e| EngineError::Serialization(format!("config serialization failed: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    let result = hasher.finalize();

    Ok(format!("{:x}", result))
}

// ============================================================================
// State Validation
// ============================================================================

/// State invariant violations reported by [`validate_state`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateValidationError {
    #[error("posted conservation violated: debits {debits}, credits {credits}")]
    PostedConservation { debits: u128, credits: u128 },

    #[error("pending conservation violated: debits {debits}, credits {credits}")]
    PendingConservation { debits: u128, credits: u128 },

    #[error("account {account_id} violates its directional balance limit")]
    DirectionalLimit { account_id: u128 },

    #[error("pending transfer {id} has posted more than its original amount")]
    PendingOverPosted { id: u128 },

    #[error("timestamps are not strictly increasing at {timestamp}")]
    NonMonotonicTimestamp { timestamp: u64 },

    #[error("balance sum overflowed u128")]
    SumOverflow,
}

/// Check the invariants every committed state must satisfy:
/// double-entry conservation over posted and pending counters,
/// directional limits, pending-post bounds, and strictly increasing
/// timestamps.
pub fn validate_state(store: &Store) -> Result<(), StateValidationError> {
    let mut debits_posted: u128 = 0;
    let mut credits_posted: u128 = 0;
    let mut debits_pending: u128 = 0;
    let mut credits_pending: u128 = 0;

    for account in store.accounts() {
        debits_posted = debits_posted
            .checked_add(account.debits_posted)
            .ok_or(StateValidationError::SumOverflow)?;
        credits_posted = credits_posted
            .checked_add(account.credits_posted)
            .ok_or(StateValidationError::SumOverflow)?;
        debits_pending = debits_pending
            .checked_add(account.debits_pending)
            .ok_or(StateValidationError::SumOverflow)?;
        credits_pending = credits_pending
            .checked_add(account.credits_pending)
            .ok_or(StateValidationError::SumOverflow)?;

        if account.flags.debits_must_not_exceed_credits() {
            let in_flight = account
                .debits_posted
                .checked_add(account.debits_pending)
                .ok_or(StateValidationError::SumOverflow)?;
            if in_flight > account.credits_posted {
                return Err(StateValidationError::DirectionalLimit {
                    account_id: account.id,
                });
            }
        }
        if account.flags.credits_must_not_exceed_debits() {
            let in_flight = account
                .credits_posted
                .checked_add(account.credits_pending)
                .ok_or(StateValidationError::SumOverflow)?;
            if in_flight > account.debits_posted {
                return Err(StateValidationError::DirectionalLimit {
                    account_id: account.id,
                });
            }
        }
    }

    if debits_posted != credits_posted {
        return Err(StateValidationError::PostedConservation {
            debits: debits_posted,
            credits: credits_posted,
        });
    }
    if debits_pending != credits_pending {
        return Err(StateValidationError::PendingConservation {
            debits: debits_pending,
            credits: credits_pending,
        });
    }

    for info in store.pending_transfers() {
        if info.amount_posted > info.original_amount {
            return Err(StateValidationError::PendingOverPosted { id: info.id });
        }
    }

    // Commit order within each table must carry strictly increasing
    // timestamps, and no timestamp repeats across tables.
    let account_timestamps: Vec<u64> = store.accounts().iter().map(|a| a.timestamp).collect();
    let transfer_timestamps: Vec<u64> = store.transfers().iter().map(|t| t.timestamp).collect();
    for table in [&account_timestamps, &transfer_timestamps] {
        for pair in table.windows(2) {
            if pair[1] <= pair[0] {
                return Err(StateValidationError::NonMonotonicTimestamp { timestamp: pair[1] });
            }
        }
    }
    let mut all_timestamps = account_timestamps;
    all_timestamps.extend(transfer_timestamps);
    all_timestamps.sort_unstable();
    for pair in all_timestamps.windows(2) {
        if pair[1] == pair[0] {
            return Err(StateValidationError::NonMonotonicTimestamp { timestamp: pair[1] });
        }
    }

    Ok(())
}
