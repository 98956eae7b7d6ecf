//! Snapshot Codec Tests
//!
//! Round-trip identity, legacy version-1 loads, size accounting, and
//! rejection of malformed or over-capacity snapshots through the
//! public engine API.

use ledger_core_rs::ledger::snapshot::{
    compute_config_hash, state_size, SNAPSHOT_HEADER_SIZE, SNAPSHOT_MAGIC,
};
use ledger_core_rs::{
    Account, EngineConfig, Ledger, SnapshotError, Transfer, TransferFlags,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn test_config() -> EngineConfig {
    EngineConfig {
        max_accounts: 32,
        max_transfers: 32,
        max_pending_transfers: 32,
    }
}

/// A ledger with two accounts, one posted transfer, and one pending
/// transfer — every table populated.
fn populated_ledger() -> Ledger {
    let mut ledger = Ledger::new(test_config()).expect("valid config");

    let accounts: Vec<Account> = (1..=2u128)
        .map(|id| Account {
            id,
            ledger: 1,
            code: 1,
            ..Account::default()
        })
        .collect();
    assert!(ledger.create_accounts(&accounts, 100).is_empty());

    let posted = Transfer {
        id: 100,
        debit_account_id: 1,
        credit_account_id: 2,
        amount: 50,
        ledger: 1,
        code: 1,
        ..Transfer::default()
    };
    let pending = Transfer {
        id: 101,
        debit_account_id: 1,
        credit_account_id: 2,
        amount: 30,
        timeout: 60,
        ledger: 1,
        code: 1,
        flags: TransferFlags::PENDING,
        ..Transfer::default()
    };
    assert!(ledger.create_transfers(&[posted, pending], 200).is_empty());
    ledger
}

// ============================================================================
// Round Trip
// ============================================================================

#[test]
fn test_round_trip_restores_identical_state() {
    let ledger = populated_ledger();
    let mut buf = vec![0u8; ledger.state_size()];
    let written = ledger.save_state(&mut buf).expect("saves");
    assert_eq!(written, buf.len());

    let mut restored = Ledger::new(test_config()).expect("valid config");
    restored.load_state(&buf).expect("loads");

    assert_eq!(restored.accounts(), ledger.accounts());
    assert_eq!(restored.transfers(), ledger.transfers());
    assert_eq!(restored.pending_transfers(), ledger.pending_transfers());
    assert_eq!(restored.commit_timestamp(), ledger.commit_timestamp());
    restored.validate().expect("restored state is consistent");
}

#[test]
fn test_save_load_save_is_byte_identical() {
    let ledger = populated_ledger();
    let mut first = vec![0u8; ledger.state_size()];
    ledger.save_state(&mut first).expect("saves");

    let mut restored = Ledger::new(test_config()).expect("valid config");
    restored.load_state(&first).expect("loads");
    let mut second = vec![0u8; restored.state_size()];
    restored.save_state(&mut second).expect("saves again");

    assert_eq!(first, second);
}

#[test]
fn test_state_size_matches_tables() {
    let ledger = populated_ledger();
    assert_eq!(
        ledger.state_size(),
        state_size(2, 2, 1),
        "2 accounts, 2 transfers, 1 pending entry"
    );
}

#[test]
fn test_engine_continues_after_load() {
    let ledger = populated_ledger();
    let mut buf = vec![0u8; ledger.state_size()];
    ledger.save_state(&mut buf).expect("saves");

    let mut restored = Ledger::new(test_config()).expect("valid config");
    restored.load_state(&buf).expect("loads");

    // The restored engine accepts new work against the loaded state
    let next = Transfer {
        id: 102,
        debit_account_id: 1,
        credit_account_id: 2,
        amount: 5,
        ledger: 1,
        code: 1,
        ..Transfer::default()
    };
    assert!(restored.create_transfers(&[next], 9_000).is_empty());
    assert_eq!(restored.lookup_accounts(&[1])[0].debits_posted, 55);
}

// ============================================================================
// Failure Modes
// ============================================================================

#[test]
fn test_save_into_undersized_buffer_refused() {
    let ledger = populated_ledger();
    let mut buf = vec![0u8; ledger.state_size() - 1];
    assert!(matches!(
        ledger.save_state(&mut buf),
        Err(SnapshotError::BufferTooSmall { .. })
    ));
}

#[test]
fn test_load_rejects_corrupt_magic() {
    let ledger = populated_ledger();
    let mut buf = vec![0u8; ledger.state_size()];
    ledger.save_state(&mut buf).expect("saves");
    buf[0] = 0;

    let mut restored = Ledger::new(test_config()).expect("valid config");
    assert!(matches!(
        restored.load_state(&buf),
        Err(SnapshotError::BadMagic { .. })
    ));
}

#[test]
fn test_load_rejects_truncated_body() {
    let ledger = populated_ledger();
    let mut buf = vec![0u8; ledger.state_size()];
    ledger.save_state(&mut buf).expect("saves");
    buf.truncate(buf.len() - 1);

    let mut restored = Ledger::new(test_config()).expect("valid config");
    assert!(matches!(
        restored.load_state(&buf),
        Err(SnapshotError::LengthMismatch { .. })
    ));
}

#[test]
fn test_load_rejects_snapshot_exceeding_capacity() {
    let ledger = populated_ledger();
    let mut buf = vec![0u8; ledger.state_size()];
    ledger.save_state(&mut buf).expect("saves");

    // An engine configured smaller than the snapshot's account count
    let mut tiny = Ledger::new(EngineConfig {
        max_accounts: 1,
        max_transfers: 32,
        max_pending_transfers: 32,
    })
    .expect("valid config");
    assert_eq!(
        tiny.load_state(&buf),
        Err(SnapshotError::TooManyAccounts {
            count: 2,
            capacity: 1
        })
    );
}

// ============================================================================
// Legacy Version 1
// ============================================================================

#[test]
fn test_version_1_snapshot_loads_into_version_2_state() {
    // Hand-build a v1 snapshot: accounts only, legacy header layout
    let account = Account {
        id: 5,
        ledger: 1,
        code: 1,
        timestamp: 400,
        ..Account::default()
    };
    let mut buf = vec![0u8; SNAPSHOT_HEADER_SIZE + Account::WIRE_SIZE];
    buf[0..4].copy_from_slice(&SNAPSHOT_MAGIC.to_le_bytes());
    buf[4..8].copy_from_slice(&1u32.to_le_bytes());
    buf[8..12].copy_from_slice(&1u32.to_le_bytes());
    buf[12..20].copy_from_slice(&400u64.to_le_bytes());
    buf[20..28].copy_from_slice(&0u64.to_le_bytes());
    buf[28..].copy_from_slice(&account.to_bytes());

    let mut ledger = Ledger::new(test_config()).expect("valid config");
    ledger.load_state(&buf).expect("legacy snapshot loads");

    assert_eq!(ledger.accounts().len(), 1);
    assert_eq!(ledger.accounts()[0].id, 5);
    assert!(ledger.transfers().is_empty());
    assert!(ledger.pending_transfers().is_empty());
    assert_eq!(ledger.commit_timestamp(), 400);
}

// ============================================================================
// Config Hash
// ============================================================================

#[test]
fn test_config_hash_pairs_snapshot_with_configuration() {
    let hash_a = compute_config_hash(&test_config()).expect("hashes");
    let hash_b = compute_config_hash(&test_config()).expect("hashes");
    assert_eq!(hash_a, hash_b, "same config must produce the same hash");

    let hash_c = compute_config_hash(&EngineConfig::default()).expect("hashes");
    assert_ne!(hash_a, hash_c, "different capacities must not collide");
}
