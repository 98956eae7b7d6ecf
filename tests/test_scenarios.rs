//! End-to-End Scenarios
//!
//! Full flows through the public engine API: basic settlement,
//! two-phase posting, voids, balance limits with balancing retries,
//! batch idempotency, and snapshot round-trips, with the double-entry
//! conservation invariants audited along the way.

use ledger_core_rs::{
    Account, AccountFlags, CreateAccountResult, CreateTransferResult, EngineConfig, Ledger,
    PendingState, Transfer, TransferFlags,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn test_ledger() -> Ledger {
    Ledger::new(EngineConfig {
        max_accounts: 64,
        max_transfers: 64,
        max_pending_transfers: 64,
    })
    .expect("valid config")
}

fn account(id: u128) -> Account {
    Account {
        id,
        ledger: 1,
        code: 1,
        ..Account::default()
    }
}

fn transfer(id: u128, debit: u128, credit: u128, amount: u128) -> Transfer {
    Transfer {
        id,
        debit_account_id: debit,
        credit_account_id: credit,
        amount,
        ledger: 1,
        code: 1,
        ..Transfer::default()
    }
}

fn posted_sums(ledger: &Ledger) -> (u128, u128) {
    let debits = ledger.accounts().iter().map(|a| a.debits_posted).sum();
    let credits = ledger.accounts().iter().map(|a| a.credits_posted).sum();
    (debits, credits)
}

// ============================================================================
// Scenario 1: Basic Transfer
// ============================================================================

#[test]
fn test_basic_transfer_settles_both_sides() {
    let mut ledger = test_ledger();
    assert!(ledger
        .create_accounts(&[account(1), account(2)], 100)
        .is_empty());
    assert!(ledger
        .create_transfers(&[transfer(100, 1, 2, 50)], 200)
        .is_empty());

    let a = &ledger.lookup_accounts(&[1])[0];
    let b = &ledger.lookup_accounts(&[2])[0];
    assert_eq!(a.debits_posted, 50);
    assert_eq!(b.credits_posted, 50);

    let (debits, credits) = posted_sums(&ledger);
    assert_eq!(debits, credits, "double-entry conservation");
    ledger.validate().expect("state is consistent");
}

// ============================================================================
// Scenario 2: Two-Phase Post
// ============================================================================

#[test]
fn test_two_phase_post_in_two_steps() {
    let mut ledger = test_ledger();
    ledger.create_accounts(&[account(1), account(2)], 100);

    let mut pending = transfer(101, 1, 2, 100);
    pending.flags = TransferFlags::PENDING;
    pending.timeout = 60;
    assert!(ledger.create_transfers(&[pending], 200).is_empty());
    assert_eq!(ledger.lookup_accounts(&[1])[0].debits_pending, 100);

    let mut first_post = transfer(102, 1, 2, 40);
    first_post.flags = TransferFlags::POST_PENDING_TRANSFER;
    first_post.pending_id = 101;
    assert!(ledger.create_transfers(&[first_post], 300).is_empty());

    let mut final_post = transfer(103, 1, 2, 0);
    final_post.flags = TransferFlags::POST_PENDING_TRANSFER;
    final_post.pending_id = 101;
    assert!(ledger.create_transfers(&[final_post], 400).is_empty());

    let a = &ledger.lookup_accounts(&[1])[0];
    assert_eq!(a.debits_pending, 0);
    assert_eq!(a.debits_posted, 100);
    ledger.validate().expect("state is consistent");
}

// ============================================================================
// Scenario 3: Void
// ============================================================================

#[test]
fn test_void_releases_and_records_remainder() {
    let mut ledger = test_ledger();
    ledger.create_accounts(&[account(1), account(2)], 100);

    let mut pending = transfer(200, 1, 2, 75);
    pending.flags = TransferFlags::PENDING;
    assert!(ledger.create_transfers(&[pending], 200).is_empty());

    let mut void = transfer(201, 1, 2, 0);
    void.flags = TransferFlags::VOID_PENDING_TRANSFER;
    void.pending_id = 200;
    assert!(ledger.create_transfers(&[void], 300).is_empty());

    let a = &ledger.lookup_accounts(&[1])[0];
    let b = &ledger.lookup_accounts(&[2])[0];
    assert_eq!(a.debits_pending, 0);
    assert_eq!(b.credits_pending, 0);
    assert_eq!(ledger.lookup_transfers(&[201])[0].amount, 75);
    assert_eq!(ledger.pending_transfers()[0].state, PendingState::Voided);
}

// ============================================================================
// Scenario 4: Balance Limit with Balancing Retry
// ============================================================================

#[test]
fn test_limit_rejection_then_balancing_retry() {
    let mut ledger = test_ledger();
    let mut limited = account(1);
    limited.flags = AccountFlags::DEBITS_MUST_NOT_EXCEED_CREDITS;
    assert!(ledger
        .create_accounts(&[limited, account(2)], 100)
        .is_empty());

    // Fund the limited account with 30
    assert!(ledger
        .create_transfers(&[transfer(300, 2, 1, 30)], 200)
        .is_empty());

    // 50 out exceeds the 30 of credit cover
    let failures = ledger.create_transfers(&[transfer(301, 1, 2, 50)], 300);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].result, CreateTransferResult::ExceedsCredits);

    // Balancing retry settles the maximum permitted amount
    let mut retry = transfer(302, 1, 2, 50);
    retry.flags = TransferFlags::BALANCING_DEBIT;
    assert!(ledger.create_transfers(&[retry], 400).is_empty());

    assert_eq!(ledger.lookup_transfers(&[302])[0].amount, 30);
    assert_eq!(ledger.lookup_accounts(&[1])[0].debits_posted, 30);
    ledger.validate().expect("limit holds after balancing");
}

// ============================================================================
// Scenario 5: Batch Idempotency
// ============================================================================

#[test]
fn test_resubmitted_account_batch_is_idempotent() {
    let mut ledger = test_ledger();
    let batch = [account(1), account(2), account(3)];

    assert!(ledger.create_accounts(&batch, 100).is_empty());
    let second = ledger.create_accounts(&batch, 200);

    assert_eq!(second.len(), 3, "one entry per record");
    for (i, entry) in second.iter().enumerate() {
        assert_eq!(entry.index, i as u32);
        assert_eq!(entry.result, CreateAccountResult::Exists);
    }
    assert_eq!(ledger.accounts().len(), 3, "no second creation");
}

#[test]
fn test_resubmitted_transfer_is_idempotent() {
    let mut ledger = test_ledger();
    ledger.create_accounts(&[account(1), account(2)], 100);

    let t = transfer(100, 1, 2, 25);
    assert!(ledger.create_transfers(&[t], 200).is_empty());
    let failures = ledger.create_transfers(&[t], 300);
    assert_eq!(failures[0].result, CreateTransferResult::Exists);
    assert_eq!(ledger.lookup_accounts(&[1])[0].debits_posted, 25);
}

// ============================================================================
// Scenario 6: Snapshot Round-Trip Mid-Flow
// ============================================================================

#[test]
fn test_snapshot_round_trip_preserves_balances() {
    let mut ledger = test_ledger();
    ledger.create_accounts(&[account(1), account(2)], 100);
    assert!(ledger
        .create_transfers(&[transfer(100, 1, 2, 50)], 200)
        .is_empty());

    let mut pending = transfer(101, 1, 2, 100);
    pending.flags = TransferFlags::PENDING;
    pending.timeout = 60;
    assert!(ledger.create_transfers(&[pending], 300).is_empty());

    let mut buf = vec![0u8; ledger.state_size()];
    ledger.save_state(&mut buf).expect("saves");

    // Fresh engine, restored state
    let mut restored = test_ledger();
    restored.load_state(&buf).expect("loads");

    let before = ledger.lookup_accounts(&[1, 2]);
    let after = restored.lookup_accounts(&[1, 2]);
    assert_eq!(before, after, "identical balances after reload");

    // The pending transfer can still be completed after the reload
    let mut post = transfer(102, 1, 2, 0);
    post.flags = TransferFlags::POST_PENDING_TRANSFER;
    post.pending_id = 101;
    assert!(restored.create_transfers(&[post], 400).is_empty());
    assert_eq!(restored.lookup_accounts(&[1])[0].debits_posted, 150);
    restored.validate().expect("state is consistent");
}

// ============================================================================
// Mixed Flow Invariants
// ============================================================================

#[test]
fn test_conservation_across_a_mixed_batch_sequence() {
    let mut ledger = test_ledger();
    let accounts: Vec<Account> = (1..=4u128).map(account).collect();
    assert!(ledger.create_accounts(&accounts, 100).is_empty());

    let mut pending = transfer(201, 1, 2, 40);
    pending.flags = TransferFlags::PENDING;
    let mut void_target = transfer(202, 3, 4, 10);
    void_target.flags = TransferFlags::PENDING;

    let batch = [
        transfer(200, 1, 2, 15),
        pending,
        void_target,
        transfer(203, 2, 3, 5),
    ];
    assert!(ledger.create_transfers(&batch, 200).is_empty());

    let mut post = transfer(204, 1, 2, 40);
    post.flags = TransferFlags::POST_PENDING_TRANSFER;
    post.pending_id = 201;
    let mut void = transfer(205, 3, 4, 0);
    void.flags = TransferFlags::VOID_PENDING_TRANSFER;
    void.pending_id = 202;
    assert!(ledger.create_transfers(&[post, void], 300).is_empty());

    let (debits, credits) = posted_sums(&ledger);
    assert_eq!(debits, credits);
    ledger.validate().expect("all invariants hold");

    // Timestamps across committed records are strictly increasing
    let mut timestamps: Vec<u64> = ledger
        .accounts()
        .iter()
        .map(|a| a.timestamp)
        .chain(ledger.transfers().iter().map(|t| t.timestamp))
        .collect();
    let mut sorted = timestamps.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), timestamps.len(), "timestamps are unique");
    timestamps.sort_unstable();
    assert_eq!(timestamps, sorted);
}
