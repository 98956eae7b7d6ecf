//! Transfer validator & applier
//!
//! The central algorithm of the engine. Validation runs in a fixed
//! order and the first failure wins; a failed record changes nothing.
//! A record that passes validation is applied atomically: both account
//! sides, the side table, and the transfer table are mutated together.
//!
//! # Critical Invariants
//!
//! - **Atomicity**: debit and credit counters move together, or neither
//! - **Conservation**: the sums of posted (and of pending) debits and
//!   credits over all accounts remain equal
//! - **Directional limits**: an account with a balance limit never ends
//!   a committed record in violation of it
//! - **No wrap**: every counter bump is overflow-checked up front

use crate::core::math::{checked_add_u128, saturating_sub_u128};
use crate::core::time::expiry_timestamp;
use crate::models::{CreateTransferResult, PendingTransferInfo, Transfer};
use crate::store::Store;

use super::two_phase;

/// Validate `submitted` and, if acceptable, apply it and append it with
/// the final amount and the assigned `timestamp`.
pub(crate) fn create_transfer(
    store: &mut Store,
    submitted: &Transfer,
    timestamp: u64,
) -> CreateTransferResult {
    // 1. Structural validation and idempotent re-submission detection
    if submitted.flags.has_padding_bits() {
        return CreateTransferResult::ReservedFlag;
    }
    if submitted.id == 0 {
        return CreateTransferResult::IdMustNotBeZero;
    }
    if submitted.id == u128::MAX {
        return CreateTransferResult::IdMustNotBeIntMax;
    }
    if let Some(slot) = store.find_transfer(submitted.id) {
        return existing_transfer_result(store.transfer(slot), submitted);
    }

    // 2. Two-phase flag cardinality
    let flags = submitted.flags;
    let two_phase_flags = [
        flags.pending(),
        flags.post_pending_transfer(),
        flags.void_pending_transfer(),
    ];
    if two_phase_flags.iter().filter(|&&set| set).count() > 1 {
        return CreateTransferResult::FlagsAreMutuallyExclusive;
    }
    let is_pending = flags.pending();
    let is_completion = flags.post_pending_transfer() || flags.void_pending_transfer();

    // 3. Account id validity
    if submitted.debit_account_id == 0 {
        return CreateTransferResult::DebitAccountIdMustNotBeZero;
    }
    if submitted.debit_account_id == u128::MAX {
        return CreateTransferResult::DebitAccountIdMustNotBeIntMax;
    }
    if submitted.credit_account_id == 0 {
        return CreateTransferResult::CreditAccountIdMustNotBeZero;
    }
    if submitted.credit_account_id == u128::MAX {
        return CreateTransferResult::CreditAccountIdMustNotBeIntMax;
    }
    if submitted.debit_account_id == submitted.credit_account_id {
        return CreateTransferResult::AccountsMustBeDifferent;
    }

    // 4. pending_id is reserved for completions
    if is_completion {
        if submitted.pending_id == 0 {
            return CreateTransferResult::PendingIdMustNotBeZero;
        }
        if submitted.pending_id == u128::MAX {
            return CreateTransferResult::PendingIdMustNotBeIntMax;
        }
        if submitted.pending_id == submitted.id {
            return CreateTransferResult::PendingIdMustBeDifferent;
        }
    } else if submitted.pending_id != 0 {
        return CreateTransferResult::PendingIdMustBeZero;
    }

    // 5. timeout is reserved for pending transfers
    if submitted.timeout != 0 && !is_pending {
        return CreateTransferResult::TimeoutReservedForPendingTransfer;
    }

    // 6. ledger / code
    if submitted.ledger == 0 {
        return CreateTransferResult::LedgerMustNotBeZero;
    }
    if submitted.code == 0 {
        return CreateTransferResult::CodeMustNotBeZero;
    }

    // 7. Account resolution
    let debit_slot = match store.find_account(submitted.debit_account_id) {
        Some(slot) => slot,
        None => return CreateTransferResult::DebitAccountNotFound,
    };
    let credit_slot = match store.find_account(submitted.credit_account_id) {
        Some(slot) => slot,
        None => return CreateTransferResult::CreditAccountNotFound,
    };

    // 8. Ledger agreement
    {
        let debit = store.account(debit_slot);
        let credit = store.account(credit_slot);
        if debit.ledger != credit.ledger {
            return CreateTransferResult::AccountsMustHaveTheSameLedger;
        }
        if submitted.ledger != debit.ledger {
            return CreateTransferResult::TransferMustHaveTheSameLedgerAsAccounts;
        }

        // 9. Closed accounts reject new transfers. Voids are exempt so
        // a closing transfer can always be unwound.
        if !flags.void_pending_transfer() {
            if debit.is_closed() {
                return CreateTransferResult::DebitAccountAlreadyClosed;
            }
            if credit.is_closed() {
                return CreateTransferResult::CreditAccountAlreadyClosed;
            }
        }
    }

    // Closing a side is only meaningful for a pending transfer: the
    // closure must be voidable to be reversible.
    if (flags.closing_debit() || flags.closing_credit()) && !is_pending {
        return CreateTransferResult::ClosingTransferMustBePending;
    }

    // 10. Post/void branch to the completion engine
    if is_completion {
        return two_phase::complete_transfer(store, submitted, debit_slot, credit_slot, timestamp);
    }

    // 11. Directional balance limits with balancing adjustment. When
    // both sides adjust, the second pass sees the already-reduced
    // amount, so the smaller cap wins.
    let mut amount = submitted.amount;
    {
        let debit = store.account(debit_slot);
        if debit.flags.debits_must_not_exceed_credits() {
            let in_flight = checked_add_u128(debit.debits_posted, debit.debits_pending)
                .unwrap_or(u128::MAX);
            let available = saturating_sub_u128(debit.credits_posted, in_flight);
            if amount > available {
                if !flags.balancing_debit() || available == 0 {
                    return CreateTransferResult::ExceedsCredits;
                }
                amount = available;
            }
        }
    }
    {
        let credit = store.account(credit_slot);
        if credit.flags.credits_must_not_exceed_debits() {
            let in_flight = checked_add_u128(credit.credits_posted, credit.credits_pending)
                .unwrap_or(u128::MAX);
            let available = saturating_sub_u128(credit.debits_posted, in_flight);
            if amount > available {
                if !flags.balancing_credit() || available == 0 {
                    return CreateTransferResult::ExceedsDebits;
                }
                amount = available;
            }
        }
    }

    // 12. Overflow checks on the counters the apply step will touch
    {
        let debit = store.account(debit_slot);
        let credit = store.account(credit_slot);
        if is_pending {
            if checked_add_u128(debit.debits_pending, amount).is_none() {
                return CreateTransferResult::OverflowsDebitsPending;
            }
            if checked_add_u128(credit.credits_pending, amount).is_none() {
                return CreateTransferResult::OverflowsCreditsPending;
            }
        } else {
            if checked_add_u128(debit.debits_posted, amount).is_none() {
                return CreateTransferResult::OverflowsDebitsPosted;
            }
            if checked_add_u128(credit.credits_posted, amount).is_none() {
                return CreateTransferResult::OverflowsCreditsPosted;
            }
        }
    }

    // 13. Capacity. No dedicated code exists in the enumeration; the
    // original reports the reserved-flag placeholder.
    if store.transfers_full() {
        return CreateTransferResult::ReservedFlag;
    }
    if is_pending && store.pending_full() {
        return CreateTransferResult::ReservedFlag;
    }

    // 14. Apply, all sides together
    if is_pending {
        store.account_mut(debit_slot).debits_pending += amount;
        store.account_mut(credit_slot).credits_pending += amount;

        let expires_at = expiry_timestamp(timestamp, submitted.timeout);
        let info = PendingTransferInfo::new(submitted.id, amount, expires_at);
        // Capacity verified at step 13; the table cannot be full here.
        let _ = store.insert_pending(info);
    } else {
        store.account_mut(debit_slot).debits_posted += amount;
        store.account_mut(credit_slot).credits_posted += amount;
    }

    if flags.closing_debit() {
        store
            .account_mut(debit_slot)
            .flags
            .insert(crate::models::AccountFlags::CLOSED);
    }
    if flags.closing_credit() {
        store
            .account_mut(credit_slot)
            .flags
            .insert(crate::models::AccountFlags::CLOSED);
    }

    // 15. Append with the final (possibly balanced) amount
    let stored = Transfer {
        amount,
        timestamp,
        ..*submitted
    };
    // Capacity verified at step 13; the table cannot be full here.
    let _ = store.insert_transfer(stored);

    CreateTransferResult::Ok
}

/// Idempotency cascade: compare against the stored transfer in field
/// order and report the first mismatch, or `exists` for an identical
/// re-submission. The stored amount is the applied amount, so a
/// balancing transfer whose amount was adjusted reports
/// `exists_with_different_amount` on re-submission.
fn existing_transfer_result(existing: &Transfer, submitted: &Transfer) -> CreateTransferResult {
    if existing.flags != submitted.flags {
        return CreateTransferResult::ExistsWithDifferentFlags;
    }
    if existing.debit_account_id != submitted.debit_account_id {
        return CreateTransferResult::ExistsWithDifferentDebitAccountId;
    }
    if existing.credit_account_id != submitted.credit_account_id {
        return CreateTransferResult::ExistsWithDifferentCreditAccountId;
    }
    if existing.amount != submitted.amount {
        return CreateTransferResult::ExistsWithDifferentAmount;
    }
    if existing.pending_id != submitted.pending_id {
        return CreateTransferResult::ExistsWithDifferentPendingId;
    }
    if existing.user_data_128 != submitted.user_data_128 {
        return CreateTransferResult::ExistsWithDifferentUserData128;
    }
    if existing.user_data_64 != submitted.user_data_64 {
        return CreateTransferResult::ExistsWithDifferentUserData64;
    }
    if existing.user_data_32 != submitted.user_data_32 {
        return CreateTransferResult::ExistsWithDifferentUserData32;
    }
    if existing.timeout != submitted.timeout {
        return CreateTransferResult::ExistsWithDifferentTimeout;
    }
    if existing.code != submitted.code {
        return CreateTransferResult::ExistsWithDifferentCode;
    }
    CreateTransferResult::Exists
}
