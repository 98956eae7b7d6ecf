//! Two-phase completion engine
//!
//! Posts and voids against a previously committed pending transfer.
//! A post moves some or all of the reserved amount from the `_pending`
//! counters to the `_posted` counters; partial posts may repeat until
//! the original amount is consumed. A void releases the remainder.
//!
//! Expiration is lazy: it is detected here, when a completion
//! references the entry, and the entry is marked Expired. The reserved
//! amounts stay in the `_pending` counters; the engine runs no sweeper.

use crate::core::math::{checked_add_u128, saturating_sub_u128};
use crate::models::{CreateTransferResult, PendingState, Transfer};
use crate::store::Store;

/// Apply a post or void completion. The caller has already validated
/// the record structurally and resolved both account slots from the
/// submitted ids.
pub(crate) fn complete_transfer(
    store: &mut Store,
    submitted: &Transfer,
    debit_slot: usize,
    credit_slot: usize,
    timestamp: u64,
) -> CreateTransferResult {
    let original_slot = match store.find_transfer(submitted.pending_id) {
        Some(slot) => slot,
        None => return CreateTransferResult::PendingTransferNotFound,
    };
    let info_slot = match store.find_pending(submitted.pending_id) {
        Some(slot) => slot,
        None => return CreateTransferResult::PendingTransferNotPending,
    };

    match store.pending(info_slot).state {
        PendingState::Active => {}
        PendingState::Posted => return CreateTransferResult::PendingTransferAlreadyPosted,
        PendingState::Voided => return CreateTransferResult::PendingTransferAlreadyVoided,
        PendingState::Expired => return CreateTransferResult::PendingTransferExpired,
    }

    if store.pending(info_slot).is_expired_at(timestamp) {
        store.pending_mut(info_slot).state = PendingState::Expired;
        return CreateTransferResult::PendingTransferExpired;
    }

    // The completion must restate the original transfer's parties
    let original = *store.transfer(original_slot);
    if submitted.debit_account_id != original.debit_account_id {
        return CreateTransferResult::PendingTransferHasDifferentDebitAccountId;
    }
    if submitted.credit_account_id != original.credit_account_id {
        return CreateTransferResult::PendingTransferHasDifferentCreditAccountId;
    }
    if submitted.ledger != original.ledger {
        return CreateTransferResult::PendingTransferHasDifferentLedger;
    }
    if submitted.code != original.code {
        return CreateTransferResult::PendingTransferHasDifferentCode;
    }

    let remaining = store.pending(info_slot).remaining();

    if submitted.flags.post_pending_transfer() {
        // A zero amount posts everything that is left
        let amount = if submitted.amount == 0 {
            remaining
        } else {
            submitted.amount
        };
        if amount > remaining {
            return CreateTransferResult::ExceedsPendingTransferAmount;
        }

        {
            let debit = store.account(debit_slot);
            if checked_add_u128(debit.debits_posted, amount).is_none() {
                return CreateTransferResult::OverflowsDebitsPosted;
            }
            let credit = store.account(credit_slot);
            if checked_add_u128(credit.credits_posted, amount).is_none() {
                return CreateTransferResult::OverflowsCreditsPosted;
            }
        }
        if store.transfers_full() {
            return CreateTransferResult::ReservedFlag;
        }

        // In steady state the pending counters hold at least `amount`
        // by construction; the subtraction still must not wrap.
        {
            let debit = store.account_mut(debit_slot);
            debit.debits_pending = saturating_sub_u128(debit.debits_pending, amount);
            debit.debits_posted += amount;
        }
        {
            let credit = store.account_mut(credit_slot);
            credit.credits_pending = saturating_sub_u128(credit.credits_pending, amount);
            credit.credits_posted += amount;
        }

        {
            let info = store.pending_mut(info_slot);
            info.amount_posted += amount;
            if info.amount_posted == info.original_amount {
                info.state = PendingState::Posted;
            }
        }

        append_completion(store, submitted, amount, timestamp)
    } else {
        // Void: the submitted amount is ignored; the full remainder is
        // released and recorded on the completion transfer.
        if store.transfers_full() {
            return CreateTransferResult::ReservedFlag;
        }

        {
            let debit = store.account_mut(debit_slot);
            debit.debits_pending = saturating_sub_u128(debit.debits_pending, remaining);
        }
        {
            let credit = store.account_mut(credit_slot);
            credit.credits_pending = saturating_sub_u128(credit.credits_pending, remaining);
        }
        store.pending_mut(info_slot).state = PendingState::Voided;

        // Voiding a closing transfer reopens the accounts it closed
        if original.flags.closing_debit() {
            store
                .account_mut(debit_slot)
                .flags
                .remove(crate::models::AccountFlags::CLOSED);
        }
        if original.flags.closing_credit() {
            store
                .account_mut(credit_slot)
                .flags
                .remove(crate::models::AccountFlags::CLOSED);
        }

        append_completion(store, submitted, remaining, timestamp)
    }
}

/// Append the completion transfer with the effective amount.
fn append_completion(
    store: &mut Store,
    submitted: &Transfer,
    amount: u128,
    timestamp: u64,
) -> CreateTransferResult {
    let stored = Transfer {
        amount,
        timestamp,
        ..*submitted
    };
    // Capacity was verified before any counter moved.
    let _ = store.insert_transfer(stored);
    CreateTransferResult::Ok
}
