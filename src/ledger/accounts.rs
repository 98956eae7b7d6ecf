//! Account validator & creator
//!
//! Field-level validation, duplicate detection with the
//! "exists-with-different" disambiguation cascade, and commit. The
//! first failed check wins; a failed record changes nothing.

use crate::models::{Account, CreateAccountResult};
use crate::store::Store;

/// Validate `submitted` and, if acceptable, append it with the four
/// balance counters zeroed and `timestamp` assigned.
pub(crate) fn create_account(
    store: &mut Store,
    submitted: &Account,
    timestamp: u64,
) -> CreateAccountResult {
    if submitted.reserved != 0 {
        return CreateAccountResult::ReservedField;
    }
    if submitted.flags.has_padding_bits() {
        return CreateAccountResult::ReservedFlag;
    }
    if submitted.id == 0 {
        return CreateAccountResult::IdMustNotBeZero;
    }
    if submitted.id == u128::MAX {
        return CreateAccountResult::IdMustNotBeIntMax;
    }
    if submitted.flags.debits_must_not_exceed_credits()
        && submitted.flags.credits_must_not_exceed_debits()
    {
        return CreateAccountResult::FlagsAreMutuallyExclusive;
    }
    if submitted.debits_pending != 0 {
        return CreateAccountResult::DebitsPendingMustBeZero;
    }
    if submitted.debits_posted != 0 {
        return CreateAccountResult::DebitsPostedMustBeZero;
    }
    if submitted.credits_pending != 0 {
        return CreateAccountResult::CreditsPendingMustBeZero;
    }
    if submitted.credits_posted != 0 {
        return CreateAccountResult::CreditsPostedMustBeZero;
    }
    if submitted.ledger == 0 {
        return CreateAccountResult::LedgerMustNotBeZero;
    }
    if submitted.code == 0 {
        return CreateAccountResult::CodeMustNotBeZero;
    }

    if let Some(slot) = store.find_account(submitted.id) {
        return existing_account_result(store.account(slot), submitted);
    }

    let stored = Account {
        debits_pending: 0,
        debits_posted: 0,
        credits_pending: 0,
        credits_posted: 0,
        timestamp,
        ..*submitted
    };
    match store.insert_account(stored) {
        Ok(_) => CreateAccountResult::Ok,
        // No dedicated capacity code exists in the enumeration; the
        // original reports the reserved-field placeholder.
        Err(_) => CreateAccountResult::ReservedField,
    }
}

/// Idempotency cascade: compare against the stored account in field
/// order and report the first mismatch, or `exists` for an identical
/// re-submission.
fn existing_account_result(existing: &Account, submitted: &Account) -> CreateAccountResult {
    if existing.flags != submitted.flags {
        return CreateAccountResult::ExistsWithDifferentFlags;
    }
    if existing.user_data_128 != submitted.user_data_128 {
        return CreateAccountResult::ExistsWithDifferentUserData128;
    }
    if existing.user_data_64 != submitted.user_data_64 {
        return CreateAccountResult::ExistsWithDifferentUserData64;
    }
    if existing.user_data_32 != submitted.user_data_32 {
        return CreateAccountResult::ExistsWithDifferentUserData32;
    }
    if existing.ledger != submitted.ledger {
        return CreateAccountResult::ExistsWithDifferentLedger;
    }
    if existing.code != submitted.code {
        return CreateAccountResult::ExistsWithDifferentCode;
    }
    CreateAccountResult::Exists
}
