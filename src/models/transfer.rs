//! Transfer record
//!
//! An immutable record of a directed movement of a u128 amount between
//! two accounts, or a two-phase operation (post/void) against a prior
//! pending transfer. The stored `amount` is the amount actually applied,
//! which may differ from the submitted amount under balancing or
//! post-of-zero semantics.
//!
//! The 128-byte wire layout is part of the external contract.

use serde::{Deserialize, Serialize};

use crate::models::{u128_at, u16_at, u32_at, u64_at};

/// Transfer flag bits (u16 bit field).
///
/// `pending`, `post_pending_transfer`, and `void_pending_transfer` are
/// pairwise mutually exclusive. The upper bits are padding and must be
/// zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferFlags(u16);

impl TransferFlags {
    /// Reserved for batch chaining; stored verbatim.
    pub const LINKED: Self = Self(1 << 0);
    /// Reserve the amount in the `_pending` counters, to be posted or
    /// voided later.
    pub const PENDING: Self = Self(1 << 1);
    /// Post (possibly partially) a prior pending transfer.
    pub const POST_PENDING_TRANSFER: Self = Self(1 << 2);
    /// Void the remainder of a prior pending transfer.
    pub const VOID_PENDING_TRANSFER: Self = Self(1 << 3);
    /// Cap the amount at the debit account's directional-limit headroom.
    pub const BALANCING_DEBIT: Self = Self(1 << 4);
    /// Cap the amount at the credit account's directional-limit headroom.
    pub const BALANCING_CREDIT: Self = Self(1 << 5);
    /// Close the debit account when this (pending) transfer commits.
    pub const CLOSING_DEBIT: Self = Self(1 << 6);
    /// Close the credit account when this (pending) transfer commits.
    pub const CLOSING_CREDIT: Self = Self(1 << 7);
    /// Reserved for imported records; stored verbatim.
    pub const IMPORTED: Self = Self(1 << 8);

    const VALID_BITS: u16 = 0b1_1111_1111;

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// True when any bit outside the defined flag set is set.
    pub const fn has_padding_bits(self) -> bool {
        self.0 & !Self::VALID_BITS != 0
    }

    pub const fn linked(self) -> bool {
        self.contains(Self::LINKED)
    }

    pub const fn pending(self) -> bool {
        self.contains(Self::PENDING)
    }

    pub const fn post_pending_transfer(self) -> bool {
        self.contains(Self::POST_PENDING_TRANSFER)
    }

    pub const fn void_pending_transfer(self) -> bool {
        self.contains(Self::VOID_PENDING_TRANSFER)
    }

    pub const fn balancing_debit(self) -> bool {
        self.contains(Self::BALANCING_DEBIT)
    }

    pub const fn balancing_credit(self) -> bool {
        self.contains(Self::BALANCING_CREDIT)
    }

    pub const fn closing_debit(self) -> bool {
        self.contains(Self::CLOSING_DEBIT)
    }

    pub const fn closing_credit(self) -> bool {
        self.contains(Self::CLOSING_CREDIT)
    }

    pub const fn imported(self) -> bool {
        self.contains(Self::IMPORTED)
    }
}

impl std::ops::BitOr for TransferFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A directed movement of funds between two accounts.
///
/// # Example
/// ```
/// use ledger_core_rs::models::Transfer;
///
/// let transfer = Transfer {
///     id: 100,
///     debit_account_id: 1,
///     credit_account_id: 2,
///     amount: 50,
///     ledger: 700,
///     code: 10,
///     ..Transfer::default()
/// };
/// assert_eq!(transfer.pending_id, 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Transfer {
    /// Unique identifier (nonzero, not u128::MAX)
    pub id: u128,

    /// Account to debit (nonzero, not u128::MAX, ≠ credit_account_id)
    pub debit_account_id: u128,

    /// Account to credit (nonzero, not u128::MAX, ≠ debit_account_id)
    pub credit_account_id: u128,

    /// Amount moved; the stored value is the amount actually applied
    pub amount: u128,

    /// For post/void: the id of the referenced pending transfer.
    /// Must be zero otherwise.
    pub pending_id: u128,

    /// Opaque client data
    pub user_data_128: u128,

    /// Opaque client data
    pub user_data_64: u64,

    /// Opaque client data
    pub user_data_32: u32,

    /// Relative expiry in seconds; nonzero only with the pending flag.
    /// Zero means the pending transfer never expires.
    pub timeout: u32,

    /// Namespace identifier; must equal both accounts' ledger (nonzero)
    pub ledger: u32,

    /// Client-defined transfer type (nonzero)
    pub code: u16,

    /// Flag bits; padding bits must be zero
    pub flags: TransferFlags,

    /// Assigned by the engine; strictly monotonic across all records
    pub timestamp: u64,
}

impl Transfer {
    /// Size of the wire record in bytes.
    pub const WIRE_SIZE: usize = 128;

    /// Serialize to the fixed 128-byte little-endian wire layout.
    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        let mut buf = [0u8; Self::WIRE_SIZE];
        buf[0..16].copy_from_slice(&self.id.to_le_bytes());
        buf[16..32].copy_from_slice(&self.debit_account_id.to_le_bytes());
        buf[32..48].copy_from_slice(&self.credit_account_id.to_le_bytes());
        buf[48..64].copy_from_slice(&self.amount.to_le_bytes());
        buf[64..80].copy_from_slice(&self.pending_id.to_le_bytes());
        buf[80..96].copy_from_slice(&self.user_data_128.to_le_bytes());
        buf[96..104].copy_from_slice(&self.user_data_64.to_le_bytes());
        buf[104..108].copy_from_slice(&self.user_data_32.to_le_bytes());
        buf[108..112].copy_from_slice(&self.timeout.to_le_bytes());
        buf[112..116].copy_from_slice(&self.ledger.to_le_bytes());
        buf[116..118].copy_from_slice(&self.code.to_le_bytes());
        buf[118..120].copy_from_slice(&self.flags.bits().to_le_bytes());
        buf[120..128].copy_from_slice(&self.timestamp.to_le_bytes());
        buf
    }

    /// Deserialize from the fixed 128-byte little-endian wire layout.
    pub fn from_bytes(buf: &[u8; Self::WIRE_SIZE]) -> Self {
        Self {
            id: u128_at(buf, 0),
            debit_account_id: u128_at(buf, 16),
            credit_account_id: u128_at(buf, 32),
            amount: u128_at(buf, 48),
            pending_id: u128_at(buf, 64),
            user_data_128: u128_at(buf, 80),
            user_data_64: u64_at(buf, 96),
            user_data_32: u32_at(buf, 104),
            timeout: u32_at(buf, 108),
            ledger: u32_at(buf, 112),
            code: u16_at(buf, 116),
            flags: TransferFlags::from_bits(u16_at(buf, 118)),
            timestamp: u64_at(buf, 120),
        }
    }

    /// True for post/void completion transfers.
    pub fn is_two_phase_completion(&self) -> bool {
        self.flags.post_pending_transfer() || self.flags.void_pending_transfer()
    }

    /// True when this transfer touches `account_id` on either side.
    pub fn touches_account(&self, account_id: u128) -> bool {
        self.debit_account_id == account_id || self.credit_account_id == account_id
    }
}

/// Per-record result of a create-transfers batch entry.
///
/// The names (via snake_case serialization) and the u16 discriminants
/// are both observable contract; clients branch on the exact code to
/// decide recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum CreateTransferResult {
    Ok = 0,
    ReservedFlag = 1,
    IdMustNotBeZero = 2,
    IdMustNotBeIntMax = 3,
    DebitAccountIdMustNotBeZero = 4,
    DebitAccountIdMustNotBeIntMax = 5,
    CreditAccountIdMustNotBeZero = 6,
    CreditAccountIdMustNotBeIntMax = 7,
    AccountsMustBeDifferent = 8,
    FlagsAreMutuallyExclusive = 9,
    PendingIdMustBeZero = 10,
    PendingIdMustNotBeZero = 11,
    PendingIdMustNotBeIntMax = 12,
    PendingIdMustBeDifferent = 13,
    TimeoutReservedForPendingTransfer = 14,
    LedgerMustNotBeZero = 15,
    CodeMustNotBeZero = 16,
    DebitAccountNotFound = 17,
    CreditAccountNotFound = 18,
    AccountsMustHaveTheSameLedger = 19,
    TransferMustHaveTheSameLedgerAsAccounts = 20,
    DebitAccountAlreadyClosed = 21,
    CreditAccountAlreadyClosed = 22,
    ClosingTransferMustBePending = 23,
    PendingTransferNotFound = 24,
    PendingTransferNotPending = 25,
    PendingTransferAlreadyPosted = 26,
    PendingTransferAlreadyVoided = 27,
    PendingTransferExpired = 28,
    PendingTransferHasDifferentDebitAccountId = 29,
    PendingTransferHasDifferentCreditAccountId = 30,
    PendingTransferHasDifferentLedger = 31,
    PendingTransferHasDifferentCode = 32,
    ExceedsPendingTransferAmount = 33,
    ExceedsCredits = 34,
    ExceedsDebits = 35,
    OverflowsDebitsPending = 36,
    OverflowsCreditsPending = 37,
    OverflowsDebitsPosted = 38,
    OverflowsCreditsPosted = 39,
    ExistsWithDifferentFlags = 40,
    ExistsWithDifferentDebitAccountId = 41,
    ExistsWithDifferentCreditAccountId = 42,
    ExistsWithDifferentAmount = 43,
    ExistsWithDifferentPendingId = 44,
    #[serde(rename = "exists_with_different_user_data_128")]
    ExistsWithDifferentUserData128 = 45,
    #[serde(rename = "exists_with_different_user_data_64")]
    ExistsWithDifferentUserData64 = 46,
    #[serde(rename = "exists_with_different_user_data_32")]
    ExistsWithDifferentUserData32 = 47,
    ExistsWithDifferentTimeout = 48,
    ExistsWithDifferentCode = 49,
    Exists = 50,
}

impl CreateTransferResult {
    /// The u16 code written to the sparse result buffer.
    pub const fn code(self) -> u16 {
        self as u16
    }
}
