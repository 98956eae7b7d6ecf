//! Account record
//!
//! A balance-bearing entity with four running counters:
//! debits/credits × pending/posted. Accounts are immutable except for
//! their counters and the `closed` flag; they are never deleted.
//!
//! The 128-byte wire layout is part of the external contract: batch
//! buffers and the snapshot body carry accounts in exactly this form.

use serde::{Deserialize, Serialize};

use crate::models::{u128_at, u16_at, u32_at, u64_at};

/// Account flag bits (u16 bit field).
///
/// The upper bits are padding and must be zero; a set padding bit fails
/// validation with `reserved_flag`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountFlags(u16);

impl AccountFlags {
    /// Reserved for batch chaining; stored verbatim.
    pub const LINKED: Self = Self(1 << 0);
    /// Directional limit: debits_posted + debits_pending ≤ credits_posted.
    pub const DEBITS_MUST_NOT_EXCEED_CREDITS: Self = Self(1 << 1);
    /// Directional limit: credits_posted + credits_pending ≤ debits_posted.
    pub const CREDITS_MUST_NOT_EXCEED_DEBITS: Self = Self(1 << 2);
    /// Reserved for balance-history recording; stored verbatim.
    pub const HISTORY: Self = Self(1 << 3);
    /// Reserved for imported records; stored verbatim.
    pub const IMPORTED: Self = Self(1 << 4);
    /// Closed accounts reject new transfers.
    pub const CLOSED: Self = Self(1 << 5);

    const VALID_BITS: u16 = 0b0011_1111;

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

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// True when any bit outside the defined flag set is set.
    pub const fn has_padding_bits(self) -> bool {
        self.0 & !Self::VALID_BITS != 0
    }

    pub const fn linked(self) -> bool {
        self.contains(Self::LINKED)
    }

    pub const fn debits_must_not_exceed_credits(self) -> bool {
        self.contains(Self::DEBITS_MUST_NOT_EXCEED_CREDITS)
    }

    pub const fn credits_must_not_exceed_debits(self) -> bool {
        self.contains(Self::CREDITS_MUST_NOT_EXCEED_DEBITS)
    }

    pub const fn history(self) -> bool {
        self.contains(Self::HISTORY)
    }

    pub const fn imported(self) -> bool {
        self.contains(Self::IMPORTED)
    }

    pub const fn closed(self) -> bool {
        self.contains(Self::CLOSED)
    }
}

impl std::ops::BitOr for AccountFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A balance-bearing account.
///
/// The four balance counters must be zero at creation and are mutated
/// only by the transfer applier. `timestamp` is assigned by the engine.
///
/// # Example
/// ```
/// use ledger_core_rs::models::Account;
///
/// let account = Account {
///     id: 1,
///     ledger: 700,
///     code: 10,
///     ..Account::default()
/// };
/// assert_eq!(account.debits_posted, 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier (nonzero, not u128::MAX)
    pub id: u128,

    /// Sum of amounts of in-flight pending transfers debiting this account
    pub debits_pending: u128,

    /// Sum of amounts of committed transfers debiting this account
    pub debits_posted: u128,

    /// Sum of amounts of in-flight pending transfers crediting this account
    pub credits_pending: u128,

    /// Sum of amounts of committed transfers crediting this account
    pub credits_posted: u128,

    /// Opaque client data
    pub user_data_128: u128,

    /// Opaque client data
    pub user_data_64: u64,

    /// Opaque client data
    pub user_data_32: u32,

    /// Must be zero; pads the wire record to 128 bytes
    pub reserved: u32,

    /// Namespace identifier (nonzero); all parties to a transfer share it
    pub ledger: u32,

    /// Client-defined account type (nonzero)
    pub code: u16,

    /// Flag bits; padding bits must be zero
    pub flags: AccountFlags,

    /// Assigned by the engine; strictly monotonic across all records
    pub timestamp: u64,
}

impl Account {
    /// Size of the wire record in bytes.
    pub const WIRE_SIZE: usize = 128;

    /// Serialize to the fixed 128-byte little-endian wire layout.
    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        let mut buf = [0u8; Self::WIRE_SIZE];
        buf[0..16].copy_from_slice(&self.id.to_le_bytes());
        buf[16..32].copy_from_slice(&self.debits_pending.to_le_bytes());
        buf[32..48].copy_from_slice(&self.debits_posted.to_le_bytes());
        buf[48..64].copy_from_slice(&self.credits_pending.to_le_bytes());
        buf[64..80].copy_from_slice(&self.credits_posted.to_le_bytes());
        buf[80..96].copy_from_slice(&self.user_data_128.to_le_bytes());
        buf[96..104].copy_from_slice(&self.user_data_64.to_le_bytes());
        buf[104..108].copy_from_slice(&self.user_data_32.to_le_bytes());
        buf[108..112].copy_from_slice(&self.reserved.to_le_bytes());
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
            debits_pending: u128_at(buf, 16),
            debits_posted: u128_at(buf, 32),
            credits_pending: u128_at(buf, 48),
            credits_posted: u128_at(buf, 64),
            user_data_128: u128_at(buf, 80),
            user_data_64: u64_at(buf, 96),
            user_data_32: u32_at(buf, 104),
            reserved: u32_at(buf, 108),
            ledger: u32_at(buf, 112),
            code: u16_at(buf, 116),
            flags: AccountFlags::from_bits(u16_at(buf, 118)),
            timestamp: u64_at(buf, 120),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.flags.closed()
    }
}

/// Per-record result of a create-accounts batch entry.
///
/// The names (via snake_case serialization) and the u16 discriminants
/// are both observable contract; clients branch on the exact code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum CreateAccountResult {
    Ok = 0,
    ReservedField = 1,
    ReservedFlag = 2,
    IdMustNotBeZero = 3,
    IdMustNotBeIntMax = 4,
    FlagsAreMutuallyExclusive = 5,
    DebitsPendingMustBeZero = 6,
    DebitsPostedMustBeZero = 7,
    CreditsPendingMustBeZero = 8,
    CreditsPostedMustBeZero = 9,
    LedgerMustNotBeZero = 10,
    CodeMustNotBeZero = 11,
    ExistsWithDifferentFlags = 12,
    #[serde(rename = "exists_with_different_user_data_128")]
    ExistsWithDifferentUserData128 = 13,
    #[serde(rename = "exists_with_different_user_data_64")]
    ExistsWithDifferentUserData64 = 14,
    #[serde(rename = "exists_with_different_user_data_32")]
    ExistsWithDifferentUserData32 = 15,
    ExistsWithDifferentLedger = 16,
    ExistsWithDifferentCode = 17,
    Exists = 18,
}

impl CreateAccountResult {
    /// The u16 code written to the sparse result buffer.
    pub const fn code(self) -> u16 {
        self as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_padding_detection() {
        assert!(!AccountFlags::from_bits(0).has_padding_bits());
        assert!(!AccountFlags::from_bits(0b0011_1111).has_padding_bits());
        assert!(AccountFlags::from_bits(1 << 6).has_padding_bits());
        assert!(AccountFlags::from_bits(0x8000).has_padding_bits());
    }

    #[test]
    fn test_flags_accessors() {
        let flags = AccountFlags::DEBITS_MUST_NOT_EXCEED_CREDITS | AccountFlags::CLOSED;
        assert!(flags.debits_must_not_exceed_credits());
        assert!(flags.closed());
        assert!(!flags.credits_must_not_exceed_debits());
        assert!(!flags.linked());
    }

    #[test]
    fn test_wire_round_trip() {
        let account = Account {
            id: 0xDEADBEEF_00112233_44556677_8899AABB,
            debits_pending: 1,
            debits_posted: 2,
            credits_pending: 3,
            credits_posted: 4,
            user_data_128: u128::MAX - 1,
            user_data_64: 0xAABBCCDD_EEFF0011,
            user_data_32: 0x12345678,
            reserved: 0,
            ledger: 700,
            code: 10,
            flags: AccountFlags::HISTORY | AccountFlags::LINKED,
            timestamp: 999_999,
        };

        let bytes = account.to_bytes();
        assert_eq!(Account::from_bytes(&bytes), account);
    }

    #[test]
    fn test_wire_layout_is_little_endian() {
        let account = Account {
            id: 0x01,
            ledger: 0x0000_0700,
            ..Account::default()
        };
        let bytes = account.to_bytes();
        assert_eq!(bytes[0], 0x01);
        assert_eq!(bytes[112], 0x00);
        assert_eq!(bytes[113], 0x07);
    }

    #[test]
    fn test_result_codes_are_stable() {
        assert_eq!(CreateAccountResult::Ok.code(), 0);
        assert_eq!(CreateAccountResult::Exists.code(), 18);
        assert_eq!(CreateAccountResult::LedgerMustNotBeZero.code(), 10);
    }

    #[test]
    fn test_result_code_serialized_names() {
        let json = serde_json::to_string(&CreateAccountResult::ExistsWithDifferentUserData128)
            .expect("serializes");
        assert_eq!(json, "\"exists_with_different_user_data_128\"");
        let json = serde_json::to_string(&CreateAccountResult::IdMustNotBeIntMax).expect("serializes");
        assert_eq!(json, "\"id_must_not_be_int_max\"");
    }
}
