//! Pending-transfer side table record
//!
//! One entry per committed `pending` transfer, tracking how much of the
//! reserved amount has been posted and whether the entry is still open.
//! Entries are never removed; terminal states are recorded in place.

use serde::{Deserialize, Serialize};

use crate::models::{u128_at, u64_at};

/// Lifecycle state of a pending transfer.
///
/// A pending transfer is created Active, may receive multiple partial
/// posts while Active, and reaches exactly one terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PendingState {
    /// Open: posts and voids are accepted
    Active = 0,
    /// Fully consumed by posts
    Posted = 1,
    /// Remainder released by a void
    Voided = 2,
    /// Deadline passed; detected lazily when a post or void references
    /// the entry
    Expired = 3,
}

impl PendingState {
    /// Wire code for the snapshot body.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Decode a wire code; unknown codes are rejected by the caller.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(PendingState::Active),
            1 => Some(PendingState::Posted),
            2 => Some(PendingState::Voided),
            3 => Some(PendingState::Expired),
            _ => None,
        }
    }
}

/// Side-table entry for a committed pending transfer.
///
/// # Example
/// ```
/// use ledger_core_rs::models::{PendingState, PendingTransferInfo};
///
/// let info = PendingTransferInfo::new(101, 100, 0);
/// assert_eq!(info.state, PendingState::Active);
/// assert_eq!(info.remaining(), 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransferInfo {
    /// Id of the original pending transfer
    pub id: u128,

    /// Amount reserved when the pending transfer committed
    pub original_amount: u128,

    /// Running total of posted amounts; monotonically increasing,
    /// bounded by original_amount
    pub amount_posted: u128,

    /// Absolute expiry timestamp in nanoseconds; 0 = never expires
    pub expires_at: u64,

    /// Lifecycle state
    pub state: PendingState,
}

impl PendingTransferInfo {
    /// Size of the wire record in the snapshot body.
    pub const WIRE_SIZE: usize = 64;

    /// Create a fresh Active entry for a just-committed pending transfer.
    pub fn new(id: u128, original_amount: u128, expires_at: u64) -> Self {
        Self {
            id,
            original_amount,
            amount_posted: 0,
            expires_at,
            state: PendingState::Active,
        }
    }

    /// Amount still reserved (not yet posted).
    pub fn remaining(&self) -> u128 {
        self.original_amount - self.amount_posted
    }

    /// True when `now` is at or past a nonzero expiry.
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires_at > 0 && now >= self.expires_at
    }

    /// Serialize to the fixed 64-byte little-endian wire layout.
    /// Bytes 57..64 are padding and zero.
    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        let mut buf = [0u8; Self::WIRE_SIZE];
        buf[0..16].copy_from_slice(&self.id.to_le_bytes());
        buf[16..32].copy_from_slice(&self.original_amount.to_le_bytes());
        buf[32..48].copy_from_slice(&self.amount_posted.to_le_bytes());
        buf[48..56].copy_from_slice(&self.expires_at.to_le_bytes());
        buf[56] = self.state.code();
        buf
    }

    /// Deserialize from the fixed 64-byte wire layout. Returns `None`
    /// for an unknown state code.
    pub fn from_bytes(buf: &[u8; Self::WIRE_SIZE]) -> Option<Self> {
        Some(Self {
            id: u128_at(buf, 0),
            original_amount: u128_at(buf, 16),
            amount_posted: u128_at(buf, 32),
            expires_at: u64_at(buf, 48),
            state: PendingState::from_code(buf[56])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_is_active_with_nothing_posted() {
        let info = PendingTransferInfo::new(200, 75, 0);
        assert_eq!(info.state, PendingState::Active);
        assert_eq!(info.amount_posted, 0);
        assert_eq!(info.remaining(), 75);
    }

    #[test]
    fn test_expiry_boundary() {
        let info = PendingTransferInfo::new(1, 10, 1_000);
        assert!(!info.is_expired_at(999));
        assert!(info.is_expired_at(1_000)); // at the deadline: expired
        assert!(info.is_expired_at(1_001));
    }

    #[test]
    fn test_zero_expiry_never_expires() {
        let info = PendingTransferInfo::new(1, 10, 0);
        assert!(!info.is_expired_at(u64::MAX));
    }

    #[test]
    fn test_wire_round_trip() {
        let mut info = PendingTransferInfo::new(42, u128::MAX / 2, 123_456);
        info.amount_posted = 17;
        info.state = PendingState::Posted;

        let bytes = info.to_bytes();
        assert_eq!(PendingTransferInfo::from_bytes(&bytes), Some(info));
    }

    #[test]
    fn test_unknown_state_code_rejected() {
        let info = PendingTransferInfo::new(1, 1, 0);
        let mut bytes = info.to_bytes();
        bytes[56] = 9;
        assert_eq!(PendingTransferInfo::from_bytes(&bytes), None);
    }
}
