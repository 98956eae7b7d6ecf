//! Fixed-capacity record store
//!
//! Three append-only tables (accounts, transfers, pending-transfer side
//! table) pre-allocated to their configured capacities. Records are
//! never moved or deleted; slot numbers are assigned monotonically and
//! storage order is commit order.
//!
//! Lookups by primary key are linear scans: the bounded capacities keep
//! the worst case small and deterministic, and avoid any allocator
//! interaction after construction — the engine may be embedded in a
//! host without a general-purpose heap.

use thiserror::Error;

use crate::models::{Account, PendingTransferInfo, Transfer};

/// Errors raised when a table has reached its configured capacity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("account table full: capacity {capacity}")]
    AccountTableFull { capacity: usize },

    #[error("transfer table full: capacity {capacity}")]
    TransferTableFull { capacity: usize },

    #[error("pending transfer table full: capacity {capacity}")]
    PendingTableFull { capacity: usize },
}

/// The three bounded tables backing the engine.
#[derive(Debug, Clone)]
pub struct Store {
    accounts: Vec<Account>,
    transfers: Vec<Transfer>,
    pending: Vec<PendingTransferInfo>,
    max_accounts: usize,
    max_transfers: usize,
    max_pending: usize,
}

impl Store {
    /// Create an empty store with all capacity reserved up front.
    pub fn new(max_accounts: usize, max_transfers: usize, max_pending: usize) -> Self {
        Self {
            accounts: Vec::with_capacity(max_accounts),
            transfers: Vec::with_capacity(max_transfers),
            pending: Vec::with_capacity(max_pending),
            max_accounts,
            max_transfers,
            max_pending,
        }
    }

    // ------------------------------------------------------------------
    // Insertion (append-only)
    // ------------------------------------------------------------------

    /// Append an account; fails when the table is full.
    pub fn insert_account(&mut self, account: Account) -> Result<usize, StoreError> {
        if self.accounts.len() >= self.max_accounts {
            return Err(StoreError::AccountTableFull {
                capacity: self.max_accounts,
            });
        }
        self.accounts.push(account);
        Ok(self.accounts.len() - 1)
    }

    /// Append a transfer; fails when the table is full.
    pub fn insert_transfer(&mut self, transfer: Transfer) -> Result<usize, StoreError> {
        if self.transfers.len() >= self.max_transfers {
            return Err(StoreError::TransferTableFull {
                capacity: self.max_transfers,
            });
        }
        self.transfers.push(transfer);
        Ok(self.transfers.len() - 1)
    }

    /// Append a pending-transfer entry; fails when the table is full.
    pub fn insert_pending(&mut self, info: PendingTransferInfo) -> Result<usize, StoreError> {
        if self.pending.len() >= self.max_pending {
            return Err(StoreError::PendingTableFull {
                capacity: self.max_pending,
            });
        }
        self.pending.push(info);
        Ok(self.pending.len() - 1)
    }

    // ------------------------------------------------------------------
    // Lookup by primary key (linear scan)
    // ------------------------------------------------------------------

    /// Slot of the account with `id`, if present.
    pub fn find_account(&self, id: u128) -> Option<usize> {
        self.accounts.iter().position(|a| a.id == id)
    }

    /// Slot of the transfer with `id`, if present.
    pub fn find_transfer(&self, id: u128) -> Option<usize> {
        self.transfers.iter().position(|t| t.id == id)
    }

    /// Slot of the pending entry for pending-transfer `id`, if present.
    pub fn find_pending(&self, id: u128) -> Option<usize> {
        self.pending.iter().position(|p| p.id == id)
    }

    // ------------------------------------------------------------------
    // Slot access
    // ------------------------------------------------------------------

    pub fn account(&self, slot: usize) -> &Account {
        &self.accounts[slot]
    }

    pub fn account_mut(&mut self, slot: usize) -> &mut Account {
        &mut self.accounts[slot]
    }

    pub fn transfer(&self, slot: usize) -> &Transfer {
        &self.transfers[slot]
    }

    pub fn pending(&self, slot: usize) -> &PendingTransferInfo {
        &self.pending[slot]
    }

    pub fn pending_mut(&mut self, slot: usize) -> &mut PendingTransferInfo {
        &mut self.pending[slot]
    }

    // ------------------------------------------------------------------
    // Whole-table views (queries, snapshot)
    // ------------------------------------------------------------------

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    pub fn pending_transfers(&self) -> &[PendingTransferInfo] {
        &self.pending
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn transfers_full(&self) -> bool {
        self.transfers.len() >= self.max_transfers
    }

    pub fn pending_full(&self) -> bool {
        self.pending.len() >= self.max_pending
    }

    /// Replace the entire contents from decoded snapshot tables.
    ///
    /// The caller (the snapshot codec) has already verified the counts
    /// fit the configured capacities.
    pub fn replace(
        &mut self,
        accounts: Vec<Account>,
        transfers: Vec<Transfer>,
        pending: Vec<PendingTransferInfo>,
    ) {
        self.accounts = accounts;
        self.accounts.reserve(self.max_accounts - self.accounts.len());
        self.transfers = transfers;
        self.transfers.reserve(self.max_transfers - self.transfers.len());
        self.pending = pending;
        self.pending.reserve(self.max_pending - self.pending.len());
    }
}
