//! Ledger Core - Deterministic Accounting Engine
//!
//! An in-memory, deterministic double-entry accounting state machine,
//! designed to be embedded inside a constrained host runtime that
//! persists the entire state blob between invocations.
//!
//! # Architecture
//!
//! - **core**: integer-safety primitives and batch timestamp assignment
//! - **models**: fixed-width Account/Transfer records, pending-transfer
//!   side-table entries, and the per-record result code enumerations
//! - **store**: three fixed-capacity append-only tables
//! - **ledger**: the engine — validators, the transfer applier, the
//!   two-phase completion engine, queries, and the snapshot codec
//! - **ffi**: the C-ABI host boundary (feature `ffi`)
//!
//! # Critical Invariants
//!
//! 1. All money values are u128; every counter mutation is
//!    overflow-checked
//! 2. Execution is strictly single-threaded and deterministic: input
//!    order plus the batch-entry clock reading fully determine state
//! 3. A record either commits completely or changes nothing
//! 4. The FFI boundary is minimal and safe

// Module declarations
pub mod core;
pub mod ledger;
pub mod models;
pub mod store;

// Re-exports for convenience
pub use ledger::{
    CreateAccountsResult, CreateTransfersResult, EngineConfig, EngineError, Ledger, SnapshotError,
    StateValidationError,
};
pub use models::{
    Account, AccountFlags, CreateAccountResult, CreateTransferResult, PendingState,
    PendingTransferInfo, Transfer, TransferFlags,
};
pub use store::{Store, StoreError};

// FFI module (when feature enabled)
#[cfg(feature = "ffi")]
pub mod ffi;

/// Engine version, exported packed as `major << 16 | minor << 8 | patch`.
pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 1;
pub const VERSION_PATCH: u32 = 0;
