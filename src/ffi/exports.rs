//! Engine-exported entry points
//!
//! Batched entry points that accept raw byte buffers of packed
//! records, run the typed engine, and write sparse failure reports:
//! one `{index: u32, result: u16}` entry (6 bytes, little-endian) per
//! record whose result is not `ok`. A fully successful batch writes
//! zero bytes. `create_transfers` additionally suppresses `exists`
//! entries, which clients treat as idempotent success.
//!
//! Per-call return codes:
//!
//! -   0  success
//! -  -1  engine not initialized
//! -  -2  malformed byte length / malformed or oversized snapshot
//! -  -3  snapshot I/O failure
//! -  -4  snapshot has too many accounts
//! -  -5  snapshot buffer too small
//! -  -6  snapshot has too many transfers
//! -  -7  snapshot has too many pending transfers
//!
//! (-100 is reserved for unimplemented surface and is currently
//! unused: every exported entry point below is implemented.)

use std::sync::{Mutex, MutexGuard};

use crate::ffi::host;
use crate::ledger::snapshot::SnapshotError;
use crate::ledger::{EngineConfig, Ledger};
use crate::models::{Account, CreateTransferResult, Transfer};

const OK: i32 = 0;
const ERR_NOT_INITIALIZED: i32 = -1;
const ERR_BAD_SIZE: i32 = -2;
const ERR_SNAPSHOT_IO: i32 = -3;
const ERR_TOO_MANY_ACCOUNTS: i32 = -4;
const ERR_BUFFER_TOO_SMALL: i32 = -5;
const ERR_TOO_MANY_TRANSFERS: i32 = -6;
const ERR_TOO_MANY_PENDING: i32 = -7;

/// Size of one sparse result entry: index u32 + result u16.
const RESULT_ENTRY_SIZE: usize = 6;

/// Size of one id in a lookup request.
const ID_SIZE: usize = 16;

/// The process-wide engine, instantiated once at `init`.
static ENGINE: Mutex<Option<Ledger>> = Mutex::new(None);

fn engine() -> MutexGuard<'static, Option<Ledger>> {
    // The host is single-threaded; a poisoned lock can only mean a
    // prior panic already crossed the boundary. Recover the value.
    match ENGINE.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn map_snapshot_error(error: SnapshotError) -> i32 {
    match error {
        SnapshotError::BufferTooSmall { .. } => ERR_BUFFER_TOO_SMALL,
        SnapshotError::TooManyAccounts { .. } => ERR_TOO_MANY_ACCOUNTS,
        SnapshotError::TooManyTransfers { .. } => ERR_TOO_MANY_TRANSFERS,
        SnapshotError::TooManyPendingTransfers { .. } => ERR_TOO_MANY_PENDING,
        SnapshotError::BadMagic { .. }
        | SnapshotError::UnsupportedVersion(_)
        | SnapshotError::LengthMismatch { .. }
        | SnapshotError::CorruptPendingEntry { .. } => ERR_BAD_SIZE,
    }
}

/// Instantiate the engine with default capacities. Idempotent: a
/// repeated call replaces the engine with a fresh empty one.
#[no_mangle]
pub extern "C" fn init() -> i32 {
    match Ledger::new(EngineConfig::default()) {
        Ok(ledger) => {
            *engine() = Some(ledger);
            OK
        }
        Err(_) => ERR_BAD_SIZE,
    }
}

/// Process a batch of packed Account records.
///
/// # Safety
/// `ptr` must point to `len` readable bytes; `out_ptr` must have room
/// for one 6-byte entry per record; `out_len` must be writable.
#[no_mangle]
pub unsafe extern "C" fn create_accounts(
    ptr: *const u8,
    len: usize,
    out_ptr: *mut u8,
    out_len: *mut usize,
) -> i32 {
    if out_len.is_null() || (ptr.is_null() && len > 0) {
        return ERR_BAD_SIZE;
    }
    if len % Account::WIRE_SIZE != 0 {
        return ERR_BAD_SIZE;
    }

    let mut guard = engine();
    let ledger = match guard.as_mut() {
        Some(ledger) => ledger,
        None => return ERR_NOT_INITIALIZED,
    };

    let bytes = std::slice::from_raw_parts(ptr, len);
    let mut batch = Vec::with_capacity(len / Account::WIRE_SIZE);
    for chunk in bytes.chunks_exact(Account::WIRE_SIZE) {
        let mut record = [0u8; Account::WIRE_SIZE];
        record.copy_from_slice(chunk);
        batch.push(Account::from_bytes(&record));
    }

    let base = host::clock_monotonic();
    let failures = ledger.create_accounts(&batch, base);

    let mut offset = 0;
    for entry in &failures {
        let out = std::slice::from_raw_parts_mut(out_ptr.add(offset), RESULT_ENTRY_SIZE);
        out[0..4].copy_from_slice(&entry.index.to_le_bytes());
        out[4..6].copy_from_slice(&entry.result.code().to_le_bytes());
        offset += RESULT_ENTRY_SIZE;
    }
    *out_len = offset;
    OK
}

/// Process a batch of packed Transfer records. `exists` results are
/// suppressed from the failure report.
///
/// # Safety
/// Same contract as [`create_accounts`].
#[no_mangle]
pub unsafe extern "C" fn create_transfers(
    ptr: *const u8,
    len: usize,
    out_ptr: *mut u8,
    out_len: *mut usize,
) -> i32 {
    if out_len.is_null() || (ptr.is_null() && len > 0) {
        return ERR_BAD_SIZE;
    }
    if len % Transfer::WIRE_SIZE != 0 {
        return ERR_BAD_SIZE;
    }

    let mut guard = engine();
    let ledger = match guard.as_mut() {
        Some(ledger) => ledger,
        None => return ERR_NOT_INITIALIZED,
    };

    let bytes = std::slice::from_raw_parts(ptr, len);
    let mut batch = Vec::with_capacity(len / Transfer::WIRE_SIZE);
    for chunk in bytes.chunks_exact(Transfer::WIRE_SIZE) {
        let mut record = [0u8; Transfer::WIRE_SIZE];
        record.copy_from_slice(chunk);
        batch.push(Transfer::from_bytes(&record));
    }

    let base = host::clock_monotonic();
    let failures = ledger.create_transfers(&batch, base);

    let mut offset = 0;
    for entry in &failures {
        if entry.result == CreateTransferResult::Exists {
            continue;
        }
        let out = std::slice::from_raw_parts_mut(out_ptr.add(offset), RESULT_ENTRY_SIZE);
        out[0..4].copy_from_slice(&entry.index.to_le_bytes());
        out[4..6].copy_from_slice(&entry.result.code().to_le_bytes());
        offset += RESULT_ENTRY_SIZE;
    }
    *out_len = offset;
    OK
}

/// Look up accounts by an array of u128 ids (16 bytes each,
/// little-endian). Found records are written back-to-back as 128-byte
/// records in input order; missing ids are omitted.
///
/// # Safety
/// `ids_ptr` must point to `count * 16` readable bytes; `out_ptr` must
/// have room for `count * 128` bytes; `out_len` must be writable.
#[no_mangle]
pub unsafe extern "C" fn lookup_accounts(
    ids_ptr: *const u8,
    count: usize,
    out_ptr: *mut u8,
    out_len: *mut usize,
) -> i32 {
    if out_len.is_null() || (ids_ptr.is_null() && count > 0) {
        return ERR_BAD_SIZE;
    }

    let guard = engine();
    let ledger = match guard.as_ref() {
        Some(ledger) => ledger,
        None => return ERR_NOT_INITIALIZED,
    };

    let ids = decode_ids(ids_ptr, count);
    let found = ledger.lookup_accounts(&ids);

    let mut offset = 0;
    for account in &found {
        let out = std::slice::from_raw_parts_mut(out_ptr.add(offset), Account::WIRE_SIZE);
        out.copy_from_slice(&account.to_bytes());
        offset += Account::WIRE_SIZE;
    }
    *out_len = offset;
    OK
}

/// Look up transfers by an array of u128 ids.
///
/// # Safety
/// Same contract as [`lookup_accounts`].
#[no_mangle]
pub unsafe extern "C" fn lookup_transfers(
    ids_ptr: *const u8,
    count: usize,
    out_ptr: *mut u8,
    out_len: *mut usize,
) -> i32 {
    if out_len.is_null() || (ids_ptr.is_null() && count > 0) {
        return ERR_BAD_SIZE;
    }

    let guard = engine();
    let ledger = match guard.as_ref() {
        Some(ledger) => ledger,
        None => return ERR_NOT_INITIALIZED,
    };

    let ids = decode_ids(ids_ptr, count);
    let found = ledger.lookup_transfers(&ids);

    let mut offset = 0;
    for transfer in &found {
        let out = std::slice::from_raw_parts_mut(out_ptr.add(offset), Transfer::WIRE_SIZE);
        out.copy_from_slice(&transfer.to_bytes());
        offset += Transfer::WIRE_SIZE;
    }
    *out_len = offset;
    OK
}

/// Enumerate transfers touching the account whose 16-byte id is at
/// `id_ptr`, in commit order, until `max_len` bytes of output are
/// used.
///
/// # Safety
/// `id_ptr` must point to 16 readable bytes; `out_ptr` must have room
/// for `max_len` bytes; `out_len` must be writable.
#[no_mangle]
pub unsafe extern "C" fn account_transfers(
    id_ptr: *const u8,
    out_ptr: *mut u8,
    max_len: usize,
    out_len: *mut usize,
) -> i32 {
    if out_len.is_null() || id_ptr.is_null() {
        return ERR_BAD_SIZE;
    }

    let guard = engine();
    let ledger = match guard.as_ref() {
        Some(ledger) => ledger,
        None => return ERR_NOT_INITIALIZED,
    };

    let ids = decode_ids(id_ptr, 1);
    let max = max_len / Transfer::WIRE_SIZE;
    let found = ledger.account_transfers(ids[0], max);

    let mut offset = 0;
    for transfer in &found {
        let out = std::slice::from_raw_parts_mut(out_ptr.add(offset), Transfer::WIRE_SIZE);
        out.copy_from_slice(&transfer.to_bytes());
        offset += Transfer::WIRE_SIZE;
    }
    *out_len = offset;
    OK
}

/// No-op; present so hosts can drive a uniform poll loop.
#[no_mangle]
pub extern "C" fn tick() {}

/// Current host clock reading.
#[no_mangle]
pub extern "C" fn timestamp() -> u64 {
    unsafe { host::clock_monotonic() }
}

/// Engine version packed as `major << 16 | minor << 8 | patch`.
#[no_mangle]
pub extern "C" fn version() -> u32 {
    (crate::VERSION_MAJOR << 16) | (crate::VERSION_MINOR << 8) | crate::VERSION_PATCH
}

/// Bytes needed to serialize the current state; 0 when uninitialized.
#[no_mangle]
pub extern "C" fn state_size() -> usize {
    match engine().as_ref() {
        Some(ledger) => ledger.state_size(),
        None => 0,
    }
}

/// Serialize the complete state into `ptr..ptr+len`.
///
/// # Safety
/// `ptr` must point to `len` writable bytes.
#[no_mangle]
pub unsafe extern "C" fn save_state(ptr: *mut u8, len: usize) -> i32 {
    if ptr.is_null() {
        return ERR_BAD_SIZE;
    }

    let guard = engine();
    let ledger = match guard.as_ref() {
        Some(ledger) => ledger,
        None => return ERR_NOT_INITIALIZED,
    };

    let buf = std::slice::from_raw_parts_mut(ptr, len);
    match ledger.save_state(buf) {
        Ok(_) => OK,
        Err(error) => map_snapshot_error(error),
    }
}

/// Restore the complete state from `ptr..ptr+len`.
///
/// # Safety
/// `ptr` must point to `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn load_state(ptr: *const u8, len: usize) -> i32 {
    if ptr.is_null() {
        return ERR_BAD_SIZE;
    }

    let mut guard = engine();
    let ledger = match guard.as_mut() {
        Some(ledger) => ledger,
        None => return ERR_NOT_INITIALIZED,
    };

    let buf = std::slice::from_raw_parts(ptr, len);
    match ledger.load_state(buf) {
        Ok(()) => OK,
        Err(error) => map_snapshot_error(error),
    }
}

/// Serialize the complete state and write it to `fd` at offset 0 via
/// the host's positioned write.
#[no_mangle]
pub extern "C" fn persist_state(fd: i32) -> i32 {
    let guard = engine();
    let ledger = match guard.as_ref() {
        Some(ledger) => ledger,
        None => return ERR_NOT_INITIALIZED,
    };

    let mut buf = vec![0u8; ledger.state_size()];
    let written = match ledger.save_state(&mut buf) {
        Ok(written) => written,
        Err(error) => return map_snapshot_error(error),
    };

    let result = unsafe { host::write(fd, buf.as_ptr(), written, 0) };
    if result < 0 || result as usize != written {
        return ERR_SNAPSHOT_IO;
    }
    OK
}

/// Read at most `max_len` bytes from `fd` at offset 0 via the host's
/// positioned read and restore the state from them.
#[no_mangle]
pub extern "C" fn restore_state(fd: i32, max_len: usize) -> i32 {
    let mut guard = engine();
    let ledger = match guard.as_mut() {
        Some(ledger) => ledger,
        None => return ERR_NOT_INITIALIZED,
    };

    let mut buf = vec![0u8; max_len];
    let result = unsafe { host::read(fd, buf.as_mut_ptr(), max_len, 0) };
    if result < 0 {
        return ERR_SNAPSHOT_IO;
    }

    match ledger.load_state(&buf[..result as usize]) {
        Ok(()) => OK,
        Err(error) => map_snapshot_error(error),
    }
}

// ============================================================================
// Scratch allocator
// ============================================================================

const SCRATCH_SIZE: usize = 64 * 1024;

/// Engine-owned scratch region handed out as a bump allocation.
struct Scratch {
    buf: [u8; SCRATCH_SIZE],
    offset: usize,
}

static SCRATCH: Mutex<Scratch> = Mutex::new(Scratch {
    buf: [0; SCRATCH_SIZE],
    offset: 0,
});

fn scratch() -> MutexGuard<'static, Scratch> {
    match SCRATCH.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Bump-allocate `size` bytes from the scratch region, 16-byte
/// aligned. Returns null when the region is exhausted.
#[no_mangle]
pub extern "C" fn alloc(size: usize) -> *mut u8 {
    let mut scratch = scratch();
    let aligned = (scratch.offset + 15) & !15;
    if size > SCRATCH_SIZE || aligned > SCRATCH_SIZE - size {
        return std::ptr::null_mut();
    }
    scratch.offset = aligned + size;
    unsafe { scratch.buf.as_mut_ptr().add(aligned) }
}

/// Release a scratch allocation. Only the most recent allocation is
/// actually reclaimed (bump discipline); earlier frees are no-ops
/// until the region resets at the next full drain.
#[no_mangle]
pub extern "C" fn free(ptr: *mut u8, size: usize) {
    let mut scratch = scratch();
    let base = scratch.buf.as_ptr() as usize;
    let freed = ptr as usize;
    if freed >= base && freed + size == base + scratch.offset {
        scratch.offset = freed - base;
    }
}

unsafe fn decode_ids(ptr: *const u8, count: usize) -> Vec<u128> {
    let bytes = std::slice::from_raw_parts(ptr, count * ID_SIZE);
    bytes
        .chunks_exact(ID_SIZE)
        .map(|chunk| {
            let mut id = [0u8; ID_SIZE];
            id.copy_from_slice(chunk);
            u128::from_le_bytes(id)
        })
        .collect()
}
