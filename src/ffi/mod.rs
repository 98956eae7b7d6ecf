//! Host boundary (C ABI)
//!
//! This module is the only place raw pointers cross into the engine.
//! The host writes batches of packed records into a buffer, calls an
//! exported entry point, and reads back a sparse failure report. The
//! engine itself is an owned value held behind a process-wide cell
//! instantiated at `init`; the host is responsible for serializing
//! calls.

pub mod exports;
pub mod host;
