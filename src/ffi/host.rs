//! Host-imported functions
//!
//! The engine consumes the host through this surface: a monotonic
//! clock for timestamp assignment and positioned byte I/O for
//! persisting snapshots. The remaining imports are part of the agreed
//! surface but are not exercised by the in-memory core.

extern "C" {
    /// Nanoseconds since an unspecified epoch; assumed non-decreasing.
    pub fn clock_monotonic() -> u64;

    /// Positioned read; returns bytes read (>= 0) or a negative error.
    pub fn read(fd: i32, ptr: *mut u8, len: usize, offset: u64) -> i32;

    /// Positioned write; returns bytes written or a negative error.
    pub fn write(fd: i32, ptr: *const u8, len: usize, offset: u64) -> i32;

    // Declared for surface completeness; unused by the in-memory core.
    pub fn fsync(fd: i32) -> i32;
    pub fn close(fd: i32) -> i32;
}
