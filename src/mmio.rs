// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Volatile accessors for memory-mapped register frames.
//!
//! Every GIC register frame (distributor, redistributor, CPU interface, IRS)
//! is accessed exclusively through these helpers so the compiler never elides
//! or reorders device accesses.

/// Reads a 32-bit register at `addr`.
///
/// # Safety
///
/// `addr` must be 4-byte aligned and valid for a volatile read, i.e. point
/// into a device register frame (or a fake frame in tests) that outlives the
/// call.
pub unsafe fn read32(addr: usize) -> u32 {
    // SAFETY: The caller guarantees the address is aligned and mapped.
    unsafe { (addr as *const u32).read_volatile() }
}

/// Writes a 32-bit register at `addr`.
///
/// # Safety
///
/// Same requirements as [`read32`], plus the write must be valid for the
/// device state machine at this point.
pub unsafe fn write32(addr: usize, value: u32) {
    // SAFETY: The caller guarantees the address is aligned and mapped.
    unsafe { (addr as *mut u32).write_volatile(value) }
}

/// Reads a 64-bit register at `addr`.
///
/// # Safety
///
/// `addr` must be 8-byte aligned and valid for a volatile read.
pub unsafe fn read64(addr: usize) -> u64 {
    // SAFETY: The caller guarantees the address is aligned and mapped.
    unsafe { (addr as *const u64).read_volatile() }
}

/// Writes a 64-bit register at `addr`.
///
/// # Safety
///
/// `addr` must be 8-byte aligned and valid for a volatile write.
pub unsafe fn write64(addr: usize, value: u64) {
    // SAFETY: The caller guarantees the address is aligned and mapped.
    unsafe { (addr as *mut u64).write_volatile(value) }
}

/// Reads a single register byte at `addr`.
///
/// # Safety
///
/// `addr` must be valid for a volatile read.
pub unsafe fn read8(addr: usize) -> u8 {
    // SAFETY: The caller guarantees the address is mapped.
    unsafe { (addr as *const u8).read_volatile() }
}

/// Writes a single register byte at `addr`.
///
/// # Safety
///
/// `addr` must be valid for a volatile write.
pub unsafe fn write8(addr: usize, value: u8) {
    // SAFETY: The caller guarantees the address is mapped.
    unsafe { (addr as *mut u8).write_volatile(value) }
}
