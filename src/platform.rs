// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Platform topology, GIC frame addresses and per-core state plumbing.

pub mod fvp;
pub mod qemu;
#[cfg(any(test, feature = "fakes"))]
pub mod test;

use crate::gic::GicBases;
use arm_sysregs::read_mpidr_el1;
use core::cell::RefCell;
use core::sync::atomic::{AtomicUsize, Ordering};
use percore::{Cores, ExceptionLock, PerCore};
#[cfg(not(test))]
pub use percore::exception_free;
#[cfg(test)]
pub use test::exception_free;

#[cfg(all(platform = "fvp", not(test)))]
pub use fvp::Fvp as PlatformImpl;
#[cfg(all(not(platform = "fvp"), not(test)))]
pub use qemu::Qemu as PlatformImpl;
#[cfg(test)]
pub use test::TestPlatform as PlatformImpl;

/// The hooks implemented by all platforms.
pub trait Platform {
    /// The number of CPU cores.
    const CORE_COUNT: usize;

    /// The size in bytes of the largest cache line across all the cache
    /// levels in the platform.
    const CACHE_WRITEBACK_GRANULE: usize;

    /// The highest SPI offset from the first SPI ID that the platform wires
    /// up. The valid SPI IDs are `MIN_SPI_ID..=MIN_SPI_ID + MAX_SPI_OFFSET`.
    const MAX_SPI_OFFSET: usize;

    /// Given a valid MPIDR affinity value, returns the corresponding linear
    /// core index.
    ///
    /// The implementation must never return the same index for two different
    /// valid MPIDR values, and must never return a value greater than or
    /// equal to `CORE_COUNT`.
    fn core_position(mpidr: u64) -> usize;

    /// Returns the MPIDR affinity value of the core at `core_pos`.
    ///
    /// This is the inverse of [`Platform::core_position`].
    fn mpidr_from_core_pos(core_pos: usize) -> u64;

    /// Returns the base addresses of the platform's GIC register frames.
    fn gic_bases() -> GicBases;
}

/// Implementation of the `Cores` trait to get the index of the current CPU
/// core.
pub struct CoresImpl;

// SAFETY: This implementation never returns the same index for different
// cores because `core_position` is guaranteed not to.
unsafe impl Cores for CoresImpl {
    fn core_index() -> usize {
        PlatformImpl::core_position(read_mpidr_el1().bits())
    }
}

/// Per-core mutable state.
pub type PerCoreState<T> =
    PerCore<[ExceptionLock<RefCell<T>>; PlatformImpl::CORE_COUNT], CoresImpl>;

// The online mask stores one bit per core.
const _: () = assert!(PlatformImpl::CORE_COUNT <= usize::BITS as usize);

/// Which cores are currently powered on. Only the boot core starts online;
/// the image's power management hooks update the mask around CPU_ON/CPU_OFF.
static CORE_ONLINE_MASK: AtomicUsize = AtomicUsize::new(1);

/// Records the core at `core_pos` as powered on.
pub fn mark_core_online(core_pos: usize) {
    assert!(core_pos < PlatformImpl::CORE_COUNT);
    CORE_ONLINE_MASK.fetch_or(1 << core_pos, Ordering::Release);
}

/// Records the core at `core_pos` as powered off.
///
/// Must be called before the core starts its power-down sequence, so no
/// other core sends it an SGI while it is going down.
pub fn mark_core_offline(core_pos: usize) {
    assert!(core_pos < PlatformImpl::CORE_COUNT);
    CORE_ONLINE_MASK.fetch_and(!(1 << core_pos), Ordering::Release);
}

/// Returns whether the core at `core_pos` is powered on.
pub fn is_core_pos_online(core_pos: usize) -> bool {
    assert!(core_pos < PlatformImpl::CORE_COUNT);
    CORE_ONLINE_MASK.load(Ordering::Acquire) & (1 << core_pos) != 0
}
