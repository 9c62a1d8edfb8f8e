// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Access to the GIC-related CPU system registers.
//!
//! The generic MPIDR accessors come from the `arm-sysregs` crate; this module
//! covers the interrupt-controller registers that sit outside it: the ID
//! feature fields used by generation probing, the GICv3 `ICC_*` CPU
//! interface, and the GICv5 CPU interface including the `GIC`/`GICR` system
//! instructions and `GSB` barriers.
//!
//! On AArch64 targets these compile to `mrs`/`msr`/`sys` instructions. On the
//! host (unit tests, or the `fakes` feature) they operate on the fake
//! register bank in [`fake`], which additionally records EOI, SGI and GIC
//! command writes so tests can assert on the driver's protocol behaviour.

use bitflags::bitflags;

#[cfg(all(target_arch = "aarch64", not(any(test, feature = "fakes"))))]
mod aarch64;
#[cfg(all(target_arch = "aarch64", not(any(test, feature = "fakes"))))]
pub use aarch64::*;

#[cfg(any(not(target_arch = "aarch64"), test, feature = "fakes"))]
pub mod fake;
#[cfg(any(not(target_arch = "aarch64"), test, feature = "fakes"))]
pub use fake::*;

bitflags! {
    /// ICC_SRE_EL1 system register value.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[repr(transparent)]
    pub struct IccSre: u64 {
        /// System register enable.
        const SRE = 1 << 0;
        /// Disable FIQ bypass.
        const DFB = 1 << 1;
        /// Disable IRQ bypass.
        const DIB = 1 << 2;
    }
}

bitflags! {
    /// ICC_CR0_EL1 (GICv5 CPU interface control) register value.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[repr(transparent)]
    pub struct IccCr0: u64 {
        /// CPU interface enable.
        const EN = 1 << 0;
    }
}

const ID_AA64PFR0_EL1_GIC_SHIFT: u64 = 24;
const ID_AA64PFR0_EL1_GIC_MASK: u64 = 0xf;

const ID_AA64PFR2_EL1_GCIE_SHIFT: u64 = 56;
const ID_AA64PFR2_EL1_GCIE_MASK: u64 = 0xf;

/// Returns whether the CPU implements the GICv3/v4 system register
/// interface (`ID_AA64PFR0_EL1.GIC != 0`).
pub fn is_feat_gic_supported() -> bool {
    (read_id_aa64pfr0_el1() >> ID_AA64PFR0_EL1_GIC_SHIFT) & ID_AA64PFR0_EL1_GIC_MASK != 0
}

/// Returns whether the system register interface is enabled for the current
/// exception level (`ICC_SRE_EL1.SRE`).
///
/// Only meaningful when [`is_feat_gic_supported`] already returned true;
/// `ICC_SRE_EL1` is not architected otherwise.
pub fn is_sre_enabled() -> bool {
    read_icc_sre_el1().contains(IccSre::SRE)
}

/// Returns whether the CPU implements the GICv5 CPU interface
/// (`ID_AA64PFR2_EL1.GCIE != 0`).
pub fn is_feat_gcie_supported() -> bool {
    (read_id_aa64pfr2_el1() >> ID_AA64PFR2_EL1_GCIE_SHIFT) & ID_AA64PFR2_EL1_GCIE_MASK != 0
}
