// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Generation-agnostic Arm GIC driver and IRQ dispatch layer for AArch64
//! firmware test images.
//!
//! The crate provides the interrupt plumbing of a bare-metal firmware test
//! framework: a version-dispatch facade over the GICv2, GICv3 and GICv5
//! interrupt controllers ([`gic`]), and a per-core handler registry plus
//! dispatcher ([`irq`]) that the image's exception vectors call on every IRQ
//! trap.
//!
//! The expected boot sequence, once per system:
//!
//! 1. [`gic::probe`] detects the interrupt controller generation.
//! 2. [`gic::init`] hands the driver its register frame base addresses.
//! 3. [`gic::setup_global`] configures the distributor (or IRS).
//! 4. [`irq::setup`] clears the handler registry.
//!
//! and then, once per core as it comes online:
//!
//! 5. [`gic::setup_local`] configures the core's CPU interface.
//! 6. [`gic::enable_interrupts_local`].
//!
//! Unit tests run on the host against fake register frames and fake system
//! registers, so the real drivers are exercised without hardware.

#![cfg_attr(not(test), no_std)]

pub mod debug;
pub mod gic;
pub mod irq;
pub mod logger;
mod mmio;
pub mod platform;
pub mod sysregs;
