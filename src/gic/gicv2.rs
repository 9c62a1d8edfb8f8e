// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! GICv2 driver: memory-mapped distributor and CPU interface.

use super::common::{GIC_PRI_MASK, GicdRegs, NUM_PCPU_INTR, is_sgi, is_valid_intr_id};
use crate::mmio;
use crate::platform::{CoresImpl, PerCoreState, Platform, PlatformImpl, exception_free};
use bitflags::bitflags;
use core::cell::RefCell;
use percore::{Cores, ExceptionLock, PerCore};
use spin::mutex::SpinMutex;

// CPU interface register offsets.
const GICC_CTLR: usize = 0x0;
const GICC_PMR: usize = 0x4;
const GICC_BPR: usize = 0x8;
const GICC_IAR: usize = 0xc;
const GICC_EOIR: usize = 0x10;

// Distributor registers specific to GICv2.
const GICD_ITARGETSR: usize = 0x800;
const GICD_SGIR: usize = 0xf00;

// Interrupt acknowledge register fields. The source CPU ID accompanies SGI
// acknowledges and must be echoed back on end-of-interrupt.
const IAR_INTID_MASK: u32 = 0x3ff;

const SGIR_TARGET_SHIFT: u32 = 16;

bitflags! {
    /// GICv2 distributor control register.
    #[derive(Clone, Copy)]
    struct GicdCtlr: u32 {
        const ENABLE = 1 << 0;
    }
}

bitflags! {
    /// GICv2 CPU interface control register.
    #[derive(Clone, Copy)]
    struct GiccCtlr: u32 {
        const ENABLE = 1 << 0;
    }
}

/// Extracts the logical interrupt ID from a raw acknowledge value.
pub(crate) const fn intid_from_raw(raw_iar: u32) -> u32 {
    raw_iar & IAR_INTID_MASK
}

/// One core's saved GICv2 state across a power-down cycle: the CPU
/// interface registers plus the banked SGI/PPI distributor registers.
#[derive(Clone, Copy)]
struct CoreContext {
    gicc_ctlr: u32,
    gicc_pmr: u32,
    gicc_bpr: u32,
    isenabler0: u32,
    ipriorityr: [u32; NUM_PCPU_INTR / 4],
    icfgr: [u32; 2],
}

impl CoreContext {
    const EMPTY: Self = Self {
        gicc_ctlr: 0,
        gicc_pmr: 0,
        gicc_bpr: 0,
        isenabler0: 0,
        ipriorityr: [0; NUM_PCPU_INTR / 4],
        icfgr: [0; 2],
    };
}

/// The GICv2 driver.
pub struct GicV2 {
    gicd: GicdRegs,
    gicc_base: usize,
    /// Each core's CPU interface mask, as discovered from its own banked
    /// ITARGETSR0 view. Written once per core during local setup; read from
    /// any core when routing interrupts or SGIs to it.
    cpu_ids: SpinMutex<[u32; PlatformImpl::CORE_COUNT]>,
    per_core: PerCoreState<CoreContext>,
}

impl GicV2 {
    /// Creates the driver for the CPU interface frame at `gicc_base` and the
    /// distributor frame at `gicd_base`.
    ///
    /// # Safety
    ///
    /// Both addresses must point at the corresponding device register frames
    /// (or fake frames in tests), mapped for the program's lifetime and not
    /// accessed by anything else.
    pub(crate) unsafe fn new(gicc_base: usize, gicd_base: usize) -> Self {
        Self {
            // SAFETY: The caller vouched for the distributor frame.
            gicd: unsafe { GicdRegs::new(gicd_base) },
            gicc_base,
            cpu_ids: SpinMutex::new([0; PlatformImpl::CORE_COUNT]),
            per_core: PerCore::new(
                [const { ExceptionLock::new(RefCell::new(CoreContext::EMPTY)) };
                    PlatformImpl::CORE_COUNT],
            ),
        }
    }

    fn read_gicc(&self, offset: usize) -> u32 {
        // SAFETY: The constructor's caller vouched for the CPU interface
        // frame.
        unsafe { mmio::read32(self.gicc_base + offset) }
    }

    fn write_gicc(&self, offset: usize, val: u32) {
        // SAFETY: The constructor's caller vouched for the CPU interface
        // frame.
        unsafe { mmio::write32(self.gicc_base + offset, val) }
    }

    /// Learns the calling core's CPU interface mask from its banked view of
    /// ITARGETSR0.
    pub(crate) fn probe_gic_cpu_id(&self) {
        // SAFETY: The constructor's caller vouched for the distributor frame.
        let mask = unsafe { mmio::read32(self.gicd.base() + GICD_ITARGETSR) } & 0xff;
        assert!(mask != 0, "GICv2 CPU interface mask reads as zero");
        self.cpu_ids.lock()[CoresImpl::core_index()] = mask;
    }

    pub(crate) fn setup_distif(&self) {
        self.gicd
            .write_ctlr(self.gicd.read_ctlr() | GicdCtlr::ENABLE.bits());
    }

    pub(crate) fn setup_cpuif(&self) {
        // Accept all priorities, then switch the interface on.
        self.write_gicc(GICC_PMR, GIC_PRI_MASK);
        self.enable_cpuif();
    }

    pub(crate) fn enable_cpuif(&self) {
        self.write_gicc(GICC_CTLR, self.read_gicc(GICC_CTLR) | GiccCtlr::ENABLE.bits());
    }

    pub(crate) fn disable_cpuif(&self) {
        self.write_gicc(
            GICC_CTLR,
            self.read_gicc(GICC_CTLR) & !GiccCtlr::ENABLE.bits(),
        );
    }

    pub(crate) fn save_cpuif_context(&self) {
        exception_free(|token| {
            let mut ctx = self.per_core.get().borrow_mut(token);
            ctx.gicc_ctlr = self.read_gicc(GICC_CTLR);
            ctx.gicc_pmr = self.read_gicc(GICC_PMR);
            ctx.gicc_bpr = self.read_gicc(GICC_BPR);
        });
    }

    pub(crate) fn restore_cpuif_context(&self) {
        exception_free(|token| {
            let ctx = self.per_core.get().borrow_mut(token);
            self.write_gicc(GICC_BPR, ctx.gicc_bpr);
            self.write_gicc(GICC_PMR, ctx.gicc_pmr);
            self.write_gicc(GICC_CTLR, ctx.gicc_ctlr);
        });
    }

    /// Saves the calling core's banked SGI/PPI distributor registers.
    pub(crate) fn save_sgi_ppi_context(&self) {
        exception_free(|token| {
            let mut ctx = self.per_core.get().borrow_mut(token);
            ctx.isenabler0 = self.gicd.read_isenabler(0);
            for (i, word) in ctx.ipriorityr.iter_mut().enumerate() {
                *word = self.gicd.read_ipriorityr(4 * i as u32);
            }
            ctx.icfgr[0] = self.gicd.read_icfgr(0);
            ctx.icfgr[1] = self.gicd.read_icfgr(16);
        });
    }

    /// Restores the calling core's banked SGI/PPI distributor registers.
    pub(crate) fn restore_sgi_ppi_context(&self) {
        exception_free(|token| {
            let ctx = self.per_core.get().borrow_mut(token);
            for (i, word) in ctx.ipriorityr.iter().enumerate() {
                self.gicd.write_ipriorityr(4 * i as u32, *word);
            }
            self.gicd.write_icfgr(0, ctx.icfgr[0]);
            self.gicd.write_icfgr(16, ctx.icfgr[1]);
            // Clear interrupts that should not be enabled before setting the
            // saved enables.
            self.gicd.write_icenabler(0, !ctx.isenabler0);
            self.gicd.write_isenabler(0, ctx.isenabler0);
        });
    }

    pub(crate) fn get_ipriorityr(&self, interrupt_id: u32) -> u8 {
        assert!(is_valid_intr_id(interrupt_id));
        self.gicd.get_ipriorityr(interrupt_id)
    }

    pub(crate) fn set_ipriorityr(&self, interrupt_id: u32, priority: u32) {
        assert!(is_valid_intr_id(interrupt_id));
        self.gicd.set_ipriorityr(interrupt_id, priority);
    }

    pub(crate) fn send_sgi(&self, sgi_id: u32, core_pos: usize) {
        assert!(is_sgi(sgi_id));
        let target_mask = self.cpu_ids.lock()[core_pos];
        assert!(target_mask != 0, "SGI target core has not set up its GIC");
        // SAFETY: The constructor's caller vouched for the distributor frame.
        unsafe {
            mmio::write32(
                self.gicd.base() + GICD_SGIR,
                (target_mask << SGIR_TARGET_SHIFT) | sgi_id,
            );
        }
    }

    /// Routes `interrupt_id` to the core at `core_pos` through its
    /// target-CPU bitmask.
    pub(crate) fn set_itargetsr(&self, interrupt_id: u32, core_pos: usize) {
        assert!(is_valid_intr_id(interrupt_id));
        let target_mask = self.cpu_ids.lock()[core_pos];
        // SAFETY: The constructor's caller vouched for the distributor frame.
        unsafe {
            mmio::write8(
                self.gicd.base() + GICD_ITARGETSR + interrupt_id as usize,
                target_mask as u8,
            );
        }
    }

    pub(crate) fn get_isenabler(&self, interrupt_id: u32) -> bool {
        assert!(is_valid_intr_id(interrupt_id));
        self.gicd.get_isenabler(interrupt_id)
    }

    pub(crate) fn set_isenabler(&self, interrupt_id: u32) {
        assert!(is_valid_intr_id(interrupt_id));
        self.gicd.set_isenabler(interrupt_id);
    }

    pub(crate) fn set_icenabler(&self, interrupt_id: u32) {
        assert!(is_valid_intr_id(interrupt_id));
        self.gicd.set_icenabler(interrupt_id);
    }

    pub(crate) fn get_ispendr(&self, interrupt_id: u32) -> bool {
        assert!(is_valid_intr_id(interrupt_id));
        self.gicd.get_ispendr(interrupt_id)
    }

    pub(crate) fn set_icpendr(&self, interrupt_id: u32) {
        assert!(is_valid_intr_id(interrupt_id));
        self.gicd.set_icpendr(interrupt_id);
    }

    /// Reads the raw interrupt acknowledge register. The value may carry the
    /// source CPU ID alongside the interrupt ID and must be passed back to
    /// [`GicV2::write_eoir`] unchanged.
    pub(crate) fn read_iar(&self) -> u32 {
        self.read_gicc(GICC_IAR)
    }

    pub(crate) fn write_eoir(&self, raw_iar: u32) {
        self.write_gicc(GICC_EOIR, raw_iar);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::test::{FAKE_GICC, FAKE_GICD, reset_fake_state, set_current_core};
    use crate::tests::host_test_lock;

    fn gicv2() -> GicV2 {
        // SAFETY: The fake frames outlive the test and are not accessed
        // concurrently while the test lock is held.
        unsafe { GicV2::new(FAKE_GICC.base(), FAKE_GICD.base()) }
    }

    fn write_fake(base: usize, offset: usize, val: u32) {
        // SAFETY: The address points into a fake frame.
        unsafe { mmio::write32(base + offset, val) }
    }

    fn read_fake(base: usize, offset: usize) -> u32 {
        // SAFETY: The address points into a fake frame.
        unsafe { mmio::read32(base + offset) }
    }

    #[test]
    fn raw_iar_round_trip_preserves_source_cpu() {
        let _guard = host_test_lock();
        reset_fake_state();
        let gic = gicv2();

        // SGI 5 acknowledged with source CPU 2 in bits [12:10].
        let raw = (2 << 10) | 5;
        write_fake(FAKE_GICC.base(), GICC_IAR, raw);

        let raw_iar = gic.read_iar();
        assert_eq!(intid_from_raw(raw_iar), 5);

        gic.write_eoir(raw_iar);
        assert_eq!(read_fake(FAKE_GICC.base(), GICC_EOIR), raw);
    }

    #[test]
    fn sgi_targets_the_probed_cpu_mask() {
        let _guard = host_test_lock();
        reset_fake_state();
        let gic = gicv2();

        // Core 1's banked ITARGETSR0 view says its interface mask is 0x02.
        set_current_core(1);
        write_fake(FAKE_GICD.base(), GICD_ITARGETSR, 0x0202_0202);
        gic.probe_gic_cpu_id();

        set_current_core(0);
        gic.send_sgi(7, 1);
        assert_eq!(read_fake(FAKE_GICD.base(), GICD_SGIR), (0x02 << 16) | 7);
    }

    #[test]
    fn cpuif_setup_programs_priority_mask_and_enable() {
        let _guard = host_test_lock();
        reset_fake_state();
        let gic = gicv2();

        gic.setup_cpuif();
        assert_eq!(read_fake(FAKE_GICC.base(), GICC_PMR), 0xff);
        assert_eq!(read_fake(FAKE_GICC.base(), GICC_CTLR), 1);

        gic.disable_cpuif();
        assert_eq!(read_fake(FAKE_GICC.base(), GICC_CTLR), 0);
    }

    #[test]
    fn banked_context_round_trip() {
        let _guard = host_test_lock();
        reset_fake_state();
        let gic = gicv2();

        gic.set_isenabler(17);
        gic.set_ipriorityr(17, 0x80);
        gic.save_sgi_ppi_context();

        // Losing hardware state wipes the banked registers.
        FAKE_GICD.reset();
        assert!(!gic.get_isenabler(17));

        gic.restore_sgi_ppi_context();
        assert!(gic.get_isenabler(17));
        assert_eq!(gic.get_ipriorityr(17), 0x80);
    }
}
