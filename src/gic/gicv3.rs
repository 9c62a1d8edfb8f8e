// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! GICv3 driver: system register CPU interface, memory-mapped distributor
//! and per-core redistributors.

use super::GicError;
use super::common::{GIC_PRI_MASK, GicdRegs, MIN_SPI_ID, NUM_PCPU_INTR, is_sgi, is_spi,
                    is_valid_intr_id};
use crate::mmio;
use crate::platform::{PerCoreState, Platform, PlatformImpl, exception_free};
use crate::sysregs::{
    IccSre, isb, read_icc_ctlr_el1, read_icc_iar1_el1, read_icc_igrpen1_el1, read_icc_pmr_el1,
    read_icc_sre_el1, write_icc_ctlr_el1, write_icc_eoir1_el1, write_icc_igrpen1_el1,
    write_icc_pmr_el1, write_icc_sgi1r_el1, write_icc_sre_el1,
};
use arm_sysregs::read_mpidr_el1;
use bitflags::bitflags;
use core::cell::RefCell;
use percore::{ExceptionLock, PerCore};

/// Size of one redistributor frame pair (control + SGI frame).
pub(crate) const GICR_FRAME_SIZE: usize = 0x2_0000;
/// Offset of the redistributor type register within the control frame.
pub(crate) const GICR_TYPER: usize = 0x8;
/// TYPER bit marking the last redistributor frame in the region.
pub(crate) const GICR_TYPER_LAST: u64 = 1 << 4;

const GICR_WAKER: usize = 0x14;
/// Offset of the SGI frame, which banks the distributor layout for one
/// core's SGIs and PPIs.
const GICR_SGI_BASE_OFFSET: usize = 0x1_0000;

const GICD_IROUTER: usize = 0x6000;

/// GICD_TYPER bit advertising the extended SPI range.
const TYPER_ESPI: u32 = 1 << 8;

const IAR_INTID_MASK: u64 = 0xff_ffff;

/// IROUTER affinity fields: Aff0..Aff2 in bits [23:0], Aff3 in [39:32],
/// matching their MPIDR positions.
const IROUTER_AFFINITY_MASK: u64 = (0xff << 32) | 0xff_ffff;

const ICC_SGI1R_AFF1_SHIFT: u64 = 16;
const ICC_SGI1R_INTID_SHIFT: u64 = 24;
const ICC_SGI1R_AFF2_SHIFT: u64 = 32;
const ICC_SGI1R_AFF3_SHIFT: u64 = 48;
/// Width of the SGI1R target list; cores with Aff0 beyond it need range
/// selection, which no supported platform topology requires.
const ICC_SGI1R_TARGET_LIST_WIDTH: u64 = 16;

/// Iteration budget for hardware-completion polls. Exhausting it reports a
/// [`GicError`] rather than hanging the caller.
const COMPLETION_POLL_RETRIES: u32 = 1_000_000;

bitflags! {
    /// GICv3 distributor control register, non-secure view.
    #[derive(Clone, Copy)]
    struct GicdCtlr: u32 {
        const ENABLE_G1NS = 1 << 1;
        const ARE_NS = 1 << 4;
        const RWP = 1 << 31;
    }
}

bitflags! {
    /// Redistributor wake register.
    #[derive(Clone, Copy)]
    struct GicrWaker: u32 {
        const PROCESSOR_SLEEP = 1 << 1;
        const CHILDREN_ASLEEP = 1 << 2;
    }
}

/// One core's redistributor address and saved state across a power-down
/// cycle.
#[derive(Clone, Copy)]
struct CoreContext {
    rdist_base: usize,
    icc_sre: IccSre,
    icc_pmr: u64,
    icc_igrpen1: u64,
    icc_ctlr: u64,
    isenabler0: u32,
    ipriorityr: [u32; NUM_PCPU_INTR / 4],
    icfgr: [u32; 2],
}

impl CoreContext {
    const EMPTY: Self = Self {
        rdist_base: 0,
        icc_sre: IccSre::empty(),
        icc_pmr: 0,
        icc_igrpen1: 0,
        icc_ctlr: 0,
        isenabler0: 0,
        ipriorityr: [0; NUM_PCPU_INTR / 4],
        icfgr: [0; 2],
    };
}

/// The GICv3 driver.
pub struct GicV3 {
    gicd: GicdRegs,
    gicr_base: usize,
    per_core: PerCoreState<CoreContext>,
}

impl GicV3 {
    /// Creates the driver for the redistributor region at `gicr_base` and
    /// the distributor frame at `gicd_base`.
    ///
    /// # Safety
    ///
    /// Both addresses must point at the corresponding device register frames
    /// (or fake frames in tests), mapped for the program's lifetime and not
    /// accessed by anything else.
    pub(crate) unsafe fn new(gicr_base: usize, gicd_base: usize) -> Self {
        Self {
            // SAFETY: The caller vouched for the distributor frame.
            gicd: unsafe { GicdRegs::new(gicd_base) },
            gicr_base,
            per_core: PerCore::new(
                [const { ExceptionLock::new(RefCell::new(CoreContext::EMPTY)) };
                    PlatformImpl::CORE_COUNT],
            ),
        }
    }

    /// Walks the redistributor region until it finds the frame whose TYPER
    /// affinity matches the calling core, and records its base address.
    ///
    /// Panics if the last frame is reached without a match; a core without a
    /// redistributor cannot take interrupts at all.
    pub(crate) fn probe_redistif_addr(&self) {
        let mpidr = read_mpidr_el1().bits();
        let affinity = (mpidr & 0xff_ffff) | (((mpidr >> 32) & 0xff) << 24);

        let mut frame = self.gicr_base;
        loop {
            // SAFETY: The constructor's caller vouched for the redistributor
            // region, which extends to the frame with the Last bit set.
            let typer = unsafe { mmio::read64(frame + GICR_TYPER) };
            if (typer >> 32) == affinity {
                exception_free(|token| {
                    self.per_core.get().borrow_mut(token).rdist_base = frame;
                });
                return;
            }
            if typer & GICR_TYPER_LAST != 0 {
                panic!("No redistributor frame for MPIDR {mpidr:#x}");
            }
            frame += GICR_FRAME_SIZE;
        }
    }

    /// Returns the calling core's redistributor control frame base.
    fn rdist_base(&self) -> usize {
        let base = exception_free(|token| self.per_core.get().borrow_mut(token).rdist_base);
        assert!(base != 0, "redistributor address not probed on this core");
        base
    }

    /// Returns accessors for the calling core's redistributor SGI frame.
    fn rdist_sgi_frame(&self) -> GicdRegs {
        // SAFETY: The frame sits inside the redistributor region the
        // constructor's caller vouched for.
        unsafe { GicdRegs::new(self.rdist_base() + GICR_SGI_BASE_OFFSET) }
    }

    /// Returns the frame that holds `interrupt_id`'s bulk register fields:
    /// the calling core's SGI frame for private interrupts, the distributor
    /// for SPIs.
    fn regs_for(&self, interrupt_id: u32) -> GicdRegs {
        if interrupt_id < MIN_SPI_ID {
            self.rdist_sgi_frame()
        } else {
            self.gicd
        }
    }

    /// Clears the calling core's ProcessorSleep and waits for the
    /// redistributor to wake up.
    fn wake_redistributor(&self) -> Result<(), GicError> {
        let waker_addr = self.rdist_base() + GICR_WAKER;
        // SAFETY: The address sits inside the probed redistributor frame.
        let waker = unsafe { mmio::read32(waker_addr) };
        // SAFETY: As above.
        unsafe { mmio::write32(waker_addr, waker & !GicrWaker::PROCESSOR_SLEEP.bits()) };

        for _ in 0..COMPLETION_POLL_RETRIES {
            // SAFETY: As above.
            let waker = unsafe { mmio::read32(waker_addr) };
            if waker & GicrWaker::CHILDREN_ASLEEP.bits() == 0 {
                return Ok(());
            }
        }
        Err(GicError::RedistributorWakeTimeout)
    }

    /// Waits for the distributor to finish a control register write.
    fn wait_for_pending_write(&self) -> Result<(), GicError> {
        for _ in 0..COMPLETION_POLL_RETRIES {
            if self.gicd.read_ctlr() & GicdCtlr::RWP.bits() == 0 {
                return Ok(());
            }
        }
        Err(GicError::PendingWriteTimeout)
    }

    pub(crate) fn setup_distif(&self) -> Result<(), GicError> {
        // Affinity routing must be in place before the group is enabled.
        self.gicd
            .write_ctlr(self.gicd.read_ctlr() | GicdCtlr::ARE_NS.bits());
        self.wait_for_pending_write()?;
        self.gicd
            .write_ctlr(self.gicd.read_ctlr() | GicdCtlr::ENABLE_G1NS.bits());
        self.wait_for_pending_write()
    }

    pub(crate) fn setup_cpuif(&self) -> Result<(), GicError> {
        self.wake_redistributor()?;

        write_icc_sre_el1(read_icc_sre_el1() | IccSre::SRE);
        isb();
        write_icc_pmr_el1(u64::from(GIC_PRI_MASK));
        self.enable_cpuif();
        Ok(())
    }

    pub(crate) fn enable_cpuif(&self) {
        write_icc_igrpen1_el1(read_icc_igrpen1_el1() | 1);
        isb();
    }

    pub(crate) fn disable_cpuif(&self) {
        write_icc_igrpen1_el1(read_icc_igrpen1_el1() & !1);
        isb();
    }

    pub(crate) fn save_cpuif_context(&self) {
        exception_free(|token| {
            let mut ctx = self.per_core.get().borrow_mut(token);
            ctx.icc_sre = read_icc_sre_el1();
            ctx.icc_pmr = read_icc_pmr_el1();
            ctx.icc_igrpen1 = read_icc_igrpen1_el1();
            ctx.icc_ctlr = read_icc_ctlr_el1();
        });
    }

    pub(crate) fn restore_cpuif_context(&self) {
        exception_free(|token| {
            let ctx = self.per_core.get().borrow_mut(token);
            write_icc_sre_el1(ctx.icc_sre);
            isb();
            write_icc_ctlr_el1(ctx.icc_ctlr);
            write_icc_pmr_el1(ctx.icc_pmr);
            write_icc_igrpen1_el1(ctx.icc_igrpen1);
            isb();
        });
    }

    /// Saves the calling core's SGI/PPI bank from its redistributor.
    pub(crate) fn save_sgi_ppi_context(&self) {
        let sgi_frame = self.rdist_sgi_frame();
        exception_free(|token| {
            let mut ctx = self.per_core.get().borrow_mut(token);
            ctx.isenabler0 = sgi_frame.read_isenabler(0);
            for (i, word) in ctx.ipriorityr.iter_mut().enumerate() {
                *word = sgi_frame.read_ipriorityr(4 * i as u32);
            }
            ctx.icfgr[0] = sgi_frame.read_icfgr(0);
            ctx.icfgr[1] = sgi_frame.read_icfgr(16);
        });
    }

    /// Restores the calling core's SGI/PPI bank to its redistributor.
    pub(crate) fn restore_sgi_ppi_context(&self) {
        let sgi_frame = self.rdist_sgi_frame();
        exception_free(|token| {
            let ctx = self.per_core.get().borrow_mut(token);
            for (i, word) in ctx.ipriorityr.iter().enumerate() {
                sgi_frame.write_ipriorityr(4 * i as u32, *word);
            }
            sgi_frame.write_icfgr(0, ctx.icfgr[0]);
            sgi_frame.write_icfgr(16, ctx.icfgr[1]);
            sgi_frame.write_icenabler(0, !ctx.isenabler0);
            sgi_frame.write_isenabler(0, ctx.isenabler0);
        });
    }

    pub(crate) fn get_ipriorityr(&self, interrupt_id: u32) -> u8 {
        assert!(is_valid_intr_id(interrupt_id));
        self.regs_for(interrupt_id).get_ipriorityr(interrupt_id)
    }

    pub(crate) fn set_ipriorityr(&self, interrupt_id: u32, priority: u32) {
        assert!(is_valid_intr_id(interrupt_id));
        self.regs_for(interrupt_id)
            .set_ipriorityr(interrupt_id, priority);
    }

    pub(crate) fn send_sgi(&self, sgi_id: u32, core_pos: usize) {
        assert!(is_sgi(sgi_id));
        let mpidr = PlatformImpl::mpidr_from_core_pos(core_pos);
        let aff0 = mpidr & 0xff;
        assert!(aff0 < ICC_SGI1R_TARGET_LIST_WIDTH);

        let value = (((mpidr >> 32) & 0xff) << ICC_SGI1R_AFF3_SHIFT)
            | (((mpidr >> 16) & 0xff) << ICC_SGI1R_AFF2_SHIFT)
            | (((mpidr >> 8) & 0xff) << ICC_SGI1R_AFF1_SHIFT)
            | (u64::from(sgi_id) << ICC_SGI1R_INTID_SHIFT)
            | (1 << aff0);
        write_icc_sgi1r_el1(value);
        isb();
    }

    /// Routes an SPI to the core at `core_pos` through affinity routing.
    /// Private interrupts are banked per core and cannot be rerouted.
    pub(crate) fn set_intr_route(&self, interrupt_id: u32, core_pos: usize) {
        assert!(is_valid_intr_id(interrupt_id));
        if !is_spi(interrupt_id) {
            return;
        }
        let mpidr = PlatformImpl::mpidr_from_core_pos(core_pos);
        // SAFETY: The constructor's caller vouched for the distributor frame.
        unsafe {
            mmio::write64(
                self.gicd.base() + GICD_IROUTER + 8 * interrupt_id as usize,
                mpidr & IROUTER_AFFINITY_MASK,
            );
        }
    }

    pub(crate) fn get_isenabler(&self, interrupt_id: u32) -> bool {
        assert!(is_valid_intr_id(interrupt_id));
        self.regs_for(interrupt_id).get_isenabler(interrupt_id)
    }

    pub(crate) fn set_isenabler(&self, interrupt_id: u32) {
        assert!(is_valid_intr_id(interrupt_id));
        self.regs_for(interrupt_id).set_isenabler(interrupt_id);
    }

    pub(crate) fn set_icenabler(&self, interrupt_id: u32) {
        assert!(is_valid_intr_id(interrupt_id));
        self.regs_for(interrupt_id).set_icenabler(interrupt_id);
    }

    pub(crate) fn get_ispendr(&self, interrupt_id: u32) -> bool {
        assert!(is_valid_intr_id(interrupt_id));
        self.regs_for(interrupt_id).get_ispendr(interrupt_id)
    }

    pub(crate) fn set_icpendr(&self, interrupt_id: u32) {
        assert!(is_valid_intr_id(interrupt_id));
        self.regs_for(interrupt_id).set_icpendr(interrupt_id);
    }

    /// Acknowledges the highest priority pending group 1 interrupt. The
    /// returned value is the logical interrupt ID; unlike GICv2 there is no
    /// extra source information to carry to end-of-interrupt.
    pub(crate) fn acknowledge_interrupt(&self) -> u32 {
        (read_icc_iar1_el1() & IAR_INTID_MASK) as u32
    }

    pub(crate) fn end_of_interrupt(&self, raw_iar: u32) {
        write_icc_eoir1_el1(u64::from(raw_iar));
    }

    /// Returns whether the distributor implements the extended SPI range.
    pub(crate) fn is_espi_supported(&self) -> bool {
        self.gicd.read_typer() & TYPER_ESPI != 0
    }
}
