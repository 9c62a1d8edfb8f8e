// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! GICv5 driver: system-instruction CPU interface and a single IRS.
//!
//! GICv5 drops the distributor/redistributor split. PPIs live entirely in
//! CPU system registers; everything else is reached through `GIC CD*`
//! system instructions, with per-core SGIs carried as LPIs backed by an
//! interrupt state table (IST) in ordinary memory. An ITS/IWB are not used.

use super::GicError;
use crate::debug::ENABLE_ASSERTIONS;
use crate::irq::IRQ_NUM_SGIS;
use crate::mmio;
use crate::platform::{CoresImpl, PerCoreState, Platform, PlatformImpl, exception_free};
use crate::sysregs::{
    IccCr0, giccdaff, giccddi, giccddis, giccden, giccdeoi, giccdpend, giccdpri, giccdrcfg,
    gicrcdia, gsb_ack, gsb_sys, isb, read_icc_cr0_el1, read_icc_iaffidr_el1, read_icc_icsr_el1,
    read_icc_ppi_cpendr0, read_icc_ppi_cpendr1, read_icc_ppi_enabler0, read_icc_ppi_enabler1,
    read_icc_ppi_priorityrn, read_icc_ppi_sactiver0, read_icc_ppi_sactiver1,
    read_icc_ppi_spendr0, read_icc_ppi_spendr1, write_icc_cr0_el1, write_icc_pcr_el1,
    write_icc_ppi_cpendr0, write_icc_ppi_cpendr1, write_icc_ppi_enabler0,
    write_icc_ppi_enabler1, write_icc_ppi_priorityrn, write_icc_ppi_spendr0,
    write_icc_ppi_spendr1,
};
use crate::sysregs;
use core::cell::{RefCell, UnsafeCell};
use percore::{Cores, ExceptionLock, PerCore};
use spin::mutex::SpinMutex;

/// Interrupt type field of a GICv5 interrupt ID.
pub(crate) const INT_TYPE_SHIFT: u32 = 29;
const INT_TYPE_MASK: u32 = 0x7;
/// Numeric ID field of a GICv5 interrupt ID.
const INT_ID_MASK: u32 = 0xff_ffff;

/// Private peripheral interrupt.
pub(crate) const INT_PPI: u32 = 1;
/// Local peripheral interrupt; carries this driver's SGIs.
pub(crate) const INT_LPI: u32 = 2;
/// Shared peripheral interrupt.
pub(crate) const INT_SPI: u32 = 3;

const GICV5_IDLE_PRIORITY: u64 = 0xff;
/// GICv5 priorities are 5 bits wide.
const PRIORITY_WIDTH: u32 = 5;

const GICCDPRI_PRIORITY_SHIFT: u64 = 32;
const GICCDAFF_IAFFID_SHIFT: u64 = 32;
const GICCDPEND_PENDING_BIT: u64 = 1 << 32;
const GICRCDIA_VALID_BIT: u64 = 1 << 32;

pub(crate) const ICC_ICSR_EL1_F_BIT: u64 = 1 << 0;
pub(crate) const ICC_ICSR_EL1_PENDING_BIT: u64 = 1 << 1;

// Field counts of the banked PPI system registers: 64 one-bit fields per
// enable/pending register, 8 byte-wide fields per priority register.
const ICC_PPI_ENABLER_FIELD_NUM: u32 = 64;
const ICC_PPI_XPENDR_FIELD_NUM: u32 = 64;
const ICC_PPI_PRIORITYR_FIELD_NUM: u32 = 8;
const ICC_PPI_PRIORITYR_FIELD_MASK: u64 = 0xff;
const NUM_PPI_PRIORITYR: usize = 16;

// IRS register offsets and fields.
const IRS_IDR2: usize = 0x0008;
const IRS_CR0: usize = 0x0080;
const IRS_IST_BASER: usize = 0x0180;
const IRS_IST_CFGR: usize = 0x0190;
const IRS_IST_STATUSR: usize = 0x0194;

const IRS_IDR2_MIN_LPI_ID_BITS_SHIFT: u32 = 5;
const IRS_IDR2_MIN_LPI_ID_BITS_MASK: u32 = 0xf;
const IRS_IDR2_ID_BITS_SHIFT: u32 = 0;
const IRS_IDR2_ID_BITS_MASK: u32 = 0x1f;
const IRS_CR0_IRSEN_BIT: u32 = 1 << 0;
const IRS_CR0_IDLE_BIT: u32 = 1 << 1;
const IRS_IST_STATUSR_IDLE_BIT: u32 = 1 << 0;
const IRS_IST_BASER_VALID_BIT: u64 = 1 << 0;
const IRS_IST_BASER_ADDR_MASK: u64 = ((1 << 50) - 1) << 6;

const COMPLETION_POLL_RETRIES: u32 = 1_000_000;

const fn next_power_of_2(n: usize) -> usize {
    let mut p = 1;
    while p < n {
        p <<= 1;
    }
    p
}

const fn log2(n: usize) -> u32 {
    usize::BITS - 1 - n.leading_zeros()
}

// The IST length is a power of 2 since its log goes in IRS_IST_CFGR as
// LPI_ID_Bits.
const IST_LEN: usize = next_power_of_2(PlatformImpl::CORE_COUNT) * IRQ_NUM_SGIS as usize;

/// Backing storage for the interrupt state table the IRS walks. The base
/// address programmed into IRS_IST_BASER must be 64-byte aligned.
#[repr(C, align(64))]
struct IstStorage(UnsafeCell<[u32; IST_LEN]>);

// SAFETY: The table is only written by `setup`, once, on the boot core,
// before the IRS is enabled; afterwards only the IRS hardware touches it.
unsafe impl Sync for IstStorage {}

static IST: IstStorage = IstStorage(UnsafeCell::new([0; IST_LEN]));

/// Detects whether the system runs the GICv5 CPU interface.
pub fn is_gicv5_mode() -> bool {
    sysregs::is_feat_gcie_supported()
}

/// Extracts the interrupt type field of a GICv5 interrupt ID.
pub(crate) const fn int_type(interrupt_id: u32) -> u32 {
    (interrupt_id >> INT_TYPE_SHIFT) & INT_TYPE_MASK
}

/// Extracts the numeric ID field of a GICv5 interrupt ID.
pub(crate) const fn int_id(interrupt_id: u32) -> u32 {
    interrupt_id & INT_ID_MASK
}

const fn is_interrupt(interrupt_id: u32) -> bool {
    let ty = int_type(interrupt_id);
    ty == INT_PPI || ty == INT_LPI || ty == INT_SPI
}

/// One core's saved GICv5 CPU interface state across a power-down cycle.
/// Only the registers currently in use; handling mode is left alone.
#[derive(Clone, Copy)]
struct CoreContext {
    icc_cr0: IccCr0,
    ppi_enabler: [u64; 2],
    ppi_xpendr: [u64; 2],
    ppi_priorityr: [u64; NUM_PPI_PRIORITYR],
}

impl CoreContext {
    const EMPTY: Self = Self {
        icc_cr0: IccCr0::empty(),
        ppi_enabler: [0; 2],
        ppi_xpendr: [0; 2],
        ppi_priorityr: [0; NUM_PPI_PRIORITYR],
    };
}

/// The GICv5 driver.
pub struct GicV5 {
    irs_base: usize,
    /// CPU MPIDR != GICv5 IAFFID. This holds the mapping, captured as each
    /// core sets up its CPU interface.
    iaffids: SpinMutex<[u16; PlatformImpl::CORE_COUNT]>,
    per_core: PerCoreState<CoreContext>,
}

impl GicV5 {
    /// Creates the driver for the IRS configuration frame at `irs_base`.
    ///
    /// # Safety
    ///
    /// `irs_base` must point at the IRS register frame (or a fake frame in
    /// tests), mapped for the program's lifetime and not accessed by
    /// anything else.
    pub(crate) unsafe fn new(irs_base: usize) -> Self {
        Self {
            irs_base,
            iaffids: SpinMutex::new([0; PlatformImpl::CORE_COUNT]),
            per_core: PerCore::new(
                [const { ExceptionLock::new(RefCell::new(CoreContext::EMPTY)) };
                    PlatformImpl::CORE_COUNT],
            ),
        }
    }

    fn read_irs(&self, offset: usize) -> u32 {
        // SAFETY: The constructor's caller vouched for the IRS frame.
        unsafe { mmio::read32(self.irs_base + offset) }
    }

    fn write_irs(&self, offset: usize, val: u32) {
        // SAFETY: The constructor's caller vouched for the IRS frame.
        unsafe { mmio::write32(self.irs_base + offset, val) }
    }

    fn write_irs64(&self, offset: usize, val: u64) {
        // SAFETY: The constructor's caller vouched for the IRS frame.
        unsafe { mmio::write64(self.irs_base + offset, val) }
    }

    fn wait_for_idle(&self, offset: usize, idle_bit: u32) -> Result<(), GicError> {
        for _ in 0..COMPLETION_POLL_RETRIES {
            if self.read_irs(offset) & idle_bit != 0 {
                return Ok(());
            }
        }
        Err(GicError::IrsTimeout)
    }

    /// Returns whether `interrupt_id` is in the SPI type space.
    pub(crate) fn is_irq_spi(&self, interrupt_id: u32) -> bool {
        int_type(interrupt_id) == INT_SPI
    }

    pub(crate) fn enable_cpuif(&self) {
        write_icc_cr0_el1(read_icc_cr0_el1() | IccCr0::EN);
        // Make sure the effects are visible.
        isb();
    }

    pub(crate) fn setup_cpuif(&self) {
        self.iaffids.lock()[CoresImpl::core_index()] = read_icc_iaffidr_el1() as u16;

        write_icc_pcr_el1(GICV5_IDLE_PRIORITY);

        self.enable_cpuif();
    }

    pub(crate) fn disable_cpuif(&self) {
        write_icc_cr0_el1(read_icc_cr0_el1() - IccCr0::EN);
        // Make sure the effects are visible.
        isb();
    }

    pub(crate) fn save_cpuif_context(&self) {
        exception_free(|token| {
            let mut ctx = self.per_core.get().borrow_mut(token);
            ctx.icc_cr0 = read_icc_cr0_el1();
            ctx.ppi_enabler[0] = read_icc_ppi_enabler0();
            ctx.ppi_enabler[1] = read_icc_ppi_enabler1();

            ctx.ppi_xpendr[0] = read_icc_ppi_spendr0();
            ctx.ppi_xpendr[1] = read_icc_ppi_spendr1();

            for (i, reg) in ctx.ppi_priorityr.iter_mut().enumerate() {
                *reg = read_icc_ppi_priorityrn(i);
            }
        });

        // Make sure no PPI is active, i.e. not suspending mid interrupt.
        assert!(read_icc_ppi_sactiver0() == 0 && read_icc_ppi_sactiver1() == 0);
    }

    pub(crate) fn restore_cpuif_context(&self) {
        exception_free(|token| {
            let ctx = self.per_core.get().borrow_mut(token);
            write_icc_ppi_enabler0(ctx.ppi_enabler[0]);
            write_icc_ppi_enabler1(ctx.ppi_enabler[1]);

            write_icc_ppi_spendr0(ctx.ppi_xpendr[0]);
            write_icc_ppi_spendr1(ctx.ppi_xpendr[1]);
            // Clear interrupts that shouldn't be pending.
            write_icc_ppi_cpendr0(!ctx.ppi_xpendr[0]);
            write_icc_ppi_cpendr1(!ctx.ppi_xpendr[1]);

            for (i, reg) in ctx.ppi_priorityr.iter().enumerate() {
                write_icc_ppi_priorityrn(i, *reg);
            }

            // Not worth saving; put the same value back in.
            write_icc_pcr_el1(GICV5_IDLE_PRIORITY);

            write_icc_cr0_el1(ctx.icc_cr0);
        });
        // Make sure the effects are visible.
        isb();
    }

    pub(crate) fn set_priority(&self, interrupt_id: u32, priority: u32) {
        assert!(priority < (1 << PRIORITY_WIDTH));
        assert!(is_interrupt(interrupt_id));

        if int_type(interrupt_id) != INT_PPI {
            giccdpri(u64::from(interrupt_id) | (u64::from(priority) << GICCDPRI_PRIORITY_SHIFT));
            return;
        }

        // It's a PPI, get rid of the interrupt type field.
        let interrupt_id = int_id(interrupt_id);
        let reg = (interrupt_id / ICC_PPI_PRIORITYR_FIELD_NUM) as usize;
        let shift = (interrupt_id % ICC_PPI_PRIORITYR_FIELD_NUM) * 8;

        let priorityr =
            read_icc_ppi_priorityrn(reg) & !(ICC_PPI_PRIORITYR_FIELD_MASK << shift);
        write_icc_ppi_priorityrn(reg, priorityr | (u64::from(priority) << shift));
    }

    pub(crate) fn send_sgi(&self, sgi_id: u32, core_pos: usize) {
        giccdpend(u64::from(self.sgi_num(sgi_id, core_pos)) | GICCDPEND_PENDING_BIT);
    }

    pub(crate) fn set_intr_route(&self, interrupt_id: u32, core_pos: usize) {
        assert!(is_interrupt(interrupt_id));

        // PPIs are local to the CPU, can't be rerouted.
        if int_type(interrupt_id) == INT_PPI {
            return;
        }

        // The expectation is that a core is up (CPU_ON) before it gets
        // targetted by interrupts. Otherwise the IAFFID isn't available yet
        // and the interrupt would be misrouted.
        let iaffid = self.iaffids.lock()[core_pos];
        assert!(iaffid != 0 || core_pos == 0);
        giccdaff((u64::from(iaffid) << GICCDAFF_IAFFID_SHIFT) | u64::from(interrupt_id));

        // Wait for the target to take effect so retargetting an already
        // enabled interrupt ends up in the correct destination.
        gsb_sys();
    }

    pub(crate) fn intr_enable(&self, interrupt_id: u32) {
        assert!(is_interrupt(interrupt_id));

        if int_type(interrupt_id) != INT_PPI {
            giccden(u64::from(interrupt_id));
            return;
        }

        // It's a PPI, get rid of the interrupt type field.
        let interrupt_id = int_id(interrupt_id);
        let bit = 1 << (interrupt_id % ICC_PPI_ENABLER_FIELD_NUM);

        if interrupt_id / ICC_PPI_ENABLER_FIELD_NUM == 0 {
            write_icc_ppi_enabler0(read_icc_ppi_enabler0() | bit);
        } else {
            write_icc_ppi_enabler1(read_icc_ppi_enabler1() | bit);
        }
    }

    pub(crate) fn intr_disable(&self, interrupt_id: u32) {
        assert!(is_interrupt(interrupt_id));

        if int_type(interrupt_id) != INT_PPI {
            giccddis(u64::from(interrupt_id));
            // Wait for the interrupt to become disabled.
            gsb_sys();
            return;
        }

        // It's a PPI, get rid of the interrupt type field.
        let interrupt_id = int_id(interrupt_id);
        let bit = 1 << (interrupt_id % ICC_PPI_ENABLER_FIELD_NUM);

        if interrupt_id / ICC_PPI_ENABLER_FIELD_NUM == 0 {
            write_icc_ppi_enabler0(read_icc_ppi_enabler0() & !bit);
        } else {
            write_icc_ppi_enabler1(read_icc_ppi_enabler1() & !bit);
        }
    }

    pub(crate) fn acknowledge_interrupt(&self) -> u32 {
        let iar = gicrcdia();
        assert!(iar & GICRCDIA_VALID_BIT != 0);

        // Wait for the intr ack to complete (i.e. make it Active) and
        // refetch instructions so they don't operate on anything stale.
        gsb_ack();
        isb();

        (iar & !GICRCDIA_VALID_BIT) as u32
    }

    pub(crate) fn is_intr_pending(&self, interrupt_id: u32) -> bool {
        assert!(is_interrupt(interrupt_id));

        if int_type(interrupt_id) != INT_PPI {
            // Request the interrupt information.
            giccdrcfg(u64::from(interrupt_id));
            // Wait for the register to update.
            isb();
            let icsr = read_icc_icsr_el1();

            // The interrupt is unreachable, something has gone wrong.
            assert!(icsr & ICC_ICSR_EL1_F_BIT == 0);
            return icsr & ICC_ICSR_EL1_PENDING_BIT != 0;
        }

        // It's a PPI, get rid of the interrupt type field.
        let interrupt_id = int_id(interrupt_id);
        let spendr = if interrupt_id / ICC_PPI_XPENDR_FIELD_NUM == 0 {
            read_icc_ppi_spendr0()
        } else {
            read_icc_ppi_spendr1()
        };

        spendr & (1 << (interrupt_id % ICC_PPI_XPENDR_FIELD_NUM)) != 0
    }

    pub(crate) fn intr_clear(&self, interrupt_id: u32) {
        assert!(is_interrupt(interrupt_id));

        if int_type(interrupt_id) != INT_PPI {
            giccdpend(u64::from(interrupt_id));
            return;
        }

        // It's a PPI, get rid of the interrupt type field.
        let interrupt_id = int_id(interrupt_id);
        let bit = 1 << (interrupt_id % ICC_PPI_XPENDR_FIELD_NUM);

        if interrupt_id / ICC_PPI_XPENDR_FIELD_NUM == 0 {
            write_icc_ppi_cpendr0(read_icc_ppi_cpendr0() | bit);
        } else {
            write_icc_ppi_cpendr1(read_icc_ppi_cpendr1() | bit);
        }
    }

    pub(crate) fn end_of_interrupt(&self, raw_iar: u32) {
        giccddi(u64::from(raw_iar));
        giccdeoi();
        // No isb as we won't interact with the GIC before the eret.
    }

    /// Configures and enables the IRS. Currently a single IRS is expected.
    pub(crate) fn setup(&self) -> Result<(), GicError> {
        let id_bits = log2(IST_LEN);
        if ENABLE_ASSERTIONS {
            let irs_idr2 = self.read_irs(IRS_IDR2);
            // min_id_bits <= log2(length(ist)) <= id_bits
            assert!(
                (irs_idr2 >> IRS_IDR2_MIN_LPI_ID_BITS_SHIFT) & IRS_IDR2_MIN_LPI_ID_BITS_MASK
                    <= id_bits
            );
            assert!((irs_idr2 >> IRS_IDR2_ID_BITS_SHIFT) & IRS_IDR2_ID_BITS_MASK >= id_bits);
        }

        // Make sure no ISTE starts out enabled.
        // SAFETY: The IRS is not enabled yet and only this boot-time call
        // writes the table.
        unsafe { (*IST.0.get()).fill(0) };

        // Zeroes throughout except LPI_ID_Bits, which is the lowest 5 bits.
        self.write_irs(IRS_IST_CFGR, id_bits);
        // Make the IST valid.
        self.write_irs64(
            IRS_IST_BASER,
            (IST.0.get() as u64 & IRS_IST_BASER_ADDR_MASK) | IRS_IST_BASER_VALID_BIT,
        );
        self.wait_for_idle(IRS_IST_STATUSR, IRS_IST_STATUSR_IDLE_BIT)?;

        // Enable the IRS.
        self.write_irs(IRS_CR0, IRS_CR0_IRSEN_BIT);
        self.wait_for_idle(IRS_CR0, IRS_CR0_IDLE_BIT)
    }

    /// Returns the LPI-encoded interrupt ID of the SGI with sequential
    /// number `index` on the core at `core_pos`.
    pub(crate) fn sgi_num(&self, index: u32, core_pos: usize) -> u32 {
        assert!(index <= IRQ_NUM_SGIS);

        (core_pos as u32 * IRQ_NUM_SGIS + index) | (INT_LPI << INT_TYPE_SHIFT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::test::{FAKE_IRS, reset_fake_state, set_current_core};
    use crate::sysregs::{GicCommand, SYSREGS};
    use crate::tests::host_test_lock;

    fn gicv5() -> GicV5 {
        // SAFETY: The fake frame outlives the test and is not accessed
        // concurrently while the test lock is held.
        unsafe { GicV5::new(FAKE_IRS.base()) }
    }

    #[test]
    fn sgis_are_core_banked_lpis() {
        let _guard = host_test_lock();
        reset_fake_state();
        let gic = gicv5();

        let intid = gic.sgi_num(3, 2);
        assert_eq!(intid, (2 * IRQ_NUM_SGIS + 3) | (INT_LPI << INT_TYPE_SHIFT));
        assert_eq!(int_type(intid), INT_LPI);
        assert!(!gic.is_irq_spi(intid));
        assert!(gic.is_irq_spi(100 | (INT_SPI << INT_TYPE_SHIFT)));
    }

    #[test]
    fn send_sgi_pends_the_target_lpi() {
        let _guard = host_test_lock();
        reset_fake_state();
        let gic = gicv5();

        gic.send_sgi(7, 1);
        let expected = u64::from(gic.sgi_num(7, 1)) | GICCDPEND_PENDING_BIT;
        assert_eq!(SYSREGS.lock().gic_commands[0], GicCommand::Pend(expected));
    }

    #[test]
    fn ppi_priority_read_modify_write() {
        let _guard = host_test_lock();
        reset_fake_state();
        let gic = gicv5();

        // PPI 9 lives in priority register 1, byte 1.
        SYSREGS.lock().icc_ppi_priorityr[1] = 0xffff_ffff_ffff_ffff;
        gic.set_priority(9 | (INT_PPI << INT_TYPE_SHIFT), 0x10);
        assert_eq!(
            SYSREGS.lock().icc_ppi_priorityr[1],
            0xffff_ffff_ffff_10ff
        );

        // Non-PPI priorities go out as a command instead.
        gic.set_priority(5 | (INT_SPI << INT_TYPE_SHIFT), 3);
        let expected =
            u64::from(5 | (INT_SPI << INT_TYPE_SHIFT)) | (3 << GICCDPRI_PRIORITY_SHIFT);
        assert_eq!(
            SYSREGS.lock().gic_commands[0],
            GicCommand::Priority(expected)
        );
    }

    #[test]
    fn ppi_enable_uses_banked_registers() {
        let _guard = host_test_lock();
        reset_fake_state();
        let gic = gicv5();

        gic.intr_enable(14 | (INT_PPI << INT_TYPE_SHIFT));
        assert_eq!(SYSREGS.lock().icc_ppi_enabler[0], 1 << 14);
        gic.intr_disable(14 | (INT_PPI << INT_TYPE_SHIFT));
        assert_eq!(SYSREGS.lock().icc_ppi_enabler[0], 0);

        let spi = 40 | (INT_SPI << INT_TYPE_SHIFT);
        gic.intr_enable(spi);
        gic.intr_disable(spi);
        let commands = SYSREGS.lock().gic_commands.clone();
        assert_eq!(
            &commands[..],
            &[
                GicCommand::Enable(u64::from(spi)),
                GicCommand::Disable(u64::from(spi)),
            ][..]
        );
    }

    #[test]
    fn acknowledge_strips_the_valid_bit() {
        let _guard = host_test_lock();
        reset_fake_state();
        let gic = gicv5();

        let intid = gic.sgi_num(2, 0);
        SYSREGS.lock().next_rcdia = u64::from(intid) | GICRCDIA_VALID_BIT;
        assert_eq!(gic.acknowledge_interrupt(), intid);

        gic.end_of_interrupt(intid);
        let commands = SYSREGS.lock().gic_commands.clone();
        assert_eq!(
            &commands[..],
            &[
                GicCommand::Deactivate(u64::from(intid)),
                GicCommand::EndOfInterrupt,
            ][..]
        );
    }

    #[test]
    fn routing_requires_a_known_iaffid() {
        let _guard = host_test_lock();
        reset_fake_state();
        let gic = gicv5();

        // Core 1 comes up and registers its interrupt affinity.
        set_current_core(1);
        SYSREGS.lock().icc_iaffidr_el1 = 0x17;
        gic.setup_cpuif();
        assert!(SYSREGS.lock().icc_cr0_el1.contains(IccCr0::EN));

        set_current_core(0);
        let spi = 100 | (INT_SPI << INT_TYPE_SHIFT);
        gic.set_intr_route(spi, 1);
        let commands = SYSREGS.lock().gic_commands.clone();
        assert_eq!(
            commands.last(),
            Some(&GicCommand::Route((0x17 << GICCDAFF_IAFFID_SHIFT) | u64::from(spi)))
        );

        // PPIs cannot be rerouted; no command may be issued.
        let before = SYSREGS.lock().gic_commands.len();
        gic.set_intr_route(14 | (INT_PPI << INT_TYPE_SHIFT), 1);
        assert_eq!(SYSREGS.lock().gic_commands.len(), before);
    }

    #[test]
    fn pending_state_via_icsr() {
        let _guard = host_test_lock();
        reset_fake_state();
        let gic = gicv5();

        let spi = 60 | (INT_SPI << INT_TYPE_SHIFT);
        SYSREGS.lock().icc_icsr_el1 = ICC_ICSR_EL1_PENDING_BIT;
        assert!(gic.is_intr_pending(spi));
        assert_eq!(
            SYSREGS.lock().gic_commands[0],
            GicCommand::RequestConfig(u64::from(spi))
        );

        SYSREGS.lock().icc_ppi_spendr[0] = 1 << 9;
        assert!(gic.is_intr_pending(9 | (INT_PPI << INT_TYPE_SHIFT)));
        assert!(!gic.is_intr_pending(10 | (INT_PPI << INT_TYPE_SHIFT)));
    }

    #[test]
    fn ist_setup_programs_the_table_and_bounds_the_poll() {
        let _guard = host_test_lock();
        reset_fake_state();
        let gic = gicv5();

        let id_bits = log2(IST_LEN);
        // Advertise a wide enough LPI ID space.
        // SAFETY: The address points into the fake IRS frame.
        unsafe {
            mmio::write32(
                FAKE_IRS.base() + IRS_IDR2,
                (1 << IRS_IDR2_MIN_LPI_ID_BITS_SHIFT) | 16,
            );
            // The IST status register reports idle straight away.
            mmio::write32(FAKE_IRS.base() + IRS_IST_STATUSR, IRS_IST_STATUSR_IDLE_BIT);
        }

        // The fake IRS never raises CR0.IDLE after the enable write, so the
        // bounded poll must report the failure.
        assert!(matches!(gic.setup(), Err(GicError::IrsTimeout)));

        // The table configuration still went out before the enable.
        // SAFETY: The addresses point into the fake IRS frame.
        unsafe {
            assert_eq!(mmio::read32(FAKE_IRS.base() + IRS_IST_CFGR), id_bits);
            let baser = mmio::read64(FAKE_IRS.base() + IRS_IST_BASER);
            assert_eq!(baser & IRS_IST_BASER_VALID_BIT, IRS_IST_BASER_VALID_BIT);
            assert_eq!(baser & IRS_IST_BASER_ADDR_MASK, IST.0.get() as u64);
            assert_eq!(mmio::read32(FAKE_IRS.base() + IRS_CR0), IRS_CR0_IRSEN_BIT);
        }
    }
}
