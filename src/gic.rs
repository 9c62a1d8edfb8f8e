// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Generation-agnostic interrupt controller interface.
//!
//! A system carries exactly one of GICv2, GICv3 or GICv5, fixed for its
//! lifetime. [`probe`] detects which one before any other interrupt work
//! happens; every operation on [`ArmGic`] then routes to the matching
//! driver. The active generation is a tagged enum rather than a set of
//! flags, so exactly one driver can ever exist.
//!
//! Operations that a generation does not support fail loudly instead of
//! returning a plausible-looking answer.

pub mod common;
pub mod gicv2;
pub mod gicv3;
pub mod gicv5;

use crate::irq::{IRQ_NUM_SGIS, NUM_PPI_SLOTS};
use crate::platform::{Platform, PlatformImpl};
use common::{MIN_PPI_ID, MIN_SPI_ID, is_plat_spi, is_ppi, is_sgi};
use core::fmt;
use gicv2::GicV2;
use gicv3::GicV3;
use gicv5::GicV5;
use log::info;
use spin::Once;

/// The interrupt ID a GICv2/v3 acknowledge returns when no interrupt is
/// actually pending. Acknowledges of this ID must never be EOI-d.
pub const GIC_SPURIOUS_INTERRUPT: u32 = 1023;

/// The interrupt controller generations this crate drives.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum GicVersion {
    /// GICv2: fully memory-mapped.
    V2 = 2,
    /// GICv3: system register CPU interface plus redistributors.
    V3 = 3,
    /// GICv5: system instructions plus an IRS.
    V5 = 5,
}

/// Base addresses of the GIC register frames, as the platform maps them.
#[derive(Clone, Copy, Debug)]
pub struct GicBases {
    /// GICv2 CPU interface frame. Unused by GICv3/v5.
    pub gicc_base: usize,
    /// Distributor frame. The GICv5 IRS rides in this slot, so the init
    /// signature stays the same across generations.
    pub gicd_base: usize,
    /// GICv3 redistributor region. Unused by GICv2/v5.
    pub gicr_base: usize,
}

/// A hardware-completion poll gave up within its iteration budget.
///
/// These are the only recoverable errors the drivers report; everything
/// else is a usage bug and panics.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GicError {
    /// The redistributor kept reporting ChildrenAsleep after a wake request.
    RedistributorWakeTimeout,
    /// GICD_CTLR.RWP stayed set after a control register write.
    PendingWriteTimeout,
    /// The IRS did not reach its idle state.
    IrsTimeout,
}

impl fmt::Display for GicError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let message = match self {
            Self::RedistributorWakeTimeout => "timed out waking the redistributor",
            Self::PendingWriteTimeout => "timed out on a distributor register write",
            Self::IrsTimeout => "timed out waiting for the IRS to go idle",
        };
        f.write_str(message)
    }
}

/// Which handler pool an interrupt ID resolves to, together with its slot
/// index in that pool.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IrqClass {
    /// Per-core SGI slot.
    Sgi(usize),
    /// Per-core PPI slot.
    Ppi(usize),
    /// Shared SPI slot.
    Spi(usize),
    /// The spurious-interrupt singleton.
    Spurious,
}

enum Driver {
    V2(GicV2),
    V3(GicV3),
    V5(GicV5),
}

/// The interrupt controller, bound to the generation detected at probe
/// time.
pub struct ArmGic {
    driver: Driver,
}

impl ArmGic {
    /// Creates the driver for the detected generation over the given
    /// register frames.
    ///
    /// # Safety
    ///
    /// The addresses in `bases` that the generation uses must point at the
    /// corresponding device register frames (or fake frames in tests),
    /// mapped for the program's lifetime and not accessed by anything that
    /// bypasses this driver.
    pub unsafe fn new(version: GicVersion, bases: GicBases) -> Self {
        let driver = match version {
            // SAFETY: The caller vouched for the frames.
            GicVersion::V2 => Driver::V2(unsafe { GicV2::new(bases.gicc_base, bases.gicd_base) }),
            // SAFETY: As above.
            GicVersion::V3 => Driver::V3(unsafe { GicV3::new(bases.gicr_base, bases.gicd_base) }),
            // SAFETY: As above.
            GicVersion::V5 => Driver::V5(unsafe { GicV5::new(bases.gicd_base) }),
        };
        Self { driver }
    }

    /// Returns the generation this instance drives.
    pub fn version(&self) -> GicVersion {
        match &self.driver {
            Driver::V2(_) => GicVersion::V2,
            Driver::V3(_) => GicVersion::V3,
            Driver::V5(_) => GicVersion::V5,
        }
    }

    /// One-time system-wide configuration of the distributor (or IRS).
    pub fn setup_global(&self) -> Result<(), GicError> {
        match &self.driver {
            Driver::V2(gic) => {
                gic.setup_distif();
                Ok(())
            }
            Driver::V3(gic) => gic.setup_distif(),
            Driver::V5(gic) => gic.setup(),
        }
    }

    /// One-time configuration of the calling core's CPU interface. On GICv3
    /// this also discovers the core's redistributor frame.
    pub fn setup_local(&self) -> Result<(), GicError> {
        match &self.driver {
            Driver::V2(gic) => {
                gic.probe_gic_cpu_id();
                gic.setup_cpuif();
                Ok(())
            }
            Driver::V3(gic) => {
                gic.probe_redistif_addr();
                gic.setup_cpuif()
            }
            Driver::V5(gic) => {
                gic.setup_cpuif();
                Ok(())
            }
        }
    }

    /// Enables interrupt delivery to the calling core.
    pub fn enable_interrupts_local(&self) {
        match &self.driver {
            Driver::V2(gic) => gic.enable_cpuif(),
            Driver::V3(gic) => gic.enable_cpuif(),
            Driver::V5(gic) => gic.enable_cpuif(),
        }
    }

    /// Disables interrupt delivery to the calling core.
    pub fn disable_interrupts_local(&self) {
        match &self.driver {
            Driver::V2(gic) => gic.disable_cpuif(),
            Driver::V3(gic) => gic.disable_cpuif(),
            Driver::V5(gic) => gic.disable_cpuif(),
        }
    }

    /// Saves the calling core's CPU interface state ahead of a power-down
    /// that loses context.
    pub fn save_context_local(&self) {
        match &self.driver {
            Driver::V2(gic) => gic.save_cpuif_context(),
            Driver::V3(gic) => gic.save_cpuif_context(),
            Driver::V5(gic) => gic.save_cpuif_context(),
        }
    }

    /// Restores the calling core's CPU interface state on power-up.
    pub fn restore_context_local(&self) {
        match &self.driver {
            Driver::V2(gic) => gic.restore_cpuif_context(),
            Driver::V3(gic) => gic.restore_cpuif_context(),
            Driver::V5(gic) => gic.restore_cpuif_context(),
        }
    }

    /// Saves the SGI/PPI bank state ahead of a system suspend.
    pub fn save_context_global(&self) {
        match &self.driver {
            Driver::V2(gic) => gic.save_sgi_ppi_context(),
            Driver::V3(gic) => gic.save_sgi_ppi_context(),
            Driver::V5(_) => {
                // NOP, done by the firmware layer below.
            }
        }
    }

    /// Restores the distributor and SGI/PPI bank state after a system
    /// suspend.
    pub fn restore_context_global(&self) -> Result<(), GicError> {
        match &self.driver {
            Driver::V2(gic) => {
                gic.setup_distif();
                gic.restore_sgi_ppi_context();
                Ok(())
            }
            Driver::V3(gic) => {
                gic.setup_distif()?;
                gic.restore_sgi_ppi_context();
                Ok(())
            }
            Driver::V5(_) => {
                // NOP, done by the firmware layer below.
                Ok(())
            }
        }
    }

    /// Reads the priority of an interrupt.
    ///
    /// Panics on GICv5: the priority readback path is not ported there, and
    /// fabricating a value would mislead the caller.
    pub fn get_intr_priority(&self, interrupt_id: u32) -> u8 {
        match &self.driver {
            Driver::V2(gic) => gic.get_ipriorityr(interrupt_id),
            Driver::V3(gic) => gic.get_ipriorityr(interrupt_id),
            Driver::V5(_) => panic!("GICv5 priority readback is not supported"),
        }
    }

    /// Sets the priority of an interrupt.
    pub fn set_intr_priority(&self, interrupt_id: u32, priority: u32) {
        match &self.driver {
            Driver::V2(gic) => gic.set_ipriorityr(interrupt_id, priority),
            Driver::V3(gic) => gic.set_ipriorityr(interrupt_id, priority),
            Driver::V5(gic) => gic.set_priority(interrupt_id, priority),
        }
    }

    /// Sends the software-generated interrupt `sgi_id` to the core at
    /// `core_pos`.
    pub fn send_sgi(&self, sgi_id: u32, core_pos: usize) {
        assert!(core_pos < PlatformImpl::CORE_COUNT);
        match &self.driver {
            Driver::V2(gic) => gic.send_sgi(sgi_id, core_pos),
            Driver::V3(gic) => gic.send_sgi(sgi_id, core_pos),
            Driver::V5(gic) => gic.send_sgi(sgi_id, core_pos),
        }
    }

    /// Routes an interrupt to the core at `core_pos`.
    pub fn set_intr_target(&self, interrupt_id: u32, core_pos: usize) {
        assert!(core_pos < PlatformImpl::CORE_COUNT);
        match &self.driver {
            Driver::V2(gic) => gic.set_itargetsr(interrupt_id, core_pos),
            Driver::V3(gic) => gic.set_intr_route(interrupt_id, core_pos),
            Driver::V5(gic) => gic.set_intr_route(interrupt_id, core_pos),
        }
    }

    /// Returns whether an interrupt is enabled.
    ///
    /// Panics on GICv5, where the readback path is not ported.
    pub fn intr_enabled(&self, interrupt_id: u32) -> bool {
        match &self.driver {
            Driver::V2(gic) => gic.get_isenabler(interrupt_id),
            Driver::V3(gic) => gic.get_isenabler(interrupt_id),
            Driver::V5(_) => panic!("GICv5 enable readback is not supported"),
        }
    }

    /// Enables an interrupt.
    pub fn intr_enable(&self, interrupt_id: u32) {
        match &self.driver {
            Driver::V2(gic) => gic.set_isenabler(interrupt_id),
            Driver::V3(gic) => gic.set_isenabler(interrupt_id),
            Driver::V5(gic) => gic.intr_enable(interrupt_id),
        }
    }

    /// Disables an interrupt.
    pub fn intr_disable(&self, interrupt_id: u32) {
        match &self.driver {
            Driver::V2(gic) => gic.set_icenabler(interrupt_id),
            Driver::V3(gic) => gic.set_icenabler(interrupt_id),
            Driver::V5(gic) => gic.intr_disable(interrupt_id),
        }
    }

    /// Returns whether an interrupt is pending.
    pub fn is_intr_pending(&self, interrupt_id: u32) -> bool {
        match &self.driver {
            Driver::V2(gic) => gic.get_ispendr(interrupt_id),
            Driver::V3(gic) => gic.get_ispendr(interrupt_id),
            Driver::V5(gic) => gic.is_intr_pending(interrupt_id),
        }
    }

    /// Clears an interrupt's pending state.
    pub fn intr_clear(&self, interrupt_id: u32) {
        match &self.driver {
            Driver::V2(gic) => gic.set_icpendr(interrupt_id),
            Driver::V3(gic) => gic.set_icpendr(interrupt_id),
            Driver::V5(gic) => gic.intr_clear(interrupt_id),
        }
    }

    /// Acknowledges the highest priority pending interrupt.
    ///
    /// Returns the logical interrupt ID together with the raw acknowledge
    /// value. On GICv2 the raw value carries the source CPU alongside the
    /// ID, and end-of-interrupt must echo it exactly, so both are kept; on
    /// GICv3/v5 they coincide.
    pub fn intr_ack(&self) -> (u32, u32) {
        match &self.driver {
            Driver::V2(gic) => {
                let raw_iar = gic.read_iar();
                (gicv2::intid_from_raw(raw_iar), raw_iar)
            }
            Driver::V3(gic) => {
                let raw_iar = gic.acknowledge_interrupt();
                (raw_iar, raw_iar)
            }
            Driver::V5(gic) => {
                let raw_iar = gic.acknowledge_interrupt();
                (raw_iar, raw_iar)
            }
        }
    }

    /// Signals completion of the interrupt whose acknowledge returned
    /// `raw_iar`.
    pub fn end_of_intr(&self, raw_iar: u32) {
        match &self.driver {
            Driver::V2(gic) => gic.write_eoir(raw_iar),
            Driver::V3(gic) => gic.end_of_interrupt(raw_iar),
            Driver::V5(gic) => gic.end_of_interrupt(raw_iar),
        }
    }

    /// Returns whether the extended SPI range is implemented. Only GICv3
    /// can advertise it.
    pub fn is_espi_supported(&self) -> bool {
        match &self.driver {
            Driver::V3(gic) => gic.is_espi_supported(),
            Driver::V2(_) | Driver::V5(_) => false,
        }
    }

    /// Returns the interrupt ID of the SGI with sequential number `seq_id`
    /// on the core at `core_pos`.
    pub fn sgi_intid(&self, seq_id: u32, core_pos: usize) -> u32 {
        match &self.driver {
            // The SGI index is the INTID.
            Driver::V2(_) | Driver::V3(_) => {
                assert!(is_sgi(seq_id));
                seq_id
            }
            Driver::V5(gic) => gic.sgi_num(seq_id, core_pos),
        }
    }

    /// Returns whether handler registration for `irq_num` crosses cores and
    /// therefore takes the shared lock. True exactly for SPIs.
    pub fn is_irq_shared(&self, irq_num: u32) -> bool {
        match &self.driver {
            Driver::V2(_) | Driver::V3(_) => common::is_spi(irq_num),
            Driver::V5(gic) => gic.is_irq_spi(irq_num),
        }
    }

    /// Resolves an interrupt ID to its handler pool and slot, for the core
    /// at `core_pos`.
    ///
    /// An ID that fits none of the pools is a bug in whatever produced it,
    /// and panics. Interrupt numbers reaching this layer are expected to
    /// have been validated upstream.
    pub fn irq_class(&self, irq_num: u32, core_pos: usize) -> IrqClass {
        if irq_num == GIC_SPURIOUS_INTERRUPT {
            return IrqClass::Spurious;
        }
        match &self.driver {
            Driver::V2(_) | Driver::V3(_) => {
                if is_sgi(irq_num) {
                    IrqClass::Sgi(irq_num as usize)
                } else if is_ppi(irq_num) {
                    IrqClass::Ppi((irq_num - MIN_PPI_ID) as usize)
                } else if is_plat_spi(irq_num, PlatformImpl::MAX_SPI_OFFSET) {
                    IrqClass::Spi((irq_num - MIN_SPI_ID) as usize)
                } else {
                    panic!("IRQ {irq_num} belongs to no handler pool");
                }
            }
            Driver::V5(_) => {
                let id = gicv5::int_id(irq_num) as usize;
                match gicv5::int_type(irq_num) {
                    gicv5::INT_LPI => {
                        // SGIs are LPIs banked per core; only the calling
                        // core's block may be looked up.
                        let first = core_pos * IRQ_NUM_SGIS as usize;
                        assert!(
                            id >= first && id < first + IRQ_NUM_SGIS as usize,
                            "LPI {id} is not an SGI of core {core_pos}"
                        );
                        IrqClass::Sgi(id - first)
                    }
                    gicv5::INT_PPI => {
                        assert!(id < NUM_PPI_SLOTS, "PPI {id} has no handler slot");
                        IrqClass::Ppi(id)
                    }
                    gicv5::INT_SPI => {
                        assert!(
                            id <= PlatformImpl::MAX_SPI_OFFSET,
                            "SPI {id} has no handler slot"
                        );
                        IrqClass::Spi(id)
                    }
                    _ => panic!("IRQ {irq_num:#x} belongs to no handler pool"),
                }
            }
        }
    }
}

static VERSION: Once<GicVersion> = Once::new();
static GIC: Once<ArmGic> = Once::new();

/// Detects the interrupt controller generation from the CPU's feature and
/// mode registers: GICv3 if the system register interface is present and
/// enabled, otherwise GICv5 if its CPU interface is architected, otherwise
/// GICv2.
fn detect_version() -> GicVersion {
    if common::is_gicv3_mode() {
        GicVersion::V3
    } else if gicv5::is_gicv5_mode() {
        GicVersion::V5
    } else {
        GicVersion::V2
    }
}

/// Detects the interrupt controller generation. Must run on the boot core
/// before any other operation in this module.
pub fn probe() {
    VERSION.call_once(|| {
        let version = detect_version();
        info!("GICv{} mode detected", version as u32);
        version
    });
}

/// Returns the probed generation as 2, 3 or 5.
///
/// Panics if called before [`probe`].
pub fn version() -> GicVersion {
    *VERSION.get().expect("GIC generation queried before probe")
}

/// Creates the system's GIC driver over the platform's register frames.
/// Must run after [`probe`]; later calls are ignored.
///
/// # Safety
///
/// Same frame requirements as [`ArmGic::new`].
pub unsafe fn init(bases: GicBases) {
    // SAFETY: The caller vouched for the frames.
    GIC.call_once(|| unsafe { ArmGic::new(version(), bases) });
}

/// Returns the system's GIC driver.
///
/// Panics if called before [`init`].
pub fn get() -> &'static ArmGic {
    GIC.get().expect("GIC used before init")
}

/// Configures the distributor (or IRS). Boot glue has no degraded mode to
/// fall back to, so a hardware timeout is fatal here.
pub fn setup_global() {
    if let Err(error) = get().setup_global() {
        panic!("GIC global setup failed: {error}");
    }
}

/// Configures the calling core's CPU interface.
pub fn setup_local() {
    if let Err(error) = get().setup_local() {
        panic!("GIC local setup failed: {error}");
    }
}

/// Enables interrupt delivery to the calling core.
pub fn enable_interrupts_local() {
    get().enable_interrupts_local();
}

/// Disables interrupt delivery to the calling core.
pub fn disable_interrupts_local() {
    get().disable_interrupts_local();
}

/// Saves the calling core's CPU interface state; power management calls
/// this ahead of a context-losing power-down.
pub fn save_context_local() {
    get().save_context_local();
}

/// Restores the calling core's CPU interface state on power-up.
pub fn restore_context_local() {
    get().restore_context_local();
}

/// Saves the SGI/PPI bank state ahead of a system suspend.
pub fn save_context_global() {
    get().save_context_global();
}

/// Restores distributor and SGI/PPI bank state after a system suspend.
pub fn restore_context_global() {
    if let Err(error) = get().restore_context_global() {
        panic!("GIC context restore failed: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::test::{FAKE_GICC, FAKE_GICD, FAKE_IRS, TestPlatform, reset_fake_state};
    use crate::sysregs::{IccCr0, IccSre, SYSREGS};
    use crate::tests::host_test_lock;

    fn fake_bases() -> GicBases {
        TestPlatform::gic_bases()
    }

    fn fake_irs_bases() -> GicBases {
        GicBases {
            gicd_base: FAKE_IRS.base(),
            ..TestPlatform::gic_bases()
        }
    }

    fn make(version: GicVersion) -> ArmGic {
        let bases = match version {
            GicVersion::V5 => fake_irs_bases(),
            _ => fake_bases(),
        };
        // SAFETY: The fake frames outlive the test and are only touched
        // under the test lock.
        unsafe { ArmGic::new(version, bases) }
    }

    fn read_fake(base: usize, offset: usize) -> u32 {
        // SAFETY: The address points into a fake frame.
        unsafe { crate::mmio::read32(base + offset) }
    }

    #[test]
    fn probe_detects_gicv3_when_sre_is_enabled() {
        let _guard = host_test_lock();
        reset_fake_state();
        {
            let mut sysregs = SYSREGS.lock();
            sysregs.id_aa64pfr0_el1 = 1 << 24;
            sysregs.icc_sre_el1 = IccSre::SRE;
        }
        assert_eq!(detect_version(), GicVersion::V3);

        // The feature bit alone is not enough; SRE must actually be on.
        SYSREGS.lock().icc_sre_el1 = IccSre::empty();
        assert_eq!(detect_version(), GicVersion::V2);
    }

    #[test]
    fn probe_falls_back_to_gicv5_then_gicv2() {
        let _guard = host_test_lock();
        reset_fake_state();
        SYSREGS.lock().id_aa64pfr2_el1 = 1 << 56;
        assert_eq!(detect_version(), GicVersion::V5);

        SYSREGS.lock().id_aa64pfr2_el1 = 0;
        assert_eq!(detect_version(), GicVersion::V2);
    }

    #[test]
    fn local_enable_touches_only_the_active_generation() {
        let _guard = host_test_lock();

        reset_fake_state();
        make(GicVersion::V2).enable_interrupts_local();
        assert_eq!(read_fake(FAKE_GICC.base(), 0x0), 1);
        assert_eq!(SYSREGS.lock().icc_igrpen1_el1, 0);
        assert!(SYSREGS.lock().gic_commands.is_empty());

        reset_fake_state();
        make(GicVersion::V3).enable_interrupts_local();
        assert_eq!(read_fake(FAKE_GICC.base(), 0x0), 0);
        assert_eq!(SYSREGS.lock().icc_igrpen1_el1, 1);

        reset_fake_state();
        make(GicVersion::V5).enable_interrupts_local();
        assert_eq!(read_fake(FAKE_GICC.base(), 0x0), 0);
        assert_eq!(SYSREGS.lock().icc_igrpen1_el1, 0);
        assert!(SYSREGS.lock().icc_cr0_el1.contains(IccCr0::EN));
    }

    #[test]
    fn versions_report_their_number() {
        let _guard = host_test_lock();
        reset_fake_state();
        assert_eq!(make(GicVersion::V2).version() as u32, 2);
        assert_eq!(make(GicVersion::V3).version() as u32, 3);
        assert_eq!(make(GicVersion::V5).version() as u32, 5);
    }

    #[test]
    fn espi_is_a_gicv3_only_capability() {
        let _guard = host_test_lock();
        reset_fake_state();
        // Pretend the distributor advertises ESPI; only v3 may believe it.
        // SAFETY: The address points into the fake distributor frame.
        unsafe { crate::mmio::write32(FAKE_GICD.base() + 0x4, 1 << 8) };
        assert!(make(GicVersion::V3).is_espi_supported());
        assert!(!make(GicVersion::V2).is_espi_supported());
        assert!(!make(GicVersion::V5).is_espi_supported());
    }

    #[test]
    #[should_panic(expected = "priority readback")]
    fn gicv5_priority_readback_fails_loudly() {
        let gic = {
            let _guard = host_test_lock();
            reset_fake_state();
            make(GicVersion::V5)
        };
        gic.get_intr_priority(5);
    }

    #[test]
    fn gicv2_raw_acknowledge_round_trips_through_eoi() {
        let _guard = host_test_lock();
        reset_fake_state();
        let gic = make(GicVersion::V2);

        let raw = (3 << 10) | 12;
        // SAFETY: The address points into the fake CPU interface frame.
        unsafe { crate::mmio::write32(FAKE_GICC.base() + 0xc, raw) };

        let (irq_num, raw_iar) = gic.intr_ack();
        assert_eq!(irq_num, 12);
        assert_eq!(raw_iar, raw);

        gic.end_of_intr(raw_iar);
        assert_eq!(read_fake(FAKE_GICC.base(), 0x10), raw);
    }

    #[test]
    fn irq_class_partitions_the_valid_range() {
        let _guard = host_test_lock();
        reset_fake_state();
        let gic = make(GicVersion::V3);

        let max = MIN_SPI_ID + TestPlatform::MAX_SPI_OFFSET as u32;
        for irq_num in 0..=max {
            let expected = if irq_num < 16 {
                IrqClass::Sgi(irq_num as usize)
            } else if irq_num < 32 {
                IrqClass::Ppi((irq_num - 16) as usize)
            } else {
                IrqClass::Spi((irq_num - 32) as usize)
            };
            assert_eq!(gic.irq_class(irq_num, 0), expected);
        }
        assert_eq!(
            gic.irq_class(GIC_SPURIOUS_INTERRUPT, 0),
            IrqClass::Spurious
        );
    }

    #[test]
    #[should_panic(expected = "no handler pool")]
    fn out_of_range_ids_are_rejected() {
        let gic = {
            let _guard = host_test_lock();
            reset_fake_state();
            make(GicVersion::V3)
        };
        let beyond = MIN_SPI_ID + TestPlatform::MAX_SPI_OFFSET as u32 + 1;
        gic.irq_class(beyond, 0);
    }

    #[test]
    fn gicv5_classes_respect_the_core_bank() {
        let _guard = host_test_lock();
        reset_fake_state();
        let gic = make(GicVersion::V5);

        let sgi = gic.sgi_intid(3, 2);
        assert_eq!(gic.irq_class(sgi, 2), IrqClass::Sgi(3));

        let ppi = 14 | (gicv5::INT_PPI << gicv5::INT_TYPE_SHIFT);
        assert_eq!(gic.irq_class(ppi, 0), IrqClass::Ppi(14));

        let spi = 40 | (gicv5::INT_SPI << gicv5::INT_TYPE_SHIFT);
        assert_eq!(gic.irq_class(spi, 0), IrqClass::Spi(40));
    }

    #[test]
    fn sgi_intid_is_identity_below_gicv5() {
        let _guard = host_test_lock();
        reset_fake_state();
        assert_eq!(make(GicVersion::V3).sgi_intid(5, 3), 5);
        assert_eq!(make(GicVersion::V2).sgi_intid(5, 3), 5);
    }

    #[test]
    fn redistributor_region_is_shared_with_the_v3_driver() {
        let _guard = host_test_lock();
        reset_fake_state();
        let gic = make(GicVersion::V3);
        // Local setup discovers the frame and wakes it without error.
        gic.setup_local().unwrap();
        assert!(SYSREGS.lock().icc_sre_el1.contains(IccSre::SRE));
        assert_eq!(SYSREGS.lock().icc_pmr_el1, 0xff);
        assert_eq!(SYSREGS.lock().icc_igrpen1_el1, 1);
    }
}
