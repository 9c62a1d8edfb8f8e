// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Fake implementations of the GIC system register accessors for host tests.
//!
//! Reads and writes operate on the [`SYSREGS`] bank. Write-only interfaces
//! (EOI, SGI generation, GIC system instructions) are recorded so tests can
//! assert on the exact protocol the drivers follow, and the interrupt
//! acknowledge registers return values queued by the test.

use super::{IccCr0, IccSre};
use arrayvec::ArrayVec;
use spin::mutex::SpinMutex;

/// The fake system register bank used by all accessors in this module.
pub static SYSREGS: SpinMutex<SystemRegisters> = SpinMutex::new(SystemRegisters::new());

/// A GICv5 GIC system instruction observed by the fake CPU interface.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GicCommand {
    /// `GIC CDPEND`.
    Pend(u64),
    /// `GIC CDEN`.
    Enable(u64),
    /// `GIC CDDIS`.
    Disable(u64),
    /// `GIC CDPRI`.
    Priority(u64),
    /// `GIC CDAFF`.
    Route(u64),
    /// `GIC CDRCFG`.
    RequestConfig(u64),
    /// `GIC CDDI`.
    Deactivate(u64),
    /// `GIC CDEOI`.
    EndOfInterrupt,
}

/// A set of fake GIC system registers.
#[derive(Clone, Debug)]
pub struct SystemRegisters {
    /// Fake value for the ID_AA64PFR0_EL1 register.
    pub id_aa64pfr0_el1: u64,
    /// Fake value for the ID_AA64PFR2_EL1 register.
    pub id_aa64pfr2_el1: u64,
    /// Fake value for the ICC_SRE_EL1 register.
    pub icc_sre_el1: IccSre,
    /// Fake value for the ICC_PMR_EL1 register.
    pub icc_pmr_el1: u64,
    /// Fake value for the ICC_IGRPEN1_EL1 register.
    pub icc_igrpen1_el1: u64,
    /// Fake value for the ICC_CTLR_EL1 register.
    pub icc_ctlr_el1: u64,
    /// The value the next ICC_IAR1_EL1 read returns.
    pub next_iar1: u64,
    /// Every value written to ICC_EOIR1_EL1, oldest first.
    pub eoir1_writes: ArrayVec<u64, 32>,
    /// Every value written to ICC_SGI1R_EL1, oldest first.
    pub sgi1r_writes: ArrayVec<u64, 32>,
    /// Fake value for the ICC_CR0_EL1 register.
    pub icc_cr0_el1: IccCr0,
    /// Fake value for the ICC_PCR_EL1 register.
    pub icc_pcr_el1: u64,
    /// Fake value for the ICC_IAFFIDR_EL1 register.
    pub icc_iaffidr_el1: u64,
    /// Fake value for the ICC_ICSR_EL1 register.
    pub icc_icsr_el1: u64,
    /// Fake values for the ICC_PPI_ENABLER<n>_EL1 registers.
    pub icc_ppi_enabler: [u64; 2],
    /// Fake values for the ICC_PPI_SPENDR<n>_EL1 registers.
    pub icc_ppi_spendr: [u64; 2],
    /// Fake values for the ICC_PPI_CPENDR<n>_EL1 registers.
    pub icc_ppi_cpendr: [u64; 2],
    /// Fake values for the ICC_PPI_SACTIVER<n>_EL1 registers.
    pub icc_ppi_sactiver: [u64; 2],
    /// Fake values for the ICC_PPI_PRIORITYR<n>_EL1 registers.
    pub icc_ppi_priorityr: [u64; 16],
    /// The value the next `GICR CDIA` returns (valid bit included).
    pub next_rcdia: u64,
    /// Every GIC system instruction issued, oldest first.
    pub gic_commands: ArrayVec<GicCommand, 64>,
}

impl SystemRegisters {
    const fn new() -> Self {
        Self {
            id_aa64pfr0_el1: 0,
            id_aa64pfr2_el1: 0,
            icc_sre_el1: IccSre::empty(),
            icc_pmr_el1: 0,
            icc_igrpen1_el1: 0,
            icc_ctlr_el1: 0,
            next_iar1: crate::gic::GIC_SPURIOUS_INTERRUPT as u64,
            eoir1_writes: ArrayVec::new_const(),
            sgi1r_writes: ArrayVec::new_const(),
            icc_cr0_el1: IccCr0::empty(),
            icc_pcr_el1: 0,
            icc_iaffidr_el1: 0,
            icc_icsr_el1: 0,
            icc_ppi_enabler: [0; 2],
            icc_ppi_spendr: [0; 2],
            icc_ppi_cpendr: [0; 2],
            icc_ppi_sactiver: [0; 2],
            icc_ppi_priorityr: [0; 16],
            next_rcdia: 0,
            gic_commands: ArrayVec::new_const(),
        }
    }

    /// Resets the fake system registers to their initial state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Returns the value of the fake ID_AA64PFR0_EL1 register.
pub fn read_id_aa64pfr0_el1() -> u64 {
    SYSREGS.lock().id_aa64pfr0_el1
}

/// Returns the value of the fake ID_AA64PFR2_EL1 register.
pub fn read_id_aa64pfr2_el1() -> u64 {
    SYSREGS.lock().id_aa64pfr2_el1
}

/// Returns the value of the fake ICC_SRE_EL1 register.
pub fn read_icc_sre_el1() -> IccSre {
    SYSREGS.lock().icc_sre_el1
}

/// Writes `value` to the fake ICC_SRE_EL1 register.
pub fn write_icc_sre_el1(value: IccSre) {
    SYSREGS.lock().icc_sre_el1 = value;
}

/// Returns the value of the fake ICC_PMR_EL1 register.
pub fn read_icc_pmr_el1() -> u64 {
    SYSREGS.lock().icc_pmr_el1
}

/// Writes `value` to the fake ICC_PMR_EL1 register.
pub fn write_icc_pmr_el1(value: u64) {
    SYSREGS.lock().icc_pmr_el1 = value;
}

/// Returns the value of the fake ICC_IGRPEN1_EL1 register.
pub fn read_icc_igrpen1_el1() -> u64 {
    SYSREGS.lock().icc_igrpen1_el1
}

/// Writes `value` to the fake ICC_IGRPEN1_EL1 register.
pub fn write_icc_igrpen1_el1(value: u64) {
    SYSREGS.lock().icc_igrpen1_el1 = value;
}

/// Returns the value of the fake ICC_CTLR_EL1 register.
pub fn read_icc_ctlr_el1() -> u64 {
    SYSREGS.lock().icc_ctlr_el1
}

/// Writes `value` to the fake ICC_CTLR_EL1 register.
pub fn write_icc_ctlr_el1(value: u64) {
    SYSREGS.lock().icc_ctlr_el1 = value;
}

/// Returns the queued fake ICC_IAR1_EL1 value.
pub fn read_icc_iar1_el1() -> u64 {
    SYSREGS.lock().next_iar1
}

/// Records a write to the fake ICC_EOIR1_EL1 register.
pub fn write_icc_eoir1_el1(value: u64) {
    SYSREGS.lock().eoir1_writes.push(value);
}

/// Records a write to the fake ICC_SGI1R_EL1 register.
pub fn write_icc_sgi1r_el1(value: u64) {
    SYSREGS.lock().sgi1r_writes.push(value);
}

/// Returns the value of the fake ICC_CR0_EL1 register.
pub fn read_icc_cr0_el1() -> IccCr0 {
    SYSREGS.lock().icc_cr0_el1
}

/// Writes `value` to the fake ICC_CR0_EL1 register.
pub fn write_icc_cr0_el1(value: IccCr0) {
    SYSREGS.lock().icc_cr0_el1 = value;
}

/// Writes `value` to the fake ICC_PCR_EL1 register.
pub fn write_icc_pcr_el1(value: u64) {
    SYSREGS.lock().icc_pcr_el1 = value;
}

/// Returns the value of the fake ICC_IAFFIDR_EL1 register.
pub fn read_icc_iaffidr_el1() -> u64 {
    SYSREGS.lock().icc_iaffidr_el1
}

/// Returns the value of the fake ICC_ICSR_EL1 register.
pub fn read_icc_icsr_el1() -> u64 {
    SYSREGS.lock().icc_icsr_el1
}

/// Returns the value of the fake ICC_PPI_ENABLER0_EL1 register.
pub fn read_icc_ppi_enabler0() -> u64 {
    SYSREGS.lock().icc_ppi_enabler[0]
}

/// Writes `value` to the fake ICC_PPI_ENABLER0_EL1 register.
pub fn write_icc_ppi_enabler0(value: u64) {
    SYSREGS.lock().icc_ppi_enabler[0] = value;
}

/// Returns the value of the fake ICC_PPI_ENABLER1_EL1 register.
pub fn read_icc_ppi_enabler1() -> u64 {
    SYSREGS.lock().icc_ppi_enabler[1]
}

/// Writes `value` to the fake ICC_PPI_ENABLER1_EL1 register.
pub fn write_icc_ppi_enabler1(value: u64) {
    SYSREGS.lock().icc_ppi_enabler[1] = value;
}

/// Returns the value of the fake ICC_PPI_SPENDR0_EL1 register.
pub fn read_icc_ppi_spendr0() -> u64 {
    SYSREGS.lock().icc_ppi_spendr[0]
}

/// Writes `value` to the fake ICC_PPI_SPENDR0_EL1 register.
pub fn write_icc_ppi_spendr0(value: u64) {
    SYSREGS.lock().icc_ppi_spendr[0] = value;
}

/// Returns the value of the fake ICC_PPI_SPENDR1_EL1 register.
pub fn read_icc_ppi_spendr1() -> u64 {
    SYSREGS.lock().icc_ppi_spendr[1]
}

/// Writes `value` to the fake ICC_PPI_SPENDR1_EL1 register.
pub fn write_icc_ppi_spendr1(value: u64) {
    SYSREGS.lock().icc_ppi_spendr[1] = value;
}

/// Returns the value of the fake ICC_PPI_CPENDR0_EL1 register.
pub fn read_icc_ppi_cpendr0() -> u64 {
    SYSREGS.lock().icc_ppi_cpendr[0]
}

/// Writes `value` to the fake ICC_PPI_CPENDR0_EL1 register.
pub fn write_icc_ppi_cpendr0(value: u64) {
    SYSREGS.lock().icc_ppi_cpendr[0] = value;
}

/// Returns the value of the fake ICC_PPI_CPENDR1_EL1 register.
pub fn read_icc_ppi_cpendr1() -> u64 {
    SYSREGS.lock().icc_ppi_cpendr[1]
}

/// Writes `value` to the fake ICC_PPI_CPENDR1_EL1 register.
pub fn write_icc_ppi_cpendr1(value: u64) {
    SYSREGS.lock().icc_ppi_cpendr[1] = value;
}

/// Returns the value of the fake ICC_PPI_SACTIVER0_EL1 register.
pub fn read_icc_ppi_sactiver0() -> u64 {
    SYSREGS.lock().icc_ppi_sactiver[0]
}

/// Returns the value of the fake ICC_PPI_SACTIVER1_EL1 register.
pub fn read_icc_ppi_sactiver1() -> u64 {
    SYSREGS.lock().icc_ppi_sactiver[1]
}

/// Returns the value of the fake ICC_PPI_PRIORITYR<n>_EL1 register.
pub fn read_icc_ppi_priorityrn(n: usize) -> u64 {
    SYSREGS.lock().icc_ppi_priorityr[n]
}

/// Writes `value` to the fake ICC_PPI_PRIORITYR<n>_EL1 register.
pub fn write_icc_ppi_priorityrn(n: usize, value: u64) {
    SYSREGS.lock().icc_ppi_priorityr[n] = value;
}

/// Records a `GIC CDPEND` instruction.
pub fn giccdpend(value: u64) {
    SYSREGS.lock().gic_commands.push(GicCommand::Pend(value));
}

/// Records a `GIC CDEN` instruction.
pub fn giccden(value: u64) {
    SYSREGS.lock().gic_commands.push(GicCommand::Enable(value));
}

/// Records a `GIC CDDIS` instruction.
pub fn giccddis(value: u64) {
    SYSREGS.lock().gic_commands.push(GicCommand::Disable(value));
}

/// Records a `GIC CDPRI` instruction.
pub fn giccdpri(value: u64) {
    SYSREGS.lock().gic_commands.push(GicCommand::Priority(value));
}

/// Records a `GIC CDAFF` instruction.
pub fn giccdaff(value: u64) {
    SYSREGS.lock().gic_commands.push(GicCommand::Route(value));
}

/// Records a `GIC CDRCFG` instruction.
pub fn giccdrcfg(value: u64) {
    SYSREGS
        .lock()
        .gic_commands
        .push(GicCommand::RequestConfig(value));
}

/// Records a `GIC CDDI` instruction.
pub fn giccddi(value: u64) {
    SYSREGS.lock().gic_commands.push(GicCommand::Deactivate(value));
}

/// Records a `GIC CDEOI` instruction.
pub fn giccdeoi() {
    SYSREGS.lock().gic_commands.push(GicCommand::EndOfInterrupt);
}

/// Returns the queued fake `GICR CDIA` value.
pub fn gicrcdia() -> u64 {
    SYSREGS.lock().next_rcdia
}

/// GSB ACK barrier; a no-op on the fake CPU interface.
pub fn gsb_ack() {}

/// GSB SYS barrier; a no-op on the fake CPU interface.
pub fn gsb_sys() {}

/// Instruction synchronization barrier; a no-op on the fake CPU interface.
pub fn isb() {}

/// Data synchronization barrier; a no-op on the fake CPU interface.
pub fn dsb_ish() {}

/// Data synchronization barrier; a no-op on the fake CPU interface.
pub fn dsb_sy() {}
