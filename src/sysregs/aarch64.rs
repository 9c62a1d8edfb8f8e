// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! AArch64 implementations of the GIC system register accessors.

use super::{IccCr0, IccSre};
use core::arch::asm;

macro_rules! read_sysreg {
    ($function_name:ident, $asm_sysreg:literal) => {
        #[doc = concat!("Returns the value of the `", $asm_sysreg, "` system register.")]
        #[inline(always)]
        pub fn $function_name() -> u64 {
            let value;
            // SAFETY: Reading this system register has no side effects.
            unsafe {
                asm!(
                    concat!("mrs {value}, ", $asm_sysreg),
                    options(nomem, nostack),
                    value = out(reg) value,
                );
            }
            value
        }
    };
}

macro_rules! write_sysreg {
    ($function_name:ident, $asm_sysreg:literal) => {
        #[doc = concat!("Writes `value` to the `", $asm_sysreg, "` system register.")]
        #[inline(always)]
        pub fn $function_name(value: u64) {
            // SAFETY: This register is only written by the GIC drivers in this
            // crate, which own the CPU interface configuration.
            unsafe {
                asm!(
                    concat!("msr ", $asm_sysreg, ", {value}"),
                    options(nomem, nostack),
                    value = in(reg) value,
                );
            }
        }
    };
}

/// Emits a GICv5 current-domain system instruction taking one operand.
macro_rules! gic_sys_insn {
    ($function_name:ident, $insn:literal, $doc_action:literal) => {
        #[doc = concat!("Issues `", $insn, "`: ", $doc_action, ".")]
        #[inline(always)]
        pub fn $function_name(value: u64) {
            // SAFETY: GIC system instructions only affect interrupt controller
            // state, which the GICv5 driver owns.
            unsafe {
                asm!(
                    concat!($insn, ", {value}"),
                    options(nomem, nostack),
                    value = in(reg) value,
                );
            }
        }
    };
}

read_sysreg!(read_id_aa64pfr0_el1, "id_aa64pfr0_el1");
read_sysreg!(read_id_aa64pfr2_el1, "id_aa64pfr2_el1");

/// Returns the value of the `icc_sre_el1` system register.
#[inline(always)]
pub fn read_icc_sre_el1() -> IccSre {
    let value;
    // SAFETY: Reading ICC_SRE_EL1 has no side effects. The caller has checked
    // that the system register interface is architected.
    unsafe {
        asm!("mrs {value}, icc_sre_el1", options(nomem, nostack), value = out(reg) value);
    }
    IccSre::from_bits_retain(value)
}

/// Writes `value` to the `icc_sre_el1` system register.
#[inline(always)]
pub fn write_icc_sre_el1(value: IccSre) {
    // SAFETY: The GICv3 driver owns the CPU interface configuration.
    unsafe {
        asm!(
            "msr icc_sre_el1, {value}",
            options(nomem, nostack),
            value = in(reg) value.bits(),
        );
    }
}

read_sysreg!(read_icc_pmr_el1, "icc_pmr_el1");
write_sysreg!(write_icc_pmr_el1, "icc_pmr_el1");
read_sysreg!(read_icc_igrpen1_el1, "icc_igrpen1_el1");
write_sysreg!(write_icc_igrpen1_el1, "icc_igrpen1_el1");
read_sysreg!(read_icc_ctlr_el1, "icc_ctlr_el1");
write_sysreg!(write_icc_ctlr_el1, "icc_ctlr_el1");
read_sysreg!(read_icc_iar1_el1, "icc_iar1_el1");
write_sysreg!(write_icc_eoir1_el1, "icc_eoir1_el1");
write_sysreg!(write_icc_sgi1r_el1, "icc_sgi1r_el1");

/// Returns the value of the `icc_cr0_el1` system register.
#[inline(always)]
pub fn read_icc_cr0_el1() -> IccCr0 {
    let value;
    // SAFETY: Reading ICC_CR0_EL1 has no side effects.
    unsafe {
        asm!("mrs {value}, icc_cr0_el1", options(nomem, nostack), value = out(reg) value);
    }
    IccCr0::from_bits_retain(value)
}

/// Writes `value` to the `icc_cr0_el1` system register.
#[inline(always)]
pub fn write_icc_cr0_el1(value: IccCr0) {
    // SAFETY: The GICv5 driver owns the CPU interface configuration.
    unsafe {
        asm!(
            "msr icc_cr0_el1, {value}",
            options(nomem, nostack),
            value = in(reg) value.bits(),
        );
    }
}

write_sysreg!(write_icc_pcr_el1, "icc_pcr_el1");
read_sysreg!(read_icc_iaffidr_el1, "icc_iaffidr_el1");
read_sysreg!(read_icc_icsr_el1, "icc_icsr_el1");
read_sysreg!(read_icc_ppi_enabler0, "icc_ppi_enabler0_el1");
write_sysreg!(write_icc_ppi_enabler0, "icc_ppi_enabler0_el1");
read_sysreg!(read_icc_ppi_enabler1, "icc_ppi_enabler1_el1");
write_sysreg!(write_icc_ppi_enabler1, "icc_ppi_enabler1_el1");
read_sysreg!(read_icc_ppi_spendr0, "icc_ppi_spendr0_el1");
write_sysreg!(write_icc_ppi_spendr0, "icc_ppi_spendr0_el1");
read_sysreg!(read_icc_ppi_spendr1, "icc_ppi_spendr1_el1");
write_sysreg!(write_icc_ppi_spendr1, "icc_ppi_spendr1_el1");
read_sysreg!(read_icc_ppi_cpendr0, "icc_ppi_cpendr0_el1");
write_sysreg!(write_icc_ppi_cpendr0, "icc_ppi_cpendr0_el1");
read_sysreg!(read_icc_ppi_cpendr1, "icc_ppi_cpendr1_el1");
write_sysreg!(write_icc_ppi_cpendr1, "icc_ppi_cpendr1_el1");
read_sysreg!(read_icc_ppi_sactiver0, "icc_ppi_sactiver0_el1");
read_sysreg!(read_icc_ppi_sactiver1, "icc_ppi_sactiver1_el1");

macro_rules! ppi_priorityr_arm {
    ($n:expr, $value:ident, read, $($idx:literal),*) => {
        match $n {
            $(
                // SAFETY: Reading a PPI priority register has no side effects.
                $idx => unsafe {
                    asm!(
                        concat!("mrs {value}, icc_ppi_priorityr", $idx, "_el1"),
                        options(nomem, nostack),
                        value = out(reg) $value,
                    );
                },
            )*
            _ => panic!("PPI priority register index out of range"),
        }
    };
    ($n:expr, $value:ident, write, $($idx:literal),*) => {
        match $n {
            $(
                // SAFETY: The GICv5 driver owns the PPI priority configuration.
                $idx => unsafe {
                    asm!(
                        concat!("msr icc_ppi_priorityr", $idx, "_el1, {value}"),
                        options(nomem, nostack),
                        value = in(reg) $value,
                    );
                },
            )*
            _ => panic!("PPI priority register index out of range"),
        }
    };
}

/// Returns the value of the `icc_ppi_priorityr<n>_el1` system register.
pub fn read_icc_ppi_priorityrn(n: usize) -> u64 {
    let value;
    ppi_priorityr_arm!(n, value, read, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15);
    value
}

/// Writes `value` to the `icc_ppi_priorityr<n>_el1` system register.
pub fn write_icc_ppi_priorityrn(n: usize, value: u64) {
    ppi_priorityr_arm!(n, value, write, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15);
}

gic_sys_insn!(giccdpend, "gic cdpend", "set or clear an interrupt's pending state");
gic_sys_insn!(giccden, "gic cden", "enable an interrupt");
gic_sys_insn!(giccddis, "gic cddis", "disable an interrupt");
gic_sys_insn!(giccdpri, "gic cdpri", "set an interrupt's priority");
gic_sys_insn!(giccdaff, "gic cdaff", "route an interrupt to an interrupt affinity");
gic_sys_insn!(giccdrcfg, "gic cdrcfg", "request an interrupt's configuration into ICC_ICSR_EL1");
gic_sys_insn!(giccddi, "gic cddi", "deactivate an interrupt");

/// Issues `gic cdeoi`: signals the end of the running priority.
#[inline(always)]
pub fn giccdeoi() {
    // SAFETY: Signalling end-of-interrupt only affects interrupt controller
    // state, which the GICv5 driver owns.
    unsafe {
        asm!("gic cdeoi, xzr", options(nomem, nostack));
    }
}

/// Issues `gicr cdia`: acknowledges the highest priority pending interrupt
/// and returns its ID together with the valid bit.
#[inline(always)]
pub fn gicrcdia() -> u64 {
    let value;
    // SAFETY: Acknowledging an interrupt only affects interrupt controller
    // state, which the GICv5 driver owns.
    unsafe {
        asm!("gicr {value}, cdia", options(nomem, nostack), value = out(reg) value);
    }
    value
}

/// GSB ACK barrier: orders a preceding interrupt acknowledge against
/// subsequent instructions.
#[inline(always)]
pub fn gsb_ack() {
    // SAFETY: Barriers have no software-visible side effects beyond ordering.
    unsafe { asm!("gsb ack", options(nomem, nostack)) }
}

/// GSB SYS barrier: waits for preceding GIC system instructions to reach
/// their completion point.
#[inline(always)]
pub fn gsb_sys() {
    // SAFETY: Barriers have no software-visible side effects beyond ordering.
    unsafe { asm!("gsb sys", options(nomem, nostack)) }
}

/// Instruction synchronization barrier.
#[inline(always)]
pub fn isb() {
    // SAFETY: Barriers have no software-visible side effects beyond ordering.
    unsafe { asm!("isb", options(nomem, nostack)) }
}

/// Data synchronization barrier, inner shareable domain.
#[inline(always)]
pub fn dsb_ish() {
    // SAFETY: Barriers have no software-visible side effects beyond ordering.
    unsafe { asm!("dsb ish", options(nomem, nostack)) }
}

/// Data synchronization barrier, full system.
#[inline(always)]
pub fn dsb_sy() {
    // SAFETY: Barriers have no software-visible side effects beyond ordering.
    unsafe { asm!("dsb sy", options(nomem, nostack)) }
}
