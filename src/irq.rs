// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! IRQ handler registry and dispatcher.
//!
//! Test code installs a handler for an interrupt ID, triggers the condition
//! that raises it, and the exception vector hands the trap to
//! [`handler_dispatcher`]. Handlers live in three pools: one global table
//! for SPIs, and per-core banks for SGIs and PPIs, plus a singleton slot
//! for the spurious ID.

use crate::gic::common::{MAX_PPI_ID, MAX_SGI_ID, MIN_PPI_ID};
use crate::gic::{self, ArmGic, GIC_SPURIOUS_INTERRUPT, IrqClass};
use crate::platform::{self, CoresImpl, Platform, PlatformImpl, exception_free};
use crate::sysregs::dsb_ish;
use core::cell::RefCell;
use core::fmt;
use core::mem::align_of;
use log::{info, trace};
use percore::{Cores, ExceptionLock};
use spin::mutex::SpinMutex;

/// Non-secure software generated interrupt ID 0.
pub const IRQ_NS_SGI_0: u32 = 0;
/// Non-secure software generated interrupt ID 1.
pub const IRQ_NS_SGI_1: u32 = 1;
/// Non-secure software generated interrupt ID 2.
pub const IRQ_NS_SGI_2: u32 = 2;
/// Non-secure software generated interrupt ID 3.
pub const IRQ_NS_SGI_3: u32 = 3;
/// Non-secure software generated interrupt ID 4.
pub const IRQ_NS_SGI_4: u32 = 4;
/// Non-secure software generated interrupt ID 5.
pub const IRQ_NS_SGI_5: u32 = 5;
/// Non-secure software generated interrupt ID 6.
pub const IRQ_NS_SGI_6: u32 = 6;
/// Non-secure software generated interrupt ID 7.
pub const IRQ_NS_SGI_7: u32 = 7;
/// SGI sent by the timer management framework to notify CPUs when the
/// system timer fires off.
pub const IRQ_WAKE_SGI: u32 = IRQ_NS_SGI_7;
/// Number of SGI sequence numbers the framework hands out.
pub const IRQ_NUM_SGIS: u32 = IRQ_NS_SGI_7 + 1;

pub(crate) const NUM_SGI_SLOTS: usize = (MAX_SGI_ID + 1) as usize;
pub(crate) const NUM_PPI_SLOTS: usize = (MAX_PPI_ID + 1 - MIN_PPI_ID) as usize;
const NUM_SPI_SLOTS: usize = PlatformImpl::MAX_SPI_OFFSET + 1;

/// An interrupt handler. Receives the acknowledged interrupt ID; its return
/// value becomes the dispatcher's return value.
pub type IrqHandler = fn(irq_num: u32) -> i32;

/// Handler registration misuse, reported to the caller rather than handled
/// here; duplicate registration is a programming error in the test code.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IrqError {
    /// `register_handler` found the slot already occupied.
    HandlerAlreadyRegistered,
    /// `unregister_handler` found the slot empty.
    NoHandlerRegistered,
}

impl fmt::Display for IrqError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let message = match self {
            Self::HandlerAlreadyRegistered => "a handler is already registered for this IRQ",
            Self::NoHandlerRegistered => "no handler is registered for this IRQ",
        };
        f.write_str(message)
    }
}

/// For a given SPI, the associated IRQ handler is common to all CPUs, so
/// updates need a lock.
///
/// One lock covers all SPIs. Updating two different SPIs' handlers at the
/// same time serializes needlessly, but a single lock saves the memory of
/// one per interrupt, and handler updates are rare. The spurious singleton
/// shares the lock: it is equally global, and giving it its own lock would
/// buy nothing.
struct SharedHandlers {
    spi: [Option<IrqHandler>; NUM_SPI_SLOTS],
    spurious: Option<IrqHandler>,
}

static SHARED_HANDLERS: ExceptionLock<SpinMutex<SharedHandlers>> =
    ExceptionLock::new(SpinMutex::new(SharedHandlers {
        spi: [None; NUM_SPI_SLOTS],
        spurious: None,
    }));

/// PPIs and SGIs are banked in the GIC per CPU interface, so each core gets
/// its own handler slots and mutates nothing but its own bank; no lock is
/// involved.
///
/// The bank is aligned to the cache line size so that concurrent
/// registration on different cores never false-shares a line.
#[repr(align(64))]
struct PrivateHandlers {
    sgi: [Option<IrqHandler>; NUM_SGI_SLOTS],
    ppi: [Option<IrqHandler>; NUM_PPI_SLOTS],
}

impl PrivateHandlers {
    const EMPTY: Self = Self {
        sgi: [None; NUM_SGI_SLOTS],
        ppi: [None; NUM_PPI_SLOTS],
    };
}

const _: () = assert!(align_of::<PrivateHandlers>() >= PlatformImpl::CACHE_WRITEBACK_GRANULE);

/// Row `n` belongs to core `n`: only that core reads or writes it, except
/// for the bulk clear in [`setup`], which runs before secondary cores take
/// interrupts.
static PRIVATE_HANDLERS: [ExceptionLock<RefCell<PrivateHandlers>>; PlatformImpl::CORE_COUNT] =
    [const { ExceptionLock::new(RefCell::new(PrivateHandlers::EMPTY)) };
        PlatformImpl::CORE_COUNT];

/// Runs `f` on the handler slot for `class`, using `core_pos`'s bank for
/// the private classes. Takes the shared lock only for the global pools.
fn with_slot<R>(
    class: IrqClass,
    core_pos: usize,
    f: impl FnOnce(&mut Option<IrqHandler>) -> R,
) -> R {
    exception_free(|token| match class {
        IrqClass::Spi(index) => f(&mut SHARED_HANDLERS.borrow(token).lock().spi[index]),
        IrqClass::Spurious => f(&mut SHARED_HANDLERS.borrow(token).lock().spurious),
        IrqClass::Sgi(index) => {
            f(&mut PRIVATE_HANDLERS[core_pos].borrow_mut(token).sgi[index])
        }
        IrqClass::Ppi(index) => {
            f(&mut PRIVATE_HANDLERS[core_pos].borrow_mut(token).ppi[index])
        }
    })
}

/// Resets every handler pool to empty. Must run once at boot before any
/// registration or dispatch; rerunning it later is only safe while no
/// interrupts are in flight, as it is a bulk clear.
pub fn setup() {
    exception_free(|token| {
        let mut shared = SHARED_HANDLERS.borrow(token).lock();
        shared.spi = [None; NUM_SPI_SLOTS];
        shared.spurious = None;
    });
    for bank in &PRIVATE_HANDLERS {
        exception_free(|token| {
            *bank.borrow_mut(token) = PrivateHandlers::EMPTY;
        });
    }
}

/// Updates the handler slot for `irq_num` on the calling core, provided the
/// slot currently holds a handler (`expect_handler`) or not.
fn update_handler(
    gic: &ArmGic,
    irq_num: u32,
    handler: Option<IrqHandler>,
    expect_handler: bool,
) -> Result<(), IrqError> {
    let core_pos = CoresImpl::core_index();
    let class = gic.irq_class(irq_num, core_pos);

    with_slot(class, core_pos, |slot| {
        // Two independent gates, per the original contract: the assertion
        // catches harness bugs immediately on target debug builds, while the
        // status return is the stable interface that release builds and the
        // host tests rely on.
        if cfg!(not(test)) {
            debug_assert!(
                slot.is_some() == expect_handler,
                "IRQ #{irq_num} handler slot in unexpected state"
            );
        }
        if slot.is_some() == expect_handler {
            *slot = handler;
            Ok(())
        } else if expect_handler {
            Err(IrqError::NoHandlerRegistered)
        } else {
            Err(IrqError::HandlerAlreadyRegistered)
        }
    })
}

/// Registers `irq_handler` for `irq_num` on the calling core.
///
/// Fails if a handler is already registered for the same interrupt.
pub fn register_handler(irq_num: u32, irq_handler: IrqHandler) -> Result<(), IrqError> {
    let result = update_handler(gic::get(), irq_num, Some(irq_handler), false);
    if result.is_ok() {
        info!(
            "Registered IRQ handler {:#x} for IRQ #{irq_num}",
            irq_handler as usize
        );
    }
    result
}

/// Registers `irq_handler` for the calling core's SGI with sequential
/// number `sgi_id`.
pub fn register_handler_sgi(sgi_id: u32, irq_handler: IrqHandler) -> Result<(), IrqError> {
    register_handler(my_sgi_intid(sgi_id), irq_handler)
}

/// Unregisters the handler for `irq_num` on the calling core.
///
/// Fails if no handler is registered for that interrupt.
pub fn unregister_handler(irq_num: u32) -> Result<(), IrqError> {
    let result = update_handler(gic::get(), irq_num, None, true);
    if result.is_ok() {
        info!("Unregistered IRQ handler for IRQ #{irq_num}");
    }
    result
}

/// Unregisters the handler for the calling core's SGI with sequential
/// number `sgi_id`.
pub fn unregister_handler_sgi(sgi_id: u32) -> Result<(), IrqError> {
    unregister_handler(my_sgi_intid(sgi_id))
}

/// Returns the interrupt ID of the calling core's SGI with sequential
/// number `sgi_id`.
pub fn my_sgi_intid(sgi_id: u32) -> u32 {
    gic::get().sgi_intid(sgi_id, CoresImpl::core_index())
}

/// Sends the software-generated interrupt `sgi_id` to the core at
/// `core_pos`.
pub fn send_sgi(sgi_id: u32, core_pos: usize) {
    // Ensure that all memory accesses prior to sending the SGI have
    // completed, so the target core observes them on waking.
    dsb_ish();

    // Waking a core that has been switched off through PSCI CPU_OFF puts it
    // in an erroneous state; confirming the target is online is the
    // sender's responsibility, tracked through the power management hooks.
    debug_assert!(platform::is_core_pos_online(core_pos));
    gic::get().send_sgi(sgi_id, core_pos);
}

/// Routes `irq_num` to the calling core, sets its priority and enables it.
pub fn enable(irq_num: u32, irq_priority: u8) {
    let gic = gic::get();
    gic.set_intr_target(irq_num, CoresImpl::core_index());
    gic.set_intr_priority(irq_num, u32::from(irq_priority));
    gic.intr_enable(irq_num);

    trace!("Enabled IRQ #{irq_num}");
}

/// Enables the calling core's SGI with sequential number `sgi_id`.
pub fn enable_sgi(sgi_id: u32, irq_priority: u8) {
    enable(my_sgi_intid(sgi_id), irq_priority);
}

/// Disables `irq_num`.
pub fn disable(irq_num: u32) {
    gic::get().intr_disable(irq_num);

    trace!("Disabled IRQ #{irq_num}");
}

/// Disables the calling core's SGI with sequential number `sgi_id`.
pub fn disable_sgi(sgi_id: u32) {
    disable(my_sgi_intid(sgi_id));
}

/// Generic handler called by the exception vector upon reception of an IRQ.
///
/// Acknowledges the interrupt, calls the registered handler if there is
/// one, then marks the processing of the interrupt as complete. An
/// unhandled interrupt is not an error at this layer; the dispatcher simply
/// returns 0.
pub fn handler_dispatcher() -> i32 {
    dispatch(gic::get())
}

fn dispatch(gic: &ArmGic) -> i32 {
    // Acknowledge the interrupt.
    let (irq_num, raw_iar) = gic.intr_ack();

    let core_pos = CoresImpl::core_index();
    let handler = with_slot(gic.irq_class(irq_num, core_pos), core_pos, |slot| *slot);

    let rc = match handler {
        Some(handler) => handler(irq_num),
        None => 0,
    };

    // Mark the processing of the interrupt as complete. A spurious
    // acknowledge must not be EOI-d.
    if irq_num != GIC_SPURIOUS_INTERRUPT {
        gic.end_of_intr(raw_iar);
    }

    rc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gic::{GicBases, GicVersion};
    use crate::platform::test::{FAKE_GICD, TestPlatform, reset_fake_state, set_current_core};
    use crate::sysregs::{IccSre, SYSREGS};
    use crate::tests::host_test_lock;
    use std::sync::atomic::{AtomicU32, Ordering};

    static LAST_HANDLED: AtomicU32 = AtomicU32::new(u32::MAX);

    fn handler_42(irq_num: u32) -> i32 {
        LAST_HANDLED.store(irq_num, Ordering::SeqCst);
        42
    }

    fn handler_7(irq_num: u32) -> i32 {
        LAST_HANDLED.store(irq_num, Ordering::SeqCst);
        7
    }

    fn local_gicv3() -> ArmGic {
        // SAFETY: The fake frames outlive the test and are only touched
        // under the test lock.
        unsafe { ArmGic::new(GicVersion::V3, TestPlatform::gic_bases()) }
    }

    /// Drives the whole public surface through the global facade exactly
    /// once per process: probe, init, setup, registration, dispatch.
    #[test]
    fn boot_register_dispatch_end_to_end() {
        let _guard = host_test_lock();
        reset_fake_state();

        // A GICv3-capable environment: feature present and SRE enabled.
        {
            let mut sysregs = SYSREGS.lock();
            sysregs.id_aa64pfr0_el1 = 1 << 24;
            sysregs.icc_sre_el1 = IccSre::SRE;
        }
        gic::probe();
        assert_eq!(gic::version(), GicVersion::V3);

        // SAFETY: The fake frames outlive the process.
        unsafe { gic::init(TestPlatform::gic_bases()) };
        gic::setup_global();
        gic::setup_local();
        gic::enable_interrupts_local();
        setup();

        // Route, prioritize and enable SPI 100 for the core running the
        // test; core 3 has a non-zero affinity so the route is observable.
        set_current_core(3);
        enable(100, 0x80);
        set_current_core(0);
        let gicd = FAKE_GICD.base();
        // SAFETY: The addresses point into the fake distributor frame.
        unsafe {
            assert_eq!(
                crate::mmio::read64(gicd + 0x6000 + 8 * 100),
                TestPlatform::MPIDR_VALUES[3]
            );
            assert_eq!(crate::mmio::read8(gicd + 0x400 + 100), 0x80);
            assert_eq!(crate::mmio::read32(gicd + 0x100 + 12) & (1 << 4), 1 << 4);
        }

        // Fresh registry: registration succeeds, a duplicate is refused and
        // leaves the original handler in place.
        assert_eq!(register_handler(100, handler_42), Ok(()));
        assert_eq!(
            register_handler(100, handler_7),
            Err(IrqError::HandlerAlreadyRegistered)
        );

        SYSREGS.lock().next_iar1 = 100;
        assert_eq!(handler_dispatcher(), 42);
        assert_eq!(LAST_HANDLED.load(Ordering::SeqCst), 100);
        assert_eq!(&SYSREGS.lock().eoir1_writes[..], &[100u64][..]);

        // Unregister, then a second unregister and a never-registered ID
        // both report the empty slot.
        assert_eq!(unregister_handler(100), Ok(()));
        assert_eq!(unregister_handler(100), Err(IrqError::NoHandlerRegistered));
        assert_eq!(unregister_handler(101), Err(IrqError::NoHandlerRegistered));

        // Re-registration after unregistration takes the new handler.
        assert_eq!(register_handler(100, handler_7), Ok(()));
        assert_eq!(handler_dispatcher(), 7);

        // A spurious acknowledge invokes nothing and is never EOI-d.
        let eois_so_far = SYSREGS.lock().eoir1_writes.len();
        SYSREGS.lock().next_iar1 = u64::from(GIC_SPURIOUS_INTERRUPT);
        LAST_HANDLED.store(u32::MAX, Ordering::SeqCst);
        assert_eq!(handler_dispatcher(), 0);
        assert_eq!(LAST_HANDLED.load(Ordering::SeqCst), u32::MAX);
        assert_eq!(SYSREGS.lock().eoir1_writes.len(), eois_so_far);

        // SGI plumbing through the sequential-number API.
        assert_eq!(my_sgi_intid(IRQ_WAKE_SGI), IRQ_WAKE_SGI);
        assert_eq!(register_handler_sgi(IRQ_WAKE_SGI, handler_42), Ok(()));
        platform::mark_core_online(1);
        send_sgi(IRQ_WAKE_SGI, 1);
        assert!(!SYSREGS.lock().sgi1r_writes.is_empty());
        assert_eq!(unregister_handler_sgi(IRQ_WAKE_SGI), Ok(()));

        disable(100);
        assert_eq!(unregister_handler(100), Ok(()));
    }

    #[test]
    fn private_handlers_are_isolated_per_core() {
        let _guard = host_test_lock();
        reset_fake_state();
        setup();
        let gic = local_gicv3();

        // Core 0 registers a PPI handler; core 1 must not see it.
        set_current_core(0);
        assert_eq!(update_handler(&gic, 29, Some(handler_42), false), Ok(()));

        set_current_core(1);
        let looked_up = with_slot(gic.irq_class(29, 1), 1, |slot| *slot);
        assert!(looked_up.is_none());

        // Core 1 installs its own handler for the same PPI number, and each
        // core keeps its own.
        assert_eq!(update_handler(&gic, 29, Some(handler_7), false), Ok(()));

        set_current_core(0);
        assert_eq!(update_handler(&gic, 29, None, true), Ok(()));
        assert!(with_slot(gic.irq_class(29, 0), 0, |slot| *slot).is_none());

        set_current_core(1);
        let kept = with_slot(gic.irq_class(29, 1), 1, |slot| *slot);
        assert_eq!(kept, Some(handler_7 as IrqHandler));
    }

    #[test]
    fn spurious_singleton_and_bulk_clear() {
        let _guard = host_test_lock();
        reset_fake_state();
        setup();
        let gic = local_gicv3();

        assert_eq!(
            update_handler(&gic, GIC_SPURIOUS_INTERRUPT, Some(handler_42), false),
            Ok(())
        );
        assert_eq!(
            update_handler(&gic, GIC_SPURIOUS_INTERRUPT, Some(handler_7), false),
            Err(IrqError::HandlerAlreadyRegistered)
        );

        set_current_core(1);
        assert_eq!(update_handler(&gic, 3, Some(handler_7), false), Ok(()));
        set_current_core(0);
        assert_eq!(update_handler(&gic, 50, Some(handler_42), false), Ok(()));

        // The boot-time clear empties every pool at once.
        setup();
        assert!(with_slot(IrqClass::Spurious, 0, |slot| *slot).is_none());
        assert!(with_slot(IrqClass::Spi(50 - 32), 0, |slot| *slot).is_none());
        assert!(with_slot(IrqClass::Sgi(3), 1, |slot| *slot).is_none());
    }

    #[test]
    fn dispatch_defaults_to_zero_without_a_handler() {
        let _guard = host_test_lock();
        reset_fake_state();
        setup();
        let gic = local_gicv3();

        SYSREGS.lock().next_iar1 = 50;
        assert_eq!(dispatch(&gic), 0);
        // The unhandled interrupt is still completed.
        assert_eq!(&SYSREGS.lock().eoir1_writes[..], &[50u64][..]);
    }

    #[test]
    fn shared_lock_is_taken_exactly_for_spis() {
        let _guard = host_test_lock();
        reset_fake_state();
        let gic = local_gicv3();

        assert!(gic.is_irq_shared(50));
        assert!(!gic.is_irq_shared(14));
        assert!(!gic.is_irq_shared(29));
        assert!(!gic.is_irq_shared(GIC_SPURIOUS_INTERRUPT));
    }

    #[test]
    fn gicv5_sgi_handlers_land_in_the_core_bank() {
        let _guard = host_test_lock();
        reset_fake_state();
        setup();
        // SAFETY: The fake frames outlive the test and are only touched
        // under the test lock.
        let gic = unsafe {
            ArmGic::new(
                GicVersion::V5,
                GicBases {
                    gicd_base: crate::platform::test::FAKE_IRS.base(),
                    ..TestPlatform::gic_bases()
                },
            )
        };

        set_current_core(2);
        let intid = gic.sgi_intid(2, 2);
        assert_eq!(update_handler(&gic, intid, Some(handler_42), false), Ok(()));
        assert_eq!(
            with_slot(IrqClass::Sgi(2), 2, |slot| *slot),
            Some(handler_42 as IrqHandler)
        );

        SYSREGS.lock().next_rcdia = u64::from(intid) | (1 << 32);
        assert_eq!(dispatch(&gic), 42);
        assert_eq!(LAST_HANDLED.load(Ordering::SeqCst), intid);
        // GICv5 completion deactivates and EOIs through GIC commands.
        assert!(!SYSREGS.lock().gic_commands.is_empty());
    }
}
