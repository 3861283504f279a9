// SPDX-License-Identifier: MPL-2.0

//! The kernel-scheduler capability.
//!
//! Blocking a thread in [`wait_for_interrupt`] needs two things from the
//! surrounding kernel: a way to put the current thread to sleep, and a handle
//! that other threads (or interrupt handlers) can use to wake it up again.
//! Both are supplied by a [`Scheduler`] implementation registered once at
//! boot via [`set_scheduler`], the same way a `log` backend is installed with
//! `log::set_logger`.
//!
//! [`wait_for_interrupt`]: crate::dispatcher::InterruptDispatcher::wait_for_interrupt

use spin::Once;

use crate::prelude::*;

/// Puts threads to sleep and hands out wake-up handles for them.
pub trait Scheduler: Sync {
    /// Returns a handle that can wake the calling thread.
    fn current_thread(&self) -> Arc<dyn UnparkHandle>;

    /// Blocks the calling thread until it is unparked.
    ///
    /// `woken` reports whether the wake-up this thread is waiting for has
    /// already been delivered; an implementation must not sleep once it
    /// returns `true`. Spurious returns are permitted, the caller re-checks
    /// and parks again.
    fn park_current(&self, woken: &dyn Fn() -> bool);
}

/// A handle that wakes one specific thread.
///
/// Waking is async-signal-safe in the kernel sense: it may be invoked from
/// interrupt context and must neither block nor allocate.
pub trait UnparkHandle: Send + Sync {
    /// Wakes the thread this handle was created for.
    fn unpark(&self);
}

static SCHEDULER: Once<&'static dyn Scheduler> = Once::new();

/// Registers the scheduler backing all blocking waits.
///
/// Must be called once during kernel initialization, before the first call
/// to any wait operation. Subsequent calls have no effect.
pub fn set_scheduler(scheduler: &'static dyn Scheduler) {
    SCHEDULER.call_once(|| scheduler);
}

pub(crate) fn scheduler() -> &'static dyn Scheduler {
    *SCHEDULER
        .get()
        .expect("no scheduler registered; call `set_scheduler` during kernel init")
}
