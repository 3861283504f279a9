// SPDX-License-Identifier: MPL-2.0

//! Interrupt dispatcher objects.
//!
//! This crate turns hardware and software interrupt events into objects that
//! userspace (or a kernel driver on its behalf) can wait on, multiplexed
//! across up to [`MAX_WAIT_SLOTS`] logical wait slots.
//!
//! # Dispatchers
//!
//! Every dispatcher aggregates signals in a 64-bit atomic register and
//! drives an auto-resetting event that one thread at a time may block on.
//! Delivery is coalescing: a successful wait returns the union of every slot
//! signalled since the previous one, not a queue of individual events. Two
//! hardware bindings exist on top of the shared core:
//!
//! - [`InterruptEventDispatcher`] binds arbitrary vectors of the platform
//!   interrupt controller to wait slots, with per-binding trigger-mode-aware
//!   masking around each wait cycle. Slots without a bound vector can still
//!   carry "virtual" interrupts injected through
//!   [`user_signal`](InterruptDispatcher::user_signal).
//! - [`PciInterruptDispatcher`] wraps a single PCI device IRQ, bound
//!   automatically at creation and fixed to slot 0 for the lifetime of the
//!   object.
//!
//! # Capability seams
//!
//! The crate drives no hardware itself. The platform supplies an
//! [`irq::InterruptController`] (or a [`bus::pci::PciDeviceIrq`]) for the
//! vectors a dispatcher binds, and registers a [`Scheduler`] once at boot
//! via [`set_scheduler`] so waiters can sleep. Registered handlers run in
//! interrupt context: they take no blocking lock, never allocate, and
//! report back whether the kernel should reschedule.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

pub mod bus;
pub mod dispatcher;
mod error;
pub mod irq;
pub mod prelude;
mod rights;
mod sched;
mod signal;
mod sync;
mod time;

#[cfg(test)]
mod test_util;

pub use self::{
    dispatcher::{
        InterruptDispatcher, InterruptEventDispatcher, InterruptHandle, InterruptOptions,
        PciInterruptDispatcher, PciIrqFlags,
    },
    error::Error,
    prelude::Result,
    rights::Rights,
    sched::{set_scheduler, Scheduler, UnparkHandle},
    signal::MAX_WAIT_SLOTS,
    time::Timestamp,
};
