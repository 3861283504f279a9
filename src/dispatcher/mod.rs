// SPDX-License-Identifier: MPL-2.0

//! Interrupt dispatcher objects.
//!
//! A dispatcher aggregates interrupt events into a 64-bit signal register
//! and lets one thread at a time block until something arrives. Producers
//! (hardware handlers running in interrupt context, or software via
//! [`user_signal`]) OR slot bits into the register; the consumer drains the
//! whole register in one atomic exchange, so delivery is coalescing: a drain
//! observes the union of every slot signalled since the previous successful
//! drain, never a queue of individual events.
//!
//! [`user_signal`]: InterruptDispatcher::user_signal

mod event;
mod pci;

use core::{ops::Deref, sync::atomic::{AtomicU32, Ordering}};

use crate::{
    irq::{Polarity, TriggerMode},
    prelude::*,
    signal::{SignalRegister, CANCEL_MASK},
    sync::Event,
    time::Timestamp,
};

pub use self::{
    event::InterruptEventDispatcher,
    pci::{PciInterruptDispatcher, PciIrqFlags, PCI_IRQ_SLOT},
};

bitflags::bitflags! {
    /// Options accepted by [`InterruptDispatcher::bind`]: a remap request
    /// plus a trigger-mode selector.
    pub struct InterruptOptions: u32 {
        /// Resolve the vector through the controller's remapping before
        /// validating it.
        const REMAP_IRQ = 1 << 0;
        /// Selector value: edge-triggered, active low.
        const MODE_EDGE_LOW = 1 << 1;
        /// Selector value: edge-triggered, active high.
        const MODE_EDGE_HIGH = 2 << 1;
        /// Selector value: level-triggered, active low.
        const MODE_LEVEL_LOW = 3 << 1;
        /// Selector value: level-triggered, active high.
        const MODE_LEVEL_HIGH = 4 << 1;
    }
}

impl InterruptOptions {
    /// The bits covering the trigger-mode selector.
    pub const MODE_MASK: u32 = 0b111 << 1;

    /// Decodes the trigger-mode selector.
    ///
    /// `Ok(None)` is the default mode: the hardware is left at its current
    /// configuration. An unrecognized selector value is rejected.
    pub fn trigger_mode(self) -> Result<Option<(TriggerMode, Polarity)>> {
        match self.bits() & Self::MODE_MASK {
            0 => Ok(None),
            x if x == Self::MODE_EDGE_LOW.bits() => {
                Ok(Some((TriggerMode::Edge, Polarity::ActiveLow)))
            }
            x if x == Self::MODE_EDGE_HIGH.bits() => {
                Ok(Some((TriggerMode::Edge, Polarity::ActiveHigh)))
            }
            x if x == Self::MODE_LEVEL_LOW.bits() => {
                Ok(Some((TriggerMode::Level, Polarity::ActiveLow)))
            }
            x if x == Self::MODE_LEVEL_HIGH.bits() => {
                Ok(Some((TriggerMode::Level, Polarity::ActiveHigh)))
            }
            _ => Err(Error::InvalidArgs),
        }
    }
}

/// The state shared by every kind of interrupt dispatcher: the signal
/// register, the blocking wait primitive, and the handle count.
pub struct DispatcherState {
    signals: SignalRegister,
    event: Event,
    handles: AtomicU32,
}

impl DispatcherState {
    pub(crate) const fn new() -> Self {
        Self {
            signals: SignalRegister::new(),
            event: Event::new(),
            handles: AtomicU32::new(1),
        }
    }

    /// Raises `bits` in the signal register and signals the wait primitive.
    ///
    /// This is the producer path and is interrupt-context safe: a pure
    /// compare-exchange loop followed by an event signal under a spinlock,
    /// with no blocking and no allocation. Returns whether a sleeping
    /// thread was actually woken, so interrupt-context callers can decide
    /// whether to request an immediate reschedule.
    pub(crate) fn signal(&self, bits: u64) -> bool {
        self.signals.raise(bits);
        self.event.signal()
    }

    /// Raises the cancellation bit and wakes the waiter, if any.
    ///
    /// The cancellation is consumed by the next drain; it does not poison
    /// the object.
    pub(crate) fn cancel(&self) -> bool {
        self.signal(CANCEL_MASK)
    }

    /// Force-wakes the waiter with [`Error::Canceled`].
    ///
    /// Unlike [`cancel`](Self::cancel), the error is delivered through the
    /// wait primitive itself, so a blocked thread returns immediately
    /// without retrying the drain loop.
    pub(crate) fn close(&self) {
        self.event.signal_with(Err(Error::Canceled));
    }

    fn drain(&self) -> u64 {
        self.signals.drain()
    }

    fn wait_signalled(&self) -> Result<()> {
        self.event.wait()
    }

    fn dup(&self) {
        self.handles.fetch_add(1, Ordering::Relaxed);
    }

    fn release(&self) -> bool {
        self.handles.fetch_sub(1, Ordering::AcqRel) == 1
    }
}

/// An interrupt dispatcher: signal aggregation, blocking wait, and
/// cancellation over up to 63 wait slots.
///
/// The shared wait/signal/cancel protocol lives in the default methods. The
/// two variants, [`InterruptEventDispatcher`] for dynamically bound
/// controller vectors and [`PciInterruptDispatcher`] for a single PCI device
/// IRQ, supply the hardware-specific operations and override the pre-wait
/// and post-wait hooks.
pub trait InterruptDispatcher: Send + Sync {
    /// Binds hardware `vector` to wait slot `slot`.
    fn bind(&self, slot: u32, vector: u32, options: InterruptOptions) -> Result<()>;

    /// Removes the binding of wait slot `slot`.
    fn unbind(&self, slot: u32) -> Result<()>;

    /// Returns the last recorded arrival time for `slot`.
    ///
    /// Fails with [`Error::BadState`] if the slot has not signalled since
    /// its timestamp was last cleared, and with [`Error::NotFound`] /
    /// [`Error::InvalidArgs`] if the slot is unbound / out of range.
    fn get_timestamp(&self, slot: u32) -> Result<Timestamp>;

    /// Software-injects a signal on `slot`, recording `timestamp`.
    fn user_signal(&self, slot: u32, timestamp: Timestamp) -> Result<()>;

    /// Blocks the calling thread until at least one slot signals or the
    /// object is cancelled.
    ///
    /// Returns the bitmask of every slot that signalled since the previous
    /// successful wait. Repeated signals on one slot between waits collapse
    /// into a single observed bit. Only one thread may wait at a time.
    fn wait_for_interrupt(&self) -> Result<u64> {
        loop {
            let signals = self.state().drain();
            if signals != 0 {
                if signals & CANCEL_MASK != 0 {
                    return Err(Error::Canceled);
                }
                self.post_wait();
                return Ok(signals & !CANCEL_MASK);
            }

            self.pre_wait();
            // A wait-primitive failure (the object was destroyed)
            // propagates without retrying the drain.
            self.state().wait_signalled()?;
        }
    }

    /// Forces a blocked waiter to wake with [`Error::Canceled`].
    ///
    /// Cancellation is one-shot: the next drain consumes it and the object
    /// reverts to its normal signalable state.
    fn cancel(&self) -> Result<()> {
        self.state().cancel();
        Ok(())
    }

    /// Runs in thread context before the waiter blocks: re-arm
    /// level-triggered sources and clear timestamps so the next arrival can
    /// be stamped.
    fn pre_wait(&self) {}

    /// Runs in thread context after a successful drain: suppress
    /// level-triggered sources until the next wait cycle.
    fn post_wait(&self) {}

    /// Invoked exactly once when the last handle is dropped.
    ///
    /// Force-wakes any waiter with a cancellation result before subclass
    /// teardown (the `Drop` impls) can run, so no thread is left blocked on
    /// a destroyed object.
    fn on_release(&self) {
        self.state().close();
    }

    /// The state every dispatcher embeds.
    #[doc(hidden)]
    fn state(&self) -> &DispatcherState;
}

/// An owning handle to an interrupt dispatcher.
///
/// Handles are the unit of ownership exposed to the object-handle layer:
/// cloning duplicates the handle, and dropping the last one invokes
/// [`InterruptDispatcher::on_release`] before the dispatcher itself (and
/// with it the hardware bindings) is torn down. Kernel code may keep raw
/// [`Arc`] references obtained from [`dispatcher`](Self::dispatcher), for
/// example across a blocking wait, without pinning the handle itself.
pub struct InterruptHandle<D: InterruptDispatcher> {
    inner: Arc<D>,
}

impl<D: InterruptDispatcher> InterruptHandle<D> {
    pub(crate) fn new(inner: Arc<D>) -> Self {
        Self { inner }
    }

    /// Returns a reference to the underlying dispatcher that is independent
    /// of the handle's lifetime.
    pub fn dispatcher(&self) -> Arc<D> {
        self.inner.clone()
    }
}

impl<D: InterruptDispatcher> Deref for InterruptHandle<D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.inner
    }
}

impl<D: InterruptDispatcher> Clone for InterruptHandle<D> {
    fn clone(&self) -> Self {
        self.inner.state().dup();
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<D: InterruptDispatcher> Drop for InterruptHandle<D> {
    fn drop(&mut self) {
        if self.inner.state().release() {
            self.inner.on_release();
        }
    }
}
