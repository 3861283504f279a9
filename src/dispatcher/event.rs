// SPDX-License-Identifier: MPL-2.0

use alloc::sync::Weak;
use core::{
    array,
    sync::atomic::{AtomicU64, Ordering},
};

use log::debug;
use smallvec::SmallVec;
use spin::Mutex;

use super::{DispatcherState, InterruptDispatcher, InterruptHandle, InterruptOptions};
use crate::{
    irq::{InterruptController, IrqHandler, IrqReturn, TriggerMode},
    prelude::*,
    rights::Rights,
    signal::MAX_WAIT_SLOTS,
    time::Timestamp,
};

/// An interrupt dispatcher over dynamically bound controller vectors.
///
/// Any valid vector of the platform interrupt controller can be bound to any
/// free wait slot, and unbound again, for the lifetime of the object. Slots
/// that no vector is bound to can still be signalled with
/// [`user_signal`](InterruptDispatcher::user_signal), which makes them
/// "virtual" interrupts.
pub struct InterruptEventDispatcher {
    inner: Arc<Inner>,
    controller: Arc<dyn InterruptController>,
}

struct Inner {
    state: DispatcherState,
    // Last-arrival time per slot; 0 means "not observed". Indexed storage
    // rather than a record field so virtual slots keep timestamps too.
    timestamps: [AtomicU64; MAX_WAIT_SLOTS as usize],
    bindings: Mutex<SmallVec<[Binding; 2]>>,
}

struct Binding {
    slot: u32,
    vector: u32,
    // `None` is default mode: the hardware configuration was left as is.
    trigger: Option<(TriggerMode, crate::irq::Polarity)>,
}

impl Binding {
    fn is_level_triggered(&self) -> bool {
        matches!(self.trigger, Some((TriggerMode::Level, _)))
    }
}

impl InterruptEventDispatcher {
    /// Creates a dispatcher with an empty binding table.
    pub fn create(
        controller: Arc<dyn InterruptController>,
    ) -> Result<(InterruptHandle<Self>, Rights)> {
        let dispatcher = Arc::new(Self {
            inner: Arc::new(Inner {
                state: DispatcherState::new(),
                timestamps: array::from_fn(|_| AtomicU64::new(0)),
                bindings: Mutex::new(SmallVec::new()),
            }),
            controller,
        });
        Ok((InterruptHandle::new(dispatcher), Rights::DEFAULT_INTERRUPT))
    }

    fn make_handler(&self, slot: u32, level_triggered: bool) -> IrqHandler {
        // The record's back-reference to its dispatcher: weak, so a handler
        // firing into a dying object degrades to a no-op.
        let inner = Arc::downgrade(&self.inner);
        Box::new(move |now| Inner::on_irq(&inner, slot, level_triggered, now))
    }
}

impl Inner {
    /// The per-vector hardware handler. Runs in interrupt context.
    fn on_irq(inner: &Weak<Inner>, slot: u32, level_triggered: bool, now: Timestamp) -> IrqReturn {
        let Some(inner) = inner.upgrade() else {
            return IrqReturn::empty();
        };

        // Only the first arrival since the last wait cycle is stamped.
        let _ = inner.timestamps[slot as usize].compare_exchange(
            0,
            now,
            Ordering::AcqRel,
            Ordering::Relaxed,
        );

        // A level-triggered line keeps asserting until the consumer runs;
        // have the controller suppress it until the next pre-wait.
        let mut ret = if level_triggered {
            IrqReturn::MASK
        } else {
            IrqReturn::empty()
        };
        if inner.state.signal(1 << slot) {
            ret |= IrqReturn::RESCHEDULE;
        }
        ret
    }
}

impl InterruptDispatcher for InterruptEventDispatcher {
    fn bind(&self, slot: u32, vector: u32, options: InterruptOptions) -> Result<()> {
        if slot >= MAX_WAIT_SLOTS {
            return Err(Error::InvalidArgs);
        }

        let vector = if options.contains(InterruptOptions::REMAP_IRQ) {
            self.controller.remap_vector(vector)
        } else {
            vector
        };
        if !self.controller.is_valid_vector(vector) {
            return Err(Error::InvalidArgs);
        }
        let trigger = options.trigger_mode()?;

        let mut bindings = self.inner.bindings.lock();
        if bindings
            .iter()
            .any(|binding| binding.vector == vector || binding.slot == slot)
        {
            return Err(Error::AlreadyBound);
        }

        if let Some((trigger_mode, polarity)) = trigger {
            self.controller
                .configure_vector(vector, trigger_mode, polarity)?;
        }

        bindings.push(Binding {
            slot,
            vector,
            trigger,
        });

        let level_triggered = matches!(trigger, Some((TriggerMode::Level, _)));
        let handler = self.make_handler(slot, level_triggered);
        if let Err(err) = self.controller.register_handler(vector, handler) {
            // Never leave a record without a live handler.
            bindings.pop();
            return Err(err);
        }

        self.controller.unmask_vector(vector);
        debug!("interrupt: bound vector {} to slot {}", vector, slot);
        Ok(())
    }

    fn unbind(&self, slot: u32) -> Result<()> {
        if slot >= MAX_WAIT_SLOTS {
            return Err(Error::InvalidArgs);
        }

        let mut bindings = self.inner.bindings.lock();
        let index = bindings
            .iter()
            .position(|binding| binding.slot == slot)
            .ok_or(Error::NotFound)?;
        let vector = bindings[index].vector;

        self.controller.mask_vector(vector);
        self.controller.unregister_handler(vector);
        bindings.remove(index);

        debug!("interrupt: unbound slot {} (vector {})", slot, vector);
        Ok(())
    }

    fn get_timestamp(&self, slot: u32) -> Result<Timestamp> {
        if slot >= MAX_WAIT_SLOTS {
            return Err(Error::InvalidArgs);
        }

        let timestamp = self.inner.timestamps[slot as usize].load(Ordering::Acquire);
        if timestamp != 0 {
            return Ok(timestamp);
        }

        let bindings = self.inner.bindings.lock();
        if bindings.iter().any(|binding| binding.slot == slot) {
            Err(Error::BadState)
        } else {
            Err(Error::NotFound)
        }
    }

    fn user_signal(&self, slot: u32, timestamp: Timestamp) -> Result<()> {
        if slot >= MAX_WAIT_SLOTS {
            return Err(Error::InvalidArgs);
        }

        // Unlike the hardware path, a software signal overwrites the stamp.
        // The slot need not be bound; virtual interrupts are permitted.
        self.inner.timestamps[slot as usize].store(timestamp, Ordering::Release);
        self.inner.state.signal(1 << slot);
        Ok(())
    }

    fn cancel(&self) -> Result<()> {
        let bindings = self.inner.bindings.lock();
        for binding in bindings.iter() {
            self.controller.mask_vector(binding.vector);
        }
        drop(bindings);

        self.state().cancel();
        Ok(())
    }

    fn pre_wait(&self) {
        let bindings = self.inner.bindings.lock();
        for binding in bindings.iter() {
            if binding.is_level_triggered() {
                // The handler had the controller mask it on arrival.
                self.controller.unmask_vector(binding.vector);
            }
            // Forget the previous cycle's arrival so the next one is
            // stamped.
            self.inner.timestamps[binding.slot as usize].store(0, Ordering::Release);
        }
    }

    fn post_wait(&self) {
        let bindings = self.inner.bindings.lock();
        for binding in bindings.iter() {
            if binding.is_level_triggered() {
                self.controller.mask_vector(binding.vector);
            }
        }
    }

    fn state(&self) -> &DispatcherState {
        &self.inner.state
    }
}

impl Drop for InterruptEventDispatcher {
    fn drop(&mut self) {
        let bindings = self.inner.bindings.lock();
        for binding in bindings.iter() {
            self.controller.mask_vector(binding.vector);
            self.controller.unregister_handler(binding.vector);
        }
    }
}
