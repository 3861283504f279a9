// SPDX-License-Identifier: MPL-2.0

use alloc::sync::Weak;
use core::sync::atomic::{AtomicU64, Ordering};

use log::warn;

use super::{DispatcherState, InterruptDispatcher, InterruptHandle, InterruptOptions};
use crate::{
    bus::pci::PciDeviceIrq,
    irq::{IrqHandler, IrqReturn},
    prelude::*,
    rights::Rights,
    time::Timestamp,
};

bitflags::bitflags! {
    /// Properties of the IRQ line wrapped by a [`PciInterruptDispatcher`].
    pub struct PciIrqFlags: u32 {
        /// The line keeps asserting until acknowledged.
        const LEVEL_TRIGGERED = 1 << 0;
        /// The line can be selectively suppressed at the device.
        const MASKABLE = 1 << 1;
    }
}

/// The single wait slot a PCI interrupt dispatcher signals.
pub const PCI_IRQ_SLOT: u32 = 0;

/// An interrupt dispatcher over a single PCI device IRQ.
///
/// The IRQ is bound automatically at creation and stays bound for the
/// lifetime of the object, so [`bind`], [`unbind`] and [`user_signal`] all
/// fail with [`Error::NotSupported`]: this dispatcher carries
/// hardware-sourced signals only, on slot [`PCI_IRQ_SLOT`].
///
/// [`bind`]: InterruptDispatcher::bind
/// [`unbind`]: InterruptDispatcher::unbind
/// [`user_signal`]: InterruptDispatcher::user_signal
pub struct PciInterruptDispatcher {
    state: DispatcherState,
    device: Arc<dyn PciDeviceIrq>,
    irq_id: u32,
    flags: PciIrqFlags,
    timestamp: AtomicU64,
}

impl PciInterruptDispatcher {
    /// Wraps `irq_id` of `device` in a new dispatcher.
    ///
    /// Rejects unknown `flags` bits and illegal interrupt indices. On any
    /// failure after allocation the device reference is released along with
    /// the half-built dispatcher and the error is propagated. If the IRQ is
    /// maskable it starts out unmasked.
    pub fn create(
        device: Arc<dyn PciDeviceIrq>,
        irq_id: u32,
        flags: u32,
    ) -> Result<(InterruptHandle<Self>, Rights)> {
        let flags = PciIrqFlags::from_bits(flags).ok_or(Error::InvalidArgs)?;
        if !device.is_valid_irq(irq_id) {
            return Err(Error::InvalidArgs);
        }

        let dispatcher = Arc::new(Self {
            state: DispatcherState::new(),
            device,
            irq_id,
            flags,
            timestamp: AtomicU64::new(0),
        });

        let handler = Self::make_handler(&dispatcher);
        dispatcher.device.register_irq_handler(irq_id, Some(handler))?;

        if flags.contains(PciIrqFlags::MASKABLE) {
            dispatcher.device.unmask_irq(irq_id);
        }

        Ok((
            InterruptHandle::new(dispatcher),
            Rights::DEFAULT_PCI_INTERRUPT,
        ))
    }

    fn make_handler(dispatcher: &Arc<Self>) -> IrqHandler {
        let dispatcher = Arc::downgrade(dispatcher);
        Box::new(move |now| Self::on_irq(&dispatcher, now))
    }

    /// The hardware handler. Runs in interrupt context.
    fn on_irq(dispatcher: &Weak<Self>, now: Timestamp) -> IrqReturn {
        let Some(dispatcher) = dispatcher.upgrade() else {
            return IrqReturn::empty();
        };

        // Only the first arrival since the last wait cycle is stamped.
        let _ = dispatcher
            .timestamp
            .compare_exchange(0, now, Ordering::AcqRel, Ordering::Relaxed);

        // Have the device suppress a line we are able and required to
        // silence as part of acknowledging it.
        let mut ret = if dispatcher
            .flags
            .contains(PciIrqFlags::LEVEL_TRIGGERED | PciIrqFlags::MASKABLE)
        {
            IrqReturn::MASK
        } else {
            IrqReturn::empty()
        };
        if dispatcher.state.signal(1 << PCI_IRQ_SLOT) {
            ret |= IrqReturn::RESCHEDULE;
        }
        ret
    }
}

impl InterruptDispatcher for PciInterruptDispatcher {
    fn bind(&self, _slot: u32, _vector: u32, _options: InterruptOptions) -> Result<()> {
        // The IRQ is bound at creation and unbound when the last handle
        // closes.
        Err(Error::NotSupported)
    }

    fn unbind(&self, _slot: u32) -> Result<()> {
        Err(Error::NotSupported)
    }

    fn get_timestamp(&self, slot: u32) -> Result<Timestamp> {
        if slot != PCI_IRQ_SLOT {
            return Err(Error::InvalidArgs);
        }

        let timestamp = self.timestamp.load(Ordering::Acquire);
        if timestamp != 0 {
            Ok(timestamp)
        } else {
            Err(Error::BadState)
        }
    }

    fn user_signal(&self, _slot: u32, _timestamp: Timestamp) -> Result<()> {
        Err(Error::NotSupported)
    }

    fn cancel(&self) -> Result<()> {
        if self.flags.contains(PciIrqFlags::MASKABLE) {
            self.device.mask_irq(self.irq_id);
        }

        self.state.cancel();
        Ok(())
    }

    fn pre_wait(&self) {
        if self
            .flags
            .contains(PciIrqFlags::LEVEL_TRIGGERED | PciIrqFlags::MASKABLE)
        {
            // The handler had the device mask the line on arrival.
            self.device.unmask_irq(self.irq_id);
        }
        self.timestamp.store(0, Ordering::Release);
    }

    // post_wait: nothing to do; the handler masks the line on arrival.

    fn state(&self) -> &DispatcherState {
        &self.state
    }
}

impl Drop for PciInterruptDispatcher {
    fn drop(&mut self) {
        // Clear the registration before the device reference is released so
        // the handler cannot fire into a half-destroyed object.
        if let Err(err) = self.device.register_irq_handler(self.irq_id, None) {
            warn!(
                "interrupt: failed to clear the handler of PCI IRQ {}: {:?}",
                self.irq_id, err
            );
        }
    }
}
