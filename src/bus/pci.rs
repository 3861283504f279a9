// SPDX-License-Identifier: MPL-2.0

//! The PCI device IRQ capability.

use crate::{irq::IrqHandler, prelude::*};

/// The per-IRQ capability surface consumed from a PCI device object.
///
/// A [`PciInterruptDispatcher`] owns one reference to the device for the
/// lifetime of its binding and releases it exactly once, after the handler
/// registration has been cleared.
///
/// [`PciInterruptDispatcher`]: crate::dispatcher::PciInterruptDispatcher
pub trait PciDeviceIrq: Send + Sync {
    /// Returns whether `irq_id` is a legal interrupt index for this device.
    fn is_valid_irq(&self, irq_id: u32) -> bool;

    /// Installs (`Some`) or clears (`None`) the handler for `irq_id`.
    ///
    /// Clearing an empty registration is a no-op.
    fn register_irq_handler(&self, irq_id: u32, handler: Option<IrqHandler>) -> Result<()>;

    /// Suppresses delivery of `irq_id`.
    fn mask_irq(&self, irq_id: u32);

    /// Re-enables delivery of `irq_id`.
    fn unmask_irq(&self, irq_id: u32);
}
