// SPDX-License-Identifier: MPL-2.0

//! The platform interrupt-controller capability.
//!
//! Dispatchers do not talk to interrupt hardware directly. They consume a
//! narrow capability surface (vector validation, remapping, trigger-mode
//! configuration, masking, and per-vector handler registration) through the
//! [`InterruptController`] trait, which the platform implements over its
//! vectored interrupt controller.
//!
//! A registered [`IrqHandler`] runs in interrupt context. The controller
//! passes the arrival time in and acts on the returned [`IrqReturn`] flags:
//! masking the vector as part of acknowledgement when asked to, and
//! requesting a reschedule when the handler woke a thread.

use crate::{prelude::*, time::Timestamp};

/// How a hardware vector signals.
///
/// Level-triggered vectors need explicit mask/unmask around each observation
/// cycle; edge-triggered vectors are self-clearing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerMode {
    /// Signalled by a transition.
    Edge,
    /// Signalled for as long as the line is held active.
    Level,
}

/// Which line state counts as active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Polarity {
    /// The line is active when low.
    ActiveLow,
    /// The line is active when high.
    ActiveHigh,
}

bitflags::bitflags! {
    /// Actions the platform should take after a handler returns.
    pub struct IrqReturn: u32 {
        /// Mask the source as part of acknowledging the interrupt.
        const MASK = 1 << 0;
        /// A thread was woken; the kernel should reschedule.
        const RESCHEDULE = 1 << 1;
    }
}

/// A per-vector interrupt handler.
///
/// Invoked in interrupt context with the arrival timestamp; must neither
/// block nor allocate.
pub type IrqHandler = Box<dyn Fn(Timestamp) -> IrqReturn + Send + Sync>;

/// The capability surface consumed from the platform interrupt controller.
///
/// All methods other than handler invocation are called from thread context.
pub trait InterruptController: Send + Sync {
    /// Returns whether `vector` is a valid, supported interrupt vector.
    fn is_valid_vector(&self, vector: u32) -> bool;

    /// Resolves `vector` through the controller's remapping.
    fn remap_vector(&self, vector: u32) -> u32;

    /// Configures the trigger mode and polarity of `vector`.
    fn configure_vector(
        &self,
        vector: u32,
        trigger: TriggerMode,
        polarity: Polarity,
    ) -> Result<()>;

    /// Suppresses delivery of `vector`.
    fn mask_vector(&self, vector: u32);

    /// Re-enables delivery of `vector`.
    fn unmask_vector(&self, vector: u32);

    /// Registers the handler invoked whenever `vector` fires.
    fn register_handler(&self, vector: u32, handler: IrqHandler) -> Result<()>;

    /// Removes the handler registered for `vector`, if any.
    fn unregister_handler(&self, vector: u32);
}
