// SPDX-License-Identifier: MPL-2.0

//! Handle rights.

bitflags::bitflags! {
    /// The rights attached to a dispatcher handle at creation time.
    ///
    /// Rights restrict what the object-handle layer above this crate lets a
    /// holder do with the handle; the dispatcher operations themselves do not
    /// re-check them.
    pub struct Rights: u32 {
        /// The handle may be duplicated.
        const DUPLICATE = 1 << 0;
        /// The handle may be transferred to another process.
        const TRANSFER = 1 << 1;
        /// The object's state may be read.
        const READ = 1 << 2;
        /// The object's state may be modified.
        const WRITE = 1 << 3;
        /// The object may be waited on.
        const WAIT = 1 << 4;
        /// The object may be signalled from software.
        const SIGNAL = 1 << 5;
        /// The object's metadata may be inspected.
        const INSPECT = 1 << 6;

        /// Rights granted to a freshly created interrupt handle.
        const DEFAULT_INTERRUPT = Self::DUPLICATE.bits
            | Self::TRANSFER.bits
            | Self::READ.bits
            | Self::WRITE.bits
            | Self::WAIT.bits
            | Self::SIGNAL.bits
            | Self::INSPECT.bits;

        /// Rights granted to a freshly created PCI interrupt handle.
        ///
        /// PCI interrupt objects carry hardware-sourced signals only, so the
        /// software-signal right is withheld.
        const DEFAULT_PCI_INTERRUPT = Self::DUPLICATE.bits
            | Self::TRANSFER.bits
            | Self::READ.bits
            | Self::WRITE.bits
            | Self::WAIT.bits
            | Self::INSPECT.bits;
    }
}
