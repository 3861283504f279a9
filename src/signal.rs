// SPDX-License-Identifier: MPL-2.0

//! The per-dispatcher signal register.

use core::sync::atomic::{AtomicU64, Ordering};

use static_assertions::const_assert;

/// The number of wait slots available to callers.
///
/// Valid slot indices are `0..MAX_WAIT_SLOTS`.
pub const MAX_WAIT_SLOTS: u32 = 63;

/// The slot index reserved to mean "cancel this object".
///
/// Never assignable by a caller; [`MAX_WAIT_SLOTS`] keeps caller slots below
/// it.
pub(crate) const CANCEL_SLOT: u32 = 63;

pub(crate) const CANCEL_MASK: u64 = 1 << CANCEL_SLOT;

const_assert!(MAX_WAIT_SLOTS <= CANCEL_SLOT);

// # Explanation on the memory orders
//
// A producer makes its writes (e.g. a binding's timestamp) visible before
// raising the slot bit, so `raise` publishes with `Release` and the
// consumer's `drain` takes the whole register with `Acquire`. `AcqRel` on
// both covers the read-modify-write halves.

/// A 64-bit bitmask aggregating pending signals.
///
/// Bit `i` set means slot `i` has an unconsumed signal; bit 63 means a
/// cancellation is pending. Any number of producers may race with the single
/// consumer: producers only OR bits in through a compare-exchange loop, the
/// consumer only exchanges the whole register with zero. No signal can be
/// lost to a read-modify-write race.
pub(crate) struct SignalRegister(AtomicU64);

impl SignalRegister {
    pub(crate) const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// ORs `bits` into the register.
    ///
    /// Safe to call from interrupt context: the loop retries a pure
    /// compare-exchange with no side effects between attempts.
    pub(crate) fn raise(&self, bits: u64) {
        let mut cur = self.0.load(Ordering::Relaxed);
        loop {
            match self
                .0
                .compare_exchange(cur, cur | bits, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(actual) => cur = actual,
            }
        }
    }

    /// Atomically takes every pending bit, leaving the register empty.
    pub(crate) fn drain(&self) -> u64 {
        self.0.swap(0, Ordering::AcqRel)
    }
}
