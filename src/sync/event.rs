// SPDX-License-Identifier: MPL-2.0

use spin::Mutex;

use super::{Waiter, Waker};
use crate::prelude::*;

/// An auto-resetting event for a single waiter.
///
/// The event latches at most one pending signal together with a wake status.
/// Waiting consumes the latch; signalling an event with a sleeping waiter
/// wakes that thread directly without latching, so every signal wakes at
/// most once and a woken thread finds the event reset.
///
/// The status lets teardown distinguish an ordinary wake from a forced one:
/// [`signal_with`] an `Err` makes the pending or the next [`wait`] return
/// that error.
///
/// [`signal_with`]: Self::signal_with
/// [`wait`]: Self::wait
pub(crate) struct Event {
    inner: Mutex<EventInner>,
}

struct EventInner {
    signaled: bool,
    status: Result<()>,
    waker: Option<Arc<Waker>>,
}

impl Event {
    pub(crate) const fn new() -> Self {
        Self {
            inner: Mutex::new(EventInner {
                signaled: false,
                status: Ok(()),
                waker: None,
            }),
        }
    }

    /// Signals the event with an `Ok` status.
    ///
    /// Returns whether a sleeping thread was actually woken, so that
    /// interrupt-context callers can decide whether to request a reschedule.
    pub(crate) fn signal(&self) -> bool {
        self.signal_with(Ok(()))
    }

    /// Signals the event, carrying `status` to the woken (or next) waiter.
    ///
    /// Safe to call from interrupt context: the only lock taken is the
    /// event's own spinlock, and nothing here blocks or allocates.
    pub(crate) fn signal_with(&self, status: Result<()>) -> bool {
        let waker = {
            let mut inner = self.inner.lock();
            inner.status = status;
            match inner.waker.take() {
                Some(waker) => waker,
                None => {
                    inner.signaled = true;
                    return false;
                }
            }
        };
        // Wake outside the lock.
        if waker.wake_up() {
            true
        } else {
            // The waiter vanished between installing its waker and being
            // woken; latch so the signal is not lost.
            self.inner.lock().signaled = true;
            false
        }
    }

    /// Blocks the calling thread until the event is signalled, then resets
    /// the event and returns the signal's status.
    ///
    /// Returns immediately if a signal is already pending. At most one
    /// thread may wait at a time.
    pub(crate) fn wait(&self) -> Result<()> {
        let (waiter, waker) = Waiter::new_pair();
        {
            let mut inner = self.inner.lock();
            if inner.signaled {
                inner.signaled = false;
                return inner.status;
            }
            debug_assert!(
                inner.waker.is_none(),
                "the event supports only one waiter at a time"
            );
            inner.waker = Some(waker);
        }

        waiter.wait();

        self.inner.lock().status
    }
}
