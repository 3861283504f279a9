// SPDX-License-Identifier: MPL-2.0

use core::{
    marker::PhantomData,
    sync::atomic::{AtomicBool, Ordering},
};

use crate::{prelude::*, sched};

// # Explanation on the memory orders
//
// ```
// [CPU 1 (the waker)]     [CPU 2 (the waiter)]
// cond = true;
// wake_up();
//                         wait();
//                         if cond { /* .. */ }
// ```
//
// As soon as the waiter is woken up by the waker, it must see the true
// condition. So `wake_up()` accesses `has_woken` with `Ordering::Release`
// and `wait()` accesses it with `Ordering::Acquire`.

/// A waiter that can put the current thread to sleep until it is woken up by
/// the associated [`Waker`].
///
/// A waiter belongs to the thread that created it, so it can neither be sent
/// to another thread nor shared between threads.
pub(crate) struct Waiter {
    waker: Arc<Waker>,
    // Suppresses `Send`/`Sync`.
    _marker: PhantomData<*const ()>,
}

/// A waker that can wake up the associated [`Waiter`].
///
/// Wakers may be shared freely; waking is safe from interrupt context.
pub(crate) struct Waker {
    has_woken: AtomicBool,
    thread: Arc<dyn sched::UnparkHandle>,
}

impl Waiter {
    /// Creates a waiter for the current thread and its associated [`Waker`].
    pub(crate) fn new_pair() -> (Self, Arc<Waker>) {
        let waker = Arc::new(Waker {
            has_woken: AtomicBool::new(false),
            thread: sched::scheduler().current_thread(),
        });
        let waiter = Self {
            waker: waker.clone(),
            _marker: PhantomData,
        };
        (waiter, waker)
    }

    /// Waits until the waiter is woken up by calling [`Waker::wake_up`] on
    /// the associated [`Waker`].
    ///
    /// This method returns immediately if the waiter has already been woken.
    /// Otherwise, it puts the current thread to sleep until the wake-up
    /// arrives.
    pub(crate) fn wait(&self) {
        self.waker.do_wait();
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        // Close the waker so that a late wake-up becomes a no-op instead of
        // unparking an unrelated sleep of this thread.
        self.waker.close();
    }
}

impl Waker {
    /// Wakes up the associated [`Waiter`].
    ///
    /// Returns `true` if the waiter is woken by this call. Returns `false`
    /// if the waiter has already been woken by a previous call, or if the
    /// waiter has been dropped.
    pub(crate) fn wake_up(&self) -> bool {
        if self.has_woken.swap(true, Ordering::Release) {
            return false;
        }
        self.thread.unpark();
        true
    }

    fn do_wait(&self) {
        while !self.has_woken.swap(false, Ordering::Acquire) {
            sched::scheduler().park_current(&|| self.has_woken.load(Ordering::Acquire));
        }
    }

    fn close(&self) {
        // `Acquire` pairs with the `Release` in `wake_up`; the return value
        // does not matter here.
        let _ = self.has_woken.swap(true, Ordering::Acquire);
    }
}
