// SPDX-License-Identifier: MPL-2.0

//! Test doubles: a `std::thread`-backed scheduler and mock hardware.

use std::collections::{BTreeMap, BTreeSet};
use std::thread;
use std::time::Duration;

use spin::Mutex;

use crate::{
    bus::pci::PciDeviceIrq,
    irq::{InterruptController, IrqHandler, IrqReturn, Polarity, TriggerMode},
    prelude::*,
    sched::{self, Scheduler, UnparkHandle},
    time::Timestamp,
};

struct StdScheduler;

struct ThreadHandle(thread::Thread);

impl UnparkHandle for ThreadHandle {
    fn unpark(&self) {
        self.0.unpark();
    }
}

impl Scheduler for StdScheduler {
    fn current_thread(&self) -> Arc<dyn UnparkHandle> {
        Arc::new(ThreadHandle(thread::current()))
    }

    fn park_current(&self, woken: &dyn Fn() -> bool) {
        if !woken() {
            // The timeout only bounds how long a lost wake-up could hang a
            // test; the caller treats an expiry as a spurious return.
            thread::park_timeout(Duration::from_millis(100));
        }
    }
}

/// Registers the std-backed scheduler. Idempotent; call at the start of any
/// test that may block.
pub(crate) fn init() {
    static SCHEDULER: StdScheduler = StdScheduler;
    sched::set_scheduler(&SCHEDULER);
}

/// A mock platform interrupt controller.
///
/// Vectors `0x20..0x100` are valid. `fire` plays the hardware role: it runs
/// the registered handler unless the vector is masked, then applies the
/// handler's `MASK` request.
pub(crate) struct MockController {
    remap_offset: u32,
    handlers: Mutex<BTreeMap<u32, IrqHandler>>,
    masked: Mutex<BTreeSet<u32>>,
    configured: Mutex<BTreeMap<u32, (TriggerMode, Polarity)>>,
    fail_register: Mutex<Option<Error>>,
    fail_configure: Mutex<Option<Error>>,
}

impl MockController {
    pub(crate) fn new() -> Arc<Self> {
        Self::with_remap_offset(0)
    }

    pub(crate) fn with_remap_offset(remap_offset: u32) -> Arc<Self> {
        Arc::new(Self {
            remap_offset,
            handlers: Mutex::new(BTreeMap::new()),
            masked: Mutex::new(BTreeSet::new()),
            configured: Mutex::new(BTreeMap::new()),
            fail_register: Mutex::new(None),
            fail_configure: Mutex::new(None),
        })
    }

    pub(crate) fn fail_next_register(&self, err: Error) {
        *self.fail_register.lock() = Some(err);
    }

    pub(crate) fn fail_next_configure(&self, err: Error) {
        *self.fail_configure.lock() = Some(err);
    }

    pub(crate) fn is_registered(&self, vector: u32) -> bool {
        self.handlers.lock().contains_key(&vector)
    }

    pub(crate) fn is_masked(&self, vector: u32) -> bool {
        self.masked.lock().contains(&vector)
    }

    pub(crate) fn configured(&self, vector: u32) -> Option<(TriggerMode, Polarity)> {
        self.configured.lock().get(&vector).copied()
    }

    /// Removes and returns the handler registered for `vector`.
    pub(crate) fn steal_handler(&self, vector: u32) -> IrqHandler {
        self.handlers.lock().remove(&vector).unwrap()
    }

    /// Simulates `vector` firing at time `now`.
    ///
    /// Returns `None` if the vector is masked or has no handler.
    pub(crate) fn fire(&self, vector: u32, now: Timestamp) -> Option<IrqReturn> {
        if self.is_masked(vector) {
            return None;
        }
        let ret = {
            let handlers = self.handlers.lock();
            let handler = handlers.get(&vector)?;
            handler(now)
        };
        if ret.contains(IrqReturn::MASK) {
            self.masked.lock().insert(vector);
        }
        Some(ret)
    }
}

impl InterruptController for MockController {
    fn is_valid_vector(&self, vector: u32) -> bool {
        (0x20..0x100).contains(&vector)
    }

    fn remap_vector(&self, vector: u32) -> u32 {
        vector + self.remap_offset
    }

    fn configure_vector(
        &self,
        vector: u32,
        trigger: TriggerMode,
        polarity: Polarity,
    ) -> Result<()> {
        if let Some(err) = self.fail_configure.lock().take() {
            return Err(err);
        }
        self.configured.lock().insert(vector, (trigger, polarity));
        Ok(())
    }

    fn mask_vector(&self, vector: u32) {
        self.masked.lock().insert(vector);
    }

    fn unmask_vector(&self, vector: u32) {
        self.masked.lock().remove(&vector);
    }

    fn register_handler(&self, vector: u32, handler: IrqHandler) -> Result<()> {
        if let Some(err) = self.fail_register.lock().take() {
            return Err(err);
        }
        self.handlers.lock().insert(vector, handler);
        Ok(())
    }

    fn unregister_handler(&self, vector: u32) {
        self.handlers.lock().remove(&vector);
    }
}

/// A mock PCI device with four IRQ lines (`0..4`).
pub(crate) struct MockPciDevice {
    handlers: Mutex<BTreeMap<u32, IrqHandler>>,
    masked: Mutex<BTreeSet<u32>>,
    fail_register: Mutex<Option<Error>>,
}

impl MockPciDevice {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            handlers: Mutex::new(BTreeMap::new()),
            masked: Mutex::new(BTreeSet::new()),
            fail_register: Mutex::new(None),
        })
    }

    /// Like [`new`](Self::new), but every line starts out masked.
    pub(crate) fn new_masked() -> Arc<Self> {
        let device = Self::new();
        device.masked.lock().extend(0..4);
        device
    }

    pub(crate) fn fail_next_register(&self, err: Error) {
        *self.fail_register.lock() = Some(err);
    }

    pub(crate) fn is_registered(&self, irq_id: u32) -> bool {
        self.handlers.lock().contains_key(&irq_id)
    }

    pub(crate) fn is_masked(&self, irq_id: u32) -> bool {
        self.masked.lock().contains(&irq_id)
    }

    /// Simulates IRQ `irq_id` firing at time `now`.
    ///
    /// Returns `None` if the line is masked or has no handler.
    pub(crate) fn fire(&self, irq_id: u32, now: Timestamp) -> Option<IrqReturn> {
        if self.is_masked(irq_id) {
            return None;
        }
        let ret = {
            let handlers = self.handlers.lock();
            let handler = handlers.get(&irq_id)?;
            handler(now)
        };
        if ret.contains(IrqReturn::MASK) {
            self.masked.lock().insert(irq_id);
        }
        Some(ret)
    }
}

impl PciDeviceIrq for MockPciDevice {
    fn is_valid_irq(&self, irq_id: u32) -> bool {
        irq_id < 4
    }

    fn register_irq_handler(&self, irq_id: u32, handler: Option<IrqHandler>) -> Result<()> {
        match handler {
            Some(handler) => {
                if let Some(err) = self.fail_register.lock().take() {
                    return Err(err);
                }
                self.handlers.lock().insert(irq_id, handler);
            }
            None => {
                self.handlers.lock().remove(&irq_id);
            }
        }
        Ok(())
    }

    fn mask_irq(&self, irq_id: u32) {
        self.masked.lock().insert(irq_id);
    }

    fn unmask_irq(&self, irq_id: u32) {
        self.masked.lock().remove(&irq_id);
    }
}
