// SPDX-FileCopyrightText: 2025 Contributors to the switcher-stills project.
// SPDX-License-Identifier: Apache-2.0

//! Callback sinks that turn driver notifications into waitable signals.
//!
//! The driver calls these from its own notification threads. Each sink is
//! shared through an `Arc`: the upload holds one reference and the driver
//! holds another while the sink is registered, so a late notification after
//! a timeout still lands on a live object.

use std::{
    sync::{
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
    time::Duration,
};

use tracing::trace;

use crate::driver::{LockCallback, MediaPoolEvent, StillsCallback};

/// A one-shot flag that threads can wait on.
#[derive(Debug, Default)]
struct Latch {
    set: Mutex<bool>,
    signal: Condvar,
}

impl Latch {
    fn state(&self) -> MutexGuard<'_, bool> {
        self.set.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the flag and wakes every waiter. Returns `false` if it was already set.
    fn set(&self) -> bool {
        let newly_set = {
            let mut set = self.state();
            !std::mem::replace(&mut *set, true)
        };
        self.signal.notify_all();
        newly_set
    }

    fn is_set(&self) -> bool {
        *self.state()
    }

    /// Waits until the flag is set or `timeout` passes. Spurious wake-ups are absorbed.
    fn wait(&self, timeout: Duration) -> bool {
        let guard = self.state();
        let (set, _) = self
            .signal
            .wait_timeout_while(guard, timeout, |set| !*set)
            .unwrap_or_else(PoisonError::into_inner);
        *set
    }
}

/// Receives the media pool lock grant.
#[derive(Debug, Default)]
pub struct LockAcquisitionSink {
    obtained: Latch,
}

impl LockAcquisitionSink {
    /// Creates a sink with one reference, held by the caller.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Blocks until the lock is granted or `timeout` passes. Returns `true` on grant.
    pub fn wait_obtained(&self, timeout: Duration) -> bool {
        self.obtained.wait(timeout)
    }

    /// Whether the grant has arrived.
    pub fn is_obtained(&self) -> bool {
        self.obtained.is_set()
    }
}

impl LockCallback for LockAcquisitionSink {
    fn obtained(&self) {
        if !self.obtained.set() {
            trace!("Repeated lock grant ignored");
        }
    }
}

/// Receives media pool events and waits for the transfer-completed event.
///
/// The sink is registered before the lock is requested, so it can see the
/// completion of another client's transfer. Completions only count once the
/// sink is [armed](Self::arm), right before this client's own upload request.
/// Every other event, and any completion before arming, is counted and
/// otherwise ignored.
#[derive(Debug, Default)]
pub struct TransferCompletionSink {
    completed: Latch,
    armed: AtomicBool,
    ignored: AtomicU32,
}

impl TransferCompletionSink {
    /// Creates a sink with one reference, held by the caller.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Starts accepting the transfer-completed event.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Blocks until the transfer completes or `timeout` passes. Returns `true` on completion.
    pub fn wait_completed(&self, timeout: Duration) -> bool {
        self.completed.wait(timeout)
    }

    /// Whether the completion event has arrived.
    pub fn is_completed(&self) -> bool {
        self.completed.is_set()
    }

    /// Number of events received that did not complete the transfer. Wraps on overflow.
    pub fn ignored_events(&self) -> u32 {
        self.ignored.load(Ordering::Relaxed)
    }
}

impl StillsCallback for TransferCompletionSink {
    fn notify(&self, event: MediaPoolEvent, index: i32) {
        if event == MediaPoolEvent::TransferCompleted && self.armed.load(Ordering::SeqCst) {
            self.completed.set();
        } else {
            trace!("Ignoring media pool event {event:?} for slot {index}");
            self.ignored.fetch_add(1, Ordering::Relaxed);
        }
    }
}
