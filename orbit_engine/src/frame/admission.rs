//! Admission semaphore bounding the number of frames in flight.
//!
//! The gate starts with N permits. The producer takes one per tick with
//! [`AdmissionSemaphore::acquire`] and receives a [`CompletionToken`]; the
//! device hands the token back with [`CompletionToken::release`] once the
//! GPU has finished the submission. The token only holds an `Arc` to the
//! shared gate, so a completion arriving after the pipeline is gone is
//! harmless.
//!
//! A token dropped without being released is a lost completion. The permit
//! is gone for good and the gate refuses every later acquire.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use crate::error::{Error, Result};
use crate::{engine_err, engine_error};

/// "Slot released" event carried by a completion token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRelease {
    /// Ring slot the finished submission was reading
    pub slot: usize,
    /// Frame number of the finished submission
    pub frame_index: u64,
}

struct Gate {
    permits: usize,
    lost: usize,
    completed: u64,
    drained: bool,
    last_release: Option<SlotRelease>,
}

struct Shared {
    gate: Mutex<Gate>,
    changed: Condvar,
    capacity: usize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Gate> {
        // Gate holds plain counters, a panic mid-update cannot leave them torn
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Counting gate initialised to the maximum number of frames in flight
pub struct AdmissionSemaphore {
    shared: Arc<Shared>,
}

impl AdmissionSemaphore {
    /// Create a gate with `capacity` permits
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                gate: Mutex::new(Gate {
                    permits: capacity,
                    lost: 0,
                    completed: 0,
                    drained: false,
                    last_release: None,
                }),
                changed: Condvar::new(),
                capacity,
            }),
        }
    }

    /// Block until a permit is available, then take it
    pub fn acquire(&self) -> Result<CompletionToken> {
        self.acquire_until(None)
    }

    /// Like [`acquire`](Self::acquire) but give up after `timeout` with `DeviceHang`
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<CompletionToken> {
        // a deadline past the end of time waits forever
        let deadline = Instant::now().checked_add(timeout).map(|at| (at, timeout));
        self.acquire_until(deadline)
    }

    /// Take a permit only if one is available right now
    pub fn try_acquire(&self) -> Result<Option<CompletionToken>> {
        let mut gate = self.shared.lock();
        Self::check_usable(&gate)?;
        if gate.permits == 0 {
            return Ok(None);
        }
        gate.permits -= 1;
        Ok(Some(self.token()))
    }

    fn acquire_until(&self, deadline: Option<(Instant, Duration)>) -> Result<CompletionToken> {
        let mut gate = self.shared.lock();
        loop {
            Self::check_usable(&gate)?;
            if gate.permits > 0 {
                gate.permits -= 1;
                return Ok(self.token());
            }
            gate = match deadline {
                None => self
                    .shared
                    .changed
                    .wait(gate)
                    .unwrap_or_else(PoisonError::into_inner),
                Some((at, waited)) => {
                    let now = Instant::now();
                    if now >= at {
                        engine_error!("orbit::Admission",
                            "No frame completed within {:?} ({} of {} in flight)",
                            waited, self.shared.capacity - gate.permits, self.shared.capacity);
                        return Err(Error::DeviceHang { waited });
                    }
                    self.shared
                        .changed
                        .wait_timeout(gate, at - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    /// Wait for every outstanding frame to complete and take all permits
    ///
    /// Used on shutdown before GPU resources are released. `None` waits forever.
    /// After a successful drain the gate admits nothing.
    pub fn drain(&self, timeout: Option<Duration>) -> Result<()> {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut gate = self.shared.lock();
        loop {
            if gate.drained {
                return Ok(());
            }
            if gate.lost > 0 {
                engine_error!("orbit::Admission",
                    "Cannot drain: {} completion(s) lost", gate.lost);
                return Err(Error::LostCompletion);
            }
            if gate.permits == self.shared.capacity {
                gate.permits = 0;
                gate.drained = true;
                return Ok(());
            }
            gate = match (deadline, timeout) {
                (Some(at), Some(waited)) => {
                    let now = Instant::now();
                    if now >= at {
                        engine_error!("orbit::Admission",
                            "Drain timed out with {} frame(s) in flight",
                            self.shared.capacity - gate.permits);
                        return Err(Error::DeviceHang { waited });
                    }
                    self.shared
                        .changed
                        .wait_timeout(gate, at - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                _ => self
                    .shared
                    .changed
                    .wait(gate)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }

    /// Maximum number of frames in flight
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Permits currently available
    pub fn available(&self) -> usize {
        self.shared.lock().permits
    }

    /// Frames acquired but not yet released (lost ones included)
    pub fn in_flight(&self) -> usize {
        let gate = self.shared.lock();
        if gate.drained {
            return 0;
        }
        self.shared.capacity - gate.permits
    }

    /// Number of completions released so far
    pub fn completed(&self) -> u64 {
        self.shared.lock().completed
    }

    /// Most recent "slot released" event
    pub fn last_release(&self) -> Option<SlotRelease> {
        self.shared.lock().last_release
    }

    /// Whether a completion has been lost
    pub fn is_failed(&self) -> bool {
        self.shared.lock().lost > 0
    }

    /// Whether the gate has been drained for shutdown
    pub fn is_drained(&self) -> bool {
        self.shared.lock().drained
    }

    fn check_usable(gate: &Gate) -> Result<()> {
        if gate.lost > 0 {
            return Err(Error::LostCompletion);
        }
        if gate.drained {
            return Err(engine_err!("orbit::Admission", "Admission gate already drained"));
        }
        Ok(())
    }

    fn token(&self) -> CompletionToken {
        CompletionToken {
            shared: Some(Arc::clone(&self.shared)),
            release: SlotRelease { slot: 0, frame_index: 0 },
        }
    }
}

/// One admitted frame; returns its permit when released
///
/// Must be released exactly once. Dropping it unreleased reports a lost
/// completion and fails the gate.
#[must_use = "dropping a CompletionToken without releasing it loses a permit"]
pub struct CompletionToken {
    shared: Option<Arc<Shared>>,
    release: SlotRelease,
}

impl CompletionToken {
    /// Tag the token with the slot and frame it admits
    pub fn for_frame(mut self, slot: usize, frame_index: u64) -> Self {
        self.release = SlotRelease { slot, frame_index };
        self
    }

    pub fn slot(&self) -> usize {
        self.release.slot
    }

    pub fn frame_index(&self) -> u64 {
        self.release.frame_index
    }

    /// Return the permit: the GPU is done with this frame's slot
    pub fn release(mut self) {
        if let Some(shared) = self.shared.take() {
            let mut gate = shared.lock();
            debug_assert!(gate.permits < shared.capacity, "permit released twice");
            gate.permits += 1;
            gate.completed += 1;
            gate.last_release = Some(self.release);
            drop(gate);
            shared.changed.notify_all();
        }
    }
}

impl Drop for CompletionToken {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            engine_error!("orbit::Admission",
                "Completion for frame {} (slot {}) lost; admission capacity reduced",
                self.release.frame_index, self.release.slot);
            shared.lock().lost += 1;
            shared.changed.notify_all();
        }
    }
}

impl std::fmt::Debug for CompletionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionToken")
            .field("slot", &self.release.slot)
            .field("frame_index", &self.release.frame_index)
            .finish()
    }
}

#[cfg(test)]
#[path = "admission_tests.rs"]
mod tests;
