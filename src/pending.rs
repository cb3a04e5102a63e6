//! Pending Responses
//!
//! Response frames received but not yet matched to a request.
//!
//! ## Access Pattern
//! - Receive thread: the only producer (`push`)
//! - Request executor: the only consumer (`take_match`), one call in flight
//! - Every list operation holds the lock only for its own duration; waiting
//!   for new frames goes through the condvar, which releases it.
//!
//! Frames nobody asks for (spontaneous status pushes, late duplicates) stay
//! queued until `clear`.

use std::collections::VecDeque;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::error::Result;
use crate::protocol::ResponseFrame;

#[derive(Debug, Default)]
struct Inner {
    frames: VecDeque<ResponseFrame>,

    /// Bumped on every push so waiters can tell whether anything arrived
    sequence: u64,
}

/// FIFO of unmatched response frames shared between threads
#[derive(Debug, Default)]
pub struct PendingResponses {
    inner: Mutex<Inner>,
    arrived: Condvar,
}

impl PendingResponses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame and wake any waiter
    pub fn push(&self, frame: ResponseFrame) {
        {
            let mut inner = self.inner.lock();
            inner.frames.push_back(frame);
            inner.sequence += 1;
        }
        self.arrived.notify_all();
    }

    /// Arrival counter, read before a scan and passed to `wait_for_arrival`
    pub fn sequence(&self) -> u64 {
        self.inner.lock().sequence
    }

    /// Remove and return the oldest frame `check` accepts
    ///
    /// Frames are offered oldest first. `Ok(None)` leaves a frame in place;
    /// `Ok(Some(_))` or `Err(_)` removes it and ends the scan.
    pub fn take_match<T, F>(&self, mut check: F) -> Result<Option<T>>
    where
        F: FnMut(&ResponseFrame) -> Result<Option<T>>,
    {
        let mut inner = self.inner.lock();
        for index in 0..inner.frames.len() {
            match check(&inner.frames[index]) {
                Ok(None) => continue,
                outcome => {
                    inner.frames.remove(index);
                    return outcome;
                }
            }
        }
        Ok(None)
    }

    /// Block until a frame newer than `seen` arrives or `deadline` passes
    ///
    /// Returns whether something arrived.
    pub fn wait_for_arrival(&self, seen: u64, deadline: Instant) -> bool {
        let mut inner = self.inner.lock();
        while inner.sequence == seen {
            if self.arrived.wait_until(&mut inner, deadline).timed_out() {
                return inner.sequence != seen;
            }
        }
        true
    }

    /// Number of queued frames
    pub fn len(&self) -> usize {
        self.inner.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().frames.is_empty()
    }

    /// Drop every queued frame
    pub fn clear(&self) {
        self.inner.lock().frames.clear();
    }
}
