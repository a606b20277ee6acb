//! Consuming change events from a [`StateStore`](crate::StateStore)
//!
//! Every iterator handed out by one store drains the same queue, so an
//! event goes to exactly one of them. Blocking reads wait in short slices
//! and release the queue in between; [`ChangeIterator::try_recv`] never
//! waits on another consumer.
//!
//! ```rust,ignore
//! store.watch_all(&id);
//! for event in store.iter().timeout_iter(Duration::from_secs(30)) {
//!     println!("{}: {}", event.device_id, event.property);
//! }
//! ```

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::store::ChangeEvent;

/// Longest a blocking read holds the queue
const SLICE: Duration = Duration::from_millis(50);

pub struct ChangeIterator {
    queue: Arc<Mutex<Receiver<ChangeEvent>>>,
}

impl ChangeIterator {
    pub(crate) fn new(queue: Arc<Mutex<Receiver<ChangeEvent>>>) -> Self {
        Self { queue }
    }

    /// Wait for the next event; `None` once the store is gone
    pub fn recv(&self) -> Option<ChangeEvent> {
        loop {
            match self.queue.lock().recv_timeout(SLICE) {
                Ok(event) => return Some(event),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<ChangeEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.queue.lock().recv_timeout(left.min(SLICE)) {
                Ok(event) => return Some(event),
                Err(RecvTimeoutError::Timeout) if !left.is_zero() => continue,
                Err(_) => return None,
            }
        }
    }

    /// Next queued event, or `None` when the queue is empty or busy
    pub fn try_recv(&self) -> Option<ChangeEvent> {
        self.queue.try_lock()?.try_recv().ok()
    }

    pub fn try_iter(&self) -> TryIter<'_> {
        TryIter { events: self }
    }

    /// Iterate until `timeout` passes without an event
    pub fn timeout_iter(&self, timeout: Duration) -> TimeoutIter<'_> {
        TimeoutIter {
            events: self,
            timeout,
        }
    }
}

impl Iterator for ChangeIterator {
    type Item = ChangeEvent;

    fn next(&mut self) -> Option<ChangeEvent> {
        self.recv()
    }
}

pub struct TryIter<'a> {
    events: &'a ChangeIterator,
}

impl Iterator for TryIter<'_> {
    type Item = ChangeEvent;

    fn next(&mut self) -> Option<ChangeEvent> {
        self.events.try_recv()
    }
}

pub struct TimeoutIter<'a> {
    events: &'a ChangeIterator,
    timeout: Duration,
}

impl Iterator for TimeoutIter<'_> {
    type Item = ChangeEvent;

    fn next(&mut self) -> Option<ChangeEvent> {
        self.events.recv_timeout(self.timeout)
    }
}
