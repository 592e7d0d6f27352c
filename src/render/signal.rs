use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// One-directional wake-up channel backed by a FIFO.
///
/// Messages sent before anyone waits stay queued, and a waiter only returns once it has
/// taken a message, so spurious condvar wake-ups are absorbed.
#[derive(Debug)]
pub struct Signal<T> {
    queue: Mutex<VecDeque<T>>,
    ready: Condvar,
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Signal<T> {
    /// Empty signal.
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `msg` and wake one waiter.
    pub fn wake(&self, msg: T) {
        self.lock().push_back(msg);
        self.ready.notify_one();
    }

    /// Block until a message is available and take the oldest one.
    pub fn wait(&self) -> T {
        let mut queue = self.lock();
        loop {
            if let Some(msg) = queue.pop_front() {
                return msg;
            }
            queue = self
                .ready
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.lock();
        loop {
            if let Some(msg) = queue.pop_front() {
                return Some(msg);
            }
            let left = deadline.checked_duration_since(Instant::now())?;
            if left.is_zero() {
                return None;
            }
            queue = self
                .ready
                .wait_timeout(queue, left)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Take the oldest message without blocking.
    pub fn try_take(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Number of queued messages.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/signal.rs"]
mod tests;
