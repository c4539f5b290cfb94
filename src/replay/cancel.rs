//! Cancellation and completion signals shared with the playback thread.

use parking_lot::{Condvar, Mutex as ParkingMutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One-shot flag that threads can wait on.
#[derive(Debug, Default)]
struct Latch {
    set: ParkingMutex<bool>,
    cv: Condvar,
}

impl Latch {
    fn set(&self) {
        let mut set = self.set.lock();
        *set = true;
        self.cv.notify_all();
    }

    fn is_set(&self) -> bool {
        *self.set.lock()
    }

    /// Wait until set or `timeout` elapses. Returns whether it is set.
    fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut set = self.set.lock();
        while !*set {
            match deadline {
                Some(deadline) => {
                    if self.cv.wait_until(&mut set, deadline).timed_out() {
                        break;
                    }
                }
                None => self.cv.wait(&mut set),
            }
        }
        *set
    }

    fn wait(&self) {
        let mut set = self.set.lock();
        while !*set {
            self.cv.wait(&mut set);
        }
    }
}

/// Cooperative cancellation token.
///
/// Sleeping through the token wakes up as soon as `cancel` is called, so
/// long waits between events or loop iterations never delay a stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<Latch>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_set()
    }

    /// Sleep for `duration` unless cancelled first. Returns `true` if the
    /// token was cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return self.is_cancelled();
        }
        self.0.wait_timeout(duration)
    }
}

/// Set by the playback thread when it has finished dispatching.
#[derive(Debug, Clone, Default)]
pub struct Completion(Arc<Latch>);

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(&self) {
        self.0.set();
    }

    pub fn is_finished(&self) -> bool {
        self.0.is_set()
    }

    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.0.wait_timeout(timeout)
    }

    pub fn wait(&self) {
        self.0.wait()
    }
}

/// Marks a [`Completion`] finished when dropped, including on panic.
pub(crate) struct FinishOnDrop(pub Completion);

impl Drop for FinishOnDrop {
    fn drop(&mut self) {
        self.0.finish();
    }
}
