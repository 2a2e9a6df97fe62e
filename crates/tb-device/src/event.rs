use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

struct EventState {
    signaled: Mutex<bool>,
    cond: Condvar,
}

/// One-shot completion signal.
///
/// Recorded on a stream (fires when all previously enqueued work on that
/// stream has drained) and awaited either on another stream or on a host
/// thread. Clones share the same signal. Signaling twice is a no-op.
#[derive(Clone)]
pub struct Event {
    state: Arc<EventState>,
}

impl Event {
    pub fn new() -> Self {
        Self {
            state: Arc::new(EventState {
                signaled: Mutex::new(false),
                cond: Condvar::new(),
            }),
        }
    }

    /// Fire the event, waking all waiters.
    pub fn signal(&self) {
        let mut signaled = self.state.signaled.lock().expect("lock poisoned");
        *signaled = true;
        self.state.cond.notify_all();
    }

    /// Returns `true` if the event has fired.
    pub fn is_signaled(&self) -> bool {
        *self.state.signaled.lock().expect("lock poisoned")
    }

    /// Block until the event fires.
    pub fn wait(&self) {
        let mut signaled = self.state.signaled.lock().expect("lock poisoned");
        while !*signaled {
            signaled = self.state.cond.wait(signaled).expect("lock poisoned");
        }
    }

    /// Block until the event fires or `timeout` elapses. Returns `true` if
    /// the event fired.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut signaled = self.state.signaled.lock().expect("lock poisoned");
        while !*signaled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .state
                .cond
                .wait_timeout(signaled, deadline - now)
                .expect("lock poisoned");
            signaled = guard;
        }
        true
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("signaled", &self.is_signaled())
            .finish()
    }
}
