use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::{TransferError, TransferResult};

struct Inner<T> {
    result: Mutex<Option<TransferResult<T>>>,
    cond: Condvar,
}

/// One-shot completion token for an asynchronous transfer.
///
/// `channel()` yields a sender/waiter pair. [`CompletionSender::resolve`]
/// consumes the sender, so resolving twice is a compile error rather than a
/// runtime convention. A sender dropped without resolving (a panicked
/// stream job, a missed exit path) resolves the waiter with an internal
/// error instead of hanging it.
pub struct Completion;

impl Completion {
    pub fn channel<T: Send>() -> (CompletionSender<T>, CompletionWaiter<T>) {
        let inner = Arc::new(Inner {
            result: Mutex::new(None),
            cond: Condvar::new(),
        });
        (
            CompletionSender {
                inner: Arc::clone(&inner),
            },
            CompletionWaiter { inner },
        )
    }
}

/// Resolving half. Consumed on resolution -- exactly once by construction.
pub struct CompletionSender<T: Send> {
    inner: Arc<Inner<T>>,
}

impl<T: Send> CompletionSender<T> {
    /// Resolve the operation, waking the waiter.
    pub fn resolve(self, result: TransferResult<T>) {
        self.inner.set(result);
    }
}

impl<T: Send> Drop for CompletionSender<T> {
    fn drop(&mut self) {
        // Normal resolution has already filled the slot; this only fires
        // when a sender is abandoned.
        self.inner.set_if_empty(|| {
            Err(TransferError::Internal(
                "completion dropped without resolution".into(),
            ))
        });
    }
}

/// Waiting half.
pub struct CompletionWaiter<T: Send> {
    inner: Arc<Inner<T>>,
}

impl<T: Send> CompletionWaiter<T> {
    /// Whether the operation has resolved.
    pub fn is_resolved(&self) -> bool {
        self.inner.result.lock().expect("lock poisoned").is_some()
    }

    /// Block until the operation resolves and take its result.
    pub fn wait(self) -> TransferResult<T> {
        let mut result = self.inner.result.lock().expect("lock poisoned");
        loop {
            if let Some(outcome) = result.take() {
                return outcome;
            }
            result = self.inner.cond.wait(result).expect("lock poisoned");
        }
    }

    /// Block until the operation resolves or `timeout` elapses.
    pub fn wait_timeout(self, timeout: Duration) -> Option<TransferResult<T>> {
        let deadline = Instant::now() + timeout;
        let mut result = self.inner.result.lock().expect("lock poisoned");
        loop {
            if let Some(outcome) = result.take() {
                return Some(outcome);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, _) = self
                .inner
                .cond
                .wait_timeout(result, deadline - now)
                .expect("lock poisoned");
            result = guard;
        }
    }
}

impl<T> Inner<T> {
    fn set(&self, value: TransferResult<T>) {
        let mut result = self.result.lock().expect("lock poisoned");
        if result.is_none() {
            *result = Some(value);
            self.cond.notify_all();
        }
    }

    fn set_if_empty(&self, value: impl FnOnce() -> TransferResult<T>) {
        let mut result = self.result.lock().expect("lock poisoned");
        if result.is_none() {
            *result = Some(value());
            self.cond.notify_all();
        }
    }
}
