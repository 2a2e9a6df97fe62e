use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::error::{DeviceError, DeviceResult};
use crate::event::Event;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Queue {
    jobs: VecDeque<Job>,
    shutting_down: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    available: Condvar,
}

/// FIFO execution queue modeling one accelerator stream.
///
/// A dedicated worker thread drains jobs strictly in enqueue order. Streams
/// never reorder: a job observes every effect of the jobs enqueued before
/// it on the same stream. Cross-stream ordering requires an explicit
/// [`TransferStream::wait_for`] / [`TransferStream::wait_event`].
///
/// # Teardown contract
///
/// [`TransferStream::shutdown`] drains already-enqueued work, then stops
/// the worker; later enqueues fail [`DeviceError::StreamShutDown`]. The
/// staging streams are shut down only by their owning [`StagingStreams`]'
/// drop -- never implicitly mid-operation.
///
/// [`StagingStreams`]: crate::staging::StagingStreams
pub struct TransferStream {
    name: String,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TransferStream {
    /// Spawn a stream with a diagnostic name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                jobs: VecDeque::new(),
                shutting_down: false,
            }),
            available: Condvar::new(),
        });
        debug!(stream = %name, "initializing transfer stream");
        let worker = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name(format!("tb-stream-{name}"))
                .spawn(move || Self::run(shared))
                .expect("failed to spawn stream worker")
        };
        Self {
            name,
            shared,
            worker: Mutex::new(Some(worker)),
        }
    }

    fn run(shared: Arc<Shared>) {
        loop {
            let job = {
                let mut queue = shared.queue.lock().expect("lock poisoned");
                loop {
                    if let Some(job) = queue.jobs.pop_front() {
                        break Some(job);
                    }
                    if queue.shutting_down {
                        break None;
                    }
                    queue = shared.available.wait(queue).expect("lock poisoned");
                }
            };
            match job {
                Some(job) => job(),
                None => return,
            }
        }
    }

    /// Diagnostic name of the stream.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Submit a job to the back of the queue.
    ///
    /// Failure is reported synchronously here, not discovered later at
    /// completion time.
    pub fn enqueue(&self, job: impl FnOnce() + Send + 'static) -> DeviceResult<()> {
        let mut queue = self.shared.queue.lock().expect("lock poisoned");
        if queue.shutting_down {
            return Err(DeviceError::StreamShutDown(self.name.clone()));
        }
        queue.jobs.push_back(Box::new(job));
        self.shared.available.notify_one();
        Ok(())
    }

    /// Record an event that fires once all work enqueued so far has run.
    pub fn record_event(&self) -> DeviceResult<Event> {
        let event = Event::new();
        let signal = event.clone();
        self.enqueue(move || signal.signal())?;
        Ok(event)
    }

    /// Enqueue a barrier: no later job on this stream runs until `event`
    /// fires.
    pub fn wait_event(&self, event: &Event) -> DeviceResult<()> {
        let event = event.clone();
        self.enqueue(move || event.wait())
    }

    /// Make this stream wait for everything currently enqueued on `other`.
    pub fn wait_for(&self, other: &TransferStream) -> DeviceResult<()> {
        let event = other.record_event()?;
        self.wait_event(&event)
    }

    /// Run `hook` on the stream thread after all currently enqueued work.
    ///
    /// This is the completion-scheduling primitive: seal-and-signal on Put
    /// and resolve-on-copy-done on Get both go through here.
    pub fn on_complete(&self, hook: impl FnOnce() + Send + 'static) -> DeviceResult<()> {
        self.enqueue(hook)
    }

    /// Block the calling thread until all currently enqueued work has run.
    pub fn synchronize(&self) -> DeviceResult<()> {
        let event = self.record_event()?;
        event.wait();
        Ok(())
    }

    /// Drain remaining work and stop the worker. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut queue = self.shared.queue.lock().expect("lock poisoned");
            if queue.shutting_down {
                return;
            }
            queue.shutting_down = true;
            self.shared.available.notify_all();
        }
        let handle = self.worker.lock().expect("lock poisoned").take();
        if let Some(handle) = handle {
            debug!(stream = %self.name, "shutting down transfer stream");
            let _ = handle.join();
        }
    }
}

impl Drop for TransferStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for TransferStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferStream")
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn jobs_run_in_enqueue_order() {
        let stream = TransferStream::new("order");
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..16 {
            let log = Arc::clone(&log);
            stream.enqueue(move || log.lock().unwrap().push(i)).unwrap();
        }
        stream.synchronize().unwrap();
        assert_eq!(*log.lock().unwrap(), (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn record_event_fires_after_prior_work() {
        let stream = TransferStream::new("event");
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..8 {
            let counter = Arc::clone(&counter);
            stream
                .enqueue(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        let event = stream.record_event().unwrap();
        event.wait();
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn wait_event_blocks_later_jobs() {
        let stream = TransferStream::new("barrier");
        let gate = Event::new();
        let ran = Arc::new(AtomicUsize::new(0));

        stream.wait_event(&gate).unwrap();
        {
            let ran = Arc::clone(&ran);
            stream
                .enqueue(move || {
                    ran.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(ran.load(Ordering::SeqCst), 0, "job ran past the barrier");

        gate.signal();
        stream.synchronize().unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn wait_for_orders_across_streams() {
        let producer = TransferStream::new("producer");
        let consumer = TransferStream::new("consumer");
        let value = Arc::new(Mutex::new(0u32));

        {
            let value = Arc::clone(&value);
            producer
                .enqueue(move || {
                    // Slow producer; the consumer must still see its write.
                    std::thread::sleep(Duration::from_millis(30));
                    *value.lock().unwrap() = 7;
                })
                .unwrap();
        }
        consumer.wait_for(&producer).unwrap();
        let observed = Arc::new(Mutex::new(0u32));
        {
            let value = Arc::clone(&value);
            let observed = Arc::clone(&observed);
            consumer
                .enqueue(move || {
                    *observed.lock().unwrap() = *value.lock().unwrap();
                })
                .unwrap();
        }
        consumer.synchronize().unwrap();
        assert_eq!(*observed.lock().unwrap(), 7);
    }

    #[test]
    fn enqueue_after_shutdown_fails() {
        let stream = TransferStream::new("dead");
        stream.shutdown();
        let err = stream.enqueue(|| {}).unwrap_err();
        assert!(matches!(err, DeviceError::StreamShutDown(_)));
    }

    #[test]
    fn shutdown_drains_pending_work() {
        let stream = TransferStream::new("drain");
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..32 {
            let counter = Arc::clone(&counter);
            stream
                .enqueue(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        stream.shutdown();
        assert_eq!(counter.load(Ordering::SeqCst), 32);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let stream = TransferStream::new("twice");
        stream.shutdown();
        stream.shutdown();
    }

    #[test]
    fn on_complete_runs_after_enqueued_copies() {
        let stream = TransferStream::new("complete");
        let copies = Arc::new(AtomicUsize::new(0));
        let seen_at_completion = Arc::new(AtomicUsize::new(usize::MAX));

        for _ in 0..4 {
            let copies = Arc::clone(&copies);
            stream
                .enqueue(move || {
                    std::thread::sleep(Duration::from_millis(5));
                    copies.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        {
            let copies = Arc::clone(&copies);
            let seen = Arc::clone(&seen_at_completion);
            stream
                .on_complete(move || {
                    seen.store(copies.load(Ordering::SeqCst), Ordering::SeqCst);
                })
                .unwrap();
        }
        stream.synchronize().unwrap();
        assert_eq!(seen_at_completion.load(Ordering::SeqCst), 4);
    }
}
