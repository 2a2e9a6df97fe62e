use std::sync::{Arc, Mutex};

use crate::stream::TransferStream;

/// The per-direction staging streams used exclusively for store transfers.
///
/// One device-to-host stream (Put) and one host-to-device stream (Get),
/// each created lazily on first use under its own lock and reused for the
/// owner's lifetime. An explicit service object: whoever builds the
/// transfer pipelines owns a `StagingStreams` and shares it via `Arc` --
/// there are no process globals.
///
/// # Teardown contract
///
/// The streams are released only when this owner is dropped, never during
/// an operation and never in any implicit global-teardown order. Dropping
/// drains both streams before returning.
pub struct StagingStreams {
    d2h: Mutex<Option<Arc<TransferStream>>>,
    h2d: Mutex<Option<Arc<TransferStream>>>,
}

impl StagingStreams {
    /// Create the manager with both streams uninitialized.
    pub fn new() -> Self {
        Self {
            d2h: Mutex::new(None),
            h2d: Mutex::new(None),
        }
    }

    fn get_or_init(slot: &Mutex<Option<Arc<TransferStream>>>, name: &str) -> Arc<TransferStream> {
        let mut slot = slot.lock().expect("lock poisoned");
        match &*slot {
            Some(stream) => Arc::clone(stream),
            None => {
                let stream = Arc::new(TransferStream::new(name));
                *slot = Some(Arc::clone(&stream));
                stream
            }
        }
    }

    /// The device-to-host staging stream, initializing it on first use.
    pub fn d2h(&self) -> Arc<TransferStream> {
        Self::get_or_init(&self.d2h, "d2h")
    }

    /// The host-to-device staging stream, initializing it on first use.
    pub fn h2d(&self) -> Arc<TransferStream> {
        Self::get_or_init(&self.h2d, "h2d")
    }

    /// Whether the device-to-host stream has been initialized.
    pub fn d2h_initialized(&self) -> bool {
        self.d2h.lock().expect("lock poisoned").is_some()
    }

    /// Whether the host-to-device stream has been initialized.
    pub fn h2d_initialized(&self) -> bool {
        self.h2d.lock().expect("lock poisoned").is_some()
    }
}

impl Default for StagingStreams {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StagingStreams {
    fn drop(&mut self) {
        for slot in [&self.d2h, &self.h2d] {
            if let Some(stream) = slot.lock().expect("lock poisoned").take() {
                stream.shutdown();
            }
        }
    }
}

impl std::fmt::Debug for StagingStreams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingStreams")
            .field("d2h_initialized", &self.d2h_initialized())
            .field("h2d_initialized", &self.h2d_initialized())
            .finish()
    }
}
