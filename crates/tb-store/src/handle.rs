use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tb_types::ObjectId;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::object::WritableBuffer;
use crate::traits::StoreClient;

struct HandleState {
    connected: bool,
}

/// Process-wide store client handle.
///
/// Wraps a [`StoreClient`] with the shared-singleton semantics the transfer
/// pipelines need: one lock serializing create/seal issuance, and a lazy,
/// idempotent connect guarded by a connected flag. The handle is an explicit
/// service object -- whoever constructs the pipelines owns it and shares it
/// via `Arc`.
///
/// The blocking wait inside [`StoreHandle::get`] runs *without* holding the
/// handle lock; otherwise an indefinite Get would lock out the very Put that
/// could seal the awaited object.
pub struct StoreHandle {
    client: Arc<dyn StoreClient>,
    state: Mutex<HandleState>,
}

impl StoreHandle {
    /// Wrap a client. The handle starts disconnected; call
    /// [`StoreHandle::connect`] before use.
    pub fn new(client: Arc<dyn StoreClient>) -> Self {
        Self {
            client,
            state: Mutex::new(HandleState { connected: false }),
        }
    }

    /// Establish the session. Idempotent: repeated calls are no-ops.
    pub fn connect(&self) {
        let mut state = self.state.lock().expect("lock poisoned");
        if !state.connected {
            debug!("connecting to object store");
            state.connected = true;
        }
    }

    /// Whether `connect` has been called (and `disconnect` has not).
    pub fn is_connected(&self) -> bool {
        self.state.lock().expect("lock poisoned").connected
    }

    fn ensure_connected(&self) -> StoreResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(StoreError::NotConnected)
        }
    }

    /// Create an object under the handle lock.
    pub fn create(
        &self,
        id: ObjectId,
        total_size: usize,
        metadata: Option<&[u8]>,
    ) -> StoreResult<WritableBuffer> {
        let state = self.state.lock().expect("lock poisoned");
        if !state.connected {
            return Err(StoreError::NotConnected);
        }
        self.client.create(id, total_size, metadata)
    }

    /// Seal an object under the handle lock.
    pub fn seal(&self, id: ObjectId) -> StoreResult<()> {
        let state = self.state.lock().expect("lock poisoned");
        if !state.connected {
            return Err(StoreError::NotConnected);
        }
        self.client.seal(id)
    }

    /// Blocking fetch. `timeout = None` waits indefinitely.
    ///
    /// Suspension boundary: the calling thread parks inside the client until
    /// the objects are sealed. The handle lock is only held long enough to
    /// check the connected flag.
    pub fn get(&self, ids: &[ObjectId], timeout: Option<Duration>) -> StoreResult<Vec<Bytes>> {
        self.ensure_connected()?;
        self.client.get(ids, timeout)
    }

    /// Tear down the session. Idempotent at the handle level.
    pub fn disconnect(&self) -> StoreResult<()> {
        let mut state = self.state.lock().expect("lock poisoned");
        if !state.connected {
            return Ok(());
        }
        state.connected = false;
        self.client.disconnect()
    }
}

impl Drop for StoreHandle {
    fn drop(&mut self) {
        if let Err(err) = self.disconnect() {
            warn!(%err, "store disconnect failed during handle teardown");
        }
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("connected", &self.is_connected())
            .finish()
    }
}
