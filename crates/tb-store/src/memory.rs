use std::collections::HashMap;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tb_types::ObjectId;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::object::WritableBuffer;
use crate::traits::StoreClient;

/// Configuration for the in-memory store backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum total bytes across all objects (default: 1 GiB).
    pub capacity_bytes: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: 1024 * 1024 * 1024,
        }
    }
}

enum Slot {
    /// Created but not yet sealed. Invisible to `get`.
    Writable(WritableBuffer),
    /// Sealed and immutable. `get` hands out cheap clones.
    Sealed(Bytes),
}

struct State {
    objects: HashMap<ObjectId, Slot>,
    used_bytes: u64,
    connected: bool,
}

/// In-memory, HashMap-based sealed-object store.
///
/// Objects live behind one `Mutex`; a `Condvar` wakes blocked getters when
/// a seal lands. Intended for tests and for embedding the transfer pipeline
/// without an external store process.
pub struct InMemoryStore {
    config: StoreConfig,
    state: Mutex<State>,
    sealed: Condvar,
}

impl InMemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State {
                objects: HashMap::new(),
                used_bytes: 0,
                connected: true,
            }),
            sealed: Condvar::new(),
        }
    }

    /// Number of objects (sealed or not) currently stored.
    pub fn len(&self) -> usize {
        self.state.lock().expect("lock poisoned").objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes currently allocated to objects.
    pub fn used_bytes(&self) -> u64 {
        self.state.lock().expect("lock poisoned").used_bytes
    }

    /// Returns `true` if the object exists and has been sealed.
    pub fn is_sealed(&self, id: &ObjectId) -> bool {
        let state = self.state.lock().expect("lock poisoned");
        matches!(state.objects.get(id), Some(Slot::Sealed(_)))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl StoreClient for InMemoryStore {
    fn create(
        &self,
        id: ObjectId,
        total_size: usize,
        _metadata: Option<&[u8]>,
    ) -> StoreResult<WritableBuffer> {
        let mut state = self.state.lock().expect("lock poisoned");
        if !state.connected {
            return Err(StoreError::NotConnected);
        }
        if state.objects.contains_key(&id) {
            return Err(StoreError::ObjectExists(id));
        }
        let available = self.config.capacity_bytes - state.used_bytes;
        if total_size as u64 > available {
            return Err(StoreError::StoreFull {
                requested: total_size as u64,
                available,
            });
        }
        debug!(id = %id.short_hex(), total_size, "create object");
        let buffer = WritableBuffer::new(total_size);
        state.used_bytes += total_size as u64;
        state.objects.insert(id, Slot::Writable(buffer.clone()));
        Ok(buffer)
    }

    fn seal(&self, id: ObjectId) -> StoreResult<()> {
        let mut state = self.state.lock().expect("lock poisoned");
        if !state.connected {
            return Err(StoreError::NotConnected);
        }
        match state.objects.get(&id) {
            None => return Err(StoreError::NotCreated(id)),
            Some(Slot::Sealed(_)) => return Err(StoreError::AlreadySealed(id)),
            Some(Slot::Writable(buf)) => {
                // Freeze the current bytes. Writes through any retained
                // buffer handle no longer reach the sealed object.
                let frozen = Bytes::from(buf.shared().lock().expect("lock poisoned").clone());
                debug!(id = %id.short_hex(), len = frozen.len(), "seal object");
                state.objects.insert(id, Slot::Sealed(frozen));
            }
        }
        self.sealed.notify_all();
        Ok(())
    }

    fn get(&self, ids: &[ObjectId], timeout: Option<Duration>) -> StoreResult<Vec<Bytes>> {
        let deadline = timeout.map(|d| Instant::now() + d);
        let mut state = self.state.lock().expect("lock poisoned");
        loop {
            if !state.connected {
                return Err(StoreError::NotConnected);
            }
            let ready = ids.iter().all(|id| {
                matches!(state.objects.get(id), Some(Slot::Sealed(_)))
            });
            if ready {
                return Ok(ids
                    .iter()
                    .map(|id| match state.objects.get(id) {
                        Some(Slot::Sealed(bytes)) => bytes.clone(),
                        _ => unreachable!("checked sealed above"),
                    })
                    .collect());
            }
            state = match deadline {
                None => self.sealed.wait(state).expect("lock poisoned"),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        let missing = ids
                            .iter()
                            .find(|id| !matches!(state.objects.get(id), Some(Slot::Sealed(_))))
                            .copied()
                            .unwrap_or(ids[0]);
                        return Err(StoreError::Timeout(missing));
                    }
                    let (guard, _) = self
                        .sealed
                        .wait_timeout(state, deadline - now)
                        .expect("lock poisoned");
                    guard
                }
            };
        }
    }

    fn disconnect(&self) -> StoreResult<()> {
        let mut state = self.state.lock().expect("lock poisoned");
        if !state.connected {
            return Err(StoreError::NotConnected);
        }
        debug!("store client disconnect");
        state.connected = false;
        // Wake blocked getters so they observe the disconnect.
        self.sealed.notify_all();
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("object_count", &self.len())
            .field("used_bytes", &self.used_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn id(byte: u8) -> ObjectId {
        ObjectId::from([byte; 20])
    }

    // -----------------------------------------------------------------------
    // Create / seal lifecycle
    // -----------------------------------------------------------------------

    #[test]
    fn create_write_seal_get() {
        let store = InMemoryStore::default();
        let buf = store.create(id(1), 4, None).unwrap();
        buf.write_at(0, &[10, 20, 30, 40]).unwrap();
        store.seal(id(1)).unwrap();

        let objs = store.get(&[id(1)], Some(Duration::from_secs(1))).unwrap();
        assert_eq!(objs[0].as_ref(), &[10, 20, 30, 40]);
    }

    #[test]
    fn duplicate_create_rejected() {
        let store = InMemoryStore::default();
        store.create(id(2), 8, None).unwrap();
        let err = store.create(id(2), 8, None).unwrap_err();
        assert!(matches!(err, StoreError::ObjectExists(_)));
    }

    #[test]
    fn seal_unknown_object_rejected() {
        let store = InMemoryStore::default();
        let err = store.seal(id(3)).unwrap_err();
        assert!(matches!(err, StoreError::NotCreated(_)));
    }

    #[test]
    fn double_seal_rejected() {
        let store = InMemoryStore::default();
        store.create(id(4), 1, None).unwrap();
        store.seal(id(4)).unwrap();
        let err = store.seal(id(4)).unwrap_err();
        assert!(matches!(err, StoreError::AlreadySealed(_)));
    }

    #[test]
    fn writes_after_seal_do_not_alter_sealed_bytes() {
        let store = InMemoryStore::default();
        let buf = store.create(id(5), 2, None).unwrap();
        buf.write_at(0, &[1, 2]).unwrap();
        store.seal(id(5)).unwrap();
        buf.write_at(0, &[9, 9]).unwrap();

        let objs = store.get(&[id(5)], Some(Duration::from_secs(1))).unwrap();
        assert_eq!(objs[0].as_ref(), &[1, 2]);
    }

    // -----------------------------------------------------------------------
    // Capacity
    // -----------------------------------------------------------------------

    #[test]
    fn capacity_enforced() {
        let store = InMemoryStore::new(StoreConfig { capacity_bytes: 10 });
        store.create(id(6), 8, None).unwrap();
        let err = store.create(id(7), 4, None).unwrap_err();
        assert!(matches!(
            err,
            StoreError::StoreFull {
                requested: 4,
                available: 2
            }
        ));
    }

    // -----------------------------------------------------------------------
    // Blocking get
    // -----------------------------------------------------------------------

    #[test]
    fn get_unsealed_times_out() {
        let store = InMemoryStore::default();
        store.create(id(8), 4, None).unwrap();
        let err = store
            .get(&[id(8)], Some(Duration::from_millis(20)))
            .unwrap_err();
        assert!(matches!(err, StoreError::Timeout(_)));
    }

    #[test]
    fn get_missing_times_out() {
        let store = InMemoryStore::default();
        let err = store
            .get(&[id(9)], Some(Duration::from_millis(20)))
            .unwrap_err();
        assert!(matches!(err, StoreError::Timeout(_)));
    }

    #[test]
    fn get_blocks_until_concurrent_seal() {
        let store = Arc::new(InMemoryStore::default());
        let buf = store.create(id(10), 3, None).unwrap();
        buf.write_at(0, &[5, 6, 7]).unwrap();

        let reader = {
            let store = Arc::clone(&store);
            thread::spawn(move || store.get(&[id(10)], Some(Duration::from_secs(5))))
        };
        thread::sleep(Duration::from_millis(30));
        store.seal(id(10)).unwrap();

        let objs = reader.join().expect("reader panicked").unwrap();
        assert_eq!(objs[0].as_ref(), &[5, 6, 7]);
    }

    #[test]
    fn get_multiple_in_request_order() {
        let store = InMemoryStore::default();
        for (i, data) in [&[1u8][..], &[2, 2][..]].iter().enumerate() {
            let oid = id(20 + i as u8);
            let buf = store.create(oid, data.len(), None).unwrap();
            buf.write_at(0, data).unwrap();
            store.seal(oid).unwrap();
        }
        let objs = store
            .get(&[id(21), id(20)], Some(Duration::from_secs(1)))
            .unwrap();
        assert_eq!(objs[0].as_ref(), &[2, 2]);
        assert_eq!(objs[1].as_ref(), &[1]);
    }

    // -----------------------------------------------------------------------
    // Disconnect
    // -----------------------------------------------------------------------

    #[test]
    fn disconnect_fails_further_ops() {
        let store = InMemoryStore::default();
        store.disconnect().unwrap();
        assert!(matches!(
            store.create(id(30), 1, None).unwrap_err(),
            StoreError::NotConnected
        ));
        assert!(matches!(
            store.disconnect().unwrap_err(),
            StoreError::NotConnected
        ));
    }

    #[test]
    fn disconnect_wakes_blocked_getters() {
        let store = Arc::new(InMemoryStore::default());
        let reader = {
            let store = Arc::clone(&store);
            thread::spawn(move || store.get(&[id(31)], Some(Duration::from_secs(5))))
        };
        thread::sleep(Duration::from_millis(30));
        store.disconnect().unwrap();
        let err = reader.join().expect("reader panicked").unwrap_err();
        assert!(matches!(err, StoreError::NotConnected));
    }

    #[test]
    fn debug_format() {
        let store = InMemoryStore::default();
        store.create(id(40), 4, None).unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryStore"));
        assert!(debug.contains("object_count"));
    }
}
