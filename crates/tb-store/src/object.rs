use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::{StoreError, StoreResult};

/// Writable view of a created-but-unsealed store object.
///
/// The store owns the backing memory; this handle holds a shared reference
/// to it for the duration of one Put. Clones share the same bytes, so the
/// handle can travel onto a staging stream while the pipeline keeps its own
/// copy. Sealing freezes a snapshot: writes through a retained handle still
/// land here but never reach the sealed object.
#[derive(Clone)]
pub struct WritableBuffer {
    data: Arc<Mutex<Vec<u8>>>,
}

impl WritableBuffer {
    /// Allocate a zeroed buffer of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            data: Arc::new(Mutex::new(vec![0u8; size])),
        }
    }

    pub(crate) fn shared(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.data)
    }

    /// Total object size in bytes (header + payload).
    pub fn len(&self) -> usize {
        self.data.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `src` into the buffer at `offset`. Bounds-checked.
    pub fn write_at(&self, offset: usize, src: &[u8]) -> StoreResult<()> {
        let mut data = self.data.lock().expect("lock poisoned");
        let end = offset
            .checked_add(src.len())
            .ok_or(StoreError::OutOfBounds {
                offset,
                len: src.len(),
                size: data.len(),
            })?;
        if end > data.len() {
            return Err(StoreError::OutOfBounds {
                offset,
                len: src.len(),
                size: data.len(),
            });
        }
        data[offset..end].copy_from_slice(src);
        Ok(())
    }

    /// Run `f` over the mutable bytes. Used by the header writer, which
    /// needs a contiguous `&mut [u8]` rather than positioned writes.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let mut data = self.data.lock().expect("lock poisoned");
        f(&mut data)
    }

    /// Address token of the backing allocation, used as the key for
    /// pinned-memory registration. Stable for the buffer's lifetime (the
    /// allocation is never resized).
    pub fn addr(&self) -> usize {
        self.data.lock().expect("lock poisoned").as_ptr() as usize
    }
}

impl fmt::Debug for WritableBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WritableBuffer")
            .field("len", &self.len())
            .finish()
    }
}
