use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::debug;

/// Emulated device-resident memory.
///
/// Backed by host memory behind a lock so copy jobs on stream threads and
/// test assertions can both reach it. Clones share the same allocation, the
/// way device pointers do.
#[derive(Clone)]
pub struct DeviceBuffer {
    data: Arc<Mutex<Vec<u8>>>,
}

impl DeviceBuffer {
    /// Allocate `len` zeroed bytes of device memory.
    pub fn zeroed(len: usize) -> Self {
        Self {
            data: Arc::new(Mutex::new(vec![0u8; len])),
        }
    }

    /// Allocate device memory initialized from host bytes (test setup and
    /// upload outside the staged-copy path).
    pub fn from_host(bytes: &[u8]) -> Self {
        Self {
            data: Arc::new(Mutex::new(bytes.to_vec())),
        }
    }

    pub fn len(&self) -> usize {
        self.data.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read access to the device bytes.
    pub fn with_read<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let data = self.data.lock().expect("lock poisoned");
        f(&data)
    }

    /// Write access to the device bytes.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let mut data = self.data.lock().expect("lock poisoned");
        f(&mut data)
    }

    /// Copy the device bytes out to a host vector.
    pub fn to_host(&self) -> Vec<u8> {
        self.data.lock().expect("lock poisoned").clone()
    }
}

impl std::fmt::Debug for DeviceBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("len", &self.len())
            .finish()
    }
}

/// Device-resident tensor payload plus the stream that produced it.
///
/// The producer stream is what a staged copy must wait on before reading,
/// so the copy never observes stale or in-flight data.
#[derive(Clone, Debug)]
pub struct DeviceTensor {
    pub buffer: DeviceBuffer,
    pub producer: Arc<crate::stream::TransferStream>,
}

impl DeviceTensor {
    pub fn new(buffer: DeviceBuffer, producer: Arc<crate::stream::TransferStream>) -> Self {
        Self { buffer, producer }
    }
}

/// Idempotent host-memory pinning registry.
///
/// Real accelerators register host regions with the driver before DMA.
/// Registration is shared mutable state across concurrent Puts and Gets and
/// must tolerate redundant registration without failing the operation; this
/// registry only records which regions have been pinned.
#[derive(Default)]
pub struct PinnedRegistry {
    regions: Mutex<HashSet<(usize, usize)>>,
}

impl PinnedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host region by (address, length). Returns `true` if the
    /// region was newly registered, `false` if it was already pinned.
    /// Best-effort: never fails.
    pub fn register(&self, addr: usize, len: usize) -> bool {
        let mut regions = self.regions.lock().expect("lock poisoned");
        let inserted = regions.insert((addr, len));
        if inserted {
            debug!(addr, len, "pinned host region");
        } else {
            debug!(addr, len, "host region already pinned");
        }
        inserted
    }

    /// Whether the exact (address, length) region is registered.
    pub fn is_registered(&self, addr: usize, len: usize) -> bool {
        self.regions
            .lock()
            .expect("lock poisoned")
            .contains(&(addr, len))
    }

    /// Number of distinct pinned regions.
    pub fn len(&self) -> usize {
        self.regions.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for PinnedRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinnedRegistry")
            .field("regions", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_buffer_roundtrip() {
        let buf = DeviceBuffer::from_host(&[1, 2, 3]);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.to_host(), vec![1, 2, 3]);
    }

    #[test]
    fn device_buffer_clones_share_memory() {
        let buf = DeviceBuffer::zeroed(2);
        let other = buf.clone();
        other.with_mut(|b| b[0] = 9);
        buf.with_read(|b| assert_eq!(b[0], 9));
    }

    #[test]
    fn registry_first_registration_returns_true() {
        let registry = PinnedRegistry::new();
        assert!(registry.register(0x1000, 64));
        assert!(registry.is_registered(0x1000, 64));
    }

    #[test]
    fn registry_redundant_registration_is_tolerated() {
        let registry = PinnedRegistry::new();
        assert!(registry.register(0x1000, 64));
        assert!(!registry.register(0x1000, 64));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registry_distinguishes_regions() {
        let registry = PinnedRegistry::new();
        registry.register(0x1000, 64);
        registry.register(0x1000, 128);
        registry.register(0x2000, 64);
        assert_eq!(registry.len(), 3);
        assert!(!registry.is_registered(0x3000, 64));
    }
}
