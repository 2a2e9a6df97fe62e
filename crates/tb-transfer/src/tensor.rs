use std::sync::{Arc, Mutex};

use tb_device::DeviceTensor;
use tb_types::{DType, TensorDescriptor};

/// Host-resident tensor payload.
///
/// Cheap-clone shared bytes, mirroring [`tb_device::DeviceBuffer`] on the
/// host side so output tensors can be allocated first and filled by a copy
/// afterwards.
#[derive(Clone)]
pub struct HostBuffer {
    data: Arc<Mutex<Vec<u8>>>,
}

impl HostBuffer {
    pub fn zeroed(len: usize) -> Self {
        Self {
            data: Arc::new(Mutex::new(vec![0u8; len])),
        }
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
        }
    }

    pub fn len(&self) -> usize {
        self.data.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn with_read<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let data = self.data.lock().expect("lock poisoned");
        f(&data)
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let mut data = self.data.lock().expect("lock poisoned");
        f(&mut data)
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.data.lock().expect("lock poisoned").clone()
    }
}

impl std::fmt::Debug for HostBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBuffer").field("len", &self.len()).finish()
    }
}

/// Where a tensor's bytes live.
#[derive(Clone, Debug)]
pub enum TensorData {
    Host(HostBuffer),
    Device(DeviceTensor),
}

/// A runtime tensor as the transfer pipelines see it: element type, shape,
/// and a host- or device-resident flat byte payload.
#[derive(Clone, Debug)]
pub struct Tensor {
    pub dtype: DType,
    pub shape: Vec<u64>,
    pub data: TensorData,
}

impl Tensor {
    pub fn host(dtype: DType, shape: Vec<u64>, buffer: HostBuffer) -> Self {
        Self {
            dtype,
            shape,
            data: TensorData::Host(buffer),
        }
    }

    pub fn device(dtype: DType, shape: Vec<u64>, tensor: DeviceTensor) -> Self {
        Self {
            dtype,
            shape,
            data: TensorData::Device(tensor),
        }
    }

    /// Flat f32 host tensor from values. Test and embedding convenience.
    pub fn from_f32(values: &[f32]) -> Self {
        let mut bytes = Vec::with_capacity(values.len() * 4);
        for v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        Self::host(
            DType::F32,
            vec![values.len() as u64],
            HostBuffer::from_vec(bytes),
        )
    }

    /// Interpret the payload as little-endian f32 values.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        let bytes = self.payload_bytes();
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    pub fn descriptor(&self) -> TensorDescriptor {
        TensorDescriptor::new(self.dtype, self.shape.clone())
    }

    pub fn element_count(&self) -> u64 {
        self.descriptor().element_count()
    }

    /// Byte size derived from shape and element width.
    pub fn byte_size(&self) -> u64 {
        self.descriptor().byte_size()
    }

    /// Byte length of the actual backing payload. The offset planner
    /// rejects tensors where this disagrees with [`Tensor::byte_size`].
    pub fn reported_byte_size(&self) -> u64 {
        match &self.data {
            TensorData::Host(buf) => buf.len() as u64,
            TensorData::Device(dev) => dev.buffer.len() as u64,
        }
    }

    /// Copy of the payload bytes, wherever they live.
    pub fn payload_bytes(&self) -> Vec<u8> {
        match &self.data {
            TensorData::Host(buf) => buf.to_vec(),
            TensorData::Device(dev) => dev.buffer.to_host(),
        }
    }
}
