use std::sync::Arc;

use tb_device::{DeviceBuffer, DeviceTensor, TransferStream};
use tb_types::DType;

use crate::error::{TransferError, TransferResult};
use crate::tensor::{HostBuffer, Tensor};

/// Allocates the destination tensor for a Get.
///
/// Stands in for the runtime's own output allocator; failures propagate
/// unchanged to the caller, never retried. Allocation happens only after
/// the store fetch has succeeded.
pub trait OutputAllocator: Send + Sync {
    fn allocate(&self, dtype: DType, element_count: u64) -> TransferResult<Tensor>;
}

/// Host-memory allocator for the host execution path.
#[derive(Debug, Default)]
pub struct HostAllocator;

impl OutputAllocator for HostAllocator {
    fn allocate(&self, dtype: DType, element_count: u64) -> TransferResult<Tensor> {
        let bytes = element_count
            .checked_mul(dtype.element_width() as u64)
            .ok_or_else(|| TransferError::Allocation("byte size overflow".into()))?;
        Ok(Tensor::host(
            dtype,
            vec![element_count],
            HostBuffer::zeroed(bytes as usize),
        ))
    }
}

/// Device-memory allocator for the device execution path.
///
/// The produced tensor records `producer` (the stream that will fill it)
/// so later consumers know what to wait on.
pub struct DeviceAllocator {
    producer: Arc<TransferStream>,
}

impl DeviceAllocator {
    pub fn new(producer: Arc<TransferStream>) -> Self {
        Self { producer }
    }
}

impl OutputAllocator for DeviceAllocator {
    fn allocate(&self, dtype: DType, element_count: u64) -> TransferResult<Tensor> {
        let bytes = element_count
            .checked_mul(dtype.element_width() as u64)
            .ok_or_else(|| TransferError::Allocation("byte size overflow".into()))?;
        let buffer = DeviceBuffer::zeroed(bytes as usize);
        Ok(Tensor::device(
            dtype,
            vec![element_count],
            DeviceTensor::new(buffer, Arc::clone(&self.producer)),
        ))
    }
}
