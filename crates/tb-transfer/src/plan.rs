use crate::error::{TransferError, TransferResult};
use crate::tensor::Tensor;

/// Prefix-sum byte layout of the input tensors inside one object payload.
///
/// `offsets` has one more entry than there are tensors: `offsets[0] == 0`,
/// `offsets[k]` is where tensor `k` starts, and the final entry equals
/// `total_bytes`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OffsetPlan {
    pub offsets: Vec<u64>,
    pub total_bytes: u64,
}

impl OffsetPlan {
    /// Byte range of tensor `i` within the payload.
    pub fn range(&self, i: usize) -> (u64, u64) {
        (self.offsets[i], self.offsets[i + 1])
    }

    pub fn tensor_count(&self) -> usize {
        self.offsets.len() - 1
    }
}

/// Compute per-tensor byte sizes and the offset table for a Put.
///
/// Validates what the runtime has not already guaranteed: at least one
/// input, a uniform element type, and per-tensor byte sizes that are
/// strictly positive and consistent with `count * width`.
pub fn plan_offsets(tensors: &[Tensor]) -> TransferResult<OffsetPlan> {
    if tensors.is_empty() {
        return Err(TransferError::InvalidArgument(
            "put requires at least one input tensor".into(),
        ));
    }

    let dtype = tensors[0].dtype;
    for tensor in &tensors[1..] {
        if tensor.dtype != dtype {
            return Err(TransferError::TypeMismatch {
                expected: dtype,
                found: tensor.dtype,
            });
        }
    }

    let mut offsets = Vec::with_capacity(tensors.len() + 1);
    offsets.push(0u64);
    let mut total_bytes = 0u64;
    for (i, tensor) in tensors.iter().enumerate() {
        let size = tensor.byte_size();
        if size == 0 {
            return Err(TransferError::InvalidArgument(format!(
                "input tensor {i} has zero bytes"
            )));
        }
        if size != tensor.reported_byte_size() {
            return Err(TransferError::InvalidArgument(format!(
                "input tensor {i}: computed size {size} != backing size {}",
                tensor.reported_byte_size()
            )));
        }
        total_bytes += size;
        offsets.push(total_bytes);
    }

    Ok(OffsetPlan {
        offsets,
        total_bytes,
    })
}
