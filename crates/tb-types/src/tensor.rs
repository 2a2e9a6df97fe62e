use serde::{Deserialize, Serialize};

use crate::dtype::DType;

/// Shape and element type of a tensor, with derived sizes.
///
/// Descriptors are recomputed per call from the runtime's tensor -- they are
/// never persisted. The byte size is always `element_count * element_width`;
/// the offset planner rejects tensors whose reported size disagrees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorDescriptor {
    pub dtype: DType,
    pub shape: Vec<u64>,
}

impl TensorDescriptor {
    pub fn new(dtype: DType, shape: Vec<u64>) -> Self {
        Self { dtype, shape }
    }

    /// A flat 1-D descriptor of `element_count` elements.
    pub fn flat(dtype: DType, element_count: u64) -> Self {
        Self {
            dtype,
            shape: vec![element_count],
        }
    }

    /// Product of all dimension sizes. Empty shape is a scalar (one element).
    pub fn element_count(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Total payload bytes: element count times element width.
    pub fn byte_size(&self) -> u64 {
        self.element_count() * self.dtype.element_width() as u64
    }
}
