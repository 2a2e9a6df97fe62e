use tb_device::DeviceError;
use tb_store::StoreError;
use tb_types::{DType, TypeError};
use tb_wire::WireError;

/// Errors from the Put/Get transfer pipelines.
///
/// Every variant is fatal to the single operation that raised it; nothing
/// is retried internally. Failures surface through the operation's
/// completion token, never across a stream boundary.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Arity, size, or shape validation failed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Input tensors disagree on element type, or the stored element type
    /// disagrees with the requested output type.
    #[error("element type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: DType, found: DType },

    /// Element-type mapping failure (unsupported type).
    #[error(transparent)]
    Type(#[from] TypeError),

    /// Header negotiation or parsing failure.
    #[error("serialization error: {0}")]
    Wire(#[from] WireError),

    /// Store-layer failure (create/seal/get).
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Destination tensor allocation failed.
    #[error("allocation failed: {0}")]
    Allocation(String),

    /// Device enqueue failure or missing compute stream.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DeviceError> for TransferError {
    fn from(err: DeviceError) -> Self {
        TransferError::Internal(err.to_string())
    }
}

/// Result alias for transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;
