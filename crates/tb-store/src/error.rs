use tb_types::ObjectId;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Create was called with an ID that already names an object.
    #[error("object already exists: {0}")]
    ObjectExists(ObjectId),

    /// The store cannot hold an object of the requested size.
    #[error("store full: requested {requested} bytes, {available} available")]
    StoreFull { requested: u64, available: u64 },

    /// Seal was called on an ID that was never created.
    #[error("object not created: {0}")]
    NotCreated(ObjectId),

    /// Seal was called twice on the same object.
    #[error("object already sealed: {0}")]
    AlreadySealed(ObjectId),

    /// A bounded-wait get gave up before the object was sealed.
    #[error("timed out waiting for object: {0}")]
    Timeout(ObjectId),

    /// A write landed outside the created object's bounds.
    #[error("write out of bounds: offset {offset} + len {len} > size {size}")]
    OutOfBounds { offset: usize, len: usize, size: usize },

    /// Operation attempted before `connect` or after `disconnect`.
    #[error("store client not connected")]
    NotConnected,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
