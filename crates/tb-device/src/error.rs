/// Errors from stream and device-memory operations.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Work was submitted to a stream after its teardown.
    ///
    /// Checked synchronously at enqueue time so the failure can still be
    /// reported through the operation's completion path.
    #[error("stream '{0}' is shut down")]
    StreamShutDown(String),

    /// The calling context has no compute stream to synchronize with.
    #[error("no compute stream available")]
    NoComputeStream,
}

/// Result alias for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;
