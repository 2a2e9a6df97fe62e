use std::sync::Arc;

use tb_device::TransferStream;

/// Per-call execution context: where the operation's tensors live and,
/// on the device path, which compute stream the caller's own work runs on.
///
/// One pipeline implementation serves both paths; the context is the
/// capability that selects host memcpy versus staged device copies.
#[derive(Clone, Debug)]
pub enum ExecContext {
    /// Tensors are host-resident; copies are plain synchronous memcpys.
    Host,
    /// Tensors are device-resident; copies stage through the staging
    /// streams and synchronize with the caller's compute stream.
    Device(DeviceContext),
}

/// The device half of an [`ExecContext`].
#[derive(Clone, Debug)]
pub struct DeviceContext {
    /// The caller's compute stream. Get makes this stream wait on the
    /// staged copy so downstream kernels never read a half-filled tensor.
    pub compute: Arc<TransferStream>,
}

impl DeviceContext {
    pub fn new(compute: Arc<TransferStream>) -> Self {
        Self { compute }
    }
}
