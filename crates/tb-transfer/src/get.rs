use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tb_device::{PinnedRegistry, StagingStreams};
use tb_store::StoreHandle;
use tb_types::{DType, ObjectId};
use tb_wire::read_header;
use tracing::debug;

use crate::alloc::OutputAllocator;
use crate::completion::{Completion, CompletionSender, CompletionWaiter};
use crate::context::{DeviceContext, ExecContext};
use crate::error::{TransferError, TransferResult};
use crate::tensor::{Tensor, TensorData};

/// Get: reconstruct a flat tensor from a sealed store object.
///
/// The fetch is a blocking call: with no timeout configured the calling
/// thread parks until the object is sealed by some writer. This is a
/// deliberate suspension boundary with no cancellation -- callers that
/// cannot tolerate unbounded stalls must not issue the Get. Allocation
/// happens only after the fetch and shape checks succeed, so a failed Get
/// never hands out a partially-copied tensor.
pub struct GetPipeline {
    store: Arc<StoreHandle>,
    staging: Arc<StagingStreams>,
    pinned: Arc<PinnedRegistry>,
    /// `None` in production (wait indefinitely). Tests bound the wait.
    fetch_timeout: Option<Duration>,
}

impl GetPipeline {
    pub fn new(
        store: Arc<StoreHandle>,
        staging: Arc<StagingStreams>,
        pinned: Arc<PinnedRegistry>,
    ) -> Self {
        Self {
            store,
            staging,
            pinned,
            fetch_timeout: None,
        }
    }

    /// Bound the blocking fetch. Test harness only; production Gets wait
    /// indefinitely.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Start a Get of the object under `id`, producing a flat tensor of
    /// `dtype` elements.
    pub fn get(
        &self,
        id: ObjectId,
        dtype: DType,
        ctx: &ExecContext,
        allocator: &dyn OutputAllocator,
    ) -> CompletionWaiter<Tensor> {
        let (sender, waiter) = Completion::channel();

        let (payload, output) = match self.fetch_and_allocate(id, dtype, allocator) {
            Ok(prepared) => prepared,
            Err(err) => {
                sender.resolve(Err(err));
                return waiter;
            }
        };

        match ctx {
            ExecContext::Host => sender.resolve(copy_host(&payload, output)),
            ExecContext::Device(dev) => self.copy_device(payload, output, dev, sender),
        }
        waiter
    }

    /// Blocking fetch, header parse, shape derivation, output allocation.
    /// All failure modes here report before any copy is enqueued.
    fn fetch_and_allocate(
        &self,
        id: ObjectId,
        dtype: DType,
        allocator: &dyn OutputAllocator,
    ) -> TransferResult<(Bytes, Tensor)> {
        // Suspension point: parks until the object is sealed.
        let objects = self.store.get(&[id], self.fetch_timeout)?;
        let object = &objects[0];

        let header = read_header(object)?;
        if header.dtype != dtype {
            return Err(TransferError::TypeMismatch {
                expected: dtype,
                found: header.dtype,
            });
        }

        let payload = object.slice(header.payload_offset..);
        let width = dtype.element_width();
        if payload.len() % width != 0 {
            return Err(TransferError::InvalidArgument(format!(
                "payload of {} bytes is not divisible by element width {width}",
                payload.len()
            )));
        }
        let element_count = (payload.len() / width) as u64;
        debug!(
            id = %id.short_hex(),
            payload_bytes = payload.len(),
            element_count,
            "get: fetched object"
        );

        let output = allocator.allocate(dtype, element_count)?;
        Ok((payload, output))
    }

    fn copy_device(
        &self,
        payload: Bytes,
        output: Tensor,
        ctx: &DeviceContext,
        sender: CompletionSender<Tensor>,
    ) {
        let device = match &output.data {
            TensorData::Device(dev) => dev.clone(),
            TensorData::Host(_) => {
                sender.resolve(Err(TransferError::InvalidArgument(
                    "allocator produced a host tensor for a device-context get".into(),
                )));
                return;
            }
        };

        let h2d = self.staging.h2d();

        // The store buffer may already be pinned by an earlier transfer;
        // redundant registration is tolerated by design.
        self.pinned.register(payload.as_ptr() as usize, payload.len());

        let buffer = device.buffer.clone();
        let enqueued = h2d.enqueue(move || {
            buffer.with_mut(|dst| dst.copy_from_slice(&payload));
        });
        if let Err(err) = enqueued {
            sender.resolve(Err(TransferError::Internal(format!(
                "h2d copy failed to be enqueued: {err}"
            ))));
            return;
        }

        // Without this wait the caller's compute stream could run kernels
        // against the output tensor while its bytes are still in flight.
        if let Err(err) = ctx.compute.wait_for(&h2d) {
            sender.resolve(Err(TransferError::Internal(format!(
                "compute stream wait failed: {err}"
            ))));
            return;
        }

        // Resolve only once the copy has actually finished on the stream.
        let _ = h2d.on_complete(move || {
            sender.resolve(Ok(output));
        });
    }
}

fn copy_host(payload: &Bytes, output: Tensor) -> TransferResult<Tensor> {
    match &output.data {
        TensorData::Host(buf) => {
            buf.with_mut(|dst| dst.copy_from_slice(payload));
            Ok(output)
        }
        TensorData::Device(_) => Err(TransferError::InvalidArgument(
            "allocator produced a device tensor for a host-context get".into(),
        )),
    }
}

impl std::fmt::Debug for GetPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GetPipeline")
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}
