use std::sync::Arc;

use tb_device::{PinnedRegistry, StagingStreams, TransferStream};
use tb_store::{StoreHandle, WritableBuffer};
use tb_types::{ObjectId, TensorDescriptor};
use tb_wire::{header_size, write_header};
use tracing::{debug, error};

use crate::completion::{Completion, CompletionSender, CompletionWaiter};
use crate::context::ExecContext;
use crate::error::{TransferError, TransferResult};
use crate::plan::{plan_offsets, OffsetPlan};
use crate::tensor::{Tensor, TensorData};

struct Prepared {
    id: ObjectId,
    plan: OffsetPlan,
    buffer: WritableBuffer,
    payload_offset: usize,
}

/// Put: concatenate input tensors into one sealed store object.
///
/// The object layout is `[header][payload]` where the header describes a
/// flat tensor of `total_bytes / element_width` elements and the payload is
/// the inputs' bytes at their planned offsets. The pipeline is asynchronous:
/// `put` returns as soon as host work is done or device work is enqueued,
/// and the returned completion token resolves exactly once on every path.
///
/// A failed Put never seals its object; whatever was created stays store
/// garbage rather than becoming visible half-written data.
pub struct PutPipeline {
    store: Arc<StoreHandle>,
    staging: Arc<StagingStreams>,
    pinned: Arc<PinnedRegistry>,
}

impl PutPipeline {
    pub fn new(
        store: Arc<StoreHandle>,
        staging: Arc<StagingStreams>,
        pinned: Arc<PinnedRegistry>,
    ) -> Self {
        Self {
            store,
            staging,
            pinned,
        }
    }

    /// Start a Put of `tensors` under `id`.
    ///
    /// Validation and store failures resolve the token before any copy is
    /// enqueued. On the device path the seal is scheduled behind every
    /// staged copy; the token resolves only after the seal.
    pub fn put(&self, tensors: &[Tensor], id: ObjectId, ctx: &ExecContext) -> CompletionWaiter<()> {
        let (sender, waiter) = Completion::channel();

        let prepared = match self.prepare(tensors, id) {
            Ok(prepared) => prepared,
            Err(err) => {
                sender.resolve(Err(err));
                return waiter;
            }
        };

        match ctx {
            ExecContext::Host => sender.resolve(self.copy_host(tensors, &prepared)),
            ExecContext::Device(_) => self.copy_device(tensors, prepared, sender),
        }
        waiter
    }

    /// Everything that must happen before the first copy: offset planning,
    /// header negotiation, object creation, header write.
    fn prepare(&self, tensors: &[Tensor], id: ObjectId) -> TransferResult<Prepared> {
        let plan = plan_offsets(tensors)?;
        let dtype = tensors[0].dtype;
        let width = dtype.element_width() as u64;

        // The header describes the object as one flat tensor over the
        // concatenated payload.
        let flat = TensorDescriptor::flat(dtype, plan.total_bytes / width);
        let header_bytes = header_size(dtype, &flat.shape)?;
        debug!(
            id = %id.short_hex(),
            tensors = tensors.len(),
            payload_bytes = plan.total_bytes,
            header_bytes,
            "put: creating object"
        );

        let buffer = self
            .store
            .create(id, header_bytes + plan.total_bytes as usize, None)?;
        let payload_offset = buffer.with_mut(|dst| write_header(dtype, &flat.shape, dst))?;

        Ok(Prepared {
            id,
            plan,
            buffer,
            payload_offset,
        })
    }

    fn copy_host(&self, tensors: &[Tensor], prepared: &Prepared) -> TransferResult<()> {
        for (i, tensor) in tensors.iter().enumerate() {
            let dst = prepared.payload_offset + prepared.plan.offsets[i] as usize;
            match &tensor.data {
                TensorData::Host(buf) => {
                    buf.with_read(|src| prepared.buffer.write_at(dst, src))?;
                }
                TensorData::Device(_) => {
                    return Err(TransferError::InvalidArgument(format!(
                        "input tensor {i} is device-resident in a host-context put"
                    )));
                }
            }
        }
        self.store.seal(prepared.id)?;
        Ok(())
    }

    fn copy_device(
        &self,
        tensors: &[Tensor],
        prepared: Prepared,
        sender: CompletionSender<()>,
    ) {
        let d2h = self.staging.d2h();

        // Pin the destination payload region so the device can DMA into it
        // directly. Best-effort: a repeat Put touching an already-pinned
        // region must not fail.
        self.pinned.register(
            prepared.buffer.addr() + prepared.payload_offset,
            prepared.plan.total_bytes as usize,
        );

        // The staging stream must not read an input until the stream that
        // produces it has caught up.
        let mut producers: Vec<Arc<TransferStream>> = Vec::new();
        for tensor in tensors {
            if let TensorData::Device(dev) = &tensor.data {
                if !producers.iter().any(|p| Arc::ptr_eq(p, &dev.producer)) {
                    producers.push(Arc::clone(&dev.producer));
                }
            }
        }
        for producer in &producers {
            if let Err(err) = d2h.wait_for(producer) {
                sender.resolve(Err(err.into()));
                return;
            }
        }

        for (i, tensor) in tensors.iter().enumerate() {
            let dst = prepared.payload_offset + prepared.plan.offsets[i] as usize;
            match &tensor.data {
                TensorData::Device(dev) => {
                    let src = dev.buffer.clone();
                    let out = prepared.buffer.clone();
                    let enqueued = d2h.enqueue(move || {
                        src.with_read(|bytes| {
                            if let Err(err) = out.write_at(dst, bytes) {
                                // Sizes were validated by the planner; a
                                // failure here means the object buffer was
                                // torn down mid-copy.
                                error!(%err, "staged d2h copy failed");
                            }
                        });
                    });
                    if let Err(err) = enqueued {
                        sender.resolve(Err(TransferError::Internal(format!(
                            "d2h copy failed to be enqueued: {err}"
                        ))));
                        return;
                    }
                }
                TensorData::Host(buf) => {
                    // Host-resident input in a device put: no staging needed,
                    // its region is disjoint from every staged copy.
                    if let Err(err) = buf.with_read(|src| prepared.buffer.write_at(dst, src)) {
                        sender.resolve(Err(err.into()));
                        return;
                    }
                }
            }
        }

        // Seal only after every staged copy has landed, then resolve. If the
        // stream is torn down between the copies above and this hook, the
        // dropped sender still resolves the token with an internal error.
        let store = Arc::clone(&self.store);
        let id = prepared.id;
        let _ = d2h.on_complete(move || {
            let result = store.seal(id).map_err(TransferError::from);
            sender.resolve(result);
        });
    }
}

impl std::fmt::Debug for PutPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PutPipeline").finish_non_exhaustive()
    }
}
