//! Put/Get transfer pipelines for TensorBridge.
//!
//! This crate is the core of the system: moving tensors between a compute
//! runtime and a sealed-object store, in both directions, across host and
//! device memory.
//!
//! - **Put** ([`PutPipeline`]): validate inputs, plan payload offsets,
//!   negotiate the header size, create a store object of
//!   `header + payload` bytes, write the header, copy each input to its
//!   offset (synchronously on the host path, via the device-to-host
//!   staging stream on the device path), then seal -- strictly after every
//!   copy has landed.
//! - **Get** ([`GetPipeline`]): block until the object is sealed, parse
//!   its header, derive the flat output shape, allocate the destination,
//!   copy (synchronously, or via the host-to-device staging stream with a
//!   compute-stream wait), then resolve.
//!
//! Both operations are asynchronous units of work: they hand back a
//! [`CompletionWaiter`] that resolves exactly once on every path,
//! success or failure. The two ordering invariants that matter -- seal
//! only after all staged copies, compute-stream wait after the Get copy --
//! are enforced by scheduling the dependent step onto the staging stream
//! itself.
//!
//! Services (store handle, staging streams, pinned-memory registry) are
//! explicit `Arc`-shared objects injected at pipeline construction; there
//! is no process-global state.

pub mod alloc;
pub mod completion;
pub mod context;
pub mod error;
pub mod get;
pub mod plan;
pub mod put;
pub mod tensor;

pub use alloc::{DeviceAllocator, HostAllocator, OutputAllocator};
pub use completion::{Completion, CompletionSender, CompletionWaiter};
pub use context::{DeviceContext, ExecContext};
pub use error::{TransferError, TransferResult};
pub use get::GetPipeline;
pub use plan::{plan_offsets, OffsetPlan};
pub use put::PutPipeline;
pub use tensor::{HostBuffer, Tensor, TensorData};
