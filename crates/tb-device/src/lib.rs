//! Accelerator transfer-stream abstraction for TensorBridge.
//!
//! The transfer pipelines stage device copies through dedicated streams: a
//! device-to-host stream for Put and a host-to-device stream for Get, each
//! distinct from the caller's own compute stream. This crate models the
//! pieces of that protocol the pipelines depend on:
//!
//! - [`TransferStream`] -- a FIFO execution queue backed by a worker thread.
//!   Work enqueued on one stream runs strictly in order; cross-stream
//!   ordering exists only where an explicit wait is inserted.
//! - [`Event`] -- a one-shot signal recorded on one stream and awaited on
//!   another; the primitive behind cross-stream waits and completion hooks.
//! - [`DeviceBuffer`] / [`DeviceTensor`] -- emulated device memory plus the
//!   stream that produced it, so consumers know what to wait on.
//! - [`PinnedRegistry`] -- idempotent host-memory registration. Real
//!   accelerators require pinning before DMA; redundant registration must
//!   never fail the operation.
//! - [`StagingStreams`] -- the per-direction staging streams, created
//!   lazily on first use, each under its own lock, living until their owner
//!   is dropped.
//!
//! # Ordering model
//!
//! Within a stream, jobs run in enqueue order. `wait_event` enqueues a
//! barrier: no later job on that stream runs until the event fires.
//! `record_event` enqueues a signal: the event fires only after everything
//! enqueued before it has run. Composing the two (`wait_for`) gives the
//! must-not-reorder guarantee the copy protocol needs.

pub mod error;
pub mod event;
pub mod memory;
pub mod staging;
pub mod stream;

pub use error::{DeviceError, DeviceResult};
pub use event::Event;
pub use memory::{DeviceBuffer, DeviceTensor, PinnedRegistry};
pub use staging::StagingStreams;
pub use stream::TransferStream;
