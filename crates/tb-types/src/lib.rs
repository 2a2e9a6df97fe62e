//! Foundation types for TensorBridge.
//!
//! TensorBridge moves flat numeric buffers between a sealed-object shared
//! memory store and a compute runtime's tensors. This crate holds the types
//! every other layer speaks:
//!
//! - [`ObjectId`] -- the fixed-length opaque name of a store object. IDs are
//!   supplied by the caller, never generated here.
//! - [`DType`] -- the enumerable set of element types the transfer path
//!   supports, with byte widths and store wire tags.
//! - [`TensorDescriptor`] -- (dtype, shape) plus the derived element count
//!   and byte size. Recomputed per call, never persisted.
//!
//! # Design Rules
//!
//! 1. Object IDs are opaque: the core never interprets or derives them.
//! 2. Unsupported element types fail fast with [`TypeError::Unsupported`];
//!    there is no fallback encoding.
//! 3. Byte sizes are always `element_count * element_width` -- a descriptor
//!    whose reported size disagrees is rejected at the boundary.

pub mod dtype;
pub mod error;
pub mod object;
pub mod tensor;

pub use dtype::{DType, WireTag};
pub use error::TypeError;
pub use object::{ObjectId, OBJECT_ID_LEN};
pub use tensor::TensorDescriptor;
