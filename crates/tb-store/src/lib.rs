//! Sealed-object store client for TensorBridge.
//!
//! The external object store holds fixed-size named objects with a
//! create → write → seal lifecycle: an object is allocated at a known total
//! size, written through a [`WritableBuffer`], then sealed -- after which it
//! is immutable and visible to readers. Readers fetch sealed objects by ID
//! with a blocking [`StoreClient::get`].
//!
//! # Design Rules
//!
//! 1. Objects are immutable once sealed; the writable buffer must not be
//!    retained past the seal.
//! 2. The store owns the backing memory. Sealed reads hand out cheap
//!    [`bytes::Bytes`] clones of it.
//! 3. A duplicate create, a missing seal target, and an exhausted store are
//!    all fatal to the calling operation -- never retried here.
//! 4. `get` with no timeout blocks indefinitely. This is a deliberate
//!    suspension boundary for callers; there is no cancellation.
//!
//! [`StoreHandle`] wraps a client in the process-wide lock that serializes
//! create/seal/get, with lazy idempotent connection.

pub mod error;
pub mod handle;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use handle::StoreHandle;
pub use memory::{InMemoryStore, StoreConfig};
pub use object::WritableBuffer;
pub use traits::StoreClient;
