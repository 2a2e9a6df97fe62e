use std::time::Duration;

use bytes::Bytes;
use tb_types::ObjectId;

use crate::error::StoreResult;
use crate::object::WritableBuffer;

/// Client connection to a sealed-object store.
///
/// All implementations must satisfy these invariants:
/// - Exactly one `create` may succeed per ID; a second fails `ObjectExists`.
/// - `seal` makes an object immutable and visible to `get`; writes through a
///   retained buffer after seal never alter the sealed bytes.
/// - `get` returns only sealed objects. With `timeout = None` it blocks the
///   calling thread indefinitely until every requested ID is sealed.
/// - Sealed data is never mutated; handing out shared views is safe.
pub trait StoreClient: Send + Sync {
    /// Allocate a new object of `total_size` bytes under `id`.
    ///
    /// `metadata` is opaque sidecar data stored alongside the object.
    /// Fails `ObjectExists` for a duplicate ID and `StoreFull` when the
    /// store cannot hold the object.
    fn create(
        &self,
        id: ObjectId,
        total_size: usize,
        metadata: Option<&[u8]>,
    ) -> StoreResult<WritableBuffer>;

    /// Finalize a created object, making it immutable and visible to
    /// readers. Fails `NotCreated` / `AlreadySealed`.
    fn seal(&self, id: ObjectId) -> StoreResult<()>;

    /// Blocking fetch of sealed objects by ID, in request order.
    ///
    /// `timeout = None` waits indefinitely -- a genuine suspension point
    /// with no cancellation. `Some(d)` fails `Timeout` if any object is
    /// still unsealed after `d` (the bounded-wait harness used by tests).
    fn get(&self, ids: &[ObjectId], timeout: Option<Duration>) -> StoreResult<Vec<Bytes>>;

    /// Tear down the session. Further calls fail `NotConnected`.
    fn disconnect(&self) -> StoreResult<()>;
}
