//! Serialized tensor header format for TensorBridge.
//!
//! A store object produced by Put is `[header][payload]`. The header is a
//! self-describing prefix recording the element type and shape of the stored
//! tensor; the payload is the raw concatenated element bytes. This crate is
//! the header negotiator: it answers "how many header bytes will this
//! (dtype, shape) take?" before the payload exists, and writes the header
//! into a caller-supplied buffer, reporting where the payload starts.
//!
//! Header size and content depend only on (dtype, shape) -- never on payload
//! bytes. `header_size` and `write_header` share one serialization routine
//! over a [`ByteSink`], so the negotiated size cannot drift from the written
//! size. If the store format ever made the header payload-dependent, the
//! offset math in the Put pipeline would silently corrupt objects; the
//! shared routine is what rules that out.

pub mod error;
pub mod header;
pub mod sink;

pub use error::{WireError, WireResult};
pub use header::{header_size, read_header, write_header, TensorHeader, WIRE_VERSION};
pub use sink::{BufferSink, ByteSink, CountingSink};
