use crate::error::{WireError, WireResult};

/// Destination for serialized header bytes.
///
/// Two implementations: [`CountingSink`] measures without storing (size
/// negotiation), [`BufferSink`] writes into a fixed caller-supplied buffer.
/// Serializing the same value through both must produce the same byte count.
pub trait ByteSink {
    /// Append bytes to the sink.
    fn put(&mut self, bytes: &[u8]) -> WireResult<()>;

    /// Bytes written so far.
    fn position(&self) -> usize;
}

/// Sink that counts bytes without storing them.
#[derive(Debug, Default)]
pub struct CountingSink {
    written: usize,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ByteSink for CountingSink {
    fn put(&mut self, bytes: &[u8]) -> WireResult<()> {
        self.written += bytes.len();
        Ok(())
    }

    fn position(&self) -> usize {
        self.written
    }
}

/// Sink over a fixed-size destination buffer. Fails rather than grows.
#[derive(Debug)]
pub struct BufferSink<'a> {
    buf: &'a mut [u8],
    written: usize,
}

impl<'a> BufferSink<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, written: 0 }
    }
}

impl ByteSink for BufferSink<'_> {
    fn put(&mut self, bytes: &[u8]) -> WireResult<()> {
        let end = self.written + bytes.len();
        if end > self.buf.len() {
            return Err(WireError::BufferTooSmall {
                needed: end,
                available: self.buf.len(),
            });
        }
        self.buf[self.written..end].copy_from_slice(bytes);
        self.written = end;
        Ok(())
    }

    fn position(&self) -> usize {
        self.written
    }
}
