use crc32fast::Hasher;
use tb_types::{DType, WireTag};

use crate::error::{WireError, WireResult};
use crate::sink::{BufferSink, ByteSink, CountingSink};

/// Format magic at the start of every serialized header.
pub const MAGIC: [u8; 4] = *b"TBH1";

/// Current header format version.
pub const WIRE_VERSION: u16 = 1;

/// Parsed view of a serialized tensor header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TensorHeader {
    pub dtype: DType,
    pub shape: Vec<u64>,
    /// Byte offset of the first payload byte (== serialized header length).
    pub payload_offset: usize,
}

/// Serialized size in bytes of the header for (dtype, shape).
///
/// Deterministic: depends only on the arguments, never on payload contents,
/// so callers may negotiate the size before the payload exists.
pub fn header_size(dtype: DType, shape: &[u64]) -> WireResult<usize> {
    let mut sink = CountingSink::new();
    serialize(dtype, shape, &mut sink)?;
    Ok(sink.position())
}

/// Write the header for (dtype, shape) into `dst` starting at offset 0.
///
/// Returns the offset immediately following the header -- the start of
/// payload bytes. Fails with [`WireError::BufferTooSmall`] if `dst` cannot
/// hold the header.
pub fn write_header(dtype: DType, shape: &[u64], dst: &mut [u8]) -> WireResult<usize> {
    let mut sink = BufferSink::new(dst);
    serialize(dtype, shape, &mut sink)?;
    Ok(sink.position())
}

/// Single serialization routine shared by size negotiation and writing.
///
/// Layout:
/// ```text
/// [4 bytes: magic "TBH1"]
/// [2 bytes: version (little-endian u16)]
/// [1 byte:  element type wire tag]
/// [varint:  number of dimensions]
/// [varint:  each dimension size, in order]
/// [4 bytes: CRC32 of all preceding header bytes (little-endian u32)]
/// ```
fn serialize(dtype: DType, shape: &[u64], sink: &mut dyn ByteSink) -> WireResult<()> {
    let mut hasher = Hasher::new();
    let mut put = |sink: &mut dyn ByteSink, bytes: &[u8]| -> WireResult<()> {
        hasher.update(bytes);
        sink.put(bytes)
    };

    put(sink, &MAGIC)?;
    put(sink, &WIRE_VERSION.to_le_bytes())?;
    put(sink, &[dtype.wire_tag().0])?;

    let mut varint = [0u8; 10];
    let n = encode_varint(shape.len() as u64, &mut varint);
    put(sink, &varint[..n])?;
    for &dim in shape {
        let n = encode_varint(dim, &mut varint);
        put(sink, &varint[..n])?;
    }

    let crc = hasher.finalize();
    sink.put(&crc.to_le_bytes())
}

/// Parse and verify a serialized header from the front of `buf`.
pub fn read_header(buf: &[u8]) -> WireResult<TensorHeader> {
    let mut pos = 0usize;

    let magic = take::<4>(buf, &mut pos)?;
    if magic != MAGIC {
        return Err(WireError::BadMagic {
            expected: MAGIC,
            found: magic,
        });
    }
    let version = u16::from_le_bytes(take::<2>(buf, &mut pos)?);
    if version != WIRE_VERSION {
        return Err(WireError::UnsupportedVersion(version));
    }
    let tag = take::<1>(buf, &mut pos)?[0];
    let dtype = DType::from_wire_tag(WireTag(tag))?;

    let ndim = decode_varint(buf, &mut pos)?;
    let mut shape = Vec::with_capacity(ndim as usize);
    for _ in 0..ndim {
        shape.push(decode_varint(buf, &mut pos)?);
    }

    let crc_end = pos;
    let expected = u32::from_le_bytes(take::<4>(buf, &mut pos)?);
    let computed = crc32fast::hash(&buf[..crc_end]);
    if expected != computed {
        return Err(WireError::ChecksumMismatch { expected, computed });
    }

    Ok(TensorHeader {
        dtype,
        shape,
        payload_offset: pos,
    })
}

fn take<const N: usize>(buf: &[u8], pos: &mut usize) -> WireResult<[u8; N]> {
    let end = *pos + N;
    if end > buf.len() {
        return Err(WireError::Truncated(*pos));
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[*pos..end]);
    *pos = end;
    Ok(out)
}

/// Encode a u64 as a variable-length integer into `out`, returning the
/// number of bytes used (at most 10).
fn encode_varint(mut value: u64, out: &mut [u8; 10]) -> usize {
    let mut i = 0;
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        out[i] = byte;
        i += 1;
        if value == 0 {
            return i;
        }
    }
}

fn decode_varint(buf: &[u8], pos: &mut usize) -> WireResult<u64> {
    let mut value: u64 = 0;
    let mut shift = 0;
    loop {
        if *pos >= buf.len() {
            return Err(WireError::Truncated(*pos));
        }
        let byte = buf[*pos];
        *pos += 1;
        value |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
        if shift >= 64 {
            return Err(WireError::Truncated(*pos));
        }
    }
}
