use tb_types::TypeError;

/// Errors from header serialization and parsing.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Destination buffer is too small for the serialized header.
    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// Header prefix does not start with the format magic.
    #[error("bad magic: expected {expected:?}, found {found:?}")]
    BadMagic { expected: [u8; 4], found: [u8; 4] },

    /// Header was written by an incompatible format version.
    #[error("unsupported wire version {0}")]
    UnsupportedVersion(u16),

    /// Header checksum does not match its contents.
    #[error("header checksum mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { expected: u32, computed: u32 },

    /// Buffer ended before the header did.
    #[error("truncated header at byte {0}")]
    Truncated(usize),

    /// The element type tag could not be mapped.
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Result alias for wire operations.
pub type WireResult<T> = Result<T, WireError>;
