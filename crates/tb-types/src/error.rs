/// Errors from type construction and element-type mapping.
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    /// The runtime element type has no store wire tag.
    #[error("unsupported element type: {0}")]
    Unsupported(String),

    /// Two tensors in one operation disagree on element type.
    #[error("element type mismatch: expected {expected}, found {found}")]
    Mismatch { expected: String, found: String },

    /// A fixed-length binary value had the wrong length.
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// A hex string could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}
