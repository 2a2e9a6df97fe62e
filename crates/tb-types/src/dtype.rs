use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Element types the transfer path supports.
///
/// This is the full enumerable mapping between the runtime's numeric types
/// and the store's wire tags. Anything outside this enum (strings, variants,
/// quantized types) is rejected at the boundary with
/// [`TypeError::Unsupported`] -- unrecoverable, never retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F16,
    F32,
    F64,
}

/// Store-side type tag carried in the serialized tensor header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WireTag(pub u8);

impl DType {
    /// Width of one element in bytes.
    pub fn element_width(&self) -> usize {
        match self {
            DType::Bool | DType::I8 | DType::U8 => 1,
            DType::I16 | DType::U16 | DType::F16 => 2,
            DType::I32 | DType::U32 | DType::F32 => 4,
            DType::I64 | DType::U64 | DType::F64 => 8,
        }
    }

    /// The store's wire tag for this element type.
    ///
    /// Total over the enum: every supported `DType` has a tag. Runtime types
    /// that never map into this enum are the unsupported ones.
    pub fn wire_tag(&self) -> WireTag {
        WireTag(match self {
            DType::Bool => 0,
            DType::I8 => 1,
            DType::I16 => 2,
            DType::I32 => 3,
            DType::I64 => 4,
            DType::U8 => 5,
            DType::U16 => 6,
            DType::U32 => 7,
            DType::U64 => 8,
            DType::F16 => 9,
            DType::F32 => 10,
            DType::F64 => 11,
        })
    }

    /// Reverse the wire-tag mapping. Unknown tags are a type error.
    pub fn from_wire_tag(tag: WireTag) -> Result<Self, TypeError> {
        Ok(match tag.0 {
            0 => DType::Bool,
            1 => DType::I8,
            2 => DType::I16,
            3 => DType::I32,
            4 => DType::I64,
            5 => DType::U8,
            6 => DType::U16,
            7 => DType::U32,
            8 => DType::U64,
            9 => DType::F16,
            10 => DType::F32,
            11 => DType::F64,
            other => return Err(TypeError::Unsupported(format!("wire tag {other}"))),
        })
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::Bool => "bool",
            DType::I8 => "i8",
            DType::I16 => "i16",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::U8 => "u8",
            DType::U16 => "u16",
            DType::U32 => "u32",
            DType::U64 => "u64",
            DType::F16 => "f16",
            DType::F32 => "f32",
            DType::F64 => "f64",
        };
        write!(f, "{name}")
    }
}
