/// Errors that can occur while exporting a mesh set.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// An LZ4 block input exceeded `MAX_BLOCK_INPUT_SIZE`.
    #[error("input too large for LZ4 block: {len} bytes exceeds {max}")]
    InputTooLarge { len: usize, max: usize },

    /// A tree attribute carries a `ValueType` the Crate writer does not implement.
    #[error("unsupported value type on attribute {attribute:?}: {value_type}")]
    UnsupportedValueType { attribute: String, value_type: String },

    /// Prim metadata named a key the Crate writer does not implement (e.g. `references`).
    #[error("metadata key {key:?} on prim {prim:?} is not implemented")]
    UnimplementedMetadata { prim: String, key: String },

    /// A mesh violated a structural invariant (index out of range, length mismatch, ...).
    #[error("malformed mesh for color #{color:06x}: {reason}")]
    MalformedMesh { color: u32, reason: String },

    /// I/O error surfaced by a writer that was handed a fallible sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
