//! Codec-level errors with diagnostic context, in the style of the teacher's
//! `codec::ProtocolError` (rich per-variant fields rather than bare tags).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    #[error("TLV buffer too small: need {need} bytes, got {got} (context: {context})")]
    BufferTooSmall {
        need: usize,
        got: usize,
        context: String,
    },

    #[error("Truncated TLV at offset {offset}: need {need} bytes, buffer has {got}")]
    TruncatedTlv {
        offset: usize,
        need: usize,
        got: usize,
    },

    #[error("Unsupported int length {0} bytes at offset {1} (legal: 1, 2, 4)")]
    UnsupportedIntLength(usize, usize),

    #[error("Unsupported float length {0} bytes at offset {1} (legal: 4, 8)")]
    UnsupportedFloatLength(usize, usize),

    #[error("Unsupported bool length {0} bytes at offset {1} (legal: 1)")]
    UnsupportedBoolLength(usize, usize),

    #[error("String value of {0} bytes exceeds the {1}-byte storage cap")]
    StringTooLong(usize, usize),

    #[error("Malformed UTF-8 in string TLV at offset {0}")]
    InvalidUtf8(usize),

    #[error("Decoder expected a sequence of resource TLVs at the top level, found object-instance TLV at offset {0}")]
    ExpectedResourceSequence(usize),

    #[error("Unknown TLV kind bits {0:#04b} at offset {1}")]
    UnknownKind(u8, usize),

    #[error("The `none` field type cannot be TLV-encoded (field id {0})")]
    NoneNotWritable(u16),

    #[error("CBOR encode failed: {0}")]
    CborEncode(String),

    #[error("CBOR decode failed: {0}")]
    CborDecode(String),

    #[error("CBOR payload was not the expected shape: {0}")]
    CborShape(String),

    #[error("Path reconstruction failed while walking a CBOR write map: {0}")]
    PathReconstruction(String),

    #[error("Deflate compression failed: {0}")]
    Compression(String),
}

impl From<CodecError> for conn_types::ConnError {
    fn from(e: CodecError) -> Self {
        use conn_types::Kind;
        let kind = match &e {
            CodecError::BufferTooSmall { .. } => Kind::Overflow,
            CodecError::StringTooLong(..) => Kind::BadParameter,
            CodecError::NoneNotWritable(_) => Kind::BadParameter,
            _ => Kind::BadParameter,
        };
        conn_types::ConnError::new(kind, e.to_string())
    }
}

pub type CodecResult<T> = std::result::Result<T, CodecError>;
