//! Deflate compression for the recorder's "zipped CBOR" push content type
//! (spec §4.C: "final encode → deflate (best compression) → enqueue").

use crate::error::{CodecError, CodecResult};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

/// Compress a CBOR-encoded buffer with deflate at best-compression level.
pub fn deflate_best(data: &[u8]) -> CodecResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(data)
        .map_err(|e| CodecError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CodecError::Compression(e.to_string()))
}
