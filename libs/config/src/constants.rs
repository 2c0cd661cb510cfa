//! Fixed resource budgets (spec §5). These are structural limits the wire
//! formats and in-memory buffers are built around, not tunables — unlike
//! `ServiceConfig`, nothing here is read from a file.

/// Maximum length, in bytes, of a stored string value. Mirrors
/// `conn_types::MAX_STRING_BYTES`; kept here too so non-`conn-types` crates
/// (config loading, the gateway binary) have a single place to cite it
/// alongside the other budgets without pulling in the types crate.
pub const MAX_STRING_BYTES: usize = 256;

/// Target size of a time-series record's CBOR scratch buffer.
pub const RECORDER_BUFFER_BYTES: usize = 1024;

/// Maximum size of a single push payload (CBOR or zipped CBOR).
pub const PUSH_PAYLOAD_CAP_BYTES: usize = 4096;

/// Push queue depth: number of entries the FIFO holds before `push` reports
/// `not-possible`.
pub const PUSH_QUEUE_DEPTH: usize = 10;

/// Maximum byte width of an observer token.
pub const MAX_OBSERVER_TOKEN_BYTES: usize = 8;

/// Registration-update debounce window, in seconds (spec §4.B).
pub const REGISTRATION_UPDATE_DEBOUNCE_SECS: u64 = 1;
