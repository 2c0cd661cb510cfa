//! # Connector Recorder
//!
//! The time-series accumulator component (spec §2.C, §4.C): bounded CBOR
//! records addressed by opaque handle, with delta encoding, overflow
//! rollback, and push-through-the-queue-then-reset semantics.
//!
//! Sits beside `conn-registry` in the workspace, depending on `conn-codec`
//! for wire encoding and `conn-pushqueue` for delivery — the same
//! accumulate-then-hand-to-a-sink layering the teacher's adapters give the
//! market-data types they build before handing them to `message_sink`. The
//! bounded-buffer, delta-encoding and rollback-on-overflow mechanics below
//! are this crate's own; there is no teacher precedent for that specific
//! combination.

pub mod model;

use conn_codec::compress::deflate_best;
use conn_config::constants::RECORDER_BUFFER_BYTES;
use conn_pushqueue::{ContentType, PushAccepted, PushOutcome, PushQueue, PushTransport};
use conn_types::{ConnError, ConnResult, Handle, Slab, Value};
use model::Record;
use tracing::debug;

pub use model::Record as RecorderRecord;

/// Opaque reference to one live [`Record`] (spec §9 Design Notes: the
/// "record-ref" the source passed as a safe pointer becomes a generational
/// handle here, exactly like [`conn_types::Handle`] elsewhere in the
/// workspace).
pub type RecordHandle = Handle<Record>;

/// Owns every live time-series record (spec §2.C). One `Recorder` per
/// connector instance; records are created and destroyed explicitly by the
/// caller (the dispatcher, on behalf of application code), not implicitly.
#[derive(Default)]
pub struct Recorder {
    records: Slab<Record>,
    buffer_cap: usize,
}

impl Recorder {
    pub fn new() -> Self {
        Self::with_buffer_cap(RECORDER_BUFFER_BYTES)
    }

    pub fn with_buffer_cap(buffer_cap: usize) -> Self {
        Self {
            records: Slab::new(),
            buffer_cap,
        }
    }

    /// Create a new, empty record (spec §4.C).
    pub fn create(&mut self) -> RecordHandle {
        self.records.insert(Record::new(self.buffer_cap))
    }

    /// Destroy a record. Returns `not-found` if the handle is stale or
    /// already destroyed.
    pub fn delete(&mut self, handle: RecordHandle) -> ConnResult<()> {
        self.records
            .remove(handle)
            .map(|_| ())
            .ok_or_else(|| ConnError::not_found("delete: unknown or already-deleted record"))
    }

    fn get_mut(&mut self, handle: RecordHandle) -> ConnResult<&mut Record> {
        self.records
            .get_mut(handle)
            .ok_or_else(|| ConnError::not_found("unknown or already-deleted record"))
    }

    pub fn get(&self, handle: RecordHandle) -> ConnResult<&Record> {
        self.records
            .get(handle)
            .ok_or_else(|| ConnError::not_found("unknown or already-deleted record"))
    }

    pub fn add_int(&mut self, handle: RecordHandle, name: &str, value: i64, ts: i64) -> ConnResult<()> {
        self.get_mut(handle)?.add(name, Value::Int(value), ts)
    }

    pub fn add_float(&mut self, handle: RecordHandle, name: &str, value: f64, ts: i64) -> ConnResult<()> {
        self.get_mut(handle)?.add(name, Value::Float(value), ts)
    }

    pub fn add_bool(&mut self, handle: RecordHandle, name: &str, value: bool, ts: i64) -> ConnResult<()> {
        self.get_mut(handle)?.add(name, Value::Bool(value), ts)
    }

    pub fn add_string(&mut self, handle: RecordHandle, name: &str, value: impl Into<String>, ts: i64) -> ConnResult<()> {
        let value = Value::string(value)?;
        self.get_mut(handle)?.add(name, value, ts)
    }

    /// Compress the record's current frame and enqueue it for delivery
    /// (spec §4.C, §4.D). On success (submitted immediately or queued
    /// behind an in-flight push) the record is reset to empty, ready for
    /// new samples; on failure the record is left untouched so the caller
    /// can retry.
    pub fn push<Ctx: 'static>(
        &mut self,
        handle: RecordHandle,
        transport: &mut impl PushTransport,
        queue: &mut PushQueue<Ctx>,
        done: impl FnOnce(PushOutcome, Ctx) + 'static,
        ctx: Ctx,
    ) -> ConnResult<PushAccepted> {
        let record = self.get_mut(handle)?;
        if record.is_empty() {
            return Err(ConnError::bad_parameter("push: record has no samples"));
        }
        let compressed = deflate_best(record.encoded_bytes())
            .map_err(|e| ConnError::fault(format!("recorder push compression failed: {e}")))?;
        let accepted = queue.push(transport, compressed, ContentType::ZippedCbor, done, ctx)?;
        debug!(sample_count = record.sample_count(), "record pushed, resetting");
        record.reset();
        Ok(accepted)
    }
}
