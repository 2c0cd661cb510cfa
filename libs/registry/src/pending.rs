//! Pending-read ticket table (spec §4.B read-intercept semantics, §7, §9
//! Open Question).
//!
//! When a server-driven read hits a path with a registered handler, the
//! handler runs synchronously (it may or may not write a fresh value
//! within that same call). If it didn't, the read can't complete yet: a
//! ticket is opened here, keyed by an opaque handle the caller (the
//! dispatcher) associates with the deferred CoAP response. The next
//! `set_*` on that same path — from the handler, whenever it gets around
//! to it — completes the ticket; the event loop drains completions once
//! per tick and sends the deferred responses.

use conn_types::{AssetDataPath, Handle, Slab, Value};

pub struct PendingReadSlot {
    path: AssetDataPath,
}

/// Opaque handle identifying one outstanding deferred read.
pub type PendingReadHandle = Handle<PendingReadSlot>;

#[derive(Default)]
pub struct PendingReadTable {
    slots: Slab<PendingReadSlot>,
    completed: Vec<(PendingReadHandle, Value)>,
}

impl PendingReadTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a ticket for a read that could not complete synchronously.
    pub fn open(&mut self, path: AssetDataPath) -> PendingReadHandle {
        self.slots.insert(PendingReadSlot { path })
    }

    /// Called after any `set_*` on `path`. Completes and removes every
    /// outstanding ticket for that exact path, queuing `(handle, value)`
    /// for the caller to drain.
    pub fn complete_for_path(&mut self, path: &AssetDataPath, value: &Value) {
        let matches: Vec<PendingReadHandle> = self
            .slots
            .iter()
            .filter(|(_, slot)| &slot.path == path)
            .map(|(handle, _)| handle)
            .collect();
        for handle in matches {
            self.slots.remove(handle);
            self.completed.push((handle, value.clone()));
        }
    }

    /// Drain every ticket completed since the last drain. The event loop
    /// calls this once per tick (spec §5: handlers run to completion
    /// before the next event is dispatched, but a completion may lag the
    /// request that opened the ticket).
    pub fn drain_completed(&mut self) -> Vec<(PendingReadHandle, Value)> {
        std::mem::take(&mut self.completed)
    }

    pub fn is_pending(&self, handle: PendingReadHandle) -> bool {
        self.slots.get(handle).is_some()
    }

    pub fn outstanding(&self) -> usize {
        self.slots.len()
    }
}
