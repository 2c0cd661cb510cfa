//! # Push Queue
//!
//! Bounded FIFO of outbound payloads with message-id correlation, at-most-one
//! in-flight submission, ACK-driven drain, and a per-item `(done_fn, ctx)`
//! delivery callback (spec §4.D).
//!
//! The transport itself (the CoAP stack that actually puts bytes on the
//! wire) is out of scope; this crate only knows the [`PushTransport`] trait
//! boundary, the way the teacher's `message_sink` crate is handed a
//! `Sink` trait rather than owning socket code itself.

use conn_config::constants::{PUSH_PAYLOAD_CAP_BYTES, PUSH_QUEUE_DEPTH};
use conn_types::{ConnError, ConnResult};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Wire content-type tag for a push payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Cbor,
    ZippedCbor,
}

/// Delivery outcome reported to a push's `done_fn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Success,
    Failed,
}

/// What a transport submission attempt reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Accepted for send; carries the transport-assigned message id.
    Submitted(u64),
    /// Transport cannot accept right now; try again once clear.
    Busy,
    /// Hard failure; the attempt will not be retried.
    Fault(String),
}

/// The external collaborator that actually puts bytes on the wire.
pub trait PushTransport {
    fn submit(&mut self, payload: &[u8], content_type: ContentType) -> SubmitOutcome;
}

/// What `push` reports back to its caller on success. Distinct from
/// [`PushOutcome`], which is the later, asynchronous ACK result delivered to
/// `done_fn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushAccepted {
    /// Submitted to the transport immediately.
    InFlight(u64),
    /// Enqueued; will be attempted once the current in-flight entry (or
    /// transport congestion) clears. Corresponds to the `busy` kind in the
    /// error taxonomy, though it is not an error: the push was accepted.
    Queued,
}

type DoneFn<Ctx> = Box<dyn FnOnce(PushOutcome, Ctx)>;

struct Entry<Ctx> {
    message_id: Option<u64>,
    payload: Vec<u8>,
    content_type: ContentType,
    sent: bool,
    done: DoneFn<Ctx>,
    ctx: Option<Ctx>,
}

/// Fixed-capacity FIFO of outbound pushes (spec §4.D, §5 resource budgets).
pub struct PushQueue<Ctx> {
    capacity: usize,
    payload_cap: usize,
    entries: VecDeque<Entry<Ctx>>,
    in_flight: bool,
}

impl<Ctx> Default for PushQueue<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx> PushQueue<Ctx> {
    pub fn new() -> Self {
        Self::with_capacity(PUSH_QUEUE_DEPTH)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            payload_cap: PUSH_PAYLOAD_CAP_BYTES,
            entries: VecDeque::new(),
            in_flight: false,
        }
    }

    /// Override the per-payload byte cap (spec §5); `new`/`with_capacity`
    /// default to [`PUSH_PAYLOAD_CAP_BYTES`].
    pub fn with_payload_cap(mut self, payload_cap: usize) -> Self {
        self.payload_cap = payload_cap;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Enqueue a payload for delivery. `done` fires exactly once, when the
    /// transport reports the corresponding ACK (or immediately, on a hard
    /// transport failure).
    pub fn push(
        &mut self,
        transport: &mut impl PushTransport,
        payload: Vec<u8>,
        content_type: ContentType,
        done: impl FnOnce(PushOutcome, Ctx) + 'static,
        ctx: Ctx,
    ) -> ConnResult<PushAccepted> {
        if payload.len() > self.payload_cap {
            return Err(ConnError::overflow(format!(
                "push payload of {} bytes exceeds {}-byte cap",
                payload.len(),
                self.payload_cap
            )));
        }
        if self.entries.len() >= self.capacity {
            return Err(ConnError::not_possible(format!(
                "push queue saturated at capacity {}",
                self.capacity
            )));
        }

        // Fast path (immediate submit) only applies when nothing is ahead of
        // us in the FIFO: no in-flight submission and no leftover entries
        // still waiting for the transport to clear. Otherwise we'd violate
        // "submit order equals enqueue order" by jumping the queue.
        let fast_path = !self.in_flight && self.entries.is_empty();
        if !fast_path {
            debug!("push queue busy, enqueueing without submit attempt");
            self.entries.push_back(Entry {
                message_id: None,
                payload,
                content_type,
                sent: false,
                done: Box::new(done),
                ctx: Some(ctx),
            });
            return Ok(PushAccepted::Queued);
        }

        match transport.submit(&payload, content_type) {
            SubmitOutcome::Submitted(message_id) => {
                self.entries.push_back(Entry {
                    message_id: Some(message_id),
                    payload,
                    content_type,
                    sent: true,
                    done: Box::new(done),
                    ctx: Some(ctx),
                });
                self.in_flight = true;
                Ok(PushAccepted::InFlight(message_id))
            }
            SubmitOutcome::Busy => {
                self.entries.push_back(Entry {
                    message_id: None,
                    payload,
                    content_type,
                    sent: false,
                    done: Box::new(done),
                    ctx: Some(ctx),
                });
                Ok(PushAccepted::Queued)
            }
            SubmitOutcome::Fault(reason) => Err(ConnError::fault(format!(
                "push transport rejected submission: {reason}"
            ))),
        }
    }

    /// Deliver a transport ACK, correlated by message id: fires the
    /// matching entry's `done_fn`, removes it, clears in-flight, and attempts
    /// to submit the next `sent=false` entry.
    pub fn ack(&mut self, transport: &mut impl PushTransport, message_id: u64, outcome: PushOutcome) {
        let position = self
            .entries
            .iter()
            .position(|e| e.message_id == Some(message_id));
        let Some(position) = position else {
            warn!(message_id, "ACK for unknown or already-released push");
            return;
        };
        let mut entry = self.entries.remove(position).expect("position was just found");
        self.in_flight = false;
        if let Some(ctx) = entry.ctx.take() {
            (entry.done)(outcome, ctx);
        }
        self.drain_next(transport);
    }

    /// Retry the oldest not-yet-sent entry, if any. Callers invoke this when
    /// they learn the transport may have become available again outside of
    /// an ACK (e.g. a session reopening); the ACK path calls the same logic
    /// internally after every delivered push.
    pub fn retry_pending(&mut self, transport: &mut impl PushTransport) {
        self.drain_next(transport);
    }

    /// Scan for the first `sent=false` entry and attempt to submit it. At
    /// most one in-flight submission is attempted at a time.
    fn drain_next(&mut self, transport: &mut impl PushTransport) {
        if self.in_flight {
            return;
        }
        let Some(position) = self.entries.iter().position(|e| !e.sent) else {
            return;
        };
        let outcome = {
            let entry = &self.entries[position];
            transport.submit(&entry.payload, entry.content_type)
        };
        match outcome {
            SubmitOutcome::Submitted(message_id) => {
                let entry = &mut self.entries[position];
                entry.sent = true;
                entry.message_id = Some(message_id);
                self.in_flight = true;
            }
            SubmitOutcome::Busy => {
                // leave sent=false; will be retried on the next ACK or push
            }
            SubmitOutcome::Fault(reason) => {
                let mut entry = self.entries.remove(position).expect("position was just found");
                warn!(%reason, "push transport rejected drained entry");
                if let Some(ctx) = entry.ctx.take() {
                    (entry.done)(PushOutcome::Failed, ctx);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct ScriptedTransport {
        next_message_id: u64,
        responses: VecDeque<SubmitOutcome>,
    }

    impl ScriptedTransport {
        fn immediate() -> Self {
            Self {
                next_message_id: 1,
                responses: VecDeque::new(),
            }
        }

        fn queue_busy_once(mut self) -> Self {
            self.responses.push_back(SubmitOutcome::Busy);
            self
        }
    }

    impl PushTransport for ScriptedTransport {
        fn submit(&mut self, _payload: &[u8], _content_type: ContentType) -> SubmitOutcome {
            if let Some(scripted) = self.responses.pop_front() {
                return scripted;
            }
            let id = self.next_message_id;
            self.next_message_id += 1;
            SubmitOutcome::Submitted(id)
        }
    }

    #[test]
    fn push_submits_immediately_when_idle() {
        let mut queue = PushQueue::new();
        let mut transport = ScriptedTransport::immediate();
        let fired = Rc::new(RefCell::new(None));
        let fired_clone = fired.clone();

        let accepted = queue
            .push(
                &mut transport,
                vec![1, 2, 3],
                ContentType::Cbor,
                move |outcome, ctx: i32| *fired_clone.borrow_mut() = Some((outcome, ctx)),
                3,
            )
            .unwrap();

        assert_eq!(accepted, PushAccepted::InFlight(1));
        assert!(fired.borrow().is_none());

        queue.ack(&mut transport, 1, PushOutcome::Success);
        assert_eq!(*fired.borrow(), Some((PushOutcome::Success, 3)));
        assert!(queue.is_empty());
    }

    #[test]
    fn second_push_while_in_flight_is_queued_not_submitted() {
        let mut queue = PushQueue::new();
        let mut transport = ScriptedTransport::immediate();

        queue
            .push(&mut transport, vec![1], ContentType::Cbor, |_, _: ()| {}, ())
            .unwrap();
        let second = queue
            .push(&mut transport, vec![2], ContentType::Cbor, |_, _: ()| {}, ())
            .unwrap();

        assert_eq!(second, PushAccepted::Queued);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn ack_drains_next_queued_entry() {
        let mut queue = PushQueue::new();
        let mut transport = ScriptedTransport::immediate();
        let order = Rc::new(RefCell::new(Vec::new()));

        for i in 0..2 {
            let order = order.clone();
            queue
                .push(
                    &mut transport,
                    vec![i],
                    ContentType::Cbor,
                    move |_, ctx: u8| order.borrow_mut().push(ctx),
                    i,
                )
                .unwrap();
        }

        queue.ack(&mut transport, 1, PushOutcome::Success);
        assert_eq!(*order.borrow(), vec![0]);
        queue.ack(&mut transport, 2, PushOutcome::Success);
        assert_eq!(*order.borrow(), vec![0, 1]);
    }

    #[test]
    fn push_returns_not_possible_when_queue_is_full() {
        let mut queue: PushQueue<()> = PushQueue::with_capacity(1);
        let mut transport = ScriptedTransport::immediate();

        queue
            .push(&mut transport, vec![1], ContentType::Cbor, |_, _| {}, ())
            .unwrap();
        let err = queue
            .push(&mut transport, vec![2], ContentType::Cbor, |_, _| {}, ())
            .unwrap_err();
        assert_eq!(err.kind, conn_types::Kind::NotPossible);
    }

    #[test]
    fn push_rejects_payload_over_cap() {
        let mut queue: PushQueue<()> = PushQueue::new().with_payload_cap(4);
        let mut transport = ScriptedTransport::immediate();
        let err = queue
            .push(&mut transport, vec![0; 5], ContentType::Cbor, |_, _| {}, ())
            .unwrap_err();
        assert_eq!(err.kind, conn_types::Kind::Overflow);
        assert!(queue.is_empty(), "oversized payload must not be enqueued");
    }

    #[test]
    fn transport_busy_defers_entry_until_drain_succeeds() {
        let mut queue = PushQueue::new();
        let mut transport = ScriptedTransport::immediate().queue_busy_once();
        let fired = Rc::new(RefCell::new(false));
        let fired_clone = fired.clone();

        let accepted = queue
            .push(
                &mut transport,
                vec![9],
                ContentType::ZippedCbor,
                move |_, _: ()| *fired_clone.borrow_mut() = true,
                (),
            )
            .unwrap();
        assert_eq!(accepted, PushAccepted::Queued);
        assert!(!*fired.borrow());

        queue.retry_pending(&mut transport);
        assert!(!*fired.borrow()); // still in flight, not yet ACKed

        queue.ack(&mut transport, 1, PushOutcome::Success);
        assert!(*fired.borrow());
    }
}
