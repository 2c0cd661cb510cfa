//! An in-memory stand-in for the real CoAP stack (spec §1 "out of scope:
//! the CoAP transport"). Lets the gateway's wiring be exercised end-to-end
//! in tests without a socket, the way the teacher's adapter crates keep a
//! `MockExchange`/scripted transport beside the real websocket client.
//!
//! **Not production code.** A real binary needs an actual CoAP stack
//! behind [`super::CoapTransport`] and [`conn_pushqueue::PushTransport`].

use super::{CoapTransport, InboundRequest};
use conn_dispatcher::CoapResponse;
use conn_pushqueue::{ContentType, PushTransport, SubmitOutcome};
use std::collections::VecDeque;

/// One response or registration-update line recorded by [`MemoryTransport`]
/// for a test to assert against.
#[derive(Debug)]
pub enum Recorded {
    Response { token: Vec<u8>, response: CoapResponse },
    RegistrationUpdate(String),
    Push { payload: Vec<u8>, content_type: ContentType },
}

#[derive(Default)]
pub struct MemoryTransport {
    inbound: VecDeque<InboundRequest>,
    pub recorded: Vec<Recorded>,
    next_message_id: u64,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            inbound: VecDeque::new(),
            recorded: Vec::new(),
            next_message_id: 1,
        }
    }

    /// Queue a request as if it had just arrived over CoAP.
    pub fn inject_request(&mut self, request: InboundRequest) {
        self.inbound.push_back(request);
    }
}

impl CoapTransport for MemoryTransport {
    fn poll_request(&mut self) -> Option<InboundRequest> {
        self.inbound.pop_front()
    }

    fn send_response(&mut self, token: &[u8], response: CoapResponse) {
        self.recorded.push(Recorded::Response {
            token: token.to_vec(),
            response,
        });
    }

    fn send_registration_update(&mut self, body: &str) {
        self.recorded.push(Recorded::RegistrationUpdate(body.to_string()));
    }
}

impl PushTransport for MemoryTransport {
    fn submit(&mut self, payload: &[u8], content_type: ContentType) -> SubmitOutcome {
        self.recorded.push(Recorded::Push {
            payload: payload.to_vec(),
            content_type,
        });
        let id = self.next_message_id;
        self.next_message_id += 1;
        SubmitOutcome::Submitted(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injected_request_is_polled_back_out() {
        let mut transport = MemoryTransport::new();
        transport.inject_request(InboundRequest {
            method: conn_dispatcher::CoapMethod::Get,
            uri: "/asset/v".to_string(),
            payload: Vec::new(),
            token: vec![1, 2],
        });
        let request = transport.poll_request().unwrap();
        assert_eq!(request.uri, "/asset/v");
        assert!(transport.poll_request().is_none());
    }
}
