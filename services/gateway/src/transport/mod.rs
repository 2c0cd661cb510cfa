//! The CoAP transport boundary (spec §1, §6): the gateway only knows this
//! trait, not any particular CoAP stack, the same separation
//! `conn_pushqueue::PushTransport` draws for outbound pushes.

pub mod memory;

use conn_dispatcher::{CoapMethod, CoapResponse};

/// One inbound CoAP request surfaced by the transport (spec §6).
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: CoapMethod,
    pub uri: String,
    pub payload: Vec<u8>,
    pub token: Vec<u8>,
}

/// The external collaborator that speaks CoAP on the wire. Out of scope
/// for this workspace (spec §1); only the trait boundary lives here, plus
/// the [`memory::MemoryTransport`] test double.
pub trait CoapTransport {
    /// Non-blocking poll for the next inbound request, if any.
    fn poll_request(&mut self) -> Option<InboundRequest>;

    /// Send a response, correlated to the request's echoed `token` (spec
    /// §6). Used for both immediate and deferred responses.
    fn send_response(&mut self, token: &[u8], response: CoapResponse);

    /// Send the registration-update body fired by the debounce timer
    /// (spec §4.B, §6).
    fn send_registration_update(&mut self, body: &str);
}
