//! # Connector Dispatcher
//!
//! Maps an inbound CoAP request onto [`conn_registry::Registry`] operations
//! and translates the result into a CoAP response code (spec §4.E).
//!
//! Registry operations never fail loudly — every one returns a typed
//! `ConnResult` — so this crate's entire job is the translation table: GET
//! existing leaf is `2.05 Content`, PUT to an unknown non-ancestor path is
//! `4.00 Bad Request`, and so on. It depends on `conn-registry` the same way
//! the teacher's adapter binaries depend on `message_sink`: as the thing
//! that already knows how to store and gate access to the data, leaving
//! this crate to own only the wire-shaped request/response mapping.

use conn_codec::cbor;
use conn_registry::{ArgList, Registry, ServerReadOutcome};
use conn_types::{AssetDataPath, Kind, Side, Value};
use tracing::warn;

/// Inbound CoAP method (spec §6). Anything else observed on the wire is
/// `Other` and always yields `4.00` (spec §4.E "other | any | 4.00").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoapMethod {
    Get,
    Put,
    Post,
    Other,
}

/// Outcome of dispatching one request, already mapped to a CoAP response
/// code (spec §4.E). `DeferredRead` carries the ticket the event loop
/// correlates with the request's echoed token once
/// [`Registry::drain_completed_reads`] reports it done; `DeferredExec`
/// carries nothing; the gateway's event loop is what actually owns
/// correlating a deferred execute with the later `reply_exec_result` call
/// (spec §5), which is out of scope for this crate.
#[derive(Debug)]
pub enum CoapResponse {
    /// `2.05 Content`.
    Content(Vec<u8>),
    /// `2.04 Changed`.
    Changed,
    /// A server-driven read is deferred to a registered handler.
    DeferredRead(conn_registry::PendingReadHandle),
    /// An execute handler was invoked; the application replies later.
    DeferredExec,
    /// `4.00 Bad Request`.
    BadRequest(String),
    /// `4.01 Unauthorized`.
    Unauthorized(String),
    /// `4.04 Not Found`.
    NotFound(String),
    /// `5.00 Internal Server Error`.
    InternalServerError(String),
}

/// Dispatch one inbound request against `registry` (spec §4.E).
pub fn dispatch<Ctx>(
    registry: &mut Registry<Ctx>,
    method: CoapMethod,
    uri: &str,
    payload: &[u8],
    ctx: &mut Ctx,
) -> CoapResponse {
    let path = match uri.parse::<AssetDataPath>() {
        Ok(path) => path,
        Err(e) => return CoapResponse::BadRequest(format!("malformed uri {uri:?}: {e}")),
    };

    match method {
        CoapMethod::Get => dispatch_get(registry, &path, ctx),
        CoapMethod::Put => dispatch_put(registry, &path, payload),
        CoapMethod::Post => dispatch_post(registry, &path, payload, ctx),
        CoapMethod::Other => CoapResponse::BadRequest("unsupported method".to_string()),
    }
}

fn dispatch_get<Ctx>(registry: &mut Registry<Ctx>, path: &AssetDataPath, ctx: &mut Ctx) -> CoapResponse {
    if registry.contains(path) {
        return match registry.server_read(path, ctx) {
            Ok(ServerReadOutcome::Ready(value)) => encode_leaf_response(&value),
            Ok(ServerReadOutcome::Deferred(ticket)) => CoapResponse::DeferredRead(ticket),
            // Leaf exists and is type `none` with no handler to intercept
            // the read: still a `2.05`, carrying the null encoding (spec
            // §4.E lists no separate code for an unset leaf; `encode_leaf`
            // already has a wire representation for `Value::None`).
            Err(e) if e.kind == Kind::Unavailable => encode_leaf_response(&Value::None),
            Err(e) if e.kind == Kind::NotPermitted => {
                CoapResponse::Unauthorized(e.context)
            }
            Err(e) => CoapResponse::InternalServerError(e.context),
        };
    }
    if registry.is_ancestor_of_any(path) {
        let leaves = registry.enumerate_subtree(path, Side::Server);
        return match cbor::encode_subtree(path, &leaves) {
            Ok(bytes) => CoapResponse::Content(bytes),
            Err(e) => CoapResponse::InternalServerError(e.to_string()),
        };
    }
    CoapResponse::NotFound(format!("path {path} does not exist"))
}

fn encode_leaf_response(value: &Value) -> CoapResponse {
    match cbor::encode_leaf(value) {
        Ok(bytes) => CoapResponse::Content(bytes),
        Err(e) => CoapResponse::InternalServerError(e.to_string()),
    }
}

fn dispatch_put<Ctx>(registry: &mut Registry<Ctx>, path: &AssetDataPath, payload: &[u8]) -> CoapResponse {
    if registry.contains(path) {
        let value = match cbor::decode_leaf(payload) {
            Ok(value) => value,
            Err(e) => return CoapResponse::BadRequest(format!("decode error: {e}")),
        };
        return match registry.set_value(path, value, Side::Server) {
            Ok(()) => CoapResponse::Changed,
            Err(e) => map_set_error(e.kind, e.context),
        };
    }

    if registry.is_ancestor_of_any(path) {
        let writes = match cbor::decode_write_payload(path, payload) {
            Ok(writes) => writes,
            Err(e) => return CoapResponse::BadRequest(format!("decode error: {e}")),
        };
        for (leaf, value) in writes {
            if let Err(e) = registry.set_value(&leaf, value, Side::Server) {
                return map_set_error(e.kind, e.context);
            }
        }
        return CoapResponse::Changed;
    }

    CoapResponse::BadRequest(format!("path {path} does not exist"))
}

fn map_set_error(kind: Kind, context: String) -> CoapResponse {
    match kind {
        Kind::NotPermitted => CoapResponse::Unauthorized(context),
        Kind::NotFound | Kind::BadParameter | Kind::Duplicate => CoapResponse::BadRequest(context),
        _ => CoapResponse::InternalServerError(context),
    }
}

fn dispatch_post<Ctx>(
    registry: &mut Registry<Ctx>,
    path: &AssetDataPath,
    payload: &[u8],
    ctx: &mut Ctx,
) -> CoapResponse {
    if !registry.contains(path) {
        return CoapResponse::NotFound(format!("path {path} does not exist"));
    }
    let mode = match registry.mode_of(path) {
        Ok(mode) => mode,
        Err(e) => return CoapResponse::InternalServerError(e.context),
    };
    if !mode.access_for(Side::Server).can_exec() {
        return CoapResponse::Unauthorized(format!("path {path} is not executable"));
    }
    let args = match cbor::decode_execute_payload(payload) {
        Ok(args) => ArgList::new(args),
        Err(e) => return CoapResponse::BadRequest(format!("decode error: {e}")),
    };
    if registry.execute(path, &args, ctx) {
        CoapResponse::DeferredExec
    } else {
        warn!(%path, "executable path has no registered handler");
        CoapResponse::NotFound(format!("no handler registered for {path}"))
    }
}
