//! # Connector Codec
//!
//! Wire encode/decode for the device-resident LWM2M/AirVantage data-plane
//! connector: LWM2M TLV (`tlv`), CBOR key/value and recorder-frame payloads
//! (`cbor`), and deflate compression for archival/push payloads
//! (`compress`).
//!
//! This crate knows the wire shapes only. It is handed plain values
//! (`conn_types::Value`, `AssetDataPath`) by callers and returns plain
//! values back; it has no notion of the registry's Asset/Instance/Field
//! tree or access control, the same separation the teacher keeps between
//! its `codec` crate and the message types `message_sink` builds from it.

pub mod cbor;
pub mod compress;
pub mod error;
pub mod tlv;

pub use error::{CodecError, CodecResult};
