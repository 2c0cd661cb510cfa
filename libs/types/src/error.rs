//! Shared error taxonomy for the data-plane connector (spec §7).
//!
//! Every crate in the workspace (codec, registry, recorder, push queue,
//! dispatcher) returns `ConnError` at its public boundary so a caller gets a
//! single consistent error surface no matter which component raised it. Each
//! crate may also keep its own richer internal error enum (the way the
//! teacher's `codec::ProtocolError` carries rich diagnostic context) and
//! convert it down to a `Kind` at the boundary.

use thiserror::Error;

/// The error kinds a registry, recorder, or push-queue operation can return.
///
/// `Ok` is deliberately not a variant here: success is represented by
/// `Result::Ok(T)`, not by a `Kind` value, matching how the teacher's
/// `ProtocolError`/`SinkError` enums only ever enumerate failure modes.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Path or entity does not exist.
    #[error("not found")]
    NotFound,
    /// Path / id collision at create.
    #[error("duplicate")]
    Duplicate,
    /// Malformed input: path syntax, type mismatch, bad CBOR.
    #[error("bad parameter")]
    BadParameter,
    /// Access mask forbids this operation for this side.
    #[error("not permitted")]
    NotPermitted,
    /// Encoded output does not fit destination buffer.
    #[error("overflow")]
    Overflow,
    /// Record buffer full; the just-applied mutation was rolled back.
    #[error("no memory")]
    NoMemory,
    /// Leaf is of type `none`, or the read is being handled asynchronously.
    #[error("unavailable")]
    Unavailable,
    /// Push queued; will be sent after the current in-flight entry.
    #[error("busy")]
    Busy,
    /// Push queue is saturated.
    #[error("not possible")]
    NotPossible,
    /// Any other structural failure.
    #[error("fault")]
    Fault,
}

/// `ConnError` pairs a `Kind` with a short human-readable context string, the
/// way the teacher's `ProtocolError` variants carry a `context`/`diagnosis`
/// field rather than a bare enum tag.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind}: {context}")]
pub struct ConnError {
    pub kind: Kind,
    pub context: String,
}

impl ConnError {
    pub fn new(kind: Kind, context: impl Into<String>) -> Self {
        Self {
            kind,
            context: context.into(),
        }
    }

    pub fn not_found(context: impl Into<String>) -> Self {
        Self::new(Kind::NotFound, context)
    }

    pub fn duplicate(context: impl Into<String>) -> Self {
        Self::new(Kind::Duplicate, context)
    }

    pub fn bad_parameter(context: impl Into<String>) -> Self {
        Self::new(Kind::BadParameter, context)
    }

    pub fn not_permitted(context: impl Into<String>) -> Self {
        Self::new(Kind::NotPermitted, context)
    }

    pub fn overflow(context: impl Into<String>) -> Self {
        Self::new(Kind::Overflow, context)
    }

    pub fn no_memory(context: impl Into<String>) -> Self {
        Self::new(Kind::NoMemory, context)
    }

    pub fn unavailable(context: impl Into<String>) -> Self {
        Self::new(Kind::Unavailable, context)
    }

    pub fn busy(context: impl Into<String>) -> Self {
        Self::new(Kind::Busy, context)
    }

    pub fn not_possible(context: impl Into<String>) -> Self {
        Self::new(Kind::NotPossible, context)
    }

    pub fn fault(context: impl Into<String>) -> Self {
        Self::new(Kind::Fault, context)
    }
}

pub type ConnResult<T> = std::result::Result<T, ConnError>;
