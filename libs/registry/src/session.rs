//! Session facade (spec §4.F): session-started/stopped notifications over a
//! reference-counted session request.
//!
//! `request_session` returns an opaque [`conn_types::Handle`] rather than
//! bumping a bare counter a caller could double-release; `release_session`
//! consumes that handle. This is the "opaque handle" design note applied to
//! the session-request-ref the source passed around as a safe reference.

use conn_types::{ConnError, ConnResult, Handle, Slab};
use tracing::debug;

/// Observed state of the device-management dialog with the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Started,
    Stopped,
}

/// The external AVC core's report of whether it opened a session that was
/// already open before this subsystem's first request arrived (spec §4.F,
/// §9 Open Question). `AlreadyOpen` matters only for the first request: it
/// means a `started` event is still delivered synchronously to the caller,
/// but `release_session` must not close a session this subsystem never
/// opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreOpenResult {
    Opened,
    AlreadyOpen,
}

/// The external collaborator that actually owns the device-management
/// dialog. Out of scope for this crate (spec §1); only the trait boundary
/// lives here.
pub trait AvcCore {
    fn open_session(&mut self) -> CoreOpenResult;
    fn close_session(&mut self);
}

/// Tag type for an outstanding `request_session` call, tracked so
/// `release_session` can be handed the exact handle it returned rather
/// than a bare decrement.
pub struct SessionRequestTag;

type Listener = Box<dyn FnMut(SessionState)>;

/// Reference-counted session facade (spec §4.F, §2.F).
pub struct SessionFacade {
    requests: Slab<SessionRequestTag>,
    pre_acquired: bool,
    listeners: Vec<Listener>,
}

impl Default for SessionFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionFacade {
    pub fn new() -> Self {
        Self {
            requests: Slab::new(),
            pre_acquired: false,
            listeners: Vec::new(),
        }
    }

    pub fn add_listener(&mut self, listener: impl FnMut(SessionState) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&mut self, state: SessionState) {
        for listener in &mut self.listeners {
            listener(state);
        }
    }

    /// Outstanding request count (spec §8 testable property 9: exactly as
    /// many closes as opens once the counter returns to zero).
    pub fn outstanding(&self) -> usize {
        self.requests.len()
    }

    /// First request opens the underlying core session; if the core reports
    /// it was already open, a `started` event fires synchronously so
    /// callers see uniform semantics either way (spec §4.F).
    pub fn request_session(&mut self, core: &mut impl AvcCore) -> Handle<SessionRequestTag> {
        let was_empty = self.requests.is_empty();
        let handle = self.requests.insert(SessionRequestTag);
        if was_empty {
            match core.open_session() {
                CoreOpenResult::Opened => {
                    debug!("session opened by first request_session");
                    self.notify(SessionState::Started);
                }
                CoreOpenResult::AlreadyOpen => {
                    debug!("session was already open; delivering synthetic started event");
                    self.pre_acquired = true;
                    self.notify(SessionState::Started);
                }
            }
        }
        handle
    }

    /// Release a previously-returned handle. The underlying core is asked
    /// to close only when the counter returns to zero **and** the session
    /// was not pre-acquired by another subsystem (spec §4.F, §9 Open
    /// Question: this is the conservative reading that never closes a
    /// session another subsystem still expects open).
    pub fn release_session(
        &mut self,
        core: &mut impl AvcCore,
        handle: Handle<SessionRequestTag>,
    ) -> ConnResult<()> {
        self.requests
            .remove(handle)
            .ok_or_else(|| ConnError::not_found("release_session: handle already released or unknown"))?;
        if self.requests.is_empty() {
            if self.pre_acquired {
                debug!("counter reached zero but session was pre-acquired externally; not closing");
            } else {
                debug!("counter reached zero; closing session");
                core.close_session();
                self.notify(SessionState::Stopped);
            }
            self.pre_acquired = false;
        }
        Ok(())
    }
}
