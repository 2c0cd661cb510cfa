//! # Connector Registry
//!
//! The asset/instance/field tree, the flat asset-data path store, access
//! control, observer tokens, handler dispatch, the registration-update
//! debounce, and the session facade (spec §2 components B and F, §3, §4.B,
//! §4.F).
//!
//! This crate is the hub of the workspace: it depends on `conn-codec` (for
//! CBOR push payloads) and `conn-pushqueue` (for `push`), and is in turn
//! depended on by `conn-dispatcher` and the `conn-gateway` binary, the same
//! position the teacher's `message_sink` crate occupies relative to
//! `codec`/`network` below it and the adapter binaries above it.

pub mod handler;
pub mod model;
pub mod pending;
pub mod registry;
pub mod session;
pub mod timer;

pub use handler::{ActionKind, ArgList, Handler};
pub use model::{bootstrap_object_9, Asset, Field, FieldSpec, Instance, ObjectModel};
pub use pending::{PendingReadHandle, PendingReadTable};
pub use registry::{Registry, ServerReadOutcome};
pub use session::{AvcCore, CoreOpenResult, SessionFacade, SessionRequestTag, SessionState};
pub use timer::{DebounceTimer, RegistrationUpdateDebouncer};
