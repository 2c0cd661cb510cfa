//! # Connector Core Types
//!
//! The data model shared by every crate in the device-resident LWM2M/AirVantage
//! data-plane connector: asset-data paths, the tagged field value, access
//! control, and the error taxonomy every operation in the workspace returns.
//!
//! This crate has no dependency on `conn-codec`, `conn-registry`, or any other
//! workspace crate — it is the leaf of the dependency graph, the role the
//! teacher's `types` crate plays for `codec` and the rest of the Torq stack.

pub mod access;
pub mod error;
pub mod handle;
pub mod path;
pub mod value;

pub use access::{AccessMask, ResourceMode, Side};
pub use error::{ConnError, ConnResult, Kind};
pub use handle::{Handle, Slab};
pub use path::{AssetDataPath, RESERVED_FIRST_SEGMENTS};
pub use value::{check_type_stable, FieldType, Value, MAX_STRING_BYTES};

/// Maximum byte width of an observer token (spec §3, §5).
pub const MAX_OBSERVER_TOKEN_BYTES: usize = 8;
