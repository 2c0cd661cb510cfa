//! Field / asset-data value model (spec §3, §4.A, §4.B).

use crate::error::ConnError;
use std::fmt;

/// Maximum length, in bytes, of a stored string value (spec §5).
pub const MAX_STRING_BYTES: usize = 256;

/// The type tag of a field or asset-data leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    None,
    Int,
    Bool,
    String,
    Float,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldType::None => "none",
            FieldType::Int => "int",
            FieldType::Bool => "bool",
            FieldType::String => "string",
            FieldType::Float => "float",
        };
        f.write_str(s)
    }
}

/// A tagged field/leaf value. `None` represents the `none` type (spec §3):
/// a field that has been explicitly nulled, which any subsequent `get`
/// reports as `unavailable` rather than returning a default.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Int(i64),
    Bool(bool),
    String(String),
    Float(f64),
}

impl Value {
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::None => FieldType::None,
            Value::Int(_) => FieldType::Int,
            Value::Bool(_) => FieldType::Bool,
            Value::String(_) => FieldType::String,
            Value::Float(_) => FieldType::Float,
        }
    }

    /// Build a `Value::String`, enforcing the 256-byte storage cap (spec §5).
    pub fn string(s: impl Into<String>) -> Result<Self, ConnError> {
        let s = s.into();
        if s.len() > MAX_STRING_BYTES {
            return Err(ConnError::bad_parameter(format!(
                "string value of {} bytes exceeds {MAX_STRING_BYTES}-byte cap",
                s.len()
            )));
        }
        Ok(Value::String(s))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }
}

/// Type-stability check for a write (spec §3 invariant): once a path has a
/// non-`none` type, subsequent writes must carry a compatible value.
pub fn check_type_stable(existing: FieldType, incoming: FieldType) -> Result<(), ConnError> {
    if existing == FieldType::None || existing == incoming {
        Ok(())
    } else {
        Err(ConnError::bad_parameter(format!(
            "type mismatch: field is {existing}, write carried {incoming}"
        )))
    }
}
