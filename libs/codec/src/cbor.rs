//! CBOR codec for key/value payloads between device and server (spec §4.A),
//! plus the time-series recorder's `"h"/"f"/"s"` wire frame (spec §4.C),
//! which the recorder crate asks this crate to serialize rather than
//! reaching for `serde_cbor` itself.
//!
//! Built on `serde_cbor::Value` rather than a fixed `#[derive(Serialize)]`
//! struct, the same way the corpus reaches for `serde_json::Value` when a
//! payload's shape is assembled dynamically (map depth driven by a runtime
//! path tree) instead of known at compile time.

use crate::error::{CodecError, CodecResult};
use conn_types::{AssetDataPath, Value};
use serde_cbor::Value as Cbor;
use std::collections::BTreeMap;

/// The literal text the wire uses for a single `none`-typed leaf (spec §4.A).
const NULL_LEAF_TEXT: &str = "(null)";

fn value_to_cbor(value: &Value) -> Cbor {
    match value {
        Value::None => Cbor::Text(NULL_LEAF_TEXT.to_string()),
        Value::Int(i) => Cbor::Integer(*i as i128),
        Value::Bool(b) => Cbor::Bool(*b),
        Value::String(s) => Cbor::Text(s.clone()),
        Value::Float(f) => Cbor::Float(*f),
    }
}

fn cbor_to_value(cbor: &Cbor) -> CodecResult<Value> {
    match cbor {
        Cbor::Null => Ok(Value::None),
        Cbor::Text(s) if s == NULL_LEAF_TEXT => Ok(Value::None),
        Cbor::Text(s) => Ok(Value::String(s.clone())),
        Cbor::Bool(b) => Ok(Value::Bool(*b)),
        Cbor::Integer(i) => Ok(Value::Int(*i as i64)),
        Cbor::Float(f) => Ok(Value::Float(*f)),
        other => Err(CodecError::CborShape(format!(
            "leaf value is not a scalar CBOR type: {other:?}"
        ))),
    }
}

/// Encode a single-leaf read response: a bare CBOR scalar.
pub fn encode_leaf(value: &Value) -> CodecResult<Vec<u8>> {
    serde_cbor::to_vec(&value_to_cbor(value)).map_err(|e| CodecError::CborEncode(e.to_string()))
}

/// Decode a single-leaf value (the response to a leaf read, or the payload
/// of a leaf write).
pub fn decode_leaf(bytes: &[u8]) -> CodecResult<Value> {
    let cbor: Cbor =
        serde_cbor::from_slice(bytes).map_err(|e| CodecError::CborDecode(e.to_string()))?;
    cbor_to_value(&cbor)
}

/// Encode a multi-leaf subtree read: a CBOR map keyed by next-segment path
/// components, recursively, with leaves as scalars. `leaves` must already be
/// sorted lexicographically by path (the registry's subtree enumeration does
/// this), so that siblings at any depth are contiguous and a single linear
/// pass can group them.
pub fn encode_subtree(base: &AssetDataPath, leaves: &[(AssetDataPath, Value)]) -> CodecResult<Vec<u8>> {
    let tree = build_map(base, leaves)?;
    serde_cbor::to_vec(&tree).map_err(|e| CodecError::CborEncode(e.to_string()))
}

fn build_map(base: &AssetDataPath, leaves: &[(AssetDataPath, Value)]) -> CodecResult<Cbor> {
    let mut map: BTreeMap<Cbor, Cbor> = BTreeMap::new();
    let mut index = 0;
    while index < leaves.len() {
        let (path, _) = &leaves[index];
        let segment = base.next_segment_of(path).ok_or_else(|| {
            CodecError::PathReconstruction(format!(
                "leaf path {path} is not under base path {base}"
            ))
        })?;
        let mut group_end = index + 1;
        while group_end < leaves.len() {
            let next_path = &leaves[group_end].0;
            if base.next_segment_of(next_path) == Some(segment) {
                group_end += 1;
            } else {
                break;
            }
        }
        let group = &leaves[index..group_end];
        let child_base = base.child(segment)?;
        let value = if group.len() == 1 && group[0].0 == child_base {
            value_to_cbor(&group[0].1)
        } else {
            build_map(&child_base, group)?
        };
        map.insert(Cbor::Text(segment.to_string()), value);
        index = group_end;
    }
    Ok(Cbor::Map(map))
}

/// Decode a write payload, which mirrors the read shape and may target
/// either a leaf or a subtree: walks the map (if any), reconstructs child
/// paths by string concatenation against `base`, and returns one
/// `(path, value)` pair per leaf for the caller (the registry) to apply.
pub fn decode_write_payload(base: &AssetDataPath, bytes: &[u8]) -> CodecResult<Vec<(AssetDataPath, Value)>> {
    let cbor: Cbor =
        serde_cbor::from_slice(bytes).map_err(|e| CodecError::CborDecode(e.to_string()))?;
    let mut out = Vec::new();
    walk_write_map(base, &cbor, &mut out)?;
    Ok(out)
}

fn walk_write_map(base: &AssetDataPath, cbor: &Cbor, out: &mut Vec<(AssetDataPath, Value)>) -> CodecResult<()> {
    match cbor {
        Cbor::Map(map) => {
            for (key, value) in map {
                let segment = match key {
                    Cbor::Text(s) => s,
                    other => {
                        return Err(CodecError::CborShape(format!(
                            "write map key is not a string: {other:?}"
                        )))
                    }
                };
                let child = base.child(segment)?;
                walk_write_map(&child, value, out)?;
            }
            Ok(())
        }
        scalar => {
            out.push((base.clone(), cbor_to_value(scalar)?));
            Ok(())
        }
    }
}

/// Decode an execute payload: a CBOR map of argument-name to typed value.
pub fn decode_execute_payload(bytes: &[u8]) -> CodecResult<Vec<(String, Value)>> {
    let cbor: Cbor =
        serde_cbor::from_slice(bytes).map_err(|e| CodecError::CborDecode(e.to_string()))?;
    let map = match cbor {
        Cbor::Map(map) => map,
        other => {
            return Err(CodecError::CborShape(format!(
                "execute payload is not a CBOR map: {other:?}"
            )))
        }
    };
    map.into_iter()
        .map(|(key, value)| {
            let name = match key {
                Cbor::Text(s) => s,
                other => {
                    return Err(CodecError::CborShape(format!(
                        "execute argument name is not a string: {other:?}"
                    )))
                }
            };
            Ok((name, cbor_to_value(&value)?))
        })
        .collect()
}

/// Encode the recorder's three-key wire frame (spec §4.C): `"h"` (field
/// names), `"f"` (factors, length `1 + field_count`), `"s"` (row-major
/// samples). The recorder crate computes the delta/factor arithmetic and
/// hands this function already-scaled CBOR values; this function only owns
/// the map shape.
pub fn encode_recorder_frame(
    headers: &[String],
    factors: &[Cbor],
    rows: &[Vec<Cbor>],
) -> CodecResult<Vec<u8>> {
    if factors.len() != headers.len() + 1 {
        return Err(CodecError::CborShape(format!(
            "recorder frame factors length {} must be field count {} + 1",
            factors.len(),
            headers.len()
        )));
    }
    let mut samples = Vec::new();
    for row in rows {
        samples.extend(row.iter().cloned());
    }
    let mut map: BTreeMap<Cbor, Cbor> = BTreeMap::new();
    map.insert(
        Cbor::Text("h".to_string()),
        Cbor::Array(headers.iter().cloned().map(Cbor::Text).collect()),
    );
    map.insert(Cbor::Text("f".to_string()), Cbor::Array(factors.to_vec()));
    map.insert(Cbor::Text("s".to_string()), Cbor::Array(samples));
    serde_cbor::to_vec(&Cbor::Map(map)).map_err(|e| CodecError::CborEncode(e.to_string()))
}
