//! Bit-exact LWM2M TLV codec (spec §4.A).
//!
//! Each TLV is `1 byte type | 1-2 byte id | 0-3 byte length | value`. The
//! type byte packs: bits 7-6 kind (`00` Object Instance, `11` Resource),
//! bit 5 id width (0 = 8-bit, 1 = 16-bit), bits 4-3 length-field size (`00`
//! = inline 3-bit length in bits 2-0, `01`/`10`/`11` = 1/2/3-byte explicit
//! length field), bits 2-0 the inline length when no length field is used.
//!
//! This module only knows about the wire shape; it is handed plain
//! `(id, Value)` pairs by the registry rather than reaching into the
//! registry's own Asset/Instance/Field tree, the same separation the
//! teacher keeps between `codec` and the TLV *struct* definitions that live
//! in `types`.

use crate::error::{CodecError, CodecResult};
use conn_types::value::MAX_STRING_BYTES;
use conn_types::{FieldType, Value};

const KIND_OBJECT_INSTANCE: u8 = 0b00;
const KIND_RESOURCE: u8 = 0b11;

/// One decoded/encoded resource: a field id paired with its value.
#[derive(Debug, Clone, PartialEq)]
pub struct TlvField {
    pub id: u16,
    pub value: Value,
}

/// One decoded/encoded object instance: an instance id and its resources.
#[derive(Debug, Clone, PartialEq)]
pub struct TlvInstance {
    pub id: u16,
    pub fields: Vec<TlvField>,
}

// ---------------------------------------------------------------------
// Header encode/decode
// ---------------------------------------------------------------------

struct TlvHeader {
    kind: u8,
    id: u16,
    length: usize,
}

fn write_header(out: &mut Vec<u8>, kind: u8, id: u16, length: usize) {
    let id_is_16bit = id > 0xFF;
    let (length_field_size, inline_len): (u8, u8) = if length <= 7 {
        (0b00, length as u8)
    } else if length <= 0xFF {
        (0b01, 0)
    } else if length <= 0xFFFF {
        (0b10, 0)
    } else {
        (0b11, 0)
    };

    let type_byte = (kind << 6) | ((id_is_16bit as u8) << 5) | (length_field_size << 3) | inline_len;
    out.push(type_byte);

    if id_is_16bit {
        out.extend_from_slice(&id.to_be_bytes());
    } else {
        out.push(id as u8);
    }

    match length_field_size {
        0b00 => {}
        0b01 => out.push(length as u8),
        0b10 => out.extend_from_slice(&(length as u16).to_be_bytes()),
        0b11 => {
            let bytes = (length as u32).to_be_bytes();
            out.extend_from_slice(&bytes[1..]); // 3-byte big-endian length
        }
        _ => unreachable!(),
    }
}

/// Read one TLV header starting at `offset`. Returns the header and the
/// offset of its value bytes.
fn read_header(data: &[u8], offset: usize) -> CodecResult<(TlvHeader, usize)> {
    if offset >= data.len() {
        return Err(CodecError::TruncatedTlv {
            offset,
            need: 1,
            got: data.len().saturating_sub(offset),
        });
    }
    let type_byte = data[offset];
    let kind = (type_byte >> 6) & 0b11;
    let id_is_16bit = (type_byte >> 5) & 0b1 == 1;
    let length_field_size = (type_byte >> 3) & 0b11;
    let inline_len = type_byte & 0b111;

    let mut pos = offset + 1;
    let id_bytes = if id_is_16bit { 2 } else { 1 };
    if pos + id_bytes > data.len() {
        return Err(CodecError::TruncatedTlv {
            offset,
            need: id_bytes,
            got: data.len().saturating_sub(pos),
        });
    }
    let id = if id_is_16bit {
        u16::from_be_bytes([data[pos], data[pos + 1]])
    } else {
        data[pos] as u16
    };
    pos += id_bytes;

    let length = match length_field_size {
        0b00 => inline_len as usize,
        0b01 => {
            if pos + 1 > data.len() {
                return Err(CodecError::TruncatedTlv {
                    offset,
                    need: 1,
                    got: 0,
                });
            }
            let len = data[pos] as usize;
            pos += 1;
            len
        }
        0b10 => {
            if pos + 2 > data.len() {
                return Err(CodecError::TruncatedTlv {
                    offset,
                    need: 2,
                    got: data.len().saturating_sub(pos),
                });
            }
            let len = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
            pos += 2;
            len
        }
        0b11 => {
            if pos + 3 > data.len() {
                return Err(CodecError::TruncatedTlv {
                    offset,
                    need: 3,
                    got: data.len().saturating_sub(pos),
                });
            }
            let len = u32::from_be_bytes([0, data[pos], data[pos + 1], data[pos + 2]]) as usize;
            pos += 3;
            len
        }
        _ => unreachable!(),
    };

    if pos + length > data.len() {
        return Err(CodecError::TruncatedTlv {
            offset,
            need: length,
            got: data.len().saturating_sub(pos),
        });
    }

    Ok((TlvHeader { kind, id, length }, pos))
}

// ---------------------------------------------------------------------
// Value encode/decode
// ---------------------------------------------------------------------

fn encode_value(value: &Value, field_id: u16) -> CodecResult<Vec<u8>> {
    match value {
        Value::Int(v) => Ok((*v as i32).to_be_bytes().to_vec()),
        Value::Bool(b) => Ok(vec![if *b { 0x01 } else { 0x00 }]),
        Value::String(s) => Ok(s.as_bytes().to_vec()),
        Value::Float(f) => Ok(f.to_be_bytes().to_vec()),
        Value::None => Err(CodecError::NoneNotWritable(field_id)),
    }
}

fn decode_value(field_type: FieldType, bytes: &[u8], offset: usize) -> CodecResult<Value> {
    match field_type {
        FieldType::Int => match bytes.len() {
            1 => Ok(Value::Int(bytes[0] as i8 as i64)),
            2 => Ok(Value::Int(i16::from_be_bytes([bytes[0], bytes[1]]) as i64)),
            4 => Ok(Value::Int(i32::from_be_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ]) as i64)),
            n => Err(CodecError::UnsupportedIntLength(n, offset)),
        },
        FieldType::Bool => match bytes.len() {
            1 => Ok(Value::Bool(bytes[0] != 0)),
            n => Err(CodecError::UnsupportedBoolLength(n, offset)),
        },
        FieldType::String => {
            if bytes.len() > MAX_STRING_BYTES - 1 {
                return Err(CodecError::StringTooLong(bytes.len(), MAX_STRING_BYTES - 1));
            }
            std::str::from_utf8(bytes)
                .map(|s| Value::String(s.to_string()))
                .map_err(|_| CodecError::InvalidUtf8(offset))
        }
        FieldType::Float => match bytes.len() {
            4 => {
                let f = f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                Ok(Value::Float(f as f64))
            }
            8 => {
                let f = f64::from_be_bytes([
                    bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
                ]);
                Ok(Value::Float(f))
            }
            n => Err(CodecError::UnsupportedFloatLength(n, offset)),
        },
        FieldType::None => Err(CodecError::NoneNotWritable(0)),
    }
}

// ---------------------------------------------------------------------
// Resource-TLV sequence (the value of an instance TLV, or a write payload)
// ---------------------------------------------------------------------

/// Encode one resource TLV. `Value::None` fields are silently skipped by
/// the caller (`encode_instance`/`encode_object`) rather than here, since
/// skipping is a sequence-level decision.
fn encode_resource(out: &mut Vec<u8>, field: &TlvField) -> CodecResult<()> {
    let bytes = encode_value(&field.value, field.id)?;
    write_header(out, KIND_RESOURCE, field.id, bytes.len());
    out.extend_from_slice(&bytes);
    Ok(())
}

/// Encode a flat sequence of resource TLVs, skipping any field whose value
/// is `none` (spec §4.A: "none ... not present in writable field
/// enumerations").
pub fn encode_resource_sequence(fields: &[TlvField]) -> CodecResult<Vec<u8>> {
    let mut out = Vec::new();
    for field in fields {
        if field.value.is_none() {
            continue;
        }
        encode_resource(&mut out, field)?;
    }
    Ok(out)
}

/// Decode a flat sequence of resource TLVs. Strictly structural: any
/// non-Resource-kind TLV at the top level is a parse error (spec §4.A).
/// `type_of` resolves the expected `FieldType` for a given resource id;
/// an id with no known type is a bad-parameter error.
pub fn decode_resource_sequence(
    data: &[u8],
    type_of: impl Fn(u16) -> Option<FieldType>,
) -> CodecResult<Vec<TlvField>> {
    let mut fields = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        let (header, value_start) = read_header(data, offset)?;
        if header.kind != KIND_RESOURCE {
            return Err(CodecError::ExpectedResourceSequence(offset));
        }
        let value_bytes = &data[value_start..value_start + header.length];
        let field_type = type_of(header.id).ok_or_else(|| {
            CodecError::CborShape(format!("no known type for resource id {}", header.id))
        })?;
        let value = decode_value(field_type, value_bytes, value_start)?;
        fields.push(TlvField { id: header.id, value });
        offset = value_start + header.length;
    }
    Ok(fields)
}

// ---------------------------------------------------------------------
// Object-level encode/decode (`WriteObjectToTLV`)
// ---------------------------------------------------------------------

/// `WriteObjectToTLV(asset, field_id = None)`: one instance-TLV per
/// instance, each wrapping the resource-TLV sequence for that instance's
/// writable-by-client fields (spec §4.A, §8 invariant 5). Callers filter
/// `instances` down to the writable-by-client field set before calling.
pub fn encode_object(instances: &[TlvInstance]) -> CodecResult<Vec<u8>> {
    let mut out = Vec::new();
    for instance in instances {
        let inner = encode_resource_sequence(&instance.fields)?;
        write_header(&mut out, KIND_OBJECT_INSTANCE, instance.id, inner.len());
        out.extend_from_slice(&inner);
    }
    Ok(out)
}

/// `WriteObjectToTLV(asset, field_id = Some(f))`: one resource-TLV per
/// instance, restricted to field `f`.
pub fn encode_single_field_across_instances(
    instances: &[(u16, Option<&Value>)],
    field_id: u16,
) -> CodecResult<Vec<u8>> {
    let mut out = Vec::new();
    for (_, value) in instances {
        if let Some(value) = value {
            if value.is_none() {
                continue;
            }
            encode_resource(
                &mut out,
                &TlvField {
                    id: field_id,
                    value: (*value).clone(),
                },
            )?;
        }
    }
    Ok(out)
}

/// Decode a full object payload: a sequence of Object Instance TLVs, each
/// containing a nested resource-TLV sequence.
pub fn decode_object(
    data: &[u8],
    type_of: impl Fn(u16) -> Option<FieldType> + Copy,
) -> CodecResult<Vec<TlvInstance>> {
    let mut instances = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        let (header, value_start) = read_header(data, offset)?;
        if header.kind != KIND_OBJECT_INSTANCE {
            return Err(CodecError::UnknownKind(header.kind, offset));
        }
        let value_bytes = &data[value_start..value_start + header.length];
        let fields = decode_resource_sequence(value_bytes, type_of)?;
        instances.push(TlvInstance {
            id: header.id,
            fields,
        });
        offset = value_start + header.length;
    }
    Ok(instances)
}
