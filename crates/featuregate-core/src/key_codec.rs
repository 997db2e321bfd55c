//! Entity key codec
//!
//! Encodes a composite entity key into the single hex string used as the
//! storage primary key. The encoding is deterministic, order-preserving, and
//! one-way: it is never parsed back, only compared for equality.
//!
//! ## Wire Layout
//!
//! Little-endian, length-prefixed binary, then hex-encoded:
//!
//! ```text
//! u32 pair_count
//! per pair:
//!   u32 name_len, name bytes (UTF-8)
//!   u8  type tag (1=int, 2=string, 3=bool, 4=bytes)
//!   u32 value_len, value bytes (ints as 8-byte LE)
//! ```
//!
//! Length prefixes keep the encoding injective: ("ab","c") and ("a","bc")
//! produce different keys. Pair order is caller-defined and preserved.

use crate::{EntityKey, Error, KeyValue, Result};

const TAG_INT: u8 = 1;
const TAG_STRING: u8 = 2;
const TAG_BOOL: u8 = 3;
const TAG_BYTES: u8 = 4;

/// Encode a composite entity key into its hex storage key
///
/// Fails fast on empty keys. Unsupported value types are rejected at the
/// `KeyValue` level, so every reachable variant encodes.
pub fn encode_entity_key(key: &EntityKey) -> Result<String> {
    if key.is_empty() {
        return Err(Error::validation("entity key has no components"));
    }

    let mut buf: Vec<u8> = Vec::with_capacity(32 * key.pairs().len());
    buf.extend_from_slice(&(key.pairs().len() as u32).to_le_bytes());

    for (name, value) in key.pairs() {
        buf.extend_from_slice(&(name.len() as u32).to_le_bytes());
        buf.extend_from_slice(name.as_bytes());
        encode_value(&mut buf, value)?;
    }

    Ok(hex::encode(buf))
}

fn encode_value(buf: &mut Vec<u8>, value: &KeyValue) -> Result<()> {
    match value {
        KeyValue::Int(v) => {
            buf.push(TAG_INT);
            let bytes = v.to_le_bytes();
            buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            buf.extend_from_slice(&bytes);
        }
        KeyValue::String(s) => {
            buf.push(TAG_STRING);
            buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
            buf.extend_from_slice(s.as_bytes());
        }
        KeyValue::Bool(b) => {
            buf.push(TAG_BOOL);
            buf.extend_from_slice(&1u32.to_le_bytes());
            buf.push(u8::from(*b));
        }
        KeyValue::Bytes(bytes) => {
            buf.push(TAG_BYTES);
            buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            buf.extend_from_slice(bytes);
        }
    }
    Ok(())
}

/// Convert a loosely-typed wire value into a key component
///
/// The retrieval path receives entity columns as JSON; only integers,
/// strings, and booleans are usable as key components. Floats and nulls
/// fail fast instead of being silently stringified.
pub fn key_value_from_json(value: &serde_json::Value) -> Result<KeyValue> {
    match value {
        serde_json::Value::String(s) => Ok(KeyValue::String(s.clone())),
        serde_json::Value::Bool(b) => Ok(KeyValue::Bool(*b)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(KeyValue::Int)
            .ok_or_else(|| Error::UnsupportedKeyType(format!("non-integer number {n}"))),
        other => Err(Error::UnsupportedKeyType(format!(
            "{}",
            json_type_name(other)
        ))),
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
