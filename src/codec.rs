//! Length-prefixed, tag-based encoding for [`Value`] and [`Primitive`], plus
//! the content hash used by the node interner.
//!
//! The wire format favors forward compatibility over compactness: every
//! tag's payload is itself length-prefixed, so a reader built before a new
//! tag was introduced can skip straight over it ([`Value::Unknown`])
//! instead of refusing the row outright.

use crate::error::{Result, StoreError};
use crate::model::{Primitive, Value};

/// Size in bytes of a content hash: 16 bytes of `xxh3_128` plus 4 bytes of
/// `xxh32` over the same input, concatenated for a 20-byte digest.
pub const HASH_SIZE: usize = 20;

/// A 20-byte content digest of a [`Value`].
pub type Hash = [u8; HASH_SIZE];

/// Hashes the canonical encoding of `value`. Deterministic and total: two
/// distinct values only coincide on a hash collision.
pub fn hash_value(value: &Value) -> Hash {
    let bytes = encode_value(value);
    hash_bytes(&bytes)
}

/// Hashes raw bytes using the same scheme as [`hash_value`], used directly
/// for the bloom filter's `(subject,predicate,object)` key.
pub fn hash_bytes(bytes: &[u8]) -> Hash {
    let wide = xxhash_rust::xxh3::xxh3_128(bytes);
    let narrow = xxhash_rust::xxh32::xxh32(bytes, 0);
    let mut out = [0u8; HASH_SIZE];
    out[..16].copy_from_slice(&wide.to_be_bytes());
    out[16..].copy_from_slice(&narrow.to_be_bytes());
    out
}

/// Big-endian encoding of an id, used as the `log` bucket key and within
/// index value lists.
pub fn id_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

// --- Value tags ---
const TAG_RAW: u8 = 0;
const TAG_STRING: u8 = 1;
const TAG_IRI: u8 = 2;
const TAG_BLANK: u8 = 3;
const TAG_TYPED_LITERAL: u8 = 4;
const TAG_LANG_LITERAL: u8 = 5;
const TAG_INT: u8 = 6;
const TAG_FLOAT: u8 = 7;
const TAG_BOOL: u8 = 8;
const TAG_TIMESTAMP: u8 = 9;

fn write_varlen(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

fn read_varlen<'a>(buf: &'a [u8], pos: &mut usize) -> Result<&'a [u8]> {
    let len_bytes = buf
        .get(*pos..*pos + 4)
        .ok_or_else(|| StoreError::CorruptPrimitive("truncated length prefix".into()))?;
    let len = u32::from_be_bytes(len_bytes.try_into().unwrap()) as usize;
    *pos += 4;
    let slice = buf
        .get(*pos..*pos + len)
        .ok_or_else(|| StoreError::CorruptPrimitive("truncated field".into()))?;
    *pos += len;
    Ok(slice)
}

/// Encodes a [`Value`] into its tagged byte representation. Every variant's
/// payload is written through [`write_varlen`], fixed-width fields included,
/// so [`decode_value`] can skip a tag it doesn't recognize without knowing
/// that tag's shape.
pub fn encode_value(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    match value {
        Value::Raw(bytes) => {
            out.push(TAG_RAW);
            write_varlen(&mut out, bytes);
        }
        Value::String(s) => {
            out.push(TAG_STRING);
            write_varlen(&mut out, s.as_bytes());
        }
        Value::Iri(s) => {
            out.push(TAG_IRI);
            write_varlen(&mut out, s.as_bytes());
        }
        Value::BlankNode(s) => {
            out.push(TAG_BLANK);
            write_varlen(&mut out, s.as_bytes());
        }
        Value::TypedLiteral { value, datatype } => {
            out.push(TAG_TYPED_LITERAL);
            let mut payload = Vec::new();
            write_varlen(&mut payload, value.as_bytes());
            write_varlen(&mut payload, datatype.as_bytes());
            write_varlen(&mut out, &payload);
        }
        Value::LangLiteral { value, lang } => {
            out.push(TAG_LANG_LITERAL);
            let mut payload = Vec::new();
            write_varlen(&mut payload, value.as_bytes());
            write_varlen(&mut payload, lang.as_bytes());
            write_varlen(&mut out, &payload);
        }
        Value::Int(i) => {
            out.push(TAG_INT);
            write_varlen(&mut out, &i.to_be_bytes());
        }
        Value::Float(f) => {
            out.push(TAG_FLOAT);
            write_varlen(&mut out, &f.to_be_bytes());
        }
        Value::Bool(b) => {
            out.push(TAG_BOOL);
            write_varlen(&mut out, &[*b as u8]);
        }
        Value::Timestamp { secs, nanos } => {
            out.push(TAG_TIMESTAMP);
            let mut payload = Vec::new();
            payload.extend_from_slice(&secs.to_be_bytes());
            payload.extend_from_slice(&nanos.to_be_bytes());
            write_varlen(&mut out, &payload);
        }
        Value::Unknown { tag, payload } => {
            out.push(*tag);
            write_varlen(&mut out, payload);
        }
    }
    out
}

/// Decodes a [`Value`] previously produced by [`encode_value`]. Every tag's
/// payload is length-prefixed, so a tag this build doesn't recognize is
/// skipped rather than rejected: its bytes come back as [`Value::Unknown`]
/// instead of failing the whole row.
pub fn decode_value(bytes: &[u8]) -> Result<Value> {
    let mut pos = 0usize;
    let tag = *bytes
        .first()
        .ok_or_else(|| StoreError::CorruptPrimitive("empty value encoding".into()))?;
    pos += 1;
    let value = match tag {
        TAG_RAW => Value::Raw(read_varlen(bytes, &mut pos)?.to_vec()),
        TAG_STRING => Value::String(decode_utf8(read_varlen(bytes, &mut pos)?)?),
        TAG_IRI => Value::Iri(decode_utf8(read_varlen(bytes, &mut pos)?)?),
        TAG_BLANK => Value::BlankNode(decode_utf8(read_varlen(bytes, &mut pos)?)?),
        TAG_TYPED_LITERAL => {
            let payload = read_varlen(bytes, &mut pos)?;
            let mut p = 0usize;
            let value = decode_utf8(read_varlen(payload, &mut p)?)?;
            let datatype = decode_utf8(read_varlen(payload, &mut p)?)?;
            Value::TypedLiteral { value, datatype }
        }
        TAG_LANG_LITERAL => {
            let payload = read_varlen(bytes, &mut pos)?;
            let mut p = 0usize;
            let value = decode_utf8(read_varlen(payload, &mut p)?)?;
            let lang = decode_utf8(read_varlen(payload, &mut p)?)?;
            Value::LangLiteral { value, lang }
        }
        TAG_INT => {
            let payload = read_varlen(bytes, &mut pos)?;
            let raw: [u8; 8] = payload
                .try_into()
                .map_err(|_| StoreError::CorruptPrimitive("malformed int payload".into()))?;
            Value::Int(i64::from_be_bytes(raw))
        }
        TAG_FLOAT => {
            let payload = read_varlen(bytes, &mut pos)?;
            let raw: [u8; 8] = payload
                .try_into()
                .map_err(|_| StoreError::CorruptPrimitive("malformed float payload".into()))?;
            Value::Float(f64::from_be_bytes(raw))
        }
        TAG_BOOL => {
            let payload = read_varlen(bytes, &mut pos)?;
            let raw = *payload
                .first()
                .ok_or_else(|| StoreError::CorruptPrimitive("malformed bool payload".into()))?;
            Value::Bool(raw != 0)
        }
        TAG_TIMESTAMP => {
            let payload = read_varlen(bytes, &mut pos)?;
            let secs_raw = payload
                .get(0..8)
                .ok_or_else(|| StoreError::CorruptPrimitive("malformed timestamp payload".into()))?;
            let nanos_raw = payload
                .get(8..12)
                .ok_or_else(|| StoreError::CorruptPrimitive("malformed timestamp payload".into()))?;
            Value::Timestamp {
                secs: i64::from_be_bytes(secs_raw.try_into().unwrap()),
                nanos: u32::from_be_bytes(nanos_raw.try_into().unwrap()),
            }
        }
        other => Value::Unknown {
            tag: other,
            payload: read_varlen(bytes, &mut pos)?.to_vec(),
        },
    };
    Ok(value)
}

fn decode_utf8(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| StoreError::CorruptPrimitive(format!("invalid utf8: {e}")))
}

/// Encodes a [`Primitive`] for storage in the `log` bucket.
pub fn encode_primitive(p: &Primitive) -> Vec<u8> {
    let mut out = Vec::with_capacity(48 + p.value.len());
    out.extend_from_slice(&p.id.to_be_bytes());
    out.extend_from_slice(&p.subject.to_be_bytes());
    out.extend_from_slice(&p.predicate.to_be_bytes());
    out.extend_from_slice(&p.object.to_be_bytes());
    out.extend_from_slice(&p.label.to_be_bytes());
    out.extend_from_slice(&p.timestamp.to_be_bytes());
    out.push(p.deleted as u8);
    write_varlen(&mut out, &p.value);
    out
}

/// Decodes a [`Primitive`] previously produced by [`encode_primitive`].
pub fn decode_primitive(bytes: &[u8]) -> Result<Primitive> {
    const FIXED_SIZE: usize = 8 * 6 + 1;
    if bytes.len() < FIXED_SIZE {
        return Err(StoreError::CorruptPrimitive(
            "primitive shorter than fixed header".into(),
        ));
    }
    let mut pos = 0usize;
    let read_u64 = |buf: &[u8], pos: &mut usize| -> u64 {
        let v = u64::from_be_bytes(buf[*pos..*pos + 8].try_into().unwrap());
        *pos += 8;
        v
    };
    let id = read_u64(bytes, &mut pos);
    let subject = read_u64(bytes, &mut pos);
    let predicate = read_u64(bytes, &mut pos);
    let object = read_u64(bytes, &mut pos);
    let label = read_u64(bytes, &mut pos);
    let timestamp = read_u64(bytes, &mut pos) as i64;
    let deleted = bytes[pos] != 0;
    pos += 1;
    let value = read_varlen(bytes, &mut pos)?.to_vec();
    Ok(Primitive {
        id,
        subject,
        predicate,
        object,
        label,
        value,
        timestamp,
        deleted,
    })
}
