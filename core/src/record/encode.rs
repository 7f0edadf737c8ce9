//! record/encode.rs
//! Template -> bytes. Field order must match `decode.rs`.

use zeroize::Zeroizing;

use crate::constants::{
    MAX_DIGEST_LEN, MAX_FEATURE_COUNT, MAX_RECORD_LEN, MAX_SALT_LEN, MIN_SALT_LEN, TEMPLATE_FORMAT_V1,
};
use crate::record::types::{RecordError, Template};

/// Exact encoded size of `t`.
pub fn encoded_len(t: &Template) -> usize {
    4                                   // version
        + 4 + t.username.as_str().len() // username
        + 4                             // task
        + 8 + 8                         // created_at, last_used
        + 8 + 4 * t.features.len()      // features
        + 8 + t.seal.digest.len()       // hash
        + 8 + t.seal.salt.len()         // salt
}

fn check(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), RecordError> {
    if value < min || value > max {
        return Err(RecordError::OutOfBounds { field, value, min, max });
    }
    Ok(())
}

/// Serialize `t`. Bounds are enforced on the way out as well as on the way in,
/// so anything this writes, `decode_template` accepts.
pub fn encode_template(t: &Template) -> Result<Zeroizing<Vec<u8>>, RecordError> {
    if t.version != TEMPLATE_FORMAT_V1 {
        return Err(RecordError::UnsupportedVersion(t.version));
    }
    check("feature_count", t.features.len() as u64, 0, MAX_FEATURE_COUNT)?;
    check("hash_len", t.seal.digest.len() as u64, 1, MAX_DIGEST_LEN as u64)?;
    check("salt_len", t.seal.salt.len() as u64, MIN_SALT_LEN as u64, MAX_SALT_LEN as u64)?;

    let len = encoded_len(t);
    if len as u64 > MAX_RECORD_LEN {
        return Err(RecordError::TooLarge { len: len as u64, max: MAX_RECORD_LEN });
    }

    let mut out = Zeroizing::new(Vec::new());
    out.try_reserve_exact(len).map_err(|e| RecordError::Alloc(e.to_string()))?;

    fn put_u32(out: &mut Vec<u8>, v: u32) { out.extend_from_slice(&v.to_le_bytes()); }
    fn put_i32(out: &mut Vec<u8>, v: i32) { out.extend_from_slice(&v.to_le_bytes()); }
    fn put_i64(out: &mut Vec<u8>, v: i64) { out.extend_from_slice(&v.to_le_bytes()); }
    fn put_u64(out: &mut Vec<u8>, v: u64) { out.extend_from_slice(&v.to_le_bytes()); }

    let name = t.username.as_str().as_bytes();

    put_u32(&mut out, t.version);
    put_u32(&mut out, name.len() as u32);
    out.extend_from_slice(name);
    put_i32(&mut out, t.task.as_i32());
    put_i64(&mut out, t.created_at);
    put_i64(&mut out, t.last_used);
    put_u64(&mut out, t.features.len() as u64);
    for v in t.features.as_slice() {
        out.extend_from_slice(&v.to_le_bytes());
    }
    put_u64(&mut out, t.seal.digest.len() as u64);
    out.extend_from_slice(&t.seal.digest);
    put_u64(&mut out, t.seal.salt.len() as u64);
    out.extend_from_slice(&t.seal.salt);

    debug_assert_eq!(out.len(), len, "encoding wrote incorrect length");
    Ok(out)
}
