//! record/decode.rs
//! Bytes -> Template.
//!
//! Every length field is checked against its bound and against the bytes
//! actually remaining before anything is allocated.

use byteorder::{ByteOrder, LittleEndian};

use crate::constants::{
    MAX_DIGEST_LEN, MAX_FEATURE_COUNT, MAX_RECORD_LEN, MAX_SALT_LEN, MAX_USERNAME_LEN, MIN_SALT_LEN,
    TEMPLATE_FORMAT_V1,
};
use crate::crypto::{HashAlg, HashRecord};
use crate::record::types::{RecordError, Template, Username};
use crate::signal::{FeatureVector, MentalTask};

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, field: &'static str, n: usize) -> Result<&'a [u8], RecordError> {
        if self.remaining() < n {
            return Err(RecordError::Truncated { field, need: n, have: self.remaining() });
        }
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    fn u32(&mut self, field: &'static str) -> Result<u32, RecordError> {
        Ok(LittleEndian::read_u32(self.take(field, 4)?))
    }
    fn i32(&mut self, field: &'static str) -> Result<i32, RecordError> {
        Ok(LittleEndian::read_i32(self.take(field, 4)?))
    }
    fn i64(&mut self, field: &'static str) -> Result<i64, RecordError> {
        Ok(LittleEndian::read_i64(self.take(field, 8)?))
    }
    fn u64(&mut self, field: &'static str) -> Result<u64, RecordError> {
        Ok(LittleEndian::read_u64(self.take(field, 8)?))
    }

    /// Length prefix bounded by `min..=max` and by the remaining bytes
    /// (`unit` bytes per element).
    fn len_u64(&mut self, field: &'static str, min: u64, max: u64, unit: usize) -> Result<usize, RecordError> {
        let value = self.u64(field)?;
        if value < min || value > max {
            return Err(RecordError::OutOfBounds { field, value, min, max });
        }
        let n = value as usize;
        if n * unit > self.remaining() {
            return Err(RecordError::Truncated { field, need: n * unit, have: self.remaining() });
        }
        Ok(n)
    }

    fn bytes_owned(&mut self, field: &'static str, n: usize) -> Result<Vec<u8>, RecordError> {
        let src = self.take(field, n)?;
        let mut v = Vec::new();
        v.try_reserve_exact(n).map_err(|e| RecordError::Alloc(e.to_string()))?;
        v.extend_from_slice(src);
        Ok(v)
    }
}

/// Parse a full record. `alg` is the primitive the seal was made with.
pub fn decode_template(buf: &[u8], alg: HashAlg) -> Result<Template, RecordError> {
    if buf.len() as u64 > MAX_RECORD_LEN {
        return Err(RecordError::TooLarge { len: buf.len() as u64, max: MAX_RECORD_LEN });
    }
    let mut c = Cursor { buf, pos: 0 };

    let version = c.u32("version")?;
    if version != TEMPLATE_FORMAT_V1 {
        return Err(RecordError::UnsupportedVersion(version));
    }

    let name_len = c.u32("username_len")? as u64;
    if name_len == 0 || name_len > MAX_USERNAME_LEN as u64 {
        return Err(RecordError::OutOfBounds {
            field: "username_len",
            value: name_len,
            min: 1,
            max: MAX_USERNAME_LEN as u64,
        });
    }
    let name_bytes = c.take("username", name_len as usize)?;
    let name = std::str::from_utf8(name_bytes)
        .map_err(|_| RecordError::InvalidUsername("not UTF-8".into()))?;
    let username = Username::parse(name)?;

    let raw_task = c.i32("task")?;
    let task = MentalTask::try_from(raw_task).map_err(|_| RecordError::UnknownTask(raw_task))?;

    let created_at = c.i64("created_at")?;
    let last_used = c.i64("last_used")?;

    let n = c.len_u64("feature_count", 0, MAX_FEATURE_COUNT, 4)?;
    let mut values = Vec::new();
    values.try_reserve_exact(n).map_err(|e| RecordError::Alloc(e.to_string()))?;
    let raw = c.take("features", n * 4)?;
    values.extend(raw.chunks_exact(4).map(LittleEndian::read_f32));
    let features = FeatureVector::new(values, task, created_at.saturating_mul(1000));

    let hash_len = c.len_u64("hash_len", 1, MAX_DIGEST_LEN as u64, 1)?;
    let digest = c.bytes_owned("hash", hash_len)?;

    let salt_len = c.len_u64("salt_len", MIN_SALT_LEN as u64, MAX_SALT_LEN as u64, 1)?;
    let salt = c.bytes_owned("salt", salt_len)?;

    if c.remaining() != 0 {
        return Err(RecordError::TrailingBytes(c.remaining()));
    }

    Ok(Template {
        version,
        username,
        features,
        seal: HashRecord::new(alg, digest, salt),
        task,
        created_at,
        last_used,
    })
}

