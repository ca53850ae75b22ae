//! `key:value\n` framing for the external producer's stdin.
//!
//! Nothing is escaped. This is only safe because keys and values come from an
//! alphabet that never contains either delimiter, see [`check_alphabet`].

use bytes::{BufMut, BytesMut};

pub const KEY_DELIMITER: u8 = b':';
pub const RECORD_DELIMITER: u8 = b'\n';

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("alphabet contains delimiter byte {0:#04x}")]
pub struct DelimiterError(pub u8);

/// Size of one framed record.
pub fn framed_len(key_size: usize, value_size: usize) -> usize {
    key_size + value_size + 2
}

/// Append one framed record to `buf`.
pub fn encode_record(buf: &mut BytesMut, key: &[u8], value: &[u8]) {
    buf.reserve(framed_len(key.len(), value.len()));
    buf.extend_from_slice(key);
    buf.put_u8(KEY_DELIMITER);
    buf.extend_from_slice(value);
    buf.put_u8(RECORD_DELIMITER);
}

/// Split a byte stream back into `(key, value)` pairs. Lines without a key
/// delimiter are skipped; a trailing partial line is ignored.
pub fn parse_records(buf: &[u8]) -> Vec<(&[u8], &[u8])> {
    let mut out = Vec::new();
    let mut rest = buf;
    while let Some(end) = rest.iter().position(|b| *b == RECORD_DELIMITER) {
        let line = &rest[..end];
        rest = &rest[end + 1..];
        if let Some(split) = line.iter().position(|b| *b == KEY_DELIMITER) {
            out.push((&line[..split], &line[split + 1..]));
        }
    }
    out
}

pub fn check_alphabet(alphabet: &[u8]) -> Result<(), DelimiterError> {
    match alphabet
        .iter()
        .find(|b| **b == KEY_DELIMITER || **b == RECORD_DELIMITER)
    {
        Some(b) => Err(DelimiterError(*b)),
        None => Ok(()),
    }
}
