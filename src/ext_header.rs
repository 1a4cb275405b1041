use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use bytes::{Buf, Bytes};
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::endian::Endianness;
use crate::errors::{BlueError, BlueResult};
use crate::hcb::{HeaderControlBlock, BLOCK_SIZE};

/// Fixed prefix of every keyword record: lkey(4) + lext(2) + ltag(1) + type(1)
pub const RECORD_PREFIX_LEN: usize = 8;

/// Decoded keyword value: a closed union over the wire element types.
///
/// Numeric variants hold the full decoded array; unknown type characters
/// fall back to 1-byte elements (the type table default) instead of
/// aborting the record. Serialization unwraps one-element arrays to a bare
/// scalar, which is what metadata consumers expect for the common case.
#[derive(Debug, Clone, PartialEq)]
pub enum KeywordValue {
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Text(String),
}

fn one_or_many<S, T>(serializer: S, items: &[T]) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    if items.len() == 1 {
        items[0].serialize(serializer)
    } else {
        items.serialize(serializer)
    }
}

impl Serialize for KeywordValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            KeywordValue::Int8(v) => one_or_many(serializer, v),
            KeywordValue::Int16(v) => one_or_many(serializer, v),
            KeywordValue::Int32(v) => one_or_many(serializer, v),
            KeywordValue::Int64(v) => one_or_many(serializer, v),
            KeywordValue::Float32(v) => one_or_many(serializer, v),
            KeywordValue::Float64(v) => one_or_many(serializer, v),
            KeywordValue::Text(t) => serializer.serialize_str(t),
        }
    }
}

impl KeywordValue {
    /// Number of decoded elements (1 for text)
    pub fn element_count(&self) -> usize {
        match self {
            KeywordValue::Int8(v) => v.len(),
            KeywordValue::Int16(v) => v.len(),
            KeywordValue::Int32(v) => v.len(),
            KeywordValue::Int64(v) => v.len(),
            KeywordValue::Float32(v) => v.len(),
            KeywordValue::Float64(v) => v.len(),
            KeywordValue::Text(_) => 1,
        }
    }

    /// First element as f64; text values are parsed numerically
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            KeywordValue::Int8(v) => v.first().map(|x| *x as f64),
            KeywordValue::Int16(v) => v.first().map(|x| *x as f64),
            KeywordValue::Int32(v) => v.first().map(|x| *x as f64),
            KeywordValue::Int64(v) => v.first().map(|x| *x as f64),
            KeywordValue::Float32(v) => v.first().map(|x| *x as f64),
            KeywordValue::Float64(v) => v.first().copied(),
            KeywordValue::Text(t) => t.trim().parse().ok(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            KeywordValue::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// One variable-length keyword record from the extended header
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtendedHeaderEntry {
    /// Tag name, empty when `ltag <= 0`
    pub tag: String,
    /// Wire type character (B/I/L/X/F/D/A, or whatever the file carried)
    pub type_char: char,
    /// Decoded scalar or array payload
    pub value: KeywordValue,
    /// Total record length as read from the wire
    pub lkey: i32,
    /// Fixed record prefix length as read from the wire
    pub lext: i16,
    /// Tag string length as read from the wire
    pub ltag: i8,
}

/// First-wins lookup by tag. Duplicate tags are legal on the wire; the
/// earliest record takes precedence by policy.
pub fn first_by_tag<'a>(
    entries: &'a [ExtendedHeaderEntry],
    tag: &str,
) -> Option<&'a ExtendedHeaderEntry> {
    entries.iter().find(|e| e.tag == tag)
}

/// Bytes per element for each wire type character; 1-byte fallback for
/// unknown characters.
fn element_size(type_char: char) -> usize {
    match type_char {
        'B' | 'A' => 1,
        'I' => 2,
        'L' | 'F' => 4,
        'X' | 'D' => 8,
        _ => 1,
    }
}

fn decode_array(type_char: char, mut raw: Bytes, endian: Endianness) -> KeywordValue {
    let count = raw.len() / element_size(type_char);
    match type_char {
        'B' => KeywordValue::Int8((0..count).map(|_| raw.get_i8()).collect()),
        'I' => KeywordValue::Int16((0..count).map(|_| endian.get_i16(&mut raw)).collect()),
        'L' => KeywordValue::Int32((0..count).map(|_| endian.get_i32(&mut raw)).collect()),
        'X' => KeywordValue::Int64((0..count).map(|_| endian.get_i64(&mut raw)).collect()),
        'F' => KeywordValue::Float32((0..count).map(|_| endian.get_f32(&mut raw)).collect()),
        'D' => KeywordValue::Float64((0..count).map(|_| endian.get_f64(&mut raw)).collect()),
        other => {
            // Malformed content inside one record must not stop the walk:
            // decode as raw single-byte elements and keep going.
            debug!(type_char = %other, "unknown keyword type, using 1-byte fallback");
            KeywordValue::Int8((0..count).map(|_| raw.get_i8()).collect())
        }
    }
}

/// Decode an extended-header region already read into memory.
///
/// `ext_size` drives the remaining-bytes loop counter exactly as stored in
/// the HCB; the buffer may extend past it (tag and padding bytes follow each
/// record's `lkey` span on the wire).
pub fn decode_keyword_records(
    data: &mut Bytes,
    ext_size: i32,
    endian: Endianness,
) -> BlueResult<Vec<ExtendedHeaderEntry>> {
    let total_len = data.len();
    let mut entries = Vec::new();
    let mut bytes_remaining = i64::from(ext_size);

    while bytes_remaining > 0 {
        let offset = total_len - data.remaining();
        if data.remaining() < RECORD_PREFIX_LEN {
            return Err(BlueError::UnexpectedEndOfExtendedHeader {
                offset,
                needed: RECORD_PREFIX_LEN,
                available: data.remaining(),
            });
        }
        let lkey = endian.get_i32(data);
        let lext = endian.get_i16(data);
        let ltag = data.get_i8();
        let type_char = data.get_u8() as char;

        // A non-positive or inverted length would stall or desynchronize
        // the walk; record boundaries are unrecoverable past this point.
        if lkey <= 0 || lext < 0 || i64::from(lkey) < i64::from(lext) {
            return Err(BlueError::InvalidKeywordLength { offset, lkey, lext });
        }
        let value_len = (lkey - i32::from(lext)) as usize;
        let tag_len = if ltag > 0 { ltag as usize } else { 0 };

        if data.remaining() < value_len {
            return Err(BlueError::UnexpectedEndOfExtendedHeader {
                offset,
                needed: value_len,
                available: data.remaining(),
            });
        }
        let raw_value = data.split_to(value_len);
        let value = if type_char == 'A' {
            let text = match raw_value.iter().rposition(|&b| b != 0) {
                Some(last) => String::from_utf8_lossy(&raw_value[..=last]).into_owned(),
                None => String::new(),
            };
            KeywordValue::Text(text)
        } else {
            decode_array(type_char, raw_value, endian)
        };

        if data.remaining() < tag_len {
            return Err(BlueError::UnexpectedEndOfExtendedHeader {
                offset,
                needed: tag_len,
                available: data.remaining(),
            });
        }
        let tag = String::from_utf8_lossy(&data.split_to(tag_len)).into_owned();

        let consumed = RECORD_PREFIX_LEN + value_len + tag_len;
        let pad = (8 - consumed % 8) % 8;
        if pad > 0 {
            if data.remaining() < pad {
                return Err(BlueError::UnexpectedEndOfExtendedHeader {
                    offset,
                    needed: pad,
                    available: data.remaining(),
                });
            }
            data.advance(pad);
        }

        entries.push(ExtendedHeaderEntry {
            tag,
            type_char,
            value,
            lkey,
            lext,
            ltag,
        });
        bytes_remaining -= i64::from(lkey);
    }

    Ok(entries)
}

/// Parse the extended-header keyword records of a Blue File.
///
/// Returns an empty sequence when the HCB reports no extended header.
/// Seeks to `ext_start * 512` with a scoped handle and walks one record per
/// iteration until `ext_size` bytes of records are accounted for. Truncated
/// length fields abort the whole sequence; unknown value types do not.
pub fn parse_extended_header(
    path: &Path,
    hcb: &HeaderControlBlock,
    endian: Endianness,
) -> BlueResult<Vec<ExtendedHeaderEntry>> {
    if hcb.ext_size <= 0 {
        return Ok(Vec::new());
    }

    let path_str = path.display().to_string();
    let mut file = std::fs::File::open(path).map_err(|e| BlueError::from_io(&path_str, &e))?;
    file.seek(SeekFrom::Start(hcb.ext_start as u64 * BLOCK_SIZE as u64))
        .map_err(|e| BlueError::from_io(&path_str, &e))?;

    let mut region = Vec::new();
    file.read_to_end(&mut region)
        .map_err(|e| BlueError::from_io(&path_str, &e))?;

    let mut data = Bytes::from(region);
    decode_keyword_records(&mut data, hcb.ext_size, endian)
}
