use byteorder::{BigEndian, ByteOrder, LittleEndian};
use bytes::{Buf, Bytes};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{BlueError, BlueResult};

/// Blue File representation tag for little-endian data ("EEEI")
pub const REP_LITTLE: &str = "EEEI";
/// Blue File representation tag for big-endian data ("IEEE")
pub const REP_BIG: &str = "IEEE";

/// Byte offset of the `data_rep` tag within the HCB
const DATA_REP_OFFSET: usize = 8;
/// Byte offset of the `version` probe field
const VERSION_OFFSET: usize = 0;
/// Byte offset of the `data_size` probe field
const DATA_SIZE_OFFSET: usize = 40;
/// Minimum bytes the probe needs: through the end of `data_size`
const MIN_PROBE_LEN: usize = DATA_SIZE_OFFSET + 8;

/// Loose sanity bound for the `data_size` probe: a plausible value may not
/// exceed the probe buffer length times this factor. Heuristic slack against
/// byte-order-induced overflow misreads, not a format constant.
pub const MAX_DATA_SIZE_FACTOR: f64 = 100.0;

/// Resolved byte order of a Blue File section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    /// Map a representation tag ("EEEI"/"IEEE") to a byte order
    pub fn from_rep_tag(tag: &str) -> Option<Self> {
        match tag {
            REP_LITTLE => Some(Endianness::Little),
            REP_BIG => Some(Endianness::Big),
            _ => None,
        }
    }

    pub fn read_i16(&self, buf: &[u8]) -> i16 {
        match self {
            Endianness::Little => LittleEndian::read_i16(buf),
            Endianness::Big => BigEndian::read_i16(buf),
        }
    }

    pub fn read_i32(&self, buf: &[u8]) -> i32 {
        match self {
            Endianness::Little => LittleEndian::read_i32(buf),
            Endianness::Big => BigEndian::read_i32(buf),
        }
    }

    pub fn read_u32(&self, buf: &[u8]) -> u32 {
        match self {
            Endianness::Little => LittleEndian::read_u32(buf),
            Endianness::Big => BigEndian::read_u32(buf),
        }
    }

    pub fn read_f64(&self, buf: &[u8]) -> f64 {
        match self {
            Endianness::Little => LittleEndian::read_f64(buf),
            Endianness::Big => BigEndian::read_f64(buf),
        }
    }

    // Stream-style accessors over `Bytes`, used by the record decoders.
    // Callers are responsible for checking `remaining()` first.

    pub fn get_i16(&self, data: &mut Bytes) -> i16 {
        match self {
            Endianness::Little => data.get_i16_le(),
            Endianness::Big => data.get_i16(),
        }
    }

    pub fn get_i32(&self, data: &mut Bytes) -> i32 {
        match self {
            Endianness::Little => data.get_i32_le(),
            Endianness::Big => data.get_i32(),
        }
    }

    pub fn get_i64(&self, data: &mut Bytes) -> i64 {
        match self {
            Endianness::Little => data.get_i64_le(),
            Endianness::Big => data.get_i64(),
        }
    }

    pub fn get_f32(&self, data: &mut Bytes) -> f32 {
        match self {
            Endianness::Little => data.get_f32_le(),
            Endianness::Big => data.get_f32(),
        }
    }

    pub fn get_f64(&self, data: &mut Bytes) -> f64 {
        match self {
            Endianness::Little => data.get_f64_le(),
            Endianness::Big => data.get_f64(),
        }
    }
}

/// Probe the byte order of a Blue File header.
///
/// Tries little-endian first, then big-endian, decoding only the designated
/// probe fields (`version`, `data_size`) and accepting the first candidate
/// under which both look plausible: `version` a small positive integer
/// (1..=9) and `data_size` positive and below the sanity bound.
///
/// Fails with `InvalidEndiannessTag` when bytes 8..12 (the `data_rep`
/// position) hold neither "EEEI" nor "IEEE", and with `AmbiguousEndianness`
/// when no candidate passes. Callers that can tolerate ambiguity should use
/// [`detect_endianness`] instead.
pub fn probe_endianness(header: &[u8]) -> BlueResult<Endianness> {
    if header.len() < MIN_PROBE_LEN {
        return Err(BlueError::TruncatedHeader {
            expected: MIN_PROBE_LEN,
            actual: header.len(),
        });
    }

    let rep_tag = String::from_utf8_lossy(&header[DATA_REP_OFFSET..DATA_REP_OFFSET + 4]);
    if Endianness::from_rep_tag(&rep_tag).is_none() {
        return Err(BlueError::InvalidEndiannessTag {
            field: "data_rep",
            found: rep_tag.into_owned(),
        });
    }

    let max_data_size = header.len() as f64 * MAX_DATA_SIZE_FACTOR;
    for endian in [Endianness::Little, Endianness::Big] {
        let version = endian.read_i32(&header[VERSION_OFFSET..VERSION_OFFSET + 4]);
        if !(1..=9).contains(&version) {
            continue;
        }
        let data_size = endian.read_f64(&header[DATA_SIZE_OFFSET..DATA_SIZE_OFFSET + 8]);
        if data_size > 0.0 && data_size <= max_data_size {
            return Ok(endian);
        }
    }

    Err(BlueError::AmbiguousEndianness {
        probed: header.len(),
    })
}

/// Resolve the header byte order, applying the documented fallback.
///
/// An exhausted probe is non-fatal: the decoder logs a warning and assumes
/// little-endian rather than silently trusting either candidate. An invalid
/// representation tag remains fatal.
pub fn detect_endianness(header: &[u8]) -> BlueResult<Endianness> {
    match probe_endianness(header) {
        Ok(endian) => Ok(endian),
        Err(err @ BlueError::AmbiguousEndianness { .. }) => {
            warn!(
                error = %err,
                "endianness probe exhausted, assuming little-endian"
            );
            Ok(Endianness::Little)
        }
        Err(e) => Err(e),
    }
}
