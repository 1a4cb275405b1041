use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::endian::{detect_endianness, Endianness};
use crate::errors::{BlueError, BlueResult};

/// Fixed on-disk size of the Header Control Block
pub const HEADER_SIZE: usize = 512;
/// Unit of the `ext_start` block index
pub const BLOCK_SIZE: usize = 512;
/// Byte offset of the type-dependent adjunct region within the HCB
pub const ADJUNCT_OFFSET: usize = 256;
/// Byte length of the adjunct region
pub const ADJUNCT_SIZE: usize = 256;

/// Type-dependent adjunct block following the fixed HCB fields
///
/// Dispatch is strictly by the HCB `type` code: 1000/1001 carry 1-D signal
/// axis metadata, 2000 adds the second (frame) axis, and every other code
/// keeps the raw 256 bytes untouched so nothing is silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Adjunct {
    Signal1D {
        xstart: f64,
        xdelta: f64,
        xunits: i32,
    },
    Signal2D {
        xstart: f64,
        xdelta: f64,
        xunits: i32,
        subsize: i32,
        ystart: f64,
        ydelta: f64,
        yunits: i32,
    },
    Opaque {
        raw: Vec<u8>,
    },
}

impl Adjunct {
    fn from_bytes(file_type: i32, raw: &[u8], endian: Endianness) -> Self {
        match file_type {
            1000 | 1001 => Adjunct::Signal1D {
                xstart: endian.read_f64(&raw[0..8]),
                xdelta: endian.read_f64(&raw[8..16]),
                xunits: endian.read_i32(&raw[16..20]),
            },
            2000 => Adjunct::Signal2D {
                xstart: endian.read_f64(&raw[0..8]),
                xdelta: endian.read_f64(&raw[8..16]),
                xunits: endian.read_i32(&raw[16..20]),
                subsize: endian.read_i32(&raw[20..24]),
                ystart: endian.read_f64(&raw[24..32]),
                ydelta: endian.read_f64(&raw[32..40]),
                yunits: endian.read_i32(&raw[40..44]),
            },
            _ => Adjunct::Opaque { raw: raw.to_vec() },
        }
    }

    /// Sample period along the primary axis, when this adjunct carries one
    pub fn xdelta(&self) -> Option<f64> {
        match self {
            Adjunct::Signal1D { xdelta, .. } | Adjunct::Signal2D { xdelta, .. } => Some(*xdelta),
            Adjunct::Opaque { .. } => None,
        }
    }
}

/// Decoded Header Control Block: the fixed 512-byte leading structure of a
/// Blue File (160 bytes of named fields, 96 reserved, 256 adjunct).
///
/// Decoded once per file and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderControlBlock {
    /// Header version code, e.g. "BLUE"
    pub version: String,
    /// Header representation: "EEEI" (little) or "IEEE" (big)
    pub head_rep: String,
    /// Data representation: "EEEI" (little) or "IEEE" (big)
    pub data_rep: String,
    /// Detached header flag
    pub detached: i32,
    /// Protected from overwrite
    pub protected: i32,
    /// Pipe mode (N/A)
    pub pipe: i32,
    /// Extended header start, in 512-byte blocks
    pub ext_start: i32,
    /// Extended header size in bytes
    pub ext_size: i32,
    /// Data start in bytes
    pub data_start: f64,
    /// Data size in bytes
    pub data_size: f64,
    /// File type code (drives adjunct dispatch)
    #[serde(rename = "type")]
    pub file_type: i32,
    /// Two-character data format code, e.g. "CI" or "SD"
    pub format: String,
    /// 16-bit flagmask
    pub flagmask: i16,
    /// Time code: seconds since the 1950-01-01 epoch
    pub timecode: f64,
    /// Inlet owner
    pub inlet: i16,
    /// Number of outlets
    pub outlets: i16,
    /// Outlet async mask
    pub outmask: i32,
    /// Pipe location
    pub pipeloc: i32,
    /// Pipe size in bytes
    pub pipesize: i32,
    /// Next input byte
    pub in_byte: f64,
    /// Next output byte (cumulative)
    pub out_byte: f64,
    /// Next output byte per outlet
    pub outbytes: Vec<f64>,
    /// Length of the keyword string
    pub keylength: i32,
    /// User defined keyword string
    pub keywords: String,
    /// Type-dependent adjunct block
    pub adjunct: Adjunct,
}

fn field<'a>(buf: &'a [u8], name: &'static str, offset: usize, len: usize) -> BlueResult<&'a [u8]> {
    buf.get(offset..offset + len)
        .ok_or_else(|| BlueError::FieldDecodeError {
            field: name,
            reason: format!("need {} bytes at offset {}", len, offset),
        })
}

/// Decode an ASCII text field, trimming trailing NUL and space padding
fn text_field(buf: &[u8], name: &'static str, offset: usize, len: usize) -> BlueResult<String> {
    let raw = field(buf, name, offset, len)?;
    Ok(String::from_utf8_lossy(raw)
        .trim_end_matches(['\0', ' '])
        .to_string())
}

impl HeaderControlBlock {
    /// Decode the fixed fields and adjunct region from raw header bytes
    /// using an already-resolved byte order.
    pub fn from_bytes(header: &[u8], endian: Endianness) -> BlueResult<Self> {
        if header.len() < HEADER_SIZE {
            return Err(BlueError::TruncatedHeader {
                expected: HEADER_SIZE,
                actual: header.len(),
            });
        }

        let head_rep = text_field(header, "head_rep", 4, 4)?;
        if Endianness::from_rep_tag(&head_rep).is_none() {
            return Err(BlueError::InvalidEndiannessTag {
                field: "head_rep",
                found: head_rep,
            });
        }
        let data_rep = text_field(header, "data_rep", 8, 4)?;
        if Endianness::from_rep_tag(&data_rep).is_none() {
            return Err(BlueError::InvalidEndiannessTag {
                field: "data_rep",
                found: data_rep,
            });
        }

        let ext_size = endian.read_i32(field(header, "ext_size", 28, 4)?);
        if ext_size < 0 {
            return Err(BlueError::FieldDecodeError {
                field: "ext_size",
                reason: format!("negative extended header size: {}", ext_size),
            });
        }
        let data_size = endian.read_f64(field(header, "data_size", 40, 8)?);
        if data_size <= 0.0 {
            return Err(BlueError::FieldDecodeError {
                field: "data_size",
                reason: format!("non-positive data size: {}", data_size),
            });
        }

        let file_type = endian.read_i32(field(header, "type", 48, 4)?);
        let adjunct_raw = field(header, "adjunct", ADJUNCT_OFFSET, ADJUNCT_SIZE)?;

        let mut outbytes = Vec::with_capacity(8);
        for slot in 0..8 {
            outbytes.push(endian.read_f64(field(header, "outbytes", 96 + slot * 8, 8)?));
        }

        Ok(HeaderControlBlock {
            version: text_field(header, "version", 0, 4)?,
            head_rep,
            data_rep,
            detached: endian.read_i32(field(header, "detached", 12, 4)?),
            protected: endian.read_i32(field(header, "protected", 16, 4)?),
            pipe: endian.read_i32(field(header, "pipe", 20, 4)?),
            ext_start: endian.read_i32(field(header, "ext_start", 24, 4)?),
            ext_size,
            data_start: endian.read_f64(field(header, "data_start", 32, 8)?),
            data_size,
            file_type,
            format: text_field(header, "format", 52, 2)?,
            flagmask: endian.read_i16(field(header, "flagmask", 54, 2)?),
            timecode: endian.read_f64(field(header, "timecode", 56, 8)?),
            inlet: endian.read_i16(field(header, "inlet", 64, 2)?),
            outlets: endian.read_i16(field(header, "outlets", 66, 2)?),
            outmask: endian.read_i32(field(header, "outmask", 68, 4)?),
            pipeloc: endian.read_i32(field(header, "pipeloc", 72, 4)?),
            pipesize: endian.read_i32(field(header, "pipesize", 76, 4)?),
            in_byte: endian.read_f64(field(header, "in_byte", 80, 8)?),
            out_byte: endian.read_f64(field(header, "out_byte", 88, 8)?),
            outbytes,
            keylength: endian.read_i32(field(header, "keylength", 160, 4)?),
            keywords: text_field(header, "keywords", 164, 92)?,
            adjunct: Adjunct::from_bytes(file_type, adjunct_raw, endian),
        })
    }

    /// Byte order of the extended header, derived from `head_rep`
    pub fn head_endianness(&self) -> BlueResult<Endianness> {
        Endianness::from_rep_tag(&self.head_rep).ok_or_else(|| BlueError::InvalidEndiannessTag {
            field: "head_rep",
            found: self.head_rep.clone(),
        })
    }

    /// Byte order of the sample data section, derived from `data_rep`
    pub fn data_endianness(&self) -> BlueResult<Endianness> {
        Endianness::from_rep_tag(&self.data_rep).ok_or_else(|| BlueError::InvalidEndiannessTag {
            field: "data_rep",
            found: self.data_rep.clone(),
        })
    }
}

/// Read and decode the HCB from a Blue File on disk.
///
/// Opens a scoped handle, reads the fixed 512-byte header, re-derives the
/// byte order with the probe heuristic and decodes every fixed field plus
/// the adjunct. Returns the decoded block together with the resolved header
/// byte order.
pub fn read_hcb(path: &Path) -> BlueResult<(HeaderControlBlock, Endianness)> {
    let path_str = path.display().to_string();
    let mut file = std::fs::File::open(path).map_err(|e| BlueError::from_io(&path_str, &e))?;

    let mut header = Vec::with_capacity(HEADER_SIZE);
    (&mut file)
        .take(HEADER_SIZE as u64)
        .read_to_end(&mut header)
        .map_err(|e| BlueError::from_io(&path_str, &e))?;
    if header.len() < HEADER_SIZE {
        return Err(BlueError::TruncatedHeader {
            expected: HEADER_SIZE,
            actual: header.len(),
        });
    }

    let endian = detect_endianness(&header)?;
    let hcb = HeaderControlBlock::from_bytes(&header, endian)?;
    Ok((hcb, endian))
}
