use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use bytes::{Buf, Bytes};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::endian::Endianness;
use crate::errors::{BlueError, BlueResult};
use crate::hcb::HEADER_SIZE;

/// Raw byte offset of the pre-flight sample period (the 1-D adjunct xdelta
/// position), read independently of the HCB field table
const TIME_INTERVAL_OFFSET: usize = 264;
/// Raw byte offset of the extended-header byte count within the HCB
const EXT_SIZE_OFFSET: usize = 28;

/// Supported two-character format codes, first char shape (S/C), second
/// char element type (B/I/L/X/F/D)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleFormat {
    /// Complex int16 pairs
    CI,
    /// Complex int32 pairs
    CL,
    /// Complex float32 pairs
    CF,
    /// Scalar int8
    SB,
    /// Scalar int16
    SI,
    /// Scalar int32
    SL,
    /// Scalar int64
    SX,
    /// Scalar float32
    SF,
    /// Scalar float64
    SD,
}

impl SampleFormat {
    pub fn from_code(code: &str) -> BlueResult<Self> {
        match code {
            "CI" => Ok(SampleFormat::CI),
            "CL" => Ok(SampleFormat::CL),
            "CF" => Ok(SampleFormat::CF),
            "SB" => Ok(SampleFormat::SB),
            "SI" => Ok(SampleFormat::SI),
            "SL" => Ok(SampleFormat::SL),
            "SX" => Ok(SampleFormat::SX),
            "SF" => Ok(SampleFormat::SF),
            "SD" => Ok(SampleFormat::SD),
            other => Err(BlueError::UnsupportedSampleFormat {
                format: other.to_string(),
            }),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            SampleFormat::CI => "CI",
            SampleFormat::CL => "CL",
            SampleFormat::CF => "CF",
            SampleFormat::SB => "SB",
            SampleFormat::SI => "SI",
            SampleFormat::SL => "SL",
            SampleFormat::SX => "SX",
            SampleFormat::SF => "SF",
            SampleFormat::SD => "SD",
        }
    }

    /// Bytes per wire element as counted by the element-count formula.
    /// Complex integer formats count individual I/Q scalars; CF counts
    /// whole 8-byte complex values.
    pub fn element_size(&self) -> usize {
        match self {
            SampleFormat::SB => 1,
            SampleFormat::CI | SampleFormat::SI => 2,
            SampleFormat::CL | SampleFormat::SL | SampleFormat::SF => 4,
            SampleFormat::CF | SampleFormat::SX | SampleFormat::SD => 8,
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, SampleFormat::CI | SampleFormat::CL | SampleFormat::CF)
    }
}

/// One complex sample as 32-bit float I/Q
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Complex32 {
    pub re: f32,
    pub im: f32,
}

impl Complex32 {
    pub fn new(re: f32, im: f32) -> Self {
        Complex32 { re, im }
    }
}

/// Decoded sample sequence, shaped by the HCB format code
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SamplePayload {
    /// CI/CL (normalized) and CF payloads
    Complex(Vec<Complex32>),
    /// SB/SI/SL (normalized), SF, and normalized SX payloads
    Real32(Vec<f32>),
    /// SD payloads
    Real64(Vec<f64>),
    /// SX payloads with normalization off (default)
    Int64(Vec<i64>),
}

impl SamplePayload {
    /// Number of samples (complex values count once)
    pub fn len(&self) -> usize {
        match self {
            SamplePayload::Complex(v) => v.len(),
            SamplePayload::Real32(v) => v.len(),
            SamplePayload::Real64(v) => v.len(),
            SamplePayload::Int64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decode policy knobs, explicit where the legacy behavior was ambiguous
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Normalize SX (scalar int64) samples to the unit interval like the
    /// other scalar integer formats. Off by default: the observed legacy
    /// behavior leaves SX unnormalized, and silently changing sample values
    /// is worse than an explicit flag.
    pub normalize_int64: bool,
}

fn read_scaled_f32(data: &mut Bytes, endian: Endianness, format: SampleFormat, max: f32) -> f32 {
    let raw = match format {
        SampleFormat::SB => f32::from(data.get_i8()),
        SampleFormat::SI | SampleFormat::CI => f32::from(endian.get_i16(data)),
        _ => endian.get_i32(data) as f32,
    };
    raw / max
}

fn decode_payload(
    mut data: Bytes,
    count: usize,
    format: SampleFormat,
    endian: Endianness,
    config: &DecoderConfig,
) -> SamplePayload {
    match format {
        SampleFormat::CI | SampleFormat::CL => {
            let max = if format == SampleFormat::CI {
                i16::MAX as f32
            } else {
                i32::MAX as f32
            };
            // Interleaved I/Q scalars, floored to whole pairs
            let pairs = count / 2;
            let mut samples = Vec::with_capacity(pairs);
            for _ in 0..pairs {
                let re = read_scaled_f32(&mut data, endian, format, max);
                let im = read_scaled_f32(&mut data, endian, format, max);
                samples.push(Complex32::new(re, im));
            }
            SamplePayload::Complex(samples)
        }
        SampleFormat::CF => {
            let mut samples = Vec::with_capacity(count);
            for _ in 0..count {
                let re = endian.get_f32(&mut data);
                let im = endian.get_f32(&mut data);
                samples.push(Complex32::new(re, im));
            }
            SamplePayload::Complex(samples)
        }
        SampleFormat::SB | SampleFormat::SI | SampleFormat::SL => {
            let max = match format {
                SampleFormat::SB => i8::MAX as f32,
                SampleFormat::SI => i16::MAX as f32,
                _ => i32::MAX as f32,
            };
            let samples = (0..count)
                .map(|_| read_scaled_f32(&mut data, endian, format, max))
                .collect();
            SamplePayload::Real32(samples)
        }
        SampleFormat::SX => {
            let raw: Vec<i64> = (0..count).map(|_| endian.get_i64(&mut data)).collect();
            if config.normalize_int64 {
                SamplePayload::Real32(raw.iter().map(|v| (*v as f64 / i64::MAX as f64) as f32).collect())
            } else {
                SamplePayload::Int64(raw)
            }
        }
        SampleFormat::SF => {
            SamplePayload::Real32((0..count).map(|_| endian.get_f32(&mut data)).collect())
        }
        SampleFormat::SD => {
            SamplePayload::Real64((0..count).map(|_| endian.get_f64(&mut data)).collect())
        }
    }
}

/// Decode the trailing sample region of a Blue File.
///
/// Re-reads the raw header for its own pass: the format code at bytes
/// 52..54, the pre-flight `time_interval` at 264..272 (must be positive)
/// and the extended-header byte count at 28..32, deliberately not the
/// already-decoded HCB fields, so this stage has no decode-order coupling.
/// The element count is `floor((filesize - ext_header_bytes) / element_size)`
/// truncated to the bytes physically present after the 512-byte header.
pub fn parse_samples(
    path: &Path,
    endian: Endianness,
    config: &DecoderConfig,
) -> BlueResult<SamplePayload> {
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

    let code = String::from_utf8_lossy(&header[52..54]).into_owned();
    let format = SampleFormat::from_code(&code)?;

    let time_interval = endian.read_f64(&header[TIME_INTERVAL_OFFSET..TIME_INTERVAL_OFFSET + 8]);
    if time_interval <= 0.0 {
        return Err(BlueError::InvalidTimeInterval {
            value: time_interval,
        });
    }
    debug!(
        format = format.code(),
        sample_rate_hz = 1.0 / time_interval,
        "sample payload pre-flight"
    );

    let ext_bytes = endian
        .read_i32(&header[EXT_SIZE_OFFSET..EXT_SIZE_OFFSET + 4])
        .max(0) as u64;
    let file_size = file
        .metadata()
        .map_err(|e| BlueError::from_io(&path_str, &e))?
        .len();

    let elem_size = format.element_size() as u64;
    let requested = file_size.saturating_sub(ext_bytes) / elem_size;
    let available = file_size.saturating_sub(HEADER_SIZE as u64) / elem_size;
    let count = requested.min(available) as usize;

    file.seek(SeekFrom::Start(HEADER_SIZE as u64))
        .map_err(|e| BlueError::from_io(&path_str, &e))?;
    let mut raw = vec![0u8; count * elem_size as usize];
    file.read_exact(&mut raw)
        .map_err(|e| BlueError::from_io(&path_str, &e))?;

    Ok(decode_payload(Bytes::from(raw), count, format, endian, config))
}
