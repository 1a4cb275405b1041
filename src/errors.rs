use thiserror::Error;

/// Comprehensive error type for Blue File decoding and SigMF conversion
///
/// Covers every failure mode of the four decode stages (endianness probe,
/// HCB, extended header, sample payload) plus the SigMF artifact writers.
/// Each error carries enough context to locate the fault in the input file.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlueError {
    // ========== I/O ERRORS (1000-1099) ==========
    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        path: String,
        io_kind: Option<std::io::ErrorKind>,
    },

    /// Error reading file contents
    #[error("Failed to read file {path}: {reason}")]
    FileReadError { path: String, reason: String },

    /// Error writing a derived artifact
    #[error("Failed to write file {path}: {reason}")]
    FileWriteError { path: String, reason: String },

    /// Permission denied when accessing file
    #[error("Permission denied accessing file: {path}")]
    PermissionDenied { path: String },

    // ========== HEADER ERRORS (2000-2099) ==========
    /// Header Control Block shorter than the fixed 512 bytes
    #[error("Truncated header: expected {expected} bytes, got {actual}")]
    TruncatedHeader { expected: usize, actual: usize },

    /// Representation tag is neither "EEEI" nor "IEEE"
    #[error("Invalid endianness tag in {field}: expected \"EEEI\" or \"IEEE\", found {found:?}")]
    InvalidEndiannessTag { field: &'static str, found: String },

    /// Neither byte-order candidate passed the probe sanity checks
    #[error("Ambiguous endianness: no byte-order candidate passed probe checks on {probed} header bytes")]
    AmbiguousEndianness { probed: usize },

    /// A fixed-layout field could not be reinterpreted as its declared type
    #[error("Failed to decode HCB field {field}: {reason}")]
    FieldDecodeError { field: &'static str, reason: String },

    // ========== EXTENDED HEADER ERRORS (3000-3099) ==========
    /// A declared record length runs past the available extended-header bytes
    #[error("Unexpected end of extended header at offset {offset}: needed {needed} bytes, only {available} available")]
    UnexpectedEndOfExtendedHeader {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Keyword record length fields are inconsistent or non-positive
    #[error("Invalid keyword record length at offset {offset}: lkey={lkey}, lext={lext}")]
    InvalidKeywordLength { offset: usize, lkey: i32, lext: i16 },

    // ========== SAMPLE PAYLOAD ERRORS (4000-4099) ==========
    /// Format code outside the supported {CI,CL,CF,SB,SI,SL,SX,SF,SD} set
    #[error("Unsupported sample format code: {format:?}")]
    UnsupportedSampleFormat { format: String },

    /// Pre-flight sample-period check failed
    #[error("Invalid time interval: {value} (must be > 0)")]
    InvalidTimeInterval { value: f64 },

    // ========== CONVERSION ERRORS (5000-5099) ==========
    /// SigMF metadata could not be serialized to JSON
    #[error("Failed to serialize SigMF metadata: {reason}")]
    MetadataSerialization { reason: String },

    /// Top-level wrapper: conversion of one file failed, cause preserved
    #[error("Conversion failed for {path}: {source}")]
    ConversionFailed {
        path: String,
        #[source]
        source: Box<BlueError>,
    },
}

impl BlueError {
    /// Get the error code for machine-readable processing
    pub fn code(&self) -> u16 {
        match self {
            // I/O Errors (1000-1099)
            Self::FileNotFound { .. } => 1001,
            Self::FileReadError { .. } => 1002,
            Self::FileWriteError { .. } => 1003,
            Self::PermissionDenied { .. } => 1004,

            // Header Errors (2000-2099)
            Self::TruncatedHeader { .. } => 2001,
            Self::InvalidEndiannessTag { .. } => 2002,
            Self::AmbiguousEndianness { .. } => 2003,
            Self::FieldDecodeError { .. } => 2004,

            // Extended Header Errors (3000-3099)
            Self::UnexpectedEndOfExtendedHeader { .. } => 3001,
            Self::InvalidKeywordLength { .. } => 3002,

            // Sample Payload Errors (4000-4099)
            Self::UnsupportedSampleFormat { .. } => 4001,
            Self::InvalidTimeInterval { .. } => 4002,

            // Conversion Errors (5000-5099)
            Self::MetadataSerialization { .. } => 5001,
            Self::ConversionFailed { .. } => 5002,
        }
    }

    /// Check if the error is recoverable (decoding can continue)
    ///
    /// Only the endianness probe exhausting its candidates is recoverable:
    /// the decoder falls back to little-endian and records the fallback.
    /// Structural and length violations are fatal because record boundaries
    /// can no longer be determined.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::AmbiguousEndianness { .. })
    }

    /// Get suggested action for handling this error
    pub fn suggested_action(&self) -> &'static str {
        match self {
            Self::FileNotFound { .. } => "Check file path and ensure file exists",
            Self::PermissionDenied { .. } => "Check file permissions and user access rights",
            Self::TruncatedHeader { .. } => "File is shorter than a Blue File header; verify the input",
            Self::InvalidEndiannessTag { .. } => "Verify this is a valid MIDAS Blue File",
            Self::AmbiguousEndianness { .. } => "Inspect head_rep/data_rep tags; little-endian was assumed",
            Self::UnexpectedEndOfExtendedHeader { .. } => "Extended header appears corrupted or truncated",
            Self::InvalidKeywordLength { .. } => "Keyword record lengths are corrupt; file may be damaged",
            Self::UnsupportedSampleFormat { .. } => "Only CI/CL/CF/SB/SI/SL/SX/SF/SD payloads are supported",
            Self::InvalidTimeInterval { .. } => "Adjunct sample period is non-positive; file may not be a signal recording",
            _ => "Check file integrity against the MIDAS Blue File layout",
        }
    }

    /// Map an io::Error from opening/reading `path` into the taxonomy
    pub fn from_io(path: &str, e: &std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => BlueError::FileNotFound {
                path: path.to_string(),
                io_kind: Some(e.kind()),
            },
            std::io::ErrorKind::PermissionDenied => BlueError::PermissionDenied {
                path: path.to_string(),
            },
            _ => BlueError::FileReadError {
                path: path.to_string(),
                reason: e.to_string(),
            },
        }
    }
}

/// Result type alias for Blue File operations
pub type BlueResult<T> = Result<T, BlueError>;
