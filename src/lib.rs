pub mod endian;
pub mod errors;
pub mod ext_header;
pub mod hcb;
pub mod samples;
pub mod sigmf;

pub use endian::*;
pub use errors::*;
pub use ext_header::*;
pub use hcb::*;
pub use samples::*;
pub use sigmf::*;

use std::path::Path;

use serde::Serialize;
use tracing::debug;

/// A fully decoded MIDAS Blue File: header control block, ordered
/// extended-header keyword records, and the trailing sample payload.
///
/// Decoding is a single synchronous pass per section; each stage opens its
/// own scoped file handle, so independent files can be decoded from
/// parallel threads without shared state.
#[derive(Debug, Serialize)]
pub struct BlueFile {
    pub hcb: HeaderControlBlock,
    pub extended_header: Vec<ExtendedHeaderEntry>,
    pub samples: SamplePayload,
    /// Byte order resolved for the fixed header by the probe heuristic
    pub header_endianness: Endianness,
}

impl BlueFile {
    /// Decode a Blue File with the default sample policy
    pub fn from_path(path: &Path) -> BlueResult<Self> {
        Self::from_path_with_config(path, &DecoderConfig::default())
    }

    /// Decode a Blue File with an explicit sample decode policy.
    ///
    /// Pipeline: probe the header byte order, decode the HCB and adjunct,
    /// walk the extended-header records with the `head_rep` byte order,
    /// then decode the sample region with the `data_rep` byte order.
    pub fn from_path_with_config(path: &Path, config: &DecoderConfig) -> BlueResult<Self> {
        let (hcb, header_endianness) = read_hcb(path)?;
        debug!(
            version = %hcb.version,
            file_type = hcb.file_type,
            format = %hcb.format,
            ext_size = hcb.ext_size,
            "decoded header control block"
        );

        let extended_header = parse_extended_header(path, &hcb, hcb.head_endianness()?)?;
        debug!(entries = extended_header.len(), "decoded extended header");

        let samples = parse_samples(path, hcb.data_endianness()?, config)?;
        debug!(samples = samples.len(), "decoded sample payload");

        Ok(BlueFile {
            hcb,
            extended_header,
            samples,
            header_endianness,
        })
    }

    /// Sample rate in Hz, preferring the adjunct `xdelta` over the
    /// `SAMPLE_RATE` extended-header keyword
    pub fn sample_rate(&self) -> Option<f64> {
        resolve_sample_rate(&self.hcb, &self.extended_header)
    }
}
