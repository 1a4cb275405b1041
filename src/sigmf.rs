use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat};
use phf::phf_map;
use serde::Serialize;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha512};
use tracing::info;

use crate::errors::{BlueError, BlueResult};
use crate::ext_header::{first_by_tag, ExtendedHeaderEntry};
use crate::hcb::{Adjunct, HeaderControlBlock};
use crate::samples::{DecoderConfig, SamplePayload};
use crate::BlueFile;

/// Seconds between the Blue File epoch (1950-01-01) and the POSIX epoch
pub const BLUE_EPOCH_OFFSET_SECS: i64 = 631_152_000;

/// Blue format code to native SigMF datatype stem; the byte-order suffix
/// comes from `data_rep`
static NATIVE_DATATYPES: phf::Map<&'static str, &'static str> = phf_map! {
    "SB" => "ri8",
    "SI" => "ri16",
    "SL" => "ri32",
    "SX" => "ri64",
    "SF" => "rf32",
    "SD" => "rf64",
    "CB" => "ci8",
    "CI" => "ci16",
    "CL" => "ci32",
    "CX" => "ci64",
    "CF" => "cf32",
    "CD" => "cf32",
};

/// Bytes per sample for each native datatype stem
static DATATYPE_SIZES: phf::Map<&'static str, u64> = phf_map! {
    "ri8" => 1,
    "ri16" => 2,
    "ri32" => 4,
    "ri64" => 8,
    "rf32" => 4,
    "rf64" => 8,
    "ci16" => 4,
    "ci32" => 8,
    "cf32" => 8,
};

/// Options for one conversion run
#[derive(Debug, Clone, Default)]
pub struct ConverterOptions {
    /// Annotation label; omitted from the metadata when not set
    pub label: Option<String>,
    /// Sample decode policy
    pub decoder: DecoderConfig,
}

/// SigMF metadata document: global object plus captures and annotations
/// arrays, serialized as the `.sigmf-meta` sidecar
#[derive(Debug, Clone, Serialize)]
pub struct SigmfMetadata {
    pub global: Map<String, Value>,
    pub captures: Vec<Map<String, Value>>,
    pub annotations: Vec<Map<String, Value>>,
}

/// Paths and metadata produced by one file conversion
#[derive(Debug)]
pub struct ConversionResult {
    pub metadata: SigmfMetadata,
    pub data_path: PathBuf,
    pub meta_path: PathBuf,
    pub sample_count: usize,
}

/// SigMF datatype describing the payload this converter actually emits
/// (always little-endian on the way out)
pub fn emitted_datatype(payload: &SamplePayload) -> &'static str {
    match payload {
        SamplePayload::Complex(_) => "cf32_le",
        SamplePayload::Real32(_) => "rf32_le",
        SamplePayload::Real64(_) => "rf64_le",
        SamplePayload::Int64(_) => "ri64_le",
    }
}

/// Convert a Blue File timecode (seconds since 1950-01-01) to an ISO-8601
/// UTC string with millisecond precision
pub fn timecode_to_iso8601(timecode: f64) -> String {
    let epoch_secs = timecode as i64 - BLUE_EPOCH_OFFSET_SECS;
    let dt = DateTime::from_timestamp(epoch_secs, 0).unwrap_or(DateTime::UNIX_EPOCH);
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// SHA-512 of a file, computed in 1 MiB chunks
pub fn sha512_file(path: &Path) -> BlueResult<String> {
    let path_str = path.display().to_string();
    let mut file = std::fs::File::open(path).map_err(|e| BlueError::from_io(&path_str, &e))?;
    let mut hasher = Sha512::new();
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| BlueError::from_io(&path_str, &e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Write the decoded payload as a little-endian `.sigmf-data` file
pub fn write_data_file(path: &Path, payload: &SamplePayload) -> BlueResult<()> {
    let path_str = path.display().to_string();
    let mut out = Vec::new();
    match payload {
        SamplePayload::Complex(v) => {
            out.reserve(v.len() * 8);
            for s in v {
                out.extend_from_slice(&s.re.to_le_bytes());
                out.extend_from_slice(&s.im.to_le_bytes());
            }
        }
        SamplePayload::Real32(v) => {
            out.reserve(v.len() * 4);
            for s in v {
                out.extend_from_slice(&s.to_le_bytes());
            }
        }
        SamplePayload::Real64(v) => {
            out.reserve(v.len() * 8);
            for s in v {
                out.extend_from_slice(&s.to_le_bytes());
            }
        }
        SamplePayload::Int64(v) => {
            out.reserve(v.len() * 8);
            for s in v {
                out.extend_from_slice(&s.to_le_bytes());
            }
        }
    }
    let mut file = std::fs::File::create(path).map_err(|e| BlueError::FileWriteError {
        path: path_str.clone(),
        reason: e.to_string(),
    })?;
    file.write_all(&out).map_err(|e| BlueError::FileWriteError {
        path: path_str,
        reason: e.to_string(),
    })
}

fn tag_value(entries: &[ExtendedHeaderEntry], tag: &str) -> Option<f64> {
    first_by_tag(entries, tag).and_then(|e| e.value.as_f64())
}

/// Preferred sample rate: the reciprocal of a positive adjunct `xdelta`,
/// else the first `SAMPLE_RATE` extended-header keyword
pub fn resolve_sample_rate(hcb: &HeaderControlBlock, entries: &[ExtendedHeaderEntry]) -> Option<f64> {
    match hcb.adjunct.xdelta() {
        Some(xdelta) if xdelta > 0.0 => Some(1.0 / xdelta),
        _ => tag_value(entries, "SAMPLE_RATE"),
    }
}

/// Bytes per sample of the native Blue datatype, for the annotation sample
/// count (computed from `data_size` exactly as the legacy converter did)
fn native_bytes_per_sample(hcb: &HeaderControlBlock) -> BlueResult<u64> {
    let stem = NATIVE_DATATYPES
        .get(hcb.format.as_str())
        .ok_or_else(|| BlueError::UnsupportedSampleFormat {
            format: hcb.format.clone(),
        })?;
    DATATYPE_SIZES
        .get(stem)
        .copied()
        .ok_or_else(|| BlueError::UnsupportedSampleFormat {
            format: hcb.format.clone(),
        })
}

/// Build the SigMF metadata document from the decoded structures.
///
/// Every decoded HCB field, adjunct field and extended-header keyword is
/// carried into the global object under a `core:blue_*` prefix so nothing
/// from the source file is lost in conversion.
pub fn build_metadata(
    hcb: &HeaderControlBlock,
    entries: &[ExtendedHeaderEntry],
    payload: &SamplePayload,
    sha512: &str,
    label: Option<&str>,
) -> BlueResult<SigmfMetadata> {
    let serialize_err = |e: serde_json::Error| BlueError::MetadataSerialization {
        reason: e.to_string(),
    };

    let mut global = Map::new();
    global.insert(
        "core:author".to_string(),
        json!("Blue File Conversion - Unknown Author"),
    );
    global.insert("core:datatype".to_string(), json!(emitted_datatype(payload)));
    global.insert("core:description".to_string(), json!(hcb.keywords));
    global.insert(
        "core:hw".to_string(),
        json!("Blue File Conversion - Unknown Hardware"),
    );
    global.insert(
        "core:license".to_string(),
        json!("Blue File Conversion - Unknown License"),
    );
    let num_channels = if hcb.outlets > 0 {
        i64::from(hcb.outlets)
    } else {
        1
    };
    global.insert("core:num_channels".to_string(), json!(num_channels));
    global.insert(
        "core:sample_rate".to_string(),
        match resolve_sample_rate(hcb, entries) {
            Some(rate) => json!(rate),
            None => Value::Null,
        },
    );
    global.insert("core:version".to_string(), json!("1.0.0"));
    global.insert("core:sha512".to_string(), json!(sha512));

    // Prefixed copies of the fixed HCB fields; the adjunct gets its own
    // prefix below
    let hcb_value = serde_json::to_value(hcb).map_err(serialize_err)?;
    if let Value::Object(fields) = hcb_value {
        for (name, value) in fields {
            if name == "adjunct" {
                continue;
            }
            global.insert(format!("core:blue_hcb_{}", name), value);
        }
    }

    match &hcb.adjunct {
        Adjunct::Opaque { .. } => {}
        adjunct => {
            let value = serde_json::to_value(adjunct).map_err(serialize_err)?;
            if let Value::Object(fields) = value {
                for (name, value) in fields {
                    global.insert(format!("core:blue_adjunct_header_{}", name), value);
                }
            }
        }
    }

    for entry in entries {
        if entry.tag.is_empty() {
            continue;
        }
        // First record wins for duplicate tags
        let key = format!("core:blue_extended_header_{}", entry.tag);
        if !global.contains_key(&key) {
            global.insert(key, serde_json::to_value(&entry.value).map_err(serialize_err)?);
        }
    }

    let rf_freq = tag_value(entries, "RF_FREQ").unwrap_or(0.0);
    let bandwidth = tag_value(entries, "SBT_BANDWIDTH").unwrap_or(0.0);

    let mut capture = Map::new();
    capture.insert(
        "core:datetime".to_string(),
        json!(timecode_to_iso8601(hcb.timecode)),
    );
    capture.insert("core:frequency".to_string(), json!(rf_freq));
    capture.insert("core:sample_start".to_string(), json!(0));

    let sample_count = (hcb.data_size as u64) / native_bytes_per_sample(hcb)?;
    let mut annotation = Map::new();
    annotation.insert("core:sample_start".to_string(), json!(0));
    annotation.insert("core:sample_count".to_string(), json!(sample_count));
    annotation.insert(
        "core:freq_upper_edge".to_string(),
        json!(rf_freq + bandwidth),
    );
    annotation.insert("core:freq_lower_edge".to_string(), json!(rf_freq));
    if let Some(label) = label {
        annotation.insert("core:label".to_string(), json!(label));
    }

    Ok(SigmfMetadata {
        global,
        captures: vec![capture],
        annotations: vec![annotation],
    })
}

fn artifact_path(input: &Path, extension: &str) -> PathBuf {
    let mut path = input.to_path_buf();
    path.set_extension(extension);
    path
}

fn convert_inner(path: &Path, options: &ConverterOptions) -> BlueResult<ConversionResult> {
    let blue = BlueFile::from_path_with_config(path, &options.decoder)?;

    let data_path = artifact_path(path, "sigmf-data");
    write_data_file(&data_path, &blue.samples)?;
    let sha512 = sha512_file(&data_path)?;

    let metadata = build_metadata(
        &blue.hcb,
        &blue.extended_header,
        &blue.samples,
        &sha512,
        options.label.as_deref(),
    )?;

    let meta_path = artifact_path(path, "sigmf-meta");
    let json =
        serde_json::to_string_pretty(&metadata).map_err(|e| BlueError::MetadataSerialization {
            reason: e.to_string(),
        })?;
    std::fs::write(&meta_path, json).map_err(|e| BlueError::FileWriteError {
        path: meta_path.display().to_string(),
        reason: e.to_string(),
    })?;

    info!(
        data = %data_path.display(),
        meta = %meta_path.display(),
        samples = blue.samples.len(),
        "wrote SigMF artifacts"
    );

    Ok(ConversionResult {
        sample_count: blue.samples.len(),
        metadata,
        data_path,
        meta_path,
    })
}

/// Convert one Blue File into a `.sigmf-data` / `.sigmf-meta` pair next to
/// the input. Any decode or write failure is wrapped with the input path,
/// the triggering cause preserved as the error source.
pub fn convert_file(path: &Path, options: &ConverterOptions) -> BlueResult<ConversionResult> {
    convert_inner(path, options).map_err(|e| BlueError::ConversionFailed {
        path: path.display().to_string(),
        source: Box::new(e),
    })
}
