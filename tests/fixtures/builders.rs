//! Blue File test data builders
//!
//! Builder pattern for generating synthetic Blue Files byte-exact enough to
//! exercise the whole decode pipeline: fixed HCB, adjunct variants, padded
//! extended-header keyword records and a trailing sample payload.

use bluefile_sigmf::{Endianness, BLOCK_SIZE, HEADER_SIZE, RECORD_PREFIX_LEN};
use bytes::{BufMut, BytesMut};

/// Adjunct fixture matching the three dispatch outcomes
#[derive(Debug, Clone)]
pub enum AdjunctFixture {
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

/// One keyword record to encode into the extended header
#[derive(Debug, Clone)]
struct KeywordFixture {
    tag: String,
    type_char: u8,
    value: Vec<u8>,
}

/// Fluent builder for synthetic Blue Files
#[derive(Debug, Clone)]
pub struct BlueFileBuilder {
    endian: Endianness,
    version: [u8; 4],
    file_type: i32,
    format: String,
    timecode: f64,
    outlets: i16,
    keywords: String,
    data_size: Option<f64>,
    /// Written at raw offset 264 when the adjunct is opaque; 1-D/2-D
    /// adjuncts put xdelta there themselves
    time_interval: f64,
    adjunct: AdjunctFixture,
    records: Vec<KeywordFixture>,
    payload: Vec<u8>,
}

impl Default for BlueFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BlueFileBuilder {
    pub fn new() -> Self {
        BlueFileBuilder {
            endian: Endianness::Little,
            version: *b"BLUE",
            file_type: 1000,
            format: "SF".to_string(),
            timecode: 0.0,
            outlets: 0,
            keywords: String::new(),
            data_size: None,
            time_interval: 1.0e-6,
            adjunct: AdjunctFixture::Signal1D {
                xstart: 0.0,
                xdelta: 1.0e-6,
                xunits: 1,
            },
            records: Vec::new(),
            payload: Vec::new(),
        }
    }

    pub fn endian(mut self, endian: Endianness) -> Self {
        self.endian = endian;
        self
    }

    /// Raw version bytes; real files carry "BLUE"
    pub fn version_bytes(mut self, version: [u8; 4]) -> Self {
        self.version = version;
        self
    }

    /// Numeric version in the probe's accepted range, so the endianness
    /// heuristic resolves instead of falling back
    pub fn version_numeric(mut self, version: i32) -> Self {
        let mut bytes = [0u8; 4];
        match self.endian {
            Endianness::Little => bytes.copy_from_slice(&version.to_le_bytes()),
            Endianness::Big => bytes.copy_from_slice(&version.to_be_bytes()),
        }
        self.version = bytes;
        self
    }

    pub fn file_type(mut self, file_type: i32) -> Self {
        self.file_type = file_type;
        self
    }

    pub fn format(mut self, format: &str) -> Self {
        self.format = format.to_string();
        self
    }

    pub fn timecode(mut self, timecode: f64) -> Self {
        self.timecode = timecode;
        self
    }

    pub fn outlets(mut self, outlets: i16) -> Self {
        self.outlets = outlets;
        self
    }

    pub fn keywords(mut self, keywords: &str) -> Self {
        self.keywords = keywords.to_string();
        self
    }

    pub fn data_size(mut self, data_size: f64) -> Self {
        self.data_size = Some(data_size);
        self
    }

    pub fn time_interval(mut self, time_interval: f64) -> Self {
        self.time_interval = time_interval;
        self
    }

    pub fn adjunct(mut self, adjunct: AdjunctFixture) -> Self {
        self.adjunct = adjunct;
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    /// Payload of interleaved little/big-endian i16 I/Q scalars
    pub fn payload_i16(mut self, values: &[i16]) -> Self {
        let mut bytes = Vec::with_capacity(values.len() * 2);
        for v in values {
            match self.endian {
                Endianness::Little => bytes.extend_from_slice(&v.to_le_bytes()),
                Endianness::Big => bytes.extend_from_slice(&v.to_be_bytes()),
            }
        }
        self.payload = bytes;
        self
    }

    pub fn payload_f32(mut self, values: &[f32]) -> Self {
        let mut bytes = Vec::with_capacity(values.len() * 4);
        for v in values {
            match self.endian {
                Endianness::Little => bytes.extend_from_slice(&v.to_le_bytes()),
                Endianness::Big => bytes.extend_from_slice(&v.to_be_bytes()),
            }
        }
        self.payload = bytes;
        self
    }

    pub fn keyword_raw(mut self, tag: &str, type_char: u8, value: Vec<u8>) -> Self {
        self.records.push(KeywordFixture {
            tag: tag.to_string(),
            type_char,
            value,
        });
        self
    }

    pub fn keyword_f32(self, tag: &str, value: f32) -> Self {
        let bytes = match self.endian {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        self.keyword_raw(tag, b'F', bytes.to_vec())
    }

    pub fn keyword_f64(self, tag: &str, value: f64) -> Self {
        let bytes = match self.endian {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        self.keyword_raw(tag, b'D', bytes.to_vec())
    }

    pub fn keyword_i32(self, tag: &str, value: i32) -> Self {
        let bytes = match self.endian {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        self.keyword_raw(tag, b'L', bytes.to_vec())
    }

    pub fn keyword_text(self, tag: &str, value: &str) -> Self {
        self.keyword_raw(tag, b'A', value.as_bytes().to_vec())
    }

    fn w_i16(&self, header: &mut [u8], offset: usize, value: i16) {
        let bytes = match self.endian {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        header[offset..offset + 2].copy_from_slice(&bytes);
    }

    fn w_i32(&self, header: &mut [u8], offset: usize, value: i32) {
        let bytes = match self.endian {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        header[offset..offset + 4].copy_from_slice(&bytes);
    }

    fn w_f64(&self, header: &mut [u8], offset: usize, value: f64) {
        let bytes = match self.endian {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        header[offset..offset + 8].copy_from_slice(&bytes);
    }

    fn encode_records(&self) -> (BytesMut, i32) {
        let mut buf = BytesMut::new();
        let mut ext_size = 0i32;
        for record in &self.records {
            let lkey = (RECORD_PREFIX_LEN + record.value.len()) as i32;
            match self.endian {
                Endianness::Little => {
                    buf.put_i32_le(lkey);
                    buf.put_i16_le(RECORD_PREFIX_LEN as i16);
                }
                Endianness::Big => {
                    buf.put_i32(lkey);
                    buf.put_i16(RECORD_PREFIX_LEN as i16);
                }
            }
            buf.put_i8(record.tag.len() as i8);
            buf.put_u8(record.type_char);
            buf.put_slice(&record.value);
            buf.put_slice(record.tag.as_bytes());
            let consumed = RECORD_PREFIX_LEN + record.value.len() + record.tag.len();
            buf.put_bytes(0, (8 - consumed % 8) % 8);
            ext_size += lkey;
        }
        (buf, ext_size)
    }

    fn encode_adjunct(&self, header: &mut [u8]) {
        match &self.adjunct {
            AdjunctFixture::Signal1D {
                xstart,
                xdelta,
                xunits,
            } => {
                self.w_f64(header, 256, *xstart);
                self.w_f64(header, 264, *xdelta);
                self.w_i32(header, 272, *xunits);
            }
            AdjunctFixture::Signal2D {
                xstart,
                xdelta,
                xunits,
                subsize,
                ystart,
                ydelta,
                yunits,
            } => {
                self.w_f64(header, 256, *xstart);
                self.w_f64(header, 264, *xdelta);
                self.w_i32(header, 272, *xunits);
                self.w_i32(header, 276, *subsize);
                self.w_f64(header, 280, *ystart);
                self.w_f64(header, 288, *ydelta);
                self.w_i32(header, 296, *yunits);
            }
            AdjunctFixture::Opaque { raw } => {
                let len = raw.len().min(256);
                header[256..256 + len].copy_from_slice(&raw[..len]);
                // Keep the pre-flight sample period readable for any type
                self.w_f64(header, 264, self.time_interval);
            }
        }
    }

    /// Serialize the complete synthetic file: header, payload at byte 512,
    /// then the extended-header records at the next 512-byte block boundary
    pub fn build_bytes(self) -> Vec<u8> {
        let (records, ext_size) = self.encode_records();

        let mut header = vec![0u8; HEADER_SIZE];
        header[0..4].copy_from_slice(&self.version);
        let rep: &[u8; 4] = match self.endian {
            Endianness::Little => b"EEEI",
            Endianness::Big => b"IEEE",
        };
        header[4..8].copy_from_slice(rep);
        header[8..12].copy_from_slice(rep);

        let data_start = HEADER_SIZE as f64;
        let data_size = self.data_size.unwrap_or(self.payload.len() as f64);
        let ext_start = if self.records.is_empty() {
            0
        } else {
            ((HEADER_SIZE + self.payload.len()).div_ceil(BLOCK_SIZE)) as i32
        };

        self.w_i32(&mut header, 24, ext_start);
        self.w_i32(&mut header, 28, ext_size);
        self.w_f64(&mut header, 32, data_start);
        self.w_f64(&mut header, 40, data_size);
        self.w_i32(&mut header, 48, self.file_type);
        header[52..54].copy_from_slice(self.format.as_bytes());
        self.w_f64(&mut header, 56, self.timecode);
        self.w_i16(&mut header, 66, self.outlets);
        self.w_i32(&mut header, 160, self.keywords.len() as i32);
        let key_len = self.keywords.len().min(92);
        header[164..164 + key_len].copy_from_slice(&self.keywords.as_bytes()[..key_len]);
        self.encode_adjunct(&mut header);

        let mut out = header;
        out.extend_from_slice(&self.payload);
        if ext_start > 0 {
            out.resize(ext_start as usize * BLOCK_SIZE, 0);
            out.extend_from_slice(&records);
        }
        out
    }

    /// Write the synthetic file into `dir` and return its path
    pub fn write_to(self, dir: &std::path::Path, name: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.build_bytes()).expect("write fixture file");
        path
    }
}
