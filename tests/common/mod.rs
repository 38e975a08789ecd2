//! Container file writer for tests
//!
//! Produces container files byte for byte the way Avro writers lay them
//! out, with any supported codec, so the reader can be exercised without
//! fixture files.

#![allow(dead_code)]

use std::io::Write;

pub const SYNC: [u8; 16] = [
    0x5A, 0x1F, 0x03, 0xC4, 0x77, 0x10, 0x9E, 0x2B, 0x44, 0xD0, 0x6A, 0x81, 0x3C, 0xF5, 0x08, 0xE9,
];

/// Install a test-writer tracing subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Appends Avro binary encodings to a buffer.
#[derive(Debug, Default, Clone)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn long(&mut self, value: i64) -> &mut Self {
        let mut n = ((value << 1) ^ (value >> 63)) as u64;
        loop {
            let byte = (n & 0x7F) as u8;
            n >>= 7;
            if n == 0 {
                self.buf.push(byte);
                break;
            }
            self.buf.push(byte | 0x80);
        }
        self
    }

    pub fn int(&mut self, value: i32) -> &mut Self {
        self.long(value as i64)
    }

    pub fn boolean(&mut self, value: bool) -> &mut Self {
        self.buf.push(value as u8);
        self
    }

    pub fn float(&mut self, value: f32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn double(&mut self, value: f64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn bytes(&mut self, value: &[u8]) -> &mut Self {
        self.long(value.len() as i64);
        self.buf.extend_from_slice(value);
        self
    }

    pub fn string(&mut self, value: &str) -> &mut Self {
        self.bytes(value.as_bytes())
    }

    pub fn fixed(&mut self, value: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(value);
        self
    }

    /// Union branch index; the branch value follows.
    pub fn branch(&mut self, index: i64) -> &mut Self {
        self.long(index)
    }

    /// Decimal in minimal two's complement, as a bytes value.
    pub fn decimal(&mut self, unscaled: i128) -> &mut Self {
        let bytes = decimal_bytes(unscaled);
        self.bytes(&bytes)
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

/// Minimal big-endian two's complement bytes of `value`.
pub fn decimal_bytes(value: i128) -> Vec<u8> {
    let full = value.to_be_bytes();
    let mut start = 0;
    while start < full.len() - 1 {
        let redundant = (full[start] == 0x00 && full[start + 1] & 0x80 == 0)
            || (full[start] == 0xFF && full[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    full[start..].to_vec()
}

/// Compress a block payload the way the named codec frames it.
pub fn compress(codec: &str, data: &[u8]) -> Vec<u8> {
    match codec {
        "null" => data.to_vec(),
        "deflate" => {
            let mut encoder =
                flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap()
        }
        "snappy" => {
            let mut out = snap::raw::Encoder::new().compress_vec(data).unwrap();
            out.extend_from_slice(&crc32fast::hash(data).to_be_bytes());
            out
        }
        "zstandard" | "zstd" => zstd::encode_all(data, 3).unwrap(),
        "bzip2" => {
            let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap()
        }
        "xz" => {
            let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap()
        }
        other => panic!("no test compressor for codec {}", other),
    }
}

/// Builds a complete container file.
#[derive(Debug, Clone)]
pub struct ContainerWriter {
    schema: String,
    codec: Option<String>,
    metadata: Vec<(String, Vec<u8>)>,
    sync: [u8; 16],
    blocks: Vec<(i64, Vec<u8>)>,
}

impl ContainerWriter {
    pub fn new(schema: &str) -> Self {
        Self {
            schema: schema.to_string(),
            codec: None,
            metadata: Vec::new(),
            sync: SYNC,
            blocks: Vec::new(),
        }
    }

    pub fn codec(mut self, codec: &str) -> Self {
        self.codec = Some(codec.to_string());
        self
    }

    pub fn metadata(mut self, key: &str, value: &[u8]) -> Self {
        self.metadata.push((key.to_string(), value.to_vec()));
        self
    }

    /// Add a block of `rows` records whose uncompressed encoding is `payload`.
    pub fn block(mut self, rows: i64, payload: Vec<u8>) -> Self {
        self.blocks.push((rows, payload));
        self
    }

    pub fn finish(&self) -> Vec<u8> {
        let mut out = Encoder::new();
        out.raw(b"Obj\x01");

        let mut entries: Vec<(&str, &[u8])> = vec![("avro.schema", self.schema.as_bytes())];
        if let Some(codec) = &self.codec {
            entries.push(("avro.codec", codec.as_bytes()));
        }
        for (key, value) in &self.metadata {
            entries.push((key.as_str(), value.as_slice()));
        }
        out.long(entries.len() as i64);
        for (key, value) in entries {
            out.string(key).bytes(value);
        }
        out.long(0);
        out.raw(&self.sync);

        let codec = self.codec.as_deref().unwrap_or("null");
        for (rows, payload) in &self.blocks {
            let compressed = compress(codec, payload);
            out.long(*rows).bytes(&compressed).raw(&self.sync);
        }
        out.finish()
    }
}
