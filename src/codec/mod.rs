//! Compression codec support for container blocks
//!
//! Every block payload in a file is compressed with the single codec named in
//! the header's `avro.codec` entry. The set of codecs is closed; each one sits
//! behind a cargo feature that is on by default.

use std::borrow::Cow;

use crate::error::CodecError;

#[cfg(feature = "snappy")]
use snap::raw::Decoder as SnappyDecoder;

#[cfg(feature = "deflate")]
use flate2::read::DeflateDecoder;

#[cfg(feature = "bzip2")]
use bzip2::read::BzDecoder;

#[cfg(feature = "xz")]
use xz2::read::XzDecoder;

#[cfg(any(feature = "deflate", feature = "zstd", feature = "bzip2", feature = "xz"))]
use std::io::Read;

/// Compression codec used within container blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Codec {
    /// No compression (passthrough)
    #[default]
    Null,
    /// Raw snappy followed by a 4-byte big-endian CRC32 of the uncompressed data
    Snappy,
    /// Raw DEFLATE (RFC 1951), no zlib or gzip wrapper
    Deflate,
    /// Zstandard frame
    Zstd,
    /// Bzip2 stream
    Bzip2,
    /// XZ/LZMA stream
    Xz,
}

impl Codec {
    /// Parse a codec from its name as found in the header metadata.
    ///
    /// # Examples
    /// ```
    /// use avro_columnar::codec::Codec;
    ///
    /// assert_eq!(Codec::from_name("zstandard").unwrap(), Codec::Zstd);
    /// assert!(Codec::from_name("lz4").is_err());
    /// ```
    pub fn from_name(name: &str) -> Result<Self, CodecError> {
        match name {
            "null" => Ok(Codec::Null),
            "snappy" => Ok(Codec::Snappy),
            "deflate" => Ok(Codec::Deflate),
            "zstandard" | "zstd" => Ok(Codec::Zstd),
            "bzip2" => Ok(Codec::Bzip2),
            "xz" => Ok(Codec::Xz),
            unknown => Err(CodecError::UnsupportedCodec(format!(
                "'{}' (supported: null, snappy, deflate, zstandard, bzip2, xz)",
                unknown
            ))),
        }
    }

    /// Canonical name of this codec as written in file metadata.
    pub fn name(&self) -> &'static str {
        match self {
            Codec::Null => "null",
            Codec::Snappy => "snappy",
            Codec::Deflate => "deflate",
            Codec::Zstd => "zstandard",
            Codec::Bzip2 => "bzip2",
            Codec::Xz => "xz",
        }
    }

    /// Whether support for this codec was compiled in.
    pub fn is_enabled(&self) -> bool {
        match self {
            Codec::Null => true,
            Codec::Snappy => cfg!(feature = "snappy"),
            Codec::Deflate => cfg!(feature = "deflate"),
            Codec::Zstd => cfg!(feature = "zstd"),
            Codec::Bzip2 => cfg!(feature = "bzip2"),
            Codec::Xz => cfg!(feature = "xz"),
        }
    }

    /// Decompress a block payload, verifying the snappy checksum.
    pub fn decompress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>, CodecError> {
        self.decompress_with(data, true)
    }

    /// Decompress a block payload.
    ///
    /// The null codec borrows the input; every other codec allocates.
    /// `verify_checksum` only affects snappy, the one codec whose framing
    /// carries a checksum.
    pub fn decompress_with<'a>(
        &self,
        data: &'a [u8],
        verify_checksum: bool,
    ) -> Result<Cow<'a, [u8]>, CodecError> {
        let _ = verify_checksum;
        match self {
            Codec::Null => Ok(Cow::Borrowed(data)),
            #[cfg(feature = "snappy")]
            Codec::Snappy => decompress_snappy(data, verify_checksum).map(Cow::Owned),
            #[cfg(feature = "deflate")]
            Codec::Deflate => read_to_end(self.name(), DeflateDecoder::new(data)).map(Cow::Owned),
            #[cfg(feature = "zstd")]
            Codec::Zstd => {
                let decoder = zstd::Decoder::new(data).map_err(|e| CodecError::Decompression {
                    codec: self.name(),
                    message: format!("decoder initialization failed: {}", e),
                })?;
                read_to_end(self.name(), decoder).map(Cow::Owned)
            }
            #[cfg(feature = "bzip2")]
            Codec::Bzip2 => read_to_end(self.name(), BzDecoder::new(data)).map(Cow::Owned),
            #[cfg(feature = "xz")]
            Codec::Xz => read_to_end(self.name(), XzDecoder::new(data)).map(Cow::Owned),
            #[allow(unreachable_patterns)]
            disabled => Err(CodecError::UnsupportedCodec(format!(
                "'{}' (support not compiled in, enable the '{}' feature)",
                disabled.name(),
                disabled.feature_name()
            ))),
        }
    }

    fn feature_name(&self) -> &'static str {
        match self {
            Codec::Null => "default",
            Codec::Snappy => "snappy",
            Codec::Deflate => "deflate",
            Codec::Zstd => "zstd",
            Codec::Bzip2 => "bzip2",
            Codec::Xz => "xz",
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(any(feature = "deflate", feature = "zstd", feature = "bzip2", feature = "xz"))]
fn read_to_end<R: Read>(codec: &'static str, mut reader: R) -> Result<Vec<u8>, CodecError> {
    let mut decompressed = Vec::new();
    reader
        .read_to_end(&mut decompressed)
        .map_err(|e| CodecError::Decompression {
            codec,
            message: e.to_string(),
        })?;
    Ok(decompressed)
}

/// Snappy with container framing: `[raw snappy][crc32 big-endian]`.
///
/// The checksum is CRC32 with the ISO polynomial, not CRC32C.
#[cfg(feature = "snappy")]
fn decompress_snappy(data: &[u8], verify_checksum: bool) -> Result<Vec<u8>, CodecError> {
    const CRC_SIZE: usize = 4;

    if data.len() < CRC_SIZE {
        return Err(CodecError::Decompression {
            codec: "snappy",
            message: format!("payload too short for checksum: {} bytes", data.len()),
        });
    }

    let (compressed, crc_bytes) = data.split_at(data.len() - CRC_SIZE);
    let expected_crc = u32::from_be_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);

    let decompressed = if compressed.is_empty() {
        Vec::new()
    } else {
        SnappyDecoder::new()
            .decompress_vec(compressed)
            .map_err(|e| CodecError::Decompression {
                codec: "snappy",
                message: e.to_string(),
            })?
    };

    if verify_checksum {
        let actual_crc = crc32fast::hash(&decompressed);
        if actual_crc != expected_crc {
            return Err(CodecError::Decompression {
                codec: "snappy",
                message: format!(
                    "CRC32 checksum mismatch: expected 0x{:08X}, got 0x{:08X}",
                    expected_crc, actual_crc
                ),
            });
        }
    }

    Ok(decompressed)
}
