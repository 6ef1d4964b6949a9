//! Stream codec registry.
//!
//! The container stores its attribute, X and Y streams as three independently
//! compressed payloads but records nothing about which compressor produced
//! them.  The codec is therefore configuration, supplied by the caller on both
//! read and write, and must match between the two.
//!
//! # Window
//! Every call carries a `window` parameter: the base-2 log of the history
//! window the compressor may use.  The container's historic value is
//! [`DEFAULT_WINDOW`].  Codecs without a tunable window ignore it.
//!
//! # Empty streams
//! An empty input always compresses to an empty payload, and an empty payload
//! with an expected output length of zero decompresses to an empty stream.
//! This holds for every codec so that a design with no stitches produces three
//! zero-length regions regardless of the codec in use.

use std::collections::TryReserveError;
use std::io::{self, Read, Write};
use thiserror::Error;

/// Historic window parameter of the container's compressor.
pub const DEFAULT_WINDOW: u8 = 10;
/// Default Zstd compression level.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

// ── CodecId enum ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecId {
    None,
    Zstd,
    Lz4,
    Brotli,
    Lzma,
}

impl CodecId {
    pub const ALL: [CodecId; 5] = [
        CodecId::None,
        CodecId::Zstd,
        CodecId::Lz4,
        CodecId::Brotli,
        CodecId::Lzma,
    ];

    /// Human-readable name (for diagnostics and configuration).
    pub fn name(self) -> &'static str {
        match self {
            CodecId::None   => "none",
            CodecId::Zstd   => "zstd",
            CodecId::Lz4    => "lz4",
            CodecId::Brotli => "brotli",
            CodecId::Lzma   => "lzma",
        }
    }

    /// Parse from a CLI string.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none"   => Some(CodecId::None),
            "zstd"   => Some(CodecId::Zstd),
            "lz4"    => Some(CodecId::Lz4),
            "brotli" => Some(CodecId::Brotli),
            "lzma"   => Some(CodecId::Lzma),
            _        => None,
        }
    }
}

impl std::fmt::Display for CodecId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Compression error: {0}")]
    Compression(String),
    #[error("Decompression error: {0}")]
    Decompression(String),
    #[error("{codec} produced {actual} bytes, expected {expected}")]
    OutputLength { codec: CodecId, expected: usize, actual: usize },
    #[error("cannot reserve {len} bytes of decoded output")]
    Allocation {
        len: usize,
        #[source]
        source: TryReserveError,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── Codec trait ──────────────────────────────────────────────────────────────

pub trait StreamCodec: Send + Sync {
    fn codec_id(&self) -> CodecId;

    /// Compress one stream.
    fn compress(&self, data: &[u8], window: u8) -> Result<Vec<u8>, CodecError>;

    /// Decompress one stream to exactly `output_len` bytes.
    fn decompress(&self, data: &[u8], output_len: usize, window: u8) -> Result<Vec<u8>, CodecError>;
}

/// Compress through `codec`, mapping empty input to an empty payload.
pub fn compress_stream(
    codec:  &dyn StreamCodec,
    data:   &[u8],
    window: u8,
) -> Result<Vec<u8>, CodecError> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    codec.compress(data, window)
}

/// Decompress through `codec` and check the output length.
pub fn decompress_stream(
    codec:      &dyn StreamCodec,
    data:       &[u8],
    output_len: usize,
    window:     u8,
) -> Result<Vec<u8>, CodecError> {
    if output_len == 0 && data.is_empty() {
        return Ok(Vec::new());
    }
    if data.is_empty() {
        return Err(CodecError::OutputLength {
            codec:    codec.codec_id(),
            expected: output_len,
            actual:   0,
        });
    }
    let out = codec.decompress(data, output_len, window)?;
    if out.len() != output_len {
        return Err(CodecError::OutputLength {
            codec:    codec.codec_id(),
            expected: output_len,
            actual:   out.len(),
        });
    }
    Ok(out)
}

// ── Output bounds ────────────────────────────────────────────────────────────

/// Streaming decoders stop one byte past the expected length so over-long
/// output is still reported as [`CodecError::OutputLength`].
fn overrun_limit(output_len: usize) -> usize {
    output_len.saturating_add(1)
}

/// Empty buffer with room for `len` decoded bytes.
fn reserve_output(len: usize) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    out.try_reserve_exact(len).map_err(|source| CodecError::Allocation { len, source })?;
    Ok(out)
}

/// Collects at most `limit` bytes and fails any write past that.
struct BoundedSink {
    buf:   Vec<u8>,
    limit: usize,
}

impl BoundedSink {
    fn new(limit: usize) -> Self {
        Self { buf: Vec::new(), limit }
    }
}

impl Write for BoundedSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let room = self.limit - self.buf.len();
        if room == 0 && !data.is_empty() {
            return Err(io::Error::new(io::ErrorKind::Other, "decoded output exceeds expected length"));
        }
        let n = room.min(data.len());
        self.buf.extend_from_slice(&data[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ── Built-in codec implementations ──────────────────────────────────────────

pub struct NoneCodec;
impl StreamCodec for NoneCodec {
    fn codec_id(&self) -> CodecId { CodecId::None }
    fn compress(&self, data: &[u8], _: u8) -> Result<Vec<u8>, CodecError> { Ok(data.to_vec()) }
    fn decompress(&self, data: &[u8], _: usize, _: u8) -> Result<Vec<u8>, CodecError> { Ok(data.to_vec()) }
}

pub struct ZstdCodec {
    pub level: i32,
}
impl StreamCodec for ZstdCodec {
    fn codec_id(&self) -> CodecId { CodecId::Zstd }
    fn compress(&self, data: &[u8], window: u8) -> Result<Vec<u8>, CodecError> {
        let mut compressor = zstd::bulk::Compressor::new(self.level)
            .map_err(|e| CodecError::Compression(e.to_string()))?;
        // 10 is also zstd's smallest accepted window log.
        let window_log = u32::from(window).clamp(10, 27);
        compressor
            .set_parameter(zstd::stream::raw::CParameter::WindowLog(window_log))
            .map_err(|e| CodecError::Compression(e.to_string()))?;
        compressor.compress(data).map_err(|e| CodecError::Compression(e.to_string()))
    }
    fn decompress(&self, data: &[u8], output_len: usize, _: u8) -> Result<Vec<u8>, CodecError> {
        let mut out = reserve_output(output_len)?;
        zstd::bulk::decompress_to_buffer(data, &mut out)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;
        Ok(out)
    }
}

pub struct Lz4Codec;
impl StreamCodec for Lz4Codec {
    fn codec_id(&self) -> CodecId { CodecId::Lz4 }
    fn compress(&self, data: &[u8], _: u8) -> Result<Vec<u8>, CodecError> {
        Ok(lz4_flex::block::compress(data))
    }
    fn decompress(&self, data: &[u8], output_len: usize, _: u8) -> Result<Vec<u8>, CodecError> {
        let mut out = reserve_output(output_len)?;
        out.resize(output_len, 0);
        let written = lz4_flex::block::decompress_into(data, &mut out)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;
        out.truncate(written);
        Ok(out)
    }
}

pub struct BrotliCodec {
    pub quality: u32,
}
impl StreamCodec for BrotliCodec {
    fn codec_id(&self) -> CodecId { CodecId::Brotli }
    fn compress(&self, data: &[u8], window: u8) -> Result<Vec<u8>, CodecError> {
        let lgwin = u32::from(window).clamp(10, 24);
        let mut out = Vec::new();
        {
            let mut w = brotli::CompressorWriter::new(&mut out, 4096, self.quality, lgwin);
            w.write_all(data).map_err(|e| CodecError::Compression(e.to_string()))?;
        }
        Ok(out)
    }
    fn decompress(&self, data: &[u8], output_len: usize, _: u8) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        brotli::Decompressor::new(data, 4096)
            .take(overrun_limit(output_len) as u64)
            .read_to_end(&mut out)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;
        Ok(out)
    }
}

pub struct LzmaCodec;
impl StreamCodec for LzmaCodec {
    fn codec_id(&self) -> CodecId { CodecId::Lzma }
    fn compress(&self, data: &[u8], _: u8) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        lzma_rs::lzma_compress(&mut io::Cursor::new(data), &mut out)
            .map_err(|e| CodecError::Compression(e.to_string()))?;
        Ok(out)
    }
    fn decompress(&self, data: &[u8], output_len: usize, _: u8) -> Result<Vec<u8>, CodecError> {
        let limit = overrun_limit(output_len);
        let mut sink = BoundedSink::new(limit);
        // memlimit caps the dictionary buffer, which holds output not yet
        // flushed to the sink.
        let opts = lzma_rs::decompress::Options { memlimit: Some(limit), ..Default::default() };
        match lzma_rs::lzma_decompress_with_options(&mut io::Cursor::new(data), &mut sink, &opts) {
            Ok(()) => Ok(sink.buf),
            Err(_) if sink.buf.len() >= limit => Ok(sink.buf),
            Err(e) => Err(CodecError::Decompression(e.to_string())),
        }
    }
}

// ── Factory ──────────────────────────────────────────────────────────────────

/// Resolve a CodecId to a built-in codec.  `level` is honored by Zstd and
/// (clamped to 0..=11) by Brotli.
pub fn get_codec(id: CodecId, level: i32) -> Box<dyn StreamCodec> {
    match id {
        CodecId::None   => Box::new(NoneCodec),
        CodecId::Zstd   => Box::new(ZstdCodec { level }),
        CodecId::Lz4    => Box::new(Lz4Codec),
        CodecId::Brotli => Box::new(BrotliCodec { quality: level.clamp(0, 11) as u32 }),
        CodecId::Lzma   => Box::new(LzmaCodec),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        (0..600u32).map(|i| (i % 7) as u8 | 0x80).collect()
    }

    #[test]
    fn every_codec_restores_exact_length() {
        let data = sample();
        for id in CodecId::ALL {
            let codec = get_codec(id, DEFAULT_COMPRESSION_LEVEL);
            let packed = compress_stream(codec.as_ref(), &data, DEFAULT_WINDOW).unwrap();
            let unpacked = decompress_stream(codec.as_ref(), &packed, data.len(), DEFAULT_WINDOW).unwrap();
            assert_eq!(unpacked, data, "codec {id}");
        }
    }

    #[test]
    fn empty_stream_is_empty_payload() {
        for id in CodecId::ALL {
            let codec = get_codec(id, DEFAULT_COMPRESSION_LEVEL);
            assert!(compress_stream(codec.as_ref(), &[], DEFAULT_WINDOW).unwrap().is_empty());
            assert!(decompress_stream(codec.as_ref(), &[], 0, DEFAULT_WINDOW).unwrap().is_empty());
        }
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let codec = NoneCodec;
        let err = decompress_stream(&codec, &[1, 2, 3], 4, DEFAULT_WINDOW).unwrap_err();
        assert!(matches!(err, CodecError::OutputLength { expected: 4, actual: 3, .. }));
    }

    #[test]
    fn missing_payload_for_nonempty_stream_is_rejected() {
        let codec = Lz4Codec;
        let err = decompress_stream(&codec, &[], 5, DEFAULT_WINDOW).unwrap_err();
        assert!(matches!(err, CodecError::OutputLength { expected: 5, actual: 0, .. }));
    }

    fn zeros_packed(codec: &dyn StreamCodec) -> Vec<u8> {
        compress_stream(codec, &vec![0u8; 1 << 20], DEFAULT_WINDOW).unwrap()
    }

    #[test]
    fn brotli_stops_one_byte_past_expected_length() {
        let codec = get_codec(CodecId::Brotli, DEFAULT_COMPRESSION_LEVEL);
        let packed = zeros_packed(codec.as_ref());
        assert_eq!(codec.decompress(&packed, 16, DEFAULT_WINDOW).unwrap().len(), 17);
        let err = decompress_stream(codec.as_ref(), &packed, 16, DEFAULT_WINDOW).unwrap_err();
        assert!(matches!(err, CodecError::OutputLength { expected: 16, actual: 17, .. }));
    }

    #[test]
    fn lzma_oversized_output_is_rejected_early() {
        let codec = get_codec(CodecId::Lzma, DEFAULT_COMPRESSION_LEVEL);
        let packed = zeros_packed(codec.as_ref());
        match decompress_stream(codec.as_ref(), &packed, 16, DEFAULT_WINDOW) {
            Err(CodecError::OutputLength { expected: 16, actual, .. }) => assert_eq!(actual, 17),
            Err(CodecError::Decompression(_)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn unreservable_output_is_allocation_error() {
        let packed = compress_stream(&Lz4Codec, &sample(), DEFAULT_WINDOW).unwrap();
        let err = Lz4Codec.decompress(&packed, usize::MAX, DEFAULT_WINDOW).unwrap_err();
        assert!(matches!(err, CodecError::Allocation { len: usize::MAX, .. }));
    }

    #[test]
    fn bounded_sink_refuses_past_limit() {
        let mut sink = BoundedSink::new(3);
        assert_eq!(sink.write(&[1, 2]).unwrap(), 2);
        assert_eq!(sink.write(&[3, 4, 5]).unwrap(), 1);
        assert!(sink.write(&[6]).is_err());
        assert_eq!(sink.buf, [1, 2, 3]);
    }

    #[test]
    fn names_parse_back() {
        for id in CodecId::ALL {
            assert_eq!(CodecId::from_name(id.name()), Some(id));
        }
        assert_eq!(CodecId::from_name("ZSTD"), Some(CodecId::Zstd));
        assert_eq!(CodecId::from_name("hus"), None);
    }
}
