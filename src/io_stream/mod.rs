//! Streaming reader and writer for the VIP container.
//!
//! # Reader
//! [`VipReader`] parses the header, decodes the palette and validates the
//! stream offsets as soon as it is constructed, so inspection never touches
//! the payloads.  [`VipReader::read_pattern`] then extracts each region into
//! its own buffer, decompresses it to exactly one byte per stitch and rebuilds
//! the stitch list.  The returned pattern always ends with a synthetic END
//! stitch at relative (0, 0).
//!
//! # Writer
//! [`VipWriter`] encodes the three per-stitch streams in one pass, compresses
//! them, and derives every offset from the compressed lengths before writing
//! anything, so the output is produced front to back with no seeking.

mod streams;

pub use streams::{encode_streams, EncodedStreams};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Seek, SeekFrom, Write};
use tracing::{debug, warn};

use crate::codec::{compress_stream, decompress_stream, CodecError, StreamCodec};
use crate::error::{alloc_buffer, FormatError, Result, StreamKind, VipError};
use crate::header::{HoopSize, VipHeader, HEADER_SIZE, MAX_COLORS};
use crate::layout::{trailer_len, StreamLayout};
use crate::palette;
use crate::pattern::{Pattern, Thread};
use crate::stitch::{decode_delta, decode_stitch_type, AttributeCode, StitchType};

/// Fixed fields between the palette and the payloads.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Trailer {
    /// `colors + 1` values, written as 1.
    pub placeholders:  Vec<u32>,
    pub string_length: u32,
    pub reserved:      u16,
}

impl Trailer {
    pub fn for_colors(colors: usize) -> Self {
        Self {
            placeholders:  vec![1; colors + 1],
            string_length: 0,
            reserved:      0,
        }
    }

    pub fn write<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        for &p in &self.placeholders {
            writer.write_u32::<LittleEndian>(p)?;
        }
        writer.write_u32::<LittleEndian>(self.string_length)?;
        writer.write_u16::<LittleEndian>(self.reserved)?;
        Ok(())
    }

    fn read<R: Read>(mut reader: R, colors: usize) -> std::io::Result<Self> {
        let placeholders = (0..=colors)
            .map(|_| reader.read_u32::<LittleEndian>())
            .collect::<std::io::Result<Vec<_>>>()?;
        Ok(Self {
            placeholders,
            string_length: reader.read_u32::<LittleEndian>()?,
            reserved:      reader.read_u16::<LittleEndian>()?,
        })
    }
}

// ── Reader ───────────────────────────────────────────────────────────────────

pub struct VipReader<R: Read + Seek> {
    reader:       R,
    pub header:   VipHeader,
    pub palette:  Vec<Thread>,
    pub layout:   StreamLayout,
    /// `None` when the gap before the first payload is too short to hold the
    /// standard trailer.
    pub trailer:  Option<Trailer>,
    pub file_len: u64,
}

impl<R: Read + Seek> VipReader<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let file_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let header = VipHeader::read(&mut reader)?;
        header.validate_magic()?;
        debug!(
            stitches = header.stitch_count,
            colors = header.color_count,
            file_len,
            "parsed VIP header"
        );
        if u64::from(header.color_length) != header.color_table_len() {
            warn!(
                color_length = header.color_length,
                colors = header.color_count,
                "color table length disagrees with color count, using color count"
            );
        }

        let table_len = usize::try_from(header.color_table_len()).unwrap_or(usize::MAX);
        if table_len > palette::VERIFIED_MASK_LEN {
            return Err(FormatError::ColorTableTooLarge {
                len: table_len,
                max: palette::VERIFIED_MASK_LEN,
            }
            .into());
        }
        let mut raw = alloc_buffer("color table", table_len)?;
        reader.read_exact(&mut raw)?;
        let palette = palette::threads_from_bytes(&palette::decode(&raw)?);
        debug!(threads = palette.len(), "decoded palette");

        let layout = StreamLayout::from_header(&header, file_len)?;

        let colors = palette.len();
        let trailer_end = HEADER_SIZE + header.color_table_len() + trailer_len(colors as u64);
        let trailer = if trailer_end <= layout.attribute.start {
            let t = Trailer::read(&mut reader, colors)?;
            if t.placeholders.iter().any(|&p| p != 1) {
                warn!(placeholders = ?t.placeholders, "unexpected placeholder values");
            }
            Some(t)
        } else {
            None
        };

        Ok(Self { reader, header, palette, layout, trailer, file_len })
    }

    /// Copy one payload region into an owned buffer.
    pub fn read_region(&mut self, kind: StreamKind) -> Result<Vec<u8>> {
        let range = self.layout.region(kind);
        let len = usize::try_from(range.end - range.start).unwrap_or(usize::MAX);
        let mut buf = alloc_buffer(kind.name(), len)?;
        self.reader.seek(SeekFrom::Start(range.start))?;
        self.reader.read_exact(&mut buf)?;
        debug!(stream = %kind, offset = range.start, len, "read stream region");
        Ok(buf)
    }

    /// Read and decompress one stream to exactly one byte per stitch.
    pub fn read_stream(
        &mut self,
        kind:   StreamKind,
        codec:  &dyn StreamCodec,
        window: u8,
    ) -> Result<Vec<u8>> {
        let expected = self.header.stitch_count as usize;
        let raw = self.read_region(kind)?;
        match decompress_stream(codec, &raw, expected, window) {
            Ok(out) => Ok(out),
            Err(CodecError::OutputLength { expected, actual, .. }) => {
                Err(FormatError::LengthMismatch { stream: kind, expected, actual }.into())
            }
            Err(CodecError::Allocation { len, source }) => {
                Err(VipError::Allocation { what: kind.name(), len, source })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Rebuild the design.  On error nothing is returned, so no partially
    /// populated pattern escapes.
    pub fn read_pattern(&mut self, codec: &dyn StreamCodec, window: u8) -> Result<Pattern> {
        let count = self.header.stitch_count as usize;

        let mut stitches = Vec::new();
        stitches
            .try_reserve_exact(count.saturating_add(1))
            .map_err(|source| VipError::Allocation {
                what: "stitch list",
                len: count.saturating_add(1),
                source,
            })?;

        let attributes = self.read_stream(StreamKind::Attribute, codec, window)?;
        let xs = self.read_stream(StreamKind::X, codec, window)?;
        let ys = self.read_stream(StreamKind::Y, codec, window)?;

        let mut pattern = Pattern { threads: self.palette.clone(), stitches };
        let mut unknown = 0usize;
        for ((&a, &x), &y) in attributes.iter().zip(&xs).zip(&ys) {
            if AttributeCode::from_byte(a).is_none() {
                unknown += 1;
            }
            pattern.add_stitch_rel(decode_delta(x), decode_delta(y), decode_stitch_type(a));
        }
        if unknown > 0 {
            warn!(count = unknown, "unknown attribute bytes read as normal stitches");
        }
        pattern.add_stitch_rel(0.0, 0.0, StitchType::End);
        debug!(stitches = pattern.stitch_count(), "rebuilt stitch list");
        Ok(pattern)
    }
}

// ── Writer ───────────────────────────────────────────────────────────────────

pub struct VipWriter<W: Write> {
    writer:     W,
    codec:      Box<dyn StreamCodec>,
    pub window: u8,
}

impl<W: Write> VipWriter<W> {
    pub fn new(writer: W, codec: Box<dyn StreamCodec>, window: u8) -> Self {
        Self { writer, codec, window }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Serialize `pattern`.  Only the first [`MAX_COLORS`] threads are stored.
    /// Returns the header and layout that were written.
    pub fn write_pattern(&mut self, pattern: &Pattern) -> Result<(VipHeader, StreamLayout)> {
        let stitch_count = u32::try_from(pattern.stitch_count()).map_err(|_| {
            FormatError::CountOverflow { what: "stitch", count: pattern.stitch_count() }
        })?;
        let colors = pattern.thread_count().min(MAX_COLORS);
        if pattern.thread_count() > MAX_COLORS {
            warn!(
                threads = pattern.thread_count(),
                kept = MAX_COLORS,
                "palette exceeds the container limit, extra threads dropped"
            );
        }

        let streams = encode_streams(pattern)?;
        let attribute = compress_stream(self.codec.as_ref(), &streams.attribute, self.window)?;
        let x = compress_stream(self.codec.as_ref(), &streams.x, self.window)?;
        let y = compress_stream(self.codec.as_ref(), &streams.y, self.window)?;
        drop(streams);
        debug!(
            codec = %self.codec.codec_id(),
            attribute = attribute.len(),
            x = x.len(),
            y = y.len(),
            "compressed stitch streams"
        );

        let layout = StreamLayout::for_payloads(
            colors as u64,
            attribute.len() as u64,
            x.len() as u64,
            y.len() as u64,
        );
        let hoop = HoopSize::from_bounds(&pattern.bounding_box());
        let mut header = VipHeader::new(stitch_count, colors as u32, hoop);
        layout.apply_to(&mut header)?;

        let plain = palette::threads_to_bytes(pattern.threads().take(colors));
        let encoded = palette::encode(&plain)?;

        header.write(&mut self.writer)?;
        self.writer.write_all(&encoded)?;
        Trailer::for_colors(colors).write(&mut self.writer)?;
        self.writer.write_all(&attribute)?;
        self.writer.write_all(&x)?;
        self.writer.write_all(&y)?;
        self.writer.flush()?;
        debug!(stitches = stitch_count, colors, len = layout.end(), "wrote VIP design");

        Ok((header, layout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{get_codec, CodecId, DEFAULT_WINDOW};
    use crate::pattern::Rgb;
    use std::io::Cursor;

    fn write(pattern: &Pattern, codec: CodecId) -> Vec<u8> {
        let mut w = VipWriter::new(Vec::new(), get_codec(codec, 3), DEFAULT_WINDOW);
        w.write_pattern(pattern).unwrap();
        w.into_inner()
    }

    fn sample() -> Pattern {
        let mut p = Pattern::new();
        p.add_thread(Thread::new(Rgb::new(255, 0, 0)));
        p.add_stitch_rel(1.2, 0.0, StitchType::Normal);
        p.add_stitch_rel(-0.3, 0.5, StitchType::Trim);
        p.add_stitch_rel(0.0, 0.0, StitchType::End);
        p
    }

    #[test]
    fn trailer_follows_palette() {
        let bytes = write(&sample(), CodecId::None);
        let trailer = &bytes[0x32..0x40];
        assert_eq!(&trailer[0..4], &1u32.to_le_bytes());
        assert_eq!(&trailer[4..8], &1u32.to_le_bytes());
        assert_eq!(&trailer[8..12], &0u32.to_le_bytes());
        assert_eq!(&trailer[12..14], &0u16.to_le_bytes());
        // Stored streams start right after.
        assert_eq!(&bytes[0x40..0x43], &[0x80, 0x81, 0x90]);
        assert_eq!(&bytes[0x43..0x46], &[12, 0xFD, 0]);
        assert_eq!(&bytes[0x46..0x49], &[0, 5, 0]);
        assert_eq!(bytes.len(), 0x49);
    }

    #[test]
    fn reader_exposes_structure_without_payloads() {
        let bytes = write(&sample(), CodecId::Zstd);
        let r = VipReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(r.header.stitch_count, 3);
        assert_eq!(r.palette, vec![Thread::new(Rgb::new(255, 0, 0))]);
        assert_eq!(r.trailer, Some(Trailer::for_colors(1)));
        assert!(r.layout.attribute.start < r.layout.x.start);
        assert!(r.layout.x.start < r.layout.y.start);
        assert!(r.layout.y.start < r.file_len);
    }

    #[test]
    fn wrong_codec_fails_without_pattern() {
        let bytes = write(&sample(), CodecId::Zstd);
        let mut r = VipReader::new(Cursor::new(bytes)).unwrap();
        let lz4 = get_codec(CodecId::Lz4, 0);
        assert!(r.read_pattern(lz4.as_ref(), DEFAULT_WINDOW).is_err());
    }

    #[test]
    fn truncated_stream_is_length_error() {
        let mut bytes = write(&sample(), CodecId::None);
        bytes.pop();
        let mut r = VipReader::new(Cursor::new(bytes)).unwrap();
        let none = get_codec(CodecId::None, 0);
        let err = r.read_pattern(none.as_ref(), DEFAULT_WINDOW).unwrap_err();
        assert!(matches!(
            err,
            VipError::Format(FormatError::LengthMismatch { stream: StreamKind::Y, expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn more_than_24_colors_is_rejected() {
        let mut bytes = write(&sample(), CodecId::None);
        bytes[0x08..0x0C].copy_from_slice(&25u32.to_le_bytes());
        let err = VipReader::new(Cursor::new(bytes)).err().unwrap();
        assert!(matches!(
            err,
            VipError::Format(FormatError::ColorTableTooLarge { len: 100, max: 96 })
        ));
    }

    #[test]
    fn oversized_brotli_region_is_cut_short() {
        let mut bytes = write(&sample(), CodecId::Brotli);
        let y_start = VipReader::new(Cursor::new(&bytes[..])).unwrap().layout.y.start as usize;
        let brotli = get_codec(CodecId::Brotli, 3);
        let bomb = brotli.compress(&vec![0u8; 8 << 20], DEFAULT_WINDOW).unwrap();
        bytes.truncate(y_start);
        bytes.extend_from_slice(&bomb);

        let mut r = VipReader::new(Cursor::new(bytes)).unwrap();
        let err = r.read_pattern(brotli.as_ref(), DEFAULT_WINDOW).unwrap_err();
        assert!(matches!(
            err,
            VipError::Format(FormatError::LengthMismatch { stream: StreamKind::Y, expected: 3, actual: 4 })
        ));
    }

    #[test]
    fn bad_magic_is_format_error() {
        let mut bytes = write(&sample(), CodecId::None);
        bytes[0] ^= 0xFF;
        let err = VipReader::new(Cursor::new(bytes)).err().unwrap();
        assert!(matches!(err, VipError::Format(FormatError::InvalidMagic { .. })));
    }
}
