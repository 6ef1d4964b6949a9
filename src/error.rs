//! Error taxonomy shared by every pipeline stage.

use std::collections::TryReserveError;
use std::io;
use thiserror::Error;

use crate::codec::CodecError;

/// Which of the three payload regions an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Attribute,
    X,
    Y,
}

impl StreamKind {
    pub fn name(self) -> &'static str {
        match self {
            StreamKind::Attribute => "attribute",
            StreamKind::X         => "x",
            StreamKind::Y         => "y",
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Structural problems with a file, or with a pattern that cannot be expressed
/// in the container.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FormatError {
    #[error("invalid magic: expected {expected:#010x}, found {found:#010x}")]
    InvalidMagic { expected: u32, found: u32 },

    #[error("stream offsets out of order: palette ends at {palette_end:#x}, attribute {attribute:#x}, x {x:#x}, y {y:#x}, file length {file_len:#x}")]
    OffsetsOutOfOrder {
        palette_end: u64,
        attribute:   u64,
        x:           u64,
        y:           u64,
        file_len:    u64,
    },

    #[error("{stream} stream decompressed to {actual} bytes, expected {expected}")]
    LengthMismatch { stream: StreamKind, expected: usize, actual: usize },

    #[error("color table of {len} bytes exceeds the {max}-byte mask table")]
    ColorTableTooLarge { len: usize, max: usize },

    #[error("stitch {index}: {axis} delta {value} does not fit a signed byte")]
    DeltaOutOfRange { index: usize, axis: char, value: i64 },

    #[error("{what} count {count} does not fit the 32-bit header field")]
    CountOverflow { what: &'static str, count: usize },
}

#[derive(Error, Debug)]
pub enum VipError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to allocate {what} of length {len}: {source}")]
    Allocation {
        what:   &'static str,
        len:    usize,
        #[source]
        source: TryReserveError,
    },

    #[error("format error: {0}")]
    Format(#[from] FormatError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

pub type Result<T> = std::result::Result<T, VipError>;

/// Acquire a zeroed buffer of exactly `len` bytes, reporting failure instead of
/// aborting the process.
pub(crate) fn alloc_buffer(what: &'static str, len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|source| VipError::Allocation { what, len, source })?;
    buf.resize(len, 0);
    Ok(buf)
}
