//! Per-stitch byte codecs: sign-magnitude deltas and stitch-type tags.
//!
//! The on-disk attribute byte carries fewer distinctions than [`StitchType`]:
//! both `Jump` and `Trim` are stored as [`AttributeCode::Trim`], so a jump
//! read back from a file is a trim.  The two directions are kept as separate
//! functions over separate types so the collapse stays visible.

use serde::{Deserialize, Serialize};

/// Scale between design units and the tenths stored on disk.
pub const UNITS_PER_DESIGN_UNIT: f64 = 10.0;

/// In-memory stitch classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StitchType {
    Normal,
    Jump,
    Trim,
    Stop,
    End,
}

/// Attribute byte values the container understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AttributeCode {
    Normal = 0x80,
    Trim   = 0x81,
    Stop   = 0x84,
    End    = 0x90,
}

impl AttributeCode {
    /// Recognise a raw attribute byte.  Unknown values yield `None`; decoding
    /// treats them as normal stitches.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x80 => Some(AttributeCode::Normal),
            0x81 => Some(AttributeCode::Trim),
            0x84 => Some(AttributeCode::Stop),
            0x90 => Some(AttributeCode::End),
            _    => None,
        }
    }

    #[inline]
    pub fn byte(self) -> u8 {
        self as u8
    }

    pub fn stitch_type(self) -> StitchType {
        match self {
            AttributeCode::Normal => StitchType::Normal,
            AttributeCode::Trim   => StitchType::Trim,
            AttributeCode::Stop   => StitchType::Stop,
            AttributeCode::End    => StitchType::End,
        }
    }
}

impl From<StitchType> for AttributeCode {
    /// Lossy: `Jump` collapses onto `Trim`.
    fn from(st: StitchType) -> Self {
        match st {
            StitchType::Normal => AttributeCode::Normal,
            StitchType::Jump   => AttributeCode::Trim,
            StitchType::Trim   => AttributeCode::Trim,
            StitchType::Stop   => AttributeCode::Stop,
            StitchType::End    => AttributeCode::End,
        }
    }
}

/// Decode an attribute byte.  Anything unrecognised is a normal stitch.
#[inline]
pub fn decode_stitch_type(b: u8) -> StitchType {
    AttributeCode::from_byte(b)
        .map(AttributeCode::stitch_type)
        .unwrap_or(StitchType::Normal)
}

#[inline]
pub fn encode_stitch_type(st: StitchType) -> u8 {
    AttributeCode::from(st).byte()
}

/// Interpret a stored coordinate byte as a signed count of tenths.
#[inline]
pub fn decode_byte(b: u8) -> i8 {
    b as i8
}

/// Stored coordinate byte to a relative move in design units.
#[inline]
pub fn decode_delta(b: u8) -> f64 {
    f64::from(decode_byte(b)) / UNITS_PER_DESIGN_UNIT
}

/// Round a move in design units to whole tenths.
#[inline]
pub fn quantize_delta(delta: f64) -> i64 {
    (delta * UNITS_PER_DESIGN_UNIT).round() as i64
}

/// Relative move in design units to a stored byte.
///
/// The scaled value is truncated to its low byte, so moves outside
/// -12.8..=12.7 units wrap.  Use [`checked_encode_delta`] to reject them.
#[inline]
pub fn encode_delta(delta: f64) -> u8 {
    quantize_delta(delta) as u8
}

/// Like [`encode_delta`] but returns the scaled value as the error when it
/// does not fit a signed byte.
pub fn checked_encode_delta(delta: f64) -> Result<u8, i64> {
    let tenths = quantize_delta(delta);
    i8::try_from(tenths).map(|v| v as u8).map_err(|_| tenths)
}
