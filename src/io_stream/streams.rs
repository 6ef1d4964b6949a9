use crate::error::{alloc_buffer, FormatError, Result};
use crate::pattern::Pattern;
use crate::stitch::{checked_encode_delta, encode_stitch_type};

/// The three uncompressed per-stitch streams, indexed identically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedStreams {
    pub attribute: Vec<u8>,
    pub x:         Vec<u8>,
    pub y:         Vec<u8>,
}

/// Walk the stitches once, turning absolute positions into stored deltas.
/// Each delta is measured against the previous absolute position, so rounding
/// never accumulates across stitches.
pub fn encode_streams(pattern: &Pattern) -> Result<EncodedStreams> {
    let n = pattern.stitch_count();
    let mut attribute = alloc_buffer("attribute stream", n)?;
    let mut x = alloc_buffer("x stream", n)?;
    let mut y = alloc_buffer("y stream", n)?;

    let (mut prev_x, mut prev_y) = (0.0f64, 0.0f64);
    for (i, s) in pattern.stitches().enumerate() {
        x[i] = checked_encode_delta(s.x - prev_x)
            .map_err(|value| FormatError::DeltaOutOfRange { index: i, axis: 'x', value })?;
        y[i] = checked_encode_delta(s.y - prev_y)
            .map_err(|value| FormatError::DeltaOutOfRange { index: i, axis: 'y', value })?;
        attribute[i] = encode_stitch_type(s.kind);
        prev_x = s.x;
        prev_y = s.y;
    }

    Ok(EncodedStreams { attribute, x, y })
}
