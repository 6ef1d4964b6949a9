//! Placement of the three compressed stream regions.
//!
//! After the header come the XOR-coded palette, a run of `colors + 1` u32
//! placeholders, a u32 string length and a u16 reserved field.  The payload
//! region follows at `0x38 + 8 * colors` and is split into attribute, X and Y
//! regions in that order, the last running to end of file.

use std::ops::Range;

use crate::error::{FormatError, StreamKind};
use crate::header::{VipHeader, HEADER_SIZE};

/// Bytes between the end of the palette and the first payload for a design
/// with `colors` colors.
pub fn trailer_len(colors: u64) -> u64 {
    4 * (colors + 1) + 4 + 2
}

/// Offset of the attribute stream in a file written with `colors` colors.
pub fn payload_start(colors: u64) -> u64 {
    HEADER_SIZE + 4 * colors + trailer_len(colors)
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StreamLayout {
    pub attribute: Range<u64>,
    pub x:         Range<u64>,
    pub y:         Range<u64>,
}

impl StreamLayout {
    /// Lay out freshly compressed payloads of the given lengths.
    pub fn for_payloads(colors: u64, attribute_len: u64, x_len: u64, y_len: u64) -> Self {
        let a = payload_start(colors);
        let x = a + attribute_len;
        let y = x + x_len;
        Self {
            attribute: a..x,
            x:         x..y,
            y:         y..y + y_len,
        }
    }

    /// Recover the regions of an existing file, checking that the offsets are
    /// ordered and inside the file before any length is derived from them.
    pub fn from_header(header: &VipHeader, file_len: u64) -> Result<Self, FormatError> {
        let palette_end = HEADER_SIZE + header.color_table_len();
        let a = u64::from(header.attribute_offset);
        let x = u64::from(header.x_offset);
        let y = u64::from(header.y_offset);
        if !(palette_end <= a && a <= x && x <= y && y <= file_len) {
            return Err(FormatError::OffsetsOutOfOrder {
                palette_end,
                attribute: a,
                x,
                y,
                file_len,
            });
        }
        Ok(Self {
            attribute: a..x,
            x:         x..y,
            y:         y..file_len,
        })
    }

    pub fn region(&self, kind: StreamKind) -> Range<u64> {
        match kind {
            StreamKind::Attribute => self.attribute.clone(),
            StreamKind::X         => self.x.clone(),
            StreamKind::Y         => self.y.clone(),
        }
    }

    /// End of the last region, i.e. the file length.
    pub fn end(&self) -> u64 {
        self.y.end
    }

    /// Copy the offsets into `header`.  Fails if the file would outgrow the
    /// 32-bit offset fields.
    pub fn apply_to(&self, header: &mut VipHeader) -> Result<(), FormatError> {
        let narrow = |v: u64| {
            u32::try_from(v).map_err(|_| FormatError::CountOverflow {
                what:  "stream offset",
                count: usize::try_from(v).unwrap_or(usize::MAX),
            })
        };
        header.attribute_offset = narrow(self.attribute.start)?;
        header.x_offset         = narrow(self.x.start)?;
        header.y_offset         = narrow(self.y.start)?;
        narrow(self.end())?;
        Ok(())
    }
}
