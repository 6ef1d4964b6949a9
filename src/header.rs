use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::error::FormatError;
use crate::pattern::Rect;
use crate::stitch::UNITS_PER_DESIGN_UNIT;

pub const VIP_MAGIC: u32 = 0x0190_FC5D;
/// Fixed header length; the color table starts here.
pub const HEADER_SIZE: u64 = 0x2E;
/// Most colors the header may declare on write.
pub const MAX_COLORS: usize = 24;

/// Design extent in signed tenths, in on-disk field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct HoopSize {
    pub positive_x: i16,
    pub positive_y: i16,
    pub negative_x: i16,
    pub negative_y: i16,
}

impl HoopSize {
    /// The Y fields use the target machine's flipped origin: both are negated
    /// and shifted by one tenth.
    pub fn from_bounds(r: &Rect) -> Self {
        let s = UNITS_PER_DESIGN_UNIT;
        Self {
            positive_x: (r.right * s).round() as i16,
            positive_y: -((r.top * s - 1.0).round()) as i16,
            negative_x: (r.left * s).round() as i16,
            negative_y: -((r.bottom * s - 1.0).round()) as i16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct VipHeader {
    pub magic:            u32,
    pub stitch_count:     u32,
    pub color_count:      u32,
    pub hoop:             HoopSize,
    pub attribute_offset: u32,
    pub x_offset:         u32,
    pub y_offset:         u32,
    pub reserved_string:  [u8; 8],
    pub reserved:         u16,
    pub color_length:     u32,
}

impl VipHeader {
    /// Header for `stitch_count` stitches and `color_count` colors.  Offsets
    /// are filled in by the layout.
    pub fn new(stitch_count: u32, color_count: u32, hoop: HoopSize) -> Self {
        Self {
            magic: VIP_MAGIC,
            stitch_count,
            color_count,
            hoop,
            attribute_offset: 0,
            x_offset:         0,
            y_offset:         0,
            reserved_string:  [0u8; 8],
            reserved:         0,
            color_length:     color_count * 4,
        }
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.magic)?;
        writer.write_u32::<LittleEndian>(self.stitch_count)?;
        writer.write_u32::<LittleEndian>(self.color_count)?;
        writer.write_i16::<LittleEndian>(self.hoop.positive_x)?;
        writer.write_i16::<LittleEndian>(self.hoop.positive_y)?;
        writer.write_i16::<LittleEndian>(self.hoop.negative_x)?;
        writer.write_i16::<LittleEndian>(self.hoop.negative_y)?;
        writer.write_u32::<LittleEndian>(self.attribute_offset)?;
        writer.write_u32::<LittleEndian>(self.x_offset)?;
        writer.write_u32::<LittleEndian>(self.y_offset)?;
        writer.write_all(&self.reserved_string)?;
        writer.write_u16::<LittleEndian>(self.reserved)?;
        writer.write_u32::<LittleEndian>(self.color_length)?;
        Ok(())
    }

    /// Read the raw fields without validation.
    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        let magic            = reader.read_u32::<LittleEndian>()?;
        let stitch_count     = reader.read_u32::<LittleEndian>()?;
        let color_count      = reader.read_u32::<LittleEndian>()?;
        let hoop = HoopSize {
            positive_x: reader.read_i16::<LittleEndian>()?,
            positive_y: reader.read_i16::<LittleEndian>()?,
            negative_x: reader.read_i16::<LittleEndian>()?,
            negative_y: reader.read_i16::<LittleEndian>()?,
        };
        let attribute_offset = reader.read_u32::<LittleEndian>()?;
        let x_offset         = reader.read_u32::<LittleEndian>()?;
        let y_offset         = reader.read_u32::<LittleEndian>()?;
        let mut reserved_string = [0u8; 8];
        reader.read_exact(&mut reserved_string)?;
        let reserved         = reader.read_u16::<LittleEndian>()?;
        let color_length     = reader.read_u32::<LittleEndian>()?;
        Ok(Self {
            magic,
            stitch_count,
            color_count,
            hoop,
            attribute_offset,
            x_offset,
            y_offset,
            reserved_string,
            reserved,
            color_length,
        })
    }

    pub fn validate_magic(&self) -> Result<(), FormatError> {
        if self.magic != VIP_MAGIC {
            return Err(FormatError::InvalidMagic { expected: VIP_MAGIC, found: self.magic });
        }
        Ok(())
    }

    /// Bytes occupied by the color table that follows the header.
    pub fn color_table_len(&self) -> u64 {
        u64::from(self.color_count) * 4
    }
}
