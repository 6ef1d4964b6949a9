//! Color-table obfuscation.
//!
//! The palette is stored as 4-byte (R, G, B, flag) entries passed through a
//! position-keyed XOR chain.  Byte `i` is masked with `VIP_MASK_TABLE[i]` and
//! with the previous *on-disk* byte; that single feedback variable is shared by
//! both directions.

use crate::error::FormatError;
use crate::header::MAX_COLORS;
use crate::pattern::{Rgb, Thread};

/// Bytes per stored color entry.
pub const COLOR_ENTRY_SIZE: usize = 4;

/// Leading table bytes checked against real VIP files.  Readers decode no
/// more than this; the rest of the table only serves arbitrary-start chains.
pub const VERIFIED_MASK_LEN: usize = MAX_COLORS * COLOR_ENTRY_SIZE;

#[rustfmt::skip]
pub static VIP_MASK_TABLE: [u8; 256] = [
    0x2E, 0x82, 0xE4, 0x6F, 0x38, 0xA9, 0xDC, 0xC6, 0x7B, 0xB6, 0x28, 0xAC, 0xFD, 0xAA, 0x8A, 0x4E,
    0x76, 0x2E, 0xF0, 0xE4, 0x25, 0x1B, 0x8A, 0x68, 0x4E, 0x92, 0xB9, 0xB4, 0x95, 0xF0, 0x3E, 0xEF,
    0xF7, 0x40, 0x24, 0x18, 0x39, 0x31, 0xBB, 0xE1, 0x53, 0xA8, 0x1F, 0xB1, 0x3A, 0x07, 0xFB, 0xCB,
    0xE6, 0x00, 0x81, 0x50, 0x0E, 0x40, 0xE1, 0x2C, 0x73, 0x50, 0x0D, 0x91, 0xD6, 0x0A, 0x5D, 0xD6,
    0x8B, 0xB8, 0x62, 0xAE, 0x47, 0x00, 0x53, 0x5A, 0xB7, 0x80, 0xAA, 0x28, 0xF7, 0x5D, 0x70, 0x5E,
    0x2C, 0x0B, 0x98, 0xE3, 0xA0, 0x98, 0x60, 0x47, 0x89, 0x9B, 0x82, 0xFB, 0x40, 0xC9, 0xB4, 0x00,
    0x0E, 0x68, 0x6A, 0x1E, 0x09, 0x85, 0xC0, 0x53, 0x81, 0xD1, 0x98, 0x89, 0xAF, 0xE8, 0x85, 0x4F,
    0xE3, 0x69, 0x89, 0x03, 0xA1, 0x2E, 0x8F, 0xCF, 0xED, 0x91, 0x9F, 0x58, 0x1E, 0xD6, 0x84, 0x3C,
    0x09, 0x27, 0xBD, 0xF4, 0xC3, 0x90, 0xC0, 0x51, 0x1B, 0x2B, 0x63, 0xBC, 0xB9, 0x3D, 0x40, 0x4D,
    0x62, 0x6F, 0xE0, 0x8C, 0xF5, 0x5D, 0x08, 0xFD, 0x3D, 0x50, 0x36, 0xD7, 0xC9, 0xC9, 0x43, 0xE4,
    0x2D, 0xCB, 0x95, 0xB6, 0xF4, 0x0D, 0xEA, 0xC2, 0xFD, 0x66, 0x3A, 0x5E, 0xBD, 0x47, 0x7E, 0x4D,
    0xBB, 0x4E, 0x8F, 0xE2, 0x2C, 0x4D, 0x57, 0x5F, 0x6C, 0x7B, 0x27, 0x4A, 0x41, 0xD5, 0xCE, 0x4D,
    0xEE, 0x84, 0x2A, 0xC7, 0xA0, 0xB5, 0xB2, 0x97, 0xD2, 0x61, 0xE4, 0x38, 0xE9, 0x7C, 0x1B, 0xA8,
    0x0D, 0xD8, 0x71, 0x5F, 0x40, 0x25, 0xAD, 0xD7, 0x0F, 0x6D, 0x73, 0xE5, 0x6B, 0x52, 0x8E, 0x62,
    0x84, 0x59, 0x00, 0x32, 0xA6, 0x4A, 0xDF, 0xE1, 0x94, 0x27, 0xB7, 0x32, 0xAC, 0x54, 0x48, 0xAE,
    0xDE, 0x9D, 0x2A, 0x73, 0xC6, 0x73, 0x6E, 0x2E, 0x73, 0x9F, 0x5E, 0x88, 0x98, 0x77, 0x6F, 0x23,
];

/// Decode `raw` on-disk bytes, starting the mask at table position `start`.
pub fn decode_from(raw: &[u8], start: usize) -> Result<Vec<u8>, FormatError> {
    let mask = mask_slice(raw.len(), start)?;
    let mut prev = 0u8;
    Ok(raw
        .iter()
        .zip(mask)
        .map(|(&input, &m)| {
            let out = input ^ m ^ prev;
            prev = input;
            out
        })
        .collect())
}

/// Encode plain palette bytes, starting the mask at table position `start`.
pub fn encode_from(plain: &[u8], start: usize) -> Result<Vec<u8>, FormatError> {
    let mask = mask_slice(plain.len(), start)?;
    let mut prev = 0u8;
    Ok(plain
        .iter()
        .zip(mask)
        .map(|(&b, &m)| {
            prev ^= b ^ m;
            prev
        })
        .collect())
}

pub fn decode(raw: &[u8]) -> Result<Vec<u8>, FormatError> {
    decode_from(raw, 0)
}

pub fn encode(plain: &[u8]) -> Result<Vec<u8>, FormatError> {
    encode_from(plain, 0)
}

fn mask_slice(len: usize, start: usize) -> Result<&'static [u8], FormatError> {
    let max = VIP_MASK_TABLE.len();
    start
        .checked_add(len)
        .filter(|&end| end <= max)
        .map(|end| &VIP_MASK_TABLE[start..end])
        .ok_or(FormatError::ColorTableTooLarge { len, max: max.saturating_sub(start) })
}

/// Split decoded palette bytes into threads.  A trailing partial entry is
/// ignored.
pub fn threads_from_bytes(plain: &[u8]) -> Vec<Thread> {
    plain
        .chunks_exact(COLOR_ENTRY_SIZE)
        .map(|c| Thread { color: Rgb::new(c[0], c[1], c[2]), flag: c[3] })
        .collect()
}

pub fn threads_to_bytes<'a, I>(threads: I) -> Vec<u8>
where
    I: IntoIterator<Item = &'a Thread>,
{
    threads
        .into_iter()
        .flat_map(|t| [t.color.r, t.color.g, t.color.b, t.flag])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_uses_previous_disk_byte() {
        let plain = [0xFF, 0x00, 0x00, 0x01];
        let disk = encode(&plain).unwrap();
        assert_eq!(disk[0], 0xFF ^ VIP_MASK_TABLE[0]);
        assert_eq!(disk[1], 0x00 ^ VIP_MASK_TABLE[1] ^ disk[0]);
        assert_eq!(disk[2], 0x00 ^ VIP_MASK_TABLE[2] ^ disk[1]);
        assert_eq!(disk[3], 0x01 ^ VIP_MASK_TABLE[3] ^ disk[2]);
        assert_eq!(decode(&disk).unwrap(), plain);
    }

    #[test]
    fn zero_bytes_reveal_chained_mask() {
        let disk = encode(&[0u8; 8]).unwrap();
        let mut prev = 0u8;
        for (i, &b) in disk.iter().enumerate() {
            prev ^= VIP_MASK_TABLE[i];
            assert_eq!(b, prev);
        }
    }

    #[test]
    fn oversized_table_is_rejected() {
        let err = decode(&[0u8; 260]).unwrap_err();
        assert_eq!(err, FormatError::ColorTableTooLarge { len: 260, max: 256 });
        assert!(encode_from(&[0u8; 8], 252).is_err());
        assert!(encode_from(&[0u8; 4], 252).is_ok());
    }

    #[test]
    fn thread_bytes_keep_flag() {
        let threads = vec![
            Thread { color: Rgb::new(255, 0, 0), flag: 1 },
            Thread { color: Rgb::new(1, 2, 3), flag: 7 },
        ];
        let bytes = threads_to_bytes(&threads);
        assert_eq!(bytes, vec![255, 0, 0, 1, 1, 2, 3, 7]);
        assert_eq!(threads_from_bytes(&bytes), threads);
    }
}
