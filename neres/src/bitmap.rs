//! Synthesis of BMP file headers for bitmap resources.
//!
//! Bitmap resources are stored as device-independent bitmaps: a `BITMAPINFOHEADER`, the palette
//! and the pixel data. A standalone BMP file additionally starts with a 14-byte
//! `BITMAPFILEHEADER`, which has to be reconstructed when extracting the resource.


use std::io::{self, Write};

use crate::error::InvalidFormat;


pub const FILE_HEADER_SIZE: u32 = 14;

/// Offset within the `BITMAPINFOHEADER` of the field used to derive the palette size.
pub const COLOR_EXPONENT_OFFSET: u64 = 0x0E;

/// Size of the file header plus a `BITMAPINFOHEADER`.
const HEADERS_SIZE: u32 = 0x36;

/// Bytes per palette entry (`RGBQUAD`).
const PALETTE_ENTRY_SIZE: u32 = 4;


#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BitmapFileHeader {
    // signature: b"BM",
    pub file_size: u32,
    pub reserved: [u8; 4],
    pub pixel_data_offset: u32,
}
impl BitmapFileHeader {
    /// Derives the file header for a DIB of `dib_length` bytes.
    ///
    /// The palette is assumed to have `1 << color_exponent` entries.
    pub fn for_dib(dib_length: u64, color_exponent: u16) -> Result<Self, InvalidFormat> {
        let error = InvalidFormat::BitmapColorExponent { exponent: color_exponent };

        let color_count = 1u32.checked_shl(color_exponent.into())
            .ok_or(error)?;
        let pixel_data_offset = color_count.checked_mul(PALETTE_ENTRY_SIZE)
            .and_then(|palette_size| palette_size.checked_add(HEADERS_SIZE))
            .ok_or(error)?;
        let file_size = dib_length.checked_add(FILE_HEADER_SIZE.into())
            .and_then(|size| u32::try_from(size).ok())
            .ok_or(error)?;

        Ok(Self {
            file_size,
            reserved: [0u8; 4],
            pixel_data_offset,
        })
    }

    /// The number of palette entries implied by the pixel data offset.
    pub fn color_count(&self) -> u32 {
        (self.pixel_data_offset - HEADERS_SIZE) / PALETTE_ENTRY_SIZE
    }

    pub fn to_bytes(&self) -> [u8; FILE_HEADER_SIZE as usize] {
        let mut buf = [0u8; FILE_HEADER_SIZE as usize];
        buf[0..2].copy_from_slice(b"BM");
        buf[2..6].copy_from_slice(&self.file_size.to_le_bytes());
        buf[6..10].copy_from_slice(&self.reserved);
        buf[10..14].copy_from_slice(&self.pixel_data_offset.to_le_bytes());
        buf
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), io::Error> {
        writer.write_all(&self.to_bytes())
    }
}


#[cfg(test)]
mod tests {
    use super::BitmapFileHeader;
    use crate::error::InvalidFormat;

    #[test]
    fn test_header_fields() {
        let header = BitmapFileHeader::for_dib(0x200, 4).unwrap();
        assert_eq!(header.color_count(), 16);
        assert_eq!(header.pixel_data_offset, 0x36 + 16 * 4);
        assert_eq!(header.file_size, 0x200 + 14);

        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..2], b"BM");
        assert_eq!(u32::from_le_bytes(bytes[2..6].try_into().unwrap()), 0x20E);
        assert_eq!(&bytes[6..10], &[0, 0, 0, 0]);
        assert_eq!(u32::from_le_bytes(bytes[10..14].try_into().unwrap()), 0x76);
    }

    #[test]
    fn test_monochrome() {
        let header = BitmapFileHeader::for_dib(0x40, 1).unwrap();
        assert_eq!(header.color_count(), 2);
        assert_eq!(header.pixel_data_offset, 0x3E);
    }

    #[test]
    fn test_exponent_too_large() {
        assert_eq!(
            BitmapFileHeader::for_dib(0x40, 32),
            Err(InvalidFormat::BitmapColorExponent { exponent: 32 }),
        );
        // the palette size overflows even though the color count does not
        assert_eq!(
            BitmapFileHeader::for_dib(0x40, 31),
            Err(InvalidFormat::BitmapColorExponent { exponent: 31 }),
        );
    }
}
