//! MZ (Mark Zbikowski) executable header.
//!
//! Every NE executable is simultaneously an MZ executable; the DOS stub usually only prints an
//! error message and terminates. The only field of interest to us is the offset of the
//! segmented executable header, which lives at the end of the 64-byte extended DOS header.


use std::io::{self, Read};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, InvalidFormat};
use crate::read_ext::ReadExt;


pub const DOS_HEADER_SIZE: usize = 0x40;
pub const NEW_HEADER_OFFSET_OFFSET: usize = 0x3C;


#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct DosHeader {
    // signature: b"MZ",
    pub last_page_bytes: u16,
    pub pages: u16,
    pub relocation_items: u16,
    pub header_size_paragraphs: u16,
    pub relocation_table_offset: u16,
    pub new_header_offset: u32, // at 0x3C
}
impl DosHeader {
    /// Reads the 64-byte DOS header from the current position of `reader`.
    ///
    /// A file that ends before the signature has been read is reported as not being an MZ
    /// executable; a file that ends later is reported as an I/O error.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let mut header_buf = [0u8; DOS_HEADER_SIZE];
        let bytes_read = reader.read_exact_or_eof(&mut header_buf)?;
        if bytes_read < 2 || &header_buf[0..2] != b"MZ" {
            return Err(InvalidFormat::NotMz.into());
        }
        if bytes_read < DOS_HEADER_SIZE {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }

        let last_page_bytes = u16::from_le_bytes(header_buf[0x02..0x04].try_into().unwrap());
        let pages = u16::from_le_bytes(header_buf[0x04..0x06].try_into().unwrap());
        let relocation_items = u16::from_le_bytes(header_buf[0x06..0x08].try_into().unwrap());
        let header_size_paragraphs = u16::from_le_bytes(header_buf[0x08..0x0A].try_into().unwrap());
        let relocation_table_offset = u16::from_le_bytes(header_buf[0x18..0x1A].try_into().unwrap());
        let new_header_offset = u32::from_le_bytes(
            header_buf[NEW_HEADER_OFFSET_OFFSET..NEW_HEADER_OFFSET_OFFSET+4].try_into().unwrap()
        );

        Ok(Self {
            last_page_bytes,
            pages,
            relocation_items,
            header_size_paragraphs,
            relocation_table_offset,
            new_header_offset,
        })
    }
}
