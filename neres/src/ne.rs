//! New Executable (or Segmented Executable) format.
//!
//! The NE format was introduced with Windows 1.0 and supplanted by PE in Windows NT 3.1 and Windows
//! 95. Only the parts required to find and walk the resource table are decoded here.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};

use bitflags::bitflags;
use from_to_repr::from_to_other;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, InvalidFormat};
use crate::mz::DosHeader;
use crate::read_ext::ReadExt;
use crate::read_pascal_byte_string;


pub const NE_HEADER_SIZE: usize = 0x40;

/// Position of the run of five table offsets within the NE header.
const TABLE_OFFSETS_OFFSET: usize = 0x22;

/// Size of one resource record in the resource table.
const RESOURCE_ENTRY_SIZE: usize = 12;

/// Set in type tags and resource IDs that are integers; clear if they are name offsets.
pub const INTEGER_ID_FLAG: u16 = 0x8000;

/// Mask extracting the integer value from a type tag or resource ID.
pub const INTEGER_ID_MASK: u16 = 0x0FFF;


/// Offsets of the tables following the NE header.
///
/// All offsets are relative to the start of the NE header.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct NeTableOffsets {
    pub segment_table: u16,
    pub resource_table: u16,
    pub resident_name_table: u16,
    pub module_reference_table: u16,
    pub imported_names_table: u16,
}
impl NeTableOffsets {
    fn from_bytes(bytes: &[u8; 10]) -> Self {
        Self {
            segment_table: u16::from_le_bytes(bytes[0..2].try_into().unwrap()),
            resource_table: u16::from_le_bytes(bytes[2..4].try_into().unwrap()),
            resident_name_table: u16::from_le_bytes(bytes[4..6].try_into().unwrap()),
            module_reference_table: u16::from_le_bytes(bytes[6..8].try_into().unwrap()),
            imported_names_table: u16::from_le_bytes(bytes[8..10].try_into().unwrap()),
        }
    }
}


#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct NeHeader {
    /// Absolute file offset of the b"NE" signature.
    pub offset: u32,

    // signature: b"NE",
    pub linker_version: u8,
    pub linker_revision: u8,
    pub flags: ExeFlags, // u16 at 0x0C
    pub table_offsets: NeTableOffsets, // 5 * u16 at 0x22
    pub resource_segment_count: u16, // at 0x34
}
impl NeHeader {
    /// Seeks to `offset` and reads the NE header found there.
    pub fn read<R: Read + Seek>(reader: &mut R, offset: u32) -> Result<Self, Error> {
        reader.seek(SeekFrom::Start(offset.into()))?;

        let mut header_buf = [0u8; NE_HEADER_SIZE];
        let bytes_read = reader.read_exact_or_eof(&mut header_buf)?;
        if bytes_read < 2 || &header_buf[0..2] != b"NE" {
            return Err(InvalidFormat::NotNe.into());
        }
        if bytes_read < NE_HEADER_SIZE {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }

        let linker_version = header_buf[0x02];
        let linker_revision = header_buf[0x03];
        let flags = ExeFlags::from_bits_retain(u16::from_le_bytes(header_buf[0x0C..0x0E].try_into().unwrap()));
        let table_offsets = NeTableOffsets::from_bytes(
            header_buf[TABLE_OFFSETS_OFFSET..TABLE_OFFSETS_OFFSET+10].try_into().unwrap()
        );
        let resource_segment_count = u16::from_le_bytes(header_buf[0x34..0x36].try_into().unwrap());

        Ok(Self {
            offset,
            linker_version,
            linker_revision,
            flags,
            table_offsets,
            resource_segment_count,
        })
    }

    /// Converts an offset relative to the NE header into an absolute file offset.
    pub fn absolute(&self, relative_offset: u16) -> u64 {
        u64::from(self.offset) + u64::from(relative_offset)
    }

    pub fn resource_table_position(&self) -> u64 {
        self.absolute(self.table_offsets.resource_table)
    }

    pub fn resident_name_table_position(&self) -> u64 {
        self.absolute(self.table_offsets.resident_name_table)
    }

    /// Whether the module has a resource table at all.
    ///
    /// Linkers place the resident-name table directly where the resource table would go if there
    /// are no resources.
    pub fn has_resource_table(&self) -> bool {
        self.table_offsets.resource_table != self.table_offsets.resident_name_table
    }
}


/// Reads and validates the MZ header and the NE header it points to.
pub fn read_headers<R: Read + Seek>(reader: &mut R) -> Result<(DosHeader, NeHeader), Error> {
    reader.seek(SeekFrom::Start(0))?;
    let dos = DosHeader::read(reader)?;
    let ne = NeHeader::read(reader, dos.new_header_offset)?;
    debug!(
        "NE header at {:#X}, resource table at {:#X}, resident-name table at {:#X}",
        ne.offset, ne.resource_table_position(), ne.resident_name_table_position(),
    );
    Ok((dos, ne))
}


#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[from_to_other(base_type = u16, derive_compare = "as_int")]
pub enum ResourceTypeId {
    Cursor = 0x01,
    Bitmap = 0x02,
    Icon = 0x03,
    Menu = 0x04,
    Dialog = 0x05,
    StringTable = 0x06,
    FontDirectory = 0x07,
    Font = 0x08,
    Accelerator = 0x09,
    RcData = 0x0A,
    MessageTable = 0x0B,
    GroupCursor = 0x0C,
    GroupIcon = 0x0E,
    Version = 0x10,
    Other(u16),
}
impl fmt::Display for ResourceTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#05x}", self.to_base_type())
    }
}


/// The name of a resource, decoded from its 16-bit ID field.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum ResourceName {
    /// Integer ID; holds the value with the flag bits masked off.
    Ordinal(u16),

    /// Length-prefixed string stored within the resource table.
    Named(Vec<u8>),
}
impl ResourceName {
    /// Decodes a raw resource ID.
    ///
    /// If the top bit is clear, the value is an offset relative to the start of the resource table
    /// at which a length-prefixed name is stored. The reader is returned to its original position
    /// after the name has been read.
    pub fn resolve<R: Read + Seek>(reader: &mut R, raw_id: u16, resource_table_pos: u64) -> Result<Self, io::Error> {
        if raw_id & INTEGER_ID_FLAG != 0 {
            return Ok(Self::Ordinal(raw_id & INTEGER_ID_MASK));
        }

        // remember where we are
        let return_here_pos = reader.stream_position()?;

        reader.seek(SeekFrom::Start(resource_table_pos + u64::from(raw_id)))?;
        let name_res = read_pascal_byte_string(reader);

        // go back to where we were, even if reading the name failed
        reader.seek(SeekFrom::Start(return_here_pos))?;

        Ok(Self::Named(name_res?))
    }

    /// The name as used for an output file name (without extension).
    ///
    /// Ordinals are rendered in lowercase hexadecimal without a prefix. Names are decoded as UTF-8
    /// (lossily) with path separators and NUL replaced by underscores.
    pub fn file_stem(&self) -> String {
        match self {
            Self::Ordinal(ordinal) => format!("{:x}", ordinal),
            Self::Named(bytes) => String::from_utf8_lossy(bytes)
                .chars()
                .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
                .collect(),
        }
    }
}
impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_stem())
    }
}


#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct ResourceEntry {
    pub offset_units: u16, // relative to beginning of file, units of (1 << alignment_shift_count)
    pub length_units: u16, // units of (1 << alignment_shift_count)
    pub flags: ResourceFlags, // u16
    pub raw_id: u16,
    pub reserved: u32,
    pub name: ResourceName, // resolved from raw_id
}
impl ResourceEntry {
    fn read<R: Read + Seek>(reader: &mut R, resource_table_pos: u64) -> Result<Self, io::Error> {
        let mut resource_buf = [0u8; RESOURCE_ENTRY_SIZE];
        reader.read_exact(&mut resource_buf)?;

        let offset_units = u16::from_le_bytes(resource_buf[0..2].try_into().unwrap());
        let length_units = u16::from_le_bytes(resource_buf[2..4].try_into().unwrap());
        let flags = ResourceFlags::from_bits_retain(u16::from_le_bytes(resource_buf[4..6].try_into().unwrap()));
        let raw_id = u16::from_le_bytes(resource_buf[6..8].try_into().unwrap());
        let reserved = u32::from_le_bytes(resource_buf[8..12].try_into().unwrap());

        let name = ResourceName::resolve(reader, raw_id, resource_table_pos)?;

        Ok(Self {
            offset_units,
            length_units,
            flags,
            raw_id,
            reserved,
            name,
        })
    }

    /// Absolute offset of the resource data within the file.
    ///
    /// Returns `None` if the offset does not fit into 64 bits.
    pub fn file_offset(&self, block_size: u64) -> Option<u64> {
        u64::from(self.offset_units).checked_mul(block_size)
    }

    /// Length of the resource data in bytes.
    ///
    /// Returns `None` if the length does not fit into 64 bits.
    pub fn byte_length(&self, block_size: u64) -> Option<u64> {
        u64::from(self.length_units).checked_mul(block_size)
    }
}


#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct ResourceTypeBlock {
    pub type_id: ResourceTypeId, // lower 12 bits of the tag, whose top bit is always set
    // count: u16,
    pub resource_loader: u32,
    pub entries: Vec<ResourceEntry>, // [ResourceEntry; count]
}
impl ResourceTypeBlock {
    pub fn has_resource_loader(&self) -> bool {
        self.resource_loader != 0
    }
}


#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct ResourceTable {
    /// Absolute file offset of the table; named resource IDs are relative to it.
    pub table_offset: u64,
    pub alignment_shift_count: u16,
    pub type_blocks: Vec<ResourceTypeBlock>, // terminated by a zero type tag
}
impl ResourceTable {
    /// Reads the resource table starting at the absolute file offset `table_offset`.
    pub fn read<R: Read + Seek>(reader: &mut R, table_offset: u64) -> Result<Self, Error> {
        reader.seek(SeekFrom::Start(table_offset))?;

        let alignment_shift_count = reader.read_u16_le()?;
        debug!("resource alignment shift count {}", alignment_shift_count);

        let mut type_blocks = Vec::new();
        loop {
            let tag = reader.read_u16_le()?;
            if tag == 0 {
                // that was it
                break;
            }
            if tag & INTEGER_ID_FLAG == 0 {
                return Err(Error::UnsupportedResourceType { tag });
            }
            let type_id = ResourceTypeId::from_base_type(tag & INTEGER_ID_MASK);

            let mut block_buf = [0u8; 6];
            reader.read_exact(&mut block_buf)?;
            let count = u16::from_le_bytes(block_buf[0..2].try_into().unwrap());
            let resource_loader = u32::from_le_bytes(block_buf[2..6].try_into().unwrap());
            debug!("resource type {} with {} entries", type_id, count);

            if resource_loader != 0 {
                warn!(
                    "resource type {} specifies resource loader {:#010X}; ignoring it",
                    type_id, resource_loader,
                );
            }

            let mut entries = Vec::with_capacity(count.into());
            for _ in 0..count {
                entries.push(ResourceEntry::read(reader, table_offset)?);
            }

            type_blocks.push(ResourceTypeBlock {
                type_id,
                resource_loader,
                entries,
            });
        }

        Ok(Self {
            table_offset,
            alignment_shift_count,
            type_blocks,
        })
    }

    /// The table of a module without resources.
    pub fn empty(table_offset: u64) -> Self {
        Self {
            table_offset,
            ..Self::default()
        }
    }

    /// The unit in which resource offsets and lengths are stored.
    ///
    /// Returns `None` if the shift count exceeds the width of a file offset.
    pub fn block_size(&self) -> Option<u64> {
        1u64.checked_shl(self.alignment_shift_count.into())
    }

    /// The block size, failing if it cannot be represented.
    pub fn checked_block_size(&self) -> Result<u64, InvalidFormat> {
        self.block_size()
            .ok_or(InvalidFormat::AlignmentShiftTooLarge { shift_count: self.alignment_shift_count })
    }

    /// The type blocks grouped by type.
    pub fn by_type(&self) -> BTreeMap<ResourceTypeId, Vec<&ResourceTypeBlock>> {
        let mut ret: BTreeMap<ResourceTypeId, Vec<&ResourceTypeBlock>> = BTreeMap::new();
        for block in &self.type_blocks {
            ret.entry(block.type_id)
                .or_default()
                .push(block);
        }
        ret
    }

    pub fn entry_count(&self) -> usize {
        self.type_blocks
            .iter()
            .map(|block| block.entries.len())
            .sum()
    }
}


/// The headers and the resource table of an NE executable.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct NeResources {
    pub dos: DosHeader,
    pub ne: NeHeader,
    pub resource_table: ResourceTable,
}
impl NeResources {
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self, Error> {
        let (dos, ne) = read_headers(reader)?;

        let table_position = ne.resource_table_position();
        let resource_table = if ne.has_resource_table() {
            let table = ResourceTable::read(reader, table_position)?;

            // the resident-name table normally follows the resource table
            let table_end = reader.stream_position()?;
            let bound = ne.resident_name_table_position();
            if table_position < bound && table_end > bound {
                warn!(
                    "resource table ends at {:#X}, beyond the start of the resident-name table at {:#X}",
                    table_end, bound,
                );
            }
            table
        } else {
            debug!("module has no resource table");
            ResourceTable::empty(table_position)
        };

        Ok(Self {
            dos,
            ne,
            resource_table,
        })
    }
}


bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
    #[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
    pub struct ExeFlags : u16 {
        const SINGLE_DATA = 0x0001;
        const MULTIPLE_DATA = 0x0002;
        const LINK_ERRORS = 0x2000;
        const LIBRARY_MODULE = 0x8000;
    }

    #[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
    #[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
    pub struct ResourceFlags : u16 {
        const MOVEABLE = 0x0010;
        const PURE = 0x0020;
        const PRELOAD = 0x0040;
    }
}
