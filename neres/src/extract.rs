//! Extraction of resources into standalone files.


use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::bitmap::{BitmapFileHeader, COLOR_EXPONENT_OFFSET};
use crate::error::{Error, InvalidFormat};
use crate::ne::{ResourceEntry, ResourceTable, ResourceTypeId};
use crate::read_ext::ReadExt;


/// The resource types which can be extracted into files.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ExtractedKind {
    /// Copied verbatim.
    Icon,

    /// Prefixed with a synthesized BMP file header.
    Bitmap,
}
impl ExtractedKind {
    pub fn for_type(type_id: ResourceTypeId) -> Option<Self> {
        match type_id {
            ResourceTypeId::GroupIcon => Some(Self::Icon),
            ResourceTypeId::Bitmap => Some(Self::Bitmap),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Icon => ".ICO",
            Self::Bitmap => ".bmp",
        }
    }
}


/// Seeks to `offset` and copies exactly `length` bytes into `writer`.
fn copy_exact<R: Read + Seek, W: Write>(reader: &mut R, offset: u64, length: u64, writer: &mut W) -> Result<(), io::Error> {
    reader.seek(SeekFrom::Start(offset))?;
    let copied = io::copy(&mut reader.by_ref().take(length), writer)?;
    if copied != length {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    Ok(())
}

/// Derives the BMP file header for the DIB stored at `offset`.
fn bitmap_file_header<R: Read + Seek>(reader: &mut R, offset: u64, length: u64) -> Result<BitmapFileHeader, Error> {
    reader.seek(SeekFrom::Start(offset + COLOR_EXPONENT_OFFSET))?;
    let color_exponent = reader.read_u16_le()?;
    let header = BitmapFileHeader::for_dib(length, color_exponent)?;
    debug!("bitmap at {:#X} has {} palette entries", offset, header.color_count());
    Ok(header)
}


/// A resource whose location and file header have been validated.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
struct PreparedEntry {
    offset: u64,
    length: u64,
    bitmap_header: Option<BitmapFileHeader>,
}
impl PreparedEntry {
    fn prepare<R: Read + Seek>(
        reader: &mut R,
        kind: ExtractedKind,
        entry: &ResourceEntry,
        block_size: u64,
        shift_count: u16,
    ) -> Result<Self, Error> {
        let too_large = InvalidFormat::AlignmentShiftTooLarge { shift_count };
        let offset = entry.file_offset(block_size)
            .ok_or(too_large)?;
        let length = entry.byte_length(block_size)
            .ok_or(too_large)?;
        offset.checked_add(length)
            .ok_or(too_large)?;

        let bitmap_header = match kind {
            ExtractedKind::Icon => None,
            ExtractedKind::Bitmap => Some(bitmap_file_header(reader, offset, length)?),
        };
        Ok(Self {
            offset,
            length,
            bitmap_header,
        })
    }

    fn end(&self) -> u64 {
        self.offset + self.length
    }

    fn write<R: Read + Seek, W: Write>(&self, reader: &mut R, writer: &mut W) -> Result<(), Error> {
        if let Some(header) = &self.bitmap_header {
            header.write(writer)?;
        }
        copy_exact(reader, self.offset, self.length, writer)?;
        Ok(())
    }
}


/// Writes the file contents for a single resource into `writer`.
pub fn extract_entry<R: Read + Seek, W: Write>(
    reader: &mut R,
    kind: ExtractedKind,
    entry: &ResourceEntry,
    table: &ResourceTable,
    writer: &mut W,
) -> Result<(), Error> {
    let block_size = table.checked_block_size()?;
    let prepared = PreparedEntry::prepare(reader, kind, entry, block_size, table.alignment_shift_count)?;
    prepared.write(reader, writer)
}


/// Extracts all icon and bitmap resources of `table` into `output_dir`.
///
/// Each resource is written to `<output_dir>/<name><extension>`. Resources of other types are
/// skipped. The output directory must already exist; existing files are never overwritten.
/// A resource is only written once its data is known to lie within the input, and a file whose
/// writing fails is removed again.
///
/// Returns the paths of the files written, in table order.
pub fn extract_resources<R: Read + Seek>(
    reader: &mut R,
    table: &ResourceTable,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, Error> {
    let input_length = reader.seek(SeekFrom::End(0))?;
    let mut written = Vec::new();

    for block in &table.type_blocks {
        let Some(kind) = ExtractedKind::for_type(block.type_id) else {
            debug!("skipping {} resources of type {}", block.entries.len(), block.type_id);
            continue;
        };
        if block.entries.is_empty() {
            continue;
        }
        let block_size = table.checked_block_size()?;

        for entry in &block.entries {
            let path = output_dir.join(format!("{}{}", entry.name.file_stem(), kind.extension()));

            let prepared = PreparedEntry::prepare(reader, kind, entry, block_size, table.alignment_shift_count)?;
            if prepared.end() > input_length {
                debug!(
                    "resource {} ends at {:#X}, beyond the end of the input at {:#X}",
                    entry.name, prepared.end(), input_length,
                );
                return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
            }

            let file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)?;
            let mut writer = BufWriter::new(file);
            let write_res = prepared.write(reader, &mut writer)
                .and_then(|()| writer.flush().map_err(Error::from));
            if let Err(e) = write_res {
                drop(writer);
                if let Err(remove_error) = fs::remove_file(&path) {
                    warn!("failed to remove incomplete file {}: {}", path.display(), remove_error);
                }
                return Err(e);
            }

            info!("wrote {}", path.display());
            written.push(path);
        }
    }

    Ok(written)
}
