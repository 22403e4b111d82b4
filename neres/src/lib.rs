pub mod bitmap;
mod error;
pub mod extract;
pub mod mz;
pub mod ne;
mod read_ext;
#[cfg(test)]
mod test_image;


use std::io::{self, Read};

pub use crate::error::{Error, InvalidFormat};


/// Reads a string consisting of a length byte followed by that many bytes.
pub(crate) fn read_pascal_byte_string<R: Read>(reader: &mut R) -> Result<Vec<u8>, io::Error> {
    let mut length_buf = [0u8];
    reader.read_exact(&mut length_buf)?;
    let mut ret = vec![0u8; length_buf[0].into()];
    reader.read_exact(&mut ret)?;
    Ok(ret)
}
