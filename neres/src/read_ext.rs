use std::io::{self, Read};


pub(crate) trait ReadExt {
    /// Fills as much of `buf` as possible, stopping early only at end of file.
    ///
    /// Returns the number of bytes actually read.
    fn read_exact_or_eof(&mut self, buf: &mut [u8]) -> Result<usize, io::Error>;

    fn read_u16_le(&mut self) -> Result<u16, io::Error>;
    fn read_u32_le(&mut self) -> Result<u32, io::Error>;
}
impl<R: Read> ReadExt for R {
    fn read_exact_or_eof(&mut self, buf: &mut [u8]) -> Result<usize, io::Error> {
        let mut total_bytes_read = 0;
        while total_bytes_read < buf.len() {
            let bytes_read_this_time = match self.read(&mut buf[total_bytes_read..]) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if bytes_read_this_time == 0 {
                // EOF, break out
                break;
            }
            total_bytes_read += bytes_read_this_time;
        }
        Ok(total_bytes_read)
    }

    fn read_u16_le(&mut self) -> Result<u16, io::Error> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32_le(&mut self) -> Result<u32, io::Error> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }
}


#[cfg(test)]
mod tests {
    use super::ReadExt;
    use std::io::Cursor;

    #[test]
    fn test_short_read_stops_at_eof() {
        let mut cursor = Cursor::new(b"MZ\x01");
        let mut buf = [0xAAu8; 8];
        let read = cursor.read_exact_or_eof(&mut buf).unwrap();
        assert_eq!(read, 3);
        assert_eq!(&buf[..4], b"MZ\x01\xAA");
    }

    #[test]
    fn test_little_endian_helpers() {
        let mut cursor = Cursor::new(b"\x34\x12\x78\x56\x34\x12");
        assert_eq!(cursor.read_u16_le().unwrap(), 0x1234);
        assert_eq!(cursor.read_u32_le().unwrap(), 0x12345678);
        assert!(cursor.read_u16_le().is_err());
    }
}
