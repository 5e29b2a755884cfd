//! Attribute checksum
//!
//! The TNEF checksum is the plain sum of the payload bytes modulo 65536
use std::io::Read;

/// Computes the checksum of `data`
pub fn checksum(data: &[u8]) -> u16 {
    data.iter()
        .fold(0u16, |sum, b| sum.wrapping_add(u16::from(*b)))
}

/// A stream reader which sums every byte passing through it
pub struct ChecksumReader<R: Read> {
    stream: R,
    sum: u16,
}

impl<R: Read> ChecksumReader<R> {
    /// Creates a new reader with a zero running sum
    pub fn new(stream: R) -> Self {
        Self { stream, sum: 0 }
    }

    /// The checksum of the bytes read so far
    pub fn sum(&self) -> u16 {
        self.sum
    }
}

impl<R: Read> Read for ChecksumReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, std::io::Error> {
        let sz = self.stream.read(buf)?;
        self.sum = self.sum.wrapping_add(checksum(&buf[0..sz]));
        Ok(sz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_mod_65536() {
        assert_eq!(checksum(&[]), 0);
        assert_eq!(checksum(b"hi"), 0x68 + 0x69);
        // 300 * 255 = 76500 = 0x12AD4
        let big = vec![0xffu8; 300];
        assert_eq!(checksum(&big), (76500u32 % 65536) as u16);
    }

    #[test]
    fn single_byte_mutation() {
        let mut data = b"attachment payload".to_vec();
        let before = checksum(&data);
        data[3] = data[3].wrapping_add(1);
        assert_eq!(checksum(&data), before.wrapping_add(1));
    }

    #[test]
    fn reader_matches_slice() -> Result<(), std::io::Error> {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let mut r = ChecksumReader::new(data.as_slice());
        let mut out = Vec::new();
        r.read_to_end(&mut out)?;
        assert_eq!(out, data);
        assert_eq!(r.sum(), checksum(&data));
        Ok(())
    }
}
