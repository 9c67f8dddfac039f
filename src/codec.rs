//! Deterministic binary codec shared by contract parameters, headers and
//! transactions.
//!
//! Integers are little endian. Variable-length integers use the CompactSize
//! layout (`< 0xFD` inline, `0xFD` + u16, `0xFE` + u32, `0xFF` + u64) and must
//! be minimally encoded; anything else is reported as irregular data.

use crate::crypto::{Address, ADDRESS_LEN};
use crate::error::{ChainError, Result};

/// Append-only byte writer.
#[derive(Debug, Default, Clone)]
pub struct Sink {
    buf: Vec<u8>,
}

impl Sink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(v as u8);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_var_uint(&mut self, v: u64) {
        if v < 0xFD {
            self.write_u8(v as u8);
        } else if v <= 0xFFFF {
            self.write_u8(0xFD);
            self.write_u16(v as u16);
        } else if v <= 0xFFFF_FFFF {
            self.write_u8(0xFE);
            self.write_u32(v as u32);
        } else {
            self.write_u8(0xFF);
            self.write_u64(v);
        }
    }

    pub fn write_var_bytes(&mut self, bytes: &[u8]) {
        self.write_var_uint(bytes.len() as u64);
        self.write_bytes(bytes);
    }

    pub fn write_string(&mut self, s: &str) {
        self.write_var_bytes(s.as_bytes());
    }

    pub fn write_address(&mut self, address: &Address) {
        self.write_bytes(address.as_bytes());
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct Source<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Source<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Source { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn next_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(ChainError::MalformedInput(format!(
                "unexpected end of input: need {} bytes at offset {}, {} left",
                n,
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn next_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.next_bytes(N)?);
        Ok(out)
    }

    pub fn next_u8(&mut self) -> Result<u8> {
        Ok(self.next_bytes(1)?[0])
    }

    pub fn next_bool(&mut self) -> Result<bool> {
        match self.next_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ChainError::DataIrregularity(format!("invalid bool byte {:#04x}", other))),
        }
    }

    pub fn next_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.next_array()?))
    }

    pub fn next_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.next_array()?))
    }

    pub fn next_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.next_array()?))
    }

    pub fn next_var_uint(&mut self) -> Result<u64> {
        let (value, min) = match self.next_u8()? {
            0xFD => (self.next_u16()? as u64, 0xFD),
            0xFE => (self.next_u32()? as u64, 0x1_0000),
            0xFF => (self.next_u64()?, 0x1_0000_0000),
            small => return Ok(small as u64),
        };
        if value < min {
            return Err(ChainError::DataIrregularity(format!(
                "non-minimal varint encoding of {}",
                value
            )));
        }
        Ok(value)
    }

    pub fn next_var_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.next_var_uint()?;
        if len > self.remaining() as u64 {
            return Err(ChainError::MalformedInput(format!(
                "var bytes length {} exceeds remaining {}",
                len,
                self.remaining()
            )));
        }
        self.next_bytes(len as usize)
    }

    pub fn next_string(&mut self) -> Result<String> {
        let bytes = self.next_var_bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ChainError::DataIrregularity(format!("invalid utf-8 string: {}", e)))
    }

    pub fn next_address(&mut self) -> Result<Address> {
        Ok(Address(self.next_array::<ADDRESS_LEN>()?))
    }

    /// Fails with `DataIrregularity` when bytes are left over.
    pub fn expect_end(&self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ChainError::DataIrregularity(format!(
                "{} trailing bytes after parameters",
                self.remaining()
            )))
        }
    }
}

/// Types with a canonical binary encoding.
pub trait Encode {
    fn encode(&self, sink: &mut Sink);

    fn to_bytes(&self) -> Vec<u8> {
        let mut sink = Sink::new();
        self.encode(&mut sink);
        sink.into_bytes()
    }
}

/// Types decodable from the canonical binary encoding.
pub trait Decode: Sized {
    fn decode(source: &mut Source<'_>) -> Result<Self>;

    /// Decodes a complete buffer; trailing bytes are irregular.
    fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut source = Source::new(data);
        let value = Self::decode(&mut source)?;
        source.expect_end()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var_uint_bytes(v: u64) -> Vec<u8> {
        let mut sink = Sink::new();
        sink.write_var_uint(v);
        sink.into_bytes()
    }

    #[test]
    fn test_var_uint_layout() {
        assert_eq!(var_uint_bytes(0), vec![0x00]);
        assert_eq!(var_uint_bytes(0xFC), vec![0xFC]);
        assert_eq!(var_uint_bytes(0xFD), vec![0xFD, 0xFD, 0x00]);
        assert_eq!(var_uint_bytes(0x1_0000), vec![0xFE, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(
            var_uint_bytes(0x1_0000_0000),
            vec![0xFF, 0, 0, 0, 0, 1, 0, 0, 0]
        );
    }

    #[test]
    fn test_var_uint_boundaries_decode() {
        for v in [0u64, 0xFC, 0xFD, 0xFFFF, 0x1_0000, 0xFFFF_FFFF, 0x1_0000_0000, u64::MAX] {
            let bytes = var_uint_bytes(v);
            let mut source = Source::new(&bytes);
            assert_eq!(source.next_var_uint().unwrap(), v);
            assert!(source.is_empty());
        }
    }

    #[test]
    fn test_non_minimal_var_uint_is_irregular() {
        let mut source = Source::new(&[0xFD, 0x05, 0x00]);
        assert!(matches!(source.next_var_uint(), Err(ChainError::DataIrregularity(_))));

        let mut source = Source::new(&[0xFE, 0xFF, 0xFF, 0x00, 0x00]);
        assert!(matches!(source.next_var_uint(), Err(ChainError::DataIrregularity(_))));
    }

    #[test]
    fn test_truncated_input_is_malformed() {
        let mut source = Source::new(&[0xFE, 0x01]);
        assert!(matches!(source.next_var_uint(), Err(ChainError::MalformedInput(_))));

        let mut source = Source::new(&[0x05, 1, 2]);
        assert!(matches!(source.next_var_bytes(), Err(ChainError::MalformedInput(_))));

        let mut source = Source::new(&[0u8; ADDRESS_LEN - 1]);
        assert!(matches!(source.next_address(), Err(ChainError::MalformedInput(_))));
    }

    #[test]
    fn test_expect_end_reports_trailing_bytes() {
        let mut source = Source::new(&[1, 2]);
        source.next_u8().unwrap();
        assert!(matches!(source.expect_end(), Err(ChainError::DataIrregularity(_))));
        source.next_u8().unwrap();
        assert!(source.expect_end().is_ok());
    }

    #[test]
    fn test_string_and_bool() {
        let mut sink = Sink::new();
        sink.write_string("ONT");
        sink.write_bool(true);
        let bytes = sink.into_bytes();
        assert_eq!(bytes, vec![3, b'O', b'N', b'T', 1]);

        let mut source = Source::new(&bytes);
        assert_eq!(source.next_string().unwrap(), "ONT");
        assert!(source.next_bool().unwrap());

        let mut source = Source::new(&[2]);
        assert!(matches!(source.next_bool(), Err(ChainError::DataIrregularity(_))));
    }
}
