//! XOR-decoding random-access cursor over an archive buffer
//!
//! Every byte handed out by [`ByteCursor`] has been XORed with the archive
//! key. Reads that would cross the end of the buffer fail with
//! [`Error::TruncatedPayload`] and leave the position untouched.
//!
//! [`Error::TruncatedPayload`]: crate::Error::TruncatedPayload

use std::io::{self, Read};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use crate::error::{Error, Result};

/// Byte order for [`ByteCursor::read_int`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// Cursor over a borrowed buffer with a transparent single-byte XOR key.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    key: u8,
}

impl<'a> ByteCursor<'a> {
    /// Open a cursor at offset 0.
    #[must_use]
    pub fn new(data: &'a [u8], key: u8) -> Self {
        Self { data, pos: 0, key }
    }

    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn tell(&self) -> usize {
        self.pos
    }

    /// Move to an absolute offset. Offsets past the end are allowed; the
    /// next read reports the truncation.
    pub fn seek(&mut self, offset: usize) {
        self.pos = offset;
    }

    /// Move relative to the current position, stopping at 0.
    pub fn seek_relative(&mut self, delta: isize) {
        self.pos = self.pos.saturating_add_signed(delta);
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn ensure(&self, n: usize) -> Result<()> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(Error::TruncatedPayload {
                offset: self.pos,
                needed: n - remaining,
            });
        }
        Ok(())
    }

    /// Read `n` decoded bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        self.ensure(n)?;
        let mut out = vec![0u8; n];
        self.read_exact(&mut out)?;
        Ok(out)
    }

    /// Read up to `n` decoded bytes, stopping at the end of the buffer.
    pub fn read_bytes_clamped(&mut self, n: usize) -> Vec<u8> {
        let n = n.min(self.remaining());
        if n == 0 {
            return Vec::new();
        }
        let out = self.data[self.pos..self.pos + n]
            .iter()
            .map(|b| b ^ self.key)
            .collect();
        self.pos += n;
        out
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(ReadBytesExt::read_u8(self)?)
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.read_u16::<LittleEndian>()?)
    }

    pub fn read_i16_le(&mut self) -> Result<i16> {
        self.ensure(2)?;
        Ok(self.read_i16::<LittleEndian>()?)
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.read_u32::<LittleEndian>()?)
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.read_u32::<BigEndian>()?)
    }

    /// Read an unsigned integer of 1 to 4 bytes.
    pub fn read_int(&mut self, n: usize, endian: Endian) -> Result<u32> {
        let n = n.clamp(1, 4);
        self.ensure(n)?;
        let value = match endian {
            Endian::Little => self.read_uint::<LittleEndian>(n)?,
            Endian::Big => self.read_uint::<BigEndian>(n)?,
        };
        Ok(value as u32)
    }

    /// Read a four-character tag.
    pub fn read_tag(&mut self) -> Result<[u8; 4]> {
        self.ensure(4)?;
        let mut tag = [0u8; 4];
        self.read_exact(&mut tag)?;
        Ok(tag)
    }

    /// Read a fixed-size field holding a NUL-terminated string.
    pub fn read_cstring(&mut self, len: usize) -> Result<String> {
        let bytes = self.read_bytes(len)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// Forward linear search for a decoded byte pattern, starting at the
    /// current position. On a match the cursor is left on it and the
    /// offset returned; otherwise the cursor is left at the end.
    pub fn scan_for(&mut self, pattern: &[u8]) -> Option<usize> {
        if pattern.is_empty() || self.pos >= self.data.len() {
            self.pos = self.data.len();
            return None;
        }
        let key = self.key;
        let found = self.data[self.pos..]
            .windows(pattern.len())
            .position(|w| w.iter().zip(pattern).all(|(&b, &p)| b ^ key == p));
        match found {
            Some(rel) => {
                self.pos += rel;
                Some(self.pos)
            }
            None => {
                self.pos = self.data.len();
                None
            }
        }
    }

    /// The whole buffer with the key applied.
    pub fn decoded(&self) -> Vec<u8> {
        self.data.iter().map(|b| b ^ self.key).collect()
    }
}

impl Read for ByteCursor<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.remaining());
        if n == 0 {
            return Ok(0);
        }
        let src = &self.data[self.pos..self.pos + n];
        for (dst, &b) in buf.iter_mut().zip(src) {
            *dst = b ^ self.key;
        }
        self.pos += n;
        Ok(n)
    }
}
