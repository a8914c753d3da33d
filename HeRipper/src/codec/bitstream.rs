//! Bit readers for the bitstream codecs
//!
//! Room images read bits least-significant first; glyph sets read them
//! most-significant first. Both yield `None` once the data is exhausted,
//! and the `*_or_zero` helpers treat missing bits as zero.

/// Reader that takes bit 0 of each byte first.
#[derive(Debug, Clone)]
pub struct LsbBits<'a> {
    bytes: &'a [u8],
    idx: usize,
    bidx: u32,
}

impl<'a> LsbBits<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, idx: 0, bidx: 0 }
    }

    pub fn pop_bit(&mut self) -> Option<bool> {
        let byte = self.bytes.get(self.idx)?;
        let bit = (byte >> self.bidx) & 1;
        self.bidx += 1;
        if self.bidx > 7 {
            self.bidx = 0;
            self.idx += 1;
        }
        Some(bit == 1)
    }

    /// `count` bits assembled with the first bit in position 0.
    pub fn pop_bits(&mut self, count: u32) -> Option<u32> {
        let mut value = 0;
        for shift in 0..count {
            value |= u32::from(self.pop_bit()?) << shift;
        }
        Some(value)
    }

    pub fn bit_or_zero(&mut self) -> u32 {
        self.pop_bit().map_or(0, u32::from)
    }

    /// Like [`pop_bits`](Self::pop_bits) with missing bits read as zero.
    pub fn bits_or_zero(&mut self, count: u32) -> u32 {
        let mut value = 0;
        for shift in 0..count {
            value |= self.bit_or_zero() << shift;
        }
        value
    }

    pub fn is_exhausted(&self) -> bool {
        self.idx >= self.bytes.len()
    }
}

/// Reader that takes bit 7 of each byte first.
#[derive(Debug, Clone)]
pub struct MsbBits<'a> {
    bytes: &'a [u8],
    idx: usize,
    bidx: u32,
}

impl<'a> MsbBits<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, idx: 0, bidx: 0 }
    }

    pub fn pop_bit(&mut self) -> Option<bool> {
        let byte = self.bytes.get(self.idx)?;
        let bit = (byte >> (7 - self.bidx)) & 1;
        self.bidx += 1;
        if self.bidx > 7 {
            self.bidx = 0;
            self.idx += 1;
        }
        Some(bit == 1)
    }

    /// `count` bits assembled with the first bit most significant.
    pub fn bits_or_zero(&mut self, count: u32) -> u32 {
        let mut value = 0;
        for _ in 0..count {
            value = (value << 1) | self.pop_bit().map_or(0, u32::from);
        }
        value
    }
}
