//! PCM sample buffers
//!
//! Sounds come out of the archive as raw 8-bit mono PCM or as embedded
//! RIFF/WAVE files. [`PcmBuffer`] holds either after decoding, converts
//! signedness, normalises, trims, and writes a canonical WAV file.

use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

/// Sample rate of unheadered sound data.
pub const DEFAULT_SAMPLE_RATE: u32 = 11025;

/// Size of the header [`PcmBuffer::write_wav`] produces.
pub const WAV_HEADER_SIZE: usize = 44;

/// Interleaved little-endian PCM plus its format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmBuffer {
    pub data: Vec<u8>,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub signed: bool,
}

impl Default for PcmBuffer {
    fn default() -> Self {
        Self::unsigned_8bit(Vec::new(), DEFAULT_SAMPLE_RATE)
    }
}

impl PcmBuffer {
    /// 8-bit unsigned mono, the format of every `DIGI`/`TALK` sound.
    #[must_use]
    pub fn unsigned_8bit(data: Vec<u8>, sample_rate: u32) -> Self {
        Self {
            data,
            channels: 1,
            sample_rate,
            bits_per_sample: 8,
            signed: false,
        }
    }

    pub fn bytes_per_sample(&self) -> usize {
        usize::from(self.bits_per_sample / 8).max(1)
    }

    pub fn block_align(&self) -> u16 {
        self.channels * (self.bits_per_sample / 8).max(1)
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * u32::from(self.block_align())
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Duration in seconds.
    #[must_use]
    pub fn duration_secs(&self) -> f32 {
        let rate = self.byte_rate();
        if rate == 0 {
            return 0.0;
        }
        self.data.len() as f32 / rate as f32
    }

    fn sample_count(&self) -> usize {
        self.data.len() / self.bytes_per_sample()
    }

    /// Sample `i` as a signed value.
    fn sample(&self, i: usize) -> i32 {
        let width = self.bytes_per_sample();
        let at = i * width;
        let raw = match width {
            1 => i32::from(self.data[at]),
            _ => i32::from(u16::from_le_bytes([self.data[at], self.data[at + 1]])),
        };
        let half = 1i32 << (u32::from(self.bits_per_sample) - 1);
        if self.signed {
            if raw >= half { raw - 2 * half } else { raw }
        } else {
            raw - half
        }
    }

    fn set_sample(&mut self, i: usize, value: i32) {
        let width = self.bytes_per_sample();
        let at = i * width;
        let half = 1i32 << (u32::from(self.bits_per_sample) - 1);
        let stored = if self.signed { value } else { value + half };
        match width {
            1 => self.data[at] = stored as u8,
            _ => self.data[at..at + 2].copy_from_slice(&(stored as u16).to_le_bytes()),
        }
    }

    /// Flip the sign convention of every sample in place.
    fn flip_sign(&mut self) {
        let width = self.bytes_per_sample();
        for chunk in self.data.chunks_exact_mut(width) {
            if let Some(msb) = chunk.last_mut() {
                *msb ^= 0x80;
            }
        }
        self.signed = !self.signed;
    }

    /// Convert to unsigned samples.
    #[must_use]
    pub fn into_unsigned(mut self) -> Self {
        if self.signed {
            self.flip_sign();
        }
        self
    }

    /// Convert to signed samples.
    #[must_use]
    pub fn into_signed(mut self) -> Self {
        if !self.signed {
            self.flip_sign();
        }
        self
    }

    /// Widen 8-bit samples to signed 16-bit.
    #[must_use]
    pub fn widened(&self) -> Self {
        if self.bits_per_sample != 8 {
            return self.clone();
        }
        let mut data = Vec::with_capacity(self.data.len() * 2);
        for i in 0..self.sample_count() {
            let value = (self.sample(i) << 8) as i16;
            data.extend_from_slice(&value.to_le_bytes());
        }
        Self {
            data,
            bits_per_sample: 16,
            signed: true,
            ..*self
        }
    }

    /// Scale the buffer so its loudest sample reaches full scale.
    ///
    /// 8-bit input is widened to 16-bit first. A buffer that already
    /// touches either rail, or is silent, is left alone.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut out = self.widened();
        let count = out.sample_count();
        if count == 0 {
            return out;
        }
        let max_peak = (1i32 << (u32::from(out.bits_per_sample) - 1)) - 1;
        let min_peak = -max_peak - 1;
        let (mut lowest, mut highest) = (i32::MAX, i32::MIN);
        for i in 0..count {
            let value = out.sample(i);
            lowest = lowest.min(value);
            highest = highest.max(value);
        }
        if highest >= max_peak || lowest <= min_peak || (highest == 0 && lowest == 0) {
            return out;
        }
        let scale = if highest.abs() < lowest.abs() {
            f64::from(-min_peak) / f64::from(lowest.abs())
        } else {
            f64::from(max_peak) / f64::from(highest.abs())
        };
        for i in 0..count {
            let value = (f64::from(out.sample(i)) * scale) as i32;
            out.set_sample(i, value.clamp(min_peak, max_peak));
        }
        out
    }

    /// Drop `start` bytes from the front and `end` bytes from the back.
    #[must_use]
    pub fn trimmed(&self, start: usize, end: usize) -> Self {
        let len = self.data.len();
        let from = start.min(len);
        let to = len.saturating_sub(end).max(from);
        Self {
            data: self.data[from..to].to_vec(),
            ..*self
        }
    }

    /// Decode an embedded RIFF/WAVE file holding integer PCM.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRiff`] when the magic numbers, the `fmt `
    /// chunk or the `data` chunk are missing or unusable.
    pub fn from_riff(bytes: &[u8]) -> Result<Self> {
        let invalid = |message: &str| Error::InvalidRiff {
            message: message.to_string(),
        };
        let mut reader = Cursor::new(bytes);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != b"RIFF" {
            return Err(invalid("missing RIFF magic"));
        }
        let _riff_size = reader.read_u32::<LittleEndian>()?;
        reader.read_exact(&mut magic)?;
        if &magic != b"WAVE" {
            return Err(invalid("missing WAVE magic"));
        }

        let mut format: Option<(u16, u16, u32, u16)> = None;
        loop {
            let mut chunk_id = [0u8; 4];
            if reader.read_exact(&mut chunk_id).is_err() {
                break;
            }
            let chunk_size = reader.read_u32::<LittleEndian>()?;
            let chunk_start = reader.position();

            match &chunk_id {
                b"fmt " => {
                    let code = reader.read_u16::<LittleEndian>()?;
                    let channels = reader.read_u16::<LittleEndian>()?;
                    let sample_rate = reader.read_u32::<LittleEndian>()?;
                    let _byte_rate = reader.read_u32::<LittleEndian>()?;
                    let _block_align = reader.read_u16::<LittleEndian>()?;
                    let bits = reader.read_u16::<LittleEndian>()?;
                    format = Some((code, channels, sample_rate, bits));
                }
                b"data" => {
                    let (code, channels, sample_rate, bits) =
                        format.ok_or_else(|| invalid("data chunk before fmt chunk"))?;
                    if code != 1 {
                        return Err(invalid(&format!("unsupported format code {code:#06x}")));
                    }
                    if bits != 8 && bits != 16 {
                        return Err(invalid(&format!("unsupported sample width {bits}")));
                    }
                    let start = chunk_start as usize;
                    let end = start.saturating_add(chunk_size as usize).min(bytes.len());
                    return Ok(Self {
                        data: bytes[start..end].to_vec(),
                        channels,
                        sample_rate,
                        bits_per_sample: bits,
                        signed: bits > 8,
                    });
                }
                _ => {}
            }

            // Chunks are word aligned.
            let next = chunk_start + u64::from(chunk_size);
            reader.set_position((next + 1) & !1);
        }
        Err(invalid("no data chunk"))
    }

    /// Write the buffer as a canonical 44-byte-header WAV file.
    ///
    /// WAV stores 8-bit samples unsigned and wider samples signed, so the
    /// sign is converted on the way out when needed.
    pub fn write_wav<W: Write>(&self, writer: &mut W) -> Result<()> {
        let wav_signed = self.bits_per_sample > 8;
        let converted;
        let samples = if self.signed == wav_signed {
            &self.data
        } else {
            let mut copy = self.clone();
            copy.flip_sign();
            converted = copy;
            &converted.data
        };

        let data_size = samples.len() as u32;
        writer.write_all(b"RIFF")?;
        writer.write_u32::<LittleEndian>(36 + data_size)?;
        writer.write_all(b"WAVE")?;

        writer.write_all(b"fmt ")?;
        writer.write_u32::<LittleEndian>(16)?;
        writer.write_u16::<LittleEndian>(1)?;
        writer.write_u16::<LittleEndian>(self.channels)?;
        writer.write_u32::<LittleEndian>(self.sample_rate)?;
        writer.write_u32::<LittleEndian>(self.byte_rate())?;
        writer.write_u16::<LittleEndian>(self.block_align())?;
        writer.write_u16::<LittleEndian>(self.bits_per_sample)?;

        writer.write_all(b"data")?;
        writer.write_u32::<LittleEndian>(data_size)?;
        writer.write_all(samples)?;
        Ok(())
    }

    /// [`write_wav`](Self::write_wav) into a new vector.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(WAV_HEADER_SIZE + self.data.len());
        self.write_wav(&mut out)?;
        Ok(out)
    }
}
