//! Room and object image codecs
//!
//! `BMAP` holds one encoded region, `SMAP` a strip table of 8-pixel wide
//! regions each with its own encoding byte, and `BOMP` a self-sized lined
//! RLE image with its own transparency byte.

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{Error, Result};
use crate::formats::sputm::chunk::{ChunkTag, RawChunk};
use crate::resolver::{RleFraming, Resolvers};

use super::bitstream::LsbBits;
use super::palette::{ColorPipeline, Transparency};
use super::raster::{DrawPos, Raster, Region};
use super::rle::{byte_at, decode_lined, decode_unlined, is_lined_rle, le16_at};

/// Width of one `SMAP` strip.
pub const STRIP_WIDTH: usize = 8;

/// Parameters of the generic bitstream codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitstreamParams {
    /// Bits in an absolute colour.
    pub absolute_bits: u32,
    /// Bits in a relative delta: 1 or 3.
    pub relative_bits: u32,
    /// Row-major when set, column-major otherwise.
    pub horizontal: bool,
    pub transparent: bool,
    /// 3-bit deltas skip zero instead of signalling an explicit run.
    pub expanded_range: bool,
}

/// What an encoding selector byte asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Literal,
    SolidFill,
    /// Encoding 8 (transparent) or 9; framing comes from the resolver.
    Rle { transparent: bool },
    Bitstream(BitstreamParams),
}

impl Encoding {
    pub fn from_selector(selector: u8) -> Option<Self> {
        let (horizontal, transparent, expanded_range) = match selector {
            1 | 149 => return Some(Encoding::Literal),
            143 | 150 => return Some(Encoding::SolidFill),
            8 => return Some(Encoding::Rle { transparent: true }),
            9 => return Some(Encoding::Rle { transparent: false }),
            0x0E..=0x12 => (false, false, false),
            0x18..=0x1C => (true, false, false),
            0x22..=0x26 => (false, true, false),
            0x2C..=0x30 => (true, true, false),
            0x40..=0x44 | 0x68..=0x6C => (true, false, false),
            0x54..=0x58 | 0x7C..=0x80 => (true, true, false),
            0x86..=0x8A => (true, false, true),
            0x90..=0x94 => (true, true, true),
            _ => return None,
        };
        Some(Encoding::Bitstream(BitstreamParams {
            absolute_bits: u32::from(selector % 10),
            relative_bits: if selector <= 0x30 { 1 } else { 3 },
            horizontal,
            transparent,
            expanded_range,
        }))
    }
}

/// Decode one region given its selector byte and the bytes after it.
///
/// Returns how many pixels the data described beyond the region.
///
/// # Errors
///
/// Returns [`Error::UnsupportedEncoding`] for an unknown selector.
///
/// [`Error::UnsupportedEncoding`]: crate::Error::UnsupportedEncoding
pub fn decode_encoded(
    raster: &mut Raster,
    data: &[u8],
    selector: u8,
    region: Region,
    transparency: Transparency,
    resolvers: &mut Resolvers,
    diag: &mut Diagnostics,
) -> Result<usize> {
    let encoding = Encoding::from_selector(selector).ok_or(Error::UnsupportedEncoding(selector))?;
    let clipped = match encoding {
        Encoding::Literal => {
            let mut pos = DrawPos::default();
            for &byte in data.iter().take(region.width * region.height) {
                pos = raster.draw_row_wrap(u32::from(byte), 1, pos, region);
            }
            0
        }
        Encoding::SolidFill => {
            raster.fill_region(byte_at(data, 0), region);
            0
        }
        Encoding::Rle { transparent } => {
            let pipeline = if transparent {
                ColorPipeline::transparent(transparency.key, transparency.fill)
            } else {
                ColorPipeline::default()
            };
            match resolvers.rle.decide(|| is_lined_rle(data), diag) {
                RleFraming::Lined => decode_lined(raster, data, region, &pipeline),
                RleFraming::Unlined => decode_unlined(raster, data, region, &pipeline),
            }
        }
        Encoding::Bitstream(params) => {
            let pipeline = if params.transparent {
                ColorPipeline::transparent(transparency.key, transparency.fill)
            } else {
                ColorPipeline::default()
            };
            decode_bitstream(raster, data, region, params, &pipeline)
        }
    };
    Ok(clipped)
}

fn paint(raster: &mut Raster, pos: DrawPos, color: u32, count: usize, region: Region, horizontal: bool) -> DrawPos {
    if horizontal {
        raster.draw_row_wrap(color, count, pos, region)
    } else {
        raster.draw_col_wrap(color, count, pos, region)
    }
}

/// Bitstream image: a seed colour byte, then control bits read LSB first.
///
/// Returns how many pixels of the last run fell past the region's end.
pub fn decode_bitstream(
    raster: &mut Raster,
    data: &[u8],
    region: Region,
    params: BitstreamParams,
    pipeline: &ColorPipeline<'_>,
) -> usize {
    let Some((&seed, rest)) = data.split_first() else {
        return 0;
    };
    let resolve = |color: i32| pipeline.resolve((color & 0xFF) as u32);
    let horizontal = params.horizontal;

    let mut remaining = (region.width * region.height) as i64;
    if remaining == 0 {
        return 0;
    }
    let mut color = i32::from(seed);
    let mut pos = paint(raster, DrawPos::default(), resolve(color), 1, region, horizontal);
    remaining -= 1;

    let mut bits = LsbBits::new(rest);
    let mut shift_down = true;
    while remaining > 0 {
        while remaining > 0 && bits.bit_or_zero() == 0 {
            pos = paint(raster, pos, resolve(color), 1, region, horizontal);
            remaining -= 1;
        }
        if remaining <= 0 {
            break;
        }
        if bits.bit_or_zero() == 0 {
            color = bits.bits_or_zero(params.absolute_bits) as i32;
            pos = paint(raster, pos, resolve(color), 1, region, horizontal);
            remaining -= 1;
            if params.relative_bits == 1 {
                shift_down = true;
            }
        } else {
            let mut shift = bits.bits_or_zero(params.relative_bits) as i32;
            let mut length: i64 = 1;
            if params.relative_bits == 1 {
                if shift == 1 {
                    shift_down = !shift_down;
                }
                shift = if shift_down { -1 } else { 1 };
            } else {
                shift -= 1 << (params.relative_bits - 1);
                if params.expanded_range {
                    if shift >= 0 {
                        shift += 1;
                    }
                } else if shift == 0 {
                    length = i64::from(bits.bits_or_zero(8));
                }
            }
            color += shift;
            pos = paint(raster, pos, resolve(color), length as usize, region, horizontal);
            remaining -= length;
        }
    }
    remaining.unsigned_abs() as usize
}

/// Decode a `BMAP` chunk as a `width` x `height` image.
pub fn decode_bmap(
    chunk: &RawChunk,
    width: usize,
    height: usize,
    transparency: Transparency,
    resolvers: &mut Resolvers,
    diag: &mut Diagnostics,
) -> Result<Raster> {
    let payload = chunk.payload();
    let (&selector, data) = payload.split_first().ok_or(Error::TruncatedPayload {
        offset: chunk.header.payload_offset(),
        needed: 1,
    })?;
    let mut raster = Raster::new(width, height, transparency.fill);
    let region = Region::full(width, height);
    let clipped = decode_encoded(&mut raster, data, selector, region, transparency, resolvers, diag)?;
    if clipped > 0 {
        tracing::debug!(offset = chunk.header.offset, clipped, "BMAP data runs past the image");
    }
    Ok(raster)
}

/// Decode an `SMAP` chunk strip by strip. A bad strip is reported and left
/// at the fill colour.
pub fn decode_smap(
    chunk: &RawChunk,
    width: usize,
    height: usize,
    transparency: Transparency,
    resolvers: &mut Resolvers,
    diag: &mut Diagnostics,
) -> Raster {
    let bytes = &chunk.bytes;
    let mut raster = Raster::new(width, height, transparency.fill);
    let strips = width / STRIP_WIDTH;
    let offsets: Vec<usize> = (0..strips)
        .map(|i| {
            let at = 8 + 4 * i;
            le16_at(bytes, at) | (le16_at(bytes, at + 2) << 16)
        })
        .collect();

    for (i, &offset) in offsets.iter().enumerate() {
        if offset >= bytes.len() {
            diag.warn(
                DiagnosticKind::TruncatedPayload,
                Some(chunk.header.offset + 8 + 4 * i),
                format!("strip {i} offset {offset:#x} lies outside its SMAP"),
            );
            continue;
        }
        // A strip ends where the next one in the file begins.
        let end = offsets
            .iter()
            .copied()
            .filter(|&o| o > offset && o <= bytes.len())
            .min()
            .unwrap_or(bytes.len());
        let selector = bytes[offset];
        let data = &bytes[offset + 1..end];
        let region = Region::new((i * STRIP_WIDTH) as isize, 0, STRIP_WIDTH, height);
        match decode_encoded(&mut raster, data, selector, region, transparency, resolvers, diag) {
            Ok(0) => {}
            Ok(clipped) => {
                let at = chunk.header.offset + offset;
                tracing::debug!(offset = at, strip = i, clipped, "strip data runs past the strip");
            }
            Err(err) => diag.record(&err, Some(chunk.header.offset + offset)),
        }
    }
    raster
}

/// Decode a `BOMP` chunk. Its own header gives the size and a colour that
/// is left undrawn.
pub fn decode_bomp(chunk: &RawChunk, fill: u32) -> Result<Raster> {
    const BOMP_HEADER: usize = 10;
    let payload = chunk.payload();
    if payload.len() < BOMP_HEADER {
        return Err(Error::TruncatedPayload {
            offset: chunk.header.payload_offset(),
            needed: BOMP_HEADER - payload.len(),
        });
    }
    let skip_color = u32::from(payload[1]);
    let width = le16_at(payload, 2);
    let height = le16_at(payload, 4);
    let data = &payload[BOMP_HEADER..];
    let region = Region::full(width, height);
    let mut raster = Raster::new(width, height, fill);

    let len = data.len();
    let mut pos = 0;
    let mut next = 0;
    let mut y = 0;
    while pos < len && y < height {
        let count = le16_at(data, next);
        pos = next + 2;
        next += count + 2;
        let mut x = 0;
        while pos < len && pos < next {
            let code = data[pos];
            pos += 1;
            let run = usize::from(code >> 1) + 1;
            if code & 1 != 0 {
                let color = byte_at(data, pos);
                pos += 1;
                if color != skip_color {
                    raster.draw_row(color, run, x, y, region);
                }
                x += run;
            } else {
                for _ in 0..run {
                    let color = byte_at(data, pos);
                    if color != skip_color {
                        raster.draw_row(color, 1, x, y, region);
                    }
                    pos += 1;
                    x += 1;
                }
            }
        }
        y += 1;
    }
    Ok(raster)
}

/// Decode the image chunk of an `IMxx` slot.
pub fn decode_image(
    chunk: &RawChunk,
    width: usize,
    height: usize,
    transparency: Transparency,
    resolvers: &mut Resolvers,
    diag: &mut Diagnostics,
) -> Result<Raster> {
    match chunk.header.tag {
        ChunkTag::Smap => Ok(decode_smap(chunk, width, height, transparency, resolvers, diag)),
        ChunkTag::Bmap => decode_bmap(chunk, width, height, transparency, resolvers, diag),
        ChunkTag::Bomp => decode_bomp(chunk, transparency.fill),
        _ => Err(Error::UnexpectedChunk {
            expected: "SMAP, BMAP or BOMP",
            found: chunk.header.name(),
            offset: chunk.header.offset,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::sputm::chunk::ChunkHeader;
    use crate::formats::sputm::chunk::test_support::chunk;
    use crate::formats::sputm::cursor::ByteCursor;
    use crate::resolver::SAMPLE_BUDGET;

    fn raw(tag: &[u8; 4], payload: &[u8]) -> RawChunk {
        let bytes = chunk(tag, payload);
        let mut cursor = ByteCursor::new(&bytes, 0);
        let header = ChunkHeader::peek(&mut cursor).unwrap();
        RawChunk::read(&mut cursor, &header).unwrap()
    }

    const NO_TRANS: Transparency = Transparency { key: 5, fill: 0 };

    /// 4x2 BMAP, encoding 8: each row is an encoded run of 4 in colour 7.
    fn lined_bmap() -> RawChunk {
        raw(b"BMAP", &[8, 2, 0, 0b1110, 7, 2, 0, 0b1110, 7])
    }

    /// 4x2 BMAP, encoding 8, whose data only fits unlined framing: two
    /// encoded runs of 4 in colour 3.
    fn unlined_bmap() -> RawChunk {
        raw(b"BMAP", &[8, 0b111, 3, 0b111, 3])
    }

    #[test]
    fn selector_table() {
        assert_eq!(Encoding::from_selector(149), Some(Encoding::Literal));
        assert_eq!(Encoding::from_selector(8), Some(Encoding::Rle { transparent: true }));
        let Some(Encoding::Bitstream(p)) = Encoding::from_selector(0x0E) else {
            panic!("0x0E is a bitstream encoding");
        };
        assert_eq!((p.absolute_bits, p.relative_bits, p.horizontal), (4, 1, false));
        let Some(Encoding::Bitstream(p)) = Encoding::from_selector(0x90) else {
            panic!("0x90 is a bitstream encoding");
        };
        assert_eq!((p.absolute_bits, p.relative_bits), (4, 3));
        assert!(p.transparent && p.expanded_range);
        assert_eq!(Encoding::from_selector(0x31), None);
    }

    #[test]
    fn literal_round_trip() {
        let pixels: Vec<u8> = (0..12).collect();
        let mut payload = vec![1u8];
        payload.extend_from_slice(&pixels);
        let chunk = raw(b"BMAP", &payload);
        let mut diag = Diagnostics::new();
        let raster = decode_bmap(&chunk, 4, 3, NO_TRANS, &mut Resolvers::default(), &mut diag).unwrap();
        let decoded: Vec<u8> = raster.pixels().iter().map(|&p| p as u8).collect();
        assert_eq!(decoded, pixels);
    }

    #[test]
    fn solid_fill_stays_in_strip() {
        // Two strips: literal 8x1 of 3s, then solid fill of 6.
        let mut payload = Vec::new();
        payload.extend_from_slice(&16u32.to_le_bytes());
        payload.extend_from_slice(&25u32.to_le_bytes());
        payload.push(1);
        payload.extend_from_slice(&[3; 8]);
        payload.extend_from_slice(&[150, 6]);
        let chunk = raw(b"SMAP", &payload);
        let mut diag = Diagnostics::new();
        let raster = decode_smap(&chunk, 16, 1, NO_TRANS, &mut Resolvers::default(), &mut diag);
        assert_eq!(&raster.pixels()[..8], &[3; 8]);
        assert_eq!(&raster.pixels()[8..], &[6; 8]);
        assert_eq!(diag.errors(), 0);
    }

    #[test]
    fn bitstream_one_bit_deltas() {
        // seed 10; bits (LSB first): 0 -> repeat, 1 1 0 -> relative, no toggle -> -1
        let data = [10u8, 0b0000_0110];
        let mut raster = Raster::new(3, 1, 0);
        let Some(Encoding::Bitstream(params)) = Encoding::from_selector(0x18) else {
            panic!("0x18 is a bitstream encoding");
        };
        decode_bitstream(&mut raster, &data, Region::full(3, 1), params, &ColorPipeline::default());
        assert_eq!(raster.pixels(), &[10, 10, 9]);
    }

    #[test]
    fn bomp_skips_its_transparent_colour() {
        let mut payload = vec![0, 4];
        payload.extend_from_slice(&3u16.to_le_bytes());
        payload.extend_from_slice(&1u16.to_le_bytes());
        payload.extend_from_slice(&[0, 0, 0, 0]);
        // row: byte count 4, absolute run of 3: 1, 4, 2
        payload.extend_from_slice(&[4, 0, 0b100, 1, 4, 2]);
        let chunk = raw(b"BOMP", &payload);
        let raster = decode_bomp(&chunk, 9).unwrap();
        assert_eq!((raster.width(), raster.height()), (3, 1));
        assert_eq!(raster.pixels(), &[1, 9, 2]);
    }

    #[test]
    fn rle_framing_locks_after_the_sample_budget() {
        let mut fresh = Resolvers::default();
        let raster = decode_bmap(&unlined_bmap(), 4, 2, NO_TRANS, &mut fresh, &mut Diagnostics::new()).unwrap();
        assert_eq!(raster.pixels(), &[3; 8]);

        let mut resolvers = Resolvers::default();
        let mut diag = Diagnostics::new();
        for _ in 0..SAMPLE_BUDGET {
            let raster = decode_bmap(&lined_bmap(), 4, 2, NO_TRANS, &mut resolvers, &mut diag).unwrap();
            assert_eq!(raster.pixels(), &[7; 8]);
        }
        assert!(resolvers.rle.is_locked());
        assert_eq!(resolvers.rle.remaining_samples(), 0);

        // Read as lined, every code is a skip and the image stays at the fill.
        let raster = decode_bmap(&unlined_bmap(), 4, 2, NO_TRANS, &mut resolvers, &mut diag).unwrap();
        assert_eq!(raster.pixels(), &[0; 8]);
        assert_eq!(resolvers.rle.decision(), Some(RleFraming::Lined));
        assert_eq!(diag.count(DiagnosticKind::ResolverFlip), 0);
    }

    #[test]
    fn forced_rle_framing_ignores_the_data() {
        let mut resolvers = Resolvers::new(Some(RleFraming::Unlined), None);
        let mut diag = Diagnostics::new();
        for _ in 0..SAMPLE_BUDGET {
            decode_bmap(&lined_bmap(), 4, 2, NO_TRANS, &mut resolvers, &mut diag).unwrap();
        }
        let raster = decode_bmap(&unlined_bmap(), 4, 2, NO_TRANS, &mut resolvers, &mut diag).unwrap();
        assert_eq!(raster.pixels(), &[3; 8]);
        assert!(resolvers.rle.is_forced());
        assert_eq!(resolvers.rle.decision(), Some(RleFraming::Unlined));
        assert_eq!(diag.warnings(), 0);
    }

    #[test]
    fn locked_strip_decodes_are_repeatable() {
        // One 8x2 strip, encoding 8: each row an encoded run of 8 in colour 7.
        let mut payload = 12u32.to_le_bytes().to_vec();
        payload.push(8);
        payload.extend_from_slice(&[2, 0, 0b1_1110, 7, 2, 0, 0b1_1110, 7]);
        let smap = raw(b"SMAP", &payload);

        let mut resolvers = Resolvers::default();
        let mut diag = Diagnostics::new();
        for _ in 0..SAMPLE_BUDGET {
            decode_bmap(&lined_bmap(), 4, 2, NO_TRANS, &mut resolvers, &mut diag).unwrap();
        }
        assert!(resolvers.rle.is_locked());

        let first = decode_smap(&smap, 8, 2, NO_TRANS, &mut resolvers, &mut diag);
        let second = decode_smap(&smap, 8, 2, NO_TRANS, &mut resolvers, &mut diag);
        assert_eq!(first.pixels(), &[7; 16]);
        assert_eq!(first.pixels(), second.pixels());
        assert_eq!(diag.warnings() + diag.errors(), 0);
    }

    #[test]
    fn pixels_past_the_strip_are_counted() {
        let mut raster = Raster::new(16, 1, 0);
        let mut resolvers = Resolvers::new(Some(RleFraming::Lined), None);
        let mut diag = Diagnostics::new();
        // encoded run of 10 in colour 7
        let data = [2, 0, 0b10_0110, 7];
        let region = Region::new(0, 0, STRIP_WIDTH, 1);
        let clipped = decode_encoded(&mut raster, &data, 8, region, NO_TRANS, &mut resolvers, &mut diag).unwrap();
        assert_eq!(clipped, 2);
        assert_eq!(&raster.pixels()[..8], &[7; 8]);
        assert_eq!(&raster.pixels()[8..], &[0; 8]);

        let solid = decode_encoded(&mut raster, &[4], 150, region, NO_TRANS, &mut resolvers, &mut diag).unwrap();
        assert_eq!(solid, 0);
    }

    #[test]
    fn unknown_selector_is_an_error() {
        let chunk = raw(b"BMAP", &[0x31, 0, 0]);
        let mut diag = Diagnostics::new();
        let err = decode_bmap(&chunk, 1, 1, NO_TRANS, &mut Resolvers::default(), &mut diag).unwrap_err();
        assert!(matches!(err, Error::UnsupportedEncoding(0x31)));
    }
}
