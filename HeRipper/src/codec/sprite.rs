//! Sprite codecs: costume components, auxiliary frames, wiz images and glyphs

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{Error, Result};
use crate::formats::sputm::costume::{AuxFrame, ColorTable, Component};
use crate::formats::sputm::glyph::Glyph;
use crate::resolver::{Resolvers, TwoColorMode};

use super::bitmap::{BitstreamParams, decode_bitstream};
use super::bitstream::MsbBits;
use super::palette::{ColorPipeline, pack_rgb};
use super::raster::{DrawPos, PixelFormat, Raster, Region};
use super::rle::{decode_aux, decode_lined, decode_multicomp, is_lined_rle};

/// Size of the stage auxiliary frames are drawn on.
pub const AUX_STAGE_WIDTH: usize = 640;
pub const AUX_STAGE_HEIGHT: usize = 480;

/// Bitstream layout of two-colour costume components stored as bitmaps.
const TWO_COLOR_BITSTREAM: BitstreamParams = BitstreamParams {
    absolute_bits: 8,
    relative_bits: 3,
    horizontal: true,
    transparent: true,
    expanded_range: false,
};

/// Colour layers for one costume component.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentColors<'a> {
    /// `AKPL` deindex table, when it applies.
    pub deindex: Option<&'a [u8]>,
    /// Room `REMP` table.
    pub remap: Option<&'a [u8]>,
}

/// Decode one costume component onto a raster cleared to `fill`.
///
/// Two-colour components are either lined RLE or a bitstream, which the
/// data does not say; the resolver decides. Everything else uses the
/// multi-component run-length format.
pub fn decode_component(
    component: &Component,
    table: &ColorTable,
    colors: ComponentColors<'_>,
    fill: u32,
    resolvers: &mut Resolvers,
    diag: &mut Diagnostics,
) -> Result<Raster> {
    let (width, height) = (usize::from(component.width), usize::from(component.height));
    let mut raster = Raster::new(width, height, fill);
    let data = component.data.as_slice();
    let region = Region::full(width, height);

    if !table.is_two_color() {
        let pipeline = ColorPipeline::default()
            .with_deindex(colors.deindex)
            .with_remap(colors.remap);
        decode_multicomp(&mut raster, data, table.count, &pipeline)?;
        return Ok(raster);
    }

    let key = u32::from(table.alt_transparency.unwrap_or(0));
    let lined = ColorPipeline::transparent(key, fill);
    match resolvers.two_color.decide(|| is_lined_rle(data), diag) {
        TwoColorMode::Rle => {
            decode_lined(&mut raster, data, region, &lined);
        }
        TwoColorMode::Bitmap => {
            let Some((&encoding, rest)) = data.split_first() else {
                return Ok(raster);
            };
            let forced = resolvers.two_color.is_forced();
            if !forced && (encoding != 8 || is_lined_rle(data)) {
                diag.warn(
                    DiagnosticKind::UnsupportedEncoding,
                    None,
                    format!(
                        "two-colour component guessed as bitmap has encoding {encoding}, decoding as lined RLE; \
                         try --force-two-color-bitmap if this looks wrong"
                    ),
                );
                decode_lined(&mut raster, data, region, &lined);
            } else {
                let pipeline = lined.with_remap(colors.remap);
                decode_bitstream(&mut raster, rest, region, TWO_COLOR_BITSTREAM, &pipeline);
            }
        }
    }
    Ok(raster)
}

/// Draw one auxiliary frame onto the shared stage.
///
/// Frames build on each other: skipped pixels keep what earlier frames
/// drew, so the same canvas must be passed for every frame of a costume.
pub fn decode_aux_frame(stage: &mut Raster, frame: &AuxFrame, fill: u32) {
    let region = Region::new(
        frame.x as isize + (AUX_STAGE_WIDTH / 2) as isize,
        frame.y as isize + (AUX_STAGE_HEIGHT / 2) as isize,
        usize::from(frame.width),
        usize::from(frame.height),
    );
    decode_aux(stage, &frame.data, region, fill);
}

/// Unpack a big-endian 5/5/5 truecolor pixel.
pub fn truecolor_pixel(value: u16) -> u32 {
    let r = ((value & 0x7C00) >> 7) as u8;
    let g = ((value & 0x03E0) >> 2) as u8;
    let b = ((value & 0x001F) << 3) as u8;
    pack_rgb(r, g, b)
}

/// How a wiz payload is laid out, judged from its length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizLayout {
    Literal,
    Truecolor,
    LinedRle,
}

impl WizLayout {
    pub fn detect(width: usize, height: usize, data_len: usize) -> Self {
        let pixels = width * height;
        if pixels == data_len {
            WizLayout::Literal
        } else if pixels * 2 == data_len && width != 1 && height != 1 {
            WizLayout::Truecolor
        } else {
            WizLayout::LinedRle
        }
    }
}

/// Decode a wiz image payload.
///
/// `key` is the room transparency code in the data, replaced by `fill`.
/// `deindex` applies to run-length data only.
pub fn decode_wiz(width: usize, height: usize, data: &[u8], key: u32, fill: u32, deindex: Option<&[u8]>) -> Raster {
    let mut raster = Raster::new(width, height, fill);
    let region = Region::full(width, height);
    match WizLayout::detect(width, height, data.len()) {
        WizLayout::Literal => {
            let mut pos = DrawPos::default();
            for &byte in data {
                pos = raster.draw_row_wrap(u32::from(byte), 1, pos, region);
            }
        }
        WizLayout::Truecolor => {
            raster.set_format(PixelFormat::Rgb);
            let mut pos = DrawPos::default();
            for pair in data.chunks_exact(2) {
                let color = truecolor_pixel(u16::from_be_bytes([pair[0], pair[1]]));
                pos = raster.draw_row_wrap(color, 1, pos, region);
            }
        }
        WizLayout::LinedRle => {
            let pipeline = ColorPipeline::transparent(key, fill).with_deindex(deindex);
            decode_lined(&mut raster, data, region, &pipeline);
        }
    }
    raster
}

/// Decode one glyph. Packed compressions (1, 2 and 4 bits per pixel) treat
/// 0 as transparent; 0 and 8 are lined RLE.
pub fn decode_glyph(glyph: &Glyph, compression: u8, key: u32, fill: u32) -> Result<Raster> {
    let (width, height) = (usize::from(glyph.width), usize::from(glyph.height));
    let mut raster = Raster::new(width, height, fill);
    match compression {
        1 | 2 | 4 => {
            let mut bits = MsbBits::new(&glyph.data);
            for y in 0..height {
                for x in 0..width {
                    let color = bits.bits_or_zero(u32::from(compression));
                    if color != 0 {
                        raster.put(x, y, color);
                    }
                }
            }
        }
        0 | 8 => {
            let pipeline = ColorPipeline::transparent(key, fill);
            decode_lined(&mut raster, &glyph.data, Region::full(width, height), &pipeline);
        }
        other => return Err(Error::UnsupportedEncoding(other)),
    }
    Ok(raster)
}
