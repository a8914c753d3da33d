//! Run-length codecs
//!
//! Two framings exist. Lined data prefixes every row with a little-endian
//! byte count and uses 2-bit control codes (skip, encoded run, absolute
//! run). Unlined data is one stream of 1-bit control codes that wraps
//! across rows.

use crate::error::{Error, Result};

use super::palette::ColorPipeline;
use super::raster::{DrawPos, Raster, Region};

/// Byte at `i`, or 0 past the end.
pub(crate) fn byte_at(data: &[u8], i: usize) -> u32 {
    data.get(i).copied().map_or(0, u32::from)
}

/// Little-endian `u16` at `i`; missing bytes read as 0.
pub(crate) fn le16_at(data: &[u8], i: usize) -> usize {
    (byte_at(data, i) | (byte_at(data, i + 1) << 8)) as usize
}

/// Whether summing row byte counts consumes `data` exactly, allowing one
/// trailing terminator byte.
pub fn is_lined_rle(data: &[u8]) -> bool {
    if data.len() < 2 {
        return false;
    }
    let mut pos = 0;
    while pos < data.len() - 1 {
        pos += le16_at(data, pos) + 2;
    }
    pos <= data.len()
}

/// Walk lined framing. `op` receives each control code with the read
/// position, the row-relative x and the row index.
fn for_each_lined_code(
    data: &[u8],
    rows: usize,
    mut op: impl FnMut(u8, &mut usize, &mut usize, usize),
) {
    let len = data.len();
    let mut pos = 0;
    let mut next = 0;
    let mut y = 0;
    while pos < len && y < rows {
        let count = le16_at(data, next);
        pos = next + 2;
        next += count + 2;
        let mut x = 0;
        while pos < len && pos < next {
            let code = data[pos];
            pos += 1;
            op(code, &mut pos, &mut x, y);
        }
        y += 1;
    }
}

/// Lined RLE into `region`, resolving every code through `pipeline`.
///
/// Returns how many pixels fell outside the region.
pub fn decode_lined(raster: &mut Raster, data: &[u8], region: Region, pipeline: &ColorPipeline<'_>) -> usize {
    let mut clipped = 0;
    for_each_lined_code(data, region.height, |code, pos, x, y| {
        let count = usize::from(code >> 2) + 1;
        if code & 1 != 0 {
            *x += usize::from(code >> 1);
        } else if code & 2 != 0 {
            let color = pipeline.resolve(byte_at(data, *pos));
            *pos += 1;
            clipped += raster.draw_row(color, count, *x, y, region);
            *x += count;
        } else {
            for _ in 0..count {
                let color = pipeline.resolve(byte_at(data, *pos));
                clipped += raster.draw_row(color, 1, *x, y, region);
                *pos += 1;
                *x += 1;
            }
        }
    });
    clipped
}

/// Lined RLE used by costume auxiliary frames. Skips keep what an earlier
/// frame drew, and the third code paints `fill` instead of literal bytes.
pub fn decode_aux(raster: &mut Raster, data: &[u8], region: Region, fill: u32) {
    for_each_lined_code(data, region.height, |code, pos, x, y| {
        let count = usize::from(code >> 2) + 1;
        if code & 1 != 0 {
            *x += usize::from(code >> 1);
        } else if code & 2 != 0 {
            let color = byte_at(data, *pos);
            *pos += 1;
            raster.draw_row(color, count, *x, y, region);
            *x += count;
        } else {
            raster.draw_row(fill, count, *x, y, region);
            *x += count;
        }
    });
}

/// Unlined RLE into `region`, wrapping across rows.
///
/// Returns how many pixels of the last run fell past the region's end.
pub fn decode_unlined(raster: &mut Raster, data: &[u8], region: Region, pipeline: &ColorPipeline<'_>) -> usize {
    let area = region.width * region.height;
    let mut pos = DrawPos::default();
    let mut clipped = 0;
    let mut i = 0;
    while pos.y < region.height && i < data.len() {
        let code = data[i];
        i += 1;
        let run = usize::from(code >> 1) + 1;
        let left = area - (pos.y * region.width + pos.x);
        clipped += run.saturating_sub(left);
        if code & 1 != 0 {
            let color = pipeline.resolve(byte_at(data, i));
            i += 1;
            pos = raster.draw_row_wrap(color, run, pos, region);
        } else {
            for _ in 0..run {
                let color = pipeline.resolve(byte_at(data, i));
                i += 1;
                pos = raster.draw_row_wrap(color, 1, pos, region);
            }
        }
    }
    clipped
}

/// Run-length format of costume components with `colors` colours.
///
/// Up to 64 colours pack colour and run length into one byte and fill
/// column by column; colour 0 is a transparent skip. 256 colours use
/// lined framing over the whole raster with raw colour bytes.
///
/// # Errors
///
/// Returns [`Error::InvalidColorCount`] for other colour counts.
///
/// [`Error::InvalidColorCount`]: crate::Error::InvalidColorCount
pub fn decode_multicomp(
    raster: &mut Raster,
    data: &[u8],
    colors: usize,
    pipeline: &ColorPipeline<'_>,
) -> Result<()> {
    let (color_mask, run_mask, shift) = match colors {
        16 => (0xF0u8, 0x0Fu8, 4u32),
        32 => (0xF8, 0x07, 3),
        64 => (0xFC, 0x03, 2),
        256 => {
            decode_multicomp_256(raster, data);
            return Ok(());
        }
        other => return Err(Error::InvalidColorCount(other)),
    };

    let (width, height) = (raster.width(), raster.height());
    let region = Region::full(width, height);
    let total = width * height;
    let mut drawn = 0;
    let mut pos = DrawPos::default();
    let mut i = 0;
    while drawn < total && i < data.len() {
        let code = data[i];
        i += 1;
        let color = u32::from((code & color_mask) >> shift);
        let mut run = usize::from(code & run_mask);
        if run == 0 {
            run = byte_at(data, i) as usize;
            i += 1;
        }
        if color != 0 {
            pos = raster.draw_col_wrap(pipeline.resolve(color), run, pos, region);
        } else {
            pos.y += run;
            if pos.y >= height {
                pos.x += pos.y / height;
                pos.y %= height;
            }
        }
        drawn += run;
    }
    Ok(())
}

fn decode_multicomp_256(raster: &mut Raster, data: &[u8]) {
    let region = Region::full(raster.width(), raster.height());
    for_each_lined_code(data, region.height, |code, pos, x, y| {
        let count = usize::from(code >> 2) + 1;
        if code & 1 != 0 {
            *x += usize::from(code >> 1);
        } else if code & 2 != 0 {
            let color = byte_at(data, *pos);
            *pos += 1;
            raster.draw_row(color, count, *x, y, region);
            *x += count;
        } else {
            for _ in 0..count {
                raster.draw_row(byte_at(data, *pos), 1, *x, y, region);
                *pos += 1;
                *x += 1;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lined_solid_fill() {
        // Two rows, each: byte count 2, encoded run of 4 (0b1110), colour 7.
        let data = [2, 0, 0b1110, 7, 2, 0, 0b1110, 7];
        assert!(is_lined_rle(&data));
        let mut raster = Raster::new(4, 2, 0);
        decode_lined(&mut raster, &data, Region::full(4, 2), &ColorPipeline::default());
        assert!(raster.pixels().iter().all(|&p| p == 7));
    }

    #[test]
    fn lined_skip_and_transparency() {
        // skip 1, absolute run of 2 (codes 5, 3), with 5 transparent.
        let data = [4, 0, 0b11, 0b100, 5, 3];
        let mut raster = Raster::new(4, 1, 9);
        decode_lined(&mut raster, &data, Region::full(4, 1), &ColorPipeline::transparent(5, 0));
        assert_eq!(raster.pixels(), &[9, 0, 3, 9]);
    }

    #[test]
    fn lined_detection_allows_terminator() {
        assert!(is_lined_rle(&[1, 0, 0xAA, 0]));
        assert!(!is_lined_rle(&[9, 0, 1, 2]));
        assert!(!is_lined_rle(&[0]));
    }

    #[test]
    fn unlined_wraps_rows() {
        // encoded run of 3 colour 4, absolute run of 2: 1, 2
        let data = [0b101, 4, 0b10, 1, 2];
        let mut raster = Raster::new(3, 2, 0);
        decode_unlined(&mut raster, &data, Region::full(3, 2), &ColorPipeline::default());
        assert_eq!(raster.pixels(), &[4, 4, 4, 1, 2, 0]);
    }

    #[test]
    fn overflowing_runs_are_counted() {
        // encoded run of 4 colour 7 into a 3-wide row
        let lined = [2, 0, 0b1110, 7];
        let mut raster = Raster::new(3, 1, 0);
        assert_eq!(decode_lined(&mut raster, &lined, Region::full(3, 1), &ColorPipeline::default()), 1);
        assert_eq!(raster.pixels(), &[7, 7, 7]);

        // encoded run of 5 colour 2 into a 2x2 region
        let unlined = [0b1001, 2];
        let mut raster = Raster::new(2, 2, 0);
        assert_eq!(decode_unlined(&mut raster, &unlined, Region::full(2, 2), &ColorPipeline::default()), 1);
        assert_eq!(raster.pixels(), &[2, 2, 2, 2]);

        let mut raster = Raster::new(3, 2, 0);
        let fits = [0b101, 4, 0b10, 1, 2];
        assert_eq!(decode_unlined(&mut raster, &fits, Region::full(3, 2), &ColorPipeline::default()), 0);
    }

    #[test]
    fn multicomp_16_fills_columns_and_skips() {
        // colour 1 run 3, colour 0 run 1 (skip), colour 2 via explicit run byte 2
        let data = [0x13, 0x01, 0x20, 0x02];
        let mut raster = Raster::new(2, 3, 0);
        decode_multicomp(&mut raster, &data, 16, &ColorPipeline::default()).unwrap();
        assert_eq!(raster.pixels(), &[1, 0, 1, 2, 1, 2]);
    }

    #[test]
    fn multicomp_rejects_odd_colour_counts() {
        let mut raster = Raster::new(1, 1, 0);
        assert!(matches!(
            decode_multicomp(&mut raster, &[0], 12, &ColorPipeline::default()),
            Err(Error::InvalidColorCount(12))
        ));
    }

    #[test]
    fn aux_paints_fill_for_third_code() {
        let data = [3, 0, 0b010, 6, 0b100];
        let mut raster = Raster::new(4, 1, 1);
        decode_aux(&mut raster, &data, Region::full(4, 1), 0);
        assert_eq!(raster.pixels(), &[6, 0, 0, 1]);
    }
}
