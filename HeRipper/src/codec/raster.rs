//! Decode target raster and its clipped drawing primitives
//!
//! Every codec writes through [`Raster::draw_row`], [`Raster::draw_col`]
//! and their wrapping variants. Drawing is relative to a [`Region`] (the
//! full image, or one 8-pixel strip of it) and is clipped both to the
//! region and to the raster.

use super::palette::{Palette, unpack_rgb};

/// How pixel values are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Palette indices.
    Indexed,
    /// Packed `r | g << 8 | b << 16` colours.
    Rgb,
}

/// A rectangle of the raster that a decoder fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: isize,
    pub y: isize,
    pub width: usize,
    pub height: usize,
}

impl Region {
    pub fn new(x: isize, y: isize, width: usize, height: usize) -> Self {
        Self { x, y, width, height }
    }

    /// Region covering a whole `width` x `height` image.
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }
}

/// Position inside a region, advanced by the wrapping draws.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawPos {
    pub x: usize,
    pub y: usize,
}

/// Row-major pixel buffer with an optional palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
    format: PixelFormat,
    palette: Option<Palette>,
}

impl Raster {
    /// Indexed raster filled with `fill`.
    pub fn new(width: usize, height: usize, fill: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; width * height],
            format: PixelFormat::Indexed,
            palette: None,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn set_format(&mut self, format: PixelFormat) {
        self.format = format;
    }

    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    pub fn set_palette(&mut self, palette: Option<Palette>) {
        self.palette = palette;
    }

    #[must_use]
    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = Some(palette);
        self
    }

    pub fn clear(&mut self, color: u32) {
        self.pixels.fill(color);
    }

    /// Fill one region, clipped to the raster.
    pub fn fill_region(&mut self, color: u32, region: Region) {
        for y in 0..region.height {
            self.draw_row(color, region.width, 0, y, region);
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    /// Write one pixel; out-of-bounds writes are dropped.
    pub fn put(&mut self, x: usize, y: usize, color: u32) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = color;
        }
    }

    /// Absolute raster coordinates of a region-relative position.
    fn absolute(&self, region: Region, x: usize, y: usize) -> Option<(usize, usize)> {
        if region.x < 0 || region.y < 0 {
            return None;
        }
        let ax = region.x as usize + x;
        let ay = region.y as usize + y;
        (ax < self.width && ay < self.height).then_some((ax, ay))
    }

    /// Draw `count` pixels rightwards from `(x, y)` in `region`.
    ///
    /// Returns how many pixels could not be drawn because they fall outside
    /// the region or the raster.
    pub fn draw_row(&mut self, color: u32, count: usize, x: usize, y: usize, region: Region) -> usize {
        if count == 0 {
            return 0;
        }
        if x >= region.width || y >= region.height {
            return count;
        }
        let Some((ax, ay)) = self.absolute(region, x, y) else {
            return count;
        };
        let drawn = count.min(region.width - x).min(self.width - ax);
        let start = ay * self.width + ax;
        self.pixels[start..start + drawn].fill(color);
        count - drawn
    }

    /// Draw `count` pixels downwards from `(x, y)` in `region`.
    ///
    /// Returns how many pixels could not be drawn.
    pub fn draw_col(&mut self, color: u32, count: usize, x: usize, y: usize, region: Region) -> usize {
        if count == 0 {
            return 0;
        }
        if x >= region.width || y >= region.height {
            return count;
        }
        let Some((ax, ay)) = self.absolute(region, x, y) else {
            return count;
        };
        let drawn = count.min(region.height - y).min(self.height - ay);
        for row in ay..ay + drawn {
            self.pixels[row * self.width + ax] = color;
        }
        count - drawn
    }

    /// Row-major draw that wraps to the next line at the region's right
    /// edge. Returns the position after the last pixel; a position outside
    /// the region is returned unchanged.
    pub fn draw_row_wrap(&mut self, color: u32, count: usize, pos: DrawPos, region: Region) -> DrawPos {
        if pos.x >= region.width || pos.y >= region.height {
            return pos;
        }
        let capacity = (region.width - pos.x) + region.width * (region.height - pos.y - 1);
        let mut left = count.min(capacity);
        let DrawPos { mut x, mut y } = pos;
        while left > 0 {
            let run = left.min(region.width - x);
            self.draw_row(color, run, x, y, region);
            left -= run;
            x += run;
            if x >= region.width {
                x = 0;
                y += 1;
            }
        }
        DrawPos { x, y }
    }

    /// Column-major draw that wraps to the next column at the region's
    /// bottom edge.
    pub fn draw_col_wrap(&mut self, color: u32, count: usize, pos: DrawPos, region: Region) -> DrawPos {
        if pos.x >= region.width || pos.y >= region.height {
            return pos;
        }
        let capacity = (region.height - pos.y) + region.height * (region.width - pos.x - 1);
        let mut left = count.min(capacity);
        let DrawPos { mut x, mut y } = pos;
        while left > 0 {
            let run = left.min(region.height - y);
            self.draw_col(color, run, x, y, region);
            left -= run;
            y += run;
            if y >= region.height {
                y = 0;
                x += 1;
            }
        }
        DrawPos { x, y }
    }

    /// Copy `src` with its top-left corner at `(x, y)`, skipping pixels equal
    /// to `transparent`.
    pub fn blit(&mut self, src: &Raster, x: i64, y: i64, transparent: Option<u32>) {
        for sy in 0..src.height {
            let dy = y + sy as i64;
            if dy < 0 || dy >= self.height as i64 {
                continue;
            }
            for sx in 0..src.width {
                let dx = x + sx as i64;
                if dx < 0 || dx >= self.width as i64 {
                    continue;
                }
                let color = src.pixels[sy * src.width + sx];
                if transparent == Some(color) {
                    continue;
                }
                self.pixels[dy as usize * self.width + dx as usize] = color;
            }
        }
    }

    /// Expand to RGB8 triples. Indexed rasters without a palette render
    /// their indices as grey levels.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 3);
        for &pixel in &self.pixels {
            let rgb = match (self.format, &self.palette) {
                (PixelFormat::Rgb, _) => unpack_rgb(pixel),
                (PixelFormat::Indexed, Some(palette)) => palette.rgb(pixel as usize),
                (PixelFormat::Indexed, None) => {
                    let level = (pixel & 0xFF) as u8;
                    [level; 3]
                }
            };
            out.extend_from_slice(&rgb);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_row_reports_clipped_pixels() {
        let mut raster = Raster::new(8, 2, 0);
        let strip = Region::new(4, 0, 4, 2);
        assert_eq!(raster.draw_row(7, 6, 1, 0, strip), 3);
        assert_eq!(&raster.pixels()[..8], &[0, 0, 0, 0, 0, 7, 7, 7]);
        assert_eq!(raster.draw_row(7, 2, 4, 0, strip), 2);
    }

    #[test]
    fn row_wrap_moves_to_next_line() {
        let mut raster = Raster::new(3, 2, 0);
        let region = Region::full(3, 2);
        let pos = raster.draw_row_wrap(1, 4, DrawPos { x: 1, y: 0 }, region);
        assert_eq!(pos, DrawPos { x: 2, y: 1 });
        assert_eq!(raster.pixels(), &[0, 1, 1, 1, 1, 0]);
        let end = raster.draw_row_wrap(2, 10, pos, region);
        assert_eq!(end, DrawPos { x: 0, y: 2 });
        assert_eq!(raster.draw_row_wrap(3, 1, end, region), end);
    }

    #[test]
    fn col_wrap_moves_to_next_column() {
        let mut raster = Raster::new(2, 3, 0);
        let pos = raster.draw_col_wrap(5, 4, DrawPos::default(), Region::full(2, 3));
        assert_eq!(pos, DrawPos { x: 1, y: 1 });
        assert_eq!(raster.pixels(), &[5, 5, 5, 0, 5, 0]);
    }

    #[test]
    fn negative_region_draws_nothing() {
        let mut raster = Raster::new(4, 4, 0);
        assert_eq!(raster.draw_row(1, 2, 0, 0, Region::new(-1, 0, 4, 4)), 2);
        assert!(raster.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn blit_clips_and_keys() {
        let mut canvas = Raster::new(3, 3, 9);
        let mut sprite = Raster::new(2, 2, 1);
        sprite.put(0, 0, 0);
        canvas.blit(&sprite, 2, -1, Some(0));
        assert_eq!(canvas.get(2, 0), Some(1));
        assert_eq!(canvas.get(1, 0), Some(9));
        canvas.blit(&sprite, -1, -1, Some(0));
        assert_eq!(canvas.get(0, 0), Some(1));
    }

    #[test]
    fn rgb_expansion() {
        let mut raster = Raster::new(2, 1, 0).with_palette(Palette::new(vec![0x0000FF, 0x00FF00]));
        raster.put(1, 0, 1);
        assert_eq!(raster.to_rgb8(), vec![0xFF, 0, 0, 0, 0xFF, 0]);
        raster.set_format(PixelFormat::Rgb);
        raster.put(0, 0, 0x123456);
        assert_eq!(&raster.to_rgb8()[..3], &[0x56, 0x34, 0x12]);
    }
}
