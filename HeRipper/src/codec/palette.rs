//! Palettes and the colour resolution pipeline

/// Indexed colour table. Colours are packed `r | g << 8 | b << 16`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette {
    entries: Vec<u32>,
}

impl Palette {
    #[must_use]
    pub fn new(entries: Vec<u32>) -> Self {
        Self { entries }
    }

    /// Build from consecutive RGB triples; a trailing partial triple is ignored.
    pub fn from_rgb_bytes(bytes: &[u8]) -> Self {
        let entries = bytes
            .chunks_exact(3)
            .map(|c| pack_rgb(c[0], c[1], c[2]))
            .collect();
        Self { entries }
    }

    /// A palette holding only index 0.
    pub fn single(color: u32) -> Self {
        Self {
            entries: vec![color],
        }
    }

    /// Grey ramp used to preview glyph sets, which carry no palette.
    /// The transparency index is shown as magenta.
    pub fn glyph_preview(transparent: usize) -> Self {
        let mut entries: Vec<u32> = (0..=255u32).map(|k| k | (k << 8) | (k << 16)).collect();
        entries[0] = 0;
        entries[1] = 0xFFFFFE;
        entries[2] = 0x555554;
        entries[3] = 0xAAAAA9;
        entries[4] = 0x888887;
        if let Some(slot) = entries.get_mut(transparent) {
            *slot = 0xAB00AB;
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Packed colour at `index`; black when the table is shorter.
    pub fn get(&self, index: usize) -> u32 {
        self.entries.get(index).copied().unwrap_or(0)
    }

    pub fn rgb(&self, index: usize) -> [u8; 3] {
        unpack_rgb(self.get(index))
    }

    pub fn entries(&self) -> &[u32] {
        &self.entries
    }
}

pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    u32::from(r) | (u32::from(g) << 8) | (u32::from(b) << 16)
}

pub fn unpack_rgb(color: u32) -> [u8; 3] {
    [
        (color & 0xFF) as u8,
        ((color >> 8) & 0xFF) as u8,
        ((color >> 16) & 0xFF) as u8,
    ]
}

/// Substitution of the in-data transparency code with the raster fill index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transparency {
    /// Code that marks a transparent pixel in the encoded data.
    pub key: u32,
    /// Value written in its place.
    pub fill: u32,
}

/// Per-image colour layers, applied as
/// raw code → deindex → remap → transparency.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorPipeline<'a> {
    pub deindex: Option<&'a [u8]>,
    pub remap: Option<&'a [u8]>,
    pub transparency: Option<Transparency>,
}

impl<'a> ColorPipeline<'a> {
    /// Pipeline that only applies transparency.
    pub fn transparent(key: u32, fill: u32) -> Self {
        Self {
            transparency: Some(Transparency { key, fill }),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_deindex(mut self, table: Option<&'a [u8]>) -> Self {
        self.deindex = table;
        self
    }

    #[must_use]
    pub fn with_remap(mut self, table: Option<&'a [u8]>) -> Self {
        self.remap = table;
        self
    }

    /// The same layers without transparency substitution.
    #[must_use]
    pub fn opaque(mut self) -> Self {
        self.transparency = None;
        self
    }

    pub fn resolve(&self, code: u32) -> u32 {
        let mut color = code;
        if let Some(table) = self.deindex {
            color = lookup(table, color);
        }
        if let Some(table) = self.remap {
            color = lookup(table, color);
        }
        match self.transparency {
            Some(t) if color == t.key => t.fill,
            _ => color,
        }
    }
}

/// Codes past the end of a table pass through unchanged.
fn lookup(table: &[u8], code: u32) -> u32 {
    table
        .get(code as usize)
        .map_or(code, |&mapped| u32::from(mapped))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_packing() {
        let palette = Palette::from_rgb_bytes(&[1, 2, 3, 0xFF, 0, 0x80, 9]);
        assert_eq!(palette.len(), 2);
        assert_eq!(palette.get(0), 0x030201);
        assert_eq!(palette.rgb(1), [0xFF, 0, 0x80]);
        assert_eq!(palette.get(7), 0);
    }

    #[test]
    fn pipeline_order_is_deindex_remap_transparency() {
        let deindex = [10u8, 11, 12];
        let mut remap = [0u8; 16];
        remap[11] = 5;
        let pipeline = ColorPipeline::transparent(5, 200)
            .with_deindex(Some(&deindex))
            .with_remap(Some(&remap));
        // 1 -> 11 -> 5 -> transparent fill
        assert_eq!(pipeline.resolve(1), 200);
        // 0 -> 10 -> 0
        assert_eq!(pipeline.resolve(0), 0);
        // out of table passes through deindex, then remaps
        assert_eq!(pipeline.resolve(40), 40);
        assert_eq!(pipeline.opaque().resolve(1), 5);
    }

    #[test]
    fn glyph_preview_marks_transparency() {
        let palette = Palette::glyph_preview(7);
        assert_eq!(palette.get(7), 0xAB00AB);
        assert_eq!(palette.get(1), 0xFFFFFE);
        assert_eq!(palette.get(200), 0xC8C8C8);
    }
}
