//! Glyph sets (`CHAR`)
//!
//! After the chunk header come a data-end field, one unknown byte and a
//! 16-entry colour map. The glyph table then starts at a fixed offset:
//! compression, row spacing, glyph count, and one `u32` offset per glyph
//! counted from the table start. Zero offsets are unused code points.

use crate::error::Result;

use super::chunk::{ChunkHeader, ChunkTag};
use super::cursor::ByteCursor;

/// Offset of the glyph table from the start of the chunk.
pub const GLYPH_TABLE_OFFSET: usize = 0x1D;

/// Bytes of the per-glyph header that precede its pixels.
const GLYPH_HEADER: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Glyph {
    pub width: u8,
    pub height: u8,
    pub x_offset: u8,
    pub y_offset: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphSet {
    pub colormap: Vec<u8>,
    /// 1, 2 or 4 bits per pixel, or 0/8 for lined RLE.
    pub compression: u8,
    pub row_space: u8,
    pub glyphs: Vec<Glyph>,
}

pub fn read_char(cursor: &mut ByteCursor<'_>) -> Result<GlyphSet> {
    let header = ChunkHeader::expect(cursor, ChunkTag::Char)?;
    let _data_end = cursor.read_u32_le()?;
    let _unknown = cursor.read_u8()?;
    let colormap = cursor.read_bytes(16)?;

    let table = header.offset + GLYPH_TABLE_OFFSET;
    cursor.seek(table);
    let compression = cursor.read_u8()?;
    let row_space = cursor.read_u8()?;
    let count = cursor.read_u16_le()?;

    let mut offsets = Vec::new();
    for i in 0..usize::from(count) {
        cursor.seek(table + (i + 1) * 4);
        let offset = cursor.read_u32_le()? as usize;
        if offset != 0 {
            offsets.push(offset);
        }
    }

    let table_len = header.end().saturating_sub(table);
    let mut glyphs = Vec::with_capacity(offsets.len());
    for (i, &offset) in offsets.iter().enumerate() {
        cursor.seek(table + offset);
        let next = offsets.get(i + 1).copied().unwrap_or(table_len);
        let width = cursor.read_u8()?;
        let height = cursor.read_u8()?;
        let x_offset = cursor.read_u8()?;
        let y_offset = cursor.read_u8()?;
        let len = next.saturating_sub(offset + GLYPH_HEADER);
        glyphs.push(Glyph {
            width,
            height,
            x_offset,
            y_offset,
            data: cursor.read_bytes_clamped(len),
        });
    }
    cursor.seek(header.end());

    Ok(GlyphSet {
        colormap,
        compression,
        row_space,
        glyphs,
    })
}

#[cfg(test)]
mod tests {
    use super::super::chunk::test_support::{chunk, le16, le32};
    use super::*;

    #[test]
    fn glyph_table_skips_unused_code_points() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&le32(0));
        payload.push(0);
        payload.extend_from_slice(&[0; 16]);
        // glyph table: compression 1, row space 2, three code points
        payload.extend_from_slice(&[1, 2]);
        payload.extend_from_slice(&le16(3));
        // offsets of code points 0..3, table header included
        payload.extend_from_slice(&le32(16));
        payload.extend_from_slice(&le32(0));
        payload.extend_from_slice(&le32(22));
        // glyph A: 4x2 with 2 data bytes
        payload.extend_from_slice(&[4, 2, 0, 1, 0xF0, 0x0F]);
        // glyph B: 1x1 with 1 data byte
        payload.extend_from_slice(&[1, 1, 0, 0, 0x80]);
        let data = chunk(b"CHAR", &payload);

        let mut cursor = ByteCursor::new(&data, 0);
        let set = read_char(&mut cursor).unwrap();
        assert_eq!((set.compression, set.row_space), (1, 2));
        assert_eq!(set.glyphs.len(), 2);
        assert_eq!(set.glyphs[0].data, vec![0xF0, 0x0F]);
        assert_eq!(set.glyphs[0].y_offset, 1);
        assert_eq!(set.glyphs[1].data, vec![0x80]);
        assert_eq!(cursor.tell(), data.len());
    }
}
