//! Standalone images (`AWIZ`) and multi-image wrappers (`MULT`)

use crate::codec::palette::Palette;
use crate::diagnostics::Diagnostics;
use crate::error::Result;

use super::chunk::{ChunkHeader, ChunkTag, RawChunk, Step, skip_unknown, walk_children};
use super::cursor::ByteCursor;
use super::palette::read_palette;
use super::wrap::{OffsetBase, read_wrapped};

/// A parsed `AWIZ` chunk.
#[derive(Debug, Clone, Default)]
pub struct Wiz {
    pub unknown: u32,
    pub width: u32,
    pub height: u32,
    pub trns: Option<u16>,
    pub palette: Palette,
    /// `RMAP` deindex table.
    pub rmap: Option<Vec<u8>>,
    /// Encoded pixels. Some archives carry image records without one.
    pub wizd: Option<RawChunk>,
    /// `XMAP`, `CNVS`, `RELO`, `SPOT` and `CUSE`, kept opaque.
    pub blobs: Vec<RawChunk>,
}

pub fn read_awiz(cursor: &mut ByteCursor<'_>, diag: &mut Diagnostics) -> Result<Wiz> {
    let header = ChunkHeader::expect(cursor, ChunkTag::Awiz)?;
    let mut wiz = Wiz::default();
    walk_children(cursor, header.end(), diag, |c, child, d| {
        match child.tag {
            ChunkTag::Wizh => {
                c.seek(child.payload_offset());
                wiz.unknown = c.read_u32_le()?;
                wiz.width = c.read_u32_le()?;
                wiz.height = c.read_u32_le()?;
            }
            ChunkTag::Wizd => wiz.wizd = Some(RawChunk::read(c, child)?),
            ChunkTag::Trns => {
                c.seek(child.payload_offset());
                wiz.trns = Some(c.read_u16_le()?);
            }
            ChunkTag::Rgbs => wiz.palette = read_palette(c, child)?,
            ChunkTag::Rmap => wiz.rmap = Some(read_rmap(c, child)?),
            ChunkTag::Xmap | ChunkTag::Cnvs | ChunkTag::Relo | ChunkTag::Spot | ChunkTag::Cuse => {
                wiz.blobs.push(RawChunk::read(c, child)?);
            }
            _ => return skip_unknown(child, "AWIZ", d),
        }
        Ok(Step::Advance)
    });
    cursor.seek(header.end());
    Ok(wiz)
}

/// `RMAP`: a 4-byte field, then the deindex table.
fn read_rmap(cursor: &mut ByteCursor<'_>, header: &ChunkHeader) -> Result<Vec<u8>> {
    cursor.seek(header.payload_offset());
    let _unknown = cursor.read_u32_le()?;
    cursor.read_bytes(header.payload_len().saturating_sub(4))
}

/// Palette and colour map shared by every image of a `MULT`.
#[derive(Debug, Clone, Default)]
pub struct WizDefaults {
    pub palette: Palette,
    pub rmap: Option<Vec<u8>>,
    /// `CUSE` and `CNVS`, kept opaque.
    pub blobs: Vec<RawChunk>,
}

impl WizDefaults {
    fn visit(&mut self, cursor: &mut ByteCursor<'_>, child: &ChunkHeader, family: &str, diag: &mut Diagnostics) -> Result<Step> {
        match child.tag {
            ChunkTag::Rgbs => self.palette = read_palette(cursor, child)?,
            ChunkTag::Rmap => self.rmap = Some(read_rmap(cursor, child)?),
            ChunkTag::Cuse | ChunkTag::Cnvs => self.blobs.push(RawChunk::read(cursor, child)?),
            _ => return skip_unknown(child, family, diag),
        }
        Ok(Step::Advance)
    }
}

/// A parsed `MULT` chunk.
#[derive(Debug, Clone, Default)]
pub struct Multi {
    pub defaults: WizDefaults,
    pub images: Vec<Wiz>,
}

pub fn read_mult(cursor: &mut ByteCursor<'_>, diag: &mut Diagnostics) -> Result<Multi> {
    let header = ChunkHeader::expect(cursor, ChunkTag::Mult)?;
    let mut multi = Multi::default();
    walk_children(cursor, header.end(), diag, |c, child, d| match child.tag {
        ChunkTag::Defa => {
            let defaults = &mut multi.defaults;
            c.seek(child.payload_offset());
            walk_children(c, child.end(), d, |c, grandchild, d| defaults.visit(c, grandchild, "DEFA", d));
            Ok(Step::Advance)
        }
        ChunkTag::Wrap => {
            multi.images = read_wrapped(c, d, OffsetBase::TableStart, read_awiz)?;
            Ok(Step::Advance)
        }
        _ => multi.defaults.visit(c, child, "MULT", d),
    });
    cursor.seek(header.end());
    Ok(multi)
}
