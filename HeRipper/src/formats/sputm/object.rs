//! Room background and object records (`RMIM`, `OBIM`, `OBCD`)

use serde::Serialize;

use crate::diagnostics::Diagnostics;
use crate::error::Result;

use super::chunk::{ChunkHeader, ChunkTag, RawChunk, Step, skip_unknown, walk_children};
use super::cursor::ByteCursor;

/// One `IMxx` slot: an image chunk plus its masks.
#[derive(Debug, Clone)]
pub struct ImageSlot {
    pub header: ChunkHeader,
    /// Slot number from the tag digits (`IM03` is 3).
    pub number: u16,
    /// The `SMAP`, `BMAP` or `BOMP` chunk.
    pub image: RawChunk,
    pub z_planes: Vec<RawChunk>,
    pub masks: Vec<RawChunk>,
}

fn slot_number(fourcc: &[u8; 4]) -> u16 {
    std::str::from_utf8(&fourcc[2..])
        .ok()
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(0)
}

/// Read an `IMxx` slot at the cursor.
pub fn read_image_slot(cursor: &mut ByteCursor<'_>, diag: &mut Diagnostics) -> Result<ImageSlot> {
    let header = ChunkHeader::expect(cursor, ChunkTag::ImageSlot)?;
    let image = RawChunk::read_next(cursor)?;
    let mut z_planes = Vec::new();
    let mut masks = Vec::new();

    walk_children(cursor, header.end(), diag, |c, child, d| match child.tag {
        ChunkTag::ZPlane => {
            z_planes.push(RawChunk::read(c, child)?);
            Ok(Step::Advance)
        }
        ChunkTag::Tmsk => {
            masks.push(RawChunk::read(c, child)?);
            Ok(Step::Advance)
        }
        _ => skip_unknown(child, "IMxx", d),
    });
    cursor.seek(header.end());

    Ok(ImageSlot {
        number: slot_number(&header.fourcc),
        header,
        image,
        z_planes,
        masks,
    })
}

/// Room background (`RMIM`).
#[derive(Debug, Clone, Default)]
pub struct RoomImage {
    /// `RMIH` value (number of z-planes).
    pub rmih: u16,
    pub slots: Vec<ImageSlot>,
}

pub fn read_room_image(cursor: &mut ByteCursor<'_>, diag: &mut Diagnostics) -> Result<RoomImage> {
    let header = ChunkHeader::expect(cursor, ChunkTag::Rmim)?;
    let mut image = RoomImage::default();
    walk_children(cursor, header.end(), diag, |c, child, d| match child.tag {
        ChunkTag::Rmih => {
            c.seek(child.payload_offset());
            image.rmih = c.read_u16_le()?;
            Ok(Step::Advance)
        }
        ChunkTag::ImageSlot => {
            image.slots.push(read_image_slot(c, d)?);
            Ok(Step::Advance)
        }
        _ => skip_unknown(child, "RMIM", d),
    });
    cursor.seek(header.end());
    Ok(image)
}

/// Object image (`OBIM`), keyed by the `IMHD` id.
#[derive(Debug, Clone, Default)]
pub struct ObjectImage {
    pub id: u16,
    pub slots: Vec<ImageSlot>,
}

pub fn read_object_image(cursor: &mut ByteCursor<'_>, diag: &mut Diagnostics) -> Result<ObjectImage> {
    let header = ChunkHeader::expect(cursor, ChunkTag::Obim)?;
    let mut object = ObjectImage::default();
    walk_children(cursor, header.end(), diag, |c, child, d| match child.tag {
        ChunkTag::Imhd => {
            c.seek(child.payload_offset());
            object.id = c.read_u16_le()?;
            Ok(Step::Advance)
        }
        ChunkTag::ImageSlot => {
            object.slots.push(read_image_slot(c, d)?);
            Ok(Step::Advance)
        }
        _ => skip_unknown(child, "OBIM", d),
    });
    cursor.seek(header.end());
    Ok(object)
}

/// Object code record (`OBCD`): geometry, verb table and name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ObjectCode {
    pub id: u16,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    #[serde(skip)]
    pub verbs: Option<RawChunk>,
    pub name: String,
}

pub fn read_object_code(cursor: &mut ByteCursor<'_>, diag: &mut Diagnostics) -> Result<ObjectCode> {
    let header = ChunkHeader::expect(cursor, ChunkTag::Obcd)?;
    let mut code = ObjectCode::default();
    walk_children(cursor, header.end(), diag, |c, child, d| {
        c.seek(child.payload_offset());
        match child.tag {
            ChunkTag::Cdhd => {
                code.id = c.read_u16_le()?;
                code.x = c.read_u16_le()?;
                code.y = c.read_u16_le()?;
                code.width = c.read_u16_le()?;
                code.height = c.read_u16_le()?;
            }
            ChunkTag::Verb => code.verbs = Some(RawChunk::read(c, child)?),
            ChunkTag::Obna => code.name = c.read_cstring(child.payload_len())?,
            _ => return skip_unknown(child, "OBCD", d),
        }
        Ok(Step::Advance)
    });
    cursor.seek(header.end());
    Ok(code)
}
