//! Per-room inventory of a room archive, without decoding anything

use serde::Serialize;

use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::formats::sputm::{ByteCursor, Detection, Room, detect, read_room, scan_lecf};

/// What one room holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    pub number: usize,
    pub offset: usize,
    pub width: u16,
    pub height: u16,
    pub palettes: usize,
    /// Background image slots.
    pub backgrounds: usize,
    pub objects: usize,
    pub costumes: usize,
    /// Standalone wiz images plus images inside `MULT`.
    pub wiz_images: usize,
    pub glyph_sets: usize,
    pub sounds: usize,
    pub external_music: Vec<String>,
    pub subtitles: usize,
    pub scripts: usize,
}

impl RoomSummary {
    fn new(number: usize, offset: usize, room: &Room) -> Self {
        let scripts = &room.scripts;
        Self {
            number,
            offset,
            width: room.header.width,
            height: room.header.height,
            palettes: room.palettes.len(),
            backgrounds: room.background.as_ref().map_or(0, |b| b.slots.len()),
            objects: room.object_images.len(),
            costumes: room.costumes.len(),
            wiz_images: room.wizzes.len() + room.multis.iter().map(|m| m.images.len()).sum::<usize>(),
            glyph_sets: room.glyph_sets.len(),
            sounds: room.digi.len() + room.talk.len() + room.wave.iter().map(|w| w.riffs.len()).sum::<usize>(),
            external_music: room.music.iter().map(|m| m.clean_file_name()).collect(),
            subtitles: room.subtitles.iter().map(Vec::len).sum(),
            scripts: scripts.scrp.len() + scripts.lscr.len() + scripts.lsc2.len(),
        }
    }
}

/// Inventory of a room archive.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveInventory {
    pub detection: Detection,
    pub rooms: Vec<RoomSummary>,
    pub warnings: usize,
    pub errors: usize,
}

/// Parse every room of a room archive and summarise it.
///
/// # Errors
///
/// Returns [`Error::UnrecognizedArchive`] for unknown input and
/// [`Error::NotARoomArchive`] for any other subtype.
pub fn inventory(data: &[u8], key: Option<u8>) -> Result<ArchiveInventory> {
    let detection = detect(data, key)?;
    if !detection.subtype.is_room_archive() {
        return Err(Error::NotARoomArchive {
            found: detection.subtype.description().to_string(),
        });
    }

    let mut cursor = ByteCursor::new(data, detection.key);
    let mut diag = Diagnostics::new();
    let archive = scan_lecf(&mut cursor, &mut diag)?;
    let mut rooms = Vec::with_capacity(archive.rooms.len());
    for (number, &offset) in archive.rooms.iter().enumerate() {
        cursor.seek(offset);
        match read_room(&mut cursor, &mut diag) {
            Ok(room) => rooms.push(RoomSummary::new(number, offset, &room)),
            Err(err) => diag.record(&err, Some(offset)),
        }
    }

    Ok(ArchiveInventory {
        detection,
        rooms,
        warnings: diag.warnings(),
        errors: diag.errors(),
    })
}
