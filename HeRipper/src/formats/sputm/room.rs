//! Room records (`LFLF`) and the game-data archive (`LECF`)
//!
//! A room is walked flat: `ROOM` and `RMDA` are transparent wrappers whose
//! children are handled as if they were direct children of the `LFLF`.

use std::collections::BTreeMap;

use crate::codec::palette::Palette;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::Result;

use super::chunk::{ChunkHeader, ChunkTag, RawChunk, Step, walk_children};
use super::costume::{Costume, read_akos};
use super::cursor::ByteCursor;
use super::glyph::{GlyphSet, read_char};
use super::object::{ObjectCode, ObjectImage, RoomImage, read_object_code, read_object_image, read_room_image};
use super::palette::read_palette;
use super::sound::{MusicRef, Sound, WaveSound, read_digi_talk, read_fmus, read_misheadered, read_wsou};
use super::wiz::{Multi, Wiz, read_awiz, read_mult};
use super::wrap::{OffsetBase, read_wrapped};

/// `RMHD` fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoomHeader {
    pub width: u16,
    pub height: u16,
    pub objects: u16,
}

/// Script and walk-box data, kept opaque.
#[derive(Debug, Clone, Default)]
pub struct RoomScripts {
    pub excd: Option<RawChunk>,
    pub encd: Option<RawChunk>,
    /// Number of local scripts (`NLSC`).
    pub local_count: Option<u16>,
    pub lscr: Vec<RawChunk>,
    pub lsc2: Vec<RawChunk>,
    pub scrp: Vec<RawChunk>,
}

#[derive(Debug, Clone, Default)]
pub struct WalkBoxes {
    pub boxd: Option<RawChunk>,
    pub boxm: Option<RawChunk>,
    pub scal: Option<RawChunk>,
    pub pold: Option<RawChunk>,
}

/// Everything one `LFLF` holds.
#[derive(Debug, Clone, Default)]
pub struct Room {
    pub header: RoomHeader,
    pub cycl: Option<u16>,
    /// Transparency index; 0 when the room has no `TRNS`.
    pub trns: u16,
    pub palettes: Vec<Palette>,
    /// `REMP` colour map.
    pub remap: Option<Vec<u8>>,
    pub background: Option<RoomImage>,
    pub object_images: BTreeMap<u16, ObjectImage>,
    pub object_codes: BTreeMap<u16, ObjectCode>,
    pub costumes: Vec<Costume>,
    pub wizzes: Vec<Wiz>,
    pub multis: Vec<Multi>,
    pub glyph_sets: Vec<GlyphSet>,
    pub digi: Vec<Sound>,
    pub talk: Vec<Sound>,
    pub wave: Vec<WaveSound>,
    pub midi: Vec<RawChunk>,
    pub music: Vec<MusicRef>,
    /// `TEXT` lines of each `TLKE`.
    pub subtitles: Vec<Vec<String>>,
    pub scripts: RoomScripts,
    pub boxes: WalkBoxes,
}

fn read_u16_field(cursor: &mut ByteCursor<'_>, header: &ChunkHeader) -> Result<u16> {
    cursor.seek(header.payload_offset());
    cursor.read_u16_le()
}

/// Read an `LFLF` at the cursor.
pub fn read_room(cursor: &mut ByteCursor<'_>, diag: &mut Diagnostics) -> Result<Room> {
    let header = ChunkHeader::expect(cursor, ChunkTag::Lflf)?;
    let _span = tracing::debug_span!("room", offset = header.offset).entered();
    let mut room = Room::default();

    walk_children(cursor, header.end(), diag, |c, child, d| {
        match child.tag {
            ChunkTag::Room | ChunkTag::Rmda => {
                c.seek(child.payload_offset());
                return Ok(Step::Positioned);
            }
            ChunkTag::Rmim => room.background = Some(read_room_image(c, d)?),
            ChunkTag::Rmhd => {
                c.seek(child.payload_offset());
                room.header = RoomHeader {
                    width: c.read_u16_le()?,
                    height: c.read_u16_le()?,
                    objects: c.read_u16_le()?,
                };
            }
            ChunkTag::Cycl => room.cycl = Some(read_u16_field(c, child)?),
            ChunkTag::Trns => room.trns = read_u16_field(c, child)?,
            ChunkTag::Pals => {
                c.seek(child.payload_offset());
                let palettes = read_wrapped(c, d, OffsetBase::TableStart, |c, _| {
                    let apal = ChunkHeader::read(c)?;
                    read_palette(c, &apal)
                })?;
                room.palettes.extend(palettes);
            }
            ChunkTag::Remp => {
                c.seek(child.payload_offset());
                room.remap = Some(c.read_bytes(child.payload_len())?);
            }
            ChunkTag::Obim => {
                let object = read_object_image(c, d)?;
                room.object_images.insert(object.id, object);
            }
            ChunkTag::Obcd => {
                let code = read_object_code(c, d)?;
                room.object_codes.insert(code.id, code);
            }
            ChunkTag::Excd => room.scripts.excd = Some(RawChunk::read(c, child)?),
            ChunkTag::Encd => room.scripts.encd = Some(RawChunk::read(c, child)?),
            ChunkTag::Nlsc => room.scripts.local_count = Some(read_u16_field(c, child)?),
            ChunkTag::Lscr => room.scripts.lscr.push(RawChunk::read(c, child)?),
            ChunkTag::Lsc2 => room.scripts.lsc2.push(RawChunk::read(c, child)?),
            ChunkTag::Scrp => room.scripts.scrp.push(RawChunk::read(c, child)?),
            ChunkTag::Boxd => room.boxes.boxd = Some(RawChunk::read(c, child)?),
            ChunkTag::Boxm => room.boxes.boxm = Some(RawChunk::read(c, child)?),
            ChunkTag::Scal => room.boxes.scal = Some(RawChunk::read(c, child)?),
            ChunkTag::Pold => room.boxes.pold = Some(RawChunk::read(c, child)?),
            ChunkTag::Soun => read_soun(c, child, &mut room, d)?,
            ChunkTag::Digi => room.digi.push(read_digi_talk(c, d)?),
            ChunkTag::Talk => room.talk.push(read_digi_talk(c, d)?),
            ChunkTag::Wsou => room.wave.push(read_wsou(c, d)?),
            ChunkTag::Akos => room.costumes.push(read_akos(c, d)?),
            ChunkTag::Char => room.glyph_sets.push(read_char(c)?),
            ChunkTag::Awiz => room.wizzes.push(read_awiz(c, d)?),
            ChunkTag::Mult => room.multis.push(read_mult(c, d)?),
            ChunkTag::Tlke => room.subtitles.push(read_tlke(c, d)?),
            ChunkTag::Unknown if &child.fourcc[1..] == b"DIG" => {
                // The previous sound ended one byte short.
                d.warn(
                    DiagnosticKind::StructuralMismatch,
                    Some(child.offset),
                    "misaligned DIGI, resyncing by one byte",
                );
                c.seek(child.offset + 1);
                return Ok(Step::Positioned);
            }
            ChunkTag::Unknown => {
                d.error(
                    DiagnosticKind::UnknownTag,
                    Some(child.offset),
                    format!("unrecognised chunk {} in LFLF", child.name()),
                );
            }
            _ => {
                d.error(
                    DiagnosticKind::StructuralMismatch,
                    Some(child.offset),
                    format!("recognised but misplaced chunk {child} in LFLF"),
                );
            }
        }
        Ok(Step::Advance)
    });
    cursor.seek(header.end());
    Ok(room)
}

/// `SOUN` wraps MIDI, an external music reference, a `DIGI`/`TALK`, or
/// bare sample data.
fn read_soun(cursor: &mut ByteCursor<'_>, soun: &ChunkHeader, room: &mut Room, diag: &mut Diagnostics) -> Result<()> {
    cursor.seek(soun.payload_offset());
    match ChunkHeader::peek(cursor).map(|inner| inner.tag) {
        Ok(ChunkTag::Midi) => room.midi.push(RawChunk::read_next(cursor)?),
        Ok(ChunkTag::Fmus) => room.music.push(read_fmus(cursor, diag)?),
        Ok(ChunkTag::Digi) => room.digi.push(read_digi_talk(cursor, diag)?),
        Ok(ChunkTag::Talk) => room.talk.push(read_digi_talk(cursor, diag)?),
        _ => {
            diag.warn(
                DiagnosticKind::MisheaderedSound,
                Some(soun.payload_offset()),
                "SOUN holds no known chunk, taking its payload as misheadered sample data",
            );
            let pcm = read_misheadered(cursor, soun)?;
            room.digi.push(Sound {
                header: *soun,
                hshd: None,
                pcm,
            });
        }
    }
    Ok(())
}

fn read_tlke(cursor: &mut ByteCursor<'_>, diag: &mut Diagnostics) -> Result<Vec<String>> {
    let header = ChunkHeader::expect(cursor, ChunkTag::Tlke)?;
    let mut lines = Vec::new();
    walk_children(cursor, header.end(), diag, |c, child, d| {
        if child.tag == ChunkTag::Text {
            c.seek(child.payload_offset());
            lines.push(c.read_cstring(child.payload_len())?);
        } else {
            d.error(
                DiagnosticKind::UnknownTag,
                Some(child.offset),
                format!("unrecognised TLKE child {}", child.name()),
            );
        }
        Ok(Step::Advance)
    });
    cursor.seek(header.end());
    Ok(lines)
}

/// Outer structure of a game-data archive.
#[derive(Debug, Clone, Default)]
pub struct RoomArchive {
    /// `LOFF` room offset table, kept opaque.
    pub loff: Option<RawChunk>,
    /// Offsets of every `LFLF`, in file order.
    pub rooms: Vec<usize>,
}

/// Read the `LECF` header and locate its rooms without parsing them.
pub fn scan_lecf(cursor: &mut ByteCursor<'_>, diag: &mut Diagnostics) -> Result<RoomArchive> {
    let header = ChunkHeader::expect(cursor, ChunkTag::Lecf)?;
    let mut archive = RoomArchive::default();
    walk_children(cursor, header.end(), diag, |c, child, d| {
        match child.tag {
            ChunkTag::Loff => archive.loff = Some(RawChunk::read(c, child)?),
            ChunkTag::Lflf => archive.rooms.push(child.offset),
            _ => {
                d.error(
                    DiagnosticKind::StructuralMismatch,
                    Some(child.offset),
                    format!("expected LFLF in LECF, found {}", child.name()),
                );
            }
        }
        Ok(Step::Advance)
    });
    Ok(archive)
}

#[cfg(test)]
mod tests {
    use super::super::chunk::test_support::{chunk, container, le16, le32};
    use super::*;

    fn parse(data: &[u8]) -> (Room, Diagnostics) {
        let mut cursor = ByteCursor::new(data, 0);
        let mut diag = Diagnostics::new();
        let room = read_room(&mut cursor, &mut diag).unwrap();
        assert_eq!(cursor.tell(), data.len());
        (room, diag)
    }

    fn pals(entries: &[Vec<u8>]) -> Vec<u8> {
        let table_len = 8 + 4 * entries.len();
        let mut offsets = Vec::new();
        let mut at = table_len;
        for entry in entries {
            offsets.extend_from_slice(&le32(at as u32));
            at += entry.len();
        }
        let mut children = vec![chunk(b"OFFS", &offsets)];
        children.extend(entries.iter().cloned());
        container(b"PALS", &[container(b"WRAP", &children)])
    }

    #[test]
    fn room_wrappers_are_transparent() {
        let rmhd = [le16(320), le16(200), le16(4)].concat();
        let room = container(b"ROOM", &[chunk(b"RMHD", &rmhd), chunk(b"TRNS", &le16(5))]);
        let rmda = container(b"RMDA", &[chunk(b"CYCL", &le16(2))]);
        let data = container(b"LFLF", &[room, rmda, chunk(b"SCRP", &[1, 2, 3])]);
        let (room, diag) = parse(&data);
        assert_eq!(room.header, RoomHeader { width: 320, height: 200, objects: 4 });
        assert_eq!(room.trns, 5);
        assert_eq!(room.cycl, Some(2));
        assert_eq!(room.scripts.scrp.len(), 1);
        assert_eq!(diag.warnings() + diag.errors(), 0);
    }

    #[test]
    fn palettes_from_pals_wrapper() {
        let full: Vec<u8> = (0..=255u8).flat_map(|i| [i, i, i]).collect();
        let data = container(
            b"LFLF",
            &[pals(&[chunk(b"APAL", &full), chunk(b"APAL", &[0; 4])])],
        );
        let (room, _) = parse(&data);
        assert_eq!(room.palettes.len(), 2);
        assert_eq!(room.palettes[0].len(), 256);
        assert_eq!(room.palettes[1].len(), 1);
    }

    #[test]
    fn object_image_without_code_is_still_parsed() {
        let obim = container(b"OBIM", &[chunk(b"IMHD", &le16(9))]);
        let data = container(b"LFLF", &[obim]);
        let (room, _) = parse(&data);
        assert!(room.object_images.contains_key(&9));
        assert!(room.object_codes.is_empty());
    }

    #[test]
    fn soun_variants() {
        let midi = container(b"SOUN", &[chunk(b"MIDI", &[0x4D])]);
        let digi = container(
            b"SOUN",
            &[container(b"DIGI", &[chunk(b"SDAT", &[0x80, 0x81])])],
        );
        // Payload that is not a chunk at all.
        let bare = chunk(b"SOUN", &[0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70, 0x80, 0x90]);
        let data = container(b"LFLF", &[midi, digi, bare]);
        let (room, diag) = parse(&data);
        assert_eq!(room.midi.len(), 1);
        assert_eq!(room.digi.len(), 2);
        assert_eq!(room.digi[0].pcm.data, vec![0x80, 0x81]);
        assert_eq!(room.digi[1].pcm.data.len(), 9);
        assert_eq!(diag.count(DiagnosticKind::MisheaderedSound), 1);
    }

    #[test]
    fn misaligned_digi_is_resynced() {
        let digi = container(b"DIGI", &[chunk(b"SDAT", &[1, 2, 3])]);
        let mut payload = vec![0xEE];
        payload.extend_from_slice(&digi);
        let data = chunk(b"LFLF", &payload);
        let (room, diag) = parse(&data);
        assert_eq!(room.digi.len(), 1);
        assert_eq!(room.digi[0].pcm.data, vec![1, 2, 3]);
        assert_eq!(diag.count(DiagnosticKind::StructuralMismatch), 1);
    }

    #[test]
    fn subtitles_collect_text_lines() {
        let tlke = container(b"TLKE", &[chunk(b"TEXT", b"Hello\0"), chunk(b"TEXT", b"Bye\0")]);
        let data = container(b"LFLF", &[tlke]);
        let (room, _) = parse(&data);
        assert_eq!(room.subtitles, vec![vec!["Hello".to_string(), "Bye".to_string()]]);
    }

    #[test]
    fn lecf_lists_rooms() {
        let first = container(b"LFLF", &[chunk(b"TRNS", &le16(1))]);
        let second = container(b"LFLF", &[chunk(b"TRNS", &le16(2))]);
        let data = container(b"LECF", &[chunk(b"LOFF", &[0; 5]), first.clone(), second]);
        let mut cursor = ByteCursor::new(&data, 0);
        let archive = scan_lecf(&mut cursor, &mut Diagnostics::new()).unwrap();
        assert!(archive.loff.is_some());
        assert_eq!(archive.rooms, vec![8 + 13, 8 + 13 + first.len()]);
    }
}
