//! Actor costumes (`AKOS`)
//!
//! A costume is a set of sprite components plus the bytecode that arranges
//! them into animation sequences. The component table (`AKOF`) indexes
//! into two sibling chunks, so those three are captured during the walk
//! and resolved once it is done, whatever order they were stored in.

use serde::Serialize;

use crate::codec::palette::Palette;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::Result;

use super::chunk::{ChunkHeader, ChunkTag, HEADER_SIZE, RawChunk, Step, skip_unknown, walk_children};
use super::cursor::ByteCursor;
use super::palette::read_palette;
use super::wrap::{OffsetBase, read_wrapped};

/// The only sequence/pointer-table encoding that is understood.
pub const SEQUENCE_ENCODING: u16 = 0x8000;

/// Size of one `AKOF` record.
const AKOF_RECORD: usize = 6;

/// `AXFD` payloads up to this size carry no frame.
const AXFD_EMPTY_LIMIT: u32 = 0xA;

/// `AKHD` fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CostumeHeader {
    pub unknown1: u16,
    pub sequence_encoding: u16,
    /// Entries in the `AKCH` slot pointer table.
    pub anim_slots: u16,
    pub unknown3: u16,
    pub encoding: u16,
    pub unknown5: u16,
}

/// `AKPL`: the component colour count and how to map it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorTable {
    pub count: usize,
    /// Transparency code of two-colour costumes.
    pub alt_transparency: Option<u16>,
    /// Deindex table for every other colour count.
    pub colormap: Vec<u8>,
}

impl ColorTable {
    pub fn is_two_color(&self) -> bool {
        self.count == 2
    }
}

/// One `AKCH` pointer group into the sequence stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencePointers {
    pub kind: u8,
    /// `(label, offset into AKSQ)` pairs.
    pub pointers: Vec<(u8, u32)>,
}

/// `AKCH` pointer tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimationTable {
    pub slots: Vec<u16>,
    pub sequences: Vec<SequencePointers>,
}

/// A component's size and encoded pixels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Component {
    pub width: u16,
    pub height: u16,
    pub data: Vec<u8>,
}

/// `AXFD`: one auxiliary frame, positioned relative to a 640x480 stage centre.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuxFrame {
    pub unknown: u16,
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub data: Vec<u8>,
}

/// `AUXD` entry of an `AKAX` wrapper.
#[derive(Debug, Clone, Default)]
pub struct AuxEntry {
    pub frame: AuxFrame,
    pub axur: Option<RawChunk>,
    pub axer: Option<RawChunk>,
}

/// `SEQI` record of an `SQDB` wrapper.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SequenceInfo {
    pub name: String,
    #[serde(skip)]
    pub stof: Option<RawChunk>,
    #[serde(skip)]
    pub sqlc: Option<RawChunk>,
    #[serde(skip)]
    pub size: Option<RawChunk>,
}

/// A parsed `AKOS` chunk.
#[derive(Debug, Clone, Default)]
pub struct Costume {
    pub header: CostumeHeader,
    pub colors: ColorTable,
    pub palette: Palette,
    /// Sequence bytecode, header included.
    pub aksq: Option<RawChunk>,
    pub animations: AnimationTable,
    pub components: Vec<Component>,
    pub aux: Vec<AuxEntry>,
    /// `AKFO`, `AKLC`, `AKST`, `AKCT` and `IMGL`, kept opaque.
    pub blobs: Vec<RawChunk>,
    pub file_date: Option<String>,
    pub file_name: Option<String>,
    pub compression: Option<String>,
    pub sequence_names: Vec<SequenceInfo>,
}

/// Read an `AKOS` chunk at the cursor.
pub fn read_akos(cursor: &mut ByteCursor<'_>, diag: &mut Diagnostics) -> Result<Costume> {
    let header = ChunkHeader::expect(cursor, ChunkTag::Akos)?;
    let mut costume = Costume::default();
    let mut akch = None;
    let mut akof = None;
    let mut akci = None;
    let mut akcd = None;

    walk_children(cursor, header.end(), diag, |c, child, d| {
        match child.tag {
            ChunkTag::Akhd => {
                c.seek(child.payload_offset());
                costume.header = CostumeHeader {
                    unknown1: c.read_u16_le()?,
                    sequence_encoding: c.read_u16_le()?,
                    anim_slots: c.read_u16_le()?,
                    unknown3: c.read_u16_le()?,
                    encoding: c.read_u16_le()?,
                    unknown5: c.read_u16_le()?,
                };
            }
            ChunkTag::Akpl => costume.colors = read_akpl(c, child)?,
            ChunkTag::Rgbs => costume.palette = read_palette(c, child)?,
            ChunkTag::Aksq => costume.aksq = Some(RawChunk::read(c, child)?),
            ChunkTag::Akch => akch = Some(RawChunk::read(c, child)?),
            ChunkTag::Akof => akof = Some(RawChunk::read(c, child)?),
            ChunkTag::Akci => akci = Some(RawChunk::read(c, child)?),
            ChunkTag::Akcd => akcd = Some(RawChunk::read(c, child)?),
            ChunkTag::Akax => {
                c.seek(child.payload_offset());
                costume.aux = read_wrapped(c, d, OffsetBase::TableStart, read_auxd)?;
            }
            ChunkTag::Akfo | ChunkTag::Aklc | ChunkTag::Akst | ChunkTag::Akct | ChunkTag::Imgl => {
                costume.blobs.push(RawChunk::read(c, child)?);
            }
            ChunkTag::Sp2c | ChunkTag::Splf | ChunkTag::Clrs => {
                c.seek(child.payload_offset());
                let text = c.read_cstring(child.payload_len())?;
                match child.tag {
                    ChunkTag::Sp2c => costume.file_date = Some(text),
                    ChunkTag::Splf => costume.file_name = Some(text),
                    _ => costume.compression = Some(text),
                }
            }
            ChunkTag::Sqdb => {
                c.seek(child.payload_offset());
                costume.sequence_names = read_wrapped(c, d, OffsetBase::TableEnd, read_seqi)?;
            }
            _ => return skip_unknown(child, "AKOS", d),
        }
        Ok(Step::Advance)
    });
    cursor.seek(header.end());

    if let Some(akch) = &akch {
        match parse_akch(akch, &costume.header, diag) {
            Ok(table) => costume.animations = table,
            Err(err) => diag.record(&err, Some(akch.header.offset)),
        }
    }
    if let Some(akof) = &akof {
        costume.components = resolve_components(akof, akci.as_ref(), akcd.as_ref(), diag);
    }
    Ok(costume)
}

fn read_akpl(cursor: &mut ByteCursor<'_>, header: &ChunkHeader) -> Result<ColorTable> {
    cursor.seek(header.payload_offset());
    let count = header.payload_len();
    if count == 2 {
        return Ok(ColorTable {
            count,
            alt_transparency: Some(cursor.read_u16_le()?),
            colormap: Vec::new(),
        });
    }
    let colormap = cursor.read_bytes(count)?;
    Ok(ColorTable {
        // A single-entry table stands for the full 256 colours.
        count: if count == 1 { 256 } else { count },
        alt_transparency: None,
        colormap,
    })
}

fn parse_akch(akch: &RawChunk, header: &CostumeHeader, diag: &mut Diagnostics) -> Result<AnimationTable> {
    let mut cursor = ByteCursor::new(&akch.bytes, 0);
    cursor.seek(HEADER_SIZE);
    let end = akch.bytes.len();

    let slots = (0..header.anim_slots)
        .map(|_| cursor.read_u16_le())
        .collect::<Result<Vec<u16>>>()?;
    // leading null of the second table
    cursor.read_u8()?;

    let mut sequences = Vec::new();
    if header.sequence_encoding != SEQUENCE_ENCODING {
        diag.warn(
            DiagnosticKind::UnsupportedEncoding,
            Some(akch.header.offset),
            format!("unrecognised AKCH encoding {:#x}", header.sequence_encoding),
        );
        return Ok(AnimationTable { slots, sequences });
    }

    while cursor.tell() < end {
        let kind = cursor.read_u8()?;
        let mut pointers = Vec::new();
        let mut label = cursor.read_u8()?;
        // The final group is not always zero-terminated.
        while label != 0 {
            pointers.push((label, cursor.read_u32_le()?));
            if cursor.tell() >= end {
                break;
            }
            label = cursor.read_u8()?;
        }
        sequences.push(SequencePointers { kind, pointers });
    }
    Ok(AnimationTable { slots, sequences })
}

fn resolve_components(
    akof: &RawChunk,
    akci: Option<&RawChunk>,
    akcd: Option<&RawChunk>,
    diag: &mut Diagnostics,
) -> Vec<Component> {
    let records: Vec<(usize, usize)> = akof
        .payload()
        .chunks_exact(AKOF_RECORD)
        .map(|r| {
            let cd = u32::from_le_bytes([r[0], r[1], r[2], r[3]]) as usize;
            let ci = usize::from(u16::from_le_bytes([r[4], r[5]]));
            (cd, ci)
        })
        .collect();

    let (Some(akci), Some(akcd)) = (akci, akcd) else {
        diag.warn(
            DiagnosticKind::StructuralMismatch,
            Some(akof.header.offset),
            "AKOF without its AKCI/AKCD tables",
        );
        return Vec::new();
    };
    let info = akci.payload();
    let data = akcd.payload();

    records
        .iter()
        .enumerate()
        .map(|(i, &(cd, ci))| {
            let field = |at: usize| -> u16 {
                info.get(at..at + 2)
                    .map_or(0, |b| u16::from_le_bytes([b[0], b[1]]))
            };
            if ci + 4 > info.len() {
                diag.warn(
                    DiagnosticKind::TruncatedPayload,
                    Some(akci.header.offset),
                    format!("component {i} size lies outside AKCI"),
                );
            }
            let end = records
                .get(i + 1)
                .map_or(data.len(), |&(next, _)| next)
                .min(data.len());
            Component {
                width: field(ci),
                height: field(ci + 2),
                data: data.get(cd..end).map(<[u8]>::to_vec).unwrap_or_default(),
            }
        })
        .collect()
}

fn read_auxd(cursor: &mut ByteCursor<'_>, diag: &mut Diagnostics) -> Result<AuxEntry> {
    let header = ChunkHeader::expect(cursor, ChunkTag::Auxd)?;
    let mut entry = AuxEntry::default();
    walk_children(cursor, header.end(), diag, |c, child, d| {
        match child.tag {
            ChunkTag::Axfd => entry.frame = read_axfd(c, child)?,
            ChunkTag::Axur => entry.axur = Some(RawChunk::read(c, child)?),
            ChunkTag::Axer => entry.axer = Some(RawChunk::read(c, child)?),
            _ => return skip_unknown(child, "AUXD", d),
        }
        Ok(Step::Advance)
    });
    cursor.seek(header.end());
    Ok(entry)
}

fn read_axfd(cursor: &mut ByteCursor<'_>, header: &ChunkHeader) -> Result<AuxFrame> {
    if header.size <= AXFD_EMPTY_LIMIT {
        return Ok(AuxFrame::default());
    }
    cursor.seek(header.payload_offset());
    Ok(AuxFrame {
        unknown: cursor.read_u16_le()?,
        x: cursor.read_i16_le()?,
        y: cursor.read_i16_le()?,
        width: cursor.read_u16_le()?,
        height: cursor.read_u16_le()?,
        data: cursor.read_bytes((header.size as usize).saturating_sub(0x12))?,
    })
}

fn read_seqi(cursor: &mut ByteCursor<'_>, diag: &mut Diagnostics) -> Result<SequenceInfo> {
    let header = ChunkHeader::expect(cursor, ChunkTag::Seqi)?;
    let mut info = SequenceInfo::default();
    walk_children(cursor, header.end(), diag, |c, child, d| {
        match child.tag {
            ChunkTag::Name => {
                c.seek(child.payload_offset());
                info.name = c.read_cstring(child.payload_len())?;
            }
            ChunkTag::Stof => info.stof = Some(RawChunk::read(c, child)?),
            ChunkTag::Sqlc => info.sqlc = Some(RawChunk::read(c, child)?),
            ChunkTag::Size => info.size = Some(RawChunk::read(c, child)?),
            _ => return skip_unknown(child, "SEQI", d),
        }
        Ok(Step::Advance)
    });
    cursor.seek(header.end());
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::super::chunk::test_support::{chunk, container, le16, le32};
    use super::*;

    fn akhd(encoding: u16, slots: u16) -> Vec<u8> {
        let fields = [le16(0), le16(encoding), le16(slots), le16(0), le16(1), le16(0)].concat();
        chunk(b"AKHD", &fields)
    }

    fn akof(records: &[(u32, u16)]) -> Vec<u8> {
        let payload: Vec<u8> = records
            .iter()
            .flat_map(|&(cd, ci)| [le32(cd).as_slice(), le16(ci).as_slice()].concat())
            .collect();
        chunk(b"AKOF", &payload)
    }

    fn parse(data: &[u8]) -> (Costume, Diagnostics) {
        let mut cursor = ByteCursor::new(data, 0);
        let mut diag = Diagnostics::new();
        let costume = read_akos(&mut cursor, &mut diag).unwrap();
        assert_eq!(cursor.tell(), data.len());
        (costume, diag)
    }

    #[test]
    fn components_resolve_regardless_of_order() {
        let akci = chunk(b"AKCI", &[le16(2), le16(3), le16(4), le16(1)].concat());
        let akcd = chunk(b"AKCD", &[1, 2, 3, 9, 9]);
        // Data tables first, offset table last.
        let data = container(
            b"AKOS",
            &[akhd(SEQUENCE_ENCODING, 0), akcd, akci, akof(&[(0, 0), (3, 4)])],
        );
        let (costume, diag) = parse(&data);
        assert_eq!(costume.components.len(), 2);
        assert_eq!((costume.components[0].width, costume.components[0].height), (2, 3));
        assert_eq!(costume.components[0].data, vec![1, 2, 3]);
        assert_eq!((costume.components[1].width, costume.components[1].height), (4, 1));
        assert_eq!(costume.components[1].data, vec![9, 9]);
        assert_eq!(diag.warnings(), 0);
    }

    #[test]
    fn two_color_table_carries_alt_transparency() {
        let data = container(b"AKOS", &[chunk(b"AKPL", &le16(0x00FE))]);
        let (costume, _) = parse(&data);
        assert!(costume.colors.is_two_color());
        assert_eq!(costume.colors.alt_transparency, Some(0xFE));
    }

    #[test]
    fn single_entry_colormap_means_full_range() {
        let data = container(b"AKOS", &[chunk(b"AKPL", &[7])]);
        let (costume, _) = parse(&data);
        assert_eq!(costume.colors.count, 256);
        assert_eq!(costume.colors.colormap, vec![7]);
    }

    #[test]
    fn akch_pointer_groups() {
        let mut table = [le16(0x10), le16(0x20)].concat();
        table.push(0);
        // kind 1, label 5 -> 0x40, terminator
        table.extend_from_slice(&[1, 5]);
        table.extend_from_slice(&le32(0x40));
        table.push(0);
        // kind 2, label 6 -> 0x80, unterminated
        table.extend_from_slice(&[2, 6]);
        table.extend_from_slice(&le32(0x80));
        let data = container(b"AKOS", &[akhd(SEQUENCE_ENCODING, 2), chunk(b"AKCH", &table)]);
        let (costume, _) = parse(&data);
        assert_eq!(costume.animations.slots, vec![0x10, 0x20]);
        assert_eq!(costume.animations.sequences.len(), 2);
        assert_eq!(costume.animations.sequences[0].pointers, vec![(5, 0x40)]);
        assert_eq!(costume.animations.sequences[1].kind, 2);
    }

    #[test]
    fn aux_frames_and_strings() {
        let axfd = [le16(0), (-4i16).to_le_bytes(), 6i16.to_le_bytes(), le16(2), le16(1)].concat();
        let axfd = [axfd, vec![0xAA, 0xBB]].concat();
        let auxd = container(b"AUXD", &[chunk(b"AXFD", &axfd), chunk(b"AXUR", &[]), chunk(b"AXER", &[])]);
        let offs = chunk(b"OFFS", &le32(12));
        let wrap = container(b"AKAX", &[container(b"WRAP", &[offs, auxd])]);
        let data = container(b"AKOS", &[wrap, chunk(b"SPLF", b"hero.akos\0")]);
        let (costume, diag) = parse(&data);
        assert_eq!(diag.errors(), 0);
        assert_eq!(costume.aux.len(), 1);
        let frame = &costume.aux[0].frame;
        assert_eq!((frame.x, frame.y, frame.width, frame.height), (-4, 6, 2, 1));
        assert_eq!(frame.data, vec![0xAA, 0xBB]);
        assert_eq!(costume.file_name.as_deref(), Some("hero.akos"));
    }

    #[test]
    fn sequence_names_from_sqdb() {
        let seqi = container(b"SEQI", &[chunk(b"NAME", b"walk\0"), chunk(b"STOF", &[0; 4])]);
        let offs = chunk(b"OFFS", &le32(0));
        let sqdb = container(b"SQDB", &[container(b"WRAP", &[offs, seqi])]);
        let data = container(b"AKOS", &[sqdb]);
        let (costume, _) = parse(&data);
        assert_eq!(costume.sequence_names.len(), 1);
        assert_eq!(costume.sequence_names[0].name, "walk");
        assert!(costume.sequence_names[0].stof.is_some());
    }
}
