//! Chunk headers, tag vocabulary and the shared child walk
//!
//! A chunk is a four-character tag, a big-endian `u32` length that
//! includes the 8-byte header, and a payload that may itself hold chunks.

use std::fmt;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{Error, Result};

use super::cursor::ByteCursor;

/// Size of a chunk header in bytes.
pub const HEADER_SIZE: usize = 8;

macro_rules! chunk_tags {
    ($($variant:ident => $fourcc:literal,)*) => {
        /// Every tag the parser recognises.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ChunkTag {
            $($variant,)*
            /// `IMxx` image slot (`IM00`, `IM01`, ...).
            ImageSlot,
            /// `ZPxx` z-plane mask.
            ZPlane,
            Unknown,
        }

        impl ChunkTag {
            /// Classify a four-character tag. Exact matches win over the
            /// `IM`/`ZP` prefixes, so `IMHD` and `IMGL` keep their own tags.
            pub fn from_fourcc(fourcc: &[u8; 4]) -> Self {
                match fourcc {
                    $($fourcc => ChunkTag::$variant,)*
                    [b'I', b'M', ..] => ChunkTag::ImageSlot,
                    [b'Z', b'P', ..] => ChunkTag::ZPlane,
                    _ => ChunkTag::Unknown,
                }
            }

            /// Canonical tag text; prefix families and unknown tags have none.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(ChunkTag::$variant => {
                        match std::str::from_utf8($fourcc) {
                            Ok(s) => s,
                            Err(_) => "????",
                        }
                    })*
                    ChunkTag::ImageSlot => "IMxx",
                    ChunkTag::ZPlane => "ZPxx",
                    ChunkTag::Unknown => "????",
                }
            }
        }
    };
}

chunk_tags! {
    Lecf => b"LECF", Lflf => b"LFLF", Loff => b"LOFF", Room => b"ROOM",
    Rmim => b"RMIM", Rmih => b"RMIH", Rmda => b"RMDA", Rmhd => b"RMHD",
    Cycl => b"CYCL", Trns => b"TRNS", Pals => b"PALS", Wrap => b"WRAP",
    Offs => b"OFFS", Apal => b"APAL", Rgbs => b"RGBS", Remp => b"REMP",
    Obim => b"OBIM", Imhd => b"IMHD", Smap => b"SMAP", Bmap => b"BMAP",
    Bomp => b"BOMP", Tmsk => b"TMSK", Obcd => b"OBCD", Cdhd => b"CDHD",
    Verb => b"VERB", Obna => b"OBNA", Excd => b"EXCD", Encd => b"ENCD",
    Nlsc => b"NLSC", Lscr => b"LSCR", Lsc2 => b"LSC2", Boxd => b"BOXD",
    Boxm => b"BOXM", Scal => b"SCAL", Pold => b"POLD", Scrp => b"SCRP",
    Tlke => b"TLKE", Text => b"TEXT", Tlkb => b"TLKB", Song => b"SONG",
    Sghd => b"SGHD", Sgen => b"SGEN", Soun => b"SOUN", Wsou => b"WSOU",
    Digi => b"DIGI", Talk => b"TALK", Sbng => b"SBNG", Midi => b"MIDI",
    Hshd => b"HSHD", Sdat => b"SDAT", Pete => b"PETE", Srfs => b"SRFS",
    Fmus => b"FMUS", Mraw => b"MRAW", Riff => b"RIFF", Akos => b"AKOS",
    Akhd => b"AKHD", Akpl => b"AKPL", Aksq => b"AKSQ", Akfo => b"AKFO",
    Akch => b"AKCH", Akof => b"AKOF", Akci => b"AKCI", Akcd => b"AKCD",
    Aklc => b"AKLC", Akst => b"AKST", Akct => b"AKCT", Akax => b"AKAX",
    Auxd => b"AUXD", Axfd => b"AXFD", Axur => b"AXUR", Axer => b"AXER",
    Sp2c => b"SP2C", Splf => b"SPLF", Clrs => b"CLRS", Imgl => b"IMGL",
    Sqdb => b"SQDB", Seqi => b"SEQI", Name => b"NAME", Stof => b"STOF",
    Sqlc => b"SQLC", Size => b"SIZE", Char => b"CHAR", Awiz => b"AWIZ",
    Xmap => b"XMAP", Cnvs => b"CNVS", Relo => b"RELO", Wizh => b"WIZH",
    Spot => b"SPOT", Wizd => b"WIZD", Mult => b"MULT", Defa => b"DEFA",
    Rmap => b"RMAP", Cuse => b"CUSE",
}

/// A chunk header as found at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub tag: ChunkTag,
    pub fourcc: [u8; 4],
    /// Absolute offset of the header.
    pub offset: usize,
    /// Declared length, header included.
    pub size: u32,
}

impl ChunkHeader {
    /// Read a header at the cursor, leaving the cursor on the payload.
    pub fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let offset = cursor.tell();
        let fourcc = cursor.read_tag()?;
        let raw = cursor.read_u32_be()?;
        let tag = ChunkTag::from_fourcc(&fourcc);
        // RIFF stores a little-endian length that excludes its header.
        let size = if tag == ChunkTag::Riff {
            raw.swap_bytes().saturating_add(HEADER_SIZE as u32)
        } else {
            raw
        };
        Ok(Self {
            tag,
            fourcc,
            offset,
            size,
        })
    }

    /// Read a header without moving the cursor.
    pub fn peek(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let start = cursor.tell();
        let header = Self::read(cursor);
        cursor.seek(start);
        header
    }

    /// Read a header and require a given tag.
    pub fn expect(cursor: &mut ByteCursor<'_>, tag: ChunkTag) -> Result<Self> {
        let header = Self::read(cursor)?;
        if header.tag != tag {
            return Err(Error::UnexpectedChunk {
                expected: tag.as_str(),
                found: header.name(),
                offset: header.offset,
            });
        }
        Ok(header)
    }

    /// Absolute offset one past the last byte of the chunk.
    pub fn end(&self) -> usize {
        self.offset + self.size as usize
    }

    pub fn payload_offset(&self) -> usize {
        self.offset + HEADER_SIZE
    }

    pub fn payload_len(&self) -> usize {
        (self.size as usize).saturating_sub(HEADER_SIZE)
    }

    /// The length can hold at least the header itself.
    pub fn is_plausible(&self) -> bool {
        self.size as usize >= HEADER_SIZE
    }

    /// Tag text as read, with unprintable bytes replaced.
    pub fn name(&self) -> String {
        self.fourcc
            .iter()
            .map(|&b| if b.is_ascii_graphic() { b as char } else { '?' })
            .collect()
    }
}

impl fmt::Display for ChunkHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes at {:#x})", self.name(), self.size, self.offset)
    }
}

/// A chunk captured whole, header bytes included.
///
/// Decoders index into `bytes` with offsets counted from the chunk start,
/// which is how in-chunk offset tables (strip offsets, for one) are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    pub header: ChunkHeader,
    pub bytes: Vec<u8>,
}

impl RawChunk {
    /// Capture the chunk described by `header`, leaving the cursor at its end.
    pub fn read(cursor: &mut ByteCursor<'_>, header: &ChunkHeader) -> Result<Self> {
        cursor.seek(header.offset);
        let bytes = cursor.read_bytes(header.size as usize)?;
        Ok(Self {
            header: *header,
            bytes,
        })
    }

    /// Read the header at the cursor and capture the chunk.
    pub fn read_next(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let header = ChunkHeader::peek(cursor)?;
        Self::read(cursor, &header)
    }

    /// Bytes after the header.
    pub fn payload(&self) -> &[u8] {
        self.bytes.get(HEADER_SIZE..).unwrap_or(&[])
    }
}

/// What a child visitor did with the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Continue at the child's declared end.
    Advance,
    /// The visitor left the cursor where parsing continues.
    Positioned,
}

/// Iterate the children of a container ending at `parent_end`.
///
/// Known tags must have a plausible length inside the buffer or the rest
/// of the container is abandoned. A visitor error becomes a diagnostic and
/// the walk resumes at that child's declared end.
pub fn walk_children<F>(
    cursor: &mut ByteCursor<'_>,
    parent_end: usize,
    diag: &mut Diagnostics,
    mut visit: F,
) where
    F: FnMut(&mut ByteCursor<'_>, &ChunkHeader, &mut Diagnostics) -> Result<Step>,
{
    while cursor.tell() < parent_end {
        let position = cursor.tell();
        let header = match ChunkHeader::peek(cursor) {
            Ok(header) => header,
            Err(err) => {
                diag.record(&err, Some(position));
                cursor.seek(parent_end);
                break;
            }
        };

        if header.tag != ChunkTag::Unknown {
            if !header.is_plausible() {
                diag.warn(
                    DiagnosticKind::StructuralMismatch,
                    Some(header.offset),
                    format!("implausible length for {header}, abandoning container"),
                );
                cursor.seek(parent_end);
                break;
            }
            if header.end() > cursor.len() {
                diag.error(
                    DiagnosticKind::TruncatedPayload,
                    Some(header.offset),
                    format!("{header} runs past the end of the buffer"),
                );
                cursor.seek(parent_end);
                break;
            }
            if header.end() > parent_end {
                diag.warn(
                    DiagnosticKind::StructuralMismatch,
                    Some(header.offset),
                    format!("{header} overruns its parent ending at {parent_end:#x}"),
                );
            }
        }

        match visit(cursor, &header, diag) {
            Ok(Step::Positioned) if cursor.tell() > header.offset => {}
            Ok(_) if !header.is_plausible() => {
                diag.warn(
                    DiagnosticKind::StructuralMismatch,
                    Some(header.offset),
                    format!("cannot skip {header}, abandoning container"),
                );
                cursor.seek(parent_end);
                break;
            }
            Ok(_) => cursor.seek(header.end()),
            Err(err) => {
                diag.record(&err, Some(header.offset));
                if header.is_plausible() {
                    cursor.seek(header.end());
                } else {
                    cursor.seek(parent_end);
                    break;
                }
            }
        }
    }
}

/// Log an unrecognised child and let the walk skip it.
pub fn skip_unknown(header: &ChunkHeader, family: &str, diag: &mut Diagnostics) -> Result<Step> {
    diag.warn(
        DiagnosticKind::UnknownTag,
        Some(header.offset),
        format!("unrecognised chunk {} in {family}", header.name()),
    );
    Ok(Step::Advance)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Builders for synthetic chunk streams.

    /// One chunk: tag, big-endian length, payload.
    pub fn chunk(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(payload.len() + 8);
        out.extend_from_slice(tag);
        out.extend_from_slice(&((payload.len() + 8) as u32).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    /// A container chunk holding already-built children.
    pub fn container(tag: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
        chunk(tag, &children.concat())
    }

    pub fn le16(v: u16) -> [u8; 2] {
        v.to_le_bytes()
    }

    pub fn le32(v: u32) -> [u8; 4] {
        v.to_le_bytes()
    }

    pub fn xor(bytes: &[u8], key: u8) -> Vec<u8> {
        bytes.iter().map(|b| b ^ key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{chunk, container};
    use super::*;

    #[test]
    fn tag_classification() {
        assert_eq!(ChunkTag::from_fourcc(b"LFLF"), ChunkTag::Lflf);
        assert_eq!(ChunkTag::from_fourcc(b"IMHD"), ChunkTag::Imhd);
        assert_eq!(ChunkTag::from_fourcc(b"IMGL"), ChunkTag::Imgl);
        assert_eq!(ChunkTag::from_fourcc(b"IM01"), ChunkTag::ImageSlot);
        assert_eq!(ChunkTag::from_fourcc(b"ZP02"), ChunkTag::ZPlane);
        assert_eq!(ChunkTag::from_fourcc(b"XDIG"), ChunkTag::Unknown);
        assert_eq!(ChunkTag::Lsc2.as_str(), "LSC2");
    }

    #[test]
    fn riff_length_is_little_endian() {
        let mut data = b"RIFF".to_vec();
        data.extend_from_slice(&4u32.to_le_bytes());
        data.extend_from_slice(b"WAVE");
        let mut cursor = ByteCursor::new(&data, 0);
        let header = ChunkHeader::read(&mut cursor).unwrap();
        assert_eq!(header.size, 12);
        assert_eq!(header.end(), data.len());
    }

    #[test]
    fn header_geometry() {
        let data = chunk(b"TRNS", &[5, 0]);
        let mut cursor = ByteCursor::new(&data, 0);
        let header = ChunkHeader::peek(&mut cursor).unwrap();
        assert_eq!(cursor.tell(), 0);
        assert_eq!(header.tag, ChunkTag::Trns);
        assert_eq!(header.size, 10);
        assert_eq!(header.end(), 10);
        assert_eq!(header.payload_len(), 2);
    }

    #[test]
    fn walk_visits_children_in_order() {
        let data = container(b"LFLF", &[chunk(b"TRNS", &[1, 0]), chunk(b"CYCL", &[2, 0])]);
        let mut cursor = ByteCursor::new(&data, 0);
        let parent = ChunkHeader::read(&mut cursor).unwrap();
        let mut diag = Diagnostics::new();
        let mut seen = Vec::new();
        walk_children(&mut cursor, parent.end(), &mut diag, |_, child, _| {
            seen.push(child.tag);
            Ok(Step::Advance)
        });
        assert_eq!(seen, vec![ChunkTag::Trns, ChunkTag::Cycl]);
        assert_eq!(cursor.tell(), data.len());
        assert_eq!(diag.warnings() + diag.errors(), 0);
    }

    #[test]
    fn walk_stops_on_truncated_child() {
        let mut data = container(b"LFLF", &[chunk(b"TRNS", &[1, 0])]);
        // Declare a child that claims far more than the buffer holds.
        data.extend_from_slice(b"CYCL");
        data.extend_from_slice(&1000u32.to_be_bytes());
        let end = data.len();
        let mut cursor = ByteCursor::new(&data, 0);
        cursor.seek(8);
        let mut diag = Diagnostics::new();
        let mut visited = 0;
        walk_children(&mut cursor, end, &mut diag, |_, _, _| {
            visited += 1;
            Ok(Step::Advance)
        });
        assert_eq!(visited, 1);
        assert_eq!(diag.count(DiagnosticKind::TruncatedPayload), 1);
    }

    #[test]
    fn walk_recovers_from_visitor_error() {
        let data = container(b"LFLF", &[chunk(b"RMHD", &[1]), chunk(b"TRNS", &[3, 0])]);
        let mut cursor = ByteCursor::new(&data, 0);
        let parent = ChunkHeader::read(&mut cursor).unwrap();
        let mut diag = Diagnostics::new();
        let mut trns = None;
        walk_children(&mut cursor, parent.end(), &mut diag, |cursor, child, _| {
            cursor.seek(child.payload_offset());
            match child.tag {
                ChunkTag::Rmhd => {
                    cursor.read_bytes(64)?;
                }
                ChunkTag::Trns => trns = Some(cursor.read_u16_le()?),
                _ => {}
            }
            Ok(Step::Advance)
        });
        assert_eq!(trns, Some(3));
        assert_eq!(diag.count(DiagnosticKind::TruncatedPayload), 1);
    }
}
