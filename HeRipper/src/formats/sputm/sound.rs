//! Sound containers: `DIGI`/`TALK`, `FMUS`, `WSOU` and `SONG` entry tables

use serde::Serialize;

use crate::audio::{DEFAULT_SAMPLE_RATE, PcmBuffer};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{Error, Result};

use super::chunk::{ChunkHeader, ChunkTag, HEADER_SIZE, RawChunk, Step, skip_unknown, walk_children};
use super::cursor::ByteCursor;
use super::detect::FormatSubtype;

/// Bytes of the `SRFS` block some `SDAT` chunks start with.
const SRFS_PREFIX: usize = 32;

/// Size of one record in an unheadered `SGHD` table.
const SONG_RECORD_SIZE: usize = 25;

/// `HSHD` sound header: eight little-endian words, the fourth being the
/// sample rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SoundHeader {
    pub words: [u16; 8],
}

impl SoundHeader {
    pub fn sample_rate(&self) -> u32 {
        u32::from(self.words[3])
    }

    fn read(cursor: &mut ByteCursor<'_>, header: &ChunkHeader) -> Result<Self> {
        cursor.seek(header.payload_offset());
        let mut words = [0u16; 8];
        for word in &mut words {
            *word = cursor.read_u16_le()?;
        }
        Ok(Self { words })
    }
}

/// A decoded `DIGI`, `TALK` or `MRAW` sound.
#[derive(Debug, Clone)]
pub struct Sound {
    pub header: ChunkHeader,
    pub hshd: Option<SoundHeader>,
    pub pcm: PcmBuffer,
}

/// Read a sound container at the cursor.
///
/// Sample data normally sits in `SDAT`. A child with an unknown tag is
/// taken as misheadered sample data running to the end of the container.
pub fn read_digi_talk(cursor: &mut ByteCursor<'_>, diag: &mut Diagnostics) -> Result<Sound> {
    let header = ChunkHeader::read(cursor)?;
    let end = header.end();
    let mut hshd = None;
    let mut pcm = PcmBuffer::default();

    walk_children(cursor, end, diag, |c, child, d| {
        match child.tag {
            ChunkTag::Hshd => {
                let sound_header = SoundHeader::read(c, child)?;
                pcm.sample_rate = sound_header.sample_rate();
                hshd = Some(sound_header);
            }
            ChunkTag::Sdat => {
                c.seek(child.payload_offset());
                let prefixed = ChunkHeader::peek(c).is_ok_and(|inner| inner.tag == ChunkTag::Srfs);
                let skip = if prefixed { HEADER_SIZE + SRFS_PREFIX } else { HEADER_SIZE };
                c.seek(child.offset + skip);
                pcm.data = c.read_bytes((child.size as usize).saturating_sub(skip))?;
            }
            ChunkTag::Sbng => {}
            ChunkTag::Pete => {
                tracing::debug!(offset = child.offset, "appending PETE block to sample data");
                c.seek(child.payload_offset());
                let more = c.read_bytes(child.payload_len())?;
                pcm.data.extend_from_slice(&more);
            }
            ChunkTag::Unknown => {
                d.warn(
                    DiagnosticKind::MisheaderedSound,
                    Some(child.offset),
                    format!(
                        "unknown sound child {}, taking it as misheadered sample data",
                        child.name()
                    ),
                );
                let start = child.payload_offset();
                c.seek(start);
                pcm.data = c.read_bytes_clamped(end.saturating_sub(start));
                c.seek(end);
                return Ok(Step::Positioned);
            }
            _ => return skip_unknown(child, "DIGI/TALK", d),
        }
        Ok(Step::Advance)
    });
    cursor.seek(end);

    Ok(Sound { header, hshd, pcm })
}

/// Raw 8-bit unsigned mono data stored directly in a `SOUN` payload.
pub fn read_misheadered(cursor: &mut ByteCursor<'_>, soun: &ChunkHeader) -> Result<PcmBuffer> {
    cursor.seek(soun.payload_offset());
    let data = cursor.read_bytes(soun.payload_len())?;
    Ok(PcmBuffer::unsigned_8bit(data, DEFAULT_SAMPLE_RATE))
}

/// External music reference (`FMUS`).
#[derive(Debug, Clone, Default, Serialize)]
pub struct MusicRef {
    pub hshd: Option<SoundHeader>,
    /// File name as stored, terminators included.
    pub file_name: String,
}

impl MusicRef {
    /// File name without the space, CR, LF and 0x1A padding some titles
    /// leave in it.
    pub fn clean_file_name(&self) -> String {
        self.file_name
            .chars()
            .filter(|c| !matches!(c, ' ' | '\r' | '\n' | '\u{1A}'))
            .collect()
    }
}

pub fn read_fmus(cursor: &mut ByteCursor<'_>, diag: &mut Diagnostics) -> Result<MusicRef> {
    let header = ChunkHeader::expect(cursor, ChunkTag::Fmus)?;
    let mut music = MusicRef::default();
    walk_children(cursor, header.end(), diag, |c, child, d| {
        match child.tag {
            ChunkTag::Hshd => music.hshd = Some(SoundHeader::read(c, child)?),
            ChunkTag::Sdat => {
                c.seek(child.payload_offset());
                music.file_name = c.read_cstring(child.payload_len())?;
            }
            ChunkTag::Sbng => {}
            _ => return skip_unknown(child, "FMUS", d),
        }
        Ok(Step::Advance)
    });
    cursor.seek(header.end());
    Ok(music)
}

/// Wave sound (`WSOU`): embedded RIFF files, kept as raw bytes.
#[derive(Debug, Clone, Default)]
pub struct WaveSound {
    pub riffs: Vec<RawChunk>,
}

pub fn read_wsou(cursor: &mut ByteCursor<'_>, diag: &mut Diagnostics) -> Result<WaveSound> {
    let header = ChunkHeader::expect(cursor, ChunkTag::Wsou)?;
    let mut wave = WaveSound::default();
    walk_children(cursor, header.end(), diag, |c, child, d| match child.tag {
        ChunkTag::Riff => {
            wave.riffs.push(RawChunk::read(c, child)?);
            Ok(Step::Advance)
        }
        _ => skip_unknown(child, "WSOU", d),
    });
    cursor.seek(header.end());
    Ok(wave)
}

/// One entry of a `SONG` table. `offset` is absolute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SongEntry {
    pub id: u32,
    pub offset: u32,
    pub length: u32,
}

fn read_song_entry(cursor: &mut ByteCursor<'_>) -> Result<SongEntry> {
    Ok(SongEntry {
        id: cursor.read_u32_le()?,
        offset: cursor.read_u32_le()?,
        length: cursor.read_u32_le()?,
    })
}

/// Read the entry table of a `SONG` archive. The cursor must be on the
/// `SGHD` header.
///
/// Unheadered tables hold fixed 25-byte records after the entry count.
/// Indexed tables hold one `SGEN` chunk per entry after `SGHD`; a missing
/// `SGEN` ends the table early with an error event.
pub fn read_song_table(
    cursor: &mut ByteCursor<'_>,
    subtype: FormatSubtype,
    diag: &mut Diagnostics,
) -> Result<Vec<SongEntry>> {
    let sghd = ChunkHeader::expect(cursor, ChunkTag::Sghd)?;
    let count = cursor.read_u32_le()? as usize;
    let mut entries = Vec::new();

    match subtype {
        FormatSubtype::SongUnheadered => {
            let table = sghd.payload_offset() + 4;
            for i in 0..count {
                cursor.seek(table + SONG_RECORD_SIZE * i);
                entries.push(read_song_entry(cursor)?);
            }
        }
        FormatSubtype::SongIndexed => {
            cursor.seek(sghd.end());
            for _ in 0..count {
                let sgen = ChunkHeader::read(cursor)?;
                if sgen.tag != ChunkTag::Sgen {
                    let err = Error::UnexpectedChunk {
                        expected: ChunkTag::Sgen.as_str(),
                        found: sgen.name(),
                        offset: sgen.offset,
                    };
                    diag.record(&err, Some(sgen.offset));
                    break;
                }
                entries.push(read_song_entry(cursor)?);
                cursor.seek(sgen.end());
            }
        }
        _ => {}
    }
    Ok(entries)
}
