//! Archive subtype and decoding key detection
//!
//! Nothing in the file says what it is. A candidate key is accepted when
//! the first chunk is a known top-level container whose length equals the
//! file size and the second chunk is one that container can start with.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

use super::chunk::{ChunkHeader, ChunkTag, HEADER_SIZE};
use super::cursor::ByteCursor;

/// Keys tried when the caller does not force one.
pub const DEFAULT_KEYS: [u8; 2] = [0x69, 0x00];

/// Smallest buffer that can hold two chunk headers.
const MIN_ARCHIVE_SIZE: usize = 2 * HEADER_SIZE;

/// Top-level archive layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatSubtype {
    /// `LECF` followed directly by `LFLF` rooms.
    RoomsFramed,
    /// `LECF` with a leading `LOFF` room offset table.
    RoomsIndexed,
    /// `TLKB` dialogue bundle of `TALK`/`WSOU` entries.
    Dialogue,
    /// `SONG` with a fixed-record entry table and unheadered entries.
    SongUnheadered,
    /// `SONG` whose entries are described by `SGEN` chunks.
    SongIndexed,
    /// Standalone `MRAW` music file.
    ExternalMusic,
    /// `SONG` whose entry table reaches end-of-file; nothing to rip.
    EmptySong,
}

impl FormatSubtype {
    pub fn is_room_archive(self) -> bool {
        matches!(self, FormatSubtype::RoomsFramed | FormatSubtype::RoomsIndexed)
    }

    pub fn description(self) -> &'static str {
        match self {
            FormatSubtype::RoomsFramed => "room archive (LECF/LFLF)",
            FormatSubtype::RoomsIndexed => "room archive (LECF/LOFF)",
            FormatSubtype::Dialogue => "dialogue bundle (TLKB)",
            FormatSubtype::SongUnheadered => "music container (SONG, unheadered)",
            FormatSubtype::SongIndexed => "music container (SONG/SGEN)",
            FormatSubtype::ExternalMusic => "external music (MRAW)",
            FormatSubtype::EmptySong => "empty music container (SONG)",
        }
    }
}

impl fmt::Display for FormatSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Outcome of a successful detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub subtype: FormatSubtype,
    /// XOR byte applied to every byte of the archive.
    pub key: u8,
}

/// Candidate keys in the order they are tried, without duplicates.
pub fn candidate_keys(key_override: Option<u8>) -> Vec<u8> {
    let mut keys = Vec::with_capacity(3);
    if let Some(key) = key_override.filter(|&k| k != 0) {
        keys.push(key);
    }
    for key in DEFAULT_KEYS {
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

/// Classify an archive buffer.
///
/// # Errors
///
/// Returns [`Error::UnrecognizedArchive`] when no candidate key yields a
/// recognisable pair of leading chunks.
///
/// [`Error::UnrecognizedArchive`]: crate::Error::UnrecognizedArchive
pub fn detect(data: &[u8], key_override: Option<u8>) -> Result<Detection> {
    if data.len() < MIN_ARCHIVE_SIZE {
        return Err(Error::UnrecognizedArchive);
    }
    candidate_keys(key_override)
        .into_iter()
        .find_map(|key| {
            try_key(data, key).map(|subtype| {
                tracing::debug!(key, ?subtype, "archive detected");
                Detection { subtype, key }
            })
        })
        .ok_or(Error::UnrecognizedArchive)
}

fn try_key(data: &[u8], key: u8) -> Option<FormatSubtype> {
    let mut cursor = ByteCursor::new(data, key);
    let first = ChunkHeader::read(&mut cursor).ok()?;
    if first.size as usize != data.len() {
        return None;
    }
    let second = ChunkHeader::read(&mut cursor).ok()?;

    match (first.tag, second.tag) {
        (ChunkTag::Lecf, ChunkTag::Lflf) => Some(FormatSubtype::RoomsFramed),
        (ChunkTag::Lecf, ChunkTag::Loff) => Some(FormatSubtype::RoomsIndexed),
        (ChunkTag::Tlkb, ChunkTag::Talk | ChunkTag::Wsou) => Some(FormatSubtype::Dialogue),
        (ChunkTag::Song, ChunkTag::Sghd) => {
            if second.end() >= data.len() {
                return Some(FormatSubtype::EmptySong);
            }
            cursor.seek(second.end());
            match ChunkHeader::read(&mut cursor) {
                Ok(third) if third.tag == ChunkTag::Sgen => Some(FormatSubtype::SongIndexed),
                _ => Some(FormatSubtype::SongUnheadered),
            }
        }
        (ChunkTag::Mraw, ChunkTag::Hshd) => Some(FormatSubtype::ExternalMusic),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::super::chunk::test_support::{chunk, container, xor};
    use super::*;

    #[test]
    fn keys_are_tried_in_order() {
        assert_eq!(candidate_keys(None), vec![0x69, 0x00]);
        assert_eq!(candidate_keys(Some(0x42)), vec![0x42, 0x69, 0x00]);
        assert_eq!(candidate_keys(Some(0x69)), vec![0x69, 0x00]);
    }

    #[test]
    fn detects_xored_room_archive() {
        let plain = container(b"LECF", &[container(b"LFLF", &[chunk(b"TRNS", &[0, 0])])]);
        let data = xor(&plain, 0x69);
        let found = detect(&data, None).unwrap();
        assert_eq!(found.subtype, FormatSubtype::RoomsFramed);
        assert_eq!(found.key, 0x69);
    }

    #[test]
    fn detects_plain_dialogue_and_external_music() {
        let tlkb = container(b"TLKB", &[chunk(b"TALK", &[0; 4])]);
        assert_eq!(detect(&tlkb, None).unwrap(), Detection {
            subtype: FormatSubtype::Dialogue,
            key: 0
        });

        let mraw = container(b"MRAW", &[chunk(b"HSHD", &[0; 16])]);
        assert_eq!(detect(&mraw, None).unwrap().subtype, FormatSubtype::ExternalMusic);
    }

    #[test]
    fn song_layouts() {
        let indexed = container(b"SONG", &[chunk(b"SGHD", &[0; 4]), chunk(b"SGEN", &[0; 12])]);
        assert_eq!(detect(&indexed, None).unwrap().subtype, FormatSubtype::SongIndexed);

        let unheadered = container(b"SONG", &[chunk(b"SGHD", &[0; 4]), vec![0x80; 16]]);
        assert_eq!(detect(&unheadered, None).unwrap().subtype, FormatSubtype::SongUnheadered);

        let empty = container(b"SONG", &[chunk(b"SGHD", &[0; 8])]);
        assert_eq!(detect(&empty, None).unwrap().subtype, FormatSubtype::EmptySong);
    }

    #[test]
    fn rejects_size_mismatch_and_junk() {
        let mut data = container(b"LECF", &[chunk(b"LFLF", &[])]);
        data.push(0);
        assert!(matches!(detect(&data, None), Err(Error::UnrecognizedArchive)));
        assert!(matches!(detect(b"short", None), Err(Error::UnrecognizedArchive)));
    }

    #[test]
    fn only_one_key_validates() {
        let plain = container(b"LECF", &[chunk(b"LOFF", &[0; 5])]);
        let data = xor(&plain, 0x69);
        let valid: Vec<u8> = candidate_keys(Some(0x13))
            .into_iter()
            .filter(|&k| try_key(&data, k).is_some())
            .collect();
        assert_eq!(valid, vec![0x69]);
    }
}
