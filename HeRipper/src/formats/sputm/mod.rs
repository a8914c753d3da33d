//! SPUTM chunk streams
//!
//! The low layers ([`cursor`], [`chunk`], [`wrap`]) know nothing about
//! what a chunk means. The family readers build typed records on top of
//! them, one module per family.

pub mod chunk;
pub mod costume;
pub mod cursor;
pub mod detect;
pub mod glyph;
pub mod object;
pub mod palette;
pub mod room;
pub mod sound;
pub mod wiz;
pub mod wrap;

// Public API
pub use chunk::{ChunkHeader, ChunkTag, RawChunk};
pub use costume::{Costume, read_akos};
pub use cursor::{ByteCursor, Endian};
pub use detect::{Detection, FormatSubtype, detect};
pub use glyph::{GlyphSet, read_char};
pub use room::{Room, RoomArchive, read_room, scan_lecf};
pub use sound::{MusicRef, SongEntry, Sound, read_digi_talk, read_song_table};
pub use wiz::{Multi, Wiz};
