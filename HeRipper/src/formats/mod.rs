//! Archive format handlers
//!
//! Every archive family these titles ship (room data, dialogue bundles,
//! music containers, raw external music) is a SPUTM chunk stream.

pub mod sputm;

pub use sputm::{ByteCursor, ChunkHeader, ChunkTag, Detection, FormatSubtype, RawChunk, detect};
