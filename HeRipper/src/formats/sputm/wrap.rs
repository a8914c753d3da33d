//! Offset wrappers (`WRAP` holding an `OFFS` table)
//!
//! Multi-palette storage, auxiliary costume frames, multi-image storage
//! and sequence metadata all index their entries through one of these.

use crate::diagnostics::Diagnostics;
use crate::error::Result;

use super::chunk::{ChunkHeader, ChunkTag};
use super::cursor::ByteCursor;

/// What the `OFFS` offsets are counted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetBase {
    /// Start of the `OFFS` chunk.
    TableStart,
    /// First byte after the `OFFS` chunk.
    TableEnd,
}

/// Read a `WRAP` at the cursor and decode each entry it points at.
///
/// `entry` is called with the cursor on the entry. A failing entry is
/// reported and skipped. The cursor is left at the end of the wrapper.
pub fn read_wrapped<T, F>(
    cursor: &mut ByteCursor<'_>,
    diag: &mut Diagnostics,
    base: OffsetBase,
    mut entry: F,
) -> Result<Vec<T>>
where
    F: FnMut(&mut ByteCursor<'_>, &mut Diagnostics) -> Result<T>,
{
    let wrap = ChunkHeader::expect(cursor, ChunkTag::Wrap)?;
    let offs = ChunkHeader::expect(cursor, ChunkTag::Offs)?;
    let count = offs.payload_len() / 4;
    let offsets = (0..count)
        .map(|_| cursor.read_u32_le())
        .collect::<Result<Vec<u32>>>()?;

    let origin = match base {
        OffsetBase::TableStart => offs.offset,
        OffsetBase::TableEnd => offs.end(),
    };
    let mut entries = Vec::with_capacity(count);
    for offset in offsets {
        let at = origin + offset as usize;
        cursor.seek(at);
        match entry(cursor, diag) {
            Ok(value) => entries.push(value),
            Err(err) => diag.record(&err, Some(at)),
        }
    }
    cursor.seek(wrap.end());
    Ok(entries)
}
