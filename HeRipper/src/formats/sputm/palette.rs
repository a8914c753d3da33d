//! Palette chunk reading (`APAL`, `RGBS`)

use crate::codec::palette::Palette;
use crate::error::Result;

use super::chunk::ChunkHeader;
use super::cursor::ByteCursor;

/// Payload length that means "index 0 only".
pub const SINGLE_ENTRY_PAYLOAD: usize = 4;

/// Read the RGB triples of a palette chunk.
///
/// A 4-byte payload is the single-entry form: one black entry at index 0,
/// never the start of a truncated full table.
pub fn read_palette(cursor: &mut ByteCursor<'_>, header: &ChunkHeader) -> Result<Palette> {
    if header.payload_len() == SINGLE_ENTRY_PAYLOAD {
        return Ok(Palette::single(0));
    }
    cursor.seek(header.payload_offset());
    let entries = header.payload_len() / 3;
    let bytes = cursor.read_bytes(entries * 3)?;
    Ok(Palette::from_rgb_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::super::chunk::test_support::chunk;
    use super::*;

    fn parse(data: &[u8]) -> Palette {
        let mut cursor = ByteCursor::new(data, 0);
        let header = ChunkHeader::read(&mut cursor).unwrap();
        read_palette(&mut cursor, &header).unwrap()
    }

    #[test]
    fn four_byte_payload_is_one_entry() {
        let palette = parse(&chunk(b"RGBS", &[0xFF, 0xFF, 0xFF, 0xFF]));
        assert_eq!(palette.len(), 1);
        assert_eq!(palette.get(0), 0);
    }

    #[test]
    fn full_table() {
        let bytes: Vec<u8> = (0..=255u8).flat_map(|i| [i, 0, 255 - i]).collect();
        let palette = parse(&chunk(b"APAL", &bytes));
        assert_eq!(palette.len(), 256);
        assert_eq!(palette.rgb(3), [3, 0, 252]);
    }
}
