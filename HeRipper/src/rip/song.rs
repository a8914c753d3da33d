//! Music container rip (`SONG`)

use crate::audio::{DEFAULT_SAMPLE_RATE, PcmBuffer};
use crate::diagnostics::DiagnosticKind;
use crate::error::Result;
use crate::formats::sputm::{ByteCursor, ChunkHeader, ChunkTag, FormatSubtype, RawChunk, SongEntry, read_digi_talk, read_song_table};

use super::Ripper;

impl Ripper<'_> {
    pub(super) fn rip_song(&mut self, cursor: &mut ByteCursor<'_>, subtype: FormatSubtype) -> Result<()> {
        ChunkHeader::expect(cursor, ChunkTag::Song)?;
        let entries = read_song_table(cursor, subtype, &mut self.diag)?;
        tracing::info!(entries = entries.len(), "song table");

        for (i, entry) in entries.iter().enumerate() {
            if self.options.past_range(i) {
                break;
            }
            if self.options.in_range(i) {
                self.rip_song_entry(cursor, i, entry)?;
            }
        }
        Ok(())
    }

    /// Entries are `DIGI`, `RIFF`, or bare samples when the tag is unknown.
    fn rip_song_entry(&mut self, cursor: &mut ByteCursor<'_>, i: usize, entry: &SongEntry) -> Result<()> {
        let offset = entry.offset as usize;
        cursor.seek(offset);
        let tag = match cursor.read_tag() {
            Ok(fourcc) => ChunkTag::from_fourcc(&fourcc),
            Err(err) => {
                self.diag.record(&err, Some(offset));
                return Ok(());
            }
        };
        cursor.seek(offset);

        match tag {
            ChunkTag::Digi => match read_digi_talk(cursor, &mut self.diag) {
                Ok(sound) => self.sound(&format!("song-digi-{i}"), &sound.pcm)?,
                Err(err) => self.diag.record(&err, Some(offset)),
            },
            ChunkTag::Riff => match RawChunk::read_next(cursor) {
                Ok(riff) => self.riff(&format!("song-riff-{i}"), &riff.bytes)?,
                Err(err) => self.diag.record(&err, Some(offset)),
            },
            ChunkTag::Unknown => match cursor.read_bytes(entry.length as usize) {
                Ok(data) => {
                    let pcm = PcmBuffer::unsigned_8bit(data, DEFAULT_SAMPLE_RATE);
                    self.sound(&format!("song-unheadered-{i}"), &pcm)?;
                }
                Err(err) => self.diag.record(&err, Some(offset)),
            },
            other => self.diag.error(
                DiagnosticKind::StructuralMismatch,
                Some(offset),
                format!("song entry {i} (id {}) holds an unexpected {}", entry.id, other.as_str()),
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::audio::PcmBuffer;
    use crate::formats::sputm::chunk::test_support::{chunk, container, le32};
    use crate::rip::{RipOptions, rip_bytes};
    use crate::sink::MemorySink;

    /// Unheadered song: 25-byte SGHD records pointing at payloads laid out
    /// after the table.
    fn unheadered_song(payloads: &[Vec<u8>]) -> Vec<u8> {
        let sghd_len = 8 + 4 + 25 * payloads.len();
        let mut at = 8 + sghd_len;
        let mut sghd = le32(payloads.len() as u32).to_vec();
        for (id, payload) in payloads.iter().enumerate() {
            let mut record = [le32(id as u32), le32(at as u32), le32(payload.len() as u32)].concat();
            record.resize(25, 0);
            sghd.extend_from_slice(&record);
            at += payload.len();
        }
        let mut children = vec![chunk(b"SGHD", &sghd)];
        children.extend(payloads.iter().cloned());
        container(b"SONG", &children)
    }

    #[test]
    fn entries_by_payload_kind() {
        let digi = container(b"DIGI", &[chunk(b"SDAT", &[7, 7])]);
        let riff = PcmBuffer::unsigned_8bit(vec![1, 2, 3], 22050).to_wav_bytes().unwrap();
        let bare = vec![0x80, 0x81, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88];
        let data = unheadered_song(&[bare.clone(), digi, riff.clone()]);

        let mut sink = MemorySink::new();
        let results = rip_bytes(&data, &RipOptions::default(), &mut sink).unwrap();
        assert_eq!(results.audio, 3);
        assert_eq!(sink.samples["song-unheadered-0"].data, bare);
        assert_eq!(sink.samples["song-unheadered-0"].sample_rate, 11025);
        assert_eq!(sink.samples["song-digi-1"].data, vec![7, 7]);
        assert_eq!(sink.blobs["song-riff-2.wav"], riff);
    }

    #[test]
    fn entry_range_applies() {
        let payloads: Vec<Vec<u8>> = (0..4u8).map(|n| vec![n; 9]).collect();
        let data = unheadered_song(&payloads);
        let mut sink = MemorySink::new();
        let options = RipOptions::new().with_range(Some(1), Some(2));
        rip_bytes(&data, &options, &mut sink).unwrap();
        assert_eq!(sink.names(), vec!["song-unheadered-1", "song-unheadered-2"]);
    }
}
