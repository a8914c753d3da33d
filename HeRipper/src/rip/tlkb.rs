//! Dialogue bundle rip (`TLKB`)

use crate::diagnostics::DiagnosticKind;
use crate::error::Result;
use crate::formats::sputm::chunk::HEADER_SIZE;
use crate::formats::sputm::sound::read_wsou;
use crate::formats::sputm::{ByteCursor, ChunkHeader, ChunkTag, read_digi_talk};

use super::Ripper;

/// Signatures the resync scan looks for, in order.
const RESYNC_TAGS: [&[u8; 4]; 2] = [b"TALK", b"WSOU"];

impl Ripper<'_> {
    pub(super) fn rip_tlkb(&mut self, cursor: &mut ByteCursor<'_>) -> Result<()> {
        let header = ChunkHeader::expect(cursor, ChunkTag::Tlkb)?;
        let end = header.end().min(cursor.len());
        let mut number = 0usize;

        while cursor.tell() < end {
            let child = match ChunkHeader::peek(cursor) {
                Ok(child) => child,
                Err(err) => {
                    self.diag.record(&err, Some(cursor.tell()));
                    break;
                }
            };

            match child.tag {
                ChunkTag::Talk => {
                    match read_digi_talk(cursor, &mut self.diag) {
                        Ok(sound) => self.sound(&format!("tlkb-talk-{number}"), &sound.pcm)?,
                        Err(err) => self.diag.record(&err, Some(child.offset)),
                    }
                    number += 1;
                }
                ChunkTag::Wsou => {
                    match read_wsou(cursor, &mut self.diag) {
                        Ok(wave) => {
                            for (j, riff) in wave.riffs.iter().enumerate() {
                                let name = if wave.riffs.len() == 1 {
                                    format!("tlkb-wsou-{number}")
                                } else {
                                    format!("tlkb-wsou-{number}-riff-{j}")
                                };
                                self.riff(&name, &riff.bytes)?;
                            }
                        }
                        Err(err) => self.diag.record(&err, Some(child.offset)),
                    }
                    number += 1;
                }
                _ => {
                    self.diag.error(
                        DiagnosticKind::StructuralMismatch,
                        Some(child.offset),
                        format!("unexpected {} in TLKB, scanning for the next sound", child.name()),
                    );
                    if resync(cursor, child.offset + 1).is_none() {
                        tracing::warn!(offset = child.offset, "no further sounds found in TLKB");
                        break;
                    }
                    continue;
                }
            }

            cursor.seek(child.end().max(child.offset + HEADER_SIZE));
        }
        Ok(())
    }
}

/// Find the next plausible `TALK`, or failing that `WSOU`, at or after
/// `from`. A match counts only if its header lies fully in the buffer with
/// a length of at least one header. Leaves the cursor on the match.
fn resync(cursor: &mut ByteCursor<'_>, from: usize) -> Option<usize> {
    for tag in RESYNC_TAGS {
        cursor.seek(from);
        let Some(found) = cursor.scan_for(tag) else {
            continue;
        };
        let valid = ChunkHeader::peek(cursor)
            .is_ok_and(|header| header.is_plausible() && header.end() <= cursor.len());
        if valid {
            tracing::info!(offset = found, tag = %String::from_utf8_lossy(tag), "resynced");
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::sputm::chunk::test_support::{chunk, container, le16};
    use crate::rip::{RipOptions, rip_bytes};
    use crate::sink::MemorySink;

    fn talk(samples: &[u8]) -> Vec<u8> {
        let mut words = [le16(0); 8];
        words[3] = le16(11025);
        container(b"TALK", &[chunk(b"HSHD", &words.concat()), chunk(b"SDAT", samples)])
    }

    #[test]
    fn talk_entries_are_numbered_in_order() {
        let data = container(b"TLKB", &[talk(&[1]), talk(&[2, 2])]);
        let mut sink = MemorySink::new();
        let results = rip_bytes(&data, &RipOptions::default(), &mut sink).unwrap();
        assert_eq!(results.audio, 2);
        assert_eq!(sink.samples["tlkb-talk-1"].data, vec![2, 2]);
    }

    #[test]
    fn junk_between_entries_is_skipped_by_resync() {
        let data = container(
            b"TLKB",
            &[talk(&[1]), chunk(b"JUNK", &[0xAA; 6]), talk(&[3])],
        );
        let mut sink = MemorySink::new();
        let results = rip_bytes(&data, &RipOptions::default(), &mut sink).unwrap();
        assert_eq!(results.audio, 2);
        assert_eq!(results.errors, 1);
        assert_eq!(sink.samples["tlkb-talk-1"].data, vec![3]);
    }

    #[test]
    fn resync_rejects_a_signature_running_past_the_end() {
        let mut data = vec![0u8; 4];
        data.extend_from_slice(b"TALK");
        data.extend_from_slice(&0x1000u32.to_be_bytes());
        let mut cursor = ByteCursor::new(&data, 0);
        assert_eq!(resync(&mut cursor, 0), None);

        let mut data = vec![0u8; 4];
        data.extend_from_slice(&chunk(b"WSOU", &[]));
        let mut cursor = ByteCursor::new(&data, 0);
        assert_eq!(resync(&mut cursor, 0), Some(4));
        assert_eq!(cursor.tell(), 4);
    }
}
