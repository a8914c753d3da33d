//! External music rip (`MRAW`)

use crate::error::Result;
use crate::formats::sputm::{ByteCursor, read_digi_talk};

use super::Ripper;

impl Ripper<'_> {
    /// Rip the single sound of an `MRAW` file. Its samples are signed and
    /// are written unsigned like every other sound.
    pub(super) fn rip_dmu(&mut self, cursor: &mut ByteCursor<'_>, name: &str) -> Result<()> {
        cursor.seek(0);
        let sound = match read_digi_talk(cursor, &mut self.diag) {
            Ok(sound) => sound,
            Err(err) => {
                self.diag.record(&err, Some(0));
                return Ok(());
            }
        };
        let mut pcm = sound.pcm;
        pcm.signed = true;
        self.sound(name, &pcm.into_unsigned())
    }
}

#[cfg(test)]
mod tests {
    use crate::formats::sputm::chunk::test_support::{chunk, container, le16};
    use crate::rip::{RipOptions, rip_bytes};
    use crate::sink::MemorySink;

    #[test]
    fn signed_samples_become_unsigned() {
        let mut words = [le16(0); 8];
        words[3] = le16(22050);
        let data = container(
            b"MRAW",
            &[chunk(b"HSHD", &words.concat()), chunk(b"SDAT", &[0x00, 0x80, 0xFF])],
        );
        let mut sink = MemorySink::new();
        let results = rip_bytes(&data, &RipOptions::default(), &mut sink).unwrap();
        assert_eq!(results.audio, 1);
        let pcm = &sink.samples["dmu"];
        assert_eq!(pcm.data, vec![0x80, 0x00, 0x7F]);
        assert_eq!(pcm.sample_rate, 22050);
        assert!(!pcm.signed);
    }
}
