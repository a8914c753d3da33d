//! Rip driver
//!
//! Detects what an archive is, parses it, runs the codecs and hands every
//! asset to an [`AssetSink`]. Recoverable problems become diagnostics and
//! are counted in the returned [`RipResults`]; only detection failure and
//! sink I/O errors stop a rip.
//!
//! # Example
//!
//! ```no_run
//! use heripper::rip::{RipOptions, rip_file};
//!
//! let results = rip_file("BASEBALL.HE1", "out/baseball", &RipOptions::default())?;
//! println!("{} images, {} sounds", results.graphics, results.audio);
//! # Ok::<(), heripper::Error>(())
//! ```

mod dmu;
pub mod inventory;
mod lecf;
pub mod options;
mod song;
mod tlkb;

use std::fs;
use std::path::Path;

pub use inventory::{ArchiveInventory, RoomSummary, inventory};
pub use options::{AssetKind, AssetSelection, RipOptions, RipResults};

use crate::audio::PcmBuffer;
use crate::codec::{Palette, Raster};
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::formats::sputm::{ByteCursor, FormatSubtype, detect};
use crate::resolver::Resolvers;
use crate::sink::{AssetSink, FileSink};

/// State of one archive rip.
struct Ripper<'a> {
    options: &'a RipOptions,
    sink: &'a mut dyn AssetSink,
    resolvers: Resolvers,
    diag: Diagnostics,
    results: RipResults,
    /// Palette chosen by `palette_index` across every room.
    forced_palette: Option<Palette>,
}

impl<'a> Ripper<'a> {
    fn new(options: &'a RipOptions, sink: &'a mut dyn AssetSink) -> Self {
        Self {
            options,
            sink,
            resolvers: Resolvers::new(options.rle_framing, options.two_color),
            diag: Diagnostics::new(),
            results: RipResults::default(),
            forced_palette: None,
        }
    }

    /// Emit a still image. Empty images are dropped without counting.
    fn image(&mut self, name: &str, raster: &Raster) -> Result<()> {
        if raster.width() == 0 || raster.height() == 0 {
            tracing::debug!(name, "empty image");
            return Ok(());
        }
        self.sink.emit_raster(name, raster)?;
        self.results.graphics += 1;
        Ok(())
    }

    /// Emit one animation frame.
    fn frame(&mut self, name: &str, raster: &Raster) -> Result<()> {
        if raster.width() == 0 || raster.height() == 0 {
            return Ok(());
        }
        self.sink.emit_raster(name, raster)?;
        self.results.animation_frames += 1;
        Ok(())
    }

    /// Normalise and trim a sound as configured, then emit it.
    fn sound(&mut self, name: &str, pcm: &PcmBuffer) -> Result<()> {
        let pcm = if self.options.normalize {
            pcm.normalized()
        } else {
            pcm.clone()
        };
        let pcm = pcm.trimmed(self.options.trim_start, self.options.trim_end);
        self.sink.emit_samples(name, &pcm)?;
        self.results.audio += 1;
        Ok(())
    }

    /// Emit an embedded RIFF file, decoded or copied as `<name>.wav`.
    fn riff(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        if !self.options.decodes_riff() {
            self.sink.emit_raw_bytes(&format!("{name}.wav"), bytes)?;
            self.results.audio += 1;
            return Ok(());
        }
        match PcmBuffer::from_riff(bytes) {
            Ok(pcm) => self.sound(name, &pcm),
            Err(err) => {
                self.diag.record(&err, None);
                Ok(())
            }
        }
    }

    fn finish(mut self) -> RipResults {
        self.results.warnings = self.diag.warnings();
        self.results.errors = self.diag.errors();
        self.results
    }
}

/// Rip an archive held in memory.
///
/// # Errors
///
/// Returns [`Error::UnrecognizedArchive`](crate::Error::UnrecognizedArchive)
/// when the buffer is not a SPUTM archive, or the first error the sink
/// reports.
pub fn rip_bytes(data: &[u8], options: &RipOptions, sink: &mut dyn AssetSink) -> Result<RipResults> {
    let detection = detect(data, options.key)?;
    tracing::info!(subtype = %detection.subtype, key = detection.key, "ripping archive");

    let mut ripper = Ripper::new(options, sink);
    ripper.results.detection = Some(detection);
    let mut cursor = ByteCursor::new(data, detection.key);

    if options.decode_only {
        ripper.sink.emit_raw_bytes("decoded", &cursor.decoded())?;
        return Ok(ripper.finish());
    }

    match detection.subtype {
        FormatSubtype::RoomsFramed | FormatSubtype::RoomsIndexed => ripper.rip_lecf(&mut cursor)?,
        FormatSubtype::Dialogue => ripper.rip_tlkb(&mut cursor)?,
        FormatSubtype::SongUnheadered | FormatSubtype::SongIndexed => {
            ripper.rip_song(&mut cursor, detection.subtype)?;
        }
        FormatSubtype::ExternalMusic => ripper.rip_dmu(&mut cursor, "dmu")?,
        FormatSubtype::EmptySong => tracing::info!("song archive holds no entries"),
    }

    let results = ripper.finish();
    tracing::info!(
        graphics = results.graphics,
        audio = results.audio,
        warnings = results.warnings,
        errors = results.errors,
        "rip finished"
    );
    Ok(results)
}

/// Rip an archive file, writing assets next to `out_prefix`.
///
/// The prefix's parent directory is created if needed. External music is
/// looked up beside the archive unless `source_dir` says otherwise.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not a SPUTM archive,
/// or an asset cannot be written.
pub fn rip_file<P: AsRef<Path>, Q: AsRef<Path>>(path: P, out_prefix: Q, options: &RipOptions) -> Result<RipResults> {
    let path = path.as_ref();
    let out_prefix = out_prefix.as_ref();
    let data = fs::read(path)?;

    if let Some(parent) = out_prefix.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut options = options.clone();
    if options.source_dir.is_none() {
        options.source_dir = path.parent().map(Path::to_path_buf);
    }

    let _span = tracing::info_span!("rip", file = %path.display()).entered();
    let mut sink = FileSink::new(out_prefix);
    rip_bytes(&data, &options, &mut sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::formats::sputm::chunk::test_support::{chunk, container, le16, xor};
    use crate::sink::MemorySink;

    fn hshd(rate: u16) -> Vec<u8> {
        let mut words = [le16(0); 8];
        words[3] = le16(rate);
        chunk(b"HSHD", &words.concat())
    }

    #[test]
    fn decode_only_dumps_the_decoded_buffer() {
        let plain = container(b"LECF", &[container(b"LFLF", &[chunk(b"TRNS", &le16(0))])]);
        let data = xor(&plain, 0x69);
        let mut sink = MemorySink::new();
        let options = RipOptions::new().with_decode_only(true);
        let results = rip_bytes(&data, &options, &mut sink).unwrap();
        assert_eq!(sink.blobs["decoded"], plain);
        assert_eq!(results.assets(), 0);
        assert_eq!(results.detection.map(|d| d.key), Some(0x69));
    }

    #[test]
    fn unrecognised_input_is_fatal() {
        let mut sink = MemorySink::new();
        let err = rip_bytes(&[0u8; 64], &RipOptions::default(), &mut sink).unwrap_err();
        assert!(matches!(err, Error::UnrecognizedArchive));
    }

    #[test]
    fn empty_song_rips_nothing() {
        let data = container(b"SONG", &[chunk(b"SGHD", &[0; 8])]);
        let mut sink = MemorySink::new();
        let results = rip_bytes(&data, &RipOptions::default(), &mut sink).unwrap();
        assert_eq!(results.assets(), 0);
        assert!(sink.names().is_empty());
    }

    #[test]
    fn riff_payloads_are_copied_unless_decoding() {
        let wav = PcmBuffer::unsigned_8bit(vec![0x10, 0x20], 11025).to_wav_bytes().unwrap();
        let data = container(b"TLKB", &[container(b"WSOU", &[wav.clone()])]);

        let mut copied = MemorySink::new();
        rip_bytes(&data, &RipOptions::default(), &mut copied).unwrap();
        assert_eq!(copied.blobs["tlkb-wsou-0.wav"], wav);

        let mut decoded = MemorySink::new();
        let options = RipOptions::new().with_normalize(true);
        let results = rip_bytes(&data, &options, &mut decoded).unwrap();
        assert_eq!(results.audio, 1);
        assert!(decoded.samples.contains_key("tlkb-wsou-0"));
    }

    #[test]
    fn sounds_are_trimmed() {
        let talk = container(b"TALK", &[hshd(11025), chunk(b"SDAT", &[1, 2, 3, 4, 5])]);
        let data = container(b"TLKB", &[talk]);
        let mut sink = MemorySink::new();
        let options = RipOptions::new().with_trim(1, 2);
        rip_bytes(&data, &options, &mut sink).unwrap();
        assert_eq!(sink.samples["tlkb-talk-0"].data, vec![2, 3]);
    }

    #[test]
    fn rip_file_creates_the_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("TALKIE.HE2");
        let talk = container(b"TALK", &[hshd(11025), chunk(b"SDAT", &[0x80; 4])]);
        fs::write(&source, container(b"TLKB", &[talk])).unwrap();

        let prefix = dir.path().join("out").join("talkie");
        let results = rip_file(&source, &prefix, &RipOptions::default()).unwrap();
        assert_eq!(results.audio, 1);
        assert!(dir.path().join("out").join("talkie-tlkb-talk-0.wav").is_file());
    }
}
