//! Asset sinks
//!
//! The rip driver hands every decoded asset to an [`AssetSink`] under a
//! stable name such as `room-3-rmim-0` or `akos-2-sequence-1-frame-4`.
//! [`FileSink`] writes PNG, WAV and plain files next to an output prefix;
//! [`MemorySink`] keeps everything in memory.

use std::collections::{BTreeMap, HashSet};
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::audio::PcmBuffer;
use crate::codec::raster::Raster;
use crate::error::Result;

/// Receiver for decoded assets.
pub trait AssetSink {
    /// A decoded image. The raster carries its palette, or is direct RGB.
    fn emit_raster(&mut self, name: &str, raster: &Raster) -> Result<()>;

    /// A decoded sound.
    fn emit_samples(&mut self, name: &str, pcm: &PcmBuffer) -> Result<()>;

    /// Text, appended to whatever was emitted under `name` earlier in the run.
    fn emit_text(&mut self, name: &str, text: &str) -> Result<()>;

    /// Opaque bytes, appended like [`emit_text`](Self::emit_text).
    fn emit_raw_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<()>;
}

/// Encode a raster as an RGB8 PNG.
pub fn encode_png(raster: &Raster) -> Result<Vec<u8>> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(
        &raster.to_rgb8(),
        raster.width() as u32,
        raster.height() as u32,
        ExtendedColorType::Rgb8,
    )?;
    Ok(png)
}

/// Writes every asset to `<prefix>-<name>[.ext]`.
#[derive(Debug)]
pub struct FileSink {
    prefix: PathBuf,
    opened: HashSet<String>,
    written: Vec<PathBuf>,
}

impl FileSink {
    /// Sink writing next to `prefix`, e.g. `out/game` gives `out/game-room-1-rmim-0.png`.
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            opened: HashSet::new(),
            written: Vec::new(),
        }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// Files created so far, in creation order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn path_for(&self, name: &str, extension: &str) -> PathBuf {
        let mut file = OsString::from(self.prefix.as_os_str());
        file.push("-");
        file.push(name);
        file.push(extension);
        PathBuf::from(file)
    }

    fn create(&mut self, path: PathBuf) -> Result<BufWriter<File>> {
        let file = File::create(&path)?;
        self.written.push(path);
        Ok(BufWriter::new(file))
    }

    /// Truncate on the first write of a run, append afterwards.
    fn append(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(name, "");
        let mut writer = if self.opened.insert(name.to_string()) {
            self.create(path)?
        } else {
            BufWriter::new(OpenOptions::new().append(true).open(&path)?)
        };
        writer.write_all(bytes)?;
        writer.flush()?;
        Ok(())
    }
}

impl AssetSink for FileSink {
    fn emit_raster(&mut self, name: &str, raster: &Raster) -> Result<()> {
        if raster.width() == 0 || raster.height() == 0 {
            tracing::debug!(name, "skipping empty image");
            return Ok(());
        }
        let png = encode_png(raster)?;
        let mut writer = self.create(self.path_for(name, ".png"))?;
        writer.write_all(&png)?;
        writer.flush()?;
        Ok(())
    }

    fn emit_samples(&mut self, name: &str, pcm: &PcmBuffer) -> Result<()> {
        let mut writer = self.create(self.path_for(name, ".wav"))?;
        pcm.write_wav(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    fn emit_text(&mut self, name: &str, text: &str) -> Result<()> {
        self.append(name, text.as_bytes())
    }

    fn emit_raw_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.append(name, bytes)
    }
}

/// Collects assets in memory, keyed by name.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub rasters: BTreeMap<String, Raster>,
    pub samples: BTreeMap<String, PcmBuffer>,
    pub texts: BTreeMap<String, String>,
    pub blobs: BTreeMap<String, Vec<u8>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every emitted name, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .rasters
            .keys()
            .chain(self.samples.keys())
            .chain(self.texts.keys())
            .chain(self.blobs.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }
}

impl AssetSink for MemorySink {
    fn emit_raster(&mut self, name: &str, raster: &Raster) -> Result<()> {
        self.rasters.insert(name.to_string(), raster.clone());
        Ok(())
    }

    fn emit_samples(&mut self, name: &str, pcm: &PcmBuffer) -> Result<()> {
        self.samples.insert(name.to_string(), pcm.clone());
        Ok(())
    }

    fn emit_text(&mut self, name: &str, text: &str) -> Result<()> {
        self.texts.entry(name.to_string()).or_default().push_str(text);
        Ok(())
    }

    fn emit_raw_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.blobs
            .entry(name.to_string())
            .or_default()
            .extend_from_slice(bytes);
        Ok(())
    }
}
