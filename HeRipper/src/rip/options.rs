//! Rip configuration and results

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::formats::sputm::detect::Detection;
use crate::resolver::{RleFraming, TwoColorMode};

/// One class of asset the ripper can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Room backgrounds.
    Rmim,
    /// Object images.
    Obim,
    /// Costume components and auxiliary frames.
    Akos,
    /// Costume animation sequences.
    Sequences,
    /// Wiz images, standalone and inside `MULT`.
    Awiz,
    /// Glyph sets.
    Char,
    Digi,
    Talk,
    Wsou,
    /// External music files named by `FMUS`.
    Extdmu,
    /// Subtitles.
    Tlke,
    Scripts,
    Metadata,
}

impl AssetKind {
    pub const ALL: [AssetKind; 13] = [
        AssetKind::Rmim,
        AssetKind::Obim,
        AssetKind::Akos,
        AssetKind::Sequences,
        AssetKind::Awiz,
        AssetKind::Char,
        AssetKind::Digi,
        AssetKind::Talk,
        AssetKind::Wsou,
        AssetKind::Extdmu,
        AssetKind::Tlke,
        AssetKind::Scripts,
        AssetKind::Metadata,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::Rmim => "rmim",
            AssetKind::Obim => "obim",
            AssetKind::Akos => "akos",
            AssetKind::Sequences => "sequences",
            AssetKind::Awiz => "awiz",
            AssetKind::Char => "char",
            AssetKind::Digi => "digi",
            AssetKind::Talk => "talk",
            AssetKind::Wsou => "wsou",
            AssetKind::Extdmu => "extdmu",
            AssetKind::Tlke => "tlke",
            AssetKind::Scripts => "scripts",
            AssetKind::Metadata => "metadata",
        }
    }

    pub fn is_sound(self) -> bool {
        matches!(
            self,
            AssetKind::Digi | AssetKind::Talk | AssetKind::Wsou | AssetKind::Extdmu
        )
    }

    pub fn is_graphics(self) -> bool {
        matches!(
            self,
            AssetKind::Rmim | AssetKind::Obim | AssetKind::Akos | AssetKind::Awiz | AssetKind::Char
        )
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown asset kind '{s}'"))
    }
}

/// Which asset classes a rip emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSelection {
    enabled: Vec<AssetKind>,
}

impl Default for AssetSelection {
    /// Everything except sequences and scripts.
    fn default() -> Self {
        Self::from_kinds(
            AssetKind::ALL
                .into_iter()
                .filter(|k| !matches!(k, AssetKind::Sequences | AssetKind::Scripts)),
        )
    }
}

impl AssetSelection {
    pub fn from_kinds(kinds: impl IntoIterator<Item = AssetKind>) -> Self {
        let mut selection = Self::none();
        for kind in kinds {
            selection.set(kind, true);
        }
        selection
    }

    #[must_use]
    pub fn all() -> Self {
        Self::from_kinds(AssetKind::ALL)
    }

    #[must_use]
    pub fn none() -> Self {
        Self { enabled: Vec::new() }
    }

    /// Sounds only: DIGI, TALK, WSOU and external music.
    #[must_use]
    pub fn sound_only() -> Self {
        Self::from_kinds(AssetKind::ALL.into_iter().filter(|k| k.is_sound()))
    }

    /// Still images only: backgrounds, objects, costumes, wiz images and glyphs.
    #[must_use]
    pub fn graphics_only() -> Self {
        Self::from_kinds(AssetKind::ALL.into_iter().filter(|k| k.is_graphics()))
    }

    pub fn set(&mut self, kind: AssetKind, enabled: bool) {
        let present = self.enabled.contains(&kind);
        if enabled && !present {
            self.enabled.push(kind);
            self.enabled.sort_by_key(|k| *k as u8);
        } else if !enabled && present {
            self.enabled.retain(|&k| k != kind);
        }
    }

    pub fn is_enabled(&self, kind: AssetKind) -> bool {
        self.enabled.contains(&kind)
    }

    pub fn kinds(&self) -> &[AssetKind] {
        &self.enabled
    }
}

/// Settings for one rip.
///
/// # Example
///
/// ```no_run
/// use heripper::rip::{AssetKind, AssetSelection, RipOptions};
///
/// let options = RipOptions::new()
///     .with_selection(AssetSelection::graphics_only())
///     .with_asset(AssetKind::Sequences, true)
///     .with_local_palettes(true);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RipOptions {
    /// Decoding byte tried before the default candidates.
    pub key: Option<u8>,
    pub selection: AssetSelection,
    /// Append every script to one `scripts` file with start/end markers.
    pub concat_scripts: bool,
    /// First room (or song entry) to rip, counting from 0.
    pub first_entry: Option<usize>,
    /// Last room (or song entry) to rip, inclusive.
    pub last_entry: Option<usize>,
    /// Index into the palettes of every room, in file order. Forces that
    /// palette onto every image.
    pub palette_index: Option<usize>,
    /// Prefer costume and wiz palettes over the room's.
    pub local_palettes: bool,
    /// Fill index written where images are transparent; defaults to the
    /// room's `TRNS`.
    pub transparency: Option<u8>,
    pub rle_framing: Option<RleFraming>,
    pub two_color: Option<TwoColorMode>,
    /// Emit the XOR-decoded archive and nothing else.
    pub decode_only: bool,
    /// Decode embedded RIFF files instead of copying them.
    pub decode_audio: bool,
    /// Peak-normalise every sound. Implies `decode_audio`.
    pub normalize: bool,
    /// Bytes dropped from the start of each sound.
    pub trim_start: usize,
    /// Bytes dropped from the end of each sound.
    pub trim_end: usize,
    /// Directory external music files are looked up in.
    pub source_dir: Option<PathBuf>,
}

impl Default for RipOptions {
    fn default() -> Self {
        Self {
            key: None,
            selection: AssetSelection::default(),
            concat_scripts: false,
            first_entry: None,
            last_entry: None,
            palette_index: None,
            local_palettes: false,
            transparency: None,
            rle_framing: None,
            two_color: None,
            decode_only: false,
            decode_audio: false,
            normalize: false,
            trim_start: 0,
            trim_end: 0,
            source_dir: None,
        }
    }
}

impl RipOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an asset class is selected.
    pub fn wants(&self, kind: AssetKind) -> bool {
        self.selection.is_enabled(kind)
    }

    /// Whether entry `n` lies inside the configured range.
    pub fn in_range(&self, n: usize) -> bool {
        self.first_entry.is_none_or(|first| n >= first) && self.last_entry.is_none_or(|last| n <= last)
    }

    /// Whether entry `n` lies past the end of the range.
    pub fn past_range(&self, n: usize) -> bool {
        self.last_entry.is_some_and(|last| n > last)
    }

    /// RIFF payloads are decoded rather than copied.
    pub fn decodes_riff(&self) -> bool {
        self.decode_audio || self.normalize
    }

    #[must_use]
    pub fn with_key(mut self, key: Option<u8>) -> Self {
        self.key = key;
        self
    }

    #[must_use]
    pub fn with_selection(mut self, selection: AssetSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Enable or disable one asset class.
    #[must_use]
    pub fn with_asset(mut self, kind: AssetKind, enabled: bool) -> Self {
        self.selection.set(kind, enabled);
        self
    }

    #[must_use]
    pub fn with_concat_scripts(mut self, concat: bool) -> Self {
        self.concat_scripts = concat;
        self
    }

    /// Restrict the rip to rooms or song entries `first..=last`.
    #[must_use]
    pub fn with_range(mut self, first: Option<usize>, last: Option<usize>) -> Self {
        self.first_entry = first;
        self.last_entry = last;
        self
    }

    #[must_use]
    pub fn with_palette_index(mut self, index: Option<usize>) -> Self {
        self.palette_index = index;
        self
    }

    #[must_use]
    pub fn with_local_palettes(mut self, local: bool) -> Self {
        self.local_palettes = local;
        self
    }

    #[must_use]
    pub fn with_transparency(mut self, index: Option<u8>) -> Self {
        self.transparency = index;
        self
    }

    #[must_use]
    pub fn with_rle_framing(mut self, framing: Option<RleFraming>) -> Self {
        self.rle_framing = framing;
        self
    }

    #[must_use]
    pub fn with_two_color(mut self, mode: Option<TwoColorMode>) -> Self {
        self.two_color = mode;
        self
    }

    #[must_use]
    pub fn with_decode_only(mut self, decode_only: bool) -> Self {
        self.decode_only = decode_only;
        self
    }

    #[must_use]
    pub fn with_decode_audio(mut self, decode: bool) -> Self {
        self.decode_audio = decode;
        self
    }

    #[must_use]
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    #[must_use]
    pub fn with_trim(mut self, start: usize, end: usize) -> Self {
        self.trim_start = start;
        self.trim_end = end;
        self
    }

    #[must_use]
    pub fn with_source_dir<P: Into<PathBuf>>(mut self, dir: Option<P>) -> Self {
        self.source_dir = dir.map(Into::into);
        self
    }
}

/// Counters returned by a rip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RipResults {
    /// What the archive was detected as.
    pub detection: Option<Detection>,
    pub graphics: usize,
    pub animations: usize,
    pub animation_frames: usize,
    pub audio: usize,
    pub strings: usize,
    pub scripts: usize,
    pub warnings: usize,
    pub errors: usize,
}

impl RipResults {
    /// Total assets emitted.
    pub fn assets(&self) -> usize {
        self.graphics + self.animation_frames + self.audio + self.strings + self.scripts
    }

    /// Add another rip's counters to these.
    pub fn absorb(&mut self, other: &RipResults) {
        self.graphics += other.graphics;
        self.animations += other.animations;
        self.animation_frames += other.animation_frames;
        self.audio += other.audio;
        self.strings += other.strings;
        self.scripts += other.scripts;
        self.warnings += other.warnings;
        self.errors += other.errors;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_selection_skips_sequences_and_scripts() {
        let options = RipOptions::default();
        assert!(options.wants(AssetKind::Rmim));
        assert!(options.wants(AssetKind::Metadata));
        assert!(!options.wants(AssetKind::Sequences));
        assert!(!options.wants(AssetKind::Scripts));
        assert!(!options.concat_scripts);
    }

    #[test]
    fn presets() {
        let sound = AssetSelection::sound_only();
        assert_eq!(
            sound.kinds(),
            &[AssetKind::Digi, AssetKind::Talk, AssetKind::Wsou, AssetKind::Extdmu]
        );
        let graphics = AssetSelection::graphics_only();
        assert!(graphics.is_enabled(AssetKind::Char));
        assert!(!graphics.is_enabled(AssetKind::Digi));
    }

    #[test]
    fn ranges() {
        let options = RipOptions::new().with_range(Some(2), Some(4));
        assert!(!options.in_range(1));
        assert!(options.in_range(2) && options.in_range(4));
        assert!(!options.in_range(5));
        assert!(options.past_range(5));
        assert!(RipOptions::new().in_range(1000));
    }

    #[test]
    fn kinds_parse_case_insensitively() {
        assert_eq!("AKOS".parse::<AssetKind>(), Ok(AssetKind::Akos));
        assert!("pictures".parse::<AssetKind>().is_err());
    }

    #[test]
    fn options_serialize_for_show_config() {
        let options = RipOptions::new().with_key(Some(0x69)).with_two_color(Some(TwoColorMode::Bitmap));
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["key"], 0x69);
        assert_eq!(json["two_color"], "bitmap");
        assert_eq!(json["selection"]["enabled"][0], "rmim");
    }
}
