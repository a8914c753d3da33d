use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

use crate::resolver::{RleFraming, TwoColorMode};
use crate::rip::{AssetKind, AssetSelection, RipOptions};

pub mod decode;
pub mod detect;
pub mod list;
pub mod rip;

/// Asset classes named on the command line, including the presets
#[derive(Debug, Clone)]
pub struct KindArg(pub Vec<AssetKind>);

impl FromStr for KindArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(KindArg(AssetKind::ALL.to_vec())),
            "sound" | "sounds" => Ok(KindArg(AssetSelection::sound_only().kinds().to_vec())),
            "graphics" => Ok(KindArg(AssetSelection::graphics_only().kinds().to_vec())),
            other => other.parse::<AssetKind>().map(|kind| KindArg(vec![kind])).map_err(|_| {
                format!(
                    "Invalid asset kind '{s}'. Valid values: rmim, obim, akos, sequences, awiz, char, digi, \
                     talk, wsou, extdmu, tlke, scripts, metadata, sound, graphics, all"
                )
            }),
        }
    }
}

/// Parse a decoding byte given as decimal or `0x`-prefixed hex
pub fn parse_key(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|_| format!("Invalid key '{s}'. Expected a byte such as 105 or 0x69"))
}

/// Flags of the `rip` command
#[derive(Args, Debug, Clone)]
pub struct RipArgs {
    /// Archive file, or a directory to search for archives
    pub source: PathBuf,

    /// Output directory (defaults to the current directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Decoding byte to try first (e.g. 0x69)
    #[arg(long, value_parser = parse_key)]
    pub key: Option<u8>,

    /// Only rip these asset classes (comma-separated; presets: sound, graphics, all)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<KindArg>,

    /// Skip these asset classes (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<KindArg>,

    /// First room or song entry to rip
    #[arg(long)]
    pub first: Option<usize>,

    /// Last room or song entry to rip
    #[arg(long)]
    pub last: Option<usize>,

    /// Force one palette, by index over every room's palettes
    #[arg(long)]
    pub palette: Option<usize>,

    /// Prefer costume and wiz palettes over room palettes
    #[arg(long)]
    pub local_palettes: bool,

    /// Palette index written for transparent pixels
    #[arg(long)]
    pub transparency: Option<u8>,

    /// Treat encoding 8/9 room images as lined RLE
    #[arg(long, conflicts_with = "force_unlined_rle")]
    pub force_lined_rle: bool,

    /// Treat encoding 8/9 room images as unlined RLE
    #[arg(long)]
    pub force_unlined_rle: bool,

    /// Treat two-colour costume components as RLE
    #[arg(long, conflicts_with = "force_two_color_bitmap")]
    pub force_two_color_rle: bool,

    /// Treat two-colour costume components as bitmaps
    #[arg(long)]
    pub force_two_color_bitmap: bool,

    /// Only write the decoded archive
    #[arg(long)]
    pub decode_only: bool,

    /// Decode embedded RIFF files instead of copying them
    #[arg(long)]
    pub decode_audio: bool,

    /// Normalise every sound (implies --decode-audio)
    #[arg(long)]
    pub normalize: bool,

    /// Bytes dropped from the start of each sound
    #[arg(long, default_value_t = 0)]
    pub trim_start: usize,

    /// Bytes dropped from the end of each sound
    #[arg(long, default_value_t = 0)]
    pub trim_end: usize,

    /// Write all scripts into one file with start/end markers
    #[arg(long)]
    pub cat_scripts: bool,

    /// Directory searched for external music files (defaults to the archive's directory)
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the effective configuration before ripping
    #[arg(long)]
    pub show_config: bool,
}

impl RipArgs {
    /// Convert to library rip options
    pub fn to_options(&self) -> RipOptions {
        let mut selection = if self.only.is_empty() {
            AssetSelection::default()
        } else {
            AssetSelection::from_kinds(self.only.iter().flat_map(|arg| arg.0.iter().copied()))
        };
        for kind in self.skip.iter().flat_map(|arg| arg.0.iter().copied()) {
            selection.set(kind, false);
        }

        let rle_framing = if self.force_lined_rle {
            Some(RleFraming::Lined)
        } else if self.force_unlined_rle {
            Some(RleFraming::Unlined)
        } else {
            None
        };
        let two_color = if self.force_two_color_rle {
            Some(TwoColorMode::Rle)
        } else if self.force_two_color_bitmap {
            Some(TwoColorMode::Bitmap)
        } else {
            None
        };

        RipOptions::new()
            .with_key(self.key)
            .with_selection(selection)
            .with_range(self.first, self.last)
            .with_palette_index(self.palette)
            .with_local_palettes(self.local_palettes)
            .with_transparency(self.transparency)
            .with_rle_framing(rle_framing)
            .with_two_color(two_color)
            .with_decode_only(self.decode_only)
            .with_decode_audio(self.decode_audio)
            .with_normalize(self.normalize)
            .with_trim(self.trim_start, self.trim_end)
            .with_concat_scripts(self.cat_scripts)
            .with_source_dir(self.source_dir.clone())
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rip assets from an archive, or from every archive in a directory
    Rip(RipArgs),

    /// Identify an archive's type and decoding key
    Detect {
        /// Archive file or directory
        source: PathBuf,

        /// Decoding byte to try first
        #[arg(long, value_parser = parse_key)]
        key: Option<u8>,
    },

    /// List the rooms of a room archive
    List {
        /// Room archive (.HE1, .(A))
        source: PathBuf,

        /// Decoding byte to try first
        #[arg(long, value_parser = parse_key)]
        key: Option<u8>,

        /// Print the inventory as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the XOR-decoded archive
    Decode {
        /// Archive file
        source: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Decoding byte to try first
        #[arg(long, value_parser = parse_key)]
        key: Option<u8>,
    },
}

impl Commands {
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::Rip(args) => rip::execute(args),
            Commands::Detect { source, key } => detect::execute(source, *key),
            Commands::List { source, key, json } => list::execute(source, *key, *json),
            Commands::Decode { source, output, key } => decode::execute(source, output, *key),
        }
    }
}
