//! # HeRipper
//!
//! A pure-Rust ripper for Humongous Entertainment SPUTM archives.
//!
//! ## Supported Formats
//!
//! - **Room archives** (`LECF`) - backgrounds, object images, costumes and
//!   their animation sequences, wiz images, glyph sets, sounds, subtitles,
//!   scripts and metadata
//! - **Dialogue bundles** (`TLKB`) - talkie sounds and wave files
//! - **Music containers** (`SONG`) - headered, RIFF and unheadered entries
//! - **External music** (`MRAW`) - standalone signed PCM files
//!
//! Archives are XOR-obfuscated with a single byte; the key and the archive
//! type are detected from the first two chunks.
//!
//! ## Quick Start
//!
//! ### Ripping an Archive
//!
//! ```no_run
//! use heripper::rip::{AssetKind, RipOptions, rip_file};
//!
//! // Everything except sequences and scripts, written as out/game-*.png/.wav
//! let results = rip_file("GAME.HE1", "out/game", &RipOptions::default())?;
//! println!("{} images, {} sounds", results.graphics, results.audio);
//!
//! // Costume animations too
//! let options = RipOptions::new().with_asset(AssetKind::Sequences, true);
//! rip_file("GAME.HE1", "out/game", &options)?;
//! # Ok::<(), heripper::Error>(())
//! ```
//!
//! ### Ripping Into Memory
//!
//! ```no_run
//! use heripper::prelude::*;
//!
//! let data = std::fs::read("GAME.HE2")?;
//! let mut sink = MemorySink::new();
//! rip_bytes(&data, &RipOptions::default(), &mut sink)?;
//! for name in sink.names() {
//!     println!("{name}");
//! }
//! # Ok::<(), heripper::Error>(())
//! ```
//!
//! ### Using the Prelude
//!
//! ```
//! use heripper::prelude::*;
//!
//! // Now you have access to:
//! // - rip_bytes, rip_file, RipOptions, RipResults, AssetSelection
//! // - AssetSink, FileSink, MemorySink, Raster, Palette, PcmBuffer
//! // - detect, Detection, FormatSubtype
//! // - Error, Result, and more
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `heripper` command-line binary

pub mod audio;
pub mod codec;
pub mod diagnostics;
pub mod error;
pub mod formats;
pub mod resolver;
pub mod rip;
pub mod sequence;
pub mod sink;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, Result};

    pub use crate::audio::PcmBuffer;
    pub use crate::codec::{Palette, PixelFormat, Raster};
    pub use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
    pub use crate::formats::{Detection, FormatSubtype, detect};
    pub use crate::resolver::{Resolvers, RleFraming, TwoColorMode};

    // Rip driver
    pub use crate::rip::{
        ArchiveInventory, AssetKind, AssetSelection, RipOptions, RipResults, RoomSummary, inventory, rip_bytes,
        rip_file,
    };

    // Output
    pub use crate::sink::{AssetSink, FileSink, MemorySink};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
