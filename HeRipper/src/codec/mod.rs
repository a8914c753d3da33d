//! Pixel codecs
//!
//! Everything here turns encoded bytes into a [`Raster`]. The modules do
//! not parse chunk structure beyond the few image headers they own.

pub mod bitmap;
pub mod bitstream;
pub mod palette;
pub mod raster;
pub mod rle;
pub mod sprite;

pub use bitmap::{Encoding, decode_image};
pub use palette::{ColorPipeline, Palette, Transparency};
pub use raster::{PixelFormat, Raster, Region};
pub use sprite::{decode_aux_frame, decode_component, decode_glyph, decode_wiz};
