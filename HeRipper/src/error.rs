//! Error types for `HeRipper`

use std::path::PathBuf;

use thiserror::Error;

/// The error type for `HeRipper` operations.
///
/// Only true I/O failures and [`Error::UnrecognizedArchive`] stop a rip.
/// Every other variant is raised while reading a single sub-record and is
/// turned into a [`Diagnostic`](crate::diagnostics::Diagnostic) by the
/// container walk, which then resumes at the next sibling chunk.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== Detection Errors ====================
    /// No candidate decoding byte produced a recognisable first two chunks.
    #[error("not a recognised SPUTM archive")]
    UnrecognizedArchive,

    /// The operation needs a room archive (LECF) but got another subtype.
    #[error("expected a room archive, found {found}")]
    NotARoomArchive {
        /// Human-readable name of the detected subtype.
        found: String,
    },

    // ==================== Structure Errors ====================
    /// A read would cross the end of the buffer.
    #[error("truncated payload at offset {offset:#x}: needed {needed} more bytes")]
    TruncatedPayload {
        /// Absolute offset of the read.
        offset: usize,
        /// Bytes requested past what remained.
        needed: usize,
    },

    /// A chunk header declares a length that cannot hold its own header.
    #[error("implausible chunk length {length} for '{tag}' at offset {offset:#x}")]
    ImplausibleLength {
        /// Four-character tag as read.
        tag: String,
        /// Absolute offset of the header.
        offset: usize,
        /// Declared length.
        length: u32,
    },

    /// A chunk at this position is not the one its parent requires.
    #[error("expected '{expected}' at offset {offset:#x}, found '{found}'")]
    UnexpectedChunk {
        /// Tag required by the parent family.
        expected: &'static str,
        /// Tag actually present.
        found: String,
        /// Absolute offset of the header.
        offset: usize,
    },

    // ==================== Codec Errors ====================
    /// An image region selects an encoding byte no codec handles.
    #[error("unsupported bitmap encoding {0:#x}")]
    UnsupportedEncoding(u8),

    /// A multi-component sprite declares an unsupported colour count.
    #[error("invalid RLE colour compression: {0} colours")]
    InvalidColorCount(usize),

    // ==================== Audio Errors ====================
    /// Embedded RIFF/WAVE data is malformed.
    #[error("invalid RIFF data: {message}")]
    InvalidRiff {
        /// What is wrong with the RIFF stream.
        message: String,
    },

    // ==================== Output Errors ====================
    /// Failed to encode a raster as PNG.
    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid file path.
    #[error("invalid path: {}", .0.display())]
    InvalidPath(PathBuf),

    /// Directory traversal error.
    #[error("directory walk error: {0}")]
    WalkDir(String),
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDir(err.to_string())
    }
}

/// A specialized Result type for `HeRipper` operations.
pub type Result<T> = std::result::Result<T, Error>;
