//! CLI command for writing the XOR-decoded archive

use std::fs;
use std::path::Path;

use crate::cli::progress::DISK;
use crate::formats::sputm::{ByteCursor, detect};

pub fn execute(source: &Path, output: &Path, key: Option<u8>) -> anyhow::Result<()> {
    let data = fs::read(source)?;
    let detection = detect(&data, key)?;
    let cursor = ByteCursor::new(&data, detection.key);

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, cursor.decoded())?;

    println!(
        "{DISK}Decoded {} ({}, key {:#04x}) to {}",
        source.display(),
        detection.subtype,
        detection.key,
        output.display()
    );
    Ok(())
}
