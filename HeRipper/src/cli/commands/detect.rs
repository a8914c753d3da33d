//! CLI command for identifying archives

use std::fs;
use std::path::{Path, PathBuf};

use console::style;
use walkdir::WalkDir;

use crate::cli::progress::{LOOKING_GLASS, print_step};
use crate::error::Error;
use crate::formats::sputm::detect;

fn describe(path: &Path, key: Option<u8>) -> anyhow::Result<String> {
    let data = fs::read(path)?;
    Ok(match detect(&data, key) {
        Ok(detection) => format!("{} (key {:#04x})", detection.subtype, detection.key),
        Err(Error::UnrecognizedArchive) => style("not a recognised archive").dim().to_string(),
        Err(err) => return Err(err.into()),
    })
}

pub fn execute(source: &Path, key: Option<u8>) -> anyhow::Result<()> {
    if !source.is_dir() {
        println!("{}: {}", source.display(), describe(source, key)?);
        return Ok(());
    }

    print_step(1, 1, &LOOKING_GLASS, &format!("Scanning {}", source.display()));
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::WalkDir(e.to_string()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    let width = files
        .iter()
        .map(|f| f.strip_prefix(source).unwrap_or(f).display().to_string().len())
        .max()
        .unwrap_or(0);
    for file in &files {
        let name = file.strip_prefix(source).unwrap_or(file).display().to_string();
        println!("{name:<width$}  {}", describe(file, key)?);
    }
    Ok(())
}
