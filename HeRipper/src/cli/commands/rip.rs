//! CLI command for ripping one archive or a directory of archives

use std::path::{Path, PathBuf};
use std::time::Instant;

use console::style;
use serde::Serialize;
use walkdir::WalkDir;

use super::RipArgs;
use crate::cli::progress::{PACKAGE, print_done, print_step, simple_spinner};
use crate::error::Error;
use crate::rip::{RipOptions, RipResults, rip_file};

/// Results of one archive in a directory rip
#[derive(Debug, Serialize)]
struct FileResults {
    file: PathBuf,
    results: RipResults,
}

/// Regular files under `dir`, in name order
fn archive_candidates(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::WalkDir(e.to_string()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Output prefix for an archive: `<output>/<file name>`
fn output_prefix(output: &Path, archive: &Path) -> anyhow::Result<PathBuf> {
    let name = archive
        .file_name()
        .ok_or_else(|| Error::InvalidPath(archive.to_path_buf()))?;
    Ok(output.join(name))
}

fn print_summary(results: &RipResults) {
    if let Some(detection) = results.detection {
        println!("  Type:       {} (key {:#04x})", detection.subtype, detection.key);
    }
    println!("  Images:     {}", results.graphics);
    if results.animation_frames > 0 {
        println!(
            "  Animations: {} ({} frames)",
            results.animations, results.animation_frames
        );
    }
    println!("  Sounds:     {}", results.audio);
    if results.strings > 0 {
        println!("  Strings:    {}", results.strings);
    }
    if results.scripts > 0 {
        println!("  Scripts:    {}", results.scripts);
    }
    if results.warnings > 0 {
        println!("  {}", style(format!("Warnings:   {}", results.warnings)).yellow());
    }
    if results.errors > 0 {
        println!("  {}", style(format!("Errors:     {}", results.errors)).red());
    }
}

pub fn execute(args: &RipArgs) -> anyhow::Result<()> {
    let options = args.to_options();
    let output = args.output.clone().unwrap_or_else(|| PathBuf::from("."));

    if args.show_config {
        println!("{}", serde_json::to_string_pretty(&options)?);
    }

    if args.source.is_dir() {
        return execute_dir(args, &options, &output);
    }

    let prefix = output_prefix(&output, &args.source)?;
    let results = rip_file(&args.source, &prefix, &options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        println!("Ripped {}", args.source.display());
        print_summary(&results);
    }
    Ok(())
}

fn execute_dir(args: &RipArgs, options: &RipOptions, output: &Path) -> anyhow::Result<()> {
    let started = Instant::now();
    let files = archive_candidates(&args.source)?;
    let total = files.len();

    if !args.json {
        print_step(1, 1, &PACKAGE, &format!("Ripping {} ({total} files)", args.source.display()));
    }

    let mut ripped = Vec::new();
    let mut totals = RipResults::default();
    for (index, file) in files.iter().enumerate() {
        let display = file.strip_prefix(&args.source).unwrap_or(file).display().to_string();
        let spinner = (!args.json).then(|| simple_spinner(&format!("[{}/{total}]", index + 1), &display));

        let prefix = output_prefix(output, file)?;
        let outcome = rip_file(file, &prefix, options);
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        match outcome {
            Ok(results) => {
                totals.absorb(&results);
                ripped.push(FileResults {
                    file: file.clone(),
                    results,
                });
            }
            Err(Error::UnrecognizedArchive) => {
                tracing::debug!(file = %file.display(), "not an archive");
            }
            Err(err) => return Err(err.into()),
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&ripped)?);
        return Ok(());
    }

    for entry in &ripped {
        println!("{}", style(entry.file.display()).bold());
        print_summary(&entry.results);
    }
    println!();
    println!("{} archives ripped from {total} files", ripped.len());
    print_summary(&totals);
    print_done(started.elapsed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_use_the_archive_file_name() {
        let prefix = output_prefix(Path::new("out"), Path::new("games/PAJAMA.HE1")).unwrap();
        assert_eq!(prefix, Path::new("out").join("PAJAMA.HE1"));
        assert!(output_prefix(Path::new("out"), Path::new("/")).is_err());
    }

    #[test]
    fn directory_candidates_are_sorted_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("b.he2"), b"").unwrap();
        std::fs::write(dir.path().join("a.he1"), b"").unwrap();
        std::fs::write(dir.path().join("sub").join("c.he4"), b"").unwrap();

        let names: Vec<_> = archive_candidates(dir.path())
            .unwrap()
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.he1", "b.he2", "c.he4"]);
    }
}
