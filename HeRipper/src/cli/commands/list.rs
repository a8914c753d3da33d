//! CLI command for listing the rooms of a room archive

use std::fs;
use std::path::Path;

use console::style;

use crate::rip::inventory;

pub fn execute(source: &Path, key: Option<u8>, json: bool) -> anyhow::Result<()> {
    let data = fs::read(source)?;
    let inventory = inventory(&data, key)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&inventory)?);
        return Ok(());
    }

    println!(
        "{}: {} (key {:#04x}), {} rooms",
        source.display(),
        inventory.detection.subtype,
        inventory.detection.key,
        inventory.rooms.len()
    );
    println!();
    println!(
        "{:>4}  {:>10}  {:>9}  {:>4}  {:>4}  {:>4}  {:>4}  {:>4}  {:>4}  {:>5}  {:>5}  {:>7}",
        "Room", "Offset", "Size", "Pals", "Bgs", "Objs", "Akos", "Wiz", "Char", "Sound", "Lines", "Scripts"
    );
    for room in &inventory.rooms {
        let size = format!("{}x{}", room.width, room.height);
        println!(
            "{:>4}  {:>#10x}  {:>9}  {:>4}  {:>4}  {:>4}  {:>4}  {:>4}  {:>4}  {:>5}  {:>5}  {:>7}",
            room.number,
            room.offset,
            size,
            room.palettes,
            room.backgrounds,
            room.objects,
            room.costumes,
            room.wiz_images,
            room.glyph_sets,
            room.sounds,
            room.subtitles,
            room.scripts
        );
        for file in &room.external_music {
            println!("      music: {file}");
        }
    }

    if inventory.warnings > 0 || inventory.errors > 0 {
        println!();
        println!(
            "{}",
            style(format!(
                "{} warnings, {} errors while parsing",
                inventory.warnings, inventory.errors
            ))
            .yellow()
        );
    }
    Ok(())
}
