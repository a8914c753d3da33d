//! Room archive rip (`LECF`)

use std::collections::BTreeSet;
use std::fs;

use crate::codec::sprite::{AUX_STAGE_HEIGHT, AUX_STAGE_WIDTH, ComponentColors};
use crate::codec::{Palette, Raster, Transparency, decode_aux_frame, decode_component, decode_glyph, decode_image, decode_wiz};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{Error, Result};
use crate::formats::sputm::costume::{Costume, SEQUENCE_ENCODING};
use crate::formats::sputm::wiz::Wiz;
use crate::formats::sputm::{ByteCursor, FormatSubtype, Room, detect, read_room, scan_lecf};
use crate::sequence::{FrameKind, SequenceSizing, decode_sequences, render_dynamic, render_static};

use super::Ripper;
use super::options::AssetKind;

/// A palette an image is written with, and the suffix its name gets.
#[derive(Debug, Clone)]
struct PaletteChoice {
    suffix: String,
    palette: Option<Palette>,
}

impl PaletteChoice {
    fn plain(palette: Option<Palette>) -> Self {
        Self {
            suffix: String::new(),
            palette,
        }
    }
}

/// Forced palette, else the room's only palette, else one choice per
/// room palette. A room without palettes gets a single grey preview.
fn room_palette_choices(forced: Option<&Palette>, apals: &[Palette]) -> Vec<PaletteChoice> {
    if let Some(palette) = forced {
        return vec![PaletteChoice::plain(Some(palette.clone()))];
    }
    match apals {
        [] => vec![PaletteChoice::plain(None)],
        [only] => vec![PaletteChoice::plain(Some(only.clone()))],
        many => many
            .iter()
            .enumerate()
            .map(|(j, palette)| PaletteChoice {
                suffix: format!("-apal-{j}"),
                palette: Some(palette.clone()),
            })
            .collect(),
    }
}

/// Per-room values shared by every asset of the room.
struct RoomContext<'r> {
    number: usize,
    prefix: String,
    room: &'r Room,
    /// Room `TRNS`, the transparent code in encoded data.
    key: u32,
    /// Index written where images are transparent.
    fill: u32,
}

impl RoomContext<'_> {
    fn transparency(&self) -> Transparency {
        Transparency {
            key: self.key,
            fill: self.fill,
        }
    }
}

impl Ripper<'_> {
    pub(super) fn rip_lecf(&mut self, cursor: &mut ByteCursor<'_>) -> Result<()> {
        let archive = scan_lecf(cursor, &mut self.diag)?;
        tracing::info!(rooms = archive.rooms.len(), "room archive");

        if let Some(index) = self.options.palette_index {
            self.forced_palette = scan_palettes(cursor, &archive.rooms, index);
        }

        for (number, &offset) in archive.rooms.iter().enumerate() {
            if self.options.past_range(number) {
                tracing::info!(room = number, "ending read at room");
                break;
            }
            if !self.options.in_range(number) {
                tracing::debug!(room = number, "skipping room");
                continue;
            }

            let _span = tracing::info_span!("room", room = number).entered();
            cursor.seek(offset);
            let room = match read_room(cursor, &mut self.diag) {
                Ok(room) => room,
                Err(err) => {
                    self.diag.record(&err, Some(offset));
                    continue;
                }
            };
            self.rip_room(number, &room)?;
        }
        Ok(())
    }

    fn rip_room(&mut self, number: usize, room: &Room) -> Result<()> {
        let key = u32::from(room.trns);
        let ctx = RoomContext {
            number,
            prefix: format!("room-{number}"),
            room,
            key,
            fill: self.options.transparency.map_or(key, u32::from),
        };
        tracing::debug!(
            costumes = room.costumes.len(),
            objects = room.object_images.len(),
            wizzes = room.wizzes.len(),
            sounds = room.digi.len() + room.talk.len() + room.wave.len(),
            "room parsed"
        );

        if self.options.wants(AssetKind::Rmim) {
            self.rip_background(&ctx)?;
        }
        if self.options.wants(AssetKind::Obim) {
            self.rip_objects(&ctx)?;
        }
        if self.options.wants(AssetKind::Akos) || self.options.wants(AssetKind::Sequences) {
            for (index, costume) in room.costumes.iter().enumerate() {
                self.rip_costume(&ctx, index, costume)?;
            }
        }
        if self.options.wants(AssetKind::Awiz) {
            self.rip_wizzes(&ctx)?;
            self.rip_multis(&ctx)?;
        }
        if self.options.wants(AssetKind::Char) {
            self.rip_glyphs(&ctx)?;
        }
        if self.options.wants(AssetKind::Digi) {
            for (i, sound) in room.digi.iter().enumerate() {
                self.sound(&format!("{}-digi-{i}", ctx.prefix), &sound.pcm)?;
            }
        }
        if self.options.wants(AssetKind::Talk) {
            for (i, sound) in room.talk.iter().enumerate() {
                self.sound(&format!("{}-talk-{i}", ctx.prefix), &sound.pcm)?;
            }
        }
        if self.options.wants(AssetKind::Wsou) {
            for (i, wave) in room.wave.iter().enumerate() {
                for (j, riff) in wave.riffs.iter().enumerate() {
                    let name = if wave.riffs.len() == 1 {
                        format!("{}-wsou-{i}", ctx.prefix)
                    } else {
                        format!("{}-wsou-{i}-riff-{j}", ctx.prefix)
                    };
                    self.riff(&name, &riff.bytes)?;
                }
            }
        }
        if self.options.wants(AssetKind::Extdmu) {
            self.rip_external_music(room)?;
        }
        if self.options.wants(AssetKind::Tlke) && !room.subtitles.is_empty() {
            self.rip_subtitles(&ctx)?;
        }
        if self.options.wants(AssetKind::Scripts) {
            self.rip_scripts(&ctx)?;
        }
        if self.options.wants(AssetKind::Metadata) {
            self.rip_metadata(&ctx)?;
        }
        Ok(())
    }

    /// Whether a costume or wiz image is drawn with its own palette.
    fn uses_local(&self, local: &Palette) -> bool {
        if self.options.local_palettes {
            !local.is_empty()
        } else {
            self.forced_palette.is_none() && local.len() == 256
        }
    }

    /// Palette of sequence and auxiliary canvases.
    fn canvas_palette(&self, local: &Palette, room: &Room) -> Option<Palette> {
        if self.options.local_palettes && !local.is_empty() {
            return Some(local.clone());
        }
        self.forced_palette
            .clone()
            .or_else(|| room.palettes.first().cloned())
    }

    fn emit_choices(&mut self, base: &str, raster: &Raster, choices: &[PaletteChoice]) -> Result<()> {
        for choice in choices {
            let mut image = raster.clone();
            image.set_palette(choice.palette.clone());
            self.image(&format!("{base}{}", choice.suffix), &image)?;
        }
        Ok(())
    }

    fn rip_background(&mut self, ctx: &RoomContext<'_>) -> Result<()> {
        let Some(background) = &ctx.room.background else {
            return Ok(());
        };
        let (width, height) = (usize::from(ctx.room.header.width), usize::from(ctx.room.header.height));
        let choices = room_palette_choices(self.forced_palette.as_ref(), &ctx.room.palettes);

        for (i, slot) in background.slots.iter().enumerate() {
            match decode_image(&slot.image, width, height, ctx.transparency(), &mut self.resolvers, &mut self.diag) {
                Ok(raster) => self.emit_choices(&format!("{}-rmim-{i}", ctx.prefix), &raster, &choices)?,
                Err(err) => self.diag.record(&err, Some(slot.header.offset)),
            }
        }
        Ok(())
    }

    fn rip_objects(&mut self, ctx: &RoomContext<'_>) -> Result<()> {
        let choices = room_palette_choices(self.forced_palette.as_ref(), &ctx.room.palettes);

        for (id, object) in &ctx.room.object_images {
            let Some(code) = ctx.room.object_codes.get(id) else {
                self.diag.warn(
                    DiagnosticKind::MissingObjectHeader,
                    object.slots.first().map(|s| s.header.offset),
                    format!("OBIM {id} has no matching OBCD, skipping"),
                );
                continue;
            };
            let (width, height) = (usize::from(code.width), usize::from(code.height));
            for (i, slot) in object.slots.iter().enumerate() {
                match decode_image(&slot.image, width, height, ctx.transparency(), &mut self.resolvers, &mut self.diag) {
                    Ok(raster) => {
                        self.emit_choices(&format!("{}-obim-{id}-im-{i}", ctx.prefix), &raster, &choices)?;
                    }
                    Err(err) => self.diag.record(&err, Some(slot.header.offset)),
                }
            }
        }
        Ok(())
    }

    fn rip_costume(&mut self, ctx: &RoomContext<'_>, index: usize, costume: &Costume) -> Result<()> {
        let base = format!("{}-akos-{index}", ctx.prefix);
        let emit_images = self.options.wants(AssetKind::Akos);
        let local = &costume.palette;

        let (choices, use_colormap) = if self.uses_local(local) {
            let use_colormap = local.len() == 256 && ctx.room.remap.is_none();
            (vec![PaletteChoice::plain(Some(local.clone()))], use_colormap)
        } else {
            (room_palette_choices(self.forced_palette.as_ref(), &ctx.room.palettes), true)
        };
        let colors = ComponentColors {
            deindex: use_colormap
                .then_some(costume.colors.colormap.as_slice())
                .filter(|table| !table.is_empty()),
            remap: ctx.room.remap.as_deref(),
        };

        let mut components = Vec::with_capacity(costume.components.len());
        for (j, component) in costume.components.iter().enumerate() {
            match decode_component(component, &costume.colors, colors, ctx.fill, &mut self.resolvers, &mut self.diag) {
                Ok(raster) => {
                    if emit_images {
                        self.emit_choices(&format!("{base}-im-{j}"), &raster, &choices)?;
                    }
                    components.push(raster);
                }
                Err(err) => {
                    self.diag.record(&err, None);
                    components.push(Raster::new(0, 0, ctx.fill));
                }
            }
        }

        if self.options.wants(AssetKind::Sequences) {
            self.rip_sequences(ctx, &base, costume, &components)?;
        }
        if emit_images {
            self.rip_aux(ctx, &base, costume)?;
        }
        Ok(())
    }

    fn rip_sequences(&mut self, ctx: &RoomContext<'_>, base: &str, costume: &Costume, components: &[Raster]) -> Result<()> {
        let Some(aksq) = &costume.aksq else {
            return Ok(());
        };
        if costume.header.sequence_encoding != SEQUENCE_ENCODING {
            self.diag.error(
                DiagnosticKind::UnsupportedEncoding,
                Some(aksq.header.offset),
                format!(
                    "{base}: unsupported sequence encoding {:#06x}",
                    costume.header.sequence_encoding
                ),
            );
            return Ok(());
        }

        let sequences = decode_sequences(aksq, components.len(), &mut self.diag);
        let sizes: Vec<(usize, usize)> = components.iter().map(|c| (c.width(), c.height())).collect();
        let palette = self.canvas_palette(&costume.palette, ctx.room);
        let mut used = BTreeSet::new();

        for (s, sequence) in sequences.iter().enumerate() {
            if sequence.frames.is_empty() {
                continue;
            }
            used.extend(sequence.referenced());
            let sizing = SequenceSizing::measure(sequence, &sizes);
            self.results.animations += 1;

            for frame in &sequence.frames {
                let name = format!("{base}-sequence-{s}-frame-{}", frame.number);
                match frame.kind {
                    FrameKind::Static => {
                        let mut canvas = render_static(frame, sizing, components, ctx.fill);
                        canvas.set_palette(palette.clone());
                        self.frame(&name, &canvas)?;
                    }
                    FrameKind::Dynamic => {
                        for (c, (placement, mut canvas)) in render_dynamic(frame, sizing, components, ctx.fill).enumerate() {
                            canvas.set_palette(palette.clone());
                            let name = match placement.id {
                                Some(id) => format!("{name}-component-{c}-id-{id}"),
                                None => format!("{name}-component-{c}"),
                            };
                            self.frame(&name, &canvas)?;
                        }
                    }
                }
            }
        }

        let unused = components.len().saturating_sub(used.len());
        if unused > 0 {
            tracing::debug!(costume = base, unused, "components not used by any sequence");
        }
        Ok(())
    }

    /// Auxiliary frames draw onto one stage, each emitted as it stands.
    fn rip_aux(&mut self, ctx: &RoomContext<'_>, base: &str, costume: &Costume) -> Result<()> {
        if costume.aux.is_empty() {
            return Ok(());
        }
        let mut stage = Raster::new(AUX_STAGE_WIDTH, AUX_STAGE_HEIGHT, ctx.key);
        stage.set_palette(self.canvas_palette(&costume.palette, ctx.room));

        for (j, entry) in costume.aux.iter().enumerate() {
            if entry.frame.data.is_empty() {
                continue;
            }
            decode_aux_frame(&mut stage, &entry.frame, ctx.fill);
            self.frame(&format!("{base}-auxd-{j}"), &stage)?;
        }
        Ok(())
    }

    fn rip_wizzes(&mut self, ctx: &RoomContext<'_>) -> Result<()> {
        for (i, wiz) in ctx.room.wizzes.iter().enumerate() {
            let (choices, deindex) = if self.uses_local(&wiz.palette) {
                (vec![PaletteChoice::plain(Some(wiz.palette.clone()))], wiz.rmap.as_deref())
            } else {
                (room_palette_choices(self.forced_palette.as_ref(), &ctx.room.palettes), None)
            };
            self.emit_wiz(ctx, &format!("{}-awiz-{i}", ctx.prefix), wiz, deindex, &choices)?;
        }
        Ok(())
    }

    fn rip_multis(&mut self, ctx: &RoomContext<'_>) -> Result<()> {
        for (i, multi) in ctx.room.multis.iter().enumerate() {
            let defaults = &multi.defaults;
            for (j, wiz) in multi.images.iter().enumerate() {
                let (choices, deindex) = if self.uses_local(&wiz.palette) {
                    (vec![PaletteChoice::plain(Some(wiz.palette.clone()))], wiz.rmap.as_deref())
                } else if self.forced_palette.is_none() && self.options.local_palettes && !defaults.palette.is_empty() {
                    (vec![PaletteChoice::plain(Some(defaults.palette.clone()))], defaults.rmap.as_deref())
                } else {
                    (
                        room_palette_choices(self.forced_palette.as_ref(), &ctx.room.palettes),
                        defaults.rmap.as_deref(),
                    )
                };
                self.emit_wiz(ctx, &format!("{}-mult-{i}-awiz-{j}", ctx.prefix), wiz, deindex, &choices)?;
            }
        }
        Ok(())
    }

    fn emit_wiz(
        &mut self,
        ctx: &RoomContext<'_>,
        name: &str,
        wiz: &Wiz,
        deindex: Option<&[u8]>,
        choices: &[PaletteChoice],
    ) -> Result<()> {
        let Some(wizd) = &wiz.wizd else {
            tracing::debug!(name, "wiz image without data");
            return Ok(());
        };
        let raster = decode_wiz(
            wiz.width as usize,
            wiz.height as usize,
            wizd.payload(),
            ctx.key,
            ctx.fill,
            deindex,
        );
        self.emit_choices(name, &raster, choices)
    }

    fn rip_glyphs(&mut self, ctx: &RoomContext<'_>) -> Result<()> {
        let preview = Palette::glyph_preview(usize::from(ctx.room.trns));
        for (i, set) in ctx.room.glyph_sets.iter().enumerate() {
            for (j, glyph) in set.glyphs.iter().enumerate() {
                match decode_glyph(glyph, set.compression, ctx.key, ctx.fill) {
                    Ok(raster) => {
                        let raster = raster.with_palette(preview.clone());
                        self.image(&format!("{}-char-{i}-num-{j}", ctx.prefix), &raster)?;
                    }
                    Err(err) => self.diag.record(&err, None),
                }
            }
        }
        Ok(())
    }

    /// Rip every `FMUS` file the room names that exists in the source directory.
    fn rip_external_music(&mut self, room: &Room) -> Result<()> {
        if room.music.is_empty() {
            return Ok(());
        }
        let Some(dir) = self.options.source_dir.clone() else {
            tracing::debug!("no source directory, external music skipped");
            return Ok(());
        };

        for music in &room.music {
            let file_name = music.clean_file_name();
            if file_name.is_empty() {
                continue;
            }
            let path = dir.join(&file_name);
            if !path.is_file() {
                tracing::info!(file = %path.display(), "external music file not found");
                continue;
            }
            let data = match fs::read(&path) {
                Ok(data) => data,
                Err(err) => {
                    self.diag.record(&Error::from(err), None);
                    continue;
                }
            };
            let detection = match detect(&data, self.options.key) {
                Ok(detection) if detection.subtype == FormatSubtype::ExternalMusic => detection,
                _ => {
                    tracing::warn!(file = %path.display(), "not an external music file, skipping");
                    continue;
                }
            };
            let stem = path
                .file_stem()
                .map_or_else(|| file_name.clone(), |s| s.to_string_lossy().into_owned());
            let mut cursor = ByteCursor::new(&data, detection.key);
            self.rip_dmu(&mut cursor, &stem)?;
        }
        Ok(())
    }

    fn rip_subtitles(&mut self, ctx: &RoomContext<'_>) -> Result<()> {
        let mut text = format!("room {}\n", ctx.number);
        for line in ctx.room.subtitles.iter().flatten() {
            text.push_str(&format!("\t{line}\n"));
            self.results.strings += 1;
        }
        text.push('\n');
        self.sink.emit_text("tlke.txt", &text)
    }

    fn rip_scripts(&mut self, ctx: &RoomContext<'_>) -> Result<()> {
        let scripts = &ctx.room.scripts;
        for (kind, list) in [("scrp", &scripts.scrp), ("lscr", &scripts.lscr), ("lsc2", &scripts.lsc2)] {
            for (i, script) in list.iter().enumerate() {
                if self.options.concat_scripts {
                    let marker = format!("{}-{kind}-{i}", ctx.number);
                    self.sink
                        .emit_raw_bytes("scripts", format!("<--SCRIPT {marker} START-->").as_bytes())?;
                    self.sink.emit_raw_bytes("scripts", script.payload())?;
                    self.sink
                        .emit_raw_bytes("scripts", format!("<--SCRIPT {marker} END-->").as_bytes())?;
                } else {
                    self.sink
                        .emit_raw_bytes(&format!("{}-{kind}-{i}", ctx.prefix), script.payload())?;
                }
                self.results.scripts += 1;
            }
        }
        Ok(())
    }

    fn rip_metadata(&mut self, ctx: &RoomContext<'_>) -> Result<()> {
        let room = ctx.room;
        let mut text = format!("room {}\n\tTRNS: {}\n", ctx.number, room.trns);

        for (i, costume) in room.costumes.iter().enumerate() {
            let has_strings =
                costume.file_date.is_some() || costume.file_name.is_some() || costume.compression.is_some();
            if !has_strings && costume.sequence_names.is_empty() {
                continue;
            }
            text.push_str(&format!("\tAKOS {i}:\n"));
            for (label, value) in [
                ("SP2C", &costume.file_date),
                ("SPLF", &costume.file_name),
                ("CLRS", &costume.compression),
            ] {
                if let Some(value) = value {
                    text.push_str(&format!("\t\t{label}: {value}\n"));
                }
            }
            if !costume.sequence_names.is_empty() {
                text.push_str("\t\tSQDB:\n");
                for (j, info) in costume.sequence_names.iter().enumerate() {
                    text.push_str(&format!("\t\t\tSEQI {j}: {}\n", info.name));
                }
            }
        }

        for code in room.object_codes.values().filter(|c| !c.name.is_empty()) {
            text.push_str(&format!("\tOBCD {}:\n\t\tOBNA: {}\n", code.id, code.name));
        }
        text.push('\n');
        self.sink.emit_text("metadata.txt", &text)
    }
}

/// Collect every room's palettes in file order and pick one by index.
fn scan_palettes(cursor: &mut ByteCursor<'_>, rooms: &[usize], index: usize) -> Option<Palette> {
    // Parse problems are reported by the real pass.
    let mut scratch = Diagnostics::new();
    let mut global = Vec::new();
    for &offset in rooms {
        cursor.seek(offset);
        if let Ok(room) = read_room(cursor, &mut scratch) {
            global.extend(room.palettes);
        }
    }
    let forced = global.get(index).cloned();
    if forced.is_none() {
        tracing::warn!(index, available = global.len(), "palette index out of range, using room palettes");
    } else {
        tracing::info!(index, available = global.len(), "forcing palette");
    }
    forced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::sputm::chunk::test_support::{chunk, container, le16, le32};
    use crate::rip::{RipOptions, rip_bytes};
    use crate::sink::MemorySink;

    fn pals(entries: &[Vec<u8>]) -> Vec<u8> {
        let table_len = 8 + 4 * entries.len();
        let mut offsets = Vec::new();
        let mut at = table_len;
        for entry in entries {
            offsets.extend_from_slice(&le32(at as u32));
            at += entry.len();
        }
        let mut children = vec![chunk(b"OFFS", &offsets)];
        children.extend(entries.iter().cloned());
        container(b"PALS", &[container(b"WRAP", &children)])
    }

    fn apal(shade: u8) -> Vec<u8> {
        chunk(b"APAL", &[shade; 256 * 3])
    }

    /// A 2x1 literal AWIZ holding codes 1 and 2.
    fn awiz() -> Vec<u8> {
        let wizh = [le32(0), le32(2), le32(1)].concat();
        container(b"AWIZ", &[chunk(b"WIZH", &wizh), chunk(b"WIZD", &[1, 2])])
    }

    fn rip(lflfs: &[Vec<u8>], options: &RipOptions) -> (MemorySink, crate::rip::RipResults) {
        let data = container(b"LECF", lflfs);
        let mut sink = MemorySink::new();
        let results = rip_bytes(&data, options, &mut sink).unwrap();
        (sink, results)
    }

    #[test]
    fn palette_choices() {
        let a = Palette::single(1);
        let b = Palette::single(2);
        let one = room_palette_choices(None, std::slice::from_ref(&a));
        assert_eq!(one.len(), 1);
        assert!(one[0].suffix.is_empty());

        let two = room_palette_choices(None, &[a.clone(), b]);
        assert_eq!(two[1].suffix, "-apal-1");

        let forced = room_palette_choices(Some(&a), &[]);
        assert_eq!(forced[0].palette, Some(a));
        assert!(room_palette_choices(None, &[])[0].palette.is_none());
    }

    #[test]
    fn wiz_images_fan_out_over_room_palettes() {
        let room = container(b"LFLF", &[pals(&[apal(10), apal(20)]), awiz()]);
        let (sink, results) = rip(&[room], &RipOptions::default());
        assert_eq!(results.graphics, 2);
        assert_eq!(sink.rasters["room-0-awiz-0-apal-0"].pixels(), &[1, 2]);
        assert!(sink.rasters.contains_key("room-0-awiz-0-apal-1"));
    }

    #[test]
    fn forced_palette_is_indexed_across_rooms() {
        let first = container(b"LFLF", &[pals(&[apal(10)])]);
        let second = container(b"LFLF", &[pals(&[apal(20), apal(30)]), awiz()]);
        let options = RipOptions::new().with_palette_index(Some(2));
        let (sink, _) = rip(&[first, second], &options);
        let raster = &sink.rasters["room-1-awiz-0"];
        assert_eq!(raster.palette().map(|p| p.rgb(1)), Some([30, 30, 30]));
    }

    #[test]
    fn room_range_limits_what_is_ripped() {
        let rooms: Vec<Vec<u8>> = (0..3)
            .map(|n| container(b"LFLF", &[chunk(b"TRNS", &le16(n))]))
            .collect();
        let options = RipOptions::new().with_range(Some(1), Some(1));
        let (sink, _) = rip(&rooms, &options);
        assert_eq!(sink.texts["metadata.txt"], "room 1\n\tTRNS: 1\n\n");
    }

    #[test]
    fn object_image_without_header_is_skipped() {
        let obim = container(b"OBIM", &[chunk(b"IMHD", &le16(7))]);
        let (_, results) = rip(&[container(b"LFLF", &[obim])], &RipOptions::default());
        assert_eq!(results.graphics, 0);
        assert_eq!(results.warnings, 1);
    }

    #[test]
    fn subtitles_and_scripts() {
        let tlke = container(b"TLKE", &[chunk(b"TEXT", b"Hi\0"), chunk(b"TEXT", b"Bye\0")]);
        let room = container(b"LFLF", &[tlke, chunk(b"SCRP", &[1, 2]), chunk(b"LSCR", &[3])]);

        let options = RipOptions::new().with_asset(AssetKind::Scripts, true);
        let (sink, results) = rip(std::slice::from_ref(&room), &options);
        assert_eq!(sink.texts["tlke.txt"], "room 0\n\tHi\n\tBye\n\n");
        assert_eq!(results.strings, 2);
        assert_eq!(sink.blobs["room-0-scrp-0"], vec![1, 2]);
        assert_eq!(sink.blobs["room-0-lscr-0"], vec![3]);

        let options = options.with_concat_scripts(true);
        let (sink, results) = rip(&[room], &options);
        assert_eq!(results.scripts, 2);
        assert_eq!(
            sink.blobs["scripts"],
            b"<--SCRIPT 0-scrp-0 START-->\x01\x02<--SCRIPT 0-scrp-0 END-->\
              <--SCRIPT 0-lscr-0 START-->\x03<--SCRIPT 0-lscr-0 END-->"
                .to_vec()
        );
    }

    #[test]
    fn external_music_is_resolved_in_the_source_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut words = [le16(0); 8];
        words[3] = le16(11025);
        let mraw = container(b"MRAW", &[chunk(b"HSHD", &words.concat()), chunk(b"SDAT", &[0x00, 0x7F])]);
        std::fs::write(dir.path().join("THEME.DMU"), mraw).unwrap();

        let fmus = container(b"FMUS", &[chunk(b"SDAT", b"THEME.DMU \r\n\0")]);
        let missing = container(b"FMUS", &[chunk(b"SDAT", b"GONE.DMU\0")]);
        let room = container(
            b"LFLF",
            &[container(b"SOUN", &[fmus]), container(b"SOUN", &[missing])],
        );
        let options = RipOptions::new().with_source_dir(Some(dir.path()));
        let (sink, results) = rip(&[room], &options);
        assert_eq!(results.audio, 1);
        assert_eq!(sink.samples["THEME"].data, vec![0x80, 0xFF]);
    }
}
