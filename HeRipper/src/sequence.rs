//! Costume animation sequences
//!
//! `AKSQ` holds a small bytecode. Most `0xC0` subcodes are fixed-length
//! operations with no visual effect; the frame subcodes place decoded
//! components at signed offsets. [`decode_sequences`] interprets the
//! stream, [`SequenceSizing`] computes the canvas that fits every frame of
//! a sequence, and [`render_static`] / [`render_dynamic`] composite it.

use crate::codec::raster::Raster;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::Result;
use crate::formats::sputm::chunk::{HEADER_SIZE, RawChunk};
use crate::formats::sputm::cursor::ByteCursor;

/// Largest component offset, on either axis, that is kept.
pub const MAX_COMPONENT_OFFSET: i32 = 1024;

const OP_NOP: u8 = 0x00;
const OP_EXTENDED: u8 = 0xC0;

const SUB_STATIC_FRAME: u8 = 0x20;
const SUB_DYNAMIC_FRAME: u8 = 0x21;
const SUB_QUICK_DYNAMIC_FRAME: u8 = 0x22;
const SUB_UNHEADERED_FRAME: u8 = 0x25;
const SUB_END_SEQUENCE: u8 = 0xFF;

/// Components in a `0x22` frame.
const QUICK_FRAME_COMPONENTS: usize = 3;

/// Operand bytes of the subcodes that only need skipping.
fn skip_length(subcode: u8) -> Option<usize> {
    let len = match subcode {
        0x01 | 0x86 => 0,
        0x15 | 0x42 | 0x44 | 0x80 | 0x81 | 0x83 | 0x8D | 0xA3 | 0xA4 => 1,
        0x30 | 0x8E | 0xA0..=0xA2 => 2,
        0x10 | 0x16..=0x19 | 0x40 => 3,
        0x85 => 4,
        0x70..=0x75 | 0x82 => 5,
        _ => return None,
    };
    Some(len)
}

/// Static frames are composited onto one canvas; dynamic frames keep
/// every component on its own canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Static,
    Dynamic,
}

/// One component placed in a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i16,
    pub y: i16,
    /// Index into the costume's component list.
    pub index: usize,
    /// External id of a dynamic-frame component.
    pub id: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame number within its sequence.
    pub number: usize,
    pub kind: FrameKind,
    pub placements: Vec<Placement>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sequence {
    pub frames: Vec<Frame>,
}

impl Sequence {
    /// Component indices used by any frame.
    pub fn referenced(&self) -> impl Iterator<Item = usize> + '_ {
        self.frames
            .iter()
            .flat_map(|f| f.placements.iter().map(|p| p.index))
    }
}

/// Interpret the `AKSQ` bytecode of one costume.
///
/// `component_count` is the number of decoded components; placements
/// pointing past it are dropped. An unknown `0xC0` subcode stops decoding
/// and returns the sequences closed so far.
pub fn decode_sequences(aksq: &RawChunk, component_count: usize, diag: &mut Diagnostics) -> Vec<Sequence> {
    let mut interpreter = Interpreter {
        cursor: ByteCursor::new(&aksq.bytes, 0),
        base: aksq.header.offset,
        component_count,
        sequences: Vec::new(),
        current: Sequence::default(),
        frame_number: 0,
    };
    interpreter.cursor.seek(HEADER_SIZE);
    if let Err(err) = interpreter.run(diag) {
        let offset = interpreter.base + interpreter.cursor.tell();
        diag.record(&err, Some(offset));
    }
    interpreter.sequences
}

struct Interpreter<'a> {
    cursor: ByteCursor<'a>,
    base: usize,
    component_count: usize,
    sequences: Vec<Sequence>,
    current: Sequence,
    frame_number: usize,
}

impl Interpreter<'_> {
    fn run(&mut self, diag: &mut Diagnostics) -> Result<()> {
        while !self.cursor.at_end() {
            let at = self.base + self.cursor.tell();
            match self.cursor.read_u8()? {
                OP_NOP => {}
                OP_EXTENDED => {
                    let subcode = self.cursor.read_u8()?;
                    if !self.extended(subcode, diag)? {
                        diag.error(
                            DiagnosticKind::UnsupportedEncoding,
                            Some(at),
                            format!("unrecognised sequence subcode {subcode:#04x}, abandoning the remaining sequences"),
                        );
                        return Ok(());
                    }
                }
                code => diag.warn(
                    DiagnosticKind::UnsupportedEncoding,
                    Some(at),
                    format!("unrecognised sequence code {code:#04x}, skipping it"),
                ),
            }
        }
        Ok(())
    }

    /// Run one `0xC0` subcode. Returns false for an unknown subcode.
    fn extended(&mut self, subcode: u8, diag: &mut Diagnostics) -> Result<bool> {
        match subcode {
            SUB_STATIC_FRAME => {
                let count = usize::from(self.cursor.read_u8()?);
                self.static_frame(count, diag)?;
            }
            SUB_UNHEADERED_FRAME => {
                self.cursor.seek_relative(4);
                let count = usize::from(self.cursor.read_u8()?);
                self.static_frame(count, diag)?;
            }
            SUB_DYNAMIC_FRAME => self.dynamic_frame(None, diag)?,
            SUB_QUICK_DYNAMIC_FRAME => self.dynamic_frame(Some(QUICK_FRAME_COMPONENTS), diag)?,
            SUB_END_SEQUENCE => {
                self.sequences.push(std::mem::take(&mut self.current));
                self.frame_number = 0;
            }
            other => match skip_length(other) {
                Some(len) => self.cursor.seek_relative(len as isize),
                None => return Ok(false),
            },
        }
        Ok(true)
    }

    fn static_frame(&mut self, count: usize, diag: &mut Diagnostics) -> Result<()> {
        let mut placements = Vec::with_capacity(count);
        for _ in 0..count {
            if let Some(placement) = self.placement(None, diag)? {
                placements.push(placement);
            }
        }
        self.push_frame(FrameKind::Static, placements);
        Ok(())
    }

    /// `0x21` and `0x22`. The id table runs alongside the placements,
    /// one byte per component in order.
    fn dynamic_frame(&mut self, fixed_count: Option<usize>, diag: &mut Diagnostics) -> Result<()> {
        let start = self.cursor.tell();
        let data_size = usize::from(self.cursor.read_u8()?);
        let id_count = usize::from(self.cursor.read_u8()?);
        let ids = self.cursor.read_bytes_clamped(id_count);
        let count = match fixed_count {
            Some(count) => count,
            None => usize::from(self.cursor.read_u8()?),
        };

        let mut placements = Vec::with_capacity(count);
        for ordinal in 0..count {
            let id = ids.get(ordinal).copied();
            if let Some(placement) = self.placement(id, diag)? {
                placements.push(placement);
            }
        }
        self.push_frame(FrameKind::Dynamic, placements);

        // The size byte counts the code and subcode too.
        let end = (start + data_size).saturating_sub(2);
        if end > self.cursor.tell() {
            self.cursor.seek(end);
        }
        Ok(())
    }

    fn placement(&mut self, id: Option<u8>, diag: &mut Diagnostics) -> Result<Option<Placement>> {
        let at = self.base + self.cursor.tell();
        let x = self.cursor.read_i16_le()?;
        let y = self.cursor.read_i16_le()?;
        let index = self.component_index()?;

        if i32::from(x).abs() > MAX_COMPONENT_OFFSET || i32::from(y).abs() > MAX_COMPONENT_OFFSET {
            diag.warn(
                DiagnosticKind::OutOfRangeComponent,
                Some(at),
                format!("component {index} at ({x}, {y}) is out of range, skipping"),
            );
            return Ok(None);
        }
        if index >= self.component_count {
            diag.warn(
                DiagnosticKind::OutOfRangeComponent,
                Some(at),
                format!("component {index} does not exist, skipping"),
            );
            return Ok(None);
        }
        Ok(Some(Placement { x, y, index, id }))
    }

    /// One byte, or two when the high bit is set. `0x80` escapes
    /// indices 0x80..0x180 in a single following byte.
    fn component_index(&mut self) -> Result<usize> {
        let first = self.cursor.read_u8()?;
        if first & 0x80 == 0 {
            return Ok(usize::from(first));
        }
        let next = usize::from(self.cursor.read_u8()?);
        Ok(match first {
            0x80 if next >= 0x80 => next,
            0x80 => next + 0x100,
            _ => usize::from(first & 0x7F) * 0x100 + next,
        })
    }

    fn push_frame(&mut self, kind: FrameKind, placements: Vec<Placement>) {
        self.current.frames.push(Frame {
            number: self.frame_number,
            kind,
            placements,
        });
        self.frame_number += 1;
    }
}

/// Canvas that holds every frame of one sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceSizing {
    /// Where offset (0, 0) lands on the canvas.
    pub center_x: i64,
    pub center_y: i64,
    pub width: usize,
    pub height: usize,
}

impl SequenceSizing {
    /// Union of every placed component's extent, with the origin included.
    ///
    /// `sizes` gives each component's `(width, height)`.
    pub fn measure(sequence: &Sequence, sizes: &[(usize, usize)]) -> Self {
        let (mut left, mut top, mut right, mut bottom) = (0i64, 0i64, 0i64, 0i64);
        for frame in &sequence.frames {
            for p in &frame.placements {
                let (w, h) = sizes.get(p.index).copied().unwrap_or_default();
                let (x, y) = (i64::from(p.x), i64::from(p.y));
                left = left.min(x);
                top = top.min(y);
                right = right.max(x + w as i64);
                bottom = bottom.max(y + h as i64);
            }
        }
        Self {
            center_x: -left,
            center_y: -top,
            width: (right - left) as usize,
            height: (bottom - top) as usize,
        }
    }
}

/// Composite a static frame, treating `transparent` in every component as
/// see-through.
pub fn render_static(frame: &Frame, sizing: SequenceSizing, components: &[Raster], transparent: u32) -> Raster {
    let mut canvas = Raster::new(sizing.width, sizing.height, transparent);
    for p in &frame.placements {
        if let Some(component) = components.get(p.index) {
            canvas.blit(
                component,
                i64::from(p.x) + sizing.center_x,
                i64::from(p.y) + sizing.center_y,
                Some(transparent),
            );
        }
    }
    canvas
}

/// Render each component of a dynamic frame onto its own canvas.
pub fn render_dynamic<'a>(
    frame: &'a Frame,
    sizing: SequenceSizing,
    components: &'a [Raster],
    background: u32,
) -> impl Iterator<Item = (&'a Placement, Raster)> + 'a {
    frame.placements.iter().filter_map(move |p| {
        let component = components.get(p.index)?;
        let mut canvas = Raster::new(sizing.width, sizing.height, background);
        canvas.blit(
            component,
            i64::from(p.x) + sizing.center_x,
            i64::from(p.y) + sizing.center_y,
            None,
        );
        Some((p, canvas))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::sputm::chunk::test_support::chunk;

    fn aksq(code: &[u8]) -> RawChunk {
        let bytes = chunk(b"AKSQ", code);
        let mut cursor = ByteCursor::new(&bytes, 0);
        RawChunk::read_next(&mut cursor).unwrap()
    }

    fn component(x: i16, y: i16, index: u8) -> Vec<u8> {
        [x.to_le_bytes().as_slice(), y.to_le_bytes().as_slice(), &[index]].concat()
    }

    fn static_frame(parts: &[Vec<u8>]) -> Vec<u8> {
        let mut code = vec![0xC0, 0x20, parts.len() as u8];
        for part in parts {
            code.extend_from_slice(part);
        }
        code
    }

    #[test]
    fn static_frames_and_sequence_boundaries() {
        let code = [
            static_frame(&[component(0, 0, 0)]),
            vec![0x00, 0xC0, 0x10, 1, 2, 3],
            static_frame(&[component(1, 1, 1)]),
            vec![0xC0, 0xFF],
            static_frame(&[component(2, 2, 0)]),
            vec![0xC0, 0xFF],
        ]
        .concat();
        let mut diag = Diagnostics::new();
        let sequences = decode_sequences(&aksq(&code), 2, &mut diag);
        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[0].frames.len(), 2);
        assert_eq!(sequences[0].frames[1].number, 1);
        assert_eq!(sequences[1].frames[0].number, 0);
        assert_eq!(sequences[1].frames[0].placements[0].x, 2);
        assert_eq!(diag.warnings() + diag.errors(), 0);
    }

    #[test]
    fn escaped_component_indices() {
        let mut code = vec![0xC0, 0x20, 3];
        // 0x80 then 0x85: index 0x85
        code.extend_from_slice(&[0, 0, 0, 0, 0x80, 0x85]);
        // 0x80 then 0x05: index 0x105
        code.extend_from_slice(&[0, 0, 0, 0, 0x80, 0x05]);
        // 0x81 then 0x02: index 0x102
        code.extend_from_slice(&[0, 0, 0, 0, 0x81, 0x02]);
        code.extend_from_slice(&[0xC0, 0xFF]);
        let sequences = decode_sequences(&aksq(&code), 0x200, &mut Diagnostics::new());
        let indices: Vec<usize> = sequences[0].referenced().collect();
        assert_eq!(indices, vec![0x85, 0x105, 0x102]);
    }

    #[test]
    fn out_of_range_components_are_dropped() {
        let code = [
            static_frame(&[component(2000, 0, 0), component(0, 0, 7), component(3, 4, 0)]),
            vec![0xC0, 0xFF],
        ]
        .concat();
        let mut diag = Diagnostics::new();
        let sequences = decode_sequences(&aksq(&code), 1, &mut diag);
        assert_eq!(sequences[0].frames[0].placements.len(), 1);
        assert_eq!(diag.count(DiagnosticKind::OutOfRangeComponent), 2);
    }

    #[test]
    fn dynamic_frame_pairs_ids_and_honours_data_size() {
        // data size covers code, subcode, both size bytes, 2 ids, count,
        // 2 placements and 3 padding bytes
        let mut code = vec![0xC0, 0x21, 20, 2, 0x11, 0x22, 2];
        code.extend_from_slice(&component(0, 0, 0));
        code.extend_from_slice(&component(-1, 0, 1));
        code.extend_from_slice(&[0xEE, 0xEE, 0xEE]);
        code.extend_from_slice(&[0xC0, 0xFF]);
        let mut diag = Diagnostics::new();
        let sequences = decode_sequences(&aksq(&code), 2, &mut diag);
        let frame = &sequences[0].frames[0];
        assert_eq!(frame.kind, FrameKind::Dynamic);
        assert_eq!(frame.placements[0].id, Some(0x11));
        assert_eq!(frame.placements[1].id, Some(0x22));
        assert_eq!(diag.warnings(), 0);
    }

    #[test]
    fn quick_dynamic_frame_has_three_components() {
        let mut code = vec![0xC0, 0x22, 20, 1, 0x33];
        for i in 0..3 {
            code.extend_from_slice(&component(i, 0, 0));
        }
        code.extend_from_slice(&[0xC0, 0xFF]);
        let sequences = decode_sequences(&aksq(&code), 1, &mut Diagnostics::new());
        let placements = &sequences[0].frames[0].placements;
        assert_eq!(placements.len(), 3);
        assert_eq!(placements[0].id, Some(0x33));
        assert_eq!(placements[1].id, None);
    }

    #[test]
    fn unknown_subcode_stops_decoding() {
        let code = [
            static_frame(&[component(0, 0, 0)]),
            vec![0xC0, 0xFF, 0xC0, 0x5A],
            static_frame(&[component(0, 0, 0)]),
            vec![0xC0, 0xFF],
        ]
        .concat();
        let mut diag = Diagnostics::new();
        let sequences = decode_sequences(&aksq(&code), 1, &mut diag);
        assert_eq!(sequences.len(), 1);
        assert_eq!(diag.errors(), 1);
    }

    #[test]
    fn unknown_top_level_code_is_skipped() {
        let code = [vec![0x42], static_frame(&[component(0, 0, 0)]), vec![0xC0, 0xFF]].concat();
        let mut diag = Diagnostics::new();
        let sequences = decode_sequences(&aksq(&code), 1, &mut diag);
        assert_eq!(sequences[0].frames.len(), 1);
        assert_eq!(diag.warnings(), 1);
    }

    #[test]
    fn sizing_covers_negative_offsets() {
        let sequence = Sequence {
            frames: vec![Frame {
                number: 0,
                kind: FrameKind::Static,
                placements: vec![
                    Placement { x: -5, y: -3, index: 0, id: None },
                    Placement { x: 10, y: 10, index: 1, id: None },
                ],
            }],
        };
        let sizing = SequenceSizing::measure(&sequence, &[(8, 8), (8, 8)]);
        assert_eq!((sizing.center_x, sizing.center_y), (5, 3));
        assert_eq!((sizing.width, sizing.height), (23, 21));
    }

    #[test]
    fn static_frames_composite_with_transparency() {
        let frame = Frame {
            number: 0,
            kind: FrameKind::Static,
            placements: vec![
                Placement { x: 0, y: 0, index: 0, id: None },
                Placement { x: 1, y: 0, index: 1, id: None },
            ],
        };
        let sizing = SequenceSizing::measure(
            &Sequence { frames: vec![frame.clone()] },
            &[(2, 1), (2, 1)],
        );
        let mut first = Raster::new(2, 1, 4);
        first.put(1, 0, 0);
        // transparent left pixel keeps what the first component drew
        let mut second = Raster::new(2, 1, 0);
        second.put(1, 0, 6);
        let canvas = render_static(&frame, sizing, &[first, second], 0);
        assert_eq!(canvas.pixels(), &[4, 0, 6]);

        let layers = [Raster::new(2, 1, 1), Raster::new(2, 1, 2)];
        let rendered: Vec<_> = render_dynamic(&frame, sizing, &layers, 0).collect();
        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[1].1.pixels(), &[0, 2, 2]);
    }

    #[test]
    fn truncated_stream_is_recorded() {
        // frame header promising two placements with one present
        let mut code = vec![0xC0, 0x20, 2];
        code.extend_from_slice(&component(0, 0, 0));
        let mut diag = Diagnostics::new();
        let sequences = decode_sequences(&aksq(&code), 1, &mut diag);
        assert!(sequences.is_empty());
        assert_eq!(diag.count(DiagnosticKind::TruncatedPayload), 1);
    }
}
