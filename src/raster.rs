// src/raster.rs

//! The in-memory raster: per-scanline pixel buffers, the frame-sized
//! collection of them, and the scan position that walks the frame.
//!
//! `RasterLine` widths are fixed for the lifetime of a buffer generation.
//! A geometry change never resizes lines in place; the whole
//! `RasterBuffer` is discarded and reallocated so no partially-sized line
//! is ever observable. Out-of-range pixel indices are a programming error
//! (geometry and rasterizer disagree about the frame shape) and panic
//! rather than being papered over.

use crate::color::PixelColor;
use crate::crtc::CrtcView;
use crate::font::GLYPH_WIDTH;

/// Snapshot of the geometry registers that shape the visible frame.
///
/// Captured when the frame is (re)built so that a register write midway
/// through a frame cannot skew line indexing; the rasterizer keeps using
/// the snapshot until the reactor swaps the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Characters displayed per row.
    pub columns: usize,
    /// Character rows displayed per frame.
    pub rows: usize,
    /// Scanlines making up one character row.
    pub scan_lines_per_row: usize,
}

impl Geometry {
    /// Reads the current geometry registers from the controller.
    pub fn from_crtc(crtc: &dyn CrtcView) -> Self {
        Geometry {
            columns: crtc.horizontal_displayed(),
            rows: crtc.vertical_displayed(),
            scan_lines_per_row: crtc.scan_lines_per_row(),
        }
    }

    /// Visible frame width in pixels.
    pub fn width_px(&self) -> usize {
        self.columns * GLYPH_WIDTH
    }

    /// Visible frame height in scanlines.
    pub fn total_lines(&self) -> usize {
        self.rows * self.scan_lines_per_row
    }
}

/// One physical scanline of palette-indexed pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterLine {
    pixels: Vec<PixelColor>,
}

impl RasterLine {
    /// A line of `width` background pixels.
    pub fn new(width: usize) -> Self {
        RasterLine {
            pixels: vec![PixelColor::Background; width],
        }
    }

    pub fn width(&self) -> usize {
        self.pixels.len()
    }

    /// Sets one pixel to foreground or background.
    ///
    /// # Panics
    /// Panics if `idx >= width`.
    pub fn set(&mut self, idx: usize, on: bool) {
        self.pixels[idx] = PixelColor::from_bit(on);
    }

    /// Sets one pixel to an explicit palette level, for multi-intensity
    /// rendering.
    ///
    /// # Panics
    /// Panics if `idx >= width`.
    pub fn set_color(&mut self, idx: usize, color: PixelColor) {
        self.pixels[idx] = color;
    }

    /// Reads one pixel.
    ///
    /// # Panics
    /// Panics if `idx >= width`.
    pub fn get(&self, idx: usize) -> PixelColor {
        self.pixels[idx]
    }

    /// Applies the XOR cursor inversion to `len` pixels starting at
    /// `start`.
    ///
    /// # Panics
    /// Panics if the span reaches past the end of the line.
    pub fn invert_span(&mut self, start: usize, len: usize) {
        for px in &mut self.pixels[start..start + len] {
            *px = px.inverted();
        }
    }

    /// Resets every pixel to one palette level.
    pub fn fill(&mut self, color: PixelColor) {
        self.pixels.fill(color);
    }

    /// The raw pixel slice, for display sinks painting the line.
    pub fn pixels(&self) -> &[PixelColor] {
        &self.pixels
    }
}

/// All visible scanlines of one frame generation.
#[derive(Debug)]
pub struct RasterBuffer {
    lines: Vec<RasterLine>,
    width: usize,
}

impl RasterBuffer {
    /// Allocates a buffer of background-filled lines for `geometry`.
    pub fn new(geometry: &Geometry) -> Self {
        let width = geometry.width_px();
        RasterBuffer {
            lines: (0..geometry.total_lines())
                .map(|_| RasterLine::new(width))
                .collect(),
            width,
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Borrow a line for painting. `None` past the end of the frame, so a
    /// sink holding a stale line index across a rebuild reads nothing
    /// rather than panicking.
    pub fn line(&self, y: usize) -> Option<&RasterLine> {
        self.lines.get(y)
    }

    /// Borrow a line for rendering.
    ///
    /// # Panics
    /// Panics if `y` is outside the frame; the scan state is reset on
    /// every rebuild, so an out-of-range index here is a bug.
    pub fn line_mut(&mut self, y: usize) -> &mut RasterLine {
        &mut self.lines[y]
    }
}

/// The render position: which scanline is next, and where that scanline
/// falls within its character row.
///
/// Advanced exactly once per rendered line by the scan worker, wrapping
/// at the frame height and at the character-row height. Reset to (0,0)
/// whenever geometry changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanState {
    /// Absolute scanline index within the frame.
    pub active_line: usize,
    /// Scanline index within the current character row.
    pub char_line: usize,
}

impl ScanState {
    pub fn reset(&mut self) {
        *self = ScanState::default();
    }

    /// Steps to the next scanline.
    pub fn advance(&mut self, geometry: &Geometry) {
        self.active_line += 1;
        if self.active_line >= geometry.total_lines() {
            self.active_line = 0; // start of a new frame
        }
        self.char_line += 1;
        if self.char_line >= geometry.scan_lines_per_row {
            self.char_line = 0; // start of a new character row
        }
    }
}

/// Everything the render worker and the geometry reactor coordinate on,
/// guarded by a single mutex: the buffer, the scan position, and the
/// geometry snapshot they were built for.
#[derive(Debug)]
pub struct FrameState {
    pub geometry: Geometry,
    pub raster: RasterBuffer,
    pub scan: ScanState,
    /// Bumped on every rebuild; lets observers tell buffer swaps apart.
    pub generation: u64,
}

impl FrameState {
    pub fn new(geometry: Geometry) -> Self {
        FrameState {
            raster: RasterBuffer::new(&geometry),
            scan: ScanState::default(),
            geometry,
            generation: 0,
        }
    }

    /// Discards the buffer and reallocates at the new dimensions. The old
    /// lines are dropped, never resized, and the scan position restarts
    /// at the top of the frame.
    pub fn rebuild(&mut self, geometry: Geometry) {
        self.geometry = geometry;
        self.raster = RasterBuffer::new(&geometry);
        self.scan.reset();
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(columns: usize, rows: usize, scan_lines_per_row: usize) -> Geometry {
        Geometry {
            columns,
            rows,
            scan_lines_per_row,
        }
    }

    #[test]
    fn buffer_matches_geometry() {
        let geom = geometry(40, 25, 8);
        let buffer = RasterBuffer::new(&geom);
        assert_eq!(buffer.line_count(), 200);
        assert_eq!(buffer.width(), 320);
        assert_eq!(buffer.line(0).unwrap().width(), 320);
        assert!(buffer.line(200).is_none());
    }

    #[test]
    fn line_set_and_get() {
        let mut line = RasterLine::new(8);
        line.set(0, true);
        line.set_color(1, PixelColor::Dim);
        assert_eq!(line.get(0), PixelColor::Foreground);
        assert_eq!(line.get(1), PixelColor::Dim);
        assert_eq!(line.get(2), PixelColor::Background);
    }

    #[test]
    #[should_panic]
    fn out_of_range_pixel_panics() {
        let mut line = RasterLine::new(8);
        line.set(8, true);
    }

    #[test]
    fn invert_span_twice_restores_line() {
        let mut line = RasterLine::new(8);
        line.set(1, true);
        line.set_color(2, PixelColor::Dim);
        let before: Vec<_> = line.pixels().to_vec();

        line.invert_span(0, 8);
        assert_ne!(line.pixels(), &before[..]);
        line.invert_span(0, 8);
        assert_eq!(line.pixels(), &before[..]);
    }

    #[test]
    fn scan_state_wraps_after_full_frame() {
        let geom = geometry(10, 3, 5);
        let mut scan = ScanState::default();
        for _ in 0..geom.total_lines() {
            scan.advance(&geom);
        }
        assert_eq!(scan, ScanState::default());
    }

    #[test]
    fn scan_state_char_line_wraps_per_row() {
        let geom = geometry(10, 2, 4);
        let mut scan = ScanState::default();
        for expected in [1, 2, 3, 0, 1] {
            scan.advance(&geom);
            assert_eq!(scan.char_line, expected);
        }
        assert_eq!(scan.active_line, 5);
    }

    #[test]
    fn rebuild_replaces_buffer_and_resets_scan() {
        let mut frame = FrameState::new(geometry(4, 2, 8));
        let geom = frame.geometry;
        frame.scan.advance(&geom);
        assert_ne!(frame.scan, ScanState::default());

        frame.rebuild(geometry(8, 4, 10));
        assert_eq!(frame.generation, 1);
        assert_eq!(frame.scan, ScanState::default());
        assert_eq!(frame.raster.line_count(), 40);
        assert_eq!(frame.raster.width(), 64);
    }
}
