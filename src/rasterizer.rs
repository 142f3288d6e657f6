// src/rasterizer.rs

//! Scanline rasterization: character codes + glyph ROM -> one line of
//! palette-indexed pixels, with the hardware XOR cursor overlaid.
//!
//! The rasterizer is deliberately stateless between lines. Everything it
//! needs per line is the scan position and the geometry snapshot; the
//! controller and the glyph ROM are shared read-only. That keeps it
//! trivially callable from the worker thread and directly testable
//! without any timing machinery.

use crate::color::PixelColor;
use crate::crtc::{CrtcView, MemoryAccessError};
use crate::font::{GlyphRom, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::raster::{Geometry, RasterLine, ScanState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cursor state sampled once per line, so the overlay decision cannot
/// change between columns of the same scanline.
struct CursorWindow {
    position: usize,
    start_line: usize,
    stop_line: usize,
}

/// Renders single scanlines from controller state and the glyph ROM.
pub struct LineRasterizer {
    crtc: Arc<dyn CrtcView>,
    rom: Arc<GlyphRom>,
    cursor_hidden: Arc<AtomicBool>,
}

impl LineRasterizer {
    pub fn new(
        crtc: Arc<dyn CrtcView>,
        rom: Arc<GlyphRom>,
        cursor_hidden: Arc<AtomicBool>,
    ) -> Self {
        LineRasterizer {
            crtc,
            rom,
            cursor_hidden,
        }
    }

    /// Renders the scanline at `scan` into `line`.
    ///
    /// A [`MemoryAccessError`] from the controller aborts this line and
    /// is returned to the caller; pixels written before the failing fetch
    /// remain. The caller logs and carries on with the next tick, so one
    /// bad fetch never stalls the refresh loop.
    pub fn render(
        &self,
        line: &mut RasterLine,
        scan: ScanState,
        geometry: &Geometry,
    ) -> Result<(), MemoryAccessError> {
        // When the row is taller than the glyph, the trailing scanlines
        // are defined to be background, not stale or undefined pixels.
        if scan.char_line >= GLYPH_HEIGHT {
            line.fill(PixelColor::Background);
            return Ok(());
        }

        let row = scan.active_line / geometry.scan_lines_per_row;
        let start_address = self.crtc.start_address();
        let cursor = self.cursor_window(geometry);

        for col in 0..geometry.columns {
            let offset = row * geometry.columns + col;
            let address = start_address + offset;
            let code = self.crtc.char_at(address)?;

            let glyph_row = self.rom.glyph_row(code, scan.char_line);
            for (px, &on) in glyph_row.iter().enumerate() {
                line.set(col * GLYPH_WIDTH + px, on);
            }

            if let Some(window) = &cursor {
                if window.position == address
                    && scan.char_line >= window.start_line
                    && scan.char_line <= window.stop_line
                {
                    line.invert_span(col * GLYPH_WIDTH, GLYPH_WIDTH);
                }
            }
        }
        Ok(())
    }

    /// Samples the cursor registers, clamping the covered scanline range
    /// against both the glyph height and the row height. Returns `None`
    /// when no overlay applies to this frame at all.
    fn cursor_window(&self, geometry: &Geometry) -> Option<CursorWindow> {
        if self.cursor_hidden.load(Ordering::Relaxed) || !self.crtc.cursor_enabled() {
            return None;
        }
        let limit = GLYPH_HEIGHT.min(geometry.scan_lines_per_row);
        if limit == 0 {
            return None;
        }
        Some(CursorWindow {
            position: self.crtc.cursor_position(),
            start_line: self.crtc.cursor_start_line(),
            stop_line: self.crtc.cursor_stop_line().min(limit - 1),
        })
    }
}
