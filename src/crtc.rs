// src/crtc.rs

//! The query interface to the CRT controller collaborator.
//!
//! The controller chip itself (register model, character memory, state
//! machine) lives in the host machine simulator. This backend only reads
//! it through [`CrtcView`]: geometry registers, the character at a memory
//! address, and the cursor state. Character fetches can fail with a
//! [`MemoryAccessError`] when the controller points at an unmapped
//! address; everything else is infallible register reads.
//!
//! Whenever controller state may have changed, the host calls
//! [`crate::video::VideoBackend::device_state_changed`]; there are no
//! per-field change events, the backend diffs for itself.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Error returned by [`CrtcView::char_at`] for an unmapped or otherwise
/// unreadable video memory address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryAccessError {
    pub address: usize,
}

impl fmt::Display for MemoryAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "video memory access failed at address {:#06x}", self.address)
    }
}

impl std::error::Error for MemoryAccessError {}

/// Read-only view of the CRT controller state.
///
/// Implemented by the host simulator's CRTC device. All methods take
/// `&self` and are called from the render worker thread, so
/// implementations must be `Send + Sync` and internally consistent under
/// concurrent reads.
pub trait CrtcView: Send + Sync {
    /// Characters displayed per row.
    fn horizontal_displayed(&self) -> usize;
    /// Character rows displayed per frame.
    fn vertical_displayed(&self) -> usize;
    /// Scanlines making up one character row.
    fn scan_lines_per_row(&self) -> usize;
    /// Cursor blink half-period in milliseconds; 0 disables blinking.
    fn cursor_blink_rate(&self) -> u64;

    /// First character memory address of the visible frame.
    fn start_address(&self) -> usize;
    /// The character code stored at an absolute memory address.
    fn char_at(&self, address: usize) -> Result<u8, MemoryAccessError>;

    /// Whether the hardware cursor is enabled at all.
    fn cursor_enabled(&self) -> bool;
    /// Absolute memory address of the cursor cell.
    fn cursor_position(&self) -> usize;
    /// First glyph scanline covered by the cursor (inclusive).
    fn cursor_start_line(&self) -> usize;
    /// Last glyph scanline covered by the cursor (inclusive).
    fn cursor_stop_line(&self) -> usize;
}

/// In-memory CRTC stand-in backed by a plain character buffer.
///
/// Used by the demo binary and the test suite in place of a real
/// controller device. All fields are atomics so a test (or the demo's
/// update loop) can mutate state while the render worker reads it.
pub struct MockCrtc {
    memory: Vec<AtomicUsize>,
    columns: AtomicUsize,
    rows: AtomicUsize,
    scan_lines_per_row: AtomicUsize,
    blink_rate_ms: AtomicUsize,
    start_address: AtomicUsize,
    cursor_enabled: AtomicBool,
    cursor_position: AtomicUsize,
    cursor_start_line: AtomicUsize,
    cursor_stop_line: AtomicUsize,
}

impl MockCrtc {
    /// A controller with the given geometry, memory filled with spaces,
    /// and a full-height enabled cursor at address 0.
    pub fn new(columns: usize, rows: usize, scan_lines_per_row: usize) -> Self {
        let memory = (0..columns * rows * 2)
            .map(|_| AtomicUsize::new(b' ' as usize))
            .collect();
        MockCrtc {
            memory,
            columns: AtomicUsize::new(columns),
            rows: AtomicUsize::new(rows),
            scan_lines_per_row: AtomicUsize::new(scan_lines_per_row),
            blink_rate_ms: AtomicUsize::new(0),
            start_address: AtomicUsize::new(0),
            cursor_enabled: AtomicBool::new(true),
            cursor_position: AtomicUsize::new(0),
            cursor_start_line: AtomicUsize::new(0),
            cursor_stop_line: AtomicUsize::new(7),
        }
    }

    /// Writes a string into character memory starting at `address`.
    pub fn write_text(&self, address: usize, text: &str) {
        for (i, byte) in text.bytes().enumerate() {
            if let Some(cell) = self.memory.get(address + i) {
                cell.store(byte as usize, Ordering::Relaxed);
            }
        }
    }

    pub fn set_geometry(&self, columns: usize, rows: usize, scan_lines_per_row: usize) {
        self.columns.store(columns, Ordering::Relaxed);
        self.rows.store(rows, Ordering::Relaxed);
        self.scan_lines_per_row
            .store(scan_lines_per_row, Ordering::Relaxed);
    }

    pub fn set_blink_rate(&self, rate_ms: u64) {
        self.blink_rate_ms.store(rate_ms as usize, Ordering::Relaxed);
    }

    pub fn set_cursor(&self, enabled: bool, position: usize, start_line: usize, stop_line: usize) {
        self.cursor_enabled.store(enabled, Ordering::Relaxed);
        self.cursor_position.store(position, Ordering::Relaxed);
        self.cursor_start_line.store(start_line, Ordering::Relaxed);
        self.cursor_stop_line.store(stop_line, Ordering::Relaxed);
    }

    pub fn set_start_address(&self, address: usize) {
        self.start_address.store(address, Ordering::Relaxed);
    }
}

impl CrtcView for MockCrtc {
    fn horizontal_displayed(&self) -> usize {
        self.columns.load(Ordering::Relaxed)
    }

    fn vertical_displayed(&self) -> usize {
        self.rows.load(Ordering::Relaxed)
    }

    fn scan_lines_per_row(&self) -> usize {
        self.scan_lines_per_row.load(Ordering::Relaxed)
    }

    fn cursor_blink_rate(&self) -> u64 {
        self.blink_rate_ms.load(Ordering::Relaxed) as u64
    }

    fn start_address(&self) -> usize {
        self.start_address.load(Ordering::Relaxed)
    }

    fn char_at(&self, address: usize) -> Result<u8, MemoryAccessError> {
        self.memory
            .get(address)
            .map(|cell| cell.load(Ordering::Relaxed) as u8)
            .ok_or(MemoryAccessError { address })
    }

    fn cursor_enabled(&self) -> bool {
        self.cursor_enabled.load(Ordering::Relaxed)
    }

    fn cursor_position(&self) -> usize {
        self.cursor_position.load(Ordering::Relaxed)
    }

    fn cursor_start_line(&self) -> usize {
        self.cursor_start_line.load(Ordering::Relaxed)
    }

    fn cursor_stop_line(&self) -> usize {
        self.cursor_stop_line.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_fetches_written_text() {
        let crtc = MockCrtc::new(4, 2, 8);
        crtc.write_text(0, "AB");
        assert_eq!(crtc.char_at(0).unwrap(), b'A');
        assert_eq!(crtc.char_at(1).unwrap(), b'B');
        assert_eq!(crtc.char_at(2).unwrap(), b' ');
    }

    #[test]
    fn mock_reports_unmapped_address() {
        let crtc = MockCrtc::new(2, 1, 8);
        let err = crtc.char_at(0x1000).unwrap_err();
        assert_eq!(err.address, 0x1000);
        assert!(err.to_string().contains("0x1000"));
    }
}
