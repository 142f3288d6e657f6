// src/display.rs

//! The hand-off boundary to the host's display surface.
//!
//! The backend never creates windows or dispatches paint events; it only
//! tells the surface *what* is ready through [`DisplaySink`] and lets the
//! surface read finished pixels back through [`FrameHandle`]. Sinks must
//! return quickly: `publish_line` fires once per scanline at the
//! horizontal frequency, and anything that queues must keep at most the
//! most recent line rather than building a backlog.

use crate::raster::{FrameState, RasterLine};
use log::trace;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Callbacks into the host display surface.
///
/// Implementations run on the backend's worker and blinker threads, so
/// they must be `Send + Sync` and must not block.
pub trait DisplaySink: Send + Sync {
    /// A scanline's pixels are ready; repaint that line when convenient.
    fn publish_line(&self, line: usize);

    /// The frame dimensions changed; resize/repack the host window.
    fn resize(&self, width_px: usize, height_px: usize);

    /// Cursor visibility flipped; repaint the cursor region.
    fn request_redraw(&self);
}

/// Read-only access to the current frame for a display surface.
///
/// The handle locks the frame state only for the duration of each call,
/// so a paint callback can run concurrently with the render worker
/// without tearing a line mid-write.
#[derive(Clone)]
pub struct FrameHandle {
    frame: Arc<Mutex<FrameState>>,
}

impl FrameHandle {
    pub(crate) fn new(frame: Arc<Mutex<FrameState>>) -> Self {
        FrameHandle { frame }
    }

    /// Current frame dimensions in pixels, `(width, height)`.
    pub fn dimensions(&self) -> (usize, usize) {
        let frame = self.frame.lock().expect("frame state lock poisoned");
        (frame.geometry.width_px(), frame.geometry.total_lines())
    }

    /// The current buffer generation; bumps on every geometry rebuild.
    pub fn generation(&self) -> u64 {
        self.frame.lock().expect("frame state lock poisoned").generation
    }

    /// Runs `f` over one scanline. Returns `None` if `line` is outside
    /// the current frame, which can happen when a sink holds an index
    /// across a geometry rebuild.
    pub fn with_line<R>(&self, line: usize, f: impl FnOnce(&RasterLine) -> R) -> Option<R> {
        let frame = self.frame.lock().expect("frame state lock poisoned");
        frame.raster.line(line).map(f)
    }
}

/// Sink for running without any host window: counts publishes and
/// remembers the most recent line and size. Backs the demo binary and
/// the threaded tests.
#[derive(Default)]
pub struct HeadlessSink {
    lines_published: AtomicUsize,
    redraws_requested: AtomicUsize,
    last_line: AtomicUsize,
    last_width: AtomicUsize,
    last_height: AtomicUsize,
}

impl HeadlessSink {
    pub fn new() -> Self {
        HeadlessSink::default()
    }

    pub fn lines_published(&self) -> usize {
        self.lines_published.load(Ordering::Relaxed)
    }

    pub fn redraws_requested(&self) -> usize {
        self.redraws_requested.load(Ordering::Relaxed)
    }

    pub fn last_line(&self) -> usize {
        self.last_line.load(Ordering::Relaxed)
    }

    pub fn last_size(&self) -> (usize, usize) {
        (
            self.last_width.load(Ordering::Relaxed),
            self.last_height.load(Ordering::Relaxed),
        )
    }
}

impl DisplaySink for HeadlessSink {
    fn publish_line(&self, line: usize) {
        trace!("HeadlessSink: line {} published", line);
        self.last_line.store(line, Ordering::Relaxed);
        self.lines_published.fetch_add(1, Ordering::Relaxed);
    }

    fn resize(&self, width_px: usize, height_px: usize) {
        trace!("HeadlessSink: resize to {}x{}", width_px, height_px);
        self.last_width.store(width_px, Ordering::Relaxed);
        self.last_height.store(height_px, Ordering::Relaxed);
    }

    fn request_redraw(&self) {
        self.redraws_requested.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Geometry;

    #[test]
    fn frame_handle_reads_dimensions_and_lines() {
        let geometry = Geometry {
            columns: 4,
            rows: 2,
            scan_lines_per_row: 8,
        };
        let frame = Arc::new(Mutex::new(FrameState::new(geometry)));
        let handle = FrameHandle::new(frame);

        assert_eq!(handle.dimensions(), (32, 16));
        assert_eq!(handle.generation(), 0);
        assert_eq!(handle.with_line(0, |line| line.width()), Some(32));
        assert_eq!(handle.with_line(16, |line| line.width()), None);
    }

    #[test]
    fn headless_sink_counts_events() {
        let sink = HeadlessSink::new();
        sink.publish_line(3);
        sink.publish_line(4);
        sink.resize(320, 200);
        sink.request_redraw();

        assert_eq!(sink.lines_published(), 2);
        assert_eq!(sink.last_line(), 4);
        assert_eq!(sink.last_size(), (320, 200));
        assert_eq!(sink.redraws_requested(), 1);
    }
}
