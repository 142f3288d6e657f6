// src/video.rs

//! Backend assembly and the geometry reactor.
//!
//! `VideoBackend` owns the three periodic activities (refresh clock,
//! scan worker, cursor blinker) and the shared frame state they operate
//! on. It is also the controller's single change-notification target:
//! the host calls [`VideoBackend::device_state_changed`] whenever any
//! CRTC register may have changed, and the backend diffs the four
//! monitored fields itself to decide what, if anything, to rebuild.
//!
//! Rebuilds are synchronous. The buffer swap happens under the same
//! mutex the worker renders under, so a swap can never interleave with a
//! half-written scanline.

use crate::blink::CursorBlinker;
use crate::config::Config;
use crate::crtc::CrtcView;
use crate::display::{DisplaySink, FrameHandle};
use crate::font::GlyphRom;
use crate::raster::{FrameState, Geometry};
use crate::rasterizer::LineRasterizer;
use crate::refresh::{RefreshClock, ScanWorker, TickGate};
use anyhow::Result;
use log::{error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// The video raster backend: glue between a CRTC device, a glyph ROM,
/// and a host display surface.
pub struct VideoBackend {
    crtc: Arc<dyn CrtcView>,
    sink: Arc<dyn DisplaySink>,
    frame: Arc<Mutex<FrameState>>,
    cursor_hidden: Arc<AtomicBool>,
    clock: RefreshClock,
    worker: ScanWorker,
    blinker: Option<CursorBlinker>,
    // Last-observed copies of the monitored CRTC fields, for diffing in
    // device_state_changed.
    geometry: Geometry,
    blink_rate_ms: u64,
}

impl VideoBackend {
    /// Builds the backend and starts its periodic activities.
    ///
    /// Fatal if the refresh clock or scan worker cannot be spawned; a
    /// blinker spawn failure only costs the blink (the cursor stays
    /// solid) and is reported, not propagated.
    pub fn new(
        crtc: Arc<dyn CrtcView>,
        rom: Arc<GlyphRom>,
        sink: Arc<dyn DisplaySink>,
        config: &Config,
    ) -> Result<Self> {
        let geometry = Geometry::from_crtc(crtc.as_ref());
        let blink_rate_ms = crtc.cursor_blink_rate();
        let frame = Arc::new(Mutex::new(FrameState::new(geometry)));
        let cursor_hidden = Arc::new(AtomicBool::new(false));

        let gate = Arc::new(TickGate::new());
        let rasterizer = LineRasterizer::new(crtc.clone(), rom, cursor_hidden.clone());
        let worker = ScanWorker::spawn(gate.clone(), frame.clone(), rasterizer, sink.clone())?;
        let clock = RefreshClock::spawn(gate, config.timing.horizontal_freq_hz)?;
        let blinker = Self::arm_blinker(blink_rate_ms, &cursor_hidden, &sink);

        // Report the initial dimensions so the host can pack its window.
        sink.resize(geometry.width_px(), geometry.total_lines());
        info!(
            "VideoBackend: started, {}x{} px, blink {} ms",
            geometry.width_px(),
            geometry.total_lines(),
            blink_rate_ms
        );

        Ok(VideoBackend {
            crtc,
            sink,
            frame,
            cursor_hidden,
            clock,
            worker,
            blinker,
            geometry,
            blink_rate_ms,
        })
    }

    /// Arms a blinker for a non-zero rate. Failure to arm degrades to a
    /// solid cursor rather than taking the backend down.
    fn arm_blinker(
        rate_ms: u64,
        cursor_hidden: &Arc<AtomicBool>,
        sink: &Arc<dyn DisplaySink>,
    ) -> Option<CursorBlinker> {
        if rate_ms == 0 {
            return None;
        }
        match CursorBlinker::spawn(rate_ms, cursor_hidden.clone(), sink.clone()) {
            Ok(blinker) => Some(blinker),
            Err(e) => {
                error!("VideoBackend: cursor blink disabled: {:#}", e);
                None
            }
        }
    }

    /// The controller's change notification. Diffs the monitored fields
    /// against the last observation and reacts only to real changes:
    /// unchanged values cause no reallocation and no timer churn.
    pub fn device_state_changed(&mut self) {
        let new_rate = self.crtc.cursor_blink_rate();
        if new_rate != self.blink_rate_ms {
            info!(
                "VideoBackend: blink rate {} -> {} ms",
                self.blink_rate_ms, new_rate
            );
            if let Some(mut blinker) = self.blinker.take() {
                blinker.stop();
            }
            // A cursor mid-blink stays hidden otherwise.
            self.cursor_hidden.store(false, Ordering::Relaxed);
            self.blinker = Self::arm_blinker(new_rate, &self.cursor_hidden, &self.sink);
            self.blink_rate_ms = new_rate;
        }

        let new_geometry = Geometry::from_crtc(self.crtc.as_ref());
        if new_geometry != self.geometry {
            info!(
                "VideoBackend: geometry {}x{}x{} -> {}x{}x{}",
                self.geometry.columns,
                self.geometry.rows,
                self.geometry.scan_lines_per_row,
                new_geometry.columns,
                new_geometry.rows,
                new_geometry.scan_lines_per_row
            );
            {
                let mut frame = self.frame.lock().expect("frame state lock poisoned");
                frame.rebuild(new_geometry);
            }
            self.geometry = new_geometry;
            self.sink
                .resize(new_geometry.width_px(), new_geometry.total_lines());
        }
    }

    /// Read access to the finished raster for the display surface.
    pub fn frame(&self) -> FrameHandle {
        FrameHandle::new(self.frame.clone())
    }

    /// Whether the cursor is currently blink-hidden.
    pub fn cursor_hidden(&self) -> bool {
        self.cursor_hidden.load(Ordering::Relaxed)
    }

    /// Stops the clock, worker, and blinker, joining their threads.
    /// Idempotent; also runs on drop.
    pub fn shutdown(&mut self) {
        self.clock.stop();
        self.worker.stop();
        if let Some(mut blinker) = self.blinker.take() {
            blinker.stop();
        }
    }
}

impl Drop for VideoBackend {
    fn drop(&mut self) {
        self.shutdown();
        info!("VideoBackend: shut down");
    }
}
