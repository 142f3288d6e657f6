// src/blink.rs

//! Cursor blink timing.
//!
//! The blinker is an independent periodic toggle: every `rate_ms`
//! milliseconds it flips the shared `hidden` flag and asks the display
//! surface to repaint. It never touches pixel data; the rasterizer reads
//! `hidden` when it next renders the cursor's scanline.
//!
//! A rate of 0 means "no blinking" and is handled by the caller never
//! spawning a blinker at all, leaving `hidden` pinned to `false`.

use crate::display::DisplaySink;
use crate::refresh::StopSignal;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Periodic cursor visibility toggle.
pub struct CursorBlinker {
    stop: Arc<StopSignal>,
    handle: Option<JoinHandle<()>>,
}

impl CursorBlinker {
    /// Spawns the blink thread toggling `hidden` every `rate_ms`
    /// milliseconds.
    ///
    /// Callers must not pass 0; a zero rate disables blinking and is the
    /// caller's decision not to arm a timer in the first place.
    pub fn spawn(
        rate_ms: u64,
        hidden: Arc<AtomicBool>,
        sink: Arc<dyn DisplaySink>,
    ) -> Result<Self> {
        debug_assert!(rate_ms > 0, "a zero blink rate arms no timer");
        let period = Duration::from_millis(rate_ms);
        let stop = Arc::new(StopSignal::new());
        let thread_stop = stop.clone();

        let handle = thread::Builder::new()
            .name("cursor-blink".to_string())
            .spawn(move || {
                info!("CursorBlinker: started ({} ms)", rate_ms);
                while !thread_stop.wait_for(period) {
                    hidden.fetch_xor(true, Ordering::Relaxed);
                    sink.request_redraw();
                }
                debug!("CursorBlinker: thread exiting");
            })
            .context("failed to spawn cursor blink thread")?;

        Ok(CursorBlinker {
            stop,
            handle: Some(handle),
        })
    }

    /// Stops the blink thread and joins it. Idempotent.
    pub fn stop(&mut self) {
        self.stop.stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("CursorBlinker: thread panicked");
            }
        }
    }
}

impl Drop for CursorBlinker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::HeadlessSink;
    use test_log::test;

    #[test]
    fn blinker_toggles_visibility_and_requests_redraws() {
        let hidden = Arc::new(AtomicBool::new(false));
        let sink = Arc::new(HeadlessSink::new());
        let mut blinker =
            CursorBlinker::spawn(5, hidden.clone(), sink.clone() as Arc<dyn DisplaySink>)
                .unwrap();

        // Wait for at least two firings.
        while sink.redraws_requested() < 2 {
            thread::sleep(Duration::from_millis(1));
        }
        blinker.stop();

        let redraws = sink.redraws_requested();
        assert!(redraws >= 2);
        // Visibility parity matches the number of toggles.
        assert_eq!(hidden.load(Ordering::Relaxed), redraws % 2 == 1);
    }

    #[test]
    fn stop_is_prompt_even_with_a_slow_rate() {
        let hidden = Arc::new(AtomicBool::new(false));
        let sink = Arc::new(HeadlessSink::new());
        let mut blinker =
            CursorBlinker::spawn(60_000, hidden, sink as Arc<dyn DisplaySink>).unwrap();

        let started = std::time::Instant::now();
        blinker.stop();
        // The stop signal interrupts the sleep; nowhere near 60 s.
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
