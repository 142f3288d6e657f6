// src/refresh.rs

//! Refresh timing: the fixed-rate tick source and the render worker it
//! drives.
//!
//! The two sides meet at [`TickGate`], a single-slot mailbox built from a
//! mutex-guarded flag and a condvar. The clock only sets the flag and
//! notifies; the worker waits, clears, renders. Because the slot holds at
//! most one pending tick, a burst of ticks while a line is still being
//! rendered collapses to a single render: the backend drops frames under
//! load instead of building a backlog. That is the intended backpressure
//! policy, not a bug.
//!
//! Both threads are named, log their lifecycle, and are joined on stop.

use crate::display::DisplaySink;
use crate::raster::FrameState;
use crate::rasterizer::LineRasterizer;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Microseconds per second, for deriving the tick period from the
/// horizontal frequency.
const MICROS_PER_SEC: u64 = 1_000_000;

/// Single-slot "render due" mailbox between clock and worker.
pub struct TickGate {
    state: Mutex<GateState>,
    cond: Condvar,
}

#[derive(Default)]
struct GateState {
    pending: bool,
    shutdown: bool,
}

impl TickGate {
    pub fn new() -> Self {
        TickGate {
            state: Mutex::new(GateState::default()),
            cond: Condvar::new(),
        }
    }

    /// Marks a tick pending and wakes one waiter. Ticks signalled while
    /// one is already pending coalesce into it.
    pub fn signal(&self) {
        let mut state = self.state.lock().expect("tick gate lock poisoned");
        state.pending = true;
        self.cond.notify_one();
    }

    /// Blocks until a tick is pending, consumes it, and returns `true`.
    /// Returns `false` once the gate has been shut down.
    pub fn wait(&self) -> bool {
        let mut state = self.state.lock().expect("tick gate lock poisoned");
        while !state.pending && !state.shutdown {
            state = self
                .cond
                .wait(state)
                .expect("tick gate lock poisoned");
        }
        if state.shutdown {
            return false;
        }
        state.pending = false;
        true
    }

    /// Whether a tick is currently pending, without consuming it.
    pub fn is_pending(&self) -> bool {
        self.state.lock().expect("tick gate lock poisoned").pending
    }

    /// Wakes all waiters and makes every future `wait` return `false`.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().expect("tick gate lock poisoned");
        state.shutdown = true;
        self.cond.notify_all();
    }
}

impl Default for TickGate {
    fn default() -> Self {
        TickGate::new()
    }
}

/// Stop flag with prompt wakeup, for threads that sleep between beats.
/// `wait_for` returns `true` as soon as stop is requested, or `false`
/// after the full period elapses.
pub(crate) struct StopSignal {
    stopped: Mutex<bool>,
    cond: Condvar,
}

impl StopSignal {
    pub(crate) fn new() -> Self {
        StopSignal {
            stopped: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    pub(crate) fn wait_for(&self, period: Duration) -> bool {
        let mut stopped = self.stopped.lock().expect("stop signal lock poisoned");
        let deadline = std::time::Instant::now() + period;
        loop {
            if *stopped {
                return true;
            }
            let now = std::time::Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .cond
                .wait_timeout(stopped, deadline - now)
                .expect("stop signal lock poisoned");
            stopped = guard;
        }
    }

    pub(crate) fn stop(&self) {
        *self.stopped.lock().expect("stop signal lock poisoned") = true;
        self.cond.notify_all();
    }
}

/// Fixed-rate tick source: one tick per emulated horizontal scan period.
///
/// The clock thread does no rendering at all, so tick latency stays
/// independent of render cost. It only signals the gate.
pub struct RefreshClock {
    stop: Arc<StopSignal>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshClock {
    /// Spawns the clock thread ticking at `horizontal_freq_hz`.
    pub fn spawn(gate: Arc<TickGate>, horizontal_freq_hz: u32) -> Result<Self> {
        let period = Duration::from_micros(MICROS_PER_SEC / u64::from(horizontal_freq_hz.max(1)));
        let stop = Arc::new(StopSignal::new());
        let thread_stop = stop.clone();

        let handle = thread::Builder::new()
            .name("refresh-clock".to_string())
            .spawn(move || {
                info!(
                    "RefreshClock: started ({} Hz, period {:?})",
                    horizontal_freq_hz, period
                );
                while !thread_stop.wait_for(period) {
                    gate.signal();
                }
                debug!("RefreshClock: thread exiting");
            })
            .context("failed to spawn refresh clock thread")?;

        Ok(RefreshClock {
            stop,
            handle: Some(handle),
        })
    }

    /// Stops the clock and joins its thread. Idempotent.
    pub fn stop(&mut self) {
        self.stop.stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("RefreshClock: thread panicked");
            }
        }
    }
}

impl Drop for RefreshClock {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The render loop: waits on the gate, rasterizes the active scanline,
/// advances the scan position, and publishes the finished line.
pub struct ScanWorker {
    gate: Arc<TickGate>,
    handle: Option<JoinHandle<()>>,
}

impl ScanWorker {
    /// Spawns the worker thread.
    pub fn spawn(
        gate: Arc<TickGate>,
        frame: Arc<Mutex<FrameState>>,
        rasterizer: LineRasterizer,
        sink: Arc<dyn DisplaySink>,
    ) -> Result<Self> {
        let worker_gate = gate.clone();
        let handle = thread::Builder::new()
            .name("scan-worker".to_string())
            .spawn(move || {
                info!("ScanWorker: started");
                while worker_gate.wait() {
                    let published = {
                        let mut frame = frame.lock().expect("frame state lock poisoned");
                        let FrameState {
                            geometry,
                            raster,
                            scan,
                            ..
                        } = &mut *frame;
                        if raster.line_count() == 0 {
                            continue;
                        }
                        let position = *scan;
                        let line = raster.line_mut(position.active_line);
                        if let Err(e) = rasterizer.render(line, position, geometry) {
                            // One bad fetch skips this line for the
                            // cycle; stale pixels stay visible and the
                            // next tick carries on.
                            warn!(
                                "ScanWorker: scanline {} skipped: {}",
                                position.active_line, e
                            );
                        }
                        scan.advance(geometry);
                        position.active_line
                    };
                    // Publish outside the lock so a slow sink cannot
                    // stall a concurrent rebuild.
                    sink.publish_line(published);
                }
                debug!("ScanWorker: thread exiting");
            })
            .context("failed to spawn scan worker thread")?;

        Ok(ScanWorker {
            gate,
            handle: Some(handle),
        })
    }

    /// Shuts the gate and joins the worker. Idempotent.
    pub fn stop(&mut self) {
        self.gate.shutdown();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("ScanWorker: thread panicked");
            }
        }
    }
}

impl Drop for ScanWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crtc::MockCrtc;
    use crate::display::HeadlessSink;
    use crate::font::GlyphRom;
    use crate::raster::Geometry;
    use test_log::test;

    #[test]
    fn gate_coalesces_bursts_of_ticks() {
        let gate = TickGate::new();
        for _ in 0..5 {
            gate.signal();
        }
        // Five signals, one pending tick: the first wait consumes
        // everything and no further tick remains.
        assert!(gate.wait());
        assert!(!gate.is_pending());
    }

    #[test]
    fn gate_shutdown_unblocks_waiters() {
        let gate = Arc::new(TickGate::new());
        let waiter_gate = gate.clone();
        let waiter = thread::spawn(move || waiter_gate.wait());
        gate.shutdown();
        assert!(!waiter.join().unwrap());
        // Shutdown is sticky.
        assert!(!gate.wait());
    }

    #[test]
    fn clock_delivers_ticks() {
        let gate = Arc::new(TickGate::new());
        let mut clock = RefreshClock::spawn(gate.clone(), 10_000).unwrap();
        // Period is 100us; the first tick arrives well within this wait.
        assert!(gate.wait());
        clock.stop();
    }

    fn worker_fixture() -> (
        Arc<TickGate>,
        Arc<Mutex<FrameState>>,
        Arc<HeadlessSink>,
        ScanWorker,
    ) {
        let crtc = Arc::new(MockCrtc::new(2, 2, 4));
        crtc.set_cursor(false, 0, 0, 7);
        let geometry = Geometry::from_crtc(crtc.as_ref());
        let frame = Arc::new(Mutex::new(FrameState::new(geometry)));
        let gate = Arc::new(TickGate::new());
        let sink = Arc::new(HeadlessSink::new());
        let rasterizer = LineRasterizer::new(
            crtc,
            GlyphRom::builtin(),
            Arc::new(std::sync::atomic::AtomicBool::new(false)),
        );
        let worker = ScanWorker::spawn(
            gate.clone(),
            frame.clone(),
            rasterizer,
            sink.clone() as Arc<dyn DisplaySink>,
        )
        .unwrap();
        (gate, frame, sink, worker)
    }

    #[test]
    fn worker_renders_lines_in_scan_order() {
        let (gate, frame, sink, mut worker) = worker_fixture();

        // One tick at a time, waiting for each to be consumed, so the
        // published count is deterministic.
        for expected in 0..3 {
            gate.signal();
            while sink.lines_published() <= expected {
                thread::sleep(Duration::from_millis(1));
            }
        }
        worker.stop();

        assert_eq!(sink.lines_published(), 3);
        assert_eq!(sink.last_line(), 2);
        let frame = frame.lock().unwrap();
        assert_eq!(frame.scan.active_line, 3);
        assert_eq!(frame.scan.char_line, 3);
    }

    #[test]
    fn worker_wraps_at_frame_end() {
        let (gate, frame, sink, mut worker) = worker_fixture();
        let total = frame.lock().unwrap().geometry.total_lines();

        for expected in 0..total {
            gate.signal();
            while sink.lines_published() <= expected {
                thread::sleep(Duration::from_millis(1));
            }
        }
        worker.stop();

        let frame = frame.lock().unwrap();
        assert_eq!(frame.scan.active_line, 0);
        assert_eq!(frame.scan.char_line, 0);
        assert_eq!(sink.last_line(), total - 1);
    }

    #[test]
    fn worker_survives_memory_errors() {
        let crtc = Arc::new(MockCrtc::new(2, 1, 8));
        crtc.set_start_address(0x4000); // every fetch fails
        let geometry = Geometry::from_crtc(crtc.as_ref());
        let frame = Arc::new(Mutex::new(FrameState::new(geometry)));
        let gate = Arc::new(TickGate::new());
        let sink = Arc::new(HeadlessSink::new());
        let rasterizer = LineRasterizer::new(
            crtc,
            GlyphRom::builtin(),
            Arc::new(std::sync::atomic::AtomicBool::new(false)),
        );
        let mut worker = ScanWorker::spawn(
            gate.clone(),
            frame.clone(),
            rasterizer,
            sink.clone() as Arc<dyn DisplaySink>,
        )
        .unwrap();

        for expected in 0..2 {
            gate.signal();
            while sink.lines_published() <= expected {
                thread::sleep(Duration::from_millis(1));
            }
        }
        worker.stop();

        // The failing line still advanced the scan and was published
        // (with stale background content).
        assert_eq!(sink.lines_published(), 2);
        assert_eq!(frame.lock().unwrap().scan.active_line, 2);
    }
}
