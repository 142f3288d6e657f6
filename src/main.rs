// src/main.rs

// Declare modules
pub mod blink;
pub mod color;
pub mod config;
pub mod crtc;
pub mod display;
pub mod font;
pub mod raster;
pub mod rasterizer;
pub mod refresh;
pub mod video;

use crate::{
    config::Config,
    crtc::MockCrtc,
    display::{DisplaySink, HeadlessSink},
    font::GlyphRom,
    video::VideoBackend,
};

use anyhow::Context;
use log::info;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Demo harness: drives the backend against an in-process mock CRTC and
/// a headless sink, since window creation belongs to the host simulator.
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting crt-video demo...");

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(Path::new(&path))
            .with_context(|| format!("failed to load configuration from {}", path))?,
        None => Config::default(),
    };

    let rom = match &config.font.rom_path {
        Some(path) => Arc::new(GlyphRom::load(path).context("failed to load glyph ROM")?),
        None => GlyphRom::builtin(),
    };

    // A 40x25 text screen with a blinking full-height cursor.
    let crtc = Arc::new(MockCrtc::new(40, 25, 8));
    crtc.write_text(0, "HELLO FROM THE 6545");
    crtc.set_cursor(true, 19, 0, 7);
    crtc.set_blink_rate(500);

    let sink = Arc::new(HeadlessSink::new());
    let mut backend = VideoBackend::new(
        crtc.clone(),
        rom,
        sink.clone() as Arc<dyn DisplaySink>,
        &config,
    )
    .context("failed to start video backend")?;

    let (width, height) = backend.frame().dimensions();
    info!("Raster is {}x{} px", width, height);

    // Let the refresh loop run for a bit, reporting throughput.
    for second in 1..=3 {
        std::thread::sleep(Duration::from_secs(1));
        info!(
            "t={}s: {} lines published, {} cursor redraws",
            second,
            sink.lines_published(),
            sink.redraws_requested()
        );
    }

    // Reprogram the controller to an 80-column screen and notify the
    // backend the way the host simulator would.
    crtc.set_geometry(80, 25, 8);
    backend.device_state_changed();
    let (width, height) = backend.frame().dimensions();
    info!("After mode change: raster is {}x{} px", width, height);

    std::thread::sleep(Duration::from_secs(1));
    info!(
        "Final: {} lines published, {} cursor redraws",
        sink.lines_published(),
        sink.redraws_requested()
    );

    backend.shutdown();
    info!("crt-video demo exited cleanly");
    Ok(())
}
