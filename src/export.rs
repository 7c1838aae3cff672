//! Headless PNG-sequence export for Hero Backdrop
//! Drives the animation over the CPU renderer and writes one PNG per frame.

use crate::config::BackdropConfig;
use crate::driver::{
    AnimationDriver, CancellationToken, FrameBudget, FrameClock, FrameOutcome, Viewport,
    ViewportBus,
};
use crate::offscreen_render::FrameRenderer;
use anyhow::Context;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::{Path, PathBuf};

/// Messages from the export thread to whoever started it.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportMessage {
    /// (current_frame, total_frames)
    Progress(u64, u64),
    Completed(PathBuf),
    Error(String),
}

/// File name of frame `index` inside the output directory.
pub fn frame_path(output_dir: &Path, index: u64) -> PathBuf {
    output_dir.join(format!("frame_{:06}.png", index))
}

/// Render `config.export.frames` frames into `output_dir` on the current thread.
///
/// Stops early, without error, if `token` is cancelled.
pub fn run_headless_export(
    config: BackdropConfig,
    output_dir: &Path,
    token: &CancellationToken,
    progress_tx: &Sender<ExportMessage>,
) -> anyhow::Result<u64> {
    config.validate()?;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;

    let width = config.export.width;
    let height = config.export.height;
    let total = config.export.frames;
    log::info!(
        "exporting {} frames at {}x{} to {}",
        total,
        width,
        height,
        output_dir.display()
    );

    let mut renderer = FrameRenderer::new(width, height, config.palette.background);
    let bus = ViewportBus::new();
    let mut driver = AnimationDriver::new(config);
    driver.activate(&bus, Some(Viewport::new(width as f32, height as f32, 1.0)));

    let mut budget = FrameBudget::new(total);
    let mut written = 0;
    while !token.is_cancelled() && budget.wait_for_frame() {
        if !matches!(driver.frame(&mut renderer), FrameOutcome::Rendered(_)) {
            break;
        }

        let path = frame_path(output_dir, written);
        renderer
            .to_image()
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        written += 1;
        let _ = progress_tx.send(ExportMessage::Progress(written, total));
    }

    if token.is_cancelled() {
        log::info!("export cancelled after {} frames", written);
    }
    driver.deactivate();
    Ok(written)
}

/// Run the export on a background thread. Progress, completion and errors
/// arrive on the returned receiver; the token cancels the run.
pub fn spawn_headless_export(
    config: BackdropConfig,
    output_dir: PathBuf,
) -> (Receiver<ExportMessage>, CancellationToken) {
    let (tx, rx) = unbounded();
    let token = CancellationToken::new();
    let thread_token = token.clone();

    std::thread::spawn(move || {
        match run_headless_export(config, &output_dir, &thread_token, &tx) {
            Ok(frames) => {
                log::info!("export finished: {} frames", frames);
                let _ = tx.send(ExportMessage::Completed(output_dir));
            }
            Err(e) => {
                log::error!("export failed: {:#}", e);
                let _ = tx.send(ExportMessage::Error(format!("{:#}", e)));
            }
        }
    });

    (rx, token)
}
