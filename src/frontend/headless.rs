//! Headless mode: periodic text summaries instead of a window
//!
//! Runs the same [`RenderLoop`] as the GUI with a [`Renderer`] that logs the
//! latest value of each series. The loop returns once the worker reports
//! [`AcquisitionEvent::Ended`].

use std::time::{Duration, Instant};

use super::render_loop::{RenderLoop, Renderer, TickOutcome};
use crate::backend::{AcquisitionEvent, FrontendReceiver};
use crate::config::AppConfig;
use crate::error::Result;
use crate::types::{AcquisitionStats, Series};

/// Logs one line per drawn frame
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    last_summary: Option<String>,
    frames: u64,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent summary line
    pub fn last_summary(&self) -> Option<&str> {
        self.last_summary.as_deref()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// `C 1=0.5 C 2=3` from the last point of each series
pub fn summarize(series: &[Series]) -> String {
    let parts: Vec<String> = series
        .iter()
        .filter_map(|s| s.points.last().map(|[_, y]| format!("{}={}", s.label, y)))
        .collect();
    if parts.is_empty() {
        "no samples".to_string()
    } else {
        parts.join(" ")
    }
}

impl Renderer for HeadlessRenderer {
    fn draw(&mut self, series: &[Series]) -> Result<()> {
        let summary = summarize(series);
        tracing::info!("{}", summary);
        self.last_summary = Some(summary);
        self.frames += 1;
        Ok(())
    }
}

/// Drive the render loop until the session ends
pub fn run_headless(frontend: &FrontendReceiver, config: &AppConfig) -> Result<AcquisitionStats> {
    let interval = Duration::from_millis(config.render.headless_interval_ms.max(1));
    let mut render = RenderLoop::from_config(&config.render);
    let mut renderer = HeadlessRenderer::new();
    let mut stats = AcquisitionStats::default();
    let mut next_tick = Instant::now() + interval;

    loop {
        let wait = next_tick.saturating_duration_since(Instant::now());
        let mut ended = false;

        if let Some(event) = frontend.recv_timeout(wait) {
            match event {
                AcquisitionEvent::StateChanged(state) => {
                    tracing::info!("Session state: {}", state);
                }
                AcquisitionEvent::ColumnsDetected(columns) => {
                    tracing::info!("Detected {} columns", columns);
                }
                AcquisitionEvent::Stats(latest) => stats = latest,
                AcquisitionEvent::DataReady { .. } => {}
                AcquisitionEvent::Ended { state, error } => {
                    match error {
                        Some(e) => tracing::warn!("Session ended ({}): {}", state, e),
                        None => tracing::info!("Session ended ({})", state),
                    }
                    ended = true;
                }
            }
        } else if frontend.state().is_terminal() {
            // worker gone without a final event
            ended = true;
        }

        if ended || Instant::now() >= next_tick {
            let outcome = render.tick(frontend.session(), &mut renderer)?;
            if let TickOutcome::Drawn { points, skews, .. } = outcome {
                tracing::debug!(
                    "{} points, {} skewed, {:.1} rows/s, {} rejected",
                    points,
                    skews.len(),
                    stats.effective_row_rate,
                    stats.rejected()
                );
            }
            next_tick = Instant::now() + interval;
        }

        if ended {
            return Ok(stats);
        }
    }
}
