//! Periodic redraw gated by session state
//!
//! Each tick copies the most recent `sample_window` samples out of the store,
//! pairs the x-axis sequence with every y sequence and hands the result to a
//! [`Renderer`]. Copying a bounded window keeps per-frame cost flat no matter
//! how long the session has been running.
//!
//! A y sequence whose length differs from the x sequence is not drawn for that
//! tick and is reported as a [`RenderSkew`]; the next tick retries.

use super::fps::FpsEstimator;
use crate::backend::store::StoreSnapshot;
use crate::config::RenderConfig;
use crate::error::Result;
use crate::session::SessionHandle;
use crate::types::{column_label, ColumnCount, ColumnMode, Series};
use std::time::Instant;

/// Drawing collaborator
pub trait Renderer {
    /// Draw one frame; must not block longer than a frame interval
    fn draw(&mut self, series: &[Series]) -> Result<()>;
}

/// A series skipped this tick because its length differs from the x axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSkew {
    pub sequence: usize,
    pub x_len: usize,
    pub y_len: usize,
}

/// What a tick did
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No store yet (still connecting or detecting)
    NotReady,
    /// Nothing new and not streaming
    Skipped,
    /// The renderer was called
    Drawn {
        series: usize,
        points: usize,
        skews: Vec<RenderSkew>,
    },
}

/// Pair the x-axis sequence with each y sequence of `snapshot`
pub fn build_series(
    snapshot: &StoreSnapshot,
    mode: ColumnMode,
    columns: ColumnCount,
) -> (Vec<Series>, Vec<RenderSkew>) {
    let mut series = Vec::new();
    let mut skews = Vec::new();

    let Some(x) = snapshot.sequence(mode.x_sequence()) else {
        return (series, skews);
    };

    for (ordinal, sequence) in mode.y_sequences(columns).enumerate() {
        let Some(y) = snapshot.sequence(sequence) else {
            continue;
        };
        if y.len() != x.len() {
            skews.push(RenderSkew {
                sequence,
                x_len: x.len(),
                y_len: y.len(),
            });
            continue;
        }
        series.push(Series::new(sequence, column_label(ordinal + 1), x, y));
    }

    (series, skews)
}

/// Render loop state kept between ticks
#[derive(Debug)]
pub struct RenderLoop {
    sample_window: usize,
    mode: ColumnMode,
    last_generation: Option<u64>,
    fps: FpsEstimator,
}

impl RenderLoop {
    pub fn new(sample_window: usize, mode: ColumnMode) -> Self {
        Self {
            sample_window: sample_window.max(1),
            mode,
            last_generation: None,
            fps: FpsEstimator::new(),
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(config.sample_window, config.column_mode)
    }

    pub fn mode(&self) -> ColumnMode {
        self.mode
    }

    /// Smoothed rate of drawn frames
    pub fn fps(&self) -> f64 {
        self.fps.fps()
    }

    /// Run one tick against the session's store
    pub fn tick(
        &mut self,
        session: &SessionHandle,
        renderer: &mut dyn Renderer,
    ) -> Result<TickOutcome> {
        let Some(store) = session.store() else {
            return Ok(TickOutcome::NotReady);
        };

        let generation = store.generation();
        let unchanged = self.last_generation == Some(generation);
        if unchanged && !session.state().is_streaming() {
            return Ok(TickOutcome::Skipped);
        }

        let snapshot = store.last_n(self.sample_window);
        let (series, skews) = build_series(&snapshot, self.mode, store.columns());
        for skew in &skews {
            tracing::debug!(
                "Skipping series {} this frame ({} x values, {} y values)",
                skew.sequence,
                skew.x_len,
                skew.y_len
            );
        }

        renderer.draw(&series)?;
        self.last_generation = Some(snapshot.generation);
        self.fps.tick(Instant::now());

        Ok(TickOutcome::Drawn {
            series: series.len(),
            points: snapshot.len(),
            skews,
        })
    }
}
