//! Frontend module for the egui UI and the headless renderer
//!
//! The frontend receives events from the acquisition worker through a
//! crossbeam channel and reads samples from the shared store. It never
//! touches the transport.
//!
//! # Main Types
//!
//! - [`SerialGraphApp`] - Main application state implementing [`eframe::App`]
//! - [`RenderLoop`] - Windowed snapshot and series assembly, shared by both frontends
//! - [`PlotPanel`] - egui_plot renderer
//! - [`HeadlessRenderer`] - tracing renderer used with `--headless`

pub mod fps;
pub mod headless;
pub mod plot;
pub mod render_loop;
pub mod status_bar;

pub use fps::FpsEstimator;
pub use headless::{run_headless, HeadlessRenderer};
pub use plot::PlotPanel;
pub use render_loop::{build_series, RenderLoop, RenderSkew, Renderer, TickOutcome};
pub use status_bar::{render_status_bar, StatusBarContext};

use std::time::Duration;

use crate::backend::{AcquisitionEvent, FrontendReceiver};
use crate::config::AppConfig;
use crate::types::{AcquisitionStats, ColumnCount};

/// Main application state
pub struct SerialGraphApp {
    frontend: FrontendReceiver,
    config: AppConfig,
    render: RenderLoop,
    plot: PlotPanel,
    stats: AcquisitionStats,
    columns: Option<ColumnCount>,
    last_error: Option<String>,
    ended: bool,
}

impl SerialGraphApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        frontend: FrontendReceiver,
        config: AppConfig,
    ) -> Self {
        Self {
            render: RenderLoop::from_config(&config.render),
            plot: PlotPanel::new(&config.render),
            columns: frontend.session().columns(),
            frontend,
            config,
            stats: AcquisitionStats::default(),
            last_error: None,
            ended: false,
        }
    }

    /// Apply pending worker events; returns true if any arrived
    fn process_backend_messages(&mut self) -> bool {
        let events = self.frontend.drain();
        let had_messages = !events.is_empty();

        for event in events {
            match event {
                AcquisitionEvent::StateChanged(state) => {
                    tracing::debug!("UI observed state {}", state);
                }
                AcquisitionEvent::ColumnsDetected(columns) => self.columns = Some(columns),
                AcquisitionEvent::DataReady { .. } => {}
                AcquisitionEvent::Stats(stats) => self.stats = stats,
                AcquisitionEvent::Ended { error, .. } => {
                    if let Some(e) = error {
                        self.last_error = Some(e);
                    }
                    self.ended = true;
                }
            }
        }

        had_messages
    }
}

impl eframe::App for SerialGraphApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_backend_messages();

        if let Err(e) = self.render.tick(self.frontend.session(), &mut self.plot) {
            tracing::warn!("Render tick failed: {}", e);
        }

        let state = self.frontend.state();

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            render_status_bar(
                ui,
                &StatusBarContext {
                    state,
                    port: &self.config.serial.port,
                    columns: self.columns,
                    stats: &self.stats,
                    fps: self.render.fps(),
                    last_error: self.last_error.as_deref(),
                },
            );
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.plot.show(ui, self.render.mode().x_label());
        });

        if self.ended && state.is_terminal() {
            tracing::info!("Session finished ({}), closing window", state);
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        } else {
            ctx.request_repaint_after(Duration::from_millis(
                self.config.render.repaint_interval_ms.max(1),
            ));
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.frontend.shutdown();
    }
}
