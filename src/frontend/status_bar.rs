//! Status bar panel: session state, throughput and the last failure.

use egui::{Color32, RichText, Ui};

use crate::session::SessionState;
use crate::types::{AcquisitionStats, ColumnCount};

/// Context needed to render the status bar.
pub struct StatusBarContext<'a> {
    pub state: SessionState,
    pub port: &'a str,
    pub columns: Option<ColumnCount>,
    pub stats: &'a AcquisitionStats,
    pub fps: f64,
    pub last_error: Option<&'a str>,
}

/// Dot color for a session state
pub fn state_color(state: SessionState) -> Color32 {
    match state {
        SessionState::Streaming => Color32::GREEN,
        SessionState::Connecting | SessionState::DetectingColumns => Color32::YELLOW,
        SessionState::Disconnected => Color32::RED,
        SessionState::Exited => Color32::GRAY,
    }
}

/// Render the status bar.
pub fn render_status_bar(ui: &mut Ui, ctx: &StatusBarContext<'_>) {
    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        ui.colored_label(state_color(ctx.state), "●");
        ui.label(RichText::new(format!("{}: {}", ctx.state, ctx.port)).small());

        ui.separator();

        let columns = ctx
            .columns
            .map_or_else(|| "?".to_string(), |c| c.to_string());
        ui.label(RichText::new(format!("Columns: {}", columns)).small());

        ui.separator();

        let stats = ctx.stats;
        let rate_color = if stats.effective_row_rate > 0.0 {
            Color32::from_rgb(100, 255, 100)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new("Rate:").small());
        ui.colored_label(
            rate_color,
            RichText::new(format!("{:.1} rows/s", stats.effective_row_rate)).small(),
        );

        ui.separator();

        ui.label(RichText::new(format!("Rows: {}", stats.records_accepted)).small());

        ui.separator();

        let rejected = stats.rejected();
        let reject_color = if rejected > 0 {
            Color32::LIGHT_RED
        } else {
            Color32::GRAY
        };
        ui.colored_label(
            reject_color,
            RichText::new(format!("Rejected: {}", rejected)).small(),
        );

        if stats.substitutions > 0 {
            ui.label(RichText::new(format!("Substituted: {}", stats.substitutions)).small());
        }

        if stats.log_failures > 0 {
            ui.colored_label(
                Color32::LIGHT_RED,
                RichText::new(format!("Log errors: {}", stats.log_failures)).small(),
            );
        }

        ui.separator();

        ui.label(RichText::new(format!("FPS: {:.0}", ctx.fps)).small());

        if let Some(error) = ctx.last_error {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.colored_label(Color32::RED, RichText::new(error).small());
            });
        }
    });
}
