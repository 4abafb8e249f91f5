//! Plot rendering with egui_plot
//!
//! egui is immediate mode, so [`PlotPanel`] keeps the series from the last
//! [`Renderer::draw`] and paints them on every frame until the next draw.

use egui::{Color32, Ui};
use egui_plot::{Corner, Legend, Line, Plot, PlotPoints};

use super::render_loop::Renderer;
use crate::config::RenderConfig;
use crate::error::Result;
use crate::types::{series_color, Series};

/// Live plot of the most recent window
#[derive(Debug, Clone)]
pub struct PlotPanel {
    series: Vec<Series>,
    line_width: f32,
    show_legend: bool,
    draws: u64,
}

impl PlotPanel {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            series: Vec::new(),
            line_width: config.line_width,
            show_legend: config.show_legend,
            draws: 0,
        }
    }

    /// Series currently on screen
    pub fn series(&self) -> &[Series] {
        &self.series
    }

    /// Number of frames handed over by the render loop
    pub fn draw_count(&self) -> u64 {
        self.draws
    }

    /// Paint the cached series
    pub fn show(&self, ui: &mut Ui, x_label: &str) {
        let mut plot = Plot::new("serialgraph_plot")
            .allow_zoom(true)
            .allow_drag(true)
            .x_axis_label(x_label)
            .y_axis_label("Value");

        if self.show_legend {
            plot = plot.legend(Legend::default().position(Corner::RightTop));
        }

        plot.show(ui, |plot_ui| {
            for (index, series) in self.series.iter().enumerate() {
                if series.is_empty() {
                    continue;
                }

                let [r, g, b, a] = series_color(index);
                let points = PlotPoints::from(series.points.clone());
                let line = Line::new(series.label.as_str(), points)
                    .color(Color32::from_rgba_unmultiplied(r, g, b, a))
                    .width(self.line_width);

                plot_ui.line(line);
            }
        });
    }
}

impl Renderer for PlotPanel {
    fn draw(&mut self, series: &[Series]) -> Result<()> {
        self.series.clear();
        self.series.extend_from_slice(series);
        self.draws += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_replaces_cached_series() {
        let mut panel = PlotPanel::new(&RenderConfig::default());
        panel
            .draw(&[Series::new(1, "C 1", &[0.0, 1.0], &[2.0, 3.0])])
            .unwrap();
        panel
            .draw(&[
                Series::new(1, "C 1", &[0.0], &[2.0]),
                Series::new(2, "C 2", &[0.0], &[5.0]),
            ])
            .unwrap();

        assert_eq!(panel.series().len(), 2);
        assert_eq!(panel.series()[1].points, vec![[0.0, 5.0]]);
        assert_eq!(panel.draw_count(), 2);
    }
}
