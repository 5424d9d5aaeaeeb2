//! Native window showing the Euler trajectory against the exact curve.

use crate::report::plot_series;
use eframe::egui;
use egui_plot::{Legend, Line, Plot, PlotPoints};
use euler_core::comparison::ComparisonReport;

struct PlotApp {
    series: Vec<(String, Vec<[f64; 2]>)>,
}

impl eframe::App for PlotApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            Plot::new("euler_plot")
                .legend(Legend::default())
                .x_axis_label("t")
                .y_axis_label("y")
                .show(ui, |plot_ui| {
                    for (name, points) in &self.series {
                        let plot_points: PlotPoints = points.iter().copied().collect();
                        plot_ui.line(Line::new(plot_points).name(name));
                    }
                });
        });
    }
}

/// Opens a blocking window with both curves.
///
/// # Errors
///
/// Returns an error if the native window cannot be created.
pub fn show(report: &ComparisonReport) -> Result<(), eframe::Error> {
    let series = plot_series(report);
    eframe::run_native(
        "Euler's Method vs Exact Solution",
        eframe::NativeOptions::default(),
        Box::new(move |_cc| Ok(Box::new(PlotApp { series }))),
    )
}
