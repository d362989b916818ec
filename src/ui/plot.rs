use eframe::egui::{Color32, Ui};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points};
use retail_lens::engine::{AgeSales, CategorySales};

use crate::color::ColorMap;

// ---------------------------------------------------------------------------
// Age trend (filtered analysis tab)
// ---------------------------------------------------------------------------

/// Line chart of sales per age, with a marker on every observed age.
pub fn age_trend_plot(ui: &mut Ui, trend: &[AgeSales], title: &str) {
    let points: Vec<[f64; 2]> = trend
        .iter()
        .map(|p| [p.age as f64, p.total_sale])
        .collect();

    Plot::new("age_trend_plot")
        .legend(Legend::default())
        .height(320.0)
        .x_axis_label("Age")
        .y_axis_label("Total Sale")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(false)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            let line_points: PlotPoints = points.iter().copied().collect();
            let marker_points: PlotPoints = points.iter().copied().collect();

            plot_ui.line(
                Line::new(line_points)
                    .name(title)
                    .color(Color32::from_rgb(52, 101, 164))
                    .width(2.0),
            );
            plot_ui.points(
                Points::new(marker_points)
                    .color(Color32::from_rgb(52, 101, 164))
                    .radius(3.5),
            );
        });
}

// ---------------------------------------------------------------------------
// Category breakdown
// ---------------------------------------------------------------------------

/// Horizontal bars, largest category on top.  One chart per category so the
/// legend names every bar with its colour.
pub fn category_bar_chart(ui: &mut Ui, breakdown: &[CategorySales], colors: Option<&ColorMap>) {
    let n = breakdown.len();

    Plot::new("category_bar_chart")
        .legend(Legend::default())
        .height(360.0)
        .x_axis_label("Total Sale")
        .y_axis_label("Category")
        .show_grid([true, false])
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for (rank, entry) in breakdown.iter().enumerate() {
                let color = colors
                    .map(|c| c.color_for(&entry.category))
                    .unwrap_or(Color32::LIGHT_BLUE);
                // First row drawn at the top.
                let position = (n - rank) as f64;
                let bar = Bar::new(position, entry.total_sale)
                    .name(&entry.category)
                    .fill(color)
                    .width(0.7);
                plot_ui.bar_chart(
                    BarChart::new(vec![bar])
                        .horizontal()
                        .color(color)
                        .name(&entry.category),
                );
            }
        });
}
