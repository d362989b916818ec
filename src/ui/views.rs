use eframe::egui::{self, Color32, RichText, Ui};

use retail_lens::engine::TotalsOverview;

use crate::state::{AppState, Overview, Region, Tab};
use crate::ui::{plot, table};

// ---------------------------------------------------------------------------
// Central panel – tabbed views
// ---------------------------------------------------------------------------

/// Render the central panel: a blocking message without data, tabs otherwise.
pub fn central(ui: &mut Ui, state: &mut AppState) {
    if let Some(err) = &state.load_error {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading(RichText::new(format!("❌ {err}")).color(Color32::RED));
        });
        return;
    }

    ui.heading("🛍 Retail Sales Dashboard");
    ui.label("Explore retail sales data by category, gender, and more.");
    ui.separator();

    ui.horizontal(|ui: &mut Ui| {
        for tab in Tab::ALL {
            ui.selectable_value(&mut state.tab, tab, tab.label());
        }
    });
    ui.separator();

    let Some(summary) = &state.overview else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to view sales  (File → Open…)");
        });
        return;
    };

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| match state.tab {
            Tab::Overview => overview(ui, summary),
            Tab::FilteredAnalysis => filtered_analysis(ui, state),
            Tab::CategoryBreakdown => category_breakdown(ui, state, summary),
            Tab::TopProducts => top_products(ui, state),
        });
}

fn overview(ui: &mut Ui, summary: &Overview) {
    show_region(ui, &summary.totals, |ui, totals| {
        ui.columns(3, |cols| {
            metric(&mut cols[0], "Total Sales", &format!("₹{}", format_amount(totals.total_sales, 0)));
            metric(&mut cols[1], "Unique Customers", &totals.unique_customers.to_string());
            metric(&mut cols[2], "Average Sale", &average_sale_label(totals));
        });
    });

    ui.add_space(12.0);
    ui.strong("Summary statistics");
    table::statistics_table(ui, &summary.statistics);
}

/// Average sale as shown on its metric card; "no data" for an empty dataset.
pub fn average_sale_label(totals: &TotalsOverview) -> String {
    totals
        .average_sale
        .map(|a| format!("₹{}", format_amount(a, 2)))
        .unwrap_or_else(|| "no data".to_string())
}

fn filtered_analysis(ui: &mut Ui, state: &AppState) {
    let (Some(filter), Some(views)) = (&state.filter, &state.views) else {
        ui.label("No category / gender to select in this dataset.");
        return;
    };
    let title = format!("{} - {}", filter.category(), filter.gender());

    ui.heading(format!("Sales Summary for {title}"));
    show_region(ui, &views.filtered_table, |ui, rs| {
        table::result_table(ui, "filtered_summary", rs);
    });

    if state.show_chart {
        ui.add_space(12.0);
        ui.heading("Sales Trend by Age");
        show_region(ui, &views.age_trend, |ui, trend| {
            if trend.is_empty() {
                ui.label("No sales for this selection.");
            } else {
                plot::age_trend_plot(ui, trend, &format!("Age-wise Sales for {title}"));
            }
        });
    }
}

fn category_breakdown(ui: &mut Ui, state: &AppState, summary: &Overview) {
    ui.heading("📊 Sales by Category");
    if state.show_chart {
        show_region(ui, &summary.breakdown, |ui, breakdown| {
            plot::category_bar_chart(ui, breakdown, state.color_map.as_ref());
        });
    }
    if state.show_table {
        ui.add_space(12.0);
        show_region(ui, &summary.breakdown_table, |ui, rs| {
            table::result_table(ui, "category_breakdown", rs);
        });
    }
}

fn top_products(ui: &mut Ui, state: &AppState) {
    ui.heading(format!("Top {} Products", state.top_n().get()));
    let Some(views) = &state.views else {
        ui.label("No sales to rank in this dataset.");
        return;
    };
    match &views.top_products {
        None => {
            ui.label("This dataset has no product_id / product_name columns.");
        }
        Some(region) => show_region(ui, region, |ui, rs| {
            table::result_table(ui, "top_products", rs);
        }),
    }
}

// -- Widgets --

/// Render a region's content, or its fault in place of it.  The rest of the
/// dashboard keeps working.
fn show_region<T>(ui: &mut Ui, region: &Region<T>, add_contents: impl FnOnce(&mut Ui, &T)) {
    match region {
        Ok(value) => add_contents(ui, value),
        Err(msg) => {
            ui.label(RichText::new(format!("⚠ {msg}")).color(Color32::RED));
        }
    }
}

fn metric(ui: &mut Ui, label: &str, value: &str) {
    egui::Frame::group(ui.style())
        .show(ui, |ui: &mut Ui| {
            ui.vertical_centered(|ui: &mut Ui| {
                ui.label(label);
                ui.label(RichText::new(value).size(24.0).strong());
            });
        });
}

/// Format with thousands separators: `format_amount(1234567.891, 2)` →
/// `"1,234,567.89"`.
pub fn format_amount(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}
