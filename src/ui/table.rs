use eframe::egui::{self, Ui};
use egui_extras::{Column, TableBuilder};
use retail_lens::data::summary::ColumnSummary;
use retail_lens::query::ResultSet;

// ---------------------------------------------------------------------------
// Generic tables
// ---------------------------------------------------------------------------

const ROW_HEIGHT: f32 = 20.0;

/// Render any aggregation result as a striped table.
pub fn result_table(ui: &mut Ui, id: &str, result: &ResultSet) {
    if result.is_empty() {
        ui.label("No matching rows.");
        return;
    }

    ui.push_id(id, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .columns(Column::auto().at_least(90.0), result.columns().len())
            .header(ROW_HEIGHT, |mut header| {
                for name in result.columns() {
                    header.col(|ui: &mut Ui| {
                        ui.strong(name.as_str());
                    });
                }
            })
            .body(|mut body| {
                for row in result.rows() {
                    body.row(ROW_HEIGHT, |mut table_row| {
                        for value in row {
                            table_row.col(|ui: &mut Ui| {
                                ui.label(value.to_string());
                            });
                        }
                    });
                }
            });
    });
}

/// Describe-style statistics: one row per column.
pub fn statistics_table(ui: &mut Ui, summaries: &[ColumnSummary]) {
    const STATS: [&str; 11] = [
        "count", "unique", "top", "freq", "mean", "std", "min", "25%", "50%", "75%", "max",
    ];

    ui.push_id("statistics", |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(Column::auto().at_least(110.0))
            .columns(Column::auto().at_least(60.0), STATS.len())
            .header(ROW_HEIGHT, |mut header| {
                header.col(|ui: &mut Ui| {
                    ui.strong("column");
                });
                for stat in STATS {
                    header.col(|ui: &mut Ui| {
                        ui.strong(stat);
                    });
                }
            })
            .body(|mut body| {
                for summary in summaries {
                    let entries = summary.entries();
                    body.row(ROW_HEIGHT, |mut table_row| {
                        table_row.col(|ui: &mut Ui| {
                            ui.label(summary.column.name());
                        });
                        for stat in STATS {
                            let text = entries
                                .iter()
                                .find(|(name, _)| *name == stat)
                                .map(|(_, v)| v.as_str())
                                .unwrap_or("");
                            table_row.col(|ui: &mut Ui| {
                                ui.label(text);
                            });
                        }
                    });
                }
            });
    });
}
