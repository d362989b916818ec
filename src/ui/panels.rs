use eframe::egui::{self, Color32, RichText, Ui};
use retail_lens::data::filter::TopN;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("📌 Filters");
    ui.separator();

    let (Some(domain), Some(filter)) = (&state.domain, &state.filter) else {
        ui.label("No dataset loaded.");
        return;
    };

    // Clone what we need so we can mutate state after the widgets.
    let categories: Vec<String> = domain.categories().map(str::to_string).collect();
    let genders: Vec<String> = domain.genders().map(str::to_string).collect();
    let mut category = filter.category().to_string();
    let mut gender = filter.gender().to_string();
    let mut top_n = state.top_n().get();

    ui.strong("Select Category");
    egui::ComboBox::from_id_salt("category")
        .selected_text(&category)
        .width(ui.available_width())
        .show_ui(ui, |ui: &mut Ui| {
            for value in &categories {
                ui.selectable_value(&mut category, value.clone(), value.as_str());
            }
        });
    ui.add_space(6.0);

    ui.strong("Select Gender");
    egui::ComboBox::from_id_salt("gender")
        .selected_text(&gender)
        .width(ui.available_width())
        .show_ui(ui, |ui: &mut Ui| {
            for value in &genders {
                ui.selectable_value(&mut gender, value.clone(), value.as_str());
            }
        });
    ui.add_space(6.0);

    ui.strong("Top products");
    let top_n_changed = ui
        .add(egui::Slider::new(&mut top_n, TopN::MIN..=TopN::MAX).text("rows"))
        .changed();

    ui.separator();
    ui.checkbox(&mut state.show_chart, "Show Sales Chart");
    ui.checkbox(&mut state.show_table, "Show Data Table");

    if category != state.filter.as_ref().map(|f| f.category()).unwrap_or_default() {
        state.select_category(&category);
    }
    if gender != state.filter.as_ref().map(|f| f.gender()).unwrap_or_default() {
        state.select_gender(&gender);
    }
    if top_n_changed {
        state.set_top_n(top_n);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.source.is_some(), egui::Button::new("Reload"))
                .clicked()
            {
                state.reload();
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            let source = state
                .source
                .as_ref()
                .map(|s| s.path().display().to_string())
                .unwrap_or_default();
            ui.label(format!("{} records loaded from {source}", ds.len()));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open sales data")
        .add_filter("Supported files", &["csv", "tsv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("TSV", &["tsv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        log::info!("Opening {}", path.display());
        state.open(path);
    }
}
