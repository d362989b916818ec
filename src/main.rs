mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::anyhow;
use app::RetailLensApp;
use eframe::egui;
use retail_lens::config::DashboardConfig;
use state::AppState;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut config = DashboardConfig::load()?;
    if let Some(path) = std::env::args_os().nth(1) {
        config.dataset_path = PathBuf::from(path);
    }
    log::info!("Starting with {config:?}");

    let mut state = AppState::new(&config);
    state.open(config.dataset_path.clone());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Retail Lens – Sales Dashboard",
        options,
        Box::new(move |_cc| Ok(Box::new(RetailLensApp::new(state)))),
    )
    .map_err(|e| anyhow!("UI event loop failed: {e}"))
}
