mod app;
mod state;
mod ui;

use app::DashboardApp;
use eframe::egui;
use erp_dashboard::config::DashboardConfig;

fn main() -> eframe::Result {
    env_logger::init();

    let config = match DashboardConfig::resolve() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration, using defaults: {e}");
            DashboardConfig::default()
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "ERP Sales Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(DashboardApp::new(config)))),
    )
}
