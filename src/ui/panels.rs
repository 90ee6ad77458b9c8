use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use erp_dashboard::chart::ChartType;
use erp_dashboard::data::model::Measure;
use erp_dashboard::query::{QueryConnection, QueryOutcome};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Single-choice dropdown with an "All" entry meaning "no filter".
fn option_combo(ui: &mut Ui, id: &str, label: &str, current: &Option<String>, options: &[String]) -> Option<Option<String>> {
    let mut picked = None;
    ui.strong(label);
    ui.add_enabled_ui(!options.is_empty() || current.is_some(), |ui: &mut Ui| {
        egui::ComboBox::from_id_salt(id)
            .selected_text(current.as_deref().unwrap_or("All"))
            .show_ui(ui, |ui: &mut Ui| {
                if ui.selectable_label(current.is_none(), "All").clicked() {
                    picked = Some(None);
                }
                for opt in options {
                    if ui
                        .selectable_label(current.as_deref() == Some(opt.as_str()), opt)
                        .clicked()
                    {
                        picked = Some(Some(opt.clone()));
                    }
                }
            });
    });
    picked
}

/// Render the left filter panel. Any change re-runs the pipeline.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let before = state.request.clone();
    let dates_before = (state.use_date_range, state.date_from, state.date_to);

    let states = state.state_options();
    let cities = state.city_options();
    let customers = state.customer_options();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            if let Some(v) = option_combo(ui, "state_dd", "State", &state.request.criteria.state, &states) {
                state.set_state(v);
            }
            if let Some(v) = option_combo(ui, "city_dd", "City", &state.request.criteria.city, &cities) {
                state.set_city(v);
            }
            if let Some(v) = option_combo(ui, "cust_dd", "Customer", &state.request.criteria.customer, &customers) {
                state.request.criteria.customer = v;
            }
            ui.separator();

            ui.checkbox(&mut state.use_date_range, "Date range");
            ui.add_enabled_ui(state.use_date_range, |ui: &mut Ui| {
                ui.horizontal(|ui: &mut Ui| {
                    ui.label("From");
                    ui.add(DatePickerButton::new(&mut state.date_from).id_salt("date_from"));
                });
                ui.horizontal(|ui: &mut Ui| {
                    ui.label("To");
                    ui.add(DatePickerButton::new(&mut state.date_to).id_salt("date_to"));
                });
            });
            ui.separator();

            ui.strong("Chart type");
            for chart in ChartType::ALL {
                ui.radio_value(&mut state.request.chart_type, chart, chart.label());
            }
            ui.separator();

            ui.strong("Measure");
            egui::ComboBox::from_id_salt("measure")
                .selected_text(state.request.measure.label())
                .show_ui(ui, |ui: &mut Ui| {
                    for m in Measure::ALL {
                        ui.selectable_value(&mut state.request.measure, m, m.label());
                    }
                });
        });

    let dates_after = (state.use_date_range, state.date_from, state.date_to);
    if state.request != before || dates_after != dates_before {
        state.refresh();
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Reload").clicked() {
                state.refresh();
                ui.close_menu();
            }
            if ui.button("Export rows (CSV)…").clicked() {
                state.export_spreadsheet();
                ui.close_menu();
            }
            if ui.button("Export rows (Excel)…").clicked() {
                state.export_workbook();
                ui.close_menu();
            }
            if ui.button("Export rows (Parquet)…").clicked() {
                state.export_parquet();
                ui.close_menu();
            }
            if ui.button("Export chart (PNG)…").clicked() {
                state.export_document();
                ui.close_menu();
            }
        });

        if state.connection.is_some() && ui.button("SQL Query").clicked() {
            state.show_query_window = true;
        }

        ui.separator();

        ui.label(format!(
            "{} rows loaded, {} match",
            state.view.snapshot.len(),
            state.view.rows.len()
        ));

        if let Some(msg) = &state.status_message {
            let color = if msg.starts_with("Error") {
                Color32::RED
            } else {
                Color32::GRAY
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// Query window
// ---------------------------------------------------------------------------

pub fn query_window(ctx: &egui::Context, state: &mut AppState) {
    let mut open = state.show_query_window;
    egui::Window::new("SQL Query")
        .open(&mut open)
        .default_width(640.0)
        .show(ctx, |ui: &mut Ui| {
            if let Some(conn) = &state.connection {
                ui.label(RichText::new(format!("Connected: {}", conn.describe())).small());
            }
            ui.add(
                egui::TextEdit::multiline(&mut state.query_text)
                    .code_editor()
                    .desired_rows(10)
                    .desired_width(f32::INFINITY),
            );
            ui.horizontal(|ui: &mut Ui| {
                if ui.button("Execute Query").clicked() {
                    state.run_query();
                }
                let saved = matches!(state.query_outcome, Some(QueryOutcome::Saved { .. }));
                if ui.add_enabled(saved, egui::Button::new("Download CSV")).clicked() {
                    state.download_query_results();
                }
                if ui.button("Clear").clicked() {
                    state.query_text.clear();
                }
            });

            if let Some(QueryOutcome::Saved { rows, columns, preview, .. }) = &state.query_outcome {
                ui.separator();
                ui.label(format!("{rows} rows, {} columns", columns.len()));
                ui.label(RichText::new(columns.join(", ")).small());
                ScrollArea::both().max_height(240.0).show(ui, |ui: &mut Ui| {
                    egui::Grid::new("query_preview").striped(true).show(ui, |ui: &mut Ui| {
                        for col in &preview.columns {
                            ui.strong(col);
                        }
                        ui.end_row();
                        for row in &preview.rows {
                            for v in row {
                                ui.label(v.to_cell());
                            }
                            ui.end_row();
                        }
                    });
                });
            }
        });
    state.show_query_window = open;
}
