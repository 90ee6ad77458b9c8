use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};

use erp_dashboard::config::DashboardConfig;
use erp_dashboard::data::filter::{DateRange, city_options, customer_options, state_options};
use erp_dashboard::export;
use erp_dashboard::pipeline::{self, Request, View};
use erp_dashboard::query::{QueryOutcome, SqliteConnection, execute_query};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// Filters, chart type and measure of the current interaction.
    pub request: Request,

    /// Latest display result (one load of the data file).
    pub view: View,

    /// Date-picker values; only applied while `use_date_range` is set.
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub use_date_range: bool,

    /// Query connection, present when a database is configured.
    pub connection: Option<SqliteConnection>,
    pub show_query_window: bool,
    pub query_text: String,
    pub query_outcome: Option<QueryOutcome>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        let request = Request {
            chart_type: config.chart_type().unwrap_or_default(),
            measure: config.measure().unwrap_or_default(),
            ..Default::default()
        };
        let connection = config.database.as_deref().and_then(|path| {
            SqliteConnection::open(path)
                .inspect_err(|e| log::error!("Could not open query database: {e}"))
                .ok()
        });
        let today = Local::now().date_naive();
        let view = pipeline::display(&config.data_source(), &request);

        Self {
            config,
            request,
            view,
            date_from: today,
            date_to: today,
            use_date_range: false,
            connection,
            show_query_window: false,
            query_text: String::new(),
            query_outcome: None,
            status_message: None,
        }
    }

    /// Reload the data file and rebuild the view for the current request.
    pub fn refresh(&mut self) {
        self.request.criteria.date_range = self
            .use_date_range
            .then(|| DateRange::new(self.date_from, self.date_to));
        self.view = pipeline::display(&self.config.data_source(), &self.request);
    }

    pub fn state_options(&self) -> Vec<String> {
        state_options(&self.view.snapshot)
    }

    pub fn city_options(&self) -> Vec<String> {
        city_options(&self.view.snapshot, self.request.criteria.state.as_deref())
    }

    pub fn customer_options(&self) -> Vec<String> {
        customer_options(
            &self.view.snapshot,
            self.request.criteria.state.as_deref(),
            self.request.criteria.city.as_deref(),
        )
    }

    /// Choosing a state resets the dependent city and customer.
    pub fn set_state(&mut self, state: Option<String>) {
        let criteria = &mut self.request.criteria;
        if criteria.state != state {
            criteria.state = state;
            criteria.city = None;
            criteria.customer = None;
        }
    }

    pub fn set_city(&mut self, city: Option<String>) {
        let criteria = &mut self.request.criteria;
        if criteria.city != city {
            criteria.city = city;
            criteria.customer = None;
        }
    }

    // -- Exports --

    fn save_dialog(&self, title: &str, name: &str, ext: &str) -> Option<PathBuf> {
        rfd::FileDialog::new()
            .set_title(title)
            .set_directory(&self.config.export_dir)
            .set_file_name(name)
            .add_filter(ext.to_uppercase(), &[ext])
            .save_file()
    }

    fn write_to(&mut self, path: &Path, bytes: erp_dashboard::Result<Vec<u8>>) {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match bytes.and_then(|b| export::write_export(dir, &name, &b)) {
            Ok(written) => self.status_message = Some(format!("Saved {}", written.display())),
            Err(e) => {
                log::error!("Export failed: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    pub fn export_spreadsheet(&mut self) {
        if let Some(path) = self.save_dialog("Export filtered rows", export::SPREADSHEET_FILE_NAME, "csv") {
            let bytes = pipeline::export_spreadsheet(&self.config.data_source(), &self.request.criteria);
            self.write_to(&path, bytes);
        }
    }

    pub fn export_workbook(&mut self) {
        if let Some(path) = self.save_dialog("Export filtered rows", export::WORKBOOK_FILE_NAME, "xlsx") {
            let bytes = pipeline::export_workbook(&self.config.data_source(), &self.request.criteria);
            self.write_to(&path, bytes);
        }
    }

    pub fn export_parquet(&mut self) {
        if let Some(path) = self.save_dialog("Export filtered rows", export::PARQUET_FILE_NAME, "parquet") {
            let bytes = pipeline::export_parquet(&self.config.data_source(), &self.request.criteria);
            self.write_to(&path, bytes);
        }
    }

    pub fn export_document(&mut self) {
        if let Some(path) = self.save_dialog("Export chart", export::DOCUMENT_FILE_NAME, "png") {
            let bytes = pipeline::export_document(&self.config.data_source(), &self.request);
            self.write_to(&path, bytes);
        }
    }

    // -- Query page --

    pub fn run_query(&mut self) {
        let Some(conn) = &self.connection else {
            self.status_message = Some("No database configured".to_string());
            return;
        };
        match execute_query(conn, &self.query_text, &self.config.data_path) {
            Ok(outcome) => {
                self.status_message = Some(match &outcome {
                    QueryOutcome::NoData => "Query executed successfully but returned no data".to_string(),
                    QueryOutcome::Saved { path, rows, columns, .. } => format!(
                        "Retrieved {rows} rows with {} columns. Saved to {}",
                        columns.len(),
                        path.display()
                    ),
                });
                self.query_outcome = Some(outcome);
                self.refresh();
            }
            Err(e) => {
                self.status_message = Some(format!("Error: {e}"));
                self.query_outcome = None;
            }
        }
    }

    /// Save the last query result under a timestamped name.
    pub fn download_query_results(&mut self) {
        let Some(QueryOutcome::Saved { path, .. }) = &self.query_outcome else {
            return;
        };
        let name = export::query_results_file_name(Local::now().naive_local());
        let bytes = std::fs::read(path).map_err(erp_dashboard::DashboardError::from);
        let target = self.config.export_dir.join(name);
        self.write_to(&target, bytes);
    }
}
