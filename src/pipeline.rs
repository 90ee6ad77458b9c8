//! One request, one snapshot: load once, then thread the same rows through
//! filter → chart (display) or filter → export.

use serde::{Deserialize, Serialize};

use crate::chart::{ChartSpec, ChartType, select_chart};
use crate::data::filter::{FilterCriteria, filter};
use crate::data::loader::{DataSource, load_for_dashboard};
use crate::data::model::{Dataset, Measure};
use crate::error::Result;
use crate::export;

/// Everything a single dashboard interaction asks for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub criteria: FilterCriteria,
    pub chart_type: ChartType,
    pub measure: Measure,
}

/// Result of the display path. `snapshot` is the unfiltered load the
/// dropdown options are drawn from.
#[derive(Debug, Clone)]
pub struct View {
    pub snapshot: Dataset,
    pub rows: Dataset,
    pub chart: ChartSpec,
}

/// Build the view for an already-loaded snapshot.
pub fn view_of(snapshot: Dataset, request: &Request) -> View {
    let rows = filter(&snapshot, &request.criteria);
    let chart = select_chart(request.chart_type, &rows, request.measure);
    log::debug!(
        "{} of {} rows pass the filters, chart {:?}",
        rows.len(),
        snapshot.len(),
        chart.kind
    );
    View {
        snapshot,
        rows,
        chart,
    }
}

/// Load `source` once and build the display view.
pub fn display(source: &dyn DataSource, request: &Request) -> View {
    view_of(load_for_dashboard(source), request)
}

/// Filtered rows of a fresh load.
fn fresh_rows(source: &dyn DataSource, criteria: &FilterCriteria) -> Dataset {
    filter(&load_for_dashboard(source), criteria)
}

/// Filtered rows of a fresh load as spreadsheet bytes.
pub fn export_spreadsheet(source: &dyn DataSource, criteria: &FilterCriteria) -> Result<Vec<u8>> {
    export::export_spreadsheet(&fresh_rows(source, criteria))
}

/// Filtered rows of a fresh load as an Excel workbook.
pub fn export_workbook(source: &dyn DataSource, criteria: &FilterCriteria) -> Result<Vec<u8>> {
    export::export_workbook(&fresh_rows(source, criteria))
}

/// Filtered rows of a fresh load as Parquet bytes.
pub fn export_parquet(source: &dyn DataSource, criteria: &FilterCriteria) -> Result<Vec<u8>> {
    export::export_parquet(&fresh_rows(source, criteria))
}

/// The chart the display path would show, as document bytes.
pub fn export_document(source: &dyn DataSource, request: &Request) -> Result<Vec<u8>> {
    export::export_document(&display(source, request).chart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::FileSource;

    #[test]
    fn missing_source_still_produces_a_view() {
        let view = display(&FileSource::new("/nonexistent.csv"), &Request::default());
        assert!(view.rows.is_empty());
        assert!(view.chart.is_no_data());
    }

    #[test]
    fn missing_source_exports_header_only_spreadsheet() {
        let bytes = export_spreadsheet(&FileSource::new("/nonexistent.csv"), &FilterCriteria::default()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("state_name,city_name,party_name,invoice_date,item_name,invoice_value"));
    }

    #[test]
    fn missing_source_exports_empty_parquet_with_required_columns() {
        let bytes = export_parquet(&FileSource::new("/nonexistent.csv"), &FilterCriteria::default()).unwrap();
        assert_eq!(&bytes[..4], b"PAR1");

        let dir = tempfile::tempdir().unwrap();
        let path = export::write_export(dir.path(), export::PARQUET_FILE_NAME, &bytes).unwrap();
        let reloaded = crate::data::loader::load_file(&path).unwrap();
        assert!(reloaded.is_empty());
        assert_eq!(reloaded.columns, load_for_dashboard(&FileSource::new("/nonexistent.csv")).columns);
    }

    #[test]
    fn parquet_export_reloads_the_source() {
        use std::io::Write;

        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(b"item_name,invoice_value\nA,1\n").unwrap();
        let source = FileSource::new(file.path());
        let before = export_parquet(&source, &FilterCriteria::default()).unwrap();

        file.write_all(b"B,2\n").unwrap();
        file.flush().unwrap();
        let after = export_parquet(&source, &FilterCriteria::default()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = export::write_export(dir.path(), export::PARQUET_FILE_NAME, &after).unwrap();
        assert_ne!(before, after);
        assert_eq!(crate::data::loader::load_file(&path).unwrap().len(), 2);
    }

    #[test]
    fn missing_source_exports_a_workbook() {
        let bytes = export_workbook(&FileSource::new("/nonexistent.csv"), &FilterCriteria::default()).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
