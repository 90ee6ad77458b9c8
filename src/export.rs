//! Exports: the filtered rows as a spreadsheet (CSV or Excel workbook) or
//! Parquet file, and the selected chart as a PNG page.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field as ArrowField, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use chrono::NaiveDateTime;
use image::{DynamicImage, ImageFormat};
use parquet::arrow::ArrowWriter;
use rust_xlsxwriter::Workbook;

use crate::chart::ChartSpec;
use crate::data::model::{Dataset, Value};
use crate::error::{DashboardError, Result};
use crate::render::render_chart;

pub const SPREADSHEET_FILE_NAME: &str = "Filtered_Sales_Data.csv";
pub const WORKBOOK_FILE_NAME: &str = "Filtered_Sales_Data.xlsx";
pub const PARQUET_FILE_NAME: &str = "Filtered_Sales_Data.parquet";
pub const DOCUMENT_FILE_NAME: &str = "chart_export.png";

// ---------------------------------------------------------------------------
// Spreadsheet
// ---------------------------------------------------------------------------

/// Serialise every column and row of `dataset`, header first, in natural
/// column order. An empty dataset yields the header row only.
pub fn export_spreadsheet(dataset: &Dataset) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&dataset.columns)?;
    for row in &dataset.rows {
        writer.write_record(row.iter().map(Value::to_cell))?;
    }
    writer
        .into_inner()
        .map_err(|e| DashboardError::Io(e.into_error()))
}

/// The same table as [`export_spreadsheet`] as a single-sheet Excel
/// workbook. Numbers and booleans keep their cell type; dates and text are
/// written as text; nulls leave the cell blank.
pub fn export_workbook(dataset: &Dataset) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (c, name) in dataset.columns.iter().enumerate() {
        sheet.write_string(0, sheet_col(c)?, name)?;
    }
    for (r, row) in dataset.rows.iter().enumerate() {
        let r = u32::try_from(r + 1)
            .map_err(|_| DashboardError::InvalidArgument("too many rows for a worksheet".into()))?;
        for (c, value) in row.iter().enumerate() {
            let c = sheet_col(c)?;
            match value {
                Value::Null => continue,
                Value::Integer(i) => sheet.write_number(r, c, *i as f64)?,
                Value::Float(v) => sheet.write_number(r, c, *v)?,
                Value::Bool(b) => sheet.write_boolean(r, c, *b)?,
                other => sheet.write_string(r, c, &other.to_string())?,
            };
        }
    }
    Ok(workbook.save_to_buffer()?)
}

fn sheet_col(c: usize) -> Result<u16> {
    u16::try_from(c).map_err(|_| DashboardError::InvalidArgument("too many columns for a worksheet".into()))
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

/// Column type inferred from the non-null values it holds.
fn infer_type(dataset: &Dataset, col: usize) -> DataType {
    let mut ty: Option<DataType> = None;
    for row in &dataset.rows {
        let next = match &row[col] {
            Value::Null => continue,
            Value::Integer(_) => DataType::Int64,
            Value::Float(_) => DataType::Float64,
            Value::Bool(_) => DataType::Boolean,
            Value::String(_) | Value::Date(_) => return DataType::Utf8,
        };
        ty = Some(match (ty, next) {
            (None, t) => t,
            (Some(a), b) if a == b => a,
            (Some(DataType::Int64), DataType::Float64) | (Some(DataType::Float64), DataType::Int64) => {
                DataType::Float64
            }
            _ => return DataType::Utf8,
        });
    }
    ty.unwrap_or(DataType::Utf8)
}

fn build_column(dataset: &Dataset, col: usize, ty: &DataType) -> ArrayRef {
    let cells = dataset.rows.iter().map(|row| &row[col]);
    match ty {
        DataType::Int64 => Arc::new(Int64Array::from(
            cells
                .map(|v| match v {
                    Value::Integer(i) => Some(*i),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        DataType::Float64 => Arc::new(Float64Array::from(cells.map(Value::as_f64).collect::<Vec<_>>())),
        DataType::Boolean => Arc::new(BooleanArray::from(
            cells
                .map(|v| match v {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        _ => Arc::new(StringArray::from(
            cells
                .map(|v| (!v.is_null()).then(|| v.to_cell()))
                .collect::<Vec<Option<String>>>(),
        )),
    }
}

/// Serialise `dataset` as a single-row-group Parquet file.
pub fn export_parquet(dataset: &Dataset) -> Result<Vec<u8>> {
    let types: Vec<DataType> = (0..dataset.columns.len())
        .map(|col| infer_type(dataset, col))
        .collect();
    let schema = Arc::new(Schema::new(
        dataset
            .columns
            .iter()
            .zip(&types)
            .map(|(name, ty)| ArrowField::new(name, ty.clone(), true))
            .collect::<Vec<_>>(),
    ));
    let arrays: Vec<ArrayRef> = types
        .iter()
        .enumerate()
        .map(|(col, ty)| build_column(dataset, col, ty))
        .collect();
    let options = RecordBatchOptions::new().with_row_count(Some(dataset.len()));
    let batch = RecordBatch::try_new_with_options(schema.clone(), arrays, &options)?;

    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(buf)
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Render `chart` onto a 1000×600 page and encode it as PNG.
pub fn export_document(chart: &ChartSpec) -> Result<Vec<u8>> {
    let img = DynamicImage::ImageRgb8(render_chart(chart)?);
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Write `bytes` to `dir/name`, creating `dir` if needed.
pub fn write_export(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(name);
    std::fs::write(&path, bytes)?;
    log::info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}

/// Download name for a query result: `sql_query_results_YYYYMMDD_HHMMSS.csv`.
pub fn query_results_file_name(now: NaiveDateTime) -> String {
    format!("sql_query_results_{}.csv", now.format("%Y%m%d_%H%M%S"))
}
