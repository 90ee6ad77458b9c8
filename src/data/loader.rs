use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, BooleanArray, Date32Array, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Dataset, Field, REQUIRED_COLUMNS, Value, parse_date};

// ---------------------------------------------------------------------------
// Data sources
// ---------------------------------------------------------------------------

/// Something a dataset can be (re)loaded from. The caller owns the source and
/// passes it in; nothing here reads ambient connection state.
pub trait DataSource {
    /// Short description for logs and status lines.
    fn describe(&self) -> String;

    /// Load a fresh snapshot.
    fn load(&self) -> Result<Dataset>;
}

/// A delimited, JSON or Parquet file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource { path: path.into() }
    }
}

impl DataSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Dataset> {
        load_file(&self.path)
    }
}

impl DataSource for Dataset {
    fn describe(&self) -> String {
        format!("in-memory dataset ({} rows)", self.len())
    }

    fn load(&self) -> Result<Dataset> {
        Ok(self.clone())
    }
}

/// Load `source`, converting any failure into an empty dataset so filtering,
/// aggregation and export always have a well-defined input.
pub fn load_or_empty(source: &dyn DataSource) -> Dataset {
    match source.load() {
        Ok(dataset) => {
            log::info!(
                "Loaded {} rows with columns {:?} from {}",
                dataset.len(),
                dataset.columns,
                source.describe()
            );
            dataset
        }
        Err(e) => {
            log::warn!("Failed to load {}: {e:#}", source.describe());
            Dataset::default()
        }
    }
}

/// Load a snapshot for the sales view: failures become empty, the expected
/// sales columns are added as all-null when absent, and invoice dates are
/// parsed (unparseable ones become null).
pub fn load_for_dashboard(source: &dyn DataSource) -> Dataset {
    let mut dataset = load_or_empty(source);
    for field in REQUIRED_COLUMNS {
        dataset.ensure_column(field.column_name());
    }
    coerce_dates(&mut dataset);
    dataset
}

fn coerce_dates(dataset: &mut Dataset) {
    let Some(idx) = dataset.field_index(Field::InvoiceDate) else {
        return;
    };
    if dataset.rows.iter().all(|row| row[idx].is_null()) {
        return;
    }
    for row in &mut dataset.rows {
        row[idx] = match row[idx].as_date() {
            Some(d) => Value::Date(d),
            None => Value::Null,
        };
    }
}

// ---------------------------------------------------------------------------
// File entry-point
// ---------------------------------------------------------------------------

/// Load a dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` – comma-delimited with a header row
/// * `.tsv`          – tab-delimited with a header row
/// * `.json`         – `[{ "state_name": "Goa", ... }, ...]`
/// * `.parquet`      – flat columns (strings, ints, floats, bools, dates)
pub fn load_file(path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" | "txt" => load_delimited(path, b','),
        "tsv" => load_delimited(path, b'\t'),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// Delimited loader
// ---------------------------------------------------------------------------

/// Header row with column names; every cell is type-inferred. Ragged rows are
/// padded with nulls rather than rejected.
fn load_delimited(path: &Path, delimiter: u8) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    read_delimited(&mut reader)
}

/// Parse delimited bytes already in memory (e.g. an exported spreadsheet).
pub fn load_delimited_bytes(bytes: &[u8]) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    read_delimited(&mut reader)
}

fn read_delimited<R: std::io::Read>(reader: &mut csv::Reader<R>) -> Result<Dataset> {
    let columns: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.iter().map(Value::from_cell).collect());
    }

    Ok(Dataset::new(columns, rows))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the layout of a query result saved as records:
///
/// ```json
/// [
///   { "state_name": "Goa", "item_name": "Cement", "invoice_value": 1200.5 },
///   ...
/// ]
/// ```
///
/// Columns are the union of keys in first-seen order; missing keys are null.
fn load_json(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut cells: Vec<Vec<(usize, Value)>> = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let mut row = Vec::with_capacity(obj.len());
        for (key, val) in obj {
            let pos = *positions.entry(key.clone()).or_insert_with(|| {
                columns.push(key.clone());
                columns.len() - 1
            });
            row.push((pos, json_to_value(val)));
        }
        cells.push(row);
    }

    let width = columns.len();
    let rows = cells
        .into_iter()
        .map(|row| {
            let mut values = vec![Value::Null; width];
            for (pos, val) in row {
                values[pos] = val;
            }
            values
        })
        .collect();

    Ok(Dataset::new(columns, rows))
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet file. Every column becomes a dataset column; nested or
/// exotic types are rendered as text.
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            rows.push(
                batch
                    .columns()
                    .iter()
                    .map(|col| extract_value(col, row))
                    .collect(),
            );
        }
    }

    Ok(Dataset::new(columns, rows))
}

/// Extract a single value from an Arrow column at a given row.
fn extract_value(col: &Arc<dyn Array>, row: usize) -> Value {
    if col.is_null(row) {
        return Value::Null;
    }
    match col.data_type() {
        DataType::Utf8 => match col.as_any().downcast_ref::<StringArray>() {
            Some(s) => Value::String(s.value(row).to_string()),
            None => Value::Null,
        },
        DataType::LargeUtf8 => Value::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => col
            .as_any()
            .downcast_ref::<Int32Array>()
            .map_or(Value::Null, |arr| Value::Integer(arr.value(row) as i64)),
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .map_or(Value::Null, |arr| Value::Integer(arr.value(row))),
        DataType::Float32 => col
            .as_any()
            .downcast_ref::<Float32Array>()
            .map_or(Value::Null, |arr| Value::Float(arr.value(row) as f64)),
        DataType::Float64 => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .map_or(Value::Null, |arr| Value::Float(arr.value(row))),
        DataType::Boolean => col
            .as_any()
            .downcast_ref::<BooleanArray>()
            .map_or(Value::Null, |arr| Value::Bool(arr.value(row))),
        DataType::Date32 => col
            .as_any()
            .downcast_ref::<Date32Array>()
            .and_then(|arr| arr.value_as_date(row))
            .map_or(Value::Null, Value::Date),
        _ => {
            let text = arrow::util::display::array_value_to_string(col, row)
                .unwrap_or_else(|_| format!("{:?}", col.data_type()));
            parse_date(&text).map_or(Value::String(text), Value::Date)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(ext: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(ext)
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn csv_keeps_natural_column_order_and_types() {
        let file = write_temp(
            ".csv",
            "state_name,item_name,invoice_value,t_code\nGoa,Cement,10.5,01\nKerala,Steel,3,02\n",
        );
        let ds = load_file(file.path()).unwrap();
        assert_eq!(ds.columns, vec!["state_name", "item_name", "invoice_value", "t_code"]);
        assert_eq!(ds.rows[0][2], Value::Float(10.5));
        assert_eq!(ds.rows[1][2], Value::Integer(3));
        assert_eq!(ds.rows[0][3], Value::String("01".into()));
    }

    #[test]
    fn ragged_csv_rows_are_padded() {
        let file = write_temp(".csv", "a,b,c\n1,2\n");
        let ds = load_file(file.path()).unwrap();
        assert_eq!(ds.rows[0], vec![Value::Integer(1), Value::Integer(2), Value::Null]);
    }

    #[test]
    fn json_records_union_their_keys() {
        let file = write_temp(
            ".json",
            r#"[{"item_name": "A", "qty": 2}, {"item_name": "B", "state_name": "Goa"}]"#,
        );
        let ds = load_file(file.path()).unwrap();
        assert_eq!(ds.columns, vec!["item_name", "qty", "state_name"]);
        let qty = ds.column_index("qty").unwrap();
        let state = ds.column_index("state_name").unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows[0][state], Value::Null);
        assert_eq!(ds.rows[1][qty], Value::Null);
    }

    #[test]
    fn json_columns_keep_document_order() {
        let file = write_temp(
            ".json",
            r#"[{"state_name": "Goa", "item_name": "A", "invoice_value": 1}]"#,
        );
        let ds = load_file(file.path()).unwrap();
        assert_eq!(ds.columns, vec!["state_name", "item_name", "invoice_value"]);
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        let file = write_temp(".xls", "");
        assert!(load_file(file.path()).is_err());
    }

    #[test]
    fn missing_file_loads_as_empty_with_required_columns() {
        let source = FileSource::new("/nonexistent/erp_sales_data.csv");
        let ds = load_for_dashboard(&source);
        assert!(ds.is_empty());
        for field in REQUIRED_COLUMNS {
            assert!(ds.field_index(field).is_some(), "missing {field:?}");
        }
    }

    #[test]
    fn dashboard_load_parses_dates_and_nulls_garbage() {
        let file = write_temp(
            ".csv",
            "item_name,invoice_date,invoice_value\nA,2024-01-05,1\nB,soon,2\n",
        );
        let ds = load_for_dashboard(&FileSource::new(file.path()));
        let idx = ds.field_index(Field::InvoiceDate).unwrap();
        assert_eq!(
            ds.rows[0][idx],
            Value::Date(chrono::NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
        );
        assert_eq!(ds.rows[1][idx], Value::Null);
    }
}
