use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

/// Date formats accepted for invoice dates, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d-%b-%Y", "%d-%b-%y", "%Y/%m/%d"];

/// Date-time formats whose date part is kept.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%d/%m/%Y %H:%M:%S"];

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value. Query results carry arbitrary columns, so
/// rows are not tied to a fixed struct.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

// -- Manual Eq/Ord so Value can key a BTreeMap --

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric interpretation used by measures. Numeric text is accepted,
    /// anything else is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) if v.is_finite() => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// Date interpretation used by the date-range filter and time series.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::String(s) => parse_date(s),
            _ => None,
        }
    }

    /// Grouping / option key. `None` for nulls, which never form a group.
    pub fn as_key(&self) -> Option<String> {
        match self {
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Exact, case-sensitive comparison against a filter value. Numbers
    /// compare numerically, so `1.0` in a cell matches both "1" and "1.0".
    pub fn matches(&self, wanted: &str) -> bool {
        match self {
            Value::String(s) => s == wanted,
            Value::Null => false,
            Value::Integer(_) | Value::Float(_) => match wanted.trim().parse::<f64>() {
                Ok(w) => self.as_f64() == Some(w),
                Err(_) => false,
            },
            other => other.to_string() == wanted,
        }
    }

    /// Text written to a flat-file cell. Floats keep a decimal point so a
    /// reload restores them as floats.
    pub fn to_cell(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Float(v) => format!("{v:?}"),
            other => other.to_string(),
        }
    }

    /// Infer a typed value from flat-file text.
    pub fn from_cell(s: &str) -> Value {
        if s.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            // "01" style codes stay text so equality filters keep matching.
            if i.to_string() == s {
                return Value::Integer(i);
            }
            return Value::String(s.to_string());
        }
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
        if s == "true" || s == "false" {
            return Value::Bool(s == "true");
        }
        Value::String(s.to_string())
    }
}

/// Parse an invoice date, keeping only the date part of date-times.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

// ---------------------------------------------------------------------------
// Field / Measure – the sales columns the dashboard knows about
// ---------------------------------------------------------------------------

/// Named sales fields. Lookup by column name is case-insensitive, so
/// `party_name` and `Party_Name` resolve to the same field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    State,
    City,
    Customer,
    ItemName,
    InvoiceDate,
    InvoiceValue,
    Qty,
    TaxableValue,
    TCode,
    LocationCode,
}

impl Field {
    /// Canonical column name.
    pub fn column_name(self) -> &'static str {
        match self {
            Field::State => "state_name",
            Field::City => "city_name",
            Field::Customer => "party_name",
            Field::ItemName => "item_name",
            Field::InvoiceDate => "invoice_date",
            Field::InvoiceValue => "invoice_value",
            Field::Qty => "qty",
            Field::TaxableValue => "Taxable_Value",
            Field::TCode => "t_code",
            Field::LocationCode => "location_code",
        }
    }

    /// Human-readable axis / legend label.
    pub fn label(self) -> &'static str {
        match self {
            Field::State => "State",
            Field::City => "City",
            Field::Customer => "Customer",
            Field::ItemName => "Item Name",
            Field::InvoiceDate => "Date",
            Field::InvoiceValue => "Sales Amount",
            Field::Qty => "Quantity",
            Field::TaxableValue => "Taxable Value",
            Field::TCode => "T Code",
            Field::LocationCode => "Location Code",
        }
    }
}

/// Columns the sales view expects; absent ones are added as all-null.
pub const REQUIRED_COLUMNS: [Field; 6] = [
    Field::State,
    Field::City,
    Field::Customer,
    Field::InvoiceDate,
    Field::ItemName,
    Field::InvoiceValue,
];

/// The numeric field being summarised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    #[default]
    InvoiceValue,
    Qty,
    TaxableValue,
}

impl Measure {
    pub const ALL: [Measure; 3] = [Measure::InvoiceValue, Measure::Qty, Measure::TaxableValue];

    pub fn field(self) -> Field {
        match self {
            Measure::InvoiceValue => Field::InvoiceValue,
            Measure::Qty => Field::Qty,
            Measure::TaxableValue => Field::TaxableValue,
        }
    }

    pub fn label(self) -> &'static str {
        self.field().label()
    }
}

impl FromStr for Measure {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "invoice_value" => Ok(Measure::InvoiceValue),
            "qty" | "quantity" => Ok(Measure::Qty),
            "taxable_value" => Ok(Measure::TaxableValue),
            other => Err(DashboardError::InvalidArgument(format!("unknown measure '{other}'"))),
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field().column_name())
    }
}

// ---------------------------------------------------------------------------
// Dataset – an ordered table of rows sharing one schema
// ---------------------------------------------------------------------------

pub type Row = Vec<Value>;

/// An in-memory table. Columns keep their source order; every row has
/// exactly one value per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Dataset {
    /// Build a dataset, padding short rows with nulls and dropping extra cells.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Dataset { columns, rows }
    }

    /// Header-only dataset.
    pub fn empty(columns: Vec<String>) -> Self {
        Dataset { columns, rows: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive column lookup. An exact match wins over a folded one.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .or_else(|| self.columns.iter().position(|c| c.eq_ignore_ascii_case(name)))
    }

    pub fn field_index(&self, field: Field) -> Option<usize> {
        self.column_index(field.column_name())
    }

    /// Index of `field` only if at least one row holds a non-null value.
    /// An all-null column is treated as absent.
    pub fn populated_field(&self, field: Field) -> Option<usize> {
        let idx = self.field_index(field)?;
        self.rows.iter().any(|row| !row[idx].is_null()).then_some(idx)
    }

    /// Index of the invoice date column only if some row holds a usable date.
    pub fn dated_field(&self) -> Option<usize> {
        let idx = self.field_index(Field::InvoiceDate)?;
        self.rows.iter().any(|row| row[idx].as_date().is_some()).then_some(idx)
    }

    /// New dataset with the rows for which `keep` holds; the source is untouched.
    pub fn retain<F>(&self, mut keep: F) -> Dataset
    where
        F: FnMut(&Row) -> bool,
    {
        Dataset {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Append an all-null column unless one of that name already exists.
    pub fn ensure_column(&mut self, name: &str) {
        if self.column_index(name).is_some() {
            return;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(Value::Null);
        }
    }

    /// Distinct non-null values of `field` in first-appearance order.
    pub fn distinct(&self, field: Field) -> Vec<String> {
        let Some(idx) = self.field_index(field) else {
            return Vec::new();
        };
        let mut seen = std::collections::HashSet::new();
        self.rows
            .iter()
            .filter_map(|row| row[idx].as_key())
            .filter(|key| seen.insert(key.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_cells_match_their_exported_text() {
        let code = Value::Float(1.0);
        assert!(code.matches(&code.to_cell()));
        assert!(code.matches("1"));
        assert!(!code.matches("2"));
        assert!(Value::Integer(7).matches("7"));
        assert!(!Value::Integer(7).matches("seven"));
        assert!(!Value::String("01".into()).matches("1"));
    }

    #[test]
    fn cell_inference_keeps_leading_zero_codes_as_text() {
        assert_eq!(Value::from_cell("01"), Value::String("01".into()));
        assert_eq!(Value::from_cell("12"), Value::Integer(12));
        assert_eq!(Value::from_cell("10.5"), Value::Float(10.5));
        assert_eq!(Value::from_cell(""), Value::Null);
        assert_eq!(Value::from_cell("Goa"), Value::String("Goa".into()));
    }

    #[test]
    fn float_cells_reload_as_floats() {
        let v = Value::Float(10.0);
        assert_eq!(v.to_cell(), "10.0");
        assert_eq!(Value::from_cell(&v.to_cell()), v);
    }

    #[test]
    fn parses_common_invoice_date_layouts() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(parse_date("2024-03-05"), Some(d));
        assert_eq!(parse_date("05/03/2024"), Some(d));
        assert_eq!(parse_date("05-Mar-2024"), Some(d));
        assert_eq!(parse_date("2024-03-05 13:45:00"), Some(d));
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn column_lookup_is_case_insensitive() {
        let ds = Dataset::empty(vec!["Party_Name".into(), "TAXABLE_VALUE".into()]);
        assert_eq!(ds.field_index(Field::Customer), Some(0));
        assert_eq!(ds.field_index(Field::TaxableValue), Some(1));
        assert_eq!(ds.field_index(Field::State), None);
    }

    #[test]
    fn all_null_column_is_not_populated() {
        let ds = Dataset::new(
            vec!["state_name".into()],
            vec![vec![Value::Null], vec![Value::Null]],
        );
        assert_eq!(ds.field_index(Field::State), Some(0));
        assert_eq!(ds.populated_field(Field::State), None);
    }

    #[test]
    fn short_rows_are_padded() {
        let ds = Dataset::new(vec!["a".into(), "b".into()], vec![vec![Value::Integer(1)]]);
        assert_eq!(ds.rows[0], vec![Value::Integer(1), Value::Null]);
    }

    #[test]
    fn measure_names_parse_and_unknown_is_invalid() {
        assert_eq!("invoice_value".parse::<Measure>().unwrap(), Measure::InvoiceValue);
        assert_eq!("Taxable_Value".parse::<Measure>().unwrap(), Measure::TaxableValue);
        assert!(matches!(
            "discount".parse::<Measure>(),
            Err(DashboardError::InvalidArgument(_))
        ));
    }
}
