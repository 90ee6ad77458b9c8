//! Chart selection: turn a filtered dataset into a renderer-independent
//! [`ChartSpec`].
//!
//! Each [`ChartType`] has its own [`ChartBuilder`]. Category charts (bar,
//! pie, line) go through the aggregator; the time series plots the filtered
//! rows directly.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::aggregate::{Aggregate, AggregationSpec, aggregate};
use crate::data::model::{Dataset, Field, Measure};
use crate::error::{DashboardError, Result};

// ---------------------------------------------------------------------------
// Chart type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartType {
    #[default]
    Bar,
    Pie,
    Line,
    TimeSeries,
}

impl ChartType {
    pub const ALL: [ChartType; 4] = [ChartType::Bar, ChartType::Pie, ChartType::Line, ChartType::TimeSeries];

    pub fn label(self) -> &'static str {
        match self {
            ChartType::Bar => "Bar",
            ChartType::Pie => "Pie",
            ChartType::Line => "Line",
            ChartType::TimeSeries => "Time Series",
        }
    }

    /// The strategy that builds this chart type.
    pub fn builder(self) -> &'static dyn ChartBuilder {
        match self {
            ChartType::Bar => &BarBuilder,
            ChartType::Pie => &PieBuilder,
            ChartType::Line => &LineBuilder,
            ChartType::TimeSeries => &TimeSeriesBuilder,
        }
    }
}

impl FromStr for ChartType {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bar" => Ok(ChartType::Bar),
            "pie" => Ok(ChartType::Pie),
            "line" => Ok(ChartType::Line),
            "time" | "time-series" | "time_series" | "timeseries" => Ok(ChartType::TimeSeries),
            other => Err(DashboardError::InvalidArgument(format!("unknown chart type '{other}'"))),
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChartType::Bar => "bar",
            ChartType::Pie => "pie",
            ChartType::Line => "line",
            ChartType::TimeSeries => "time-series",
        })
    }
}

// ---------------------------------------------------------------------------
// Chart spec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Pie,
    Line,
    TimeSeries,
    /// Placeholder: no series, only a title and annotation.
    NoData,
}

/// Position along the x axis.
#[derive(Debug, Clone, PartialEq)]
pub enum XValue {
    Category(String),
    Date(NaiveDate),
}

impl fmt::Display for XValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XValue::Category(c) => write!(f, "{c}"),
            XValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub x: XValue,
    /// Measure value; for pie charts, the share of the total in `0..=1`.
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub points: Vec<DataPoint>,
}

/// Renderer-independent chart description.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
    pub annotation: Option<String>,
}

impl ChartSpec {
    /// The designated "no data" chart.
    pub fn no_data(title: &str, annotation: &str) -> Self {
        ChartSpec {
            kind: ChartKind::NoData,
            title: title.to_string(),
            x_label: String::new(),
            y_label: String::new(),
            series: Vec::new(),
            annotation: Some(annotation.to_string()),
        }
    }

    pub fn is_no_data(&self) -> bool {
        self.kind == ChartKind::NoData
    }
}

const NO_DATA_TITLE: &str = "No data available";
const NO_DATA_NOTE: &str = "No data to display";
const NO_DATES_TITLE: &str = "No date data available";
const NO_DATES_NOTE: &str = "No date data to display";

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Build a chart from filtered rows.
pub trait ChartBuilder {
    fn build(&self, rows: &Dataset, measure: Measure) -> ChartSpec;
}

/// Map `chart_type` over the filtered rows.
pub fn select_chart(chart_type: ChartType, rows: &Dataset, measure: Measure) -> ChartSpec {
    chart_type.builder().build(rows, measure)
}

/// [`select_chart`] with a chart type name; unknown names are rejected.
pub fn select_chart_named(chart_type: &str, rows: &Dataset, measure: Measure) -> Result<ChartSpec> {
    Ok(select_chart(chart_type.parse()?, rows, measure))
}

/// Shared guard: nothing to chart without rows, items, or the measure column.
fn lacks_data(rows: &Dataset, measure: Measure) -> bool {
    rows.is_empty()
        || rows.populated_field(Field::ItemName).is_none()
        || rows.field_index(measure.field()).is_none()
}

/// Aggregate by item, or `None` when there is nothing to show.
fn item_totals(rows: &Dataset, measure: Measure) -> Option<Aggregate> {
    if lacks_data(rows, measure) {
        return None;
    }
    let agg = aggregate(rows, AggregationSpec::by_item(measure));
    (!agg.is_empty()).then_some(agg)
}

fn category_series(agg: &Aggregate, measure: Measure, divisor: f64) -> Series {
    Series {
        name: measure.label().to_string(),
        points: agg
            .groups
            .iter()
            .map(|(key, value)| DataPoint {
                x: XValue::Category(key.clone()),
                y: value / divisor,
            })
            .collect(),
    }
}

fn category_chart(kind: ChartKind, agg: &Aggregate, measure: Measure, divisor: f64) -> ChartSpec {
    ChartSpec {
        kind,
        title: format!("{} by Item", measure.label()),
        x_label: Field::ItemName.label().to_string(),
        y_label: measure.label().to_string(),
        series: vec![category_series(agg, measure, divisor)],
        annotation: None,
    }
}

pub struct BarBuilder;

impl ChartBuilder for BarBuilder {
    fn build(&self, rows: &Dataset, measure: Measure) -> ChartSpec {
        match item_totals(rows, measure) {
            Some(agg) => category_chart(ChartKind::Bar, &agg, measure, 1.0),
            None => ChartSpec::no_data(NO_DATA_TITLE, NO_DATA_NOTE),
        }
    }
}

pub struct PieBuilder;

impl ChartBuilder for PieBuilder {
    fn build(&self, rows: &Dataset, measure: Measure) -> ChartSpec {
        let Some(mut agg) = item_totals(rows, measure) else {
            return ChartSpec::no_data(NO_DATA_TITLE, NO_DATA_NOTE);
        };
        // Only positive totals get a slice.
        agg.groups.retain(|(_, v)| *v > 0.0);
        let total = agg.total();
        if total <= 0.0 {
            return ChartSpec::no_data(NO_DATA_TITLE, NO_DATA_NOTE);
        }
        category_chart(ChartKind::Pie, &agg, measure, total)
    }
}

/// Values per item joined in category order. Degenerate for categorical
/// axes, kept because the dashboard has always offered it.
pub struct LineBuilder;

impl ChartBuilder for LineBuilder {
    fn build(&self, rows: &Dataset, measure: Measure) -> ChartSpec {
        match item_totals(rows, measure) {
            Some(agg) => category_chart(ChartKind::Line, &agg, measure, 1.0),
            None => ChartSpec::no_data(NO_DATA_TITLE, NO_DATA_NOTE),
        }
    }
}

/// Measure against invoice date, one series per item, unaggregated.
pub struct TimeSeriesBuilder;

impl ChartBuilder for TimeSeriesBuilder {
    fn build(&self, rows: &Dataset, measure: Measure) -> ChartSpec {
        if lacks_data(rows, measure) {
            return ChartSpec::no_data(NO_DATA_TITLE, NO_DATA_NOTE);
        }
        let Some(date_idx) = rows.dated_field() else {
            return ChartSpec::no_data(NO_DATES_TITLE, NO_DATES_NOTE);
        };
        let (Some(item_idx), Some(measure_idx)) = (
            rows.field_index(Field::ItemName),
            rows.field_index(measure.field()),
        ) else {
            return ChartSpec::no_data(NO_DATA_TITLE, NO_DATA_NOTE);
        };

        let mut by_item: BTreeMap<String, Vec<DataPoint>> = BTreeMap::new();
        for row in &rows.rows {
            let (Some(item), Some(date), Some(y)) =
                (row[item_idx].as_key(), row[date_idx].as_date(), row[measure_idx].as_f64())
            else {
                continue;
            };
            by_item.entry(item).or_default().push(DataPoint {
                x: XValue::Date(date),
                y,
            });
        }
        if by_item.is_empty() {
            return ChartSpec::no_data(NO_DATES_TITLE, NO_DATES_NOTE);
        }

        let series = by_item
            .into_iter()
            .map(|(name, mut points)| {
                points.sort_by_key(|p| match p.x {
                    XValue::Date(d) => d,
                    XValue::Category(_) => NaiveDate::MIN,
                });
                Series { name, points }
            })
            .collect();

        ChartSpec {
            kind: ChartKind::TimeSeries,
            title: format!("{} Over Time", measure.label()),
            x_label: Field::InvoiceDate.label().to_string(),
            y_label: measure.label().to_string(),
            series,
            annotation: None,
        }
    }
}
