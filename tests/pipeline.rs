use std::io::Write;

use chrono::NaiveDate;

use erp_dashboard::chart::{ChartKind, ChartType};
use erp_dashboard::data::aggregate::{AggregationSpec, aggregate};
use erp_dashboard::data::filter::{DateRange, FilterCriteria, filter};
use erp_dashboard::data::loader::{FileSource, load_file, load_for_dashboard};
use erp_dashboard::data::model::{Field, Measure, Value};
use erp_dashboard::export::{export_parquet, export_spreadsheet, write_export};
use erp_dashboard::pipeline::{self, Request};

const SALES_CSV: &str = "\
state_name,city_name,Party_Name,item_name,invoice_date,invoice_value,qty,Taxable_Value,t_code,location_code
Goa,Panaji,Acme,Cement,2024-01-02,1180.0,2,1000.0,01,L01
Goa,Margao,Bolt,Steel,2024-01-10,590.0,1,500.0,01,L02
Kerala,Kochi,Acme,Cement,2024-02-01,236.0,1,200.0,02,L01
Goa,Panaji,Acme,Paint,2024-03-15,,3,300.0,01,L01
";

fn sales_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(SALES_CSV.as_bytes()).unwrap();
    file
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn display_filters_then_aggregates_one_snapshot() {
    let file = sales_file();
    let request = Request {
        criteria: FilterCriteria {
            state: Some("Goa".into()),
            ..Default::default()
        },
        chart_type: ChartType::Bar,
        measure: Measure::InvoiceValue,
    };
    let view = pipeline::display(&FileSource::new(file.path()), &request);

    assert_eq!(view.snapshot.len(), 4);
    assert_eq!(view.rows.len(), 3);
    assert_eq!(view.chart.kind, ChartKind::Bar);
    let points: Vec<(String, f64)> = view.chart.series[0]
        .points
        .iter()
        .map(|p| (p.x.to_string(), p.y))
        .collect();
    assert_eq!(
        points,
        vec![
            ("Cement".to_string(), 1180.0),
            ("Paint".to_string(), 0.0),
            ("Steel".to_string(), 590.0),
        ]
    );
}

#[test]
fn customer_filter_resolves_capitalised_party_column() {
    let file = sales_file();
    let ds = load_for_dashboard(&FileSource::new(file.path()));
    let criteria = FilterCriteria {
        customer: Some("Acme".into()),
        t_code: Some("01".into()),
        ..Default::default()
    };
    let out = filter(&ds, &criteria);
    assert_eq!(out.len(), 2);
    // Party_Name already present, so no duplicate party_name column is added.
    assert_eq!(
        ds.columns.iter().filter(|c| c.eq_ignore_ascii_case("party_name")).count(),
        1
    );
}

#[test]
fn sums_are_conserved_across_measures() {
    let file = sales_file();
    let ds = load_for_dashboard(&FileSource::new(file.path()));
    for measure in Measure::ALL {
        let agg = aggregate(&ds, AggregationSpec::by_item(measure));
        let idx = ds.field_index(measure.field()).unwrap();
        let direct: f64 = ds.rows.iter().filter_map(|r| r[idx].as_f64()).sum();
        assert!((agg.total() - direct).abs() < 1e-9, "{measure}");
    }
}

#[test]
fn date_window_then_time_series() {
    let file = sales_file();
    let request = Request {
        criteria: FilterCriteria {
            date_range: Some(DateRange::new(date(2024, 1, 1), date(2024, 1, 31))),
            ..Default::default()
        },
        chart_type: ChartType::TimeSeries,
        measure: Measure::Qty,
    };
    let view = pipeline::display(&FileSource::new(file.path()), &request);
    assert_eq!(view.rows.len(), 2);
    assert_eq!(view.chart.kind, ChartKind::TimeSeries);
    let names: Vec<&str> = view.chart.series.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Cement", "Steel"]);
}

#[test]
fn exported_spreadsheet_round_trips_through_the_loader() {
    let file = sales_file();
    let source = FileSource::new(file.path());
    let criteria = FilterCriteria {
        state: Some("Goa".into()),
        ..Default::default()
    };
    let exported = filter(&load_for_dashboard(&source), &criteria);

    let dir = tempfile::tempdir().unwrap();
    let path = write_export(dir.path(), "filtered.csv", &export_spreadsheet(&exported).unwrap()).unwrap();
    let reloaded = load_for_dashboard(&FileSource::new(&path));

    assert_eq!(reloaded, exported);
    assert_eq!(filter(&reloaded, &criteria), exported);
}

#[test]
fn exported_parquet_round_trips_through_the_loader() {
    let file = sales_file();
    let ds = load_for_dashboard(&FileSource::new(file.path()));

    let dir = tempfile::tempdir().unwrap();
    let path = write_export(dir.path(), "filtered.parquet", &export_parquet(&ds).unwrap()).unwrap();
    let reloaded = load_for_dashboard(&FileSource::new(&path));

    assert_eq!(reloaded, ds);
}

#[test]
fn empty_filter_result_exports_header_and_no_data_document() {
    let file = sales_file();
    let source = FileSource::new(file.path());
    let criteria = FilterCriteria {
        state: Some("Nowhere".into()),
        ..Default::default()
    };

    let csv = String::from_utf8(pipeline::export_spreadsheet(&source, &criteria).unwrap()).unwrap();
    assert_eq!(csv.lines().count(), 1);
    assert!(csv.starts_with("state_name,city_name,Party_Name"));

    let request = Request {
        criteria,
        ..Default::default()
    };
    assert!(pipeline::display(&source, &request).chart.is_no_data());
    let png = pipeline::export_document(&source, &request).unwrap();
    assert_eq!(&png[1..4], b"PNG");
}

#[test]
fn file_without_state_column_ignores_state_filter() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(b"item_name,invoice_value\nA,10\nA,5\nB,3\n").unwrap();
    let ds = load_file(file.path()).unwrap();
    let criteria = FilterCriteria {
        state: Some("Goa".into()),
        ..Default::default()
    };
    assert_eq!(filter(&ds, &criteria), ds);

    let agg = aggregate(&ds, AggregationSpec::by_item(Measure::InvoiceValue));
    assert_eq!(agg.get("A"), Some(15.0));
    assert_eq!(agg.get("B"), Some(3.0));
    assert_eq!(ds.rows[0][ds.field_index(Field::InvoiceValue).unwrap()], Value::Integer(10));
}

#[test]
fn documents_differ_by_measure() {
    let file = sales_file();
    let source = FileSource::new(file.path());
    let document = |measure| {
        let request = Request {
            measure,
            ..Default::default()
        };
        pipeline::export_document(&source, &request).unwrap()
    };
    assert_ne!(document(Measure::InvoiceValue), document(Measure::Qty));
}
