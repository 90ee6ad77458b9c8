//! Draws a [`ChartSpec`] onto a fixed-size bitmap page with plotters.
//!
//! Titles, axis descriptions, legends and the no-data annotation are all
//! rasterised, so the page carries the same text as the on-screen chart.

use std::f64::consts::TAU;
use std::ops::Range;
use std::sync::OnceLock;

use chrono::{Days, NaiveDate};
use image::RgbImage;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontStyle, TextStyle, register_font};

use crate::chart::{ChartKind, ChartSpec, Series, XValue};
use crate::color::{ColorMap, Rgb, generate_palette};
use crate::error::{DashboardError, Result};

pub const PAGE_WIDTH: u32 = 1000;
pub const PAGE_HEIGHT: u32 = 600;

const FONT: &str = "sans-serif";
const NOTE: RGBColor = RGBColor(110, 110, 110);
const FRAME: RGBColor = RGBColor(200, 200, 200);

type Page<'a> = DrawingArea<BitMapBackend<'a>, Shift>;
type DrawResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Text comes from the Ubuntu Light face bundled with egui, registered once
/// per process under the sans-serif family.
fn ensure_font() -> Result<()> {
    static READY: OnceLock<bool> = OnceLock::new();
    let ready = *READY.get_or_init(|| {
        register_font(FONT, FontStyle::Normal, epaint_default_fonts::UBUNTU_LIGHT)
            .inspect_err(|_| log::error!("Bundled chart font could not be parsed"))
            .is_ok()
    });
    if ready {
        Ok(())
    } else {
        Err(DashboardError::Render("chart font unavailable".into()))
    }
}

fn rgb(c: Rgb) -> RGBColor {
    RGBColor(c[0], c[1], c[2])
}

/// Render `spec` to a `PAGE_WIDTH`×`PAGE_HEIGHT` image.
pub fn render_chart(spec: &ChartSpec) -> Result<RgbImage> {
    ensure_font()?;
    let mut buf = vec![255u8; (PAGE_WIDTH * PAGE_HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buf, (PAGE_WIDTH, PAGE_HEIGHT)).into_drawing_area();
        draw(&root, spec).map_err(|e| DashboardError::Render(e.to_string()))?;
    }
    RgbImage::from_raw(PAGE_WIDTH, PAGE_HEIGHT, buf)
        .ok_or_else(|| DashboardError::Render("page buffer does not match the page size".into()))
}

fn draw(root: &Page<'_>, spec: &ChartSpec) -> DrawResult {
    root.fill(&WHITE)?;
    match spec.kind {
        ChartKind::Bar => draw_category(root, spec, true)?,
        ChartKind::Line => draw_category(root, spec, false)?,
        ChartKind::TimeSeries => draw_time_series(root, spec)?,
        ChartKind::Pie => draw_pie(root, spec)?,
        ChartKind::NoData => draw_placeholder(root, spec)?,
    }
    root.present()?;
    Ok(())
}

/// Vertical range covering every value and zero, padded at the top.
fn y_range(series: &[Series]) -> Range<f64> {
    let (lo, hi) = series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.y))
        .fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if (hi - lo).abs() < f64::EPSILON {
        return lo..lo + 1.0;
    }
    let pad = (hi - lo) * 0.05;
    let bottom = if lo < 0.0 { lo - pad } else { lo };
    bottom..hi + pad
}

/// Bars or a joined line, one slot per category.
fn draw_category(root: &Page<'_>, spec: &ChartSpec, bars: bool) -> DrawResult {
    let Some(series) = spec.series.first() else {
        return Ok(());
    };
    let labels: Vec<String> = series.points.iter().map(|p| p.x.to_string()).collect();
    let n = labels.len();
    let color = rgb(generate_palette(1)[0]);

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, (FONT, 28).into_font())
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(-0.5..n as f64 - 0.5, y_range(&spec.series))?;

    let category_at = |x: &f64| {
        let i = x.round();
        if (x - i).abs() < 1e-6 && i >= 0.0 {
            labels.get(i as usize).cloned().unwrap_or_default()
        } else {
            String::new()
        }
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n.max(2))
        .x_label_formatter(&category_at)
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .label_style((FONT, 14).into_font())
        .axis_desc_style((FONT, 16).into_font())
        .draw()?;

    let points = || series.points.iter().enumerate().map(|(i, p)| (i as f64, p.y));
    if bars {
        chart
            .draw_series(points().map(|(x, y)| Rectangle::new([(x - 0.35, 0.0), (x + 0.35, y)], color.filled())))?
            .label(series.name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 14, y + 5)], color.filled()));
    } else {
        chart
            .draw_series(LineSeries::new(points(), color.stroke_width(3)))?
            .label(series.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3)));
        chart.draw_series(points().map(|(x, y)| Circle::new((x, y), 4, color.filled())))?;
    }
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

fn draw_time_series(root: &Page<'_>, spec: &ChartSpec) -> DrawResult {
    let day = |x: &XValue| match x {
        XValue::Date(d) => Some(days_since_epoch(*d)),
        XValue::Category(_) => None,
    };
    let (first, last) = spec
        .series
        .iter()
        .flat_map(|s| s.points.iter().filter_map(|p| day(&p.x)))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), d| (lo.min(d), hi.max(d)));
    if !first.is_finite() {
        return Ok(());
    }
    let last = last.max(first + 1.0);

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, (FONT, 28).into_font())
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(first..last, y_range(&spec.series))?;

    let date_at = |d: &f64| date_label(*d);
    chart
        .configure_mesh()
        .x_labels(8)
        .x_label_formatter(&date_at)
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .label_style((FONT, 14).into_font())
        .axis_desc_style((FONT, 16).into_font())
        .draw()?;

    let colors = ColorMap::new(spec.series.iter().map(|s| s.name.as_str()));
    for series in &spec.series {
        let color = rgb(colors.color_for(&series.name));
        let points: Vec<(f64, f64)> = series
            .points
            .iter()
            .filter_map(|p| Some((day(&p.x)?, p.y)))
            .collect();
        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?
            .label(series.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        chart.draw_series(points.iter().map(|&p| Circle::new(p, 3, color.filled())))?;
    }
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

/// Slices clockwise from twelve o'clock, legend with shares on the right.
fn draw_pie(root: &Page<'_>, spec: &ChartSpec) -> DrawResult {
    let area = root.titled(&spec.title, (FONT, 28).into_font())?;
    let Some(series) = spec.series.first() else {
        return Ok(());
    };
    let (disc, legend) = area.split_horizontally(640);
    let (w, h) = disc.dim_in_pixel();
    let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
    let r = w.min(h) as f64 / 2.0 - 20.0;

    let labels: Vec<String> = series.points.iter().map(|p| p.x.to_string()).collect();
    let colors = ColorMap::new(labels.iter().map(String::as_str));

    let mut start = 0.0;
    for (p, label) in series.points.iter().zip(&labels) {
        let end = start + p.y.max(0.0);
        let steps = ((end - start) * 180.0).ceil().max(1.0) as usize;
        let mut ring = vec![(cx.round() as i32, cy.round() as i32)];
        ring.extend((0..=steps).map(|k| {
            let a = (start + (end - start) * k as f64 / steps as f64) * TAU;
            ((cx + r * a.sin()).round() as i32, (cy - r * a.cos()).round() as i32)
        }));
        disc.draw(&Polygon::new(ring, rgb(colors.color_for(label)).filled()))?;
        start = end;
    }

    legend.draw(&Text::new(spec.y_label.clone(), (10, 10), (FONT, 18).into_font().color(&NOTE)))?;
    for (i, (p, label)) in series.points.iter().zip(&labels).enumerate() {
        let y = 50 + i as i32 * 28;
        let color = rgb(colors.color_for(label));
        legend.draw(&Rectangle::new([(10, y), (26, y + 16)], color.filled()))?;
        legend.draw(&Text::new(
            format!("{label}  {:.1}%", p.y * 100.0),
            (36, y),
            (FONT, 18).into_font(),
        ))?;
    }
    Ok(())
}

/// Framed empty page with the title and the annotation in the middle.
fn draw_placeholder(root: &Page<'_>, spec: &ChartSpec) -> DrawResult {
    let area = root.titled(&spec.title, (FONT, 28).into_font())?;
    let (w, h) = area.dim_in_pixel();
    let (w, h) = (w as i32, h as i32);
    area.draw(&Rectangle::new([(40, 20), (w - 40, h - 40)], FRAME.stroke_width(2)))?;
    if let Some(note) = &spec.annotation {
        let style = TextStyle::from((FONT, 24).into_font())
            .color(&NOTE)
            .pos(Pos::new(HPos::Center, VPos::Center));
        area.draw_text(note, &style, (w / 2, (h - 20) / 2))?;
    }
    Ok(())
}

pub fn days_since_epoch(d: NaiveDate) -> f64 {
    (d - NaiveDate::default()).num_days() as f64
}

/// Inverse of [`days_since_epoch`] for axis labels.
pub fn date_label(days: f64) -> String {
    let epoch = NaiveDate::default();
    let shifted = if days >= 0.0 {
        epoch.checked_add_days(Days::new(days.round() as u64))
    } else {
        epoch.checked_sub_days(Days::new((-days).round() as u64))
    };
    shifted.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ChartType, select_chart};
    use crate::data::model::{Dataset, Measure, Value};

    fn sample() -> Dataset {
        Dataset::new(
            vec!["item_name".into(), "invoice_date".into(), "invoice_value".into(), "qty".into()],
            vec![
                vec![
                    Value::String("A".into()),
                    Value::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
                    Value::Float(30.0),
                    Value::Integer(3),
                ],
                vec![
                    Value::String("B".into()),
                    Value::Date(NaiveDate::from_ymd_opt(2024, 1, 9).unwrap()),
                    Value::Float(10.0),
                    Value::Integer(1),
                ],
            ],
        )
    }

    fn coloured_pixels(img: &RgbImage) -> usize {
        img.pixels()
            .filter(|p| {
                let [r, g, b] = p.0;
                !(r == g && g == b)
            })
            .count()
    }

    /// Pixels darker than the placeholder frame: text and axes.
    fn ink_pixels(img: &RgbImage) -> usize {
        img.pixels().filter(|p| p.0.iter().all(|&c| c < 180)).count()
    }

    #[test]
    fn every_chart_type_renders_at_page_size_with_ink() {
        for chart in ChartType::ALL {
            let img = render_chart(&select_chart(chart, &sample(), Measure::InvoiceValue)).unwrap();
            assert_eq!(img.dimensions(), (PAGE_WIDTH, PAGE_HEIGHT));
            assert!(coloured_pixels(&img) > 0, "{chart} drew nothing");
        }
    }

    #[test]
    fn no_data_page_carries_its_title_and_annotation() {
        let img = render_chart(&ChartSpec::no_data("No data available", "No data to display")).unwrap();
        assert_eq!(img.dimensions(), (PAGE_WIDTH, PAGE_HEIGHT));
        assert_eq!(coloured_pixels(&img), 0);
        assert!(ink_pixels(&img) > 0);
        let middle = (PAGE_HEIGHT / 3..2 * PAGE_HEIGHT / 3)
            .flat_map(|y| (0..PAGE_WIDTH).map(move |x| (x, y)))
            .filter(|&(x, y)| img.get_pixel(x, y).0.iter().all(|&c| c < 180))
            .count();
        assert!(middle > 0, "annotation missing from the middle of the page");
    }

    #[test]
    fn no_data_variants_render_differently() {
        let plain = render_chart(&ChartSpec::no_data("No data available", "No data to display")).unwrap();
        let undated = render_chart(&ChartSpec::no_data("No date data available", "No date data to display")).unwrap();
        assert_ne!(plain, undated);
    }

    #[test]
    fn measures_render_differently() {
        let sales = render_chart(&select_chart(ChartType::Bar, &sample(), Measure::InvoiceValue)).unwrap();
        let qty = render_chart(&select_chart(ChartType::Bar, &sample(), Measure::Qty)).unwrap();
        assert_ne!(sales, qty);
    }

    #[test]
    fn date_labels_invert_day_numbers() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(date_label(days_since_epoch(d)), "2024-02-29");
    }
}
