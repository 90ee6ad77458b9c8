use std::f64::consts::TAU;

use eframe::egui::{Color32, Stroke, Ui};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Polygon};

use erp_dashboard::chart::{ChartKind, ChartSpec, XValue};
use erp_dashboard::color::{ColorMap, Rgb, generate_palette};
use erp_dashboard::render::{date_label, days_since_epoch};

use crate::state::AppState;

fn color32(c: Rgb) -> Color32 {
    Color32::from_rgb(c[0], c[1], c[2])
}

// ---------------------------------------------------------------------------
// Chart (central panel)
// ---------------------------------------------------------------------------

/// Render the current chart spec in the central panel.
pub fn sales_chart(ui: &mut Ui, state: &AppState) {
    let spec = &state.view.chart;
    ui.vertical_centered(|ui: &mut Ui| {
        ui.heading(&spec.title);
    });

    if spec.kind == ChartKind::NoData {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.label(spec.annotation.as_deref().unwrap_or("No data to display"));
        });
        return;
    }

    let mut plot = Plot::new("sales_plot")
        .legend(Legend::default())
        .x_axis_label(spec.x_label.clone())
        .y_axis_label(spec.y_label.clone())
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true);

    match spec.kind {
        ChartKind::TimeSeries => {
            plot = plot.x_axis_formatter(|mark, _range| date_label(mark.value));
        }
        ChartKind::Pie => {
            plot = plot.data_aspect(1.0).show_axes(false).show_grid(false);
        }
        _ => {
            let labels: Vec<String> = spec
                .series
                .first()
                .map(|s| s.points.iter().map(|p| p.x.to_string()).collect())
                .unwrap_or_default();
            plot = plot.x_axis_formatter(move |mark, _range| {
                let i = mark.value.round();
                if (mark.value - i).abs() < 1e-6 && i >= 0.0 {
                    labels.get(i as usize).cloned().unwrap_or_default()
                } else {
                    String::new()
                }
            });
        }
    }

    plot.show(ui, |plot_ui| match spec.kind {
        ChartKind::Bar => {
            let color = color32(generate_palette(1)[0]);
            for series in &spec.series {
                let bars: Vec<Bar> = series
                    .points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| Bar::new(i as f64, p.y).name(p.x.to_string()).width(0.7))
                    .collect();
                plot_ui.bar_chart(BarChart::new(bars).name(&series.name).color(color));
            }
        }
        ChartKind::Line => {
            let color = color32(generate_palette(1)[0]);
            for series in &spec.series {
                let points: PlotPoints = series
                    .points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| [i as f64, p.y])
                    .collect();
                plot_ui.line(Line::new(points).name(&series.name).color(color).width(2.0));
            }
        }
        ChartKind::TimeSeries => {
            let colors = ColorMap::new(spec.series.iter().map(|s| s.name.as_str()));
            for series in &spec.series {
                let points: PlotPoints = series
                    .points
                    .iter()
                    .filter_map(|p| match p.x {
                        XValue::Date(d) => Some([days_since_epoch(d), p.y]),
                        XValue::Category(_) => None,
                    })
                    .collect();
                plot_ui.line(
                    Line::new(points)
                        .name(&series.name)
                        .color(color32(colors.color_for(&series.name)))
                        .width(1.5),
                );
            }
        }
        ChartKind::Pie => pie_slices(plot_ui, spec),
        ChartKind::NoData => {}
    });
}

/// Pie slices as filled polygons, clockwise from twelve o'clock.
fn pie_slices(plot_ui: &mut egui_plot::PlotUi, spec: &ChartSpec) {
    let Some(series) = spec.series.first() else {
        return;
    };
    let labels: Vec<String> = series.points.iter().map(|p| p.x.to_string()).collect();
    let colors = ColorMap::new(labels.iter().map(String::as_str));
    let mut start = 0.0;
    for (p, label) in series.points.iter().zip(&labels) {
        let end = start + p.y.max(0.0);
        let steps = ((end - start) * 96.0).ceil().max(1.0) as usize;
        let mut ring = vec![[0.0, 0.0]];
        ring.extend((0..=steps).map(|k| {
            let turn = start + (end - start) * k as f64 / steps as f64;
            let a = turn * TAU;
            [a.sin(), a.cos()]
        }));
        let color = color32(colors.color_for(label));
        plot_ui.polygon(
            Polygon::new(PlotPoints::new(ring))
                .name(format!("{label} ({:.1}%)", p.y * 100.0))
                .fill_color(color)
                .stroke(Stroke::new(1.0, Color32::WHITE)),
        );
        start = end;
    }
}
