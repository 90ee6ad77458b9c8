use std::collections::BTreeMap;

use palette::{Hsl, IntoColor, Srgb};

/// 8-bit sRGB colour shared by the image renderer and the viewer.
pub type Rgb = [u8; 3];

pub const DEFAULT_COLOR: Rgb = [128, 128, 128];

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgb> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            [
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            ]
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: label → colour
// ---------------------------------------------------------------------------

/// Maps labels (series names, pie slices) to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Rgb>,
}

impl ColorMap {
    /// Assign colours to `labels` in the order given.
    pub fn new<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let labels: Vec<&str> = labels.into_iter().collect();
        let palette = generate_palette(labels.len());
        let mapping = labels
            .into_iter()
            .zip(palette)
            .map(|(label, c)| (label.to_string(), c))
            .collect();
        ColorMap { mapping }
    }

    /// Look up the colour for a label.
    pub fn color_for(&self, label: &str) -> Rgb {
        self.mapping.get(label).copied().unwrap_or(DEFAULT_COLOR)
    }
}
