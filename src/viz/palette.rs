use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};

pub const BACKGROUND: [u8; 3] = [255, 255, 255];
pub const FOREGROUND: [u8; 3] = [24, 24, 28];
pub const FRAME: [u8; 3] = [90, 90, 96];
pub const OVERLAY_FILL: [u8; 3] = [250, 250, 244];
pub const EDGE: RGBColor = RGBColor(0, 0, 0);
pub const NEUTRAL: RGBColor = RGBColor(255, 255, 255);

/// Evenly spaced anchor colours of each map, darkest first.
const VIRIDIS: [[u8; 3]; 5] = [
    [68, 1, 84],
    [59, 82, 139],
    [33, 145, 140],
    [94, 201, 98],
    [253, 231, 37],
];
const PLASMA: [[u8; 3]; 5] = [
    [13, 8, 135],
    [126, 3, 168],
    [204, 71, 120],
    [248, 149, 64],
    [240, 249, 33],
];
const MAGMA: [[u8; 3]; 5] = [
    [0, 0, 4],
    [81, 18, 124],
    [183, 55, 121],
    [252, 137, 97],
    [252, 253, 191],
];
const CIVIDIS: [[u8; 3]; 5] = [
    [0, 34, 78],
    [65, 77, 107],
    [124, 123, 120],
    [188, 175, 111],
    [253, 231, 55],
];
const GRAY: [[u8; 3]; 2] = [[0, 0, 0], [255, 255, 255]];

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Colormap {
    #[default]
    Viridis,
    Plasma,
    Magma,
    Cividis,
    Gray,
}

impl Colormap {
    fn anchors(self) -> &'static [[u8; 3]] {
        match self {
            Colormap::Viridis => &VIRIDIS,
            Colormap::Plasma => &PLASMA,
            Colormap::Magma => &MAGMA,
            Colormap::Cividis => &CIVIDIS,
            Colormap::Gray => &GRAY,
        }
    }

    /// Colour at `value` in `[0, 1]`; non-finite values map to the low end.
    pub fn sample(self, value: f32) -> RGBColor {
        let anchors = self.anchors();
        let last = anchors.len() - 1;
        let value = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
        let position = value * last as f32;
        let low = (position.floor() as usize).min(last);
        let high = (low + 1).min(last);
        let [r, g, b] = mix(anchors[low], anchors[high], position - low as f32);
        RGBColor(r, g, b)
    }
}

fn mix(from: [u8; 3], to: [u8; 3], weight: f32) -> [u8; 3] {
    let channel = |a: u8, b: u8| (f32::from(a) + (f32::from(b) - f32::from(a)) * weight).round() as u8;
    [
        channel(from[0], to[0]),
        channel(from[1], to[1]),
        channel(from[2], to[2]),
    ]
}

/// Stable class-label to colour assignment. Labels are spread evenly over the
/// colormap in ascending order so data points, prototypes and decision regions
/// of the same class share a colour.
#[derive(Debug, Clone)]
pub struct LabelColors {
    labels: Vec<i64>,
    colormap: Colormap,
}

impl LabelColors {
    pub fn new(colormap: Colormap, labels: impl IntoIterator<Item = i64>) -> Self {
        let mut labels: Vec<i64> = labels.into_iter().collect();
        labels.sort_unstable();
        labels.dedup();
        Self { labels, colormap }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn color(&self, label: i64) -> RGBColor {
        let rank = match self.labels.binary_search(&label) {
            Ok(index) => index,
            Err(index) => index.min(self.labels.len().saturating_sub(1)),
        };
        let denom = self.labels.len().saturating_sub(1).max(1) as f32;
        self.colormap.sample(rank as f32 / denom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_hits_endpoints() {
        assert_eq!(Colormap::Viridis.sample(0.0), RGBColor(68, 1, 84));
        assert_eq!(Colormap::Viridis.sample(1.0), RGBColor(253, 231, 37));
        assert_eq!(Colormap::Viridis.sample(0.5), RGBColor(33, 145, 140));
        assert_eq!(Colormap::Gray.sample(0.5), RGBColor(128, 128, 128));
        assert_eq!(Colormap::Gray.sample(f32::NAN), RGBColor(0, 0, 0));
        assert_eq!(Colormap::Magma.sample(7.0), RGBColor(252, 253, 191));
    }

    #[test]
    fn label_colors_are_stable_and_distinct() {
        let colors = LabelColors::new(Colormap::Viridis, [2, 0, 1, 1, 0]);
        assert_eq!(colors.len(), 3);
        let c0 = colors.color(0);
        let c2 = colors.color(2);
        assert_ne!(c0, c2);
        assert_eq!(c0, Colormap::Viridis.sample(0.0));
        assert_eq!(c2, Colormap::Viridis.sample(1.0));
        assert_eq!(colors.color(7), c2);
    }
}
