//! Raster charts for the report tables.
//!
//! Only bars, slices and colour swatches are drawn. Labels and values go to
//! the console and the companion CSV, so no font handling is needed here.
//! Grouped bars and pies carry a key in the top margin: one swatch per series
//! or slice, left to right, in the column or row order of that CSV.

use std::f64::consts::TAU;

use image::{Rgb, RgbImage};

pub const WIDTH: u32 = 900;
pub const HEIGHT: u32 = 540;
pub const PIE_SIZE: u32 = 540;
const MARGIN: u32 = 40;

pub const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
pub const AXIS: Rgb<u8> = Rgb([64, 64, 64]);

pub const STEEL_BLUE: Rgb<u8> = Rgb([70, 130, 180]);
pub const DARK_GREEN: Rgb<u8> = Rgb([0, 100, 0]);
pub const CRIMSON: Rgb<u8> = Rgb([220, 20, 60]);
pub const CT_BLUE: Rgb<u8> = Rgb([0x5b, 0x89, 0xa6]);
pub const T_GOLD: Rgb<u8> = Rgb([0xc9, 0xa2, 0x27]);

/// Light to dark red, for ranked lists.
pub const REDS: [Rgb<u8>; 2] = [Rgb([252, 146, 114]), Rgb([103, 0, 13])];
/// Red through yellow to green.
pub const RED_YELLOW_GREEN: [Rgb<u8>; 3] = [
    Rgb([215, 48, 39]),
    Rgb([255, 255, 191]),
    Rgb([26, 152, 80]),
];
/// Qualitative palette for pie slices.
pub const PASTELS: [Rgb<u8>; 12] = [
    Rgb([141, 211, 199]),
    Rgb([255, 255, 179]),
    Rgb([190, 186, 218]),
    Rgb([251, 128, 114]),
    Rgb([128, 177, 211]),
    Rgb([253, 180, 98]),
    Rgb([179, 222, 105]),
    Rgb([252, 205, 229]),
    Rgb([217, 217, 217]),
    Rgb([188, 128, 189]),
    Rgb([204, 235, 197]),
    Rgb([255, 237, 111]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Bars grow upwards from the x axis, first bar on the left.
    Vertical,
    /// Bars grow rightwards from the y axis, first bar at the top.
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Linear,
    /// `log10(v + 1)`, so zero stays at the axis.
    Log,
}

impl Scale {
    fn apply(self, value: f64) -> f64 {
        let value = if value.is_finite() { value.max(0.0) } else { 0.0 };
        match self {
            Scale::Linear => value,
            Scale::Log => (value + 1.0).log10(),
        }
    }
}

/// Drawing area inside the margins. Bars cover `[left, right) x [top, bottom)`;
/// the axes sit just outside it.
#[derive(Debug, Clone, Copy)]
struct Plot {
    left: u32,
    top: u32,
    right: u32,
    bottom: u32,
}

impl Plot {
    fn new(width: u32, height: u32) -> Self {
        let margin = MARGIN.min(width / 4).min(height / 4).max(1);
        Self {
            left: margin,
            top: margin,
            right: width - margin,
            bottom: height - margin,
        }
    }

    fn width(&self) -> u32 {
        self.right - self.left
    }

    fn height(&self) -> u32 {
        self.bottom - self.top
    }

    fn canvas(&self, width: u32, height: u32) -> RgbImage {
        let mut img = RgbImage::from_pixel(width, height, BACKGROUND);
        fill_rect(&mut img, self.left - 1, self.top, self.left, self.bottom + 1, AXIS);
        fill_rect(&mut img, self.left - 1, self.bottom, self.right, self.bottom + 1, AXIS);
        img
    }
}

/// Fill `[x0, x1) x [y0, y1)`, clipped to the image.
fn fill_rect(img: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    let x1 = x1.min(img.width());
    let y1 = y1.min(img.height());
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x, y, color);
        }
    }
}

/// Colour key along the top margin, one square swatch per entry. Entries that
/// would run past the plot's right edge are dropped.
fn draw_key(img: &mut RgbImage, plot: &Plot, colors: impl Iterator<Item = Rgb<u8>>) {
    let swatch = (plot.top / 2).max(1);
    let step = swatch + (swatch / 2).max(1);
    let y0 = plot.top / 4;
    for (i, color) in colors.enumerate() {
        let x0 = plot.left + i as u32 * step;
        if x0 + swatch > plot.right {
            break;
        }
        fill_rect(img, x0, y0, x0 + swatch, y0 + swatch, color);
    }
}

/// Length in pixels of a bar for `value`, relative to the largest value.
fn bar_length(value: f64, max: f64, span: u32) -> u32 {
    if max <= 0.0 {
        return 0;
    }
    ((value / max) * span as f64).round().clamp(0.0, span as f64) as u32
}

fn pick(colors: &[Rgb<u8>], index: usize) -> Rgb<u8> {
    if colors.is_empty() {
        STEEL_BLUE
    } else {
        colors[index % colors.len()]
    }
}

/// Piecewise-linear colour ramp. `t` is clamped to `0..=1`.
pub fn gradient(t: f64, stops: &[Rgb<u8>]) -> Rgb<u8> {
    match stops {
        [] => STEEL_BLUE,
        [only] => *only,
        _ => {
            let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
            let pos = t * (stops.len() - 1) as f64;
            let i = (pos.floor() as usize).min(stops.len() - 2);
            let frac = pos - i as f64;
            let (a, b) = (stops[i].0, stops[i + 1].0);
            let mix = |c: usize| (a[c] as f64 + (b[c] as f64 - a[c] as f64) * frac).round() as u8;
            Rgb([mix(0), mix(1), mix(2)])
        }
    }
}

/// `n` colours evenly spread over the ramp, first stop first.
pub fn ramp(n: usize, stops: &[Rgb<u8>]) -> Vec<Rgb<u8>> {
    let steps = n.saturating_sub(1).max(1) as f64;
    (0..n).map(|i| gradient(i as f64 / steps, stops)).collect()
}

#[derive(Debug, Clone)]
pub struct BarChart {
    values: Vec<f64>,
    colors: Vec<Rgb<u8>>,
    orientation: Orientation,
    scale: Scale,
    width: u32,
    height: u32,
}

impl BarChart {
    pub fn new(values: Vec<f64>, orientation: Orientation) -> Self {
        Self {
            values,
            colors: vec![STEEL_BLUE],
            orientation,
            scale: Scale::Linear,
            width: WIDTH,
            height: HEIGHT,
        }
    }

    /// One colour per bar; cycled when shorter than the values.
    pub fn colors(mut self, colors: Vec<Rgb<u8>>) -> Self {
        self.colors = colors;
        self
    }

    pub fn color(self, color: Rgb<u8>) -> Self {
        self.colors(vec![color])
    }

    pub fn scale(mut self, scale: Scale) -> Self {
        self.scale = scale;
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(8);
        self.height = height.max(8);
        self
    }

    pub fn render(&self) -> RgbImage {
        let plot = Plot::new(self.width, self.height);
        let mut img = plot.canvas(self.width, self.height);
        if self.values.is_empty() {
            return img;
        }

        let scaled: Vec<f64> = self.values.iter().map(|v| self.scale.apply(*v)).collect();
        let max = scaled.iter().cloned().fold(0.0, f64::max);
        let n = scaled.len() as u32;

        match self.orientation {
            Orientation::Vertical => {
                let slot = (plot.width() / n).max(1);
                let thickness = (slot * 3 / 4).max(1);
                for (i, value) in scaled.iter().enumerate() {
                    let len = bar_length(*value, max, plot.height());
                    let x0 = plot.left + i as u32 * slot + (slot - thickness) / 2;
                    fill_rect(
                        &mut img,
                        x0,
                        plot.bottom - len,
                        x0 + thickness,
                        plot.bottom,
                        pick(&self.colors, i),
                    );
                }
            }
            Orientation::Horizontal => {
                let slot = (plot.height() / n).max(1);
                let thickness = (slot * 3 / 4).max(1);
                for (i, value) in scaled.iter().enumerate() {
                    let len = bar_length(*value, max, plot.width());
                    let y0 = plot.top + i as u32 * slot + (slot - thickness) / 2;
                    fill_rect(
                        &mut img,
                        plot.left,
                        y0,
                        plot.left + len,
                        y0 + thickness,
                        pick(&self.colors, i),
                    );
                }
            }
        }

        img
    }
}

/// Vertical bars, one cluster per group, one bar per series inside it.
#[derive(Debug, Clone)]
pub struct GroupedBarChart {
    groups: Vec<Vec<f64>>,
    series: Vec<Rgb<u8>>,
    width: u32,
    height: u32,
}

impl GroupedBarChart {
    pub fn new(groups: Vec<Vec<f64>>, series: Vec<Rgb<u8>>) -> Self {
        Self {
            groups,
            series,
            width: WIDTH,
            height: HEIGHT,
        }
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(8);
        self.height = height.max(8);
        self
    }

    pub fn render(&self) -> RgbImage {
        let plot = Plot::new(self.width, self.height);
        let mut img = plot.canvas(self.width, self.height);

        let per_group = self.groups.iter().map(Vec::len).max().unwrap_or(0) as u32;
        if self.groups.is_empty() || per_group == 0 {
            return img;
        }

        let max = self
            .groups
            .iter()
            .flatten()
            .map(|v| Scale::Linear.apply(*v))
            .fold(0.0, f64::max);
        let slot = (plot.width() / self.groups.len() as u32).max(1);
        let cluster = (slot * 4 / 5).max(per_group);
        let bar = (cluster / per_group).max(1);

        for (g, values) in self.groups.iter().enumerate() {
            let x_start = plot.left + g as u32 * slot + (slot - cluster.min(slot)) / 2;
            for (s, value) in values.iter().enumerate() {
                let len = bar_length(Scale::Linear.apply(*value), max, plot.height());
                let x0 = x_start + s as u32 * bar;
                fill_rect(
                    &mut img,
                    x0,
                    plot.bottom - len,
                    x0 + bar,
                    plot.bottom,
                    pick(&self.series, s),
                );
            }
        }

        draw_key(&mut img, &plot, (0..per_group as usize).map(|s| pick(&self.series, s)));
        img
    }
}

/// Slices start at twelve o'clock and run clockwise in value order.
#[derive(Debug, Clone)]
pub struct PieChart {
    values: Vec<f64>,
    colors: Vec<Rgb<u8>>,
    size: u32,
}

impl PieChart {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            colors: PASTELS.to_vec(),
            size: PIE_SIZE,
        }
    }

    pub fn colors(mut self, colors: Vec<Rgb<u8>>) -> Self {
        self.colors = colors;
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = size.max(8);
        self
    }

    pub fn render(&self) -> RgbImage {
        let mut img = RgbImage::from_pixel(self.size, self.size, BACKGROUND);

        let values: Vec<f64> = self.values.iter().map(|v| Scale::Linear.apply(*v)).collect();
        let total: f64 = values.iter().sum();
        if total <= 0.0 {
            return img;
        }

        // Cumulative upper bound of each slice as a fraction of the turn.
        let mut acc = 0.0;
        let bounds: Vec<f64> = values
            .iter()
            .map(|v| {
                acc += v / total;
                acc
            })
            .collect();

        let plot = Plot::new(self.size, self.size);
        let center = self.size as f64 / 2.0;
        let radius = center - plot.left as f64;

        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let dx = x as f64 + 0.5 - center;
            let dy = y as f64 + 0.5 - center;
            if dx * dx + dy * dy > radius * radius {
                continue;
            }
            let mut angle = dx.atan2(-dy);
            if angle < 0.0 {
                angle += TAU;
            }
            let turn = angle / TAU;
            let slice = bounds
                .iter()
                .position(|upper| turn < *upper)
                .unwrap_or(bounds.len() - 1);
            *pixel = pick(&self.colors, slice);
        }

        draw_key(&mut img, &plot, (0..values.len()).map(|i| pick(&self.colors, i)));
        img
    }
}
