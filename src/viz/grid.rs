use image::{Rgb, RgbImage};
use ndarray::ArrayView4;
use serde::{Deserialize, Serialize};

use crate::error::{VizError, VizResult};

/// Channel layout of a batch of images.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DataFormat {
    /// `[N, C, H, W]`
    #[default]
    Chw,
    /// `[N, H, W, C]`
    Hwc,
}

impl DataFormat {
    /// `(channels, height, width)` for a batch shaped in this format.
    fn split(self, shape: &[usize]) -> (usize, usize, usize) {
        match self {
            DataFormat::Chw => (shape[1], shape[2], shape[3]),
            DataFormat::Hwc => (shape[3], shape[1], shape[2]),
        }
    }
}

/// Tile a batch of images into one grid, `columns` per row, separated and
/// framed by `padding` black pixels. Values are expected in `[0, 1]`.
pub fn make_grid(
    images: ArrayView4<'_, f32>,
    format: DataFormat,
    columns: usize,
    padding: usize,
) -> VizResult<RgbImage> {
    let count = images.shape()[0];
    if count == 0 {
        return Err(VizError::Shape("image grid needs at least one image".into()));
    }
    let (channels, height, width) = format.split(images.shape());
    if !matches!(channels, 1 | 3 | 4) {
        return Err(VizError::Shape(format!(
            "image grid expects 1, 3 or 4 channels, got {channels} ({format:?} layout)"
        )));
    }
    if height == 0 || width == 0 {
        return Err(VizError::Shape("image grid cells must be non-empty".into()));
    }

    let columns = columns.max(1).min(count);
    let rows = count.div_ceil(columns);
    let cell_w = width + padding;
    let cell_h = height + padding;
    let grid_w = columns * cell_w + padding;
    let grid_h = rows * cell_h + padding;
    let mut grid = RgbImage::new(grid_w as u32, grid_h as u32);

    let value = |n: usize, c: usize, y: usize, x: usize| -> u8 {
        let raw = match format {
            DataFormat::Chw => images[[n, c, y, x]],
            DataFormat::Hwc => images[[n, y, x, c]],
        };
        let clamped = if raw.is_finite() { raw.clamp(0.0, 1.0) } else { 0.0 };
        (clamped * 255.0).round() as u8
    };

    for n in 0..count {
        let origin_x = (n % columns) * cell_w + padding;
        let origin_y = (n / columns) * cell_h + padding;
        for y in 0..height {
            for x in 0..width {
                let pixel = if channels == 1 {
                    let v = value(n, 0, y, x);
                    [v, v, v]
                } else {
                    [value(n, 0, y, x), value(n, 1, y, x), value(n, 2, y, x)]
                };
                grid.put_pixel((origin_x + x) as u32, (origin_y + y) as u32, Rgb(pixel));
            }
        }
    }
    Ok(grid)
}
