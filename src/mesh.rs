//! Evaluation mesh over a 2-D point cloud.
//!
//! The mesh covers the bounding box of the cloud expanded by a border on every
//! side. Query points are laid out row-major: row `i` of the mesh holds the
//! points with `y = ys[i]`, column `j` the points with `x = xs[j]`, and query
//! index `k` maps to `(i, j) = (k / resolution, k % resolution)`.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::error::{VizError, VizResult};

pub const DEFAULT_MAX_GRID_POINTS: usize = 4_000_000;

#[derive(Debug, Clone)]
pub struct MeshGrid {
    pub xx: Array2<f64>,
    pub yy: Array2<f64>,
    pub query: Array2<f64>,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
}

impl MeshGrid {
    /// `(rows, cols)`; both equal the resolution.
    pub fn shape(&self) -> (usize, usize) {
        self.xx.dim()
    }

    pub fn resolution(&self) -> usize {
        self.xx.ncols()
    }

    pub fn len(&self) -> usize {
        self.query.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.query.nrows() == 0
    }

    /// Distance between neighbouring query points along each axis.
    pub fn step(&self) -> (f64, f64) {
        let cells = (self.resolution().max(2) - 1) as f64;
        (
            (self.x_range.1 - self.x_range.0) / cells,
            (self.y_range.1 - self.y_range.0) / cells,
        )
    }

    /// Fold one prediction per query point back into mesh layout.
    pub fn reshape_predictions(&self, predictions: Vec<i64>) -> VizResult<Array2<i64>> {
        let (rows, cols) = self.shape();
        if predictions.len() != rows * cols {
            return Err(VizError::Prediction(format!(
                "expected {} predictions for a {rows}x{cols} mesh, got {}",
                rows * cols,
                predictions.len()
            )));
        }
        Array2::from_shape_vec((rows, cols), predictions)
            .map_err(|err| VizError::Prediction(err.to_string()))
    }
}

/// Build a `resolution x resolution` mesh over the first two columns of `cloud`.
pub fn mesh2d(
    cloud: ArrayView2<'_, f64>,
    border: f64,
    resolution: usize,
    max_points: usize,
) -> VizResult<MeshGrid> {
    if cloud.ncols() < 2 {
        return Err(VizError::Shape(format!(
            "mesh needs 2-D coordinates, got {} column(s)",
            cloud.ncols()
        )));
    }
    if cloud.nrows() == 0 {
        return Err(VizError::Shape("mesh point cloud is empty".into()));
    }
    if resolution < 2 {
        return Err(VizError::InvalidConfig(format!(
            "mesh resolution must be at least 2, got {resolution}"
        )));
    }
    if !border.is_finite() || border < 0.0 {
        return Err(VizError::InvalidConfig(format!(
            "mesh border must be finite and non-negative, got {border}"
        )));
    }
    let points = (resolution as u128) * (resolution as u128);
    if points > max_points as u128 {
        return Err(VizError::GridTooLarge {
            resolution,
            points,
            limit: max_points,
        });
    }

    let (x_min, x_max) = axis_bounds(cloud.column(0), 'x')?;
    let (y_min, y_max) = axis_bounds(cloud.column(1), 'y')?;
    if x_max <= x_min {
        return Err(VizError::DegenerateRange {
            axis: 'x',
            min: x_min,
            max: x_max,
        });
    }
    if y_max <= y_min {
        return Err(VizError::DegenerateRange {
            axis: 'y',
            min: y_min,
            max: y_max,
        });
    }

    let x_range = (x_min - border, x_max + border);
    let y_range = (y_min - border, y_max + border);
    let xs = Array1::linspace(x_range.0, x_range.1, resolution);
    let ys = Array1::linspace(y_range.0, y_range.1, resolution);

    let xx = Array2::from_shape_fn((resolution, resolution), |(_, j)| xs[j]);
    let yy = Array2::from_shape_fn((resolution, resolution), |(i, _)| ys[i]);
    let query = Array2::from_shape_fn((resolution * resolution, 2), |(k, c)| {
        if c == 0 {
            xs[k % resolution]
        } else {
            ys[k / resolution]
        }
    });

    Ok(MeshGrid {
        xx,
        yy,
        query,
        x_range,
        y_range,
    })
}

/// Plot extents for scenes without a mesh. Collapsed axes are widened so the
/// projection stays finite.
pub fn plot_bounds(cloud: ArrayView2<'_, f64>, border: f64) -> VizResult<((f64, f64), (f64, f64))> {
    if cloud.ncols() < 2 || cloud.nrows() == 0 {
        return Err(VizError::Shape(format!(
            "plot needs a non-empty 2-D cloud, got {}x{}",
            cloud.nrows(),
            cloud.ncols()
        )));
    }
    let (mut x0, mut x1) = axis_bounds(cloud.column(0), 'x')?;
    let (mut y0, mut y1) = axis_bounds(cloud.column(1), 'y')?;
    if (x1 - x0).abs() < f64::EPSILON {
        x0 -= 0.5;
        x1 += 0.5;
    }
    if (y1 - y0).abs() < f64::EPSILON {
        y0 -= 0.5;
        y1 += 0.5;
    }
    let border = if border.is_finite() { border.max(0.0) } else { 0.0 };
    Ok(((x0 - border, x1 + border), (y0 - border, y1 + border)))
}

fn axis_bounds(values: ArrayView1<'_, f64>, axis: char) -> VizResult<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &value in values {
        if !value.is_finite() {
            return Err(VizError::Shape(format!(
                "point cloud contains a non-finite {axis} coordinate ({value})"
            )));
        }
        min = min.min(value);
        max = max.max(value);
    }
    Ok((min, max))
}
