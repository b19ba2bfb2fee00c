//! Plot primitives: scatter markers, decision regions and topology edges.

use ndarray::{Array2, ArrayView2};
use plotters::prelude::*;

use super::palette::{BACKGROUND, EDGE, LabelColors};
use super::surface::{PlotChart, PlotResult};
use crate::mesh::MeshGrid;

pub const DATA_MARKER_RADIUS: i32 = 3;
pub const PROTO_MARKER_RADIUS: i32 = 7;
/// Opacity of decision-region tint over the background.
pub const REGION_ALPHA: f64 = 0.35;

pub fn draw_data(
    chart: &mut PlotChart<'_, '_>,
    points: ArrayView2<'_, f64>,
    colors: &[RGBColor],
) -> PlotResult {
    chart.draw_series(points.rows().into_iter().zip(colors).map(|(row, color)| {
        EmptyElement::at((row[0], row[1]))
            + Circle::new((0, 0), DATA_MARKER_RADIUS, color.filled())
            + Circle::new((0, 0), DATA_MARKER_RADIUS, EDGE.stroke_width(1))
    }))?;
    Ok(())
}

fn diamond(radius: i32) -> Vec<(i32, i32)> {
    vec![(0, -radius), (radius, 0), (0, radius), (-radius, 0)]
}

/// Prototypes as outlined diamonds, larger than data markers.
pub fn draw_prototypes(
    chart: &mut PlotChart<'_, '_>,
    points: ArrayView2<'_, f64>,
    colors: &[RGBColor],
) -> PlotResult {
    chart.draw_series(points.rows().into_iter().zip(colors).map(|(row, color)| {
        let mut outline = diamond(PROTO_MARKER_RADIUS);
        outline.push((0, -PROTO_MARKER_RADIUS));
        EmptyElement::at((row[0], row[1]))
            + Polygon::new(diamond(PROTO_MARKER_RADIUS), color.filled())
            + PathElement::new(outline, EDGE.stroke_width(1))
    }))?;
    Ok(())
}

fn tint(color: RGBColor, alpha: f64) -> RGBColor {
    let mix = |fg: u8, bg: u8| (fg as f64 * alpha + bg as f64 * (1.0 - alpha)).round() as u8;
    RGBColor(
        mix(color.0, BACKGROUND[0]),
        mix(color.1, BACKGROUND[1]),
        mix(color.2, BACKGROUND[2]),
    )
}

/// Filled mesh cells coloured by predicted class. Cells are pre-blended with
/// the background so shared cell borders do not double up.
pub fn draw_decision_regions(
    chart: &mut PlotChart<'_, '_>,
    mesh: &MeshGrid,
    predictions: &Array2<i64>,
    colors: &LabelColors,
) -> PlotResult {
    let (dx, dy) = mesh.step();
    let (x_lo, x_hi) = mesh.x_range;
    let (y_lo, y_hi) = mesh.y_range;
    chart.draw_series(predictions.indexed_iter().map(|((i, j), label)| {
        let x = mesh.xx[[i, j]];
        let y = mesh.yy[[i, j]];
        let x0 = (x - dx / 2.0).max(x_lo);
        let x1 = (x + dx / 2.0).min(x_hi);
        let y0 = (y - dy / 2.0).max(y_lo);
        let y1 = (y + dy / 2.0).min(y_hi);
        Rectangle::new(
            [(x0, y0), (x1, y1)],
            tint(colors.color(*label), REGION_ALPHA).filled(),
        )
    }))?;
    Ok(())
}

/// Undirected edges of a prototype adjacency matrix, one per finite non-zero
/// entry on or above the diagonal.
pub fn topology_edges(adjacency: ArrayView2<'_, f64>) -> Vec<(usize, usize)> {
    let n = adjacency.nrows().min(adjacency.ncols());
    let mut edges = Vec::new();
    for i in 0..n {
        for j in i..n {
            let weight = adjacency[[i, j]];
            if weight.is_finite() && weight != 0.0 {
                edges.push((i, j));
            }
        }
    }
    edges
}

pub fn draw_topology(
    chart: &mut PlotChart<'_, '_>,
    points: ArrayView2<'_, f64>,
    edges: &[(usize, usize)],
) -> PlotResult {
    let n = points.nrows();
    chart.draw_series(
        edges
            .iter()
            .filter(|(i, j)| *i < n && *j < n)
            .map(|&(i, j)| {
                PathElement::new(
                    vec![(points[[i, 0]], points[[i, 1]]), (points[[j, 0]], points[[j, 1]])],
                    EDGE.stroke_width(1),
                )
            }),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{DEFAULT_MAX_GRID_POINTS, mesh2d};
    use crate::viz::palette::Colormap;
    use crate::viz::surface::RenderSurface;
    use ndarray::array;

    fn count_color(surface: &RenderSurface, color: [u8; 3]) -> usize {
        let rect = surface.plot_rect();
        let mut count = 0;
        for y in rect.y0..rect.y1 {
            for x in rect.x0..rect.x1 {
                if surface.pixel(x, y) == color {
                    count += 1;
                }
            }
        }
        count
    }

    #[test]
    fn edges_cover_upper_triangle_only() {
        let adjacency = array![
            [0.0, 1.0, 0.0, 1.0],
            [1.0, 0.0, 1.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0],
        ];
        assert_eq!(topology_edges(adjacency.view()), vec![(0, 1), (0, 3), (1, 2)]);

        let with_loop = array![[2.0, 0.0], [0.0, 0.0]];
        assert_eq!(topology_edges(with_loop.view()), vec![(0, 0)]);
    }

    #[test]
    fn non_finite_weights_are_not_edges() {
        let adjacency = array![
            [0.0, f64::NAN, 0.5],
            [f64::NAN, 0.0, f64::INFINITY],
            [0.5, f64::INFINITY, 0.0],
        ];
        assert_eq!(topology_edges(adjacency.view()), vec![(0, 2)]);
    }

    #[test]
    fn edge_count_matches_nonzero_upper_entries() {
        let adjacency = Array2::from_shape_fn((5, 5), |(i, j)| ((i * 7 + j * 3) % 4 == 0) as u8 as f64);
        let expected = (0..5)
            .flat_map(|i| (i..5).map(move |j| (i, j)))
            .filter(|&(i, j)| adjacency[[i, j]] != 0.0)
            .count();
        assert_eq!(topology_edges(adjacency.view()).len(), expected);
    }

    #[test]
    fn regions_fill_the_plot_with_tinted_classes() {
        let cloud = array![[0.0, 0.0], [1.0, 1.0]];
        let mesh = mesh2d(cloud.view(), 0.0, 8, DEFAULT_MAX_GRID_POINTS).expect("mesh");
        let predictions = Array2::from_shape_fn(mesh.shape(), |(_, j)| (j >= 4) as i64);
        let colors = LabelColors::new(Colormap::Viridis, [0, 1]);

        let mut surface = RenderSurface::new(200, 200);
        surface
            .plot(mesh.x_range, mesh.y_range, |chart| {
                draw_decision_regions(chart, &mesh, &predictions, &colors)
            })
            .expect("plot");

        let left = tint(colors.color(0), REGION_ALPHA);
        let right = tint(colors.color(1), REGION_ALPHA);
        assert!(count_color(&surface, [left.0, left.1, left.2]) > 100);
        assert!(count_color(&surface, [right.0, right.1, right.2]) > 100);
    }

    #[test]
    fn prototypes_draw_larger_markers_than_data() {
        let point = array![[0.5, 0.5]];
        let color = RGBColor(200, 30, 30);

        let mut data_surface = RenderSurface::new(200, 200);
        data_surface
            .plot((0.0, 1.0), (0.0, 1.0), |chart| draw_data(chart, point.view(), &[color]))
            .expect("plot");
        let mut proto_surface = RenderSurface::new(200, 200);
        proto_surface
            .plot((0.0, 1.0), (0.0, 1.0), |chart| {
                draw_prototypes(chart, point.view(), &[color])
            })
            .expect("plot");

        let data_px = count_color(&data_surface, [200, 30, 30]);
        let proto_px = count_color(&proto_surface, [200, 30, 30]);
        assert!(data_px > 0);
        assert!(proto_px > data_px);
    }
}
