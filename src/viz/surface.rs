use image::RgbImage;
use ndarray::Array3;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters_bitmap::BitMapBackendError;

use super::glyph::{draw_text, draw_text_vertical, format_tick, text_height, text_width};
use super::palette::{BACKGROUND, FOREGROUND, FRAME, OVERLAY_FILL};
use super::raster::{Rect, copy_region, draw_border, fill_rect, image_dims, paste_region, pixel};
use crate::config::{Corner, LogOverlaySettings};
use crate::error::{VizError, VizResult};

pub type PlotResult = Result<(), DrawingAreaErrorKind<BitMapBackendError>>;
pub type PlotChart<'a, 'b> =
    ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

pub const MIN_SURFACE_PX: usize = 128;

const TITLE_SCALE: usize = 2;
const LABEL_SCALE: usize = 2;
const TICK_SCALE: usize = 1;
const MARGIN_TOP: usize = 28;
const MARGIN_LEFT: usize = 56;
const MARGIN_RIGHT: usize = 16;
const MARGIN_BOTTOM: usize = 34;

#[derive(Debug, Clone, Default)]
struct AxesStyle {
    visible: bool,
    labels: Option<(String, String)>,
}

/// Persistent raster canvas shared by every render cycle of one callback.
pub struct RenderSurface {
    image: Array3<u8>,
    plot_rect: Rect,
    axes: AxesStyle,
    cycles: usize,
}

impl RenderSurface {
    pub fn new(width: u32, height: u32) -> Self {
        let width = (width as usize).max(MIN_SURFACE_PX);
        let height = (height as usize).max(MIN_SURFACE_PX);
        let mut image = Array3::<u8>::zeros((height, width, 3));
        fill_rect(
            &mut image,
            Rect {
                x0: 0,
                y0: 0,
                x1: width,
                y1: height,
            },
            BACKGROUND,
        );
        let plot_rect = Rect {
            x0: MARGIN_LEFT,
            y0: MARGIN_TOP,
            x1: width - MARGIN_RIGHT,
            y1: height - MARGIN_BOTTOM,
        };
        Self {
            image,
            plot_rect,
            axes: AxesStyle {
                visible: true,
                labels: None,
            },
            cycles: 0,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        let (width, height) = image_dims(&self.image);
        (width as u32, height as u32)
    }

    pub fn plot_rect(&self) -> Rect {
        self.plot_rect
    }

    pub fn cycles(&self) -> usize {
        self.cycles
    }

    pub fn image(&self) -> &Array3<u8> {
        &self.image
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        pixel(&self.image, x, y)
    }

    fn full_rect(&self) -> Rect {
        let (width, height) = image_dims(&self.image);
        Rect {
            x0: 0,
            y0: 0,
            x1: width,
            y1: height,
        }
    }

    /// Start a cycle. Without `preserve` the previous picture is wiped.
    pub fn begin_cycle(&mut self, preserve: bool) {
        if !preserve {
            let full = self.full_rect();
            fill_rect(&mut self.image, full, BACKGROUND);
        }
        self.cycles += 1;
    }

    /// Title and axis configuration. Safe to repeat every cycle: the title
    /// strip is repainted rather than drawn over.
    pub fn setup_axes(&mut self, title: &str, labels: Option<(&str, &str)>, axis_off: bool) {
        let (width, _) = image_dims(&self.image);
        fill_rect(
            &mut self.image,
            Rect {
                x0: 0,
                y0: 0,
                x1: width,
                y1: self.plot_rect.y0,
            },
            BACKGROUND,
        );
        let title_w = text_width(title, TITLE_SCALE);
        let x = width.saturating_sub(title_w) / 2;
        let y = (self.plot_rect.y0.saturating_sub(text_height(TITLE_SCALE))) / 2;
        draw_text(&mut self.image, x, y, title, FOREGROUND, TITLE_SCALE);

        self.axes = AxesStyle {
            visible: !axis_off,
            labels: labels.map(|(x, y)| (x.to_owned(), y.to_owned())),
        };
    }

    /// Draw into the plot area with data coordinates `x_range` by `y_range`.
    /// The existing plot pixels are kept underneath, so preserved cycles
    /// accumulate.
    pub fn plot<F>(&mut self, x_range: (f64, f64), y_range: (f64, f64), draw: F) -> VizResult<()>
    where
        F: FnOnce(&mut PlotChart<'_, '_>) -> PlotResult,
    {
        for (axis, (lo, hi)) in [('x', x_range), ('y', y_range)] {
            if !(lo.is_finite() && hi.is_finite()) || hi <= lo {
                return Err(VizError::Render(format!(
                    "unusable {axis} plot range [{lo}, {hi}]"
                )));
            }
        }

        let rect = self.plot_rect;
        let mut buffer = copy_region(&self.image, rect);
        {
            let backend =
                BitMapBackend::with_buffer(&mut buffer, (rect.width() as u32, rect.height() as u32));
            let area = backend.into_drawing_area();
            let mut chart = ChartBuilder::on(&area)
                .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)
                .map_err(render_error)?;
            draw(&mut chart).map_err(render_error)?;
            area.present().map_err(render_error)?;
        }
        paste_region(&mut self.image, rect, &buffer);
        self.decorate_axes(x_range, y_range);
        Ok(())
    }

    fn decorate_axes(&mut self, x_range: (f64, f64), y_range: (f64, f64)) {
        if !self.axes.visible {
            return;
        }
        let (width, height) = image_dims(&self.image);
        let rect = self.plot_rect;
        fill_rect(
            &mut self.image,
            Rect {
                x0: 0,
                y0: rect.y0,
                x1: rect.x0,
                y1: height,
            },
            BACKGROUND,
        );
        fill_rect(
            &mut self.image,
            Rect {
                x0: rect.x0,
                y0: rect.y1,
                x1: width,
                y1: height,
            },
            BACKGROUND,
        );
        draw_border(&mut self.image, rect, FRAME);

        let tick_y = rect.y1 + 3;
        let x_lo = format_tick(x_range.0);
        let x_hi = format_tick(x_range.1);
        draw_text(&mut self.image, rect.x0, tick_y, &x_lo, FOREGROUND, TICK_SCALE);
        let hi_x = rect.x1.saturating_sub(text_width(&x_hi, TICK_SCALE));
        draw_text(&mut self.image, hi_x, tick_y, &x_hi, FOREGROUND, TICK_SCALE);

        let y_lo = format_tick(y_range.0);
        let y_hi = format_tick(y_range.1);
        let lo_x = rect.x0.saturating_sub(text_width(&y_lo, TICK_SCALE) + 3);
        let lo_y = rect.y1.saturating_sub(text_height(TICK_SCALE));
        draw_text(&mut self.image, lo_x, lo_y, &y_lo, FOREGROUND, TICK_SCALE);
        let hi_x = rect.x0.saturating_sub(text_width(&y_hi, TICK_SCALE) + 3);
        draw_text(&mut self.image, hi_x, rect.y0, &y_hi, FOREGROUND, TICK_SCALE);

        if let Some((x_label, y_label)) = self.axes.labels.clone() {
            let label_w = text_width(&x_label, LABEL_SCALE);
            let x = rect.x0 + rect.width().saturating_sub(label_w) / 2;
            let y = tick_y + text_height(TICK_SCALE) + 6;
            draw_text(&mut self.image, x, y, &x_label, FOREGROUND, LABEL_SCALE);

            let label_h = text_width(&y_label, LABEL_SCALE);
            let bottom = rect.y1 - rect.height().saturating_sub(label_h) / 2;
            draw_text_vertical(&mut self.image, 6, bottom, &y_label, FOREGROUND, LABEL_SCALE);
        }
    }

    /// Boxed metric readout anchored to a corner of the plot area.
    pub fn draw_log_overlay(&mut self, lines: &[String], settings: &LogOverlaySettings) {
        if lines.is_empty() {
            return;
        }
        let scale = settings.scale.max(1);
        let pad = settings.pad;
        let line_h = text_height(scale) + 2 * scale;
        let box_w = lines
            .iter()
            .map(|line| text_width(line, scale))
            .max()
            .unwrap_or(0)
            + 2 * pad;
        let box_h = lines.len() * line_h - 2 * scale + 2 * pad;
        let rect = self.plot_rect;
        let box_w = box_w.min(rect.width().saturating_sub(2 * pad));
        let box_h = box_h.min(rect.height().saturating_sub(2 * pad));

        let x0 = match settings.corner {
            Corner::UpperLeft | Corner::LowerLeft => rect.x0 + pad,
            Corner::UpperRight | Corner::LowerRight => rect.x1.saturating_sub(pad + box_w),
        };
        let y0 = match settings.corner {
            Corner::UpperLeft | Corner::UpperRight => rect.y0 + pad,
            Corner::LowerLeft | Corner::LowerRight => rect.y1.saturating_sub(pad + box_h),
        };
        let boxed = Rect {
            x0,
            y0,
            x1: x0 + box_w,
            y1: y0 + box_h,
        };
        fill_rect(&mut self.image, boxed, OVERLAY_FILL);
        draw_border(&mut self.image, boxed, FRAME);
        for (index, line) in lines.iter().enumerate() {
            let y = y0 + pad + index * line_h;
            if y + text_height(scale) > boxed.y1 {
                break;
            }
            draw_text(&mut self.image, x0 + pad, y, line, FOREGROUND, scale);
        }
    }

    /// Scale `picture` into the plot area, keeping its aspect ratio.
    pub fn blit_image(&mut self, picture: &RgbImage) {
        let rect = self.plot_rect;
        fill_rect(&mut self.image, rect, BACKGROUND);
        let (src_w, src_h) = (picture.width() as usize, picture.height() as usize);
        if src_w == 0 || src_h == 0 {
            return;
        }
        let scale = (rect.width() as f64 / src_w as f64).min(rect.height() as f64 / src_h as f64);
        let dst_w = ((src_w as f64 * scale).floor() as usize).clamp(1, rect.width());
        let dst_h = ((src_h as f64 * scale).floor() as usize).clamp(1, rect.height());
        let off_x = rect.x0 + (rect.width() - dst_w) / 2;
        let off_y = rect.y0 + (rect.height() - dst_h) / 2;
        for y in 0..dst_h {
            let sy = (y * src_h / dst_h).min(src_h - 1);
            for x in 0..dst_w {
                let sx = (x * src_w / dst_w).min(src_w - 1);
                let source = picture.get_pixel(sx as u32, sy as u32).0;
                self.image[[off_y + y, off_x + x, 0]] = source[0];
                self.image[[off_y + y, off_x + x, 1]] = source[1];
                self.image[[off_y + y, off_x + x, 2]] = source[2];
            }
        }
    }

    pub fn to_rgb_image(&self) -> VizResult<RgbImage> {
        let (width, height) = self.dimensions();
        let raw = self
            .image
            .as_slice()
            .ok_or_else(|| VizError::Render("canvas buffer is not contiguous".into()))?
            .to_vec();
        RgbImage::from_raw(width, height, raw)
            .ok_or_else(|| VizError::Render("canvas size does not match its buffer".into()))
    }
}

fn render_error(err: DrawingAreaErrorKind<BitMapBackendError>) -> VizError {
    VizError::Render(format!("{err:?}"))
}
