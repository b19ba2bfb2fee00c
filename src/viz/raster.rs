//! Pixel helpers over `[H, W, 3]` canvases. Every writer clips to the canvas.

use ndarray::{Array3, ArrayViewMut3, s};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl Rect {
    pub fn width(&self) -> usize {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> usize {
        self.y1.saturating_sub(self.y0)
    }

    pub fn center(&self) -> (usize, usize) {
        (self.x0 + self.width() / 2, self.y0 + self.height() / 2)
    }

    pub fn clamp_to(&self, width: usize, height: usize) -> Rect {
        let x1 = self.x1.min(width);
        let y1 = self.y1.min(height);
        Rect {
            x0: self.x0.min(x1),
            y0: self.y0.min(y1),
            x1,
            y1,
        }
    }
}

/// `(width, height)` of the canvas.
pub fn image_dims(image: &Array3<u8>) -> (usize, usize) {
    let (height, width, _) = image.dim();
    (width, height)
}

pub fn pixel(image: &Array3<u8>, x: usize, y: usize) -> [u8; 3] {
    let px = image.slice(s![y, x, ..]);
    [px[0], px[1], px[2]]
}

fn region_mut(image: &mut Array3<u8>, rect: Rect) -> ArrayViewMut3<'_, u8> {
    let (width, height) = image_dims(image);
    let r = rect.clamp_to(width, height);
    image.slice_mut(s![r.y0..r.y1, r.x0..r.x1, ..])
}

pub fn put_pixel(image: &mut Array3<u8>, x: usize, y: usize, color: [u8; 3]) {
    let dot = Rect {
        x0: x,
        y0: y,
        x1: x.saturating_add(1),
        y1: y.saturating_add(1),
    };
    fill_rect(image, dot, color);
}

pub fn fill_rect(image: &mut Array3<u8>, rect: Rect, color: [u8; 3]) {
    let mut region = region_mut(image, rect);
    for (channel, value) in color.into_iter().enumerate() {
        region.slice_mut(s![.., .., channel]).fill(value);
    }
}

/// One-pixel outline of `rect` after clipping it to the canvas.
pub fn draw_border(image: &mut Array3<u8>, rect: Rect, color: [u8; 3]) {
    let (width, height) = image_dims(image);
    let r = rect.clamp_to(width, height);
    if r.width() == 0 || r.height() == 0 {
        return;
    }
    let edges = [
        Rect { y1: r.y0 + 1, ..r },
        Rect { y0: r.y1 - 1, ..r },
        Rect { x1: r.x0 + 1, ..r },
        Rect { x0: r.x1 - 1, ..r },
    ];
    for edge in edges {
        fill_rect(image, edge, color);
    }
}

/// Copy a region out as a packed RGB buffer.
pub fn copy_region(image: &Array3<u8>, rect: Rect) -> Vec<u8> {
    let (width, height) = image_dims(image);
    let r = rect.clamp_to(width, height);
    image
        .slice(s![r.y0..r.y1, r.x0..r.x1, ..])
        .iter()
        .copied()
        .collect()
}

/// Inverse of [`copy_region`]; a short buffer fills what it covers.
pub fn paste_region(image: &mut Array3<u8>, rect: Rect, buffer: &[u8]) {
    let mut region = region_mut(image, rect);
    for (dst, src) in region.iter_mut().zip(buffer) {
        *dst = *src;
    }
}
