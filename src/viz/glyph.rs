//! 3x5 bitmap font for titles, axis annotations and the log overlay. Keeps the
//! raster path free of system font lookups.

use ndarray::Array3;

use super::raster::{Rect, fill_rect, image_dims};

pub const GLYPH_WIDTH: usize = 3;
pub const GLYPH_HEIGHT: usize = 5;
const ADVANCE: usize = GLYPH_WIDTH + 1;

/// Five rows of three cells, top row first; `#` is lit.
fn glyph_rows(ch: char) -> [&'static str; GLYPH_HEIGHT] {
    match ch.to_ascii_uppercase() {
        '0' | 'O' => ["###", "#.#", "#.#", "#.#", "###"],
        '1' => [".#.", "##.", ".#.", ".#.", "###"],
        '2' => ["###", "..#", "###", "#..", "###"],
        '3' => ["###", "..#", "###", "..#", "###"],
        '4' => ["#.#", "#.#", "###", "..#", "..#"],
        '5' | 'S' => ["###", "#..", "###", "..#", "###"],
        '6' => ["###", "#..", "###", "#.#", "###"],
        '7' => ["###", "..#", ".#.", ".#.", ".#."],
        '8' => ["###", "#.#", "###", "#.#", "###"],
        '9' => ["###", "#.#", "###", "..#", "###"],
        'A' => [".#.", "#.#", "###", "#.#", "#.#"],
        'B' => ["##.", "#.#", "##.", "#.#", "##."],
        'C' => ["###", "#..", "#..", "#..", "###"],
        'D' => ["##.", "#.#", "#.#", "#.#", "##."],
        'E' => ["###", "#..", "##.", "#..", "###"],
        'F' => ["###", "#..", "##.", "#..", "#.."],
        'G' => ["###", "#..", "#.#", "#.#", "###"],
        'H' => ["#.#", "#.#", "###", "#.#", "#.#"],
        'I' => ["###", ".#.", ".#.", ".#.", "###"],
        'J' => ["..#", "..#", "..#", "#.#", "###"],
        'K' => ["#.#", "##.", "#..", "##.", "#.#"],
        'L' => ["#..", "#..", "#..", "#..", "###"],
        'M' => ["#.#", "###", "###", "#.#", "#.#"],
        'N' => ["##.", "#.#", "#.#", "#.#", "#.#"],
        'P' => ["###", "#.#", "###", "#..", "#.."],
        'Q' => ["###", "#.#", "#.#", "###", "..#"],
        'R' => ["##.", "#.#", "##.", "#.#", "#.#"],
        'T' => ["###", ".#.", ".#.", ".#.", ".#."],
        'U' => ["#.#", "#.#", "#.#", "#.#", "###"],
        'V' => ["#.#", "#.#", "#.#", "#.#", ".#."],
        'W' => ["#.#", "#.#", "###", "###", "#.#"],
        'X' => ["#.#", "#.#", ".#.", "#.#", "#.#"],
        'Y' => ["#.#", "#.#", ".#.", ".#.", ".#."],
        'Z' => ["###", "..#", ".#.", "#..", "###"],
        '-' => ["...", "...", "###", "...", "..."],
        '+' => ["...", ".#.", "###", ".#.", "..."],
        '=' => ["...", "###", "...", "###", "..."],
        ':' => ["...", ".#.", "...", ".#.", "..."],
        '.' => ["...", "...", "...", "...", ".#."],
        ',' => ["...", "...", "...", ".#.", "#.."],
        '(' => ["..#", ".#.", ".#.", ".#.", "..#"],
        ')' => ["#..", ".#.", ".#.", ".#.", "#.."],
        '[' => [".##", ".#.", ".#.", ".#.", ".##"],
        ']' => ["##.", ".#.", ".#.", ".#.", "##."],
        '%' => ["#.#", "..#", ".#.", "#..", "#.#"],
        '!' => [".#.", ".#.", ".#.", "...", ".#."],
        '/' => ["..#", "..#", ".#.", "#..", "#.."],
        '_' => ["...", "...", "...", "...", "###"],
        ' ' => ["...", "...", "...", "...", "..."],
        _ => ["###", "..#", ".#.", "...", ".#."],
    }
}

/// Lit `(column, row)` cells of a glyph.
fn lit_cells(ch: char) -> impl Iterator<Item = (usize, usize)> {
    glyph_rows(ch).into_iter().enumerate().flat_map(|(row, cells)| {
        cells
            .bytes()
            .enumerate()
            .filter(|(_, cell)| *cell == b'#')
            .map(move |(col, _)| (col, row))
    })
}

fn block(image: &mut Array3<u8>, x: usize, y: usize, scale: usize, color: [u8; 3]) {
    let rect = Rect {
        x0: x,
        y0: y,
        x1: x + scale,
        y1: y + scale,
    };
    fill_rect(image, rect, color);
}

/// Pixel width of `text` at `scale`, without the trailing gap.
pub fn text_width(text: &str, scale: usize) -> usize {
    match text.chars().count() {
        0 => 0,
        count => (count * ADVANCE - 1) * scale.max(1),
    }
}

pub fn text_height(scale: usize) -> usize {
    GLYPH_HEIGHT * scale.max(1)
}

/// Draw a single line, clipping at the right edge. Returns the cursor position.
pub fn draw_text(
    image: &mut Array3<u8>,
    x: usize,
    y: usize,
    text: &str,
    color: [u8; 3],
    scale: usize,
) -> usize {
    let scale = scale.max(1);
    let (width, height) = image_dims(image);
    if y + text_height(scale) > height || x >= width {
        return x;
    }
    let mut cursor = x;
    for ch in text.chars() {
        if cursor + GLYPH_WIDTH * scale > width {
            break;
        }
        for (col, row) in lit_cells(ch) {
            block(image, cursor + col * scale, y + row * scale, scale, color);
        }
        cursor += ADVANCE * scale;
    }
    cursor
}

/// Bottom-to-top text, as used for the y-axis label. Glyph rows run along x.
pub fn draw_text_vertical(
    image: &mut Array3<u8>,
    x: usize,
    y_bottom: usize,
    text: &str,
    color: [u8; 3],
    scale: usize,
) {
    let scale = scale.max(1);
    let mut baseline = y_bottom;
    for ch in text.chars() {
        if baseline < GLYPH_WIDTH * scale {
            break;
        }
        for (col, row) in lit_cells(ch) {
            block(image, x + row * scale, baseline - (col + 1) * scale, scale, color);
        }
        baseline = baseline.saturating_sub(ADVANCE * scale);
    }
}

/// Compact numeric label for axis extents.
pub fn format_tick(value: f64) -> String {
    if value == 0.0 {
        return "0".into();
    }
    let magnitude = value.abs();
    if !(1e-3..1e5).contains(&magnitude) {
        format!("{value:.1e}").to_uppercase()
    } else if magnitude >= 100.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}
