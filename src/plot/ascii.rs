//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - histogram bars: `#`
//! - fitted curve: `*` line
//! - error boxes: `+`, `-`, `|` outlines
//! - free text (exposure mark, preliminary mark) on top of everything

use crate::domain::{BinnedSample, CurveGrid};
use crate::report::format_pot;

const BAR: char = '#';
const CURVE: char = '*';

/// Where a text annotation is anchored on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Row 0, right-aligned, reading left to right.
    TopRight,
    /// Column 0, reading top to bottom.
    TopLeftVertical,
    /// Row 0, starting after any vertical text in column 0.
    TopLeft,
}

/// Optional marks drawn above the data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Marks {
    /// Exposure in protons on target.
    pub pot: Option<f64>,
    /// Place the exposure mark along the left edge instead of the top right.
    pub pot_vertical: bool,
    pub preliminary: Option<String>,
}

/// Fixed-size character grid with data coordinates.
#[derive(Debug, Clone)]
pub struct Canvas {
    grid: Vec<Vec<char>>,
    x_range: (f64, f64),
    y_range: (f64, f64),
    /// Columns taken by vertical text on the left edge.
    left_margin: usize,
}

impl Canvas {
    pub fn new(width: usize, height: usize, x_range: (f64, f64), y_range: (f64, f64)) -> Self {
        let width = width.max(10);
        let height = height.max(5);
        Self {
            grid: vec![vec![' '; width]; height],
            x_range: sane_range(x_range),
            y_range: sane_range(y_range),
            left_margin: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.grid[0].len()
    }

    pub fn height(&self) -> usize {
        self.grid.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<char> {
        self.grid.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Fill histogram bars from the bottom row up to each column's bin count.
    ///
    /// Only blank cells are filled, so anything drawn earlier stays visible.
    pub fn bars(&mut self, edges: &[f64], counts: &[f64]) {
        let (x_min, x_max) = self.x_range;
        let (y_min, _) = self.y_range;
        let width = self.width();
        let height = self.height();

        for col in 0..width {
            let x = x_min + (col as f64 / (width as f64 - 1.0)) * (x_max - x_min);
            let Some(bin) = bin_index(edges, x) else { continue };
            let Some(&count) = counts.get(bin) else { continue };
            if !(count.is_finite() && count > y_min) {
                continue;
            }
            let top = self.map_y(count);
            for row in &mut self.grid[top..height] {
                if row[col] == ' ' {
                    row[col] = BAR;
                }
            }
        }
    }

    /// Draw a polyline through `(x, y)` points.
    pub fn curve(&mut self, points: impl IntoIterator<Item = (f64, f64)>) {
        let mut prev = None;
        for (x, y) in points {
            if !(x.is_finite() && y.is_finite()) {
                prev = None;
                continue;
            }
            let col = self.map_x(x);
            let row = self.map_y(y);
            match prev {
                Some((c0, r0)) => draw_line(&mut self.grid, c0, r0, col, row, CURVE),
                None => put(&mut self.grid, row, col, CURVE),
            }
            prev = Some((col, row));
        }
    }

    /// Draw one rectangle outline per point: lower-left corner at
    /// `(x - xerr, y - yerr)`, width `2|xerr|`, height `2 yerr`.
    pub fn error_boxes(&mut self, x: &[f64], y: &[f64], xerr: &[f64], yerr: &[f64]) {
        for (((&xi, &yi), &dx), &dy) in x.iter().zip(y).zip(xerr).zip(yerr) {
            let (x0, y0) = (xi - dx, yi - dy);
            let (x1, y1) = (x0 + 2.0 * dx.abs(), y0 + 2.0 * dy);
            if ![x0, y0, x1, y1].iter().all(|v| v.is_finite()) {
                continue;
            }
            let (c0, c1) = (self.map_x(x0), self.map_x(x1));
            let (top, bottom) = {
                let (a, b) = (self.map_y(y1), self.map_y(y0));
                (a.min(b), a.max(b))
            };
            let (left, right) = (c0.min(c1), c0.max(c1));

            for col in left..=right {
                put(&mut self.grid, top, col, '-');
                put(&mut self.grid, bottom, col, '-');
            }
            for row in top..=bottom {
                put(&mut self.grid, row, left, '|');
                put(&mut self.grid, row, right, '|');
            }
            for (row, col) in [(top, left), (top, right), (bottom, left), (bottom, right)] {
                self.grid[row][col] = '+';
            }
        }
    }

    /// Write text over whatever is below it; clipped at the canvas border.
    pub fn text(&mut self, text: &str, placement: Placement) {
        let chars: Vec<char> = text.chars().collect();
        match placement {
            Placement::TopRight => {
                let start = self.width().saturating_sub(chars.len());
                for (col, ch) in (start..self.width()).zip(chars) {
                    self.grid[0][col] = ch;
                }
            }
            Placement::TopLeftVertical => {
                for (row, ch) in self.grid.iter_mut().zip(chars) {
                    row[0] = ch;
                }
                self.left_margin = 2;
            }
            Placement::TopLeft => {
                let width = self.width();
                for (col, ch) in (self.left_margin..width).zip(chars) {
                    self.grid[0][col] = ch;
                }
            }
        }
    }

    /// Draw the exposure and preliminary marks.
    pub fn marks(&mut self, marks: &Marks) {
        if let Some(pot) = marks.pot.and_then(format_pot) {
            let placement = if marks.pot_vertical {
                Placement::TopLeftVertical
            } else {
                Placement::TopRight
            };
            self.text(&pot, placement);
        }
        if let Some(label) = &marks.preliminary {
            self.text(label, Placement::TopLeft);
        }
    }

    /// Final string with a range header line.
    pub fn render(&self) -> String {
        let (x_min, x_max) = self.x_range;
        let (y_min, y_max) = self.y_range;
        let mut out = format!("Plot: x=[{x_min:.3}, {x_max:.3}] | y=[{y_min:.2}, {y_max:.2}]\n");
        for row in &self.grid {
            out.push_str(&row.iter().collect::<String>());
            out.push('\n');
        }
        out
    }

    fn map_x(&self, x: f64) -> usize {
        map_x(x, self.x_range.0, self.x_range.1, self.width())
    }

    fn map_y(&self, y: f64) -> usize {
        map_y(y, self.y_range.0, self.y_range.1, self.height())
    }
}

/// Empty canvas sized for a histogram and an optional overlay: x spans the
/// bin edges, y runs from zero to the tallest bin or curve point.
pub fn spectrum_canvas(sample: &BinnedSample, curve: Option<&CurveGrid>, width: usize, height: usize) -> Canvas {
    let x_range = sample.x_range().unwrap_or((-1.0, 1.0));
    let y_max = sample
        .counts
        .iter()
        .copied()
        .chain(curve.into_iter().flat_map(|c| c.y.iter().copied()))
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);
    Canvas::new(width, height, x_range, pad_range(0.0, y_max, 0.05))
}

fn bin_index(edges: &[f64], x: f64) -> Option<usize> {
    let last = edges.len().checked_sub(1)?;
    if last == 0 || x < edges[0] || x > edges[last] {
        return None;
    }
    // Upper edge of the last bin is inclusive.
    let i = edges.partition_point(|&e| e <= x);
    Some(i.saturating_sub(1).min(last - 1))
}

fn sane_range((min, max): (f64, f64)) -> (f64, f64) {
    if min.is_finite() && max.is_finite() && max > min {
        (min, max)
    } else {
        (0.0, 1.0)
    }
}

/// Headroom above `max`; the baseline stays put.
fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn put(grid: &mut [Vec<char>], row: usize, col: usize, ch: char) {
    if let Some(cell) = grid.get_mut(row).and_then(|r| r.get_mut(col)) {
        if *cell == ' ' {
            *cell = ch;
        }
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if x0 >= 0 && y0 >= 0 {
            put(grid, y0 as usize, x0 as usize, ch);
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
