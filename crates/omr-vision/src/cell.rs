//! Cell feature extractor (stage F): crop each grid cell (inset 5%) from the
//! enhanced grayscale and paired adaptive binary, and compute its stats.

use crate::grid::Grid;
use omr_core::{CellStats, GrayImage};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// One extracted cell: its grid position plus the feature bag the decision
/// engines consume.
#[derive(Clone, Copy, Debug)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    pub stats: CellStats,
}

/// Extract every cell of `grid` from `enhanced` (contrast-enhanced,
/// bilaterally-smoothed grayscale) paired with `adaptive_binary`, inset 5% on
/// all sides. Both rasters must share the tile's dimensions.
#[cfg_attr(feature = "tracing", instrument(skip(enhanced, adaptive_binary, grid)))]
pub fn extract_cells(enhanced: &GrayImage, adaptive_binary: &GrayImage, grid: &Grid) -> Vec<Cell> {
    let rows = grid.h_lines.len().saturating_sub(1);
    let cols = grid.v_lines.len().saturating_sub(1);
    let mut cells = Vec::with_capacity(rows * cols);

    for r in 0..rows {
        for c in 0..cols {
            let (x0, x1) = inset(grid.v_lines[c], grid.v_lines[c + 1]);
            let (y0, y1) = inset(grid.h_lines[r], grid.h_lines[r + 1]);

            let gray_pixels = crop_pixels(enhanced, x0, y0, x1, y1);
            let binary_pixels = crop_pixels(adaptive_binary, x0, y0, x1, y1);

            cells.push(Cell { row: r, col: c, stats: CellStats::compute(&gray_pixels, &binary_pixels) });
        }
    }
    cells
}

fn inset(start: f32, end: f32) -> (usize, usize) {
    let span = end - start;
    let pad = 0.05 * span;
    let x0 = (start + pad).max(0.0).round() as usize;
    let x1 = (end - pad).max(0.0).round() as usize;
    (x0, x1.max(x0))
}

fn crop_pixels(img: &GrayImage, x0: usize, y0: usize, x1: usize, y1: usize) -> Vec<u8> {
    img.crop(x0, y0, x1, y1).map(|c| c.data).unwrap_or_default()
}
