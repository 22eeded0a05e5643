//! Exam-code / student-ID digit grid reader (stage I, §4.4): 10 rows per
//! column, one filled row selected per column, digits concatenated
//! left-to-right.

use omr_core::{percentile, GrayImage};
use omr_vision::Grid;

#[cfg(feature = "tracing")]
use tracing::instrument;

const ROWS: usize = 10;
const INSET_FRAC: f32 = 0.05;

/// Read a digit-grid identifier from an Otsu-thresholded, rectified tile.
/// Returns `None` if fewer than `columns` columns produced a filled cell, or
/// the assembled string doesn't have exactly `expected_digits` digits.
#[cfg_attr(feature = "tracing", instrument(skip(otsu_binary, grid)))]
pub fn read_id(otsu_binary: &GrayImage, grid: &Grid, columns: usize, expected_digits: usize) -> Option<String> {
    let means = cell_means(otsu_binary, grid, columns);
    let flat: Vec<f32> = means.iter().flatten().map(|&m| m as f32).collect();
    let threshold = percentile(&flat, 10.0);

    let mut digits = String::new();
    for col in 0..columns {
        let mut filled: Vec<(usize, f64)> =
            (0..ROWS).filter_map(|row| means[col][row].map(|mean| (row, mean))).filter(|&(_, mean)| mean < threshold).collect();
        filled.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.partial_cmp(&b.1).unwrap()));

        match filled.first() {
            Some(&(row, _)) => digits.push(char::from_digit(row as u32, 10).unwrap()),
            None => return None,
        }
    }

    if digits.len() == expected_digits {
        Some(digits)
    } else {
        None
    }
}

fn cell_means(otsu_binary: &GrayImage, grid: &Grid, columns: usize) -> Vec<[Option<f64>; ROWS]> {
    (0..columns)
        .map(|col| {
            let mut row_means = [None; ROWS];
            for row in 0..ROWS {
                let (x0, x1) = inset(grid.v_lines[col], grid.v_lines[col + 1]);
                let (y0, y1) = inset(grid.h_lines[row], grid.h_lines[row + 1]);
                if let Some(cropped) = otsu_binary.crop(x0, y0, x1, y1) {
                    if !cropped.data.is_empty() {
                        let sum: u64 = cropped.data.iter().map(|&v| v as u64).sum();
                        row_means[row] = Some(sum as f64 / cropped.data.len() as f64);
                    }
                }
            }
            row_means
        })
        .collect()
}

fn inset(start: f32, end: f32) -> (usize, usize) {
    let span = end - start;
    let pad = INSET_FRAC * span;
    let x0 = (start + pad).max(0.0).round() as usize;
    let x1 = (end - pad).max(0.0).round() as usize;
    (x0, x1.max(x0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_10x(columns: usize, cell: f32) -> Grid {
        Grid { h_lines: (0..=ROWS).map(|r| r as f32 * cell).collect(), v_lines: (0..=columns).map(|c| c as f32 * cell).collect() }
    }

    fn uniform_tile(columns: usize, cell: usize) -> GrayImage {
        GrayImage::new(columns * cell, ROWS * cell, vec![255u8; columns * cell * ROWS * cell])
    }

    fn fill_cell(img: &mut GrayImage, grid: &Grid, row: usize, col: usize, value: u8) {
        let x0 = grid.v_lines[col] as usize;
        let x1 = grid.v_lines[col + 1] as usize;
        let y0 = grid.h_lines[row] as usize;
        let y1 = grid.h_lines[row + 1] as usize;
        for y in y0..y1 {
            for x in x0..x1 {
                img.data[y * img.width + x] = value;
            }
        }
    }

    #[test]
    fn reads_exam_code_from_darkened_rows() {
        let grid = grid_10x(4, 20.0);
        let mut tile = uniform_tile(4, 20);
        // digits 1, 0, 9, 3 in columns 0..4
        for (col, row) in [(0, 1), (1, 0), (2, 9), (3, 3)] {
            fill_cell(&mut tile, &grid, row, col, 0);
        }
        let code = read_id(&tile, &grid, 4, 4).expect("should read");
        assert_eq!(code, "1093");
    }

    #[test]
    fn missing_column_fill_yields_none() {
        let grid = grid_10x(4, 20.0);
        let tile = uniform_tile(4, 20); // nothing darkened, nothing below threshold
        assert!(read_id(&tile, &grid, 4, 4).is_none());
    }
}
