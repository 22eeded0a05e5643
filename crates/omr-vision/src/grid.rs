//! Grid model (stage E): pure functions mapping a rectified tile's width and
//! height to the horizontal and vertical line positions bounding its cells.

use omr_core::Part;

/// Horizontal (`h_lines`) and vertical (`v_lines`) grid boundaries in pixels,
/// both sorted ascending. Cell `(r, c)` spans
/// `(h_lines[r], h_lines[r+1]) x (v_lines[c], v_lines[c+1])`.
#[derive(Clone, Debug)]
pub struct Grid {
    pub h_lines: Vec<f32>,
    pub v_lines: Vec<f32>,
}

/// Build the grid for `part` over a tile of size `w x h`. Panics on parts
/// with no defined grid (exam code / student id use [`id_grid`] instead).
pub fn grid_for_part(part: Part, w: f32, h: f32) -> Grid {
    match part {
        Part::P1 => part1_grid(w, h),
        Part::P2 => part2_grid(w, h),
        Part::P3 => part3_grid(w, h),
        Part::ExamCode | Part::StudentId => panic!("exam code / student id use id_grid, not grid_for_part"),
    }
}

/// 10 header-relative question rows x 4 answer columns (A..D), after a
/// leftmost 15% question-number column.
fn part1_grid(w: f32, h: f32) -> Grid {
    let header = 0.09 * h;
    let body_h = h - header;
    let row_h = body_h / 10.0;

    let mut h_lines = Vec::with_capacity(11);
    h_lines.push(header);
    for row in 1..=10 {
        let correction = if row >= 5 { 1.5 * (row as f32 - 4.0) } else { 0.0 };
        h_lines.push(header + row_h * row as f32 - correction);
    }

    let v_lines = equal_columns(w, 0.15, 4);
    Grid { h_lines, v_lines }
}

/// 2 questions, each with 4 option rows (a/b/c/d) at fixed fractional
/// positions, and 4 bubble columns (left-True, left-False, right-True, right-False).
fn part2_grid(w: f32, h: f32) -> Grid {
    let header = 0.32 * h;
    let body_h = h - header;
    let fracs = [0.0, 0.35, 0.50, 0.70, 1.00];
    let h_lines = fracs.iter().map(|f| header + f * body_h).collect();

    let v_lines = equal_columns(w, 0.15, 4);
    Grid { h_lines, v_lines }
}

/// 12 rows over the alphabet `['-', ',', '0'..'9']`, with empirical upward
/// offsets on rows 5..11, and 4 digit columns (C1..C4).
fn part3_grid(w: f32, h: f32) -> Grid {
    let header = 0.08 * h;
    let body_h = h - header;
    let row_h = body_h / 12.0;

    // row index -> pixel offset, subtracted (moved upward) from the naive
    // equal-division boundary. Row 5's offset is fractional (0.02*H); the
    // rest are absolute pixel corrections.
    let offset_for_row = |row: usize| -> f32 {
        match row {
            5 => 0.02 * h,
            6 => 10.0,
            7 => 14.0,
            8 => 20.0,
            9 => 22.0,
            10 => 20.0,
            11 => 25.0,
            _ => 0.0,
        }
    };

    let mut h_lines = Vec::with_capacity(13);
    h_lines.push(header);
    for row in 1..=12 {
        h_lines.push(header + row_h * row as f32 - offset_for_row(row));
    }

    let v_lines = equal_columns(w, 0.15, 4);
    Grid { h_lines, v_lines }
}

/// A label column occupying the leftmost `label_frac` of the width, followed
/// by `n` equal columns spanning the remainder.
fn equal_columns(w: f32, label_frac: f32, n: usize) -> Vec<f32> {
    let label_w = label_frac * w;
    let col_w = (w - label_w) / n as f32;
    let mut v_lines = Vec::with_capacity(n + 2);
    v_lines.push(0.0);
    v_lines.push(label_w);
    for c in 1..=n {
        v_lines.push(label_w + col_w * c as f32);
    }
    v_lines
}

/// 10 rows x `columns` columns (4 for exam code, 8 for student id), evenly
/// divided with no header band or label column — the id reader grid.
pub fn id_grid(w: f32, h: f32, columns: usize) -> Grid {
    let row_h = h / 10.0;
    let h_lines = (0..=10).map(|r| row_h * r as f32).collect();
    let col_w = w / columns as f32;
    let v_lines = (0..=columns).map(|c| col_w * c as f32).collect();
    Grid { h_lines, v_lines }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part1_grid_has_eleven_horizontal_lines_and_six_vertical() {
        let grid = part1_grid(400.0, 1000.0);
        assert_eq!(grid.h_lines.len(), 11);
        assert_eq!(grid.v_lines.len(), 6); // 0, label, 4 column boundaries
        assert!(grid.h_lines.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn part2_grid_has_five_horizontal_lines() {
        let grid = part2_grid(400.0, 300.0);
        assert_eq!(grid.h_lines.len(), 5);
        assert!((grid.h_lines[0] - 96.0).abs() < 1e-3); // header = 0.32*300
    }

    #[test]
    fn part3_grid_has_thirteen_horizontal_lines_monotonic() {
        let grid = part3_grid(400.0, 1200.0);
        assert_eq!(grid.h_lines.len(), 13);
        assert!(grid.h_lines.windows(2).all(|w| w[1] > w[0]), "rows must stay monotonic after offsets: {:?}", grid.h_lines);
    }

    #[test]
    fn id_grid_has_ten_rows() {
        let grid = id_grid(400.0, 500.0, 4);
        assert_eq!(grid.h_lines.len(), 11);
        assert_eq!(grid.v_lines.len(), 5);
    }
}
