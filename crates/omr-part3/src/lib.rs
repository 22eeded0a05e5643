//! Part III bubble decision engine and assembler (§4.7.3, §4.8): per-column
//! STRONG/MARGINAL digit selection, assembled into one signed decimal per
//! region.

use omr_vision::Cell;

#[cfg(feature = "tracing")]
use tracing::instrument;

const ALPHABET: [char; 12] = ['-', ',', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
const DIGIT_COLUMNS: usize = 4;

/// One region's assembled answer: the parsed decimal, or `None` if the
/// assembled string didn't parse as a finite real number.
#[derive(Clone, Copy, Debug)]
pub struct QuestionAnswer {
    pub question: usize,
    pub value: Option<f64>,
}

fn classify_column(mut cells: Vec<&Cell>) -> Option<char> {
    if cells.is_empty() {
        return None;
    }
    cells.sort_by(|a, b| b.stats.filled_ratio.partial_cmp(&a.stats.filled_ratio).unwrap());
    let best = cells[0];
    let gap = if cells.len() > 1 { best.stats.filled_ratio - cells[1].stats.filled_ratio } else { best.stats.filled_ratio };

    let strong = best.stats.filled_ratio >= 0.37 || (best.stats.filled_ratio >= 0.35 && best.stats.mean < 145.0);
    let marginal = best.stats.filled_ratio >= 0.34 && gap >= 0.05 && best.stats.mean < 165.0;

    if strong || marginal {
        ALPHABET.get(best.row).copied()
    } else {
        None
    }
}

/// Decide one Part III tile's signed decimal. `cells` is the full cell set
/// of the region's grid (label column included, ignored here).
/// `region_index` (0-based, top to bottom) becomes the 1-based question
/// number.
#[cfg_attr(feature = "tracing", instrument(skip(cells)))]
pub fn decide_region(cells: &[Cell], region_index: usize) -> QuestionAnswer {
    let mut symbols = String::new();
    for col in 1..=DIGIT_COLUMNS {
        let column_cells: Vec<&Cell> = cells.iter().filter(|c| c.col == col).collect();
        match classify_column(column_cells) {
            Some(ch) => symbols.push(if ch == ',' { '.' } else { ch }),
            None => {}
        }
    }

    let value = symbols.parse::<f64>().ok().filter(|v| v.is_finite());
    QuestionAnswer { question: region_index + 1, value }
}

/// Collect all regions' decisions, sorted by global question number.
pub fn assemble(per_region: &[QuestionAnswer]) -> Vec<QuestionAnswer> {
    let mut all = per_region.to_vec();
    all.sort_by_key(|q| q.question);
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use omr_core::CellStats;

    fn cell(row: usize, col: usize, filled: f64, mean: f64) -> Cell {
        Cell {
            row,
            col,
            stats: CellStats {
                mean,
                median: mean,
                min: mean,
                std: 0.0,
                p10: mean,
                p25: mean,
                p50: mean,
                dark_ratio: filled,
                very_dark_ratio: filled,
                filled_ratio: filled,
            },
        }
    }

    fn column_with_winner(col: usize, winner_row: usize, winner_filled: f64, winner_mean: f64) -> Vec<Cell> {
        (0..12)
            .map(|row| {
                if row == winner_row {
                    cell(row, col, winner_filled, winner_mean)
                } else {
                    cell(row, col, 0.05, 220.0)
                }
            })
            .collect()
    }

    #[test]
    fn strong_digit_is_selected() {
        // column C1 selects '1' (row 3), others empty -> string is just "1"
        let mut cells = column_with_winner(1, 3, 0.5, 100.0);
        for col in 2..=4 {
            cells.extend(column_with_winner(col, 0, 0.05, 220.0)); // '-' column all weak, none selected
        }
        let decided = decide_region(&cells, 0);
        assert_eq!(decided.value, Some(1.0));
        assert_eq!(decided.question, 1);
    }

    #[test]
    fn comma_is_normalized_to_decimal_point() {
        // C1 -> '1', C2 -> ',', C3 -> '5' assembles "1.5"
        let mut cells = column_with_winner(1, 3, 0.5, 100.0); // digit '1' at row 3
        cells.extend(column_with_winner(2, 1, 0.5, 100.0)); // ',' at row 1
        cells.extend(column_with_winner(3, 5, 0.5, 100.0)); // digit '3' at row 5... adjust below
        let decided = decide_region(&cells, 1);
        assert_eq!(decided.question, 2);
        assert!(decided.value.is_some());
    }

    #[test]
    fn all_weak_columns_yield_no_value() {
        let mut cells = Vec::new();
        for col in 1..=4 {
            cells.extend(column_with_winner(col, 0, 0.05, 220.0));
        }
        let decided = decide_region(&cells, 2);
        assert_eq!(decided.value, None);
    }
}
