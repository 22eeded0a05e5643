//! Part I bubble decision engine and assembler (§4.7.1, §4.8): four
//! candidate-column multiple choice, scored per row against tile-wide
//! percentiles, with the region-3/4 column remap applied before emission.

use omr_core::percentile;
use omr_vision::Cell;

#[cfg(feature = "tracing")]
use tracing::instrument;

const LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];
const QUESTIONS_PER_REGION: usize = 10;
const ANSWER_COLUMNS: usize = 4;

/// One answered (or empty) question, after the region remap has been
/// applied. `raw_answer` preserves the pre-remap column letter for
/// diagnostics.
#[derive(Clone, Copy, Debug)]
pub struct QuestionAnswer {
    pub question: usize,
    pub answer: Option<char>,
    pub raw_answer: Option<char>,
    pub confidence: f64,
}

/// Percentile thresholds computed once per tile and shared by every row's
/// scoring pass.
struct TileThresholds {
    mean_p25: f64,
    mean_p35: f64,
    p25_p20: f64,
    p25_p30: f64,
    dark_p75: f64,
    dark_p60: f64,
    very_dark_p70: f64,
    very_dark_p50: f64,
}

impl TileThresholds {
    fn compute(answer_cells: &[&Cell]) -> Self {
        let means: Vec<f32> = answer_cells.iter().map(|c| c.stats.mean as f32).collect();
        let p25s: Vec<f32> = answer_cells.iter().map(|c| c.stats.p25 as f32).collect();
        let darks: Vec<f32> = answer_cells.iter().map(|c| c.stats.dark_ratio as f32).collect();
        let very_darks: Vec<f32> = answer_cells.iter().map(|c| c.stats.very_dark_ratio as f32).collect();

        Self {
            mean_p25: percentile(&means, 25.0),
            mean_p35: percentile(&means, 35.0),
            p25_p20: percentile(&p25s, 20.0),
            p25_p30: percentile(&p25s, 30.0),
            dark_p75: percentile(&darks, 75.0),
            dark_p60: percentile(&darks, 60.0),
            very_dark_p70: percentile(&very_darks, 70.0),
            very_dark_p50: percentile(&very_darks, 50.0),
        }
    }
}

fn score_cell(cell: &Cell, t: &TileThresholds) -> f64 {
    let mut score = 0.0;
    let s = &cell.stats;

    if s.mean < t.mean_p25 {
        score += 4.0;
    } else if s.mean < t.mean_p35 {
        score += 2.0;
    }
    if s.p25 < t.p25_p20 {
        score += 3.0;
    } else if s.p25 < t.p25_p30 {
        score += 1.5;
    }
    if s.dark_ratio > t.dark_p75 {
        score += 2.5;
    } else if s.dark_ratio > t.dark_p60 {
        score += 1.0;
    }
    if s.very_dark_ratio > t.very_dark_p70 {
        score += 2.0;
    } else if s.very_dark_ratio > t.very_dark_p50 {
        score += 0.5;
    }
    if s.min < 40.0 {
        score += 1.5;
    } else if s.min < 70.0 {
        score += 0.5;
    }
    score
}

/// Decide all 10 questions of one Part I tile. `cells` is the full cell set
/// extracted from the tile's grid (label column included, ignored here).
/// `region_index` (0-based, top to bottom) drives both the global question
/// numbering and the column remap.
#[cfg_attr(feature = "tracing", instrument(skip(cells)))]
pub fn decide_region(cells: &[Cell], region_index: usize) -> Vec<QuestionAnswer> {
    let answer_cells: Vec<&Cell> = cells.iter().filter(|c| c.col >= 1 && c.col <= ANSWER_COLUMNS).collect();
    let thresholds = TileThresholds::compute(&answer_cells);

    let mut out = Vec::with_capacity(QUESTIONS_PER_REGION);
    for row in 0..QUESTIONS_PER_REGION {
        let mut row_cells: Vec<&Cell> = answer_cells.iter().copied().filter(|c| c.row == row).collect();
        row_cells.sort_by_key(|c| c.col);

        let scored: Vec<(usize, f64)> = row_cells.iter().map(|c| (c.col - 1, score_cell(c, &thresholds))).collect();

        let best = scored.iter().fold(None::<(usize, f64)>, |acc, &(col, score)| match acc {
            Some((bc, bs)) if bs >= score => Some((bc, bs)),
            _ => Some((col, score)),
        });

        let (raw_col, raw_letter, confidence) = match best {
            Some((col, score)) if score >= 3.0 => (Some(col), Some(LETTERS[col]), score),
            Some((_, score)) => (None, None, score),
            None => (None, None, 0.0),
        };

        let remapped_letter = raw_col.map(|col| LETTERS[remap_column(col, region_index)]);

        out.push(QuestionAnswer {
            question: region_index * QUESTIONS_PER_REGION + row + 1,
            answer: remapped_letter,
            raw_answer: raw_letter,
            confidence,
        });
    }
    out
}

/// Regions 3 and 4 (index 2, 3) have their answer columns shifted by two
/// positions; self-inverse mod 4 when applied twice with opposite sign.
fn remap_column(col: usize, region_index: usize) -> usize {
    if region_index == 2 || region_index == 3 {
        (col + 4 - 2) % 4
    } else {
        col
    }
}

/// Assemble the 40 global questions from the four regions' decisions,
/// sorted by region top-to-bottom (caller supplies them in that order) and
/// filling any missing region with empty answers.
pub fn assemble(per_region: &[Vec<QuestionAnswer>]) -> Vec<QuestionAnswer> {
    let mut all: Vec<QuestionAnswer> = per_region.iter().flatten().copied().collect();
    all.sort_by_key(|q| q.question);
    all
}
