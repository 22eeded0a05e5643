//! Public extraction interface (§6): decode -> preprocess -> detect ->
//! rectify -> grid -> extract cells -> decide -> assemble, for each of the
//! exam code, student ID, and Parts I-III.

mod error;

pub use error::ExtractError;
pub use omr_grader::{score, AnswerKey, Extracted, GraderError, InMemoryAnswerKeyStore, Part1Answer, Part2Answer, Part2Options, Part3Answer, Score};

use omr_core::{GrayImage, Part, Region};
use omr_vision::{decode_grayscale, detect_regions, extract_cells, grid_for_part, id_grid, preprocess, rectify, Cell, PreprocessConfig};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Extract the four-digit exam code, or `None` if no region was found or
/// the digit string failed validation.
#[cfg_attr(feature = "tracing", instrument(skip(bytes)))]
pub fn extract_exam_code(bytes: &[u8]) -> Result<Option<String>, ExtractError> {
    extract_identifier(bytes, Part::ExamCode, 4, 4)
}

/// Extract the eight-digit student ID, or `None` on the same failure modes
/// as [`extract_exam_code`].
#[cfg_attr(feature = "tracing", instrument(skip(bytes)))]
pub fn extract_student_id(bytes: &[u8]) -> Result<Option<String>, ExtractError> {
    extract_identifier(bytes, Part::StudentId, 8, 8)
}

fn extract_identifier(bytes: &[u8], part: Part, columns: usize, expected_digits: usize) -> Result<Option<String>, ExtractError> {
    let (gray, pre) = decode_and_preprocess(bytes)?;
    let regions = detect_regions(&pre.edges_closed, part, gray.width);
    let Some(region) = regions.first() else {
        log::warn!("{}: no region detected", part.label());
        return Ok(None);
    };

    let tile = match rectify(&pre.otsu_binary, &region.quad) {
        Ok(tile) => tile,
        Err(e) => {
            log::warn!("{}: rectification failed: {e}", part.label());
            return Ok(None);
        }
    };

    let grid = id_grid(tile.width as f32, tile.height as f32, columns);
    Ok(omr_id::read_id(&tile, &grid, columns, expected_digits))
}

/// Extract all 40 Part I answers: `(question 1..=40, letter, confidence)`.
#[cfg_attr(feature = "tracing", instrument(skip(bytes)))]
pub fn extract_part1(bytes: &[u8]) -> Result<Vec<(u32, Option<char>, f32)>, ExtractError> {
    let (gray, pre) = decode_and_preprocess(bytes)?;
    let regions = detect_regions(&pre.edges_closed, Part::P1, gray.width);
    if regions.is_empty() {
        log::warn!("P1: no regions detected");
    } else if regions.len() < 4 {
        log::warn!("P1: found {} of 4 expected regions", regions.len());
    }

    let mut per_region = Vec::with_capacity(4);
    for (idx, region) in regions.iter().enumerate() {
        match cells_for_region(&pre.enhanced, &pre.adaptive_inverted_binary, region, Part::P1) {
            Some(cells) => per_region.push(omr_part1::decide_region(&cells, idx)),
            None => per_region.push(empty_part1_region(idx)),
        }
    }
    for idx in regions.len()..4 {
        per_region.push(empty_part1_region(idx));
    }

    let assembled = omr_part1::assemble(&per_region);
    Ok(assembled.into_iter().map(|a| (a.question as u32, a.answer, a.confidence as f32)).collect())
}

fn empty_part1_region(region_index: usize) -> Vec<omr_part1::QuestionAnswer> {
    (0..10)
        .map(|row| omr_part1::QuestionAnswer { question: region_index * 10 + row + 1, answer: None, raw_answer: None, confidence: 0.0 })
        .collect()
}

/// Extract all 8 Part II questions: `(question 1..=8, {a,b,c,d} booleans)`.
#[cfg_attr(feature = "tracing", instrument(skip(bytes)))]
pub fn extract_part2(bytes: &[u8]) -> Result<Vec<(u32, Part2Options)>, ExtractError> {
    let (gray, pre) = decode_and_preprocess(bytes)?;
    let regions = detect_regions(&pre.edges_closed, Part::P2, gray.width);
    if regions.len() < 4 {
        log::warn!("P2: found {} of 4 expected regions", regions.len());
    }

    let mut per_region = Vec::with_capacity(4);
    for (idx, region) in regions.iter().enumerate() {
        match cells_for_region(&pre.enhanced, &pre.adaptive_inverted_binary, region, Part::P2) {
            Some(cells) => per_region.push(omr_part2::decide_region(&cells, idx)),
            None => per_region.push(empty_part2_region(idx)),
        }
    }
    for idx in regions.len()..4 {
        per_region.push(empty_part2_region(idx));
    }

    let assembled = omr_part2::assemble(&per_region);
    Ok(assembled.into_iter().map(|a| (a.question as u32, to_part2_options(a.options))).collect())
}

fn empty_part2_region(region_index: usize) -> [omr_part2::QuestionAnswer; 2] {
    [
        omr_part2::QuestionAnswer { question: region_index * 2 + 1, options: [false; 4] },
        omr_part2::QuestionAnswer { question: region_index * 2 + 2, options: [false; 4] },
    ]
}

fn to_part2_options(options: [bool; 4]) -> Part2Options {
    Part2Options { a: options[0], b: options[1], c: options[2], d: options[3] }
}

/// Extract all 8 Part III questions: `(question 1..=8, value)`.
#[cfg_attr(feature = "tracing", instrument(skip(bytes)))]
pub fn extract_part3(bytes: &[u8]) -> Result<Vec<(u32, Option<f64>)>, ExtractError> {
    let (gray, pre) = decode_and_preprocess(bytes)?;
    let regions = detect_regions(&pre.edges_closed, Part::P3, gray.width);
    if regions.len() < 8 {
        log::warn!("P3: found {} of 8 expected regions", regions.len());
    }

    let mut per_region = Vec::with_capacity(8);
    for (idx, region) in regions.iter().enumerate() {
        match cells_for_region(&pre.enhanced, &pre.adaptive_inverted_binary, region, Part::P3) {
            Some(cells) => per_region.push(omr_part3::decide_region(&cells, idx)),
            None => per_region.push(omr_part3::QuestionAnswer { question: idx + 1, value: None }),
        }
    }
    for idx in regions.len()..8 {
        per_region.push(omr_part3::QuestionAnswer { question: idx + 1, value: None });
    }

    let assembled = omr_part3::assemble(&per_region);
    Ok(assembled.into_iter().map(|a| (a.question as u32, a.value)).collect())
}

fn decode_and_preprocess(bytes: &[u8]) -> Result<(GrayImage, omr_vision::Preprocessed), ExtractError> {
    let gray = decode_grayscale(bytes).map_err(|_| ExtractError::BadImage)?;
    let pre = preprocess(&gray, &PreprocessConfig::default());
    Ok((gray, pre))
}

/// Rectify `region` out of both the enhanced grayscale and adaptive binary
/// derivatives, lay out its part-specific grid, and extract cell stats.
/// `None` if the region is geometrically degenerate.
fn cells_for_region(enhanced: &GrayImage, adaptive_binary: &GrayImage, region: &Region, part: Part) -> Option<Vec<Cell>> {
    let enhanced_tile = rectify(enhanced, &region.quad).ok()?;
    let binary_tile = rectify(adaptive_binary, &region.quad).ok()?;
    let grid = grid_for_part(part, enhanced_tile.width as f32, enhanced_tile.height as f32);
    Some(extract_cells(&enhanced_tile, &binary_tile, &grid))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_sheet_png() -> Vec<u8> {
        let img = image::GrayImage::from_pixel(600, 800, image::Luma([230]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageLuma8(img).write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png).unwrap();
        bytes
    }

    #[test]
    fn garbage_bytes_is_bad_image() {
        assert!(matches!(extract_exam_code(b"not an image"), Err(ExtractError::BadImage)));
        assert!(matches!(extract_student_id(b"not an image"), Err(ExtractError::BadImage)));
        assert!(matches!(extract_part1(b"not an image"), Err(ExtractError::BadImage)));
    }

    #[test]
    fn blank_sheet_has_no_detectable_regions() {
        let bytes = blank_sheet_png();
        assert_eq!(extract_exam_code(&bytes).unwrap(), None);
        assert_eq!(extract_student_id(&bytes).unwrap(), None);
    }

    #[test]
    fn blank_sheet_still_emits_every_question_number_as_empty() {
        let bytes = blank_sheet_png();
        let p1 = extract_part1(&bytes).unwrap();
        assert_eq!(p1.len(), 40);
        assert!(p1.iter().all(|(_, answer, _)| answer.is_none()));

        let p2 = extract_part2(&bytes).unwrap();
        assert_eq!(p2.len(), 8);
        assert!(p2.iter().all(|(_, o)| !o.a && !o.b && !o.c && !o.d));

        let p3 = extract_part3(&bytes).unwrap();
        assert_eq!(p3.len(), 8);
        assert!(p3.iter().all(|(_, value)| value.is_none()));
    }
}
