//! Grader (stage J): compares extracted answers against an answer key and
//! produces per-part and total scores, plus a bounded in-memory
//! `exam_code -> AnswerKey` cache for the storage collaborator.

mod store;

pub use store::{AnswerKeyStore, GraderError, InMemoryAnswerKeyStore};

use serde::{Deserialize, Serialize};

const P1_QUESTIONS: f32 = 40.0;
const P2_PAIRS: f32 = 32.0; // 8 questions x 4 options
const P3_QUESTIONS: f32 = 8.0;
const TOLERANCE: f64 = 1e-2;

/// Part I answer as emitted by the extraction interface (§6).
#[derive(Clone, Copy, Debug)]
pub struct Part1Answer {
    pub question: u32,
    pub letter: Option<char>,
    pub confidence: f32,
}

/// Part II options for one question, true/false per option.
#[derive(Clone, Copy, Debug, Default)]
pub struct Part2Options {
    pub a: bool,
    pub b: bool,
    pub c: bool,
    pub d: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct Part2Answer {
    pub question: u32,
    pub options: Part2Options,
}

#[derive(Clone, Copy, Debug)]
pub struct Part3Answer {
    pub question: u32,
    pub value: Option<f64>,
}

/// Everything the grader needs from one extraction request.
#[derive(Clone, Debug)]
pub struct Extracted {
    pub p1: Vec<Part1Answer>,
    pub p2: Vec<Part2Answer>,
    pub p3: Vec<Part3Answer>,
}

/// Persisted answer key (§6): `{ exam_code, p1: [(int, letter)], p2: [((int,
/// option), bool)], p3: [(int, f64)] }`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnswerKey {
    pub exam_code: String,
    pub p1: Vec<(u32, char)>,
    pub p2: Vec<((u32, char), bool)>,
    pub p3: Vec<(u32, f64)>,
}

/// Per-part and total scores, each in `[0.0, 10.0]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Score {
    pub p1: f32,
    pub p2: f32,
    pub p3: f32,
    pub total: f32,
}

/// Compare `extracted` against `key`. Pure and deterministic; ∅ answers are
/// never counted correct.
pub fn score(extracted: &Extracted, key: &AnswerKey) -> Score {
    let p1 = score_part1(&extracted.p1, &key.p1);
    let p2 = score_part2(&extracted.p2, &key.p2);
    let p3 = score_part3(&extracted.p3, &key.p3);
    let total = (p1 + p2 + p3) / 3.0;
    Score { p1, p2, p3, total }
}

fn score_part1(answers: &[Part1Answer], key: &[(u32, char)]) -> f32 {
    let correct = answers
        .iter()
        .filter(|a| a.letter.is_some() && key.iter().any(|(q, letter)| *q == a.question && Some(*letter) == a.letter))
        .count();
    (correct as f32 / P1_QUESTIONS) * 10.0
}

fn score_part2(answers: &[Part2Answer], key: &[((u32, char), bool)]) -> f32 {
    let mut correct = 0usize;
    for a in answers {
        for (opt_char, value) in [('a', a.options.a), ('b', a.options.b), ('c', a.options.c), ('d', a.options.d)] {
            if key.iter().any(|((q, o), v)| *q == a.question && *o == opt_char && *v == value) {
                correct += 1;
            }
        }
    }
    (correct as f32 / P2_PAIRS) * 10.0
}

fn score_part3(answers: &[Part3Answer], key: &[(u32, f64)]) -> f32 {
    let correct = answers
        .iter()
        .filter(|a| match a.value {
            Some(v) => key.iter().any(|(q, kv)| *q == a.question && (kv - v).abs() <= TOLERANCE),
            None => false,
        })
        .count();
    (correct as f32 / P3_QUESTIONS) * 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_key(exam_code: &str) -> AnswerKey {
        AnswerKey {
            exam_code: exam_code.to_string(),
            p1: (1..=40).map(|q| (q, 'A')).collect(),
            p2: (1..=8).flat_map(|q| ['a', 'b', 'c', 'd'].map(|o| ((q, o), true))).collect(),
            p3: (1..=8).map(|q| (q, q as f64)).collect(),
        }
    }

    #[test]
    fn all_empty_extraction_scores_zero() {
        let extracted = Extracted {
            p1: (1..=40).map(|q| Part1Answer { question: q, letter: None, confidence: 0.0 }).collect(),
            p2: (1..=8).map(|q| Part2Answer { question: q, options: Part2Options::default() }).collect(),
            p3: (1..=8).map(|q| Part3Answer { question: q, value: None }).collect(),
        };
        let key = blank_key("0001");
        let s = score(&extracted, &key);
        assert_eq!(s, Score { p1: 0.0, p2: 0.0, p3: 0.0, total: 0.0 });
    }

    #[test]
    fn perfect_match_scores_ten() {
        let key = blank_key("0001");
        let extracted = Extracted {
            p1: key.p1.iter().map(|&(q, l)| Part1Answer { question: q, letter: Some(l), confidence: 5.0 }).collect(),
            p2: (1..=8).map(|q| Part2Answer { question: q, options: Part2Options { a: true, b: true, c: true, d: true } }).collect(),
            p3: key.p3.iter().map(|&(q, v)| Part3Answer { question: q, value: Some(v) }).collect(),
        };
        let s = score(&extracted, &key);
        assert!((s.total - 10.0).abs() < 1e-4);
    }

    #[test]
    fn part3_tolerance_accepts_small_error() {
        let key = AnswerKey { exam_code: "0002".to_string(), p1: vec![], p2: vec![], p3: vec![(1, 3.14)] };
        let extracted = Extracted { p1: vec![], p2: vec![], p3: vec![Part3Answer { question: 1, value: Some(3.149) }] };
        let s = score(&extracted, &key);
        assert!((s.p3 - 10.0 / P3_QUESTIONS).abs() < 1e-4);
    }
}
