use serde::{Deserialize, Serialize};

/// Which region of the exam sheet a detection/decision stage is operating on.
///
/// Replaces the dynamic per-stage dispatch of the original implementation
/// with a single tagged variant that drives geometry, decision, and assembly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Part {
    ExamCode,
    StudentId,
    P1,
    P2,
    P3,
}

impl Part {
    pub fn label(&self) -> &'static str {
        match self {
            Part::ExamCode => "exam_code",
            Part::StudentId => "student_id",
            Part::P1 => "p1",
            Part::P2 => "p2",
            Part::P3 => "p3",
        }
    }
}
