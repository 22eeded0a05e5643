/// Faults the vision stages can raise. Only decode/geometry failures are
/// fatal — everything else (missing regions, unparseable digit strings) is
/// handled by the downstream part crates as a non-fatal `None` answer.
#[derive(thiserror::Error, Debug)]
pub enum VisionError {
    #[error("failed to decode image bytes: {0}")]
    Decode(String),

    #[error("image has zero width or height")]
    EmptyImage,

    #[error("region is degenerate: {0}")]
    DegenerateRegion(String),
}
