/// Faults the extraction interface surfaces to callers (§7). Geometry and
/// detection faults recover locally as ∅ answers and are only logged; this
/// is the one fatal case.
#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("failed to decode image or image has zero dimensions")]
    BadImage,
}
