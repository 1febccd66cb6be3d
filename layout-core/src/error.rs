use thiserror::Error;

/// Errors raised while setting up or running a layout.
///
/// Only setup problems are errors. A specimen that finds no feasible cell
/// is reported through [`crate::placement::PlacementReport::unplaced`].
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("{name} must be a positive finite number within the grid size limit, got {value}")]
    InvalidDimension { name: &'static str, value: f64 },
    #[error(
        "no sun position above the horizon for latitude {latitude} with {samples_per_day} samples per day"
    )]
    DegenerateSunGeometry { latitude: f64, samples_per_day: usize },
    #[error("specimen `{name}` is invalid: {reason}")]
    InvalidSpecimen { name: String, reason: &'static str },
    /// A catalog or request body that is not valid JSON for its record type.
    #[error("malformed JSON input: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LayoutError>;
