use serde::Deserialize;

use crate::grid::ExposureMode;

/// Latitude used when the caller does not supply one (central Korea).
pub const REFERENCE_LATITUDE: f64 = 37.5;
/// Sun samples per representative day; the two horizon endpoints are
/// discarded, leaving three per day.
pub const DEFAULT_SAMPLES_PER_DAY: usize = 5;
pub const DEFAULT_CELL_SIZE: f64 = 0.5;
pub const DEFAULT_ATTEMPT_CAP: usize = 100;

/// Tunables for one layout run.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Edge length of a grid cell in metres.
    pub cell_size: f64,
    pub latitude: f64,
    pub samples_per_day: usize,
    /// Random candidate cells tried per specimen before giving up on it.
    pub attempt_cap: usize,
    pub exposure_mode: ExposureMode,
    /// Fixed seed for reproducible runs; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            latitude: REFERENCE_LATITUDE,
            samples_per_day: DEFAULT_SAMPLES_PER_DAY,
            attempt_cap: DEFAULT_ATTEMPT_CAP,
            exposure_mode: ExposureMode::Weighted,
            seed: None,
        }
    }
}
