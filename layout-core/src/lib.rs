//! Shadow-aware planting layout engine.
//!
//! Main components:
//! - [`sun`] - representative sun positions over a year.
//! - [`grid`] - the cell grid tracking light exposure and occupancy.
//! - [`shadow`] - shadow rays projected onto the grid, with a path cache.
//! - [`placement`] - greedy randomized placement of specimens.
//! - [`specimen`] - plant records and catalog loading.
//! - [`service`] - one-call entry point from a JSON request.
//! - [`config`] - tunables for a layout run.
//! - [`error`] - the error type shared by all of the above.
//! - [`types`] - shared cell index aliases.

pub mod config;
pub mod error;
pub mod grid;
pub mod placement;
pub mod service;
pub mod shadow;
pub mod specimen;
pub mod sun;
pub mod types;

pub use config::Config;
pub use error::{LayoutError, Result};
pub use grid::{ExposureGrid, ExposureMode};
pub use placement::{Placement, PlacementEngine, PlacementRecord, PlacementReport};
pub use service::{LayoutRequest, LayoutResponse, run_layout};
pub use shadow::{ShadowCaster, ShadowPathCache};
pub use specimen::Specimen;
pub use sun::{FixedSunModel, SolarSunModel, SunModel, SunPosition};
