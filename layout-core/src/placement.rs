//! Greedy randomized placement of specimens on the exposure grid.
//!
//! One run looks like:
//! 1. Shuffle the specimens — earlier placements shade later ones, so the
//!    processing order decides who gets the sunny cells.
//! 2. For each specimen, draw up to `attempt_cap` random cells and take the
//!    first feasible one ([`is_feasible`]).
//! 3. Seat it: record a [`Placement`], mark the cell occupied and cast its
//!    shadow through [`ShadowCaster`] so the next specimen sees it.
//!
//! Specimens that never find a feasible cell are reported as unplaced.

use glam::{DVec2, DVec3};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::config::DEFAULT_ATTEMPT_CAP;
use crate::grid::ExposureGrid;
use crate::shadow::{ShadowCaster, ShadowPathCache};
use crate::specimen::Specimen;
use crate::sun::{SunPosition, sun_vectors};

/// A specimen seated on the grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement<'a> {
    pub specimen: &'a Specimen,
    pub row: usize,
    pub col: usize,
    /// World position of the cell centre.
    pub pos: DVec2,
    /// Cell exposure just before this specimen was seated.
    pub exposure: f64,
}

impl Placement<'_> {
    pub fn x(&self) -> f64 {
        self.pos.x
    }

    pub fn y(&self) -> f64 {
        self.pos.y
    }

    pub fn to_record(&self) -> PlacementRecord {
        PlacementRecord {
            scientific_name: self.specimen.scientific_name.clone(),
            kr_name: self.specimen.common_name.clone(),
            x: self.pos.x,
            y: self.pos.y,
        }
    }
}

/// Owned, serializable form of a [`Placement`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlacementRecord {
    pub scientific_name: String,
    pub kr_name: String,
    pub x: f64,
    pub y: f64,
}

/// Outcome of [`PlacementEngine::place_plants`].
#[derive(Clone, Debug, Default)]
pub struct PlacementReport<'a> {
    /// Seated specimens, in the order they were seated.
    pub placements: Vec<Placement<'a>>,
    /// Specimens that exhausted their attempts, in processing order.
    pub unplaced: Vec<&'a Specimen>,
}

impl PlacementReport<'_> {
    pub fn records(&self) -> Vec<PlacementRecord> {
        self.placements.iter().map(Placement::to_record).collect()
    }
}

/// `true` if `specimen` may stand on `(row, col)`: the cell is free and its
/// current exposure meets the specimen's light requirement.
pub fn is_feasible(grid: &ExposureGrid, specimen: &Specimen, row: usize, col: usize) -> bool {
    !grid.is_occupied(row, col) && grid.exposure(row, col) >= specimen.light_requirement
}

/// Draws up to `attempts` uniformly random cells and returns the first
/// feasible one for `specimen`.
///
/// ### Returns
/// `Some((row, col))` on success, `None` once all attempts failed.
pub fn find_feasible_cell<R: Rng + ?Sized>(
    grid: &ExposureGrid,
    specimen: &Specimen,
    attempts: usize,
    rng: &mut R,
) -> Option<(usize, usize)> {
    (0..attempts)
        .map(|_| (rng.random_range(0..grid.rows()), rng.random_range(0..grid.cols())))
        .find(|&(row, col)| is_feasible(grid, specimen, row, col))
}

/// Greedy randomized placer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacementEngine {
    /// Candidate cells tried per specimen.
    pub attempt_cap: usize,
}

impl Default for PlacementEngine {
    fn default() -> Self {
        Self {
            attempt_cap: DEFAULT_ATTEMPT_CAP,
        }
    }
}

impl PlacementEngine {
    pub fn new(attempt_cap: usize) -> Self {
        Self { attempt_cap }
    }

    /// Places `specimens` on `grid` one by one in shuffled order.
    ///
    /// `grid` must already be initialized against `suns`. It is mutated in
    /// place (occupancy and shadows) and reflects the final layout when
    /// this returns, ready for heat-map rendering.
    ///
    /// ### Parameters
    /// - `grid` - Exposure grid for this run; owned by the caller.
    /// - `suns` - Sun samples the grid was initialized with.
    /// - `specimens` - Specimens to place; never modified.
    /// - `cache` - Shadow path cache; may be reused across runs.
    /// - `rng` - Random source for the shuffle and the candidate cells.
    ///
    /// ### Returns
    /// A [`PlacementReport`] with at most `specimens.len()` placements, at
    /// most one per cell. Running out of attempts is not an error.
    pub fn place_plants<'a, R: Rng + ?Sized>(
        &self,
        grid: &mut ExposureGrid,
        suns: &[SunPosition],
        specimens: &'a [Specimen],
        cache: &mut ShadowPathCache,
        rng: &mut R,
    ) -> PlacementReport<'a> {
        let vectors: Vec<DVec3> = sun_vectors(suns);
        let mut caster = ShadowCaster::new(cache);

        let mut order: Vec<&'a Specimen> = specimens.iter().collect();
        order.shuffle(rng);

        let mut report = PlacementReport {
            placements: Vec::with_capacity(order.len()),
            unplaced: Vec::new(),
        };

        for specimen in order {
            let Some((row, col)) = find_feasible_cell(grid, specimen, self.attempt_cap, rng) else {
                tracing::debug!(name = specimen.display_name(), "no feasible cell");
                report.unplaced.push(specimen);
                continue;
            };

            let pos = grid.cell_center(row, col);
            let exposure = grid.exposure(row, col);
            grid.occupy(row, col);
            caster.cast(grid, pos, specimen.max_height, suns, &vectors);

            tracing::debug!(
                name = specimen.display_name(),
                row,
                col,
                exposure,
                "seated specimen"
            );
            report.placements.push(Placement {
                specimen,
                row,
                col,
                pos,
                exposure,
            });
        }

        if report.placements.is_empty() && !specimens.is_empty() {
            tracing::warn!(specimens = specimens.len(), "no specimen could be seated");
        }
        tracing::info!(
            placed = report.placements.len(),
            unplaced = report.unplaced.len(),
            "placement finished"
        );
        report
    }
}
