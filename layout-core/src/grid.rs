use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, Result};
use crate::sun::SunPosition;
use crate::types::CellIndex;

/// Upper bound on `rows * cols` for one grid.
pub const MAX_CELLS: usize = 1 << 24;

/// How much light one sun sample contributes to a cell.
///
/// The same mode drives both the full-sun baseline and the shadow
/// deduction, so a run never mixes the two.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExposureMode {
    /// Every sample counts as one unit.
    Unit,
    /// Every sample counts as its intensity weight.
    #[default]
    Weighted,
}

impl ExposureMode {
    /// Light contributed (or blocked) by one sample of the given weight.
    #[inline]
    pub fn amount(self, weight: f64) -> f64 {
        match self {
            ExposureMode::Unit => 1.0,
            ExposureMode::Weighted => weight,
        }
    }
}

/// Uniform cell grid over the planting area.
///
/// Tracks, per cell, the remaining light exposure and whether a specimen
/// already sits there. Storage is row-major; row 0 is at `y = 0`.
///
/// Exposure only ever decreases and never drops below zero. Occupancy only
/// ever flips from free to taken.
#[derive(Clone, Debug)]
pub struct ExposureGrid {
    width: f64,
    height: f64,
    cell_size: f64,
    rows: usize,
    cols: usize,
    mode: ExposureMode,
    baseline: f64,
    exposure: Vec<f64>,
    occupied: Vec<bool>,
}

fn check_dimension(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(LayoutError::InvalidDimension { name, value })
    }
}

impl ExposureGrid {
    /// Creates a grid of `floor(width / cell_size)` columns by
    /// `floor(height / cell_size)` rows, with zero exposure everywhere.
    ///
    /// Call [`ExposureGrid::initialize_exposure`] before placing anything.
    ///
    /// ### Errors
    /// [`LayoutError::InvalidDimension`] if any input is not a positive
    /// finite number, if the area is smaller than one cell along an axis, or
    /// if the grid would hold more than [`MAX_CELLS`] cells.
    pub fn new(width: f64, height: f64, cell_size: f64, mode: ExposureMode) -> Result<Self> {
        check_dimension("width", width)?;
        check_dimension("height", height)?;
        check_dimension("cell_size", cell_size)?;

        let cols = (width / cell_size).floor();
        let rows = (height / cell_size).floor();
        if !(1.0..=MAX_CELLS as f64).contains(&cols) {
            return Err(LayoutError::InvalidDimension { name: "width", value: width });
        }
        if !(1.0..=MAX_CELLS as f64).contains(&rows) {
            return Err(LayoutError::InvalidDimension { name: "height", value: height });
        }
        let (cols, rows) = (cols as usize, rows as usize);
        let cells = rows
            .checked_mul(cols)
            .filter(|&n| n <= MAX_CELLS)
            .ok_or(LayoutError::InvalidDimension { name: "cell_size", value: cell_size })?;

        Ok(Self {
            width,
            height,
            cell_size,
            rows,
            cols,
            mode,
            baseline: 0.0,
            exposure: vec![0.0; cells],
            occupied: vec![false; cells],
        })
    }

    /// Resets every cell to full sun and clears occupancy.
    ///
    /// Full sun is the number of samples in [`ExposureMode::Unit`] and the
    /// sum of their weights in [`ExposureMode::Weighted`].
    pub fn initialize_exposure(&mut self, suns: &[SunPosition]) {
        self.baseline = suns.iter().map(|s| self.mode.amount(s.weight)).sum();
        self.exposure.fill(self.baseline);
        self.occupied.fill(false);
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn mode(&self) -> ExposureMode {
        self.mode
    }

    /// Full-sun exposure every cell started from.
    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    /// Length of the plot's diagonal; the longest shadow ever walked.
    pub fn diagonal(&self) -> f64 {
        self.width.hypot(self.height)
    }

    #[inline]
    fn idx(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// Converts a signed cell index to an unsigned one if it lies on the grid.
    #[inline]
    pub fn in_bounds(&self, (row, col): CellIndex) -> Option<(usize, usize)> {
        let (r, c) = (usize::try_from(row).ok()?, usize::try_from(col).ok()?);
        (r < self.rows && c < self.cols).then_some((r, c))
    }

    /// ### Panics
    /// Panics if `row` or `col` is out of bounds.
    #[inline]
    pub fn exposure(&self, row: usize, col: usize) -> f64 {
        assert!(row < self.rows && col < self.cols, "cell ({row}, {col}) off grid");
        self.exposure[self.idx(row, col)]
    }

    /// ### Panics
    /// Panics if `row` or `col` is out of bounds.
    #[inline]
    pub fn is_occupied(&self, row: usize, col: usize) -> bool {
        assert!(row < self.rows && col < self.cols, "cell ({row}, {col}) off grid");
        self.occupied[self.idx(row, col)]
    }

    /// Row-major exposure values, for heat-map rendering.
    pub fn exposures(&self) -> &[f64] {
        &self.exposure
    }

    /// Exposure relative to full sun, in `[0, 1]`; zero when there is no sun.
    pub fn exposure_fraction(&self, row: usize, col: usize) -> f64 {
        if self.baseline > 0.0 {
            self.exposure(row, col) / self.baseline
        } else {
            0.0
        }
    }

    /// Marks a cell as taken.
    ///
    /// ### Returns
    /// `true` if the cell was free, `false` if it was already occupied (the
    /// cell is left unchanged).
    pub fn occupy(&mut self, row: usize, col: usize) -> bool {
        assert!(row < self.rows && col < self.cols, "cell ({row}, {col}) off grid");
        let i = self.idx(row, col);
        if self.occupied[i] {
            return false;
        }
        self.occupied[i] = true;
        true
    }

    /// Lowers a cell's exposure to `value`, e.g. to model shade from
    /// existing buildings. Never raises exposure and never goes below zero.
    pub fn set_exposure(&mut self, row: usize, col: usize, value: f64) {
        assert!(row < self.rows && col < self.cols, "cell ({row}, {col}) off grid");
        let i = self.idx(row, col);
        self.exposure[i] = self.exposure[i].min(value).max(0.0);
    }

    /// Applies one sun sample's shadow to the given cells.
    ///
    /// Each in-bounds cell loses the mode's amount for a sample of `weight`,
    /// clamped at zero. Cells off the grid are ignored; a shadow may fall
    /// outside the plot.
    pub fn mark_shadow<I>(&mut self, cells: I, weight: f64)
    where
        I: IntoIterator<Item = CellIndex>,
    {
        let amount = self.mode.amount(weight);
        for cell in cells {
            if let Some((r, c)) = self.in_bounds(cell) {
                let i = self.idx(r, c);
                self.exposure[i] = (self.exposure[i] - amount).max(0.0);
            }
        }
    }

    /// World coordinates of a cell's centre.
    pub fn cell_center(&self, row: usize, col: usize) -> DVec2 {
        DVec2::new(
            (col as f64 + 0.5) * self.cell_size,
            (row as f64 + 0.5) * self.cell_size,
        )
    }

    /// Cell containing a world point. Not clamped to the grid.
    pub fn cell_indices(&self, pos: DVec2) -> CellIndex {
        (
            (pos.y / self.cell_size).floor() as i32,
            (pos.x / self.cell_size).floor() as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_grid(width: f64, height: f64) -> ExposureGrid {
        let mut grid = ExposureGrid::new(width, height, 1.0, ExposureMode::Unit).unwrap();
        grid.initialize_exposure(&[SunPosition::new(90.0, 0.0); 3]);
        grid
    }

    #[test]
    fn new_floors_dimensions() {
        let grid = ExposureGrid::new(2.3, 1.9, 0.5, ExposureMode::Weighted).unwrap();
        assert_eq!(grid.cols(), 4);
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.exposures().len(), 12);
    }

    #[test]
    fn new_rejects_non_positive_dimensions() {
        let cases = [
            (0.0, 1.0, 0.5, "width"),
            (1.0, -2.0, 0.5, "height"),
            (1.0, 1.0, 0.0, "cell_size"),
            (f64::INFINITY, 1.0, 0.5, "width"),
            (0.2, 1.0, 0.5, "width"),
        ];
        for (w, h, c, expected) in cases {
            match ExposureGrid::new(w, h, c, ExposureMode::Unit) {
                Err(LayoutError::InvalidDimension { name, .. }) => assert_eq!(name, expected),
                other => panic!("expected InvalidDimension for {w}x{h}@{c}, got {other:?}"),
            }
        }
    }

    #[test]
    fn new_rejects_grids_past_the_cell_limit() {
        let cases = [
            (1e12, 1e12, 1.0, "width"),
            (1.0, 1e12, 1.0, "height"),
            (4096.0, 4097.0, 1.0, "cell_size"),
            (100.0, 100.0, 1e-4, "cell_size"),
        ];
        for (w, h, c, expected) in cases {
            match ExposureGrid::new(w, h, c, ExposureMode::Unit) {
                Err(LayoutError::InvalidDimension { name, .. }) => assert_eq!(name, expected),
                other => panic!("expected InvalidDimension for {w}x{h}@{c}, got {other:?}"),
            }
        }

        let large = ExposureGrid::new(1000.0, 1000.0, 1.0, ExposureMode::Unit).unwrap();
        assert_eq!(large.exposures().len(), 1_000_000);
    }

    #[test]
    fn initialize_uses_count_or_weight_sum() {
        let suns = [SunPosition::new(90.0, 0.0), SunPosition::new(30.0, 90.0)];

        let mut unit = ExposureGrid::new(1.0, 1.0, 0.5, ExposureMode::Unit).unwrap();
        unit.initialize_exposure(&suns);
        assert_eq!(unit.baseline(), 2.0);

        let mut weighted = ExposureGrid::new(1.0, 1.0, 0.5, ExposureMode::Weighted).unwrap();
        weighted.initialize_exposure(&suns);
        assert_relative_eq!(weighted.baseline(), 1.5, epsilon = 1e-12);
        assert!(weighted.exposures().iter().all(|&e| e == weighted.baseline()));
    }

    #[test]
    fn cell_center_and_indices_are_consistent() {
        let grid = ExposureGrid::new(2.0, 2.0, 0.5, ExposureMode::Unit).unwrap();

        assert_eq!(grid.cell_center(0, 0), DVec2::new(0.25, 0.25));
        assert_eq!(grid.cell_center(2, 3), DVec2::new(1.75, 1.25));
        assert_eq!(grid.cell_indices(DVec2::new(1.75, 1.25)), (2, 3));
        // Truncates into the containing cell, no rounding.
        assert_eq!(grid.cell_indices(DVec2::new(0.99, 0.49)), (0, 1));
        assert_eq!(grid.cell_indices(DVec2::new(-0.1, 0.0)), (0, -1));
    }

    #[test]
    fn mark_shadow_clamps_at_zero() {
        let mut grid = unit_grid(3.0, 3.0);

        for _ in 0..5 {
            grid.mark_shadow([(1, 1), (1, 1), (0, 2)], 1.0);
        }

        assert!(grid.exposures().iter().all(|&e| e >= 0.0));
        assert_eq!(grid.exposure(1, 1), 0.0);
        assert_eq!(grid.exposure(0, 2), 0.0);
        assert_eq!(grid.exposure(2, 2), 3.0);
    }

    #[test]
    fn mark_shadow_ignores_off_grid_cells() {
        let mut grid = unit_grid(2.0, 2.0);

        grid.mark_shadow([(-1, 0), (0, -1), (2, 0), (0, 2), (100, 100)], 1.0);

        assert!(grid.exposures().iter().all(|&e| e == 3.0));
    }

    #[test]
    fn weighted_mark_shadow_subtracts_weight() {
        let mut grid = ExposureGrid::new(1.0, 1.0, 1.0, ExposureMode::Weighted).unwrap();
        grid.initialize_exposure(&[SunPosition::new(90.0, 0.0)]);

        grid.mark_shadow([(0, 0)], 0.25);

        assert_relative_eq!(grid.exposure(0, 0), 0.75, epsilon = 1e-12);
        assert_relative_eq!(grid.exposure_fraction(0, 0), 0.75, epsilon = 1e-12);
    }

    #[test]
    fn occupy_flips_once() {
        let mut grid = unit_grid(2.0, 2.0);

        assert!(!grid.is_occupied(1, 0));
        assert!(grid.occupy(1, 0));
        assert!(grid.is_occupied(1, 0));
        assert!(!grid.occupy(1, 0));
        assert!(grid.is_occupied(1, 0));
    }

    #[test]
    fn set_exposure_only_lowers() {
        let mut grid = unit_grid(2.0, 2.0);

        grid.set_exposure(0, 0, 10.0);
        assert_eq!(grid.exposure(0, 0), 3.0);

        grid.set_exposure(0, 0, 1.5);
        assert_eq!(grid.exposure(0, 0), 1.5);

        grid.set_exposure(0, 0, -4.0);
        assert_eq!(grid.exposure(0, 0), 0.0);
    }

    #[test]
    fn in_bounds_filters_negative_and_large_indices() {
        let grid = unit_grid(3.0, 2.0);

        assert_eq!(grid.in_bounds((1, 2)), Some((1, 2)));
        assert_eq!(grid.in_bounds((2, 0)), None);
        assert_eq!(grid.in_bounds((0, 3)), None);
        assert_eq!(grid.in_bounds((-1, 0)), None);
    }
}
