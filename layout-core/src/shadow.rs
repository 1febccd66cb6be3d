//! Shadow projection onto the exposure grid.
//!
//! A specimen's shadow is modelled as one ray per sun sample, walked from
//! the specimen's base cell along the sun vector's ground projection. The
//! walk only depends on height, cell size and the sun set, never on where
//! the specimen stands, so paths are computed once per height as relative
//! offsets and translated to each base cell afterwards.

use std::collections::HashMap;

use glam::{DVec2, DVec3};

use crate::grid::ExposureGrid;
use crate::sun::SunPosition;
use crate::types::{CellIndex, CellOffset, ShadowPath};

/// Cache key: specimen height and cell size, compared bit-for-bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShadowKey {
    height: u64,
    cell_size: u64,
}

impl ShadowKey {
    pub fn new(height: f64, cell_size: f64) -> Self {
        // `+ 0.0` folds -0.0 into 0.0 so both hash alike.
        Self {
            height: (height + 0.0).to_bits(),
            cell_size: (cell_size + 0.0).to_bits(),
        }
    }
}

/// Memoized relative shadow paths, keyed by `(height, cell_size)`.
///
/// Paths also depend on the sun vectors and on the ray bound (the grid
/// diagonal). The cache records the geometry its entries were computed
/// for and drops them all when asked about a different one, so a single
/// cache can be reused across runs safely.
#[derive(Debug, Default)]
pub struct ShadowPathCache {
    suns: Vec<DVec3>,
    diagonal: f64,
    paths: HashMap<ShadowKey, Vec<ShadowPath>>,
    hits: usize,
    misses: usize,
}

impl ShadowPathCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct heights cached.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.suns.clear();
        self.diagonal = 0.0;
    }

    fn scope_to(&mut self, suns: &[DVec3], diagonal: f64) {
        if self.suns.as_slice() != suns || self.diagonal != diagonal {
            if !self.paths.is_empty() {
                tracing::debug!(entries = self.paths.len(), "sun geometry changed, dropping shadow paths");
            }
            self.paths.clear();
            self.suns = suns.to_vec();
            self.diagonal = diagonal;
        }
    }

    /// Per-sample relative paths for a specimen of `height` on `grid`.
    ///
    /// Computes and stores them on the first request for a given
    /// `(height, cell_size)`; later requests are lookups.
    ///
    /// ### Returns
    /// One path per entry of `suns`, in the same order.
    pub fn paths(&mut self, grid: &ExposureGrid, height: f64, suns: &[DVec3]) -> &[ShadowPath] {
        self.scope_to(suns, grid.diagonal());

        let key = ShadowKey::new(height, grid.cell_size());
        if self.paths.contains_key(&key) {
            self.hits += 1;
        } else {
            self.misses += 1;
            let computed = compute_shadow_paths(height, grid.cell_size(), grid.diagonal(), suns);
            tracing::debug!(height, cell_size = grid.cell_size(), "cached shadow paths");
            self.paths.insert(key, computed);
        }
        &self.paths[&key]
    }
}

/// Relative cells swept by one sun vector's shadow ray.
///
/// The ray runs `min(height / dz, max_len)` along the ground projection,
/// sampled every half cell. Consecutive samples that land in the same cell
/// are collapsed; non-consecutive repeats are kept. A sun at or below the
/// horizon (`dz <= 0`) casts nothing.
///
/// `max_len` is expected to be a grid diagonal; offsets beyond `i32` range
/// saturate.
pub fn shadow_path(sun: DVec3, height: f64, cell_size: f64, max_len: f64) -> ShadowPath {
    let mut cells = ShadowPath::new();
    if sun.z <= 0.0 {
        return cells;
    }

    let length = (height / sun.z).min(max_len);
    let step = cell_size / 2.0;
    let mut prev: Option<CellOffset> = None;
    let mut k = 1u64;
    while step * k as f64 <= length {
        let dist = step * k as f64;
        let cell = (
            (0.5 + sun.y * dist / cell_size).floor() as i32,
            (0.5 + sun.x * dist / cell_size).floor() as i32,
        );
        if prev != Some(cell) {
            cells.push(cell);
            prev = Some(cell);
        }
        k += 1;
    }
    cells
}

/// One [`shadow_path`] per sun vector, bounded by `diagonal`.
pub fn compute_shadow_paths(
    height: f64,
    cell_size: f64,
    diagonal: f64,
    suns: &[DVec3],
) -> Vec<ShadowPath> {
    suns.iter()
        .map(|&sun| shadow_path(sun, height, cell_size, diagonal))
        .collect()
}

/// Casts specimen shadows through a borrowed [`ShadowPathCache`].
pub struct ShadowCaster<'c> {
    cache: &'c mut ShadowPathCache,
}

impl<'c> ShadowCaster<'c> {
    pub fn new(cache: &'c mut ShadowPathCache) -> Self {
        Self { cache }
    }

    /// Absolute cells shadowed by a specimen of `height` standing at `pos`.
    ///
    /// Concatenates the translated path of every sun sample. Cells are not
    /// deduplicated across samples and may lie off the grid.
    pub fn shadow_cells(
        &mut self,
        grid: &ExposureGrid,
        pos: DVec2,
        height: f64,
        suns: &[DVec3],
    ) -> Vec<CellIndex> {
        let (base_row, base_col) = grid.cell_indices(pos);
        self.cache
            .paths(grid, height, suns)
            .iter()
            .flatten()
            .map(|&(dr, dc)| (base_row + dr, base_col + dc))
            .collect()
    }

    /// Lowers grid exposure along the shadow of a specimen at `pos`.
    ///
    /// Each sample's path is charged with that sample's weight, so the
    /// deduction follows the grid's [`crate::grid::ExposureMode`].
    ///
    /// ### Parameters
    /// - `positions` - Sun samples, supplying the weights.
    /// - `vectors` - `sun_vector` of each entry of `positions`, same order.
    pub fn cast(
        &mut self,
        grid: &mut ExposureGrid,
        pos: DVec2,
        height: f64,
        positions: &[SunPosition],
        vectors: &[DVec3],
    ) {
        debug_assert_eq!(positions.len(), vectors.len());
        let (base_row, base_col) = grid.cell_indices(pos);
        let paths = self.cache.paths(grid, height, vectors);
        for (path, sun) in paths.iter().zip(positions) {
            grid.mark_shadow(
                path.iter().map(|&(dr, dc)| (base_row + dr, base_col + dc)),
                sun.weight,
            );
        }
    }
}
