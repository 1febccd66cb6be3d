/// Signed `(row, col)` pair addressing a grid cell.
///
/// Signed because shadow paths are translated relative to a base cell and
/// may run off the edge of the plot; callers bounds-check before indexing.
pub type CellIndex = (i32, i32);

/// Relative `(d_row, d_col)` step of a shadow path from the casting cell.
pub type CellOffset = (i32, i32);

/// One sun sample's shadow, as relative offsets in walk order.
pub type ShadowPath = Vec<CellOffset>;
