//! Extents scanner - bounding rectangle of all non-default cells.
//!
//! # Scan Strategy
//!
//! The scan is dimension-wise with early exit:
//! 1. Rows bottom-up until the first present cell (min row)
//! 2. Rows top-down, stopping at the min row (max row)
//! 3. Columns left-to-right, restricted to `[min row, max row]` (min column)
//! 4. Columns right-to-left, stopping at the min column (max column)
//!
//! Row scans walk contiguous physical row slices, so a sparsely populated
//! grid costs roughly the empty margin around the populated region rather
//! than the full grid.

use crate::cell::{is_present, CellValue};
use crate::storage::CellStore;
use crate::types::{CellExtents, Index};

/// Compute the extents of every cell in `store` that differs from its
/// default value.
#[tracing::instrument(skip_all, name = "grid::compute_extents")]
pub fn compute_extents<T: CellValue>(store: &CellStore<T>) -> CellExtents {
  let dims = store.dims();
  let default = store.default_value();
  let row_present = |y: u32| store.row_cells(y).iter().any(|v| is_present(v, default));

  let Some(min_y) = (0..dims.y).find(|&y| row_present(y)) else {
    return CellExtents::empty();
  };
  // min_y itself is present, so the reverse scan always succeeds.
  let max_y = (min_y..dims.y).rev().find(|&y| row_present(y)).unwrap_or(min_y);

  let column_present =
    |x: u32| (min_y..=max_y).any(|y| is_present(store.get_unchecked(x, y), default));

  let min_x = (0..dims.x).find(|&x| column_present(x)).unwrap_or(0);
  let max_x = (min_x..dims.x).rev().find(|&x| column_present(x)).unwrap_or(min_x);

  CellExtents::new(
    Index::new(min_x as i32, min_y as i32),
    Index::new(max_x as i32, max_y as i32),
  )
}

#[cfg(test)]
#[path = "extents_test.rs"]
mod extents_test;
