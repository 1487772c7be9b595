//! Core index and extents types.

use glam::{IVec2, IVec3};

/// Integer (column, row) address of a grid cell.
///
/// Valid range is `[0, num_cells.x) × [0, num_cells.y)`.
pub type Index = IVec2;

/// Integer (column, row, z-level) address of a voxel.
pub type VoxelIndex = IVec3;

/// Named corner of a [`CellExtents`] rectangle.
///
/// Bottom/top follow the row axis, left/right the column axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Corner {
  /// Minimum column, minimum row.
  BottomLeft,
  /// Maximum column, minimum row.
  BottomRight,
  /// Minimum column, maximum row.
  TopLeft,
  /// Maximum column, maximum row.
  TopRight,
}

/// Minimal index-space rectangle enclosing every non-default cell.
///
/// Recomputed on demand by the extents scanner; never maintained
/// incrementally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CellExtents {
  bounds: Option<(Index, Index)>,
}

impl CellExtents {
  /// Extents with no present cell.
  pub fn empty() -> Self {
    Self { bounds: None }
  }

  /// Create extents from inclusive min/max corners.
  pub fn new(min: Index, max: Index) -> Self {
    debug_assert!(
      min.x <= max.x && min.y <= max.y,
      "extents min must be <= max on both axes"
    );
    Self {
      bounds: Some((min, max)),
    }
  }

  /// Returns true if no cell is present.
  pub fn is_empty(&self) -> bool {
    self.bounds.is_none()
  }

  /// Grow the rectangle to include `index`.
  pub fn encapsulate(&mut self, index: Index) {
    self.bounds = Some(match self.bounds {
      Some((min, max)) => (min.min(index), max.max(index)),
      None => (index, index),
    });
  }

  /// Inclusive minimum corner (bottom-left).
  pub fn min(&self) -> Option<Index> {
    self.bounds.map(|(min, _)| min)
  }

  /// Inclusive maximum corner (top-right).
  pub fn max(&self) -> Option<Index> {
    self.bounds.map(|(_, max)| max)
  }

  /// One of the four rectangle corners, `None` when empty.
  pub fn corner(&self, corner: Corner) -> Option<Index> {
    let (min, max) = self.bounds?;
    Some(match corner {
      Corner::BottomLeft => min,
      Corner::BottomRight => IVec2::new(max.x, min.y),
      Corner::TopLeft => IVec2::new(min.x, max.y),
      Corner::TopRight => max,
    })
  }

  /// Number of columns and rows covered (zero when empty).
  pub fn dimensions(&self) -> IVec2 {
    match self.bounds {
      Some((min, max)) => max - min + IVec2::ONE,
      None => IVec2::ZERO,
    }
  }

  /// Check if `index` lies inside the rectangle.
  pub fn contains(&self, index: Index) -> bool {
    match self.bounds {
      Some((min, max)) => index.cmpge(min).all() && index.cmple(max).all(),
      None => false,
    }
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
