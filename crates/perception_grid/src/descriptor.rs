//! GridDescriptor - cell geometry and index/position addressing.
//!
//! # Coordinate spaces
//!
//! ```text
//!  Y (rows)
//!  ▲
//!  │ (0,2) (1,2) (2,2)
//!  │ (0,1) (1,1) (2,1)        cell (x, y) covers
//!  │ (0,0) (1,0) (2,0)        [x·res.x, (x+1)·res.x) × [y·res.y, (y+1)·res.y)
//!  O──────────────────▶ X (columns)
//! ```
//!
//! - *World*: the external reference frame. Positions are mapped into the
//!   grid by the local frame (`local = local_frame · world`).
//! - *Local*: grid space. Cell centres sit at `(index + 0.5) · res` with
//!   `z = 0`.
//!
//! Every conversion comes in a checked form returning `Option`; nothing is
//! produced for an index or position outside the grid.

use glam::{DAffine3, DVec2, DVec3, UVec2};

use crate::error::{GridError, Result};
use crate::frame;
use crate::types::Index;

/// Largest supported cell count per axis (indices are `i32`).
pub const MAX_CELLS_PER_AXIS: u32 = i32::MAX as u32;

/// Geometry of a 2D grid: cell counts, resolution and local frame.
#[derive(Clone, Debug, PartialEq)]
pub struct GridDescriptor {
  num_cells: UVec2,
  resolution: DVec2,
  local_frame: DAffine3,
}

impl GridDescriptor {
  /// Create a descriptor with identity local frame.
  ///
  /// Fails with [`GridError::InvalidConfiguration`] unless both cell counts
  /// and both resolutions are strictly positive (and resolutions finite).
  pub fn new(num_cells: UVec2, resolution: DVec2) -> Result<Self> {
    validate_geometry(num_cells, resolution)?;
    Ok(Self {
      num_cells,
      resolution,
      local_frame: DAffine3::IDENTITY,
    })
  }

  pub fn with_local_frame(mut self, local_frame: DAffine3) -> Self {
    self.local_frame = local_frame;
    self
  }

  #[inline]
  pub fn num_cells(&self) -> UVec2 {
    self.num_cells
  }

  #[inline]
  pub fn resolution(&self) -> DVec2 {
    self.resolution
  }

  /// Metric extent of the grid (`num_cells · resolution`).
  #[inline]
  pub fn size(&self) -> DVec2 {
    self.num_cells.as_dvec2() * self.resolution
  }

  /// Total number of cells.
  #[inline]
  pub fn num_elements(&self) -> usize {
    self.num_cells.x as usize * self.num_cells.y as usize
  }

  #[inline]
  pub fn local_frame(&self) -> &DAffine3 {
    &self.local_frame
  }

  /// Mutable access to the local frame. Changing it re-targets every
  /// subsequent conversion; stored cells are untouched.
  #[inline]
  pub fn local_frame_mut(&mut self) -> &mut DAffine3 {
    &mut self.local_frame
  }

  pub fn set_local_frame(&mut self, local_frame: DAffine3) {
    self.local_frame = local_frame;
  }

  /// Move the grid origin by `offset` in the reference frame.
  pub fn translate(&mut self, offset: DVec3) {
    self.local_frame = frame::translated(&self.local_frame, offset);
  }

  pub(crate) fn set_num_cells(&mut self, num_cells: UVec2) -> Result<()> {
    validate_geometry(num_cells, self.resolution)?;
    self.num_cells = num_cells;
    Ok(())
  }

  /// True iff `0 <= index.x < num_cells.x` and `0 <= index.y < num_cells.y`.
  #[inline]
  pub fn in_grid(&self, index: Index) -> bool {
    index.x >= 0
      && index.y >= 0
      && (index.x as u32) < self.num_cells.x
      && (index.y as u32) < self.num_cells.y
  }

  /// Same geometry and a local frame equal within `1e-9`.
  pub fn has_same_frame(&self, local_frame: &DAffine3, num_cells: UVec2, resolution: DVec2) -> bool {
    self.num_cells == num_cells
      && self.resolution.abs_diff_eq(resolution, 1e-9)
      && frame::approx_eq(&self.local_frame, local_frame, 1e-9)
  }

  // ===========================================================================
  // Index -> position
  // ===========================================================================

  /// Cell centre in grid-local coordinates, without range check.
  #[inline]
  pub fn index_to_local_unchecked(&self, index: Index) -> DVec3 {
    ((index.as_dvec2() + 0.5) * self.resolution).extend(0.0)
  }

  /// Cell centre in grid-local coordinates.
  #[inline]
  pub fn index_to_local(&self, index: Index) -> Option<DVec3> {
    self
      .in_grid(index)
      .then(|| self.index_to_local_unchecked(index))
  }

  /// Reconstruct a grid-local position from a cell and its sub-cell offset.
  #[inline]
  pub fn index_to_local_with_offset(&self, index: Index, offset: DVec3) -> Option<DVec3> {
    self.index_to_local(index).map(|centre| centre + offset)
  }

  /// Cell centre in the reference frame.
  pub fn index_to_world(&self, index: Index) -> Option<DVec3> {
    let local = self.index_to_local(index)?;
    Some(self.local_frame.inverse().transform_point3(local))
  }

  /// Reconstruct a reference-frame position from a cell and its offset.
  pub fn index_to_world_with_offset(&self, index: Index, offset: DVec3) -> Option<DVec3> {
    let local = self.index_to_local_with_offset(index, offset)?;
    Some(self.local_frame.inverse().transform_point3(local))
  }

  /// Cell centre expressed in `frame`, where `frame` maps positions of that
  /// frame into the reference frame.
  pub fn index_to_world_in_frame(&self, index: Index, frame: &DAffine3) -> Option<DVec3> {
    let local = self.index_to_local(index)?;
    Some((self.local_frame * *frame).inverse().transform_point3(local))
  }

  // ===========================================================================
  // Position -> index
  // ===========================================================================

  /// Containing cell and offset from its centre, without range check.
  ///
  /// Cell boundaries are closed below and open above on each axis.
  #[inline]
  pub fn local_to_index_unchecked(&self, local: DVec3) -> (Index, DVec3) {
    let index = (local.truncate() / self.resolution).floor().as_ivec2();
    let offset = local - self.index_to_local_unchecked(index);
    (index, offset)
  }

  /// Containing cell of a grid-local position and the offset
  /// `local - cell_centre`.
  #[inline]
  pub fn local_to_index(&self, local: DVec3) -> Option<(Index, DVec3)> {
    if !local.is_finite() {
      return None;
    }
    let (index, offset) = self.local_to_index_unchecked(local);
    self.in_grid(index).then_some((index, offset))
  }

  /// Containing cell of a reference-frame position.
  ///
  /// The offset is expressed in grid-local axes.
  #[inline]
  pub fn world_to_index(&self, world: DVec3) -> Option<(Index, DVec3)> {
    self.local_to_index(self.local_frame.transform_point3(world))
  }

  /// Containing cell of a position given in `frame`, where `frame` maps that
  /// frame into the reference frame.
  ///
  /// Composes the transforms on every call; for bulk conversion fold them
  /// once with [`prepare_world_to_index`](Self::prepare_world_to_index).
  pub fn world_to_index_in_frame(&self, position: DVec3, frame: &DAffine3) -> Option<(Index, DVec3)> {
    let world = frame.transform_point3(position);
    self.world_to_index(world)
  }

  /// Pre-compose the local frame with `frame` for batch conversion.
  #[inline]
  pub fn prepare_world_to_index(&self, frame: &DAffine3) -> DAffine3 {
    self.local_frame * *frame
  }

  /// Containing cell using a transform folded by
  /// [`prepare_world_to_index`](Self::prepare_world_to_index).
  #[inline]
  pub fn world_to_index_prepared(&self, position: DVec3, folded: &DAffine3) -> Option<(Index, DVec3)> {
    self.local_to_index(folded.transform_point3(position))
  }
}

fn validate_geometry(num_cells: UVec2, resolution: DVec2) -> Result<()> {
  if num_cells.x == 0 || num_cells.y == 0 {
    return Err(GridError::InvalidConfiguration(format!(
      "cell counts must be positive, got {num_cells}"
    )));
  }
  if num_cells.x > MAX_CELLS_PER_AXIS || num_cells.y > MAX_CELLS_PER_AXIS {
    return Err(GridError::InvalidConfiguration(format!(
      "cell counts must not exceed {MAX_CELLS_PER_AXIS}, got {num_cells}"
    )));
  }
  if !(resolution.is_finite() && resolution.x > 0.0 && resolution.y > 0.0) {
    return Err(GridError::InvalidConfiguration(format!(
      "resolution must be positive and finite, got {resolution}"
    )));
  }
  Ok(())
}

#[cfg(test)]
#[path = "descriptor_test.rs"]
mod descriptor_test;
