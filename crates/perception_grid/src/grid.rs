//! GridMap - the public 2D grid: addressing plus owned cell storage.
//!
//! A `GridMap<T>` pairs a [`GridDescriptor`] (cell counts, resolution, local
//! frame) with a [`CellStore`] of the same dimensions. Query-style
//! conversions return `Option`; cell accessors return [`Result`].

use glam::{DAffine3, DVec2, DVec3, IVec2, UVec2};

use crate::cell::{is_present, CellValue};
use crate::descriptor::GridDescriptor;
use crate::error::{GridError, Result};
use crate::extents::compute_extents;
use crate::storage::CellStore;
use crate::types::{CellExtents, Index};

/// Fixed-size 2D grid of `T` with a local frame and a default value.
#[derive(Clone, Debug)]
pub struct GridMap<T> {
  descriptor: GridDescriptor,
  store: CellStore<T>,
}

impl<T: CellValue> GridMap<T> {
  /// Create a grid with identity local frame, every cell set to
  /// `default_value`.
  pub fn new(num_cells: UVec2, resolution: DVec2, default_value: T) -> Result<Self> {
    let descriptor = GridDescriptor::new(num_cells, resolution)?;
    Ok(Self {
      store: CellStore::new(num_cells, default_value),
      descriptor,
    })
  }

  /// Create a grid with an initial local frame.
  pub fn with_local_frame(
    num_cells: UVec2,
    resolution: DVec2,
    default_value: T,
    local_frame: DAffine3,
  ) -> Result<Self> {
    let mut grid = Self::new(num_cells, resolution, default_value)?;
    grid.descriptor.set_local_frame(local_frame);
    Ok(grid)
  }

  // ===========================================================================
  // Geometry
  // ===========================================================================

  #[inline]
  pub fn descriptor(&self) -> &GridDescriptor {
    &self.descriptor
  }

  #[inline]
  pub fn num_cells(&self) -> UVec2 {
    self.descriptor.num_cells()
  }

  #[inline]
  pub fn resolution(&self) -> DVec2 {
    self.descriptor.resolution()
  }

  #[inline]
  pub fn size(&self) -> DVec2 {
    self.descriptor.size()
  }

  #[inline]
  pub fn num_elements(&self) -> usize {
    self.descriptor.num_elements()
  }

  #[inline]
  pub fn default_value(&self) -> &T {
    self.store.default_value()
  }

  #[inline]
  pub fn local_frame(&self) -> &DAffine3 {
    self.descriptor.local_frame()
  }

  pub fn local_frame_mut(&mut self) -> &mut DAffine3 {
    self.descriptor.local_frame_mut()
  }

  pub fn set_local_frame(&mut self, local_frame: DAffine3) {
    self.descriptor.set_local_frame(local_frame);
  }

  /// Move the grid origin by `offset` in the reference frame. Cell contents
  /// stay where they are in index space.
  pub fn translate(&mut self, offset: DVec3) {
    self.descriptor.translate(offset);
  }

  #[inline]
  pub fn in_grid(&self, index: Index) -> bool {
    self.descriptor.in_grid(index)
  }

  // ===========================================================================
  // Addressing (delegates to the descriptor)
  // ===========================================================================

  #[inline]
  pub fn index_to_local(&self, index: Index) -> Option<DVec3> {
    self.descriptor.index_to_local(index)
  }

  #[inline]
  pub fn index_to_world(&self, index: Index) -> Option<DVec3> {
    self.descriptor.index_to_world(index)
  }

  #[inline]
  pub fn index_to_world_in_frame(&self, index: Index, frame: &DAffine3) -> Option<DVec3> {
    self.descriptor.index_to_world_in_frame(index, frame)
  }

  #[inline]
  pub fn index_to_world_with_offset(&self, index: Index, offset: DVec3) -> Option<DVec3> {
    self.descriptor.index_to_world_with_offset(index, offset)
  }

  #[inline]
  pub fn local_to_index(&self, local: DVec3) -> Option<(Index, DVec3)> {
    self.descriptor.local_to_index(local)
  }

  #[inline]
  pub fn world_to_index(&self, world: DVec3) -> Option<(Index, DVec3)> {
    self.descriptor.world_to_index(world)
  }

  #[inline]
  pub fn world_to_index_in_frame(&self, position: DVec3, frame: &DAffine3) -> Option<(Index, DVec3)> {
    self.descriptor.world_to_index_in_frame(position, frame)
  }

  #[inline]
  pub fn prepare_world_to_index(&self, frame: &DAffine3) -> DAffine3 {
    self.descriptor.prepare_world_to_index(frame)
  }

  #[inline]
  pub fn world_to_index_prepared(&self, position: DVec3, folded: &DAffine3) -> Option<(Index, DVec3)> {
    self.descriptor.world_to_index_prepared(position, folded)
  }

  // ===========================================================================
  // Cell access
  // ===========================================================================

  pub fn get(&self, index: Index) -> Result<&T> {
    self.store.get(index)
  }

  pub fn get_mut(&mut self, index: Index) -> Result<&mut T> {
    self.store.get_mut(index)
  }

  pub fn set(&mut self, index: Index, value: T) -> Result<()> {
    self.store.set(index, value)
  }

  /// Cell containing the reference-frame position `world`.
  pub fn at_position(&self, world: DVec3) -> Result<&T> {
    let (index, _) = self
      .world_to_index(world)
      .ok_or(GridError::PositionOutOfRange { position: world })?;
    self.store.get(index)
  }

  pub fn at_position_mut(&mut self, world: DVec3) -> Result<&mut T> {
    let (index, _) = self
      .world_to_index(world)
      .ok_or(GridError::PositionOutOfRange { position: world })?;
    self.store.get_mut(index)
  }

  /// Reset every cell to the default value.
  pub fn clear(&mut self) {
    self.store.clear();
  }

  /// Change the cell counts. Contents are reset to default; resolution and
  /// local frame are kept.
  pub fn resize(&mut self, num_cells: UVec2) -> Result<()> {
    self.descriptor.set_num_cells(num_cells)?;
    self.store.resize(num_cells);
    Ok(())
  }

  /// Slide the stored window by `offset` cells: the value at `I` moves to
  /// `I + offset`, newly exposed cells become default.
  pub fn scroll_by(&mut self, offset: IVec2) {
    self.store.scroll_by(offset);
  }

  /// `(index, cell)` pairs in index order.
  pub fn iter(&self) -> impl Iterator<Item = (Index, &T)> + '_ {
    self.store.iter()
  }

  pub fn iter_mut(&mut self) -> impl Iterator<Item = (Index, &mut T)> + '_ {
    self.store.iter_mut()
  }

  /// Bounding rectangle of all non-default cells.
  pub fn extents(&self) -> CellExtents {
    compute_extents(&self.store)
  }

  /// Number of non-default cells.
  pub fn count_present(&self) -> usize {
    let default = self.store.default_value();
    self.store.iter().filter(|(_, v)| is_present(*v, default)).count()
  }
}

impl<T: CellValue + PartialOrd> GridMap<T> {
  /// Smallest cell value. Default cells are skipped unless
  /// `include_default` is set; `None` if nothing qualifies.
  pub fn min_value(&self, include_default: bool) -> Option<&T> {
    self.extreme(include_default, |candidate, best| candidate < best)
  }

  /// Largest cell value, see [`min_value`](Self::min_value).
  pub fn max_value(&self, include_default: bool) -> Option<&T> {
    self.extreme(include_default, |candidate, best| candidate > best)
  }

  fn extreme(&self, include_default: bool, better: impl Fn(&T, &T) -> bool) -> Option<&T> {
    let default = self.store.default_value();
    let mut best: Option<&T> = None;
    for (_, value) in self.store.iter() {
      if !include_default && !is_present(value, default) {
        continue;
      }
      // An unordered (NaN) best is always replaced.
      best = match best {
        Some(current) if current.partial_cmp(current).is_some() && !better(value, current) => {
          Some(current)
        }
        _ => Some(value),
      };
    }
    best
  }
}

#[cfg(test)]
#[path = "grid_test.rs"]
mod grid_test;
