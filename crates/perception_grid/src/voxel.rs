//! Sparse voxel columns on top of the 2D grid.
//!
//! Each (x, y) cell owns a [`VoxelColumn`]: a short list of `(z, voxel)`
//! pairs kept sorted by z-level. Columns start empty and grow on first write,
//! so memory follows the number of touched voxels, not the vertical extent.
//!
//! The x/y part of a voxel index uses the regular grid addressing; the z-level
//! is `floor(local.z / res.z)` with voxel centres at `(k + 0.5) · res.z`.

use glam::{DAffine3, DVec2, DVec3, IVec2, UVec2};
use smallvec::SmallVec;

use crate::cell::CellValue;
use crate::error::{GridError, Result};
use crate::grid::GridMap;
use crate::types::{CellExtents, Index, VoxelIndex};

// =============================================================================
// VoxelColumn
// =============================================================================

/// Sorted sparse mapping from z-level to voxel.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelColumn<V> {
  voxels: SmallVec<[(i32, V); 4]>,
}

impl<V> VoxelColumn<V> {
  pub fn new() -> Self {
    Self {
      voxels: SmallVec::new(),
    }
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.voxels.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.voxels.is_empty()
  }

  #[inline]
  fn search(&self, z: i32) -> std::result::Result<usize, usize> {
    self.voxels.binary_search_by_key(&z, |(level, _)| *level)
  }

  pub fn get(&self, z: i32) -> Option<&V> {
    self.search(z).ok().map(|i| &self.voxels[i].1)
  }

  pub fn get_mut(&mut self, z: i32) -> Option<&mut V> {
    match self.search(z) {
      Ok(i) => Some(&mut self.voxels[i].1),
      Err(_) => None,
    }
  }

  /// Insert or replace the voxel at `z`, returning the previous one.
  pub fn insert(&mut self, z: i32, voxel: V) -> Option<V> {
    match self.search(z) {
      Ok(i) => Some(std::mem::replace(&mut self.voxels[i].1, voxel)),
      Err(pos) => {
        self.voxels.insert(pos, (z, voxel));
        None
      }
    }
  }

  pub fn remove(&mut self, z: i32) -> Option<V> {
    match self.search(z) {
      Ok(i) => Some(self.voxels.remove(i).1),
      Err(_) => None,
    }
  }

  pub fn entry(&mut self, z: i32) -> ColumnEntry<'_, V> {
    match self.search(z) {
      Ok(i) => ColumnEntry::Occupied(&mut self.voxels[i].1),
      Err(pos) => ColumnEntry::Vacant {
        column: self,
        z,
        pos,
      },
    }
  }

  pub fn clear(&mut self) {
    self.voxels.clear();
  }

  /// Voxels in ascending z order.
  pub fn iter(&self) -> impl Iterator<Item = (i32, &V)> + '_ {
    self.voxels.iter().map(|(z, v)| (*z, v))
  }

  pub fn iter_mut(&mut self) -> impl Iterator<Item = (i32, &mut V)> + '_ {
    self.voxels.iter_mut().map(|(z, v)| (*z, v))
  }

  /// Lowest and highest occupied z-level.
  pub fn z_range(&self) -> Option<(i32, i32)> {
    Some((self.voxels.first()?.0, self.voxels.last()?.0))
  }
}

impl<V> Default for VoxelColumn<V> {
  fn default() -> Self {
    Self::new()
  }
}

/// An empty column is the unobserved state.
impl<V: Clone> CellValue for VoxelColumn<V> {
  fn matches_default(&self, default: &Self) -> bool {
    self.is_empty() && default.is_empty()
  }
}

/// View into a single z-level of a column.
pub enum ColumnEntry<'a, V> {
  Occupied(&'a mut V),
  Vacant {
    column: &'a mut VoxelColumn<V>,
    z: i32,
    pos: usize,
  },
}

impl<'a, V> ColumnEntry<'a, V> {
  pub fn is_occupied(&self) -> bool {
    matches!(self, ColumnEntry::Occupied(_))
  }

  pub fn or_insert_with(self, make: impl FnOnce() -> V) -> &'a mut V {
    match self {
      ColumnEntry::Occupied(voxel) => voxel,
      ColumnEntry::Vacant { column, z, pos } => {
        column.voxels.insert(pos, (z, make()));
        &mut column.voxels[pos].1
      }
    }
  }

  pub fn or_default(self) -> &'a mut V
  where
    V: Default,
  {
    self.or_insert_with(V::default)
  }
}

// =============================================================================
// VoxelGridMap
// =============================================================================

/// 2D grid of sparse voxel columns with a separate z resolution.
#[derive(Clone, Debug)]
pub struct VoxelGridMap<V> {
  grid: GridMap<VoxelColumn<V>>,
  z_resolution: f64,
}

impl<V: Clone> VoxelGridMap<V> {
  /// Create an empty voxel grid. `resolution.z` is the voxel height.
  pub fn new(num_cells: UVec2, resolution: DVec3) -> Result<Self> {
    if !(resolution.z.is_finite() && resolution.z > 0.0) {
      return Err(GridError::InvalidConfiguration(format!(
        "voxel z resolution must be positive and finite, got {}",
        resolution.z
      )));
    }
    Ok(Self {
      grid: GridMap::new(num_cells, resolution.truncate(), VoxelColumn::new())?,
      z_resolution: resolution.z,
    })
  }

  /// Underlying 2D grid of columns.
  #[inline]
  pub fn grid(&self) -> &GridMap<VoxelColumn<V>> {
    &self.grid
  }

  #[inline]
  pub fn grid_mut(&mut self) -> &mut GridMap<VoxelColumn<V>> {
    &mut self.grid
  }

  #[inline]
  pub fn num_cells(&self) -> UVec2 {
    self.grid.num_cells()
  }

  #[inline]
  pub fn resolution(&self) -> DVec2 {
    self.grid.resolution()
  }

  /// Voxel size on all three axes.
  #[inline]
  pub fn voxel_resolution(&self) -> DVec3 {
    self.grid.resolution().extend(self.z_resolution)
  }

  #[inline]
  pub fn local_frame(&self) -> &DAffine3 {
    self.grid.local_frame()
  }

  pub fn set_local_frame(&mut self, local_frame: DAffine3) {
    self.grid.set_local_frame(local_frame);
  }

  pub fn translate(&mut self, offset: DVec3) {
    self.grid.translate(offset);
  }

  pub fn has_same_frame(&self, local_frame: &DAffine3, num_cells: UVec2, resolution: DVec2) -> bool {
    self
      .grid
      .descriptor()
      .has_same_frame(local_frame, num_cells, resolution)
  }

  // ===========================================================================
  // Addressing
  // ===========================================================================

  /// Containing voxel of a grid-local position and the offset from its
  /// centre.
  pub fn local_to_voxel(&self, local: DVec3) -> Option<(VoxelIndex, DVec3)> {
    let (index, offset) = self.grid.local_to_index(local)?;
    let level = (local.z / self.z_resolution).floor();
    if level < i32::MIN as f64 || level > i32::MAX as f64 {
      return None;
    }
    let z = level as i32;
    let offset_z = local.z - self.level_centre(z);
    Some((index.extend(z), offset.truncate().extend(offset_z)))
  }

  /// Containing voxel of a reference-frame position.
  pub fn world_to_voxel(&self, world: DVec3) -> Option<(VoxelIndex, DVec3)> {
    self.local_to_voxel(self.grid.local_frame().transform_point3(world))
  }

  /// Voxel centre in grid-local coordinates.
  pub fn voxel_to_local(&self, index: VoxelIndex) -> Option<DVec3> {
    let centre = self.grid.index_to_local(index.truncate())?;
    Some(centre.truncate().extend(self.level_centre(index.z)))
  }

  /// Voxel centre in the reference frame.
  pub fn voxel_to_world(&self, index: VoxelIndex) -> Option<DVec3> {
    let local = self.voxel_to_local(index)?;
    Some(self.grid.local_frame().inverse().transform_point3(local))
  }

  #[inline]
  pub(crate) fn level_centre(&self, z: i32) -> f64 {
    (z as f64 + 0.5) * self.z_resolution
  }

  // ===========================================================================
  // Voxel access
  // ===========================================================================

  pub fn column(&self, index: Index) -> Result<&VoxelColumn<V>> {
    self.grid.get(index)
  }

  pub fn column_mut(&mut self, index: Index) -> Result<&mut VoxelColumn<V>> {
    self.grid.get_mut(index)
  }

  /// Stored voxel, `Ok(None)` if it was never written.
  pub fn voxel(&self, index: VoxelIndex) -> Result<Option<&V>> {
    let column = self
      .grid
      .get(index.truncate())
      .map_err(|_| GridError::VoxelOutOfRange { index })?;
    Ok(column.get(index.z))
  }

  /// Entry for the voxel at `index`, for create-on-write access.
  pub fn voxel_entry(&mut self, index: VoxelIndex) -> Result<ColumnEntry<'_, V>> {
    let column = self
      .grid
      .get_mut(index.truncate())
      .map_err(|_| GridError::VoxelOutOfRange { index })?;
    Ok(column.entry(index.z))
  }

  /// Mutable voxel, created with `V::default()` on first access.
  pub fn voxel_mut(&mut self, index: VoxelIndex) -> Result<&mut V>
  where
    V: Default,
  {
    Ok(self.voxel_entry(index)?.or_default())
  }

  pub fn remove_voxel(&mut self, index: VoxelIndex) -> Result<Option<V>> {
    let column = self
      .grid
      .get_mut(index.truncate())
      .map_err(|_| GridError::VoxelOutOfRange { index })?;
    Ok(column.remove(index.z))
  }

  /// Total number of stored voxels.
  pub fn voxel_count(&self) -> usize {
    self.grid.iter().map(|(_, column)| column.len()).sum()
  }

  /// Every stored voxel, columns in index order and z ascending.
  pub fn voxels(&self) -> impl Iterator<Item = (VoxelIndex, &V)> + '_ {
    self
      .grid
      .iter()
      .flat_map(|(index, column)| column.iter().map(move |(z, voxel)| (index.extend(z), voxel)))
  }

  /// Bounding rectangle of all non-empty columns.
  pub fn extents(&self) -> CellExtents {
    self.grid.extents()
  }

  /// Drop every voxel.
  pub fn clear(&mut self) {
    self.grid.clear();
  }

  /// Slide the column window by `offset` cells, see [`GridMap::scroll_by`].
  pub fn scroll_by(&mut self, offset: IVec2) {
    self.grid.scroll_by(offset);
  }
}

#[cfg(test)]
#[path = "voxel_test.rs"]
mod voxel_test;
