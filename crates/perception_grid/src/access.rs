//! Capability interface for components layered on top of a grid.
//!
//! Specialised maps (elevation post-processing, multi-hypothesis cell lists)
//! only need indexed read/write, the grid geometry and ordered iteration.
//! They depend on [`CellAccess`] instead of a concrete grid type, and can see
//! a grid through a projected [`CellView`] when they only care about part of
//! each cell.

use glam::{DVec2, DVec3, UVec2};

use crate::cell::CellValue;
use crate::error::Result;
use crate::grid::GridMap;
use crate::types::Index;

/// Indexed access to the cells of a 2D grid.
pub trait CellAccess {
  type Cell;

  fn num_cells(&self) -> UVec2;

  fn resolution(&self) -> DVec2;

  fn cell(&self, index: Index) -> Result<&Self::Cell>;

  fn cell_mut(&mut self, index: Index) -> Result<&mut Self::Cell>;

  /// Cell centre in the reference frame, `None` outside the grid.
  fn index_to_world(&self, index: Index) -> Option<DVec3>;

  /// All cells in index order (x fastest, then y).
  fn cells(&self) -> Box<dyn Iterator<Item = (Index, &Self::Cell)> + '_>;
}

impl<T: CellValue> CellAccess for GridMap<T> {
  type Cell = T;

  fn num_cells(&self) -> UVec2 {
    GridMap::num_cells(self)
  }

  fn resolution(&self) -> DVec2 {
    GridMap::resolution(self)
  }

  fn cell(&self, index: Index) -> Result<&T> {
    self.get(index)
  }

  fn cell_mut(&mut self, index: Index) -> Result<&mut T> {
    self.get_mut(index)
  }

  fn index_to_world(&self, index: Index) -> Option<DVec3> {
    GridMap::index_to_world(self, index)
  }

  fn cells(&self) -> Box<dyn Iterator<Item = (Index, &T)> + '_> {
    Box::new(self.iter())
  }
}

/// Read-only view of a grid through a per-cell projection.
pub struct CellView<'a, G: CellAccess + ?Sized + 'a, U: ?Sized + 'a> {
  grid: &'a G,
  project: fn(&G::Cell) -> &U,
}

impl<'a, G: CellAccess + ?Sized + 'a, U: ?Sized + 'a> CellView<'a, G, U> {
  pub fn new(grid: &'a G, project: fn(&G::Cell) -> &U) -> Self {
    Self { grid, project }
  }

  pub fn num_cells(&self) -> UVec2 {
    self.grid.num_cells()
  }

  pub fn get(&self, index: Index) -> Result<&'a U> {
    let grid: &'a G = self.grid;
    Ok((self.project)(grid.cell(index)?))
  }

  pub fn iter(&self) -> impl Iterator<Item = (Index, &'a U)> + 'a {
    let grid: &'a G = self.grid;
    let project = self.project;
    grid.cells().map(move |(index, cell)| (index, project(cell)))
  }
}
