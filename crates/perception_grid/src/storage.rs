//! CellStore - fixed-size 2D cell array with ring-buffer scrolling.
//!
//! Cells live in a row-major `Vec`, but logical index `(0, 0)` does not have
//! to sit at physical slot `0`. A wrapping `origin` records where the window
//! currently starts:
//!
//! ```text
//! physical(x, y) = ((y + origin.y) mod h) · w + ((x + origin.x) mod w)
//! ```
//!
//! Scrolling only moves `origin` and resets the rows/columns that entered the
//! window, so the cost is proportional to the exposed strip rather than to
//! the whole grid.

use glam::{IVec2, UVec2};
use tracing::debug;

use crate::cell::CellValue;
use crate::error::{GridError, Result};
use crate::types::Index;

/// Owned 2D cell array with a default ("unobserved") value.
#[derive(Clone, Debug)]
pub struct CellStore<T> {
  cells: Vec<T>,
  dims: UVec2,
  origin: UVec2,
  default_value: T,
}

impl<T: CellValue> CellStore<T> {
  /// Create a store of `dims` cells, all set to `default_value`.
  pub fn new(dims: UVec2, default_value: T) -> Self {
    let len = dims.x as usize * dims.y as usize;
    Self {
      cells: vec![default_value.clone(); len],
      dims,
      origin: UVec2::ZERO,
      default_value,
    }
  }

  #[inline]
  pub fn dims(&self) -> UVec2 {
    self.dims
  }

  #[inline]
  pub fn default_value(&self) -> &T {
    &self.default_value
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.cells.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.cells.is_empty()
  }

  #[inline]
  pub fn contains(&self, index: Index) -> bool {
    index.x >= 0 && index.y >= 0 && (index.x as u32) < self.dims.x && (index.y as u32) < self.dims.y
  }

  /// Physical slot of an in-range logical cell.
  #[inline]
  fn slot(&self, x: u32, y: u32) -> usize {
    let mut px = x + self.origin.x;
    if px >= self.dims.x {
      px -= self.dims.x;
    }
    let mut py = y + self.origin.y;
    if py >= self.dims.y {
      py -= self.dims.y;
    }
    py as usize * self.dims.x as usize + px as usize
  }

  #[inline]
  fn checked_slot(&self, index: Index) -> Result<usize> {
    if self.contains(index) {
      Ok(self.slot(index.x as u32, index.y as u32))
    } else {
      Err(GridError::OutOfRange {
        index,
        num_cells: self.dims,
      })
    }
  }

  /// Read a cell. Out-of-range indices fail, they are never clamped or
  /// wrapped.
  pub fn get(&self, index: Index) -> Result<&T> {
    let slot = self.checked_slot(index)?;
    Ok(&self.cells[slot])
  }

  pub fn get_mut(&mut self, index: Index) -> Result<&mut T> {
    let slot = self.checked_slot(index)?;
    Ok(&mut self.cells[slot])
  }

  /// Overwrite a cell.
  pub fn set(&mut self, index: Index, value: T) -> Result<()> {
    *self.get_mut(index)? = value;
    Ok(())
  }

  /// In-range cell without bounds check on the logical index.
  #[inline]
  pub(crate) fn get_unchecked(&self, x: u32, y: u32) -> &T {
    &self.cells[self.slot(x, y)]
  }

  /// Cells of logical row `y` in physical order (rotated by `origin.x`).
  #[inline]
  pub(crate) fn row_cells(&self, y: u32) -> &[T] {
    let start = self.slot(0, y) - self.origin.x as usize;
    &self.cells[start..start + self.dims.x as usize]
  }

  /// Reset every cell to the default value.
  pub fn clear(&mut self) {
    self.cells.fill(self.default_value.clone());
    self.origin = UVec2::ZERO;
  }

  /// Reallocate for new dimensions; all cells become default.
  pub fn resize(&mut self, dims: UVec2) {
    *self = Self::new(dims, self.default_value.clone());
  }

  /// Slide the window by `offset` cells.
  ///
  /// Afterwards the value formerly stored at `I` is found at `I + offset`;
  /// cells whose source `I - offset` lies outside the old window hold the
  /// default value. A zero offset is a no-op; an offset at least as large as
  /// the grid on either axis clears the store.
  pub fn scroll_by(&mut self, offset: IVec2) {
    if offset == IVec2::ZERO || self.cells.is_empty() {
      return;
    }
    if offset.x.unsigned_abs() >= self.dims.x || offset.y.unsigned_abs() >= self.dims.y {
      debug!(?offset, dims = ?self.dims, "scroll leaves the window, clearing store");
      self.clear();
      return;
    }

    let w = self.dims.x as i32;
    let h = self.dims.y as i32;
    self.origin = UVec2::new(
      (self.origin.x as i32 - offset.x).rem_euclid(w) as u32,
      (self.origin.y as i32 - offset.y).rem_euclid(h) as u32,
    );

    let exposed_cols = if offset.x > 0 { 0..offset.x } else { w + offset.x..w };
    for x in exposed_cols {
      for y in 0..h {
        self.reset(x as u32, y as u32);
      }
    }

    let exposed_rows = if offset.y > 0 { 0..offset.y } else { h + offset.y..h };
    for y in exposed_rows {
      for x in 0..w {
        self.reset(x as u32, y as u32);
      }
    }
  }

  #[inline]
  fn reset(&mut self, x: u32, y: u32) {
    let slot = self.slot(x, y);
    self.cells[slot] = self.default_value.clone();
  }

  /// Iterate `(index, cell)` in index order (x fastest, then y).
  pub fn iter(&self) -> impl Iterator<Item = (Index, &T)> + '_ {
    (0..self.dims.y).flat_map(move |y| {
      (0..self.dims.x).map(move |x| (IVec2::new(x as i32, y as i32), self.get_unchecked(x, y)))
    })
  }

  /// Mutable iteration in index order.
  pub fn iter_mut(&mut self) -> impl Iterator<Item = (Index, &mut T)> + '_ {
    let w = self.dims.x as usize;
    let split = self.origin.x as usize;
    let mut rows: Vec<&mut [T]> = if w == 0 {
      Vec::new()
    } else {
      self.cells.chunks_mut(w).collect()
    };
    if !rows.is_empty() {
      rows.rotate_left(self.origin.y as usize);
    }

    rows.into_iter().enumerate().flat_map(move |(y, row)| {
      let (wrapped, leading) = row.split_at_mut(split);
      leading
        .iter_mut()
        .chain(wrapped.iter_mut())
        .enumerate()
        .map(move |(x, cell)| (IVec2::new(x as i32, y as i32), cell))
    })
  }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;
