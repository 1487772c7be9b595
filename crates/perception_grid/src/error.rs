//! Error taxonomy shared by the grid, voxel and fusion layers.

use glam::{DVec3, IVec2, IVec3, UVec2};
use thiserror::Error;

/// Failures raised by store accessors, construction and fusion.
///
/// Query-style conversions (`world_to_index`, `index_to_world`, ...) never
/// produce this type; they return `Option` so callers can branch cheaply.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
  /// A 2D cell index outside `[0, num_cells)`.
  #[error("index {index} is outside the grid of {num_cells} cells")]
  OutOfRange { index: IVec2, num_cells: UVec2 },

  /// A position that does not fall into any cell of the grid.
  #[error("position {position} does not map into the grid")]
  PositionOutOfRange { position: DVec3 },

  /// A voxel index whose column lies outside the grid.
  #[error("voxel index {index} is outside the grid")]
  VoxelOutOfRange { index: IVec3 },

  /// Non-positive resolution or cell count, or an invalid fusion parameter.
  #[error("invalid configuration: {0}")]
  InvalidConfiguration(String),

  /// Zero-length or non-finite geometry met while fusing a single point.
  #[error("degenerate geometry: {0}")]
  DegenerateGeometry(String),
}

pub type Result<T> = std::result::Result<T, GridError>;
