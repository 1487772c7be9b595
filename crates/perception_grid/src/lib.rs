//! perception_grid - Robot-centred rolling grid maps with TSDF fusion
//!
//! This crate maintains a bounded, fixed-size 2D grid around a moving
//! platform and fuses noisy 3D range observations into sparse voxel columns
//! on top of it.
//!
//! # Features
//!
//! - **Grid addressing**: index/position conversion through a mutable local
//!   frame, with a pre-folded variant for bulk point conversion
//! - **Rolling window**: ring-buffer scrolling whose cost follows the exposed
//!   strip, not the grid size
//! - **Extents**: bounding rectangle of all observed cells with NaN-aware
//!   default comparison
//! - **Voxel columns**: per-cell sparse z-levels allocated on first write
//! - **TSDF fusion**: ray-based point merging with pose covariance
//!   propagation, and projection of external surface models
//!
//! # Example
//!
//! ```ignore
//! use glam::{DAffine3, DVec3, UVec2};
//! use perception_grid::{PoseWithCovariance, TsdfConfig, TsdfMap};
//!
//! let mut map = TsdfMap::new(UVec2::new(200, 200), DVec3::splat(0.05), TsdfConfig::default())?;
//!
//! let pose = PoseWithCovariance::from(DAffine3::from_translation(DVec3::new(5.0, 5.0, 1.0)));
//! let stats = map.merge_point_cloud(&points, &pose, 0.01);
//!
//! println!("fused {} points into {} voxels", stats.points_merged, stats.voxels_updated);
//! ```

pub mod cell;
pub mod error;
pub mod frame;
pub mod types;

pub use cell::{is_present, CellValue};
pub use error::{GridError, Result};
pub use frame::{PoseCovariance, PoseWithCovariance};
pub use types::{CellExtents, Corner, Index, VoxelIndex};

// 2D grid: geometry, storage, extents
pub mod descriptor;
pub mod extents;
pub mod grid;
pub mod storage;
pub use descriptor::GridDescriptor;
pub use grid::GridMap;
pub use storage::CellStore;

// Collaborator interface for layered map types
pub mod access;
pub use access::{CellAccess, CellView};

// Sparse voxel columns and fusion
pub mod raycast;
pub mod tsdf;
pub mod voxel;
pub use raycast::VoxelRay;
pub use tsdf::{MergeStats, ProjectionWindow, SurfaceModel, TsdfConfig, TsdfMap, TsdfVoxel};
pub use voxel::{ColumnEntry, VoxelColumn, VoxelGridMap};
