//! Voxel traversal along a line segment.
//!
//! Walks every voxel a segment passes through, in order, using incremental
//! axis stepping (Amanatides & Woo):
//!
//! ```text
//!   ┌───┬───┬───┬───┐
//!   │   │   │ ● │ ● │ end
//!   ├───┼───┼───┼───┤
//!   │ ● │ ● │ ● │   │
//!   └───┴───┴───┴───┘
//!  start
//! ```
//!
//! Consecutive voxels always share a face. The walk is bounded by the
//! Manhattan distance between the start and end voxels, so it terminates even
//! when rounding makes the last step land next to the end voxel.

use glam::{DVec3, IVec3};

use crate::types::VoxelIndex;

/// Iterator over the voxels crossed by the segment `start → end`.
///
/// Positions are in grid-local coordinates, voxel `k` spanning
/// `[k · res, (k + 1) · res)` on each axis.
pub struct VoxelRay {
  current: IVec3,
  step: IVec3,
  t_max: DVec3,
  t_delta: DVec3,
  remaining: u64,
}

impl VoxelRay {
  pub fn new(start: DVec3, end: DVec3, resolution: DVec3) -> Self {
    let start_voxel = (start / resolution).floor().as_ivec3();
    let end_voxel = (end / resolution).floor().as_ivec3();

    if !(start.is_finite() && end.is_finite()) {
      return Self {
        current: start_voxel,
        step: IVec3::ZERO,
        t_max: DVec3::INFINITY,
        t_delta: DVec3::INFINITY,
        remaining: 0,
      };
    }

    let dir = end - start;
    let span = (end_voxel.as_i64vec3() - start_voxel.as_i64vec3()).abs();
    let mut step = IVec3::ZERO;
    let mut t_max = DVec3::INFINITY;
    let mut t_delta = DVec3::INFINITY;

    for axis in 0..3 {
      let d = dir[axis];
      if d > 0.0 {
        step[axis] = 1;
        t_delta[axis] = resolution[axis] / d;
        t_max[axis] = ((start_voxel[axis] as f64 + 1.0) * resolution[axis] - start[axis]) / d;
      } else if d < 0.0 {
        step[axis] = -1;
        t_delta[axis] = -resolution[axis] / d;
        t_max[axis] = (start_voxel[axis] as f64 * resolution[axis] - start[axis]) / d;
      }
    }

    Self {
      current: start_voxel,
      step,
      t_max,
      t_delta,
      remaining: (span.x + span.y + span.z) as u64 + 1,
    }
  }
}

impl Iterator for VoxelRay {
  type Item = VoxelIndex;

  fn next(&mut self) -> Option<VoxelIndex> {
    if self.remaining == 0 {
      return None;
    }
    let voxel = self.current;
    self.remaining -= 1;

    if self.remaining > 0 {
      let axis = if self.t_max.x <= self.t_max.y && self.t_max.x <= self.t_max.z {
        0
      } else if self.t_max.y <= self.t_max.z {
        1
      } else {
        2
      };
      self.current[axis] += self.step[axis];
      self.t_max[axis] += self.t_delta[axis];
    }

    Some(voxel)
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    let n = usize::try_from(self.remaining).unwrap_or(usize::MAX);
    (n, Some(n))
  }
}
