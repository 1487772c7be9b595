//! Truncated signed distance fusion on a voxel grid.
//!
//! Each voxel stores a signed distance to the nearest surface and the
//! variance of that estimate. A voxel does not exist until its first
//! observation; after that it is only ever refined in place.
//!
//! # Sign Convention
//!
//! Distances are positive on the sensor side of a surface and negative
//! behind it:
//!
//! ```text
//!   sensor ●────────────── + + + + │ - - - -
//!                                  surface (measurement)
//! ```
//!
//! Surface projection has no sensor, so there the sign follows the z
//! component of `voxel - contact point` (positive above the surface).

use glam::{DAffine3, DVec2, DVec3, IVec2, UVec2};
use tracing::{debug, warn};

use crate::error::{GridError, Result};
use crate::frame::PoseWithCovariance;
use crate::raycast::VoxelRay;
use crate::types::VoxelIndex;
use crate::voxel::{ColumnEntry, VoxelGridMap};

// =============================================================================
// Voxel
// =============================================================================

/// Fused signed distance and its variance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TsdfVoxel {
  pub distance: f32,
  pub variance: f32,
}

impl TsdfVoxel {
  /// Voxel initialised from a first measurement.
  pub fn observed(distance: f32, variance: f32, truncation: f32, min_variance: f32) -> Self {
    Self {
      distance: distance.clamp(-truncation, truncation),
      variance: variance.max(min_variance),
    }
  }

  /// Fuse a measurement by inverse-variance weighting.
  ///
  /// The measurement is clamped to `±truncation` and its variance floored at
  /// `min_variance`; the stored variance never drops below `min_variance`.
  pub fn update(&mut self, distance: f32, variance: f32, truncation: f32, min_variance: f32) {
    let distance = distance.clamp(-truncation, truncation);
    let variance = variance.max(min_variance) as f64;
    let stored = self.variance as f64;
    let sum = stored + variance;

    // Two exact measurements carry equal weight.
    if !(sum > 0.0) {
      self.distance = 0.5 * (self.distance + distance);
      self.variance = min_variance;
      return;
    }
    let fused = (variance * self.distance as f64 + stored * distance as f64) / sum;
    self.distance = (fused as f32).clamp(-truncation, truncation);
    self.variance = ((stored * variance / sum) as f32).max(min_variance);
  }
}

// =============================================================================
// Configuration
// =============================================================================

/// Map-level fusion parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TsdfConfig {
  /// Distance beyond which measurements do not touch a voxel.
  pub truncation: f32,
  /// Lower bound for every stored variance.
  pub min_variance: f32,
}

impl TsdfConfig {
  pub fn with_truncation(mut self, truncation: f32) -> Self {
    self.truncation = truncation;
    self
  }

  pub fn with_min_variance(mut self, min_variance: f32) -> Self {
    self.min_variance = min_variance;
    self
  }

  pub fn validate(&self) -> Result<()> {
    validate_truncation(self.truncation)?;
    if !(self.min_variance.is_finite() && self.min_variance >= 0.0) {
      return Err(GridError::InvalidConfiguration(format!(
        "min variance must be finite and non-negative, got {}",
        self.min_variance
      )));
    }
    Ok(())
  }
}

impl Default for TsdfConfig {
  fn default() -> Self {
    Self {
      truncation: 1.0,
      min_variance: 0.001,
    }
  }
}

/// Index window and parameters for [`TsdfMap::project_surface`].
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectionWindow {
  /// First column/row visited (inclusive).
  pub start_index: IVec2,
  /// Column/row bound (exclusive), clipped to the grid.
  pub end_index: IVec2,
  /// Height range in grid-local z. Voxel levels
  /// `floor(z_min / res.z) .. floor(z_max / res.z)` are visited.
  pub z_min: f64,
  pub z_max: f64,
  /// Distance limit for touching a voxel.
  pub truncation: f32,
  /// Variance assigned to every projected distance.
  pub variance: f32,
}

impl ProjectionWindow {
  pub fn with_index_range(mut self, start_index: IVec2, end_index: IVec2) -> Self {
    self.start_index = start_index;
    self.end_index = end_index;
    self
  }

  pub fn with_z_range(mut self, z_min: f64, z_max: f64) -> Self {
    self.z_min = z_min;
    self.z_max = z_max;
    self
  }

  pub fn with_truncation(mut self, truncation: f32) -> Self {
    self.truncation = truncation;
    self
  }

  pub fn with_variance(mut self, variance: f32) -> Self {
    self.variance = variance;
    self
  }

  pub fn validate(&self) -> Result<()> {
    validate_truncation(self.truncation)?;
    if !(self.variance.is_finite() && self.variance >= 0.0) {
      return Err(GridError::InvalidConfiguration(format!(
        "projection variance must be finite and non-negative, got {}",
        self.variance
      )));
    }
    if !(self.z_min.is_finite() && self.z_max.is_finite()) {
      return Err(GridError::InvalidConfiguration(format!(
        "projection z range must be finite, got [{}, {}]",
        self.z_min, self.z_max
      )));
    }
    Ok(())
  }
}

impl Default for ProjectionWindow {
  fn default() -> Self {
    Self {
      start_index: IVec2::ZERO,
      end_index: IVec2::splat(i32::MAX),
      z_min: -50.0,
      z_max: 50.0,
      truncation: 1.0,
      variance: 0.01,
    }
  }
}

fn validate_truncation(truncation: f32) -> Result<()> {
  if truncation.is_finite() && truncation > 0.0 {
    Ok(())
  } else {
    Err(GridError::InvalidConfiguration(format!(
      "truncation must be positive and finite, got {truncation}"
    )))
  }
}

// =============================================================================
// Surface models
// =============================================================================

/// A surface that can report the contact point closest to a query position.
pub trait SurfaceModel {
  /// Closest point on the surface to `position`, both in the surface frame.
  fn closest_contact_point(&self, position: DVec3) -> Option<DVec3>;
}

impl<F> SurfaceModel for F
where
  F: Fn(DVec3) -> Option<DVec3>,
{
  fn closest_contact_point(&self, position: DVec3) -> Option<DVec3> {
    self(position)
  }
}

/// Counters returned by batch fusion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
  pub points_merged: usize,
  pub points_skipped: usize,
  pub voxels_updated: usize,
}

// =============================================================================
// TsdfMap
// =============================================================================

/// Voxel grid of [`TsdfVoxel`]s with fusion operations.
#[derive(Clone, Debug)]
pub struct TsdfMap {
  voxels: VoxelGridMap<TsdfVoxel>,
  config: TsdfConfig,
}

impl TsdfMap {
  pub fn new(num_cells: UVec2, resolution: DVec3, config: TsdfConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self {
      voxels: VoxelGridMap::new(num_cells, resolution)?,
      config,
    })
  }

  #[inline]
  pub fn voxels(&self) -> &VoxelGridMap<TsdfVoxel> {
    &self.voxels
  }

  /// Direct voxel access, e.g. to move the local frame or scroll.
  #[inline]
  pub fn voxels_mut(&mut self) -> &mut VoxelGridMap<TsdfVoxel> {
    &mut self.voxels
  }

  #[inline]
  pub fn config(&self) -> &TsdfConfig {
    &self.config
  }

  #[inline]
  pub fn truncation(&self) -> f32 {
    self.config.truncation
  }

  pub fn set_truncation(&mut self, truncation: f32) -> Result<()> {
    validate_truncation(truncation)?;
    self.config.truncation = truncation;
    Ok(())
  }

  #[inline]
  pub fn min_variance(&self) -> f32 {
    self.config.min_variance
  }

  pub fn set_min_variance(&mut self, min_variance: f32) -> Result<()> {
    let config = self.config.with_min_variance(min_variance);
    config.validate()?;
    self.config = config;
    Ok(())
  }

  /// Stored voxel, `Ok(None)` while unobserved.
  pub fn voxel(&self, index: VoxelIndex) -> Result<Option<&TsdfVoxel>> {
    self.voxels.voxel(index)
  }

  pub fn has_same_frame(&self, local_frame: &DAffine3, num_cells: UVec2, resolution: DVec2) -> bool {
    self.voxels.has_same_frame(local_frame, num_cells, resolution)
  }

  // ===========================================================================
  // Fusion
  // ===========================================================================

  /// Fuse a single range measurement.
  ///
  /// `sensor_origin` and `measurement` are in the reference frame. Every voxel
  /// crossed by the ray within `truncation` of the measurement, whose centre
  /// is closer than `truncation` to it, receives the signed distance of its
  /// centre along the ray. Returns the number of voxels updated.
  pub fn merge_point(&mut self, sensor_origin: DVec3, measurement: DVec3, variance: f64) -> Result<usize> {
    let to_local = *self.voxels.local_frame();
    let origin = to_local.transform_point3(sensor_origin);
    let hit = to_local.transform_point3(measurement);

    if !(origin.is_finite() && hit.is_finite()) {
      return Err(GridError::DegenerateGeometry(format!(
        "non-finite ray from {sensor_origin} to {measurement}"
      )));
    }
    let dir = (hit - origin).try_normalize().ok_or_else(|| {
      GridError::DegenerateGeometry(format!("zero-length ray at {measurement}"))
    })?;

    let variance = variance as f32;
    if !(variance.is_finite() && variance.max(self.config.min_variance) > 0.0) {
      return Err(GridError::DegenerateGeometry(format!(
        "measurement variance {variance} is not usable"
      )));
    }

    let truncation = self.config.truncation as f64;
    let start = hit - dir * truncation;
    let end = hit + dir * truncation;

    let mut updated = 0;
    for index in VoxelRay::new(start, end, self.voxels.voxel_resolution()) {
      let Some(centre) = self.voxels.voxel_to_local(index) else {
        continue;
      };
      let diff = hit - centre;
      let signed = diff.dot(dir) as f32;
      if diff.length() >= truncation || signed.abs() >= self.config.truncation {
        continue;
      }
      self.fuse(index, signed, variance, self.config.truncation)?;
      updated += 1;
    }
    Ok(updated)
  }

  /// Fuse a point cloud whose sensor sits at the cloud origin.
  pub fn merge_point_cloud(
    &mut self,
    points: &[DVec3],
    pose: &PoseWithCovariance,
    variance: f64,
  ) -> MergeStats {
    self.merge_point_cloud_with_origin(points, pose, DVec3::ZERO, variance)
  }

  /// Fuse a point cloud given in the sensor frame.
  ///
  /// `pose` maps the cloud into the reference frame. Its covariance, projected
  /// onto each ray, is added to `variance`; a non-finite projection falls
  /// back to `variance` alone. Points that cannot be fused are logged and
  /// skipped.
  #[tracing::instrument(skip_all, name = "tsdf::merge_point_cloud", fields(points = points.len()))]
  pub fn merge_point_cloud_with_origin(
    &mut self,
    points: &[DVec3],
    pose: &PoseWithCovariance,
    sensor_origin_in_cloud: DVec3,
    variance: f64,
  ) -> MergeStats {
    let sensor_origin = pose.transform.transform_point3(sensor_origin_in_cloud);
    let mut stats = MergeStats::default();

    for &point in points {
      let (measurement, covariance) = pose.compose_point_with_covariance(point);
      let pose_variance = (measurement - sensor_origin)
        .try_normalize()
        .map(|n| n.dot(covariance * n))
        .filter(|v| v.is_finite())
        .unwrap_or(0.0);

      match self.merge_point(sensor_origin, measurement, variance + pose_variance) {
        Ok(voxels) => {
          stats.points_merged += 1;
          stats.voxels_updated += voxels;
        }
        Err(err) => {
          stats.points_skipped += 1;
          warn!(%point, %err, "skipping point");
        }
      }
    }

    debug!(
      merged = stats.points_merged,
      skipped = stats.points_skipped,
      voxels = stats.voxels_updated,
      "point cloud fused"
    );
    stats
  }

  /// Fuse distances to another surface representation.
  ///
  /// `surface_to_grid` maps the surface frame into the reference frame. For
  /// every voxel centre in the window, the closest contact point on
  /// `surface` within `window.truncation` sets a signed distance whose sign
  /// follows the z component of `centre - contact`. Returns the number of
  /// voxels updated.
  #[tracing::instrument(skip_all, name = "tsdf::project_surface")]
  pub fn project_surface<S: SurfaceModel + ?Sized>(
    &mut self,
    surface: &S,
    surface_to_grid: &DAffine3,
    window: &ProjectionWindow,
  ) -> Result<usize> {
    window.validate()?;

    let variance = window.variance.max(self.config.min_variance);
    if !(variance > 0.0) {
      return Err(GridError::InvalidConfiguration(
        "projection needs a positive window or minimum variance".into(),
      ));
    }

    let local_to_surface = surface_to_grid.inverse() * self.voxels.local_frame().inverse();
    let res_z = self.voxels.voxel_resolution().z;
    let num_cells = self.voxels.num_cells().as_ivec2();
    let min_index = window.start_index.max(IVec2::ZERO);
    let max_index = window.end_index.min(num_cells);
    let z_min = (window.z_min / res_z).floor() as i32;
    let z_max = (window.z_max / res_z).floor() as i32;
    let truncation = window.truncation as f64;

    let mut updated = 0;
    for y in min_index.y..max_index.y {
      for x in min_index.x..max_index.x {
        for z in z_min..z_max {
          let index = VoxelIndex::new(x, y, z);
          let Some(centre) = self.voxels.voxel_to_local(index) else {
            continue;
          };
          let centre = local_to_surface.transform_point3(centre);
          let Some(contact) = surface.closest_contact_point(centre) else {
            continue;
          };
          let diff = centre - contact;
          let distance = diff.length();
          if distance < truncation && (distance as f32) < window.truncation {
            let signed = (distance as f32).copysign(diff.z as f32);
            self.fuse(index, signed, variance, window.truncation)?;
            updated += 1;
          }
        }
      }
    }

    debug!(updated, "surface projected");
    Ok(updated)
  }

  fn fuse(&mut self, index: VoxelIndex, distance: f32, variance: f32, truncation: f32) -> Result<()> {
    let min_variance = self.config.min_variance;
    match self.voxels.voxel_entry(index)? {
      ColumnEntry::Occupied(voxel) => voxel.update(distance, variance, truncation, min_variance),
      vacant => {
        vacant.or_insert_with(|| TsdfVoxel::observed(distance, variance, truncation, min_variance));
      }
    }
    Ok(())
  }
}

#[cfg(test)]
#[path = "tsdf_test.rs"]
mod tsdf_test;
