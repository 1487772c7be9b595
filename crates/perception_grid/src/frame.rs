//! Frame transforms and pose uncertainty.
//!
//! Every grid carries a *local frame*: the affine transform that maps a
//! position expressed in the external reference frame into the grid's own
//! coordinate space, where cell `(0, 0)` starts at the origin and cells grow
//! along +X / +Y.
//!
//! ```text
//!   reference frame ──local_frame──▶ grid-local ──floor(p / res)──▶ Index
//! ```

use glam::{DAffine3, DMat3, DVec3};

/// Translate a local frame so the grid origin moves by `offset` in the
/// reference frame.
#[inline]
pub fn translated(frame: &DAffine3, offset: DVec3) -> DAffine3 {
  *frame * DAffine3::from_translation(-offset)
}

/// Component-wise approximate equality of two transforms.
#[inline]
pub fn approx_eq(a: &DAffine3, b: &DAffine3, max_abs_diff: f64) -> bool {
  a.abs_diff_eq(*b, max_abs_diff)
}

/// Cross-product matrix `[v]×` with `[v]× w = v × w`.
#[inline]
pub fn skew(v: DVec3) -> DMat3 {
  DMat3::from_cols(
    DVec3::new(0.0, v.z, -v.y),
    DVec3::new(-v.z, 0.0, v.x),
    DVec3::new(v.y, -v.x, 0.0),
  )
}

/// 6×6 pose covariance over (translation, rotation), stored as 3×3 blocks.
///
/// Rotation uncertainty is a small-angle perturbation applied in the target
/// frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseCovariance {
  /// Translation block `Σtt`.
  pub translation: DMat3,
  /// Translation/rotation cross block `Σtr`.
  pub cross: DMat3,
  /// Rotation block `Σrr`.
  pub rotation: DMat3,
}

impl PoseCovariance {
  /// Perfectly known pose.
  pub const ZERO: Self = Self {
    translation: DMat3::ZERO,
    cross: DMat3::ZERO,
    rotation: DMat3::ZERO,
  };

  /// Pose with unknown uncertainty (all NaN).
  pub fn unknown() -> Self {
    Self {
      translation: DMat3::NAN,
      cross: DMat3::NAN,
      rotation: DMat3::NAN,
    }
  }

  /// Uncorrelated translation/rotation variances.
  pub fn from_variances(translation: DVec3, rotation: DVec3) -> Self {
    Self {
      translation: DMat3::from_diagonal(translation),
      cross: DMat3::ZERO,
      rotation: DMat3::from_diagonal(rotation),
    }
  }

  pub fn is_finite(&self) -> bool {
    self.translation.is_finite() && self.cross.is_finite() && self.rotation.is_finite()
  }
}

impl Default for PoseCovariance {
  fn default() -> Self {
    Self::ZERO
  }
}

/// Rigid or affine transform with an associated covariance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoseWithCovariance {
  pub transform: DAffine3,
  pub covariance: PoseCovariance,
}

impl PoseWithCovariance {
  pub fn new(transform: DAffine3, covariance: PoseCovariance) -> Self {
    Self {
      transform,
      covariance,
    }
  }

  /// Map `point` through the pose and propagate the pose covariance onto it.
  ///
  /// Returns the transformed point and its 3×3 positional covariance
  /// `J Σ Jᵀ` with `J = [I | -[R p]×]`.
  pub fn compose_point_with_covariance(&self, point: DVec3) -> (DVec3, DMat3) {
    let rotated = self.transform.matrix3 * point;
    let mapped = rotated + self.transform.translation;

    let s = -skew(rotated);
    let c = &self.covariance;
    let covariance = c.translation
      + c.cross * s.transpose()
      + s * c.cross.transpose()
      + s * c.rotation * s.transpose();

    (mapped, covariance)
  }
}

impl From<DAffine3> for PoseWithCovariance {
  fn from(transform: DAffine3) -> Self {
    Self::new(transform, PoseCovariance::ZERO)
  }
}

impl Default for PoseWithCovariance {
  fn default() -> Self {
    Self::from(DAffine3::IDENTITY)
  }
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod frame_test;
