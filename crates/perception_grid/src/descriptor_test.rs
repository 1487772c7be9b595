use approx::assert_relative_eq;
use glam::{DQuat, DVec4, IVec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;

/// 100 x 200 cells of 0.1 x 0.5 (10 m x 100 m).
fn reference_grid() -> GridDescriptor {
  GridDescriptor::new(UVec2::new(100, 200), DVec2::new(0.1, 0.5)).unwrap()
}

fn random_rotation(rng: &mut StdRng) -> DQuat {
  let v = DVec4::new(
    rng.random_range(-1.0..1.0),
    rng.random_range(-1.0..1.0),
    rng.random_range(-1.0..1.0),
    rng.random_range(-1.0..1.0),
  );
  DQuat::from_vec4(v).normalize()
}

fn random_vec3(rng: &mut StdRng, scale: f64) -> DVec3 {
  DVec3::new(
    rng.random_range(-1.0..1.0),
    rng.random_range(-1.0..1.0),
    rng.random_range(-1.0..1.0),
  ) * scale
}

/// Offset strictly inside the cell (away from floor() ties).
fn well_inside(offset: DVec3, resolution: DVec2) -> bool {
  let margin = 1e-7;
  offset.x.abs() < resolution.x * 0.5 - margin && offset.y.abs() < resolution.y * 0.5 - margin
}

// =========================================================================
// Construction
// =========================================================================

#[test]
fn test_rejects_non_positive_geometry() {
  assert!(matches!(
    GridDescriptor::new(UVec2::new(0, 10), DVec2::ONE),
    Err(GridError::InvalidConfiguration(_))
  ));
  assert!(matches!(
    GridDescriptor::new(UVec2::new(10, 10), DVec2::new(0.1, 0.0)),
    Err(GridError::InvalidConfiguration(_))
  ));
  assert!(matches!(
    GridDescriptor::new(UVec2::new(10, 10), DVec2::new(-0.1, 0.1)),
    Err(GridError::InvalidConfiguration(_))
  ));
  assert!(matches!(
    GridDescriptor::new(UVec2::new(10, 10), DVec2::new(f64::NAN, 0.1)),
    Err(GridError::InvalidConfiguration(_))
  ));
}

#[test]
fn test_size_and_elements() {
  let grid = GridDescriptor::new(UVec2::new(100, 100), DVec2::new(0.153, 0.257)).unwrap();
  assert!(grid.size().abs_diff_eq(DVec2::new(15.3, 25.7), 1e-9));
  assert_eq!(grid.num_elements(), 100 * 100);
  assert_eq!(*grid.local_frame(), DAffine3::IDENTITY);
}

#[test]
fn test_in_grid_bounds() {
  let grid = reference_grid();

  assert!(grid.in_grid(IVec2::new(0, 0)));
  assert!(grid.in_grid(IVec2::new(99, 199)));
  assert!(grid.in_grid(IVec2::new(50, 100)));

  assert!(!grid.in_grid(IVec2::new(100, 200)));
  assert!(!grid.in_grid(IVec2::new(99, 200)));
  assert!(!grid.in_grid(IVec2::new(100, 199)));
  assert!(!grid.in_grid(IVec2::new(-1, -1)));
  assert!(!grid.in_grid(IVec2::new(-1, 2)));
  assert!(!grid.in_grid(IVec2::new(2, -1)));
}

// =========================================================================
// Index -> position
// =========================================================================

#[test]
fn test_index_to_world_without_offset() {
  let grid = reference_grid();

  let cases = [
    (IVec2::new(0, 0), DVec3::new(0.05, 0.25, 0.0)),
    (IVec2::new(0, 1), DVec3::new(0.05, 0.75, 0.0)),
    (IVec2::new(1, 0), DVec3::new(0.15, 0.25, 0.0)),
    (IVec2::new(1, 1), DVec3::new(0.15, 0.75, 0.0)),
    (IVec2::new(99, 199), DVec3::new(9.95, 99.75, 0.0)),
    (IVec2::new(49, 99), DVec3::new(4.95, 49.75, 0.0)),
    (IVec2::new(50, 100), DVec3::new(5.05, 50.25, 0.0)),
  ];
  for (index, expected) in cases {
    let pos = grid.index_to_world(index).unwrap();
    assert!(pos.abs_diff_eq(expected, 1e-9), "{index} -> {pos}, expected {expected}");
  }

  assert_eq!(grid.index_to_world(IVec2::new(100, 200)), None);
}

#[test]
fn test_unchecked_addressing_outside_grid() {
  let grid = reference_grid();

  let pos = grid.index_to_local_unchecked(IVec2::new(-1, -1));
  assert!(pos.abs_diff_eq(DVec3::new(-0.05, -0.25, 0.0), 1e-9));
  assert_eq!(grid.index_to_local(IVec2::new(-1, -1)), None);

  let (index, _) = grid.local_to_index_unchecked(pos);
  assert_eq!(index, IVec2::new(-1, -1));
}

#[test]
fn test_index_to_world_with_local_frame() {
  let mut grid = reference_grid();
  grid.local_frame_mut().translation = DVec3::new(5.0, 50.0, 0.0);

  let pos = grid.index_to_world(IVec2::new(0, 0)).unwrap();
  assert!(pos.abs_diff_eq(DVec3::new(-4.95, -49.75, 0.0), 1e-9));

  let pos = grid.index_to_world(IVec2::new(99, 199)).unwrap();
  assert!(pos.abs_diff_eq(DVec3::new(4.95, 49.75, 0.0), 1e-9));

  let pos = grid.index_to_world(IVec2::new(50, 100)).unwrap();
  assert!(pos.abs_diff_eq(DVec3::new(0.05, 0.25, 0.0), 1e-9));
}

#[test]
fn test_translate_matches_local_frame_offset() {
  let mut translated = reference_grid();
  translated.translate(DVec3::new(-5.0, -50.0, 0.0));

  let mut framed = reference_grid();
  framed.local_frame_mut().translation = DVec3::new(5.0, 50.0, 0.0);

  for index in [IVec2::new(0, 0), IVec2::new(99, 199), IVec2::new(50, 100)] {
    let a = translated.index_to_world(index).unwrap();
    let b = framed.index_to_world(index).unwrap();
    assert!(a.abs_diff_eq(b, 1e-9));
  }
}

#[test]
fn test_index_to_world_in_specific_frame() {
  let mut grid = GridDescriptor::new(UVec2::new(100, 100), DVec2::new(0.1, 0.5)).unwrap();
  grid.local_frame_mut().translation = DVec3::new(5.0, 50.0, 0.0);
  let frame_in_grid = DAffine3::from_translation(DVec3::new(-5.0, -50.0, -0.5));

  let cases = [
    (IVec2::new(0, 0), DVec3::new(0.05, 0.25, 0.5)),
    (IVec2::new(99, 99), DVec3::new(9.95, 49.75, 0.5)),
    (IVec2::new(50, 99), DVec3::new(5.05, 49.75, 0.5)),
    (IVec2::new(99, 50), DVec3::new(9.95, 25.25, 0.5)),
    (IVec2::new(50, 50), DVec3::new(5.05, 25.25, 0.5)),
  ];
  for (index, expected) in cases {
    let pos = grid.index_to_world_in_frame(index, &frame_in_grid).unwrap();
    assert!(pos.abs_diff_eq(expected, 1e-9), "{index} -> {pos}, expected {expected}");
  }

  assert_eq!(grid.index_to_world_in_frame(IVec2::new(100, 100), &frame_in_grid), None);
  assert_eq!(grid.index_to_world_in_frame(IVec2::new(100, 50), &frame_in_grid), None);
  assert_eq!(grid.index_to_world_in_frame(IVec2::new(50, 100), &frame_in_grid), None);
}

// =========================================================================
// Position -> index
// =========================================================================

#[test]
fn test_world_to_index_without_offset() {
  let grid = reference_grid();

  // Lower corner of a cell maps inward
  let (index, offset) = grid.world_to_index(DVec3::ZERO).unwrap();
  assert_eq!(index, IVec2::new(0, 0));
  assert!(offset.abs_diff_eq(DVec3::new(-0.05, -0.25, 0.0), 1e-9));

  let (index, offset) = grid.world_to_index(DVec3::new(0.05, 0.25, 0.0)).unwrap();
  assert_eq!(index, IVec2::new(0, 0));
  assert!(offset.length() <= 1e-6);

  let (index, offset) = grid.world_to_index(DVec3::new(0.1, 0.5, 0.0)).unwrap();
  assert_eq!(index, IVec2::new(1, 1));
  assert!(offset.abs_diff_eq(DVec3::new(-0.05, -0.25, 0.0), 1e-9));

  let (index, _) = grid.world_to_index(DVec3::new(0.1, 0.0, 0.0)).unwrap();
  assert_eq!(index, IVec2::new(1, 0));

  let (index, offset) = grid.world_to_index(DVec3::new(9.99, 99.99, 0.0)).unwrap();
  assert_eq!(index, IVec2::new(99, 199));
  assert!(offset.abs_diff_eq(DVec3::new(0.04, 0.24, 0.0), 1e-9));

  // Upper edge is open
  assert_eq!(grid.world_to_index(DVec3::new(10.0, 100.0, 0.0)), None);
  assert_eq!(grid.world_to_index(DVec3::new(-0.01, 0.0, 0.0)), None);
}

#[test]
fn test_world_to_index_with_local_frame() {
  let mut grid = reference_grid();
  grid.local_frame_mut().translation = DVec3::new(5.0, 50.0, 0.0);

  let (index, offset) = grid.world_to_index(DVec3::new(-5.0, -50.0, 0.0)).unwrap();
  assert_eq!(index, IVec2::new(0, 0));
  assert!(offset.abs_diff_eq(DVec3::new(-0.05, -0.25, 0.0), 1e-9));

  let (index, offset) = grid.world_to_index(DVec3::new(-4.91, -49.51, 0.0)).unwrap();
  assert_eq!(index, IVec2::new(0, 0));
  assert!(offset.abs_diff_eq(DVec3::new(0.04, 0.24, 0.0), 1e-9));

  let (index, offset) = grid.world_to_index(DVec3::new(-4.89, -49.49, 0.0)).unwrap();
  assert_eq!(index, IVec2::new(1, 1));
  assert!(offset.abs_diff_eq(DVec3::new(-0.04, -0.24, 0.0), 1e-9));

  let (index, offset) = grid.world_to_index(DVec3::new(4.95, 49.75, 0.0)).unwrap();
  assert_eq!(index, IVec2::new(99, 199));
  assert!(offset.length() <= 1e-6);

  assert_eq!(grid.world_to_index(DVec3::new(5.0, 50.0, 0.0)), None);
}

#[test]
fn test_world_to_index_in_specific_frame() {
  let mut grid = GridDescriptor::new(UVec2::new(100, 100), DVec2::new(0.1, 0.5)).unwrap();
  grid.local_frame_mut().translation = DVec3::new(5.0, 50.0, 0.0);
  let frame_in_grid = DAffine3::from_translation(DVec3::new(-5.0, -50.0, -0.5));

  let index_of = |p: DVec3| grid.world_to_index_in_frame(p, &frame_in_grid).map(|(i, _)| i);

  assert_eq!(index_of(DVec3::new(0.0, 0.0, 0.0)), Some(IVec2::new(0, 0)));
  assert_eq!(index_of(DVec3::new(0.05, 0.25, 0.5)), Some(IVec2::new(0, 0)));
  assert_eq!(index_of(DVec3::new(9.95, 49.75, 0.5)), Some(IVec2::new(99, 99)));
  assert_eq!(index_of(DVec3::new(5.05, 49.75, 0.5)), Some(IVec2::new(50, 99)));
  assert_eq!(index_of(DVec3::new(9.95, 25.25, 0.5)), Some(IVec2::new(99, 50)));
  assert_eq!(index_of(DVec3::new(5.05, 25.25, 0.5)), Some(IVec2::new(50, 50)));

  assert_eq!(index_of(DVec3::new(5.0, 50.0, 0.5)), None);
  assert_eq!(index_of(DVec3::new(10.0, 25.0, 0.5)), None);
  assert_eq!(index_of(DVec3::new(10.0, 50.0, 0.5)), None);
}

#[test]
fn test_non_finite_position_is_rejected() {
  let grid = reference_grid();
  assert_eq!(grid.world_to_index(DVec3::new(f64::NAN, 1.0, 0.0)), None);
  assert_eq!(grid.world_to_index(DVec3::new(1.0, f64::INFINITY, 0.0)), None);
}

// =========================================================================
// Round trips and variant equivalence
// =========================================================================

#[test]
fn test_index_world_roundtrip() {
  let mut rng = StdRng::seed_from_u64(0x5eed);
  let grid = GridDescriptor::new(UVec2::new(37, 23), DVec2::new(0.3, 0.7))
    .unwrap()
    .with_local_frame(DAffine3::from_rotation_translation(
      random_rotation(&mut rng),
      random_vec3(&mut rng, 5.0),
    ));

  for y in 0..23 {
    for x in 0..37 {
      let index = IVec2::new(x, y);
      let world = grid.index_to_world(index).unwrap();
      let (back, offset) = grid.world_to_index(world).unwrap();
      assert_eq!(back, index);
      assert!(offset.length() < 1e-9, "offset {offset} for {index}");
    }
  }
}

#[test]
fn test_world_to_index_variants_agree() {
  let mut rng = StdRng::seed_from_u64(42);
  let mut checked = 0;

  for _ in 0..10 {
    let resolution = DVec2::new(rng.random_range(0.05..1.0), rng.random_range(0.05..1.0));
    let grid = GridDescriptor::new(UVec2::new(100, 100), resolution)
      .unwrap()
      .with_local_frame(DAffine3::from_rotation_translation(
        random_rotation(&mut rng),
        random_vec3(&mut rng, 1.0),
      ));

    for _ in 0..10 {
      let trafo = DAffine3::from_rotation_translation(random_rotation(&mut rng), random_vec3(&mut rng, 1.0));
      let folded = grid.prepare_world_to_index(&trafo);

      for _ in 0..100 {
        let p = random_vec3(&mut rng, 10.0);
        let trafo_p = trafo.transform_point3(p);

        let Some((index, offset)) = grid.world_to_index(trafo_p) else {
          continue;
        };
        if !well_inside(offset, resolution) {
          continue;
        }
        checked += 1;

        let (index_prepared, offset_prepared) = grid.world_to_index_prepared(p, &folded).unwrap();
        let local = grid.local_frame().transform_point3(trafo_p);
        let (index_local, offset_local) = grid.local_to_index(local).unwrap();
        let (index_frame, offset_frame) = grid.world_to_index_in_frame(p, &trafo).unwrap();

        assert_eq!(index, index_prepared);
        assert_eq!(index, index_local);
        assert_eq!(index, index_frame);
        assert!(offset.abs_diff_eq(offset_prepared, 1e-9));
        assert!(offset.abs_diff_eq(offset_local, 1e-9));
        assert!(offset.abs_diff_eq(offset_frame, 1e-9));

        let pos_in_grid = grid.index_to_local_with_offset(index, offset).unwrap();
        let pos_in_world = grid.index_to_world_with_offset(index, offset).unwrap();
        assert!(pos_in_grid.abs_diff_eq(local, 1e-9));
        assert!(pos_in_world.abs_diff_eq(trafo_p, 1e-9));
      }
    }
  }

  assert!(checked > 0, "no sample landed inside the grid");
}

#[test]
fn test_has_same_frame() {
  let grid = reference_grid();
  assert!(grid.has_same_frame(&DAffine3::IDENTITY, UVec2::new(100, 200), DVec2::new(0.1, 0.5)));
  assert!(!grid.has_same_frame(&DAffine3::IDENTITY, UVec2::new(100, 100), DVec2::new(0.1, 0.5)));
  assert!(!grid.has_same_frame(
    &DAffine3::from_translation(DVec3::X),
    UVec2::new(100, 200),
    DVec2::new(0.1, 0.5)
  ));
  assert_relative_eq!(grid.resolution().y, 0.5);
}
