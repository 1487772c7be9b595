//! Default-value comparison for cell payloads.
//!
//! "Is this cell still the default?" is the only signal the extents scanner
//! and the scroll reset rely on. Every cell type answers it through
//! [`CellValue::matches_default`], so float grids with a NaN default behave
//! the same everywhere: a cell is default iff it is NaN.

/// Payload stored in a grid cell.
pub trait CellValue: Clone {
  /// True if `self` counts as the unobserved `default` value.
  fn matches_default(&self, default: &Self) -> bool;
}

/// Shared presence predicate: a cell is present iff it is not the default.
#[inline]
pub fn is_present<T: CellValue>(value: &T, default: &T) -> bool {
  !value.matches_default(default)
}

macro_rules! impl_exact_cell_value {
  ($($ty:ty),* $(,)?) => {
    $(
      impl CellValue for $ty {
        #[inline]
        fn matches_default(&self, default: &Self) -> bool {
          self == default
        }
      }
    )*
  };
}

impl_exact_cell_value!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, bool, char);

macro_rules! impl_float_cell_value {
  ($($ty:ty),* $(,)?) => {
    $(
      impl CellValue for $ty {
        #[inline]
        fn matches_default(&self, default: &Self) -> bool {
          if default.is_nan() {
            self.is_nan()
          } else {
            self == default
          }
        }
      }
    )*
  };
}

impl_float_cell_value!(f32, f64);

impl<T: CellValue> CellValue for Option<T> {
  fn matches_default(&self, default: &Self) -> bool {
    match (self, default) {
      (None, None) => true,
      (Some(value), Some(default)) => value.matches_default(default),
      _ => false,
    }
  }
}
