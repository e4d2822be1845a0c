//! Cell value trait for generic rasters

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Floating point cells use NaN as their only invalid marker; integer
/// cells (class maps, category codes) are always valid.
pub trait RasterElement:
    Copy + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Whether this type is a floating point type
    const IS_FLOAT: bool;

    /// Whether the value carries data (finite for floats)
    fn is_valid(&self) -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }
}

macro_rules! impl_raster_element_int {
    ($($t:ty),*) => {
        $(
            impl RasterElement for $t {
                const IS_FLOAT: bool = false;

                fn is_valid(&self) -> bool {
                    true
                }
            }
        )*
    };
}

macro_rules! impl_raster_element_float {
    ($($t:ty),*) => {
        $(
            impl RasterElement for $t {
                const IS_FLOAT: bool = true;

                fn is_valid(&self) -> bool {
                    self.is_finite()
                }
            }
        )*
    };
}

impl_raster_element_int!(u8, u16, i32);
impl_raster_element_float!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_validity() {
        assert!(1.0f64.is_valid());
        assert!(!f64::NAN.is_valid());
        assert!(!f32::INFINITY.is_valid());
        assert!(f64::IS_FLOAT);
    }

    #[test]
    fn integer_always_valid() {
        assert!(0u8.is_valid());
        assert!(!u8::IS_FLOAT);
        assert_eq!(7u8.to_f64(), Some(7.0));
    }
}
