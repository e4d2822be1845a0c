//! Raster-to-RGBA rendering using color schemes.

use crate::scheme::{evaluate, ColorScheme, Rgb};
use landchange_core::raster::{Raster, RasterElement};

/// Parameters for colormap rendering.
#[derive(Debug, Clone)]
pub struct ColormapParams {
    /// Color scheme to use.
    pub scheme: ColorScheme,
    /// Value mapped to the start of the scheme. Values below are clamped.
    pub min: f64,
    /// Value mapped to the end of the scheme. Values above are clamped.
    pub max: f64,
    /// Color for invalid (non-finite) cells. Default: fully transparent.
    pub nodata_color: [u8; 4],
}

impl ColormapParams {
    /// Params over [0, 1]
    pub fn new(scheme: ColorScheme) -> Self {
        Self::with_range(scheme, 0.0, 1.0)
    }

    /// Params over an explicit, fixed value range.
    pub fn with_range(scheme: ColorScheme, min: f64, max: f64) -> Self {
        Self {
            scheme,
            min,
            max,
            nodata_color: [0, 0, 0, 0],
        }
    }
}

/// Convert a raster to an RGBA pixel buffer.
///
/// Returns `rows * cols * 4` bytes in row-major order. Valid cells are
/// opaque; invalid cells get `params.nodata_color`.
pub fn raster_to_rgba<T: RasterElement>(raster: &Raster<T>, params: &ColormapParams) -> Vec<u8> {
    let range = params.max - params.min;
    let inv_range = if range.abs() > f64::EPSILON {
        1.0 / range
    } else {
        1.0
    };

    let mut rgba = Vec::with_capacity(raster.len() * 4);

    for val in raster.data().iter() {
        match val.to_f64() {
            Some(v) if val.is_valid() && v.is_finite() => {
                let t = (v - params.min) * inv_range;
                let Rgb { r, g, b } = evaluate(params.scheme, t);
                rgba.extend_from_slice(&[r, g, b, 255]);
            }
            _ => rgba.extend_from_slice(&params.nodata_color),
        }
    }

    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_map_colors() {
        let r = Raster::from_vec(vec![0u8, 1, 4, 9], 2, 2).unwrap();
        let params = ColormapParams::with_range(ColorScheme::Tab10, 0.0, 9.0);
        let rgba = raster_to_rgba(&r, &params);

        assert_eq!(rgba.len(), 16);
        assert_eq!(&rgba[0..4], &[31, 119, 180, 255]);
        assert_eq!(&rgba[4..8], &[255, 127, 14, 255]);
        assert_eq!(&rgba[8..12], &[148, 103, 189, 255]);
        assert_eq!(&rgba[12..16], &[23, 190, 207, 255]);
    }

    #[test]
    fn nan_is_transparent() {
        let r = Raster::from_vec(vec![-1.0, f64::NAN, 1.0], 1, 3).unwrap();
        let params = ColormapParams::with_range(ColorScheme::Ndvi, -1.0, 1.0);
        let rgba = raster_to_rgba(&r, &params);

        assert_eq!(&rgba[0..4], &[120, 70, 20, 255]);
        assert_eq!(&rgba[4..8], &[0, 0, 0, 0]);
        assert_eq!(&rgba[8..12], &[10, 100, 20, 255]);
    }

    #[test]
    fn degenerate_range_does_not_divide_by_zero() {
        let r = Raster::filled(1, 2, 0.5);
        let params = ColormapParams::with_range(ColorScheme::Ndvi, 0.5, 0.5);
        let rgba = raster_to_rgba(&r, &params);
        assert_eq!(&rgba[0..4], &[120, 70, 20, 255]);
    }
}
