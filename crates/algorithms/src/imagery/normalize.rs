//! Per-band min-max normalization
//!
//! Before and after scenes are normalized independently, band by band, so
//! absolute brightness differences between acquisition dates drop out while
//! contrast within each image is kept.

use landchange_core::raster::{BandStack, Raster};
use landchange_core::Result;

/// Bands whose valid range is at or below this are treated as constant
pub const MIN_BAND_RANGE: f64 = 1e-8;

/// Rescale a band to [0, 1] using its finite min and max.
///
/// Constant (or entirely invalid) bands become all zeros. Non-finite cells
/// of a non-constant band stay NaN.
pub fn normalize_band(band: &Raster<f64>) -> Raster<f64> {
    let stats = band.statistics();
    let (min, max) = match (stats.min, stats.max) {
        (Some(min), Some(max)) => (min, max),
        _ => return band.map(|_| 0.0),
    };

    let range = max - min;
    if range <= MIN_BAND_RANGE {
        return band.map(|_| 0.0);
    }

    band.map(|v| (v - min) / range)
}

/// Normalize every band of a stack independently
pub fn normalize_stack(stack: &BandStack) -> Result<BandStack> {
    let bands = stack.bands().iter().map(normalize_band).collect();
    BandStack::new(bands, *stack.transform(), stack.crs().cloned())
}
