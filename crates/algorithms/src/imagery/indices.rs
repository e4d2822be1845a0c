//! Normalized-difference spectral indices
//!
//! Three indices are derived from the four-band stack. Blue stands in for
//! the SWIR band in the burn ratio, since the sensors this targets carry
//! no SWIR channel.

use crate::maybe_rayon::*;
use landchange_core::raster::{Band, BandStack, Raster};
use landchange_core::{Error, Result};
use ndarray::Array2;

/// Added to the denominator of every normalized difference
pub const INDEX_EPSILON: f64 = 1e-8;

/// Spectral indices used as change features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpectralIndex {
    /// NDVI: `(NIR - Red) / (NIR + Red)`
    Vegetation,
    /// NDWI (McFeeters): `(Green - NIR) / (Green + NIR)`
    Water,
    /// NBR-like burn ratio: `(NIR - Blue) / (NIR + Blue)`
    Burn,
}

impl SpectralIndex {
    pub const ALL: [SpectralIndex; 3] = [Self::Vegetation, Self::Water, Self::Burn];

    /// `(a, b)` bands of `(a - b) / (a + b)`
    pub fn bands(self) -> (Band, Band) {
        match self {
            Self::Vegetation => (Band::Nir, Band::Red),
            Self::Water => (Band::Green, Band::Nir),
            Self::Burn => (Band::Nir, Band::Blue),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Vegetation => "NDVI",
            Self::Water => "NDWI",
            Self::Burn => "NBR",
        }
    }

    /// Compute this index from a four-band stack
    pub fn compute(self, stack: &BandStack) -> Result<Raster<f64>> {
        let (a, b) = self.bands();
        normalized_difference(stack.band(a)?, stack.band(b)?)
    }
}

/// Normalized difference `clip((a - b) / (a + b + 1e-8), -1, 1)`.
///
/// Finite for any pair of finite inputs, including `a = b = 0`. NaN inputs
/// propagate.
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    let (rows, cols) = band_a.shape();
    if band_b.shape() != (rows, cols) {
        return Err(Error::SizeMismatch {
            er: rows,
            ec: cols,
            ar: band_b.rows(),
            ac: band_b.cols(),
        });
    }

    let a = band_a.view();
    let b = band_b.view();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| index_value(a[[row, col]], b[[row, col]]))
                .collect::<Vec<_>>()
        })
        .collect();

    let array = Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    band_a.with_same_meta(array)
}

#[inline]
fn index_value(a: f64, b: f64) -> f64 {
    let ratio = (a - b) / (a + b + INDEX_EPSILON);
    if ratio.is_nan() {
        ratio
    } else {
        ratio.clamp(-1.0, 1.0)
    }
}

/// NDVI from NIR and Red bands
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

/// NDWI from Green and NIR bands
pub fn ndwi(green: &Raster<f64>, nir: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(green, nir)
}

/// Burn ratio from NIR and Blue bands
pub fn nbr(nir: &Raster<f64>, blue: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, blue)
}
