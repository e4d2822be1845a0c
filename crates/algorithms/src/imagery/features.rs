//! Before/after change feature matrix
//!
//! Each pixel becomes one row of six deltas (after minus before):
//! `[dR, dG, dB, dNDVI, dNDWI, dNBR]`. Rows follow the row-major order of
//! the H x W grid; [`FeatureMatrix::pixel_index`] and
//! [`FeatureMatrix::pixel_coords`] are the only places that order is
//! spelled out, and every reshape goes through them.

use super::indices::SpectralIndex;
use super::normalize::normalize_stack;
use crate::maybe_rayon::*;
use landchange_core::raster::{Band, BandStack, Raster, BAND_COUNT};
use landchange_core::{Error, Result};
use ndarray::{Array2, ArrayView1, ArrayView2};

/// Number of feature columns
pub const FEATURE_COUNT: usize = 6;

/// Column names, in column order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = ["dR", "dG", "dB", "dNDVI", "dNDWI", "dNBR"];

/// One column of the feature matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeFeature {
    DeltaRed,
    DeltaGreen,
    DeltaBlue,
    DeltaNdvi,
    DeltaNdwi,
    DeltaNbr,
}

impl ChangeFeature {
    pub const ALL: [ChangeFeature; FEATURE_COUNT] = [
        Self::DeltaRed,
        Self::DeltaGreen,
        Self::DeltaBlue,
        Self::DeltaNdvi,
        Self::DeltaNdwi,
        Self::DeltaNbr,
    ];

    /// Column index
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        FEATURE_NAMES[self.index()]
    }
}

/// `(H*W) x 6` feature matrix together with the grid shape it came from
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    values: Array2<f64>,
    rows: usize,
    cols: usize,
}

impl FeatureMatrix {
    /// Wrap a feature array for an H x W grid
    pub fn new(values: Array2<f64>, rows: usize, cols: usize) -> Result<Self> {
        if values.nrows() != rows * cols || values.ncols() != FEATURE_COUNT {
            return Err(Error::SizeMismatch {
                er: rows * cols,
                ec: FEATURE_COUNT,
                ar: values.nrows(),
                ac: values.ncols(),
            });
        }
        Ok(Self { values, rows, cols })
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Grid rows (H)
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Grid columns (W)
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of pixels (matrix rows)
    pub fn n_pixels(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    /// Matrix row holding grid cell (row, col)
    pub fn pixel_index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// Grid cell (row, col) of matrix row `index`
    pub fn pixel_coords(&self, index: usize) -> (usize, usize) {
        (index / self.cols, index % self.cols)
    }

    /// Features of one pixel
    pub fn pixel(&self, row: usize, col: usize) -> ArrayView1<'_, f64> {
        self.values.row(self.pixel_index(row, col))
    }

    /// One feature column
    pub fn column(&self, feature: ChangeFeature) -> ArrayView1<'_, f64> {
        self.values.column(feature.index())
    }

    /// One feature column laid back out on the H x W grid
    pub fn feature_grid(&self, feature: ChangeFeature) -> Array2<f64> {
        let column = self.column(feature);
        Array2::from_shape_fn((self.rows, self.cols), |(r, c)| column[self.pixel_index(r, c)])
    }

    /// Lay a per-pixel vector back out on the H x W grid
    pub fn reshape<T: Copy>(&self, per_pixel: &[T]) -> Result<Array2<T>> {
        if per_pixel.len() != self.n_pixels() {
            return Err(Error::SizeMismatch {
                er: self.n_pixels(),
                ec: 1,
                ar: per_pixel.len(),
                ac: 1,
            });
        }
        Ok(Array2::from_shape_fn((self.rows, self.cols), |(r, c)| {
            per_pixel[self.pixel_index(r, c)]
        }))
    }
}

/// Build the change feature matrix from two aligned four-band stacks.
///
/// Both stacks are normalized independently, indices are computed per
/// image, and every column is `after - before`. Non-finite deltas (nodata,
/// AOI mask) become 0.
pub fn build_change_features(before: &BandStack, after: &BandStack) -> Result<FeatureMatrix> {
    before.require_band_count(BAND_COUNT)?;
    before.check_aligned(after)?;

    let before_layers = feature_layers(&normalize_stack(before)?)?;
    let after_layers = feature_layers(&normalize_stack(after)?)?;

    let (rows, cols) = (before.rows(), before.cols());
    let before_views: Vec<_> = before_layers.iter().map(Raster::view).collect();
    let after_views: Vec<_> = after_layers.iter().map(Raster::view).collect();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = Vec::with_capacity(cols * FEATURE_COUNT);
            for col in 0..cols {
                for (b, a) in before_views.iter().zip(after_views.iter()) {
                    let delta = a[[row, col]] - b[[row, col]];
                    row_data.push(if delta.is_finite() { delta } else { 0.0 });
                }
            }
            row_data
        })
        .collect();

    let values = Array2::from_shape_vec((rows * cols, FEATURE_COUNT), data)
        .map_err(|e| Error::Other(e.to_string()))?;
    FeatureMatrix::new(values, rows, cols)
}

/// Per-image layers in feature column order
fn feature_layers(normalized: &BandStack) -> Result<Vec<Raster<f64>>> {
    let mut layers = Vec::with_capacity(FEATURE_COUNT);
    for band in [Band::Red, Band::Green, Band::Blue] {
        layers.push(normalized.band(band)?.clone());
    }
    for index in SpectralIndex::ALL {
        layers.push(index.compute(normalized)?);
    }
    Ok(layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use landchange_core::{GeoTransform, CRS};

    fn stack(values: [[f64; 4]; 4]) -> BandStack {
        // values[pixel][band] on a 2 x 2 grid
        let bands = (0..4)
            .map(|b| Raster::from_vec(values.iter().map(|px| px[b]).collect(), 2, 2).unwrap())
            .collect();
        BandStack::new(bands, GeoTransform::new(0.0, 2.0, 1.0, -1.0), Some(CRS::from_epsg(32643))).unwrap()
    }

    #[test]
    fn identical_images_give_zero_features() {
        let s = stack([
            [0.1, 0.2, 0.3, 0.4],
            [0.5, 0.1, 0.2, 0.9],
            [0.3, 0.3, 0.3, 0.3],
            [0.0, 0.7, 0.1, 0.2],
        ]);
        let features = build_change_features(&s, &s).unwrap();
        assert_eq!(features.values().dim(), (4, FEATURE_COUNT));
        assert!(features.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn rows_follow_row_major_order() {
        let before = stack([[0.0; 4], [0.0; 4], [0.0; 4], [0.0; 4]]);
        // red rises only at grid cell (1, 0)
        let after = stack([
            [0.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0],
        ]);
        let features = build_change_features(&before, &after).unwrap();

        assert_eq!(features.pixel_index(1, 0), 2);
        assert_eq!(features.pixel_coords(2), (1, 0));
        assert_relative_eq!(features.pixel(1, 0)[ChangeFeature::DeltaRed.index()], 1.0);
        assert_relative_eq!(features.pixel(0, 0)[ChangeFeature::DeltaRed.index()], 0.0);

        let grid = features.feature_grid(ChangeFeature::DeltaRed);
        assert_relative_eq!(grid[[1, 0]], 1.0);
        assert_relative_eq!(grid[[0, 1]], 0.0);
    }

    #[test]
    fn vegetation_loss_gives_negative_dndvi() {
        // pixel 0 pins every band's minimum at 0, pixel 1 its maximum at 1
        let before = stack([
            [0.0, 0.0, 0.0, 0.0],
            [1.0, 1.0, 1.0, 1.0],
            [0.1, 0.0, 0.0, 0.9],
            [0.1, 0.0, 0.0, 0.9],
        ]);
        let after = stack([
            [0.0, 0.0, 0.0, 0.0],
            [1.0, 1.0, 1.0, 1.0],
            [0.1, 0.0, 0.0, 0.1],
            [0.1, 0.0, 0.0, 0.1],
        ]);
        let features = build_change_features(&before, &after).unwrap();
        let px = features.pixel(1, 0);

        assert_relative_eq!(px[ChangeFeature::DeltaRed.index()], 0.0);
        assert_relative_eq!(px[ChangeFeature::DeltaNdvi.index()], -0.8, epsilon = 1e-6);
        // NDWI of (green 0, nir) is -1 both times
        assert_relative_eq!(px[ChangeFeature::DeltaNdwi.index()], 0.0, epsilon = 1e-6);
        assert_relative_eq!(px[ChangeFeature::DeltaNbr.index()], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn nan_cells_become_zero() {
        let before = stack([
            [f64::NAN, 0.0, 0.0, 0.0],
            [1.0, 1.0, 1.0, 1.0],
            [0.5, 0.5, 0.5, 0.5],
            [0.0, 0.0, 0.0, 0.0],
        ]);
        let after = stack([
            [0.0, 0.0, 0.0, 0.0],
            [1.0, 1.0, 1.0, 1.0],
            [0.5, 0.5, 0.5, 0.5],
            [0.0, 0.0, 0.0, 0.0],
        ]);
        let features = build_change_features(&before, &after).unwrap();
        assert!(features.values().iter().all(|v| v.is_finite()));
        assert_eq!(features.pixel(0, 0)[0], 0.0);
    }

    #[test]
    fn misaligned_stacks_are_rejected() {
        let before = stack([[0.0; 4]; 4]);
        let bands = (0..4).map(|_| Raster::new(3, 2)).collect();
        let after = BandStack::new(bands, *before.transform(), None).unwrap();
        let err = build_change_features(&before, &after).unwrap_err();
        assert!(err.is_alignment());

        let three = BandStack::new(before.bands()[..3].to_vec(), *before.transform(), None).unwrap();
        assert!(build_change_features(&three, &three).unwrap_err().is_alignment());
    }

    #[test]
    fn reshape_checks_length() {
        let s = stack([[0.0; 4]; 4]);
        let features = build_change_features(&s, &s).unwrap();
        let grid = features.reshape(&[1u8, 2, 3, 4]).unwrap();
        assert_eq!(grid[[1, 0]], 3);
        assert!(features.reshape(&[1u8, 2]).is_err());
    }
}
