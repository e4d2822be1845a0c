//! Multi-band image stack
//!
//! A [`BandStack`] holds the co-registered bands of one acquisition in a
//! fixed order (Red, Green, Blue, NIR). Every band shares the stack's
//! geotransform and CRS.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};
use crate::vector::Aoi;
use ndarray::{s, Array2};

/// Number of bands an analysis stack carries
pub const BAND_COUNT: usize = 4;

/// Tolerance for comparing geotransform coefficients of two stacks
const TRANSFORM_TOLERANCE: f64 = 1e-9;

/// Fractional pixel positions closer than this to an integer are snapped
const PIXEL_SNAP: f64 = 1e-6;

/// Spectral band positions within a [`BandStack`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    Red,
    Green,
    Blue,
    Nir,
}

impl Band {
    /// All bands in stack order
    pub const ALL: [Band; BAND_COUNT] = [Band::Red, Band::Green, Band::Blue, Band::Nir];

    /// Position of the band in the stack
    pub fn index(self) -> usize {
        match self {
            Band::Red => 0,
            Band::Green => 1,
            Band::Blue => 2,
            Band::Nir => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Band::Red => "Red",
            Band::Green => "Green",
            Band::Blue => "Blue",
            Band::Nir => "NIR",
        }
    }
}

/// Ordered stack of same-shaped `f64` bands with shared georeferencing
#[derive(Debug, Clone, PartialEq)]
pub struct BandStack {
    bands: Vec<Raster<f64>>,
    rows: usize,
    cols: usize,
    transform: GeoTransform,
    crs: Option<CRS>,
}

impl BandStack {
    /// Build a stack from bands of identical shape.
    ///
    /// Each band's transform and CRS are overwritten with the stack's.
    pub fn new(mut bands: Vec<Raster<f64>>, transform: GeoTransform, crs: Option<CRS>) -> Result<Self> {
        let (rows, cols) = bands.first().map(Raster::shape).unwrap_or((0, 0));
        for band in bands.iter_mut() {
            if band.shape() != (rows, cols) {
                return Err(Error::SizeMismatch {
                    er: rows,
                    ec: cols,
                    ar: band.rows(),
                    ac: band.cols(),
                });
            }
            band.set_transform(transform);
            band.set_crs(crs.clone());
        }
        Ok(Self {
            bands,
            rows,
            cols,
            transform,
            crs,
        })
    }

    /// An empty (0 x 0) stack that still records its band count
    pub fn empty(band_count: usize, transform: GeoTransform, crs: Option<CRS>) -> Self {
        let bands = (0..band_count).map(|_| Raster::new(0, 0)).collect();
        Self {
            bands,
            rows: 0,
            cols: 0,
            transform,
            crs,
        }
    }

    /// Build a stack from pixel-interleaved samples (`samples_per_pixel` values per cell)
    pub fn from_interleaved(
        samples: &[f64],
        samples_per_pixel: usize,
        rows: usize,
        cols: usize,
        transform: GeoTransform,
        crs: Option<CRS>,
    ) -> Result<Self> {
        if samples_per_pixel == 0 || samples.len() != rows * cols * samples_per_pixel {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        let bands = (0..samples_per_pixel)
            .map(|b| {
                let data = samples
                    .iter()
                    .skip(b)
                    .step_by(samples_per_pixel)
                    .copied()
                    .collect();
                Raster::from_vec(data, rows, cols)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(bands, transform, crs)
    }

    // Dimensions

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Dimensions as (bands, rows, cols)
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.band_count(), self.rows, self.cols)
    }

    /// Total number of samples across all bands
    pub fn len(&self) -> usize {
        self.band_count() * self.rows * self.cols
    }

    /// Whether the stack holds no samples at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Access

    pub fn bands(&self) -> &[Raster<f64>] {
        &self.bands
    }

    /// Band at position `index`
    pub fn band_at(&self, index: usize) -> Result<&Raster<f64>> {
        self.bands.get(index).ok_or(Error::BandCountMismatch {
            expected: index + 1,
            actual: self.band_count(),
        })
    }

    /// Named spectral band
    pub fn band(&self, band: Band) -> Result<&Raster<f64>> {
        self.band_at(band.index())
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols, self.rows)
    }

    /// Pixel-interleaved samples in row-major order
    pub fn to_interleaved(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.len());
        for row in 0..self.rows {
            for col in 0..self.cols {
                out.extend(self.bands.iter().map(|band| band.data()[(row, col)]));
            }
        }
        out
    }

    // Validation

    /// Require exactly `expected` bands
    pub fn require_band_count(&self, expected: usize) -> Result<()> {
        if self.band_count() != expected {
            return Err(Error::BandCountMismatch {
                expected,
                actual: self.band_count(),
            });
        }
        Ok(())
    }

    /// Check that `other` can be compared pixel-for-pixel with this stack:
    /// same band count, same shape, same geotransform and, when both are
    /// known, the same CRS.
    pub fn check_aligned(&self, other: &BandStack) -> Result<()> {
        other.require_band_count(self.band_count())?;
        if (self.rows, self.cols) != (other.rows, other.cols) {
            return Err(Error::SizeMismatch {
                er: self.rows,
                ec: self.cols,
                ar: other.rows,
                ac: other.cols,
            });
        }
        if !self.transform.approx_eq(&other.transform, TRANSFORM_TOLERANCE) {
            return Err(Error::TransformMismatch(
                self.transform.to_gdal(),
                other.transform.to_gdal(),
            ));
        }
        if let (Some(a), Some(b)) = (&self.crs, &other.crs) {
            if !a.is_equivalent(b) {
                return Err(Error::CrsMismatch(a.identifier(), b.identifier()));
            }
        }
        Ok(())
    }

    // Windowing

    /// Copy out the window starting at (`row_off`, `col_off`) with the given size
    pub fn window(&self, row_off: usize, col_off: usize, rows: usize, cols: usize) -> Result<BandStack> {
        if row_off + rows > self.rows || col_off + cols > self.cols {
            return Err(Error::IndexOutOfBounds {
                row: row_off + rows,
                col: col_off + cols,
                rows: self.rows,
                cols: self.cols,
            });
        }
        let bands = self
            .bands
            .iter()
            .map(|band| {
                let data = band
                    .view()
                    .slice(s![row_off..row_off + rows, col_off..col_off + cols])
                    .to_owned();
                Raster::from_array(data)
            })
            .collect();
        BandStack::new(bands, self.transform.window(col_off, row_off), self.crs.clone())
    }

    /// Crop the stack to the pixel window covering `aoi`.
    ///
    /// The window spans the polygon's bounding box intersected with the
    /// raster extent. Cells whose centre falls outside the polygon are set
    /// to NaN, even when that is every cell of the window. Only a polygon
    /// that misses the raster extent yields an empty stack, never an error.
    pub fn clip_to_aoi(&self, aoi: &Aoi) -> Result<BandStack> {
        let empty = || BandStack::empty(self.band_count(), self.transform, self.crs.clone());
        if self.is_empty() {
            return Ok(empty());
        }

        let Some((row_range, col_range)) = self.pixel_window(aoi) else {
            return Ok(empty());
        };

        let (rows, cols) = (row_range.len(), col_range.len());
        let mask = Array2::from_shape_fn((rows, cols), |(r, c)| {
            let (x, y) = self.transform.pixel_to_geo(col_range.start + c, row_range.start + r);
            aoi.covers(x, y)
        });

        let mut clipped = self.window(row_range.start, col_range.start, rows, cols)?;
        for band in clipped.bands.iter_mut() {
            ndarray::Zip::from(band.data_mut())
                .and(&mask)
                .for_each(|value, &inside| {
                    if !inside {
                        *value = f64::NAN;
                    }
                });
        }
        Ok(clipped)
    }

    /// Row and column ranges of the AOI bounding box, clamped to the raster
    fn pixel_window(&self, aoi: &Aoi) -> Option<(std::ops::Range<usize>, std::ops::Range<usize>)> {
        let (min_x, min_y, max_x, max_y) = aoi.bounds();
        let corners = [
            self.transform.geo_to_pixel(min_x, min_y),
            self.transform.geo_to_pixel(max_x, min_y),
            self.transform.geo_to_pixel(min_x, max_y),
            self.transform.geo_to_pixel(max_x, max_y),
        ];
        if corners.iter().any(|(c, r)| !c.is_finite() || !r.is_finite()) {
            return None;
        }

        let fold = |pick: fn(&(f64, f64)) -> f64| {
            corners.iter().map(pick).fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            })
        };
        let (col_lo, col_hi) = fold(|p| p.0);
        let (row_lo, row_hi) = fold(|p| p.1);

        let cols = clamp_range(col_lo, col_hi, self.cols)?;
        let rows = clamp_range(row_lo, row_hi, self.rows)?;
        Some((rows, cols))
    }
}

/// Convert a fractional pixel interval to an index range within `0..len`
fn clamp_range(lo: f64, hi: f64, len: usize) -> Option<std::ops::Range<usize>> {
    let start = snap(lo).floor().max(0.0);
    let end = snap(hi).ceil().min(len as f64);
    if start >= end {
        return None;
    }
    Some(start as usize..end as usize)
}

fn snap(v: f64) -> f64 {
    let rounded = v.round();
    if (v - rounded).abs() < PIXEL_SNAP {
        rounded
    } else {
        v
    }
}
