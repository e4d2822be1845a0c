//! # landchange Core
//!
//! Core types and I/O shared by the landchange crates.
//!
//! This crate provides:
//! - `Raster<T>`: Generic georeferenced grid
//! - `BandStack`: Ordered multi-band image (Red, Green, Blue, NIR)
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `CRS`: Coordinate Reference System handling
//! - `Aoi`: Area-of-interest polygon used to clip band stacks
//! - GeoTIFF band-stack reading and writing

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{Band, BandStack, GeoTransform, Raster, RasterElement, BAND_COUNT};
pub use vector::Aoi;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{Band, BandStack, GeoTransform, Raster, RasterElement, BAND_COUNT};
    pub use crate::vector::Aoi;
}
