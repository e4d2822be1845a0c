//! Band-stack I/O
//!
//! GeoTIFF reading and writing for multi-band scenes, plus
//! [`load_band_stack`] which optionally clips the scene to an AOI.

mod geotiff;

pub use geotiff::{decode_band_stack, encode_band_stack, read_band_stack, write_band_stack};

use crate::error::Result;
use crate::raster::BandStack;
use crate::vector::Aoi;
use std::path::Path;

/// Read a GeoTIFF band stack and clip it to `aoi` when given.
///
/// An AOI that does not intersect the scene yields an empty stack; callers
/// decide whether that is an error.
pub fn load_band_stack<P: AsRef<Path>>(path: P, aoi: Option<&Aoi>) -> Result<BandStack> {
    let stack = read_band_stack(path)?;
    match aoi {
        Some(aoi) => stack.clip_to_aoi(aoi),
        None => Ok(stack),
    }
}
