//! PNG output of rendered rasters

use crate::render::{raster_to_rgba, ColormapParams};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use landchange_core::raster::{Raster, RasterElement};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use thiserror::Error;

/// Failure to produce an image file
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PNG encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("RGBA buffer holds {actual} bytes, {width}x{height} needs {expected}")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("cannot render an empty {width}x{height} image")]
    Empty { width: u32, height: u32 },
}

/// Write an RGBA8 buffer as a PNG file
pub fn write_png<P: AsRef<Path>>(path: P, rgba: &[u8], width: u32, height: u32) -> Result<(), RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::Empty { width, height });
    }
    let expected = width as usize * height as usize * 4;
    if rgba.len() != expected {
        return Err(RenderError::BufferSize {
            width,
            height,
            expected,
            actual: rgba.len(),
        });
    }

    let output = BufWriter::new(File::create(path.as_ref())?);
    let encoder = PngEncoder::new(output);
    encoder.write_image(rgba, width, height, ExtendedColorType::Rgba8)?;
    Ok(())
}

/// Colorize a raster and write it as a PNG, one image pixel per cell
pub fn render_png<T, P>(raster: &Raster<T>, params: &ColormapParams, path: P) -> Result<(), RenderError>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let rgba = raster_to_rgba(raster, params);
    write_png(path, &rgba, raster.cols() as u32, raster.rows() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ColorScheme;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    #[test]
    fn writes_png_with_raster_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("class_map.png");
        let raster = Raster::from_vec(vec![0u8, 1, 2, 3, 4, 0], 2, 3).unwrap();

        render_png(&raster, &ColormapParams::with_range(ColorScheme::Tab10, 0.0, 9.0), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], &PNG_SIGNATURE);
        // IHDR width and height, big endian
        assert_eq!(&bytes[16..20], &3u32.to_be_bytes());
        assert_eq!(&bytes[20..24], &2u32.to_be_bytes());
    }

    #[test]
    fn rejects_bad_buffers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.png");
        assert!(matches!(
            write_png(&path, &[0u8; 12], 2, 2),
            Err(RenderError::BufferSize { expected: 16, .. })
        ));
        assert!(matches!(write_png(&path, &[], 0, 2), Err(RenderError::Empty { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn missing_directory_is_io_error() {
        let raster = Raster::filled(1, 1, 1u8);
        let params = ColormapParams::with_range(ColorScheme::Tab10, 0.0, 9.0);
        let result = render_png(&raster, &params, "/nonexistent/dir/out.png");
        assert!(matches!(result, Err(RenderError::Io(_))));
    }
}
