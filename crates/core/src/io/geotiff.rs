//! Multi-band GeoTIFF reading/writing with the `tiff` crate
//!
//! Supports pixel-interleaved (chunky) TIFFs with any number of samples
//! per pixel. Georeferencing is taken from ModelPixelScale + ModelTiepoint
//! (or ModelTransformation), the CRS from the GeoKeyDirectory EPSG code and
//! nodata from the GDAL_NODATA tag.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{BandStack, GeoTransform};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::colortype::{self, ColorType};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

/// Read every band of a GeoTIFF into a [`BandStack`].
///
/// Nodata cells (GDAL_NODATA match or non-finite) become NaN.
pub fn read_band_stack<P: AsRef<Path>>(path: P) -> Result<BandStack> {
    let file = BufReader::new(File::open(path.as_ref())?);
    decode_band_stack(file)
}

/// Decode a band stack from any `Read + Seek` source
pub fn decode_band_stack<R: Read + Seek>(reader: R) -> Result<BandStack> {
    let mut decoder = Decoder::new(reader)?.with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions()?;
    let (rows, cols) = (height as usize, width as usize);

    let mut samples = match decoder.read_image()? {
        DecodingResult::U8(buf) => to_f64(buf),
        DecodingResult::U16(buf) => to_f64(buf),
        DecodingResult::U32(buf) => to_f64(buf),
        DecodingResult::I8(buf) => to_f64(buf),
        DecodingResult::I16(buf) => to_f64(buf),
        DecodingResult::I32(buf) => to_f64(buf),
        DecodingResult::F32(buf) => to_f64(buf),
        DecodingResult::F64(buf) => buf,
        _ => return Err(Error::UnsupportedDataType("unsupported TIFF sample format".into())),
    };

    let cells = rows * cols;
    if cells == 0 || samples.len() % cells != 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }
    let samples_per_pixel = samples.len() / cells;

    if let Some(nodata) = read_nodata(&mut decoder) {
        for v in samples.iter_mut().filter(|v| **v == nodata) {
            *v = f64::NAN;
        }
    }
    for v in samples.iter_mut().filter(|v| !v.is_finite()) {
        *v = f64::NAN;
    }

    let transform = read_geotransform(&mut decoder).unwrap_or_default();
    let crs = read_crs(&mut decoder);

    BandStack::from_interleaved(&samples, samples_per_pixel, rows, cols, transform, crs)
}

/// Named `Tag` variant for a GeoTIFF tag code. Lookups match on the
/// variant, so `Tag::Unknown(33550)` is never found.
fn geo_tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

fn to_f64<T: Into<f64>>(buf: Vec<T>) -> Vec<f64> {
    buf.into_iter().map(Into::into).collect()
}

/// GeoTransform from pixel scale + tiepoint, or from the 4x4 model transformation
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(geo_tag(MODEL_PIXEL_SCALE)).ok();
    let tiepoint = decoder.get_tag_f64_vec(geo_tag(MODEL_TIEPOINT)).ok();

    if let (Some(scale), Some(tiepoint)) = (scale, tiepoint) {
        if scale.len() >= 2 && tiepoint.len() >= 6 {
            // tiepoint: [I, J, K, X, Y, Z]; scale: [ScaleX, ScaleY, ScaleZ]
            let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
            let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
            return Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
        }
    }

    let t = decoder.get_tag_f64_vec(geo_tag(MODEL_TRANSFORMATION)).ok()?;
    if t.len() < 16 {
        return None;
    }
    Some(GeoTransform {
        origin_x: t[3],
        origin_y: t[7],
        pixel_width: t[0],
        pixel_height: t[5],
        row_rotation: t[1],
        col_rotation: t[4],
    })
}

/// EPSG code from ProjectedCSTypeGeoKey or GeographicTypeGeoKey
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder.get_tag_u16_vec(geo_tag(GEO_KEY_DIRECTORY)).ok()?;
    // Header: [version, revision, minor, count], then 4 shorts per key:
    // [key_id, tiff_tag_location, count, value_or_index]
    let count = *keys.get(3)? as usize;
    keys.get(4..)?
        .chunks_exact(4)
        .take(count)
        .find(|entry| {
            matches!(entry[0], PROJECTED_CS_TYPE_KEY | GEOGRAPHIC_TYPE_KEY)
                && entry[1] == 0
                && entry[3] > 0
                && entry[3] != 32767
        })
        .map(|entry| CRS::from_epsg(u32::from(entry[3])))
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder.get_tag_ascii_string(geo_tag(GDAL_NODATA)).ok()?;
    text.trim_end_matches('\0').trim().parse::<f64>().ok()
}

/// Write a 1, 3 or 4 band stack as a 32-bit float GeoTIFF
pub fn write_band_stack<P: AsRef<Path>>(stack: &BandStack, path: P) -> Result<()> {
    let mut file = BufWriter::new(File::create(path.as_ref())?);
    encode_band_stack(stack, &mut file)?;
    file.flush()?;
    Ok(())
}

/// Encode a band stack into any `Write + Seek` sink
pub fn encode_band_stack<W: Write + Seek>(stack: &BandStack, writer: W) -> Result<()> {
    if stack.is_empty() {
        return Err(Error::InvalidDimensions {
            width: stack.cols(),
            height: stack.rows(),
        });
    }
    let mut encoder = TiffEncoder::new(writer)?;
    match stack.band_count() {
        1 => write_image::<colortype::Gray32Float, W>(&mut encoder, stack),
        3 => write_image::<colortype::RGB32Float, W>(&mut encoder, stack),
        4 => write_image::<colortype::RGBA32Float, W>(&mut encoder, stack),
        n => Err(Error::UnsupportedDataType(format!(
            "cannot encode {} bands; expected 1, 3 or 4",
            n
        ))),
    }
}

fn write_image<C, W>(encoder: &mut TiffEncoder<W>, stack: &BandStack) -> Result<()>
where
    C: ColorType<Inner = f32>,
    W: Write + Seek,
{
    let data: Vec<f32> = stack.to_interleaved().into_iter().map(|v| v as f32).collect();
    let mut image = encoder.new_image::<C>(stack.cols() as u32, stack.rows() as u32)?;

    let gt = stack.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image.encoder().write_tag(geo_tag(MODEL_PIXEL_SCALE), &scale[..])?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image.encoder().write_tag(geo_tag(MODEL_TIEPOINT), &tiepoint[..])?;

    let geokeys = geo_key_directory(stack.crs());
    image.encoder().write_tag(geo_tag(GEO_KEY_DIRECTORY), &geokeys[..])?;

    image.write_data(&data)?;
    Ok(())
}

/// Minimal GeoKeyDirectory: model type, raster type (PixelIsArea) and,
/// when known, the EPSG code.
fn geo_key_directory(crs: Option<&CRS>) -> Vec<u16> {
    let epsg = crs
        .and_then(CRS::epsg)
        .and_then(|code| u16::try_from(code).ok());
    let geographic = crs.map(CRS::is_geographic).unwrap_or(false);
    let model_type = if geographic { 2 } else { 1 };

    let mut keys: Vec<u16> = vec![
        GT_MODEL_TYPE_KEY, 0, 1, model_type,
        GT_RASTER_TYPE_KEY, 0, 1, 1,
    ];
    if let Some(code) = epsg {
        let key = if geographic { GEOGRAPHIC_TYPE_KEY } else { PROJECTED_CS_TYPE_KEY };
        keys.extend_from_slice(&[key, 0, 1, code]);
    }

    let mut directory = vec![1, 1, 0, (keys.len() / 4) as u16];
    directory.extend(keys);
    directory
}
