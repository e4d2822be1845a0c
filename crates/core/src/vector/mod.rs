//! Area-of-interest polygons
//!
//! An [`Aoi`] is a single polygon expressed in the raster's CRS. It is
//! built from a bounding box (the shape web clients send) or from a
//! GeoJSON `Polygon`, `Feature` or single-feature `FeatureCollection`.

use crate::error::{Error, Result};
use geo::{BoundingRect, Intersects, LineString, Point, Polygon};
use geojson::GeoJson;

/// Area of interest: one polygon in the raster's CRS
#[derive(Debug, Clone, PartialEq)]
pub struct Aoi {
    polygon: Polygon<f64>,
}

impl Aoi {
    /// Wrap a polygon, rejecting empty or non-finite geometry
    pub fn new(polygon: Polygon<f64>) -> Result<Self> {
        let exterior = polygon.exterior();
        if exterior.0.len() < 4 {
            return Err(Error::InvalidGeometry(format!(
                "polygon exterior needs at least 3 distinct vertices, got {}",
                exterior.0.len().saturating_sub(1)
            )));
        }
        let all_finite = std::iter::once(exterior)
            .chain(polygon.interiors().iter())
            .flat_map(|ring| ring.coords())
            .all(|c| c.x.is_finite() && c.y.is_finite());
        if !all_finite {
            return Err(Error::InvalidGeometry("polygon has non-finite coordinates".into()));
        }
        Ok(Self { polygon })
    }

    /// Rectangle AOI from `west, south, east, north` bounds
    pub fn from_bounds(west: f64, south: f64, east: f64, north: f64) -> Result<Self> {
        if !(west < east && south < north) {
            return Err(Error::InvalidGeometry(format!(
                "bounds must satisfy west < east and south < north, got ({}, {}, {}, {})",
                west, south, east, north
            )));
        }
        let ring = LineString::from(vec![
            (west, south),
            (east, south),
            (east, north),
            (west, north),
            (west, south),
        ]);
        Self::new(Polygon::new(ring, vec![]))
    }

    /// Parse a GeoJSON `Polygon` geometry, a `Feature` wrapping one, or a
    /// `FeatureCollection` holding exactly one such feature.
    pub fn from_geojson(text: &str) -> Result<Self> {
        let geojson: GeoJson = text
            .parse()
            .map_err(|e| Error::InvalidGeometry(format!("invalid GeoJSON: {}", e)))?;

        let geometry = match geojson {
            GeoJson::Geometry(geometry) => Some(geometry),
            GeoJson::Feature(feature) => feature.geometry,
            GeoJson::FeatureCollection(collection) => {
                let mut features = collection.features;
                if features.len() != 1 {
                    return Err(Error::InvalidGeometry(format!(
                        "expected exactly one feature, got {}",
                        features.len()
                    )));
                }
                features.remove(0).geometry
            }
        }
        .ok_or_else(|| Error::InvalidGeometry("feature without geometry".into()))?;

        let polygon = Polygon::<f64>::try_from(geometry.value)
            .map_err(|e| Error::InvalidGeometry(format!("expected a Polygon: {}", e)))?;
        Self::new(polygon)
    }

    /// The underlying polygon
    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)`
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        match self.polygon.bounding_rect() {
            Some(rect) => (rect.min().x, rect.min().y, rect.max().x, rect.max().y),
            None => (f64::NAN, f64::NAN, f64::NAN, f64::NAN),
        }
    }

    /// Whether `(x, y)` lies inside or on the boundary of the polygon
    pub fn covers(&self, x: f64, y: f64) -> bool {
        self.polygon.intersects(&Point::new(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bounds_covers_interior_and_edge() {
        let aoi = Aoi::from_bounds(73.7, 18.4, 74.0, 18.65).unwrap();
        assert!(aoi.covers(73.8, 18.5));
        assert!(aoi.covers(73.7, 18.5));
        assert!(!aoi.covers(74.1, 18.5));
        assert_eq!(aoi.bounds(), (73.7, 18.4, 74.0, 18.65));
    }

    #[test]
    fn from_bounds_rejects_inverted_box() {
        assert!(Aoi::from_bounds(74.0, 18.4, 73.7, 18.65).is_err());
        assert!(Aoi::from_bounds(73.7, 18.4, 73.7, 18.65).is_err());
    }

    #[test]
    fn geojson_polygon_feature_and_collection() {
        let polygon = r#"{"type":"Polygon","coordinates":[[[0,0],[4,0],[4,4],[0,4],[0,0]]]}"#;
        let feature = format!(r#"{{"type":"Feature","properties":{{}},"geometry":{}}}"#, polygon);
        let collection = format!(r#"{{"type":"FeatureCollection","features":[{}]}}"#, feature);

        for text in [polygon.to_string(), feature, collection] {
            let aoi = Aoi::from_geojson(&text).unwrap();
            assert_eq!(aoi.bounds(), (0.0, 0.0, 4.0, 4.0));
        }
    }

    #[test]
    fn geojson_with_hole_excludes_hole() {
        let text = r#"{"type":"Polygon","coordinates":[
            [[0,0],[10,0],[10,10],[0,10],[0,0]],
            [[4,4],[6,4],[6,6],[4,6],[4,4]]
        ]}"#;
        let aoi = Aoi::from_geojson(text).unwrap();
        assert!(aoi.covers(1.0, 1.0));
        assert!(!aoi.covers(5.0, 5.0));
    }

    #[test]
    fn geojson_rejects_other_geometries() {
        assert!(Aoi::from_geojson(r#"{"type":"Point","coordinates":[1,2]}"#).is_err());
        assert!(Aoi::from_geojson(r#"{"type":"FeatureCollection","features":[]}"#).is_err());
        assert!(Aoi::from_geojson(r#"{"type":"Polygon","coordinates":[[[0,0],[1,1]]]}"#).is_err());
        assert!(Aoi::from_geojson("not json").is_err());
        assert!(Aoi::from_geojson(r#"{"type":"Feature","properties":null,"geometry":null}"#).is_err());
    }
}
