//! Canonical geometry types used across all prism crates.
//!
//! These types provide a bridge between the GeoJSON text form persisted in
//! the feature store and the computational `geo` crate types.

use serde::{Deserialize, Serialize};

/// String-keyed property map attached to every feature.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// A query location in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Axis-aligned bounding box in WGS84 degrees: `[min_lon, min_lat, max_lon, max_lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self { min_lon, min_lat, max_lon, max_lat }
    }

    /// Square box of half-width `buffer_degrees` centered on a point.
    pub fn around(point: &GeoPoint, buffer_degrees: f64) -> Self {
        Self {
            min_lon: point.lng - buffer_degrees,
            min_lat: point.lat - buffer_degrees,
            max_lon: point.lng + buffer_degrees,
            max_lat: point.lat + buffer_degrees,
        }
    }

    /// True if the two boxes overlap in both dimensions.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        let lon_overlap = self.min_lon <= other.max_lon && self.max_lon >= other.min_lon;
        let lat_overlap = self.min_lat <= other.max_lat && self.max_lat >= other.min_lat;
        lon_overlap && lat_overlap
    }

    /// False when any corner is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.min_lon.is_finite()
            && self.min_lat.is_finite()
            && self.max_lon.is_finite()
            && self.max_lat.is_finite()
    }
}

/// GeoJSON-compatible geometry representation
///
/// This enum directly maps to GeoJSON geometry types with coordinate arrays,
/// so its serde form is the exact text stored in the `geometry` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: [f64; 2],
    },
    LineString {
        coordinates: Vec<[f64; 2]>,
    },
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPoint {
        coordinates: Vec<[f64; 2]>,
    },
    MultiLineString {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },
}

impl Geometry {
    /// Create a Point geometry
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point { coordinates: [x, y] }
    }

    /// Create a LineString geometry
    pub fn line_string(coords: Vec<[f64; 2]>) -> Self {
        Geometry::LineString { coordinates: coords }
    }

    /// Create a Polygon geometry
    pub fn polygon(rings: Vec<Vec<[f64; 2]>>) -> Self {
        Geometry::Polygon { coordinates: rings }
    }
}
