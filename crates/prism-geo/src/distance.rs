//! Degree-space distance arithmetic for proximity queries.
//!
//! Queries are defined in planar WGS84 degree space with a fixed
//! meters-per-degree conversion. The constant is the equatorial value, so
//! distances reported at high latitudes overstate the true longitudinal
//! separation. This is a documented limitation of the query contract, kept
//! deliberately rather than silently replaced with geodesic distance.

use geo::{Distance, Euclidean, Geometry as GeoGeometry, Point};
use prism_core::models::{GeoPoint, Geometry};

use crate::convert::to_geo_geometry;

/// Meters per degree at the equator, the fixed conversion used by queries.
pub const DEGREE_METERS: f64 = 111_000.0;

/// Convert a query radius in meters to an angular buffer in degrees.
pub fn buffer_degrees(radius_meters: f64) -> f64 {
    radius_meters / DEGREE_METERS
}

/// Convert a degree-space distance back to meters.
pub fn degrees_to_meters(degrees: f64) -> f64 {
    degrees * DEGREE_METERS
}

/// Planar (degree-space) distance between a geometry and a query point.
///
/// Zero when the point lies on or inside the geometry.
pub fn planar_degree_distance(geometry: &Geometry, point: &GeoPoint) -> f64 {
    let geom = to_geo_geometry(geometry);
    let target = GeoGeometry::Point(Point::new(point.lng, point.lat));
    Euclidean.distance(&geom, &target)
}
