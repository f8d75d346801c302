//! Prism Geo - Geometry conversions, envelopes, and distance
//!
//! Bridges the canonical GeoJSON-shaped geometry model to the `geo` crate
//! and provides the degree-space distance arithmetic the proximity queries
//! are defined in.

pub mod bbox;
pub mod convert;
pub mod distance;

pub use bbox::bounding_box;
pub use convert::to_geo_geometry;
pub use distance::{buffer_degrees, degrees_to_meters, planar_degree_distance, DEGREE_METERS};
