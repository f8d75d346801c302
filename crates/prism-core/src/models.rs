//! Canonical domain models

pub mod feature;
pub mod geometry;

pub use feature::{Collection, FeatureKey, IncomingFeature, StoredFeature};
pub use geometry::{BoundingBox, GeoPoint, Geometry, Properties};
