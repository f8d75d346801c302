//! Envelope computation for index registration.

use geo::algorithm::bounding_rect::BoundingRect;
use prism_core::models::{BoundingBox, Geometry};

use crate::convert::to_geo_geometry;

fn coord_finite(c: &[f64; 2]) -> bool {
    c[0].is_finite() && c[1].is_finite()
}

/// Every coordinate of the geometry is finite.
///
/// Checked vertex by vertex: `bounding_rect` skips non-finite coordinates
/// instead of propagating them, so a rect over a geometry with a NaN vertex
/// can come back finite while covering only part of the geometry.
fn all_coords_finite(geometry: &Geometry) -> bool {
    match geometry {
        Geometry::Point { coordinates } => coord_finite(coordinates),
        Geometry::LineString { coordinates } | Geometry::MultiPoint { coordinates } => {
            coordinates.iter().all(coord_finite)
        }
        Geometry::Polygon { coordinates } | Geometry::MultiLineString { coordinates } => {
            coordinates.iter().flatten().all(coord_finite)
        }
        Geometry::MultiPolygon { coordinates } => {
            coordinates.iter().flatten().flatten().all(coord_finite)
        }
    }
}

/// Compute the axis-aligned bounding box of a geometry.
///
/// Returns `None` for geometries with no extent (no coordinates, or any
/// non-finite coordinate). Ingestion treats that as a malformed geometry
/// and aborts the batch rather than registering an envelope that does not
/// cover the geometry.
pub fn bounding_box(geometry: &Geometry) -> Option<BoundingBox> {
    if !all_coords_finite(geometry) {
        return None;
    }

    let rect = to_geo_geometry(geometry).bounding_rect()?;
    let (min, max) = (rect.min(), rect.max());

    let bbox = BoundingBox::new(min.x, min.y, max.x, max.y);
    bbox.is_finite().then_some(bbox)
}
