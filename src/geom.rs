use geo::{BoundingRect, Closest, Distance, Haversine, HaversineClosestPoint};
use geo_types::{coord, Geometry, LineString, MultiPolygon, Point, Rect};
use tracing::warn;
use wkt::TryFromWkt;


/// Horizontal footprint of an airspace volume, in geographic coordinates
/// (x = longitude, y = latitude, degrees).
pub type Shape = MultiPolygon<f64>;

/// Axis-aligned envelope of a shape or trajectory.
pub type BBox = Rect<f64>;

/// Planar operations needed from a horizontal shape.
pub trait ShapeGeometry {
    /// Exact point-in-shape test using the ray-casting parity rule.
    fn contains_point(&self, x: f64, y: f64) -> bool;

    /// Axis-aligned envelope over all vertices. Degenerates to the
    /// zero-area box at the origin when the shape has no vertices.
    fn envelope(&self) -> BBox;

    /// Geodesic distance in metres from the point to the shape, zero when
    /// the point lies inside.
    fn boundary_distance(&self, x: f64, y: f64) -> f64;
}

impl ShapeGeometry for MultiPolygon<f64> {
    fn contains_point(&self, x: f64, y: f64) -> bool {
        // every ring toggles parity, so holes and disjoint parts fall out naturally
        let mut inside = false;
        for polygon in &self.0 {
            for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
                if ring_crossings(ring, x, y) % 2 == 1 {
                    inside = !inside;
                }
            }
        }
        inside
    }

    fn envelope(&self) -> BBox {
        self.bounding_rect()
            .unwrap_or_else(|| Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 0.0, y: 0.0 }))
    }

    fn boundary_distance(&self, x: f64, y: f64) -> f64 {
        if self.contains_point(x, y) {
            return 0.0;
        }
        let from = Point::new(x, y);
        self.0
            .iter()
            .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
            .filter_map(|ring| match ring.haversine_closest_point(&from) {
                Closest::Intersection(p) | Closest::SinglePoint(p) => {
                    Some(Haversine::distance(from, p))
                }
                Closest::Indeterminate => None,
            })
            .fold(f64::INFINITY, f64::min)
    }
}

/// Counts the ring edges crossed by a ray from `(x, y)` towards +x.
/// An edge spans the ray when exactly one endpoint lies strictly above it,
/// so a vertex shared by two edges is only counted once.
fn ring_crossings(ring: &LineString<f64>, x: f64, y: f64) -> usize {
    ring.lines()
        .filter(|edge| {
            let (a, b) = (edge.start, edge.end);
            (a.y > y) != (b.y > y) && x < (b.x - a.x) * (y - a.y) / (b.y - a.y) + a.x
        })
        .count()
}

/// Cheap rectangular pre-check, inclusive on every side.
pub fn bbox_contains(bbox: &BBox, x: f64, y: f64) -> bool {
    let (min, max) = (bbox.min(), bbox.max());
    x >= min.x && x <= max.x && y >= min.y && y <= max.y
}

/// Parses a WKT polygon or multipolygon into a [`Shape`].
/// Anything else, including unparsable text, becomes an empty shape.
pub fn shape_from_wkt(wkt: &str) -> Shape {
    match Geometry::<f64>::try_from_wkt_str(wkt) {
        Ok(geometry) => shape_from_geometry(geometry),
        Err(err) => {
            warn!("unparsable airspace geometry, treating as empty: {}", err);
            MultiPolygon(vec![])
        }
    }
}

fn shape_from_geometry(geometry: Geometry<f64>) -> Shape {
    match geometry {
        Geometry::Polygon(polygon) => MultiPolygon(vec![polygon]),
        Geometry::MultiPolygon(multi) => multi,
        Geometry::Rect(rect) => MultiPolygon(vec![rect.to_polygon()]),
        Geometry::GeometryCollection(collection) => MultiPolygon(
            collection
                .into_iter()
                .flat_map(|geometry| shape_from_geometry(geometry).0)
                .collect(),
        ),
        other => {
            warn!(
                "airspace geometry is not polygonal, treating as empty: {:?}",
                other
            );
            MultiPolygon(vec![])
        }
    }
}
