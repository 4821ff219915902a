//! Bounding-box spatial index over airspace envelopes.
//!
//! Backed by an `rstar` R*-tree. Entries are only ever inserted; every query
//! is broad-phase and knows nothing about the exact shapes.

use rstar::{Envelope, PointDistance, RTree, RTreeObject, AABB};

use crate::geom::BBox;

#[cfg(test)]
mod tests {

    use super::*;
    use geo_types::{coord, Rect};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> BBox {
        Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 })
    }

    fn sorted(mut ids: Vec<usize>) -> Vec<usize> {
        ids.sort_unstable();
        ids
    }

    fn grid() -> SpatialIndex {
        let mut index = SpatialIndex::new();
        index.insert(&rect(0.0, 0.0, 2.0, 2.0), 0);
        index.insert(&rect(2.0, 0.0, 4.0, 2.0), 1);
        index.insert(&rect(10.0, 10.0, 12.0, 12.0), 2);
        index.insert(&rect(1.0, 1.0, 3.0, 3.0), 3);
        index
    }

    #[test]
    fn point_query_is_inclusive() {
        let index = grid();
        assert_eq!(sorted(index.query_point(1.5, 1.5)), vec![0, 3]);
        // on the shared edge both envelopes match
        assert_eq!(sorted(index.query_point(2.0, 0.5)), vec![0, 1]);
        assert!(index.query_point(7.0, 7.0).is_empty());
    }

    #[test]
    fn box_query_intersects() {
        let index = grid();
        assert_eq!(
            sorted(index.query_box(&rect(2.5, 1.5, 11.0, 11.0))),
            vec![1, 2, 3]
        );
        assert!(index.query_box(&rect(20.0, 20.0, 21.0, 21.0)).is_empty());
    }

    #[test]
    fn nearest_is_ordered_by_envelope_distance() {
        let index = grid();
        let nearest = index.query_k_nearest(9.0, 9.0, 2);
        assert_eq!(nearest[0], 2);
        assert_eq!(nearest[1], 3);
        assert_eq!(index.query_k_nearest(9.0, 9.0, 10).len(), 4);
        assert!(index.query_k_nearest(9.0, 9.0, 0).is_empty());
    }
}

/// An envelope tagged with the id of the volume it bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: usize,
    envelope: AABB<[f64; 2]>,
}

impl IndexEntry {
    pub fn new(bbox: &BBox, id: usize) -> Self {
        let (min, max) = (bbox.min(), bbox.max());
        Self {
            id,
            envelope: AABB::from_corners([min.x, min.y], [max.x, max.y]),
        }
    }
}

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl PointDistance for IndexEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        self.envelope.distance_2(point)
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        self.envelope.contains_point(point)
    }
}

/// Insert-only R*-tree of `(bbox, id)` entries.
#[derive(Debug, Default)]
pub struct SpatialIndex {
    tree: RTree<IndexEntry>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    pub fn insert(&mut self, bbox: &BBox, id: usize) {
        self.tree.insert(IndexEntry::new(bbox, id));
    }

    /// Ids of every entry whose envelope contains the point.
    pub fn query_point(&self, x: f64, y: f64) -> Vec<usize> {
        self.tree
            .locate_all_at_point(&[x, y])
            .map(|entry| entry.id)
            .collect()
    }

    /// Ids of every entry whose envelope intersects the box.
    pub fn query_box(&self, bbox: &BBox) -> Vec<usize> {
        let query = IndexEntry::new(bbox, usize::MAX).envelope;
        self.tree
            .locate_in_envelope_intersecting(&query)
            .map(|entry| entry.id)
            .collect()
    }

    /// The `k` entries whose envelopes are nearest the point, closest first.
    pub fn query_k_nearest(&self, x: f64, y: f64, k: usize) -> Vec<usize> {
        self.tree
            .nearest_neighbor_iter(&[x, y])
            .take(k)
            .map(|entry| entry.id)
            .collect()
    }
}
