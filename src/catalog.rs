//! Append-only catalog of airspace volumes mirrored into a spatial index.
//!
//! Ids are dense insertion indices starting at zero. The catalog accepts new
//! volumes while [`Lifecycle::Building`] and becomes read-only once frozen;
//! every query combines an index broad-phase with the exact volume tests.

use tracing::debug;

use crate::airspace::AirspaceVolume;
use crate::error::{AirgraphError, Result};
use crate::geom::BBox;
use crate::index::SpatialIndex;


/// Lifecycle of a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    /// Volumes may still be added.
    #[default]
    Building,
    /// Read-only; processing may begin.
    Frozen,
}

/// Ordered collection of airspace volumes with a spatial index.
#[derive(Debug, Default)]
pub struct AirspaceCatalog {
    airspaces: Vec<AirspaceVolume>,
    index: SpatialIndex,
    lifecycle: Lifecycle,
}

impl AirspaceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_frozen(&self) -> bool {
        self.lifecycle == Lifecycle::Frozen
    }

    /// Ends the building phase. Idempotent.
    pub fn freeze(&mut self) {
        if !self.is_frozen() {
            debug!("freezing catalog with {} airspaces", self.size());
            self.lifecycle = Lifecycle::Frozen;
        }
    }

    /// Appends a volume and returns its id.
    pub fn add(&mut self, airspace: AirspaceVolume) -> Result<usize> {
        if self.is_frozen() {
            return Err(AirgraphError::CatalogFrozen);
        }
        let id = self.airspaces.len();
        self.index.insert(airspace.bbox(), id);
        self.airspaces.push(airspace);
        Ok(id)
    }

    /// Appends every volume, returning how many were added.
    pub fn add_bulk(
        &mut self,
        airspaces: impl IntoIterator<Item = AirspaceVolume>,
    ) -> Result<usize> {
        if self.is_frozen() {
            return Err(AirgraphError::CatalogFrozen);
        }
        let mut count = 0;
        for airspace in airspaces {
            self.add(airspace)?;
            count += 1;
        }
        Ok(count)
    }

    pub fn size(&self) -> usize {
        self.airspaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airspaces.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&AirspaceVolume> {
        self.airspaces.get(id)
    }

    pub fn airspaces(&self) -> &[AirspaceVolume] {
        &self.airspaces
    }

    /// Ids of the volumes that contain the point, in index order.
    pub fn query_point(&self, x: f64, y: f64, height: f64) -> Vec<usize> {
        self.index
            .query_point(x, y)
            .into_iter()
            .filter(|&id| self.airspaces[id].contains(x, y, height))
            .collect()
    }

    /// Broad-phase only: ids of the volumes whose envelope intersects `bbox`.
    pub fn query_box(&self, bbox: &BBox) -> Vec<usize> {
        self.index.query_box(bbox)
    }

    /// Up to `k` volumes near the point that do not contain it, sorted by
    /// [`AirspaceVolume::distance`].
    pub fn k_nearest_with_distance(
        &self,
        x: f64,
        y: f64,
        height: f64,
        k: usize,
    ) -> Vec<(usize, f64)> {
        // containing volumes always rank first by envelope, so over-fetch by their count
        let containing = self.query_point(x, y, height).len();

        let mut near: Vec<(usize, f64)> = self
            .index
            .query_k_nearest(x, y, containing + k)
            .into_iter()
            .filter(|&id| !self.airspaces[id].contains(x, y, height))
            .map(|id| (id, self.airspaces[id].distance(x, y, height)))
            .collect();
        near.sort_by(|a, b| a.1.total_cmp(&b.1));
        near.truncate(k);
        near
    }

    /// Distance from the point to one volume.
    pub fn distance_to(&self, x: f64, y: f64, height: f64, id: usize) -> Result<f64> {
        self.get(id)
            .map(|airspace| airspace.distance(x, y, height))
            .ok_or(AirgraphError::UnknownAirspace(id))
    }
}
