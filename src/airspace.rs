//! Three-dimensional airspace volumes.
//!
//! A volume is a horizontal footprint extruded between two altitude limits.
//! The envelope of the footprint is computed once at construction and is
//! what the spatial index stores; the exact tests only run on volumes that
//! survive the envelope filter.

use crate::flight::METRE_IN_FT;
use crate::geom::{bbox_contains, shape_from_wkt, BBox, Shape, ShapeGeometry};


/// An airspace volume: horizontal shape plus vertical band in feet.
#[derive(Debug, Clone, PartialEq)]
pub struct AirspaceVolume {
    shape: Shape,
    lower_limit: i32,
    upper_limit: i32,
    bbox: BBox, // envelope of `shape`, independent of the band
}

impl AirspaceVolume {
    pub fn new(shape: Shape, lower_limit: i32, upper_limit: i32) -> Self {
        let bbox = shape.envelope();
        Self {
            shape,
            lower_limit,
            upper_limit,
            bbox,
        }
    }

    /// Builds a volume from WKT text. Unparsable text yields an empty shape
    /// that never contains anything.
    pub fn from_wkt(wkt: &str, lower_limit: i32, upper_limit: i32) -> Self {
        Self::new(shape_from_wkt(wkt), lower_limit, upper_limit)
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn lower_limit(&self) -> i32 {
        self.lower_limit
    }

    pub fn upper_limit(&self) -> i32 {
        self.upper_limit
    }

    /// Envelope of the shape.
    pub fn bbox(&self) -> &BBox {
        &self.bbox
    }

    /// Returns true if the height lies within `[lower_limit, upper_limit]`.
    pub fn inside_band(&self, height: f64) -> bool {
        height >= self.lower_limit as f64 && height <= self.upper_limit as f64
    }

    /// Returns true if the band overlaps `[lower, upper]`.
    pub fn overlaps_band(&self, lower: f64, upper: f64) -> bool {
        !(self.lower_limit as f64 > upper || (self.upper_limit as f64) < lower)
    }

    /// Exact containment. The altitude check runs first.
    pub fn contains(&self, x: f64, y: f64, height: f64) -> bool {
        self.inside_band(height) && self.shape.contains_point(x, y)
    }

    /// Altitude check plus envelope check.
    pub fn bbox_contains(&self, x: f64, y: f64, height: f64) -> bool {
        self.inside_band(height) && bbox_contains(&self.bbox, x, y)
    }

    /// Distance in feet: the geodesic horizontal distance to the shape and
    /// the vertical gap to the nearest limit, combined in quadrature.
    ///
    /// The two components are not in a common metric space; use this to rank
    /// nearby volumes, not as a true 3D distance.
    pub fn distance(&self, x: f64, y: f64, height: f64) -> f64 {
        let horizontal = self.shape.boundary_distance(x, y) * METRE_IN_FT;
        let vertical = if self.inside_band(height) {
            0.0
        } else if height < self.lower_limit as f64 {
            self.lower_limit as f64 - height
        } else {
            height - self.upper_limit as f64
        };
        horizontal.hypot(vertical)
    }
}
