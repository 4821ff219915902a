use geo_types::{coord, Rect};

use crate::error::{AirgraphError, Result};
use crate::geom::BBox;

/// Feet per metre.
pub const METRE_IN_FT: f64 = 3.28084;

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn metres_are_converted() {
        let flight = Flight::new(
            vec![0.0, 1.0],
            vec![0.0, 1.0],
            vec![1000.0, 0.0],
            HeightUnit::Metres,
        )
        .unwrap();
        assert!((flight.heights()[0] - 3280.84).abs() < 1e-9);
        let (low, high) = flight.height_range();
        assert_eq!(low, 0.0);
        assert!((high - 3280.84).abs() < 1e-9);
    }

    #[test]
    fn feet_are_kept() {
        let flight =
            Flight::from_samples(&[[3.0, -1.0, 500.0], [1.0, 4.0, 200.0]], HeightUnit::Feet);
        assert_eq!(flight.heights(), &[500.0, 200.0]);
        assert_eq!(flight.xs(), &[3.0, 1.0]);
        assert_eq!(flight.ys(), &[-1.0, 4.0]);
        assert_eq!(flight.bbox().min(), coord! { x: 1.0, y: -1.0 });
        assert_eq!(flight.bbox().max(), coord! { x: 3.0, y: 4.0 });
        assert_eq!(flight.height_range(), (200.0, 500.0));
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = Flight::new(vec![0.0, 1.0], vec![0.0], vec![0.0, 1.0], HeightUnit::Feet)
            .unwrap_err();
        assert_eq!(
            err,
            AirgraphError::LengthMismatch {
                xs: 2,
                ys: 1,
                hs: 2
            }
        );
    }

    #[test]
    fn samples_keep_order() {
        let flight = Flight::from_samples(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]], HeightUnit::Feet);
        let samples: Vec<_> = flight.samples().collect();
        assert_eq!(samples, vec![(1.0, 2.0, 3.0), (4.0, 5.0, 6.0)]);
        assert_eq!(flight.len(), 2);
    }

    #[test]
    fn empty_flight() {
        let flight = Flight::from_samples(&[], HeightUnit::Metres);
        assert!(flight.is_empty());
        assert_eq!(flight.samples().count(), 0);
        assert_eq!(flight.bbox().min(), coord! { x: 0.0, y: 0.0 });
        assert_eq!(flight.height_range(), (0.0, 0.0));
    }
}

/// Unit of the raw heights handed to a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeightUnit {
    #[default]
    Metres,
    Feet,
}

impl HeightUnit {
    pub fn from_feet_flag(in_feet: bool) -> Self {
        if in_feet {
            HeightUnit::Feet
        } else {
            HeightUnit::Metres
        }
    }

    /// Converts a raw height in this unit to feet.
    pub fn to_feet(self, height: f64) -> f64 {
        match self {
            HeightUnit::Metres => height * METRE_IN_FT,
            HeightUnit::Feet => height,
        }
    }
}

/// An aircraft trajectory: ordered `(x, y, height)` samples, heights in feet.
///
/// Read-only once built, so the cached extents always match the samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Flight {
    xs: Vec<f64>,
    ys: Vec<f64>,
    heights: Vec<f64>,
    bbox: BBox,      // horizontal extent of all samples
    height_min: f64, // lowest sample, feet
    height_max: f64, // highest sample, feet
}

impl Flight {
    /// Builds a trajectory from parallel sample arrays, converting heights
    /// to feet. Arrays of different lengths are rejected.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>, hs: Vec<f64>, unit: HeightUnit) -> Result<Self> {
        if xs.len() != ys.len() || xs.len() != hs.len() {
            return Err(AirgraphError::LengthMismatch {
                xs: xs.len(),
                ys: ys.len(),
                hs: hs.len(),
            });
        }
        let heights = hs.into_iter().map(|h| unit.to_feet(h)).collect();
        Ok(Self::from_parts(xs, ys, heights))
    }

    /// Builds a trajectory from `[x, y, height]` triples.
    pub fn from_samples(samples: &[[f64; 3]], unit: HeightUnit) -> Self {
        let xs = samples.iter().map(|s| s[0]).collect();
        let ys = samples.iter().map(|s| s[1]).collect();
        let heights = samples.iter().map(|s| unit.to_feet(s[2])).collect();
        Self::from_parts(xs, ys, heights)
    }

    fn from_parts(xs: Vec<f64>, ys: Vec<f64>, heights: Vec<f64>) -> Self {
        let (bbox, height_min, height_max) = if xs.is_empty() {
            (Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 0.0, y: 0.0 }), 0.0, 0.0)
        } else {
            let (x_min, x_max) = min_max(&xs);
            let (y_min, y_max) = min_max(&ys);
            let (h_min, h_max) = min_max(&heights);
            (
                Rect::new(coord! { x: x_min, y: y_min }, coord! { x: x_max, y: y_max }),
                h_min,
                h_max,
            )
        };

        Self {
            xs,
            ys,
            heights,
            bbox,
            height_min,
            height_max,
        }
    }

    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    /// Sample heights in feet.
    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    /// Horizontal extent of the samples; a zero box at the origin when empty.
    pub fn bbox(&self) -> &BBox {
        &self.bbox
    }

    /// Lowest and highest sample, feet.
    pub fn height_range(&self) -> (f64, f64) {
        (self.height_min, self.height_max)
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Samples in trajectory order, heights in feet.
    pub fn samples(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.xs
            .iter()
            .zip(self.ys.iter())
            .zip(self.heights.iter())
            .map(|((&x, &y), &h)| (x, y, h))
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}
