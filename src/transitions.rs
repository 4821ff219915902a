//! Counting hand-offs between airspaces along a trajectory.
//!
//! Each sample is tested against the volumes whose envelope overlaps the
//! whole trajectory. Membership is tracked in two buffers: the volumes that
//! held the trajectory at the last sample with any hit, and the volumes that
//! hold it at the current sample. Entering a volume that was not already
//! held records one transition from every previously held volume. A sample
//! outside every volume leaves the state untouched, so short gaps in coverage
//! do not produce spurious re-entries.

use itertools::Itertools;
use ndarray::Array2;

use crate::catalog::AirspaceCatalog;
use crate::error::{AirgraphError, Result};
use crate::flight::Flight;

#[cfg(test)]
mod tests {

    use super::*;
    use crate::airspace::AirspaceVolume;
    use crate::flight::HeightUnit;

    fn square(x0: f64, x1: f64, lower: i32, upper: i32) -> AirspaceVolume {
        AirspaceVolume::from_wkt(
            &format!("POLYGON(({x0} 0, {x1} 0, {x1} 2, {x0} 2, {x0} 0))"),
            lower,
            upper,
        )
    }

    /// Box1 = [0, 2], Box2 = [2, 4], Box3 = [4, 6]; all 0 to 1000 ft.
    fn row() -> AirspaceCatalog {
        let mut catalog = AirspaceCatalog::new();
        catalog.add(square(0.0, 2.0, 0, 1000)).unwrap();
        catalog.add(square(2.0, 4.0, 0, 1000)).unwrap();
        catalog.add(square(4.0, 6.0, 0, 1000)).unwrap();
        catalog.freeze();
        catalog
    }

    fn flight(samples: &[[f64; 3]]) -> Flight {
        Flight::from_samples(samples, HeightUnit::Feet)
    }

    fn listed(catalog: &AirspaceCatalog, flight: &Flight) -> Vec<(usize, usize)> {
        list_transitions(catalog, flight).unwrap()
    }

    fn nonzero(matrix: &Array2<u64>) -> Vec<((usize, usize), u64)> {
        matrix
            .indexed_iter()
            .filter(|(_, v)| **v > 0)
            .map(|(ij, v)| (ij, *v))
            .collect()
    }

    #[test]
    fn two_boxes_single_hand_off() {
        let catalog = row();
        let mut matrix = Array2::zeros((3, 3));
        let f = flight(&[[1.0, 1.0, 500.0], [3.0, 1.0, 500.0]]);
        accumulate(&catalog, &f, &mut matrix).unwrap();
        assert_eq!(nonzero(&matrix), vec![((0, 1), 1)]);
    }

    #[test]
    fn first_sample_only_seeds_membership() {
        let catalog = row();
        assert!(listed(&catalog, &flight(&[[1.0, 1.0, 500.0]])).is_empty());
        assert!(listed(&catalog, &flight(&[])).is_empty());
    }

    #[test]
    fn gap_does_not_reset_membership() {
        let catalog = row();
        let transitions = listed(
            &catalog,
            &flight(&[[1.0, 1.0, 500.0], [1.0, 1.0, 5000.0], [1.0, 1.0, 500.0]]),
        );
        assert!(transitions.is_empty());
    }

    #[test]
    fn gap_between_different_volumes_still_hands_off() {
        let catalog = row();
        let transitions = listed(
            &catalog,
            &flight(&[[1.0, 1.0, 500.0], [3.0, 1.0, 5000.0], [5.0, 1.0, 500.0]]),
        );
        assert_eq!(transitions, vec![(0, 2)]);
    }

    #[test]
    fn staying_inside_records_nothing_new() {
        let catalog = row();
        let transitions = listed(
            &catalog,
            &flight(&[
                [0.5, 1.0, 500.0],
                [1.0, 1.0, 500.0],
                [1.5, 1.0, 600.0],
                [3.0, 1.0, 600.0],
                [3.5, 1.0, 600.0],
            ]),
        );
        assert_eq!(transitions, vec![(0, 1)]);
    }

    #[test]
    fn out_and_back_records_both_directions() {
        let catalog = row();
        let transitions = listed(
            &catalog,
            &flight(&[[1.0, 1.0, 500.0], [3.0, 1.0, 500.0], [1.0, 1.0, 500.0]]),
        );
        assert_eq!(transitions, vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn reversal_changes_direction() {
        let catalog = row();
        let forward = [[1.0, 1.0, 500.0], [3.0, 1.0, 500.0], [5.0, 1.0, 500.0]];
        let mut backward = forward;
        backward.reverse();
        assert_eq!(listed(&catalog, &flight(&forward)), vec![(0, 1), (1, 2)]);
        assert_eq!(listed(&catalog, &flight(&backward)), vec![(2, 1), (1, 0)]);
    }

    #[test]
    fn overlapping_volumes_fan_out() {
        let mut catalog = AirspaceCatalog::new();
        catalog.add(square(0.0, 2.0, 0, 1000)).unwrap();
        catalog.add(square(2.0, 4.0, 0, 1000)).unwrap();
        catalog.add(square(2.0, 4.0, 500, 2000)).unwrap();
        catalog.freeze();

        let transitions = listed(&catalog, &flight(&[[1.0, 1.0, 800.0], [3.0, 1.0, 800.0]]));
        assert_eq!(transitions, vec![(0, 1), (0, 2)]);

        // climbing out of the shared band keeps only the upper volume, already held
        let transitions = listed(
            &catalog,
            &flight(&[[1.0, 1.0, 800.0], [3.0, 1.0, 800.0], [3.0, 1.0, 1500.0]]),
        );
        assert_eq!(transitions, vec![(0, 1), (0, 2)]);
    }

    #[test]
    fn repeated_flight_doubles_counts() {
        let catalog = row();
        let f = flight(&[[1.0, 1.0, 500.0], [3.0, 1.0, 500.0], [5.0, 1.0, 500.0]]);
        let mut once = Array2::zeros((3, 3));
        accumulate(&catalog, &f, &mut once).unwrap();
        let mut twice = Array2::zeros((3, 3));
        accumulate(&catalog, &f, &mut twice).unwrap();
        accumulate(&catalog, &f, &mut twice).unwrap();
        assert_eq!(twice, &once * 2);
    }

    #[test]
    fn list_and_matrix_agree() {
        let catalog = row();
        let f = flight(&[
            [1.0, 1.0, 500.0],
            [3.0, 1.0, 500.0],
            [1.0, 1.0, 500.0],
            [3.0, 1.0, 500.0],
        ]);
        let mut matrix = Array2::zeros((3, 3));
        accumulate(&catalog, &f, &mut matrix).unwrap();
        let mut from_list = Array2::<u64>::zeros((3, 3));
        for (from, to) in list_transitions(&catalog, &f).unwrap() {
            from_list[[from, to]] += 1;
        }
        assert_eq!(matrix, from_list);
        assert_eq!(matrix[[0, 1]], 2);
        assert_eq!(matrix[[1, 0]], 1);
    }

    #[test]
    fn building_catalog_is_not_ready() {
        let mut catalog = AirspaceCatalog::new();
        catalog.add(square(0.0, 2.0, 0, 1000)).unwrap();
        let f = flight(&[[1.0, 1.0, 500.0], [3.0, 1.0, 500.0]]);

        let mut matrix = Array2::zeros((1, 1));
        assert_eq!(accumulate(&catalog, &f, &mut matrix), Err(AirgraphError::NotReady));
        assert_eq!(list_transitions(&catalog, &f), Err(AirgraphError::NotReady));

        // ids can still be added, so nothing may have been counted against them
        catalog.add(square(2.0, 4.0, 0, 1000)).unwrap();
        assert_eq!(matrix.sum(), 0);
    }

    #[test]
    fn matrix_must_match_catalog() {
        let catalog = row();
        let f = flight(&[[1.0, 1.0, 500.0], [3.0, 1.0, 500.0]]);
        let mut small = Array2::zeros((2, 2));
        assert_eq!(
            accumulate(&catalog, &f, &mut small),
            Err(AirgraphError::ResultShape {
                rows: 2,
                cols: 2,
                size: 3
            })
        );
        assert_eq!(small.sum(), 0);
    }

    #[test]
    fn membership_swaps_buffers() {
        let mut membership = Membership::new(4);
        assert!(membership.enter(1));
        assert!(membership.enter(3));
        assert!(membership.previous_members().is_empty());
        membership.advance();
        assert_eq!(membership.previous_members(), &[1, 3]);
        assert!(!membership.enter(3));
        assert!(membership.enter(2));
        membership.advance();
        assert_eq!(membership.previous_members(), &[3, 2]);
        assert!(membership.enter(1));
    }
}

/// Receives each recorded hand-off.
pub trait TransitionSink {
    fn record(&mut self, from: usize, to: usize);
}

/// Dense `N x N` count matrix indexed `[from, to]`.
impl TransitionSink for Array2<u64> {
    fn record(&mut self, from: usize, to: usize) {
        self[[from, to]] += 1;
    }
}

/// Ordered list of `(from, to)` pairs.
impl TransitionSink for Vec<(usize, usize)> {
    fn record(&mut self, from: usize, to: usize) {
        self.push((from, to));
    }
}

/// Double-buffered membership over the catalog's id space.
///
/// Alongside the flags each buffer keeps the ids it has set, so clearing a
/// buffer and iterating its members cost the number of members rather than
/// the catalog size.
#[derive(Debug, Clone)]
struct Membership {
    previous: Vec<bool>,
    current: Vec<bool>,
    previous_ids: Vec<usize>,
    current_ids: Vec<usize>,
}

impl Membership {
    fn new(size: usize) -> Self {
        Self {
            previous: vec![false; size],
            current: vec![false; size],
            previous_ids: Vec::new(),
            current_ids: Vec::new(),
        }
    }

    /// Marks `id` as held at the current sample. Returns true if it was not
    /// held at the previous resolved sample.
    fn enter(&mut self, id: usize) -> bool {
        if !self.current[id] {
            self.current[id] = true;
            self.current_ids.push(id);
        }
        !self.previous[id]
    }

    fn previous_members(&self) -> &[usize] {
        &self.previous_ids
    }

    /// Promotes the current sample's members to previous and clears current.
    fn advance(&mut self) {
        for &id in &self.previous_ids {
            self.previous[id] = false;
        }
        self.previous_ids.clear();
        std::mem::swap(&mut self.previous, &mut self.current);
        std::mem::swap(&mut self.previous_ids, &mut self.current_ids);
    }
}

/// Volumes worth testing against this flight: envelope overlaps the flight's
/// horizontal extent and altitude band overlaps its height range. Sorted by id.
pub fn candidates(catalog: &AirspaceCatalog, flight: &Flight) -> Vec<usize> {
    let (height_min, height_max) = flight.height_range();
    catalog
        .query_box(flight.bbox())
        .into_iter()
        .filter(|&id| catalog.airspaces()[id].overlaps_band(height_min, height_max))
        .sorted_unstable()
        .collect()
}

fn ensure_frozen(catalog: &AirspaceCatalog) -> Result<()> {
    if catalog.is_frozen() {
        Ok(())
    } else {
        Err(AirgraphError::NotReady)
    }
}

/// Walks the flight and hands every transition to `sink`.
///
/// The catalog must be frozen, otherwise ids could still be added behind the
/// sink's back.
pub fn trace_flight<S: TransitionSink>(
    catalog: &AirspaceCatalog,
    flight: &Flight,
    sink: &mut S,
) -> Result<()> {
    ensure_frozen(catalog)?;
    if flight.is_empty() || catalog.is_empty() {
        return Ok(());
    }
    let candidates = candidates(catalog, flight);
    if candidates.is_empty() {
        return Ok(());
    }
    let airspaces = catalog.airspaces();
    let mut membership = Membership::new(catalog.size());

    for (x, y, height) in flight.samples() {
        let mut hits = 0;
        for &j in &candidates {
            if !airspaces[j].contains(x, y, height) {
                continue;
            }
            hits += 1;
            if membership.enter(j) {
                for &k in membership.previous_members() {
                    sink.record(k, j);
                }
            }
        }
        // no hit: keep the last known membership through the gap
        if hits > 0 {
            membership.advance();
        }
    }
    Ok(())
}

/// Adds the flight's transitions to a shared `N x N` count matrix.
pub fn accumulate(
    catalog: &AirspaceCatalog,
    flight: &Flight,
    matrix: &mut Array2<u64>,
) -> Result<()> {
    ensure_frozen(catalog)?;
    let size = catalog.size();
    let (rows, cols) = matrix.dim();
    if rows != size || cols != size {
        return Err(AirgraphError::ResultShape { rows, cols, size });
    }
    trace_flight(catalog, flight, matrix)
}

/// Returns the flight's transitions in the order they occurred.
pub fn list_transitions(
    catalog: &AirspaceCatalog,
    flight: &Flight,
) -> Result<Vec<(usize, usize)>> {
    let mut transitions = Vec::new();
    trace_flight(catalog, flight, &mut transitions)?;
    Ok(transitions)
}
