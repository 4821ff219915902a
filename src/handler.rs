//! Catalog ownership, result accumulation and batch processing.
//!
//! [`AirspaceHandler`] is the surface a CLI or binding layer talks to. It owns
//! the catalog and the shared `N x N` result matrix, and moves the catalog
//! from building to frozen the first time anything is queried or processed.
//!
//! Batch processing can run across rayon workers. Each worker folds flights
//! into its own partial matrix against the read-only catalog; the partials
//! are summed element-wise once every flight is done.

use std::path::Path;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Array2;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::airspace::AirspaceVolume;
use crate::catalog::AirspaceCatalog;
use crate::error::{AirgraphError, Result};
use crate::flight::{Flight, HeightUnit};
use crate::input;
use crate::transitions;


/// How a batch of flights is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOptions {
    pub parallel: bool, // fold flights across rayon workers
    pub progress: bool, // draw a progress bar
}

/// Owns an airspace catalog and the transition counts accumulated against it.
#[derive(Debug, Default)]
pub struct AirspaceHandler {
    catalog: AirspaceCatalog,
    result: Option<Array2<u64>>, // allocated when the catalog is frozen
}

impl AirspaceHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn catalog(&self) -> &AirspaceCatalog {
        &self.catalog
    }

    pub fn size(&self) -> usize {
        self.catalog.size()
    }

    /// Adds one airspace from WKT text and altitude limits in feet.
    pub fn add_airspace(
        &mut self,
        wkt: &str,
        lower_limit: i32,
        upper_limit: i32,
    ) -> Result<usize> {
        self.catalog
            .add(AirspaceVolume::from_wkt(wkt, lower_limit, upper_limit))
    }

    pub fn add_bulk(
        &mut self,
        airspaces: impl IntoIterator<Item = AirspaceVolume>,
    ) -> Result<usize> {
        self.catalog.add_bulk(airspaces)
    }

    /// Reads a catalog file and adds every airspace in it.
    pub fn add_airspaces_file(&mut self, path: &Path) -> anyhow::Result<usize> {
        if self.catalog.is_frozen() {
            return Err(AirgraphError::CatalogFrozen.into());
        }
        let airspaces = input::read_airspaces(path)?;
        let count = self.add_bulk(airspaces)?;
        info!("added {} airspaces from {}", count, path.display());
        Ok(count)
    }

    /// Freezes the catalog and allocates a zeroed `N x N` result matrix.
    /// Calling it again discards the counts accumulated so far.
    pub fn freeze_and_reset_result(&mut self) {
        self.catalog.freeze();
        let n = self.catalog.size();
        debug!("allocating {n}x{n} result matrix");
        self.result = Some(Array2::zeros((n, n)));
    }

    fn ensure_ready(&mut self) {
        if self.result.is_none() {
            self.freeze_and_reset_result();
        }
    }

    /// The accumulated counts, indexed `[from, to]`.
    pub fn get_result(&self) -> Result<&Array2<u64>> {
        self.result.as_ref().ok_or(AirgraphError::NotReady)
    }

    /// Adds the flight's transitions to the shared result.
    pub fn process(&mut self, flight: &Flight) -> Result<()> {
        self.ensure_ready();
        match self.result.as_mut() {
            Some(result) => transitions::accumulate(&self.catalog, flight, result),
            None => Err(AirgraphError::NotReady),
        }
    }

    /// Builds a flight from raw sample arrays and processes it. Arrays of
    /// different lengths are rejected before anything is counted.
    pub fn process_arrays(
        &mut self,
        xs: Vec<f64>,
        ys: Vec<f64>,
        hs: Vec<f64>,
        unit: HeightUnit,
    ) -> Result<()> {
        self.ensure_ready();
        let flight = Flight::new(xs, ys, hs, unit)?;
        self.process(&flight)
    }

    /// Returns the flight's transitions without touching the shared result.
    pub fn process_single(&mut self, flight: &Flight) -> Result<Vec<(usize, usize)>> {
        self.ensure_ready();
        transitions::list_transitions(&self.catalog, flight)
    }

    /// Adds every flight's transitions to the shared result.
    pub fn process_batch(&mut self, flights: &[Flight], options: BatchOptions) -> Result<()> {
        self.ensure_ready();
        let start = Instant::now();

        let pb = if options.progress {
            ProgressBar::new(flights.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] {bar:40.green/blue} {pos:>7}/{len:7} {msg} ETA: {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▇▆▅▄▃▂▁"),
        );
        pb.set_message("flights");

        let catalog = &self.catalog;
        let n = catalog.size();
        let counts = if options.parallel {
            flights
                .par_iter()
                .try_fold(
                    || Array2::<u64>::zeros((n, n)),
                    |mut partial, flight| -> Result<Array2<u64>> {
                        transitions::accumulate(catalog, flight, &mut partial)?;
                        pb.inc(1);
                        Ok(partial)
                    },
                )
                .try_reduce(|| Array2::<u64>::zeros((n, n)), |a, b| Ok(a + b))
        } else {
            flights.iter().try_fold(
                Array2::<u64>::zeros((n, n)),
                |mut counts, flight| -> Result<Array2<u64>> {
                    transitions::accumulate(catalog, flight, &mut counts)?;
                    pb.inc(1);
                    Ok(counts)
                },
            )
        };
        pb.finish_and_clear();
        let counts = counts?;

        if let Some(result) = self.result.as_mut() {
            *result += &counts;
        }

        let duration = start.elapsed();
        info!(
            "processed {} flights in {:.2?} ({} transitions)",
            flights.len(),
            duration,
            counts.sum()
        );
        Ok(())
    }

    /// Reads a flights file and processes every complete flight in it.
    /// Returns the number of flights processed.
    pub fn process_flights_file(
        &mut self,
        path: &Path,
        unit: HeightUnit,
        options: BatchOptions,
    ) -> anyhow::Result<usize> {
        let flights = input::read_flights(path, unit)?;
        self.process_batch(&flights, options)?;
        Ok(flights.len())
    }

    /// Ids of the airspaces containing the point.
    pub fn query_point(&mut self, x: f64, y: f64, height: f64, unit: HeightUnit) -> Vec<usize> {
        self.ensure_ready();
        self.catalog.query_point(x, y, unit.to_feet(height))
    }

    /// Up to `k` airspaces near the point that do not contain it, closest first.
    pub fn query_near(
        &mut self,
        x: f64,
        y: f64,
        height: f64,
        k: usize,
        unit: HeightUnit,
    ) -> Vec<(usize, f64)> {
        self.ensure_ready();
        self.catalog
            .k_nearest_with_distance(x, y, unit.to_feet(height), k)
    }

    pub fn distance_to_airspace(
        &mut self,
        x: f64,
        y: f64,
        height: f64,
        id: usize,
        unit: HeightUnit,
    ) -> Result<f64> {
        self.ensure_ready();
        self.catalog.distance_to(x, y, unit.to_feet(height), id)
    }
}
