//! Readers for the catalog and trajectory JSON files.
//!
//! The catalog is a feature collection whose properties carry a WKT
//! footprint and integer altitude limits in feet:
//!
//! ```json
//! {"features": [{"properties": {"wkt": "POLYGON(...)", "lower_limit": 0, "upper_limit": 24500}}]}
//! ```
//!
//! Flights are arrays of `[x, y, height]` triples:
//!
//! ```json
//! {"flights": [[[-1.2, 51.7, 3048.0], [-1.1, 51.8, null]]]}
//! ```
//!
//! A flight with any missing sample value is dropped whole.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use crate::airspace::AirspaceVolume;
use crate::flight::{Flight, HeightUnit};


#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: AirspaceProperties,
}

/// Properties of one catalog feature.
#[derive(Debug, Clone, Deserialize)]
pub struct AirspaceProperties {
    pub wkt: String,
    pub lower_limit: i32,
    pub upper_limit: i32,
    #[serde(default)]
    pub name: Option<String>,
}

impl From<AirspaceProperties> for AirspaceVolume {
    fn from(properties: AirspaceProperties) -> Self {
        if let Some(name) = &properties.name {
            debug!("parsing airspace {}", name);
        }
        AirspaceVolume::from_wkt(
            &properties.wkt,
            properties.lower_limit,
            properties.upper_limit,
        )
    }
}

#[derive(Debug, Deserialize)]
struct FlightsFile {
    flights: Vec<Vec<Vec<Option<f64>>>>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))
}

/// Reads every airspace in a catalog file, in file order.
pub fn read_airspaces(path: &Path) -> Result<Vec<AirspaceVolume>> {
    let collection: FeatureCollection = read_json(path)?;
    Ok(airspaces_from(collection))
}

pub fn parse_airspaces(json: &str) -> Result<Vec<AirspaceVolume>> {
    let collection: FeatureCollection =
        serde_json::from_str(json).context("failed to parse airspace catalog")?;
    Ok(airspaces_from(collection))
}

fn airspaces_from(collection: FeatureCollection) -> Vec<AirspaceVolume> {
    collection
        .features
        .into_iter()
        .map(|feature| AirspaceVolume::from(feature.properties))
        .collect()
}

/// Reads a flights file, dropping any flight with an incomplete sample.
pub fn read_flights(path: &Path, unit: HeightUnit) -> Result<Vec<Flight>> {
    let file: FlightsFile = read_json(path)?;
    Ok(flights_from(file, unit))
}

pub fn parse_flights(json: &str, unit: HeightUnit) -> Result<Vec<Flight>> {
    let file: FlightsFile = serde_json::from_str(json).context("failed to parse flights")?;
    Ok(flights_from(file, unit))
}

fn flights_from(file: FlightsFile, unit: HeightUnit) -> Vec<Flight> {
    let total = file.flights.len();
    let flights: Vec<Flight> = file
        .flights
        .iter()
        .enumerate()
        .filter_map(|(i, raw)| {
            let flight = flight_from_raw(raw, unit);
            if flight.is_none() {
                debug!("dropping flight {} with an incomplete sample", i);
            }
            flight
        })
        .collect();
    info!(
        "read {} flights ({} dropped for missing values)",
        flights.len(),
        total - flights.len()
    );
    flights
}

/// All-or-nothing: `None` if any sample lacks an x, y or height.
fn flight_from_raw(raw: &[Vec<Option<f64>>], unit: HeightUnit) -> Option<Flight> {
    let samples = raw
        .iter()
        .map(|sample| match sample.as_slice() {
            [Some(x), Some(y), Some(h), ..] => Some([*x, *y, *h]),
            _ => None,
        })
        .collect::<Option<Vec<[f64; 3]>>>()?;
    Some(Flight::from_samples(&samples, unit))
}
