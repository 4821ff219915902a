//! Airspace hand-off counting.
//!
//! Builds a catalog of three-dimensional airspace volumes (a horizontal
//! footprint plus an altitude band), then walks aircraft trajectories through
//! it and counts every direct hand-off between volumes. Counts accumulate in
//! an `N x N` matrix indexed by airspace id, or come back as an ordered list
//! for a single trajectory.

pub mod airspace;
pub mod catalog;
pub mod error;
pub mod flight;
pub mod geom;
pub mod handler;
pub mod index;
pub mod input;
pub mod logging;
pub mod output;
pub mod settings;
pub mod transitions;

pub use airspace::AirspaceVolume;
pub use catalog::{AirspaceCatalog, Lifecycle};
pub use error::AirgraphError;
pub use flight::{Flight, HeightUnit};
pub use handler::{AirspaceHandler, BatchOptions};
