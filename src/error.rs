//! Error types for catalog and trajectory operations.
//!
//! These cover misuse of the catalog lifecycle and malformed trajectory
//! input. File and configuration failures are reported through `anyhow`
//! at the edges of the crate instead.

/// Errors raised by the core capability surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AirgraphError {
    /// An airspace was added after processing began.
    #[error("all airspaces must be added before processing begins")]
    CatalogFrozen,

    /// The result matrix was requested before it was allocated.
    #[error("processing has not yet begun")]
    NotReady,

    /// Sample arrays passed to a trajectory have different lengths.
    #[error("mismatch in array lengths: {xs} xs, {ys} ys, {hs} heights")]
    LengthMismatch { xs: usize, ys: usize, hs: usize },

    /// A count matrix whose shape does not match the catalog.
    #[error("result matrix is {rows}x{cols}, but the catalog has {size} airspaces")]
    ResultShape { rows: usize, cols: usize, size: usize },

    /// An airspace id outside the catalog.
    #[error("airspace {0} not found")]
    UnknownAirspace(usize),
}

pub type Result<T> = std::result::Result<T, AirgraphError>;
