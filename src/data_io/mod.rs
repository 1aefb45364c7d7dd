//! Read contract for observation and model archives.

pub mod memory;
#[cfg(feature = "netcdf")]
pub mod netcdf_archive;

pub use memory::MemoryArchive;
#[cfg(feature = "netcdf")]
pub use netcdf_archive::{NetCdfArchive, NetCdfSurfacePressure};

use crate::case::{Member, Model};
use crate::field::{Field, FieldError};
use std::fmt;
use thiserror::Error;

/// Observation source used when a plot type names none
pub const DEFAULT_OBS_SOURCE: &str = "era5";

/// Raw values or departures from the climatology of the same day of year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TotalAnomaly {
    Total,
    Anomaly,
}

impl TotalAnomaly {
    pub fn as_str(&self) -> &'static str {
        match self {
            TotalAnomaly::Total => "total",
            TotalAnomaly::Anomaly => "anomaly",
        }
    }
}

impl fmt::Display for TotalAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum ReaderError {
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),

    #[error("Variable not found: {0}")]
    MissingVariable(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid field: {0}")]
    Field(#[from] FieldError),

    #[error("Data conversion error: {0}")]
    Conversion(String),
}

/// One observation read
#[derive(Debug, Clone)]
pub struct ObsRequest<'a> {
    pub variable: &'a str,
    pub kind: TotalAnomaly,
    /// Axis 0 holds the valid-time window as day numbers, the rest are coordinate windows
    pub min_maxs: &'a [[f64; 2]],
    /// Day number of the earliest initialisation; returned leads count from it
    pub init_day: f64,
    pub source: &'a str,
    pub clim_years: [i32; 2],
}

/// One model read, for a single member composited over the model's init times
#[derive(Debug, Clone)]
pub struct ModelRequest<'a> {
    pub model: &'a Model,
    pub member: Member,
    pub variable: &'a str,
    pub kind: TotalAnomaly,
    /// Axis 0 holds the lead window (days); level windows are hPa
    pub min_maxs: &'a [[f64; 2]],
    pub clim_years: Option<[i32; 2]>,
}

/// Source of fields for the pipeline.
///
/// Returned fields carry lead (days since initialisation) on axis 0 and hPa
/// on the level axis. `Ok(None)` means no matching data.
pub trait FieldReader: Send + Sync {
    fn read_observation(&self, request: &ObsRequest<'_>) -> Result<Option<Field>, ReaderError>;

    fn read_model(&self, request: &ModelRequest<'_>) -> Result<Option<Field>, ReaderError>;
}

/// Cut `field` down to the windows in `min_maxs`, one per leading axis.
///
/// Returns `None` when any window selects nothing.
pub fn window_field(field: &Field, min_maxs: &[[f64; 2]]) -> Option<Field> {
    let mut out = field.clone();
    for (axis, &[lo, hi]) in min_maxs.iter().enumerate().take(field.ndim()) {
        let indices = out.value_window(axis, lo, hi);
        if indices.is_empty() {
            return None;
        }
        if indices.len() != out.dims[axis].len() {
            out = out.select(axis, &indices);
        }
    }
    Some(out)
}
