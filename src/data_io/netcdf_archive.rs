//! On-disk archive of NetCDF files.
//!
//! Layout under the data directory:
//! - `obs/{source}/{variable}_{total|anomaly}.nc`, time decoded from its CF `units`
//! - `processed/{model}/{variable}_{total|anomaly}_{member}.nc`, lead in days,
//!   with an optional leading `init` axis (also decoded from `units`)
//!
//! Coordinate variables are named after the variable's dimensions. Time axes
//! without a `units` attribute are taken as days since 1900-01-01. Pressure
//! levels stored in Pa are converted to hPa.

use super::{window_field, FieldReader, ModelRequest, ObsRequest, ReaderError, TotalAnomaly};
use crate::case::Member;
use crate::field::Field;
use crate::math::{interp_1d_axis, nanmean_lane};
use crate::operators::{OperatorError, SurfacePressureSource};
use crate::time_utils::{day_number, decode_times, to_lead_axis};
use log::debug;
use ndarray::{Array2, ArrayD, Axis, Ix2, IxDyn};
use std::path::{Path, PathBuf};

const LEVEL_NAMES: [&str; 5] = ["lev", "level", "plev", "pressure", "isobaricInhPa"];
const FILL_THRESHOLD: f64 = 9.0e36;
const DEFAULT_TIME_UNITS: &str = "days since 1900-01-01";

/// Variable values plus coordinates, with dimension names and coordinate units kept alongside
struct RawVariable {
    field: Field,
    names: Vec<String>,
    units: Vec<Option<String>>,
}

impl RawVariable {
    /// Decode axis `axis` from its time units into day numbers
    fn decode_time_axis(&mut self, axis: usize) -> Result<(), ReaderError> {
        let units = self.units[axis].as_deref().unwrap_or_else(|| {
            debug!("{} has no units, assuming {}", self.names[axis], DEFAULT_TIME_UNITS);
            DEFAULT_TIME_UNITS
        });
        self.field.dims[axis] = decode_times(&self.field.dims[axis], units).map_err(ReaderError::Conversion)?;
        Ok(())
    }
}

fn units_of(var: &netcdf::Variable<'_>) -> Result<Option<String>, ReaderError> {
    let Some(attr) = var.attribute("units") else {
        return Ok(None);
    };
    match attr.value()? {
        netcdf::AttributeValue::Str(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

fn read_variable(path: &Path, variable: &str) -> Result<Option<RawVariable>, ReaderError> {
    if !path.is_file() {
        debug!("no file at {}", path.display());
        return Ok(None);
    }
    let file = netcdf::open(path)?;
    let var = file
        .variable(variable)
        .ok_or_else(|| ReaderError::MissingVariable(variable.to_string()))?;

    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    let names: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();

    let raw: Vec<f64> = var.get_values(..)?;
    let mut values = ArrayD::from_shape_vec(IxDyn(&shape), raw)
        .map_err(|e| ReaderError::Conversion(e.to_string()))?;
    values.mapv_inplace(|v| if v.abs() >= FILL_THRESHOLD { f64::NAN } else { v });

    let mut dims = Vec::with_capacity(names.len());
    let mut units = Vec::with_capacity(names.len());
    for (name, &len) in names.iter().zip(&shape) {
        let mut coords: Vec<f64> = match file.variable(name) {
            Some(coord) => {
                units.push(units_of(&coord)?);
                coord.get_values(..)?
            }
            None => {
                units.push(None);
                (0..len).map(|i| i as f64).collect()
            }
        };
        if LEVEL_NAMES.contains(&name.as_str()) && coords.iter().any(|&p| p > 2000.0) {
            coords.iter_mut().for_each(|p| *p /= 100.0);
        }
        dims.push(coords);
    }

    Ok(Some(RawVariable {
        field: Field::new(values, dims)?,
        names,
        units,
    }))
}

/// Reader for the NetCDF archive rooted at `data_dir`
#[derive(Debug, Clone)]
pub struct NetCdfArchive {
    pub data_dir: PathBuf,
}

impl NetCdfArchive {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn observation_path(&self, source: &str, variable: &str, kind: TotalAnomaly) -> PathBuf {
        self.data_dir
            .join("obs")
            .join(source)
            .join(format!("{}_{}.nc", variable, kind))
    }

    pub fn model_path(&self, model: &str, variable: &str, kind: TotalAnomaly, member: Member) -> PathBuf {
        self.data_dir
            .join("processed")
            .join(model)
            .join(format!("{}_{}_{}.nc", variable, kind, member.label()))
    }
}

impl FieldReader for NetCdfArchive {
    fn read_observation(&self, request: &ObsRequest<'_>) -> Result<Option<Field>, ReaderError> {
        let path = self.observation_path(request.source, request.variable, request.kind);
        let Some(mut raw) = read_variable(&path, request.variable)? else {
            return Ok(None);
        };
        raw.decode_time_axis(0)?;

        Ok(window_field(&raw.field, request.min_maxs).map(|mut f| {
            f.dims[0] = to_lead_axis(&f.dims[0], request.init_day);
            f
        }))
    }

    fn read_model(&self, request: &ModelRequest<'_>) -> Result<Option<Field>, ReaderError> {
        let path = self.model_path(&request.model.name, request.variable, request.kind, request.member);
        let Some(mut raw) = read_variable(&path, request.variable)? else {
            return Ok(None);
        };

        let has_init = raw.names.first().map(String::as_str) == Some("init");
        if has_init {
            raw.decode_time_axis(0)?;
        }
        let mut field = raw.field;
        if has_init {
            let wanted: Vec<f64> = request.model.init_times().into_iter().map(day_number).collect();
            let picked: Vec<usize> = field.dims[0]
                .iter()
                .enumerate()
                .filter(|(_, &t)| wanted.iter().any(|&w| (t - w).abs() < 0.5))
                .map(|(i, _)| i)
                .collect();
            if picked.is_empty() {
                debug!("{}: none of the requested init times present", path.display());
                return Ok(None);
            }
            let composite = field
                .values
                .select(Axis(0), &picked)
                .map_axis(Axis(0), nanmean_lane);
            field = Field::new(composite, field.dims[1..].to_vec())?;
        }

        Ok(window_field(&field, request.min_maxs))
    }
}

/// Climatological surface pressure read once from a NetCDF file (variable `sp`)
#[derive(Debug, Clone)]
pub struct NetCdfSurfacePressure {
    lat: Vec<f64>,
    lon: Vec<f64>,
    sp: Array2<f64>,
}

impl NetCdfSurfacePressure {
    pub fn open(path: &Path) -> Result<Self, ReaderError> {
        let raw = read_variable(path, "sp")?
            .ok_or_else(|| ReaderError::FileNotFound(path.display().to_string()))?;
        let mut field = raw.field;
        if field.ndim() < 2 {
            return Err(ReaderError::Conversion("sp needs lat/lon axes".to_string()));
        }
        // average any leading (time) axes away
        while field.ndim() > 2 {
            let values = field.values.map_axis(Axis(0), nanmean_lane);
            field = Field::new(values, field.dims[1..].to_vec())?;
        }
        let mut sp = field
            .values
            .into_dimensionality::<Ix2>()
            .map_err(|e| ReaderError::Conversion(e.to_string()))?;
        if sp.iter().any(|&p| p > 2000.0) {
            sp.mapv_inplace(|p| p / 100.0);
        }
        Ok(Self {
            lat: field.dims[0].clone(),
            lon: field.dims[1].clone(),
            sp,
        })
    }
}

impl SurfacePressureSource for NetCdfSurfacePressure {
    fn surface_pressure(&self, lat: &[f64], lon: &[f64]) -> Result<Array2<f64>, OperatorError> {
        let on_lat = interp_1d_axis(self.sp.view().into_dyn(), 0, &self.lat, lat)
            .map_err(OperatorError::SurfacePressure)?;
        let on_grid = interp_1d_axis(on_lat.view(), 1, &self.lon, lon).map_err(OperatorError::SurfacePressure)?;
        on_grid
            .into_dimensionality::<Ix2>()
            .map_err(|e| OperatorError::SurfacePressure(e.to_string()))
    }
}
