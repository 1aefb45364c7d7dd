//! Named physical transforms applied to one or two co-registered fields
//! before any averaging or regridding.

use crate::config::Constants;
use crate::math::{gradient_axis, level_thickness, lonlat_spacing};
use ndarray::{Array2, ArrayD, Axis, IxDyn, Zip};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperatorError {
    #[error("unknown operator \"{name}\", available: {available}")]
    Unknown { name: String, available: String },

    #[error("{operator} needs at least {needed} axes, found {found}")]
    RankTooLow { operator: &'static str, needed: usize, found: usize },

    #[error("{0} needs a second field")]
    MissingSecondField(&'static str),

    #[error("{operator}: fields have shapes {first:?} and {second:?}")]
    ShapeMismatch { operator: &'static str, first: Vec<usize>, second: Vec<usize> },

    #[error("pressure levels must be ascending hPa (top to surface), found {0:?}")]
    LevelsNotAscending(Vec<f64>),

    #[error("surface pressure: {0}")]
    SurfacePressure(String),

    #[error("level weights of shape {weights:?} do not cover a field of shape {values:?}")]
    WeightShape { weights: Vec<usize>, values: Vec<usize> },
}

/// Climatological surface pressure (hPa) on a lat/lon grid
pub trait SurfacePressureSource: Send + Sync {
    /// Surface pressure with shape `[lat.len(), lon.len()]`
    fn surface_pressure(&self, lat: &[f64], lon: &[f64]) -> Result<Array2<f64>, OperatorError>;
}

/// Same surface pressure everywhere
#[derive(Debug, Clone, Copy)]
pub struct UniformSurfacePressure {
    pub hpa: f64,
}

impl UniformSurfacePressure {
    pub fn new(hpa: f64) -> Self {
        Self { hpa }
    }
}

impl SurfacePressureSource for UniformSurfacePressure {
    fn surface_pressure(&self, lat: &[f64], lon: &[f64]) -> Result<Array2<f64>, OperatorError> {
        Ok(Array2::from_elem((lat.len(), lon.len()), self.hpa))
    }
}

/// Collaborators the operators need beyond the fields themselves
pub struct OperatorContext<'a> {
    pub constants: &'a Constants,
    pub surface_pressure: &'a dyn SurfacePressureSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    TimeTendency,
    Div2dLonLat,
    VerticalPressureMean,
    VerticalPressureIntegration,
    MaskBySurfacePressure,
}

type OperatorOutput = (ArrayD<f64>, Option<ArrayD<f64>>);

impl Operator {
    pub const ALL: [Operator; 5] = [
        Operator::Div2dLonLat,
        Operator::VerticalPressureMean,
        Operator::VerticalPressureIntegration,
        Operator::MaskBySurfacePressure,
        Operator::TimeTendency,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operator::TimeTendency => "time_tendency",
            Operator::Div2dLonLat => "div2d_lonlat",
            Operator::VerticalPressureMean => "vertical_pressure_mean",
            Operator::VerticalPressureIntegration => "vertical_pressure_integration",
            Operator::MaskBySurfacePressure => "mask_by_surface_pressure",
        }
    }

    /// Look up an operator by its configuration name
    pub fn from_name(name: &str) -> Result<Self, OperatorError> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.name() == name)
            .ok_or_else(|| OperatorError::Unknown {
                name: name.to_string(),
                available: Self::ALL.iter().map(|op| op.name()).collect::<Vec<_>>().join(", "),
            })
    }

    /// Apply to `values` (and `values2` when present).
    ///
    /// `dims` are the coordinates of `values`; the second field must share them.
    pub fn apply(
        &self,
        values: ArrayD<f64>,
        dims: &[Vec<f64>],
        values2: Option<ArrayD<f64>>,
        ctx: &OperatorContext<'_>,
    ) -> Result<OperatorOutput, OperatorError> {
        if let Some(v2) = &values2 {
            if v2.shape() != values.shape() {
                return Err(OperatorError::ShapeMismatch {
                    operator: self.name(),
                    first: values.shape().to_vec(),
                    second: v2.shape().to_vec(),
                });
            }
        }

        match self {
            Operator::TimeTendency => {
                let tendency = gradient_axis(values.view(), 0);
                let tendency2 = values2.map(|v| gradient_axis(v.view(), 0));
                Ok((tendency, tendency2))
            }
            Operator::Div2dLonLat => {
                let v = values2.ok_or(OperatorError::MissingSecondField(self.name()))?;
                Ok((divergence(&values, &v, dims, ctx.constants, self.name())?, None))
            }
            Operator::VerticalPressureMean => {
                let weights = self.level_weights(&values, dims, ctx)?;
                let mean = weighted_level_mean(&values, &weights)?;
                let mean2 = values2.map(|v| weighted_level_mean(&v, &weights)).transpose()?;
                Ok((mean, mean2))
            }
            Operator::VerticalPressureIntegration => {
                let weights = self.level_weights(&values, dims, ctx)?;
                let total = weighted_level_sum(&values, &weights)?;
                let total2 = values2.map(|v| weighted_level_sum(&v, &weights)).transpose()?;
                Ok((total, total2))
            }
            Operator::MaskBySurfacePressure => {
                let (levels, sp) = self.column_inputs(&values, dims, ctx)?;
                let masked = mask_below_surface(values, &levels, &sp);
                let masked2 = values2.map(|v| mask_below_surface(v, &levels, &sp));
                Ok((masked, masked2))
            }
        }
    }

    fn column_inputs(
        &self,
        values: &ArrayD<f64>,
        dims: &[Vec<f64>],
        ctx: &OperatorContext<'_>,
    ) -> Result<(Vec<f64>, Array2<f64>), OperatorError> {
        let nd = values.ndim();
        if nd < 3 || dims.len() != nd {
            return Err(OperatorError::RankTooLow {
                operator: self.name(),
                needed: 3,
                found: nd,
            });
        }
        let levels = dims[nd - 3].clone();
        if levels.windows(2).any(|w| w[1] <= w[0]) {
            return Err(OperatorError::LevelsNotAscending(levels));
        }
        let sp = ctx
            .surface_pressure
            .surface_pressure(&dims[nd - 2], &dims[nd - 1])?;
        if sp.dim() != (dims[nd - 2].len(), dims[nd - 1].len()) {
            return Err(OperatorError::SurfacePressure(format!(
                "expected {}x{} grid, got {:?}",
                dims[nd - 2].len(),
                dims[nd - 1].len(),
                sp.shape()
            )));
        }
        Ok((levels, sp))
    }

    fn level_weights(
        &self,
        values: &ArrayD<f64>,
        dims: &[Vec<f64>],
        ctx: &OperatorContext<'_>,
    ) -> Result<ArrayD<f64>, OperatorError> {
        let (levels, sp) = self.column_inputs(values, dims, ctx)?;
        Ok(pressure_weights(&levels, &sp))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Per-level pressure thickness (hPa) for every column, shape `[lev, lat, lon]`.
///
/// Levels below the surface weigh zero. The last level above the surface is
/// extended down to it.
pub fn pressure_weights(levels: &[f64], sp: &Array2<f64>) -> ArrayD<f64> {
    let nlev = levels.len();
    let (ny, nx) = sp.dim();
    let base = level_thickness(levels);
    let mut weights = ArrayD::<f64>::zeros(IxDyn(&[nlev, ny, nx]));

    for j in 0..ny {
        for i in 0..nx {
            let surface = sp[[j, i]];
            let mut column: Vec<f64> = base.to_vec();
            for k in 0..nlev {
                let below = levels[k] > surface;
                if below {
                    column[k] = 0.0;
                }
                if k > 0 && below && levels[k - 1] < surface {
                    column[k - 1] += surface - (levels[k - 1] + levels[k]) / 2.0;
                }
            }
            if nlev > 0 && levels[nlev - 1] < surface {
                column[nlev - 1] += surface - levels[nlev - 1];
            }
            for (k, w) in column.into_iter().enumerate() {
                weights[[k, j, i]] = w;
            }
        }
    }
    weights
}

/// Weighted sum over the level axis (third from last), kept as a length-1 axis
fn weighted_level_sum(values: &ArrayD<f64>, weights: &ArrayD<f64>) -> Result<ArrayD<f64>, OperatorError> {
    let (sum, _) = weighted_level_totals(values, weights)?;
    Ok(sum)
}

/// Weighted mean over the level axis, NaN samples carry no weight
fn weighted_level_mean(values: &ArrayD<f64>, weights: &ArrayD<f64>) -> Result<ArrayD<f64>, OperatorError> {
    let (sum, norm) = weighted_level_totals(values, weights)?;
    let mut mean = sum;
    Zip::from(&mut mean).and(&norm).for_each(|m, &n| {
        *m = if n > 0.0 { *m / n } else { f64::NAN };
    });
    Ok(mean)
}

fn weighted_level_totals(
    values: &ArrayD<f64>,
    weights: &ArrayD<f64>,
) -> Result<(ArrayD<f64>, ArrayD<f64>), OperatorError> {
    let level_axis = Axis(values.ndim() - 3);
    let mut products = values.clone();
    let mut used = ArrayD::<f64>::zeros(values.raw_dim());

    // weights cover the trailing [lev, lat, lon] axes, broadcast over the rest
    let w = weights
        .broadcast(values.raw_dim())
        .ok_or_else(|| OperatorError::WeightShape {
            weights: weights.shape().to_vec(),
            values: values.shape().to_vec(),
        })?;
    Zip::from(&mut products)
        .and(&mut used)
        .and(&w)
        .for_each(|p, u, &wt| {
            if p.is_nan() {
                *p = 0.0;
            } else {
                *p *= wt;
                *u = wt;
            }
        });

    let sum = products.sum_axis(level_axis).insert_axis(level_axis);
    let norm = used.sum_axis(level_axis).insert_axis(level_axis);
    Ok((sum, norm))
}

fn mask_below_surface(mut values: ArrayD<f64>, levels: &[f64], sp: &Array2<f64>) -> ArrayD<f64> {
    let nd = values.ndim();
    for (ix, v) in values.indexed_iter_mut() {
        let (k, j, i) = (ix[nd - 3], ix[nd - 2], ix[nd - 1]);
        if levels[k] > sp[[j, i]] {
            *v = f64::NAN;
        }
    }
    values
}

/// `du/dx + dv/dy` on the trailing `[lat, lon]` axes
fn divergence(
    u: &ArrayD<f64>,
    v: &ArrayD<f64>,
    dims: &[Vec<f64>],
    constants: &Constants,
    operator: &'static str,
) -> Result<ArrayD<f64>, OperatorError> {
    let nd = u.ndim();
    if nd < 2 || dims.len() != nd {
        return Err(OperatorError::RankTooLow { operator, needed: 2, found: nd });
    }
    let (dx, dy) = lonlat_spacing(&dims[nd - 1], &dims[nd - 2], constants);
    let dudi = gradient_axis(u.view(), nd - 1);
    let dvdj = gradient_axis(v.view(), nd - 2);

    let mut div = ArrayD::<f64>::zeros(u.raw_dim());
    for (ix, d) in div.indexed_iter_mut() {
        let (j, i) = (ix[nd - 2], ix[nd - 1]);
        *d = dudi[&ix] / dx[j][i] + dvdj[&ix] / dy[j];
    }
    Ok(div)
}
