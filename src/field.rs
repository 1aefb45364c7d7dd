//! Gridded field values paired with one coordinate sequence per axis.

use crate::math::{interp_1d_axis, nanmean_lane};
use ndarray::{ArrayD, Axis};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("field has rank {values} but {dims} coordinate sequences")]
    RankMismatch { values: usize, dims: usize },

    #[error("axis {axis} has {len} values but {coords} coordinates")]
    LengthMismatch { axis: usize, len: usize, coords: usize },

    #[error("axis {axis} out of range for rank {ndim}")]
    AxisOutOfRange { axis: isize, ndim: usize },

    #[error("interpolation failed: {0}")]
    Interpolation(String),
}

/// Dense n-dimensional values with a coordinate sequence per axis.
///
/// Axes run slow to fast, `[lead, (level,) lat, lon]` for geophysical
/// fields. Invariant: `dims.len() == values.ndim()` and every
/// `dims[i].len() == values.shape()[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub values: ArrayD<f64>,
    pub dims: Vec<Vec<f64>>,
}

impl Field {
    pub fn new(values: ArrayD<f64>, dims: Vec<Vec<f64>>) -> Result<Self, FieldError> {
        let field = Self { values, dims };
        field.check()?;
        Ok(field)
    }

    /// Re-check the rank/length invariant
    pub fn check(&self) -> Result<(), FieldError> {
        if self.dims.len() != self.values.ndim() {
            return Err(FieldError::RankMismatch {
                values: self.values.ndim(),
                dims: self.dims.len(),
            });
        }
        for (axis, (coords, &len)) in self.dims.iter().zip(self.values.shape()).enumerate() {
            if coords.len() != len {
                return Err(FieldError::LengthMismatch {
                    axis,
                    len,
                    coords: coords.len(),
                });
            }
        }
        Ok(())
    }

    pub fn ndim(&self) -> usize {
        self.values.ndim()
    }

    /// NaN-aware mean over `axes`, keeping each reduced axis with length 1.
    ///
    /// The coordinate of a reduced axis becomes the mean of its coordinates.
    pub fn nanmean_keepdims(&self, axes: &[usize]) -> Result<Field, FieldError> {
        let mut values = self.values.clone();
        let mut dims = self.dims.clone();
        for &axis in axes {
            if axis >= values.ndim() {
                return Err(FieldError::AxisOutOfRange {
                    axis: axis as isize,
                    ndim: values.ndim(),
                });
            }
            if values.len_of(Axis(axis)) == 1 {
                continue;
            }
            values = values
                .map_axis(Axis(axis), nanmean_lane)
                .insert_axis(Axis(axis));
            let centre = crate::math::nanmean(dims[axis].iter());
            dims[axis] = vec![centre];
        }
        Ok(Field { values, dims })
    }

    /// Indices of `axis` whose coordinate lies inside `[lo, hi]` (bounds in either order)
    pub fn value_window(&self, axis: usize, lo: f64, hi: f64) -> Vec<usize> {
        value_window(&self.dims[axis], lo, hi)
    }

    /// Keep only `indices` along `axis`
    pub fn select(&self, axis: usize, indices: &[usize]) -> Field {
        let values = self.values.select(Axis(axis), indices);
        let mut dims = self.dims.clone();
        dims[axis] = indices.iter().map(|&i| self.dims[axis][i]).collect();
        Field { values, dims }
    }

    /// Interpolate `axis` onto `target`, extrapolating beyond the source range
    pub fn regrid_axis(&self, axis: usize, target: &[f64]) -> Result<Field, FieldError> {
        if axis >= self.ndim() {
            return Err(FieldError::AxisOutOfRange {
                axis: axis as isize,
                ndim: self.ndim(),
            });
        }
        let values = interp_1d_axis(self.values.view(), axis, &self.dims[axis], target)
            .map_err(FieldError::Interpolation)?;
        let mut dims = self.dims.clone();
        dims[axis] = target.to_vec();
        Ok(Field { values, dims })
    }
}

/// Turn a possibly negative axis index into an absolute one.
///
/// Already non-negative indices are returned unchanged, so resolving twice
/// is the same as resolving once.
pub fn resolve_axis(axis: isize, ndim: usize) -> Result<usize, FieldError> {
    let resolved = if axis < 0 { axis + ndim as isize } else { axis };
    if resolved < 0 || resolved as usize >= ndim {
        return Err(FieldError::AxisOutOfRange { axis, ndim });
    }
    Ok(resolved as usize)
}

/// Indices whose coordinate lies inside `[lo, hi]`; bound order does not matter
pub fn value_window(coords: &[f64], lo: f64, hi: f64) -> Vec<usize> {
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    let tol = 1e-9 * lo.abs().max(hi.abs()).max(1.0);
    coords
        .iter()
        .enumerate()
        .filter(|(_, &c)| c >= lo - tol && c <= hi + tol)
        .map(|(i, _)| i)
        .collect()
}
