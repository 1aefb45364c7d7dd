//! Per-row stages: read, operators, non-plot-axis averaging, regridding.

use crate::case::Case;
use crate::data_io::{FieldReader, ModelRequest, ObsRequest, DEFAULT_OBS_SOURCE};
use crate::field::{Field, FieldError};
use crate::math::{nanmean, uniform_grid};
use crate::operators::{OperatorContext, OperatorError};
use crate::options::PlotTypeCommon;
use crate::time_utils::{day_number, valid_time_window};
use log::{debug, warn};
use ndarray::{ArrayD, Axis, Zip};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RowError {
    #[error(transparent)]
    Operator(#[from] OperatorError),

    #[error(transparent)]
    Field(#[from] FieldError),
}

/// One row's data: the primary variable and an optional second component
/// on the same coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct RowData {
    pub dims: Vec<Vec<f64>>,
    pub values: ArrayD<f64>,
    pub values2: Option<ArrayD<f64>>,
}

impl RowData {
    pub fn ndim(&self) -> usize {
        self.values.ndim()
    }

    fn field(&self) -> Field {
        Field {
            values: self.values.clone(),
            dims: self.dims.clone(),
        }
    }

    fn field2(&self) -> Option<Field> {
        self.values2.as_ref().map(|values| Field {
            values: values.clone(),
            dims: self.dims.clone(),
        })
    }

    /// Apply `op` to the primary field and, if present, the second one
    pub(crate) fn map_fields<F>(&self, op: F) -> Result<RowData, FieldError>
    where
        F: Fn(&Field) -> Result<Field, FieldError>,
    {
        let first = op(&self.field())?;
        let second = self.field2().map(|f| op(&f)).transpose()?;
        Ok(RowData {
            dims: first.dims,
            values: first.values,
            values2: second.map(|f| f.values),
        })
    }
}

/// Row labels in display order: `obs` (when present) then the case names
pub fn row_labels(cases: &[Case], with_obs: bool) -> Vec<String> {
    with_obs
        .then(|| "obs".to_string())
        .into_iter()
        .chain(cases.iter().map(|c| c.name.clone()))
        .collect()
}

/// Read `variable` for every row. Failed or empty reads become `None` with a warning.
pub fn read_rows(
    reader: &dyn FieldReader,
    cases: &[Case],
    with_obs: bool,
    common: &PlotTypeCommon,
    variable: &str,
) -> Vec<Option<Field>> {
    let mut rows = Vec::with_capacity(cases.len() + usize::from(with_obs));
    if with_obs {
        rows.push(checked_rank(read_observation_row(reader, cases, common, variable), common, variable, "obs"));
    }
    for case in cases {
        rows.push(checked_rank(read_case_row(reader, case, common, variable), common, variable, &case.name));
    }
    rows
}

fn checked_rank(field: Option<Field>, common: &PlotTypeCommon, variable: &str, label: &str) -> Option<Field> {
    let field = field?;
    if field.ndim() != common.ndim() {
        warn!(
            "{} {}: read {} axes but min_maxs names {}, row dropped",
            label,
            variable,
            field.ndim(),
            common.ndim()
        );
        return None;
    }
    Some(field)
}

fn read_observation_row(
    reader: &dyn FieldReader,
    cases: &[Case],
    common: &PlotTypeCommon,
    variable: &str,
) -> Option<Field> {
    let init_times: Vec<_> = cases.iter().flat_map(|c| c.model.init_times()).collect();
    let window = valid_time_window(&init_times, common.min_maxs[0])?;
    let init_day = init_times.iter().min().copied().map(day_number)?;
    let mut min_maxs = common.min_maxs.clone();
    min_maxs[0] = window;

    let request = ObsRequest {
        variable,
        kind: common.total_anomaly,
        min_maxs: &min_maxs,
        init_day,
        source: common.obs_source.as_deref().unwrap_or(DEFAULT_OBS_SOURCE),
        clim_years: common.obs_clim_yr,
    };
    match reader.read_observation(&request) {
        Ok(Some(field)) => Some(field),
        Ok(None) => {
            warn!("obs {} ({}): no data is read", variable, request.source);
            None
        }
        Err(e) => {
            warn!("obs {} ({}): {}", variable, request.source, e);
            None
        }
    }
}

fn read_case_row(reader: &dyn FieldReader, case: &Case, common: &PlotTypeCommon, variable: &str) -> Option<Field> {
    let mut members = Vec::with_capacity(case.model.members.len());
    for &member in &case.model.members {
        let request = ModelRequest {
            model: &case.model,
            member,
            variable,
            kind: common.total_anomaly,
            min_maxs: &common.min_maxs,
            clim_years: case.model.clim_years,
        };
        match reader.read_model(&request) {
            Ok(Some(field)) => members.push(field),
            Ok(None) => debug!("{} {} {}: no data", case.name, variable, member.label()),
            Err(e) => warn!("{} {} {}: {}", case.name, variable, member.label(), e),
        }
    }
    if members.is_empty() {
        warn!("{} {}: no data is read", case.name, variable);
        return None;
    }
    member_mean(members)
}

/// NaN-aware mean of same-shaped member fields; the first member's coordinates are kept
pub fn member_mean(members: Vec<Field>) -> Option<Field> {
    let mut iter = members.into_iter();
    let first = iter.next()?;
    let rest: Vec<Field> = iter
        .filter(|f| {
            let same = f.values.shape() == first.values.shape();
            if !same {
                warn!("member with shape {:?} skipped, expected {:?}", f.values.shape(), first.values.shape());
            }
            same
        })
        .collect();
    if rest.is_empty() {
        return Some(first);
    }

    let mut sum = first.values.mapv(|v| if v.is_nan() { 0.0 } else { v });
    let mut count = first.values.mapv(|v| if v.is_nan() { 0.0 } else { 1.0 });
    for member in &rest {
        Zip::from(&mut sum)
            .and(&mut count)
            .and(&member.values)
            .for_each(|s, c, &v| {
                if !v.is_nan() {
                    *s += v;
                    *c += 1.0;
                }
            });
    }
    Zip::from(&mut sum)
        .and(&count)
        .for_each(|s, &c| *s = if c > 0.0 { *s / c } else { f64::NAN });
    Some(Field {
        values: sum,
        dims: first.dims,
    })
}

/// Pair the primary and second-variable reads of one row.
///
/// A missing primary field drops the row; a missing second field is
/// dropped with a warning when the plot type asks for one.
pub fn pair_row(first: Option<Field>, second: Option<Field>, label: &str, common: &PlotTypeCommon) -> Option<RowData> {
    let first = first?;
    let values2 = match (second, &common.variable2) {
        (Some(second), _) if second.values.shape() == first.values.shape() => Some(second.values),
        (Some(second), Some(v2)) => {
            warn!(
                "{} {}: shape {:?} does not match {} {:?}, row dropped",
                label,
                v2,
                second.values.shape(),
                common.variable,
                first.values.shape()
            );
            return None;
        }
        (None, Some(v2)) => {
            warn!("{} {}: second variable missing, row dropped", label, v2);
            return None;
        }
        _ => None,
    };
    Some(RowData {
        dims: first.dims,
        values: first.values,
        values2,
    })
}

/// Run the operator chain; an axis shrunk to length 1 gets the mean of its old coordinates
pub fn apply_operators(row: RowData, common: &PlotTypeCommon, ctx: &OperatorContext<'_>) -> Result<RowData, RowError> {
    let RowData {
        mut dims,
        mut values,
        mut values2,
    } = row;
    for op in &common.operators {
        let (next, next2) = op.apply(values, &dims, values2, ctx)?;
        for (coords, &len) in dims.iter_mut().zip(next.shape()) {
            if coords.len() != len && len == 1 {
                *coords = vec![nanmean(coords.iter())];
            }
        }
        values = next;
        values2 = next2;
    }
    let checked = Field::new(values, dims)?;
    Ok(RowData {
        dims: checked.dims,
        values: checked.values,
        values2,
    })
}

/// Axes averaged away before plotting: everything except the plotting axes and the selector axes
pub fn non_plot_axes(ndim: usize, xy_axis: [Option<usize>; 2], selector_axes: [Option<usize>; 2]) -> Vec<usize> {
    let keep: Vec<usize> = xy_axis.iter().chain(selector_axes.iter()).flatten().copied().collect();
    (0..ndim).filter(|a| !keep.contains(a)).collect()
}

/// Mean over `axes`, keeping each as length 1
pub fn average_axes(row: &RowData, axes: &[usize]) -> Result<RowData, FieldError> {
    row.map_fields(|f| f.nanmean_keepdims(axes))
}

/// Interpolate the plotting axes onto uniform grids spanning their `min_maxs` window
pub fn regrid_row(row: &RowData, common: &PlotTypeCommon) -> Result<RowData, FieldError> {
    let mut out = row.clone();
    let deltas = [common.regrid_delta_x, common.regrid_delta_y];
    for (axis, delta) in common.xy_axis.iter().zip(deltas) {
        let Some(axis) = *axis else { continue };
        let [a, b] = common.min_maxs[axis];
        let target = uniform_grid(a.min(b), a.max(b), delta);
        if out.values.len_of(Axis(axis)) == target.len() && out.dims[axis] == target {
            continue;
        }
        out = out.map_fields(|f| f.regrid_axis(axis, &target))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Constants;
    use crate::options::{PlotType, ShadingConfig};
    use ndarray::IxDyn;

    fn common(extra: &str) -> PlotTypeCommon {
        let text = format!(
            "variable = \"u\"\nxy_axis = [-1, -2]\nmin_maxs = [[0, 2], [0, 2], [0, 3]]\n{}",
            extra
        );
        let raw: ShadingConfig = toml::from_str(&text).unwrap();
        PlotType::shading(&raw, &Constants::default()).unwrap().common().clone()
    }

    fn row(shape: [usize; 3]) -> RowData {
        let values = ArrayD::from_shape_fn(IxDyn(&shape), |ix| (ix[0] * 100 + ix[1] * 10 + ix[2]) as f64);
        let dims = shape.iter().map(|&n| (0..n).map(|i| i as f64).collect()).collect();
        RowData {
            dims,
            values,
            values2: None,
        }
    }

    #[test]
    fn test_member_mean_ignores_nan() {
        let dims = vec![vec![0.0, 1.0]];
        let a = Field::new(ArrayD::from_shape_vec(IxDyn(&[2]), vec![1.0, f64::NAN]).unwrap(), dims.clone()).unwrap();
        let b = Field::new(ArrayD::from_shape_vec(IxDyn(&[2]), vec![3.0, 4.0]).unwrap(), dims).unwrap();
        let mean = member_mean(vec![a, b]).unwrap();
        assert_eq!(mean.values.as_slice().unwrap(), &[2.0, 4.0]);
    }

    #[test]
    fn test_non_plot_axes() {
        assert_eq!(non_plot_axes(4, [Some(3), Some(2)], [None, Some(1)]), vec![0]);
        assert_eq!(non_plot_axes(3, [None, Some(0)], [None, None]), vec![1, 2]);
    }

    #[test]
    fn test_averaging_keeps_rank() {
        let averaged = average_axes(&row([3, 3, 4]), &[0]).unwrap();
        assert_eq!(averaged.values.shape(), &[1, 3, 4]);
        assert_eq!(averaged.dims[0], vec![1.0]);
        assert_eq!(averaged.values[[0, 0, 0]], 100.0);
    }

    #[test]
    fn test_regrid_on_target_grid_is_identity() {
        let c = common("");
        let original = row([3, 3, 4]);
        let regridded = regrid_row(&original, &c).unwrap();
        assert_eq!(regridded, original);

        let fine = common("regrid_delta_x = 0.5");
        let finer = regrid_row(&original, &fine).unwrap();
        assert_eq!(finer.values.shape(), &[3, 3, 7]);
        assert!((finer.values[[0, 0, 1]] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_pair_row_needs_second_variable() {
        let c = common("variable2 = \"v\"");
        let first = Field::new(row([1, 1, 2]).values, row([1, 1, 2]).dims).unwrap();
        assert!(pair_row(Some(first.clone()), None, "obs", &c).is_none());
        let paired = pair_row(Some(first.clone()), Some(first), "obs", &c).unwrap();
        assert!(paired.values2.is_some());
    }
}
