use super::grid::Cell;
use crate::field::value_window;
use crate::math::{moving_average, nanmean, smoothing_window};
use crate::options::{MathTransform, PlotTypeCommon};

/// Moving average along x (axis 1) then y (axis 0), widths in coordinate units
pub fn smooth_cell(cell: &mut Cell, smooths: [Option<f64>; 2]) {
    let axes = [(smooths[0], cell.x.clone(), 1), (smooths[1], cell.y.clone(), 0)];
    for (width, coords, axis) in axes {
        let (Some(width), Some(coords)) = (width, coords) else {
            continue;
        };
        let window = smoothing_window(width, &coords);
        cell.z = moving_average(&cell.z, window, axis);
        if let Some(v) = &cell.v {
            cell.v = Some(moving_average(v, window, axis));
        }
    }
}

pub fn apply_math(cell: &mut Cell, math: &MathTransform) {
    cell.z.mapv_inplace(|z| math.apply(z));
    if let Some(v) = cell.v.as_mut() {
        v.mapv_inplace(|z| math.apply(z));
    }
}

/// Unweighted NaN-aware mean of `z` inside `[x0, x1, y0, y1]`; bound order does not matter
pub fn area_mean(cell: &Cell, bounds: [f64; 4]) -> Option<f64> {
    let (x, y) = (cell.x.as_ref()?, cell.y.as_ref()?);
    let xi = value_window(x, bounds[0], bounds[1]);
    let yi = value_window(y, bounds[2], bounds[3]);
    if xi.is_empty() || yi.is_empty() {
        return None;
    }
    let inside: Vec<f64> = yi
        .iter()
        .flat_map(|&j| xi.iter().map(move |&i| cell.z[[j, i]]))
        .collect();
    let mean = nanmean(inside.iter());
    mean.is_finite().then_some(mean)
}

/// Smoothing, math, then the optional area mean of the finished cell
pub fn post_process(cell: &mut Cell, common: &PlotTypeCommon) -> Option<f64> {
    smooth_cell(cell, common.smooths);
    if let Some(math) = &common.math {
        apply_math(cell, math);
    }
    common.amean.and_then(|bounds| area_mean(cell, bounds))
}

/// `amean=+1.5E-03`
pub fn format_amean(value: f64) -> String {
    let raw = format!("{:+.1E}", value);
    match raw.split_once('E').map(|(m, e)| (m, e.parse::<i32>())) {
        Some((mantissa, Ok(exp))) => {
            let sign = if exp < 0 { '-' } else { '+' };
            format!("amean={}E{}{:02}", mantissa, sign, exp.abs())
        }
        _ => format!("amean={}", raw),
    }
}
