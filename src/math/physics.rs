use crate::config::Constants;
use ndarray::{Array1, ArrayD, ArrayViewD, Axis, Zip};

/// Convert latitude/longitude displacement to meters
pub fn deg_to_meters(dlat: f64, dlon: f64, latitude: f64, earth_radius: f64) -> (f64, f64) {
    let lat_rad = latitude.to_radians();
    let dy = dlat.to_radians() * earth_radius;
    let dx = dlon.to_radians() * earth_radius * lat_rad.cos();
    (dx, dy)
}

/// Finite-difference gradient of a 1-D sequence with unit spacing.
///
/// Central differences inside, one-sided differences at both ends.
pub fn gradient_1d(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..n)
            .map(|i| {
                if i == 0 {
                    values[1] - values[0]
                } else if i == n - 1 {
                    values[n - 1] - values[n - 2]
                } else {
                    (values[i + 1] - values[i - 1]) / 2.0
                }
            })
            .collect(),
    }
}

/// Unit-spacing gradient along one axis of an n-dimensional array.
///
/// Same edge treatment as [`gradient_1d`]; an axis of length 1 yields zeros.
pub fn gradient_axis(values: ArrayViewD<'_, f64>, axis: usize) -> ArrayD<f64> {
    let mut out = ArrayD::<f64>::zeros(values.raw_dim());
    let n = values.shape()[axis];
    if n < 2 {
        return out;
    }

    Zip::from(out.lanes_mut(Axis(axis)))
        .and(values.lanes(Axis(axis)))
        .for_each(|mut dst, src| {
            dst[0] = src[1] - src[0];
            dst[n - 1] = src[n - 1] - src[n - 2];
            for i in 1..n - 1 {
                dst[i] = (src[i + 1] - src[i - 1]) / 2.0;
            }
        });
    out
}

/// Grid spacing in meters for a regular lon/lat grid.
///
/// Returns `(dx, dy)` where `dx[j][i]` is the zonal spacing at latitude `j`
/// and `dy[j]` the meridional spacing, both measured with the same
/// unit-spacing gradient used for the field itself.
pub fn lonlat_spacing(lon: &[f64], lat: &[f64], constants: &Constants) -> (Vec<Vec<f64>>, Vec<f64>) {
    let dlon = gradient_1d(lon);
    let dlat = gradient_1d(lat);

    let dx = lat
        .iter()
        .map(|&la| {
            dlon.iter()
                .map(|&dl| deg_to_meters(0.0, dl, la, constants.earth_radius).0)
                .collect()
        })
        .collect();
    let dy = dlat
        .iter()
        .zip(lat)
        .map(|(&dl, &la)| deg_to_meters(dl, 0.0, la, constants.earth_radius).1)
        .collect();

    (dx, dy)
}

/// Half-sum of adjacent level spacings, the thickness each level represents.
pub fn level_thickness(levels: &[f64]) -> Array1<f64> {
    let n = levels.len();
    if n < 2 {
        return Array1::zeros(n);
    }
    let diffs: Vec<f64> = levels.windows(2).map(|w| w[1] - w[0]).collect();
    let mut out = Array1::zeros(n);
    out[0] = diffs[0] / 2.0;
    out[n - 1] = diffs[n - 2] / 2.0;
    for i in 1..n - 1 {
        out[i] = (diffs[i - 1] + diffs[i]) / 2.0;
    }
    out
}
