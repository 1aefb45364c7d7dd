use ndarray::ArrayView1;

/// Mean of the non-NaN samples, NaN when there are none
pub fn nanmean<'a, I>(values: I) -> f64
where
    I: IntoIterator<Item = &'a f64>,
{
    let (sum, count) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// NaN-aware mean of a 1-D lane
pub fn nanmean_lane(lane: ArrayView1<'_, f64>) -> f64 {
    nanmean(lane.iter())
}

/// Linear-interpolated percentile (0..=100) of the non-NaN samples
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_by(|a, b| a.total_cmp(b));

    let pos = (q.clamp(0.0, 100.0) / 100.0) * (finite.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(finite[lo] + (finite[hi] - finite[lo]) * frac)
}

/// Round to the nearest value on the 1, 2, 2.5, 5 x 10^k ladder (sign kept)
pub fn nearest_nice_number(value: f64) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    let magnitude = value.abs();
    let exponent = magnitude.log10().floor();
    let base = 10f64.powf(exponent);
    let fraction = magnitude / base;

    let nice = [1.0, 2.0, 2.5, 5.0, 10.0]
        .iter()
        .copied()
        .min_by(|a, b| (a - fraction).abs().total_cmp(&(b - fraction).abs()))
        .unwrap_or(1.0);

    value.signum() * nice * base
}

/// Contour levels from the rounded deciles of the data.
///
/// Duplicates produced by rounding are dropped, first occurrence wins.
pub fn auto_levels(values: &[f64]) -> Vec<f64> {
    let mut levels: Vec<f64> = Vec::new();
    for decile in 0..=10 {
        let Some(p) = percentile(values, decile as f64 * 10.0) else {
            return Vec::new();
        };
        let level = nearest_nice_number(p);
        if !levels.iter().any(|&l| (l - level).abs() <= f64::EPSILON * level.abs().max(1.0)) {
            levels.push(level);
        }
    }
    levels
}
