use ndarray::{Array2, Axis, Zip};

/// Number of samples covered by a smoothing width given in coordinate units.
///
/// Uses the spacing of the first two coordinates; returns 1 (no smoothing)
/// when the spacing is degenerate.
pub fn smoothing_window(width: f64, coords: &[f64]) -> usize {
    if coords.len() < 2 {
        return 1;
    }
    let spacing = (coords[1] - coords[0]).abs();
    if spacing < f64::EPSILON {
        return 1;
    }
    let n = (width / spacing).round();
    if n < 1.0 {
        1
    } else {
        n as usize
    }
}

/// Centred moving average of `window` samples along `axis`.
///
/// NaN samples are ignored; the window shrinks at the array edges.
pub fn moving_average(values: &Array2<f64>, window: usize, axis: usize) -> Array2<f64> {
    if window <= 1 {
        return values.clone();
    }
    let n = values.len_of(Axis(axis));
    let back = window / 2;
    let ahead = window - 1 - back;

    let mut out = Array2::<f64>::zeros(values.raw_dim());
    Zip::from(out.lanes_mut(Axis(axis)))
        .and(values.lanes(Axis(axis)))
        .for_each(|mut dst, src| {
            for i in 0..n {
                let start = i.saturating_sub(back);
                let end = (i + ahead).min(n - 1);
                let (sum, count) = (start..=end)
                    .map(|k| src[k])
                    .filter(|v| !v.is_nan())
                    .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
                dst[i] = if count == 0 { f64::NAN } else { sum / count as f64 };
            }
        });
    out
}
