use ndarray::{ArrayD, ArrayViewD, Axis, Zip};
use num_traits::Float;

/// Generic linear interpolation between two values
pub fn lin_interp<T: Float>(v0: T, v1: T, fac: T) -> T {
    v0 + (v1 - v0) * fac
}

/// Find the bracketing indices and weight for `target` in ascending `coords`.
///
/// Targets outside the coordinate range get the outermost pair and a weight
/// below 0 or above 1, so `lin_interp` extrapolates linearly.
pub fn find_bracket(coords: &[f64], target: f64) -> Result<(usize, usize, f64), String> {
    if coords.is_empty() {
        return Err("Empty coordinate array".to_string());
    }
    if coords.len() == 1 {
        return Ok((0, 0, 0.0));
    }

    let last = coords.len() - 1;
    let (left, right) = if target <= coords[0] {
        (0, 1)
    } else if target >= coords[last] {
        (last - 1, last)
    } else {
        // Binary search for insertion point
        let mut left = 0;
        let mut right = last;
        while right - left > 1 {
            let mid = (left + right) / 2;
            if coords[mid] <= target {
                left = mid;
            } else {
                right = mid;
            }
        }
        (left, right)
    };

    let span = coords[right] - coords[left];
    if span.abs() < f64::EPSILON {
        return Ok((left, left, 0.0));
    }
    Ok((left, right, (target - coords[left]) / span))
}

/// Interpolate `values` along `axis` from `source` coordinates onto `target`.
///
/// Source coordinates may be ascending or descending; points beyond either
/// end are linearly extrapolated.
pub fn interp_1d_axis(
    values: ArrayViewD<'_, f64>,
    axis: usize,
    source: &[f64],
    target: &[f64],
) -> Result<ArrayD<f64>, String> {
    if axis >= values.ndim() {
        return Err(format!("axis {} out of range for rank {}", axis, values.ndim()));
    }
    if values.shape()[axis] != source.len() {
        return Err(format!(
            "coordinate length {} does not match axis {} length {}",
            source.len(),
            axis,
            values.shape()[axis]
        ));
    }

    // Sort the source once so bracket lookups can binary search
    let mut order: Vec<usize> = (0..source.len()).collect();
    order.sort_by(|&a, &b| source[a].total_cmp(&source[b]));
    let sorted: Vec<f64> = order.iter().map(|&i| source[i]).collect();

    let brackets = target
        .iter()
        .map(|&t| find_bracket(&sorted, t).map(|(l, r, w)| (order[l], order[r], w)))
        .collect::<Result<Vec<_>, String>>()?;

    let mut shape = values.shape().to_vec();
    shape[axis] = target.len();
    let mut out = ArrayD::<f64>::zeros(shape);

    Zip::from(out.lanes_mut(Axis(axis)))
        .and(values.lanes(Axis(axis)))
        .for_each(|mut dst, src| {
            for (k, &(l, r, w)) in brackets.iter().enumerate() {
                dst[k] = if l == r {
                    src[l]
                } else {
                    lin_interp(src[l], src[r], w)
                };
            }
        });

    Ok(out)
}

/// Uniform coordinate sequence `[min, min + delta, ...]` up to and including `max`.
pub fn uniform_grid(min: f64, max: f64, delta: f64) -> Vec<f64> {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    if delta <= 0.0 {
        return vec![lo];
    }
    let n = ((hi - lo) / delta + 1e-9).floor() as usize + 1;
    (0..n).map(|i| lo + i as f64 * delta).collect()
}
