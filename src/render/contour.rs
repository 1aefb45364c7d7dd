//! Marching-squares contour extraction on a rectilinear grid.

use ndarray::Array2;

pub type Segment = ((f64, f64), (f64, f64));

/// Line segments of the `level` isoline of `z` (`[y, x]`) in data coordinates.
///
/// Squares touching a NaN corner are skipped.
pub fn contour_segments(x: &[f64], y: &[f64], z: &Array2<f64>, level: f64) -> Vec<Segment> {
    let (ny, nx) = z.dim();
    let mut segments = Vec::new();
    if nx < 2 || ny < 2 || x.len() != nx || y.len() != ny {
        return segments;
    }

    for j in 0..ny - 1 {
        for i in 0..nx - 1 {
            let v00 = z[[j, i]];
            let v10 = z[[j, i + 1]];
            let v01 = z[[j + 1, i]];
            let v11 = z[[j + 1, i + 1]];
            if [v00, v10, v01, v11].iter().any(|v| v.is_nan()) {
                continue;
            }

            let case = (v00 >= level) as u8
                | ((v10 >= level) as u8) << 1
                | ((v01 >= level) as u8) << 2
                | ((v11 >= level) as u8) << 3;
            if case == 0 || case == 15 {
                continue;
            }

            let (x0, x1, y0, y1) = (x[i], x[i + 1], y[j], y[j + 1]);
            let frac = |va: f64, vb: f64| {
                if (vb - va).abs() < 1e-12 {
                    0.5
                } else {
                    (level - va) / (vb - va)
                }
            };
            let bottom = (x0 + frac(v00, v10) * (x1 - x0), y0);
            let top = (x0 + frac(v01, v11) * (x1 - x0), y1);
            let left = (x0, y0 + frac(v00, v01) * (y1 - y0));
            let right = (x1, y0 + frac(v10, v11) * (y1 - y0));

            match case {
                1 | 14 => segments.push((bottom, left)),
                2 | 13 => segments.push((bottom, right)),
                3 | 12 => segments.push((left, right)),
                4 | 11 => segments.push((left, top)),
                5 | 10 => segments.push((bottom, top)),
                // saddles: cut off the two corners below (6) or above (9) the level
                6 => {
                    segments.push((bottom, left));
                    segments.push((right, top));
                }
                9 => {
                    segments.push((bottom, right));
                    segments.push((left, top));
                }
                7 | 8 => segments.push((right, top)),
                _ => {}
            }
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_gives_vertical_isoline() {
        let x = [0.0, 1.0, 2.0];
        let y = [0.0, 1.0];
        let z = Array2::from_shape_fn((2, 3), |(_, i)| i as f64);

        let segments = contour_segments(&x, &y, &z, 0.5);
        assert_eq!(segments.len(), 1);
        let ((ax, _), (bx, _)) = segments[0];
        assert!((ax - 0.5).abs() < 1e-12 && (bx - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_column_splits_give_one_segment() {
        let x = [0.0, 1.0];
        let y = [0.0, 1.0];
        let left_high = Array2::from_shape_vec((2, 2), vec![1.0, 0.0, 1.0, 0.0]).unwrap();
        assert_eq!(contour_segments(&x, &y, &left_high, 0.5), vec![((0.5, 0.0), (0.5, 1.0))]);

        let right_high = Array2::from_shape_vec((2, 2), vec![0.0, 1.0, 0.0, 1.0]).unwrap();
        assert_eq!(contour_segments(&x, &y, &right_high, 0.5), vec![((0.5, 0.0), (0.5, 1.0))]);
    }

    #[test]
    fn test_saddle_gives_two_segments() {
        let x = [0.0, 1.0];
        let y = [0.0, 1.0];
        // high on the anti-diagonal: v10 and v01
        let anti = Array2::from_shape_vec((2, 2), vec![0.0, 1.0, 1.0, 0.0]).unwrap();
        assert_eq!(
            contour_segments(&x, &y, &anti, 0.5),
            vec![((0.5, 0.0), (0.0, 0.5)), ((1.0, 0.5), (0.5, 1.0))]
        );

        // high on the diagonal: v00 and v11
        let diag = Array2::from_shape_vec((2, 2), vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(
            contour_segments(&x, &y, &diag, 0.5),
            vec![((0.5, 0.0), (1.0, 0.5)), ((0.0, 0.5), (0.5, 1.0))]
        );
    }

    #[test]
    fn test_flat_and_nan_squares_skipped() {
        let x = [0.0, 1.0];
        let y = [0.0, 1.0];
        let flat = Array2::from_elem((2, 2), 3.0);
        assert!(contour_segments(&x, &y, &flat, 1.0).is_empty());

        let mut holed = Array2::from_shape_fn((2, 2), |(_, i)| i as f64);
        holed[[0, 0]] = f64::NAN;
        assert!(contour_segments(&x, &y, &holed, 0.5).is_empty());
    }
}
