//! Case rows to the `[figure][subplot]` grid of 2-D cells.

use super::reduce::{average_axes, non_plot_axes, RowData};
use crate::field::{value_window, FieldError};
use crate::options::PlotSet;
use log::warn;
use ndarray::{Array2, ArrayD, IxDyn};
use rayon::prelude::*;

/// Finished 2-D data for one panel. `z` and `v` are `[y, x]`; a line plot
/// has one of `x`/`y` absent and a length-1 axis on that side.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub x: Option<Vec<f64>>,
    pub y: Option<Vec<f64>>,
    pub z: Array2<f64>,
    pub v: Option<Array2<f64>>,
    /// Row the data came from
    pub row: usize,
}

/// `[figure][subplot]`
pub type CellGrid = Vec<Vec<Option<Cell>>>;

/// Build every cell of the plot set. Figures are computed in parallel.
pub fn map_to_grid(rows: &[Option<RowData>], plot_set: &PlotSet, xy_axis: [Option<usize>; 2], ndim: usize) -> CellGrid {
    let selectors = plot_set.selector_axes(ndim);
    (0..plot_set.figs.len())
        .into_par_iter()
        .map(|ifig| {
            (0..plot_set.subplots.len())
                .map(|isubplot| {
                    let irow = plot_set.row_for(ifig, isubplot);
                    let row = rows.get(irow)?.as_ref()?;
                    let windows = [plot_set.figs[ifig].dim_means, plot_set.subplots[isubplot].dim_means];
                    match cell_for(row, irow, xy_axis, selectors, windows) {
                        Ok(cell) => cell,
                        Err(e) => {
                            warn!("figure {} subplot {}: {}", ifig, isubplot, e);
                            None
                        }
                    }
                })
                .collect()
        })
        .collect()
}

/// Slice the selector axes to their windows, average what is left off the
/// plotting axes and lay the result out as `[y, x]`
pub fn cell_for(
    row: &RowData,
    irow: usize,
    xy_axis: [Option<usize>; 2],
    selector_axes: [Option<usize>; 2],
    windows: [Option<[f64; 2]>; 2],
) -> Result<Option<Cell>, FieldError> {
    let mut current = row.clone();
    for (axis, window) in selector_axes.iter().zip(windows) {
        let (Some(axis), Some([lo, hi])) = (*axis, window) else {
            continue;
        };
        let indices = value_window(&current.dims[axis], lo, hi);
        if indices.is_empty() {
            warn!("window [{}, {}] on axis {} selects nothing", lo, hi, axis);
            return Ok(None);
        }
        current = current.map_fields(|f| Ok(f.select(axis, &indices)))?;
    }

    let rest = non_plot_axes(current.ndim(), xy_axis, [None, None]);
    let reduced = average_axes(&current, &rest)?;

    Ok(Some(Cell {
        x: xy_axis[0].map(|a| reduced.dims[a].clone()),
        y: xy_axis[1].map(|a| reduced.dims[a].clone()),
        z: to_panel(&reduced.values, xy_axis),
        v: reduced.values2.as_ref().map(|v| to_panel(v, xy_axis)),
        row: irow,
    }))
}

/// Lay out a field whose non-plotting axes all have length 1 as `[y, x]`
pub fn to_panel(values: &ArrayD<f64>, xy_axis: [Option<usize>; 2]) -> Array2<f64> {
    let len = |axis: Option<usize>| axis.map(|a| values.shape()[a]).unwrap_or(1);
    let (ny, nx) = (len(xy_axis[1]), len(xy_axis[0]));
    Array2::from_shape_fn((ny, nx), |(j, i)| {
        let mut index = vec![0; values.ndim()];
        if let Some(a) = xy_axis[1] {
            index[a] = j;
        }
        if let Some(a) = xy_axis[0] {
            index[a] = i;
        }
        values[IxDyn(&index)]
    })
}
