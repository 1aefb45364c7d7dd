//! Rendering contract and the per-plot-type draw behaviours.

pub mod colormap;
pub mod contour;
pub mod dispatch;
pub mod plotters_surface;

pub use dispatch::{draw_plot_type, DrawStats, VectorScale};
pub use plotters_surface::PlottersSurface;

use crate::options::{Colormap, ContourStyle, DrawBox, LineStyle, VectorStyle};
use ndarray::Array2;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("figure {0} was never started")]
    UnknownFigure(usize),

    #[error("figure {figure} has no subplot {subplot}")]
    UnknownPanel { figure: usize, subplot: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One panel of one figure in the current plot set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PanelTarget {
    pub figure: usize,
    pub subplot: usize,
}

/// Grid slot of a panel, `index` 1-based in row-major order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelLayout {
    pub nrows: usize,
    pub ncols: usize,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FigureLayout {
    pub path: PathBuf,
    pub title: Option<String>,
    /// Inches
    pub figsize: [f64; 2],
    pub dpi: f64,
    pub panels: Vec<PanelLayout>,
}

/// Axis furniture applied once all data is drawn
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PanelDecorations {
    pub title: Option<String>,
    pub top_right_title: Option<String>,
    pub xlim: Option<[f64; 2]>,
    pub ylim: Option<[f64; 2]>,
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
    pub world_tick_dx: Option<f64>,
    pub world_tick_dy: Option<f64>,
    pub fontsize_ticks: Option<f64>,
    pub fontsize_xlabel: Option<f64>,
    pub fontsize_ylabel: Option<f64>,
    pub grid_on: bool,
    pub draw_box: Option<DrawBox>,
    pub coastline: Option<LineStyle>,
}

/// A drawing backend, created once by the caller and handed to the pipeline.
///
/// `z` arrays are `[y, x]`.
pub trait RenderSurface {
    fn begin_figure(&mut self, figure: usize, layout: &FigureLayout) -> Result<(), RenderError>;

    #[allow(clippy::too_many_arguments)]
    fn draw_filled_contours(
        &mut self,
        target: PanelTarget,
        x: &[f64],
        y: &[f64],
        z: &Array2<f64>,
        levels: &[f64],
        colormap: Colormap,
        draw_colorbar: bool,
    ) -> Result<(), RenderError>;

    /// One pass per style; every style carries its levels
    fn draw_contour_lines(
        &mut self,
        target: PanelTarget,
        x: &[f64],
        y: &[f64],
        z: &Array2<f64>,
        styles: &[ContourStyle],
    ) -> Result<(), RenderError>;

    /// Returns the style actually used, with the arrow scale filled in
    fn draw_vectors(
        &mut self,
        target: PanelTarget,
        x: &[f64],
        y: &[f64],
        u: &Array2<f64>,
        v: &Array2<f64>,
        style: &VectorStyle,
    ) -> Result<VectorStyle, RenderError>;

    fn draw_line(&mut self, target: PanelTarget, x: &[f64], y: &[f64], style: &LineStyle) -> Result<(), RenderError>;

    fn decorate_panel(&mut self, target: PanelTarget, decorations: &PanelDecorations) -> Result<(), RenderError>;

    /// Write the figure to its layout path
    fn save_figure(&mut self, figure: usize) -> Result<PathBuf, RenderError>;
}
