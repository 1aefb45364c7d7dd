//! Plot-set runner: read, reduce, map onto the figure grid, draw and save.

pub mod grid;
pub mod post;
pub mod reduce;

pub use grid::{cell_for, map_to_grid, to_panel, Cell, CellGrid};
pub use post::{area_mean, format_amean, post_process};
pub use reduce::{
    apply_operators, average_axes, member_mean, non_plot_axes, pair_row, read_rows, regrid_row, row_labels, RowData,
    RowError,
};

use crate::case::Case;
use crate::config::Constants;
use crate::data_io::FieldReader;
use crate::operators::{OperatorContext, SurfacePressureSource};
use crate::options::{GeneralPlotOptions, PlotSet, PlotType, Subplot};
use crate::render::{
    draw_plot_type, DrawStats, FigureLayout, PanelDecorations, PanelLayout, PanelTarget, RenderError, RenderSurface,
};
use log::{error, info, warn};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot create {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Collaborators shared by every plot set of a run
pub struct RunContext<'a> {
    pub reader: &'a dyn FieldReader,
    pub constants: &'a Constants,
    pub surface_pressure: &'a dyn SurfacePressureSource,
    /// Figures land in `{fig_root}/general_plot`
    pub fig_root: PathBuf,
}

impl RunContext<'_> {
    pub fn output_dir(&self) -> PathBuf {
        self.fig_root.join("general_plot")
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlotSetSummary {
    pub figures: Vec<PathBuf>,
    pub stats: DrawStats,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub figures: Vec<PathBuf>,
    pub stats: DrawStats,
    /// `(plot set index, error)` for plot sets that were abandoned
    pub failures: Vec<(usize, String)>,
}

/// Runs one plot set against the cases of a run
pub struct Plotter<'a> {
    cases: &'a [Case],
    plot_set: &'a PlotSet,
    ctx: &'a RunContext<'a>,
    labels: Vec<String>,
}

impl<'a> Plotter<'a> {
    pub fn new(cases: &'a [Case], plot_set: &'a PlotSet, ctx: &'a RunContext<'a>) -> Self {
        Self {
            cases,
            plot_set,
            ctx,
            labels: row_labels(cases, plot_set.with_obs),
        }
    }

    /// Read and reduce every row of `plot_type` down to the plotting and selector axes
    pub fn prepare_rows(&self, plot_type: &PlotType) -> Vec<Option<RowData>> {
        let common = plot_type.common();
        let with_obs = self.plot_set.with_obs;
        let firsts = read_rows(self.ctx.reader, self.cases, with_obs, common, &common.variable);
        let seconds = match &common.variable2 {
            Some(v2) => read_rows(self.ctx.reader, self.cases, with_obs, common, v2),
            None => vec![None; firsts.len()],
        };

        let op_ctx = OperatorContext {
            constants: self.ctx.constants,
            surface_pressure: self.ctx.surface_pressure,
        };
        let selectors = self.plot_set.selector_axes(common.ndim());
        let to_average = non_plot_axes(common.ndim(), common.xy_axis, selectors);

        self.labels
            .iter()
            .zip(firsts.into_iter().zip(seconds))
            .map(|(label, (first, second))| {
                let row = pair_row(first, second, label, common)?;
                let reduced = apply_operators(row, common, &op_ctx).and_then(|row| {
                    let averaged = average_axes(&row, &to_average)?;
                    Ok(regrid_row(&averaged, common)?)
                });
                match reduced {
                    Ok(row) => Some(row),
                    Err(e) => {
                        warn!("{} {}: {}", label, common.variable, e);
                        None
                    }
                }
            })
            .collect()
    }

    /// Finished cells of `plot_type` with their area means
    pub fn cells(&self, plot_type: &PlotType) -> (CellGrid, Vec<Vec<Option<f64>>>) {
        let common = plot_type.common();
        let rows = self.prepare_rows(plot_type);
        let mut cells = map_to_grid(&rows, self.plot_set, common.xy_axis, common.ndim());
        let ameans = cells
            .iter_mut()
            .map(|fig| {
                fig.iter_mut()
                    .map(|cell| cell.as_mut().and_then(|c| post_process(c, common)))
                    .collect()
            })
            .collect();
        (cells, ameans)
    }

    fn layout(&self, ifig: usize) -> FigureLayout {
        let fig = &self.plot_set.figs[ifig];
        FigureLayout {
            path: self.ctx.output_dir().join(&fig.name),
            title: fig.title.clone(),
            figsize: fig.figsize,
            dpi: self.ctx.constants.dpi,
            panels: self
                .plot_set
                .subplots
                .iter()
                .map(|s| PanelLayout {
                    nrows: s.nrows,
                    ncols: s.ncols,
                    index: s.index,
                })
                .collect(),
        }
    }

    fn decorations(&self, ifig: usize, isubplot: usize, subplot: &Subplot, annotations: &[String]) -> PanelDecorations {
        let ps = self.plot_set;
        // untitled panels are lettered by case only when cases run across subplots
        let title = subplot.title.clone().or_else(|| {
            if ps.cases_on_figs() {
                return None;
            }
            let label = self.labels.get(ps.row_for(ifig, isubplot))?;
            let letter = char::from(b'a' + (isubplot % 26) as u8);
            Some(format!("({}) {}", letter, label))
        });
        PanelDecorations {
            title,
            top_right_title: (!annotations.is_empty()).then(|| annotations.join(" ")),
            xlim: ps.xlim,
            ylim: ps.ylim,
            xlabel: ps.xlabel.clone().filter(|_| subplot.is_bottom_row()),
            ylabel: ps.ylabel.clone().filter(|_| subplot.icol == 0),
            world_tick_dx: ps.world_tick_dx,
            world_tick_dy: ps.world_tick_dy,
            fontsize_ticks: ps.fontsize_ticks,
            fontsize_xlabel: ps.fontsize_xlabel,
            fontsize_ylabel: ps.fontsize_ylabel,
            grid_on: ps.grid_on,
            draw_box: ps.draw_box.clone(),
            coastline: ps.coastline.clone(),
        }
    }

    pub fn run(&self, surface: &mut dyn RenderSurface) -> Result<PlotSetSummary, PipelineError> {
        let out_dir = self.ctx.output_dir();
        std::fs::create_dir_all(&out_dir).map_err(|source| PipelineError::CreateDir {
            path: out_dir.clone(),
            source,
        })?;

        let ps = self.plot_set;
        for ifig in 0..ps.figs.len() {
            surface.begin_figure(ifig, &self.layout(ifig))?;
        }

        let mut annotations = vec![vec![Vec::<String>::new(); ps.subplots.len()]; ps.figs.len()];
        let mut stats = DrawStats::default();
        for plot_type in &ps.plot_types {
            info!("{} {}", plot_type.kind(), plot_type.common().variable);
            let (cells, ameans) = self.cells(plot_type);
            stats.add(draw_plot_type(surface, plot_type, &ps.subplots, &cells)?);
            for (ifig, fig) in ameans.iter().enumerate() {
                for (isubplot, amean) in fig.iter().enumerate() {
                    if let Some(value) = amean {
                        annotations[ifig][isubplot].push(format_amean(*value));
                    }
                }
            }
        }

        let mut figures = Vec::with_capacity(ps.figs.len());
        for ifig in 0..ps.figs.len() {
            for (isubplot, subplot) in ps.subplots.iter().enumerate() {
                let target = PanelTarget {
                    figure: ifig,
                    subplot: isubplot,
                };
                let decorations = self.decorations(ifig, isubplot, subplot, &annotations[ifig][isubplot]);
                surface.decorate_panel(target, &decorations)?;
            }
            let path = surface.save_figure(ifig)?;
            info!("saving to {}", path.display());
            figures.push(path);
        }
        Ok(PlotSetSummary { figures, stats })
    }
}

/// Run every plot set; a failing plot set is logged and skipped
pub fn run_plot_sets(
    cases: &[Case],
    options: &GeneralPlotOptions,
    ctx: &RunContext<'_>,
    surface: &mut dyn RenderSurface,
) -> RunReport {
    let total = options.plot_sets.len();
    let mut report = RunReport::default();
    for (i, plot_set) in options.plot_sets.iter().enumerate() {
        info!("[plot_set {}/{}] running", i + 1, total);
        match Plotter::new(cases, plot_set, ctx).run(surface) {
            Ok(summary) => {
                info!(
                    "[plot_set {}/{}] finished: {} figure(s), {} panel(s) drawn, {} skipped",
                    i + 1,
                    total,
                    summary.figures.len(),
                    summary.stats.drawn,
                    summary.stats.skipped
                );
                report.figures.extend(summary.figures);
                report.stats.add(summary.stats);
            }
            Err(e) => {
                error!("[plot_set {}/{}] failed: {}", i + 1, total, e);
                report.failures.push((i, e.to_string()));
            }
        }
    }
    report
}
