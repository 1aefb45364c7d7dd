use super::{
    auto_subplots, check_color, ContourConfig, Figure, FigureConfig, LineConfig, LineStyle, OptionError,
    PlotType, ShadingConfig, Subplot, SubplotConfig, VectorConfig,
};
use crate::config::Constants;
use crate::field::resolve_axis;
use serde::Deserialize;
use std::fmt;

/// What varies across figures or subplots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "DimByConfig")]
pub enum DimBy {
    /// The virtual case (row) axis
    Case,
    /// A source axis, possibly negative
    Axis(isize),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DimByConfig {
    Axis(isize),
    Name(String),
}

impl TryFrom<DimByConfig> for DimBy {
    type Error = OptionError;

    fn try_from(raw: DimByConfig) -> Result<Self, Self::Error> {
        match raw {
            DimByConfig::Axis(i) => Ok(DimBy::Axis(i)),
            DimByConfig::Name(name) if name == "case" => Ok(DimBy::Case),
            DimByConfig::Name(name) => Err(OptionError::BadDimBy(name)),
        }
    }
}

impl fmt::Display for DimBy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DimBy::Case => write!(f, "case"),
            DimBy::Axis(i) => write!(f, "axis {}", i),
        }
    }
}

/// Resolve an optional selector to an absolute source axis; `Case` and `None` give `None`
pub fn selector_axis(dim_by: Option<DimBy>, ndim: usize) -> Option<usize> {
    match dim_by {
        Some(DimBy::Axis(i)) => resolve_axis(i, ndim).ok(),
        _ => None,
    }
}

/// `[[general_plot.plot_sets]]` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlotSetConfig {
    #[serde(default)]
    pub shadings: Vec<ShadingConfig>,
    #[serde(default)]
    pub contours: Vec<ContourConfig>,
    #[serde(default)]
    pub vectors: Vec<VectorConfig>,
    #[serde(default)]
    pub lines: Vec<LineConfig>,

    #[serde(default)]
    pub figs: Vec<FigureConfig>,
    #[serde(default)]
    pub figs_dim_by: Option<DimBy>,
    #[serde(default)]
    pub subplots: Option<Vec<SubplotConfig>>,
    #[serde(default)]
    pub subplots_dim_by: Option<DimBy>,

    /// Put observations in row 0, before the cases
    #[serde(default = "default_true")]
    pub with_obs: bool,

    /// `[x0, x1, y0, y1, { line style }]`
    #[serde(default)]
    pub draw_box: Option<Vec<toml::Value>>,
    #[serde(default)]
    pub coastline: Option<LineStyle>,

    #[serde(default)]
    pub xlim: Option<[f64; 2]>,
    #[serde(default)]
    pub ylim: Option<[f64; 2]>,
    #[serde(default)]
    pub world_tick_dx: Option<f64>,
    #[serde(default)]
    pub world_tick_dy: Option<f64>,
    #[serde(default)]
    pub xlabel: Option<String>,
    #[serde(default)]
    pub ylabel: Option<String>,
    #[serde(default)]
    pub fontsize_ticks: Option<f64>,
    #[serde(default)]
    pub fontsize_xlabel: Option<f64>,
    #[serde(default)]
    pub fontsize_ylabel: Option<f64>,
    #[serde(default)]
    pub grid_on: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawBox {
    /// `[x0, x1, y0, y1]`
    pub bounds: [f64; 4],
    pub style: LineStyle,
}

impl DrawBox {
    fn from_values(values: &[toml::Value]) -> Result<Self, OptionError> {
        if values.len() != 5 {
            return Err(OptionError::DrawBox(format!(
                "must be 5 elements [x0, x1, y0, y1, {{line style}}], found {}",
                values.len()
            )));
        }
        let mut bounds = [0.0; 4];
        for (value, bound) in values[..4].iter().zip(bounds.iter_mut()) {
            *bound = match value {
                toml::Value::Integer(i) => *i as f64,
                toml::Value::Float(f) => *f,
                other => return Err(OptionError::DrawBox(format!("bound {} is not a number", other))),
            };
        }
        let style: LineStyle = match &values[4] {
            toml::Value::Table(_) => values[4]
                .clone()
                .try_into()
                .map_err(|e| OptionError::DrawBox(format!("line style: {}", e)))?,
            other => return Err(OptionError::DrawBox(format!("5th element must be a table, found {}", other))),
        };
        check_color(style.color.as_ref())?;
        Ok(Self { bounds, style })
    }

    /// Closed outline `x0,y0 -> x0,y1 -> x1,y1 -> x1,y0 -> x0,y0`
    pub fn outline(&self) -> Vec<(f64, f64)> {
        let [x0, x1, y0, y1] = self.bounds;
        vec![(x0, y0), (x0, y1), (x1, y1), (x1, y0), (x0, y0)]
    }
}

/// Validated family of figures sharing layout and styling
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSet {
    /// Drawn in this order: shadings, vectors, contours, lines
    pub plot_types: Vec<PlotType>,
    pub figs: Vec<Figure>,
    pub figs_dim_by: Option<DimBy>,
    pub subplots: Vec<Subplot>,
    pub subplots_dim_by: Option<DimBy>,
    pub with_obs: bool,
    /// Observation row (if any) plus one row per case
    pub num_rows: usize,
    pub draw_box: Option<DrawBox>,
    pub coastline: Option<LineStyle>,
    pub xlim: Option<[f64; 2]>,
    pub ylim: Option<[f64; 2]>,
    pub world_tick_dx: Option<f64>,
    pub world_tick_dy: Option<f64>,
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
    pub fontsize_ticks: Option<f64>,
    pub fontsize_xlabel: Option<f64>,
    pub fontsize_ylabel: Option<f64>,
    pub grid_on: bool,
}

impl PlotSet {
    pub fn from_config(num_cases: usize, raw: &PlotSetConfig, constants: &Constants) -> Result<Self, OptionError> {
        if raw.figs.is_empty() {
            return Err(OptionError::EmptyFigs);
        }
        let num_rows = num_cases + usize::from(raw.with_obs);

        let draw_box = raw.draw_box.as_deref().map(DrawBox::from_values).transpose()?;
        if let Some(style) = &raw.coastline {
            check_color(style.color.as_ref())?;
        }

        // cases go on subplots unless the figures already take them
        let figs_dim_by = raw.figs_dim_by;
        let mut subplots_dim_by = raw.subplots_dim_by;
        if figs_dim_by != Some(DimBy::Case) && subplots_dim_by.is_none() {
            subplots_dim_by = Some(DimBy::Case);
        }
        match (figs_dim_by == Some(DimBy::Case), subplots_dim_by == Some(DimBy::Case)) {
            (true, true) => return Err(OptionError::BothCaseSelectors),
            (false, false) => return Err(OptionError::NoCaseSelector),
            _ => {}
        }

        let figs = raw
            .figs
            .iter()
            .map(|f| Figure::from_config(f, constants.figsize))
            .collect::<Result<Vec<_>, _>>()?;

        let subplots = match &raw.subplots {
            Some(list) if list.is_empty() => return Err(OptionError::EmptySubplots),
            Some(list) => list.iter().map(Subplot::from_config).collect::<Result<Vec<_>, _>>()?,
            None => match subplots_dim_by {
                Some(DimBy::Case) => auto_subplots(num_rows),
                None => vec![Subplot::new(1, 1, 1)],
                Some(axis) => return Err(OptionError::NoSubplots(axis.to_string())),
            },
        };

        let fig_windows: Vec<Option<[f64; 2]>> = figs.iter().map(|f| f.dim_means).collect();
        let subplot_windows: Vec<Option<[f64; 2]>> = subplots.iter().map(|s| s.dim_means).collect();
        check_windows("figure", figs_dim_by, &fig_windows, num_rows)?;
        check_windows("subplot", subplots_dim_by, &subplot_windows, num_rows)?;

        let plot_types = raw
            .shadings
            .iter()
            .map(|c| PlotType::shading(c, constants))
            .chain(raw.vectors.iter().map(|c| PlotType::vector(c, constants)))
            .chain(raw.contours.iter().map(|c| PlotType::contour(c, constants)))
            .chain(raw.lines.iter().map(|c| PlotType::line(c, constants)))
            .collect::<Result<Vec<_>, _>>()?;
        if plot_types.is_empty() {
            return Err(OptionError::NoPlotTypes);
        }
        for plot_type in &plot_types {
            check_axis_collision(plot_type, figs_dim_by, subplots_dim_by)?;
        }

        let xlim = raw.xlim.or_else(|| union_limits(plot_types.iter().map(|p| p.common().auto_xlim())));
        let ylim = raw.ylim.or_else(|| union_limits(plot_types.iter().map(|p| p.common().auto_ylim())));

        Ok(Self {
            plot_types,
            figs,
            figs_dim_by,
            subplots,
            subplots_dim_by,
            with_obs: raw.with_obs,
            num_rows,
            draw_box,
            coastline: raw.coastline.clone(),
            xlim,
            ylim,
            world_tick_dx: raw.world_tick_dx,
            world_tick_dy: raw.world_tick_dy,
            xlabel: raw.xlabel.clone(),
            ylabel: raw.ylabel.clone(),
            fontsize_ticks: raw.fontsize_ticks,
            fontsize_xlabel: raw.fontsize_xlabel,
            fontsize_ylabel: raw.fontsize_ylabel,
            grid_on: raw.grid_on,
        })
    }

    pub fn cases_on_figs(&self) -> bool {
        self.figs_dim_by == Some(DimBy::Case)
    }

    /// Data row feeding cell `(ifig, isubplot)`.
    ///
    /// A degenerate `[i, i]` window on the case selector names the row,
    /// otherwise the figure or subplot index does.
    pub fn row_for(&self, ifig: usize, isubplot: usize) -> usize {
        let (index, window) = if self.cases_on_figs() {
            (ifig, self.figs[ifig].dim_means)
        } else {
            (isubplot, self.subplots[isubplot].dim_means)
        };
        window.map(|w| w[0] as usize).unwrap_or(index)
    }

    /// Source axes named by the figure and subplot selectors, for a field of rank `ndim`
    pub fn selector_axes(&self, ndim: usize) -> [Option<usize>; 2] {
        [
            selector_axis(self.figs_dim_by, ndim),
            selector_axis(self.subplots_dim_by, ndim),
        ]
    }
}

fn check_windows(
    what: &'static str,
    dim_by: Option<DimBy>,
    windows: &[Option<[f64; 2]>],
    rows: usize,
) -> Result<(), OptionError> {
    match dim_by {
        None => {
            if let Some(window) = windows.iter().flatten().next() {
                return Err(OptionError::DimMeansWithoutSelector { what, window: *window });
            }
        }
        Some(DimBy::Case) => {
            if windows.len() > rows {
                return Err(OptionError::TooManyForCases {
                    what,
                    count: windows.len(),
                    rows,
                });
            }
            for window in windows.iter().flatten() {
                let [a, b] = *window;
                let single = a == b && a.fract() == 0.0 && a >= 0.0 && (a as usize) < rows;
                if !single {
                    return Err(OptionError::CaseWindow { what, window: *window, rows });
                }
            }
        }
        Some(DimBy::Axis(_)) => {}
    }
    Ok(())
}

fn check_axis_collision(
    plot_type: &PlotType,
    figs_dim_by: Option<DimBy>,
    subplots_dim_by: Option<DimBy>,
) -> Result<(), OptionError> {
    let common = plot_type.common();
    let ndim = common.ndim();
    let mut axes: Vec<usize> = Vec::new();
    for dim_by in [figs_dim_by, subplots_dim_by].into_iter().flatten() {
        if let DimBy::Axis(i) = dim_by {
            let axis = resolve_axis(i, ndim).map_err(|_| OptionError::PlotType {
                kind: plot_type.kind(),
                variable: common.variable.clone(),
                reason: format!("selector axis {} out of range for {} axes", i, ndim),
            })?;
            axes.push(axis);
        }
    }
    axes.extend(common.xy_axis.iter().flatten());

    let mut seen: Vec<usize> = Vec::new();
    for &axis in &axes {
        if seen.contains(&axis) {
            return Err(OptionError::AxisCollision {
                kind: plot_type.kind(),
                variable: common.variable.clone(),
                axes,
            });
        }
        seen.push(axis);
    }
    Ok(())
}

fn union_limits(limits: impl Iterator<Item = Option<[f64; 2]>>) -> Option<[f64; 2]> {
    limits.flatten().reduce(|acc, l| [acc[0].min(l[0]), acc[1].max(l[1])])
}
