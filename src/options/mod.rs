//! Declarative plot configuration: raw TOML shapes plus the validated
//! descriptors the pipeline consumes.

pub mod figure;
pub mod plot_set;
pub mod plot_type;
pub mod style;

pub use figure::*;
pub use plot_set::*;
pub use plot_type::*;
pub use style::*;

use crate::config::Constants;
use crate::operators::OperatorError;
use thiserror::Error;

/// Configuration errors; always fatal and raised before any data is read
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptionError {
    #[error("number of cases must be positive")]
    NoCases,

    #[error("found 0 plot sets")]
    NoPlotSets,

    #[error("duplicate figure name \"{0}\"")]
    DuplicateFigure(String),

    #[error("\"figs\" must contain at least 1 element")]
    EmptyFigs,

    #[error("\"subplots\" must contain at least 1 element when given")]
    EmptySubplots,

    #[error("figure name \"{0}\" has no \".\" extension")]
    FigureName(String),

    #[error("figure \"{name}\": figsize {figsize:?} must be positive")]
    FigureSize { name: String, figsize: [f64; 2] },

    #[error("selector only takes the literal \"case\" or an integer axis, found \"{0}\"")]
    BadDimBy(String),

    #[error("both \"figs_dim_by\" and \"subplots_dim_by\" are \"case\"")]
    BothCaseSelectors,

    #[error("unable to place cases: set \"case\" on either \"figs_dim_by\" or \"subplots_dim_by\"")]
    NoCaseSelector,

    #[error("unable to derive \"subplots\" for subplots_dim_by = {0}; specify them explicitly")]
    NoSubplots(String),

    #[error("{what} dim_means {window:?} given but {what}s_dim_by is not set")]
    DimMeansWithoutSelector { what: &'static str, window: [f64; 2] },

    #[error("{what} dim_means {window:?} must name a single case index in 0..{rows}")]
    CaseWindow { what: &'static str, window: [f64; 2], rows: usize },

    #[error("{count} {what}s along the case axis but only {rows} rows")]
    TooManyForCases { what: &'static str, count: usize, rows: usize },

    #[error("bad subplot position {position:?}: {reason}")]
    BadPosition { position: Vec<i64>, reason: String },

    #[error("plot set has no shadings, contours, vectors or lines")]
    NoPlotTypes,

    #[error("draw_box: {0}")]
    DrawBox(String),

    #[error("unknown colour \"{0}\"")]
    BadColor(String),

    #[error(transparent)]
    Operator(#[from] OperatorError),

    #[error("{kind} \"{variable}\": {reason}")]
    PlotType {
        kind: &'static str,
        variable: String,
        reason: String,
    },

    #[error("{kind} \"{variable}\": duplicate axes among figs_dim_by, subplots_dim_by and xy_axis {axes:?}")]
    AxisCollision {
        kind: &'static str,
        variable: String,
        axes: Vec<usize>,
    },
}

/// Every plot set of a run, validated together
#[derive(Debug, Clone)]
pub struct GeneralPlotOptions {
    pub num_cases: usize,
    pub plot_sets: Vec<PlotSet>,
}

impl GeneralPlotOptions {
    /// Validate all plot sets; figure names are checked for duplicates across sets
    pub fn from_config(
        num_cases: usize,
        plot_sets: &[PlotSetConfig],
        constants: &Constants,
    ) -> Result<Self, OptionError> {
        if num_cases == 0 {
            return Err(OptionError::NoCases);
        }
        if plot_sets.is_empty() {
            return Err(OptionError::NoPlotSets);
        }

        let plot_sets = plot_sets
            .iter()
            .map(|raw| PlotSet::from_config(num_cases, raw, constants))
            .collect::<Result<Vec<_>, _>>()?;

        let mut names: Vec<&str> = Vec::new();
        for fig in plot_sets.iter().flat_map(|ps| ps.figs.iter()) {
            if names.contains(&fig.name.as_str()) {
                return Err(OptionError::DuplicateFigure(fig.name.clone()));
            }
            names.push(&fig.name);
        }

        Ok(Self { num_cases, plot_sets })
    }
}

pub(crate) fn check_color(color: Option<&String>) -> Result<(), OptionError> {
    match color {
        Some(c) if parse_color(c).is_none() => Err(OptionError::BadColor(c.clone())),
        _ => Ok(()),
    }
}
