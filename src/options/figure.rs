use super::OptionError;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FigureConfig {
    #[serde(default = "default_figure_name")]
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub dim_means: Option<[f64; 2]>,
    /// Width and height in inches
    #[serde(default)]
    pub figsize: Option<[f64; 2]>,
}

fn default_figure_name() -> String {
    "out.png".to_string()
}

/// One saved artifact
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    /// File name under `<fig_dir>/general_plot`
    pub name: String,
    pub title: Option<String>,
    /// Value window on the `figs_dim_by` axis, or `[i, i]` naming a case row
    pub dim_means: Option<[f64; 2]>,
    pub figsize: [f64; 2],
}

impl Figure {
    pub fn from_config(raw: &FigureConfig, default_figsize: [f64; 2]) -> Result<Self, OptionError> {
        if !raw.name.contains('.') {
            return Err(OptionError::FigureName(raw.name.clone()));
        }
        let figsize = raw.figsize.unwrap_or(default_figsize);
        if figsize.iter().any(|&s| !(s > 0.0)) {
            return Err(OptionError::FigureSize {
                name: raw.name.clone(),
                figsize,
            });
        }
        Ok(Self {
            name: raw.name.clone(),
            title: raw.title.clone(),
            dim_means: raw.dim_means,
            figsize,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubplotConfig {
    /// `[nrows, ncols, index]`, index 1-based
    #[serde(default)]
    pub position: Option<Vec<i64>>,
    #[serde(default)]
    pub dim_means: Option<[f64; 2]>,
    #[serde(default)]
    pub title: Option<String>,
}

/// One panel inside every figure of a plot set
#[derive(Debug, Clone, PartialEq)]
pub struct Subplot {
    pub nrows: usize,
    pub ncols: usize,
    /// 1-based position in row-major order
    pub index: usize,
    pub irow: usize,
    pub icol: usize,
    pub dim_means: Option<[f64; 2]>,
    pub title: Option<String>,
}

impl Subplot {
    pub fn new(nrows: usize, ncols: usize, index: usize) -> Self {
        let (irow, icol) = ((index - 1) / ncols, (index - 1) % ncols);
        Self {
            nrows,
            ncols,
            index,
            irow,
            icol,
            dim_means: None,
            title: None,
        }
    }

    pub fn from_config(raw: &SubplotConfig) -> Result<Self, OptionError> {
        let position = raw.position.clone().unwrap_or_else(|| vec![1, 1, 1]);
        let bad = |reason: &str| OptionError::BadPosition {
            position: position.clone(),
            reason: reason.to_string(),
        };

        if position.len() != 3 {
            return Err(bad("must contain exactly 3 elements"));
        }
        if position.iter().any(|&p| p <= 0) {
            return Err(bad("elements must be >= 1"));
        }
        let (nrows, ncols, index) = (position[0] as usize, position[1] as usize, position[2] as usize);
        if index > nrows * ncols {
            return Err(bad("index outside the grid"));
        }

        let mut subplot = Self::new(nrows, ncols, index);
        subplot.dim_means = raw.dim_means;
        subplot.title = raw.title.clone();
        Ok(subplot)
    }

    /// Top-right cell of the grid, where the colorbar goes
    pub fn is_top_right(&self) -> bool {
        self.irow == 0 && self.icol == self.ncols - 1
    }

    pub fn is_bottom_row(&self) -> bool {
        self.irow == self.nrows - 1
    }
}

/// Default panel grid for `n` rows: 2 rows (3 above 6 panels), enough columns for all
pub fn auto_subplots(n: usize) -> Vec<Subplot> {
    let nrows = if n <= 6 { 2 } else { 3 };
    let ncols = (n / (nrows + 1) + 1).max(n.div_ceil(nrows));
    (1..=n).map(|index| Subplot::new(nrows, ncols, index)).collect()
}
