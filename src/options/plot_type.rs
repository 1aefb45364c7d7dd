use super::{check_color, Colormap, ContourStyle, LineStyle, MathTransform, OptionError, VectorStyle};
use crate::config::Constants;
use crate::data_io::TotalAnomaly;
use crate::field::resolve_axis;
use crate::operators::Operator;
use serde::Deserialize;

/// An axis index or the token `"none"` (TOML has no null)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AxisSlot {
    Axis(isize),
    Token(String),
}

/// A number or the token `"none"`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberSlot {
    Value(f64),
    Token(String),
}

fn is_none_token(token: &str) -> bool {
    token.eq_ignore_ascii_case("none")
}

fn default_total_anomaly() -> String {
    "anomaly".to_string()
}

/// Fields shared by every plot kind, as written in the run file
#[derive(Debug, Clone)]
pub struct CommonConfig {
    pub variable: String,
    pub variable2: Option<String>,
    pub xy_axis: [AxisSlot; 2],
    pub min_maxs: Vec<[f64; 2]>,
    pub operators: Vec<String>,
    pub smooths: Option<Vec<NumberSlot>>,
    pub math: Option<MathTransform>,
    pub total_anomaly: String,
    pub obs_source: Option<String>,
    pub obs_clim_yr: Option<Vec<i32>>,
    pub amean: Option<Vec<f64>>,
    pub regrid_delta_x: Option<f64>,
    pub regrid_delta_y: Option<f64>,
}

macro_rules! plot_type_config {
    ($(#[$meta:meta])* $name:ident { $($(#[$fmeta:meta])* $field:ident: $ty:ty,)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Deserialize)]
        #[serde(deny_unknown_fields)]
        pub struct $name {
            pub variable: String,
            #[serde(default)]
            pub variable2: Option<String>,
            pub xy_axis: [AxisSlot; 2],
            pub min_maxs: Vec<[f64; 2]>,
            #[serde(default)]
            pub operators: Vec<String>,
            #[serde(default)]
            pub smooths: Option<Vec<NumberSlot>>,
            #[serde(default)]
            pub math: Option<MathTransform>,
            #[serde(default = "default_total_anomaly")]
            pub total_anomaly: String,
            #[serde(default)]
            pub obs_source: Option<String>,
            #[serde(default)]
            pub obs_clim_yr: Option<Vec<i32>>,
            #[serde(default)]
            pub amean: Option<Vec<f64>>,
            #[serde(default)]
            pub regrid_delta_x: Option<f64>,
            #[serde(default)]
            pub regrid_delta_y: Option<f64>,
            $($(#[$fmeta])* pub $field: $ty,)*
        }

        impl $name {
            pub fn common_config(&self) -> CommonConfig {
                CommonConfig {
                    variable: self.variable.clone(),
                    variable2: self.variable2.clone(),
                    xy_axis: self.xy_axis.clone(),
                    min_maxs: self.min_maxs.clone(),
                    operators: self.operators.clone(),
                    smooths: self.smooths.clone(),
                    math: self.math,
                    total_anomaly: self.total_anomaly.clone(),
                    obs_source: self.obs_source.clone(),
                    obs_clim_yr: self.obs_clim_yr.clone(),
                    amean: self.amean.clone(),
                    regrid_delta_x: self.regrid_delta_x,
                    regrid_delta_y: self.regrid_delta_y,
                }
            }
        }
    };
}

plot_type_config!(
    /// `[[shadings]]` entry
    ShadingConfig {
        #[serde(default)]
        levels: Option<Vec<f64>>,
        #[serde(default)]
        colormap: Colormap,
        /// Unfilled contour overlay drawn over the shading
        #[serde(default)]
        contour: Option<ContourStyle>,
    }
);

plot_type_config!(
    /// `[[contours]]` entry
    ContourConfig {
        styles: Vec<ContourStyle>,
    }
);

plot_type_config!(
    /// `[[vectors]]` entry
    VectorConfig {
        #[serde(default)]
        nx_per_panel: Option<usize>,
        #[serde(default)]
        ny_per_panel: Option<usize>,
        #[serde(default)]
        style: VectorStyle,
    }
);

plot_type_config!(
    /// `[[lines]]` entry
    LineConfig {
        #[serde(default)]
        style: LineStyle,
    }
);

/// Validated settings shared by every plot kind
#[derive(Debug, Clone, PartialEq)]
pub struct PlotTypeCommon {
    pub variable: String,
    pub variable2: Option<String>,
    /// Plotting axes `[x, y]`, already resolved against `min_maxs.len()`
    pub xy_axis: [Option<usize>; 2],
    /// One `[min, max]` per source axis
    pub min_maxs: Vec<[f64; 2]>,
    pub operators: Vec<Operator>,
    /// Smoothing widths along x and y in coordinate units
    pub smooths: [Option<f64>; 2],
    pub math: Option<MathTransform>,
    pub total_anomaly: TotalAnomaly,
    pub obs_source: Option<String>,
    pub obs_clim_yr: [i32; 2],
    /// Area-mean box `[x0, x1, y0, y1]`
    pub amean: Option<[f64; 4]>,
    pub regrid_delta_x: f64,
    pub regrid_delta_y: f64,
}

impl PlotTypeCommon {
    pub fn from_config(
        kind: &'static str,
        raw: &CommonConfig,
        constants: &Constants,
    ) -> Result<Self, OptionError> {
        let fail = |reason: String| OptionError::PlotType {
            kind,
            variable: raw.variable.clone(),
            reason,
        };

        if raw.variable.trim().is_empty() {
            return Err(fail("variable must not be empty".to_string()));
        }
        if raw.min_maxs.is_empty() {
            return Err(fail("min_maxs must list one [min, max] per axis".to_string()));
        }
        let ndim = raw.min_maxs.len();

        let mut xy_axis = [None, None];
        for (slot, out) in raw.xy_axis.iter().zip(xy_axis.iter_mut()) {
            *out = match slot {
                AxisSlot::Axis(i) => Some(
                    resolve_axis(*i, ndim)
                        .map_err(|_| fail(format!("xy_axis {} out of range for {} axes", i, ndim)))?,
                ),
                AxisSlot::Token(t) if is_none_token(t) => None,
                AxisSlot::Token(t) => return Err(fail(format!("xy_axis entry \"{}\" is not an axis", t))),
            };
        }
        if xy_axis[0].is_some() && xy_axis[0] == xy_axis[1] {
            return Err(fail(format!("xy_axis names axis {:?} twice", xy_axis[0])));
        }

        let operators = raw
            .operators
            .iter()
            .map(|name| Operator::from_name(name))
            .collect::<Result<Vec<_>, _>>()?;

        let smooths = match &raw.smooths {
            None => [None, None],
            Some(list) if list.len() == 2 => {
                let mut out = [None, None];
                for (slot, width) in list.iter().zip(out.iter_mut()) {
                    *width = match slot {
                        NumberSlot::Value(v) if *v >= 0.0 => Some(*v),
                        NumberSlot::Value(v) => return Err(fail(format!("negative smoothing width {}", v))),
                        NumberSlot::Token(t) if is_none_token(t) => None,
                        NumberSlot::Token(t) => return Err(fail(format!("smooths entry \"{}\" is not a number", t))),
                    };
                }
                out
            }
            Some(list) => return Err(fail(format!("smooths takes 2 entries, found {}", list.len()))),
        };

        let total_anomaly = match raw.total_anomaly.as_str() {
            "total" => TotalAnomaly::Total,
            "anomaly" => TotalAnomaly::Anomaly,
            other => {
                return Err(fail(format!(
                    "total_anomaly only accepts \"total\" or \"anomaly\", found \"{}\"",
                    other
                )))
            }
        };

        let obs_clim_yr = match &raw.obs_clim_yr {
            None => constants.obs_clim_years,
            Some(years) if years.len() == 2 && years[0] <= years[1] => [years[0], years[1]],
            Some(years) => return Err(fail(format!("obs_clim_yr must be 2 ordered years, found {:?}", years))),
        };

        let amean = match &raw.amean {
            None => None,
            Some(b) if b.len() == 4 => Some([b[0], b[1], b[2], b[3]]),
            Some(b) => return Err(fail(format!("amean must contain 4 numbers, found {}", b.len()))),
        };

        let regrid_delta_x = raw.regrid_delta_x.unwrap_or(constants.regrid_delta);
        let regrid_delta_y = raw.regrid_delta_y.unwrap_or(constants.regrid_delta);
        if !(regrid_delta_x > 0.0 && regrid_delta_y > 0.0) {
            return Err(fail("regrid deltas must be positive".to_string()));
        }

        Ok(Self {
            variable: raw.variable.clone(),
            variable2: raw.variable2.clone(),
            xy_axis,
            min_maxs: raw.min_maxs.clone(),
            operators,
            smooths,
            math: raw.math,
            total_anomaly,
            obs_source: raw.obs_source.clone(),
            obs_clim_yr,
            amean,
            regrid_delta_x,
            regrid_delta_y,
        })
    }

    /// Rank the reads of this plot type are expected to have
    pub fn ndim(&self) -> usize {
        self.min_maxs.len()
    }

    fn axis_limits(&self, axis: Option<usize>) -> Option<[f64; 2]> {
        axis.map(|i| {
            let [a, b] = self.min_maxs[i];
            [a.min(b), a.max(b)]
        })
    }

    pub fn auto_xlim(&self) -> Option<[f64; 2]> {
        self.axis_limits(self.xy_axis[0])
    }

    pub fn auto_ylim(&self) -> Option<[f64; 2]> {
        self.axis_limits(self.xy_axis[1])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShadingType {
    pub common: PlotTypeCommon,
    pub levels: Option<Vec<f64>>,
    pub colormap: Colormap,
    pub contour: Option<ContourStyle>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContourType {
    pub common: PlotTypeCommon,
    pub styles: Vec<ContourStyle>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorType {
    pub common: PlotTypeCommon,
    pub nx_per_panel: usize,
    pub ny_per_panel: usize,
    pub style: VectorStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineType {
    pub common: PlotTypeCommon,
    pub style: LineStyle,
}

/// One data series and its drawing recipe
#[derive(Debug, Clone, PartialEq)]
pub enum PlotType {
    Shading(ShadingType),
    Contour(ContourType),
    Vector(VectorType),
    Line(LineType),
}

fn check_levels(kind: &'static str, variable: &str, levels: Option<&Vec<f64>>) -> Result<(), OptionError> {
    if let Some(levels) = levels {
        if levels.is_empty() || levels.windows(2).any(|w| w[1] <= w[0]) {
            return Err(OptionError::PlotType {
                kind,
                variable: variable.to_string(),
                reason: format!("levels must be strictly increasing, found {:?}", levels),
            });
        }
    }
    Ok(())
}

fn check_contour_style(kind: &'static str, variable: &str, style: &ContourStyle) -> Result<(), OptionError> {
    check_levels(kind, variable, style.levels.as_ref())?;
    check_color(style.color.as_ref())
}

fn require_both_axes(kind: &'static str, common: &PlotTypeCommon) -> Result<(), OptionError> {
    if common.xy_axis.iter().any(Option::is_none) {
        return Err(OptionError::PlotType {
            kind,
            variable: common.variable.clone(),
            reason: "xy_axis needs two axes".to_string(),
        });
    }
    Ok(())
}

impl PlotType {
    pub fn shading(raw: &ShadingConfig, constants: &Constants) -> Result<Self, OptionError> {
        let kind = "shading";
        let common = PlotTypeCommon::from_config(kind, &raw.common_config(), constants)?;
        require_both_axes(kind, &common)?;
        check_levels(kind, &common.variable, raw.levels.as_ref())?;
        if let Some(style) = &raw.contour {
            check_contour_style(kind, &common.variable, style)?;
        }
        Ok(PlotType::Shading(ShadingType {
            common,
            levels: raw.levels.clone(),
            colormap: raw.colormap,
            contour: raw.contour.clone(),
        }))
    }

    pub fn contour(raw: &ContourConfig, constants: &Constants) -> Result<Self, OptionError> {
        let kind = "contour";
        let common = PlotTypeCommon::from_config(kind, &raw.common_config(), constants)?;
        require_both_axes(kind, &common)?;
        if raw.styles.is_empty() {
            return Err(OptionError::PlotType {
                kind,
                variable: common.variable,
                reason: "styles must contain at least 1 contour pass".to_string(),
            });
        }
        for style in &raw.styles {
            check_contour_style(kind, &common.variable, style)?;
        }
        Ok(PlotType::Contour(ContourType {
            common,
            styles: raw.styles.clone(),
        }))
    }

    pub fn vector(raw: &VectorConfig, constants: &Constants) -> Result<Self, OptionError> {
        let kind = "vector";
        let common = PlotTypeCommon::from_config(kind, &raw.common_config(), constants)?;
        require_both_axes(kind, &common)?;
        let fail = |reason: &str| OptionError::PlotType {
            kind,
            variable: common.variable.clone(),
            reason: reason.to_string(),
        };
        if common.variable2.is_none() {
            return Err(fail("variable2 (the v component) is required"));
        }
        let nx_per_panel = raw.nx_per_panel.unwrap_or(constants.vectors_per_panel);
        let ny_per_panel = raw.ny_per_panel.unwrap_or(constants.vectors_per_panel);
        if nx_per_panel == 0 || ny_per_panel == 0 {
            return Err(fail("vectors per panel must be at least 1"));
        }
        if matches!(raw.style.scale, Some(s) if !(s > 0.0)) {
            return Err(fail("vector scale must be positive"));
        }
        check_color(raw.style.color.as_ref())?;
        Ok(PlotType::Vector(VectorType {
            common,
            nx_per_panel,
            ny_per_panel,
            style: raw.style.clone(),
        }))
    }

    pub fn line(raw: &LineConfig, constants: &Constants) -> Result<Self, OptionError> {
        let kind = "line";
        let common = PlotTypeCommon::from_config(kind, &raw.common_config(), constants)?;
        if common.xy_axis.iter().filter(|a| a.is_none()).count() != 1 {
            return Err(OptionError::PlotType {
                kind,
                variable: common.variable,
                reason: "xy_axis requires exactly 1 \"none\" entry".to_string(),
            });
        }
        check_color(raw.style.color.as_ref())?;
        Ok(PlotType::Line(LineType {
            common,
            style: raw.style.clone(),
        }))
    }

    pub fn common(&self) -> &PlotTypeCommon {
        match self {
            PlotType::Shading(p) => &p.common,
            PlotType::Contour(p) => &p.common,
            PlotType::Vector(p) => &p.common,
            PlotType::Line(p) => &p.common,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PlotType::Shading(_) => "shading",
            PlotType::Contour(_) => "contour",
            PlotType::Vector(_) => "vector",
            PlotType::Line(_) => "line",
        }
    }
}
