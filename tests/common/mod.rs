#![allow(dead_code)]

use chrono::NaiveDate;
use genplot_rust::case::{Case, Member, Model};
use genplot_rust::config::Constants;
use genplot_rust::data_io::{MemoryArchive, TotalAnomaly};
use genplot_rust::field::Field;
use genplot_rust::operators::UniformSurfacePressure;
use genplot_rust::options::{Colormap, ContourStyle, LineStyle, PlotSet, PlotSetConfig, VectorStyle};
use genplot_rust::pipeline::RunContext;
use genplot_rust::render::{FigureLayout, PanelDecorations, PanelTarget, RenderError, RenderSurface};
use genplot_rust::time_utils::day_number;
use ndarray::{Array2, ArrayD, IxDyn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Every call a `RecordingSurface` received, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Begin {
        figure: usize,
    },
    Filled {
        target: PanelTarget,
        shape: (usize, usize),
        levels: Vec<f64>,
        colormap: Colormap,
        colorbar: bool,
    },
    ContourLines {
        target: PanelTarget,
        shape: (usize, usize),
        styles: Vec<ContourStyle>,
    },
    Vectors {
        target: PanelTarget,
        shape: (usize, usize),
        style: VectorStyle,
    },
    Line {
        target: PanelTarget,
        x: Vec<f64>,
        y: Vec<f64>,
    },
    Decorate {
        target: PanelTarget,
        decorations: PanelDecorations,
    },
    Save {
        figure: usize,
    },
}

/// Surface that draws nothing and remembers what it was asked to draw
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub calls: Vec<Call>,
    pub layouts: HashMap<usize, FigureLayout>,
    /// Scale reported back for vector panels drawn without one
    pub auto_scale: f64,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            auto_scale: 7.0,
            ..Self::default()
        }
    }

    pub fn filled(&self) -> Vec<&Call> {
        self.calls.iter().filter(|c| matches!(c, Call::Filled { .. })).collect()
    }

    pub fn vectors(&self) -> Vec<&Call> {
        self.calls.iter().filter(|c| matches!(c, Call::Vectors { .. })).collect()
    }

    pub fn lines(&self) -> Vec<&Call> {
        self.calls.iter().filter(|c| matches!(c, Call::Line { .. })).collect()
    }

    pub fn decorations(&self, figure: usize, subplot: usize) -> Option<&PanelDecorations> {
        self.calls.iter().find_map(|c| match c {
            Call::Decorate { target, decorations } if *target == PanelTarget { figure, subplot } => Some(decorations),
            _ => None,
        })
    }

    fn check(&self, target: PanelTarget) -> Result<(), RenderError> {
        let layout = self.layouts.get(&target.figure).ok_or(RenderError::UnknownFigure(target.figure))?;
        if target.subplot >= layout.panels.len() {
            return Err(RenderError::UnknownPanel {
                figure: target.figure,
                subplot: target.subplot,
            });
        }
        Ok(())
    }
}

impl RenderSurface for RecordingSurface {
    fn begin_figure(&mut self, figure: usize, layout: &FigureLayout) -> Result<(), RenderError> {
        self.layouts.insert(figure, layout.clone());
        self.calls.push(Call::Begin { figure });
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_filled_contours(
        &mut self,
        target: PanelTarget,
        _x: &[f64],
        _y: &[f64],
        z: &Array2<f64>,
        levels: &[f64],
        colormap: Colormap,
        draw_colorbar: bool,
    ) -> Result<(), RenderError> {
        self.check(target)?;
        self.calls.push(Call::Filled {
            target,
            shape: z.dim(),
            levels: levels.to_vec(),
            colormap,
            colorbar: draw_colorbar,
        });
        Ok(())
    }

    fn draw_contour_lines(
        &mut self,
        target: PanelTarget,
        _x: &[f64],
        _y: &[f64],
        z: &Array2<f64>,
        styles: &[ContourStyle],
    ) -> Result<(), RenderError> {
        self.check(target)?;
        self.calls.push(Call::ContourLines {
            target,
            shape: z.dim(),
            styles: styles.to_vec(),
        });
        Ok(())
    }

    fn draw_vectors(
        &mut self,
        target: PanelTarget,
        _x: &[f64],
        _y: &[f64],
        u: &Array2<f64>,
        _v: &Array2<f64>,
        style: &VectorStyle,
    ) -> Result<VectorStyle, RenderError> {
        self.check(target)?;
        self.calls.push(Call::Vectors {
            target,
            shape: u.dim(),
            style: style.clone(),
        });
        Ok(VectorStyle {
            scale: style.scale.or(Some(self.auto_scale)),
            ..style.clone()
        })
    }

    fn draw_line(&mut self, target: PanelTarget, x: &[f64], y: &[f64], _style: &LineStyle) -> Result<(), RenderError> {
        self.check(target)?;
        self.calls.push(Call::Line {
            target,
            x: x.to_vec(),
            y: y.to_vec(),
        });
        Ok(())
    }

    fn decorate_panel(&mut self, target: PanelTarget, decorations: &PanelDecorations) -> Result<(), RenderError> {
        self.check(target)?;
        self.calls.push(Call::Decorate {
            target,
            decorations: decorations.clone(),
        });
        Ok(())
    }

    fn save_figure(&mut self, figure: usize) -> Result<PathBuf, RenderError> {
        let layout = self.layouts.get(&figure).ok_or(RenderError::UnknownFigure(figure))?;
        let path = layout.path.clone();
        self.calls.push(Call::Save { figure });
        Ok(path)
    }
}

pub fn init_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2009, 1, 26).unwrap()
}

pub fn model(name: &str) -> Model {
    Model::new(name, init_date(), 1, vec![Member::Control], 60, None, false).unwrap()
}

/// Cases `case0..` on models `exp0..`
pub fn cases(n: usize) -> Vec<Case> {
    (0..n)
        .map(|i| Case::new(format!("case{}", i), model(&format!("exp{}", i))))
        .collect()
}

pub fn coords(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

/// `[time, lat, lon]` field filled by `f(time, lat, lon)`
pub fn field3(time: Vec<f64>, lat: Vec<f64>, lon: Vec<f64>, f: impl Fn(f64, f64, f64) -> f64) -> Field {
    let shape = [time.len(), lat.len(), lon.len()];
    let values = ArrayD::from_shape_fn(IxDyn(&shape), |ix| f(time[ix[0]], lat[ix[1]], lon[ix[2]]));
    Field::new(values, vec![time, lat, lon]).unwrap()
}

pub fn lat() -> Vec<f64> {
    coords(-20.0, 5.0, 9)
}

pub fn lon() -> Vec<f64> {
    coords(50.0, 10.0, 18)
}

/// Archive with an observation row and one model row per case for `variable`.
///
/// Observation times are absolute day numbers starting at the init date;
/// row `r` (0 = obs) holds `r * 100 + lon / 10`.
pub fn archive(variable: &str, cases: &[Case], skip_case: Option<usize>) -> MemoryArchive {
    let mut archive = MemoryArchive::new();
    fill_archive(&mut archive, variable, cases, skip_case);
    archive
}

pub fn fill_archive(archive: &mut MemoryArchive, variable: &str, cases: &[Case], skip_case: Option<usize>) {
    let t0 = day_number(init_date());
    archive.insert_observation(
        "era5",
        variable,
        TotalAnomaly::Anomaly,
        field3(coords(t0, 1.0, 60), lat(), lon(), |_, _, lo| lo / 10.0),
    );
    for (i, case) in cases.iter().enumerate() {
        if skip_case == Some(i) {
            continue;
        }
        let offset = (i + 1) as f64 * 100.0;
        archive.insert_model(
            &case.model.name,
            variable,
            Member::Control,
            TotalAnomaly::Anomaly,
            field3(coords(0.0, 1.0, 60), lat(), lon(), move |_, _, lo| offset + lo / 10.0),
        );
    }
}

pub fn plot_set(num_cases: usize, text: &str) -> PlotSet {
    let raw: PlotSetConfig = toml::from_str(text).unwrap();
    PlotSet::from_config(num_cases, &raw, &Constants::default()).unwrap()
}

pub static CONSTANTS: Constants = Constants {
    earth_radius: 6371000.0,
    regrid_delta: 1.0,
    obs_clim_years: [2001, 2020],
    vectors_per_panel: 15,
    figsize: [6.4, 4.8],
    dpi: 100.0,
    surface_pressure: 1013.25,
};

pub static SURFACE_PRESSURE: UniformSurfacePressure = UniformSurfacePressure { hpa: 1013.25 };

pub fn context<'a>(archive: &'a MemoryArchive, fig_root: &Path) -> RunContext<'a> {
    RunContext {
        reader: archive,
        constants: &CONSTANTS,
        surface_pressure: &SURFACE_PRESSURE,
        fig_root: fig_root.to_path_buf(),
    }
}
