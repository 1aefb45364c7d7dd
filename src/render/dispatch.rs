//! The four draw behaviours, one `match` arm per plot kind.

use super::{PanelTarget, RenderError, RenderSurface};
use crate::math::{auto_levels, moving_average};
use crate::options::{ContourType, LineType, PlotType, ShadingType, Subplot, VectorStyle, VectorType};
use crate::pipeline::Cell;
use log::{debug, warn};
use ndarray::{s, Array2};

/// Cells drawn and skipped while rendering one plot type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub drawn: usize,
    pub skipped: usize,
}

impl DrawStats {
    pub fn add(&mut self, other: DrawStats) {
        self.drawn += other.drawn;
        self.skipped += other.skipped;
    }
}

/// Arrow settings shared by every panel of one vector plot type.
///
/// Starts from the configured style; when that has no scale, the style
/// returned by the first drawn panel is kept for the rest of the pass.
#[derive(Debug, Clone)]
pub struct VectorScale {
    style: VectorStyle,
    settled: bool,
}

impl VectorScale {
    pub fn new(configured: &VectorStyle) -> Self {
        Self {
            style: configured.clone(),
            settled: configured.scale.is_some(),
        }
    }

    pub fn style(&self) -> &VectorStyle {
        &self.style
    }

    pub fn settle(&mut self, used: VectorStyle) {
        if !self.settled {
            debug!("vector scale fixed at {:?}", used.scale);
            self.style = used;
            self.settled = true;
        }
    }
}

/// Draw every cell of one plot type; `cells` is `[figure][subplot]`
pub fn draw_plot_type(
    surface: &mut dyn RenderSurface,
    plot_type: &PlotType,
    subplots: &[Subplot],
    cells: &[Vec<Option<Cell>>],
) -> Result<DrawStats, RenderError> {
    let common = plot_type.common();
    let mut stats = DrawStats::default();
    let mut vector_scale = match plot_type {
        PlotType::Vector(p) => Some(VectorScale::new(&p.style)),
        _ => None,
    };

    for (ifig, row) in cells.iter().enumerate() {
        for (isubplot, cell) in row.iter().enumerate() {
            let target = PanelTarget {
                figure: ifig,
                subplot: isubplot,
            };
            let Some(cell) = cell else {
                warn!(
                    "{} \"{}\": no data for figure {} subplot {}, nothing drawn",
                    plot_type.kind(),
                    common.variable,
                    ifig,
                    isubplot
                );
                stats.skipped += 1;
                continue;
            };

            let drawn = match plot_type {
                PlotType::Shading(p) => {
                    let top_right = subplots.get(isubplot).is_some_and(Subplot::is_top_right);
                    draw_shading(surface, target, p, cell, top_right)?
                }
                PlotType::Contour(p) => draw_contour(surface, target, p, cell)?,
                PlotType::Line(p) => draw_line(surface, target, p, cell)?,
                PlotType::Vector(p) => match vector_scale.as_mut() {
                    Some(scale) => draw_vector(surface, target, p, cell, scale)?,
                    None => false,
                },
            };
            if drawn {
                stats.drawn += 1;
            } else {
                warn!(
                    "{} \"{}\": figure {} subplot {} has nothing drawable",
                    plot_type.kind(),
                    common.variable,
                    ifig,
                    isubplot
                );
                stats.skipped += 1;
            }
        }
    }
    Ok(stats)
}

fn plane_coords(cell: &Cell) -> Option<(&[f64], &[f64])> {
    Some((cell.x.as_deref()?, cell.y.as_deref()?))
}

fn cell_levels(cell: &Cell) -> Vec<f64> {
    let values: Vec<f64> = cell.z.iter().copied().collect();
    auto_levels(&values)
}

fn draw_shading(
    surface: &mut dyn RenderSurface,
    target: PanelTarget,
    p: &ShadingType,
    cell: &Cell,
    top_right: bool,
) -> Result<bool, RenderError> {
    let Some((x, y)) = plane_coords(cell) else {
        return Ok(false);
    };
    let levels = p.levels.clone().unwrap_or_else(|| cell_levels(cell));
    if levels.is_empty() {
        return Ok(false);
    }
    surface.draw_filled_contours(target, x, y, &cell.z, &levels, p.colormap, top_right)?;

    if let Some(overlay) = &p.contour {
        let mut overlay = overlay.clone();
        if overlay.levels.is_none() {
            overlay.levels = Some(levels);
        }
        surface.draw_contour_lines(target, x, y, &cell.z, &[overlay])?;
    }
    Ok(true)
}

fn draw_contour(
    surface: &mut dyn RenderSurface,
    target: PanelTarget,
    p: &ContourType,
    cell: &Cell,
) -> Result<bool, RenderError> {
    let Some((x, y)) = plane_coords(cell) else {
        return Ok(false);
    };
    let mut auto: Option<Vec<f64>> = None;
    let mut styles = p.styles.clone();
    for style in styles.iter_mut().filter(|s| s.levels.is_none()) {
        style.levels = Some(auto.get_or_insert_with(|| cell_levels(cell)).clone());
    }
    if styles.iter().all(|s| s.levels.as_ref().is_some_and(Vec::is_empty)) {
        return Ok(false);
    }
    surface.draw_contour_lines(target, x, y, &cell.z, &styles)?;
    Ok(true)
}

fn draw_line(
    surface: &mut dyn RenderSurface,
    target: PanelTarget,
    p: &LineType,
    cell: &Cell,
) -> Result<bool, RenderError> {
    let values: Vec<f64> = cell.z.iter().copied().collect();
    match (&cell.x, &cell.y) {
        (Some(x), None) => surface.draw_line(target, x, &values, &p.style)?,
        (None, Some(y)) => surface.draw_line(target, &values, y, &p.style)?,
        _ => return Ok(false),
    }
    Ok(true)
}

fn draw_vector(
    surface: &mut dyn RenderSurface,
    target: PanelTarget,
    p: &VectorType,
    cell: &Cell,
    scale: &mut VectorScale,
) -> Result<bool, RenderError> {
    let (Some((x, y)), Some(v)) = (plane_coords(cell), cell.v.as_ref()) else {
        return Ok(false);
    };
    let sampled = subsample_vectors(x, y, &cell.z, v, [p.nx_per_panel, p.ny_per_panel]);
    let used = surface.draw_vectors(target, &sampled.x, &sampled.y, &sampled.u, &sampled.v, scale.style())?;
    scale.settle(used);
    Ok(true)
}

/// Arrow grid after smoothing and striding
#[derive(Debug, Clone, PartialEq)]
pub struct SampledVectors {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub u: Array2<f64>,
    pub v: Array2<f64>,
}

/// Reduce `u`, `v` (`[y, x]`) to about `per_panel = [nx, ny]` arrows.
///
/// Each axis is smoothed with a window of its stride before striding.
pub fn subsample_vectors(x: &[f64], y: &[f64], u: &Array2<f64>, v: &Array2<f64>, per_panel: [usize; 2]) -> SampledVectors {
    let xskip = (x.len() / per_panel[0].max(1)).max(1);
    let yskip = (y.len() / per_panel[1].max(1)).max(1);
    let reduce = |a: &Array2<f64>| {
        let smoothed = moving_average(&moving_average(a, yskip, 0), xskip, 1);
        smoothed.slice(s![..;yskip, ..;xskip]).to_owned()
    };
    SampledVectors {
        x: x.iter().step_by(xskip).copied().collect(),
        y: y.iter().step_by(yskip).copied().collect(),
        u: reduce(u),
        v: reduce(v),
    }
}
