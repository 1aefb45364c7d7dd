//! `RenderSurface` backed by `plotters`.
//!
//! Draw calls are buffered per panel and rasterised when the figure is
//! saved: SVG for `.svg` names, the bitmap encoder for everything else.
//! Text and coastlines are not drawn (no font or coastline assets).

use super::colormap::{band_color, level_band};
use super::contour::{contour_segments, Segment};
use super::{FigureLayout, PanelDecorations, PanelLayout, PanelTarget, RenderError, RenderSurface};
use crate::options::{parse_color, Colormap, ContourStyle, LineStyle, VectorStyle};
use log::debug;
use ndarray::{Array2, Zip};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::collections::HashMap;
use std::ops::Range;
use std::path::PathBuf;

type Rgb = (u8, u8, u8);

const DEFAULT_LINE: Rgb = (0, 0, 0);
const GRID_LINE: Rgb = (200, 200, 200);

#[derive(Debug, Clone, Copy)]
struct Stroke {
    color: Rgb,
    width: u32,
    dashed: bool,
}

impl Stroke {
    fn from_parts(color: Option<&String>, linewidth: Option<f64>, dashed: bool) -> Self {
        Self {
            color: color.and_then(|c| parse_color(c)).unwrap_or(DEFAULT_LINE),
            width: linewidth.map(|w| w.round().max(1.0) as u32).unwrap_or(1),
            dashed,
        }
    }

    fn line(style: &LineStyle) -> Self {
        Self::from_parts(style.color.as_ref(), style.linewidth, style.dashed)
    }

    fn style(&self) -> ShapeStyle {
        RGBColor(self.color.0, self.color.1, self.color.2).stroke_width(self.width)
    }
}

#[derive(Debug, Clone)]
enum Primitive {
    /// Filled `[x0, x1, y0, y1]` rectangles
    Cells(Vec<([f64; 4], Rgb)>),
    Segments(Vec<Segment>, Stroke),
    Polyline(Vec<(f64, f64)>, Stroke),
    /// Tail to tip
    Arrows(Vec<Segment>, Stroke),
}

impl Primitive {
    fn points(&self) -> Box<dyn Iterator<Item = (f64, f64)> + '_> {
        match self {
            Primitive::Cells(cells) => Box::new(cells.iter().flat_map(|(b, _)| [(b[0], b[2]), (b[1], b[3])])),
            Primitive::Segments(segments, _) | Primitive::Arrows(segments, _) => {
                Box::new(segments.iter().flat_map(|&(a, b)| [a, b]))
            }
            Primitive::Polyline(points, _) => Box::new(points.iter().copied()),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct PanelBuffer {
    primitives: Vec<Primitive>,
    colorbar: Option<(Vec<f64>, Colormap)>,
    decorations: PanelDecorations,
}

impl PanelBuffer {
    /// `[x0, x1, y0, y1]` of everything drawn so far
    fn extent(&self) -> Option<[f64; 4]> {
        self.primitives
            .iter()
            .flat_map(Primitive::points)
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .fold(None, |acc, (x, y)| match acc {
                None => Some([x, x, y, y]),
                Some([x0, x1, y0, y1]) => Some([x0.min(x), x1.max(x), y0.min(y), y1.max(y)]),
            })
    }
}

#[derive(Debug, Clone)]
struct FigureBuffer {
    layout: FigureLayout,
    panels: Vec<PanelBuffer>,
}

/// Buffered `plotters` renderer
#[derive(Debug, Default)]
pub struct PlottersSurface {
    figures: HashMap<usize, FigureBuffer>,
}

impl PlottersSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn panel(&mut self, target: PanelTarget) -> Result<&mut PanelBuffer, RenderError> {
        self.figures
            .get_mut(&target.figure)
            .ok_or(RenderError::UnknownFigure(target.figure))?
            .panels
            .get_mut(target.subplot)
            .ok_or(RenderError::UnknownPanel {
                figure: target.figure,
                subplot: target.subplot,
            })
    }
}

/// Cell boundaries around each coordinate
fn cell_edges(coords: &[f64]) -> Vec<f64> {
    match coords.len() {
        0 => Vec::new(),
        1 => vec![coords[0] - 0.5, coords[0] + 0.5],
        n => {
            let mut edges = Vec::with_capacity(n + 1);
            edges.push(coords[0] - (coords[1] - coords[0]) / 2.0);
            edges.extend(coords.windows(2).map(|w| (w[0] + w[1]) / 2.0));
            edges.push(coords[n - 1] + (coords[n - 1] - coords[n - 2]) / 2.0);
            edges
        }
    }
}

fn spacing(coords: &[f64]) -> f64 {
    match coords {
        [a, b, ..] if (b - a).abs() > 0.0 => (b - a).abs(),
        _ => 1.0,
    }
}

/// Split a polyline into dashes of `dash` length (data units)
fn dashes(points: &[(f64, f64)], dash: f64) -> Vec<Segment> {
    let mut out = Vec::new();
    if dash <= 0.0 {
        return out;
    }
    let mut on = true;
    let mut left = dash;
    for pair in points.windows(2) {
        let (mut a, b) = (pair[0], pair[1]);
        let mut len = ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt();
        while len > 0.0 {
            let step = left.min(len);
            let t = step / len;
            let next = (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t);
            if on {
                out.push((a, next));
            }
            a = next;
            len -= step;
            left -= step;
            if left <= 0.0 {
                on = !on;
                left = dash;
            }
        }
    }
    out
}

fn padded(lo: f64, hi: f64) -> Range<f64> {
    if hi > lo {
        lo..hi
    } else {
        lo - 0.5..hi + 0.5
    }
}

fn backend<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Backend(e.to_string())
}

fn grid_lines(lo: f64, hi: f64, step: Option<f64>) -> Vec<f64> {
    let step = step.filter(|s| *s > 0.0).unwrap_or((hi - lo) / 5.0);
    if !(step > 0.0) {
        return Vec::new();
    }
    let first = (lo / step).ceil() as i64;
    let last = (hi / step).floor() as i64;
    (first..=last).map(|k| k as f64 * step).collect()
}

fn render_panel<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, panel: &PanelBuffer) -> Result<(), RenderError> {
    let deco = &panel.decorations;
    let extent = panel.extent();
    let xr = deco.xlim.or(extent.map(|e| [e[0], e[1]]));
    let yr = deco.ylim.or(extent.map(|e| [e[2], e[3]]));
    let (Some([x0, x1]), Some([y0, y1])) = (xr, yr) else {
        return Ok(());
    };

    let split;
    let (plot_area, bar_area) = match &panel.colorbar {
        Some(_) => {
            let (w, _) = area.dim_in_pixel();
            split = area.split_horizontally((w as f64 * 0.85) as i32);
            (&split.0, Some(&split.1))
        }
        None => (area, None),
    };

    let (xrange, yrange) = (padded(x0.min(x1), x0.max(x1)), padded(y0.min(y1), y0.max(y1)));
    let mut chart = ChartBuilder::on(plot_area)
        .margin(10)
        .build_cartesian_2d(xrange.clone(), yrange.clone())
        .map_err(backend)?;

    if deco.grid_on {
        let grid = Stroke {
            color: GRID_LINE,
            width: 1,
            dashed: false,
        }
        .style();
        let verticals = grid_lines(xrange.start, xrange.end, deco.world_tick_dx)
            .into_iter()
            .map(|x| vec![(x, yrange.start), (x, yrange.end)]);
        let horizontals = grid_lines(yrange.start, yrange.end, deco.world_tick_dy)
            .into_iter()
            .map(|y| vec![(xrange.start, y), (xrange.end, y)]);
        chart
            .draw_series(verticals.chain(horizontals).map(|points| PathElement::new(points, grid)))
            .map_err(backend)?;
    }

    for primitive in &panel.primitives {
        match primitive {
            Primitive::Cells(cells) => {
                chart
                    .draw_series(cells.iter().map(|(b, c)| {
                        Rectangle::new([(b[0], b[2]), (b[1], b[3])], RGBColor(c.0, c.1, c.2).filled())
                    }))
                    .map_err(backend)?;
            }
            Primitive::Segments(segments, stroke) => {
                let style = stroke.style();
                chart
                    .draw_series(segments.iter().map(|&(a, b)| PathElement::new(vec![a, b], style)))
                    .map_err(backend)?;
            }
            Primitive::Polyline(points, stroke) => {
                if stroke.dashed {
                    let dash = ((xrange.end - xrange.start).powi(2) + (yrange.end - yrange.start).powi(2)).sqrt() / 80.0;
                    let style = stroke.style();
                    chart
                        .draw_series(dashes(points, dash).into_iter().map(|(a, b)| PathElement::new(vec![a, b], style)))
                        .map_err(backend)?;
                } else {
                    chart
                        .draw_series(LineSeries::new(points.iter().copied(), stroke.style()))
                        .map_err(backend)?;
                }
            }
            Primitive::Arrows(arrows, stroke) => {
                let style = stroke.style();
                let head_fill = RGBColor(stroke.color.0, stroke.color.1, stroke.color.2).filled();
                for &(tail, tip) in arrows {
                    let (dx, dy) = (tip.0 - tail.0, tip.1 - tail.1);
                    let len = (dx * dx + dy * dy).sqrt();
                    if !(len > 0.0) {
                        continue;
                    }
                    let (ux, uy) = (dx / len, dy / len);
                    let head_len = 0.3 * len;
                    let head_w = 0.4 * head_len;
                    let base = (tip.0 - ux * head_len, tip.1 - uy * head_len);
                    let left = (base.0 - uy * head_w, base.1 + ux * head_w);
                    let right = (base.0 + uy * head_w, base.1 - ux * head_w);
                    chart
                        .draw_series(std::iter::once(PathElement::new(vec![tail, base], style)))
                        .map_err(backend)?;
                    chart
                        .draw_series(std::iter::once(Polygon::new(vec![tip, left, right], head_fill)))
                        .map_err(backend)?;
                }
            }
        }
    }

    if let Some(draw_box) = &deco.draw_box {
        chart
            .draw_series(LineSeries::new(draw_box.outline(), Stroke::line(&draw_box.style).style()))
            .map_err(backend)?;
    }

    if let (Some(bar), Some((levels, colormap))) = (bar_area, &panel.colorbar) {
        let bands = levels.len() + 1;
        let mut bar_chart = ChartBuilder::on(bar)
            .margin(10)
            .build_cartesian_2d(0.0..1.0, 0.0..bands as f64)
            .map_err(backend)?;
        bar_chart
            .draw_series((0..bands).map(|band| {
                let c = band_color(*colormap, levels, band);
                Rectangle::new([(0.0, band as f64), (1.0, band as f64 + 1.0)], RGBColor(c.0, c.1, c.2).filled())
            }))
            .map_err(backend)?;
    }
    Ok(())
}

fn panel_area<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, layout: &PanelLayout) -> Option<DrawingArea<DB, Shift>> {
    root.split_evenly((layout.nrows, layout.ncols))
        .into_iter()
        .nth(layout.index.checked_sub(1)?)
}

fn render_figure<DB: DrawingBackend>(root: DrawingArea<DB, Shift>, figure: &FigureBuffer) -> Result<(), RenderError> {
    root.fill(&WHITE).map_err(backend)?;
    for (layout, panel) in figure.layout.panels.iter().zip(&figure.panels) {
        if let Some(area) = panel_area(&root, layout) {
            render_panel(&area, panel)?;
        }
    }
    root.present().map_err(backend)
}

impl RenderSurface for PlottersSurface {
    fn begin_figure(&mut self, figure: usize, layout: &FigureLayout) -> Result<(), RenderError> {
        let panels = (0..layout.panels.len()).map(|_| PanelBuffer::default()).collect();
        self.figures.insert(
            figure,
            FigureBuffer {
                layout: layout.clone(),
                panels,
            },
        );
        Ok(())
    }

    fn draw_filled_contours(
        &mut self,
        target: PanelTarget,
        x: &[f64],
        y: &[f64],
        z: &Array2<f64>,
        levels: &[f64],
        colormap: Colormap,
        draw_colorbar: bool,
    ) -> Result<(), RenderError> {
        let (xe, ye) = (cell_edges(x), cell_edges(y));
        let mut cells = Vec::with_capacity(z.len());
        for ((j, i), &value) in z.indexed_iter() {
            if i + 1 >= xe.len() || j + 1 >= ye.len() {
                continue;
            }
            if let Some(band) = level_band(levels, value) {
                cells.push(([xe[i], xe[i + 1], ye[j], ye[j + 1]], band_color(colormap, levels, band)));
            }
        }
        let panel = self.panel(target)?;
        panel.primitives.push(Primitive::Cells(cells));
        if draw_colorbar {
            panel.colorbar = Some((levels.to_vec(), colormap));
        }
        Ok(())
    }

    fn draw_contour_lines(
        &mut self,
        target: PanelTarget,
        x: &[f64],
        y: &[f64],
        z: &Array2<f64>,
        styles: &[ContourStyle],
    ) -> Result<(), RenderError> {
        let mut passes = Vec::with_capacity(styles.len());
        for style in styles {
            let segments: Vec<Segment> = style
                .levels
                .iter()
                .flatten()
                .flat_map(|&level| contour_segments(x, y, z, level))
                .collect();
            passes.push(Primitive::Segments(
                segments,
                Stroke::from_parts(style.color.as_ref(), style.linewidth, style.dashed),
            ));
        }
        self.panel(target)?.primitives.extend(passes);
        Ok(())
    }

    fn draw_vectors(
        &mut self,
        target: PanelTarget,
        x: &[f64],
        y: &[f64],
        u: &Array2<f64>,
        v: &Array2<f64>,
        style: &VectorStyle,
    ) -> Result<VectorStyle, RenderError> {
        let scale = style.scale.unwrap_or_else(|| {
            let mut max: f64 = 0.0;
            Zip::from(u).and(v).for_each(|&a, &b| {
                let m = (a * a + b * b).sqrt();
                if m.is_finite() {
                    max = max.max(m);
                }
            });
            if max > 0.0 {
                max
            } else {
                1.0
            }
        });

        let (dx, dy) = (spacing(x), spacing(y));
        let mut arrows = Vec::new();
        for ((j, i), &a) in u.indexed_iter() {
            let b = v[[j, i]];
            if !(a.is_finite() && b.is_finite()) || i >= x.len() || j >= y.len() {
                continue;
            }
            let tail = (x[i], y[j]);
            arrows.push((tail, (tail.0 + a / scale * dx, tail.1 + b / scale * dy)));
        }
        self.panel(target)?.primitives.push(Primitive::Arrows(
            arrows,
            Stroke::from_parts(style.color.as_ref(), style.linewidth, false),
        ));
        Ok(VectorStyle {
            scale: Some(scale),
            ..style.clone()
        })
    }

    fn draw_line(&mut self, target: PanelTarget, x: &[f64], y: &[f64], style: &LineStyle) -> Result<(), RenderError> {
        let points: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();
        self.panel(target)?
            .primitives
            .push(Primitive::Polyline(points, Stroke::line(style)));
        Ok(())
    }

    fn decorate_panel(&mut self, target: PanelTarget, decorations: &PanelDecorations) -> Result<(), RenderError> {
        if decorations.coastline.is_some() {
            debug!("coastlines are not drawn by the plotters backend");
        }
        self.panel(target)?.decorations = decorations.clone();
        Ok(())
    }

    fn save_figure(&mut self, figure: usize) -> Result<PathBuf, RenderError> {
        let buffer = self.figures.remove(&figure).ok_or(RenderError::UnknownFigure(figure))?;
        let layout = &buffer.layout;
        let size = (
            (layout.figsize[0] * layout.dpi).round().max(1.0) as u32,
            (layout.figsize[1] * layout.dpi).round().max(1.0) as u32,
        );
        let path = layout.path.clone();
        let is_svg = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
        if is_svg {
            render_figure(SVGBackend::new(&path, size).into_drawing_area(), &buffer)?;
        } else {
            render_figure(BitMapBackend::new(&path, size).into_drawing_area(), &buffer)?;
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn layout(path: PathBuf) -> FigureLayout {
        FigureLayout {
            path,
            title: None,
            figsize: [3.0, 2.0],
            dpi: 50.0,
            panels: vec![
                PanelLayout { nrows: 1, ncols: 2, index: 1 },
                PanelLayout { nrows: 1, ncols: 2, index: 2 },
            ],
        }
    }

    #[test]
    fn test_cell_edges() {
        assert_eq!(cell_edges(&[0.0, 1.0, 2.0]), vec![-0.5, 0.5, 1.5, 2.5]);
        assert_eq!(cell_edges(&[4.0]), vec![3.5, 4.5]);
    }

    #[test]
    fn test_dashes_alternate() {
        let segments = dashes(&[(0.0, 0.0), (4.0, 0.0)], 1.0);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1], ((2.0, 0.0), (3.0, 0.0)));
    }

    #[test]
    fn test_unknown_panel() {
        let mut surface = PlottersSurface::new();
        let target = PanelTarget { figure: 0, subplot: 0 };
        assert!(matches!(
            surface.draw_line(target, &[0.0], &[0.0], &LineStyle::default()),
            Err(RenderError::UnknownFigure(0))
        ));
    }

    #[test]
    fn test_saves_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fields.svg");
        let mut surface = PlottersSurface::new();
        surface.begin_figure(0, &layout(path.clone())).unwrap();

        let x = [0.0, 1.0, 2.0];
        let y = [0.0, 1.0];
        let z = Array2::from_shape_fn((2, 3), |(j, i)| (i + j) as f64);
        let left = PanelTarget { figure: 0, subplot: 0 };
        surface
            .draw_filled_contours(left, &x, &y, &z, &[1.0, 2.0], Colormap::Viridis, true)
            .unwrap();
        let used = surface
            .draw_vectors(left, &x, &y, &z, &z, &VectorStyle::default())
            .unwrap();
        assert!(used.scale.unwrap() > 0.0);

        let right = PanelTarget { figure: 0, subplot: 1 };
        surface.draw_line(right, &x, &[1.0, 3.0, 2.0], &LineStyle::default()).unwrap();

        assert_eq!(surface.save_figure(0).unwrap(), path);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("<svg"));
        assert!(matches!(surface.save_figure(0), Err(RenderError::UnknownFigure(0))));
    }
}
