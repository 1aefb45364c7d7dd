mod common;

use common::*;
use genplot_rust::case::Member;
use genplot_rust::config::Constants;
use genplot_rust::data_io::{MemoryArchive, TotalAnomaly};
use genplot_rust::options::{GeneralPlotOptions, PlotSetConfig};
use genplot_rust::pipeline::{run_plot_sets, Plotter};
use genplot_rust::render::PanelTarget;
use genplot_rust::time_utils::day_number;

const OLR_LON_TIME: &str = r#"
figs = [{ name = "olr.png", title = "OLR" }]
xlabel = "lon"
ylabel = "lead"

[[shadings]]
variable = "olr"
xy_axis = [-1, -3]
min_maxs = [[0, 45], [-15, 15], [60, 210]]
"#;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_hovmoller_shading_with_obs_and_two_cases() {
    let cases = cases(2);
    let archive = archive("olr", &cases, None);
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&archive, dir.path());
    let ps = plot_set(cases.len(), OLR_LON_TIME);

    let mut surface = RecordingSurface::new();
    let summary = Plotter::new(&cases, &ps, &ctx).run(&mut surface).unwrap();

    assert_eq!(summary.figures, vec![dir.path().join("general_plot").join("olr.png")]);
    assert!(dir.path().join("general_plot").is_dir());
    assert_eq!(summary.stats.drawn, 3);
    assert_eq!(summary.stats.skipped, 0);

    let filled = surface.filled();
    assert_eq!(filled.len(), 3);
    for (isubplot, call) in filled.iter().enumerate() {
        match call {
            Call::Filled {
                target,
                shape,
                colorbar,
                levels,
                ..
            } => {
                assert_eq!(*target, PanelTarget { figure: 0, subplot: isubplot });
                // 46 leads by 151 one-degree longitudes
                assert_eq!(*shape, (46, 151));
                // 3 panels on a 2x2 grid: the colorbar sits on the top-right one
                assert_eq!(*colorbar, isubplot == 1);
                assert!(!levels.is_empty());
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    let layout = &surface.layouts[&0];
    assert_eq!(layout.title.as_deref(), Some("OLR"));
    assert_eq!(layout.panels.len(), 3);
    assert_eq!((layout.panels[2].nrows, layout.panels[2].ncols), (2, 2));

    let obs = surface.decorations(0, 0).unwrap();
    assert_eq!(obs.title.as_deref(), Some("(a) obs"));
    assert_eq!(obs.xlim, Some([60.0, 210.0]));
    assert_eq!(obs.ylim, Some([0.0, 45.0]));
    // xlabel only on the bottom row, ylabel only on the first column
    assert_eq!(obs.xlabel, None);
    assert_eq!(obs.ylabel.as_deref(), Some("lead"));

    let case0 = surface.decorations(0, 1).unwrap();
    assert_eq!(case0.title.as_deref(), Some("(b) case0"));
    assert_eq!(case0.ylabel, None);

    let case1 = surface.decorations(0, 2).unwrap();
    assert_eq!(case1.title.as_deref(), Some("(c) case1"));
    assert_eq!(case1.xlabel.as_deref(), Some("lon"));

    assert_eq!(surface.calls.last(), Some(&Call::Save { figure: 0 }));
}

#[test]
fn test_cells_hold_row_values_on_the_regridded_axes() {
    let cases = cases(2);
    let archive = archive("olr", &cases, None);
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&archive, dir.path());
    let ps = plot_set(cases.len(), OLR_LON_TIME);

    let (cells, ameans) = Plotter::new(&cases, &ps, &ctx).cells(&ps.plot_types[0]);
    assert_eq!(cells.len(), 1);
    assert!(ameans[0].iter().all(Option::is_none));

    let obs = cells[0][0].as_ref().unwrap();
    let x = obs.x.as_ref().unwrap();
    assert_eq!(x.len(), 151);
    assert_eq!(x[0], 60.0);
    assert_eq!(obs.y.as_ref().unwrap().len(), 46);
    assert!(approx(obs.z[[0, 0]], 6.0));
    assert!(approx(obs.z[[10, 5]], 6.5));

    let case1 = cells[0][2].as_ref().unwrap();
    assert_eq!(case1.row, 2);
    assert!(approx(case1.z[[45, 150]], 200.0 + 21.0));
}

#[test]
fn test_observation_leads_count_from_initialisation() {
    let cases = cases(1);
    let t0 = day_number(init_date());
    let mut archive = MemoryArchive::new();
    // both rows hold their lead, so matching cells must agree
    archive.insert_observation(
        "era5",
        "olr",
        TotalAnomaly::Anomaly,
        field3(coords(t0 - 3.0, 1.0, 60), lat(), lon(), move |t, _, _| t - t0),
    );
    archive.insert_model(
        &cases[0].model.name,
        "olr",
        Member::Control,
        TotalAnomaly::Anomaly,
        field3(coords(0.0, 1.0, 60), lat(), lon(), |lead, _, _| lead),
    );
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&archive, dir.path());
    let ps = plot_set(cases.len(), &OLR_LON_TIME.replace("[0, 45]", "[5, 10]"));

    let (cells, _) = Plotter::new(&cases, &ps, &ctx).cells(&ps.plot_types[0]);
    let obs = cells[0][0].as_ref().unwrap();
    let model = cells[0][1].as_ref().unwrap();
    assert_eq!(obs.y.as_deref(), Some(&[5.0, 6.0, 7.0, 8.0, 9.0, 10.0][..]));
    assert_eq!(obs.z.dim(), model.z.dim());
    for i in 0..6 {
        assert!(approx(obs.z[[i, 0]], 5.0 + i as f64), "obs lead {} holds {}", 5 + i, obs.z[[i, 0]]);
        assert!(approx(model.z[[i, 0]], 5.0 + i as f64));
    }
}

#[test]
fn test_cases_on_figures_map_to_distinct_rows() {
    let cases = cases(3);
    let archive = archive("olr", &cases, None);
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&archive, dir.path());
    let ps = plot_set(
        cases.len(),
        r#"
figs_dim_by = "case"
with_obs = false
figs = [{ name = "c0.png" }, { name = "c1.png" }, { name = "c2.png" }]

[[shadings]]
variable = "olr"
xy_axis = [-1, -2]
min_maxs = [[0, 10], [-15, 15], [60, 210]]
"#,
    );
    assert_eq!(ps.subplots.len(), 1);

    let plotter = Plotter::new(&cases, &ps, &ctx);
    let (cells, _) = plotter.cells(&ps.plot_types[0]);
    for (ifig, fig) in cells.iter().enumerate() {
        let cell = fig[0].as_ref().unwrap();
        assert_eq!(cell.row, ifig);
        assert!(approx(cell.z[[0, 0]], (ifig + 1) as f64 * 100.0 + 6.0));
    }

    let mut surface = RecordingSurface::new();
    let summary = plotter.run(&mut surface).unwrap();
    assert_eq!(summary.figures.len(), 3);
    assert_eq!(summary.stats.drawn, 3);
    for ifig in 0..3 {
        // no lettered case titles when the cases run across figures
        assert_eq!(surface.decorations(ifig, 0).unwrap().title, None);
        // a single panel is its own top-right cell
        assert!(surface.filled().iter().any(|c| matches!(
            c,
            Call::Filled { target, colorbar: true, .. } if target.figure == ifig
        )));
    }
}

#[test]
fn test_missing_case_row_is_skipped() {
    let cases = cases(2);
    let archive = archive("olr", &cases, Some(1));
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&archive, dir.path());
    let raw: PlotSetConfig = toml::from_str(OLR_LON_TIME).unwrap();
    let options = GeneralPlotOptions::from_config(cases.len(), &[raw], &Constants::default()).unwrap();

    let mut surface = RecordingSurface::new();
    let report = run_plot_sets(&cases, &options, &ctx, &mut surface);

    assert!(report.failures.is_empty());
    assert_eq!(report.stats.drawn, 2);
    assert_eq!(report.stats.skipped, 1);
    assert_eq!(report.figures.len(), 1);
    assert!(surface
        .filled()
        .iter()
        .all(|c| !matches!(c, Call::Filled { target, .. } if target.subplot == 2)));
    // the empty panel is still decorated
    assert_eq!(
        surface.decorations(0, 2).unwrap().title.as_deref(),
        Some("(c) case1")
    );
}

#[test]
fn test_area_mean_goes_to_top_right_title() {
    let cases = cases(1);
    let archive = archive("olr", &cases, None);
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&archive, dir.path());
    let ps = plot_set(
        cases.len(),
        r#"
figs = [{ name = "map.png" }]

[[shadings]]
variable = "olr"
xy_axis = [-1, -2]
min_maxs = [[0, 45], [-15, 15], [60, 210]]
amean = [100, 120, -15, 15]
"#,
    );

    let mut surface = RecordingSurface::new();
    Plotter::new(&cases, &ps, &ctx).run(&mut surface).unwrap();

    assert_eq!(
        surface.decorations(0, 0).unwrap().top_right_title.as_deref(),
        Some("amean=+1.1E+01")
    );
    assert_eq!(
        surface.decorations(0, 1).unwrap().top_right_title.as_deref(),
        Some("amean=+1.1E+02")
    );
}

#[test]
fn test_vector_scale_fixed_by_first_panel() {
    let cases = cases(1);
    let mut archive = archive("u", &cases, None);
    fill_archive(&mut archive, "v", &cases, None);
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&archive, dir.path());
    let ps = plot_set(
        cases.len(),
        r#"
figs = [{ name = "wind.png" }]

[[vectors]]
variable = "u"
variable2 = "v"
xy_axis = [-1, -2]
min_maxs = [[0, 45], [-15, 15], [60, 210]]
nx_per_panel = 10
ny_per_panel = 5
"#,
    );

    let mut surface = RecordingSurface::new();
    let summary = Plotter::new(&cases, &ps, &ctx).run(&mut surface).unwrap();
    assert_eq!(summary.stats.drawn, 2);

    let scales: Vec<Option<f64>> = surface
        .vectors()
        .iter()
        .map(|c| match c {
            Call::Vectors { style, .. } => style.scale,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(scales, vec![None, Some(7.0)]);

    // 31 x 151 grid strided by 6 and 15
    if let Call::Vectors { shape, .. } = surface.vectors()[0] {
        assert_eq!(*shape, (6, 11));
    }
}

#[test]
fn test_line_plot_of_lead_series() {
    let cases = cases(1);
    let archive = archive("olr", &cases, None);
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&archive, dir.path());
    let ps = plot_set(
        cases.len(),
        r#"
figs = [{ name = "series.png" }]

[[lines]]
variable = "olr"
xy_axis = ["none", 0]
min_maxs = [[0, 45], [-15, 15], [60, 210]]
style = { color = "r", dashed = true }
"#,
    );

    let mut surface = RecordingSurface::new();
    let summary = Plotter::new(&cases, &ps, &ctx).run(&mut surface).unwrap();
    assert_eq!(summary.stats.drawn, 2);

    let lines = surface.lines();
    assert_eq!(lines.len(), 2);
    for (line, expected) in lines.iter().zip([13.5, 113.5]) {
        match line {
            Call::Line { x, y, .. } => {
                assert_eq!(y.len(), 46);
                assert_eq!(y[0], 0.0);
                assert_eq!(y[45], 45.0);
                assert!(x.iter().all(|&v| approx(v, expected)));
            }
            _ => unreachable!(),
        }
    }
}

#[test]
fn test_unwritable_output_fails_only_that_plot_set() {
    let cases = cases(1);
    let archive = archive("olr", &cases, None);
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("figs");
    std::fs::write(&blocker, "not a directory").unwrap();
    let ctx = context(&archive, &blocker);

    let raw: PlotSetConfig = toml::from_str(OLR_LON_TIME).unwrap();
    let options = GeneralPlotOptions::from_config(cases.len(), &[raw], &Constants::default()).unwrap();

    let mut surface = RecordingSurface::new();
    let report = run_plot_sets(&cases, &options, &ctx, &mut surface);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, 0);
    assert!(report.figures.is_empty());
    assert!(surface.calls.is_empty());
}
