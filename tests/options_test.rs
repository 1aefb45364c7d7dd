use genplot_rust::config::{Constants, RunFile};
use genplot_rust::options::{GeneralPlotOptions, OptionError, PlotSetConfig, PlotType, ShadingConfig};

const RUN_FILE: &str = r#"
[[cases]]
name = "CTL"
[cases.model]
name = "exp-ctl"
init_time0 = "2009-01-26"
num_init_times = 3
members = [0, 1, 2]
num_leads = 60

[[cases]]
name = "NEW"
[cases.model]
name = "exp-new"
init_time0 = "2009-01-26"
num_init_times = 3
members = [0, 1, 2]
num_leads = 60

[general_plot]
[[general_plot.plot_sets]]
figs = [{ name = "olr.png" }]

[[general_plot.plot_sets.shadings]]
variable = "olr"
xy_axis = [-1, -3]
min_maxs = [[0, 45], [-15, 15], [60, 210]]
levels = [-40, -20, 0, 20, 40]
colormap = "coolwarm"

[[general_plot.plot_sets]]
figs = [{ name = "u850.png" }]
figs_dim_by = "case"
with_obs = false

[[general_plot.plot_sets.contours]]
variable = "u"
xy_axis = [-1, -2]
min_maxs = [[0, 10], [850, 850], [-15, 15], [60, 210]]
operators = ["vertical_pressure_mean"]
styles = [{ levels = [2, 4, 6], color = "k" }, { levels = [-6, -4, -2], color = "k", dashed = true }]
"#;

fn shading(text: &str) -> Result<PlotType, OptionError> {
    let raw: ShadingConfig = toml::from_str(text).unwrap();
    PlotType::shading(&raw, &Constants::default())
}

#[test]
fn test_run_file_to_plot_options() {
    let run = RunFile::from_toml_str(RUN_FILE).unwrap();
    assert_eq!(run.cases.len(), 2);
    assert_eq!(run.cases[0].model.members.len(), 3);

    let options =
        GeneralPlotOptions::from_config(run.cases.len(), &run.general_plot.plot_sets, &Constants::default()).unwrap();
    assert_eq!(options.plot_sets.len(), 2);

    let first = &options.plot_sets[0];
    assert_eq!(first.num_rows, 3);
    assert_eq!(first.subplots.len(), 3);
    assert_eq!(first.plot_types[0].kind(), "shading");

    let second = &options.plot_sets[1];
    assert!(second.cases_on_figs());
    assert_eq!(second.num_rows, 2);
    assert_eq!(second.subplots.len(), 1);
    assert_eq!(second.plot_types[0].common().xy_axis, [Some(3), Some(2)]);
}

#[test]
fn test_duplicate_figure_names_across_plot_sets() {
    let run = RunFile::from_toml_str(&RUN_FILE.replace("u850.png", "olr.png")).unwrap();
    let err = GeneralPlotOptions::from_config(run.cases.len(), &run.general_plot.plot_sets, &Constants::default())
        .unwrap_err();
    assert_eq!(err, OptionError::DuplicateFigure("olr.png".to_string()));
}

#[test]
fn test_no_plot_sets_or_cases() {
    let err = GeneralPlotOptions::from_config(2, &[], &Constants::default()).unwrap_err();
    assert_eq!(err, OptionError::NoPlotSets);

    let raw: PlotSetConfig = toml::from_str(
        "figs = [{ name = \"a.png\" }]\n[[lines]]\nvariable = \"olr\"\nxy_axis = [\"none\", 0]\nmin_maxs = [[0, 10]]",
    )
    .unwrap();
    let err = GeneralPlotOptions::from_config(0, &[raw], &Constants::default()).unwrap_err();
    assert_eq!(err, OptionError::NoCases);
}

#[test]
fn test_unknown_operator_is_a_config_error() {
    let run = RunFile::from_toml_str(&RUN_FILE.replace("vertical_pressure_mean", "vertical_mean")).unwrap();
    let err = GeneralPlotOptions::from_config(run.cases.len(), &run.general_plot.plot_sets, &Constants::default())
        .unwrap_err();
    assert!(matches!(err, OptionError::Operator(_)));
    assert!(err.to_string().contains("vertical_mean"));
}

#[test]
fn test_unknown_keys_rejected() {
    let misspelt = RUN_FILE.replace("colormap = \"coolwarm\"", "colourmap = \"coolwarm\"");
    assert!(RunFile::from_toml_str(&misspelt).is_err());

    let bad_colormap = RUN_FILE.replace("\"coolwarm\"", "\"jet\"");
    assert!(RunFile::from_toml_str(&bad_colormap).is_err());
}

#[test]
fn test_axis_resolution_is_idempotent() {
    let negative = shading("variable = \"olr\"\nxy_axis = [-1, -3]\nmin_maxs = [[0, 45], [-15, 15], [60, 210]]").unwrap();
    let resolved = negative.common().xy_axis;
    assert_eq!(resolved, [Some(2), Some(0)]);

    let positive = shading("variable = \"olr\"\nxy_axis = [2, 0]\nmin_maxs = [[0, 45], [-15, 15], [60, 210]]").unwrap();
    assert_eq!(positive.common().xy_axis, resolved);

    let out_of_range = shading("variable = \"olr\"\nxy_axis = [-4, 0]\nmin_maxs = [[0, 45], [-15, 15], [60, 210]]");
    assert!(matches!(out_of_range, Err(OptionError::PlotType { .. })));
}

#[test]
fn test_levels_must_increase() {
    let err = shading(
        "variable = \"olr\"\nxy_axis = [-1, -3]\nmin_maxs = [[0, 45], [-15, 15], [60, 210]]\nlevels = [0, 10, 5]",
    );
    assert!(matches!(err, Err(OptionError::PlotType { .. })));
}
