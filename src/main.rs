use clap::ArgMatches;
use env_logger::Env;
use genplot_rust::{
    case::validate_cases,
    config::{RunConfig, RunFile},
    data_io::FieldReader,
    operators::{SurfacePressureSource, UniformSurfacePressure},
    options::GeneralPlotOptions,
    pipeline::{run_plot_sets, RunContext},
    render::PlottersSurface,
};
use log::{info, warn};

fn main() {
    let matches = RunConfig::command().get_matches();

    let (sub_matches, dry_run) = match matches.subcommand() {
        Some(("run", sub_matches)) => (sub_matches, false),
        Some(("validate", sub_matches)) => (sub_matches, true),
        _ => {
            eprintln!("Unknown subcommand; see --help");
            std::process::exit(2);
        }
    };
    init_logging(sub_matches.get_flag("verbose"));

    let (config, run_file, options) = match load(sub_matches, dry_run) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if dry_run {
        info!(
            "{} is valid: {} case(s), {} plot set(s)",
            config.run_file.display(),
            run_file.cases.len(),
            options.plot_sets.len()
        );
        return;
    }

    let reader = open_reader(&config);
    let surface_pressure = open_surface_pressure(&config);
    let ctx = RunContext {
        reader: reader.as_ref(),
        constants: &config.constants,
        surface_pressure: surface_pressure.as_ref(),
        fig_root: config.fig_dir.clone(),
    };
    let mut surface = PlottersSurface::new();
    let report = run_plot_sets(&run_file.cases, &options, &ctx, &mut surface);

    info!(
        "{} figure(s) saved, {} panel(s) drawn, {} skipped, {} plot set(s) failed",
        report.figures.len(),
        report.stats.drawn,
        report.stats.skipped,
        report.failures.len()
    );
}

fn init_logging(verbose: bool) {
    logging_builder(Env::default(), verbose).init();
}

/// `RUST_LOG` (or `info`) unless `--verbose` asks for debug output
fn logging_builder(env: Env<'_>, verbose: bool) -> env_logger::Builder {
    let mut builder = env_logger::Builder::from_env(env.default_filter_or("info"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder
}

/// Parse arguments, run file and plot options; any failure here is a configuration error
fn load(matches: &ArgMatches, dry_run: bool) -> Result<(RunConfig, RunFile, GeneralPlotOptions), String> {
    let config = RunConfig::from_matches(matches, dry_run)?;
    let run_file = RunFile::load(&config.run_file)?;
    validate_cases(&run_file.cases).map_err(|e| format!("Invalid cases: {}", e))?;
    let options = GeneralPlotOptions::from_config(
        run_file.cases.len(),
        &run_file.general_plot.plot_sets,
        &config.constants,
    )
    .map_err(|e| format!("Invalid plot configuration: {}", e))?;
    Ok((config, run_file, options))
}

#[cfg(feature = "netcdf")]
fn open_reader(config: &RunConfig) -> Box<dyn FieldReader> {
    Box::new(genplot_rust::data_io::NetCdfArchive::new(&config.data_dir))
}

#[cfg(not(feature = "netcdf"))]
fn open_reader(config: &RunConfig) -> Box<dyn FieldReader> {
    warn!(
        "built without the \"netcdf\" feature, nothing under {} can be read",
        config.data_dir.display()
    );
    Box::new(genplot_rust::data_io::MemoryArchive::new())
}

#[cfg(feature = "netcdf")]
fn climatology_surface_pressure(path: &std::path::Path) -> Option<Box<dyn SurfacePressureSource>> {
    match genplot_rust::data_io::NetCdfSurfacePressure::open(path) {
        Ok(sp) => Some(Box::new(sp)),
        Err(e) => {
            warn!("cannot read surface pressure from {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(not(feature = "netcdf"))]
fn climatology_surface_pressure(path: &std::path::Path) -> Option<Box<dyn SurfacePressureSource>> {
    warn!(
        "built without the \"netcdf\" feature, {} is ignored",
        path.display()
    );
    None
}

fn open_surface_pressure(config: &RunConfig) -> Box<dyn SurfacePressureSource> {
    config
        .surface_pressure_file
        .as_deref()
        .and_then(climatology_surface_pressure)
        .unwrap_or_else(|| {
            info!(
                "vertical operators use a uniform {} hPa surface pressure",
                config.constants.surface_pressure
            );
            Box::new(UniformSurfacePressure::new(config.constants.surface_pressure))
        })
}
