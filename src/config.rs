use crate::case::Case;
use crate::options::PlotSetConfig;
use clap::{Arg, ArgMatches, Command};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Numeric constants and defaults shared across the pipeline
#[derive(Clone, Debug)]
pub struct Constants {
    /// Earth's radius (m)
    pub earth_radius: f64,
    /// Default regrid step along a plotting axis (coordinate units)
    pub regrid_delta: f64,
    /// Default observation climatology years
    pub obs_clim_years: [i32; 2],
    /// Default vector arrows per panel along each axis
    pub vectors_per_panel: usize,
    /// Default figure size (inches)
    pub figsize: [f64; 2],
    /// Pixels per inch when rasterising figures
    pub dpi: f64,
    /// Climatological surface pressure used when no climatology is available (hPa)
    pub surface_pressure: f64,
}

impl Default for Constants {
    fn default() -> Self {
        Self {
            earth_radius: 6371000.0,
            regrid_delta: 1.0,
            obs_clim_years: [2001, 2020],
            vectors_per_panel: 15,
            figsize: [6.4, 4.8],
            dpi: 100.0,
            surface_pressure: 1013.25,
        }
    }
}

/// Declarative run description loaded from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunFile {
    pub cases: Vec<Case>,
    pub general_plot: GeneralPlotSection,
}

/// `[general_plot]` table of a run file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralPlotSection {
    #[serde(default)]
    pub plot_sets: Vec<PlotSetConfig>,
}

impl RunFile {
    /// Parse a run file from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| format!("Invalid run file: {}", e))
    }

    /// Read and parse a run file
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read run file {}: {}", path.display(), e))?;
        Self::from_toml_str(&text)
    }
}

/// Command-line configuration
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Physical constants and defaults
    pub constants: Constants,
    /// Run file describing cases and plot sets
    pub run_file: PathBuf,
    /// Root of the data archive (observations and processed model output)
    pub data_dir: PathBuf,
    /// Root directory for figures; artifacts land in `<fig_dir>/general_plot`
    pub fig_dir: PathBuf,
    /// Climatological surface pressure file for the vertical operators
    pub surface_pressure_file: Option<PathBuf>,
    /// Validate only, do not read or render
    pub dry_run: bool,
    /// Verbose output
    pub verbose: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            constants: Constants::default(),
            run_file: PathBuf::from("run.toml"),
            data_dir: PathBuf::from("./data"),
            fig_dir: PathBuf::from("./figs"),
            surface_pressure_file: None,
            dry_run: false,
            verbose: false,
        }
    }
}

impl RunConfig {
    /// Arguments shared by the `run` and `validate` subcommands
    pub fn args() -> Vec<Arg> {
        vec![
            Arg::new("run-file")
                .value_name("RUN_FILE")
                .help("TOML file with [[cases]] and [general_plot] sections")
                .required(true),
            Arg::new("data-dir")
                .short('d')
                .long("data-dir")
                .value_name("DIR")
                .help("Root of the observation/model archive")
                .default_value("./data"),
            Arg::new("fig-dir")
                .short('o')
                .long("fig-dir")
                .value_name("DIR")
                .help("Root directory for figures")
                .default_value("./figs"),
            Arg::new("surface-pressure")
                .long("surface-pressure")
                .value_name("FILE")
                .help("Climatological surface pressure (NetCDF, variable \"sp\")"),
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(clap::ArgAction::SetTrue),
        ]
    }

    /// Build the top-level command
    pub fn command() -> Command {
        Command::new("genplot")
            .version("0.1.0")
            .about("Comparative forecast verification figures")
            .subcommand_required(true)
            .subcommand(
                Command::new("run")
                    .about("Read, reduce and render every plot set")
                    .args(Self::args()),
            )
            .subcommand(
                Command::new("validate")
                    .about("Validate a run file without reading data")
                    .args(Self::args()),
            )
    }

    /// Build a configuration from parsed subcommand arguments
    pub fn from_matches(matches: &ArgMatches, dry_run: bool) -> Result<Self, String> {
        let path_arg = |name: &str| -> Result<PathBuf, String> {
            matches
                .get_one::<String>(name)
                .map(PathBuf::from)
                .ok_or_else(|| format!("Missing argument: {}", name))
        };

        let config = Self {
            constants: Constants::default(),
            run_file: path_arg("run-file")?,
            data_dir: path_arg("data-dir")?,
            fig_dir: path_arg("fig-dir")?,
            surface_pressure_file: matches.get_one::<String>("surface-pressure").map(PathBuf::from),
            dry_run,
            verbose: matches.get_flag("verbose"),
        };

        config.validate()?;
        Ok(config)
    }

    /// Create a RunConfig for testing purposes (bypasses CLI parsing)
    #[cfg(test)]
    pub fn for_testing(run_file: PathBuf, data_dir: PathBuf, fig_dir: PathBuf) -> Result<Self, String> {
        let config = Self {
            run_file,
            data_dir,
            fig_dir,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if !self.run_file.is_file() {
            return Err(format!("Run file does not exist: {}", self.run_file.display()));
        }
        if self.dry_run {
            return Ok(());
        }
        if !self.data_dir.is_dir() {
            return Err(format!("Data directory does not exist: {}", self.data_dir.display()));
        }
        if self.fig_dir.exists() && !self.fig_dir.is_dir() {
            return Err(format!("Figure root is not a directory: {}", self.fig_dir.display()));
        }
        if let Some(sp) = &self.surface_pressure_file {
            if !sp.is_file() {
                return Err(format!("Surface pressure file does not exist: {}", sp.display()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const RUN_FILE: &str = r#"
[[cases]]
name = "CTL"
[cases.model]
name = "exp-ctl"
init_time0 = "2009-01-26"
num_init_times = 1
members = [0]
num_leads = 45
has_clim = true
clim_years = [2001, 2020]

[general_plot]
[[general_plot.plot_sets]]
figs = [{ name = "olr.png" }]

[[general_plot.plot_sets.shadings]]
variable = "olr"
xy_axis = [-1, -3]
min_maxs = [[0, 45], [-15, 15], [60, 210]]
"#;

    #[test]
    fn test_run_file_parses() {
        let run = RunFile::from_toml_str(RUN_FILE).unwrap();
        assert_eq!(run.cases.len(), 1);
        assert_eq!(run.general_plot.plot_sets.len(), 1);
    }

    #[test]
    fn test_run_file_rejects_unknown_keys() {
        let text = format!("{}\nunexpected = 1\n", RUN_FILE.replace("[general_plot]\n", "[general_plot]\nbogus = true\n"));
        let result = RunFile::from_toml_str(&text);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_validation_success() {
        let dir = tempfile::tempdir().unwrap();
        let run_file = dir.path().join("run.toml");
        fs::write(&run_file, RUN_FILE).unwrap();

        let result = RunConfig::for_testing(run_file, dir.path().to_path_buf(), dir.path().join("figs"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_config_validation_nonexistent_run_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = RunConfig::for_testing(
            dir.path().join("missing.toml"),
            dir.path().to_path_buf(),
            dir.path().to_path_buf(),
        );
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Run file does not exist"));
    }

    #[test]
    fn test_config_validation_missing_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let run_file = dir.path().join("run.toml");
        fs::write(&run_file, RUN_FILE).unwrap();

        let result = RunConfig::for_testing(run_file, dir.path().join("nope"), dir.path().to_path_buf());
        assert!(result.unwrap_err().contains("Data directory does not exist"));
    }

    #[test]
    fn test_cli_parses_run_subcommand() {
        let matches = RunConfig::command()
            .try_get_matches_from(["genplot", "validate", "run.toml", "-o", "out"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "validate");
        assert_eq!(sub.get_one::<String>("fig-dir").unwrap(), "out");
        assert!(!sub.get_flag("verbose"));
    }
}
