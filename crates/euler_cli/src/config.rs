use euler_core::sampling::{SamplingSettings, DEFAULT_EXACT_POINTS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "euler_plot.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Points on the exact-solution curve.
    pub exact_points: usize,
    /// Rows shown in the sample table.
    pub table_rows: usize,
    /// Where to write the run as JSON for an external plotter.
    pub export_path: Option<PathBuf>,
    /// Open a plot window after the run (builds with the `plot` feature).
    pub show_plot: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            exact_points: DEFAULT_EXACT_POINTS,
            table_rows: 10,
            export_path: None,
            show_plot: true,
        }
    }
}

impl CliConfig {
    pub fn load() -> Self {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return Self::checked(config),
                    Err(e) => println!("Error parsing config file: {}. Using defaults.", e),
                },
                Err(e) => println!("Error reading config file: {}. Using defaults.", e),
            }
        }
        Self::default()
    }

    pub fn sampling(&self) -> SamplingSettings {
        SamplingSettings {
            exact_points: self.exact_points,
        }
    }

    fn checked(mut config: Self) -> Self {
        if let Err(e) = config.sampling().validate() {
            println!(
                "Invalid config value: {}. Using exact_points = {}.",
                e, DEFAULT_EXACT_POINTS
            );
            config.exact_points = DEFAULT_EXACT_POINTS;
        }
        config
    }
}
