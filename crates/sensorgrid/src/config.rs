use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sensorgrid_core::OutputFormat;
use sensorgrid_parser::ColumnNames;
use serde::Deserialize;

pub const CONFIG_ENV: &str = "SENSORGRID_CONFIG";
pub const FREQUENCY_ENV: &str = "SENSORGRID_FREQUENCY";
pub const OUTPUT_DIR_ENV: &str = "SENSORGRID_OUTPUT_DIR";

const DEFAULT_FREQUENCY: f64 = 2.0;
const DEFAULT_OUTPUT_DIR: &str = "cleaned";

/// Optional settings file. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub frequency: Option<f64>,
    pub output_dir: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub bom: Option<bool>,
    pub columns: Option<ColumnNames>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

/// Values given on the command line; they win over everything else.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub frequency: Option<f64>,
    pub output_dir: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub no_bom: bool,
    pub timestamp_column: Option<String>,
    pub device_column: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub frequency: f64,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub bom: bool,
    pub columns: ColumnNames,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frequency: DEFAULT_FREQUENCY,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            format: OutputFormat::Csv,
            bom: true,
            columns: ColumnNames::default(),
        }
    }
}

impl Settings {
    /// Defaults, then the config file, then environment variables, then `overrides`.
    pub fn resolve<F>(config_path: Option<&Path>, env: F, overrides: &Overrides) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        let config_path = config_path
            .map(Path::to_path_buf)
            .or_else(|| env(CONFIG_ENV).map(PathBuf::from));
        if let Some(path) = config_path {
            settings.apply_file(ConfigFile::load(&path)?);
        }

        settings.apply_env(env)?;
        settings.apply_overrides(overrides);
        Ok(settings)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(frequency) = file.frequency {
            self.frequency = frequency;
        }
        if let Some(output_dir) = file.output_dir {
            self.output_dir = output_dir;
        }
        if let Some(format) = file.format {
            self.format = format;
        }
        if let Some(bom) = file.bom {
            self.bom = bom;
        }
        if let Some(columns) = file.columns {
            self.columns = columns;
        }
    }

    fn apply_env<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = env(FREQUENCY_ENV) {
            self.frequency = raw
                .trim()
                .parse()
                .with_context(|| format!("{FREQUENCY_ENV} must be a number, got '{raw}'"))?;
        }
        if let Some(dir) = env(OUTPUT_DIR_ENV) {
            self.output_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(frequency) = overrides.frequency {
            self.frequency = frequency;
        }
        if let Some(dir) = &overrides.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(format) = overrides.format {
            self.format = format;
        }
        if overrides.no_bom {
            self.bom = false;
        }
        if let Some(name) = &overrides.timestamp_column {
            self.columns.timestamp = vec![name.clone()];
        }
        if let Some(name) = &overrides.device_column {
            self.columns.device = vec![name.clone()];
        }
    }
}
