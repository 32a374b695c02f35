use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use eyre::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    dataset::Side,
    label::{RunLabel, TestKind},
    loader::Schema,
    plot::{ImageFormat, Plot},
};

pub const DEFAULT_CONFIG_FILE: &str = "plots.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub plots: Vec<Box<dyn Plot>>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .context(format!("Reading config {path:?}"))?;
        serde_yml::from_str(&content)
            .context(format!("Parsing config {path:?}"))
    }

    /// Loads `path` if given, otherwise [`DEFAULT_CONFIG_FILE`] when it exists,
    /// otherwise built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => Config::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Config::load(default)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory scanned for benchmark CSV files
    pub input_dir: PathBuf,
    /// Root of the written charts, one subdirectory per map kind
    pub output_dir: PathBuf,
    pub schema: Schema,
    pub format: ImageFormat,
    /// Image size in pixels, `[width, height]`
    pub size: (u32, u32),
    /// Only file names matching this regex are plotted
    pub filter: Option<String>,
    /// Abort on the first failing file instead of reporting at the end
    pub fail_fast: bool,
    pub series_names: BTreeMap<TestKind, SeriesNames>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            input_dir: PathBuf::from("out"),
            output_dir: PathBuf::from("plot"),
            schema: Schema::Auto,
            format: ImageFormat::Png,
            size: (1024, 768),
            filter: None,
            fail_fast: false,
            series_names: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesNames {
    pub a: String,
    pub b: String,
}

impl Settings {
    /// Display name of one side of a run, `None` for unknown test kinds.
    pub fn series_name(&self, label: &RunLabel, side: Side) -> Option<String> {
        let kind = label.kind()?;
        let name = match self.series_names.get(&kind) {
            Some(names) => match side {
                Side::A => names.a.clone(),
                Side::B => names.b.clone(),
            },
            None => {
                let (a, b) = kind.default_series_names();
                match side {
                    Side::A => a.to_owned(),
                    Side::B => b.to_owned(),
                }
            }
        };
        Some(name)
    }

    pub fn file_filter(&self) -> Result<Option<Regex>> {
        self.filter
            .as_deref()
            .map(|f| Regex::new(f).context(format!("Compiling file filter {f}")))
            .transpose()
    }
}
