use core::fmt::Debug;
use std::{
    fs,
    path::{Path, PathBuf},
};

use dyn_clone::{DynClone, clone_trait_object};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{config::Settings, dataset::Dataset, label::RunLabel};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Svg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

impl std::str::FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "png" => Ok(ImageFormat::Png),
            "svg" => Ok(ImageFormat::Svg),
            other => Err(format!("Unknown image format {other}, expected png or svg")),
        }
    }
}

#[typetag::serde(tag = "type")]
pub trait Plot: Debug + DynClone + Send + Sync {
    /// Name used in logs and the run report
    fn name(&self) -> &'static str;
    /// Renders charts for one dataset
    ///
    /// Arguments:
    /// * `dataset` - The parsed benchmark file
    /// * `plot_path` - Root of the chart tree, ie. plot/
    /// * `settings` - The settings from the config file
    ///
    /// Returns the files written.
    fn plot(&self, dataset: &Dataset, plot_path: &Path, settings: &Settings)
    -> Result<Vec<PathBuf>>;
}
clone_trait_object!(Plot);

/// `{plot_path}/{map_kind}/{test_kind}_{parts..}.{ext}`
pub fn chart_path(
    plot_path: &Path,
    label: &RunLabel,
    parts: &[&str],
    format: ImageFormat,
) -> PathBuf {
    let mut name = label.test_kind.clone();
    for part in parts {
        name.push('_');
        name.push_str(part);
    }
    name.push('.');
    name.push_str(format.extension());
    plot_path.join(&label.map_kind).join(name)
}

pub fn ensure_parent_dir(filepath: &Path) -> Result<()> {
    if let Some(parent) = filepath.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        debug!("Creating {parent:?}");
        fs::create_dir_all(parent).context(format!("Creating {parent:?}"))?;
    }
    Ok(())
}

/// Runs every configured plot over one dataset.
pub fn plot(
    plots: &[Box<dyn Plot>],
    dataset: &Dataset,
    plot_path: &Path,
    settings: &Settings,
) -> Result<Vec<PathBuf>> {
    if plots.is_empty() {
        debug!("No plots");
        return Ok(Vec::new());
    }

    let mut written = Vec::new();
    for plot in plots {
        let files = plot
            .plot(dataset, plot_path, settings)
            .context(format!("{} plot for {}", plot.name(), dataset.label))?;
        debug!(
            "{} wrote {} files for {}",
            plot.name(),
            files.len(),
            dataset.label
        );
        written.extend(files);
    }
    Ok(written)
}
