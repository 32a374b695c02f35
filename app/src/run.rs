use std::{
    fmt::Display,
    fs::create_dir_all,
    path::{Path, PathBuf},
};

use common::{
    config::Settings,
    label::RunLabel,
    loader::{discover, load},
    plot::Plot,
};
use eyre::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

#[derive(Debug)]
pub enum Outcome {
    Rendered(Vec<PathBuf>),
    Skipped(String),
}

#[derive(Debug, Default)]
pub struct Report {
    pub rendered: Vec<(PathBuf, Vec<PathBuf>)>,
    pub skipped: Vec<(PathBuf, String)>,
    pub failed: Vec<(PathBuf, eyre::Report)>,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

fn file_name(path: &Path) -> &str {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
}

impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let charts: usize = self.rendered.iter().map(|(_, files)| files.len()).sum();
        writeln!(
            f,
            "rendered {} files ({charts} charts), skipped {}, failed {}",
            self.rendered.len(),
            self.skipped.len(),
            self.failed.len()
        )?;
        for (path, reason) in &self.skipped {
            writeln!(f, "  skipped {}: {reason}", file_name(path))?;
        }
        for (path, err) in &self.failed {
            writeln!(f, "  failed {}: {err:#}", file_name(path))?;
        }
        Ok(())
    }
}

/// Benchmark files in the input directory that pass the configured filter.
pub fn input_files(settings: &Settings) -> Result<Vec<PathBuf>> {
    let filter = settings.file_filter()?;
    let files = discover(&settings.input_dir)
        .context(format!("Reading input directory {:?}", settings.input_dir))?;
    Ok(files
        .into_iter()
        .filter(|path| match &filter {
            Some(re) => re.is_match(file_name(path)),
            None => true,
        })
        .collect())
}

/// Classifies, loads and plots one file. The whole file is read before
/// anything is drawn, so a bad row never leaves a partial chart behind.
pub fn process_file(path: &Path, plots: &[Box<dyn Plot>], settings: &Settings) -> Result<Outcome> {
    let label = RunLabel::classify(file_name(path))?;
    if label.kind().is_none() {
        return Ok(Outcome::Skipped(format!("unknown test kind {}", label.test_kind)));
    }

    let dataset = load(path, settings.schema)?;
    if dataset.is_empty() {
        return Ok(Outcome::Skipped("no rows".to_owned()));
    }
    debug!("{}: {} schema", dataset.label, dataset.schema);

    let files = common::plot::plot(plots, &dataset, &settings.output_dir, settings)?;
    Ok(Outcome::Rendered(files))
}

pub fn run(plots: &[Box<dyn Plot>], settings: &Settings, no_progress: bool) -> Result<Report> {
    let files = input_files(settings)?;
    debug!("Got {} input files", files.len());
    create_dir_all(&settings.output_dir)
        .context(format!("Creating output directory {:?}", settings.output_dir))?;

    let bar = if no_progress {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(files.len() as u64)
    };
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
            .context("Progress bar template")?,
    );

    let mut report = Report::default();
    for path in files {
        bar.set_message(file_name(&path).to_owned());
        match process_file(&path, plots, settings) {
            Ok(Outcome::Rendered(charts)) => {
                info!("{}: {} charts", file_name(&path), charts.len());
                report.rendered.push((path, charts));
            }
            Ok(Outcome::Skipped(reason)) => {
                warn!("Skipping {}: {reason}", file_name(&path));
                report.skipped.push((path, reason));
            }
            Err(err) => {
                if settings.fail_fast {
                    bar.abandon();
                    return Err(err.wrap_err(format!("Processing {path:?}")));
                }
                error!("{}: {err:#}", file_name(&path));
                report.failed.push((path, err));
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();
    Ok(report)
}
