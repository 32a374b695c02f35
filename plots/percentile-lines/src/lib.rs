use std::path::{Path, PathBuf};

use common::{
    config::Settings,
    dataset::{Dataset, StatKey},
    plot::{Plot, chart_path},
};
use eyre::Result;
use plot_common::{ChartJob, Panel, render_jobs};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One chart per series per statistic, ie. `churn_probes_95.png`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PercentileLines {
    /// Series to draw, as `a_mean`, `b_99`, ...
    pub series: Vec<StatKey>,
}

impl Default for PercentileLines {
    fn default() -> Self {
        PercentileLines {
            series: StatKey::all().collect(),
        }
    }
}

impl PercentileLines {
    pub fn jobs(&self, dataset: &Dataset, plot_path: &Path, settings: &Settings) -> Vec<ChartJob> {
        let label = &dataset.label;
        let mut jobs = Vec::new();
        for key in &self.series {
            let Some(name) = settings.series_name(label, key.side) else {
                warn!("No series names for test kind {}", label.test_kind);
                return Vec::new();
            };
            let series = dataset.series(*key);
            if series.is_empty() {
                debug!("{label}: {key} is empty");
                continue;
            }

            jobs.push(ChartJob {
                filepath: chart_path(
                    plot_path,
                    label,
                    &[name.as_str(), key.stat.suffix()],
                    settings.format,
                ),
                panels: vec![Panel {
                    title: format!(
                        "{} {}: {name} ({})",
                        label.test_kind,
                        label.map_kind,
                        key.stat.title()
                    ),
                    lines: series.lines(),
                    fallback_label: name,
                }],
                columns: 1,
            });
        }
        jobs
    }
}

#[typetag::serde]
impl Plot for PercentileLines {
    fn name(&self) -> &'static str {
        "PercentileLines"
    }

    fn plot(
        &self,
        dataset: &Dataset,
        plot_path: &Path,
        settings: &Settings,
    ) -> Result<Vec<PathBuf>> {
        let jobs = self.jobs(dataset, plot_path, settings);
        render_jobs(&jobs, settings.format, settings.size)
    }
}
