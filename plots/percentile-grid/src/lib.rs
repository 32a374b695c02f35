use std::path::{Path, PathBuf};

use common::{
    config::Settings,
    dataset::{Dataset, Side, StatKey, Statistic},
    plot::{Plot, chart_path},
};
use eyre::{Result, bail};
use itertools::Itertools;
use plot_common::{ChartJob, Panel, render_jobs};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A grid of sub-plots per compared side, ie. `churn_probes.png` holding
/// mean, 50th, 95th and 99th.
///
/// A panel either names a statistic, drawn for each entry of `sides`, or a
/// fixed series such as `b_mean`. Figures that end up with the same series
/// are written once, so a grid of only fixed series gives a single image
/// named after every side it draws, ie. `churn_probes_writes.png`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PercentileGrid {
    pub panels: Vec<PanelSpec>,
    pub columns: usize,
    pub sides: Vec<Side>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSpec {
    pub title: String,
    #[serde(flatten)]
    pub source: PanelSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelSource {
    Stat(Statistic),
    Series(StatKey),
}

impl PanelSource {
    fn key(self, side: Side) -> StatKey {
        match self {
            PanelSource::Stat(stat) => StatKey::new(side, stat),
            PanelSource::Series(key) => key,
        }
    }
}

impl Default for PercentileGrid {
    fn default() -> Self {
        PercentileGrid {
            panels: Statistic::ALL
                .into_iter()
                .map(|stat| PanelSpec {
                    title: stat.title().to_owned(),
                    source: PanelSource::Stat(stat),
                })
                .collect(),
            columns: 2,
            sides: Side::ALL.to_vec(),
        }
    }
}

impl PercentileGrid {
    pub fn jobs(&self, dataset: &Dataset, plot_path: &Path, settings: &Settings) -> Vec<ChartJob> {
        let label = &dataset.label;
        let (Some(a), Some(b)) = (
            settings.series_name(label, Side::A),
            settings.series_name(label, Side::B),
        ) else {
            warn!("No series names for test kind {}", label.test_kind);
            return Vec::new();
        };
        let name = |side: Side| match side {
            Side::A => a.as_str(),
            Side::B => b.as_str(),
        };

        self.sides
            .iter()
            .map(|side| {
                self.panels
                    .iter()
                    .map(|spec| spec.source.key(*side))
                    .collect::<Vec<_>>()
            })
            .unique()
            .filter_map(|keys| {
                let parts = keys
                    .iter()
                    .map(|key| name(key.side))
                    .unique()
                    .collect::<Vec<_>>();
                let panels = self
                    .panels
                    .iter()
                    .zip(&keys)
                    .map(|(spec, key)| Panel {
                        title: spec.title.clone(),
                        lines: dataset.series(*key).lines(),
                        fallback_label: name(key.side).to_owned(),
                    })
                    .collect::<Vec<_>>();
                if panels.iter().all(Panel::is_empty) {
                    debug!("{label}: nothing to draw for {}", parts.join(", "));
                    return None;
                }

                Some(ChartJob {
                    filepath: chart_path(plot_path, label, &parts, settings.format),
                    panels,
                    columns: self.columns,
                })
            })
            .collect()
    }
}

#[typetag::serde]
impl Plot for PercentileGrid {
    fn name(&self) -> &'static str {
        "PercentileGrid"
    }

    fn plot(
        &self,
        dataset: &Dataset,
        plot_path: &Path,
        settings: &Settings,
    ) -> Result<Vec<PathBuf>> {
        if self.panels.is_empty() {
            bail!("PercentileGrid needs at least one panel");
        }
        let jobs = self.jobs(dataset, plot_path, settings);
        render_jobs(&jobs, settings.format, settings.size)
    }
}
