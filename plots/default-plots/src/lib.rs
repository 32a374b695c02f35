use common::plot::Plot;

pub use percentile_grid::PercentileGrid;
pub use percentile_lines::PercentileLines;

/// Every available plot with its default settings.
pub fn all_plots() -> Vec<Box<dyn Plot>> {
    vec![
        Box::new(PercentileLines::default()),
        Box::new(PercentileGrid::default()),
    ]
}

/// Plots used when the config does not list any.
pub fn default_plots() -> Vec<Box<dyn Plot>> {
    vec![Box::new(PercentileLines::default())]
}

/// References every plot crate so their `typetag` registrations are linked
/// in. Returns the registered names.
pub fn init_plots() -> Vec<&'static str> {
    all_plots().iter().map(|p| p.name()).collect()
}

#[cfg(test)]
mod tests {
    use common::{config::Config, dataset::Statistic};

    use super::*;

    #[test]
    fn registered_names() {
        assert_eq!(init_plots(), vec!["PercentileLines", "PercentileGrid"]);
        assert_eq!(default_plots().len(), 1);
    }

    #[test]
    fn config_selects_plots_by_type() {
        init_plots();
        let yaml = r#"
settings:
  output_dir: charts
plots:
  - type: PercentileLines
    series: [a_mean]
  - type: PercentileGrid
    columns: 2
"#;
        let config: Config = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.plots.len(), 2);
        assert_eq!(config.plots[0].name(), "PercentileLines");
        assert_eq!(config.plots[1].name(), "PercentileGrid");

        let grid = serde_json::to_value(&config.plots[1]).unwrap();
        assert_eq!(grid["type"], "PercentileGrid");
        assert_eq!(grid["panels"].as_array().unwrap().len(), Statistic::ALL.len());
    }

    #[test]
    fn unknown_plot_type_is_rejected() {
        let yaml = "plots:\n  - type: Heatmap\n";
        assert!(serde_yml::from_str::<Config>(yaml).is_err());
    }
}
