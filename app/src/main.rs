use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use common::{
    config::{Config, Settings},
    label::RunLabel,
    loader::{Schema, load},
    plot::ImageFormat,
};
use eyre::{Result, bail};
use tracing::{debug, error};
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

mod run;

const MODULES: &[&str] = &[
    "common",
    "plot_common",
    "percentile_lines",
    "percentile_grid",
];

#[derive(Parser)]
#[command(version, about = "Plot latency percentiles from hash-map benchmark CSVs")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    #[arg(long, default_value_t = false)]
    no_progress: bool,
    #[arg(short, long)]
    log: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render charts for every benchmark file (the default)
    Plot(PlotArgs),
    /// List benchmark files and how their names classify
    Ls {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory holding the benchmark CSVs
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Print a JSON summary of one benchmark file
    Inspect {
        file: PathBuf,
        #[arg(long)]
        schema: Option<Schema>,
    },
}

#[derive(Args, Default)]
struct PlotArgs {
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory holding the benchmark CSVs
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Root directory for the charts
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// auto, shared, paired or flat
    #[arg(long)]
    schema: Option<Schema>,
    /// png or svg
    #[arg(long)]
    format: Option<ImageFormat>,
    /// Stop at the first file that fails
    #[arg(long, default_value_t = false)]
    fail_fast: bool,
}

impl PlotArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(input) = &self.input {
            settings.input_dir = input.clone();
        }
        if let Some(output) = &self.output {
            settings.output_dir = output.clone();
        }
        if let Some(schema) = self.schema {
            settings.schema = schema;
        }
        if let Some(format) = self.format {
            settings.format = format;
        }
        if self.fail_fast {
            settings.fail_fast = true;
        }
    }
}

fn main() -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("warn".to_owned());
    let args = Cli::parse();
    let file_appender = tracing_appender::rolling::never(".", "log.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let mut env_filter = EnvFilter::new(format!("hashmap_plots={log_level}"));

    if !args.log.is_empty() {
        for log in &args.log {
            env_filter = env_filter.add_directive(log.parse()?);
        }
    }

    for module in MODULES {
        if !args.log.iter().any(|x| x.starts_with(module)) {
            env_filter = env_filter.add_directive(format!("{module}={log_level}").parse()?);
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .with_writer(std::io::stderr)
                .compact(),
        )
        .with(layer().with_writer(non_blocking))
        .init();

    let plots = default_plots::init_plots();
    debug!("Registered plots: {plots:?}");

    match args.command.unwrap_or(Commands::Plot(PlotArgs::default())) {
        Commands::Plot(plot_args) => {
            if let Err(err) = plot(&plot_args, args.no_progress) {
                error!("{err:#}");
                return Err(err);
            }
        }
        Commands::Ls { config, input } => list_files(config, input)?,
        Commands::Inspect { file, schema } => inspect(file, schema.unwrap_or_default())?,
    };

    Ok(())
}

fn plot(plot_args: &PlotArgs, no_progress: bool) -> Result<()> {
    let mut config = Config::load_or_default(plot_args.config.as_deref())?;
    plot_args.apply(&mut config.settings);
    if config.plots.is_empty() {
        config.plots = default_plots::default_plots();
    }

    let report = run::run(&config.plots, &config.settings, no_progress)?;
    print!("{report}");
    if !report.is_success() {
        bail!("{} benchmark files failed", report.failed.len());
    }
    Ok(())
}

fn list_files(config: Option<PathBuf>, input: Option<PathBuf>) -> Result<()> {
    let mut config = Config::load_or_default(config.as_deref())?;
    if let Some(input) = input {
        config.settings.input_dir = input;
    }

    for path in run::input_files(&config.settings)? {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        match RunLabel::classify(name) {
            Ok(label) => match label.kind() {
                Some(_) => println!(
                    "{name} -> test={} map={}",
                    label.test_kind, label.map_kind
                ),
                None => println!(
                    "{name} -> test={} map={} (unknown test kind, skipped)",
                    label.test_kind, label.map_kind
                ),
            },
            Err(err) => println!("{name} -> {err}"),
        }
    }
    Ok(())
}

fn inspect(file: PathBuf, schema: Schema) -> Result<()> {
    let dataset = load(&file, schema)?;
    println!("{}", serde_json::to_string_pretty(&dataset.summary())?);
    Ok(())
}
