use clap::{Args, Parser, Subcommand, ValueEnum};
use star_ratings::export::{CsvExporter, CsvTable, JsonExporter, ReportExporter};
use star_ratings::prelude::*;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "srcli")]
#[command(about = "Star Ratings CLI - Filter, benchmark, and screen aged care Star Ratings data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the state, size, MMM and provider options in a file
    Filters(SourceArgs),
    /// Show summary statistics for a dataset
    Stats(SourceArgs),
    /// Sector benchmarks, and the provider comparison when --provider is given
    Benchmark(FilterArgs),
    /// Percentile radar for the selected provider
    Radar(FilterArgs),
    /// IQR outliers in the filtered sector
    Outliers(FilterArgs),
    /// Write the full analysis to JSON or CSV
    Report(ReportArgs),
}

#[derive(Args)]
struct SourceArgs {
    /// Quarterly extract workbook (.xlsx) or CSV export of the detailed sheet
    #[arg(short, long, env = "STAR_RATINGS_FILE")]
    file: PathBuf,
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Disable the loading spinner
    #[arg(long)]
    no_progress: bool,
}

#[derive(Args)]
struct FilterArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// State or territory (e.g. NSW); all when omitted
    #[arg(long)]
    state: Option<String>,
    /// Service size; repeat to select several, all when omitted
    #[arg(long = "size")]
    sizes: Vec<String>,
    /// MMM code; repeat to select several, all when omitted
    #[arg(long = "mmm")]
    mmm_codes: Vec<String>,
    /// Provider name for the drill-down
    #[arg(long)]
    provider: Option<String>,
}

#[derive(Args)]
struct ReportArgs {
    #[command(flatten)]
    filters: FilterArgs,
    /// Output file path
    #[arg(short, long)]
    output: PathBuf,
    /// Export format
    #[arg(long, value_enum, default_value_t = ExportFormatOpt::Json)]
    format: ExportFormatOpt,
    /// Table written by CSV exports
    #[arg(long, value_enum, default_value_t = CsvTableOpt::Outliers)]
    table: CsvTableOpt,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum ExportFormatOpt {
    Json,
    Csv,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum CsvTableOpt {
    Outliers,
    Benchmarks,
    Comparison,
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Filters(args) => cmd_filters(args),
        Commands::Stats(args) => cmd_stats(args),
        Commands::Benchmark(args) => cmd_benchmark(args),
        Commands::Radar(args) => cmd_radar(args),
        Commands::Outliers(args) => cmd_outliers(args),
        Commands::Report(args) => cmd_report(args),
    };

    if let Err(e) = result {
        match e.downcast_ref::<StarRatingsError>() {
            Some(err) => eprintln!("Error: {}", err.user_message()),
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("star_ratings=info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load(args: &SourceArgs) -> anyhow::Result<(StarRatingsDataset, StarRatingsConfig)> {
    let config = match &args.config {
        Some(path) => StarRatingsConfig::from_file(path)?,
        None => StarRatingsConfig::load(),
    };
    let dataset = StarRatingsDatasetBuilder::new()
        .config(config.clone())
        .source(&args.file)
        .show_progress(config.show_progress && !args.no_progress)
        .build()?;
    Ok((dataset, config))
}

impl FilterArgs {
    fn filter_state(&self) -> FilterState {
        let selection = |values: &[String]| {
            if values.is_empty() {
                Selection::All
            } else {
                Selection::only(values.iter().cloned())
            }
        };
        let choice = |value: &Option<String>| value.as_ref().map(Choice::exactly).unwrap_or_default();

        FilterState::new()
            .with_region(choice(&self.state))
            .with_sizes(selection(&self.sizes))
            .with_mmm_codes(selection(&self.mmm_codes))
            .with_provider(choice(&self.provider))
    }

    fn run(&self) -> anyhow::Result<PipelineOutput> {
        let (dataset, config) = load(&self.source)?;
        let output = recompute(&dataset, &self.filter_state(), &config);
        println!(
            "{} | {} of {} services",
            output.filter_description, output.sector_services, output.total_services
        );
        Ok(output)
    }
}

fn require_provider(args: &FilterArgs) -> anyhow::Result<()> {
    if args.provider.is_none() {
        anyhow::bail!("--provider is required for this command");
    }
    Ok(())
}

fn cmd_filters(args: SourceArgs) -> anyhow::Result<()> {
    let (dataset, _) = load(&args)?;
    let options = dataset.filter_options();
    println!("States/Territories: {}", options.regions.join(", "));
    println!("Sizes: {}", options.sizes.join(", "));
    println!("MMM Codes: {}", options.mmm_codes.join(", "));

    let providers = dataset.views(&FilterState::new()).provider_options;
    println!("Providers: {}", providers.len());
    for provider in providers {
        println!("  {}", provider);
    }
    Ok(())
}

fn cmd_stats(args: SourceArgs) -> anyhow::Result<()> {
    let (dataset, _) = load(&args)?;
    println!("{}", dataset.statistics());
    Ok(())
}

fn format_value(value: Option<f64>) -> String {
    value.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "N/A".to_string())
}

fn cmd_benchmark(args: FilterArgs) -> anyhow::Result<()> {
    let output = args.run()?;

    println!("{:<45} {:>8} {:>8} {:>8} {:>6}", "Measure", "Median", "P75", "P90", "n");
    for b in &output.benchmarks {
        println!(
            "{:<45} {:>8} {:>8} {:>8} {:>6}",
            b.measure,
            format_value(b.median),
            format_value(b.p75),
            format_value(b.p90),
            b.observations
        );
    }

    if let Some(provider) = &output.provider {
        println!();
        println!("{} ({} services)", provider.profile.provider_name, provider.profile.services);
        match &provider.comparison {
            Analysis::Computed(rows) => {
                for row in rows {
                    println!(
                        "{:<45} {:>8.1}  {}",
                        row.measure,
                        row.provider_value,
                        row.tier.map(|t| t.label()).unwrap_or("no benchmark")
                    );
                }
            }
            Analysis::InsufficientData(shortfall) => println!("{}", shortfall),
        }
    }
    Ok(())
}

fn cmd_radar(args: FilterArgs) -> anyhow::Result<()> {
    require_provider(&args)?;
    let output = args.run()?;
    let Some(provider) = output.provider else {
        return Ok(());
    };

    match provider.radar {
        Analysis::Computed(chart) => {
            for score in &chart.scores {
                println!(
                    "{:<30} {:>6.1}  mean {:>6.2}  {:?}",
                    score.label(),
                    score.percentile,
                    score.provider_mean,
                    score.signal
                );
            }
            if !chart.unscored.is_empty() {
                println!("Not scored: {}", chart.unscored.join(", "));
            }
        }
        Analysis::InsufficientData(shortfall) => println!("{}", shortfall),
    }
    Ok(())
}

fn cmd_outliers(args: FilterArgs) -> anyhow::Result<()> {
    let output = args.run()?;

    match &output.outliers {
        Analysis::Computed(report) if report.is_empty() => println!("No outliers found"),
        Analysis::Computed(report) => {
            for outlier in &report.outliers {
                println!("{}", outlier);
            }
            println!();
            println!("By metric:");
            for (metric, count) in report.counts_by_metric() {
                println!("  {:<45} {}", metric, count);
            }
            println!("By provider:");
            for (provider, count) in report.counts_by_provider().iter().take(10) {
                println!("  {:<45} {}", provider, count);
            }
        }
        Analysis::InsufficientData(shortfall) => println!("{}", shortfall),
    }
    Ok(())
}

fn cmd_report(args: ReportArgs) -> anyhow::Result<()> {
    let output = args.filters.run()?;

    let exporter: Box<dyn ReportExporter> = match args.format {
        ExportFormatOpt::Json => Box::new(JsonExporter::new()),
        ExportFormatOpt::Csv => {
            let table = match args.table {
                CsvTableOpt::Outliers => CsvTable::Outliers,
                CsvTableOpt::Benchmarks => CsvTable::Benchmarks,
                CsvTableOpt::Comparison => CsvTable::Comparison,
            };
            Box::new(CsvExporter::new().with_table(table))
        }
    };
    exporter.export(&output, &args.output)?;
    println!("Exported {} to {}", exporter.format(), args.output.display());
    Ok(())
}
